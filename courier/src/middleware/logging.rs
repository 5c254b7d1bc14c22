/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use async_trait::async_trait;
use tracing::info;

use crate::common::MiddlewareError;
use crate::message::{Envelope, SenderContext};
use crate::traits::{Middleware, Verdict};

/// Records every envelope that reaches the router. Never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn id(&self) -> &str {
        "logging"
    }

    async fn inspect(
        &self,
        envelope: &Envelope,
        sender: &SenderContext,
    ) -> Result<Verdict, MiddlewareError> {
        info!(
            message_type = envelope.message_type(),
            source = envelope.source(),
            request_id = envelope.request_id().map(|id| id.as_str()),
            endpoint = sender.endpoint(),
            "envelope received"
        );
        Ok(Verdict::Continue)
    }
}
