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

use crate::common::{ReplySender, RouterHandle};
use crate::message::{Envelope, Inbound, SenderContext, TransportError};
use crate::traits::Transport;

/// In-process [`Transport`] that posts requests straight into a router's inbox.
///
/// The router sees a [`SenderContext`] built from the envelope's `source`, unless one
/// was fixed with [`with_sender`](Self::with_sender).
#[derive(Debug, Clone)]
pub struct LocalTransport {
    router: RouterHandle,
    sender: Option<SenderContext>,
}

impl LocalTransport {
    /// A transport delivering to `router`.
    #[must_use]
    pub const fn new(router: RouterHandle) -> Self {
        Self {
            router,
            sender: None,
        }
    }

    /// Presents every request to the router as coming from `sender`.
    #[must_use]
    pub fn with_sender(mut self, sender: SenderContext) -> Self {
        self.sender = Some(sender);
        self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, envelope: Envelope, reply_to: ReplySender) -> Result<(), TransportError> {
        let sender = self
            .sender
            .clone()
            .unwrap_or_else(|| SenderContext::new(envelope.source()));
        self.router
            .post(Inbound::request(envelope, sender, reply_to))
            .await
    }
}
