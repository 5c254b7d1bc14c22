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

use crate::message::{Envelope, TransportError};

/// An endpoint that accepts fire-and-forget envelopes from a
/// [`Broadcaster`](crate::common::Broadcaster).
#[async_trait]
pub trait BroadcastTarget: Send + Sync + 'static {
    /// Key under which the endpoint is registered.
    fn endpoint_id(&self) -> &str;

    /// Delivers one envelope. No reply is expected.
    ///
    /// Must not wait on the endpoint's consumer: an endpoint that cannot take the
    /// envelope right away reports an error and is skipped.
    async fn push(&self, envelope: Envelope) -> Result<(), TransportError>;
}
