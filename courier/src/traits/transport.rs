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

use crate::common::ReplySender;
use crate::message::{Envelope, TransportError};

/// Carries request envelopes from a [`Client`](crate::common::Client) to the other side.
///
/// `send` only has to get the envelope *accepted*: the reply, if any, is pushed into
/// `reply_to` later, once the peer has dispatched it. Returning an error means the peer
/// could not be reached at all, and the client fails the request with
/// [`ClientError::DeliveryFailed`](crate::message::ClientError::DeliveryFailed)
/// immediately.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Submits one envelope.
    async fn send(&self, envelope: Envelope, reply_to: ReplySender) -> Result<(), TransportError>;
}
