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

use crate::common::ReplySender;
use crate::message::{Envelope, SenderContext};

/// An envelope queued in a router's inbox.
///
/// `reply_to` is `None` for fire-and-forget deliveries such as broadcast; the router
/// only answers when both a reply channel and a request id are present.
#[derive(Debug)]
pub struct Inbound {
    pub(crate) envelope: Envelope,
    pub(crate) sender: SenderContext,
    pub(crate) reply_to: Option<ReplySender>,
}

impl Inbound {
    /// An envelope whose dispatch outcome should be sent to `reply_to`.
    #[must_use]
    pub fn request(envelope: Envelope, sender: SenderContext, reply_to: ReplySender) -> Self {
        Self {
            envelope,
            sender,
            reply_to: Some(reply_to),
        }
    }

    /// An envelope whose dispatch outcome is discarded.
    #[must_use]
    pub fn notification(envelope: Envelope, sender: SenderContext) -> Self {
        Self {
            envelope,
            sender,
            reply_to: None,
        }
    }

    /// The queued envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The sender as identified by the transport.
    #[must_use]
    pub const fn sender(&self) -> &SenderContext {
        &self.sender
    }
}
