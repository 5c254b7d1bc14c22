//! Defines the data that moves through the bus and the errors it can produce.
//!
//! # Key Components
//!
//! *   [`Envelope`]: the immutable unit exchanged between components. It carries the
//!     type tag used as dispatch key, an optional JSON payload and [`Metadata`].
//! *   [`ReplyEnvelope`]: the correlated answer to a request envelope, carrying either a
//!     success payload or a structured [`DispatchError`].
//! *   [`RequestId`]: the correlation key a client attaches to requests.
//! *   [`SenderContext`]: what the receiving side knows about who sent an envelope.
//! *   [`Inbound`]: an envelope queued for a router together with its reply channel.

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

// --- Public Re-exports ---
pub use dispatch_error::DispatchError;
pub use envelope::{Envelope, Metadata};
pub use inbound::Inbound;
pub use message_error::{ClientError, RouterError, TransportError};
pub use reply_envelope::ReplyEnvelope;
pub use request_id::RequestId;
pub use sender_context::SenderContext;

// --- Crate-Internal Re-exports ---
pub(crate) use request_id::RequestIdGenerator;

// --- Submodules ---

/// Defines [`DispatchError`].
mod dispatch_error;
/// Defines [`Envelope`] and [`Metadata`].
mod envelope;
/// Defines [`Inbound`].
mod inbound;
/// Defines [`ClientError`], [`TransportError`] and [`RouterError`].
mod message_error;
/// Defines [`ReplyEnvelope`].
mod reply_envelope;
/// Defines [`RequestId`] and its per-client generator.
mod request_id;
/// Defines [`SenderContext`].
mod sender_context;
