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

//! Type aliases and small supporting types shared across the crate.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::message::{ClientError, Inbound, ReplyEnvelope};
use crate::traits::{Handler, Middleware};

/// Failure produced by a handler. Rendered into
/// [`DispatchError::HandlerFailed`](crate::message::DispatchError::HandlerFailed).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Failure produced by a middleware. Rendered into
/// [`DispatchError::MiddlewareRejected`](crate::message::DispatchError::MiddlewareRejected).
pub type MiddlewareError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler returns: the reply payload or a failure.
pub type HandlerResult = Result<Value, HandlerError>;

/// Channel end a router pushes replies into.
pub type ReplySender = mpsc::Sender<ReplyEnvelope>;

/// Crate-internal: sender half of a router inbox.
pub(crate) type RouterSender = mpsc::Sender<Inbound>;

/// Crate-internal: handler registry, populated while the router is idle and read-only after.
pub(crate) type HandlerMap = HashMap<String, Arc<dyn Handler>>;

/// Crate-internal: ordered middleware chain.
pub(crate) type MiddlewareChain = Vec<Arc<dyn Middleware>>;

/// Crate-internal: one-shot channel that settles a pending request.
pub(crate) type Settlement = oneshot::Sender<Result<Value, ClientError>>;

/// What a router does when a type tag is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later registration replaces the earlier one (a warning is logged).
    #[default]
    Overwrite,
    /// The later registration fails with
    /// [`RouterError::DuplicateHandler`](crate::message::RouterError::DuplicateHandler)
    /// and the earlier handler stays active.
    RejectDuplicate,
}
