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

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::trace;

use crate::common::Settlement;
use crate::message::{ClientError, RequestId};

/// Requests awaiting a reply, keyed by request id.
///
/// Whoever removes an entry is the only one allowed to settle it, so every request
/// settles exactly once no matter how replies, timeouts and cancellations race.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    entries: DashMap<RequestId, Settlement>,
}

impl PendingRequests {
    pub(crate) fn insert(&self, request_id: RequestId, settlement: Settlement) {
        self.entries.insert(request_id, settlement);
    }

    /// Settles `request_id` with `outcome`. Returns `false` if it was already settled.
    pub(crate) fn settle(&self, request_id: &RequestId, outcome: Result<Value, ClientError>) -> bool {
        match self.entries.remove(request_id) {
            Some((_, settlement)) => {
                // The waiter may have been dropped; the entry is gone either way.
                let _ = settlement.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Forgets `request_id` without settling it.
    pub(crate) fn discard(&self, request_id: &RequestId) {
        self.entries.remove(request_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Settles every remaining entry with [`ClientError::Cancelled`].
    pub(crate) fn cancel_all(&self) -> usize {
        let ids: Vec<RequestId> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter(|id| {
                self.settle(
                    id,
                    Err(ClientError::Cancelled {
                        request_id: id.clone(),
                    }),
                )
            })
            .count()
    }
}

/// A request in flight. Await it with [`wait`](Self::wait).
///
/// Dropping a `PendingReply` without waiting discards the request: a reply that
/// arrives later is ignored.
pub struct PendingReply {
    request_id: RequestId,
    receiver: oneshot::Receiver<Result<Value, ClientError>>,
    pending: Arc<PendingRequests>,
    timeout: Option<Duration>,
}

impl PendingReply {
    pub(crate) const fn new(
        request_id: RequestId,
        receiver: oneshot::Receiver<Result<Value, ClientError>>,
        pending: Arc<PendingRequests>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            request_id,
            receiver,
            pending,
            timeout,
        }
    }

    /// The request's correlation key.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Cancels the request. Returns `false` if it had already settled.
    pub fn cancel(&self) -> bool {
        self.canceller().cancel()
    }

    /// A handle that can cancel this request from another task.
    #[must_use]
    pub fn canceller(&self) -> CancelHandle {
        CancelHandle {
            request_id: self.request_id.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Waits for the request to settle.
    ///
    /// # Errors
    ///
    /// * [`ClientError::Dispatch`] when the router answered with a failure.
    /// * [`ClientError::DeliveryFailed`] when the transport could not reach the router
    ///   or the client shut down its reply pump.
    /// * [`ClientError::RequestTimeout`] when no reply arrived in time.
    /// * [`ClientError::Cancelled`] when the request was cancelled.
    pub async fn wait(mut self) -> Result<Value, ClientError> {
        if let Some(timeout) = self.timeout {
            if let Ok(received) = tokio::time::timeout(timeout, &mut self.receiver).await {
                return self.unpack(received);
            }
            trace!("Request {} timed out", self.request_id);
            self.pending.settle(
                &self.request_id,
                Err(ClientError::RequestTimeout {
                    request_id: self.request_id.clone(),
                    timeout,
                }),
            );
        }
        // Whoever settled the entry has already sent, or is about to send, the outcome.
        let received = (&mut self.receiver).await;
        self.unpack(received)
    }

    fn unpack(
        &self,
        received: Result<Result<Value, ClientError>, oneshot::error::RecvError>,
    ) -> Result<Value, ClientError> {
        received.unwrap_or_else(|_| {
            Err(ClientError::DeliveryFailed(format!(
                "reply channel for {} closed",
                self.request_id
            )))
        })
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.pending.discard(&self.request_id);
    }
}

impl fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply")
            .field("request_id", &self.request_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Cancels one pending request from anywhere.
#[derive(Clone)]
pub struct CancelHandle {
    request_id: RequestId,
    pending: Arc<PendingRequests>,
}

impl CancelHandle {
    /// Settles the request with [`ClientError::Cancelled`]. Returns `false` if it had
    /// already settled.
    pub fn cancel(&self) -> bool {
        self.pending.settle(
            &self.request_id,
            Err(ClientError::Cancelled {
                request_id: self.request_id.clone(),
            }),
        )
    }

    /// The request this handle cancels.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
