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

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace};

use crate::message::{DispatchError, Envelope, Inbound, ReplyEnvelope, SenderContext};
use crate::router::Router;
use crate::traits::Verdict;

/// Type-state marker for a [`Router`] whose inbox loop is running.
///
/// The handler registry and middleware chain of a started router are read-only and
/// shared by every dispatch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Started;

impl Router<Started> {
    /// Runs the middleware chain and then the handler registered for the envelope's type.
    ///
    /// Middleware runs in registration order. The first one that blocks, fails or
    /// panics ends the dispatch with [`DispatchError::MiddlewareRejected`], and neither
    /// the remaining middleware nor any handler runs. Handler failures and panics are
    /// returned as [`DispatchError::HandlerFailed`].
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] describing why no value was produced.
    #[instrument(skip_all, fields(router = %self.id, message_type = %envelope.message_type()))]
    pub async fn dispatch(
        &self,
        envelope: &Envelope,
        sender: &SenderContext,
    ) -> Result<Value, DispatchError> {
        for middleware in &self.middleware {
            let outcome = AssertUnwindSafe(middleware.inspect(envelope, sender))
                .catch_unwind()
                .await;
            let reason = match outcome {
                Ok(Ok(Verdict::Continue)) => continue,
                Ok(Ok(Verdict::Block { reason })) => reason,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("middleware panicked: {}", panic_message(&*panic)),
            };
            trace!("Middleware {} rejected envelope: {}", middleware.id(), reason);
            return Err(DispatchError::MiddlewareRejected {
                middleware_id: middleware.id().to_string(),
                reason,
            });
        }

        let Some(handler) = self.handlers.get(envelope.message_type()) else {
            trace!("No handler registered");
            return Err(DispatchError::NoHandlerRegistered {
                message_type: envelope.message_type().to_string(),
            });
        };

        match AssertUnwindSafe(handler.handle(envelope, sender))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DispatchError::HandlerFailed {
                message_type: envelope.message_type().to_string(),
                cause: e.to_string(),
            }),
            Err(panic) => Err(DispatchError::HandlerFailed {
                message_type: envelope.message_type().to_string(),
                cause: format!("handler panicked: {}", panic_message(&*panic)),
            }),
        }
    }

    /// The inbox loop. Each inbound envelope is processed in its own tracked task.
    ///
    /// On cancellation the inbox is closed and envelopes already queued are still
    /// dispatched before the loop exits.
    pub(crate) async fn wake(
        self: Arc<Self>,
        mut inbox: Receiver<Inbound>,
        cancellation_token: CancellationToken,
        tracker: TaskTracker,
    ) {
        let mut cancel = Box::pin(cancellation_token.cancelled());
        loop {
            tokio::select! {
                () = &mut cancel => {
                    trace!("Cancellation received for router: {}", self.id);
                    inbox.close();
                    while let Some(inbound) = inbox.recv().await {
                        tracker.spawn(self.clone().process(inbound));
                    }
                    break;
                }

                incoming_opt = inbox.recv() => {
                    let Some(inbound) = incoming_opt else { break; };
                    trace!(
                        "Received {} from {}",
                        inbound.envelope.message_type(),
                        inbound.sender.endpoint()
                    );
                    tracker.spawn(self.clone().process(inbound));
                }
            }
        }
        trace!("Router {} inbox loop stopped", self.id);
    }

    /// Dispatches one inbound envelope and answers it if a reply is expected.
    async fn process(self: Arc<Self>, inbound: Inbound) {
        let Inbound {
            envelope,
            sender,
            reply_to,
        } = inbound;
        let outcome = self.dispatch(&envelope, &sender).await;

        match (reply_to, envelope.request_id()) {
            (Some(reply_to), Some(request_id)) => {
                let reply = ReplyEnvelope::from_outcome(request_id.clone(), outcome, &self.id);
                if reply_to.send(reply).await.is_err() {
                    debug!("Reply channel for {} closed before delivery", request_id);
                }
            }
            _ => {
                if let Err(e) = outcome {
                    debug!("Dropped outcome of {}: {}", envelope.message_type(), e);
                }
            }
        }
    }
}

/// Renders a panic payload for inclusion in a [`DispatchError`].
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
