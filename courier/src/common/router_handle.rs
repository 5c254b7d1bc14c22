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

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace};

use crate::common::RouterSender;
use crate::message::{DispatchError, Envelope, Inbound, SenderContext, TransportError};
use crate::router::{Router, Started};
use crate::traits::BroadcastTarget;

/// A cloneable handle to a running [`Router`].
///
/// Envelopes posted through the handle are queued in the router's inbox and each is
/// dispatched in its own task. The handle also allows direct, in-task dispatch, which
/// bypasses the inbox entirely.
#[derive(Clone)]
pub struct RouterHandle {
    router: Arc<Router<Started>>,
    outbox: RouterSender,
    cancellation_token: CancellationToken,
    tracker: TaskTracker,
    stop_timeout: Duration,
}

impl RouterHandle {
    pub(crate) const fn new(
        router: Arc<Router<Started>>,
        outbox: RouterSender,
        cancellation_token: CancellationToken,
        tracker: TaskTracker,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            router,
            outbox,
            cancellation_token,
            tracker,
            stop_timeout,
        }
    }

    /// The router's identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        self.router.id()
    }

    /// The frozen router behind this handle, for introspection.
    #[must_use]
    pub fn router(&self) -> &Router<Started> {
        &self.router
    }

    /// Dispatches `envelope` in the calling task, without going through the inbox.
    ///
    /// # Errors
    ///
    /// See [`Router::dispatch`].
    pub async fn dispatch(
        &self,
        envelope: &Envelope,
        sender: &SenderContext,
    ) -> Result<Value, DispatchError> {
        self.router.dispatch(envelope, sender).await
    }

    /// Queues an envelope in the router's inbox.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unreachable`] when the router has stopped accepting
    /// envelopes.
    #[instrument(skip_all, fields(router = %self.id()))]
    pub async fn post(&self, inbound: Inbound) -> Result<(), TransportError> {
        trace!("Posting {}", inbound.envelope().message_type());
        self.outbox
            .send(inbound)
            .await
            .map_err(|_| TransportError::Unreachable(self.id().to_string()))
    }

    /// Queues an envelope only if the inbox has room right now.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Full`] when the inbox is full and
    /// [`TransportError::Unreachable`] when the router has stopped.
    pub fn try_post(&self, inbound: Inbound) -> Result<(), TransportError> {
        trace!("Offering {}", inbound.envelope().message_type());
        self.outbox.try_send(inbound).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full(self.id().to_string()),
            TrySendError::Closed(_) => TransportError::Unreachable(self.id().to_string()),
        })
    }

    /// Whether the router has been asked to stop.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Stops the router, waiting up to the router shutdown timeout of the configuration
    /// it was started with.
    ///
    /// See [`stop_within`](Self::stop_within).
    ///
    /// # Errors
    ///
    /// Returns an error if in-flight dispatches did not finish in time.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.stop_within(self.stop_timeout).await
    }

    /// Stops the router: the inbox stops accepting envelopes, envelopes already queued
    /// are still dispatched, and this waits for every in-flight dispatch to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if in-flight dispatches did not finish within `timeout`.
    #[instrument(skip(self), fields(router = %self.id()))]
    pub async fn stop_within(&self, timeout: Duration) -> anyhow::Result<()> {
        trace!("Stopping router");
        self.cancellation_token.cancel();

        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            error!(
                "Router {} did not stop within {} ms",
                self.id(),
                timeout.as_millis()
            );
            return Err(anyhow::anyhow!(
                "Timeout while waiting for router {} to stop after {} ms",
                self.id(),
                timeout.as_millis()
            ));
        }

        trace!("Router stopped");
        Ok(())
    }
}

impl fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHandle")
            .field("id", &self.id())
            .field("stopping", &self.is_stopping())
            .finish_non_exhaustive()
    }
}

/// A router reached by broadcast dispatches the envelope and discards the outcome.
/// A router whose inbox is full misses the broadcast.
#[async_trait]
impl BroadcastTarget for RouterHandle {
    fn endpoint_id(&self) -> &str {
        self.id()
    }

    async fn push(&self, envelope: Envelope) -> Result<(), TransportError> {
        let sender = SenderContext::new(envelope.source());
        self.try_post(Inbound::notification(envelope, sender))
    }
}
