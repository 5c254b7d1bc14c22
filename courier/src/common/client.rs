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

use serde_json::Value;
use tokio::sync::mpsc::{channel, Receiver};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace, warn};

use crate::common::config::CONFIG;
use crate::common::pending::PendingRequests;
use crate::common::{PendingReply, ReplySender};
use crate::message::{ClientError, Envelope, ReplyEnvelope, RequestIdGenerator};
use crate::traits::{CourierMessage, Transport};

/// Per-client settings. Defaults come from the global configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long a request waits for its reply; `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Capacity of the channel replies arrive on.
    pub reply_channel_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: CONFIG.request_timeout(),
            reply_channel_capacity: CONFIG.limits.reply_channel_capacity,
        }
    }
}

impl ClientOptions {
    /// Sets the reply timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Waits for replies forever.
    #[must_use]
    pub const fn without_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }
}

/// The caller-side facade of the bus.
///
/// A `Client` stamps every request with a request id unique to this client, tracks it
/// in a pending table, hands it to its [`Transport`] and resolves the returned
/// [`PendingReply`] when the matching reply arrives. Clones share the same pending
/// table and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    source: String,
    ids: RequestIdGenerator,
    pending: Arc<PendingRequests>,
    transport: Arc<dyn Transport>,
    reply_tx: ReplySender,
    timeout: Option<Duration>,
    cancellation_token: CancellationToken,
    tracker: TaskTracker,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

impl Client {
    /// Connects a client named `source` to `transport` with default options.
    ///
    /// Must be called from within a Tokio runtime: the client spawns a task that
    /// receives replies.
    #[must_use]
    pub fn connect(source: impl Into<String>, transport: impl Transport) -> Self {
        Self::connect_with(source, transport, ClientOptions::default())
    }

    /// Connects a client named `source` to `transport` with explicit options.
    #[must_use]
    pub fn connect_with(
        source: impl Into<String>,
        transport: impl Transport,
        options: ClientOptions,
    ) -> Self {
        Self::connect_under(source, Arc::new(transport), options, CancellationToken::new())
    }

    pub(crate) fn connect_under(
        source: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
        cancellation_token: CancellationToken,
    ) -> Self {
        let source = source.into();
        let (reply_tx, reply_rx) = channel(options.reply_channel_capacity.max(1));
        let pending = Arc::new(PendingRequests::default());
        let tracker = TaskTracker::new();

        tracker.spawn(pump_replies(
            reply_rx,
            Arc::clone(&pending),
            cancellation_token.clone(),
        ));
        tracker.close();

        trace!(client = %source, "Client connected");
        Self {
            inner: Arc::new(ClientInner {
                ids: RequestIdGenerator::new(source.clone()),
                source,
                pending,
                transport,
                reply_tx,
                timeout: options.request_timeout,
                cancellation_token,
                tracker,
            }),
        }
    }

    /// The identifier stamped into every envelope this client builds.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Requests that have been submitted and not yet settled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Submits a request and returns a handle to its eventual reply.
    ///
    /// The pending entry is created before the envelope is handed to the transport, so
    /// a reply can never arrive ahead of its entry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] if the client has been shut down. Transport
    /// failures are not returned here; they settle the [`PendingReply`] with
    /// [`ClientError::DeliveryFailed`].
    #[instrument(skip_all, fields(client = %self.inner.source))]
    pub async fn request(
        &self,
        message_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<PendingReply, ClientError> {
        let inner = &self.inner;
        let request_id = inner.ids.next_id();
        if inner.cancellation_token.is_cancelled() {
            return Err(ClientError::Cancelled { request_id });
        }

        let envelope = Envelope::request(message_type, payload, &inner.source, request_id.clone());
        trace!("Submitting {} as {}", envelope.message_type(), request_id);

        let (settlement, receiver) = oneshot::channel();
        inner.pending.insert(request_id.clone(), settlement);
        let reply = PendingReply::new(
            request_id.clone(),
            receiver,
            Arc::clone(&inner.pending),
            inner.timeout,
        );

        if let Err(e) = inner.transport.send(envelope, inner.reply_tx.clone()).await {
            warn!("Delivery of {} failed: {}", request_id, e);
            inner
                .pending
                .settle(&request_id, Err(ClientError::DeliveryFailed(e.to_string())));
        }
        Ok(reply)
    }

    /// Sends a request and waits for its reply.
    ///
    /// # Errors
    ///
    /// See [`PendingReply::wait`].
    pub async fn send(
        &self,
        message_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.request(message_type, payload).await?.wait().await
    }

    /// Submits a typed request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if the message cannot be encoded, and
    /// otherwise behaves like [`request`](Self::request).
    pub async fn request_message<M: CourierMessage>(
        &self,
        message: &M,
    ) -> Result<PendingReply, ClientError> {
        self.request(M::MESSAGE_TYPE, message.to_payload()?).await
    }

    /// Sends a typed request and decodes the reply into `M::Reply`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if either direction fails to encode or
    /// decode, and otherwise behaves like [`PendingReply::wait`].
    pub async fn send_message<M: CourierMessage>(
        &self,
        message: &M,
    ) -> Result<M::Reply, ClientError> {
        let value = self.request_message(message).await?.wait().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Stops receiving replies and settles every pending request with
    /// [`ClientError::Cancelled`]. Later requests fail with `Cancelled` too.
    #[instrument(skip(self), fields(client = %self.inner.source))]
    pub async fn shutdown(&self) {
        self.inner.cancellation_token.cancel();
        self.inner.tracker.wait().await;
        let cancelled = self.inner.pending.cancel_all();
        trace!("Client shut down, {} pending requests cancelled", cancelled);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("source", &self.inner.source)
            .field("pending", &self.inner.pending.len())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// Receives replies and settles the matching pending entries until cancelled.
async fn pump_replies(
    mut replies: Receiver<ReplyEnvelope>,
    pending: Arc<PendingRequests>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancellation_token.cancelled() => break,
            incoming = replies.recv() => {
                let Some(reply) = incoming else { break; };
                let request_id = reply.request_id().clone();
                let outcome = reply.into_result().map_err(ClientError::Dispatch);
                if !pending.settle(&request_id, outcome) {
                    trace!("Discarding late reply for {}", request_id);
                }
            }
        }
    }
    replies.close();
}
