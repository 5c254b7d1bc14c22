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

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tracing::trace;

use crate::common::config::CONFIG;
use crate::message::{Envelope, TransportError};
use crate::traits::BroadcastTarget;

/// The set of endpoints a [`Broadcaster`](crate::common::Broadcaster) reaches.
///
/// Cloning shares the underlying map. Registering an id that is already present
/// replaces the earlier endpoint.
#[derive(Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Arc<DashMap<String, Arc<dyn BroadcastTarget>>>,
}

impl EndpointRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `target` under its [`endpoint_id`](BroadcastTarget::endpoint_id).
    pub fn register(&self, target: impl BroadcastTarget) {
        let id = target.endpoint_id().to_string();
        trace!("Registering broadcast endpoint {}", id);
        self.endpoints.insert(id, Arc::new(target));
    }

    /// Removes the endpoint registered as `endpoint_id`. Returns whether it was present.
    pub fn unregister(&self, endpoint_id: &str) -> bool {
        self.endpoints.remove(endpoint_id).is_some()
    }

    /// Whether an endpoint is registered as `endpoint_id`.
    #[must_use]
    pub fn contains(&self, endpoint_id: &str) -> bool {
        self.endpoints.contains_key(endpoint_id)
    }

    /// Number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The endpoints registered right now. Later changes do not affect the snapshot.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn BroadcastTarget>> {
        self.endpoints
            .iter()
            .map(|item| Arc::clone(item.value()))
            .collect()
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.endpoints.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("EndpointRegistry")
            .field("endpoints", &ids)
            .finish()
    }
}

/// A broadcast endpoint backed by a bounded channel, such as an open tab.
///
/// The endpoint becomes unreachable once its receiver is dropped. A push never waits
/// for the receiver: when the buffer is full the envelope is dropped for this endpoint.
#[derive(Debug, Clone)]
pub struct ChannelEndpoint {
    id: String,
    sender: Sender<Envelope>,
}

impl ChannelEndpoint {
    /// An endpoint with the configured default capacity, plus the receiving end.
    #[must_use]
    #[allow(clippy::new_ret_no_self)]
    pub fn new(id: impl Into<String>) -> (Self, Receiver<Envelope>) {
        Self::with_capacity(id, CONFIG.limits.endpoint_channel_capacity)
    }

    /// An endpoint buffering up to `capacity` envelopes, plus the receiving end.
    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> (Self, Receiver<Envelope>) {
        let (sender, receiver) = channel(capacity.max(1));
        (
            Self {
                id: id.into(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl BroadcastTarget for ChannelEndpoint {
    fn endpoint_id(&self) -> &str {
        &self.id
    }

    async fn push(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.sender.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full(self.id.clone()),
            TrySendError::Closed(_) => TransportError::Unreachable(self.id.clone()),
        })
    }
}
