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

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, trace};

use crate::common::auth_retry::{retry_with_refresh, AttemptError, RetryConfig, RetryError};
use crate::common::config::CourierConfig;
use crate::common::{
    Broadcaster, ChannelEndpoint, Client, ClientOptions, EndpointRegistry, HandlerError,
    LocalTransport, RouterHandle,
};
use crate::message::Envelope;
use crate::middleware::{AuthMiddleware, AuthProvider};
use crate::router::{Idle, Router};
use crate::traits::Transport;

/// A running Courier system, created by [`CourierApp`](crate::common::CourierApp).
///
/// Owns the configuration, the root cancellation token, the shared broadcast
/// [`EndpointRegistry`], and every router started and client connected through it.
/// Clones share all of this.
#[derive(Debug, Clone)]
pub struct CourierRuntime {
    config: Arc<CourierConfig>,
    cancellation_token: CancellationToken,
    endpoints: EndpointRegistry,
    routers: Arc<DashMap<String, RouterHandle>>,
    clients: Arc<DashMap<String, Client>>,
}

impl CourierRuntime {
    pub(crate) fn new(config: CourierConfig) -> Self {
        Self {
            config: Arc::new(config),
            cancellation_token: CancellationToken::new(),
            endpoints: EndpointRegistry::new(),
            routers: Arc::new(DashMap::new()),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// The configuration this runtime was launched with.
    #[must_use]
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// The registry broadcasters created by this runtime deliver to.
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Number of routers started through this runtime.
    #[must_use]
    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Creates an idle router using this runtime's duplicate policy.
    #[must_use]
    pub fn new_router(&self, id: impl Into<String>) -> Router<Idle> {
        Router::new(id).with_policy(self.config.router.duplicate_policy)
    }

    /// Starts `router` under this runtime and tracks it for [`shutdown_all`](Self::shutdown_all).
    ///
    /// A router started with an id that is already tracked replaces it in the tracking
    /// map; the earlier router keeps running until stopped through its own handle.
    #[instrument(skip_all, fields(router = %router.id()))]
    pub fn start_router(&self, router: Router<Idle>) -> RouterHandle {
        let handle = router.start_with(
            self.cancellation_token.child_token(),
            self.config.limits.router_inbox_capacity,
            self.config.router_shutdown_timeout(),
        );
        trace!("Tracking router {}", handle.id());
        self.routers.insert(handle.id().to_string(), handle.clone());
        handle
    }

    /// A started router by id.
    #[must_use]
    pub fn router(&self, id: &str) -> Option<RouterHandle> {
        self.routers.get(id).map(|item| item.value().clone())
    }

    /// Connects a client named `source` to `transport`, using this runtime's timeouts.
    ///
    /// Clients are tracked by source; connecting a second client with the same source
    /// replaces the first in the tracking map.
    #[must_use]
    pub fn connect_client(&self, source: impl Into<String>, transport: impl Transport) -> Client {
        let source = source.into();
        let options = ClientOptions {
            request_timeout: self.config.request_timeout(),
            reply_channel_capacity: self.config.limits.reply_channel_capacity,
        };
        let client = Client::connect_under(
            source.clone(),
            Arc::new(transport),
            options,
            self.cancellation_token.child_token(),
        );
        self.clients.insert(source, client.clone());
        client
    }

    /// Connects a client named `source` directly to `router`.
    #[must_use]
    pub fn local_client(&self, source: impl Into<String>, router: &RouterHandle) -> Client {
        self.connect_client(source, LocalTransport::new(router.clone()))
    }

    /// A broadcaster named `source` delivering to [`endpoints`](Self::endpoints).
    #[must_use]
    pub fn broadcaster(&self, source: impl Into<String>) -> Broadcaster {
        Broadcaster::new(source, self.endpoints.clone())
    }

    /// A [`ChannelEndpoint`] sized by this runtime's endpoint channel capacity.
    ///
    /// The endpoint is not registered; pass it to [`endpoints`](Self::endpoints) to
    /// include it in broadcasts.
    #[must_use]
    pub fn channel_endpoint(&self, id: impl Into<String>) -> (ChannelEndpoint, Receiver<Envelope>) {
        ChannelEndpoint::with_capacity(id, self.config.limits.endpoint_channel_capacity)
    }

    /// An [`AuthMiddleware`] gating on `provider` with this runtime's public prefix.
    #[must_use]
    pub fn auth_middleware<P: AuthProvider>(&self, provider: P) -> AuthMiddleware<P> {
        AuthMiddleware::from_config(provider, &self.config.auth)
    }

    /// The retry limits handlers of this runtime should use.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.config.retry
    }

    /// [`retry_with_refresh`] with this runtime's retry limits.
    ///
    /// # Errors
    ///
    /// See [`retry_with_refresh`].
    pub async fn retry_with_refresh<T, Op, OpFut, Refresh, RefreshFut>(
        &self,
        op: Op,
        refresh: Refresh,
    ) -> Result<T, RetryError>
    where
        Op: FnMut() -> OpFut,
        OpFut: Future<Output = Result<T, AttemptError>>,
        Refresh: FnMut() -> RefreshFut,
        RefreshFut: Future<Output = Result<(), HandlerError>>,
    {
        retry_with_refresh(&self.config.retry, op, refresh).await
    }

    /// Stops every tracked router, then shuts down every tracked client.
    ///
    /// Routers finish their queued and in-flight dispatches first, so requests already
    /// submitted still get their replies; whatever is pending afterwards is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the routers did not stop within the system shutdown timeout.
    /// The root token is cancelled in that case and clients are shut down regardless.
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let system_timeout = self.config.system_shutdown_timeout();
        let router_timeout = self.config.router_shutdown_timeout();

        trace!("Stopping {} routers", self.routers.len());
        let stop_futures: Vec<_> = self
            .routers
            .iter()
            .map(|item| {
                let handle = item.value().clone();
                async move {
                    if let Err(e) = handle.stop_within(router_timeout).await {
                        error!("Error stopping router {}: {:?}", handle.id(), e);
                    }
                }
            })
            .collect();

        let result = if tokio::time::timeout(system_timeout, join_all(stop_futures))
            .await
            .is_err()
        {
            error!(
                "System-wide shutdown timeout expired after {} ms. Forcefully cancelling remaining tasks.",
                system_timeout.as_millis()
            );
            self.cancellation_token.cancel();
            Err(anyhow::anyhow!(
                "Timeout while waiting for routers to stop after {} ms",
                system_timeout.as_millis()
            ))
        } else {
            trace!("All routers stopped.");
            Ok(())
        };

        let clients: Vec<Client> = self
            .clients
            .iter()
            .map(|item| item.value().clone())
            .collect();
        join_all(clients.iter().map(Client::shutdown)).await;

        self.cancellation_token.cancel();
        trace!("System shutdown complete.");
        result
    }
}
