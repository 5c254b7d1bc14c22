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
pub use broadcaster::Broadcaster;
pub use client::{Client, ClientOptions};
pub use courier_app::CourierApp;
pub use courier_runtime::CourierRuntime;
pub use endpoint_registry::{ChannelEndpoint, EndpointRegistry};
pub use local_transport::LocalTransport;
pub use pending::{CancelHandle, PendingReply};
pub use router_handle::RouterHandle;
pub use types::{
    DuplicatePolicy, HandlerError, HandlerResult, MiddlewareError, ReplySender,
};

// --- Crate-Internal Re-exports ---
pub(crate) use types::{HandlerMap, MiddlewareChain, RouterSender, Settlement};

// --- Submodules ---

/// Bounded retry with credential refresh.
pub(crate) mod auth_retry;
/// Defines [`Broadcaster`].
mod broadcaster;
/// Defines [`Client`] and [`ClientOptions`].
mod client;
/// Configuration loading and the global `CONFIG`.
pub(crate) mod config;
/// Defines [`CourierApp`].
mod courier_app;
/// Defines [`CourierRuntime`].
mod courier_runtime;
/// Defines [`EndpointRegistry`] and [`ChannelEndpoint`].
mod endpoint_registry;
/// Defines [`LocalTransport`].
mod local_transport;
/// Subscriber installation.
pub(crate) mod logging;
/// The pending request table, [`PendingReply`] and [`CancelHandle`].
mod pending;
/// Defines [`RouterHandle`].
mod router_handle;
/// Shared type aliases and [`DuplicatePolicy`].
mod types;
