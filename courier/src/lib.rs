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

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

//! # Courier
//!
//! A typed in-process message bus built on Tokio. Callers exchange
//! [`Envelope`](crate::message::Envelope)s carrying a string type tag, an optional
//! JSON payload and correlation metadata.
//!
//! ## Key Concepts
//!
//! - **Router (`Router`, `RouterHandle`)**: maps type tags to exactly one handler and
//!   runs an ordered middleware chain before every dispatch. Registration happens
//!   while the router is `Idle`; once started the registry is frozen.
//! - **Client (`Client`)**: builds request envelopes with per-instance request ids,
//!   tracks them in a pending table, and settles each one exactly once: on reply,
//!   delivery failure, timeout or cancellation.
//! - **Broadcast (`Broadcaster`)**: fire-and-forget fan-out to every registered
//!   endpoint. Unreachable endpoints are skipped silently.
//! - **Transport (`Transport`)**: the seam between a client and whatever carries its
//!   envelopes. [`LocalTransport`](crate::common::LocalTransport) delivers into a
//!   running router in the same process.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[courier_message(tag = "CREATE_EXPENSE", reply = ExpenseCreated)]
//! struct CreateExpense {
//!     merchant: String,
//!     amount: f64,
//! }
//!
//! let runtime = CourierApp::launch_async().await;
//! let mut router = runtime.new_router("background");
//! router.on::<CreateExpense, _, _>(|msg, _sender| async move { Ok(ExpenseCreated::from(msg)) })?;
//! let router = runtime.start_router(router);
//! let client = runtime.local_client("popup", &router);
//! let created = client.send_message(&CreateExpense { merchant: "Acme".into(), amount: 12.5 }).await?;
//! ```

// Lets `#[courier_message]` expand to `::courier::...` paths inside this crate too.
extern crate self as courier;

/// Runtime entry point, client, broadcast, transports, configuration and logging.
pub(crate) mod common;

/// The type-state router and its dispatch loop.
pub(crate) mod router;

/// Envelopes, replies, request ids, sender context and error types.
pub(crate) mod message;

/// Core traits: messages, handlers, middleware, transports and broadcast targets.
pub(crate) mod traits;

/// Ready-made middleware for authentication gating and request logging.
pub mod middleware;

/// Bounded retry with credential refresh for handlers that talk to authenticated services.
pub mod auth_retry {
    pub use crate::common::auth_retry::{
        retry_with_refresh, AttemptError, RetryConfig, RetryError, RetryLimiter,
    };
}

/// Configuration types and the process-wide configuration instance.
pub mod config {
    pub use crate::common::config::{
        AuthConfig, CourierConfig, LimitsConfig, LoggingConfig, RouterConfig, TimeoutConfig,
        CONFIG,
    };
}

/// Tracing subscriber installation driven by [`LoggingConfig`](crate::config::LoggingConfig).
pub mod logging {
    pub use crate::common::logging::init;
}

pub use crate::traits::CourierMessage;

/// Items the `courier_message` expansion refers to. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use serde;
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `courier-macro`)
/// *   [`courier_macro::courier_message`]: Attribute macro for defining typed messages.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html):
///     needed to implement [`Handler`], [`Middleware`], [`Transport`] and [`BroadcastTarget`].
///
/// ## Core Types
/// *   [`crate::common::CourierApp`] / [`crate::common::CourierRuntime`]: system entry point.
/// *   [`crate::router::Router`], [`crate::router::Idle`], [`crate::router::Started`],
///     [`crate::common::RouterHandle`]: routing.
/// *   [`crate::common::Client`], [`crate::common::PendingReply`], [`crate::common::CancelHandle`]:
///     correlated requests.
/// *   [`crate::common::Broadcaster`], [`crate::common::EndpointRegistry`],
///     [`crate::common::ChannelEndpoint`]: fan-out.
/// *   [`crate::message::Envelope`], [`crate::message::ReplyEnvelope`],
///     [`crate::message::SenderContext`], [`crate::message::RequestId`]: data model.
/// *   [`crate::message::DispatchError`], [`crate::message::ClientError`],
///     [`crate::message::TransportError`], [`crate::message::RouterError`]: error taxonomy.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use courier_macro::courier_message;

    pub use crate::common::{
        Broadcaster, CancelHandle, ChannelEndpoint, Client, ClientOptions, CourierApp,
        CourierRuntime, DuplicatePolicy, EndpointRegistry, HandlerError, HandlerResult,
        LocalTransport, MiddlewareError, PendingReply, ReplySender, RouterHandle,
    };
    pub use crate::message::{
        ClientError, DispatchError, Envelope, Inbound, Metadata, ReplyEnvelope, RequestId,
        RouterError, SenderContext, TransportError,
    };
    pub use crate::router::{Idle, Router, Started};
    pub use crate::traits::{
        BroadcastTarget, CourierMessage, FnHandler, FnMiddleware, Handler, Middleware,
        Transport, TypedHandler, Verdict,
    };
}
