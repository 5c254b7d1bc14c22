//! Defines the core traits that establish the contracts of the bus.
//!
//! # Key Traits
//!
//! *   [`CourierMessage`]: binds a Rust type to a stable type tag and a reply type, and
//!     converts it to and from an envelope payload.
//! *   [`Handler`]: processes one envelope of a registered type and produces a JSON
//!     value or fails. [`FnHandler`] and [`TypedHandler`] adapt closures.
//! *   [`Middleware`]: a pre-dispatch gate returning a [`Verdict`]. [`FnMiddleware`]
//!     adapts closures.
//! *   [`Transport`]: carries request envelopes to a router and replies back.
//! *   [`BroadcastTarget`]: an endpoint that can receive fire-and-forget envelopes.

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
pub use broadcast_target::BroadcastTarget;
pub use courier_message::CourierMessage;
pub use handler::{FnHandler, Handler, TypedHandler};
pub use middleware::{FnMiddleware, Middleware, Verdict};
pub use transport::Transport;

// --- Submodules ---

/// Defines the [`BroadcastTarget`] trait.
mod broadcast_target;
/// Defines the [`CourierMessage`] trait.
mod courier_message;
/// Defines the [`Handler`] trait and closure adapters.
mod handler;
/// Defines the [`Middleware`] trait, [`Verdict`] and the closure adapter.
mod middleware;
/// Defines the [`Transport`] trait.
mod transport;
