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
use std::fmt::Formatter;
use std::marker::PhantomData;

pub use idle::Idle;
pub use started::Started;

use crate::common::{DuplicatePolicy, HandlerMap, MiddlewareChain};

mod idle;
mod started;

/// Dispatches envelopes by type tag, behind an ordered middleware chain.
///
/// `Router` uses a type-state parameter to separate configuration from operation:
///
/// * [`Router<Idle>`](Idle): handlers and middleware can be registered.
/// * [`Router<Started>`](Started): the registry and chain are frozen and shared by
///   every in-flight dispatch. A started router is reached through a
///   [`RouterHandle`](crate::common::RouterHandle).
///
/// Every envelope is handled by at most one handler: the one registered for its
/// type tag.
pub struct Router<RouterState> {
    /// Identifier, used as the `source` of replies and in logs.
    pub(crate) id: String,
    /// Registered handlers keyed by type tag.
    pub(crate) handlers: HandlerMap,
    /// Middleware in execution order.
    pub(crate) middleware: MiddlewareChain,
    /// What happens when a type tag is registered twice.
    pub(crate) policy: DuplicatePolicy,
    _router_state: PhantomData<RouterState>,
}

impl<RouterState> Router<RouterState> {
    /// The router's identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a handler is registered for `message_type`.
    #[must_use]
    pub fn handles(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Middleware identifiers in execution order.
    #[must_use]
    pub fn middleware_ids(&self) -> Vec<String> {
        self.middleware.iter().map(|m| m.id().to_string()).collect()
    }

    /// The duplicate registration policy in effect.
    #[must_use]
    pub const fn policy(&self) -> DuplicatePolicy {
        self.policy
    }
}

impl<RouterState> fmt::Debug for Router<RouterState> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("handlers", &types)
            .field("middleware", &self.middleware_ids())
            .field("policy", &self.policy)
            .finish()
    }
}
