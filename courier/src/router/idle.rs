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

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::channel;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace, warn};

use crate::common::config::CONFIG;
use crate::common::{
    DuplicatePolicy, HandlerError, HandlerResult, MiddlewareError, RouterHandle,
};
use crate::message::{Envelope, RouterError, SenderContext};
use crate::router::{Router, Started};
use crate::traits::{
    CourierMessage, FnHandler, FnMiddleware, Handler, Middleware, TypedHandler, Verdict,
};

/// Type-state marker for a [`Router`] that is being configured.
///
/// Registration methods only exist in this state; [`Router::start`] consumes the
/// idle router, so nothing can be registered once it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Idle;

impl Router<Idle> {
    /// Creates an empty router using the configured duplicate policy.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handlers: HashMap::new(),
            middleware: Vec::new(),
            policy: CONFIG.router.duplicate_policy,
            _router_state: PhantomData,
        }
    }

    /// Overrides the duplicate registration policy for this router.
    #[must_use]
    pub const fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers `handler` for `message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateHandler`] when a handler for the type already
    /// exists and the policy is [`DuplicatePolicy::RejectDuplicate`]. The existing
    /// handler stays registered in that case.
    #[instrument(skip_all, fields(router = %self.id))]
    pub fn register(
        &mut self,
        message_type: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouterError> {
        let message_type = message_type.into();
        if self.handlers.contains_key(&message_type) {
            match self.policy {
                DuplicatePolicy::RejectDuplicate => {
                    return Err(RouterError::DuplicateHandler { message_type });
                }
                DuplicatePolicy::Overwrite => {
                    warn!("Replacing existing handler for {}", message_type);
                }
            }
        }
        trace!("Registering handler for {}", message_type);
        self.handlers.insert(message_type, Arc::new(handler));
        Ok(self)
    }

    /// Registers an async closure over raw envelopes for `message_type`.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_fn<F, Fut>(
        &mut self,
        message_type: impl Into<String>,
        f: F,
    ) -> Result<&mut Self, RouterError>
    where
        F: Fn(Envelope, SenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(message_type, FnHandler::new(f))
    }

    /// Registers a typed handler for `M` under `M::MESSAGE_TYPE`.
    ///
    /// The payload is decoded into `M` before `f` runs and `f`'s reply is encoded back.
    ///
    /// ```rust,ignore
    /// router.on::<CreateExpense, _, _>(move |expense, _sender| {
    ///     let store = store.clone();
    ///     async move { store.insert(expense).await }
    /// })?;
    /// ```
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn on<M, F, Fut>(&mut self, f: F) -> Result<&mut Self, RouterError>
    where
        M: CourierMessage,
        F: Fn(M, SenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Reply, HandlerError>> + Send + 'static,
    {
        self.register(M::MESSAGE_TYPE, TypedHandler::<M, F>::new(f))
    }

    /// Appends `middleware` to the chain. Middleware runs in the order it is added.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        trace!(router = %self.id, "Adding middleware {}", middleware.id());
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends an async closure to the chain under `id`.
    pub fn use_fn<F, Fut>(&mut self, id: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Envelope, SenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, MiddlewareError>> + Send + 'static,
    {
        self.use_middleware(FnMiddleware::new(id, f))
    }

    /// Starts the router's inbox loop and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(self) -> RouterHandle {
        self.start_with(
            CancellationToken::new(),
            CONFIG.limits.router_inbox_capacity,
            CONFIG.router_shutdown_timeout(),
        )
    }

    /// Starts the router under `cancellation_token` with an inbox of `capacity`.
    /// [`RouterHandle::stop`] waits up to `stop_timeout`.
    #[instrument(skip_all, fields(router = %self.id, capacity = capacity))]
    pub(crate) fn start_with(
        self,
        cancellation_token: CancellationToken,
        capacity: usize,
        stop_timeout: Duration,
    ) -> RouterHandle {
        let (outbox, inbox) = channel(capacity.max(1));
        let tracker = TaskTracker::new();

        let router: Arc<Router<Started>> = Arc::new(self.into());
        trace!(
            "Starting router with {} handlers and {} middleware",
            router.handler_count(),
            router.middleware.len()
        );

        tracker.spawn(router.clone().wake(
            inbox,
            cancellation_token.clone(),
            tracker.clone(),
        ));
        // Only the wake loop is tracked so far; dispatch tasks join it later and
        // `wait` still covers them.
        tracker.close();

        RouterHandle::new(router, outbox, cancellation_token, tracker, stop_timeout)
    }
}

impl From<Router<Idle>> for Router<Started> {
    fn from(value: Router<Idle>) -> Self {
        Self {
            id: value.id,
            handlers: value.handlers,
            middleware: value.middleware,
            policy: value.policy,
            _router_state: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn overwrite_policy_keeps_one_handler_per_type() {
        let mut router = Router::new("test").with_policy(DuplicatePolicy::Overwrite);
        router
            .register_fn("PING", |_, _| async { Ok(json!(1)) })
            .unwrap()
            .register_fn("PING", |_, _| async { Ok(json!(2)) })
            .unwrap();
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn reject_policy_reports_duplicate() {
        let mut router = Router::new("test").with_policy(DuplicatePolicy::RejectDuplicate);
        router
            .register_fn("PING", |_, _| async { Ok(json!(1)) })
            .unwrap();
        let err = router
            .register_fn("PING", |_, _| async { Ok(json!(2)) })
            .unwrap_err();
        assert_eq!(
            err,
            RouterError::DuplicateHandler {
                message_type: "PING".into()
            }
        );
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn middleware_ids_follow_registration_order() {
        let mut router = Router::new("test");
        router
            .use_fn("first", |_, _| async { Ok(Verdict::Continue) })
            .use_fn("second", |_, _| async { Ok(Verdict::Continue) });
        assert_eq!(router.middleware_ids(), vec!["first", "second"]);
    }
}
