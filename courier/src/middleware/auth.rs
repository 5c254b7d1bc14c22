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

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::common::config::{AuthConfig, CONFIG};
use crate::common::MiddlewareError;
use crate::message::{Envelope, SenderContext};
use crate::traits::{Middleware, Verdict};

/// Answers whether the current session holds valid credentials.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Whether requests should currently be let through.
    async fn is_authenticated(&self) -> Result<bool, MiddlewareError>;
}

#[async_trait]
impl<P: AuthProvider + ?Sized> AuthProvider for Arc<P> {
    async fn is_authenticated(&self) -> Result<bool, MiddlewareError> {
        (**self).is_authenticated().await
    }
}

/// Blocks envelopes while the provider reports no valid session.
///
/// Types starting with the public prefix (`AUTH_` unless configured otherwise) always
/// pass, so the messages that establish a session are never blocked by its absence.
/// A provider error blocks the envelope with the error as reason.
#[derive(Debug)]
pub struct AuthMiddleware<P> {
    provider: P,
    public_prefix: String,
}

impl<P: AuthProvider> AuthMiddleware<P> {
    /// Gates on `provider` with the public prefix from the global configuration.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::from_config(provider, &CONFIG.auth)
    }

    /// Gates on `provider` with the public prefix from `config`.
    #[must_use]
    pub fn from_config(provider: P, config: &AuthConfig) -> Self {
        Self {
            provider,
            public_prefix: config.public_prefix.clone(),
        }
    }

    /// Overrides the public prefix.
    #[must_use]
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into();
        self
    }

    fn is_public(&self, message_type: &str) -> bool {
        !self.public_prefix.is_empty() && message_type.starts_with(&self.public_prefix)
    }
}

#[async_trait]
impl<P: AuthProvider> Middleware for AuthMiddleware<P> {
    fn id(&self) -> &str {
        "auth"
    }

    async fn inspect(
        &self,
        envelope: &Envelope,
        _sender: &SenderContext,
    ) -> Result<Verdict, MiddlewareError> {
        if self.is_public(envelope.message_type()) {
            return Ok(Verdict::Continue);
        }
        if self.provider.is_authenticated().await? {
            Ok(Verdict::Continue)
        } else {
            trace!("Blocking unauthenticated {}", envelope.message_type());
            Ok(Verdict::block("not authenticated"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct Session(AtomicBool);

    #[async_trait]
    impl AuthProvider for Session {
        async fn is_authenticated(&self) -> Result<bool, MiddlewareError> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    async fn verdict(middleware: &AuthMiddleware<Arc<Session>>, message_type: &str) -> Verdict {
        middleware
            .inspect(
                &Envelope::new(message_type, None, "popup"),
                &SenderContext::new("popup"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn public_prefix_passes_without_session() {
        let session = Arc::new(Session(AtomicBool::new(false)));
        let middleware = AuthMiddleware::new(Arc::clone(&session)).with_public_prefix("AUTH_");

        assert_eq!(verdict(&middleware, "AUTH_CAPTURE").await, Verdict::Continue);
        assert_eq!(
            verdict(&middleware, "FETCH_EXPENSES").await,
            Verdict::block("not authenticated")
        );

        session.0.store(true, Ordering::SeqCst);
        assert_eq!(verdict(&middleware, "FETCH_EXPENSES").await, Verdict::Continue);
    }
}
