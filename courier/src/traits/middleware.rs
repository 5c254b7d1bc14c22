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
use std::future::Future;

use async_trait::async_trait;

use crate::common::MiddlewareError;
use crate::message::{Envelope, SenderContext};

/// Decision of a middleware about one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the envelope proceed to the next middleware or the handler.
    Continue,
    /// Stop the chain; the dispatch fails with
    /// [`DispatchError::MiddlewareRejected`](crate::message::DispatchError::MiddlewareRejected).
    Block {
        /// Why the envelope was blocked.
        reason: String,
    },
}

impl Verdict {
    /// A blocking verdict with the given reason.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self::Block {
            reason: reason.into(),
        }
    }
}

/// A middleware that returns nothing lets the envelope through.
impl From<()> for Verdict {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

/// A gate that runs before every dispatch, in registration order.
///
/// Returning `Err` or panicking is treated the same as [`Verdict::Block`]: the chain
/// stops and no handler runs. Middleware must not assume anything about which
/// handler, if any, would receive the envelope.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Identity reported in rejections and logs.
    fn id(&self) -> &str;

    /// Inspects one envelope.
    async fn inspect(
        &self,
        envelope: &Envelope,
        sender: &SenderContext,
    ) -> Result<Verdict, MiddlewareError>;
}

/// Adapts an async closure into a [`Middleware`] with the given id.
pub struct FnMiddleware<F> {
    id: String,
    f: F,
}

impl<F> FnMiddleware<F> {
    /// Wraps the closure under `id`.
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Envelope, SenderContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Verdict, MiddlewareError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn inspect(
        &self,
        envelope: &Envelope,
        sender: &SenderContext,
    ) -> Result<Verdict, MiddlewareError> {
        (self.f)(envelope.clone(), sender.clone()).await
    }
}
