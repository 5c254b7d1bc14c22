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
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::common::{HandlerError, HandlerResult};
use crate::message::{Envelope, SenderContext};
use crate::traits::CourierMessage;

/// Processes envelopes of one registered type.
///
/// Handlers receive the full envelope plus the transport-supplied [`SenderContext`] and
/// either produce a JSON value, which becomes the reply payload unmodified, or fail.
/// Failures (and panics) are converted by the router into
/// [`DispatchError::HandlerFailed`](crate::message::DispatchError::HandlerFailed).
///
/// Collaborators such as storage or authentication services should be handed to the
/// handler when it is constructed, not looked up globally.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one envelope.
    async fn handle(&self, envelope: &Envelope, sender: &SenderContext) -> HandlerResult;
}

/// Adapts an async closure over raw envelopes into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wraps the closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Envelope, SenderContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, envelope: &Envelope, sender: &SenderContext) -> HandlerResult {
        (self.f)(envelope.clone(), sender.clone()).await
    }
}

/// Adapts an async closure over a decoded [`CourierMessage`] into a [`Handler`].
///
/// The payload is decoded into `M` before the closure runs; a payload of the wrong
/// shape fails the dispatch without calling the closure. The closure's reply is
/// encoded back to JSON.
pub struct TypedHandler<M, F> {
    f: F,
    _message: PhantomData<fn() -> M>,
}

impl<M, F> TypedHandler<M, F> {
    /// Wraps the closure.
    pub const fn new(f: F) -> Self {
        Self {
            f,
            _message: PhantomData,
        }
    }
}

impl<M, F> fmt::Debug for TypedHandler<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandler")
            .field("message", &std::any::type_name::<M>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<M, F, Fut> Handler for TypedHandler<M, F>
where
    M: CourierMessage,
    F: Fn(M, SenderContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<M::Reply, HandlerError>> + Send + 'static,
{
    async fn handle(&self, envelope: &Envelope, sender: &SenderContext) -> HandlerResult {
        let message = envelope.decode::<M>().map_err(|e| {
            HandlerError::from(format!("invalid {} payload: {e}", M::MESSAGE_TYPE))
        })?;
        let reply = (self.f)(message, sender.clone()).await?;
        Ok(serde_json::to_value(reply)?)
    }
}
