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

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::common::EndpointRegistry;
use crate::message::Envelope;
use crate::traits::CourierMessage;

/// Fans one envelope out to every endpoint in an [`EndpointRegistry`].
///
/// Broadcasts carry no request id and expect no reply. Endpoints that cannot be
/// reached are skipped; a broadcast as a whole never fails.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    source: String,
    endpoints: EndpointRegistry,
}

impl Broadcaster {
    /// A broadcaster stamping `source` into its envelopes.
    #[must_use]
    pub fn new(source: impl Into<String>, endpoints: EndpointRegistry) -> Self {
        Self {
            source: source.into(),
            endpoints,
        }
    }

    /// The registry this broadcaster delivers to.
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Delivers one envelope to every registered endpoint concurrently.
    ///
    /// Returns how many endpoints accepted it. Delivery order is unspecified.
    #[instrument(skip(self, payload), fields(source = %self.source))]
    pub async fn broadcast(&self, message_type: &str, payload: Option<Value>) -> usize {
        let envelope = Envelope::new(message_type, payload, &self.source);
        let targets = self.endpoints.snapshot();
        trace!("Broadcasting to {} endpoints", targets.len());

        let deliveries: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let envelope = envelope.clone();
                async move {
                    match target.push(envelope).await {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("Skipping endpoint {}: {}", target.endpoint_id(), e);
                            false
                        }
                    }
                }
            })
            .collect();

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    /// Broadcasts a typed message under its `MESSAGE_TYPE`.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the message cannot be encoded. Delivery
    /// failures are never errors.
    pub async fn broadcast_message<M: CourierMessage>(
        &self,
        message: &M,
    ) -> Result<usize, serde_json::Error> {
        let payload = message.to_payload()?;
        Ok(self.broadcast(M::MESSAGE_TYPE, payload).await)
    }
}
