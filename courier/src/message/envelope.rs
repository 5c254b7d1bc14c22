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

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use static_assertions::assert_impl_all;

use crate::message::RequestId;
use crate::traits::CourierMessage;

/// The unit of data exchanged through the bus.
///
/// An `Envelope` carries a string type tag (the dispatch key), an optional payload that
/// the router treats as opaque, and [`Metadata`] describing when and where it was
/// created. Envelopes are immutable once built: all fields are private and only
/// readable through accessors.
///
/// # Wire Format
///
/// ```json
/// {
///   "type": "CREATE_EXPENSE",
///   "payload": { "merchant": "Acme", "amount": 12.5, "currency": "USD" },
///   "metadata": { "timestamp": 1718000000000, "source": "popup", "requestId": "popup-1" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    metadata: Metadata,
}

/// Creation time, origin and correlation key of an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Milliseconds since the Unix epoch at creation.
    pub timestamp: i64,
    /// Identifier of the originating endpoint.
    pub source: String,
    /// Correlation key; present only on envelopes that expect a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl Envelope {
    /// Creates an envelope that does not expect a reply, as used for broadcast.
    #[must_use]
    pub fn new(
        message_type: impl Into<String>,
        payload: Option<Value>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
            metadata: Metadata {
                timestamp: now_millis(),
                source: source.into(),
                request_id: None,
            },
        }
    }

    /// Creates a request envelope correlated by `request_id`.
    #[must_use]
    pub fn request(
        message_type: impl Into<String>,
        payload: Option<Value>,
        source: impl Into<String>,
        request_id: RequestId,
    ) -> Self {
        let mut envelope = Self::new(message_type, payload, source);
        envelope.metadata.request_id = Some(request_id);
        envelope
    }

    /// Creates a reply-less envelope from a typed message, using its `MESSAGE_TYPE` tag.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the message cannot be encoded as JSON.
    pub fn from_message<M: CourierMessage>(
        message: &M,
        source: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(M::MESSAGE_TYPE, message.to_payload()?, source))
    }

    /// The type tag used as dispatch key.
    #[inline]
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// The payload, if any.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// The envelope's metadata.
    #[inline]
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Identifier of the endpoint that created the envelope.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.metadata.timestamp
    }

    /// The correlation key, if the envelope expects a reply.
    #[inline]
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        self.metadata.request_id.as_ref()
    }

    /// Whether a reply should be produced for this envelope.
    #[inline]
    #[must_use]
    pub const fn expects_reply(&self) -> bool {
        self.metadata.request_id.is_some()
    }

    /// Decodes the payload into the typed message `M`.
    ///
    /// The type tag is not checked here; the router has already selected the handler
    /// by tag by the time this is called.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the payload does not match `M`'s shape.
    pub fn decode<M: CourierMessage>(&self) -> Result<M, serde_json::Error> {
        M::from_payload(self.payload.as_ref())
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

assert_impl_all!(Envelope: Send, Sync, Clone);
