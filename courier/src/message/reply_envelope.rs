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

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::envelope::now_millis;
use crate::message::{DispatchError, RequestId};

/// The correlated answer to a request [`Envelope`](super::Envelope).
///
/// Carries the same `requestId` as the request and either the handler's payload or a
/// structured [`DispatchError`]. A reply with an `error` field is a failure regardless
/// of its payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<DispatchError>,
    timestamp: i64,
    source: String,
}

impl ReplyEnvelope {
    /// A successful reply carrying the handler's value.
    #[must_use]
    pub fn success(request_id: RequestId, payload: Value, source: impl Into<String>) -> Self {
        Self {
            request_id,
            payload: (!payload.is_null()).then_some(payload),
            error: None,
            timestamp: now_millis(),
            source: source.into(),
        }
    }

    /// A failed reply carrying the dispatch error.
    #[must_use]
    pub fn failure(request_id: RequestId, error: DispatchError, source: impl Into<String>) -> Self {
        Self {
            request_id,
            payload: None,
            error: Some(error),
            timestamp: now_millis(),
            source: source.into(),
        }
    }

    /// Builds the reply for a finished dispatch.
    #[must_use]
    pub fn from_outcome(
        request_id: RequestId,
        outcome: Result<Value, DispatchError>,
        source: impl Into<String>,
    ) -> Self {
        match outcome {
            Ok(payload) => Self::success(request_id, payload, source),
            Err(error) => Self::failure(request_id, error, source),
        }
    }

    /// The correlation key copied from the request.
    #[inline]
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The success payload, if any.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// The dispatch error, if the request failed.
    #[inline]
    #[must_use]
    pub const fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Identifier of the router that answered.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// When the reply was built, in milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Converts the reply into the outcome the caller sees. A missing payload is `Null`.
    ///
    /// # Errors
    ///
    /// Returns the carried [`DispatchError`] when the reply has an `error` field.
    pub fn into_result(self) -> Result<Value, DispatchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.payload.unwrap_or(Value::Null)),
        }
    }
}
