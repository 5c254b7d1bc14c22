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

use serde::{Deserialize, Serialize};

/// Structured failure of a single dispatch.
///
/// Produced at the router boundary and carried back to the caller inside a
/// [`ReplyEnvelope`](super::ReplyEnvelope), through the same channel a success uses.
///
/// # Wire Format
///
/// ```json
/// { "kind": "middlewareRejected", "middlewareId": "auth", "reason": "not authenticated" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DispatchError {
    /// No handler is registered for the envelope's type tag.
    NoHandlerRegistered {
        /// The unmatched type tag.
        message_type: String,
    },
    /// A middleware blocked the envelope, failed, or panicked. The handler never ran.
    MiddlewareRejected {
        /// Identity of the middleware that stopped the chain.
        middleware_id: String,
        /// Why it stopped.
        reason: String,
    },
    /// The handler returned an error or panicked.
    HandlerFailed {
        /// The type tag whose handler failed.
        message_type: String,
        /// Rendered cause of the failure.
        cause: String,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHandlerRegistered { message_type } => {
                write!(f, "No handler registered for message type: {message_type}")
            }
            Self::MiddlewareRejected {
                middleware_id,
                reason,
            } => write!(f, "Rejected by middleware {middleware_id}: {reason}"),
            Self::HandlerFailed {
                message_type,
                cause,
            } => write!(f, "Handler for {message_type} failed: {cause}"),
        }
    }
}

impl std::error::Error for DispatchError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejection_uses_camel_case_tagged_form() {
        let err = DispatchError::MiddlewareRejected {
            middleware_id: "auth".into(),
            reason: "not authenticated".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "kind": "middlewareRejected", "middlewareId": "auth", "reason": "not authenticated" })
        );
    }

    #[test]
    fn display_names_the_message_type() {
        let err = DispatchError::NoHandlerRegistered {
            message_type: "UNKNOWN_TYPE".into(),
        };
        assert_eq!(
            err.to_string(),
            "No handler registered for message type: UNKNOWN_TYPE"
        );
    }
}
