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
use std::time::Duration;

use crate::message::{DispatchError, RequestId};

/// Ways a client request can fail, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The router answered with a structured dispatch failure.
    Dispatch(DispatchError),
    /// The transport could not reach the peer at all.
    DeliveryFailed(String),
    /// No reply arrived within the configured timeout.
    RequestTimeout {
        /// The request that timed out.
        request_id: RequestId,
        /// How long the client waited.
        timeout: Duration,
    },
    /// The request was cancelled by the caller or by client shutdown.
    Cancelled {
        /// The cancelled request.
        request_id: RequestId,
    },
    /// Encoding the request or decoding the reply payload failed.
    Serialization(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch(err) => write!(f, "Dispatch failed: {err}"),
            Self::DeliveryFailed(reason) => write!(f, "Delivery failed: {reason}"),
            Self::RequestTimeout {
                request_id,
                timeout,
            } => write!(
                f,
                "Request {request_id} timed out after {} ms",
                timeout.as_millis()
            ),
            Self::Cancelled { request_id } => write!(f, "Request {request_id} was cancelled"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dispatch(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DispatchError> for ClientError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::DeliveryFailed(err.to_string())
    }
}

/// Failures reported by a [`Transport`](crate::traits::Transport) or a
/// [`BroadcastTarget`](crate::traits::BroadcastTarget).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No peer is listening at the named endpoint.
    Unreachable(String),
    /// The peer is alive but its buffer is full.
    Full(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(endpoint) => write!(f, "Endpoint unreachable: {endpoint}"),
            Self::Full(endpoint) => write!(f, "Endpoint full: {endpoint}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors raised while configuring a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A handler for this type already exists and the router rejects duplicates.
    DuplicateHandler {
        /// The type tag registered twice.
        message_type: String,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateHandler { message_type } => {
                write!(f, "A handler for {message_type} is already registered")
            }
        }
    }
}

impl std::error::Error for RouterError {}
