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

//! Bounded retry with credential refresh for handlers.
//!
//! A handler that calls a remote service may be told its credentials are stale. The
//! handler then refreshes them and tries again, but only a bounded number of times and
//! with exponential backoff between attempts, so a service that keeps rejecting the
//! refreshed credentials cannot trap the handler in a loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier::auth_retry::{retry_with_refresh, AttemptError, RetryConfig};
//!
//! let expenses = retry_with_refresh(
//!     &RetryConfig::default(),
//!     || async { api.fetch_expenses().await.map_err(classify) },
//!     || async { auth.refresh_token().await },
//! )
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::common::HandlerError;

/// Limits and backoff for [`retry_with_refresh`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Each further retry multiplies the delay by this factor.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that retries immediately, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Get the maximum backoff duration.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Counts attempts and computes the delay before the next one.
#[derive(Debug, Clone)]
pub struct RetryLimiter {
    config: RetryConfig,
    attempts: u32,
}

impl RetryLimiter {
    /// Create a new limiter from configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Whether another attempt is allowed.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.attempts < self.config.max_attempts
    }

    /// Records an attempt and returns how long to wait before the *next* one.
    ///
    /// The first recorded attempt yields no delay; after that the delay grows from
    /// `initial_backoff_ms` by `backoff_multiplier`, capped at `max_backoff_ms`.
    pub fn record_attempt(&mut self) -> Duration {
        let delay = self.peek_backoff();
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// The delay [`record_attempt`](Self::record_attempt) would return, without recording.
    #[must_use]
    pub fn peek_backoff(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        let backoff_ms = self.config.initial_backoff_ms as f64
            * self
                .config
                .backoff_multiplier
                .powi(i32::try_from(self.attempts - 1).unwrap_or(i32::MAX));
        #[allow(
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss
        )]
        let capped_backoff_ms = (backoff_ms.min(self.config.max_backoff_ms as f64).max(0.0)) as u64;

        Duration::from_millis(capped_backoff_ms)
    }

    /// Attempts recorded so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for RetryLimiter {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// How a single attempt failed.
#[derive(Debug)]
pub enum AttemptError {
    /// Credentials were rejected; refresh and try again.
    Unauthorized(HandlerError),
    /// Any other failure; retrying will not help.
    Fatal(HandlerError),
}

/// Terminal failure of [`retry_with_refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Every allowed attempt was rejected as unauthorized.
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The rejection of the final attempt.
        last_error: String,
    },
    /// Refreshing credentials failed.
    RefreshFailed(String),
    /// An attempt failed for a reason other than authorization.
    Fatal(String),
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "Gave up after {attempts} attempts: {last_error}"),
            Self::RefreshFailed(e) => write!(f, "Credential refresh failed: {e}"),
            Self::Fatal(e) => write!(f, "Attempt failed: {e}"),
        }
    }
}

impl std::error::Error for RetryError {}

/// Runs `op`, refreshing credentials and retrying while it reports
/// [`AttemptError::Unauthorized`], up to `config.max_attempts` attempts in total.
///
/// # Errors
///
/// * [`RetryError::Exhausted`] when the final allowed attempt is still unauthorized.
/// * [`RetryError::RefreshFailed`] when `refresh` fails; no further attempt is made.
/// * [`RetryError::Fatal`] when an attempt fails with [`AttemptError::Fatal`].
#[instrument(skip(op, refresh), fields(max_attempts = config.max_attempts))]
pub async fn retry_with_refresh<T, Op, OpFut, Refresh, RefreshFut>(
    config: &RetryConfig,
    mut op: Op,
    mut refresh: Refresh,
) -> Result<T, RetryError>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, AttemptError>>,
    Refresh: FnMut() -> RefreshFut,
    RefreshFut: Future<Output = Result<(), HandlerError>>,
{
    let mut limiter = RetryLimiter::new(config.clone());
    let mut last_error = String::from("no attempt was made");

    while limiter.can_retry() {
        let delay = limiter.record_attempt();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(e)) => return Err(RetryError::Fatal(e.to_string())),
            Err(AttemptError::Unauthorized(e)) => {
                last_error = e.to_string();
                debug!(attempt = limiter.attempts(), "unauthorized: {last_error}");
            }
        }

        if limiter.can_retry() {
            refresh()
                .await
                .map_err(|e| RetryError::RefreshFailed(e.to_string()))?;
        }
    }

    warn!(
        attempts = limiter.attempts(),
        "retry budget exhausted: {last_error}"
    );
    Err(RetryError::Exhausted {
        attempts: limiter.attempts(),
        last_error,
    })
}
