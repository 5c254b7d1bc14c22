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

use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::common::auth_retry::RetryConfig;
use crate::common::DuplicatePolicy;

/// Configuration for the Courier message bus.
///
/// Loaded from `config.toml` in the XDG configuration directory for `courier`.
/// Every section and field is optional; missing values take their defaults.
///
/// ```toml
/// [timeouts]
/// request_timeout_ms = 5000
///
/// [router]
/// duplicate_policy = "reject_duplicate"
///
/// [auth]
/// public_prefix = "AUTH_"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Channel capacities
    pub limits: LimitsConfig,
    /// Router registration behavior
    pub router: RouterConfig,
    /// Bounded retry for handlers that refresh credentials
    pub retry: RetryConfig,
    /// Authentication middleware defaults
    pub auth: AuthConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a client waits for a reply, in milliseconds. `0` waits forever.
    pub request_timeout_ms: u64,
    /// How long `RouterHandle::stop` waits for in-flight dispatches
    pub router_shutdown_timeout_ms: u64,
    /// How long `CourierRuntime::shutdown_all` waits for everything
    pub system_shutdown_timeout_ms: u64,
}

/// Channel capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Capacity of each router's inbox
    pub router_inbox_capacity: usize,
    /// Capacity of each client's reply channel
    pub reply_channel_capacity: usize,
    /// Capacity of a `ChannelEndpoint` created without an explicit size
    pub endpoint_channel_capacity: usize,
}

/// Router configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Policy applied when a type tag is registered twice
    pub duplicate_policy: DuplicatePolicy,
}

/// Authentication middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Type tags starting with this prefix bypass the authentication check
    pub public_prefix: String,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for log files; logs go to stdout when unset
    pub log_directory: Option<String>,
    /// File name prefix inside `log_directory`
    pub file_name: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            router_shutdown_timeout_ms: 10_000,
            system_shutdown_timeout_ms: 30_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            router_inbox_capacity: 255,
            reply_channel_capacity: 255,
            endpoint_channel_capacity: 64,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_prefix: "AUTH_".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            log_directory: None,
            file_name: "courier.log".to_string(),
        }
    }
}

impl CourierConfig {
    /// Client reply timeout, or `None` when configured to wait forever.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.timeouts.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Router shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn router_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.router_shutdown_timeout_ms)
    }

    /// System shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_timeout_ms)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is malformed or a value has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `courier/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`). If no file is found, or it cannot be read or parsed, the error
    /// is logged and defaults are used.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("courier") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(config_str) => match Self::from_toml_str(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: CourierConfig = CourierConfig::load();
}
