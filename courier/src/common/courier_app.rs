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

use tracing::trace;

use crate::common::config::CourierConfig;
use crate::common::CourierRuntime;

/// Entry point for a Courier system.
///
/// ```rust,ignore
/// let mut runtime = CourierApp::launch_async().await;
/// // build routers, clients and broadcasters from `runtime`
/// runtime.shutdown_all().await?;
/// ```
#[derive(Default, Debug, Clone)]
pub struct CourierApp;

impl CourierApp {
    /// Launches a runtime configured from the XDG configuration file.
    pub async fn launch_async() -> CourierRuntime {
        Self::launch()
    }

    /// Launches a runtime configured from the XDG configuration file.
    ///
    /// Nothing is spawned until routers are started or clients connected, so this may
    /// be called outside a Tokio runtime.
    #[must_use]
    pub fn launch() -> CourierRuntime {
        trace!("Starting Courier system initialization");
        let config = CourierConfig::load();
        trace!("Configuration loaded: {:?}", config);
        Self::launch_with(config)
    }

    /// Launches a runtime with an explicit configuration.
    #[must_use]
    pub fn launch_with(config: CourierConfig) -> CourierRuntime {
        CourierRuntime::new(config)
    }
}
