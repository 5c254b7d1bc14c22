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

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::common::config::LoggingConfig;

/// Installs a global `tracing` subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.filter`. With `log_directory` set, output
/// goes to a daily-rotated file there and the returned guard must be kept alive to
/// flush it; otherwise output goes to stdout and `None` is returned.
///
/// Installing a second subscriber is a no-op, so calling this more than once is safe.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NONE)
        .compact();

    match &config.log_directory {
        Some(directory) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .ok()
                .map(|()| guard)
        }
        None => {
            let _ = builder.try_init();
            None
        }
    }
}
