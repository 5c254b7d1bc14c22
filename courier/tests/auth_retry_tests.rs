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

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier::auth_retry::{retry_with_refresh, AttemptError, RetryConfig, RetryError, RetryLimiter};
use courier::config::CourierConfig;
use courier::prelude::*;
use courier_test::prelude::*;
use serde_json::json;

use crate::setup::*;

mod setup;

/// A remote API that accepts only the token generation it was told to expect.
#[derive(Debug, Default)]
struct FakeApi {
    calls: AtomicU32,
    refreshes: AtomicU32,
    accepts_after_refreshes: u32,
}

impl FakeApi {
    fn accepting_after(refreshes: u32) -> Arc<Self> {
        Arc::new(Self {
            accepts_after_refreshes: refreshes,
            ..Self::default()
        })
    }

    async fn fetch(&self) -> Result<Vec<String>, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refreshes.load(Ordering::SeqCst) >= self.accepts_after_refreshes {
            Ok(vec!["Acme".to_string()])
        } else {
            Err(AttemptError::Unauthorized("401 Unauthorized".into()))
        }
    }

    async fn refresh(&self) -> Result<(), HandlerError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[courier_test]
async fn test_succeeds_after_one_refresh() -> anyhow::Result<()> {
    initialize_tracing();
    let api = FakeApi::accepting_after(1);

    let merchants = retry_with_refresh(
        &RetryConfig::immediate(3),
        || api.fetch(),
        || api.refresh(),
    )
    .await?;

    assert_eq!(merchants, vec!["Acme".to_string()]);
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    assert_eq!(api.refreshes.load(Ordering::SeqCst), 1);
    Ok(())
}

#[courier_test]
async fn test_gives_up_after_the_attempt_bound() -> anyhow::Result<()> {
    initialize_tracing();
    let api = FakeApi::accepting_after(u32::MAX);

    let err = retry_with_refresh(
        &RetryConfig::immediate(3),
        || api.fetch(),
        || api.refresh(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        RetryError::Exhausted {
            attempts: 3,
            last_error: "401 Unauthorized".into(),
        }
    );
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    // No refresh after the final attempt: nothing would use it.
    assert_eq!(api.refreshes.load(Ordering::SeqCst), 2);
    Ok(())
}

#[courier_test]
async fn test_refresh_failure_stops_retrying() -> anyhow::Result<()> {
    initialize_tracing();
    let api = FakeApi::accepting_after(1);

    let err = retry_with_refresh(
        &RetryConfig::immediate(3),
        || api.fetch(),
        || async { Err::<(), HandlerError>("refresh token revoked".into()) },
    )
    .await
    .unwrap_err();

    assert_eq!(err, RetryError::RefreshFailed("refresh token revoked".into()));
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[courier_test]
async fn test_fatal_errors_are_not_retried() -> anyhow::Result<()> {
    initialize_tracing();
    let calls = AtomicU32::new(0);

    let err = retry_with_refresh(
        &RetryConfig::immediate(3),
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AttemptError::Fatal("500 Internal Server Error".into())) }
        },
        || async { Ok(()) },
    )
    .await
    .unwrap_err();

    assert_eq!(err, RetryError::Fatal("500 Internal Server Error".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[courier_test]
async fn test_backoff_grows_and_is_capped() -> anyhow::Result<()> {
    let mut limiter = RetryLimiter::new(RetryConfig {
        max_attempts: 6,
        initial_backoff_ms: 100,
        max_backoff_ms: 350,
        backoff_multiplier: 2.0,
    });

    let delays: Vec<Duration> = (0..5).map(|_| limiter.record_attempt()).collect();
    assert_eq!(
        delays,
        vec![
            Duration::ZERO,
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(350),
            Duration::from_millis(350),
        ]
    );
    assert!(limiter.can_retry());
    limiter.record_attempt();
    assert!(!limiter.can_retry());
    Ok(())
}

#[courier_test]
async fn test_exhausted_retry_inside_a_handler_is_a_handler_failure() -> anyhow::Result<()> {
    initialize_tracing();
    let api = FakeApi::accepting_after(u32::MAX);
    let handler_api = Arc::clone(&api);

    let mut router = Router::new("background");
    router.register_fn("SYNC_EXPENSES", move |_, _| {
        let api = Arc::clone(&handler_api);
        async move {
            let merchants = retry_with_refresh(
                &RetryConfig::immediate(3),
                || api.fetch(),
                || api.refresh(),
            )
            .await?;
            Ok::<_, HandlerError>(json!(merchants))
        }
    })?;
    let router = router.start();
    let client = Client::connect("popup", LocalTransport::new(router.clone()));

    let err = client.send("SYNC_EXPENSES", None).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::HandlerFailed {
            message_type: "SYNC_EXPENSES".into(),
            cause: "Gave up after 3 attempts: 401 Unauthorized".into(),
        })
    );
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);

    router.stop().await?;
    Ok(())
}

#[courier_test]
async fn test_runtime_retry_uses_configured_attempt_bound() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = CourierConfig::default();
    config.retry = RetryConfig::immediate(2);
    let runtime = CourierApp::launch_with(config);
    assert_eq!(runtime.retry_config().max_attempts, 2);

    let api = FakeApi::accepting_after(u32::MAX);
    let err = runtime
        .retry_with_refresh(|| api.fetch(), || api.refresh())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RetryError::Exhausted {
            attempts: 2,
            last_error: "401 Unauthorized".into(),
        }
    );
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    assert_eq!(api.refreshes.load(Ordering::SeqCst), 1);

    // A token that works after one refresh fits inside the same bound.
    let api = FakeApi::accepting_after(1);
    let merchants = runtime
        .retry_with_refresh(|| api.fetch(), || api.refresh())
        .await?;
    assert_eq!(merchants, vec!["Acme".to_string()]);
    Ok(())
}
