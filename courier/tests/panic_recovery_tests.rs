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

//! Panics in handlers and middleware are reported as dispatch failures.
//!
//! These tests use `#[tokio::test]` instead of `#[courier_test]` because the
//! `courier_test` panic hook would fail the test on the panics we trigger on purpose.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use courier::prelude::*;
use serde_json::json;

async fn explode(_: Envelope, _: SenderContext) -> HandlerResult {
    panic!("Intentional test panic in handler");
}

async fn explode_middleware(_: Envelope, _: SenderContext) -> Result<Verdict, MiddlewareError> {
    panic!("Intentional test panic in middleware");
}

#[tokio::test]
async fn test_router_keeps_serving_after_handler_panic() -> anyhow::Result<()> {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);

    let mut router = Router::new("background");
    router.register_fn("PANIC", explode)?;
    router.register_fn("COUNT", move |_, _| {
        let counter = Arc::clone(&counter_clone);
        async move { Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1)) }
    })?;
    let router = router.start();
    let client = Client::connect("popup", LocalTransport::new(router.clone()));

    let err = client.send("PANIC", None).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::HandlerFailed {
            message_type: "PANIC".into(),
            cause: "handler panicked: Intentional test panic in handler".into(),
        })
    );

    assert_eq!(client.send("COUNT", None).await?, json!(1));
    assert_eq!(client.send("COUNT", None).await?, json!(2));
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    client.shutdown().await;
    router.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_middleware_panic_is_a_rejection() -> anyhow::Result<()> {
    let mut router = Router::new("background");
    router.use_fn("flaky", explode_middleware);
    router.register_fn("PING", |_, _| async { Ok(json!("pong")) })?;
    let router = router.start();

    let err = router
        .dispatch(&Envelope::new("PING", None, "popup"), &SenderContext::new("popup"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::MiddlewareRejected {
            middleware_id: "flaky".into(),
            reason: "middleware panicked: Intentional test panic in middleware".into(),
        }
    );

    router.stop().await?;
    Ok(())
}
