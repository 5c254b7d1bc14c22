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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier::prelude::*;
use courier_test::prelude::*;
use serde_json::json;
use tokio::sync::{mpsc, Notify};

use crate::setup::*;

mod setup;

#[courier_test]
async fn test_unregistered_type_yields_no_handler_registered() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let mut router = runtime.new_router("background");
    router.register_fn("PING", |_, _| async { Ok(json!("pong")) })?;
    let router = runtime.start_router(router);
    let client = runtime.local_client("popup", &router);

    let err = client.send("UNKNOWN_TYPE", None).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::NoHandlerRegistered {
            message_type: "UNKNOWN_TYPE".into()
        })
    );

    runtime.shutdown_all().await?;
    Ok(())
}

#[courier_test]
async fn test_handler_error_becomes_handler_failed() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let mut router = runtime.new_router("background");
    router.register_fn("FAIL", |_, _| async {
        Err(HandlerError::from("storage offline"))
    })?;
    let router = runtime.start_router(router);
    let client = runtime.local_client("popup", &router);

    let err = client.send("FAIL", None).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::HandlerFailed {
            message_type: "FAIL".into(),
            cause: "storage offline".into()
        })
    );

    runtime.shutdown_all().await?;
    Ok(())
}

#[courier_test]
async fn test_reply_carries_request_id_of_request() -> anyhow::Result<()> {
    initialize_tracing();
    let mut router = Router::new("background");
    router.register_fn("ECHO", |envelope, _| async move {
        Ok(envelope.payload().cloned().unwrap_or_default())
    })?;
    let router = router.start();

    let (reply_tx, mut reply_rx) = mpsc::channel(4);
    let request_id = RequestId::new("tab-7-42");
    let envelope = Envelope::request(
        "ECHO",
        Some(json!({ "hello": "world" })),
        "tab-7",
        request_id.clone(),
    );
    router
        .post(Inbound::request(envelope, SenderContext::new("tab-7"), reply_tx))
        .await?;

    let reply = reply_rx.recv().await.expect("reply should arrive");
    assert_eq!(reply.request_id(), &request_id);
    assert_eq!(reply.source(), "background");
    assert_eq!(reply.into_result()?, json!({ "hello": "world" }));

    router.stop().await?;
    Ok(())
}

#[courier_test]
async fn test_notifications_are_dispatched_without_reply() -> anyhow::Result<()> {
    initialize_tracing();
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = Arc::clone(&seen);

    let mut router = Router::new("sidepanel");
    router.register_fn("EXPENSES_CHANGED", move |_, _| {
        let seen = Arc::clone(&seen_clone);
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::Value::Null)
        }
    })?;
    let router = router.start();

    let envelope = Envelope::new("EXPENSES_CHANGED", None, "background");
    router
        .post(Inbound::notification(envelope, SenderContext::new("background")))
        .await?;

    // stop drains the inbox, so the notification has been handled afterwards
    router.stop().await?;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    Ok(())
}

#[courier_test(timeout_ms = 5000)]
async fn test_dispatches_run_concurrently() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let gate = Arc::new(Notify::new());

    let mut router = runtime.new_router("background");
    let wait_gate = Arc::clone(&gate);
    router.register_fn("WAIT", move |_, _| {
        let gate = Arc::clone(&wait_gate);
        async move {
            gate.notified().await;
            Ok(json!("released"))
        }
    })?;
    let open_gate = Arc::clone(&gate);
    router.register_fn("OPEN", move |_, _| {
        let gate = Arc::clone(&open_gate);
        async move {
            gate.notify_one();
            Ok(json!("opened"))
        }
    })?;
    let router = runtime.start_router(router);
    let client = runtime.local_client("popup", &router);

    // WAIT only completes if OPEN is dispatched while WAIT is still in flight.
    let waiting = client.request("WAIT", None).await?;
    assert_eq!(client.send("OPEN", None).await?, json!("opened"));
    assert_eq!(waiting.wait().await?, json!("released"));

    runtime.shutdown_all().await?;
    Ok(())
}

#[courier_test]
async fn test_stop_drains_queued_envelopes_then_refuses_new_ones() -> anyhow::Result<()> {
    initialize_tracing();
    let handled = Arc::new(AtomicUsize::new(0));
    let handled_clone = Arc::clone(&handled);

    let mut router = Router::new("background");
    router.register_fn("WORK", move |_, _| {
        let handled = Arc::clone(&handled_clone);
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handled.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::Value::Null)
        }
    })?;
    let router = router.start();

    for _ in 0..5 {
        router
            .post(Inbound::notification(
                Envelope::new("WORK", None, "test"),
                SenderContext::new("test"),
            ))
            .await?;
    }
    router.stop().await?;
    assert_eq!(handled.load(Ordering::SeqCst), 5);
    assert!(router.is_stopping());

    let err = router
        .post(Inbound::notification(
            Envelope::new("WORK", None, "test"),
            SenderContext::new("test"),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Unreachable("background".into()));
    Ok(())
}

#[courier_test]
async fn test_direct_dispatch_and_introspection() -> anyhow::Result<()> {
    initialize_tracing();
    let mut router = Router::new("background");
    router
        .register_fn("A", |_, _| async { Ok(json!("a")) })?
        .register_fn("B", |_, _| async { Ok(json!("b")) })?;
    router.use_fn("noop", |_, _| async { Ok(Verdict::Continue) });
    let router = router.start();

    assert_eq!(router.id(), "background");
    assert!(router.router().handles("A"));
    assert!(!router.router().handles("C"));
    assert_eq!(router.router().handler_count(), 2);
    assert_eq!(router.router().middleware_ids(), vec!["noop"]);

    let value = router
        .dispatch(&Envelope::new("B", None, "test"), &SenderContext::new("test"))
        .await?;
    assert_eq!(value, json!("b"));

    router.stop().await?;
    Ok(())
}

#[courier_test]
async fn test_message_tags_from_attribute() -> anyhow::Result<()> {
    assert_eq!(CreateExpense::MESSAGE_TYPE, "CREATE_EXPENSE");
    assert_eq!(ExpensesChanged::MESSAGE_TYPE, "EXPENSES_CHANGED");
    assert_eq!(HTTPRequestCount::MESSAGE_TYPE, "HTTP_REQUEST_COUNT");

    // Unit messages travel without a payload.
    let envelope = Envelope::from_message(&FetchExpenses, "popup")?;
    assert_eq!(envelope.message_type(), "FETCH_EXPENSES");
    assert!(envelope.payload().is_none());
    let _decoded: FetchExpenses = envelope.decode()?;
    Ok(())
}
