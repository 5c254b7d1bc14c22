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

//! The expense tracker flow end to end: a popup client talking to the background
//! router, which gates everything but `AUTH_*` messages behind a session.

use std::sync::Arc;

use courier::prelude::*;
use courier_test::prelude::*;
use serde_json::json;

use crate::setup::*;

mod setup;

#[courier_test]
async fn test_expense_tracker_flow() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let store = ExpenseStore::default();
    let session = Arc::new(Session::default());
    let background = runtime.start_router(expense_router(&runtime, &store, &session)?);
    let popup = runtime.local_client("popup", &background);

    // Unknown types are reported, not dropped.
    let err = popup.send("UNKNOWN_TYPE", None).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::NoHandlerRegistered {
            message_type: "UNKNOWN_TYPE".into()
        })
    );

    // Without a session the auth middleware blocks gated types before any handler runs.
    let err = popup.send_message(&FetchExpenses).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Dispatch(DispatchError::MiddlewareRejected {
            middleware_id: "auth".into(),
            reason: "not authenticated".into(),
        })
    );

    // AUTH_* types are public, so the popup can hand over a token.
    assert!(
        popup
            .send_message(&AuthCapture {
                token: "ya29.token".into()
            })
            .await?
    );

    let created = popup
        .send(
            "CREATE_EXPENSE",
            Some(json!({ "merchant": "Acme", "amount": 12.5, "currency": "USD" })),
        )
        .await?;
    assert_eq!(
        created,
        json!({ "id": 1, "merchant": "Acme", "amount": 12.5, "currency": "USD" })
    );

    popup
        .send_message(&CreateExpense {
            merchant: "Globex".into(),
            amount: 40.0,
            currency: "EUR".into(),
        })
        .await?;

    let expenses = popup.send_message(&FetchExpenses).await?;
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].merchant, "Acme");
    assert_eq!(expenses[1].currency, "EUR");
    assert_eq!(store.len(), 2);

    // Losing the session gates the store again.
    session.set(false);
    assert!(popup.send_message(&FetchExpenses).await.is_err());

    runtime.shutdown_all().await?;
    Ok(())
}

#[courier_test]
async fn test_malformed_payload_fails_in_the_handler() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let store = ExpenseStore::default();
    let session = Arc::new(Session::default());
    session.set(true);
    let background = runtime.start_router(expense_router(&runtime, &store, &session)?);
    let popup = runtime.local_client("popup", &background);

    let err = popup
        .send("CREATE_EXPENSE", Some(json!({ "merchant": "Acme" })))
        .await
        .unwrap_err();
    match err {
        ClientError::Dispatch(DispatchError::HandlerFailed { message_type, cause }) => {
            assert_eq!(message_type, "CREATE_EXPENSE");
            assert!(cause.contains("amount"), "cause names the missing field: {cause}");
        }
        other => panic!("expected HandlerFailed, got {other:?}"),
    }
    assert_eq!(store.len(), 0);

    runtime.shutdown_all().await?;
    Ok(())
}

#[courier_test]
async fn test_many_tabs_share_one_background_router() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = test_runtime();
    let store = ExpenseStore::default();
    let session = Arc::new(Session::default());
    session.set(true);
    let background = runtime.start_router(expense_router(&runtime, &store, &session)?);

    let tabs: Vec<Client> = (0..8)
        .map(|tab| runtime.local_client(format!("tab-{tab}"), &background))
        .collect();
    let creations = tabs.iter().map(|tab| async move {
        tab.send_message(&CreateExpense {
            merchant: tab.source().to_string(),
            amount: 1.0,
            currency: "USD".into(),
        })
        .await
    });
    let created = futures::future::try_join_all(creations).await?;

    let mut ids: Vec<u64> = created.iter().map(|expense| expense.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    assert_eq!(store.all().len(), 8);

    runtime.shutdown_all().await?;
    Ok(())
}
