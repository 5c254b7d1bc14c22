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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use courier::auth_retry::AttemptError;
use courier::middleware::{AuthProvider, LoggingMiddleware};
use courier::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// --- Messages ---

/// A stored expense.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Expense {
    id: u64,
    merchant: String,
    amount: f64,
    currency: String,
}

#[courier_message(tag = "CREATE_EXPENSE", reply = Expense)]
struct CreateExpense {
    merchant: String,
    amount: f64,
    currency: String,
}

#[courier_message(tag = "FETCH_EXPENSES", reply = Vec<Expense>)]
struct FetchExpenses;

/// Hands an OAuth token from the popup to the background.
#[courier_message(tag = "AUTH_CAPTURE", reply = bool)]
struct AuthCapture {
    token: String,
}

/// Broadcast to every open view after the store changes.
#[courier_message]
struct ExpensesChanged {
    count: usize,
}

// --- Background state ---

#[derive(Debug, Default)]
struct Session {
    authenticated: AtomicBool,
    // The remote store rejects the first call after sign-in until the token is refreshed.
    token_fresh: AtomicBool,
}

#[async_trait]
impl AuthProvider for Session {
    async fn is_authenticated(&self) -> Result<bool, MiddlewareError> {
        Ok(self.authenticated.load(Ordering::SeqCst))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Launch the runtime and install logging from its configuration.
    let runtime = CourierApp::launch_async().await;
    let _guard = courier::logging::init(&runtime.config().logging);

    let session = Arc::new(Session::default());
    let expenses = Arc::new(Mutex::new(Vec::<Expense>::new()));

    // 2. Every open view is a broadcast endpoint.
    let (sidepanel, mut sidepanel_rx) = runtime.channel_endpoint("sidepanel");
    runtime.endpoints().register(sidepanel);
    let broadcaster = runtime.broadcaster("background");

    // 3. Build the background router: logging first, then the auth gate.
    let mut background = runtime.new_router("background");
    background
        .use_middleware(LoggingMiddleware)
        .use_middleware(runtime.auth_middleware(Arc::clone(&session)));

    let capture_session = Arc::clone(&session);
    background.on::<AuthCapture, _, _>(move |capture, _sender| {
        let session = Arc::clone(&capture_session);
        async move {
            let accepted = !capture.token.is_empty();
            session.authenticated.store(accepted, Ordering::SeqCst);
            Ok(accepted)
        }
    })?;

    let create_store = Arc::clone(&expenses);
    let create_broadcaster = broadcaster.clone();
    background.on::<CreateExpense, _, _>(move |request, _sender| {
        let store = Arc::clone(&create_store);
        let broadcaster = create_broadcaster.clone();
        async move {
            let (expense, count) = {
                let mut store = store.lock();
                let expense = Expense {
                    id: store.len() as u64 + 1,
                    merchant: request.merchant,
                    amount: request.amount,
                    currency: request.currency,
                };
                store.push(expense.clone());
                (expense, store.len())
            };
            broadcaster
                .broadcast_message(&ExpensesChanged { count })
                .await?;
            Ok::<_, HandlerError>(expense)
        }
    })?;

    // Fetching goes through the remote store, refreshing the token within the
    // runtime's retry limits when it is rejected.
    let fetch_store = Arc::clone(&expenses);
    let fetch_session = Arc::clone(&session);
    let fetch_runtime = runtime.clone();
    background.on::<FetchExpenses, _, _>(move |_request, _sender| {
        let store = Arc::clone(&fetch_store);
        let session = Arc::clone(&fetch_session);
        let runtime = fetch_runtime.clone();
        async move {
            let (store, session) = (&store, &session);
            let list = runtime
                .retry_with_refresh(
                    || async move {
                        if session.token_fresh.load(Ordering::SeqCst) {
                            Ok(store.lock().clone())
                        } else {
                            Err(AttemptError::Unauthorized("401 Unauthorized".into()))
                        }
                    },
                    || async move {
                        println!("Refreshing token");
                        session.token_fresh.store(true, Ordering::SeqCst);
                        Ok(())
                    },
                )
                .await?;
            Ok::<_, HandlerError>(list)
        }
    })?;

    let background = runtime.start_router(background);

    // 4. The popup talks to the background through a client.
    let popup = runtime.local_client("popup", &background);

    match popup.send_message(&FetchExpenses).await {
        Ok(list) => println!("Unexpected: fetched {} expenses without a session", list.len()),
        Err(e) => println!("Before sign-in: {e}"),
    }

    let accepted = popup
        .send_message(&AuthCapture {
            token: "ya29.demo-token".to_string(),
        })
        .await?;
    println!("Token accepted: {accepted}");

    for (merchant, amount) in [("Acme", 12.5), ("Globex", 40.0)] {
        let expense = popup
            .send_message(&CreateExpense {
                merchant: merchant.to_string(),
                amount,
                currency: "USD".to_string(),
            })
            .await?;
        println!("Created expense #{} at {}", expense.id, expense.merchant);
    }

    for expense in popup.send_message(&FetchExpenses).await? {
        println!("  {:>3} {:<10} {:>8.2} {}", expense.id, expense.merchant, expense.amount, expense.currency);
    }

    // 5. The sidepanel saw one change notification per creation.
    while let Ok(envelope) = sidepanel_rx.try_recv() {
        let change: ExpensesChanged = envelope.decode()?;
        println!("Sidepanel notified: {} expenses stored", change.count);
    }

    // 6. Shut everything down.
    runtime.shutdown_all().await?;
    Ok(())
}
