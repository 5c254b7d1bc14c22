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

use courier::config::CourierConfig;
use courier::middleware::AuthProvider;
use courier::prelude::*;
use parking_lot::Mutex;

use super::messages::{AuthCapture, CreateExpense, Expense, FetchExpenses};

/// In-memory expense storage shared with the handlers that use it.
#[derive(Debug, Default, Clone)]
pub struct ExpenseStore {
    expenses: Arc<Mutex<Vec<Expense>>>,
}

impl ExpenseStore {
    pub fn insert(&self, request: CreateExpense) -> Expense {
        let mut expenses = self.expenses.lock();
        let expense = Expense {
            id: expenses.len() as u64 + 1,
            merchant: request.merchant,
            amount: request.amount,
            currency: request.currency,
        };
        expenses.push(expense.clone());
        expense
    }

    pub fn all(&self) -> Vec<Expense> {
        self.expenses.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.expenses.lock().len()
    }
}

/// Session flag flipped by `AUTH_CAPTURE`.
#[derive(Debug, Default)]
pub struct Session {
    authenticated: AtomicBool,
}

impl Session {
    pub fn set(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for Session {
    async fn is_authenticated(&self) -> Result<bool, MiddlewareError> {
        Ok(self.authenticated.load(Ordering::SeqCst))
    }
}

/// A runtime with short timeouts and defaults everywhere else.
pub fn test_runtime() -> CourierRuntime {
    let mut config = CourierConfig::default();
    config.timeouts.request_timeout_ms = 2_000;
    config.timeouts.router_shutdown_timeout_ms = 2_000;
    config.timeouts.system_shutdown_timeout_ms = 5_000;
    CourierApp::launch_with(config)
}

/// The background router of the expense tracker: auth-gated, with create, fetch and
/// token capture handlers.
pub fn expense_router(
    runtime: &CourierRuntime,
    store: &ExpenseStore,
    session: &Arc<Session>,
) -> anyhow::Result<Router<Idle>> {
    let mut router = runtime.new_router("background");
    router.use_middleware(runtime.auth_middleware(Arc::clone(session)));

    let create_store = store.clone();
    router.on::<CreateExpense, _, _>(move |request, _sender| {
        let store = create_store.clone();
        async move { Ok(store.insert(request)) }
    })?;

    let fetch_store = store.clone();
    router.on::<FetchExpenses, _, _>(move |_request, _sender| {
        let store = fetch_store.clone();
        async move { Ok(store.all()) }
    })?;

    let capture_session = Arc::clone(session);
    router.on::<AuthCapture, _, _>(move |capture, _sender| {
        let session = Arc::clone(&capture_session);
        async move {
            let accepted = !capture.token.is_empty();
            session.set(accepted);
            Ok(accepted)
        }
    })?;

    Ok(router)
}
