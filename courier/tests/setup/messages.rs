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

use courier::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored expense as returned by `FETCH_EXPENSES`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub merchant: String,
    pub amount: f64,
    pub currency: String,
}

#[courier_message(tag = "CREATE_EXPENSE", reply = Expense)]
pub struct CreateExpense {
    pub merchant: String,
    pub amount: f64,
    pub currency: String,
}

#[courier_message(tag = "FETCH_EXPENSES", reply = Vec<Expense>)]
pub struct FetchExpenses;

/// Public by prefix: lets a popup hand over a token before any session exists.
#[courier_message(tag = "AUTH_CAPTURE", reply = bool)]
pub struct AuthCapture {
    pub token: String,
}

// No explicit tag: EXPENSES_CHANGED
#[courier_message]
pub struct ExpensesChanged {
    pub count: usize,
}

#[allow(clippy::upper_case_acronyms)]
#[courier_message(reply = u64)]
pub struct HTTPRequestCount;
