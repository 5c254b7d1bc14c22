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

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A Rust type that travels over the bus under a fixed type tag.
///
/// The tag must be unique per payload shape across the whole system: two different
/// types must never share one. Implement this with the
/// [`courier_message`](courier_macro::courier_message) attribute rather than by hand:
///
/// ```rust,ignore
/// #[courier_message(tag = "FETCH_EXPENSES", reply = Vec<Expense>)]
/// pub struct FetchExpenses;
/// ```
///
/// Unit structs encode to an absent payload and decode from one.
pub trait CourierMessage: Serialize + DeserializeOwned + Send + Sync + Debug + 'static {
    /// The type tag used as dispatch key.
    const MESSAGE_TYPE: &'static str;

    /// What a handler for this message answers with.
    type Reply: Serialize + DeserializeOwned + Send + Debug + 'static;

    /// Encodes the message as an envelope payload; `None` when it encodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the message cannot be encoded.
    fn to_payload(&self) -> Result<Option<Value>, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Decodes the message from an envelope payload, treating an absent one as `null`.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the payload has the wrong shape.
    fn from_payload(payload: Option<&Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.cloned().unwrap_or(Value::Null))
    }
}
