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
#![forbid(unsafe_code)]

//! Courier Macro Library
//!
//! Provides the [`courier_message`] attribute, which turns a plain struct or enum into
//! a typed Courier message.
//!
//! ```ignore
//! #[courier_message(tag = "CREATE_EXPENSE", reply = ExpenseCreated)]
//! pub struct CreateExpense {
//!     pub merchant: String,
//!     pub amount: f64,
//! }
//!
//! // Tag defaults to FETCH_EXPENSES, reply to `()`.
//! #[courier_message]
//! pub struct FetchExpenses;
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr, Type};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta
                    .path
                    .segments
                    .last()
                    .is_some_and(|segment| segment.ident == trait_name)
                {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// `CreateExpense` -> `CREATE_EXPENSE`, `HTTPRequest` -> `HTTP_REQUEST`.
fn screaming_snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }
    out
}

/// Options parsed from `#[courier_message(...)]`.
#[derive(Default)]
struct MessageConfig {
    /// Explicit type tag.
    tag: Option<LitStr>,
    /// Reply type; `()` when absent.
    reply: Option<Type>,
}

impl MessageConfig {
    fn parse(&mut self, meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("tag") {
            self.tag = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("reply") {
            self.reply = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported courier_message option; expected `tag` or `reply`"))
        }
    }
}

/// Turns a struct or enum into a Courier message.
///
/// The attribute:
/// - derives `Clone`, `Debug`, `Serialize` and `Deserialize` where not already derived
/// - implements `courier::CourierMessage` with the given `tag` (default: the type name
///   in `SCREAMING_SNAKE_CASE`) and `reply` type (default: `()`)
/// - asserts at compile time that the type is `Send + Sync + 'static`
///
/// ```ignore
/// #[courier_message(tag = "FETCH_EXPENSES", reply = Vec<Expense>)]
/// pub struct FetchExpenses;
/// ```
///
/// Serde derives added by the attribute use the `serde` re-exported by `courier`, so
/// the using crate does not need its own `serde` dependency.
#[proc_macro_attribute]
pub fn courier_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut config = MessageConfig::default();
    let config_parser = syn::meta::parser(|meta| config.parse(&meta));
    parse_macro_input!(attr with config_parser);

    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let tag = config
        .tag
        .unwrap_or_else(|| LitStr::new(&screaming_snake_case(&name.to_string()), name.span()));
    let reply = config.reply.map_or_else(|| quote!(()), |ty| quote!(#ty));

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        let mut needs_serde_crate = false;
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(::courier::__private::serde::Serialize));
            needs_serde_crate = true;
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(::courier::__private::serde::Deserialize));
            needs_serde_crate = true;
        }
        let serde_crate = if needs_serde_crate {
            quote!(#[serde(crate = "::courier::__private::serde")])
        } else {
            quote!()
        };
        if traits.is_empty() {
            quote!()
        } else {
            quote! {
                #[derive(#(#traits),*)]
                #serde_crate
            }
        }
    };

    let assert_ident = quote::format_ident!("_AssertCourierMessage_{}", name);

    let expanded = quote! {
        #derives
        #input

        impl #impl_generics ::courier::CourierMessage for #name #ty_generics #where_clause {
            const MESSAGE_TYPE: &'static str = #tag;
            type Reply = #reply;
        }

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}
