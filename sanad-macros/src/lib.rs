//! # Sanad Macros
//!
//! `#[derive(Injectable)]` generates the constructor metadata the
//! resolver needs from a struct's fields.
//!
//! | field type      | parameter                       |
//! |-----------------|---------------------------------|
//! | `Arc<T>`        | one instance of contract `T`    |
//! | `Vec<Arc<T>>`   | every implementation of `T`     |
//!
//! ```ignore
//! use std::sync::Arc;
//! use sanad::Injectable;
//!
//! #[derive(Injectable)]
//! struct Newsletter {
//!     mailer: Arc<dyn Mailer>,
//!     hooks: Vec<Arc<dyn SendHook>>,
//! }
//! ```

#![forbid(unsafe_code)]

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod injectable;

/// Derive macro for the `Injectable` trait.
///
/// Every field must be `Arc<T>` or `Vec<Arc<T>>`; the generated
/// constructor declares one parameter per field, in field order.
///
/// # Attributes
///
/// - `#[injectable(crate = "path")]`: path to the `sanad` crate
///   (default: `::sanad`). Use `"::sanad_container"` when depending on the
///   container crate directly.
#[proc_macro_derive(Injectable, attributes(injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(darling::Error::write_errors)
        .into()
}
