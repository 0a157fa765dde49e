//! Derive macros for Sanad.
//!
//! Re-exported by the `sanad` facade; depend on that instead.

pub use sanad_macros::Injectable;
