//! # Sanad Support
//!
//! Shared helpers for the Sanad IoC container.
//!
//! This crate provides text rendering for diagnostics: resolution chains,
//! shortened type names and "did you mean" suggestions.

pub mod rendering;
