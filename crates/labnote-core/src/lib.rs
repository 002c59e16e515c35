//! Core types and trait definitions for the Lab Note Ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod frontmatter;
pub mod hash;
pub mod note;
pub mod proposal;
pub mod revision;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
