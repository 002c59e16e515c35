//! Codec for the on-disk note file format.
//!
//! A note file is an optional front-section fenced by `---` lines — plain
//! `key: value` metadata — followed by the markdown body:
//!
//! ```text
//! ---
//! title: Launch Notes
//! tags: [rocketry, telemetry]
//! status: published
//! ---
//! Body text…
//! ```
//!
//! This crate does no file I/O; it maps text to
//! [`labnote_core::frontmatter::Frontmatter`] + body and nothing else.

pub mod error;
pub mod parse;

pub use error::Error;
pub use parse::{ParsedDocument, parse_note_file};
