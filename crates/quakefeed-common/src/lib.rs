//! quakefeed-common — Shared error types used across all Quakefeed crates.

pub mod error;

pub use error::{QuakefeedError, Result};
