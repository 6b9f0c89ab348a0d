//! quakefeed-test-utils — Shared testing utilities for the Quakefeed workspace.
//!
//! - `fixtures`: JSON bodies in the `/predict_data` wire format
//! - `server`: an in-process prediction service on an ephemeral port

pub mod fixtures;
pub mod server;

pub use server::{Behaviour, MockPredictionServer, Simulator};
