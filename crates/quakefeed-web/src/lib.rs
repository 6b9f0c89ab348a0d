//! quakefeed-web — Render adapter for the live prediction feed.
//! Provides:
//!   - Summary page (latest prediction, MAE, recent predictions, toggle)
//!   - JSON snapshot of the feed for map renderers
//!   - Toggle endpoint
//!   - SSE stream of feed events

pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
