//! HTTP handlers for all pages and API endpoints.

pub mod dashboard;
pub mod feed;
