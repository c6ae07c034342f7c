//! Shared types for the Little Latte Lane ordering backend
//!
//! Error codes, response envelopes, domain models and the live order
//! protocol used by lane-server and its clients.

pub mod error;
pub mod live;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
