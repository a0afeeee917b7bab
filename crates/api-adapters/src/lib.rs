//! # api-adapters
//!
//! The JSON-over-HTTP surface of Courtside, built on axum. Handlers stay thin:
//! authenticate, deserialize, call one service method, map the result.

#[cfg(feature = "web-axum")]
pub mod auth;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod router;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use router::{router, RouterOptions};
#[cfg(feature = "web-axum")]
pub use state::AppState;
pub use metrics::Metrics;
