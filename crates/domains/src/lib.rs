//! courtside/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for Courtside.
//! Nothing in here performs I/O: adapters implement the ports, services
//! orchestrate them.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
