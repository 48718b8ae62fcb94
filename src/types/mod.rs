//! Core types for the rechenwerk server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (SessionId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for observability and rate limits

mod config;
mod errors;
mod ids;

pub use config::{Config, ObservabilityConfig, ProtocolLimits};
pub use errors::{Error, Result};
pub use ids::SessionId;
