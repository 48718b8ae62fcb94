//! # Rechenwerk Core - Formula Tool Server
//!
//! Tool-serving backend for an LLM-facing calculation server:
//! - Tool registry with discovery from an explicit registration table
//! - Three-stage protocol (list → details → execute) with a per-session
//!   whitelist gate and independent sliding-window rate limits
//! - Tolerant repair of malformed LLM-issued parameters
//! - Unit interpretation ("value unit" strings, SI conversion, human-scaled
//!   display) and the generic solve-for-one-unknown dispatch pattern
//!
//! ## Architecture
//!
//! ```text
//!   LLM caller → DiscoveryProtocol ──> ToolRegistry ──> FormulaHandler
//!                     │                                      │
//!                SessionContext                    units / repair / solve
//!               (whitelist, rate
//!                   windows)
//! ```
//!
//! Every protocol failure returns a structured `Diagnostic` the caller can
//! self-correct from; nothing at that boundary raises.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod repair;
pub mod session;
pub mod types;
pub mod units;

// Internal utilities
pub mod observability;
pub mod validation;

pub use protocol::{Diagnostic, DiagnosticKind, DiscoveryProtocol};
pub use registry::ToolRegistry;
pub use session::SessionContext;
pub use types::{Config, Error, Result};
