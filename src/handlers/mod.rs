//! Formula handlers — the registration table and shared solve scaffolding.
//!
//! Handlers are registered through an explicit table rather than discovered
//! by scanning a module namespace; `ToolRegistry::discover` consumes
//! `builtin_handlers()` at startup.

pub mod geometry;
pub mod pressure;
pub mod solve;

pub use geometry::{KreisUmfangHandler, RechteckHandler};
pub use pressure::KesselformelHandler;

use crate::registry::FormulaHandler;
use std::sync::Arc;

/// The static registration table of every built-in formula handler.
pub fn builtin_handlers() -> Vec<Arc<dyn FormulaHandler>> {
    vec![
        Arc::new(KreisUmfangHandler),
        Arc::new(RechteckHandler),
        Arc::new(KesselformelHandler),
    ]
}
