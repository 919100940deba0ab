//! # Error Types
//!
//! Errors raised while building the variable graph. The graph itself never
//! evaluates anything, so the only failures are wiring failures: variables
//! from a different graph, or handles whose node is gone.

use thiserror::Error;

/// Errors produced by the variable graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A variable was wired into a graph it does not belong to.
    #[error("Variable {name} belongs to a different graph")]
    ForeignVariable { name: String },

    /// The node behind a handle no longer exists.
    #[error("Variable node {index} not found")]
    UnknownVariable { index: usize },
}
