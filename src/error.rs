use std::fmt;

use thiserror::Error;

use crate::config::RouteStrategy;
use crate::graph::Edge;

/// Structural errors: malformed input that aborts the call immediately.
/// Numerical degeneracies are never reported through this type; they are
/// clamped inside the solvers.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no position available for node `{0}`")]
    MissingPosition(String),

    #[error("unknown edge routing strategy `{0}`; expected straight, curved, arced or bundled")]
    UnknownStrategy(String),
}

/// Semantically valid but unsupported conditions. The offending edge is
/// skipped, the warning is surfaced on the routing result, and processing
/// continues for all other edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SelfLoopSkipped { edge: Edge, strategy: RouteStrategy },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SelfLoopSkipped { edge, strategy } => write!(
                f,
                "self-loop ({}, {}) is not supported by {strategy} routing; edge skipped",
                edge.0, edge.1
            ),
        }
    }
}
