use thiserror::Error;

use crate::topology::{FaceId, VertexId};

/// Errors raised while regularizing faces or editing the topology arena.
#[derive(Debug, Error)]
pub enum RegularizeError {
    /// No point, vertex or curve satisfies the requested tolerances.
    #[error("Tolerance conflict: {0}")]
    ToleranceConflict(String),

    /// A proposed trim configuration fails to close or crosses itself.
    #[error("Topology inconsistency: {0}")]
    TopologyInconsistency(String),

    /// Walking a loop forward never reaches the target vertex.
    #[error("No path from {from:?} to {to:?} along the loop")]
    UnreachablePath { from: VertexId, to: VertexId },

    /// Input loop is not a closed, consistently oriented cycle.
    #[error("Malformed loop: {0}")]
    MalformedLoop(String),

    /// A split did not lower the irregularity of the face.
    #[error("Split of {face:?} did not reduce irregularity ({before} -> {after})")]
    NoProgress {
        face: FaceId,
        before: usize,
        after: usize,
    },

    #[error("Split limit of {0} exceeded")]
    SplitLimitExceeded(usize),

    /// A handle does not resolve in the arena.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error(transparent)]
    Geometry(#[from] anyhow::Error),
}

impl RegularizeError {
    /// Whether a driver may retry, relax or skip the face instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RegularizeError::ToleranceConflict(_)
                | RegularizeError::UnreachablePath { .. }
                | RegularizeError::NoProgress { .. }
        )
    }
}

/// Result type alias using [`RegularizeError`].
pub type Result<T> = std::result::Result<T, RegularizeError>;
