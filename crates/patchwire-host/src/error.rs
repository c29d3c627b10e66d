//! Host engine errors.

use thiserror::Error;

use crate::node::{HostEdgeId, HostNodeId};

/// Errors raised by [`AudioContext`](crate::AudioContext) operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// The specified node was not found in the context.
    #[error("node not found: {0}")]
    NodeNotFound(HostNodeId),

    /// The specified edge was not found in the context.
    #[error("edge not found: {0}")]
    EdgeNotFound(HostEdgeId),

    /// The node has no parameter with this name.
    #[error("{node_type} has no parameter '{param}'")]
    UnknownParam {
        /// Processor type name.
        node_type: &'static str,
        /// Requested parameter.
        param: String,
    },

    /// The node has no field with this name.
    #[error("{node_type} has no field '{field}'")]
    UnknownField {
        /// Processor type name.
        node_type: &'static str,
        /// Requested field.
        field: String,
    },

    /// The field exists but rejected the value.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidFieldValue {
        /// Field name.
        field: String,
        /// Why the value was refused.
        reason: String,
    },

    /// A parameter value was NaN or infinite.
    #[error("non-finite value for parameter '{0}'")]
    NonFiniteParam(String),

    /// `start` called on a source that is already playing.
    #[error("{0} has already been started")]
    AlreadyStarted(HostNodeId),

    /// `stop` called on a source that is not playing.
    #[error("{0} has not been started")]
    NotStarted(HostNodeId),

    /// `start`/`stop` called on a node that is not a source.
    #[error("{0} is not a startable source")]
    NotStartable(HostNodeId),

    /// The operation is structurally invalid (e.g. connecting out of the destination).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The context has been closed.
    #[error("audio context is closed")]
    ContextClosed,

    /// Rendering requires a running context.
    #[error("audio context is not running")]
    NotRunning,

    /// Audio data could not be decoded.
    #[error("failed to decode audio data: {0}")]
    Decode(String),
}

impl From<hound::Error> for HostError {
    fn from(err: hound::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_ids() {
        let err = HostError::AlreadyStarted(HostNodeId(3));
        assert_eq!(err.to_string(), "HostNodeId(3) has already been started");
        let err = HostError::UnknownParam {
            node_type: "Gain",
            param: "cutoff".to_string(),
        };
        assert_eq!(err.to_string(), "Gain has no parameter 'cutoff'");
    }
}
