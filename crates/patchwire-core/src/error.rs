//! Error types for the runtime synchronization engine.
//!
//! Every failure here is local: it means one unit, edge or property did not
//! apply, and the rest of the graph stays usable.

use std::fmt;
use std::path::PathBuf;

use patchwire_host::HostError;
use thiserror::Error;

use crate::document::{EdgeId, NodeId};

/// Errors loading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field holds an unusable value
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// The factory could not build a unit.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The catalog has no such type.
    #[error("unknown unit type: {0}")]
    UnknownType(String),

    /// The catalog knows the type but nothing can construct it.
    #[error("unsupported unit type: {0} (no constructor)")]
    UnsupportedType(String),

    /// The host engine failed during construction.
    #[error("host failed to construct {type_name}: {source}")]
    Host {
        /// Type being constructed.
        type_name: String,
        /// Underlying host error.
        #[source]
        source: HostError,
    },
}

/// Which side of a unit a port is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// Declared inputs (and modulation targets).
    Input,
    /// Declared outputs.
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        })
    }
}

/// A connection was rejected.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// An endpoint does not exist in the document.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// A named port does not exist on the endpoint's unit type.
    #[error("{unit} has no {direction} port '{port}'")]
    UnknownPort {
        /// Unit type name.
        unit: String,
        /// Requested port.
        port: String,
        /// Side the port was looked up on.
        direction: PortDirection,
    },

    /// A control output cannot drive a signal input.
    #[error("cannot connect control output '{source_port}' to signal input '{target_port}'")]
    IncompatiblePorts {
        /// Source port name.
        source_port: String,
        /// Target port name.
        target_port: String,
    },

    /// The same ports are already connected.
    #[error("{from}.{from_port} is already connected to {to}.{to_port}")]
    Duplicate {
        /// Source node.
        from: NodeId,
        /// Source port.
        from_port: String,
        /// Target node.
        to: NodeId,
        /// Target port.
        to_port: String,
    },

    /// An endpoint has no live unit while the engine is running.
    #[error("{0} has no live unit")]
    NotLive(NodeId),

    /// The host engine refused the connection.
    #[error("host refused connection: {0}")]
    Host(#[from] HostError),
}

/// A property update was rejected or could not be applied.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The unit type declares no such property.
    #[error("{unit} has no property '{property}'")]
    NotFound {
        /// Unit type name.
        unit: String,
        /// Requested property.
        property: String,
    },

    /// The value could not be used as given.
    #[error("invalid value for '{property}': {reason}")]
    Validation {
        /// Property name.
        property: String,
        /// What is wrong.
        reason: String,
    },

    /// A modulation target was given NaN or an infinity.
    #[error("non-finite value for modulation target '{property}'")]
    NonFinite {
        /// Property name.
        property: String,
    },

    /// The host engine refused the value.
    #[error("host refused property update: {0}")]
    Host(#[from] HostError),
}

/// A mutation could not be applied to a document.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The path does not address anything in a document.
    #[error("invalid patch path: {0}")]
    InvalidPath(String),

    /// An index in the path is past the end of its list.
    #[error("index {index} out of range for '{path}' (len {len})")]
    IndexOutOfRange {
        /// Full path.
        path: String,
        /// Offending index.
        index: usize,
        /// List length at the time.
        len: usize,
    },

    /// An add or replace without a value.
    #[error("mutation at '{0}' requires a value")]
    MissingValue(String),

    /// The value does not deserialize into the addressed type.
    #[error("invalid value at '{path}': {source}")]
    InvalidValue {
        /// Full path.
        path: String,
        /// Deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error of the structural mutation API.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Unit construction failed.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Connection rejected.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Property update rejected.
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Patch application failed.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Host engine failure outside a unit boundary (e.g. rendering).
    #[error(transparent)]
    Host(#[from] HostError),

    /// No node with this ID.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// No edge with this ID.
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// The operation needs a running engine.
    #[error("engine is not running")]
    NotRunning,

    /// A loaded document uses the same node ID twice.
    #[error("duplicate node ID in document: {0}")]
    DuplicateNode(NodeId),

    /// A loaded document uses the same edge ID twice.
    #[error("duplicate edge ID in document: {0}")]
    DuplicateEdge(EdgeId),

    /// No identifier is left to hand out.
    #[error("{kind} IDs exhausted")]
    IdsExhausted {
        /// `"node"` or `"edge"`.
        kind: &'static str,
    },

    /// A stimulus does not fit the addressed unit.
    #[error("cannot stimulate {node}: {reason}")]
    InvalidStimulus {
        /// Addressed node.
        node: NodeId,
        /// Why the stimulus does not apply.
        reason: String,
    },

    /// Document JSON could not be read or written.
    #[error("document JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A document file could not be read or written.
    #[error("document I/O error at '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
