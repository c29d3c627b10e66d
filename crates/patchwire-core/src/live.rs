//! Runtime counterparts of visual nodes and edges.
//!
//! Everything here is volatile. None of it is serialized or undone; it is
//! rebuilt from the [`GraphDocument`](crate::GraphDocument) whenever the
//! engine starts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use patchwire_catalog::PropertyValue;
use patchwire_host::{AudioContext, HostEdgeId, HostNodeId};

use crate::config::EngineConfig;
use crate::control::ControlId;
use crate::diagnostics::Diagnostics;
use crate::document::{EdgeId, NodeId};
use crate::propagator::{Propagator, RouteId};

/// Opaque handle to an instantiated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveUnit {
    /// A node in the host engine.
    Host(HostNodeId),
    /// A control unit in the propagator.
    Control(ControlId),
}

impl LiveUnit {
    /// Host handle, if this is a host unit.
    pub fn host(self) -> Option<HostNodeId> {
        match self {
            LiveUnit::Host(id) => Some(id),
            LiveUnit::Control(_) => None,
        }
    }

    /// Control handle, if this is a control unit.
    pub fn control(self) -> Option<ControlId> {
        match self {
            LiveUnit::Control(id) => Some(id),
            LiveUnit::Host(_) => None,
        }
    }
}

/// A live unit and the declared property values it was built or patched with.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveNode {
    /// The unit handle.
    pub unit: LiveUnit,
    /// Catalog type name.
    pub type_name: String,
    /// Declared value of every property as last applied.
    pub declared: BTreeMap<String, PropertyValue>,
}

/// Routing kind actually used for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKind {
    /// Host signal pipe (possibly through an analysis tap).
    Signal,
    /// Host signal driving a modulation target.
    Modulation,
    /// Registered with the control propagator.
    Control,
}

/// What a live connection actually created, so it can be reversed exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Routing {
    /// Plain host edge into a signal input.
    Signal {
        /// Host edge.
        edge: HostEdgeId,
    },
    /// Source → analyser tap → output sink.
    Tapped {
        /// Inserted analyser.
        tap: HostNodeId,
        /// Source → tap.
        into_tap: HostEdgeId,
        /// Tap → sink.
        into_sink: HostEdgeId,
    },
    /// Host edge into a modulation target.
    Modulation {
        /// Host edge.
        edge: HostEdgeId,
        /// Target parameter.
        param: String,
    },
    /// Control route in the propagator.
    Control {
        /// Propagator route.
        route: RouteId,
    },
}

impl Routing {
    /// Routing kind of this record.
    pub fn kind(&self) -> RoutingKind {
        match self {
            Routing::Signal { .. } | Routing::Tapped { .. } => RoutingKind::Signal,
            Routing::Modulation { .. } => RoutingKind::Modulation,
            Routing::Control { .. } => RoutingKind::Control,
        }
    }
}

/// Runtime mirror of one visual edge.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConnection {
    /// Visual edge this mirrors.
    pub edge: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Source port.
    pub source_port: String,
    /// Target node.
    pub target: NodeId,
    /// Target port.
    pub target_port: String,
    /// How it was routed.
    pub routing: Routing,
}

impl LiveConnection {
    /// Routing kind used.
    pub fn kind(&self) -> RoutingKind {
        self.routing.kind()
    }

    /// Returns `true` if either endpoint is `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// A buffer source waiting for its audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    /// Visual node.
    pub node: Option<NodeId>,
    /// Host buffer source.
    pub host: HostNodeId,
    /// File to decode.
    pub path: PathBuf,
}

/// The host context plus the control network: everything one running
/// session owns.
#[derive(Debug)]
pub struct LiveEngine {
    pub(crate) context: AudioContext,
    pub(crate) propagator: Propagator,
    pub(crate) deferred: Vec<HostNodeId>,
    pub(crate) pending_loads: Vec<PendingLoad>,
}

impl LiveEngine {
    /// Acquires a fresh context configured from `config`.
    pub fn new(config: &EngineConfig, diagnostics: Diagnostics) -> Self {
        Self {
            context: AudioContext::new(config.context_options()),
            propagator: Propagator::new(config.max_propagation_depth, diagnostics),
            deferred: Vec::new(),
            pending_loads: Vec::new(),
        }
    }

    /// The host context.
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Mutable access to the host context.
    pub fn context_mut(&mut self) -> &mut AudioContext {
        &mut self.context
    }

    /// The control network.
    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Host units whose start is waiting for the context to resume.
    pub fn deferred(&self) -> &[HostNodeId] {
        &self.deferred
    }

    /// Buffer sources waiting for their file.
    pub fn pending_loads(&self) -> &[PendingLoad] {
        &self.pending_loads
    }

    /// Forgets every pending action that refers to `host`.
    pub(crate) fn forget(&mut self, host: HostNodeId) {
        self.deferred.retain(|h| *h != host);
        self.pending_loads.retain(|p| p.host != host);
        self.propagator.forget_host(host);
    }

    /// Closes the context, invalidating every host handle.
    pub(crate) fn close(&mut self) {
        self.context.close();
        self.deferred.clear();
        self.pending_loads.clear();
    }
}
