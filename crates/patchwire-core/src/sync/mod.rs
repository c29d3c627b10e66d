//! Graph Runtime Synchronizer.
//!
//! Owns the authoritative [`GraphDocument`] and, while running, a projection
//! of it onto a live engine. The projection is never a second source of
//! truth: every structural operation writes the document first (as a
//! recorded [`Mutation`]) and then performs the matching local live
//! operation. Undo and redo rewrite the document and reconcile.
//!
//! ```text
//!            add / remove / connect / update
//!   caller ──────────────────────────────────▶ GraphDocument ──▶ UndoHistory
//!                                                   │
//!                                  start / reconcile │
//!                                                   ▼
//!                          Projection { LiveEngine, units, connections }
//! ```

mod playback;
mod projection;

use std::collections::BTreeSet;
use std::path::Path;

use patchwire_catalog::{Catalog, PropertyValue, UnitSpec};
use patchwire_host::HostError;

use crate::config::EngineConfig;
use crate::diagnostics::{Category, Diagnostic, Diagnostics};
use crate::document::{EdgeId, GraphDocument, NodeId, Position, VisualEdge, VisualNode};
use crate::error::{ConnectionError, FactoryError, GraphError};
use crate::factory::UnitFactory;
use crate::history::UndoHistory;
use crate::patch::Mutation;
use crate::properties::{PropertyUpdateEngine, UpdateOutcome};
use crate::router::ConnectionRouter;

pub use playback::PlayState;
use projection::Projection;

/// The collaborators every synchronizer operation needs.
#[derive(Debug)]
pub(crate) struct Services {
    pub(crate) factory: UnitFactory,
    pub(crate) router: ConnectionRouter,
    pub(crate) properties: PropertyUpdateEngine,
    pub(crate) diagnostics: Diagnostics,
}

/// Keeps a declarative graph, its undo history and its live projection
/// consistent.
///
/// # Example
///
/// ```rust
/// use patchwire_core::{GraphSynchronizer, PlayState, Position};
///
/// let mut sync = GraphSynchronizer::default();
/// let osc = sync.add_node("Oscillator", Position::new(0.0, 0.0)).unwrap();
/// let out = sync.add_node("AudioDestination", Position::new(200.0, 0.0)).unwrap();
/// sync.add_edge(osc, out, "output", "input").unwrap();
///
/// sync.start();
/// assert_eq!(sync.play_state(), PlayState::Audible);
/// assert_eq!(sync.live_connection_count(), 1);
///
/// sync.undo();
/// assert_eq!(sync.play_state(), PlayState::Inaudible);
/// ```
#[derive(Debug)]
pub struct GraphSynchronizer {
    catalog: Catalog,
    config: EngineConfig,
    services: Services,
    document: GraphDocument,
    next_node: u32,
    next_edge: u32,
    history: UndoHistory,
    projection: Option<Projection>,
    play_state: PlayState,
}

impl Default for GraphSynchronizer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GraphSynchronizer {
    /// Creates a stopped synchronizer over the built-in catalog.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_catalog(Catalog::new(), config)
    }

    /// Creates a stopped synchronizer over a custom catalog.
    pub fn with_catalog(catalog: Catalog, config: EngineConfig) -> Self {
        let diagnostics = Diagnostics::new();
        let services = Services {
            factory: UnitFactory::new(&catalog, &config, diagnostics.clone()),
            router: ConnectionRouter::new(),
            properties: PropertyUpdateEngine::new(diagnostics.clone()),
            diagnostics,
        };
        Self {
            history: UndoHistory::new(config.history_depth),
            catalog,
            config,
            services,
            document: GraphDocument::new(),
            next_node: 0,
            next_edge: 0,
            projection: None,
            play_state: PlayState::Stopped,
        }
    }

    /// The unit catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The declarative graph.
    pub fn document(&self) -> &GraphDocument {
        &self.document
    }

    /// Shared handle to the diagnostics channel.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.services.diagnostics
    }

    /// Removes and returns every pending diagnostic.
    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        self.services.diagnostics.drain()
    }

    /// Undo/redo stacks.
    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Returns `true` while a live projection exists.
    pub fn is_running(&self) -> bool {
        self.projection.is_some()
    }

    // --- Structural mutations ---

    /// Adds a node of `type_name` with every property at its default.
    ///
    /// While running, the unit is instantiated first; if that fails nothing
    /// is committed.
    pub fn add_node(&mut self, type_name: &str, position: Position) -> Result<NodeId, GraphError> {
        let Some(meta) = self.catalog.get(type_name).cloned() else {
            let err = FactoryError::UnknownType(type_name.to_string());
            return Err(self.reject(Category::Factory, None, "node not added", err));
        };
        if let Err(err) = self.services.factory.can_instantiate(&meta) {
            return Err(self.reject(Category::Factory, None, "node not added", err));
        }

        let id = NodeId(self.next_node);
        let next = self
            .next_node
            .checked_add(1)
            .ok_or(GraphError::IdsExhausted { kind: "node" })?;
        let node = VisualNode {
            id,
            type_name: meta.name.clone(),
            position,
            properties: default_properties(&meta),
            metadata: meta,
        };
        let value = serde_json::to_value(&node)?;

        if let Some(projection) = self.projection.as_mut()
            && let Err(err) = projection.instantiate(&self.services, &node)
        {
            return Err(self.reject(Category::Factory, Some(id), "node not added", err));
        }

        self.next_node = next;
        let path = Mutation::node_path(self.document.nodes.len());
        self.commit(Mutation::add(path.clone(), value), Mutation::remove(path))?;
        tracing::debug!("graph_add: {id} ({type_name})");
        self.refresh_play_state();
        Ok(id)
    }

    /// Removes a node together with every edge touching it, as one undoable
    /// step.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.document.node(id).is_none() {
            return Err(GraphError::NodeNotFound(id));
        }
        self.history.begin_batch();
        let result = self.remove_node_inner(id);
        self.history.end_batch();
        result?;
        tracing::debug!("graph_remove: {id}");
        self.refresh_play_state();
        Ok(())
    }

    fn remove_node_inner(&mut self, id: NodeId) -> Result<(), GraphError> {
        let touching: Vec<EdgeId> = self.document.edges_touching(id).map(|e| e.id).collect();
        for edge in touching {
            self.remove_edge_inner(edge)?;
        }
        if let Some(projection) = self.projection.as_mut() {
            projection.teardown(&self.services, id);
        }
        let index = self
            .document
            .node_index(id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let value = serde_json::to_value(&self.document.nodes[index])?;
        let path = Mutation::node_path(index);
        self.commit(Mutation::remove(path.clone()), Mutation::add(path, value))
    }

    /// Connects two ports.
    ///
    /// Ports and kinds are validated on metadata before anything else; while
    /// running, a host failure rolls the edge back.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        source_port: &str,
        target_port: &str,
    ) -> Result<EdgeId, GraphError> {
        if let Err(err) = self.check_edge(source, target, source_port, target_port) {
            return Err(self.reject(Category::Connection, Some(target), "edge not added", err));
        }
        let next = self
            .next_edge
            .checked_add(1)
            .ok_or(GraphError::IdsExhausted { kind: "edge" })?;
        let edge = VisualEdge {
            id: EdgeId(self.next_edge),
            source,
            target,
            source_port: source_port.to_string(),
            target_port: target_port.to_string(),
        };
        let value = serde_json::to_value(&edge)?;

        if let Some(projection) = self.projection.as_mut()
            && let Err(err) = projection.connect(&self.services, &self.document, &edge)
        {
            return Err(self.reject(Category::Connection, Some(target), "edge not added", err));
        }

        self.next_edge = next;
        let path = Mutation::edge_path(self.document.edges.len());
        self.commit(Mutation::add(path.clone(), value), Mutation::remove(path))?;
        tracing::debug!(
            "graph_connect: {} {source}.{source_port} → {target}.{target_port}",
            edge.id
        );
        self.refresh_play_state();
        Ok(edge.id)
    }

    fn check_edge(
        &self,
        source: NodeId,
        target: NodeId,
        source_port: &str,
        target_port: &str,
    ) -> Result<(), ConnectionError> {
        self.check_edge_in(&self.document, source, target, source_port, target_port)
    }

    /// Validates an edge against `document` on metadata alone.
    fn check_edge_in(
        &self,
        document: &GraphDocument,
        source: NodeId,
        target: NodeId,
        source_port: &str,
        target_port: &str,
    ) -> Result<(), ConnectionError> {
        let from = document
            .node(source)
            .ok_or(ConnectionError::UnknownNode(source))?;
        let to = document
            .node(target)
            .ok_or(ConnectionError::UnknownNode(target))?;
        if document
            .find_edge(source, source_port, target, target_port)
            .is_some()
        {
            return Err(ConnectionError::Duplicate {
                from: source,
                from_port: source_port.to_string(),
                to: target,
                to_port: target_port.to_string(),
            });
        }
        self.services
            .router
            .validate(&from.metadata, source_port, &to.metadata, target_port)?;
        Ok(())
    }

    /// Removes an edge. A missing edge is a no-op and returns `Ok(false)`.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<bool, GraphError> {
        let removed = self.remove_edge_inner(id)?;
        if removed {
            tracing::debug!("graph_disconnect: {id}");
            self.refresh_play_state();
        }
        Ok(removed)
    }

    fn remove_edge_inner(&mut self, id: EdgeId) -> Result<bool, GraphError> {
        let Some(index) = self.document.edge_index(id) else {
            return Ok(false);
        };
        let value = serde_json::to_value(&self.document.edges[index])?;
        if let Some(projection) = self.projection.as_mut() {
            projection.disconnect(&self.services, id);
        }
        let path = Mutation::edge_path(index);
        self.commit(Mutation::remove(path.clone()), Mutation::add(path, value))?;
        Ok(true)
    }

    /// Sets a property.
    ///
    /// The value is coerced before it is committed; a value that cannot be
    /// coerced (unknown property, non-finite modulation value) is reported
    /// and touches neither the document nor the live unit. Setting the value
    /// already stored records nothing.
    pub fn update_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), GraphError> {
        let value = value.into();
        let index = self
            .document
            .node_index(id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let node = &self.document.nodes[index];
        let coerced = match self
            .services
            .properties
            .coerce(&node.metadata, name, &value, Some(id))
        {
            Ok(coerced) => coerced,
            Err(err) => {
                return Err(self.reject(
                    Category::Property,
                    Some(id),
                    &format!("'{name}' not updated"),
                    err,
                ));
            }
        };
        let previous = node.properties.get(name).cloned();
        if previous.as_ref() == Some(&coerced) {
            return Ok(());
        }

        let path = Mutation::property_path(index, name);
        let forward_value = serde_json::to_value(&coerced)?;
        let (forward, inverse) = match previous {
            Some(old) => (
                Mutation::replace(path.clone(), forward_value),
                Mutation::replace(path, serde_json::to_value(old)?),
            ),
            None => (
                Mutation::add(path.clone(), forward_value),
                Mutation::remove(path),
            ),
        };
        self.commit(forward, inverse)?;
        tracing::debug!("graph_update: {id}.{name} = {coerced}");
        self.apply_live_property(id, name, &coerced);
        self.refresh_play_state();
        Ok(())
    }

    fn apply_live_property(&mut self, id: NodeId, name: &str, value: &PropertyValue) {
        let Some(projection) = self.projection.as_mut() else {
            return;
        };
        let (Some(node), Some(live)) = (self.document.node(id), projection.units.get(&id)) else {
            return;
        };
        let unit = live.unit;
        let outcome = self.services.properties.apply(
            &mut projection.engine,
            unit,
            &node.metadata,
            name,
            value,
            Some(id),
        );
        match outcome {
            UpdateOutcome::Recreate => projection.recreate(&self.services, &self.document, id),
            UpdateOutcome::Applied | UpdateOutcome::Rejected => {
                if let Some(live) = projection.units.get_mut(&id) {
                    live.declared.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    /// Moves a node on the canvas. Undoable; never touches the live unit.
    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        let index = self
            .document
            .node_index(id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let old = self.document.nodes[index].position;
        if old == position {
            return Ok(());
        }
        let path = Mutation::position_path(index);
        self.commit(
            Mutation::replace(path.clone(), serde_json::to_value(position)?),
            Mutation::replace(path, serde_json::to_value(old)?),
        )
    }

    /// Applies `forward` to the document and records the pair.
    fn commit(&mut self, forward: Mutation, inverse: Mutation) -> Result<(), GraphError> {
        forward.apply(&mut self.document)?;
        self.history.record(forward, inverse);
        Ok(())
    }

    /// Reports a rejected operation and converts its error.
    fn reject(
        &self,
        category: Category,
        node: Option<NodeId>,
        message: &str,
        err: impl Into<GraphError>,
    ) -> GraphError {
        let err = err.into();
        self.services.diagnostics.report(
            Diagnostic::error(category, message)
                .with_node(node)
                .with_details(err.to_string()),
        );
        err
    }

    // --- History ---

    /// Reverts the most recent patch set. Returns `false` if there was
    /// nothing to undo, a batch is open, or the inverse could not be applied.
    pub fn undo(&mut self) -> bool {
        if self.history.in_batch() {
            tracing::warn!("graph_undo: refused inside an open batch");
            return false;
        }
        let Some(set) = self.history.pop_undo() else {
            return false;
        };
        let mut document = self.document.clone();
        if let Err(err) = set.apply_inverse(&mut document) {
            self.services.diagnostics.report(
                Diagnostic::error(Category::History, "undo failed").with_details(err.to_string()),
            );
            return false;
        }
        self.document = document;
        tracing::debug!("graph_undo: {} mutations reverted", set.len());
        self.history.push_redo(set);
        self.after_document_change();
        true
    }

    /// Re-applies the most recently undone patch set.
    pub fn redo(&mut self) -> bool {
        if self.history.in_batch() {
            tracing::warn!("graph_redo: refused inside an open batch");
            return false;
        }
        let Some(set) = self.history.pop_redo() else {
            return false;
        };
        let mut document = self.document.clone();
        if let Err(err) = set.apply_forward(&mut document) {
            self.services.diagnostics.report(
                Diagnostic::error(Category::History, "redo failed").with_details(err.to_string()),
            );
            return false;
        }
        self.document = document;
        tracing::debug!("graph_redo: {} mutations reapplied", set.len());
        self.history.push_undo_keep_redo(set);
        self.after_document_change();
        true
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Opens a batch; every mutation until the matching
    /// [`end_batch`](Self::end_batch) becomes one patch set.
    pub fn begin_batch(&mut self) {
        self.history.begin_batch();
    }

    /// Closes a batch. Returns `true` if a patch set was committed.
    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }

    /// Runs `f` inside a batch.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_batch();
        let out = f(self);
        self.end_batch();
        out
    }

    fn after_document_change(&mut self) {
        let next_node = self.document.next_node_id().unwrap_or(u32::MAX);
        let next_edge = self.document.next_edge_id().unwrap_or(u32::MAX);
        self.next_node = self.next_node.max(next_node);
        self.next_edge = self.next_edge.max(next_edge);
        if let Some(projection) = self.projection.as_mut() {
            projection.reconcile(&self.services, &self.document);
        }
        self.refresh_play_state();
    }

    // --- Lifecycle ---

    /// Builds the live projection: a fresh context, every node in document
    /// order, then every edge. Does nothing if already running.
    pub fn start(&mut self) {
        if self.projection.is_some() {
            return;
        }
        let projection = Projection::build(&self.services, &self.config, &self.document);
        tracing::info!(
            "sync_start: {} units, {} connections",
            projection.units.len(),
            projection.connections.len()
        );
        self.projection = Some(projection);
        self.refresh_play_state();
    }

    /// Releases the context and every live unit. Does nothing if stopped.
    pub fn stop(&mut self) {
        let Some(mut projection) = self.projection.take() else {
            return;
        };
        projection.engine.close();
        tracing::info!("sync_stop: released {} units", projection.units.len());
        self.refresh_play_state();
    }

    /// Resumes a suspended context and fires every deferred start. Returns
    /// the number of units started.
    pub fn resume(&mut self) -> Result<usize, GraphError> {
        let projection = self.projection.as_mut().ok_or(GraphError::NotRunning)?;
        let engine = &mut projection.engine;
        engine.context.resume()?;
        let mut started = 0;
        for host in std::mem::take(&mut engine.deferred) {
            match engine.context.start(host) {
                Ok(()) => started += 1,
                Err(HostError::AlreadyStarted(_)) => {}
                Err(err) => self.services.diagnostics.report(
                    Diagnostic::warning(Category::Host, format!("deferred start of {host} failed"))
                        .with_details(err.to_string()),
                ),
            }
        }
        tracing::info!("sync_resume: {started} deferred starts fired");
        self.refresh_play_state();
        Ok(started)
    }

    // --- Persistence ---

    /// Writes the document as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("graph_save: {}", path.display());
        Ok(())
    }

    /// Replaces the document with one read from a JSON file.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_json(&json)?;
        tracing::info!("graph_load: {}", path.display());
        Ok(())
    }

    /// Replaces the document with one parsed from JSON.
    ///
    /// Nodes without `metadata` take it from the catalog, so a document can
    /// be written by hand as just types, properties and edges.
    ///
    /// Duplicate IDs, or an ID of `u32::MAX`, reject the whole document and
    /// leave the current one in place. Edges that fail validation are
    /// dropped, each with an error diagnostic.
    pub fn load_json(&mut self, json: &str) -> Result<(), GraphError> {
        let document = self.validate_document(GraphDocument::from_json(json)?)?;
        self.replace_document(document);
        Ok(())
    }

    /// The document as pretty JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(self.document.to_json()?)
    }

    /// Removes every node and edge and clears both history stacks.
    pub fn clear(&mut self) {
        self.replace_document(GraphDocument::new());
    }

    fn validate_document(&self, mut document: GraphDocument) -> Result<GraphDocument, GraphError> {
        let mut nodes = BTreeSet::new();
        for node in &document.nodes {
            if !nodes.insert(node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
        }
        let mut edges = BTreeSet::new();
        for edge in &document.edges {
            if !edges.insert(edge.id) {
                return Err(GraphError::DuplicateEdge(edge.id));
            }
        }
        if document.next_node_id().is_none() {
            return Err(GraphError::IdsExhausted { kind: "node" });
        }
        if document.next_edge_id().is_none() {
            return Err(GraphError::IdsExhausted { kind: "edge" });
        }

        for node in document.nodes.iter_mut().filter(|n| n.metadata.name.is_empty()) {
            node.metadata = self.catalog.get(&node.type_name).cloned().unwrap_or_else(|| UnitSpec {
                name: node.type_name.clone(),
                ..UnitSpec::default()
            });
        }
        let loaded = std::mem::take(&mut document.edges);
        for edge in loaded {
            let checked = self.check_edge_in(
                &document,
                edge.source,
                edge.target,
                &edge.source_port,
                &edge.target_port,
            );
            match checked {
                Ok(()) => document.edges.push(edge),
                Err(err) => {
                    let node = document.node(edge.target).map(|n| n.id);
                    self.services.report_error(
                        Category::Connection,
                        node,
                        &format!("{} dropped on load", edge.id),
                        &err,
                    );
                }
            }
        }
        Ok(document)
    }

    fn replace_document(&mut self, document: GraphDocument) {
        self.document = document;
        self.history.clear();
        self.next_node = self.document.next_node_id().unwrap_or(u32::MAX);
        self.next_edge = self.document.next_edge_id().unwrap_or(u32::MAX);
        if let Some(projection) = self.projection.as_mut() {
            projection.reconcile(&self.services, &self.document);
        }
        tracing::debug!(
            "graph_replace: {} nodes, {} edges",
            self.document.node_count(),
            self.document.edge_count()
        );
        self.refresh_play_state();
    }
}

fn default_properties(meta: &UnitSpec) -> std::collections::BTreeMap<String, PropertyValue> {
    meta.properties
        .iter()
        .map(|p| (p.name.clone(), p.default.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::RoutingKind;

    fn at(x: f64) -> Position {
        Position::new(x, 0.0)
    }

    // --- stopped ---

    #[test]
    fn add_node_fills_defaults_and_records_history() {
        let mut sync = GraphSynchronizer::default();
        let osc = sync.add_node("Oscillator", at(0.0)).unwrap();
        let node = sync.document().node(osc).unwrap();
        assert_eq!(node.properties.get("frequency"), Some(&PropertyValue::Number(440.0)));
        assert!(sync.can_undo());
        assert!(!sync.is_running());
        assert_eq!(sync.play_state(), PlayState::Stopped);
    }

    #[test]
    fn unknown_type_is_rejected_and_reported() {
        let mut sync = GraphSynchronizer::default();
        let err = sync.add_node("Theremin", at(0.0)).unwrap_err();
        assert!(matches!(err, GraphError::Factory(FactoryError::UnknownType(_))));
        assert!(sync.document().is_empty());
        assert!(!sync.can_undo());
        assert_eq!(sync.diagnostics().error_count(), 1);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut sync = GraphSynchronizer::default();
        let a = sync.add_node("Gain", at(0.0)).unwrap();
        sync.undo();
        let b = sync.add_node("Gain", at(0.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn remove_node_cascades_edges_in_one_step() {
        let mut sync = GraphSynchronizer::default();
        let osc = sync.add_node("Oscillator", at(0.0)).unwrap();
        let gain = sync.add_node("Gain", at(1.0)).unwrap();
        let out = sync.add_node("AudioDestination", at(2.0)).unwrap();
        sync.add_edge(osc, gain, "output", "input").unwrap();
        sync.add_edge(gain, out, "output", "input").unwrap();

        sync.remove_node(gain).unwrap();
        assert_eq!(sync.document().node_count(), 2);
        assert_eq!(sync.document().edge_count(), 0);

        assert!(sync.undo());
        assert_eq!(sync.document().node_count(), 3);
        assert_eq!(sync.document().edge_count(), 2);
        assert_eq!(sync.document().nodes[1].id, gain);
    }

    #[test]
    fn invalid_edges_leave_nothing_behind() {
        let mut sync = GraphSynchronizer::default();
        let slider = sync.add_node("Slider", at(0.0)).unwrap();
        let gain = sync.add_node("Gain", at(1.0)).unwrap();
        let undo_len = sync.history().undo_len();

        let err = sync.add_edge(slider, gain, "value", "input").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Connection(ConnectionError::IncompatiblePorts { .. })
        ));
        assert_eq!(sync.document().edge_count(), 0);
        assert_eq!(sync.history().undo_len(), undo_len);

        sync.add_edge(slider, gain, "value", "gain").unwrap();
        assert!(matches!(
            sync.add_edge(slider, gain, "value", "gain"),
            Err(GraphError::Connection(ConnectionError::Duplicate { .. }))
        ));
    }

    #[test]
    fn update_property_coerces_before_commit() {
        let mut sync = GraphSynchronizer::default();
        let gain = sync.add_node("Gain", at(0.0)).unwrap();
        sync.update_property(gain, "gain", 1e9).unwrap();
        let stored = sync.document().node(gain).unwrap().properties.get("gain").cloned();
        let max = sync
            .catalog()
            .get("Gain")
            .and_then(|g| g.find_property("gain"))
            .and_then(|p| p.max)
            .unwrap();
        assert_eq!(stored, Some(PropertyValue::Number(max)));

        assert!(sync.update_property(gain, "gain", f64::NAN).is_err());
        assert!(sync.update_property(gain, "colour", 1.0).is_err());
        assert_eq!(
            sync.document().node(gain).unwrap().properties.get("gain").cloned(),
            stored
        );
    }

    #[test]
    fn same_value_records_nothing() {
        let mut sync = GraphSynchronizer::default();
        let osc = sync.add_node("Oscillator", at(0.0)).unwrap();
        let before = sync.history().undo_len();
        sync.update_property(osc, "frequency", 440.0).unwrap();
        assert_eq!(sync.history().undo_len(), before);
    }

    #[test]
    fn batch_groups_mutations() {
        let mut sync = GraphSynchronizer::default();
        let (a, b) = sync.batch(|s| {
            let a = s.add_node("Oscillator", at(0.0)).unwrap();
            let b = s.add_node("AudioDestination", at(1.0)).unwrap();
            s.add_edge(a, b, "output", "input").unwrap();
            s.move_node(a, at(5.0)).unwrap();
            (a, b)
        });
        assert_ne!(a, b);
        assert_eq!(sync.history().undo_len(), 1);
        assert!(sync.undo());
        assert!(sync.document().is_empty());
        assert!(sync.redo());
        assert_eq!(sync.document().edge_count(), 1);
        assert_eq!(sync.document().node(a).unwrap().position, at(5.0));
    }

    #[test]
    fn undo_refused_inside_batch() {
        let mut sync = GraphSynchronizer::default();
        sync.add_node("Gain", at(0.0)).unwrap();
        sync.begin_batch();
        assert!(!sync.undo());
        sync.end_batch();
        assert!(sync.undo());
    }

    #[test]
    fn clear_empties_document_and_history() {
        let mut sync = GraphSynchronizer::default();
        sync.add_node("Gain", at(0.0)).unwrap();
        sync.clear();
        assert!(sync.document().is_empty());
        assert!(!sync.can_undo());
        assert!(!sync.can_redo());
    }

    // --- running ---

    #[test]
    fn local_operations_while_running() {
        let mut sync = GraphSynchronizer::default();
        sync.start();
        let osc = sync.add_node("Oscillator", at(0.0)).unwrap();
        let out = sync.add_node("AudioDestination", at(1.0)).unwrap();
        assert_eq!(sync.live_unit_count(), 2);
        assert_eq!(sync.play_state(), PlayState::Inaudible);

        let edge = sync.add_edge(osc, out, "output", "input").unwrap();
        assert_eq!(
            sync.live_connection(edge).map(|c| c.kind()),
            Some(RoutingKind::Signal)
        );
        assert_eq!(sync.play_state(), PlayState::Audible);

        assert!(sync.remove_edge(edge).unwrap());
        assert_eq!(sync.live_connection_count(), 0);
        assert_eq!(sync.play_state(), PlayState::Inaudible);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut sync = GraphSynchronizer::default();
        sync.add_node("Oscillator", at(0.0)).unwrap();
        sync.stop();
        sync.start();
        sync.start();
        assert_eq!(sync.live_unit_count(), 1);
        assert!(format!("{sync:?}").contains("AudioContext"));
        sync.stop();
        sync.stop();
        assert!(!sync.is_running());
        assert_eq!(sync.live_unit_count(), 0);
        assert_eq!(sync.play_state(), PlayState::Stopped);
        assert!(sync.diagnostics().is_empty());
    }

    #[test]
    fn reconcile_reapplies_undone_property() {
        let mut sync = GraphSynchronizer::default();
        let osc = sync.add_node("Oscillator", at(0.0)).unwrap();
        sync.start();
        sync.update_property(osc, "frequency", 220.0).unwrap();
        assert_eq!(
            sync.property_value(osc, "frequency"),
            Some(PropertyValue::Number(220.0))
        );
        assert!(sync.undo());
        assert_eq!(
            sync.property_value(osc, "frequency"),
            Some(PropertyValue::Number(440.0))
        );
    }
}
