//! The live projection of a document: units and connections keyed by
//! visual IDs.

use std::collections::BTreeMap;

use patchwire_catalog::PropertyValue;

use crate::config::EngineConfig;
use crate::diagnostics::{Category, Diagnostic};
use crate::document::{EdgeId, GraphDocument, NodeId, VisualEdge, VisualNode};
use crate::error::{ConnectionError, FactoryError};
use crate::live::{LiveConnection, LiveEngine, LiveNode, LiveUnit};
use crate::properties::UpdateOutcome;

use super::Services;

/// Everything that exists only while the engine runs.
#[derive(Debug)]
pub(crate) struct Projection {
    pub(crate) engine: LiveEngine,
    pub(crate) units: BTreeMap<NodeId, LiveNode>,
    pub(crate) connections: BTreeMap<EdgeId, LiveConnection>,
}

impl Projection {
    /// Acquires a fresh context, instantiates every node, then connects every
    /// edge, each in document order.
    pub(crate) fn build(services: &Services, config: &EngineConfig, doc: &GraphDocument) -> Self {
        let mut projection = Self {
            engine: LiveEngine::new(config, services.diagnostics.clone()),
            units: BTreeMap::new(),
            connections: BTreeMap::new(),
        };
        for node in &doc.nodes {
            if let Err(err) = projection.instantiate(services, node) {
                services.report_error(Category::Factory, Some(node.id), "unit not instantiated", &err);
            }
        }
        for edge in &doc.edges {
            projection.connect_or_report(services, doc, edge);
        }
        projection
    }

    pub(crate) fn instantiate(
        &mut self,
        services: &Services,
        node: &VisualNode,
    ) -> Result<(), FactoryError> {
        let live = services.factory.instantiate(
            &mut self.engine,
            &node.metadata,
            &node.properties,
            Some(node.id),
        )?;
        self.units.insert(node.id, live);
        Ok(())
    }

    /// Disconnects, stops and removes a node's unit.
    pub(crate) fn teardown(&mut self, services: &Services, id: NodeId) {
        let touching: Vec<EdgeId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.edge)
            .collect();
        for edge in touching {
            self.disconnect(services, edge);
        }
        let Some(live) = self.units.remove(&id) else {
            return;
        };
        match live.unit {
            LiveUnit::Host(host) if host == self.engine.context.destination() => {}
            LiveUnit::Host(host) => {
                let ctx = &mut self.engine.context;
                if let Err(err) = ctx.stop(host) {
                    tracing::trace!("sync_teardown: {host} not playing ({err})");
                }
                if let Err(err) = ctx.remove_node(host) {
                    tracing::warn!("sync_teardown: {host} could not be removed: {err}");
                }
                self.engine.forget(host);
            }
            LiveUnit::Control(control) => {
                self.engine.propagator.remove(control);
            }
        }
        tracing::debug!("sync_teardown: {id} ({})", live.type_name);
    }

    /// Connects a visual edge whose endpoints both have live units.
    pub(crate) fn connect(
        &mut self,
        services: &Services,
        doc: &GraphDocument,
        edge: &VisualEdge,
    ) -> Result<(), ConnectionError> {
        let source = doc
            .node(edge.source)
            .ok_or(ConnectionError::UnknownNode(edge.source))?;
        let target = doc
            .node(edge.target)
            .ok_or(ConnectionError::UnknownNode(edge.target))?;
        let plan = services.router.validate(
            &source.metadata,
            &edge.source_port,
            &target.metadata,
            &edge.target_port,
        )?;
        let from = self.live_unit(edge.source)?;
        let to = self.live_unit(edge.target)?;
        let routing = services.router.connect(
            &mut self.engine,
            &plan,
            from,
            &edge.source_port,
            to,
            &edge.target_port,
            Some(edge.target),
        )?;
        self.connections.insert(
            edge.id,
            LiveConnection {
                edge: edge.id,
                source: edge.source,
                source_port: edge.source_port.clone(),
                target: edge.target,
                target_port: edge.target_port.clone(),
                routing,
            },
        );
        Ok(())
    }

    /// Connects an edge, reporting failures. An endpoint without a live unit
    /// is a failure too.
    fn connect_or_report(&mut self, services: &Services, doc: &GraphDocument, edge: &VisualEdge) {
        if let Err(err) = self.connect(services, doc, edge) {
            services.report_error(
                Category::Connection,
                Some(edge.target),
                &format!("{} not connected", edge.id),
                &err,
            );
        }
    }

    /// Reverses a live connection. Returns `false` if there was none.
    pub(crate) fn disconnect(&mut self, services: &Services, edge: EdgeId) -> bool {
        match self.connections.remove(&edge) {
            Some(connection) => {
                services.router.disconnect(&mut self.engine, &connection.routing);
                true
            }
            None => false,
        }
    }

    /// Rebuilds one unit and replays the connections it had.
    pub(crate) fn recreate(&mut self, services: &Services, doc: &GraphDocument, id: NodeId) {
        let Some(node) = doc.node(id) else {
            return;
        };
        let captured: Vec<EdgeId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.edge)
            .collect();
        self.teardown(services, id);
        if let Err(err) = self.instantiate(services, node) {
            services.report_error(Category::Factory, Some(id), "unit not recreated", &err);
            return;
        }
        let mut replayed = 0;
        for edge in captured.iter().filter_map(|e| doc.edge(*e)) {
            match self.connect(services, doc, edge) {
                Ok(()) => replayed += 1,
                Err(err) => services.report_error(
                    Category::Connection,
                    Some(id),
                    &format!("{} not restored after recreation", edge.id),
                    &err,
                ),
            }
        }
        tracing::debug!(
            "sync_recreate: {id} ({}), {replayed}/{} connections restored",
            node.type_name,
            captured.len()
        );
    }

    /// Brings the projection in line with `doc` without a full rebuild.
    pub(crate) fn reconcile(&mut self, services: &Services, doc: &GraphDocument) {
        let stale_edges: Vec<EdgeId> = self
            .connections
            .values()
            .filter(|c| {
                doc.edge(c.edge).is_none_or(|e| {
                    e.source != c.source
                        || e.target != c.target
                        || e.source_port != c.source_port
                        || e.target_port != c.target_port
                })
            })
            .map(|c| c.edge)
            .collect();
        for edge in stale_edges {
            self.disconnect(services, edge);
        }

        let stale_units: Vec<NodeId> = self
            .units
            .iter()
            .filter(|(id, live)| doc.node(**id).is_none_or(|n| n.type_name != live.type_name))
            .map(|(id, _)| *id)
            .collect();
        for id in stale_units {
            self.teardown(services, id);
        }

        let mut rebuild = Vec::new();
        for node in &doc.nodes {
            let Some(live) = self.units.get(&node.id) else {
                continue;
            };
            let unit = live.unit;
            let changed: Vec<(String, PropertyValue)> = node
                .metadata
                .properties
                .iter()
                .filter_map(|p| {
                    let wanted = node.property_or_default(&p.name)?;
                    (live.declared.get(&p.name) != Some(wanted))
                        .then(|| (p.name.clone(), wanted.clone()))
                })
                .collect();
            for (name, value) in changed {
                let outcome = services.properties.apply(
                    &mut self.engine,
                    unit,
                    &node.metadata,
                    &name,
                    &value,
                    Some(node.id),
                );
                if outcome == UpdateOutcome::Recreate {
                    rebuild.push(node.id);
                    break;
                }
                if let Some(live) = self.units.get_mut(&node.id) {
                    live.declared.insert(name, value);
                }
            }
        }
        for id in rebuild {
            self.teardown(services, id);
        }

        for node in &doc.nodes {
            if self.units.contains_key(&node.id) {
                continue;
            }
            if let Err(err) = self.instantiate(services, node) {
                services.report_error(Category::Factory, Some(node.id), "unit not instantiated", &err);
            }
        }
        for edge in &doc.edges {
            if !self.connections.contains_key(&edge.id) {
                self.connect_or_report(services, doc, edge);
            }
        }
        tracing::debug!(
            "sync_reconcile: {} units, {} connections",
            self.units.len(),
            self.connections.len()
        );
    }

    fn live_unit(&self, id: NodeId) -> Result<LiveUnit, ConnectionError> {
        self.units
            .get(&id)
            .map(|l| l.unit)
            .ok_or(ConnectionError::NotLive(id))
    }
}

impl Services {
    pub(crate) fn report_error(
        &self,
        category: Category,
        node: Option<NodeId>,
        message: &str,
        err: &dyn std::error::Error,
    ) {
        self.diagnostics.report(
            Diagnostic::error(category, message)
                .with_node(node)
                .with_details(err.to_string()),
        );
    }
}
