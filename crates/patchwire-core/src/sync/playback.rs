//! Rendering, stimulus and observation on a running synchronizer.

use patchwire_catalog::{PropertyValue, quirks};
use patchwire_host::AudioBuffer;

use crate::diagnostics::{Category, Diagnostic};
use crate::document::{EdgeId, NodeId};
use crate::error::GraphError;
use crate::factory::TriggerOutcome;
use crate::live::{LiveConnection, LiveNode, LiveUnit, Routing};
use crate::properties::from_field;

use super::GraphSynchronizer;
use super::projection::Projection;

/// Whether the running graph can be heard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// No live projection.
    Stopped,
    /// A playing source reaches the output sink.
    Audible,
    /// Running, but nothing reaches the output sink.
    Inaudible,
}

impl GraphSynchronizer {
    /// Current play state.
    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub(super) fn refresh_play_state(&mut self) {
        let next = match &self.projection {
            None => PlayState::Stopped,
            Some(p) if p.engine.context.has_audible_path() => PlayState::Audible,
            Some(_) => PlayState::Inaudible,
        };
        if next != self.play_state {
            tracing::info!("sync_play_state: {:?} → {next:?}", self.play_state);
            self.play_state = next;
        }
    }

    fn running(&self) -> Result<&Projection, GraphError> {
        self.projection.as_ref().ok_or(GraphError::NotRunning)
    }

    fn running_mut(&mut self) -> Result<&mut Projection, GraphError> {
        self.projection.as_mut().ok_or(GraphError::NotRunning)
    }

    // --- Rendering ---

    /// Renders `frames` frames of the output sink.
    ///
    /// Before each block the control clock ticks; after it, host outputs
    /// routed into control inputs are sampled.
    pub fn render(&mut self, frames: usize) -> Result<Vec<f32>, GraphError> {
        let projection = self.running_mut()?;
        let engine = &mut projection.engine;
        let mut out = Vec::with_capacity(frames + engine.context.block_size());
        while out.len() < frames {
            engine.propagator.tick(&mut engine.context);
            out.extend_from_slice(engine.context.render_block()?);
            engine.propagator.sample_host(&mut engine.context);
        }
        out.truncate(frames);
        self.refresh_play_state();
        Ok(out)
    }

    /// Decodes every queued buffer file. Failures are reported and leave the
    /// unit silent. Returns the number of buffers loaded.
    pub fn poll_loads(&mut self) -> usize {
        let Some(projection) = self.projection.as_mut() else {
            return 0;
        };
        let pending = std::mem::take(&mut projection.engine.pending_loads);
        let mut loaded = 0;
        for load in pending {
            let result = AudioBuffer::read_wav(&load.path)
                .and_then(|buffer| projection.engine.context.set_buffer(load.host, buffer));
            match result {
                Ok(()) => {
                    tracing::debug!("sync_load: {} decoded", load.path.display());
                    loaded += 1;
                }
                Err(err) => self.services.diagnostics.report(
                    Diagnostic::error(
                        Category::Loading,
                        format!("could not load '{}'", load.path.display()),
                    )
                    .with_node(load.node)
                    .with_details(err.to_string()),
                ),
            }
        }
        loaded
    }

    // --- Stimulus ---

    /// Delivers `value` into an input of a control unit, as if a user moved
    /// a slider or a note arrived.
    pub fn interact(&mut self, id: NodeId, port: &str, value: f64) -> Result<(), GraphError> {
        let node = self.document.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if node.metadata.find_input(port).is_none() {
            return Err(GraphError::InvalidStimulus {
                node: id,
                reason: format!("no input named '{port}'"),
            });
        }
        let control = self.live_control(id)?;
        let engine = &mut self.running_mut()?.engine;
        engine.propagator.receive(&mut engine.context, control, port, value);
        Ok(())
    }

    /// Presses a button-like control unit.
    pub fn press(&mut self, id: NodeId) -> Result<(), GraphError> {
        let control = self.live_control(id)?;
        let engine = &mut self.running_mut()?.engine;
        if engine.propagator.accepts_stimulus(control) != Some(true) {
            return Err(GraphError::InvalidStimulus {
                node: id,
                reason: "unit cannot be pressed".to_string(),
            });
        }
        engine.propagator.stimulate(&mut engine.context, control);
        Ok(())
    }

    fn live_control(&self, id: NodeId) -> Result<crate::control::ControlId, GraphError> {
        let projection = self.running()?;
        let live = projection.units.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        live.unit.control().ok_or_else(|| GraphError::InvalidStimulus {
            node: id,
            reason: format!("{} is not a control unit", live.type_name),
        })
    }

    /// Starts a startable unit (again).
    pub fn trigger(&mut self, id: NodeId) -> Result<TriggerOutcome, GraphError> {
        let node = self.document.node(id).ok_or(GraphError::NodeNotFound(id))?;
        let projection = self.projection.as_mut().ok_or(GraphError::NotRunning)?;
        let unit = projection
            .units
            .get(&id)
            .map(|l| l.unit)
            .ok_or(GraphError::NodeNotFound(id))?;
        let outcome =
            self.services
                .factory
                .trigger(&mut projection.engine, unit, &node.metadata, Some(id));
        self.refresh_play_state();
        Ok(outcome)
    }

    /// Stops a startable unit. Returns `true` if it was playing.
    pub fn stop_unit(&mut self, id: NodeId) -> Result<bool, GraphError> {
        let node = self.document.node(id).ok_or(GraphError::NodeNotFound(id))?;
        let projection = self.projection.as_mut().ok_or(GraphError::NotRunning)?;
        let unit = projection
            .units
            .get(&id)
            .map(|l| l.unit)
            .ok_or(GraphError::NodeNotFound(id))?;
        let stopped = self
            .services
            .factory
            .stop(&mut projection.engine, unit, &node.metadata);
        self.refresh_play_state();
        Ok(stopped)
    }

    // --- Observation ---

    /// Highest RMS level across every output tap, or `0.0` when nothing is
    /// tapped.
    pub fn output_level(&self) -> f32 {
        let Some(projection) = &self.projection else {
            return 0.0;
        };
        projection
            .connections
            .values()
            .filter_map(|c| match c.routing {
                Routing::Tapped { tap, .. } => projection.engine.context.level(tap),
                _ => None,
            })
            .map(|level| level.rms)
            .fold(0.0, f32::max)
    }

    /// The live counterpart of an edge.
    pub fn live_connection(&self, edge: EdgeId) -> Option<&LiveConnection> {
        self.projection.as_ref()?.connections.get(&edge)
    }

    /// Number of live connections.
    pub fn live_connection_count(&self) -> usize {
        self.projection.as_ref().map_or(0, |p| p.connections.len())
    }

    /// The live counterpart of a node.
    pub fn live_unit(&self, id: NodeId) -> Option<&LiveNode> {
        self.projection.as_ref()?.units.get(&id)
    }

    /// Number of live units.
    pub fn live_unit_count(&self) -> usize {
        self.projection.as_ref().map_or(0, |p| p.units.len())
    }

    /// Last value a control unit emitted on `port`.
    pub fn control_output(&self, id: NodeId, port: &str) -> Option<f64> {
        let projection = self.projection.as_ref()?;
        let control = projection.units.get(&id)?.unit.control()?;
        projection.engine.propagator.output(control, port)
    }

    /// Current value of a property.
    ///
    /// Stopped, this is the document value (or default). Running, it is read
    /// back from the live unit wherever the unit exposes it.
    pub fn property_value(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        let node = self.document.node(id)?;
        let Some(projection) = &self.projection else {
            return node.property_or_default(name).cloned();
        };
        let live = projection.units.get(&id)?;
        match live.unit {
            LiveUnit::Control(control) => projection
                .engine
                .propagator
                .property(control, name)
                .cloned(),
            LiveUnit::Host(host) => {
                let ctx = &projection.engine.context;
                if quirks::is_modulation_target(&node.type_name, name) {
                    ctx.param(host, name).map(|v| PropertyValue::Number(f64::from(v)))
                } else if quirks::is_construction_property(&node.type_name, name) {
                    live.declared.get(name).cloned()
                } else {
                    ctx.field(host, name)
                        .map(from_field)
                        .or_else(|| live.declared.get(name).cloned())
                }
            }
        }
    }
}
