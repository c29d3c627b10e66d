//! The audio context: node/edge storage, lifecycle and block rendering.
//!
//! [`AudioContext`] owns every node in slot vectors indexed by [`HostNodeId`]
//! and [`HostEdgeId`]. Edges either feed a node's signal input or add to one
//! of its parameters. Rendering pulls every live node once per block in
//! dependency order; a node reached again while it is still being rendered
//! (a feedback cycle) contributes its previous block.

use std::fmt;

use crate::buffer::AudioBuffer;
use crate::error::HostError;
use crate::node::{AudioParam, EdgeTarget, FieldValue, HostEdgeId, HostNodeId, Level, PlaybackState};
use crate::processor::{ParamBlock, Processor};
use crate::processors::{
    Analyser, BiquadFilter, BufferSource, ConstantSource, Delay, Destination, Gain, Oscillator,
};

/// Lifecycle state of an [`AudioContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Nodes can be built and connected, but nothing renders.
    Suspended,
    /// Rendering is allowed.
    Running,
    /// All nodes are released; every operation fails.
    Closed,
}

/// Construction options for an [`AudioContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextOptions {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per rendered block.
    pub block_size: usize,
    /// Start in [`ContextState::Suspended`] until [`AudioContext::resume`] is called.
    pub start_suspended: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 128,
            start_suspended: false,
        }
    }
}

/// A node constructor, as listed in the context's constructor table.
pub type NodeConstructor = fn(&mut AudioContext) -> Result<HostNodeId, HostError>;

const CONSTRUCTORS: &[(&str, NodeConstructor)] = &[
    ("createOscillator", AudioContext::create_oscillator),
    ("createGain", AudioContext::create_gain),
    ("createBiquadFilter", AudioContext::create_biquad_filter),
    ("createDelay", AudioContext::create_delay),
    ("createConstantSource", AudioContext::create_constant_source),
    ("createBufferSource", AudioContext::create_buffer_source),
    ("createAnalyser", AudioContext::create_analyser),
];

struct NodeData {
    processor: Box<dyn Processor>,
    params: Vec<AudioParam>,
    /// `Some` for sources only.
    playback: Option<PlaybackState>,
    output: Vec<f32>,
    incoming: Vec<HostEdgeId>,
    outgoing: Vec<HostEdgeId>,
}

struct Edge {
    from: HostNodeId,
    to: HostNodeId,
    target: EdgeTarget,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Reference host audio engine.
///
/// # Example
///
/// ```rust
/// use patchwire_host::{AudioContext, ContextOptions};
///
/// let mut ctx = AudioContext::new(ContextOptions::default());
/// let osc = ctx.create_oscillator().unwrap();
/// ctx.connect(osc, ctx.destination()).unwrap();
/// ctx.start(osc).unwrap();
/// let block = ctx.render(128).unwrap();
/// assert_eq!(block.len(), 128);
/// ```
pub struct AudioContext {
    state: ContextState,
    sample_rate: f32,
    block_size: usize,
    nodes: Vec<Option<NodeData>>,
    edges: Vec<Option<Edge>>,
    destination: HostNodeId,
    frames_rendered: u64,
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("state", &self.state)
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("frames_rendered", &self.frames_rendered)
            .finish_non_exhaustive()
    }
}

impl AudioContext {
    /// Creates a context with its destination node already in place.
    pub fn new(options: ContextOptions) -> Self {
        let state = if options.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        let mut ctx = Self {
            state,
            sample_rate: options.sample_rate,
            block_size: options.block_size.max(1),
            nodes: Vec::new(),
            edges: Vec::new(),
            destination: HostNodeId(0),
            frames_rendered: 0,
        };
        ctx.destination = ctx.insert_node(Box::new(Destination));
        tracing::info!(
            "context_new: {} Hz, {} frames/block, {:?}",
            ctx.sample_rate,
            ctx.block_size,
            ctx.state
        );
        ctx
    }

    /// Looks up a constructor by method name (e.g. `"createGain"`).
    pub fn constructor(method: &str) -> Option<NodeConstructor> {
        CONSTRUCTORS
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, ctor)| *ctor)
    }

    /// Names of every constructor in the table.
    pub fn constructor_names() -> impl Iterator<Item = &'static str> {
        CONSTRUCTORS.iter().map(|(name, _)| *name)
    }

    // --- Lifecycle ---

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Moves a suspended context to running.
    pub fn resume(&mut self) -> Result<(), HostError> {
        self.ensure_open()?;
        if self.state != ContextState::Running {
            self.state = ContextState::Running;
            tracing::info!("context_resume: running");
        }
        Ok(())
    }

    /// Moves a running context to suspended.
    pub fn suspend(&mut self) -> Result<(), HostError> {
        self.ensure_open()?;
        if self.state != ContextState::Suspended {
            self.state = ContextState::Suspended;
            tracing::info!("context_suspend: suspended");
        }
        Ok(())
    }

    /// Releases every node and edge. Idempotent.
    pub fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        self.nodes.clear();
        self.edges.clear();
        self.state = ContextState::Closed;
        tracing::info!("context_close: released all nodes");
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Seconds rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.sample_rate)
    }

    /// The output sink. Always present until the context closes.
    pub fn destination(&self) -> HostNodeId {
        self.destination
    }

    // --- Construction ---

    /// Creates a sine oscillator (source).
    pub fn create_oscillator(&mut self) -> Result<HostNodeId, HostError> {
        let sr = self.sample_rate;
        self.add_node(Box::new(Oscillator::new(sr)))
    }

    /// Creates a unity gain stage.
    pub fn create_gain(&mut self) -> Result<HostNodeId, HostError> {
        self.add_node(Box::new(Gain))
    }

    /// Creates a lowpass biquad filter.
    pub fn create_biquad_filter(&mut self) -> Result<HostNodeId, HostError> {
        let sr = self.sample_rate;
        self.add_node(Box::new(BiquadFilter::new(sr)))
    }

    /// Creates a delay line with one second of capacity.
    pub fn create_delay(&mut self) -> Result<HostNodeId, HostError> {
        let sr = self.sample_rate;
        self.add_node(Box::new(Delay::new(sr, 1.0)))
    }

    /// Creates a constant source (source).
    pub fn create_constant_source(&mut self) -> Result<HostNodeId, HostError> {
        self.add_node(Box::new(ConstantSource))
    }

    /// Creates an empty buffer source (source).
    pub fn create_buffer_source(&mut self) -> Result<HostNodeId, HostError> {
        let sr = self.sample_rate;
        self.add_node(Box::new(BufferSource::new(sr)))
    }

    /// Creates a pass-through analyser.
    pub fn create_analyser(&mut self) -> Result<HostNodeId, HostError> {
        self.add_node(Box::new(Analyser::new()))
    }

    /// Adds a custom processor.
    pub fn add_node(&mut self, processor: Box<dyn Processor>) -> Result<HostNodeId, HostError> {
        self.ensure_open()?;
        let type_name = processor.type_name();
        let id = self.insert_node(processor);
        tracing::debug!("graph_add: {type_name} {id}");
        Ok(id)
    }

    fn insert_node(&mut self, processor: Box<dyn Processor>) -> HostNodeId {
        let id = HostNodeId(self.nodes.len() as u32);
        let params = processor.params();
        let playback = processor.is_source().then_some(PlaybackState::Idle);
        self.nodes.push(Some(NodeData {
            processor,
            params,
            playback,
            output: vec![0.0; self.block_size],
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }));
        id
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: HostNodeId) -> Result<(), HostError> {
        self.ensure_open()?;
        if id == self.destination {
            return Err(HostError::InvalidOperation(
                "the destination cannot be removed".to_string(),
            ));
        }
        self.get_node(id)?;
        self.disconnect_node(id)?;
        self.nodes[id.0 as usize] = None;
        tracing::debug!("graph_remove: node {id}");
        Ok(())
    }

    // --- Edges ---

    /// Connects `from`'s output to `to`'s signal input.
    pub fn connect(&mut self, from: HostNodeId, to: HostNodeId) -> Result<HostEdgeId, HostError> {
        self.ensure_open()?;
        let target = self.get_node(to)?;
        if !target.processor.has_input() {
            return Err(HostError::InvalidOperation(format!(
                "{} has no signal input",
                target.processor.type_name()
            )));
        }
        self.insert_edge(from, to, EdgeTarget::Input)
    }

    /// Connects `from`'s output to the parameter `param` of `to`.
    pub fn connect_param(
        &mut self,
        from: HostNodeId,
        to: HostNodeId,
        param: &str,
    ) -> Result<HostEdgeId, HostError> {
        self.ensure_open()?;
        let target = self.get_node(to)?;
        let name = target
            .params
            .iter()
            .find(|p| p.name() == param)
            .map(AudioParam::name)
            .ok_or_else(|| HostError::UnknownParam {
                node_type: target.processor.type_name(),
                param: param.to_string(),
            })?;
        self.insert_edge(from, to, EdgeTarget::Param(name))
    }

    fn insert_edge(
        &mut self,
        from: HostNodeId,
        to: HostNodeId,
        target: EdgeTarget,
    ) -> Result<HostEdgeId, HostError> {
        let source = self.get_node(from)?;
        if !source.processor.has_output() {
            return Err(HostError::InvalidOperation(format!(
                "{} has no output",
                source.processor.type_name()
            )));
        }
        let duplicate = source.outgoing.iter().any(|e| {
            self.edges[e.0 as usize]
                .as_ref()
                .is_some_and(|edge| edge.to == to && edge.target == target)
        });
        if duplicate {
            return Err(HostError::InvalidOperation(format!(
                "{from} is already connected to {to}"
            )));
        }

        let id = HostEdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge { from, to, target }));
        if let Some(node) = self.nodes[from.0 as usize].as_mut() {
            node.outgoing.push(id);
        }
        if let Some(node) = self.nodes[to.0 as usize].as_mut() {
            node.incoming.push(id);
        }
        tracing::debug!("graph_connect: {from} → {to} ({target:?})");
        Ok(id)
    }

    /// Removes one edge.
    pub fn disconnect(&mut self, id: HostEdgeId) -> Result<(), HostError> {
        self.ensure_open()?;
        let edge = self
            .edges
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(HostError::EdgeNotFound(id))?;
        for (node, outgoing) in [(edge.from, true), (edge.to, false)] {
            if let Some(Some(data)) = self.nodes.get_mut(node.0 as usize) {
                let list = if outgoing {
                    &mut data.outgoing
                } else {
                    &mut data.incoming
                };
                list.retain(|e| *e != id);
            }
        }
        tracing::debug!("graph_disconnect: edge {id}");
        Ok(())
    }

    /// Removes every edge touching `id`. Returns how many were removed.
    pub fn disconnect_node(&mut self, id: HostNodeId) -> Result<usize, HostError> {
        let node = self.get_node(id)?;
        let edges: Vec<HostEdgeId> = node
            .incoming
            .iter()
            .chain(node.outgoing.iter())
            .copied()
            .collect();
        for edge in &edges {
            self.disconnect(*edge)?;
        }
        Ok(edges.len())
    }

    /// Returns `(from, to, target)` for a live edge.
    pub fn edge(&self, id: HostEdgeId) -> Option<(HostNodeId, HostNodeId, EdgeTarget)> {
        self.edges
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|e| (e.from, e.to, e.target))
    }

    // --- Sources ---

    /// Starts a source. Fails if it is already playing.
    pub fn start(&mut self, id: HostNodeId) -> Result<(), HostError> {
        self.ensure_open()?;
        let node = self.get_node_mut(id)?;
        match node.playback {
            None => Err(HostError::NotStartable(id)),
            Some(PlaybackState::Playing) => Err(HostError::AlreadyStarted(id)),
            Some(_) => {
                node.processor.on_start();
                node.playback = Some(PlaybackState::Playing);
                tracing::debug!("graph_start: {id}");
                Ok(())
            }
        }
    }

    /// Stops a playing source.
    pub fn stop(&mut self, id: HostNodeId) -> Result<(), HostError> {
        self.ensure_open()?;
        let node = self.get_node_mut(id)?;
        match node.playback {
            None => Err(HostError::NotStartable(id)),
            Some(PlaybackState::Playing) => {
                node.playback = Some(PlaybackState::Ended);
                tracing::debug!("graph_stop: {id}");
                Ok(())
            }
            Some(_) => Err(HostError::NotStarted(id)),
        }
    }

    /// Playback state of a source; `None` for non-sources and unknown nodes.
    pub fn playback_state(&self, id: HostNodeId) -> Option<PlaybackState> {
        self.node(id).and_then(|n| n.playback)
    }

    // --- Parameters and fields ---

    /// Base value of a parameter.
    pub fn param(&self, id: HostNodeId, name: &str) -> Option<f32> {
        self.node(id)?
            .params
            .iter()
            .find(|p| p.name() == name)
            .map(AudioParam::value)
    }

    /// Every parameter of a node.
    pub fn params(&self, id: HostNodeId) -> Option<&[AudioParam]> {
        self.node(id).map(|n| n.params.as_slice())
    }

    /// Sets a parameter's base value, clamped to its nominal range.
    pub fn set_param(&mut self, id: HostNodeId, name: &str, value: f32) -> Result<(), HostError> {
        self.ensure_open()?;
        if !value.is_finite() {
            return Err(HostError::NonFiniteParam(name.to_string()));
        }
        let node = self.get_node_mut(id)?;
        let type_name = node.processor.type_name();
        let param = node
            .params
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| HostError::UnknownParam {
                node_type: type_name,
                param: name.to_string(),
            })?;
        param.set(value);
        Ok(())
    }

    /// Reads a field.
    pub fn field(&self, id: HostNodeId, name: &str) -> Option<FieldValue> {
        self.node(id)?.processor.field(name)
    }

    /// Writes a field.
    pub fn set_field(
        &mut self,
        id: HostNodeId,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), HostError> {
        self.ensure_open()?;
        self.get_node_mut(id)?.processor.set_field(name, value)
    }

    /// Installs decoded or generated audio on a buffer source.
    pub fn set_buffer(&mut self, id: HostNodeId, buffer: AudioBuffer) -> Result<(), HostError> {
        self.ensure_open()?;
        let frames = buffer.len();
        self.get_node_mut(id)?.processor.set_buffer(buffer)?;
        tracing::debug!("graph_buffer: {id} ← {frames} frames");
        Ok(())
    }

    // --- Observation ---

    /// Level reported by an analyser.
    pub fn level(&self, id: HostNodeId) -> Option<Level> {
        self.node(id)?.processor.level()
    }

    /// Last sample of the most recently rendered block of a node.
    pub fn output_sample(&self, id: HostNodeId) -> Option<f32> {
        self.node(id)?.output.last().copied()
    }

    /// Type name of a node.
    pub fn node_type(&self, id: HostNodeId) -> Option<&'static str> {
        self.node(id).map(|n| n.processor.type_name())
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, id: HostNodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, destination included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// Returns `true` if a playing source reaches the destination through
    /// signal-input edges.
    pub fn has_audible_path(&self) -> bool {
        if self.state == ContextState::Closed {
            return false;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.destination];
        while let Some(current) = stack.pop() {
            let idx = current.0 as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            let Some(node) = self.nodes[idx].as_ref() else {
                continue;
            };
            if node.playback == Some(PlaybackState::Playing) {
                return true;
            }
            for edge in node.incoming.iter().filter_map(|e| self.edges[e.0 as usize].as_ref()) {
                if edge.target == EdgeTarget::Input {
                    stack.push(edge.from);
                }
            }
        }
        false
    }

    // --- Rendering ---

    /// Renders one block and returns the destination's output.
    pub fn render_block(&mut self) -> Result<&[f32], HostError> {
        self.ensure_open()?;
        if self.state != ContextState::Running {
            return Err(HostError::NotRunning);
        }
        let mut visit = vec![Visit::Pending; self.nodes.len()];
        for idx in 0..self.nodes.len() {
            self.render_node(idx, &mut visit);
        }
        self.frames_rendered += self.block_size as u64;
        Ok(self
            .nodes
            .get(self.destination.0 as usize)
            .and_then(Option::as_ref)
            .map_or(&[][..], |n| n.output.as_slice()))
    }

    /// Renders at least `frames` frames, in whole blocks, and returns them.
    pub fn render(&mut self, frames: usize) -> Result<Vec<f32>, HostError> {
        let mut out = Vec::with_capacity(frames + self.block_size);
        while out.len() < frames {
            out.extend_from_slice(self.render_block()?);
        }
        out.truncate(frames);
        Ok(out)
    }

    fn render_node(&mut self, idx: usize, visit: &mut [Visit]) {
        if visit[idx] != Visit::Pending {
            return;
        }
        visit[idx] = Visit::InProgress;

        let Some(node) = self.nodes[idx].as_ref() else {
            visit[idx] = Visit::Done;
            return;
        };
        let incoming: Vec<(usize, EdgeTarget)> = node
            .incoming
            .iter()
            .filter_map(|e| self.edges[e.0 as usize].as_ref())
            .map(|e| (e.from.0 as usize, e.target))
            .collect();
        for (source, _) in &incoming {
            self.render_node(*source, visit);
        }

        let block = self.block_size;
        let mut input = vec![0.0f32; block];
        let Some(node) = self.nodes[idx].as_ref() else {
            return;
        };
        let mut param_values: Vec<Vec<f32>> = node
            .params
            .iter()
            .map(|p| vec![p.value(); block])
            .collect();
        for (source, target) in &incoming {
            let Some(src) = self.nodes[*source].as_ref() else {
                continue;
            };
            let dest = match target {
                EdgeTarget::Input => &mut input,
                EdgeTarget::Param(name) => {
                    match node.params.iter().position(|p| p.name() == *name) {
                        Some(i) => &mut param_values[i],
                        None => continue,
                    }
                }
            };
            for (d, s) in dest.iter_mut().zip(&src.output) {
                *d += s;
            }
        }
        for (param, values) in node.params.iter().zip(param_values.iter_mut()) {
            let (min, max) = param.range();
            for v in values.iter_mut() {
                *v = if v.is_finite() {
                    v.clamp(min, max)
                } else {
                    param.value()
                };
            }
        }

        let Some(node) = self.nodes[idx].as_mut() else {
            return;
        };
        let mut output = std::mem::take(&mut node.output);
        output.resize(block, 0.0);
        let active = node
            .playback
            .is_none_or(|state| state == PlaybackState::Playing);
        if active {
            node.processor
                .process(&input, &ParamBlock::new(&param_values), &mut output);
        } else {
            output.fill(0.0);
        }
        if node.playback == Some(PlaybackState::Playing) && node.processor.is_finished() {
            node.playback = Some(PlaybackState::Ended);
            tracing::debug!("graph_ended: HostNodeId({idx})");
        }
        node.output = output;
        visit[idx] = Visit::Done;
    }

    // --- Internals ---

    fn ensure_open(&self) -> Result<(), HostError> {
        if self.state == ContextState::Closed {
            Err(HostError::ContextClosed)
        } else {
            Ok(())
        }
    }

    fn node(&self, id: HostNodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_node(&self, id: HostNodeId) -> Result<&NodeData, HostError> {
        self.node(id).ok_or(HostError::NodeNotFound(id))
    }

    fn get_node_mut(&mut self, id: HostNodeId) -> Result<&mut NodeData, HostError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::NodeNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> AudioContext {
        AudioContext::new(ContextOptions {
            sample_rate: 1000.0,
            block_size: 10,
            start_suspended: false,
        })
    }

    fn constant(ctx: &mut AudioContext, offset: f32) -> HostNodeId {
        let id = ctx.create_constant_source().unwrap();
        ctx.set_param(id, "offset", offset).unwrap();
        ctx.start(id).unwrap();
        id
    }

    #[test]
    fn destination_is_present_and_permanent() {
        let mut ctx = running();
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(ctx.node_type(ctx.destination()), Some("AudioDestination"));
        assert!(matches!(
            ctx.remove_node(ctx.destination()),
            Err(HostError::InvalidOperation(_))
        ));
    }

    #[test]
    fn constructor_table_resolves_methods() {
        let mut ctx = running();
        let ctor = AudioContext::constructor("createGain").unwrap();
        let id = ctor(&mut ctx).unwrap();
        assert_eq!(ctx.node_type(id), Some("Gain"));
        assert!(AudioContext::constructor("createTheremin").is_none());
        assert_eq!(AudioContext::constructor_names().count(), 7);
    }

    #[test]
    fn renders_connected_source() {
        let mut ctx = running();
        let src = constant(&mut ctx, 0.5);
        ctx.connect(src, ctx.destination()).unwrap();
        let out = ctx.render(25).unwrap();
        assert_eq!(out.len(), 25);
        assert!(out.iter().all(|s| (*s - 0.5).abs() < 1e-6));
        assert!((ctx.current_time() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn unstarted_source_is_silent() {
        let mut ctx = running();
        let osc = ctx.create_oscillator().unwrap();
        ctx.connect(osc, ctx.destination()).unwrap();
        let out = ctx.render(10).unwrap();
        assert!(out.iter().all(|s| *s == 0.0));
        assert!(!ctx.has_audible_path());
    }

    #[test]
    fn parameter_edges_add_to_base_value() {
        let mut ctx = running();
        let carrier = constant(&mut ctx, 1.0);
        let modulator = constant(&mut ctx, 0.5);
        let gain = ctx.create_gain().unwrap();
        ctx.connect(carrier, gain).unwrap();
        ctx.connect_param(modulator, gain, "gain").unwrap();
        ctx.connect(gain, ctx.destination()).unwrap();
        let out = ctx.render(10).unwrap();
        assert!((out[9] - 1.5).abs() < 1e-6);
        assert_eq!(ctx.param(gain, "gain"), Some(1.0));
    }

    #[test]
    fn unknown_param_edge_is_rejected() {
        let mut ctx = running();
        let src = ctx.create_constant_source().unwrap();
        let gain = ctx.create_gain().unwrap();
        assert!(matches!(
            ctx.connect_param(src, gain, "cutoff"),
            Err(HostError::UnknownParam { .. })
        ));
        assert_eq!(ctx.edge_count(), 0);
    }

    #[test]
    fn feedback_cycle_renders_without_hanging() {
        let mut ctx = running();
        let src = constant(&mut ctx, 0.25);
        let a = ctx.create_gain().unwrap();
        let b = ctx.create_gain().unwrap();
        ctx.set_param(b, "gain", 0.5).unwrap();
        ctx.connect(src, a).unwrap();
        ctx.connect(a, b).unwrap();
        ctx.connect(b, a).unwrap();
        ctx.connect(a, ctx.destination()).unwrap();
        let first = ctx.render(10).unwrap();
        let second = ctx.render(10).unwrap();
        assert!(second[0] > first[0]);
    }

    #[test]
    fn start_stop_state_machine() {
        let mut ctx = running();
        let osc = ctx.create_oscillator().unwrap();
        assert!(matches!(ctx.stop(osc), Err(HostError::NotStarted(_))));
        ctx.start(osc).unwrap();
        assert!(matches!(ctx.start(osc), Err(HostError::AlreadyStarted(_))));
        ctx.stop(osc).unwrap();
        assert_eq!(ctx.playback_state(osc), Some(PlaybackState::Ended));
        ctx.start(osc).unwrap();
        let gain = ctx.create_gain().unwrap();
        assert!(matches!(ctx.start(gain), Err(HostError::NotStartable(_))));
    }

    #[test]
    fn audible_path_follows_signal_edges() {
        let mut ctx = running();
        let src = constant(&mut ctx, 1.0);
        let gain = ctx.create_gain().unwrap();
        ctx.connect(src, gain).unwrap();
        assert!(!ctx.has_audible_path());
        let edge = ctx.connect(gain, ctx.destination()).unwrap();
        assert!(ctx.has_audible_path());
        ctx.disconnect(edge).unwrap();
        assert!(!ctx.has_audible_path());
    }

    #[test]
    fn remove_node_drops_its_edges() {
        let mut ctx = running();
        let src = constant(&mut ctx, 1.0);
        let gain = ctx.create_gain().unwrap();
        ctx.connect(src, gain).unwrap();
        ctx.connect(gain, ctx.destination()).unwrap();
        ctx.remove_node(gain).unwrap();
        assert_eq!(ctx.edge_count(), 0);
        assert!(!ctx.contains(gain));
        assert!(matches!(
            ctx.remove_node(gain),
            Err(HostError::NodeNotFound(_))
        ));
    }

    #[test]
    fn suspended_context_does_not_render() {
        let mut ctx = AudioContext::new(ContextOptions {
            start_suspended: true,
            ..ContextOptions::default()
        });
        assert_eq!(ctx.state(), ContextState::Suspended);
        assert!(matches!(ctx.render_block(), Err(HostError::NotRunning)));
        ctx.resume().unwrap();
        assert!(ctx.render_block().is_ok());
    }

    #[test]
    fn closed_context_rejects_everything() {
        let mut ctx = running();
        let gain = ctx.create_gain().unwrap();
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(matches!(ctx.create_gain(), Err(HostError::ContextClosed)));
        assert!(matches!(ctx.resume(), Err(HostError::ContextClosed)));
        assert!(!ctx.contains(gain));
        assert_eq!(ctx.node_count(), 0);
    }

    #[test]
    fn non_finite_param_is_rejected() {
        let mut ctx = running();
        let gain = ctx.create_gain().unwrap();
        assert!(matches!(
            ctx.set_param(gain, "gain", f32::NAN),
            Err(HostError::NonFiniteParam(_))
        ));
        assert_eq!(ctx.param(gain, "gain"), Some(1.0));
    }

    #[test]
    fn duplicate_edges_are_rejected() {
        let mut ctx = running();
        let src = ctx.create_constant_source().unwrap();
        ctx.connect(src, ctx.destination()).unwrap();
        assert!(ctx.connect(src, ctx.destination()).is_err());
    }

    #[test]
    fn debug_summarizes_state_and_counts() {
        let mut ctx = running();
        ctx.create_gain().unwrap();
        let text = format!("{ctx:?}");
        assert!(text.starts_with("AudioContext {"), "{text}");
        assert!(text.contains("state: Running"), "{text}");
        assert!(text.contains("nodes: 2"), "{text}");
        assert!(text.contains("edges: 0"), "{text}");
    }
}
