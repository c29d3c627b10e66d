//! Push network among control units.
//!
//! Control units live here, outside the host engine. When one of them emits a
//! value the propagator delivers it synchronously to every registered route:
//! another control unit's input, or a modulation target on a host unit. Host
//! signal outputs can also feed control inputs; those routes are sampled once
//! per rendered block through [`Propagator::sample_host`].
//!
//! There is no cycle detection. Feedback loops among control units are legal
//! and bounded only by the maximum fan-out depth; hitting it drops the value
//! and raises a warning.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use patchwire_catalog::{PropertySpec, PropertyValue};
use patchwire_host::{AudioContext, HostNodeId};

use crate::control::{ControlBehavior, ControlContext, ControlId, ControlState, Emission};
use crate::diagnostics::{Category, Diagnostic, Diagnostics};
use crate::document::NodeId;
use crate::properties::{PropertyUpdateEngine, write_modulation_target};

/// Identifier of a registered route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) u32);

impl RouteId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.0)
    }
}

/// Where a route's values come from.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSource {
    /// An output port of a control unit.
    Control {
        /// Emitting unit.
        unit: ControlId,
        /// Output port.
        port: String,
    },
    /// The signal output of a host unit, sampled once per block.
    Host {
        /// Sampled host unit.
        node: HostNodeId,
    },
}

/// Where a route's values go.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteTarget {
    /// An input port of a control unit.
    Control {
        /// Receiving unit.
        unit: ControlId,
        /// Input port.
        port: String,
    },
    /// A modulation target on a host unit.
    Modulation {
        /// Host unit.
        node: HostNodeId,
        /// Parameter name.
        param: String,
        /// Visual node the host unit belongs to, for diagnostics.
        owner: Option<NodeId>,
        /// Declared property the value is clamped to, if any.
        range: Option<PropertySpec>,
    },
}

#[derive(Debug)]
struct ControlUnit {
    behavior: Box<dyn ControlBehavior>,
    state: ControlState,
    node: Option<NodeId>,
}

#[derive(Debug)]
struct ControlRoute {
    source: RouteSource,
    target: RouteTarget,
}

impl ControlRoute {
    fn touches_unit(&self, id: ControlId) -> bool {
        matches!(&self.source, RouteSource::Control { unit, .. } if *unit == id)
            || matches!(&self.target, RouteTarget::Control { unit, .. } if *unit == id)
    }

    fn touches_host(&self, id: HostNodeId) -> bool {
        matches!(&self.source, RouteSource::Host { node } if *node == id)
            || matches!(&self.target, RouteTarget::Modulation { node, .. } if *node == id)
    }
}

enum Work {
    Emit {
        unit: ControlId,
        emission: Emission,
        depth: usize,
    },
    Deliver {
        target: RouteTarget,
        value: f64,
        depth: usize,
    },
}

/// Owner of every control unit and control route.
#[derive(Debug)]
pub struct Propagator {
    units: Vec<Option<ControlUnit>>,
    routes: Vec<Option<ControlRoute>>,
    max_depth: usize,
    diagnostics: Diagnostics,
    properties: PropertyUpdateEngine,
}

impl Propagator {
    /// Creates an empty network.
    pub fn new(max_depth: usize, diagnostics: Diagnostics) -> Self {
        Self {
            units: Vec::new(),
            routes: Vec::new(),
            max_depth: max_depth.max(1),
            properties: PropertyUpdateEngine::new(diagnostics.clone()),
            diagnostics,
        }
    }

    // --- Units ---

    /// Adds a control unit. Its initial outputs are stored without fan-out.
    pub fn spawn(
        &mut self,
        behavior: Box<dyn ControlBehavior>,
        properties: BTreeMap<String, PropertyValue>,
        node: Option<NodeId>,
    ) -> ControlId {
        let mut state = ControlState::new(properties);
        for emission in behavior.initial(&state) {
            state.set_output(emission.port, emission.value);
        }
        let id = ControlId(self.units.len() as u32);
        tracing::debug!("propagate_spawn: {} {id}", behavior.type_name());
        self.units.push(Some(ControlUnit {
            behavior,
            state,
            node,
        }));
        id
    }

    /// Removes a unit and every route touching it.
    pub fn remove(&mut self, id: ControlId) -> bool {
        let removed = self
            .units
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .is_some();
        if removed {
            for slot in &mut self.routes {
                if slot.as_ref().is_some_and(|r| r.touches_unit(id)) {
                    *slot = None;
                }
            }
            tracing::debug!("propagate_remove: {id}");
        }
        removed
    }

    /// Drops every route that samples or modulates a host unit.
    pub fn forget_host(&mut self, node: HostNodeId) -> usize {
        let mut dropped = 0;
        for slot in &mut self.routes {
            if slot.as_ref().is_some_and(|r| r.touches_host(node)) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }

    /// Returns `true` if the unit exists.
    pub fn contains(&self, id: ControlId) -> bool {
        self.unit(id).is_some()
    }

    /// Type name of a unit.
    pub fn type_name(&self, id: ControlId) -> Option<&'static str> {
        self.unit(id).map(|u| u.behavior.type_name())
    }

    /// Whether a unit reacts to [`stimulate`](Self::stimulate).
    pub fn accepts_stimulus(&self, id: ControlId) -> Option<bool> {
        self.unit(id).map(|u| u.behavior.accepts_stimulus())
    }

    /// Last value a unit emitted on `port`.
    pub fn output(&self, id: ControlId, port: &str) -> Option<f64> {
        self.unit(id)?.state.output(port)
    }

    /// Current value of a unit's property.
    pub fn property(&self, id: ControlId, name: &str) -> Option<&PropertyValue> {
        self.unit(id)?.state.property(name)
    }

    /// Number of live units.
    pub fn len(&self) -> usize {
        self.units.iter().filter(|u| u.is_some()).count()
    }

    /// Returns `true` if there are no units.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Routes ---

    /// Registers a route. If the source already holds a value, it is delivered
    /// to the new target right away.
    pub fn register(
        &mut self,
        ctx: &mut AudioContext,
        source: RouteSource,
        target: RouteTarget,
    ) -> RouteId {
        let current = match &source {
            RouteSource::Control { unit, port } => self.output(*unit, port),
            RouteSource::Host { .. } => None,
        };
        let id = RouteId(self.routes.len() as u32);
        tracing::debug!("propagate_register: {id} {source:?} → {target:?}");
        self.routes.push(Some(ControlRoute {
            source,
            target: target.clone(),
        }));
        if let Some(value) = current {
            self.run(
                ctx,
                vec![Work::Deliver {
                    target,
                    value,
                    depth: 1,
                }],
            );
        }
        id
    }

    /// Removes a route. Unknown IDs are ignored.
    pub fn unregister(&mut self, id: RouteId) -> bool {
        let removed = self
            .routes
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .is_some();
        if removed {
            tracing::debug!("propagate_unregister: {id}");
        }
        removed
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.iter().filter(|r| r.is_some()).count()
    }

    // --- Stimulus ---

    /// Delivers a value into a unit's input and fans out whatever it emits.
    pub fn receive(&mut self, ctx: &mut AudioContext, unit: ControlId, port: &str, value: f64) -> bool {
        if !self.contains(unit) {
            return false;
        }
        self.run(
            ctx,
            vec![Work::Deliver {
                target: RouteTarget::Control {
                    unit,
                    port: port.to_string(),
                },
                value,
                depth: 0,
            }],
        );
        true
    }

    /// Stores a property value and fans out the unit's reaction.
    pub fn set_property(
        &mut self,
        ctx: &mut AudioContext,
        unit: ControlId,
        name: &str,
        value: PropertyValue,
    ) -> bool {
        let cx = Self::clock(ctx);
        let Some(entry) = self.unit_mut(unit) else {
            return false;
        };
        entry.state.set_property(name, value);
        let emissions = entry.behavior.property_changed(&mut entry.state, name, &cx);
        self.run(ctx, Self::emits(unit, emissions));
        true
    }

    /// User stimulus without a value (a button press).
    pub fn stimulate(&mut self, ctx: &mut AudioContext, unit: ControlId) -> bool {
        let cx = Self::clock(ctx);
        let Some(entry) = self.unit_mut(unit) else {
            return false;
        };
        let emissions = entry.behavior.stimulate(&mut entry.state, &cx);
        self.run(ctx, Self::emits(unit, emissions));
        true
    }

    /// Advances every unit's clock. Called before each rendered block.
    pub fn tick(&mut self, ctx: &mut AudioContext) {
        let cx = Self::clock(ctx);
        let mut work = Vec::new();
        for (idx, slot) in self.units.iter_mut().enumerate() {
            if let Some(entry) = slot {
                let emissions = entry.behavior.tick(&mut entry.state, &cx);
                work.extend(Self::emits(ControlId(idx as u32), emissions));
            }
        }
        if !work.is_empty() {
            self.run(ctx, work);
        }
    }

    /// Samples host outputs routed into control inputs. Called after each
    /// rendered block.
    pub fn sample_host(&mut self, ctx: &mut AudioContext) {
        let work: Vec<Work> = self
            .routes
            .iter()
            .flatten()
            .filter_map(|route| match route.source {
                RouteSource::Host { node } => ctx.output_sample(node).map(|value| Work::Deliver {
                    target: route.target.clone(),
                    value: f64::from(value),
                    depth: 1,
                }),
                RouteSource::Control { .. } => None,
            })
            .collect();
        if !work.is_empty() {
            self.run(ctx, work);
        }
    }

    // --- Fan-out ---

    fn run(&mut self, ctx: &mut AudioContext, seed: Vec<Work>) {
        let cx = Self::clock(ctx);
        let mut queue: VecDeque<Work> = seed.into();
        let mut truncated: Option<Option<NodeId>> = None;

        while let Some(work) = queue.pop_front() {
            match work {
                Work::Emit {
                    unit,
                    emission,
                    depth,
                } => {
                    let Some(entry) = self.unit_mut(unit) else {
                        continue;
                    };
                    entry.state.set_output(emission.port, emission.value);
                    let node = entry.node;
                    if depth >= self.max_depth {
                        truncated.get_or_insert(node);
                        continue;
                    }
                    for target in self.targets_of(unit, emission.port) {
                        queue.push_back(Work::Deliver {
                            target,
                            value: emission.value,
                            depth: depth + 1,
                        });
                    }
                }
                Work::Deliver {
                    target,
                    value,
                    depth,
                } => match target {
                    RouteTarget::Control { unit, port } => {
                        let Some(entry) = self.unit_mut(unit) else {
                            continue;
                        };
                        let emissions = entry.behavior.receive(&mut entry.state, &port, value, &cx);
                        queue.extend(emissions.into_iter().map(|emission| Work::Emit {
                            unit,
                            emission,
                            depth,
                        }));
                    }
                    RouteTarget::Modulation {
                        node,
                        param,
                        owner,
                        range,
                    } => {
                        let written = match &range {
                            Some(spec) => self.properties.coerce_modulation(spec, value, owner),
                            None => Ok(value),
                        }
                        .and_then(|value| write_modulation_target(ctx, node, &param, value));
                        if let Err(err) = written {
                            self.diagnostics.report(
                                Diagnostic::error(
                                    Category::Property,
                                    format!("modulation of '{param}' rejected"),
                                )
                                .with_node(owner)
                                .with_details(err.to_string()),
                            );
                        }
                    }
                },
            }
        }

        if let Some(node) = truncated {
            self.diagnostics.report(
                Diagnostic::warning(
                    Category::Propagation,
                    format!("fan-out stopped at depth {}", self.max_depth),
                )
                .with_node(node),
            );
        }
    }

    fn targets_of(&self, unit: ControlId, port: &str) -> Vec<RouteTarget> {
        self.routes
            .iter()
            .flatten()
            .filter(|r| matches!(&r.source, RouteSource::Control { unit: u, port: p } if *u == unit && p == port))
            .map(|r| r.target.clone())
            .collect()
    }

    fn emits(unit: ControlId, emissions: Vec<Emission>) -> Vec<Work> {
        emissions
            .into_iter()
            .map(|emission| Work::Emit {
                unit,
                emission,
                depth: 0,
            })
            .collect()
    }

    fn clock(ctx: &AudioContext) -> ControlContext {
        ControlContext {
            now: ctx.current_time(),
        }
    }

    fn unit(&self, id: ControlId) -> Option<&ControlUnit> {
        self.units.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn unit_mut(&mut self, id: ControlId) -> Option<&mut ControlUnit> {
        self.units.get_mut(id.0 as usize).and_then(Option::as_mut)
    }
}
