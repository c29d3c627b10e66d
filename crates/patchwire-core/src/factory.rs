//! Unit Factory.
//!
//! Turns a type name plus a property set into a [`LiveUnit`]. Host types
//! resolve through a registry of `create<Type>` constructors built once from
//! the catalog; control types resolve to a [`ControlBehavior`](crate::control::ControlBehavior).
//! A few types are special-cased:
//!
//! - the output sink returns the context's existing destination,
//! - the noise source generates its buffer before it is handed to a buffer
//!   source,
//! - a buffer source with a `path` queues its file for decoding.
//!
//! Startable units honor `autostart` after every property has been applied.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use patchwire_catalog::{Catalog, PropertyValue, UnitSpec, quirks};
use patchwire_host::{
    AudioBuffer, AudioContext, ContextState, FieldValue, HostError, HostNodeId, NodeConstructor,
    NoiseColor,
};

use crate::config::EngineConfig;
use crate::control::behavior_constructor;
use crate::diagnostics::{Category, Diagnostic, Diagnostics};
use crate::document::NodeId;
use crate::error::FactoryError;
use crate::live::{LiveEngine, LiveNode, LiveUnit, PendingLoad};
use crate::properties::PropertyUpdateEngine;

/// What [`UnitFactory::trigger`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The unit started.
    Started,
    /// The context is suspended; the start runs on resume.
    Deferred,
    /// The unit was already playing.
    AlreadyRunning,
    /// The host refused; a diagnostic was reported.
    Failed,
    /// The unit has no `start` method.
    NotStartable,
}

/// Builds live units from catalog metadata.
#[derive(Debug)]
pub struct UnitFactory {
    registry: BTreeMap<String, NodeConstructor>,
    known: BTreeSet<String>,
    properties: PropertyUpdateEngine,
    diagnostics: Diagnostics,
    noise_seed: u32,
    default_autostart: bool,
}

impl UnitFactory {
    /// Builds the constructor registry for every host type in `catalog`.
    pub fn new(catalog: &Catalog, config: &EngineConfig, diagnostics: Diagnostics) -> Self {
        let mut registry = BTreeMap::new();
        for unit in catalog.all_units() {
            if unit.is_control() {
                continue;
            }
            if let Some(ctor) = AudioContext::constructor(&format!("create{}", unit.name)) {
                registry.insert(unit.name.clone(), ctor);
            }
        }
        tracing::debug!("factory_new: {} host constructors", registry.len());
        Self {
            registry,
            known: catalog.all_units().iter().map(|u| u.name.clone()).collect(),
            properties: PropertyUpdateEngine::new(diagnostics.clone()),
            diagnostics,
            noise_seed: config.noise_seed,
            default_autostart: config.default_autostart,
        }
    }

    /// Checks that a construction rule exists for `meta`.
    pub fn can_instantiate(&self, meta: &UnitSpec) -> Result<(), FactoryError> {
        let name = meta.name.as_str();
        if !self.known.contains(name) {
            return Err(FactoryError::UnknownType(name.to_string()));
        }
        let supported = if meta.is_control() {
            behavior_constructor(name).is_some()
        } else {
            name == quirks::OUTPUT_SINK
                || name == quirks::NOISE_SOURCE
                || self.registry.contains_key(name)
        };
        if supported {
            Ok(())
        } else {
            Err(FactoryError::UnsupportedType(name.to_string()))
        }
    }

    /// Instantiates a unit, applies every declared property (falling back to
    /// its default) and honors `autostart`.
    pub fn instantiate(
        &self,
        engine: &mut LiveEngine,
        meta: &UnitSpec,
        properties: &BTreeMap<String, PropertyValue>,
        node: Option<NodeId>,
    ) -> Result<LiveNode, FactoryError> {
        self.can_instantiate(meta)?;
        let type_name = meta.name.as_str();

        let declared: BTreeMap<String, PropertyValue> = meta
            .properties
            .iter()
            .map(|p| {
                let value = properties.get(&p.name).unwrap_or(&p.default).clone();
                (p.name.clone(), value)
            })
            .collect();
        let coerced = self.coerce_all(meta, &declared, node);

        let unit = if meta.is_control() {
            let ctor = behavior_constructor(type_name)
                .ok_or_else(|| FactoryError::UnsupportedType(type_name.to_string()))?;
            LiveUnit::Control(engine.propagator.spawn(ctor(), coerced.clone(), node))
        } else {
            let host = self
                .construct_host(engine, type_name, &coerced, node)
                .map_err(|source| FactoryError::Host {
                    type_name: type_name.to_string(),
                    source,
                })?;
            LiveUnit::Host(host)
        };

        if let LiveUnit::Host(host) = unit
            && type_name != quirks::OUTPUT_SINK
        {
            for (name, value) in &coerced {
                if quirks::is_construction_property(type_name, name) {
                    continue;
                }
                self.properties
                    .apply_in_place(engine, unit, meta, name, value, node);
            }
            if let Some(path) = coerced.get("path").and_then(PropertyValue::as_str)
                && !path.is_empty()
            {
                engine.pending_loads.push(PendingLoad {
                    node,
                    host,
                    path: PathBuf::from(path),
                });
            }
        }

        if meta.is_startable() {
            let autostart = coerced
                .get(quirks::AUTOSTART)
                .and_then(PropertyValue::as_bool)
                .unwrap_or(self.default_autostart);
            if autostart {
                self.trigger(engine, unit, meta, node);
            }
        }

        tracing::debug!("factory_instantiate: {type_name} as {unit:?}");
        Ok(LiveNode {
            unit,
            type_name: type_name.to_string(),
            declared,
        })
    }

    fn construct_host(
        &self,
        engine: &mut LiveEngine,
        type_name: &str,
        declared: &BTreeMap<String, PropertyValue>,
        node: Option<NodeId>,
    ) -> Result<HostNodeId, HostError> {
        let ctx = &mut engine.context;
        match type_name {
            quirks::OUTPUT_SINK => Ok(ctx.destination()),
            quirks::NOISE_SOURCE => {
                let color = declared
                    .get("color")
                    .and_then(PropertyValue::as_str)
                    .and_then(NoiseColor::from_name)
                    .unwrap_or(NoiseColor::White);
                let seconds = declared
                    .get("duration")
                    .and_then(PropertyValue::as_f64)
                    .unwrap_or(2.0) as f32;
                let seed = self
                    .noise_seed
                    .wrapping_add(node.map_or(0, NodeId::index));
                let buffer = AudioBuffer::noise(color, seconds, ctx.sample_rate(), seed);
                let id = ctx.create_buffer_source()?;
                ctx.set_buffer(id, buffer)?;
                ctx.set_field(id, "loop", &FieldValue::Bool(true))?;
                Ok(id)
            }
            _ => {
                let ctor = self
                    .registry
                    .get(type_name)
                    .ok_or_else(|| HostError::InvalidOperation(format!("no constructor for {type_name}")))?;
                ctor(ctx)
            }
        }
    }

    fn coerce_all(
        &self,
        meta: &UnitSpec,
        declared: &BTreeMap<String, PropertyValue>,
        node: Option<NodeId>,
    ) -> BTreeMap<String, PropertyValue> {
        declared
            .iter()
            .map(|(name, value)| {
                let coerced = self.properties.coerce(meta, name, value, node).unwrap_or_else(|err| {
                    self.diagnostics.report(
                        Diagnostic::warning(Category::Property, format!("'{name}' reset to default"))
                            .with_node(node)
                            .with_details(err.to_string()),
                    );
                    meta.find_property(name)
                        .map_or_else(|| value.clone(), |p| p.default.clone())
                });
                (name.clone(), coerced)
            })
            .collect()
    }

    /// Starts a startable unit. A double start is swallowed; other host
    /// failures are reported and swallowed.
    pub fn trigger(
        &self,
        engine: &mut LiveEngine,
        unit: LiveUnit,
        meta: &UnitSpec,
        node: Option<NodeId>,
    ) -> TriggerOutcome {
        let LiveUnit::Host(host) = unit else {
            return TriggerOutcome::NotStartable;
        };
        if !meta.is_startable() {
            return TriggerOutcome::NotStartable;
        }
        if engine.context.state() == ContextState::Suspended {
            if !engine.deferred.contains(&host) {
                engine.deferred.push(host);
            }
            tracing::debug!("factory_trigger: {host} deferred until resume");
            return TriggerOutcome::Deferred;
        }
        match engine.context.start(host) {
            Ok(()) => TriggerOutcome::Started,
            Err(HostError::AlreadyStarted(_)) => {
                tracing::debug!("factory_trigger: {host} already started");
                TriggerOutcome::AlreadyRunning
            }
            Err(err) => {
                self.diagnostics.report(
                    Diagnostic::warning(Category::Host, format!("{} failed to start", meta.name))
                        .with_node(node)
                        .with_details(err.to_string()),
                );
                TriggerOutcome::Failed
            }
        }
    }

    /// Stops a startable unit. Every failure is swallowed. Returns `true` if
    /// the unit was playing.
    pub fn stop(&self, engine: &mut LiveEngine, unit: LiveUnit, meta: &UnitSpec) -> bool {
        let LiveUnit::Host(host) = unit else {
            return false;
        };
        if !meta.is_startable() {
            return false;
        }
        engine.deferred.retain(|h| *h != host);
        match engine.context.stop(host) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("factory_stop: {host} {err}");
                false
            }
        }
    }

    /// The property engine used for construction-time application.
    pub fn properties(&self) -> &PropertyUpdateEngine {
        &self.properties
    }
}
