//! Control-node runtime objects.
//!
//! Control units never exist in the host engine. Each one is a
//! [`ControlBehavior`] plus a [`ControlState`] (property map and last value of
//! every output). Behaviors are pure reactions: they receive an input, a
//! property change, a stimulus or a clock tick and answer with the outputs
//! they want to emit. Delivery to downstream units is the
//! [`Propagator`](crate::Propagator)'s job.

mod behaviors;

use std::collections::BTreeMap;
use std::fmt;

use patchwire_catalog::PropertyValue;

pub use behaviors::{Button, MidiToFrequency, Monitor, RangeMapper, RateLimiter, Slider, Timer};

/// Identifier of a control unit inside a [`Propagator`](crate::Propagator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub(crate) u32);

impl ControlId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlId({})", self.0)
    }
}

/// Timing information passed to behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlContext {
    /// Engine time in seconds.
    pub now: f64,
}

/// One output value a behavior wants delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Output port name.
    pub port: &'static str,
    /// Value.
    pub value: f64,
}

impl Emission {
    /// Creates an emission.
    pub fn new(port: &'static str, value: f64) -> Self {
        Self { port, value }
    }
}

/// Property map and output values of one control unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlState {
    properties: BTreeMap<String, PropertyValue>,
    outputs: BTreeMap<String, f64>,
}

impl ControlState {
    /// Creates a state from initial property values.
    pub fn new(properties: BTreeMap<String, PropertyValue>) -> Self {
        Self {
            properties,
            outputs: BTreeMap::new(),
        }
    }

    /// A property value.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// A numeric property, or `fallback` when absent or not numeric.
    pub fn number(&self, name: &str, fallback: f64) -> f64 {
        self.properties
            .get(name)
            .and_then(PropertyValue::as_f64)
            .unwrap_or(fallback)
    }

    /// A boolean property, or `fallback`.
    pub fn flag(&self, name: &str, fallback: bool) -> bool {
        self.properties
            .get(name)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(fallback)
    }

    /// Sets a property.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.properties.insert(name.to_string(), value);
    }

    /// Last value emitted on `port`.
    pub fn output(&self, port: &str) -> Option<f64> {
        self.outputs.get(port).copied()
    }

    pub(crate) fn set_output(&mut self, port: &str, value: f64) {
        self.outputs.insert(port.to_string(), value);
    }
}

/// Reaction logic of one control unit type.
pub trait ControlBehavior: fmt::Debug {
    /// Catalog type name.
    fn type_name(&self) -> &'static str;

    /// A value arrived on input `port`.
    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        cx: &ControlContext,
    ) -> Vec<Emission>;

    /// A property was set from outside (already stored in `state`).
    fn property_changed(
        &mut self,
        _state: &mut ControlState,
        _name: &str,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        Vec::new()
    }

    /// User stimulus without a value, e.g. a button press.
    fn stimulate(&mut self, _state: &mut ControlState, _cx: &ControlContext) -> Vec<Emission> {
        Vec::new()
    }

    /// Clock tick before each rendered block.
    fn tick(&mut self, _state: &mut ControlState, _cx: &ControlContext) -> Vec<Emission> {
        Vec::new()
    }

    /// Outputs held from construction, stored without fan-out.
    fn initial(&self, _state: &ControlState) -> Vec<Emission> {
        Vec::new()
    }

    /// Whether [`stimulate`](Self::stimulate) does anything.
    fn accepts_stimulus(&self) -> bool {
        false
    }
}

/// Constructs a control behavior.
pub type BehaviorConstructor = fn() -> Box<dyn ControlBehavior>;

const BEHAVIORS: &[(&str, BehaviorConstructor)] = &[
    ("Slider", || Box::new(Slider) as Box<dyn ControlBehavior>),
    ("Button", || Box::new(Button) as Box<dyn ControlBehavior>),
    ("MidiToFrequency", || Box::new(MidiToFrequency) as Box<dyn ControlBehavior>),
    ("RangeMapper", || Box::new(RangeMapper) as Box<dyn ControlBehavior>),
    ("RateLimiter", || Box::new(RateLimiter::default()) as Box<dyn ControlBehavior>),
    ("Timer", || Box::new(Timer::default()) as Box<dyn ControlBehavior>),
    ("Monitor", || Box::new(Monitor) as Box<dyn ControlBehavior>),
];

/// Looks up the behavior constructor for a control type.
pub fn behavior_constructor(type_name: &str) -> Option<BehaviorConstructor> {
    BEHAVIORS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, ctor)| *ctor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_catalog::Catalog;

    #[test]
    fn every_catalog_control_type_has_a_behavior() {
        let catalog = Catalog::new();
        for unit in catalog.all_units().iter().filter(|u| u.is_control()) {
            let ctor = behavior_constructor(&unit.name)
                .unwrap_or_else(|| panic!("no behavior for {}", unit.name));
            assert_eq!(ctor().type_name(), unit.name);
        }
    }

    #[test]
    fn state_accessors_fall_back() {
        let mut state = ControlState::default();
        assert_eq!(state.number("min", -1.0), -1.0);
        state.set_property("min", PropertyValue::Number(2.0));
        assert_eq!(state.number("min", -1.0), 2.0);
        assert!(state.flag("clamp", true));
        assert!(state.output("value").is_none());
    }
}
