//! Unit metadata: ports, properties, lifecycle methods.
//!
//! A [`UnitSpec`] is pure data. It describes what a unit type exposes and never
//! carries behavior; the factory and property engine in `patchwire-core`
//! interpret it.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "inputs":  ["input"],
//!   "outputs": [{ "name": "output", "kind": "signal" }],
//!   "properties": [
//!     { "name": "gain", "kind": "number", "default": 1.0, "min": 0.0, "max": 10.0 }
//!   ],
//!   "methods": [],
//!   "events": []
//! }
//! ```
//!
//! Ports may be written as a bare name (signal kind) or as a full object.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::value::PropertyValue;

/// Lifecycle method name that marks a unit as startable.
pub const METHOD_START: &str = "start";
/// Lifecycle method name for stopping a startable unit.
pub const METHOD_STOP: &str = "stop";

/// Broad grouping of unit types, used for listing and for deciding where a
/// unit lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Generates signal (oscillators, noise, buffers).
    Source,
    /// Transforms signal (gain, filters, delays).
    #[default]
    Effect,
    /// Observes signal without altering it.
    Analysis,
    /// The engine's output sink.
    Output,
    /// Non-signal units that exist only in the control network.
    Control,
}

impl UnitCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            UnitCategory::Source => "Source",
            UnitCategory::Effect => "Effect",
            UnitCategory::Analysis => "Analysis",
            UnitCategory::Output => "Output",
            UnitCategory::Control => "Control",
        }
    }
}

/// What travels through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Audio-rate signal handled by the host engine.
    #[default]
    Signal,
    /// Discrete control values pushed through the control network.
    Control,
}

/// A named input or output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PortRepr")]
pub struct PortSpec {
    /// Port name, unique among a unit's inputs (or outputs).
    pub name: String,
    /// Port kind.
    pub kind: PortKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        kind: PortKind,
    },
}

impl From<PortRepr> for PortSpec {
    fn from(repr: PortRepr) -> Self {
        match repr {
            PortRepr::Name(name) => Self {
                name,
                kind: PortKind::Signal,
            },
            PortRepr::Full { name, kind } => Self { name, kind },
        }
    }
}

impl PortSpec {
    /// Creates a signal port.
    pub fn signal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Signal,
        }
    }

    /// Creates a control port.
    pub fn control(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Control,
        }
    }
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Floating-point value, clamped to `[min, max]`.
    Number,
    /// Whole number, rounded then clamped to `[min, max]`.
    Integer,
    /// Boolean flag.
    Boolean,
    /// One of a fixed list of option names.
    Enum,
    /// Free text.
    Text,
    /// Anything the catalog does not recognize; passed through unchanged.
    #[serde(other)]
    Unknown,
}

/// Declaration of one property of a unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub kind: PropertyKind,
    /// Value used when a node does not set the property.
    pub default: PropertyValue,
    /// Lower bound for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Valid option names for [`PropertyKind::Enum`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl PropertySpec {
    /// Creates a bounded floating-point property.
    pub fn number(name: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Number,
            default: PropertyValue::Number(default),
            min: Some(min),
            max: Some(max),
            options: Vec::new(),
        }
    }

    /// Creates a bounded integer property.
    pub fn integer(name: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Integer,
            default: PropertyValue::Number(default as f64),
            min: Some(min as f64),
            max: Some(max as f64),
            options: Vec::new(),
        }
    }

    /// Creates a boolean property.
    pub fn boolean(name: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Boolean,
            default: PropertyValue::Bool(default),
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    /// Creates an enumerated property. `default` should be one of `options`.
    pub fn enumeration(name: &str, default: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Enum,
            default: PropertyValue::from(default),
            min: None,
            max: None,
            options: options.iter().map(|o| (*o).to_string()).collect(),
        }
    }

    /// Creates a free-text property.
    pub fn text(name: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Text,
            default: PropertyValue::from(default),
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    /// Returns `true` if `option` is a valid choice for this enum property.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    fn validate(&self, unit: &str) -> Result<(), CatalogError> {
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(CatalogError::InvalidBounds {
                unit: unit.to_string(),
                property: self.name.clone(),
                min,
                max,
            });
        }
        if self.kind == PropertyKind::Enum {
            let valid = self.default.as_str().is_some_and(|d| self.has_option(d));
            if !valid {
                return Err(CatalogError::InvalidDefault {
                    unit: unit.to_string(),
                    property: self.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Complete metadata for one unit type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Type name (the catalog key, e.g. `"Oscillator"`).
    #[serde(default)]
    pub name: String,
    /// Category for listing and runtime placement.
    #[serde(default)]
    pub category: UnitCategory,
    /// Brief description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Declared input ports.
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// Declared output ports.
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    /// Declared properties, in application order.
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    /// Supported lifecycle methods (e.g. `"start"`, `"stop"`).
    #[serde(default)]
    pub methods: Vec<String>,
    /// Events the unit can raise (informational).
    #[serde(default)]
    pub events: Vec<String>,
}

impl UnitSpec {
    /// Creates an empty spec for the given type name and category.
    pub fn new(name: &str, category: UnitCategory) -> Self {
        Self {
            name: name.to_string(),
            category,
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Adds an input port.
    pub fn input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Adds an output port.
    pub fn output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Adds a property declaration.
    pub fn property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    /// Declares the `start`/`stop` lifecycle methods.
    pub fn startable(mut self) -> Self {
        self.methods.push(METHOD_START.to_string());
        self.methods.push(METHOD_STOP.to_string());
        self
    }

    /// Adds an event name.
    pub fn event(mut self, event: &str) -> Self {
        self.events.push(event.to_string());
        self
    }

    /// Looks up an input port by name.
    pub fn find_input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Looks up an output port by name.
    pub fn find_output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Looks up a property declaration by name.
    pub fn find_property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns `true` if the unit declares the `start` lifecycle method.
    pub fn is_startable(&self) -> bool {
        self.methods.iter().any(|m| m == METHOD_START)
    }

    /// Returns `true` if the unit lives in the control network rather than
    /// the host engine.
    pub fn is_control(&self) -> bool {
        self.category == UnitCategory::Control
    }

    /// Checks internal consistency (bounds ordering, enum defaults, unique
    /// port and property names).
    pub fn validate(&self) -> Result<(), CatalogError> {
        for property in &self.properties {
            property.validate(&self.name)?;
        }
        let unique = |names: Vec<&str>| {
            let mut sorted = names.clone();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.len() == names.len()
        };
        if !unique(self.inputs.iter().map(|p| p.name.as_str()).collect())
            || !unique(self.outputs.iter().map(|p| p.name.as_str()).collect())
            || !unique(self.properties.iter().map(|p| p.name.as_str()).collect())
        {
            return Err(CatalogError::DuplicateName(self.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_accept_bare_names() {
        let spec: UnitSpec = serde_json::from_str(
            r#"{ "inputs": ["input", { "name": "cv", "kind": "control" }], "outputs": ["output"] }"#,
        )
        .unwrap();
        assert_eq!(spec.inputs[0], PortSpec::signal("input"));
        assert_eq!(spec.inputs[1], PortSpec::control("cv"));
        assert_eq!(spec.find_output("output").unwrap().kind, PortKind::Signal);
    }

    #[test]
    fn unknown_property_kind_deserializes() {
        let p: PropertySpec =
            serde_json::from_str(r#"{ "name": "curve", "kind": "float32array", "default": "" }"#)
                .unwrap();
        assert_eq!(p.kind, PropertyKind::Unknown);
    }

    #[test]
    fn startable_flag() {
        let spec = UnitSpec::new("Osc", UnitCategory::Source).startable();
        assert!(spec.is_startable());
        assert!(!UnitSpec::new("Gain", UnitCategory::Effect).is_startable());
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let spec = UnitSpec::new("Bad", UnitCategory::Effect)
            .property(PropertySpec::number("x", 0.0, 1.0, -1.0));
        assert!(matches!(
            spec.validate(),
            Err(CatalogError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_enum_default_outside_options() {
        let spec = UnitSpec::new("Bad", UnitCategory::Effect)
            .property(PropertySpec::enumeration("mode", "zigzag", &["a", "b"]));
        assert!(matches!(
            spec.validate(),
            Err(CatalogError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_ports() {
        let spec = UnitSpec::new("Bad", UnitCategory::Effect)
            .input(PortSpec::signal("input"))
            .input(PortSpec::control("input"));
        assert!(matches!(spec.validate(), Err(CatalogError::DuplicateName(_))));
    }
}
