//! Processing-unit catalog for patchwire.
//!
//! This crate holds the static metadata that describes every unit type a graph
//! can contain: its ports, its properties (type, default, bounds) and the
//! lifecycle methods it supports. It has no behavior of its own; the factory,
//! router and property engine in `patchwire-core` interpret it.
//!
//! # Features
//!
//! - **Unit Discovery**: List all available unit types with metadata
//! - **Category System**: Units grouped as sources, effects, analysis, output, control
//! - **JSON Loading**: Extend or replace the built-ins from a `type → spec` JSON object
//! - **Quirk Tables**: Modulation targets and recreation-required properties per type
//!
//! # Example
//!
//! ```rust
//! use patchwire_catalog::{Catalog, UnitCategory};
//!
//! let catalog = Catalog::new();
//!
//! for unit in catalog.all_units() {
//!     println!("{}: {}", unit.name, unit.description);
//! }
//!
//! let osc = catalog.get("Oscillator").unwrap();
//! assert!(osc.is_startable());
//!
//! for unit in catalog.units_in_category(UnitCategory::Control) {
//!     println!("Control unit: {}", unit.name);
//! }
//! ```

mod builtin;
mod error;
pub mod quirks;
mod spec;
mod value;

use std::collections::BTreeMap;

pub use builtin::builtin_units;
pub use error::CatalogError;
pub use spec::{
    METHOD_START, METHOD_STOP, PortKind, PortSpec, PropertyKind, PropertySpec, UnitCategory,
    UnitSpec,
};
pub use value::PropertyValue;

/// Registry of all available unit types.
///
/// Entries keep registration order, which is also listing order.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<UnitSpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a new catalog with all built-in units registered.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for unit in builtin_units() {
            catalog.register(unit);
        }
        catalog
    }

    /// Create a catalog with no units.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parse a catalog from a JSON object mapping type names to specs.
    ///
    /// Each spec's `name` is taken from its key.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let mut catalog = Self::empty();
        catalog.merge_json(json)?;
        Ok(catalog)
    }

    /// Merge units from a JSON object over this catalog.
    ///
    /// Units with an existing type name replace the registered entry in place.
    /// Every merged unit is validated before anything is registered.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, CatalogError> {
        let parsed: BTreeMap<String, UnitSpec> = serde_json::from_str(json)?;
        let mut units = Vec::with_capacity(parsed.len());
        for (name, mut spec) in parsed {
            spec.name = name;
            spec.validate()?;
            units.push(spec);
        }
        let count = units.len();
        for unit in units {
            self.register(unit);
        }
        Ok(count)
    }

    /// Register a unit, replacing any entry with the same type name.
    pub fn register(&mut self, spec: UnitSpec) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == spec.name) {
            *existing = spec;
        } else {
            self.entries.push(spec);
        }
    }

    /// Get a unit spec by type name.
    pub fn get(&self, type_name: &str) -> Option<&UnitSpec> {
        self.entries.iter().find(|e| e.name == type_name)
    }

    /// Returns `true` if the type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    /// Get all registered units.
    pub fn all_units(&self) -> &[UnitSpec] {
        &self.entries
    }

    /// Get units in a specific category.
    pub fn units_in_category(&self, category: UnitCategory) -> Vec<&UnitSpec> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Serialize the catalog as a JSON object keyed by type name.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let map: BTreeMap<&str, &UnitSpec> =
            self.entries.iter().map(|e| (e.name.as_str(), e)).collect();
        Ok(serde_json::to_string_pretty(&map)?)
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no units are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog = Catalog::new();
        assert_eq!(catalog.len(), 16);
    }

    #[test]
    fn test_get_unit() {
        let catalog = Catalog::new();
        let osc = catalog.get("Oscillator");
        assert!(osc.is_some());
        assert_eq!(osc.unwrap().category, UnitCategory::Source);

        assert!(catalog.get("Theremin").is_none());
    }

    #[test]
    fn test_units_by_category() {
        let catalog = Catalog::new();
        assert_eq!(catalog.units_in_category(UnitCategory::Source).len(), 4);
        assert_eq!(catalog.units_in_category(UnitCategory::Effect).len(), 3);
        assert_eq!(catalog.units_in_category(UnitCategory::Analysis).len(), 1);
        assert_eq!(catalog.units_in_category(UnitCategory::Output).len(), 1);
        assert_eq!(catalog.units_in_category(UnitCategory::Control).len(), 7);
    }

    #[test]
    fn test_output_sink_registered() {
        let catalog = Catalog::new();
        let sink = catalog.get(quirks::OUTPUT_SINK).unwrap();
        assert!(sink.outputs.is_empty());
        assert!(sink.find_input("input").is_some());
    }

    #[test]
    fn test_from_json_takes_names_from_keys() {
        let catalog = Catalog::from_json(
            r#"{
                "Wobble": {
                    "category": "effect",
                    "inputs": ["input"],
                    "outputs": ["output"],
                    "properties": [
                        { "name": "depth", "kind": "number", "default": 0.5, "min": 0.0, "max": 1.0 }
                    ],
                    "methods": [],
                    "events": []
                }
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        let wobble = catalog.get("Wobble").unwrap();
        assert_eq!(wobble.name, "Wobble");
        assert_eq!(wobble.properties[0].default, PropertyValue::Number(0.5));
    }

    #[test]
    fn test_merge_replaces_existing_entry() {
        let mut catalog = Catalog::new();
        let before = catalog.len();
        let merged = catalog
            .merge_json(r#"{ "Gain": { "inputs": ["input"], "outputs": ["output"] } }"#)
            .unwrap();
        assert_eq!(merged, 1);
        assert_eq!(catalog.len(), before);
        assert!(catalog.get("Gain").unwrap().properties.is_empty());
    }

    #[test]
    fn test_merge_rejects_invalid_units() {
        let mut catalog = Catalog::new();
        let result = catalog.merge_json(
            r#"{ "Bad": { "properties": [
                { "name": "x", "kind": "number", "default": 0.0, "min": 5.0, "max": 1.0 }
            ] } }"#,
        );
        assert!(matches!(result, Err(CatalogError::InvalidBounds { .. })));
        assert!(!catalog.contains("Bad"));
    }

    #[test]
    fn test_json_round_trip() {
        let catalog = Catalog::new();
        let json = catalog.to_json().unwrap();
        let back = Catalog::from_json(&json).unwrap();
        assert_eq!(back.len(), catalog.len());
        for unit in catalog.all_units() {
            assert_eq!(back.get(&unit.name), Some(unit));
        }
    }
}
