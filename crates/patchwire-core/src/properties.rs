//! Property Update Engine.
//!
//! Two steps: [`coerce`](PropertyUpdateEngine::coerce) turns a raw value into
//! one the declared property type accepts, and
//! [`apply`](PropertyUpdateEngine::apply) pushes it into the live unit. A
//! property on the recreation-required list is never patched in place; the
//! caller rebuilds the unit instead.
//!
//! Coercion rules by declared kind:
//!
//! | Kind | Invalid input | Out of range |
//! |---|---|---|
//! | number / integer | default (warning) | clamped (warning) |
//! | boolean, enum | default (warning) | - |
//! | text | stringified | - |
//! | unknown | passed through | - |
//!
//! Non-finite numbers on a modulation target are rejected outright.

use patchwire_catalog::{PropertyKind, PropertySpec, PropertyValue, UnitSpec, quirks};
use patchwire_host::{AudioContext, FieldValue, HostNodeId};

use crate::diagnostics::{Category, Diagnostic, Diagnostics};
use crate::document::NodeId;
use crate::error::PropertyError;
use crate::live::{LiveEngine, LiveUnit};

/// Result of applying one property to a live unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Patched in place.
    Applied,
    /// The property cannot change on a live unit; rebuild it.
    Recreate,
    /// Not applied; a diagnostic says why.
    Rejected,
}

/// Validates values and applies them to live units.
#[derive(Debug, Clone)]
pub struct PropertyUpdateEngine {
    diagnostics: Diagnostics,
}

impl PropertyUpdateEngine {
    /// Creates an engine that reports to `diagnostics`.
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Coerces `value` to the declared type of `name`.
    ///
    /// Adjustments (clamping, fallback to the default) are reported as
    /// warnings. Unknown properties and non-finite modulation values are
    /// errors and are left for the caller to report.
    pub fn coerce(
        &self,
        meta: &UnitSpec,
        name: &str,
        value: &PropertyValue,
        node: Option<NodeId>,
    ) -> Result<PropertyValue, PropertyError> {
        let spec = meta
            .find_property(name)
            .ok_or_else(|| PropertyError::NotFound {
                unit: meta.name.clone(),
                property: name.to_string(),
            })?;

        match spec.kind {
            PropertyKind::Number | PropertyKind::Integer => {
                let Some(n) = value.as_f64() else {
                    return Ok(self.fallback(spec, value, "not a number", node));
                };
                if !n.is_finite() && !quirks::is_modulation_target(&meta.name, name) {
                    return Ok(self.fallback(spec, value, "not finite", node));
                }
                self.coerce_number(spec, n, node).map(PropertyValue::Number)
            }
            PropertyKind::Boolean => match value.as_bool() {
                Some(b) => Ok(PropertyValue::Bool(b)),
                None => Ok(self.fallback(spec, value, "not a boolean", node)),
            },
            PropertyKind::Enum => match value.as_str() {
                Some(option) if spec.has_option(option) => Ok(value.clone()),
                _ => Ok(self.fallback(spec, value, "not a valid option", node)),
            },
            PropertyKind::Text => Ok(match value {
                PropertyValue::Text(_) => value.clone(),
                PropertyValue::Number(n) => PropertyValue::Text(n.to_string()),
                PropertyValue::Bool(b) => PropertyValue::Text(b.to_string()),
            }),
            PropertyKind::Unknown => Ok(value.clone()),
        }
    }

    /// Coerces a value arriving at a modulation target from a control route.
    ///
    /// Follows the number rules of [`coerce`](Self::coerce): out-of-range
    /// values are clamped with a warning and non-finite values are errors.
    pub fn coerce_modulation(
        &self,
        spec: &PropertySpec,
        value: f64,
        node: Option<NodeId>,
    ) -> Result<f64, PropertyError> {
        self.coerce_number(spec, value, node)
    }

    fn coerce_number(
        &self,
        spec: &PropertySpec,
        mut n: f64,
        node: Option<NodeId>,
    ) -> Result<f64, PropertyError> {
        if !n.is_finite() {
            return Err(PropertyError::NonFinite {
                property: spec.name.clone(),
            });
        }
        if spec.kind == PropertyKind::Integer {
            n = n.round();
        }
        let clamped = clamp(n, spec.min, spec.max);
        if clamped != n {
            self.diagnostics.report(
                Diagnostic::warning(
                    Category::Property,
                    format!("'{}' clamped to {clamped}", spec.name),
                )
                .with_node(node)
                .with_details(format!("requested {n}")),
            );
        }
        Ok(clamped)
    }

    /// Applies a property to a live unit.
    ///
    /// Recreation-required properties return [`UpdateOutcome::Recreate`]
    /// without touching the unit. Every rejection is reported.
    pub fn apply(
        &self,
        engine: &mut LiveEngine,
        unit: LiveUnit,
        meta: &UnitSpec,
        name: &str,
        value: &PropertyValue,
        node: Option<NodeId>,
    ) -> UpdateOutcome {
        if quirks::requires_recreation(&meta.name, name) {
            tracing::debug!("property_recreate: {}.{name}", meta.name);
            return UpdateOutcome::Recreate;
        }
        self.apply_in_place(engine, unit, meta, name, value, node)
    }

    /// Applies a property without consulting the recreation list. Used while
    /// a unit is being constructed, when every property is still settable.
    pub(crate) fn apply_in_place(
        &self,
        engine: &mut LiveEngine,
        unit: LiveUnit,
        meta: &UnitSpec,
        name: &str,
        value: &PropertyValue,
        node: Option<NodeId>,
    ) -> UpdateOutcome {
        let result = self
            .coerce(meta, name, value, node)
            .and_then(|coerced| self.apply_live(engine, unit, meta, name, &coerced));
        match result {
            Ok(()) => UpdateOutcome::Applied,
            Err(err) => {
                let category = match err {
                    PropertyError::Host(_) => Category::Host,
                    _ => Category::Property,
                };
                self.diagnostics.report(
                    Diagnostic::error(category, format!("'{name}' not applied"))
                        .with_node(node)
                        .with_details(err.to_string()),
                );
                UpdateOutcome::Rejected
            }
        }
    }

    /// Applies a property and returns `true` only if it was patched in place.
    pub fn update(
        &self,
        engine: &mut LiveEngine,
        unit: LiveUnit,
        meta: &UnitSpec,
        name: &str,
        value: &PropertyValue,
        node: Option<NodeId>,
    ) -> bool {
        self.apply(engine, unit, meta, name, value, node) == UpdateOutcome::Applied
    }

    /// Writes an already coerced value into the live unit.
    pub(crate) fn apply_live(
        &self,
        engine: &mut LiveEngine,
        unit: LiveUnit,
        meta: &UnitSpec,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), PropertyError> {
        match unit {
            LiveUnit::Control(id) => {
                engine
                    .propagator
                    .set_property(&mut engine.context, id, name, value.clone());
                Ok(())
            }
            LiveUnit::Host(host) => {
                if quirks::is_modulation_target(&meta.name, name) {
                    let n = value.as_f64().ok_or_else(|| PropertyError::Validation {
                        property: name.to_string(),
                        reason: format!("{value} is not numeric"),
                    })?;
                    write_modulation_target(&mut engine.context, host, name, n)
                } else if quirks::is_construction_property(&meta.name, name) {
                    Ok(())
                } else {
                    engine
                        .context
                        .set_field(host, name, &to_field(value))
                        .map_err(PropertyError::from)
                }
            }
        }
    }
}

/// Sets a modulation target's base value. Non-finite values are rejected and
/// leave the previous value in place.
pub fn write_modulation_target(
    ctx: &mut AudioContext,
    node: HostNodeId,
    param: &str,
    value: f64,
) -> Result<(), PropertyError> {
    if !value.is_finite() {
        return Err(PropertyError::NonFinite {
            property: param.to_string(),
        });
    }
    ctx.set_param(node, param, value as f32)?;
    Ok(())
}

pub(crate) fn to_field(value: &PropertyValue) -> FieldValue {
    match value {
        PropertyValue::Bool(b) => FieldValue::Bool(*b),
        PropertyValue::Number(n) => FieldValue::Number(*n),
        PropertyValue::Text(s) => FieldValue::Text(s.clone()),
    }
}

pub(crate) fn from_field(value: FieldValue) -> PropertyValue {
    match value {
        FieldValue::Bool(b) => PropertyValue::Bool(b),
        FieldValue::Number(n) => PropertyValue::Number(n),
        FieldValue::Text(s) => PropertyValue::Text(s),
    }
}

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |m| value.max(m));
    max.map_or(value, |m| value.min(m))
}

impl PropertyUpdateEngine {
    fn fallback(
        &self,
        spec: &PropertySpec,
        value: &PropertyValue,
        reason: &str,
        node: Option<NodeId>,
    ) -> PropertyValue {
        self.diagnostics.report(
            Diagnostic::warning(
                Category::Property,
                format!("'{}' {reason}, using default {}", spec.name, spec.default),
            )
            .with_node(node)
            .with_details(format!("requested {value}")),
        );
        spec.default.clone()
    }
}
