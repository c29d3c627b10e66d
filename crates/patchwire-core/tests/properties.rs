//! Property-based tests for the synchronization engine.
//!
//! Covers patch-set round-trips, numeric clamping and default-value
//! idempotence across the whole built-in catalog.

use std::collections::BTreeMap;

use patchwire_catalog::{PropertyKind, quirks};
use patchwire_core::{
    Catalog, Diagnostics, EngineConfig, GraphSynchronizer, LiveEngine, LiveUnit, NodeId,
    Position, PropertyUpdateEngine, PropertyValue, UnitFactory, UpdateOutcome,
};
use patchwire_host::FieldValue;
use proptest::prelude::*;

const TYPES: &[&str] = &[
    "Oscillator",
    "Gain",
    "BiquadFilter",
    "Delay",
    "ConstantSource",
    "AudioDestination",
    "Slider",
    "RangeMapper",
];

/// One structural edit, addressed by indices into whatever exists.
#[derive(Debug, Clone)]
enum Edit {
    Add(usize),
    Remove(usize),
    Connect(usize, usize),
    Frequency(usize, f64),
    Move(usize, f64),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..TYPES.len()).prop_map(Edit::Add),
        (0usize..8).prop_map(Edit::Remove),
        (0usize..8, 0usize..8).prop_map(|(a, b)| Edit::Connect(a, b)),
        (0usize..8, -100.0f64..30000.0).prop_map(|(n, f)| Edit::Frequency(n, f)),
        (0usize..8, -500.0f64..500.0).prop_map(|(n, x)| Edit::Move(n, x)),
    ]
}

/// Applies an edit, ignoring the ones that do not fit the current graph.
fn apply(sync: &mut GraphSynchronizer, edit: &Edit) {
    let ids: Vec<NodeId> = sync.document().nodes.iter().map(|n| n.id).collect();
    let pick = |i: usize| (!ids.is_empty()).then(|| ids[i % ids.len()]);
    match *edit {
        Edit::Add(t) => {
            let _ = sync.add_node(TYPES[t], Position::default());
        }
        Edit::Remove(n) => {
            if let Some(id) = pick(n) {
                let _ = sync.remove_node(id);
            }
        }
        Edit::Connect(a, b) => {
            if let (Some(a), Some(b)) = (pick(a), pick(b)) {
                let _ = sync.add_edge(a, b, "output", "input");
                let _ = sync.add_edge(a, b, "value", "gain");
            }
        }
        Edit::Frequency(n, f) => {
            if let Some(id) = pick(n) {
                let _ = sync.update_property(id, "frequency", f);
            }
        }
        Edit::Move(n, x) => {
            if let Some(id) = pick(n) {
                let _ = sync.move_node(id, Position::new(x, -x));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Undoing a batch restores the exact document it started from, and
    /// redoing it restores the exact document it produced.
    #[test]
    fn batch_forward_then_inverse_restores_document(
        setup in prop::collection::vec(edit(), 0..12),
        change in prop::collection::vec(edit(), 1..12),
        running in any::<bool>(),
    ) {
        let mut sync = GraphSynchronizer::default();
        if running {
            sync.start();
        }
        for e in &setup {
            apply(&mut sync, e);
        }
        let before = sync.document().to_json().unwrap();

        sync.begin_batch();
        for e in &change {
            apply(&mut sync, e);
        }
        let committed = sync.end_batch();
        let after = sync.document().to_json().unwrap();

        if committed {
            prop_assert!(sync.undo());
            prop_assert_eq!(sync.document().to_json().unwrap(), before);
            prop_assert!(sync.redo());
            prop_assert_eq!(sync.document().to_json().unwrap(), after);
        } else {
            prop_assert_eq!(before, after);
        }
        if running {
            prop_assert_eq!(sync.live_unit_count(), sync.document().node_count());
        }
    }

    /// Every numeric property stores its requested value clamped to the
    /// declared range.
    #[test]
    fn numeric_values_are_clamped(value in -1.0e7f64..1.0e7) {
        let catalog = Catalog::new();
        let engine = PropertyUpdateEngine::new(Diagnostics::new());
        for meta in catalog.all_units() {
            for prop in meta.properties.iter().filter(|p| {
                matches!(p.kind, PropertyKind::Number | PropertyKind::Integer)
            }) {
                let expected = {
                    let v = if prop.kind == PropertyKind::Integer { value.round() } else { value };
                    let v = prop.min.map_or(v, |m| v.max(m));
                    prop.max.map_or(v, |m| v.min(m))
                };
                let coerced = engine
                    .coerce(meta, &prop.name, &PropertyValue::Number(value), None)
                    .unwrap();
                prop_assert_eq!(coerced, PropertyValue::Number(expected));
            }
        }
    }

    /// The document never holds a value outside the declared range, no matter
    /// how it was requested.
    #[test]
    fn document_values_stay_in_range(values in prop::collection::vec(-1.0e5f64..1.0e5, 1..16)) {
        let mut sync = GraphSynchronizer::default();
        let filter = sync.add_node("BiquadFilter", Position::default()).unwrap();
        for v in values {
            sync.update_property(filter, "Q", v).unwrap();
            let stored = sync.document().node(filter).unwrap().properties["Q"].as_f64().unwrap();
            prop_assert!((0.0001..=1000.0).contains(&stored));
        }
    }
}

/// Reads back a property from a live unit, or `None` when the unit has no
/// observable counterpart for it.
fn observe(engine: &LiveEngine, unit: LiveUnit, type_name: &str, name: &str) -> Option<PropertyValue> {
    match unit {
        LiveUnit::Control(id) => engine.propagator().property(id, name).cloned(),
        LiveUnit::Host(host) => {
            let ctx = engine.context();
            if quirks::is_modulation_target(type_name, name) {
                return ctx.param(host, name).map(|v| PropertyValue::Number(f64::from(v)));
            }
            Some(match ctx.field(host, name)? {
                FieldValue::Number(n) => PropertyValue::Number(n),
                FieldValue::Bool(b) => PropertyValue::Bool(b),
                FieldValue::Text(s) => PropertyValue::Text(s),
            })
        }
    }
}

fn approx_eq(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() <= 1e-6 * x.abs().max(1.0),
        _ => a == b,
    }
}

#[test]
fn updating_with_defaults_keeps_defaults() {
    let catalog = Catalog::new();
    let diagnostics = Diagnostics::new();
    let config = EngineConfig::default();
    let factory = UnitFactory::new(&catalog, &config, diagnostics.clone());
    let properties = PropertyUpdateEngine::new(diagnostics.clone());
    let mut engine = LiveEngine::new(&config, diagnostics.clone());

    for meta in catalog.all_units() {
        let live = factory
            .instantiate(&mut engine, meta, &BTreeMap::new(), None)
            .unwrap();
        for prop in &meta.properties {
            let outcome =
                properties.apply(&mut engine, live.unit, meta, &prop.name, &prop.default, None);
            if quirks::requires_recreation(&meta.name, &prop.name) {
                assert_eq!(outcome, UpdateOutcome::Recreate, "{}.{}", meta.name, prop.name);
            } else {
                assert_eq!(outcome, UpdateOutcome::Applied, "{}.{}", meta.name, prop.name);
            }
            if let Some(observed) = observe(&engine, live.unit, &meta.name, &prop.name) {
                assert!(
                    approx_eq(&observed, &prop.default),
                    "{}.{}: observed {observed}, default {}",
                    meta.name,
                    prop.name,
                    prop.default
                );
            }
        }
    }
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.snapshot());
}
