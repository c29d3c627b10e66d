//! Fixed per-type tables that the generic metadata cannot express.
//!
//! - **Modulation targets**: continuously settable numeric parameters that can
//!   be driven by another unit's output. A connection may target one of these
//!   by name even when it is not listed among the unit's declared inputs.
//! - **Recreation-required properties**: properties the host cannot change on a
//!   live unit. Updating one means tearing the unit down and building a new one.
//! - **Construction properties**: properties consumed while a unit is built
//!   (a synthesized or decoded buffer). They have no live counterpart to patch.
//! - **Output sink**: the engine's fixed destination, which is never constructed.

/// Type name of the engine's fixed output sink.
pub const OUTPUT_SINK: &str = "AudioDestination";

/// Type name of the noise source, whose buffer is synthesized before construction.
pub const NOISE_SOURCE: &str = "NoiseSource";

/// Type name of the file-backed buffer player, whose buffer is decoded after
/// construction.
pub const BUFFER_SOURCE: &str = "BufferSource";

/// Type name of the analysis tap inserted in front of the output sink.
pub const ANALYSER: &str = "Analyser";

/// Property that decides whether a startable unit starts on construction.
pub const AUTOSTART: &str = "autostart";

const MODULATION_TARGETS: &[(&str, &[&str])] = &[
    ("Oscillator", &["frequency", "detune"]),
    ("Gain", &["gain"]),
    ("BiquadFilter", &["frequency", "Q", "gain", "detune"]),
    ("Delay", &["delayTime"]),
    ("ConstantSource", &["offset"]),
    (BUFFER_SOURCE, &["playbackRate", "detune"]),
    (NOISE_SOURCE, &["playbackRate"]),
];

const RECREATION_REQUIRED: &[(&str, &[&str])] = &[
    ("Oscillator", &["type"]),
    (NOISE_SOURCE, &["color", "duration"]),
    ("Delay", &["maxDelayTime"]),
    (BUFFER_SOURCE, &["path"]),
];

const CONSTRUCTION_PROPERTIES: &[(&str, &[&str])] = &[
    (NOISE_SOURCE, &["color", "duration"]),
    (BUFFER_SOURCE, &["path"]),
];

type QuirkTable = [(&'static str, &'static [&'static str])];

fn lookup(table: &'static QuirkTable, type_name: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(t, _)| *t == type_name)
        .map_or(&[], |(_, names)| names)
}

/// Returns the modulation-target names of a unit type.
pub fn modulation_targets(type_name: &str) -> &'static [&'static str] {
    lookup(MODULATION_TARGETS, type_name)
}

/// Returns `true` if `name` is a modulation target of `type_name`.
pub fn is_modulation_target(type_name: &str, name: &str) -> bool {
    modulation_targets(type_name).contains(&name)
}

/// Returns `true` if changing `property` on a live unit of `type_name`
/// requires recreating the unit.
pub fn requires_recreation(type_name: &str, property: &str) -> bool {
    lookup(RECREATION_REQUIRED, type_name).contains(&property)
}

/// Returns `true` if `property` is only read while constructing a unit of
/// `type_name`. [`AUTOSTART`] counts for every type.
pub fn is_construction_property(type_name: &str, property: &str) -> bool {
    property == AUTOSTART || lookup(CONSTRUCTION_PROPERTIES, type_name).contains(&property)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulation_targets_by_type() {
        assert!(is_modulation_target("Oscillator", "frequency"));
        assert!(is_modulation_target("BiquadFilter", "Q"));
        assert!(!is_modulation_target("Oscillator", "type"));
        assert!(modulation_targets("Slider").is_empty());
    }

    #[test]
    fn recreation_required_by_type() {
        assert!(requires_recreation("Oscillator", "type"));
        assert!(requires_recreation("Delay", "maxDelayTime"));
        assert!(!requires_recreation("Oscillator", "frequency"));
        assert!(!requires_recreation("Unknown", "type"));
    }

    #[test]
    fn construction_properties_by_type() {
        assert!(is_construction_property(BUFFER_SOURCE, "path"));
        assert!(is_construction_property(NOISE_SOURCE, "color"));
        assert!(is_construction_property("Oscillator", AUTOSTART));
        assert!(!is_construction_property(BUFFER_SOURCE, "playbackRate"));
        assert!(!is_construction_property("Oscillator", "path"));
        // Every construction property is also one that forces recreation.
        for (type_name, names) in CONSTRUCTION_PROPERTIES {
            assert!(names.iter().all(|n| requires_recreation(type_name, n)));
        }
    }
}
