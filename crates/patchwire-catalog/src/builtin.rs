//! Built-in unit types.
//!
//! Host units mirror the reference engine's constructors one-to-one (the type
//! name `Gain` resolves to `createGain`). Control units exist only in the
//! control network.

use crate::spec::{PortSpec, PropertySpec, UnitCategory, UnitSpec};

/// Returns the metadata of every built-in unit type, in listing order.
pub fn builtin_units() -> Vec<UnitSpec> {
    vec![
        // --- Sources ---
        UnitSpec::new("Oscillator", UnitCategory::Source)
            .describe("Periodic waveform generator")
            .output(PortSpec::signal("output"))
            .property(PropertySpec::enumeration(
                "type",
                "sine",
                &["sine", "square", "sawtooth", "triangle"],
            ))
            .property(PropertySpec::number("frequency", 440.0, 0.0, 24000.0))
            .property(PropertySpec::number("detune", 0.0, -4800.0, 4800.0))
            .property(PropertySpec::boolean("autostart", true))
            .startable()
            .event("ended"),
        UnitSpec::new("ConstantSource", UnitCategory::Source)
            .describe("Constant signal, useful as a DC offset or modulation base")
            .output(PortSpec::signal("output"))
            .property(PropertySpec::number("offset", 1.0, -1000.0, 1000.0))
            .property(PropertySpec::boolean("autostart", true))
            .startable()
            .event("ended"),
        UnitSpec::new("NoiseSource", UnitCategory::Source)
            .describe("Looping buffer of generated noise")
            .output(PortSpec::signal("output"))
            .property(PropertySpec::enumeration(
                "color",
                "white",
                &["white", "pink", "brown"],
            ))
            .property(PropertySpec::number("duration", 2.0, 0.1, 10.0))
            .property(PropertySpec::number("playbackRate", 1.0, 0.0625, 16.0))
            .property(PropertySpec::boolean("autostart", true))
            .startable()
            .event("ended"),
        UnitSpec::new("BufferSource", UnitCategory::Source)
            .describe("Plays an externally loaded audio file")
            .output(PortSpec::signal("output"))
            .property(PropertySpec::text("path", ""))
            .property(PropertySpec::boolean("loop", false))
            .property(PropertySpec::number("playbackRate", 1.0, 0.0625, 16.0))
            .property(PropertySpec::number("detune", 0.0, -4800.0, 4800.0))
            .property(PropertySpec::boolean("autostart", true))
            .startable()
            .event("ended")
            .event("loaded"),
        // --- Effects ---
        UnitSpec::new("Gain", UnitCategory::Effect)
            .describe("Linear gain stage")
            .input(PortSpec::signal("input"))
            .output(PortSpec::signal("output"))
            .property(PropertySpec::number("gain", 1.0, 0.0, 10.0)),
        UnitSpec::new("BiquadFilter", UnitCategory::Effect)
            .describe("Second-order filter (RBJ cookbook)")
            .input(PortSpec::signal("input"))
            .output(PortSpec::signal("output"))
            .property(PropertySpec::enumeration(
                "type",
                "lowpass",
                &["lowpass", "highpass", "bandpass", "notch", "peaking"],
            ))
            .property(PropertySpec::number("frequency", 350.0, 10.0, 22050.0))
            .property(PropertySpec::number("Q", 1.0, 0.0001, 1000.0))
            .property(PropertySpec::number("gain", 0.0, -40.0, 40.0))
            .property(PropertySpec::number("detune", 0.0, -4800.0, 4800.0)),
        UnitSpec::new("Delay", UnitCategory::Effect)
            .describe("Fractional delay line")
            .input(PortSpec::signal("input"))
            .output(PortSpec::signal("output"))
            .property(PropertySpec::number("maxDelayTime", 1.0, 0.01, 10.0))
            .property(PropertySpec::number("delayTime", 0.25, 0.0, 10.0)),
        // --- Analysis / output ---
        UnitSpec::new("Analyser", UnitCategory::Analysis)
            .describe("Pass-through level meter")
            .input(PortSpec::signal("input"))
            .output(PortSpec::signal("output"))
            .property(PropertySpec::number("smoothing", 0.8, 0.0, 1.0)),
        UnitSpec::new("AudioDestination", UnitCategory::Output)
            .describe("The engine's output sink")
            .input(PortSpec::signal("input")),
        // --- Control ---
        UnitSpec::new("Slider", UnitCategory::Control)
            .describe("Continuous value set by the user")
            .input(PortSpec::control("value"))
            .output(PortSpec::control("value"))
            .property(PropertySpec::number("value", 0.5, -1.0e6, 1.0e6))
            .property(PropertySpec::number("min", 0.0, -1.0e6, 1.0e6))
            .property(PropertySpec::number("max", 1.0, -1.0e6, 1.0e6))
            .property(PropertySpec::number("step", 0.0, 0.0, 1.0e6))
            .event("change"),
        UnitSpec::new("Button", UnitCategory::Control)
            .describe("Emits a fixed value when pressed")
            .output(PortSpec::control("trigger"))
            .property(PropertySpec::number("value", 1.0, -1.0e6, 1.0e6))
            .event("press"),
        UnitSpec::new("MidiToFrequency", UnitCategory::Control)
            .describe("Converts a MIDI note number to a frequency in Hz")
            .input(PortSpec::control("note"))
            .output(PortSpec::control("frequency"))
            .property(PropertySpec::number("tuning", 440.0, 400.0, 480.0)),
        UnitSpec::new("RangeMapper", UnitCategory::Control)
            .describe("Linearly maps a value from one range to another")
            .input(PortSpec::control("value"))
            .output(PortSpec::control("value"))
            .property(PropertySpec::number("inMin", 0.0, -1.0e6, 1.0e6))
            .property(PropertySpec::number("inMax", 1.0, -1.0e6, 1.0e6))
            .property(PropertySpec::number("outMin", 0.0, -1.0e6, 1.0e6))
            .property(PropertySpec::number("outMax", 1.0, -1.0e6, 1.0e6))
            .property(PropertySpec::boolean("clamp", true)),
        UnitSpec::new("RateLimiter", UnitCategory::Control)
            .describe("Forwards at most one value per interval, holding the latest")
            .input(PortSpec::control("value"))
            .output(PortSpec::control("value"))
            .property(PropertySpec::number("interval", 0.05, 0.0, 60.0)),
        UnitSpec::new("Timer", UnitCategory::Control)
            .describe("Emits an increasing tick count at a fixed interval")
            .output(PortSpec::control("tick"))
            .property(PropertySpec::number("interval", 1.0, 0.001, 3600.0))
            .property(PropertySpec::boolean("running", true))
            .event("tick"),
        UnitSpec::new("Monitor", UnitCategory::Control)
            .describe("Displays the last value it received")
            .input(PortSpec::control("value"))
            .property(PropertySpec::number("value", 0.0, -1.0e9, 1.0e9)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quirks;

    #[test]
    fn every_builtin_validates() {
        for unit in builtin_units() {
            unit.validate()
                .unwrap_or_else(|e| panic!("{} failed validation: {e}", unit.name));
        }
    }

    #[test]
    fn modulation_targets_are_declared_properties() {
        for unit in builtin_units() {
            for target in quirks::modulation_targets(&unit.name) {
                assert!(
                    unit.find_property(target).is_some(),
                    "{} lacks property for modulation target {target}",
                    unit.name
                );
            }
        }
    }

    #[test]
    fn startable_units_carry_autostart() {
        for unit in builtin_units().iter().filter(|u| u.is_startable()) {
            assert!(
                unit.find_property(quirks::AUTOSTART).is_some(),
                "{} is startable without autostart",
                unit.name
            );
        }
    }
}
