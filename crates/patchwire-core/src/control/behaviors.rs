//! Built-in control behaviors.

use patchwire_catalog::PropertyValue;

use super::{ControlBehavior, ControlContext, ControlState, Emission};

/// Continuous value set by the user, clamped to `[min, max]` and snapped to `step`.
#[derive(Debug, Default)]
pub struct Slider;

impl Slider {
    fn constrain(state: &ControlState, value: f64) -> f64 {
        let min = state.number("min", 0.0);
        let max = state.number("max", 1.0);
        let step = state.number("step", 0.0);
        let mut v = if min <= max { value.clamp(min, max) } else { value };
        if step > 0.0 {
            v = min + ((v - min) / step).round() * step;
            if min <= max {
                v = v.clamp(min, max);
            }
        }
        v
    }

    fn settle(state: &mut ControlState, value: f64) -> Vec<Emission> {
        let v = Self::constrain(state, value);
        state.set_property("value", PropertyValue::Number(v));
        if state.output("value") == Some(v) {
            Vec::new()
        } else {
            vec![Emission::new("value", v)]
        }
    }
}

impl ControlBehavior for Slider {
    fn type_name(&self) -> &'static str {
        "Slider"
    }

    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        if port != "value" || !value.is_finite() {
            return Vec::new();
        }
        Self::settle(state, value)
    }

    fn property_changed(
        &mut self,
        state: &mut ControlState,
        name: &str,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        match name {
            "value" | "min" | "max" | "step" => {
                let current = state.number("value", 0.0);
                Self::settle(state, current)
            }
            _ => Vec::new(),
        }
    }

    fn initial(&self, state: &ControlState) -> Vec<Emission> {
        vec![Emission::new(
            "value",
            Self::constrain(state, state.number("value", 0.0)),
        )]
    }
}

/// Emits its `value` on every press.
#[derive(Debug, Default)]
pub struct Button;

impl ControlBehavior for Button {
    fn type_name(&self) -> &'static str {
        "Button"
    }

    fn receive(
        &mut self,
        _state: &mut ControlState,
        _port: &str,
        _value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        Vec::new()
    }

    fn stimulate(&mut self, state: &mut ControlState, _cx: &ControlContext) -> Vec<Emission> {
        vec![Emission::new("trigger", state.number("value", 1.0))]
    }

    fn accepts_stimulus(&self) -> bool {
        true
    }
}

/// MIDI note number to frequency: `tuning * 2^((note - 69) / 12)`.
#[derive(Debug, Default)]
pub struct MidiToFrequency;

impl ControlBehavior for MidiToFrequency {
    fn type_name(&self) -> &'static str {
        "MidiToFrequency"
    }

    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        if port != "note" {
            return Vec::new();
        }
        let tuning = state.number("tuning", 440.0);
        let freq = tuning * ((value - 69.0) / 12.0).exp2();
        vec![Emission::new("frequency", freq)]
    }
}

/// Linear map from `[inMin, inMax]` to `[outMin, outMax]`.
#[derive(Debug, Default)]
pub struct RangeMapper;

impl ControlBehavior for RangeMapper {
    fn type_name(&self) -> &'static str {
        "RangeMapper"
    }

    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        if port != "value" {
            return Vec::new();
        }
        let (in_min, in_max) = (state.number("inMin", 0.0), state.number("inMax", 1.0));
        let (out_min, out_max) = (state.number("outMin", 0.0), state.number("outMax", 1.0));
        let span = in_max - in_min;
        let t = if span == 0.0 { 0.0 } else { (value - in_min) / span };
        let mut out = out_min + t * (out_max - out_min);
        if state.flag("clamp", true) && out.is_finite() {
            out = out.clamp(out_min.min(out_max), out_min.max(out_max));
        }
        vec![Emission::new("value", out)]
    }
}

/// Forwards at most one value per `interval` seconds, holding the latest.
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_emit: Option<f64>,
    held: Option<f64>,
}

impl ControlBehavior for RateLimiter {
    fn type_name(&self) -> &'static str {
        "RateLimiter"
    }

    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        cx: &ControlContext,
    ) -> Vec<Emission> {
        if port != "value" {
            return Vec::new();
        }
        let interval = state.number("interval", 0.05);
        if self.last_emit.is_none_or(|t| cx.now - t >= interval) {
            self.last_emit = Some(cx.now);
            self.held = None;
            vec![Emission::new("value", value)]
        } else {
            self.held = Some(value);
            Vec::new()
        }
    }

    fn tick(&mut self, state: &mut ControlState, cx: &ControlContext) -> Vec<Emission> {
        let interval = state.number("interval", 0.05);
        match (self.held, self.last_emit) {
            (Some(value), Some(last)) if cx.now - last >= interval => {
                self.held = None;
                self.last_emit = Some(cx.now);
                vec![Emission::new("value", value)]
            }
            _ => Vec::new(),
        }
    }
}

/// Emits an increasing count every `interval` seconds while `running`.
#[derive(Debug, Default)]
pub struct Timer {
    next_due: Option<f64>,
    count: u64,
}

impl Timer {
    const MAX_TICKS_PER_CALL: usize = 64;
}

impl ControlBehavior for Timer {
    fn type_name(&self) -> &'static str {
        "Timer"
    }

    fn receive(
        &mut self,
        _state: &mut ControlState,
        _port: &str,
        _value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        Vec::new()
    }

    fn property_changed(
        &mut self,
        _state: &mut ControlState,
        name: &str,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        if name == "running" || name == "interval" {
            self.next_due = None;
        }
        Vec::new()
    }

    fn tick(&mut self, state: &mut ControlState, cx: &ControlContext) -> Vec<Emission> {
        if !state.flag("running", true) {
            self.next_due = None;
            return Vec::new();
        }
        let interval = state.number("interval", 1.0).max(0.001);
        let mut due = *self.next_due.get_or_insert(cx.now + interval);
        let mut out = Vec::new();
        while cx.now >= due && out.len() < Self::MAX_TICKS_PER_CALL {
            self.count += 1;
            out.push(Emission::new("tick", self.count as f64));
            due += interval;
        }
        self.next_due = Some(due);
        out
    }
}

/// Stores the last value it received in its `value` property.
#[derive(Debug, Default)]
pub struct Monitor;

impl ControlBehavior for Monitor {
    fn type_name(&self) -> &'static str {
        "Monitor"
    }

    fn receive(
        &mut self,
        state: &mut ControlState,
        port: &str,
        value: f64,
        _cx: &ControlContext,
    ) -> Vec<Emission> {
        if port == "value" {
            state.set_property("value", PropertyValue::Number(value));
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn state(props: &[(&str, PropertyValue)]) -> ControlState {
        ControlState::new(
            props
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn at(now: f64) -> ControlContext {
        ControlContext { now }
    }

    fn values(emissions: &[Emission]) -> Vec<f64> {
        emissions.iter().map(|e| e.value).collect()
    }

    #[test]
    fn slider_clamps_and_snaps() {
        let mut s = state(&[
            ("min", 0.0.into()),
            ("max", 10.0.into()),
            ("step", 2.5.into()),
        ]);
        let mut slider = Slider;
        assert_eq!(values(&slider.receive(&mut s, "value", 6.0, &at(0.0))), vec![5.0]);
        assert_eq!(values(&slider.receive(&mut s, "value", 42.0, &at(0.0))), vec![10.0]);
        assert!(slider.receive(&mut s, "value", f64::NAN, &at(0.0)).is_empty());
        assert_eq!(s.property("value"), Some(&PropertyValue::Number(10.0)));
    }

    #[test]
    fn slider_initial_value() {
        let s = state(&[("value", 0.25.into())]);
        assert_eq!(values(&Slider.initial(&s)), vec![0.25]);
    }

    #[test]
    fn button_emits_on_press() {
        let mut s = state(&[("value", 3.0.into())]);
        let mut b = Button;
        assert!(b.accepts_stimulus());
        let out = b.stimulate(&mut s, &at(0.0));
        assert_eq!(out, vec![Emission::new("trigger", 3.0)]);
    }

    #[test]
    fn midi_to_frequency() {
        let mut s = state(&[("tuning", 440.0.into())]);
        let mut m = MidiToFrequency;
        let a4 = m.receive(&mut s, "note", 69.0, &at(0.0));
        assert!((a4[0].value - 440.0).abs() < 1e-9);
        let a5 = m.receive(&mut s, "note", 81.0, &at(0.0));
        assert!((a5[0].value - 880.0).abs() < 1e-9);
        assert_eq!(a5[0].port, "frequency");
    }

    #[test]
    fn range_mapper_maps_and_clamps() {
        let mut s = state(&[
            ("inMin", 0.0.into()),
            ("inMax", 1.0.into()),
            ("outMin", 200.0.into()),
            ("outMax", 2000.0.into()),
            ("clamp", true.into()),
        ]);
        let mut r = RangeMapper;
        assert_eq!(values(&r.receive(&mut s, "value", 0.5, &at(0.0))), vec![1100.0]);
        assert_eq!(values(&r.receive(&mut s, "value", 2.0, &at(0.0))), vec![2000.0]);
        let nan = r.receive(&mut s, "value", f64::NAN, &at(0.0));
        assert!(nan[0].value.is_nan());
    }

    #[test]
    fn rate_limiter_holds_then_releases() {
        let mut s = state(&[("interval", 0.1.into())]);
        let mut r = RateLimiter::default();
        assert_eq!(values(&r.receive(&mut s, "value", 1.0, &at(0.0))), vec![1.0]);
        assert!(r.receive(&mut s, "value", 2.0, &at(0.05)).is_empty());
        assert!(r.receive(&mut s, "value", 3.0, &at(0.06)).is_empty());
        assert!(r.tick(&mut s, &at(0.08)).is_empty());
        assert_eq!(values(&r.tick(&mut s, &at(0.1))), vec![3.0]);
        assert!(r.tick(&mut s, &at(0.3)).is_empty());
    }

    #[test]
    fn timer_counts_intervals() {
        let mut s = state(&[("interval", 0.5.into()), ("running", true.into())]);
        let mut t = Timer::default();
        assert!(t.tick(&mut s, &at(0.0)).is_empty());
        assert!(t.tick(&mut s, &at(0.4)).is_empty());
        assert_eq!(values(&t.tick(&mut s, &at(0.5))), vec![1.0]);
        assert_eq!(values(&t.tick(&mut s, &at(1.6))), vec![2.0, 3.0]);
        s.set_property("running", false.into());
        assert!(t.tick(&mut s, &at(5.0)).is_empty());
    }

    #[test]
    fn monitor_records_last_value() {
        let mut s = state(&[]);
        let mut m = Monitor;
        assert!(m.receive(&mut s, "value", 7.0, &at(0.0)).is_empty());
        assert_eq!(s.property("value"), Some(&PropertyValue::Number(7.0)));
    }
}
