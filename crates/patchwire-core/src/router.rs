//! Connection Router.
//!
//! Validation happens entirely on catalog metadata, before any host call:
//!
//! 1. the source port must be a declared output;
//! 2. the target port must be a declared input or a modulation target of the
//!    target type. When both match, the modulation target wins;
//! 3. kinds must be compatible. Everything is allowed except a control output
//!    driving a signal input. A modulation target counts as a control port.
//!
//! Routing then picks one of:
//!
//! | Endpoints | Routing |
//! |---|---|
//! | either end is a control unit | propagator route, no host call |
//! | target port is a modulation target | host parameter edge |
//! | target is the output sink | source → analyser tap → sink |
//! | otherwise | host signal edge |

use patchwire_catalog::{PortKind, PropertySpec, UnitSpec, quirks};
use patchwire_host::HostError;

use crate::document::NodeId;
use crate::error::{ConnectionError, PortDirection};
use crate::live::{LiveEngine, LiveUnit, Routing, RoutingKind};
use crate::propagator::{RouteSource, RouteTarget};

/// Outcome of validating a connection on metadata alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PortPlan {
    /// Routing kind that will be used.
    pub kind: RoutingKind,
    /// The target port resolved to a modulation target.
    pub modulation: bool,
    /// The target is the output sink.
    pub into_sink: bool,
    /// Declared property behind a modulation target, used to bound values
    /// written by control routes.
    pub range: Option<PropertySpec>,
}

/// Validates, performs and reverses connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRouter;

impl ConnectionRouter {
    /// Creates a router.
    pub fn new() -> Self {
        Self
    }

    /// Checks ports and kinds and decides how the connection will be routed.
    pub fn validate(
        &self,
        source: &UnitSpec,
        source_port: &str,
        target: &UnitSpec,
        target_port: &str,
    ) -> Result<PortPlan, ConnectionError> {
        let out = source
            .find_output(source_port)
            .ok_or_else(|| ConnectionError::UnknownPort {
                unit: source.name.clone(),
                port: source_port.to_string(),
                direction: PortDirection::Output,
            })?;

        let modulation = quirks::is_modulation_target(&target.name, target_port);
        let in_kind = if modulation {
            PortKind::Control
        } else {
            target
                .find_input(target_port)
                .ok_or_else(|| ConnectionError::UnknownPort {
                    unit: target.name.clone(),
                    port: target_port.to_string(),
                    direction: PortDirection::Input,
                })?
                .kind
        };

        if out.kind == PortKind::Control && in_kind == PortKind::Signal {
            return Err(ConnectionError::IncompatiblePorts {
                source_port: source_port.to_string(),
                target_port: target_port.to_string(),
            });
        }

        let kind = if source.is_control() || target.is_control() {
            RoutingKind::Control
        } else if modulation || in_kind == PortKind::Control {
            RoutingKind::Modulation
        } else {
            RoutingKind::Signal
        };
        Ok(PortPlan {
            kind,
            modulation: modulation || in_kind == PortKind::Control,
            into_sink: target.name == quirks::OUTPUT_SINK,
            range: modulation
                .then(|| target.find_property(target_port).cloned())
                .flatten(),
        })
    }

    /// Performs a validated connection between two live units.
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        &self,
        engine: &mut LiveEngine,
        plan: &PortPlan,
        source: LiveUnit,
        source_port: &str,
        target: LiveUnit,
        target_port: &str,
        target_node: Option<NodeId>,
    ) -> Result<Routing, ConnectionError> {
        let routing = match (source, target) {
            (LiveUnit::Control(from), LiveUnit::Control(to)) => self.register(
                engine,
                RouteSource::Control {
                    unit: from,
                    port: source_port.to_string(),
                },
                RouteTarget::Control {
                    unit: to,
                    port: target_port.to_string(),
                },
            ),
            (LiveUnit::Control(from), LiveUnit::Host(to)) => {
                if !plan.modulation {
                    return Err(ConnectionError::IncompatiblePorts {
                        source_port: source_port.to_string(),
                        target_port: target_port.to_string(),
                    });
                }
                self.register(
                    engine,
                    RouteSource::Control {
                        unit: from,
                        port: source_port.to_string(),
                    },
                    RouteTarget::Modulation {
                        node: to,
                        param: target_port.to_string(),
                        owner: target_node,
                        range: plan.range.clone(),
                    },
                )
            }
            (LiveUnit::Host(from), LiveUnit::Control(to)) => self.register(
                engine,
                RouteSource::Host { node: from },
                RouteTarget::Control {
                    unit: to,
                    port: target_port.to_string(),
                },
            ),
            (LiveUnit::Host(from), LiveUnit::Host(to)) => {
                let ctx = &mut engine.context;
                if plan.modulation {
                    let edge = ctx.connect_param(from, to, target_port)?;
                    Routing::Modulation {
                        edge,
                        param: target_port.to_string(),
                    }
                } else if plan.into_sink {
                    Self::tap(engine, from, to)?
                } else {
                    Routing::Signal {
                        edge: ctx.connect(from, to)?,
                    }
                }
            }
        };
        tracing::debug!(
            "router_connect: {source:?}.{source_port} → {target:?}.{target_port} as {:?}",
            routing.kind()
        );
        Ok(routing)
    }

    /// Reverses exactly what [`connect`](Self::connect) created. Anything
    /// already gone is ignored.
    pub fn disconnect(&self, engine: &mut LiveEngine, routing: &Routing) {
        let ctx = &mut engine.context;
        let result = match routing {
            Routing::Signal { edge } | Routing::Modulation { edge, .. } => ctx.disconnect(*edge),
            Routing::Tapped {
                tap,
                into_tap,
                into_sink,
            } => ctx
                .disconnect(*into_tap)
                .and(ctx.disconnect(*into_sink))
                .and(ctx.remove_node(*tap)),
            Routing::Control { route } => {
                engine.propagator.unregister(*route);
                Ok(())
            }
        };
        match result {
            Ok(()) => tracing::debug!("router_disconnect: {:?}", routing.kind()),
            Err(err) => tracing::debug!("router_disconnect: already gone ({err})"),
        }
    }

    fn register(&self, engine: &mut LiveEngine, source: RouteSource, target: RouteTarget) -> Routing {
        let route = engine
            .propagator
            .register(&mut engine.context, source, target);
        Routing::Control { route }
    }

    fn tap(
        engine: &mut LiveEngine,
        from: patchwire_host::HostNodeId,
        sink: patchwire_host::HostNodeId,
    ) -> Result<Routing, HostError> {
        let ctx = &mut engine.context;
        let tap = ctx.create_analyser()?;
        let into_tap = match ctx.connect(from, tap) {
            Ok(edge) => edge,
            Err(err) => {
                let _ = ctx.remove_node(tap);
                return Err(err);
            }
        };
        match ctx.connect(tap, sink) {
            Ok(into_sink) => Ok(Routing::Tapped {
                tap,
                into_tap,
                into_sink,
            }),
            Err(err) => {
                let _ = ctx.remove_node(tap);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::diagnostics::Diagnostics;
    use patchwire_catalog::Catalog;

    fn spec(name: &str) -> UnitSpec {
        Catalog::new().get(name).unwrap().clone()
    }

    #[test]
    fn signal_to_signal() {
        let plan = ConnectionRouter
            .validate(&spec("Oscillator"), "output", &spec("Gain"), "input")
            .unwrap();
        assert_eq!(plan.kind, RoutingKind::Signal);
        assert!(!plan.into_sink);
    }

    #[test]
    fn modulation_target_without_declared_input() {
        let plan = ConnectionRouter
            .validate(&spec("Oscillator"), "output", &spec("BiquadFilter"), "frequency")
            .unwrap();
        assert_eq!(plan.kind, RoutingKind::Modulation);
        assert!(plan.modulation);
    }

    #[test]
    fn modulation_target_wins_over_same_named_input() {
        let mut catalog = Catalog::new();
        catalog
            .merge_json(r#"{ "Gain": { "inputs": ["input", "gain"], "outputs": ["output"] } }"#)
            .unwrap();
        let plan = ConnectionRouter
            .validate(&spec("Oscillator"), "output", catalog.get("Gain").unwrap(), "gain")
            .unwrap();
        assert_eq!(plan.kind, RoutingKind::Modulation);
    }

    #[test]
    fn control_to_signal_is_rejected() {
        let err = ConnectionRouter
            .validate(&spec("Slider"), "value", &spec("Gain"), "input")
            .unwrap_err();
        assert!(matches!(err, ConnectionError::IncompatiblePorts { .. }));
    }

    #[test]
    fn control_to_modulation_is_control_routing() {
        let plan = ConnectionRouter
            .validate(&spec("Slider"), "value", &spec("Gain"), "gain")
            .unwrap();
        assert_eq!(plan.kind, RoutingKind::Control);
        let range = plan.range.unwrap();
        assert_eq!((range.min, range.max), (Some(0.0), Some(10.0)));
    }

    #[test]
    fn unknown_ports() {
        let router = ConnectionRouter::new();
        assert!(matches!(
            router.validate(&spec("Gain"), "sidechain", &spec("Gain"), "input"),
            Err(ConnectionError::UnknownPort {
                direction: PortDirection::Output,
                ..
            })
        ));
        assert!(matches!(
            router.validate(&spec("Gain"), "output", &spec("Gain"), "type"),
            Err(ConnectionError::UnknownPort {
                direction: PortDirection::Input,
                ..
            })
        ));
    }

    #[test]
    fn sink_connection_inserts_tap_and_disconnect_removes_it() {
        let mut engine = LiveEngine::new(&EngineConfig::default(), Diagnostics::new());
        let router = ConnectionRouter::new();
        let osc = engine.context.create_oscillator().unwrap();
        let sink = engine.context.destination();
        let plan = router
            .validate(&spec("Oscillator"), "output", &spec("AudioDestination"), "input")
            .unwrap();
        let nodes_before = engine.context.node_count();

        let routing = router
            .connect(
                &mut engine,
                &plan,
                LiveUnit::Host(osc),
                "output",
                LiveUnit::Host(sink),
                "input",
                None,
            )
            .unwrap();
        assert!(matches!(routing, Routing::Tapped { .. }));
        assert_eq!(engine.context.node_count(), nodes_before + 1);
        assert_eq!(engine.context.edge_count(), 2);

        router.disconnect(&mut engine, &routing);
        assert_eq!(engine.context.node_count(), nodes_before);
        assert_eq!(engine.context.edge_count(), 0);

        // Second disconnect is a no-op.
        router.disconnect(&mut engine, &routing);
        assert_eq!(engine.context.edge_count(), 0);
    }
}
