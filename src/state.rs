//! Value snapshots of a circuit.
//!
//! A snapshot is built fresh from the live gates and compared
//! structurally, gate by gate and wire by wire in insertion order.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::gate::{Gate, GateKind, Signal};
use crate::wire::Wire;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GateState {
    pub kind: GateKind,
    pub label: String,
    pub inputs: Vec<Signal>,
    pub outputs: Vec<Signal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WireState {
    pub start: Signal,
    pub end: Signal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CircuitState {
    pub gates: Vec<GateState>,
    pub wires: Vec<WireState>,
}

impl GateState {
    fn of(gate: &Gate) -> Self {
        Self {
            kind: gate.kind(),
            label: gate.label().to_string(),
            inputs: gate.input_values(),
            outputs: gate.output_values(),
        }
    }
}

impl CircuitState {
    /// Unresolvable wire endpoints show up as undriven.
    pub fn capture(gates: &[Gate], wires: &[Wire]) -> Self {
        Self {
            gates: gates.iter().map(GateState::of).collect(),
            wires: wires
                .iter()
                .map(|wire| WireState {
                    start: wire.start_value(gates).flatten(),
                    end: wire.end_value(gates).flatten(),
                })
                .collect(),
        }
    }
}

struct SignalDisplay(Signal);

impl Display for SignalDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            Some(true) => "1",
            Some(false) => "0",
            None => "?",
        })
    }
}

struct SignalsDisplay<'a>(&'a [Signal]);

impl Display for SignalsDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, signal) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", SignalDisplay(*signal))?;
        }
        f.write_str("]")
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Circuit State:")?;
        for gate in &self.gates {
            writeln!(f, "Gate {} ({})", gate.label, gate.kind)?;
            if !gate.inputs.is_empty() {
                writeln!(f, "  Input Values: {}", SignalsDisplay(&gate.inputs))?;
            }
            if !gate.outputs.is_empty() {
                writeln!(f, "  Output Values: {}", SignalsDisplay(&gate.outputs))?;
            }
        }
        writeln!(f, "Wires:")?;
        for wire in &self.wires {
            writeln!(
                f,
                "  Wire: {} -> {}",
                SignalDisplay(wire.start),
                SignalDisplay(wire.end)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::circuit_builder::CircuitBuilder;

    fn gate_state(kind: GateKind, label: &str, inputs: Vec<Signal>, outputs: Vec<Signal>) -> GateState {
        GateState {
            kind,
            label: label.to_string(),
            inputs,
            outputs,
        }
    }

    fn sample() -> CircuitState {
        CircuitState {
            gates: vec![
                gate_state(GateKind::Input, "a", vec![], vec![Some(true)]),
                gate_state(GateKind::Not, "NOT", vec![Some(true)], vec![Some(false)]),
                gate_state(GateKind::Output, "q", vec![None], vec![]),
            ],
            wires: vec![
                WireState {
                    start: Some(true),
                    end: Some(true),
                },
                WireState {
                    start: Some(false),
                    end: None,
                },
            ],
        }
    }

    #[test]
    fn equal_by_value() {
        assert_eq!(sample(), sample());
    }

    #[test]
    fn single_node_difference_is_unequal() {
        let mut other = sample();
        other.wires[1].end = Some(false);
        assert_ne!(sample(), other);

        let mut other = sample();
        other.gates[1].inputs[0] = None;
        assert_ne!(sample(), other);
    }

    #[test]
    fn gate_order_matters() {
        let mut other = sample();
        other.gates.swap(0, 2);
        assert_ne!(sample(), other);
    }

    #[test]
    fn dump_format() {
        let expected = "\
Circuit State:
Gate a (INPUT)
  Output Values: [1]
Gate NOT (NOT)
  Input Values: [1]
  Output Values: [0]
Gate q (OUTPUT)
  Input Values: [?]
Wires:
  Wire: 1 -> 1
  Wire: 0 -> ?
";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn serializes_for_display_consumers() {
        let mut builder = CircuitBuilder::new();
        let a = builder.input("a");
        let and = builder.add_gate(GateKind::And);
        let q = builder.output("q");
        builder.connect_next(a, and).unwrap();
        builder.connect_next(and, q).unwrap();
        builder.set_state(a, true).unwrap();
        let mut circuit = builder.build();

        let json = serde_json::to_value(circuit.update()).unwrap();
        assert_eq!(
            json["gates"][1],
            json!({
                "kind": "AND",
                "label": "AND",
                "inputs": [true, null],
                "outputs": [false],
            })
        );
        assert_eq!(json["gates"][0]["kind"], "INPUT");
        assert_eq!(json["wires"], json!([
            { "start": true, "end": true },
            { "start": false, "end": false },
        ]));

        let adder = CircuitState::capture(&[Gate::new(GateKind::FullAdder)], &[]);
        let json = serde_json::to_value(adder).unwrap();
        assert_eq!(json["gates"][0]["kind"], "FULL_ADDER");
        assert_eq!(json["gates"][0]["outputs"], json!([null, null]));
    }
}
