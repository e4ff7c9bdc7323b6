use std::fmt::{self, Display, Formatter};

use crate::gate::{Gate, GateId, Signal};

/// One pin of one gate. Whether it names an input or an output pin is
/// decided by where it is used: [`Wire::start`] is always an output pin
/// and [`Wire::end`] an input pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub gate: GateId,
    pub pin: usize,
}

impl PinRef {
    pub fn new(gate: GateId, pin: usize) -> Self {
        Self { gate, pin }
    }
}

impl Display for PinRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.gate, self.pin)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wire {
    pub start: PinRef,
    pub end: PinRef,
}

impl Wire {
    pub fn new(start: PinRef, end: PinRef) -> Self {
        Self { start, end }
    }

    /// The driven value, or `None` for both endpoints if the wire does
    /// not resolve against `gates`.
    pub fn start_value(&self, gates: &[Gate]) -> Option<Signal> {
        gates
            .get(self.start.gate.index())
            .and_then(|gate| gate.output_nodes.get(self.start.pin))
            .map(|node| node.source_value)
    }

    pub fn end_value(&self, gates: &[Gate]) -> Option<Signal> {
        gates
            .get(self.end.gate.index())
            .and_then(|gate| gate.input_nodes.get(self.end.pin))
            .map(|node| node.source_value)
    }

    /// Copies the start value onto the end node. Returns false if either
    /// endpoint does not exist.
    pub fn propagate(&self, gates: &mut [Gate]) -> bool {
        let Some(value) = self.start_value(gates) else {
            return false;
        };
        match gates
            .get_mut(self.end.gate.index())
            .and_then(|gate| gate.input_nodes.get_mut(self.end.pin))
        {
            Some(node) => {
                node.source_value = value;
                true
            }
            None => false,
        }
    }
}
