use std::cell::RefCell;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use crate::circuit_sim::SimConfig;
use crate::gate::{Gate, GateId, GateKind};
use crate::wire::{PinRef, Wire};
use crate::Circuit;

/// Describes why a gate or wire could not be added to a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    UnknownGate(GateId),
    /// The wire start is not an output pin of its gate.
    NoSuchOutputPin(PinRef),
    /// The wire end is not an input pin of its gate.
    NoSuchInputPin(PinRef),
    /// An input pin can only have one driver.
    InputAlreadyDriven(PinRef),
    NoFreeInput(GateId),
    BadArity { kind: GateKind, inputs: usize },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::UnknownGate(id) => write!(f, "gate {id} does not exist"),
            LayoutError::NoSuchOutputPin(pin) => write!(f, "{pin} is not an output pin"),
            LayoutError::NoSuchInputPin(pin) => write!(f, "{pin} is not an input pin"),
            LayoutError::InputAlreadyDriven(pin) => {
                write!(f, "input pin {pin} is already driven by another wire")
            }
            LayoutError::NoFreeInput(id) => write!(f, "gate {id} has no undriven input pin"),
            LayoutError::BadArity { kind, inputs } => {
                write!(f, "a {kind} gate cannot have {inputs} inputs")
            }
        }
    }
}

impl Error for LayoutError {}

pub type SharedBuilder = Rc<RefCell<CircuitBuilder>>;

/// Collects gates and wires, checking each wire as it is added.
#[derive(Clone, Debug, Default)]
pub struct CircuitBuilder {
    gates: Vec<Gate>,
    wires: Vec<Wire>,
    driven: HashSet<PinRef>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedBuilder {
        Rc::new(RefCell::new(Self::new()))
    }

    fn push_gate(&mut self, gate: Gate) -> GateId {
        let id = GateId::from(self.gates.len());
        self.gates.push(gate);
        id
    }

    // Callers guarantee both pins exist and `end` is undriven.
    fn push_wire(&mut self, start: PinRef, end: PinRef) {
        self.driven.insert(end);
        self.wires.push(Wire::new(start, end));
    }

    pub fn add_gate(&mut self, kind: GateKind) -> GateId {
        self.push_gate(Gate::new(kind))
    }

    pub fn add_gate_with_inputs(
        &mut self,
        kind: GateKind,
        inputs: usize,
    ) -> Result<GateId, LayoutError> {
        let fits = if kind.is_variadic() {
            inputs > 0
        } else {
            inputs == kind.default_inputs()
        };
        if !fits {
            return Err(LayoutError::BadArity { kind, inputs });
        }
        Ok(self.push_gate(Gate::with_inputs(kind, inputs)))
    }

    pub fn input(&mut self, label: &str) -> GateId {
        let mut gate = Gate::new(GateKind::Input);
        gate.set_label(label);
        self.push_gate(gate)
    }

    pub fn output(&mut self, label: &str) -> GateId {
        let mut gate = Gate::new(GateKind::Output);
        gate.set_label(label);
        self.push_gate(gate)
    }

    pub fn gate(&self, id: GateId) -> Option<&Gate> {
        self.gates.get(id.index())
    }

    fn gate_mut(&mut self, id: GateId) -> Result<&mut Gate, LayoutError> {
        self.gates
            .get_mut(id.index())
            .ok_or(LayoutError::UnknownGate(id))
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    pub fn set_label(&mut self, id: GateId, label: &str) -> Result<(), LayoutError> {
        self.gate_mut(id)?.set_label(label);
        Ok(())
    }

    /// Sets the initial switch position of an INPUT gate.
    pub fn set_state(&mut self, id: GateId, state: bool) -> Result<(), LayoutError> {
        self.gate_mut(id)?.set_state(state);
        Ok(())
    }

    /// The lowest input pin of `id` that nothing drives yet.
    pub fn free_input(&self, id: GateId) -> Option<usize> {
        let gate = self.gate(id)?;
        (0..gate.input_nodes.len()).find(|pin| !self.driven.contains(&PinRef::new(id, *pin)))
    }

    pub fn connect(&mut self, from: PinRef, to: PinRef) -> Result<(), LayoutError> {
        let start = self
            .gate(from.gate)
            .ok_or(LayoutError::UnknownGate(from.gate))?;
        if from.pin >= start.output_nodes.len() {
            return Err(LayoutError::NoSuchOutputPin(from));
        }
        let end = self.gate(to.gate).ok_or(LayoutError::UnknownGate(to.gate))?;
        if to.pin >= end.input_nodes.len() {
            return Err(LayoutError::NoSuchInputPin(to));
        }
        if self.driven.contains(&to) {
            return Err(LayoutError::InputAlreadyDriven(to));
        }
        self.push_wire(from, to);
        Ok(())
    }

    /// Drives the next free input pin of `to` from the primary output of
    /// `from`.
    pub fn connect_next(&mut self, from: GateId, to: GateId) -> Result<(), LayoutError> {
        self.gate(to).ok_or(LayoutError::UnknownGate(to))?;
        let pin = self.free_input(to).ok_or(LayoutError::NoFreeInput(to))?;
        self.connect(PinRef::new(from, 0), PinRef::new(to, pin))
    }

    /// Creates a circuit from a copy of the layout built so far.
    pub fn build(&self) -> Circuit {
        self.build_with_config(SimConfig::default())
    }

    pub fn build_with_config(&self, config: SimConfig) -> Circuit {
        let mut circuit = Circuit::with_config(config);
        circuit.set_layout(self.gates.clone(), self.wires.clone());
        circuit
    }
}

/// The primary output of one gate in a shared builder. Combining
/// connectors creates the gates and wires between them.
#[derive(Clone)]
pub struct Connector {
    builder: SharedBuilder,
    pub gate: GateId,
}

impl Connector {
    fn from_gate(builder: SharedBuilder, gate: GateId) -> Self {
        Connector { builder, gate }
    }

    pub fn input(builder: SharedBuilder, label: &str) -> Self {
        let gate = builder.borrow_mut().input(label);
        Self::from_gate(builder, gate)
    }

    /// Creates a `kind` gate with one input pin per connector, `first`
    /// driving pin 0.
    ///
    /// # Panics
    ///
    /// If the connectors do not all share one builder.
    fn combine(kind: GateKind, first: &Self, rest: &[&Self]) -> Self {
        let builder = first.builder.clone();
        let mut builder_mut = builder.borrow_mut();
        let gate = builder_mut.push_gate(Gate::with_inputs(kind, rest.len() + 1));
        for (pin, source) in std::iter::once(first).chain(rest.iter().copied()).enumerate() {
            assert!(
                Rc::ptr_eq(&builder, &source.builder),
                "connectors from different builders"
            );
            builder_mut.push_wire(source.pin(), PinRef::new(gate, pin));
        }
        drop(builder_mut);
        Self::from_gate(builder, gate)
    }

    pub fn pin(&self) -> PinRef {
        PinRef::new(self.gate, 0)
    }

    pub fn mark(&self, label: &str) -> &Self {
        if let Ok(gate) = self.builder.borrow_mut().gate_mut(self.gate) {
            gate.set_label(label);
        }
        self
    }

    pub fn invert(&self) -> Self {
        Self::combine(GateKind::Not, self, &[])
    }

    /// Attaches an OUTPUT gate to this connector and returns it.
    pub fn output(&self, label: &str) -> GateId {
        let mut builder_mut = self.builder.borrow_mut();
        let sink = builder_mut.output(label);
        builder_mut.push_wire(self.pin(), PinRef::new(sink, 0));
        sink
    }

    /// Drives the next free input pin of `target`'s gate.
    pub fn connect(&self, target: &Connector) -> Result<(), LayoutError> {
        self.builder
            .borrow_mut()
            .connect_next(self.gate, target.gate)
    }

    pub fn set(&self, val: bool) -> Result<(), LayoutError> {
        self.builder.borrow_mut().set_state(self.gate, val)
    }
}

/// Gate constructors over connectors. Every function takes at least one
/// connector, so no gate built here can end up without inputs.
pub mod ops {
    use crate::gate::GateKind;

    use super::Connector;

    pub use crate::{and, nand, nor, or, xnor, xor};

    macro_rules! logic_ops {
        ( $( $name:ident => $kind:ident ),* $(,)? ) => {
            $(
                pub fn $name(first: &Connector, rest: &[&Connector]) -> Connector {
                    Connector::combine(GateKind::$kind, first, rest)
                }
            )*
        };
    }

    logic_ops! {
        and => And,
        or => Or,
        nand => Nand,
        nor => Nor,
        xor => Xor,
        xnor => Xnor,
    }

    #[macro_export]
    macro_rules! and {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::and(&$first, &[ $( &$rest ),* ])
        };
    }

    #[macro_export]
    macro_rules! or {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::or(&$first, &[ $( &$rest ),* ])
        };
    }

    #[macro_export]
    macro_rules! nand {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::nand(&$first, &[ $( &$rest ),* ])
        };
    }

    #[macro_export]
    macro_rules! nor {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::nor(&$first, &[ $( &$rest ),* ])
        };
    }

    #[macro_export]
    macro_rules! xor {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::xor(&$first, &[ $( &$rest ),* ])
        };
    }

    #[macro_export]
    macro_rules! xnor {
        ( $first:expr $( , $rest:expr )* $(,)? ) => {
            $crate::circuit_builder::ops::xnor(&$first, &[ $( &$rest ),* ])
        };
    }
}

#[cfg(test)]
mod test {
    use super::ops::*;
    use super::*;

    #[test]
    fn connect_checks_pins() {
        let mut builder = CircuitBuilder::new();
        let a = builder.input("a");
        let not = builder.add_gate(GateKind::Not);
        let q = builder.output("q");

        assert_eq!(
            builder.connect(PinRef::new(a, 1), PinRef::new(not, 0)),
            Err(LayoutError::NoSuchOutputPin(PinRef::new(a, 1)))
        );
        assert_eq!(
            builder.connect(PinRef::new(q, 0), PinRef::new(not, 0)),
            Err(LayoutError::NoSuchOutputPin(PinRef::new(q, 0)))
        );
        assert_eq!(
            builder.connect(PinRef::new(a, 0), PinRef::new(a, 0)),
            Err(LayoutError::NoSuchInputPin(PinRef::new(a, 0)))
        );
        let ghost = GateId::from(99);
        assert_eq!(
            builder.connect(PinRef::new(a, 0), PinRef::new(ghost, 0)),
            Err(LayoutError::UnknownGate(ghost))
        );

        builder.connect(PinRef::new(a, 0), PinRef::new(not, 0)).unwrap();
        assert_eq!(
            builder.connect(PinRef::new(a, 0), PinRef::new(not, 0)),
            Err(LayoutError::InputAlreadyDriven(PinRef::new(not, 0)))
        );
        // Fan-out from one output is fine.
        builder.connect(PinRef::new(a, 0), PinRef::new(q, 0)).unwrap();
        assert_eq!(builder.num_wires(), 2);
        assert_eq!(
            builder.connect_next(not, q),
            Err(LayoutError::NoFreeInput(q))
        );
    }

    #[test]
    fn arity_checks() {
        let mut builder = CircuitBuilder::new();
        assert!(builder.add_gate_with_inputs(GateKind::And, 4).is_ok());
        assert_eq!(
            builder.add_gate_with_inputs(GateKind::Or, 0),
            Err(LayoutError::BadArity {
                kind: GateKind::Or,
                inputs: 0
            })
        );
        assert!(builder.add_gate_with_inputs(GateKind::Not, 2).is_err());
        assert!(builder.add_gate_with_inputs(GateKind::Input, 1).is_err());
        assert!(builder.add_gate_with_inputs(GateKind::Output, 1).is_ok());
    }

    #[test]
    fn error_messages() {
        let err = LayoutError::InputAlreadyDriven(PinRef::new(GateId::from(3), 1));
        assert_eq!(err.to_string(), "input pin #3.1 is already driven by another wire");
        let err = LayoutError::BadArity {
            kind: GateKind::Not,
            inputs: 2,
        };
        assert_eq!(err.to_string(), "a NOT gate cannot have 2 inputs");
    }

    fn gate_test_gen(
        name: &str,
        f: fn(&Connector, &[&Connector]) -> Connector,
        expecteds: [bool; 4],
    ) {
        let builder = CircuitBuilder::shared();
        let a = Connector::input(builder.clone(), "a");
        let b = Connector::input(builder.clone(), "b");
        let out = f(&a, &[&b]).output("out");
        let mut circuit = builder.borrow().build();
        let expecteds = [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .zip(expecteds);
        for ((in_a, in_b), expected) in expecteds {
            circuit.set_input(a.gate, in_a);
            circuit.set_input(b.gate, in_b);
            circuit.update();
            let result = circuit.get_output(out);
            assert_eq!(result, Some(expected), "{in_a} {name} {in_b} = {expected}");
        }
    }

    #[test]
    fn gate_tests() {
        gate_test_gen("or", or, [false, true, true, true]);
        gate_test_gen("nor", nor, [true, false, false, false]);
        gate_test_gen("and", and, [false, false, false, true]);
        gate_test_gen("nand", nand, [true, true, true, false]);
        gate_test_gen("xor", xor, [false, true, true, false]);
        gate_test_gen("xnor", xnor, [true, false, false, true]);
    }

    #[test]
    fn single_connector_ops() {
        let builder = CircuitBuilder::shared();
        let a = Connector::input(builder.clone(), "a");
        a.set(true).unwrap();
        let same = and!(a).output("same");
        let flipped = nor(&a, &[]).output("flipped");
        let mut circuit = builder.borrow().build();
        assert_eq!(circuit.gate(GateId::from(1)).unwrap().input_nodes.len(), 1);
        circuit.update();
        assert_eq!(circuit.get_output(same), Some(true));
        assert_eq!(circuit.get_output(flipped), Some(false));
    }

    #[test]
    #[should_panic(expected = "connectors from different builders")]
    fn ops_reject_mixed_builders() {
        let a = Connector::input(CircuitBuilder::shared(), "a");
        let b = Connector::input(CircuitBuilder::shared(), "b");
        or!(a, b);
    }

    #[test]
    fn connector_mark_and_set() {
        let builder = CircuitBuilder::shared();
        let s = Connector::input(builder.clone(), "s");
        s.set(true).unwrap();
        let q = s.invert();
        q.mark("q");
        let lamp = q.output("lamp");
        let mut circuit = builder.borrow().build();
        assert_eq!(circuit.gate(q.gate).unwrap().label(), "q");
        circuit.update();
        assert_eq!(circuit.get_output(lamp), Some(false));
    }

    #[test]
    fn connector_connect_uses_free_pins() {
        let builder = CircuitBuilder::shared();
        let a = Connector::input(builder.clone(), "a");
        let b = Connector::input(builder.clone(), "b");
        let gate = builder.borrow_mut().add_gate(GateKind::Xor);
        let target = Connector::from_gate(builder.clone(), gate);
        a.connect(&target).unwrap();
        b.connect(&target).unwrap();
        assert_eq!(a.connect(&target), Err(LayoutError::NoFreeInput(gate)));

        let mut circuit = builder.borrow().build();
        circuit.set_input(a.gate, true);
        circuit.update();
        assert_eq!(circuit.get_output(gate), Some(true));
    }
}
