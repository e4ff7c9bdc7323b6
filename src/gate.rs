use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// The value carried by a pin. `None` means the pin has not been
/// driven during the current update.
pub type Signal = Option<bool>;

/// Identifies a gate by its position in the circuit's gate list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GateId(usize);

impl GateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for GateId {
    fn from(index: usize) -> Self {
        GateId(index)
    }
}

impl From<GateId> for usize {
    fn from(id: GateId) -> usize {
        id.0
    }
}

impl Display for GateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateKind {
    /// A switch. Has no inputs and drives its output from [`Gate::state`].
    Input,
    /// A sink (lamp). Has no outputs and is never evaluated.
    Output,
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
    Xnor,
    /// A one-bit adder with inputs `a`, `b`, `cin`. Output 0 is the sum
    /// and output 1 the carry out.
    FullAdder,
}

impl GateKind {
    pub const ALL: [GateKind; 10] = [
        GateKind::Input,
        GateKind::Output,
        GateKind::And,
        GateKind::Or,
        GateKind::Not,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
        GateKind::FullAdder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GateKind::Input => "INPUT",
            GateKind::Output => "OUTPUT",
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Not => "NOT",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Xnor => "XNOR",
            GateKind::FullAdder => "FULL_ADDER",
        }
    }

    pub fn default_inputs(self) -> usize {
        match self {
            GateKind::Input => 0,
            GateKind::Output | GateKind::Not => 1,
            GateKind::FullAdder => 3,
            _ => 2,
        }
    }

    pub fn num_outputs(self) -> usize {
        match self {
            GateKind::Output => 0,
            GateKind::FullAdder => 2,
            _ => 1,
        }
    }

    /// Whether the kind accepts an input count other than its default.
    pub fn is_variadic(self) -> bool {
        !matches!(
            self,
            GateKind::Input | GateKind::Output | GateKind::Not | GateKind::FullAdder
        )
    }

    /// Logic gates are everything the settle loop evaluates.
    pub fn is_logic(self) -> bool {
        !matches!(self, GateKind::Input | GateKind::Output)
    }

    /// Computes one value per output pin of a gate of this kind.
    /// Undriven inputs of logic gates read as low, so logic gates always
    /// drive every output.
    pub fn evaluate(self, inputs: &[Signal], state: bool) -> Vec<Signal> {
        let mut highs = inputs.iter().map(|input| input.unwrap_or(false));
        let output = match self {
            GateKind::Input => state,
            GateKind::Output => return Vec::new(),
            GateKind::And => highs.all(|high| high),
            GateKind::Or => highs.any(|high| high),
            GateKind::Not => !highs.next().unwrap_or(false),
            GateKind::Nand => !highs.all(|high| high),
            GateKind::Nor => !highs.any(|high| high),
            GateKind::Xor => highs.filter(|high| *high).count() % 2 == 1,
            GateKind::Xnor => highs.filter(|high| *high).count() % 2 == 0,
            GateKind::FullAdder => {
                let count = highs.filter(|high| *high).count();
                return vec![Some(count % 2 == 1), Some(count >= 2)];
            }
        };
        vec![Some(output)]
    }
}

impl Display for GateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub source_value: Signal,
}

#[derive(Clone, Debug)]
pub struct Gate {
    kind: GateKind,
    label: String,
    pub input_nodes: Vec<Node>,
    pub output_nodes: Vec<Node>,
    unstable: bool,
    state: bool,
}

impl Gate {
    pub fn new(kind: GateKind) -> Self {
        Self::with_inputs(kind, kind.default_inputs())
    }

    /// Creates a gate with `num_inputs` input pins. No arity checks are
    /// made here; [`crate::circuit_builder::CircuitBuilder`] does those.
    pub fn with_inputs(kind: GateKind, num_inputs: usize) -> Self {
        Self {
            kind,
            label: kind.name().to_string(),
            input_nodes: vec![Node::default(); num_inputs],
            output_nodes: vec![Node::default(); kind.num_outputs()],
            unstable: false,
            state: false,
        }
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// An empty label restores the kind's name.
    pub fn set_label(&mut self, label: &str) {
        self.label = if label.is_empty() {
            self.kind.name().to_string()
        } else {
            label.to_string()
        };
    }

    pub fn is_input(&self) -> bool {
        self.kind == GateKind::Input
    }

    pub fn is_output(&self) -> bool {
        self.kind == GateKind::Output
    }

    pub fn state(&self) -> bool {
        self.state
    }

    pub fn set_state(&mut self, state: bool) {
        self.state = state;
    }

    /// Flips the switch of an INPUT gate. Returns false, leaving the
    /// gate alone, for every other kind.
    pub fn toggle(&mut self) -> bool {
        if self.is_input() {
            self.state = !self.state;
            true
        } else {
            false
        }
    }

    pub fn is_unstable(&self) -> bool {
        self.unstable
    }

    pub(crate) fn mark_unstable(&mut self) {
        self.unstable = true;
        if let Some(node) = self.output_nodes.first_mut() {
            node.source_value = None;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.unstable = false;
        self.input_nodes
            .iter_mut()
            .chain(self.output_nodes.iter_mut())
            .for_each(|node| node.source_value = None);
    }

    pub fn primary_output(&self) -> Signal {
        self.output_nodes.first().and_then(|node| node.source_value)
    }

    /// What a display would show for this gate: the driven input of an
    /// OUTPUT gate, the primary output of everything else.
    pub fn value(&self) -> Signal {
        if self.is_output() {
            self.input_nodes.first().and_then(|node| node.source_value)
        } else {
            self.primary_output()
        }
    }

    pub fn input_values(&self) -> Vec<Signal> {
        self.input_nodes.iter().map(|node| node.source_value).collect()
    }

    pub fn output_values(&self) -> Vec<Signal> {
        self.output_nodes
            .iter()
            .map(|node| node.source_value)
            .collect()
    }

    /// Recomputes the outputs from the current input values and returns
    /// the new primary output.
    pub fn evaluate(&mut self) -> Signal {
        let outputs = self.kind.evaluate(&self.input_values(), self.state);
        for (node, value) in self.output_nodes.iter_mut().zip(outputs) {
            node.source_value = value;
        }
        self.primary_output()
    }
}
