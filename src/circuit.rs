use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

use crate::circuit_sim::{Rounds, RunResult, SimConfig, DIAGNOSTIC_ROUNDS};
use crate::gate::{Gate, GateId, Signal};
use crate::state::CircuitState;
use crate::wire::Wire;

/// A gate network and the fixed-point evaluator that settles it.
#[derive(Clone, Debug, Default)]
pub struct Circuit {
    gates: Vec<Gate>,
    wires: Vec<Wire>,
    config: SimConfig,
    last_run: Option<RunResult>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replaces the topology. Nothing is checked here; build layouts
    /// with [`crate::circuit_builder::CircuitBuilder`] to get that.
    pub fn set_layout(&mut self, gates: Vec<Gate>, wires: Vec<Wire>) {
        self.gates = gates;
        self.wires = wires;
        self.last_run = None;
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config;
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn gate(&self, id: GateId) -> Option<&Gate> {
        self.gates.get(id.index())
    }

    pub fn gate_mut(&mut self, id: GateId) -> Option<&mut Gate> {
        self.gates.get_mut(id.index())
    }

    /// Sets the switch of an INPUT gate. Returns false if `id` is not
    /// an INPUT gate.
    pub fn set_input(&mut self, id: GateId, val: bool) -> bool {
        match self.gate_mut(id) {
            Some(gate) if gate.is_input() => {
                gate.set_state(val);
                true
            }
            _ => false,
        }
    }

    pub fn toggle_input(&mut self, id: GateId) -> bool {
        self.gate_mut(id).map_or(false, Gate::toggle)
    }

    pub fn get_output(&self, id: GateId) -> Signal {
        self.gate(id).and_then(Gate::value)
    }

    pub fn last_run(&self) -> Option<&RunResult> {
        self.last_run.as_ref()
    }

    pub fn unstable_gates(&self) -> Vec<GateId> {
        self.gates
            .iter()
            .enumerate()
            .filter(|(_, gate)| gate.is_unstable())
            .map(|(index, _)| GateId::from(index))
            .collect()
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::capture(&self.gates, &self.wires)
    }

    /// Settles the circuit from scratch and returns the resulting state.
    ///
    /// Runs at most `max_iterations` settle rounds. If the circuit has
    /// not reached a fixed point by then, [`DIAGNOSTIC_ROUNDS`] more
    /// rounds find the gates that keep changing; those are flagged
    /// unstable and their outputs left undriven.
    pub fn update(&mut self) -> CircuitState {
        let span = span!(
            Level::DEBUG,
            "update",
            gates = self.gates.len(),
            wires = self.wires.len()
        );
        let _enter = span.enter();

        self.gates.iter_mut().for_each(Gate::reset);
        self.gates
            .iter_mut()
            .filter(|gate| gate.is_input())
            .for_each(|gate| {
                gate.evaluate();
            });
        let dangling = self.propagate_wires();
        if dangling > 0 {
            event!(
                Level::WARN,
                "{dangling} wires do not resolve to gate pins and are ignored"
            );
        }

        let max_iterations = self.config.max_iterations;
        let mut previous = self.state();
        let mut iterations: Rounds = 0;
        let mut stabilized = false;
        while iterations < max_iterations {
            iterations += 1;
            let changed = self.evaluate_logic();
            self.propagate_wires();
            if !changed.is_empty() {
                event!(
                    Level::TRACE,
                    iteration = iterations,
                    "changed: {:?}",
                    self.labels(&changed)
                );
            }
            let current = self.state();
            if current == previous {
                stabilized = true;
                break;
            }
            previous = current;
        }

        let result = if stabilized {
            event!(Level::DEBUG, "stabilized after {iterations} iterations");
            RunResult::Stabilized {
                after_iterations: iterations,
            }
        } else {
            self.diagnose(max_iterations)
        };
        self.last_run = Some(result);
        self.state()
    }

    fn diagnose(&mut self, max_iterations: Rounds) -> RunResult {
        let mut unstable = BTreeSet::new();
        for round in 1..=DIAGNOSTIC_ROUNDS {
            let changed = self.evaluate_logic();
            self.propagate_wires();
            if !changed.is_empty() {
                event!(
                    Level::DEBUG,
                    round,
                    "diagnostic round changed: {:?}",
                    self.labels(&changed)
                );
            }
            // The first round settles against the last settle round, so
            // only later rounds can show a gate flipping.
            if round > 1 {
                unstable.extend(changed);
            }
        }

        let unstable: Vec<GateId> = unstable.into_iter().collect();
        for id in &unstable {
            self.gates[id.index()].mark_unstable();
        }
        // Carry the cleared outputs onto wire ends.
        self.propagate_wires();

        event!(
            Level::WARN,
            "no fixed point after {max_iterations} iterations; unstable gates: {:?}",
            self.labels(&unstable)
        );
        RunResult::ReachedMaxIterations {
            max_iterations,
            unstable,
        }
    }

    /// Evaluates every logic gate once, in order, and returns the gates
    /// whose primary output changed.
    fn evaluate_logic(&mut self) -> Vec<GateId> {
        self.gates
            .iter_mut()
            .enumerate()
            .filter(|(_, gate)| gate.kind().is_logic())
            .filter_map(|(index, gate)| {
                let old = gate.primary_output();
                (gate.evaluate() != old).then(|| GateId::from(index))
            })
            .collect()
    }

    /// Returns the number of wires that could not be propagated.
    fn propagate_wires(&mut self) -> usize {
        let gates = &mut self.gates;
        self.wires
            .iter()
            .filter(|wire| !wire.propagate(gates))
            .count()
    }

    fn labels(&self, ids: &[GateId]) -> Vec<String> {
        ids.iter()
            .map(|id| format!("{}{}", self.gates[id.index()].label(), id))
            .collect()
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.state().fmt(f)
    }
}
