pub mod circuit_builder;
pub mod circuit_sim;
pub mod components;
pub mod gate;
pub mod state;
pub mod wire;

mod circuit;
pub use circuit::Circuit;
pub use gate::{Gate, GateId, GateKind, Signal};
pub use state::CircuitState;
pub use wire::{PinRef, Wire};
