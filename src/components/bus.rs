use std::ops::{BitAnd, Shl};

use num_traits::Unsigned;

use crate::{circuit_builder::CircuitBuilder, Circuit, GateId};

/// A group of gates carrying one unsigned integer, least significant
/// bit first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bus<const BITS: usize>(pub [GateId; BITS]);

impl<const BITS: usize> Bus<BITS> {
    /// Creates BITS INPUT gates labelled `{prefix}0`, `{prefix}1`, ...
    pub fn inputs(builder: &mut CircuitBuilder, prefix: &str) -> Self {
        Bus(std::array::from_fn(|bit| {
            builder.input(&format!("{prefix}{bit}"))
        }))
    }

    pub fn outputs(builder: &mut CircuitBuilder, prefix: &str) -> Self {
        Bus(std::array::from_fn(|bit| {
            builder.output(&format!("{prefix}{bit}"))
        }))
    }

    pub fn gates(&self) -> &[GateId; BITS] {
        &self.0
    }

    /// Undriven bits read as 0.
    pub fn read<T>(&self, circuit: &Circuit) -> T
    where
        T: Unsigned + Shl<usize, Output = T>,
    {
        let mut sum = T::zero();
        for (bit, gate) in self.0.iter().cloned().enumerate() {
            if circuit.get_output(gate) == Some(true) {
                sum = sum + (T::one() << bit);
            }
        }
        sum
    }

    /// Sets the switches of the bus's INPUT gates to the bits of `val`.
    pub fn set<T>(&self, circuit: &mut Circuit, val: T)
    where
        T: Unsigned + Copy + BitAnd<T, Output = T> + Shl<usize, Output = T>,
    {
        for (bit, gate) in self.0.iter().cloned().enumerate() {
            let bit_val = !(val & (T::one() << bit)).is_zero();
            circuit.set_input(gate, bit_val);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::PinRef;

    #[test]
    fn set_then_read_through_buffers() {
        let mut builder = CircuitBuilder::new();
        let input = Bus::<8>::inputs(&mut builder, "in");
        let output = Bus::<8>::outputs(&mut builder, "out");
        for (from, to) in input.gates().iter().zip(output.gates()) {
            builder
                .connect(PinRef::new(*from, 0), PinRef::new(*to, 0))
                .unwrap();
        }
        let mut circuit = builder.build();
        assert_eq!(circuit.gate(input.0[3]).unwrap().label(), "in3");

        input.set(&mut circuit, 0xa5u8);
        circuit.update();
        assert_eq!(output.read::<u8>(&circuit), 0xa5);
        assert_eq!(input.read::<u32>(&circuit), 0xa5);
    }

    #[test]
    fn undriven_reads_zero() {
        let mut builder = CircuitBuilder::new();
        let output = Bus::<4>::outputs(&mut builder, "out");
        let mut circuit = builder.build();
        circuit.update();
        assert_eq!(output.read::<u8>(&circuit), 0);
    }
}
