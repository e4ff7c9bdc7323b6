use crate::{
    circuit_builder::{ops::*, Connector, SharedBuilder},
    GateId,
};

use super::bus::Bus;

pub struct Adder {
    pub sum: Connector,
    pub cout: Connector,
}

pub fn full_adder(a: Connector, b: Connector, cin: Connector) -> Adder {
    let sum = xor!(a, b, cin);
    let cout = or!(and!(a, b), and!(a, cin), and!(b, cin));
    Adder { sum, cout }
}

/// `sum = a + b + cin`, with inputs as INPUT gates and results on
/// OUTPUT gates.
pub struct RippleCarryAdder<const BITS: usize> {
    pub a: Bus<BITS>,
    pub b: Bus<BITS>,
    pub cin: GateId,
    pub sum: Bus<BITS>,
    pub cout: GateId,
}

impl<const BITS: usize> RippleCarryAdder<BITS> {
    pub fn new(builder: SharedBuilder) -> RippleCarryAdder<BITS> {
        assert!(BITS > 0);

        let cin = Connector::input(builder.clone(), "cin");
        let mut a = [cin.gate; BITS];
        let mut b = [cin.gate; BITS];
        let mut sum = [cin.gate; BITS];

        let mut carry = cin.clone();
        for i in 0..BITS {
            let a_i = Connector::input(builder.clone(), &format!("a{i}"));
            let b_i = Connector::input(builder.clone(), &format!("b{i}"));
            a[i] = a_i.gate;
            b[i] = b_i.gate;
            let Adder { sum: sum_i, cout } = full_adder(a_i, b_i, carry);
            sum[i] = sum_i.output(&format!("s{i}"));
            carry = cout;
        }

        RippleCarryAdder {
            a: Bus(a),
            b: Bus(b),
            cin: cin.gate,
            sum: Bus(sum),
            cout: carry.output("cout"),
        }
    }
}
