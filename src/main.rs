use std::error::Error;
use std::fmt::{self, Display, Formatter};

use clap::{Parser, Subcommand};
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use gatesim::{
    circuit_builder::{CircuitBuilder, LayoutError},
    circuit_sim::{SimConfig, DEFAULT_MAX_ITERATIONS},
    components::adder::RippleCarryAdder,
    Circuit, GateKind,
};

/// Settle a sample logic-gate circuit and print its state
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Settle rounds allowed before the circuit is diagnosed as
    /// oscillating.
    #[clap(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    #[clap(subcommand)]
    demo: Demo,
}

#[derive(Subcommand, Debug)]
enum Demo {
    /// 8-bit ripple-carry adder computing A + B + carry-in.
    Adder {
        a: u8,
        b: u8,
        #[clap(long)]
        cin: bool,
    },
    /// SR latch made of two cross-coupled NOR gates.
    Latch {
        #[clap(long)]
        set: bool,
        #[clap(long)]
        reset: bool,
    },
    /// A ring of NOT gates.
    Ring {
        #[clap(default_value_t = 3)]
        length: usize,
    },
}

#[derive(Debug)]
enum Fail {
    Layout(LayoutError),
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::Layout(e) => write!(f, "bad circuit layout: {e}"),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

impl From<LayoutError> for Fail {
    fn from(e: LayoutError) -> Self {
        Fail::Layout(e)
    }
}

fn latch(set: bool, reset: bool, config: SimConfig) -> Result<Circuit, LayoutError> {
    let mut builder = CircuitBuilder::new();
    let s = builder.input("S");
    let r = builder.input("R");
    let q = builder.add_gate(GateKind::Nor);
    let q_not = builder.add_gate(GateKind::Nor);
    builder.set_label(q, "Q")?;
    builder.set_label(q_not, "Q'")?;
    builder.connect_next(r, q)?;
    builder.connect_next(q_not, q)?;
    builder.connect_next(s, q_not)?;
    builder.connect_next(q, q_not)?;
    let lamp = builder.output("q");
    builder.connect_next(q, lamp)?;
    builder.set_state(s, set)?;
    builder.set_state(r, reset)?;
    Ok(builder.build_with_config(config))
}

fn ring(length: usize, config: SimConfig) -> Result<Circuit, LayoutError> {
    let mut builder = CircuitBuilder::new();
    let gates: Vec<_> = (0..length)
        .map(|_| builder.add_gate(GateKind::Not))
        .collect();
    for (i, gate) in gates.iter().enumerate() {
        builder.connect_next(*gate, gates[(i + 1) % length])?;
    }
    Ok(builder.build_with_config(config))
}

fn run_demo() -> Result<(), Fail> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let config = SimConfig::with_max_iterations(cli.max_iterations);
    let span = span!(Level::INFO, "demo", demo = ?cli.demo);
    let _enter = span.enter();

    match cli.demo {
        Demo::Adder { a, b, cin } => {
            let builder = CircuitBuilder::shared();
            let rca = RippleCarryAdder::<8>::new(builder.clone());
            let mut circuit = builder.borrow().build_with_config(config);
            rca.a.set(&mut circuit, a);
            rca.b.set(&mut circuit, b);
            circuit.set_input(rca.cin, cin);
            circuit.update();
            print!("{circuit}");
            let sum: u16 = rca.sum.read(&circuit);
            let carry = circuit.get_output(rca.cout) == Some(true);
            println!("{a} + {b} + {} = {}", u8::from(cin), sum + (u16::from(carry) << 8));
            report(&circuit);
        }
        Demo::Latch { set, reset } => {
            let mut circuit = latch(set, reset, config)?;
            circuit.update();
            print!("{circuit}");
            report(&circuit);
        }
        Demo::Ring { length } => {
            if length == 0 {
                return Err(Fail::InitialisationFailure(
                    "a ring needs at least one gate".to_string(),
                ));
            }
            let mut circuit = ring(length, config)?;
            circuit.update();
            print!("{circuit}");
            report(&circuit);
        }
    }
    Ok(())
}

fn report(circuit: &Circuit) {
    if let Some(result) = circuit.last_run() {
        event!(Level::INFO, "{result}");
    }
    for id in circuit.unstable_gates() {
        if let Some(gate) = circuit.gate(id) {
            println!("unstable: {} {id}", gate.label());
        }
    }
}

fn main() {
    match run_demo() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
