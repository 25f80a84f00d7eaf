/*!

  Running test vectors against a [Circuit].

*/

use crate::circuit::LogicLevel;
use crate::engine::Propagation;
use crate::netlist::Circuit;
use crate::vectors::TestVector;
use tracing::{debug, warn};

/// The comparison of one expected signal
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalCheck {
    /// The signal name
    pub signal: String,
    /// The level the vector expects
    pub expected: LogicLevel,
    /// The level after propagation
    pub actual: LogicLevel,
}

impl SignalCheck {
    /// Returns `true` if the levels agree
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

impl std::fmt::Display for SignalCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{}: Expected {}, Got {} [{verdict}]",
            self.signal, self.expected, self.actual
        )
    }
}

/// The outcome of one test vector
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VectorReport {
    /// The label of the vector
    pub description: String,
    /// The stimulus that was applied
    pub stimulus: Vec<(String, LogicLevel)>,
    /// Stimulus names with no matching signal
    pub skipped_inputs: Vec<String>,
    /// One entry per expectation, in file order
    pub checks: Vec<SignalCheck>,
    /// How propagation ended
    pub propagation: Propagation,
}

impl VectorReport {
    /// Returns `true` if every expectation holds. A vector without expectations passes.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(SignalCheck::passed)
    }

    /// Returns the failed expectations
    pub fn failures(&self) -> impl Iterator<Item = &SignalCheck> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

impl std::fmt::Display for VectorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (signal, level) in &self.stimulus {
            writeln!(f, "Input {signal} = {level}")?;
        }
        for signal in &self.skipped_inputs {
            writeln!(f, "Input {signal} skipped: no such signal")?;
        }
        writeln!(f, "Outputs ({}):", self.propagation)?;
        for check in &self.checks {
            writeln!(f, "{check}")?;
        }
        Ok(())
    }
}

/// The outcome of a whole vector file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunReport {
    /// The name of the simulated design
    pub module: String,
    /// One report per vector, in file order
    pub vectors: Vec<VectorReport>,
}

impl RunReport {
    /// Returns `true` if every vector passes. An empty run passes.
    pub fn passed(&self) -> bool {
        self.vectors.iter().all(VectorReport::passed)
    }

    /// Returns the number of passing vectors
    pub fn num_passed(&self) -> usize {
        self.vectors.iter().filter(|v| v.passed()).count()
    }

    /// Returns the number of failing vectors
    pub fn num_failed(&self) -> usize {
        self.vectors.len() - self.num_passed()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Simulating {} ===", self.module)?;
        for (i, v) in self.vectors.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "--- Test Vector {}: {} ---", i + 1, v.description)?;
            write!(f, "{v}")?;
        }
        writeln!(f)?;
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        writeln!(
            f,
            "Overall Result: {verdict} ({}/{} vectors passed)",
            self.num_passed(),
            self.vectors.len()
        )
    }
}

/// Resets `circuit`, applies the stimulus of `vector`, propagates and checks the expectations
pub fn run_vector(circuit: &mut Circuit, vector: &TestVector) -> VectorReport {
    circuit.reset();

    let mut stimulus = Vec::new();
    let mut skipped_inputs = Vec::new();
    for (signal, level) in vector.inputs() {
        if circuit.set_signal_level(signal, level) {
            stimulus.push((signal.to_string(), level));
        } else {
            warn!(
                "[{}] input {signal} is not a signal of {}",
                vector.get_description(),
                circuit.get_name()
            );
            skipped_inputs.push(signal.to_string());
        }
    }

    let propagation = circuit.drive_and_propagate();

    let checks: Vec<SignalCheck> = vector
        .expected_outputs()
        .map(|(signal, expected)| SignalCheck {
            signal: signal.to_string(),
            expected,
            actual: circuit.get_signal_level(signal),
        })
        .collect();

    let report = VectorReport {
        description: vector.get_description().to_string(),
        stimulus,
        skipped_inputs,
        checks,
        propagation,
    };
    debug!(
        "[{}] {}",
        report.description,
        if report.passed() { "PASS" } else { "FAIL" }
    );
    report
}

/// Runs every vector in order
pub fn run_all(circuit: &mut Circuit, vectors: &[TestVector]) -> RunReport {
    RunReport {
        module: circuit.get_name().to_string(),
        vectors: vectors.iter().map(|v| run_vector(circuit, v)).collect(),
    }
}
