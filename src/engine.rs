/*!

  Fixed-point propagation of signal levels through a [Circuit].

*/

use crate::circuit::{GROUND_RAIL, LogicLevel, SUPPLY_RAIL, SignalMap};
use crate::netlist::Circuit;
use tracing::{debug, warn};

/// The default cap on propagation rounds
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Options controlling simulation of a [Circuit]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOptions {
    /// The most passes over the instances [Circuit::drive_and_propagate] makes
    pub max_rounds: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// The outcome of [Circuit::drive_and_propagate]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Propagation {
    /// The number of passes made
    pub rounds: usize,
    /// `true` if the last pass changed no signal
    pub settled: bool,
}

impl std::fmt::Display for Propagation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.settled {
            write!(f, "settled after {} round(s)", self.rounds)
        } else {
            write!(f, "not settled after {} round(s)", self.rounds)
        }
    }
}

impl Circuit {
    /// Floats every signal, then drives the supply rail HIGH and the ground rail LOW.
    /// The state held inside the models is kept.
    pub fn reset(&mut self) {
        for s in self.signals.iter_mut() {
            s.set_level(LogicLevel::Floating);
        }
        if let Some(vcc) = self.signals.get_mut(SUPPLY_RAIL) {
            vcc.set_level(LogicLevel::High);
        }
        if let Some(gnd) = self.signals.get_mut(GROUND_RAIL) {
            gnd.set_level(LogicLevel::Low);
        }
    }

    /// Sets the level of `signal`. Returns `false` if there is no such signal.
    pub fn set_signal_level(&mut self, signal: &str, level: LogicLevel) -> bool {
        match self.signals.get_mut(signal) {
            Some(s) => {
                s.set_level(level);
                true
            }
            None => false,
        }
    }

    /// Makes one pass over the instances in declaration order, driving each model
    /// from its input signals and copying its outputs back. Returns the number of
    /// signals whose level changed.
    pub fn propagate_once(&mut self) -> usize {
        let before = self.signals.levels();
        for inst in self.instances.iter_mut() {
            inst.drive(&self.signals);
            inst.sample(&mut self.signals);
        }
        self.signals
            .iter()
            .zip(before)
            .filter(|(s, l)| s.get_level() != *l)
            .count()
    }

    /// Repeats [Circuit::propagate_once] until no signal changes or the round cap is hit
    pub fn drive_and_propagate(&mut self) -> Propagation {
        let max_rounds = self.options.max_rounds;
        for round in 1..=max_rounds {
            let changed = self.propagate_once();
            debug!("Round {round}: {changed} signal(s) changed");
            if changed == 0 {
                return Propagation {
                    rounds: round,
                    settled: true,
                };
            }
        }
        warn!(
            "{} did not settle within {max_rounds} rounds",
            self.get_name()
        );
        Propagation {
            rounds: max_rounds,
            settled: false,
        }
    }

    /// Returns a printable snapshot of every signal level
    pub fn state(&self) -> StateDump<'_> {
        StateDump(&self.signals)
    }
}

/// A listing of every signal and its level, one per line
#[derive(Debug, Clone, Copy)]
pub struct StateDump<'a>(&'a SignalMap);

impl std::fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for s in self.0.iter() {
            writeln!(f, "{s}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{DEFAULT_PACKAGE, NetlistDesc};

    // Two inverters in a chain, declared output-first so that one pass is not enough
    fn chain() -> Circuit {
        let mut desc = NetlistDesc::new("chain".to_string());
        desc.declare_signal("a", true, false);
        desc.declare_signal("y", false, true);
        desc.add_instance("U2", "74HC04", DEFAULT_PACKAGE);
        desc.connect("U2", 3, "n");
        desc.connect("U2", 4, "y");
        desc.add_instance("U1", "74HC04", DEFAULT_PACKAGE);
        desc.connect("U1", 1, "a");
        desc.connect("U1", 2, "n");
        Circuit::from_desc(desc).unwrap()
    }

    #[test]
    fn reset_drives_rails() {
        let mut desc = NetlistDesc::new("rails".to_string());
        desc.declare_signal("VCC", false, false);
        desc.declare_signal("GND", false, false);
        desc.declare_signal("x", false, false);
        let mut circuit = Circuit::from_desc(desc).unwrap();
        circuit.set_signal_level("x", LogicLevel::High);
        circuit.reset();
        assert_eq!(circuit.get_signal_level("VCC"), LogicLevel::High);
        assert_eq!(circuit.get_signal_level("GND"), LogicLevel::Low);
        assert_eq!(circuit.get_signal_level("x"), LogicLevel::Floating);
    }

    #[test]
    fn settles_in_declaration_order() {
        let mut circuit = chain();
        circuit.reset();
        assert!(circuit.set_signal_level("a", LogicLevel::Low));
        assert!(!circuit.set_signal_level("nope", LogicLevel::Low));
        let p = circuit.drive_and_propagate();
        assert_eq!(circuit.get_signal_level("n"), LogicLevel::High);
        assert_eq!(circuit.get_signal_level("y"), LogicLevel::Low);
        assert_eq!(
            p,
            Propagation {
                rounds: 3,
                settled: true
            }
        );
    }

    #[test]
    fn round_cap() {
        let mut circuit = chain();
        circuit.set_options(SimOptions { max_rounds: 1 });
        circuit.reset();
        circuit.set_signal_level("a", LogicLevel::High);
        let p = circuit.drive_and_propagate();
        assert!(!p.settled);
        assert_eq!(p.rounds, 1);
        assert_eq!(circuit.get_signal_level("n"), LogicLevel::Low);
        assert_eq!(circuit.get_signal_level("y"), LogicLevel::Floating);
    }

    #[test]
    fn state_dump() {
        let mut circuit = chain();
        circuit.reset();
        circuit.set_signal_level("a", LogicLevel::High);
        circuit.drive_and_propagate();
        crate::assert_lines_eq!(
            circuit.state().to_string(),
            "a = HIGH (1)
             y = HIGH (1)
             n = LOW (0)"
        );
    }
}
