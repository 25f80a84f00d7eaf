/*!

  Logic levels and the named single-bit signals that carry them.

*/

use std::collections::HashMap;

/// The name of the supply rail, which is forced HIGH on reset
pub const SUPPLY_RAIL: &str = "VCC";
/// The name of the ground rail, which is forced LOW on reset
pub const GROUND_RAIL: &str = "GND";

/// The level carried by a single-bit net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LogicLevel {
    /// A logical 0
    Low,
    /// A logical 1
    High,
    /// An undriven or high-Z net. Absorbing under every gate function.
    #[default]
    Floating,
}

impl LogicLevel {
    /// Parses a level from text. `0`/`LOW`/`low` and `1`/`HIGH`/`high` are recognized,
    /// everything else is [LogicLevel::Floating].
    pub fn parse(s: &str) -> Self {
        match s {
            "0" | "LOW" | "low" => LogicLevel::Low,
            "1" | "HIGH" | "high" => LogicLevel::High,
            _ => LogicLevel::Floating,
        }
    }

    /// Returns the level for a bool
    pub fn from_bool(b: bool) -> Self {
        if b { LogicLevel::High } else { LogicLevel::Low }
    }

    /// Returns the two-valued interpretation of the level, if there is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LogicLevel::Low => Some(false),
            LogicLevel::High => Some(true),
            LogicLevel::Floating => None,
        }
    }

    /// Returns `true` if the level is [LogicLevel::Floating]
    pub fn is_floating(&self) -> bool {
        matches!(self, LogicLevel::Floating)
    }

    /// Returns the complement. Floating stays floating.
    pub fn invert(self) -> Self {
        match self {
            LogicLevel::Low => LogicLevel::High,
            LogicLevel::High => LogicLevel::Low,
            LogicLevel::Floating => LogicLevel::Floating,
        }
    }

    /// The one-character form of the level: `0`, `1` or `Z`
    pub fn short_name(&self) -> char {
        match self {
            LogicLevel::Low => '0',
            LogicLevel::High => '1',
            LogicLevel::Floating => 'Z',
        }
    }
}

impl From<bool> for LogicLevel {
    fn from(value: bool) -> Self {
        LogicLevel::from_bool(value)
    }
}

impl std::fmt::Display for LogicLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicLevel::Low => write!(f, "LOW (0)"),
            LogicLevel::High => write!(f, "HIGH (1)"),
            LogicLevel::Floating => write!(f, "FLOATING (Z)"),
        }
    }
}

/// A dense index of a signal within its [SignalMap]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(usize);

impl SignalId {
    /// Returns the position of the signal in declaration order
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named single-bit wire in a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    name: String,
    level: LogicLevel,
    is_input: bool,
    is_output: bool,
}

impl Signal {
    /// Creates a new floating signal with the given direction
    pub fn new(name: String, is_input: bool, is_output: bool) -> Self {
        Self {
            name,
            level: LogicLevel::Floating,
            is_input,
            is_output,
        }
    }

    /// Creates a new internal signal
    pub fn new_internal(name: String) -> Self {
        Self::new(name, false, false)
    }

    /// Returns the name of the signal
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the current level of the signal
    pub fn get_level(&self) -> LogicLevel {
        self.level
    }

    /// Sets the current level of the signal
    pub fn set_level(&mut self, level: LogicLevel) {
        self.level = level;
    }

    /// Returns `true` if the signal is a declared input
    pub fn is_input(&self) -> bool {
        self.is_input
    }

    /// Returns `true` if the signal is a declared output
    pub fn is_output(&self) -> bool {
        self.is_output
    }

    /// Returns `true` if the signal is neither a declared input nor output
    pub fn is_internal(&self) -> bool {
        !self.is_input && !self.is_output
    }

    /// Returns `true` if the signal is the supply or ground rail
    pub fn is_rail(&self) -> bool {
        self.name == SUPPLY_RAIL || self.name == GROUND_RAIL
    }

    /// Returns a short label of the direction for diagnostics
    pub fn direction(&self) -> &'static str {
        match (self.is_input, self.is_output) {
            (true, true) => "inout",
            (true, false) => "input",
            (false, true) => "output",
            (false, false) => "internal",
        }
    }

    fn mark(&mut self, is_input: bool, is_output: bool) {
        self.is_input |= is_input;
        self.is_output |= is_output;
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.level)
    }
}

/// The signal registry of a circuit. There is exactly one [Signal] per name.
#[derive(Debug, Clone, Default)]
pub struct SignalMap {
    signals: Vec<Signal>,
    by_name: HashMap<String, SignalId>,
}

impl SignalMap {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the signal named `name`, creating it if needed.
    /// Direction flags are merged into an existing signal, never cleared.
    pub fn declare(&mut self, name: &str, is_input: bool, is_output: bool) -> SignalId {
        if let Some(id) = self.by_name.get(name) {
            self.signals[id.0].mark(is_input, is_output);
            return *id;
        }
        let id = SignalId(self.signals.len());
        self.signals
            .push(Signal::new(name.to_string(), is_input, is_output));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Looks up a signal id by name
    pub fn find(&self, name: &str) -> Option<SignalId> {
        self.by_name.get(name).copied()
    }

    /// Returns the signal named `name`
    pub fn get(&self, name: &str) -> Option<&Signal> {
        self.find(name).map(|id| &self.signals[id.0])
    }

    /// Returns a mutable reference to the signal named `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Signal> {
        let id = self.find(name)?;
        Some(&mut self.signals[id.0])
    }

    /// Returns the level of the signal, or [LogicLevel::Floating] if there is no such signal
    pub fn level_of(&self, name: &str) -> LogicLevel {
        self.get(name)
            .map(|s| s.get_level())
            .unwrap_or(LogicLevel::Floating)
    }

    /// Returns the number of signals
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if there are no signals
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Returns an iterator over the signals in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// Returns a mutable iterator over the signals in declaration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Signal> {
        self.signals.iter_mut()
    }

    /// Takes a snapshot of every level, indexed by [SignalId]
    pub fn levels(&self) -> Vec<LogicLevel> {
        self.signals.iter().map(|s| s.get_level()).collect()
    }
}

impl std::ops::Index<SignalId> for SignalMap {
    type Output = Signal;

    fn index(&self, index: SignalId) -> &Self::Output {
        &self.signals[index.0]
    }
}

impl std::ops::IndexMut<SignalId> for SignalMap {
    fn index_mut(&mut self, index: SignalId) -> &mut Self::Output {
        &mut self.signals[index.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_signal_per_name() {
        let mut map = SignalMap::new();
        let a = map.declare("a", true, false);
        let again = map.declare("a", false, false);
        assert_eq!(a, again);
        assert_eq!(map.len(), 1);
        assert!(map[a].is_input());
    }

    #[test]
    fn directions_merge() {
        let mut map = SignalMap::new();
        let n = map.declare("n", false, false);
        assert!(map[n].is_internal());
        map.declare("n", false, true);
        assert!(map[n].is_output());
        assert!(!map[n].is_internal());
        assert_eq!(map[n].direction(), "output");
    }

    #[test]
    fn parse_levels() {
        assert_eq!(LogicLevel::parse("0"), LogicLevel::Low);
        assert_eq!(LogicLevel::parse("low"), LogicLevel::Low);
        assert_eq!(LogicLevel::parse("HIGH"), LogicLevel::High);
        assert_eq!(LogicLevel::parse("1"), LogicLevel::High);
        assert_eq!(LogicLevel::parse("Low"), LogicLevel::Floating);
        assert_eq!(LogicLevel::parse("x"), LogicLevel::Floating);
        assert_eq!(LogicLevel::Floating.invert(), LogicLevel::Floating);
    }

    #[test]
    fn missing_signal_reads_floating() {
        let map = SignalMap::new();
        assert_eq!(map.level_of("nope"), LogicLevel::Floating);
    }
}
