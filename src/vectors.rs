/*!

  Test-vector files.

  ```text
  # full adder
  [a=1 b=1 cin=1]
  a = 1
  b = 1
  cin = 1
  sum = 1
  cout = 1
  ```

  Every `[label]` line opens a vector. Assignments are split into stimulus and
  expectations by the declared direction of the signal, or failing that by name.

*/

use crate::circuit::{LogicLevel, Signal, SignalMap};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// One named scenario: levels to apply and levels to expect
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestVector {
    description: String,
    inputs: Vec<(String, LogicLevel)>,
    expected: Vec<(String, LogicLevel)>,
}

impl TestVector {
    /// Creates an empty vector
    pub fn new(description: String) -> Self {
        Self {
            description,
            ..Default::default()
        }
    }

    /// Adds a stimulus
    pub fn add_input(&mut self, signal: String, level: LogicLevel) {
        self.inputs.push((signal, level));
    }

    /// Adds an expectation
    pub fn add_expected_output(&mut self, signal: String, level: LogicLevel) {
        self.expected.push((signal, level));
    }

    /// Returns the label of the vector
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Returns the stimulus in file order
    pub fn inputs(&self) -> impl Iterator<Item = (&str, LogicLevel)> {
        self.inputs.iter().map(|(s, l)| (s.as_str(), *l))
    }

    /// Returns the expectations in file order
    pub fn expected_outputs(&self) -> impl Iterator<Item = (&str, LogicLevel)> {
        self.expected.iter().map(|(s, l)| (s.as_str(), *l))
    }
}

/// What an assignment in a vector file means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A level to drive
    Stimulus,
    /// A level to check
    Expectation,
}

/// Classifies an assignment to `name`. A declared `signal` decides by its direction;
/// otherwise naming conventions are used.
pub fn classify(name: &str, signal: Option<&Signal>) -> Option<Role> {
    if let Some(s) = signal {
        if s.is_input() {
            return Some(Role::Stimulus);
        }
        if s.is_output() {
            return Some(Role::Expectation);
        }
    }
    classify_by_name(name)
}

/// Classifies `name` by naming conventions alone
pub fn classify_by_name(name: &str) -> Option<Role> {
    let stimulus = name.contains("_in")
        || matches!(name, "a" | "b" | "cin")
        || name.starts_with("a_")
        || name.starts_with("b_");
    if stimulus {
        return Some(Role::Stimulus);
    }
    let expectation = matches!(name, "sum" | "cout")
        || name.starts_with("sum_")
        || name.ends_with("_out");
    expectation.then_some(Role::Expectation)
}

/// Parses a vector file. `signals` supplies declared directions and may be empty.
pub fn parse_vectors(text: &str, signals: &SignalMap) -> Vec<TestVector> {
    let mut vectors = Vec::new();
    let mut current: Option<TestVector> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
            if let Some(v) = current.take() {
                vectors.push(v);
            }
            current = Some(TestVector::new(line[1..line.len() - 1].to_string()));
            continue;
        }

        let Some(vector) = current.as_mut() else {
            debug!("Ignoring line outside of a vector: {line}");
            continue;
        };
        let Some((name, value)) = line.split_once('=') else {
            debug!("Ignoring line without an assignment: {line}");
            continue;
        };
        let name = name.trim();
        let level = LogicLevel::parse(value.trim());
        match classify(name, signals.get(name)) {
            Some(Role::Stimulus) => vector.add_input(name.to_string(), level),
            Some(Role::Expectation) => vector.add_expected_output(name.to_string(), level),
            None => warn!(
                "Dropping {name} in [{}]: not a declared port and no naming convention applies",
                vector.get_description()
            ),
        }
    }

    if let Some(v) = current {
        vectors.push(v);
    }
    vectors
}

/// Reads and parses the vector file at `path`
pub fn load_vectors(path: impl AsRef<Path>, signals: &SignalMap) -> Result<Vec<TestVector>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_vectors(&text, signals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_fallback() {
        assert_eq!(classify_by_name("a"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("cin"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("b_3"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("data_in"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("sum_0"), Some(Role::Expectation));
        assert_eq!(classify_by_name("cout"), Some(Role::Expectation));
        assert_eq!(classify_by_name("carry_out"), Some(Role::Expectation));
        assert_eq!(classify_by_name("clk"), None);
        // Substring matching misreads some names
        assert_eq!(classify_by_name("data_index_out"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("a_out"), Some(Role::Stimulus));
        assert_eq!(classify_by_name("y"), None);
    }

    #[test]
    fn blocks() {
        let text = "
            stray = 1
            # comment
            [first]
            a = 1
            b=0
            sum = 1
            not an assignment
            clk = 1

            [second]
            cout = z
        ";
        let vectors = parse_vectors(text, &SignalMap::new());
        assert_eq!(vectors.len(), 2);

        let first = &vectors[0];
        assert_eq!(first.get_description(), "first");
        assert_eq!(
            first.inputs().collect::<Vec<_>>(),
            vec![("a", LogicLevel::High), ("b", LogicLevel::Low)]
        );
        assert_eq!(
            first.expected_outputs().collect::<Vec<_>>(),
            vec![("sum", LogicLevel::High)]
        );

        let second = &vectors[1];
        assert_eq!(second.inputs().count(), 0);
        assert_eq!(
            second.expected_outputs().collect::<Vec<_>>(),
            vec![("cout", LogicLevel::Floating)]
        );
    }

    #[test]
    fn declared_directions_win() {
        let mut signals = SignalMap::new();
        signals.declare("clk", true, false);
        signals.declare("y", false, true);
        signals.declare("sum", true, false);
        let vectors = parse_vectors("[t]\nclk = 1\ny = 0\nsum = 1\n", &signals);
        let t = &vectors[0];
        assert_eq!(
            t.inputs().map(|(n, _)| n).collect::<Vec<_>>(),
            vec!["clk", "sum"]
        );
        assert_eq!(t.expected_outputs().map(|(n, _)| n).collect::<Vec<_>>(), vec!["y"]);
    }
}
