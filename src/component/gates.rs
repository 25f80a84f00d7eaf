/*!

  Combinational gate arrays: 74HC00, 74HC02, 74HC04, 74HC08, 74HC32 and 74HC86.

*/

use super::{Component, GND_PIN, Pin, PinMask, PinTable, VCC_PIN};
use crate::circuit::LogicLevel;

/// Typical propagation delay of the HC gate arrays in nanoseconds
pub const GATE_DELAY_NS: f64 = 8.0;

/// The Boolean function computed by every gate of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateFunction {
    /// Two-input AND
    And,
    /// Two-input OR
    Or,
    /// Two-input NAND
    Nand,
    /// Two-input NOR
    Nor,
    /// Two-input XOR
    Xor,
    /// Inverter. The second operand is ignored.
    Not,
}

impl GateFunction {
    /// Evaluates the function. Any floating operand yields [LogicLevel::Floating].
    pub fn eval(&self, a: LogicLevel, b: LogicLevel) -> LogicLevel {
        if let GateFunction::Not = self {
            return a.invert();
        }
        let (Some(a), Some(b)) = (a.as_bool(), b.as_bool()) else {
            return LogicLevel::Floating;
        };
        LogicLevel::from_bool(match self {
            GateFunction::And => a && b,
            GateFunction::Or => a || b,
            GateFunction::Nand => !(a && b),
            GateFunction::Nor => !(a || b),
            GateFunction::Xor => a != b,
            GateFunction::Not => unreachable!(),
        })
    }

    /// Returns the number of inputs of one gate
    pub fn arity(&self) -> usize {
        match self {
            GateFunction::Not => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for GateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GateFunction::And => "AND",
            GateFunction::Or => "OR",
            GateFunction::Nand => "NAND",
            GateFunction::Nor => "NOR",
            GateFunction::Xor => "XOR",
            GateFunction::Not => "NOT",
        };
        write!(f, "{name}")
    }
}

/// The pins of one gate inside a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// First input
    pub input_a: Pin,
    /// Second input, absent for an inverter
    pub input_b: Option<Pin>,
    /// Output
    pub output: Pin,
}

impl Gate {
    const fn two(a: Pin, b: Pin, y: Pin) -> Self {
        Self {
            input_a: a,
            input_b: Some(b),
            output: y,
        }
    }

    const fn one(a: Pin, y: Pin) -> Self {
        Self {
            input_a: a,
            input_b: None,
            output: y,
        }
    }
}

const QUAD_GATES: [Gate; 4] = [
    Gate::two(1, 2, 3),
    Gate::two(4, 5, 6),
    Gate::two(9, 10, 8),
    Gate::two(12, 13, 11),
];

// The 74HC02 mirrors the pinout: output first
const QUAD_NOR_GATES: [Gate; 4] = [
    Gate::two(2, 3, 1),
    Gate::two(5, 6, 4),
    Gate::two(9, 8, 10),
    Gate::two(12, 11, 13),
];

const HEX_INVERTERS: [Gate; 6] = [
    Gate::one(1, 2),
    Gate::one(3, 4),
    Gate::one(5, 6),
    Gate::one(9, 8),
    Gate::one(11, 10),
    Gate::one(13, 12),
];

/// A package of identical gates sharing VCC on pin 14 and GND on pin 7
#[derive(Debug, Clone)]
pub struct GateArray {
    part_number: &'static str,
    function: GateFunction,
    gates: &'static [Gate],
    pins: PinTable,
    power_on: bool,
    inputs: PinMask,
    outputs: PinMask,
}

impl GateArray {
    /// Creates a powered package of `gates`, each computing `function`
    pub fn new(part_number: &'static str, function: GateFunction, gates: &'static [Gate]) -> Self {
        let inputs = gates
            .iter()
            .flat_map(|g| std::iter::once(g.input_a).chain(g.input_b))
            .collect();
        let outputs = gates.iter().map(|g| g.output).collect();
        Self {
            part_number,
            function,
            gates,
            pins: PinTable::new(),
            power_on: true,
            inputs,
            outputs,
        }
    }

    /// Quad 2-input NAND
    pub fn quad_nand_74hc00() -> Self {
        Self::new("74HC00", GateFunction::Nand, &QUAD_GATES)
    }

    /// Quad 2-input NOR
    pub fn quad_nor_74hc02() -> Self {
        Self::new("74HC02", GateFunction::Nor, &QUAD_NOR_GATES)
    }

    /// Hex inverter
    pub fn hex_inverter_74hc04() -> Self {
        Self::new("74HC04", GateFunction::Not, &HEX_INVERTERS)
    }

    /// Quad 2-input AND
    pub fn quad_and_74hc08() -> Self {
        Self::new("74HC08", GateFunction::And, &QUAD_GATES)
    }

    /// Quad 2-input OR
    pub fn quad_or_74hc32() -> Self {
        Self::new("74HC32", GateFunction::Or, &QUAD_GATES)
    }

    /// Quad 2-input XOR
    pub fn quad_xor_74hc86() -> Self {
        Self::new("74HC86", GateFunction::Xor, &QUAD_GATES)
    }

    /// Returns the function of the gates
    pub fn get_function(&self) -> GateFunction {
        self.function
    }

    /// Returns the pinout of every gate in the package
    pub fn get_gates(&self) -> &[Gate] {
        self.gates
    }

    /// Drives the inputs of gate `gate` (1-based). `b` is ignored by an inverter.
    ///
    /// # Panics
    ///
    /// Panics if the package has no such gate.
    pub fn set_gate_inputs(&mut self, gate: usize, a: LogicLevel, b: LogicLevel) {
        let g = self.gate(gate);
        self.pins.set(g.input_a, a);
        if let Some(pin) = g.input_b {
            self.pins.set(pin, b);
        }
        self.update_outputs();
    }

    /// Returns the output of gate `gate` (1-based)
    ///
    /// # Panics
    ///
    /// Panics if the package has no such gate.
    pub fn get_gate_output(&self, gate: usize) -> LogicLevel {
        self.pins.get(self.gate(gate).output)
    }

    fn gate(&self, gate: usize) -> Gate {
        match gate.checked_sub(1).and_then(|i| self.gates.get(i)) {
            Some(g) => *g,
            None => panic!("Gate {gate} out of range for {}", self.part_number),
        }
    }

    fn update_outputs(&mut self) {
        if !self.power_on {
            return;
        }
        for g in self.gates {
            let a = self.pins.get(g.input_a);
            let b = g.input_b.map(|p| self.pins.get(p)).unwrap_or(a);
            self.pins.set(g.output, self.function.eval(a, b));
        }
    }
}

impl Component for GateArray {
    fn get_part_number(&self) -> &str {
        self.part_number
    }

    fn set_pin(&mut self, pin: Pin, level: LogicLevel) {
        self.pins.set(pin, level);
        if self.inputs.contains(pin) {
            self.update_outputs();
        }
    }

    fn get_pin(&self, pin: Pin) -> LogicLevel {
        self.pins.get(pin)
    }

    fn set_power(&mut self, on: bool) {
        self.power_on = on;
        if on {
            self.pins.set(VCC_PIN, LogicLevel::High);
            self.update_outputs();
        } else {
            for pin in self.outputs.iter() {
                self.pins.set(pin, LogicLevel::Floating);
            }
        }
    }

    fn is_power_on(&self) -> bool {
        self.power_on
    }

    fn get_propagation_delay(&self) -> f64 {
        GATE_DELAY_NS
    }

    fn get_input_pins(&self) -> PinMask {
        self.inputs
    }

    fn get_output_pins(&self) -> PinMask {
        self.outputs
    }

    fn get_fan_in(&self, pin: Pin) -> PinMask {
        self.gates
            .iter()
            .filter(|g| g.output == pin)
            .flat_map(|g| std::iter::once(g.input_a).chain(g.input_b))
            .collect()
    }

    fn get_pin_name(&self, pin: Pin) -> String {
        match pin {
            VCC_PIN => return "VCC".to_string(),
            GND_PIN => return "GND".to_string(),
            _ => (),
        }
        for (i, g) in self.gates.iter().enumerate() {
            let n = i + 1;
            if g.input_a == pin {
                return format!("{n}A");
            }
            if g.input_b == Some(pin) {
                return format!("{n}B");
            }
            if g.output == pin {
                return format!("{n}Y");
            }
        }
        "NC".to_string()
    }
}
