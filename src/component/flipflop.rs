/*!

  The 74HC74 dual positive-edge-triggered D flip-flop with active-low preset and clear.

*/

use super::{Component, GND_PIN, Pin, PinMask, PinTable, VCC_PIN};
use crate::circuit::LogicLevel;

/// Typical propagation delay of the 74HC74 in nanoseconds
pub const FLIP_FLOP_DELAY_NS: f64 = 15.0;

/// The pins and state of one flip-flop in the package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bit {
    clr_n: Pin,
    d: Pin,
    clk: Pin,
    pre_n: Pin,
    q: Pin,
    q_n: Pin,
    stored: LogicLevel,
    last_clk: LogicLevel,
}

impl Bit {
    const fn new(clr_n: Pin, d: Pin, clk: Pin, pre_n: Pin, q: Pin, q_n: Pin) -> Self {
        Self {
            clr_n,
            d,
            clk,
            pre_n,
            q,
            q_n,
            stored: LogicLevel::Low,
            last_clk: LogicLevel::Low,
        }
    }

    fn step(&mut self, pins: &mut PinTable) {
        let pre_n = pins.get(self.pre_n);
        let clr_n = pins.get(self.clr_n);
        let clk = pins.get(self.clk);
        let d = pins.get(self.d);

        match (pre_n, clr_n) {
            (LogicLevel::Low, LogicLevel::High) => self.stored = LogicLevel::High,
            (LogicLevel::High, LogicLevel::Low) => self.stored = LogicLevel::Low,
            _ => {
                let rising = self.last_clk == LogicLevel::Low && clk == LogicLevel::High;
                if rising && !d.is_floating() {
                    self.stored = d;
                }
            }
        }
        self.last_clk = clk;

        pins.set(self.q, self.stored);
        pins.set(self.q_n, self.stored.invert());
    }

    fn float(&self, pins: &mut PinTable) {
        pins.set(self.q, LogicLevel::Floating);
        pins.set(self.q_n, LogicLevel::Floating);
    }

    fn pin_name(&self, n: usize, pin: Pin) -> Option<String> {
        let label = if pin == self.clr_n {
            "CLR"
        } else if pin == self.d {
            "D"
        } else if pin == self.clk {
            "CLK"
        } else if pin == self.pre_n {
            "PRE"
        } else if pin == self.q {
            "Q"
        } else if pin == self.q_n {
            "QN"
        } else {
            return None;
        };
        Some(format!("{n}{label}"))
    }
}

/// A dual D-type flip-flop package
#[derive(Debug, Clone)]
pub struct DualDFlipFlop {
    pins: PinTable,
    power_on: bool,
    bits: [Bit; 2],
}

impl DualDFlipFlop {
    /// Creates a powered 74HC74 with both bits holding LOW and the async controls inactive
    pub fn new() -> Self {
        let bits = [Bit::new(1, 2, 3, 4, 5, 6), Bit::new(13, 12, 11, 10, 9, 8)];
        let mut pins = PinTable::new();
        for b in &bits {
            pins.set(b.clr_n, LogicLevel::High);
            pins.set(b.pre_n, LogicLevel::High);
        }
        Self {
            pins,
            power_on: true,
            bits,
        }
    }

    /// Returns the stored state of flip-flop `bit` (1 or 2)
    ///
    /// # Panics
    ///
    /// Panics if `bit` is not 1 or 2.
    pub fn get_stored(&self, bit: usize) -> LogicLevel {
        match bit.checked_sub(1).and_then(|i| self.bits.get(i)) {
            Some(b) => b.stored,
            None => panic!("Flip-flop {bit} out of range for 74HC74"),
        }
    }

    fn update_outputs(&mut self) {
        if !self.power_on {
            return;
        }
        for bit in self.bits.iter_mut() {
            bit.step(&mut self.pins);
        }
    }
}

impl Default for DualDFlipFlop {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DualDFlipFlop {
    fn get_part_number(&self) -> &str {
        "74HC74"
    }

    fn set_pin(&mut self, pin: Pin, level: LogicLevel) {
        self.pins.set(pin, level);
        self.update_outputs();
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
            for bit in &self.bits {
                bit.float(&mut self.pins);
            }
        }
    }

    fn is_power_on(&self) -> bool {
        self.power_on
    }

    fn get_propagation_delay(&self) -> f64 {
        FLIP_FLOP_DELAY_NS
    }

    fn get_input_pins(&self) -> PinMask {
        self.bits
            .iter()
            .flat_map(|b| [b.clr_n, b.d, b.clk, b.pre_n])
            .collect()
    }

    fn get_output_pins(&self) -> PinMask {
        self.bits.iter().flat_map(|b| [b.q, b.q_n]).collect()
    }

    fn get_fan_in(&self, _pin: Pin) -> PinMask {
        PinMask::new()
    }

    fn get_pin_name(&self, pin: Pin) -> String {
        match pin {
            VCC_PIN => return "VCC".to_string(),
            GND_PIN => return "GND".to_string(),
            _ => (),
        }
        self.bits
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.pin_name(i + 1, pin))
            .unwrap_or_else(|| "NC".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LogicLevel::{Floating as Z, High as H, Low as L};

    #[test]
    fn outputs_float_until_first_evaluation() {
        let ff = DualDFlipFlop::new();
        assert_eq!(ff.get_pin(5), Z);
        assert_eq!(ff.get_pin(6), Z);
        assert_eq!(ff.get_stored(1), L);
        assert_eq!(ff.get_pin(1), H);
        assert_eq!(ff.get_pin(4), H);
    }

    #[test]
    fn captures_on_rising_edge_only() {
        let mut ff = DualDFlipFlop::new();
        ff.set_pin(3, L);
        ff.set_pin(2, H);
        assert_eq!(ff.get_pin(5), L);
        assert_eq!(ff.get_pin(6), H);

        ff.set_pin(3, H);
        assert_eq!(ff.get_pin(5), H);
        assert_eq!(ff.get_pin(6), L);

        // D changes while the clock stays high
        ff.set_pin(2, L);
        assert_eq!(ff.get_pin(5), H);

        // Falling edge
        ff.set_pin(3, L);
        assert_eq!(ff.get_pin(5), H);

        ff.set_pin(3, H);
        assert_eq!(ff.get_pin(5), L);
        assert_eq!(ff.get_stored(1), L);
    }

    #[test]
    fn floating_data_is_not_captured() {
        let mut ff = DualDFlipFlop::new();
        ff.set_pin(11, L);
        ff.set_pin(12, H);
        ff.set_pin(11, H);
        assert_eq!(ff.get_pin(9), H);
        ff.set_pin(11, L);
        ff.set_pin(12, Z);
        ff.set_pin(11, H);
        assert_eq!(ff.get_pin(9), H);
        assert_eq!(ff.get_pin(8), L);
    }

    #[test]
    fn async_preset_and_clear() {
        let mut ff = DualDFlipFlop::new();
        ff.set_pin(4, L);
        assert_eq!(ff.get_pin(5), H);
        ff.set_pin(4, H);
        assert_eq!(ff.get_pin(5), H);

        ff.set_pin(1, L);
        assert_eq!(ff.get_pin(5), L);
        assert_eq!(ff.get_pin(6), H);

        // Preset and clear together hold the state
        ff.set_pin(4, L);
        assert_eq!(ff.get_pin(5), L);

        // The second bit is independent
        assert_eq!(ff.get_pin(9), L);
        assert_eq!(ff.get_stored(2), L);
    }

    #[test]
    fn power_cycle_keeps_state() {
        let mut ff = DualDFlipFlop::new();
        ff.set_pin(10, L);
        assert_eq!(ff.get_pin(9), H);

        ff.set_power(false);
        assert_eq!(ff.get_pin(9), Z);
        assert_eq!(ff.get_pin(8), Z);
        ff.set_pin(13, L);
        ff.set_pin(10, H);
        assert_eq!(ff.get_stored(2), H);

        ff.set_power(true);
        assert_eq!(ff.get_pin(9), L);
        assert_eq!(ff.get_pin(8), H);
    }

    #[test]
    fn pin_names() {
        let ff = DualDFlipFlop::new();
        assert_eq!(ff.get_pin_name(1), "1CLR");
        assert_eq!(ff.get_pin_name(8), "2QN");
        assert_eq!(ff.get_pin_name(11), "2CLK");
        assert_eq!(ff.get_pin_name(14), "VCC");
        assert_eq!(ff.get_output_pins(), PinMask::from_pins(&[5, 6, 8, 9]));
        assert_eq!(ff.get_input_pins().len(), 8);
        assert!(ff.get_fan_in(5).is_empty());
        assert_eq!(ff.get_propagation_delay(), 15.0);
    }
}
