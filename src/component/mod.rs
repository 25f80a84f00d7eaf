/*!

  Behavioral models of 74-series logic ICs in DIP-14 packages.

  Every model implements [Component]. A [ModelRegistry] maps part numbers to
  constructors so that a netlist can instantiate models by name.

*/

use crate::circuit::LogicLevel;
use bitvec::{array::BitArray, order::Lsb0};
use std::collections::BTreeMap;

pub mod flipflop;
pub mod gates;

pub use flipflop::DualDFlipFlop;
pub use gates::{Gate, GateArray, GateFunction};

/// A physical pin number, 1-based
pub type Pin = u8;

/// The number of pins on a DIP-14 package
pub const PIN_COUNT: Pin = 14;
/// The ground pin of every supported part
pub const GND_PIN: Pin = 7;
/// The supply pin of every supported part
pub const VCC_PIN: Pin = 14;

/// The capability contract every IC model implements.
pub trait Component: std::fmt::Debug {
    /// Returns the part number of the modeled device, like `74HC08`
    fn get_part_number(&self) -> &str;

    /// Drives `pin` to `level`. Writing an input pin re-evaluates the device before returning.
    ///
    /// # Panics
    ///
    /// Panics if `pin` is not in `1..=14`.
    fn set_pin(&mut self, pin: Pin, level: LogicLevel);

    /// Returns the current level of `pin`
    ///
    /// # Panics
    ///
    /// Panics if `pin` is not in `1..=14`.
    fn get_pin(&self, pin: Pin) -> LogicLevel;

    /// Switches the device on or off. A device that is off floats all of its outputs.
    fn set_power(&mut self, on: bool);

    /// Returns `true` if the device is powered
    fn is_power_on(&self) -> bool;

    /// Returns the typical propagation delay in nanoseconds
    fn get_propagation_delay(&self) -> f64;

    /// Returns the set of pins the device reads
    fn get_input_pins(&self) -> PinMask;

    /// Returns the set of pins the device drives
    fn get_output_pins(&self) -> PinMask;

    /// Returns the datasheet label of `pin`
    fn get_pin_name(&self, pin: Pin) -> String;

    /// Returns `true` if the device drives `pin`
    fn is_output_pin(&self, pin: Pin) -> bool {
        self.get_output_pins().contains(pin)
    }

    /// Returns `true` if the device reads `pin`
    fn is_input_pin(&self, pin: Pin) -> bool {
        self.get_input_pins().contains(pin)
    }

    /// Returns the input pins that output `pin` follows without a clock edge.
    /// Registered outputs have an empty fan-in.
    fn get_fan_in(&self, pin: Pin) -> PinMask {
        if self.is_output_pin(pin) {
            self.get_input_pins()
        } else {
            PinMask::new()
        }
    }
}

/// A set of pin numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinMask {
    bits: BitArray<[u16; 1], Lsb0>,
}

impl PinMask {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from a list of pins
    pub fn from_pins(pins: &[Pin]) -> Self {
        pins.iter().copied().collect()
    }

    /// Adds `pin` to the set
    pub fn insert(&mut self, pin: Pin) {
        check_pin(pin);
        self.bits.set(pin as usize, true);
    }

    /// Returns `true` if the set contains `pin`
    pub fn contains(&self, pin: Pin) -> bool {
        self.bits.get(pin as usize).is_some_and(|b| *b)
    }

    /// Returns the number of pins in the set
    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    /// Returns `true` if the set is empty
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Returns the pins of the set in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Pin> + '_ {
        self.bits.iter_ones().map(|i| i as Pin)
    }
}

impl FromIterator<Pin> for PinMask {
    fn from_iter<T: IntoIterator<Item = Pin>>(iter: T) -> Self {
        let mut mask = PinMask::new();
        for pin in iter {
            mask.insert(pin);
        }
        mask
    }
}

impl std::fmt::Display for PinMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pins: Vec<String> = self.iter().map(|p| p.to_string()).collect();
        write!(f, "{{{}}}", pins.join(", "))
    }
}

fn check_pin(pin: Pin) {
    if !(1..=PIN_COUNT).contains(&pin) {
        panic!("Pin {pin} out of range for a DIP-14 package");
    }
}

/// The level of every pin of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinTable {
    levels: [LogicLevel; PIN_COUNT as usize],
}

impl PinTable {
    /// Creates a table with every pin floating except the power pins
    pub fn new() -> Self {
        let mut table = Self {
            levels: [LogicLevel::Floating; PIN_COUNT as usize],
        };
        table.set(VCC_PIN, LogicLevel::High);
        table.set(GND_PIN, LogicLevel::Low);
        table
    }

    /// Returns the level of `pin`
    pub fn get(&self, pin: Pin) -> LogicLevel {
        check_pin(pin);
        self.levels[pin as usize - 1]
    }

    /// Sets the level of `pin`
    pub fn set(&mut self, pin: Pin, level: LogicLevel) {
        check_pin(pin);
        self.levels[pin as usize - 1] = level;
    }

    /// Returns `(pin, level)` pairs for every pin
    pub fn iter(&self) -> impl Iterator<Item = (Pin, LogicLevel)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, l)| (i as Pin + 1, *l))
    }
}

impl Default for PinTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A constructor of a fresh model
pub type ModelFactory = Box<dyn Fn() -> Box<dyn Component>>;

/// Maps part numbers to model constructors
pub struct ModelRegistry {
    factories: BTreeMap<String, ModelFactory>,
}

impl ModelRegistry {
    /// Creates a registry with no models
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in model
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("74HC00", || Box::new(GateArray::quad_nand_74hc00()));
        registry.register("74HC02", || Box::new(GateArray::quad_nor_74hc02()));
        registry.register("74HC04", || Box::new(GateArray::hex_inverter_74hc04()));
        registry.register("74HC08", || Box::new(GateArray::quad_and_74hc08()));
        registry.register("74HC32", || Box::new(GateArray::quad_or_74hc32()));
        registry.register("74HC86", || Box::new(GateArray::quad_xor_74hc86()));
        registry.register("74HC74", || Box::new(DualDFlipFlop::new()));
        registry
    }

    /// Registers a constructor for `part_number`, replacing any previous one
    pub fn register<F>(&mut self, part_number: &str, factory: F)
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        self.factories
            .insert(part_number.to_string(), Box::new(factory));
    }

    /// Returns `true` if there is a model for `part_number`
    pub fn contains(&self, part_number: &str) -> bool {
        self.factories.contains_key(part_number)
    }

    /// Creates a new model for `part_number`
    pub fn create(&self, part_number: &str) -> Option<Box<dyn Component>> {
        self.factories.get(part_number).map(|f| f())
    }

    /// Returns the registered part numbers in sorted order
    pub fn part_numbers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
