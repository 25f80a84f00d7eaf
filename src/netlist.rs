/*!

  The netlist of a circuit: IC instances and the signals their pins are wired to.

  Loaders produce a [NetlistDesc], a plain description of the design. [Circuit::build]
  validates it against a [ModelRegistry] and links every pin assignment to a signal.

*/

use crate::circuit::{LogicLevel, Signal, SignalId, SignalMap};
use crate::component::{Component, ModelRegistry, PIN_COUNT, Pin, PinMask};
use crate::engine::SimOptions;
use crate::error::{Error, Result};
use crate::graph::Analysis;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// The package reported for instances that do not name one
pub const DEFAULT_PACKAGE: &str = "DIP-14";

/// An IC instance as declared by a netlist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDesc {
    instance_id: String,
    part_number: String,
    package: String,
    pins: BTreeMap<Pin, String>,
}

impl InstanceDesc {
    /// Returns the reference designator, like `U1`
    pub fn get_instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns the part number, like `74HC08`
    pub fn get_part_number(&self) -> &str {
        &self.part_number
    }

    /// Returns the package name
    pub fn get_package(&self) -> &str {
        &self.package
    }

    /// Returns the pin assignments in pin order
    pub fn pins(&self) -> impl Iterator<Item = (Pin, &str)> {
        self.pins.iter().map(|(p, s)| (*p, s.as_str()))
    }
}

/// A signal as declared by a netlist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDesc {
    /// The net name
    pub name: String,
    /// Declared as a primary input
    pub is_input: bool,
    /// Declared as a primary output
    pub is_output: bool,
}

/// The dialect-independent description of a design
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetlistDesc {
    module_name: String,
    signals: Vec<SignalDesc>,
    instances: Vec<InstanceDesc>,
    signal_index: HashMap<String, usize>,
    instance_index: HashMap<String, usize>,
}

impl NetlistDesc {
    /// Creates an empty design called `module_name`
    pub fn new(module_name: String) -> Self {
        Self {
            module_name,
            ..Default::default()
        }
    }

    /// Returns the name of the design
    pub fn get_module_name(&self) -> &str {
        &self.module_name
    }

    /// Renames the design
    pub fn set_module_name(&mut self, name: String) {
        self.module_name = name;
    }

    /// Declares a signal. Redeclaring a name merges the direction flags.
    pub fn declare_signal(&mut self, name: &str, is_input: bool, is_output: bool) {
        if let Some(&i) = self.signal_index.get(name) {
            self.signals[i].is_input |= is_input;
            self.signals[i].is_output |= is_output;
            return;
        }
        self.signal_index
            .insert(name.to_string(), self.signals.len());
        self.signals.push(SignalDesc {
            name: name.to_string(),
            is_input,
            is_output,
        });
    }

    /// Declares an IC instance. Returns `false` if `instance_id` was already declared,
    /// in which case the first declaration is kept.
    pub fn add_instance(&mut self, instance_id: &str, part_number: &str, package: &str) -> bool {
        if self.instance_index.contains_key(instance_id) {
            debug!("Instance {instance_id} declared twice, keeping the first declaration");
            return false;
        }
        self.instance_index
            .insert(instance_id.to_string(), self.instances.len());
        self.instances.push(InstanceDesc {
            instance_id: instance_id.to_string(),
            part_number: part_number.to_string(),
            package: package.to_string(),
            pins: BTreeMap::new(),
        });
        true
    }

    /// Wires `pin` of `instance_id` to `signal`, declaring the signal if needed.
    /// Returns `false` if there is no such instance or `pin` is not in `1..=14`.
    pub fn connect(&mut self, instance_id: &str, pin: Pin, signal: &str) -> bool {
        if !(1..=PIN_COUNT).contains(&pin) {
            debug!("Ignoring {instance_id} pin {pin}: not a pin of a DIP-14 package");
            return false;
        }
        let Some(&i) = self.instance_index.get(instance_id) else {
            return false;
        };
        self.instances[i].pins.insert(pin, signal.to_string());
        self.declare_signal(signal, false, false);
        true
    }

    /// Returns `true` if `instance_id` is declared
    pub fn has_instance(&self, instance_id: &str) -> bool {
        self.instance_index.contains_key(instance_id)
    }

    /// Returns the instance `instance_id`
    pub fn get_instance(&self, instance_id: &str) -> Option<&InstanceDesc> {
        self.instance_index
            .get(instance_id)
            .map(|&i| &self.instances[i])
    }

    /// Returns the declared signals in declaration order
    pub fn signals(&self) -> impl Iterator<Item = &SignalDesc> {
        self.signals.iter()
    }

    /// Returns the declared instances in declaration order
    pub fn instances(&self) -> impl Iterator<Item = &InstanceDesc> {
        self.instances.iter()
    }
}

/// An IC instance of a built [Circuit], owning its behavioral model
#[derive(Debug)]
pub struct ComponentInstance {
    instance_id: String,
    part_number: String,
    package: String,
    pins: BTreeMap<Pin, String>,
    model: Box<dyn Component>,
    outputs: PinMask,
    /// Non-rail assignments of pins the model reads, in pin order
    pub(crate) drives: Vec<(Pin, SignalId)>,
    /// Non-rail assignments of pins the model drives, in pin order
    pub(crate) reads: Vec<(Pin, SignalId)>,
}

impl ComponentInstance {
    /// Returns the reference designator, like `U1`
    pub fn get_instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns the part number, like `74HC08`
    pub fn get_part_number(&self) -> &str {
        &self.part_number
    }

    /// Returns the package name
    pub fn get_package(&self) -> &str {
        &self.package
    }

    /// Returns the pin assignments in pin order
    pub fn pin_assignments(&self) -> impl Iterator<Item = (Pin, &str)> {
        self.pins.iter().map(|(p, s)| (*p, s.as_str()))
    }

    /// Returns the signal wired to `pin`
    pub fn get_signal_for_pin(&self, pin: Pin) -> Option<&str> {
        self.pins.get(&pin).map(|s| s.as_str())
    }

    /// Returns `true` if the model drives `pin`
    pub fn is_output_pin(&self, pin: Pin) -> bool {
        self.outputs.contains(pin)
    }

    /// Returns the behavioral model
    pub fn get_model(&self) -> &dyn Component {
        self.model.as_ref()
    }

    /// Returns the behavioral model for direct manipulation
    pub fn get_model_mut(&mut self) -> &mut dyn Component {
        self.model.as_mut()
    }

    /// Copies the current level of every wired input into the model
    pub(crate) fn drive(&mut self, signals: &SignalMap) {
        for &(pin, id) in &self.drives {
            self.model.set_pin(pin, signals[id].get_level());
        }
    }

    /// Copies every driven output of the model onto its signal. Floating outputs leave the net untouched.
    pub(crate) fn sample(&self, signals: &mut SignalMap) {
        for &(pin, id) in &self.reads {
            let level = self.model.get_pin(pin);
            if !level.is_floating() {
                signals[id].set_level(level);
            }
        }
    }
}

impl std::fmt::Display for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {} (", self.part_number, self.instance_id)?;
        let indent = " ".repeat(4);
        let n = self.pins.len();
        for (i, (pin, signal)) in self.pins.iter().enumerate() {
            let sep = if i == n - 1 { "" } else { "," };
            let label = self.model.get_pin_name(*pin);
            writeln!(f, "{indent}.{label}({signal}){sep}")?;
        }
        write!(f, "  );")
    }
}

/// A simulatable circuit: the signal registry and every IC instance
#[derive(Debug)]
pub struct Circuit {
    module_name: String,
    pub(crate) signals: SignalMap,
    pub(crate) instances: Vec<ComponentInstance>,
    instance_index: HashMap<String, usize>,
    pub(crate) options: SimOptions,
}

impl Circuit {
    /// Builds a circuit from `desc`, instantiating every model from `registry`.
    /// Fails with [Error::UnknownParts] if any part number has no model.
    pub fn build(desc: NetlistDesc, registry: &ModelRegistry, options: SimOptions) -> Result<Self> {
        let unknown: Vec<(String, String)> = desc
            .instances()
            .filter(|inst| !registry.contains(inst.get_part_number()))
            .map(|inst| {
                (
                    inst.get_instance_id().to_string(),
                    inst.get_part_number().to_string(),
                )
            })
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownParts(unknown));
        }

        let NetlistDesc {
            module_name,
            signals: signal_descs,
            instances: instance_descs,
            ..
        } = desc;

        let mut signals = SignalMap::new();
        for s in &signal_descs {
            signals.declare(&s.name, s.is_input, s.is_output);
        }

        let mut instances = Vec::with_capacity(instance_descs.len());
        let mut instance_index = HashMap::new();
        for inst in instance_descs {
            let Some(model) = registry.create(&inst.part_number) else {
                return Err(Error::UnknownParts(vec![(
                    inst.instance_id,
                    inst.part_number,
                )]));
            };
            let outputs = model.get_output_pins();
            let mut drives = Vec::new();
            let mut reads = Vec::new();
            for (pin, name) in &inst.pins {
                let id = signals.declare(name, false, false);
                if signals[id].is_rail() {
                    continue;
                }
                if outputs.contains(*pin) {
                    reads.push((*pin, id));
                } else {
                    drives.push((*pin, id));
                }
            }
            debug!(
                "Linked {} ({}): {} driven pins, {} sampled pins",
                inst.instance_id,
                inst.part_number,
                drives.len(),
                reads.len()
            );
            instance_index.insert(inst.instance_id.clone(), instances.len());
            instances.push(ComponentInstance {
                instance_id: inst.instance_id,
                part_number: inst.part_number,
                package: inst.package,
                pins: inst.pins,
                model,
                outputs,
                drives,
                reads,
            });
        }

        info!(
            "Built circuit {module_name}: {} signals, {} instances",
            signals.len(),
            instances.len()
        );

        Ok(Self {
            module_name,
            signals,
            instances,
            instance_index,
            options,
        })
    }

    /// Builds a circuit with the built-in models and default options
    pub fn from_desc(desc: NetlistDesc) -> Result<Self> {
        Self::build(desc, &ModelRegistry::standard(), SimOptions::default())
    }

    /// Returns the name of the design
    pub fn get_name(&self) -> &str {
        &self.module_name
    }

    /// Returns the simulation options
    pub fn get_options(&self) -> &SimOptions {
        &self.options
    }

    /// Replaces the simulation options
    pub fn set_options(&mut self, options: SimOptions) {
        self.options = options;
    }

    /// Returns the signal named `name`
    pub fn get_signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    /// Returns the signals in declaration order
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// Returns the signal registry
    pub fn get_signal_map(&self) -> &SignalMap {
        &self.signals
    }

    /// Returns the declared primary inputs
    pub fn inputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_input())
    }

    /// Returns the declared primary outputs
    pub fn outputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_output())
    }

    /// Returns the instances in declaration order
    pub fn instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.instances.iter()
    }

    /// Returns the instance `instance_id`
    pub fn get_instance(&self, instance_id: &str) -> Option<&ComponentInstance> {
        self.instance_index
            .get(instance_id)
            .map(|&i| &self.instances[i])
    }

    /// Returns the instance `instance_id` for direct manipulation of its model
    pub fn get_instance_mut(&mut self, instance_id: &str) -> Option<&mut ComponentInstance> {
        self.instance_index
            .get(instance_id)
            .map(|&i| &mut self.instances[i])
    }

    /// Returns the number of instances
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if `signal` is declared in the circuit
    pub fn has_signal(&self, signal: &str) -> bool {
        self.signals.find(signal).is_some()
    }

    /// Returns the level of `signal`, or [LogicLevel::Floating] if there is no such signal
    pub fn get_signal_level(&self, signal: &str) -> LogicLevel {
        self.signals.level_of(signal)
    }

    /// Runs an analysis on the circuit
    pub fn get_analysis<'a, A: Analysis<'a>>(&'a self) -> Result<A> {
        A::build(self)
    }
}

impl std::fmt::Display for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "module {} (", self.module_name)?;

        let indent = " ".repeat(2);
        let ports: Vec<&Signal> = self
            .signals
            .iter()
            .filter(|s| !s.is_internal())
            .collect();
        for (i, port) in ports.iter().enumerate() {
            let sep = if i == ports.len() - 1 { "" } else { "," };
            writeln!(f, "{indent}{}{sep}", port.get_name())?;
        }
        writeln!(f, ");")?;

        for s in self.signals.iter() {
            match s.direction() {
                "internal" => writeln!(f, "{indent}wire {};", s.get_name())?,
                dir => writeln!(f, "{indent}{dir} {};", s.get_name())?,
            }
        }

        for inst in &self.instances {
            writeln!(f, "{indent}{inst}")?;
        }

        writeln!(f, "endmodule")
    }
}
