/*!

  Structural analyses of a [Circuit].

*/

use crate::circuit::SignalId;
use crate::component::Pin;
use crate::error::{Error, Result};
use crate::netlist::{Circuit, ComponentInstance};
#[cfg(feature = "graph")]
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// A common trait of analyses than can be performed on a circuit.
pub trait Analysis<'a>
where
    Self: Sized + 'a,
{
    /// Construct the analysis to the current state of the circuit.
    fn build(circuit: &'a Circuit) -> Result<Self>;
}

/// A table that maps signals to the instances that read and drive them
#[derive(Debug)]
pub struct FanOutTable<'a> {
    circuit: &'a Circuit,
    // Maps a signal to the instances reading it
    users: HashMap<SignalId, Vec<usize>>,
    // Maps a signal to the instances driving it
    drivers: HashMap<SignalId, Vec<usize>>,
}

impl<'a> FanOutTable<'a> {
    fn lookup(&self, map: &HashMap<SignalId, Vec<usize>>, signal: &str) -> Vec<&'a ComponentInstance> {
        let circuit = self.circuit;
        circuit
            .signals
            .find(signal)
            .and_then(|id| map.get(&id))
            .into_iter()
            .flatten()
            .map(|&i| &circuit.instances[i])
            .collect()
    }

    /// Returns the instances that read `signal`
    pub fn get_signal_users(&self, signal: &str) -> Vec<&'a ComponentInstance> {
        self.lookup(&self.users, signal)
    }

    /// Returns the instances that drive `signal`
    pub fn get_signal_drivers(&self, signal: &str) -> Vec<&'a ComponentInstance> {
        self.lookup(&self.drivers, signal)
    }

    /// Returns the instances that read any output of `instance_id`
    pub fn get_instance_users(&self, instance_id: &str) -> Vec<&'a ComponentInstance> {
        let circuit = self.circuit;
        let Some(inst) = circuit.get_instance(instance_id) else {
            return Vec::new();
        };
        let mut users: Vec<usize> = inst
            .reads
            .iter()
            .filter_map(|(_, id)| self.users.get(id))
            .flatten()
            .copied()
            .collect();
        users.sort_unstable();
        users.dedup();
        users.into_iter().map(|i| &circuit.instances[i]).collect()
    }

    /// Returns `true` if `signal` is read by an instance or is a primary output
    pub fn signal_has_uses(&self, signal: &str) -> bool {
        match self.circuit.signals.find(signal) {
            Some(id) => self.users.contains_key(&id) || self.circuit.signals[id].is_output(),
            None => false,
        }
    }

    /// Returns the names of signals driven by more than one output pin
    pub fn multiply_driven(&self) -> Vec<&'a str> {
        let circuit = self.circuit;
        let mut counts: HashMap<SignalId, usize> = HashMap::new();
        for inst in &circuit.instances {
            for (_, id) in &inst.reads {
                *counts.entry(*id).or_default() += 1;
            }
        }
        let mut ids: Vec<SignalId> = counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| circuit.signals[id].get_name())
            .collect()
    }
}

impl<'a> Analysis<'a> for FanOutTable<'a> {
    fn build(circuit: &'a Circuit) -> Result<Self> {
        let mut users: HashMap<SignalId, Vec<usize>> = HashMap::new();
        let mut drivers: HashMap<SignalId, Vec<usize>> = HashMap::new();

        for (i, inst) in circuit.instances.iter().enumerate() {
            for (_, id) in &inst.drives {
                let v = users.entry(*id).or_default();
                if v.last() != Some(&i) {
                    v.push(i);
                }
            }
            for (_, id) in &inst.reads {
                let v = drivers.entry(*id).or_default();
                if v.last() != Some(&i) {
                    v.push(i);
                }
            }
        }

        Ok(FanOutTable {
            circuit,
            users,
            drivers,
        })
    }
}

/// The number of gate levels between the primary inputs and each output pin.
/// Registered outputs start a new level count. Combinational feedback is an error.
#[derive(Debug)]
pub struct SimpleCombDepth<'a> {
    _circuit: &'a Circuit,
    // Maps (instance, output pin) to its depth
    comb_depth: HashMap<(usize, Pin), usize>,
    instance_ids: HashMap<&'a str, usize>,
    max_depth: usize,
}

impl SimpleCombDepth<'_> {
    /// Returns the depth of output `pin` of `instance_id`
    pub fn get_pin_depth(&self, instance_id: &str, pin: Pin) -> Option<usize> {
        let i = self.instance_ids.get(instance_id)?;
        self.comb_depth.get(&(*i, pin)).copied()
    }

    /// Returns the deepest output of `instance_id`
    pub fn get_comb_depth(&self, instance_id: &str) -> Option<usize> {
        let i = *self.instance_ids.get(instance_id)?;
        self.comb_depth
            .iter()
            .filter(|((j, _), _)| *j == i)
            .map(|(_, d)| *d)
            .max()
    }

    /// Returns the maximum depth of the circuit
    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }
}

struct DepthSearch<'a> {
    circuit: &'a Circuit,
    drivers: HashMap<SignalId, Vec<(usize, Pin)>>,
    depth: HashMap<(usize, Pin), usize>,
    on_stack: Vec<(usize, Pin)>,
}

impl DepthSearch<'_> {
    fn visit(&mut self, node: (usize, Pin)) -> Result<usize> {
        if let Some(d) = self.depth.get(&node) {
            return Ok(*d);
        }
        let circuit = self.circuit;
        let (i, pin) = node;
        let inst = &circuit.instances[i];
        if self.on_stack.contains(&node) {
            return Err(Error::Cycle(format!(
                "{} pin {pin}",
                inst.get_instance_id()
            )));
        }

        let fan_in = inst.get_model().get_fan_in(pin);
        if fan_in.is_empty() {
            self.depth.insert(node, 0);
            return Ok(0);
        }

        self.on_stack.push(node);
        let mut deepest = 0;
        for (p, id) in &inst.drives {
            if !fan_in.contains(*p) {
                continue;
            }
            let drivers = self.drivers.get(id).cloned().unwrap_or_default();
            for d in drivers {
                deepest = deepest.max(self.visit(d)?);
            }
        }
        self.on_stack.pop();

        self.depth.insert(node, deepest + 1);
        Ok(deepest + 1)
    }
}

impl<'a> Analysis<'a> for SimpleCombDepth<'a> {
    fn build(circuit: &'a Circuit) -> Result<Self> {
        let mut drivers: HashMap<SignalId, Vec<(usize, Pin)>> = HashMap::new();
        for (i, inst) in circuit.instances.iter().enumerate() {
            for (pin, id) in &inst.reads {
                drivers.entry(*id).or_default().push((i, *pin));
            }
        }

        let mut search = DepthSearch {
            circuit,
            drivers,
            depth: HashMap::new(),
            on_stack: Vec::new(),
        };
        for (i, inst) in circuit.instances.iter().enumerate() {
            for pin in inst.get_model().get_output_pins().iter() {
                search.visit((i, pin))?;
            }
        }

        let comb_depth = search.depth;
        let max_depth = comb_depth.values().max().copied().unwrap_or(0);
        let instance_ids = circuit
            .instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.get_instance_id(), i))
            .collect();

        Ok(SimpleCombDepth {
            _circuit: circuit,
            comb_depth,
            instance_ids,
            max_depth,
        })
    }
}

/// An enum to provide pseudo-nodes for the primary ports of the circuit.
#[cfg(feature = "graph")]
#[derive(Debug, Clone)]
pub enum Node<T: Clone + std::fmt::Debug + std::fmt::Display> {
    /// An IC instance, by reference designator
    Instance(String),
    /// Any other user-programmable node
    Pseudo(T),
}

#[cfg(feature = "graph")]
impl<T> std::fmt::Display for Node<T>
where
    T: Clone + std::fmt::Debug + std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Instance(id) => write!(f, "{id}"),
            Node::Pseudo(t) => std::fmt::Display::fmt(t, f),
        }
    }
}

/// A connection from an output pin to an input pin through a signal
#[cfg(feature = "graph")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The signal name
    pub signal: String,
    /// The driving pin, if the source is an instance
    pub from_pin: Option<Pin>,
    /// The reading pin, if the target is an instance
    pub to_pin: Option<Pin>,
}

#[cfg(feature = "graph")]
impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signal)
    }
}

/// A petgraph representation of the circuit as a directed multi-graph with type [DiGraph<Node, Edge>].
#[cfg(feature = "graph")]
pub struct MultiDiGraph<'a> {
    _circuit: &'a Circuit,
    graph: DiGraph<Node<String>, Edge>,
}

#[cfg(feature = "graph")]
impl MultiDiGraph<'_> {
    /// Return a reference to the graph constructed by this analysis
    pub fn get_graph(&self) -> &DiGraph<Node<String>, Edge> {
        &self.graph
    }
}

#[cfg(feature = "graph")]
impl<'a> Analysis<'a> for MultiDiGraph<'a> {
    fn build(circuit: &'a Circuit) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut sources: HashMap<SignalId, Vec<(petgraph::graph::NodeIndex, Option<Pin>)>> =
            HashMap::new();

        let ids: Vec<_> = circuit
            .instances
            .iter()
            .map(|inst| graph.add_node(Node::Instance(inst.get_instance_id().to_string())))
            .collect();

        for (i, inst) in circuit.instances.iter().enumerate() {
            for (pin, id) in &inst.reads {
                sources.entry(*id).or_default().push((ids[i], Some(*pin)));
            }
        }

        for s in circuit.signals.iter().filter(|s| s.is_input()) {
            let n = graph.add_node(Node::Pseudo(format!("Input({})", s.get_name())));
            if let Some(id) = circuit.signals.find(s.get_name()) {
                sources.entry(id).or_default().push((n, None));
            }
        }

        for (i, inst) in circuit.instances.iter().enumerate() {
            for (pin, id) in &inst.drives {
                for (src, from_pin) in sources.get(id).into_iter().flatten() {
                    graph.add_edge(
                        *src,
                        ids[i],
                        Edge {
                            signal: circuit.signals[*id].get_name().to_string(),
                            from_pin: *from_pin,
                            to_pin: Some(*pin),
                        },
                    );
                }
            }
        }

        // Finally, add the output connections
        for s in circuit.signals.iter().filter(|s| s.is_output()) {
            let Some(id) = circuit.signals.find(s.get_name()) else {
                continue;
            };
            let t = graph.add_node(Node::Pseudo(format!("Output({})", s.get_name())));
            for (src, from_pin) in sources.get(&id).into_iter().flatten() {
                graph.add_edge(
                    *src,
                    t,
                    Edge {
                        signal: s.get_name().to_string(),
                        from_pin: *from_pin,
                        to_pin: None,
                    },
                );
            }
        }

        Ok(Self {
            _circuit: circuit,
            graph,
        })
    }
}
