use dipsim::Error;
use dipsim::circuit::LogicLevel;
use dipsim::graph::{FanOutTable, SimpleCombDepth};
use dipsim::netlist::{Circuit, DEFAULT_PACKAGE, NetlistDesc};

fn half_adder() -> Circuit {
    let mut desc = NetlistDesc::new("half_adder".to_string());
    desc.declare_signal("a", true, false);
    desc.declare_signal("b", true, false);
    desc.declare_signal("sum", false, true);
    desc.declare_signal("cout", false, true);
    desc.add_instance("U1", "74HC86", DEFAULT_PACKAGE);
    desc.add_instance("U2", "74HC08", DEFAULT_PACKAGE);
    for u in ["U1", "U2"] {
        desc.connect(u, 1, "a");
        desc.connect(u, 2, "b");
    }
    desc.connect("U1", 3, "sum");
    desc.connect("U2", 3, "cout");
    Circuit::from_desc(desc).unwrap()
}

// PRE and CLR tied high, Q̅ looped back into D
fn register_with_feedback() -> Circuit {
    let mut desc = NetlistDesc::new("toggle".to_string());
    desc.declare_signal("clk_in", true, false);
    desc.declare_signal("q_out", false, true);
    desc.add_instance("U1", "74HC74", DEFAULT_PACKAGE);
    desc.connect("U1", 1, "VCC");
    desc.connect("U1", 2, "qn");
    desc.connect("U1", 3, "clk_in");
    desc.connect("U1", 4, "VCC");
    desc.connect("U1", 5, "q_out");
    desc.connect("U1", 6, "qn");
    Circuit::from_desc(desc).unwrap()
}

// An inverter driving its own input
fn ring() -> Circuit {
    let mut desc = NetlistDesc::new("ring".to_string());
    desc.add_instance("U1", "74HC04", DEFAULT_PACKAGE);
    desc.connect("U1", 1, "n");
    desc.connect("U1", 2, "n");
    Circuit::from_desc(desc).unwrap()
}

#[test]
fn half_adder_depth() {
    let circuit = half_adder();
    let depth = circuit.get_analysis::<SimpleCombDepth>().unwrap();
    assert_eq!(depth.get_pin_depth("U1", 3), Some(1));
    assert_eq!(depth.get_pin_depth("U2", 3), Some(1));
    assert_eq!(depth.get_comb_depth("U1"), Some(1));
    assert_eq!(depth.get_comb_depth("U9"), None);
    assert_eq!(depth.get_max_depth(), 1);
}

#[test]
fn registers_break_feedback() {
    let circuit = register_with_feedback();
    let depth = circuit.get_analysis::<SimpleCombDepth>().unwrap();
    assert_eq!(depth.get_pin_depth("U1", 5), Some(0));
    assert_eq!(depth.get_pin_depth("U1", 6), Some(0));
    assert_eq!(depth.get_max_depth(), 0);
}

#[test]
fn combinational_loop() {
    let circuit = ring();
    let err = circuit.get_analysis::<SimpleCombDepth>().unwrap_err();
    assert!(matches!(err, Error::Cycle(_)));
    assert!(err.to_string().starts_with("Cycle detected through U1 pin"));
}

#[test]
fn ring_never_settles() {
    let mut circuit = ring();
    circuit.reset();
    circuit.set_signal_level("n", LogicLevel::High);
    let propagation = circuit.drive_and_propagate();
    assert!(!propagation.settled);
    assert_eq!(propagation.rounds, 8);
}

#[test]
fn fan_out() {
    let circuit = half_adder();
    let table = circuit.get_analysis::<FanOutTable>().unwrap();
    let users: Vec<&str> = table
        .get_signal_users("a")
        .iter()
        .map(|i| i.get_instance_id())
        .collect();
    assert_eq!(users, vec!["U1", "U2"]);
    assert!(table.get_signal_drivers("a").is_empty());
    assert!(table.signal_has_uses("sum"));
    assert!(!table.signal_has_uses("nothing"));
    assert!(table.multiply_driven().is_empty());
}

#[test]
fn shorted_outputs() {
    let mut desc = NetlistDesc::new("short".to_string());
    desc.declare_signal("a", true, false);
    desc.declare_signal("y", false, true);
    desc.add_instance("U1", "74HC04", DEFAULT_PACKAGE);
    desc.connect("U1", 1, "a");
    desc.connect("U1", 2, "y");
    desc.connect("U1", 3, "a");
    desc.connect("U1", 4, "y");
    let circuit = Circuit::from_desc(desc).unwrap();
    let table = circuit.get_analysis::<FanOutTable>().unwrap();
    assert_eq!(table.multiply_driven(), vec!["y"]);
    let drivers = table.get_signal_drivers("y");
    assert_eq!(drivers.len(), 1);
}

#[cfg(feature = "graph")]
#[test]
fn petgraph() {
    use dipsim::graph::MultiDiGraph;
    let circuit = half_adder();
    let analysis = circuit.get_analysis::<MultiDiGraph>().unwrap();
    let graph = analysis.get_graph();
    // Two instances, two input and two output pseudo-nodes
    assert_eq!(graph.node_count(), 6);
    assert_eq!(graph.edge_count(), 6);
}
