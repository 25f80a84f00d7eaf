use dipsim::bench::run_vector;
use dipsim::circuit::LogicLevel;
use dipsim::netlist::{Circuit, DEFAULT_PACKAGE, NetlistDesc};
use dipsim::vectors::TestVector;

fn main() {
    let mut desc = NetlistDesc::new("half_adder".to_string());

    // Add the two inputs and the two outputs
    desc.declare_signal("a", true, false);
    desc.declare_signal("b", true, false);
    desc.declare_signal("sum", false, true);
    desc.declare_signal("cout", false, true);

    // One XOR gate and one AND gate
    desc.add_instance("U1", "74HC86", DEFAULT_PACKAGE);
    for (pin, signal) in [(1, "a"), (2, "b"), (3, "sum"), (7, "GND"), (14, "VCC")] {
        desc.connect("U1", pin, signal);
    }
    desc.add_instance("U2", "74HC08", DEFAULT_PACKAGE);
    for (pin, signal) in [(1, "a"), (2, "b"), (3, "cout"), (7, "GND"), (14, "VCC")] {
        desc.connect("U2", pin, signal);
    }

    let mut circuit = Circuit::from_desc(desc).unwrap();
    println!("{circuit}");

    let mut vector = TestVector::new("1 + 1".to_string());
    vector.add_input("a".to_string(), LogicLevel::High);
    vector.add_input("b".to_string(), LogicLevel::High);
    vector.add_expected_output("sum".to_string(), LogicLevel::Low);
    vector.add_expected_output("cout".to_string(), LogicLevel::High);

    let report = run_vector(&mut circuit, &vector);
    print!("{report}");
    assert!(report.passed());
}
