use dipsim::bench::{run_all, run_vector};
use dipsim::circuit::LogicLevel;
use dipsim::engine::SimOptions;
use dipsim::netlist::{Circuit, DEFAULT_PACKAGE, NetlistDesc};
use dipsim::vectors::{TestVector, parse_vectors};
use rstest::rstest;

use LogicLevel::{Floating as Z, High as H, Low as L};

/// Wires one full-adder bit out of a 74HC86, a 74HC08 and a 74HC32.
/// Uses gates 1 and 2 of the XOR and AND packages and gate 1 of the OR package.
fn add_full_adder(desc: &mut NetlistDesc, bit: usize, a: &str, b: &str, cin: &str, sum: &str, cout: &str) {
    let xor = format!("U{}", 3 * bit + 1);
    let and = format!("U{}", 3 * bit + 2);
    let or = format!("U{}", 3 * bit + 3);
    let x = format!("x_{bit}");
    let g = format!("g_{bit}");
    let p = format!("p_{bit}");

    desc.add_instance(&xor, "74HC86", DEFAULT_PACKAGE);
    desc.add_instance(&and, "74HC08", DEFAULT_PACKAGE);
    desc.add_instance(&or, "74HC32", DEFAULT_PACKAGE);
    for u in [&xor, &and, &or] {
        desc.connect(u, 7, "GND");
        desc.connect(u, 14, "VCC");
    }

    desc.connect(&xor, 1, a);
    desc.connect(&xor, 2, b);
    desc.connect(&xor, 3, &x);
    desc.connect(&xor, 4, &x);
    desc.connect(&xor, 5, cin);
    desc.connect(&xor, 6, sum);

    desc.connect(&and, 1, a);
    desc.connect(&and, 2, b);
    desc.connect(&and, 3, &g);
    desc.connect(&and, 4, &x);
    desc.connect(&and, 5, cin);
    desc.connect(&and, 6, &p);

    desc.connect(&or, 1, &g);
    desc.connect(&or, 2, &p);
    desc.connect(&or, 3, cout);
}

fn full_adder() -> Circuit {
    let mut desc = NetlistDesc::new("full_adder".to_string());
    for port in ["a", "b", "cin"] {
        desc.declare_signal(port, true, false);
    }
    desc.declare_signal("sum", false, true);
    desc.declare_signal("cout", false, true);
    add_full_adder(&mut desc, 0, "a", "b", "cin", "sum", "cout");
    Circuit::from_desc(desc).unwrap()
}

fn ripple_adder(bits: usize) -> Circuit {
    let mut desc = NetlistDesc::new("ripple_adder".to_string());
    for i in 0..bits {
        desc.declare_signal(&format!("a_{i}"), true, false);
        desc.declare_signal(&format!("b_{i}"), true, false);
    }
    desc.declare_signal("cin", true, false);
    for i in 0..bits {
        desc.declare_signal(&format!("sum_{i}"), false, true);
    }
    desc.declare_signal("cout", false, true);

    for i in 0..bits {
        let carry_in = if i == 0 { "cin".to_string() } else { format!("c_{i}") };
        let carry_out = if i + 1 == bits {
            "cout".to_string()
        } else {
            format!("c_{}", i + 1)
        };
        add_full_adder(
            &mut desc,
            i,
            &format!("a_{i}"),
            &format!("b_{i}"),
            &carry_in,
            &format!("sum_{i}"),
            &carry_out,
        );
    }
    Circuit::from_desc(desc).unwrap()
}

fn adder_vector(bits: usize, a: usize, b: usize, cin: bool) -> TestVector {
    let total = a + b + cin as usize;
    let mut v = TestVector::new(format!("{a} + {b} + {}", cin as u8));
    for i in 0..bits {
        v.add_input(format!("a_{i}"), LogicLevel::from_bool(a >> i & 1 == 1));
        v.add_input(format!("b_{i}"), LogicLevel::from_bool(b >> i & 1 == 1));
    }
    v.add_input("cin".to_string(), cin.into());
    for i in 0..bits {
        v.add_expected_output(format!("sum_{i}"), LogicLevel::from_bool(total >> i & 1 == 1));
    }
    v.add_expected_output("cout".to_string(), LogicLevel::from_bool(total >> bits & 1 == 1));
    v
}

#[rstest]
#[case(L, L, L, L, L)]
#[case(H, L, L, H, L)]
#[case(L, H, L, H, L)]
#[case(H, H, L, L, H)]
#[case(L, L, H, H, L)]
#[case(H, L, H, L, H)]
#[case(L, H, H, L, H)]
#[case(H, H, H, H, H)]
fn full_adder_truth_table(
    #[case] a: LogicLevel,
    #[case] b: LogicLevel,
    #[case] cin: LogicLevel,
    #[case] sum: LogicLevel,
    #[case] cout: LogicLevel,
) {
    let mut circuit = full_adder();
    circuit.reset();
    assert!(circuit.set_signal_level("a", a));
    assert!(circuit.set_signal_level("b", b));
    assert!(circuit.set_signal_level("cin", cin));
    let propagation = circuit.drive_and_propagate();
    assert!(propagation.settled);
    assert_eq!(circuit.get_signal_level("sum"), sum);
    assert_eq!(circuit.get_signal_level("cout"), cout);
}

#[test]
fn unset_inputs_float_through() {
    let mut circuit = full_adder();
    circuit.reset();
    circuit.set_signal_level("a", H);
    circuit.set_signal_level("b", H);
    assert!(circuit.drive_and_propagate().settled);
    assert_eq!(circuit.get_signal_level("x_0"), L);
    assert_eq!(circuit.get_signal_level("g_0"), H);
    assert_eq!(circuit.get_signal_level("sum"), Z);
    assert_eq!(circuit.get_signal_level("cout"), Z);
}

#[test]
fn ripple_adder_wraps() {
    let mut circuit = ripple_adder(4);
    assert_eq!(circuit.num_instances(), 12);
    let report = run_vector(&mut circuit, &adder_vector(4, 15, 1, false));
    assert!(report.passed(), "{report}");
    assert!(report.propagation.settled);
    for i in 0..4 {
        assert_eq!(circuit.get_signal_level(&format!("sum_{i}")), L);
    }
    assert_eq!(circuit.get_signal_level("cout"), H);
}

#[test]
fn ripple_adder_sums() {
    let mut circuit = ripple_adder(4);
    let vectors: Vec<TestVector> = [(0, 0, false), (3, 5, false), (7, 8, true), (9, 9, true), (15, 15, true)]
        .into_iter()
        .map(|(a, b, cin)| adder_vector(4, a, b, cin))
        .collect();
    let report = run_all(&mut circuit, &vectors);
    assert!(report.passed(), "{report}");
    assert_eq!(report.num_passed(), 5);
}

#[test]
fn round_cap_limits_long_chains() {
    let mut circuit = ripple_adder(4);
    circuit.set_options(SimOptions { max_rounds: 1 });
    let report = run_vector(&mut circuit, &adder_vector(4, 15, 1, false));
    assert!(!report.propagation.settled);
    assert_eq!(report.propagation.rounds, 1);
    assert!(!report.passed());
}

#[test]
fn rerunning_a_vector_is_idempotent() {
    let mut circuit = full_adder();
    let mut v = TestVector::new("a=1 b=0 cin=1".to_string());
    v.add_input("a".to_string(), H);
    v.add_input("b".to_string(), L);
    v.add_input("cin".to_string(), H);
    v.add_expected_output("sum".to_string(), L);
    v.add_expected_output("cout".to_string(), H);

    let first = run_vector(&mut circuit, &v);
    let levels = circuit.get_signal_map().levels();
    let second = run_vector(&mut circuit, &v);
    assert_eq!(first, second);
    assert_eq!(circuit.get_signal_map().levels(), levels);
    assert!(first.passed());
}

#[test]
fn reset_floats_everything_but_the_rails() {
    let mut circuit = full_adder();
    circuit.reset();
    for s in circuit.signals() {
        match s.get_name() {
            "VCC" => assert_eq!(s.get_level(), H),
            "GND" => assert_eq!(s.get_level(), L),
            _ => assert_eq!(s.get_level(), Z, "{s}"),
        }
    }
}

fn d_register() -> Circuit {
    let mut desc = NetlistDesc::new("register".to_string());
    desc.declare_signal("d_in", true, false);
    desc.declare_signal("clk_in", true, false);
    desc.declare_signal("q_out", false, true);
    desc.declare_signal("qn_out", false, true);
    desc.add_instance("U1", "74HC74", DEFAULT_PACKAGE);
    desc.connect("U1", 1, "VCC");
    desc.connect("U1", 2, "d_in");
    desc.connect("U1", 3, "clk_in");
    desc.connect("U1", 4, "VCC");
    desc.connect("U1", 5, "q_out");
    desc.connect("U1", 6, "qn_out");
    desc.connect("U1", 7, "GND");
    desc.connect("U1", 14, "VCC");
    Circuit::from_desc(desc).unwrap()
}

#[test]
fn flip_flop_state_spans_vectors() {
    let mut circuit = d_register();
    let text = "
        [load 1, clock low]
        d_in = 1
        clk_in = 0
        q_out = 0
        qn_out = 1

        [rising edge]
        d_in = 1
        clk_in = 1
        q_out = 1
        qn_out = 0

        [data changes, clock held]
        d_in = 0
        clk_in = 1
        q_out = 1

        [clock falls]
        d_in = 0
        clk_in = 0
        q_out = 1

        [rising edge again]
        d_in = 0
        clk_in = 1
        q_out = 0
        qn_out = 1
    ";
    let vectors = parse_vectors(text, circuit.get_signal_map());
    assert_eq!(vectors.len(), 5);
    let report = run_all(&mut circuit, &vectors);
    assert!(report.passed(), "{report}");
}
