use anyhow::{Context, Result};
use clap::Parser;
use dipsim::bench::{RunReport, run_vector};
use dipsim::component::ModelRegistry;
use dipsim::engine::{DEFAULT_MAX_ROUNDS, SimOptions};
use dipsim::graph::{FanOutTable, SimpleCombDepth};
use dipsim::loader::{LoaderOptions, load_netlist_with};
use dipsim::netlist::Circuit;
use dipsim::vectors::load_vectors;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Functional simulator for 74-series DIP logic netlists
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
struct Args {
    /// Netlist file: a KiCad `.net` netlist or the translator's JSON export
    netlist: PathBuf,

    /// Test vector file
    vectors: PathBuf,

    /// Maximum propagation rounds per vector
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,

    /// Print every signal level after each vector
    #[arg(long)]
    state: bool,

    /// Only print the overall result
    #[arg(short, long)]
    quiet: bool,

    /// Print the run report as JSON
    #[cfg(feature = "serde")]
    #[arg(long)]
    json: bool,

    /// Log more (repeat for trace output). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn logging_setup(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check_structure(circuit: &Circuit) {
    match circuit.get_analysis::<SimpleCombDepth>() {
        Ok(depth) if depth.get_max_depth() > circuit.get_options().max_rounds => warn!(
            "{} is {} gates deep but propagation stops after {} rounds",
            circuit.get_name(),
            depth.get_max_depth(),
            circuit.get_options().max_rounds
        ),
        Ok(_) => (),
        Err(e) => warn!("{e}: propagation may not settle"),
    }
    if let Ok(fan_out) = circuit.get_analysis::<FanOutTable>() {
        for signal in fan_out.multiply_driven() {
            warn!("{signal} is driven by more than one output");
        }
    }
}

fn load(args: &Args) -> Result<(Circuit, Vec<dipsim::vectors::TestVector>)> {
    let sim = SimOptions {
        max_rounds: args.max_rounds,
    };
    let circuit = load_netlist_with(
        &args.netlist,
        &LoaderOptions::default(),
        &ModelRegistry::standard(),
        sim,
    )
    .with_context(|| format!("could not load netlist `{}`", args.netlist.display()))?;
    let vectors = load_vectors(&args.vectors, circuit.get_signal_map())
        .with_context(|| format!("could not load test vectors `{}`", args.vectors.display()))?;
    Ok((circuit, vectors))
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging_setup(args.verbose);

    let (mut circuit, vectors) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };
    check_structure(&circuit);

    #[cfg(feature = "serde")]
    let json = args.json;
    #[cfg(not(feature = "serde"))]
    let json = false;
    let verbose_output = !args.quiet && !json;

    if verbose_output {
        println!("{circuit}");
    }

    let mut report = RunReport {
        module: circuit.get_name().to_string(),
        vectors: Vec::with_capacity(vectors.len()),
    };
    for (i, vector) in vectors.iter().enumerate() {
        let result = run_vector(&mut circuit, vector);
        if verbose_output {
            println!("--- Test Vector {}: {} ---", i + 1, result.description);
            print!("{result}");
            if args.state {
                println!("State:");
                print!("{}", circuit.state());
            }
            println!();
        }
        report.vectors.push(result);
    }

    #[cfg(feature = "serde")]
    {
        if json {
            match serde_json::to_string_pretty(&report) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(2);
                }
            }
        }
    }

    if !json {
        println!(
            "Overall Result: {} ({}/{} vectors passed)",
            if report.passed() { "PASS" } else { "FAIL" },
            report.num_passed(),
            report.vectors.len()
        );
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
