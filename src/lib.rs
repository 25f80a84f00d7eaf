#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, unreachable_pub)]
/*!

`dipsim`

A functional simulator for circuits built from 74-series logic ICs in DIP-14
packages. A netlist (the translator's JSON export or a KiCad `.net` file) is
loaded into a [netlist::Circuit], test vectors are applied one at a time, and
the circuit is propagated to a fixed point before the expected outputs are
checked.

*/
#![doc = "## Simple Example\n```"]
#![doc = include_str!("../demos/simple.rs")]
#![doc = "\n```"]

pub mod bench;
pub mod circuit;
pub mod component;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loader;
pub mod netlist;
pub mod util;
pub mod vectors;

pub use error::{Error, Result};
