/*!

  Netlist file loading.

  Two dialects are understood: the structured JSON record written by the Verilog
  translator, and the KiCad `.net` S-expression netlist. Both parse into a
  [NetlistDesc] which is then built into a [Circuit].

*/

use crate::component::ModelRegistry;
use crate::engine::SimOptions;
use crate::error::{Error, Result};
use crate::netlist::{Circuit, NetlistDesc};
use std::path::Path;
use tracing::info;

pub mod kicad;
pub mod structured;

/// The format of a netlist file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The translator's JSON export
    Structured,
    /// A KiCad `.net` S-expression netlist
    KiCad,
}

impl Dialect {
    /// Picks the dialect from the file name: `.net` is KiCad, anything else is structured
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("net") => Dialect::KiCad,
            _ => Dialect::Structured,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Structured => write!(f, "structured"),
            Dialect::KiCad => write!(f, "kicad"),
        }
    }
}

/// Naming conventions of hardware netlists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Components whose value starts with this prefix are logic ICs
    pub ic_prefix: String,
    /// Connector references starting with this prefix mark primary inputs
    pub input_prefix: String,
    /// Connector references starting with this prefix mark primary outputs
    pub output_prefix: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            ic_prefix: "74".to_string(),
            input_prefix: "JIN_".to_string(),
            output_prefix: "JOUT_".to_string(),
        }
    }
}

/// Parses `bytes` in `dialect` into a design description
pub fn parse_desc(bytes: &[u8], dialect: Dialect, options: &LoaderOptions) -> Result<NetlistDesc> {
    match dialect {
        Dialect::Structured => structured::parse(bytes),
        Dialect::KiCad => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::Syntax(format!("netlist is not UTF-8: {e}")))?;
            kicad::parse(text, options)
        }
    }
}

/// Parses `bytes` in `dialect` and builds a circuit with the built-in models
pub fn parse_netlist(bytes: &[u8], dialect: Dialect) -> Result<Circuit> {
    parse_netlist_with(
        bytes,
        dialect,
        &LoaderOptions::default(),
        &ModelRegistry::standard(),
        SimOptions::default(),
    )
}

/// Parses `bytes` in `dialect` and builds a circuit from the models in `registry`
pub fn parse_netlist_with(
    bytes: &[u8],
    dialect: Dialect,
    options: &LoaderOptions,
    registry: &ModelRegistry,
    sim: SimOptions,
) -> Result<Circuit> {
    let desc = parse_desc(bytes, dialect, options)?;
    info!(
        "Parsed {dialect} netlist {}: {} signals, {} instances",
        desc.get_module_name(),
        desc.signals().count(),
        desc.instances().count()
    );
    Circuit::build(desc, registry, sim)
}

/// Reads the netlist at `path`, picking the dialect from its extension
pub fn load_netlist(path: impl AsRef<Path>) -> Result<Circuit> {
    load_netlist_with(
        path,
        &LoaderOptions::default(),
        &ModelRegistry::standard(),
        SimOptions::default(),
    )
}

/// Reads the netlist at `path` and builds it from the models in `registry`
pub fn load_netlist_with(
    path: impl AsRef<Path>,
    options: &LoaderOptions,
    registry: &ModelRegistry,
    sim: SimOptions,
) -> Result<Circuit> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_netlist_with(&bytes, Dialect::from_path(path), options, registry, sim)
}
