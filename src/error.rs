/*!

  Errors raised while loading and analyzing circuits.

*/

use std::path::PathBuf;
use thiserror::Error;

/// The error type of the crate
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        /// The file that was being read
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// The document is not well-formed in its dialect
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A required top-level section is absent from a hardware netlist
    #[error("Missing section ({0} ...)")]
    MissingSection(&'static str),

    /// Instances whose part number has no model, as `(instance, part)` pairs
    #[error("Unknown part numbers: {}", format_parts(.0))]
    UnknownParts(Vec<(String, String)>),

    /// A combinational feedback loop was found
    #[error("Cycle detected through {0}")]
    Cycle(String),
}

fn format_parts(parts: &[(String, String)]) -> String {
    parts
        .iter()
        .map(|(id, part)| format!("{id} ({part})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The result type of the crate
pub type Result<T> = std::result::Result<T, Error>;
