/*!

  The KiCad `.net` netlist dialect.

  Only the `(components ...)` and `(nets ...)` sections are read. Components whose
  value starts with the IC prefix become instances; connector references with the
  input or output prefix give their net a direction.

*/

use super::LoaderOptions;
use super::structured::parse_pin;
use crate::circuit::{GROUND_RAIL, SUPPLY_RAIL};
use crate::error::{Error, Result};
use crate::netlist::{DEFAULT_PACKAGE, NetlistDesc};
use std::path::Path;
use tracing::debug;

/// The module name used when the netlist has no `(design (source ...))`
pub const DEFAULT_MODULE: &str = "kicad_netlist";

/// A parsed S-expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    /// A bare or quoted string
    Atom(String),
    /// A parenthesized list
    List(Vec<SExpr>),
}

impl SExpr {
    /// Parses exactly one expression from `text`
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokenizer = Tokenizer::new(text);
        let Some(first) = tokenizer.next_token()? else {
            return Err(Error::Syntax("empty netlist".to_string()));
        };
        let expr = parse_expr(&mut tokenizer, first)?;
        match tokenizer.next_token()? {
            None => Ok(expr),
            Some(Token::RParen) => Err(Error::Syntax(format!(
                "unbalanced parentheses: unexpected ')' at byte {}",
                tokenizer.pos
            ))),
            Some(_) => Err(Error::Syntax(format!(
                "unexpected content after the netlist at byte {}",
                tokenizer.pos
            ))),
        }
    }

    /// Returns the string of an atom
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }

    /// Returns the leading atom of a list, like `net` for `(net ...)`
    pub fn head(&self) -> Option<&str> {
        match self {
            SExpr::List(items) => items.first().and_then(SExpr::as_atom),
            SExpr::Atom(_) => None,
        }
    }

    /// Returns the elements of a list. An atom has none.
    pub fn items(&self) -> &[SExpr] {
        match self {
            SExpr::List(items) => items,
            SExpr::Atom(_) => &[],
        }
    }

    /// Returns the child lists headed by `key`
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExpr> {
        self.items().iter().filter(move |e| e.head() == Some(key))
    }

    /// Returns the first child list headed by `key`
    pub fn child(&self, key: &str) -> Option<&SExpr> {
        self.items().iter().find(|e| e.head() == Some(key))
    }

    /// Returns `v` for a child `(key v ...)`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.child(key)
            .and_then(|c| c.items().get(1))
            .and_then(SExpr::as_atom)
    }
}

impl std::fmt::Display for SExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::Atom(s) => {
                if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
                    write!(f, "{s:?}")
                } else {
                    write!(f, "{s}")
                }
            }
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Str(String),
}

struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        match self.input[self.pos] {
            b'(' => {
                self.pos += 1;
                Ok(Some(Token::LParen))
            }
            b')' => {
                self.pos += 1;
                Ok(Some(Token::RParen))
            }
            b'"' => {
                let start = self.pos;
                self.pos += 1;
                let mut s = Vec::new();
                loop {
                    match self.input.get(self.pos) {
                        None => {
                            return Err(Error::Syntax(format!(
                                "unterminated string starting at byte {start}"
                            )));
                        }
                        Some(b'"') => {
                            self.pos += 1;
                            break;
                        }
                        Some(b'\\') if self.pos + 1 < self.input.len() => {
                            s.push(self.input[self.pos + 1]);
                            self.pos += 2;
                        }
                        Some(c) => {
                            s.push(*c);
                            self.pos += 1;
                        }
                    }
                }
                Ok(Some(Token::Str(String::from_utf8_lossy(&s).into_owned())))
            }
            _ => {
                let start = self.pos;
                while self.pos < self.input.len() {
                    let c = self.input[self.pos];
                    if c.is_ascii_whitespace() || c == b'(' || c == b')' || c == b'"' {
                        break;
                    }
                    self.pos += 1;
                }
                let s = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                Ok(Some(Token::Str(s)))
            }
        }
    }
}

fn parse_expr(tokenizer: &mut Tokenizer<'_>, first: Token) -> Result<SExpr> {
    match first {
        Token::Str(s) => Ok(SExpr::Atom(s)),
        Token::RParen => Err(Error::Syntax(format!(
            "unbalanced parentheses: unexpected ')' at byte {}",
            tokenizer.pos
        ))),
        Token::LParen => {
            let mut items = Vec::new();
            loop {
                match tokenizer.next_token()? {
                    None => {
                        return Err(Error::Syntax(
                            "unbalanced parentheses: missing ')' at end of input".to_string(),
                        ));
                    }
                    Some(Token::RParen) => return Ok(SExpr::List(items)),
                    Some(t) => items.push(parse_expr(tokenizer, t)?),
                }
            }
        }
    }
}

/// Parses a KiCad netlist
pub fn parse(text: &str, options: &LoaderOptions) -> Result<NetlistDesc> {
    let root = SExpr::parse(text)?;
    let components = root
        .child("components")
        .ok_or(Error::MissingSection("components"))?;
    let nets = root.child("nets").ok_or(Error::MissingSection("nets"))?;

    let module_name = root
        .child("design")
        .and_then(|d| d.value("source"))
        .and_then(|s| Path::new(s).file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_MODULE);
    let mut desc = NetlistDesc::new(module_name.to_string());

    for comp in components.children("comp") {
        let (Some(reference), Some(value)) = (comp.value("ref"), comp.value("value")) else {
            debug!("Skipping component without a reference or value: {comp}");
            continue;
        };
        if !value.starts_with(&options.ic_prefix) {
            debug!("Ignoring {reference} ({value})");
            continue;
        }
        let package = comp
            .value("footprint")
            .map(|f| f.rsplit(':').next().unwrap_or(f))
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_PACKAGE);
        desc.add_instance(reference, value, package);
    }

    for net in nets.children("net") {
        let Some(name) = net.value("name") else {
            debug!("Skipping net without a name: {net}");
            continue;
        };
        desc.declare_signal(name, false, false);
        for node in net.children("node") {
            let Some(reference) = node.value("ref") else {
                continue;
            };
            if reference.starts_with(&options.input_prefix) {
                desc.declare_signal(name, true, false);
            } else if reference.starts_with(&options.output_prefix) {
                desc.declare_signal(name, false, true);
            } else if desc.has_instance(reference) {
                match node.value("pin").and_then(parse_pin) {
                    Some(pin) => {
                        desc.connect(reference, pin, name);
                    }
                    None => debug!("Skipping node {node} on net {name}: bad pin"),
                }
            }
        }
    }

    desc.declare_signal(SUPPLY_RAIL, false, false);
    desc.declare_signal(GROUND_RAIL, false, false);

    Ok(desc)
}
