//! Program intake and fact-file merging.
//!
//! The index consumes [`Program`]s: an opaque reference (usually a file
//! path) plus a parsed statement list. [`parse_program`] is the
//! filesystem-independent entry point; [`load_program`] is a convenience
//! for callers that do read files. Walking pack directories, TOML
//! manifests, and schema validation belong to external collaborators.

use std::fs;
use std::path::Path;

use crate::ast::Stmt;
use crate::error::{LoadError, ParseError};
use crate::parser::Parser;

/// One parsed source file, ready for [`crate::index::Index::add_program`].
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Opaque identifier for the source, stamped into every range.
    pub reference: String,
    /// The parsed statements.
    pub statements: Vec<Stmt>,
}

/// Parses one source text into a [`Program`].
pub fn parse_program(source: &str, reference: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source, reference);
    let statements = parser.parse()?;
    Ok(Program {
        reference: reference.to_string(),
        statements,
    })
}

/// Reads and parses one source file; the reference is the path as given.
pub fn load_program(path: impl AsRef<Path>) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let program = parse_program(&source, &path.to_string_lossy())?;
    Ok(program)
}

/// Deep-merges an overlay of facts into a base document.
///
/// Objects merge key-by-key recursively; any other value in the overlay
/// replaces the base outright. This is the contract fact files compose
/// under: later files win, except that nested objects accumulate.
pub fn merge_facts(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_facts(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
