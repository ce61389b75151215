//! Source text parsers.
//!
//! Each parser turns the raw output of one kind of source into a
//! `FactValue` tree.
//!
//! # Supported formats
//!
//! - `corosync-cmapctl -b`: one `dotted.key (type) = value` per line → `cmapctl::parse_cmapctl`
//! - `corosync.conf`: nested `name { ... }` sections with `key: value` pairs → `sections::parse_sections`
//!
//! # Errors
//!
//! Parsers distinguish between input that cannot be turned into a tree at
//! all (`Err(ParseError)`) and input that produced a usable but possibly
//! incomplete tree (`Parsed` with a `diagnostic`).

pub mod cmapctl;
pub mod sections;

pub use cmapctl::parse_cmapctl;
pub use sections::{parse_sections, SectionRules, MAX_SECTION_DEPTH};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line does not have the expected shape
    #[error("malformed line {line_num}: {line:?}")]
    MalformedLine { line_num: usize, line: String },

    /// A path needs to descend through a key that already holds a scalar
    #[error("line {line_num}: key {key:?} already holds a {found} value")]
    PathConflict {
        line_num: usize,
        key: String,
        found: &'static str,
    },

    /// Opened sections were never closed, or a close had no open section
    #[error("invalid file structure. some section is not closed properly")]
    Unbalanced,

    /// A repeatable section name is already used by a non-list value
    #[error("section {0:?} is repeatable but the key holds a non-list value")]
    NotAList(String),

    #[error("sections nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Best-effort parse result: a tree plus an optional structural diagnostic.
///
/// When `diagnostic` is set, `value` holds everything parsed before the
/// problem. Callers decide whether that is good enough.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub diagnostic: Option<ParseError>,
}

impl<T> Parsed<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(value: T, diagnostic: ParseError) -> Self {
        Self {
            value,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostic.is_none()
    }
}
