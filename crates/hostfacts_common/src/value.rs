//! Fact value tree.
//!
//! Every gatherer turns its raw source text into a tree of `FactValue`s.
//! Leaves come from `FactValue::infer`, which picks the narrowest primitive
//! a token can be read as. Requests are answered with `get_path`.
//!
//! # Path syntax
//!
//! - `totem.token`: descend through map keys separated by `.`
//! - `nodelist.node.1.ring0_addr`: an all-digit segment indexes into a list
//!   (repeatable sections are stored as lists)

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Map node of a fact tree. Keys are kept sorted so output is reproducible.
pub type FactValueMap = BTreeMap<String, FactValue>;

/// A gathered value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Absence of data
    None,
    Bool(bool),
    Int(i64),
    /// Only produced when the token is not a bool or an integer
    Float(f64),
    /// Fallback for tokens that match no narrower type
    String(String),
    /// Ordered; used for repeatable sections
    List(Vec<FactValue>),
    Map(FactValueMap),
}

/// Requested path does not resolve in a fact tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("requested field value not found: {path}")]
pub struct PathNotFound {
    /// The full path as requested, not just the failing segment
    pub path: String,
}

impl FactValue {
    /// Classify a raw token: bool, then int, then float, then string.
    ///
    /// Only canonical lexical forms are accepted. `True`, `1e`, `inf` and
    /// `NaN` are strings, and so is a literal that overflows to infinity.
    pub fn infer(token: &str) -> Self {
        match token {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }

        if let Ok(i) = token.parse::<i64>() {
            return Self::Int(i);
        }

        if is_decimal_literal(token) {
            match token.parse::<f64>() {
                Ok(f) if f.is_finite() => return Self::Float(f),
                _ => {}
            }
        }

        Self::String(token.to_string())
    }

    /// Empty map node.
    pub fn new_map() -> Self {
        Self::Map(FactValueMap::new())
    }

    /// Resolve a dotted path against this tree.
    pub fn get_path(&self, path: &str) -> Result<&FactValue, PathNotFound> {
        let mut cursor = self;

        for segment in path.split('.') {
            let next = match cursor {
                Self::Map(map) => map.get(segment),
                Self::List(items) if is_index(segment) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            };

            cursor = next.ok_or_else(|| PathNotFound {
                path: path.to_string(),
            })?;
        }

        Ok(cursor)
    }

    /// Short type label, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&FactValueMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FactValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Digits, sign, decimal point and exponent only, with at least one digit.
fn is_decimal_literal(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
