//! Parser for brace-delimited section files such as `corosync.conf`.
//!
//! ```text
//! totem {
//!     version: 2
//!     interface {
//!         linknumber: 0
//!     }
//! }
//! nodelist {
//!     node {
//!         ring0_addr: 10.80.1.11
//!     }
//!     node {
//!         ring0_addr: 10.80.1.12
//!     }
//! }
//! ```
//!
//! Sections become maps. Sections listed as repeatable in `SectionRules`
//! collect every occurrence into a list, others keep the last occurrence.
//!
//! Each section body is parsed by a recursive call that starts right after
//! the opening line. The caller keeps scanning the same lines with its own
//! nesting counter so it skips what the child already consumed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{ParseError, Parsed};
use crate::value::{FactValue, FactValueMap};

/// Nesting bound. Deeper input is rejected rather than recursed into.
pub const MAX_SECTION_DEPTH: usize = 64;

static SECTION_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*\{").unwrap());
static SECTION_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\}").unwrap());
static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*:\s*(\S+)").unwrap());

/// Which section names may appear more than once in the same scope.
#[derive(Debug, Clone, Default)]
pub struct SectionRules {
    repeatable: HashSet<String>,
}

impl SectionRules {
    pub fn new<I, S>(repeatable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repeatable: repeatable.into_iter().map(Into::into).collect(),
        }
    }

    /// `interface` (under `totem`) and `node` (under `nodelist`).
    pub fn corosync() -> Self {
        Self::new(["interface", "node"])
    }

    pub fn is_repeatable(&self, section: &str) -> bool {
        self.repeatable.contains(section)
    }
}

enum Line<'a> {
    Open(&'a str),
    Close,
    KeyValue(&'a str, &'a str),
    Other,
}

fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = SECTION_START.captures(line) {
        if let Some(name) = caps.get(1) {
            return Line::Open(name.as_str());
        }
    }

    if SECTION_END.is_match(line) {
        return Line::Close;
    }

    if let Some(caps) = KEY_VALUE.captures(line) {
        if let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) {
            return Line::KeyValue(key.as_str(), value.as_str());
        }
    }

    Line::Other
}

/// How a frame stopped scanning.
enum FrameEnd {
    /// Hit a close brace with nothing open in this frame
    Closed,
    /// Ran out of lines with `open` sections still unclosed
    Exhausted { open: usize },
}

/// Parse section text into a map tree.
///
/// `Err` means no tree could be built. `Ok` with a diagnostic means the
/// structure is unbalanced and `value` holds everything parsed up to that
/// point.
pub fn parse_sections(text: &str, rules: &SectionRules) -> Result<Parsed<FactValue>, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let (map, end) = parse_frame(&lines, 0, rules)?;
    let value = FactValue::Map(map);

    match end {
        FrameEnd::Exhausted { open: 0 } => Ok(Parsed::clean(value)),
        // Unclosed sections. A close brace at the outermost scope is treated
        // the same way: parsing stops there, later lines are dropped and the
        // tree is reported as partial rather than silently truncated.
        FrameEnd::Exhausted { .. } | FrameEnd::Closed => {
            Ok(Parsed::with_diagnostic(value, ParseError::Unbalanced))
        }
    }
}

fn parse_frame(
    lines: &[&str],
    depth: usize,
    rules: &SectionRules,
) -> Result<(FactValueMap, FrameEnd), ParseError> {
    let mut map = FactValueMap::new();
    let mut sections: usize = 0;

    for (index, line) in lines.iter().enumerate() {
        match classify(line) {
            Line::Open(name) => {
                if sections == 0 {
                    if depth + 1 > MAX_SECTION_DEPTH {
                        return Err(ParseError::TooDeep(MAX_SECTION_DEPTH));
                    }

                    // The child's own end state is ignored: an unclosed child
                    // leaves this frame's counter above zero as well.
                    let (children, _) = parse_frame(&lines[index + 1..], depth + 1, rules)?;
                    insert_section(&mut map, name, children, rules)?;
                }
                sections += 1;
            }
            Line::Close => {
                if sections == 0 {
                    return Ok((map, FrameEnd::Closed));
                }
                sections -= 1;
            }
            Line::KeyValue(key, value) if sections == 0 => {
                map.insert(key.to_string(), FactValue::infer(value));
            }
            Line::KeyValue(..) | Line::Other => {}
        }
    }

    Ok((map, FrameEnd::Exhausted { open: sections }))
}

fn insert_section(
    map: &mut FactValueMap,
    name: &str,
    children: FactValueMap,
    rules: &SectionRules,
) -> Result<(), ParseError> {
    if !rules.is_repeatable(name) {
        map.insert(name.to_string(), FactValue::Map(children));
        return Ok(());
    }

    match map
        .entry(name.to_string())
        .or_insert_with(|| FactValue::List(Vec::new()))
    {
        FactValue::List(items) => {
            items.push(FactValue::Map(children));
            Ok(())
        }
        _ => Err(ParseError::NotAList(name.to_string())),
    }
}
