//! Parser for `corosync-cmapctl -b` output.
//!
//! Expected format, one key per line:
//! ```text
//! totem.token (u32) = 30000
//! totem.transport (str) = knet
//! nodelist.node.0.ring0_addr (str) = 10.0.0.1
//! ```
//!
//! The type hint in parentheses is ignored; values go through
//! `FactValue::infer`. Every dotted segment but the last becomes a map.

use super::ParseError;
use crate::value::{FactValue, FactValueMap};

/// Parse cmapctl output into a map tree.
///
/// Precondition on the command: every non-blank line contains `"= "`.
/// Lines that don't are reported, not skipped.
pub fn parse_cmapctl(output: &str) -> Result<FactValue, ParseError> {
    let mut root = FactValueMap::new();

    for (line_idx, line) in output.lines().enumerate() {
        let line_num = line_idx + 1;

        if line.trim().is_empty() {
            continue;
        }

        let malformed = || ParseError::MalformedLine {
            line_num,
            line: line.to_string(),
        };

        let (lhs, raw_value) = line.split_once("= ").ok_or_else(malformed)?;
        let path = lhs.split_once(" (").map_or(lhs, |(path, _hint)| path).trim();

        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(malformed());
        }

        // split('.') always yields at least one segment
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(malformed());
        };

        let mut cursor = &mut root;
        for key in parents {
            let node = cursor
                .entry(key.to_string())
                .or_insert_with(FactValue::new_map);

            cursor = match node {
                FactValue::Map(map) => map,
                other => {
                    return Err(ParseError::PathConflict {
                        line_num,
                        key: key.to_string(),
                        found: other.type_name(),
                    })
                }
            };
        }

        cursor.insert(leaf.to_string(), FactValue::infer(raw_value.trim_end()));
    }

    Ok(FactValue::Map(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAPCTL_OUTPUT: &str = r#"config.totemconfig_reload_in_progress (u8) = 0
nodelist.local_node_pos (u32) = 0
nodelist.node.0.name (str) = node01
nodelist.node.0.nodeid (u32) = 1
nodelist.node.0.ring0_addr (str) = 10.80.1.11
nodelist.node.1.name (str) = node02
nodelist.node.1.nodeid (u32) = 2
nodelist.node.1.ring0_addr (str) = 10.80.1.12
quorum.expected_votes (u32) = 2
quorum.provider (str) = corosync_votequorum
quorum.two_node (u8) = 1
runtime.config.totem.token (u32) = 30000
runtime.services.cmap.0.rx (u64) = 3
totem.cluster_name (str) = hacluster
totem.consensus (u32) = 36000
totem.secauth (str) = on
totem.token_retransmits_before_loss_const (u32) = 10
"#;

    #[test]
    fn test_parse_simple_tree() {
        let tree = parse_cmapctl("a.b (int) = 1\na.c (int) = 2\n").unwrap();

        let mut a = FactValueMap::new();
        a.insert("b".to_string(), FactValue::Int(1));
        a.insert("c".to_string(), FactValue::Int(2));
        let mut expected = FactValueMap::new();
        expected.insert("a".to_string(), FactValue::Map(a));

        assert_eq!(tree, FactValue::Map(expected));
        assert_eq!(tree.get_path("a.b"), Ok(&FactValue::Int(1)));
        assert_eq!(tree.get_path("a.z").unwrap_err().path, "a.z");
    }

    #[test]
    fn golden_parse_cmapctl() {
        let tree = parse_cmapctl(CMAPCTL_OUTPUT).unwrap();

        assert_eq!(
            tree.get_path("quorum.provider").unwrap().as_str(),
            Some("corosync_votequorum")
        );
        assert_eq!(tree.get_path("quorum.two_node"), Ok(&FactValue::Int(1)));
        assert_eq!(tree.get_path("runtime.config.totem.token"), Ok(&FactValue::Int(30000)));
        assert_eq!(
            tree.get_path("nodelist.node.1.ring0_addr").unwrap().as_str(),
            Some("10.80.1.12")
        );
        assert_eq!(tree.get_path("totem.secauth").unwrap().as_str(), Some("on"));
        assert!(tree.get_path("totem").unwrap().as_map().is_some());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let tree = parse_cmapctl("\n\nx.y (str) = z\n\n").unwrap();
        assert_eq!(tree.get_path("x.y").unwrap().as_str(), Some("z"));
    }

    #[test]
    fn test_empty_output_is_empty_map() {
        assert_eq!(parse_cmapctl("").unwrap(), FactValue::new_map());
    }

    #[test]
    fn test_value_with_spaces_kept_whole() {
        let tree = parse_cmapctl("totem.crypto (str) = aes 256\n").unwrap();
        assert_eq!(tree.get_path("totem.crypto").unwrap().as_str(), Some("aes 256"));
    }

    #[test]
    fn test_last_write_wins() {
        let tree = parse_cmapctl("a.b (u8) = 1\na.b (u8) = 2\n").unwrap();
        assert_eq!(tree.get_path("a.b"), Ok(&FactValue::Int(2)));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let err = parse_cmapctl("a.b (u8) = 1\ngarbage line\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line_num: 2, .. }));
    }

    #[test]
    fn test_empty_segment_is_malformed() {
        let err = parse_cmapctl("a..b (u8) = 1\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line_num: 1, .. }));
    }

    #[test]
    fn test_descending_through_scalar_conflicts() {
        let err = parse_cmapctl("a (u8) = 1\na.b (u8) = 2\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::PathConflict {
                line_num: 2,
                key: "a".to_string(),
                found: "int",
            }
        );
    }
}
