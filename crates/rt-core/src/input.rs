//! Operator input decoding.
//!
//! Raw terminal input is decoded into a sum type exactly once, at the
//! boundary. Control tokens are checked before numeric parsing so `0`
//! (back) and `q` never reach the catalog as indices.

use rt_common::HostAddr;
use std::collections::BTreeSet;

/// Control tokens distinct from selection indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    /// Leave the console.
    Quit,
    /// One menu level up.
    Back,
    /// Abort the current prompt (target selection, confirmation).
    Cancel,
    /// Target every currently privileged host.
    All,
}

/// One decoded line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    /// A 1-based menu selection.
    Numeric(usize),
    /// A control token.
    Control(ControlToken),
    /// Anything else; the caller reports and re-prompts.
    Invalid,
}

/// Decode one line of menu input.
pub fn decode(raw: &str) -> OperatorInput {
    let token = raw.trim();
    match token.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => return OperatorInput::Control(ControlToken::Quit),
        "0" | "b" | "back" => return OperatorInput::Control(ControlToken::Back),
        "c" | "cancel" => return OperatorInput::Control(ControlToken::Cancel),
        "all" => return OperatorInput::Control(ControlToken::All),
        _ => {}
    }

    match token.parse::<usize>() {
        Ok(n) if n >= 1 => OperatorInput::Numeric(n),
        _ => OperatorInput::Invalid,
    }
}

/// A parsed target expression for a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetExpr {
    /// Snapshot of the privileged set at selection time.
    All,
    /// Explicit host tokens, in the order given, duplicates removed.
    Hosts(Vec<HostAddr>),
    /// Operator backed out of the prompt.
    Cancel,
    /// Nothing parseable; the caller re-prompts.
    Empty,
}

/// Parse a target expression: `all`, a control token, or a
/// comma/space/semicolon-delimited host list.
pub fn parse_target_expr(raw: &str) -> TargetExpr {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "all" => return TargetExpr::All,
        "" => return TargetExpr::Empty,
        "c" | "cancel" | "q" | "quit" | "0" | "back" => return TargetExpr::Cancel,
        _ => {}
    }

    let mut seen = BTreeSet::new();
    let mut hosts = Vec::new();
    for token in trimmed.split([',', ';', ' ', '\t']) {
        if let Some(host) = HostAddr::parse(token) {
            if seen.insert(host.clone()) {
                hosts.push(host);
            }
        }
    }

    if hosts.is_empty() {
        TargetExpr::Empty
    } else {
        TargetExpr::Hosts(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_control_tokens_before_numeric() {
        assert_eq!(decode("q"), OperatorInput::Control(ControlToken::Quit));
        assert_eq!(decode(" QUIT "), OperatorInput::Control(ControlToken::Quit));
        assert_eq!(decode("0"), OperatorInput::Control(ControlToken::Back));
        assert_eq!(decode("all"), OperatorInput::Control(ControlToken::All));
        assert_eq!(decode("cancel"), OperatorInput::Control(ControlToken::Cancel));
    }

    #[test]
    fn test_numeric_selection() {
        assert_eq!(decode("1"), OperatorInput::Numeric(1));
        assert_eq!(decode(" 12 "), OperatorInput::Numeric(12));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(decode("banana"), OperatorInput::Invalid);
        assert_eq!(decode("-3"), OperatorInput::Invalid);
        assert_eq!(decode("1.5"), OperatorInput::Invalid);
        assert_eq!(decode(""), OperatorInput::Invalid);
    }

    #[test]
    fn test_target_expr_all() {
        assert_eq!(parse_target_expr(" all "), TargetExpr::All);
        assert_eq!(parse_target_expr("ALL"), TargetExpr::All);
    }

    #[test]
    fn test_target_expr_mixed_delimiters() {
        let expr = parse_target_expr("10.0.0.5, 10.0.0.6;10.0.0.7 10.0.0.8");
        match expr {
            TargetExpr::Hosts(hosts) => {
                let strs: Vec<&str> = hosts.iter().map(|h| h.as_str()).collect();
                assert_eq!(strs, vec!["10.0.0.5", "10.0.0.6", "10.0.0.7", "10.0.0.8"]);
            }
            other => panic!("expected host list, got {other:?}"),
        }
    }

    #[test]
    fn test_target_expr_duplicates_collapse_order_kept() {
        let expr = parse_target_expr("10.0.0.6,10.0.0.5,10.0.0.6");
        match expr {
            TargetExpr::Hosts(hosts) => {
                let strs: Vec<&str> = hosts.iter().map(|h| h.as_str()).collect();
                assert_eq!(strs, vec!["10.0.0.6", "10.0.0.5"]);
            }
            other => panic!("expected host list, got {other:?}"),
        }
    }

    #[test]
    fn test_target_expr_cancel_and_empty() {
        assert_eq!(parse_target_expr("cancel"), TargetExpr::Cancel);
        assert_eq!(parse_target_expr("   "), TargetExpr::Empty);
        assert_eq!(parse_target_expr(",,;"), TargetExpr::Empty);
    }

    proptest! {
        /// Decoding never panics and `all` never parses as a host list.
        #[test]
        fn prop_decode_total(raw in ".{0,64}") {
            let _ = decode(&raw);
            let _ = parse_target_expr(&raw);
        }

        /// Any parsed host list is deduplicated.
        #[test]
        fn prop_hosts_unique(raw in "[0-9a-z., ;]{0,64}") {
            if let TargetExpr::Hosts(hosts) = parse_target_expr(&raw) {
                let set: std::collections::BTreeSet<_> = hosts.iter().collect();
                prop_assert_eq!(set.len(), hosts.len());
            }
        }
    }
}
