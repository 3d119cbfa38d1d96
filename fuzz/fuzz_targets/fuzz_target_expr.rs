//! Fuzz target for target-list expression parsing.
//!
//! Tests that host list parsing (comma/space/semicolon separated, 'all',
//! 'cancel') handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rt_core::input::{parse_target_expr, TargetExpr};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        match parse_target_expr(line) {
            // A parsed host list never contains duplicates or empty tokens
            TargetExpr::Hosts(hosts) => {
                let unique: std::collections::HashSet<_> = hosts.iter().collect();
                assert_eq!(unique.len(), hosts.len());
                assert!(hosts.iter().all(|h| !h.as_str().is_empty()));
            }
            _ => {}
        }
    }
});
