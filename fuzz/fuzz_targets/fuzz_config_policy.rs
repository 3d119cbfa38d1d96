//! Fuzz target for config.toml policy parsing.
//!
//! Tests that TOML policy parsing and validation handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rt_config::Policy;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Parse then validate - should only ever return errors
        if let Ok(policy) = toml::from_str::<Policy>(text) {
            let _ = policy.validate();
        }
    }
});
