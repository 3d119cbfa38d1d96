//! Fuzz target for menu input decoding.
//!
//! Tests that operator input decoding handles arbitrary input without
//! panicking. Every line typed at the console goes through this path.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rt_core::input::decode;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Must classify, never panic
        let _ = decode(line);
    }
});
