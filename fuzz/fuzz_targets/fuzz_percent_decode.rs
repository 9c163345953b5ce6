//! Fuzz target: `percent_decode`
//!
//! The decoder must never panic and never yield more than the argument
//! bound, whatever escapes the input contains.
//!
//! cargo fuzz run fuzz_percent_decode

#![no_main]

use homeylink::config::ARGUMENT_MAX_LEN;
use homeylink::protocol::request::percent_decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(arg) = percent_decode(data) {
        assert!(arg.len() <= ARGUMENT_MAX_LEN);
        assert!(arg.len() <= data.len());
    }
});
