//! Fuzz target for the connection string parser.
//!
//! Feeds arbitrary strings to the parser. Parsing must never panic, and any
//! string that parses must survive a trip through its canonical form.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_uri_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use mongo_uri_core::ConnectionString;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(conn) = ConnectionString::parse(input) else {
        return;
    };

    let canonical = conn.to_string();
    let reparsed = ConnectionString::parse(&canonical)
        .unwrap_or_else(|e| panic!("canonical form {canonical:?} of {input:?} rejected: {e}"));
    assert_eq!(reparsed, conn, "round trip changed {input:?}");
    assert_eq!(reparsed.to_string(), canonical);
});
