//! Structured fuzz target for connection strings.
//!
//! Builds URIs from known option names and arbitrary values so the fuzzer
//! spends its time past the grammar, in coercion, merging and validation.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_uri_structured
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mongo_uri_core::{ClientOptions, ConnectionString};

const KEYS: &[&str] = &[
    "appName",
    "replicaSet",
    "heartbeatFrequencyMS",
    "connectTimeoutMS",
    "localThresholdMS",
    "compressors",
    "zlibCompressionLevel",
    "tls",
    "ssl",
    "tlsInsecure",
    "tlsAllowInvalidCertificates",
    "directConnection",
    "loadBalanced",
    "authMechanism",
    "authMechanismProperties",
    "authSource",
    "readPreference",
    "maxStalenessSeconds",
    "srvMaxHosts",
    "minPoolSize",
    "unknownOption",
];

#[derive(Debug, Arbitrary)]
struct FuzzUri {
    srv: bool,
    user: Option<(String, Option<String>)>,
    hosts: Vec<(String, Option<u16>)>,
    database: Option<String>,
    options: Vec<(u8, String)>,
    app_name_override: Option<String>,
    direct_connection_override: Option<bool>,
    load_balanced_override: Option<bool>,
}

impl FuzzUri {
    fn to_uri(&self) -> String {
        let mut uri = String::from(if self.srv { "mongodb+srv://" } else { "mongodb://" });
        if let Some((user, password)) = &self.user {
            uri.push_str(&escape(user));
            if let Some(password) = password {
                uri.push(':');
                uri.push_str(&escape(password));
            }
            uri.push('@');
        }
        let hosts: Vec<String> = self
            .hosts
            .iter()
            .map(|(host, port)| match port {
                Some(port) => format!("{}:{}", host, port),
                None => host.clone(),
            })
            .collect();
        uri.push_str(&hosts.join(","));
        uri.push('/');
        if let Some(database) = &self.database {
            uri.push_str(&escape(database));
        }
        let pairs: Vec<String> = self
            .options
            .iter()
            .map(|(key, value)| format!("{}={}", KEYS[*key as usize % KEYS.len()], escape(value)))
            .collect();
        if !pairs.is_empty() {
            uri.push('?');
            uri.push_str(&pairs.join("&"));
        }
        uri
    }

    fn overrides(&self) -> ClientOptions {
        ClientOptions {
            app_name: self.app_name_override.clone(),
            direct_connection: self.direct_connection_override,
            load_balanced: self.load_balanced_override,
            ..Default::default()
        }
    }
}

fn escape(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b',' | b':' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fuzz_target!(|input: FuzzUri| {
    let uri = input.to_uri();
    let Ok(conn) = ConnectionString::parse_with(&uri, &input.overrides()) else {
        return;
    };

    if conn.direct_connection() == Some(true) {
        assert_eq!(conn.hosts().len(), 1, "{uri}");
    }
    if conn.load_balanced() == Some(true) {
        assert!(conn.hosts().len() <= 1, "{uri}");
        assert!(conn.replica_set().is_none(), "{uri}");
    }
    assert!(!conn.options().contains("minPoolSize"), "{uri}");

    let reparsed = ConnectionString::parse(&conn.to_string());
    assert_eq!(reparsed.as_ref(), Ok(&conn), "{uri}");
});
