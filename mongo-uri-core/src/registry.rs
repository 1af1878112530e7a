//! Static table of recognised URI options and their coercion rules.
//!
//! Keys fall into three groups:
//!
//! - **supported** options are coerced to their declared type and range-checked,
//! - **unsupported** options (`minPoolSize`, `maxIdleTimeMS`, `waitQueueMultiple`,
//!   `waitQueueTimeoutMS`) are syntactically fine but always rejected,
//! - anything else is ignored.
//!
//! ```rust
//! use mongo_uri_core::registry;
//!
//! let spec = registry::lookup("HEARTBEATFREQUENCYMS").unwrap();
//! assert_eq!(spec.name, "heartbeatFrequencyMS");
//! assert!(registry::coerce(spec, "499").is_err());
//! assert!(registry::is_unsupported("minPoolSize"));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::error::{UriError, UriResult};
use crate::value::{Document, OptionValue, OptionsMap};

/// Declared type of an option, with its domain constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    /// `true` or `false`, case-insensitive.
    Boolean,
    /// Decimal integer within `[min, max]`.
    Int32 {
        /// Smallest accepted value.
        min: i32,
        /// Largest accepted value.
        max: i32,
    },
    /// Non-empty string, optionally bounded in bytes.
    String {
        /// Largest accepted length in bytes.
        max_len: Option<usize>,
    },
    /// One of a closed set of words, matched case-insensitively.
    Enumerated(&'static [&'static str]),
    /// Comma-separated list of non-empty strings.
    StringList,
    /// Comma-separated `key:value` (or `key=value`) pairs.
    Document,
}

/// A registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Canonical camelCase name.
    pub name: &'static str,
    /// Declared type.
    pub kind: OptionType,
    /// Canonical option this key is an alternative spelling of.
    pub alias_of: Option<&'static str>,
}

impl OptionSpec {
    const fn new(name: &'static str, kind: OptionType) -> Self {
        Self {
            name,
            kind,
            alias_of: None,
        }
    }

    const fn alias(name: &'static str, kind: OptionType, target: &'static str) -> Self {
        Self {
            name,
            kind,
            alias_of: Some(target),
        }
    }

    /// Canonical name of the option this entry stores into.
    pub fn target(&self) -> &'static str {
        self.alias_of.unwrap_or(self.name)
    }
}

const fn int(min: i32, max: i32) -> OptionType {
    OptionType::Int32 { min, max }
}

const fn at_least(min: i32) -> OptionType {
    int(min, i32::MAX)
}

const STRING: OptionType = OptionType::String { max_len: None };

/// Read preference modes accepted by `readPreference`.
pub const READ_PREFERENCE_MODES: &[&str] = &[
    "primary",
    "primaryPreferred",
    "secondary",
    "secondaryPreferred",
    "nearest",
];

/// Largest `appName` accepted by the server handshake.
pub const MAX_APP_NAME_LEN: usize = 128;

const SUPPORTED_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("appName", OptionType::String { max_len: Some(MAX_APP_NAME_LEN) }),
    OptionSpec::new("replicaSet", STRING),
    OptionSpec::new("heartbeatFrequencyMS", at_least(500)),
    OptionSpec::new("serverSelectionTimeoutMS", at_least(1)),
    OptionSpec::new("localThresholdMS", at_least(0)),
    OptionSpec::new("connectTimeoutMS", at_least(1)),
    OptionSpec::new("socketTimeoutMS", at_least(0)),
    OptionSpec::new("maxPoolSize", at_least(0)),
    OptionSpec::new("maxConnecting", at_least(1)),
    OptionSpec::new("compressors", OptionType::StringList),
    OptionSpec::new("zlibCompressionLevel", int(-1, 9)),
    OptionSpec::new("tls", OptionType::Boolean),
    OptionSpec::alias("ssl", OptionType::Boolean, "tls"),
    OptionSpec::new("tlsInsecure", OptionType::Boolean),
    OptionSpec::new("tlsAllowInvalidCertificates", OptionType::Boolean),
    OptionSpec::new("tlsAllowInvalidHostnames", OptionType::Boolean),
    OptionSpec::new("tlsCAFile", STRING),
    OptionSpec::new("tlsCertificateKeyFile", STRING),
    OptionSpec::new("tlsCertificateKeyFilePassword", STRING),
    OptionSpec::new("directConnection", OptionType::Boolean),
    OptionSpec::new("loadBalanced", OptionType::Boolean),
    OptionSpec::new("authMechanism", STRING),
    OptionSpec::new("authMechanismProperties", OptionType::Document),
    OptionSpec::new("authSource", STRING),
    OptionSpec::new("retryWrites", OptionType::Boolean),
    OptionSpec::new("retryReads", OptionType::Boolean),
    OptionSpec::new("readPreference", OptionType::Enumerated(READ_PREFERENCE_MODES)),
    OptionSpec::new("maxStalenessSeconds", at_least(-1)),
    OptionSpec::new("w", STRING),
    OptionSpec::new("wTimeoutMS", at_least(0)),
    OptionSpec::new("journal", OptionType::Boolean),
    OptionSpec::new("readConcernLevel", STRING),
    OptionSpec::new("srvMaxHosts", at_least(0)),
    OptionSpec::new("srvServiceName", STRING),
];

/// Options that parse but are deliberately not supported.
pub const UNSUPPORTED_OPTIONS: &[&str] = &[
    "minPoolSize",
    "maxIdleTimeMS",
    "waitQueueMultiple",
    "waitQueueTimeoutMS",
];

static SUPPORTED: LazyLock<HashMap<String, &'static OptionSpec>> = LazyLock::new(|| {
    SUPPORTED_OPTIONS
        .iter()
        .map(|spec| (spec.name.to_ascii_lowercase(), spec))
        .collect()
});

static UNSUPPORTED: LazyLock<HashSet<String>> = LazyLock::new(|| {
    UNSUPPORTED_OPTIONS
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect()
});

/// Find the registry entry for an option (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static OptionSpec> {
    SUPPORTED.get(name.to_ascii_lowercase().as_str()).copied()
}

/// Check if an option is in the known-unsupported set.
pub fn is_unsupported(name: &str) -> bool {
    UNSUPPORTED.contains(name.to_ascii_lowercase().as_str())
}

/// Canonical camelCase spelling of an option, or the input if it is not registered.
pub fn canonical_name(name: &str) -> &str {
    lookup(name).map_or(name, |spec| spec.name)
}

/// Coerce a raw URI value to the option's declared type and check its domain.
pub fn coerce(spec: &OptionSpec, raw: &str) -> UriResult<OptionValue> {
    let value = match spec.kind {
        OptionType::Boolean => {
            if raw.eq_ignore_ascii_case("true") {
                OptionValue::Boolean(true)
            } else if raw.eq_ignore_ascii_case("false") {
                OptionValue::Boolean(false)
            } else {
                return Err(UriError::domain(format!(
                    "option '{}' must be 'true' or 'false', got '{}'",
                    spec.name, raw
                )));
            }
        }
        OptionType::Int32 { .. } => OptionValue::Int32(parse_i32(spec, raw)?),
        OptionType::String { .. } => OptionValue::String(raw.to_string()),
        OptionType::Enumerated(words) => {
            let word = words
                .iter()
                .find(|w| w.eq_ignore_ascii_case(raw))
                .ok_or_else(|| {
                    UriError::domain(format!(
                        "option '{}' must be one of {}, got '{}'",
                        spec.name,
                        words.join("|"),
                        raw
                    ))
                })?;
            OptionValue::String((*word).to_string())
        }
        OptionType::StringList => {
            OptionValue::StringList(raw.split(',').map(str::to_string).collect())
        }
        OptionType::Document => OptionValue::Document(parse_document(spec, raw)?),
    };
    check(spec, &value)?;
    Ok(value)
}

/// Check an already-typed value against the option's declared type and domain.
///
/// Values supplied through [`ClientOptions`](crate::ClientOptions) go through
/// here too, so both sources are rejected with the same message.
pub fn check(spec: &OptionSpec, value: &OptionValue) -> UriResult<()> {
    match (spec.kind, value) {
        (OptionType::Boolean, OptionValue::Boolean(_)) => Ok(()),
        (OptionType::Int32 { min, max }, OptionValue::Int32(n)) => {
            if *n < min {
                Err(UriError::domain(format!(
                    "option '{}' must be at least {}, got {}",
                    spec.name, min, n
                )))
            } else if *n > max {
                Err(UriError::domain(format!(
                    "option '{}' must be at most {}, got {}",
                    spec.name, max, n
                )))
            } else {
                Ok(())
            }
        }
        (OptionType::String { max_len }, OptionValue::String(s)) => {
            if s.is_empty() {
                return Err(UriError::domain(format!(
                    "option '{}' must not be empty",
                    spec.name
                )));
            }
            match max_len {
                Some(max) if s.len() > max => Err(UriError::domain(format!(
                    "option '{}' must be at most {} bytes, got {}",
                    spec.name,
                    max,
                    s.len()
                ))),
                _ => Ok(()),
            }
        }
        (OptionType::Enumerated(words), OptionValue::String(s)) => {
            if words.contains(&s.as_str()) {
                Ok(())
            } else {
                Err(UriError::domain(format!(
                    "option '{}' must be one of {}, got '{}'",
                    spec.name,
                    words.join("|"),
                    s
                )))
            }
        }
        (OptionType::StringList, OptionValue::StringList(items)) => {
            if items.is_empty() || items.iter().any(String::is_empty) {
                Err(UriError::domain(format!(
                    "option '{}' contains an empty entry",
                    spec.name
                )))
            } else {
                Ok(())
            }
        }
        (OptionType::Document, OptionValue::Document(doc)) => check_document(spec, doc),
        (_, other) => Err(UriError::domain(format!(
            "option '{}' does not accept a {} value",
            spec.name,
            other.type_name()
        ))),
    }
}

/// Keys and values must survive the `key:value,key:value` rendering.
fn check_document(spec: &OptionSpec, doc: &Document) -> UriResult<()> {
    for (key, value) in doc {
        if key.is_empty() {
            return Err(UriError::domain(format!(
                "option '{}' has an empty key",
                spec.name
            )));
        }
        if let Some(c) = key.chars().find(|c| matches!(c, ',' | ':' | '=')) {
            return Err(UriError::domain(format!(
                "option '{}' key '{}' must not contain '{}'",
                spec.name, key, c
            )));
        }
        if value.contains(',') {
            return Err(UriError::domain(format!(
                "option '{}' value for '{}' must not contain ','",
                spec.name, key
            )));
        }
    }
    Ok(())
}

/// [`check`] by option name.
pub fn check_named(name: &str, value: &OptionValue) -> UriResult<()> {
    let spec = lookup(name)
        .ok_or_else(|| UriError::domain(format!("option '{}' is not recognized", name)))?;
    check(spec, value)
}

fn parse_i32(spec: &OptionSpec, raw: &str) -> UriResult<i32> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UriError::domain(format!(
            "option '{}' must be an integer, got '{}'",
            spec.name, raw
        )));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            UriError::domain(format!(
                "option '{}' value '{}' is outside the 32-bit signed range",
                spec.name, raw
            ))
        })
}

fn parse_document(spec: &OptionSpec, raw: &str) -> UriResult<Document> {
    let mut doc = Document::new();
    for pair in raw.split(',') {
        let (key, value) = match pair.find(|c| c == '=' || c == ':') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => {
                return Err(UriError::domain(format!(
                    "option '{}' entry '{}' must have the form key:value",
                    spec.name, pair
                )));
            }
        };
        if key.is_empty() {
            return Err(UriError::domain(format!(
                "option '{}' entry '{}' has an empty key",
                spec.name, pair
            )));
        }
        if doc.contains_key(key) {
            debug!(option = spec.name, key, "Duplicate property ignored, first occurrence kept");
            continue;
        }
        doc.insert(key.to_string(), value.to_string());
    }
    Ok(doc)
}

/// Coerce every raw option pair into an [`OptionsMap`].
///
/// A later occurrence of the same key replaces an earlier one. Spelling the
/// same option through two aliases with different values is a conflict; each
/// spelling is compared using its own last value.
pub fn coerce_options(pairs: &[(String, String)]) -> UriResult<OptionsMap> {
    let mut options = OptionsMap::new();
    let mut spellings: HashMap<&'static str, Vec<(&'static str, OptionValue)>> = HashMap::new();

    for (key, raw) in pairs {
        if is_unsupported(key) {
            return Err(UriError::domain(format!(
                "option '{}' is not supported",
                canonical_unsupported(key)
            )));
        }

        let Some(spec) = lookup(key) else {
            debug!(option = %key, "Unrecognized option ignored");
            continue;
        };

        let value = coerce(spec, raw)?;
        let target = spec.target();

        let seen = spellings.entry(target).or_default();
        match seen.iter_mut().find(|(name, _)| *name == spec.name) {
            Some((_, last)) => {
                debug!(option = spec.name, "Option repeated, last value wins");
                *last = value.clone();
            }
            None => seen.push((spec.name, value.clone())),
        }
        if let Some((other, _)) = seen
            .iter()
            .find(|(name, last)| *name != spec.name && *last != value)
        {
            return Err(UriError::conflict(format!(
                "options '{}' and '{}' must have the same value",
                other, spec.name
            )));
        }

        trace!(option = target, kind = value.type_name(), "Option coerced");
        options.insert(target, value);
    }

    Ok(options)
}

fn canonical_unsupported(key: &str) -> &str {
    UNSUPPORTED_OPTIONS
        .iter()
        .find(|name| name.eq_ignore_ascii_case(key))
        .copied()
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("appname").unwrap().name, "appName");
        assert_eq!(lookup("TLSINSECURE").unwrap().name, "tlsInsecure");
        assert!(lookup("blah").is_none());
        assert_eq!(canonical_name("replicaset"), "replicaSet");
        assert_eq!(canonical_name("blah"), "blah");
    }

    #[test]
    fn test_boolean_coercion() {
        let spec = lookup("tls").unwrap();
        assert_eq!(coerce(spec, "TRUE").unwrap(), OptionValue::Boolean(true));
        assert_eq!(coerce(spec, "False").unwrap(), OptionValue::Boolean(false));
        let err = coerce(spec, "1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: option 'tls' must be 'true' or 'false', got '1'"
        );
    }

    #[test]
    fn test_integer_coercion() {
        let spec = lookup("localThresholdMS").unwrap();
        assert_eq!(coerce(spec, "0").unwrap(), OptionValue::Int32(0));
        assert!(coerce(spec, "-1").is_err());
        assert!(coerce(spec, "+5").is_err());
        assert!(coerce(spec, "1.5").is_err());
        assert!(coerce(spec, "").is_err());
        assert!(coerce(spec, "-").is_err());

        let err = coerce(spec, "2147483648").unwrap_err();
        assert!(err.to_string().contains("outside the 32-bit signed range"));
        let err = coerce(spec, "99999999999999999999999").unwrap_err();
        assert!(err.to_string().contains("outside the 32-bit signed range"));
        assert_eq!(coerce(spec, "2147483647").unwrap(), OptionValue::Int32(i32::MAX));
    }

    #[test]
    fn test_minimums() {
        let heartbeat = lookup("heartbeatFrequencyMS").unwrap();
        assert!(coerce(heartbeat, "500").is_ok());
        let err = coerce(heartbeat, "499").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: option 'heartbeatFrequencyMS' must be at least 500, got 499"
        );
        assert!(coerce(lookup("connectTimeoutMS").unwrap(), "0").is_err());
    }

    #[test]
    fn test_zlib_level_bounds() {
        let spec = lookup("zlibCompressionLevel").unwrap();
        assert!(coerce(spec, "-1").is_ok());
        assert!(coerce(spec, "9").is_ok());
        assert!(coerce(spec, "-2").is_err());
        assert!(coerce(spec, "10").is_err());
    }

    #[test]
    fn test_string_domain() {
        let spec = lookup("appName").unwrap();
        assert!(coerce(spec, "").is_err());
        assert!(coerce(spec, &"x".repeat(MAX_APP_NAME_LEN)).is_ok());
        assert!(coerce(spec, &"x".repeat(MAX_APP_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_enumerated_coercion() {
        let spec = lookup("readPreference").unwrap();
        assert_eq!(
            coerce(spec, "SECONDARYPREFERRED").unwrap(),
            OptionValue::String("secondaryPreferred".into())
        );
        assert!(coerce(spec, "fastest").is_err());
    }

    #[test]
    fn test_list_coercion() {
        let spec = lookup("compressors").unwrap();
        assert_eq!(
            coerce(spec, "zlib,snappy").unwrap(),
            OptionValue::StringList(vec!["zlib".into(), "snappy".into()])
        );
        assert!(coerce(spec, "zlib,,snappy").is_err());
    }

    #[test]
    fn test_document_keeps_first_duplicate() {
        let spec = lookup("authMechanismProperties").unwrap();
        let value = coerce(spec, "SERVICE_NAME=a,SERVICE_REALM:b,SERVICE_NAME=c").unwrap();
        let doc = value.as_document().unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["SERVICE_NAME"], "a");
        assert_eq!(doc["SERVICE_REALM"], "b");

        assert!(coerce(spec, "SERVICE_NAME").is_err());
        assert!(coerce(spec, "=x").is_err());
    }

    #[test]
    fn test_check_document_entries() {
        let doc = |key: &str, value: &str| {
            let mut doc = Document::new();
            doc.insert(key.to_string(), value.to_string());
            OptionValue::Document(doc)
        };
        assert!(check_named("authMechanismProperties", &doc("TOKEN_RESOURCE", "api://a")).is_ok());

        let err = check_named("authMechanismProperties", &doc("TOKEN_RESOURCE", "api://a,b"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: option 'authMechanismProperties' value for 'TOKEN_RESOURCE' must not contain ','"
        );
        assert!(check_named("authMechanismProperties", &doc("A:B", "x")).is_err());
        assert!(check_named("authMechanismProperties", &doc("", "x")).is_err());
        assert!(check_named("authSource", &OptionValue::String(String::new())).is_err());
    }

    #[test]
    fn test_check_rejects_wrong_variant() {
        let spec = lookup("tls").unwrap();
        let err = check(spec, &OptionValue::Int32(1)).unwrap_err();
        assert!(err.to_string().contains("does not accept a int32 value"));
    }

    #[test]
    fn test_coerce_options_unknown_ignored() {
        let options = coerce_options(&pairs(&[("blah", "10"), ("appName", "svc")])).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options.get_str("appname").unwrap(), Some("svc"));
    }

    #[test]
    fn test_coerce_options_unsupported_rejected() {
        for key in UNSUPPORTED_OPTIONS {
            let err = coerce_options(&pairs(&[(key, "10")])).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("invalid argument: option '{}' is not supported", key)
            );
        }
    }

    #[test]
    fn test_coerce_options_last_wins() {
        let options =
            coerce_options(&pairs(&[("appName", "first"), ("APPNAME", "second")])).unwrap();
        assert_eq!(options.get_str("appName").unwrap(), Some("second"));
    }

    #[test]
    fn test_ssl_alias() {
        let options = coerce_options(&pairs(&[("ssl", "true")])).unwrap();
        assert_eq!(options.get_bool("tls").unwrap(), Some(true));
        assert!(!options.contains("ssl"));

        assert!(coerce_options(&pairs(&[("tls", "true"), ("ssl", "true")])).is_ok());

        let err = coerce_options(&pairs(&[("tls", "true"), ("ssl", "false")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: options 'tls' and 'ssl' must have the same value"
        );

        let err = coerce_options(&pairs(&[("tls", "true"), ("ssl", "true"), ("ssl", "false")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: options 'tls' and 'ssl' must have the same value"
        );

        let options =
            coerce_options(&pairs(&[("tls", "true"), ("tls", "false"), ("ssl", "false")])).unwrap();
        assert_eq!(options.get_bool("tls").unwrap(), Some(false));
    }
}
