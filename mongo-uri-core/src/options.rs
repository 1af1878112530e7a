//! Structured client options that override the connection string.
//!
//! [`ClientOptions`] is a patch: every field is optional, and a field that is
//! set replaces the URI's value for that option only. Everything else keeps
//! whatever the URI said.
//!
//! ```rust
//! use mongo_uri_core::{ClientOptions, ConnectionString};
//!
//! let overrides = ClientOptions::builder().app_name("MyApp").build().unwrap();
//! let conn = ConnectionString::parse_with(
//!     "mongodb://localhost/?appName=MyApp2&replicaSet=rs0",
//!     &overrides,
//! )
//! .unwrap();
//! assert_eq!(conn.app_name(), Some("MyApp"));
//! assert_eq!(conn.replica_set(), Some("rs0"));
//! ```
//!
//! The same record can be loaded from TOML, with keys spelled like URI options:
//!
//! ```rust
//! use mongo_uri_core::ClientOptions;
//!
//! let overrides = ClientOptions::from_toml_str(r#"
//!     appName = "reporting"
//!     heartbeatFrequencyMS = 2000
//!     readPreference = "secondaryPreferred"
//!
//!     [[compressors]]
//!     name = "zlib"
//!     level = 6
//! "#).unwrap();
//! assert_eq!(overrides.app_name.as_deref(), Some("reporting"));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compression::{self, CompressorSpec};
use crate::credential::Credential;
use crate::error::{UriError, UriResult};
use crate::registry;
use crate::value::{OptionValue, OptionsMap};

/// Read preference mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreference {
    /// Read from primary only.
    #[default]
    Primary,
    /// Read from primary preferred, fallback to secondary.
    PrimaryPreferred,
    /// Read from secondary only.
    Secondary,
    /// Read from secondary preferred, fallback to primary.
    SecondaryPreferred,
    /// Read from nearest member.
    Nearest,
}

impl ReadPreference {
    /// Name as written in a URI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PrimaryPreferred => "primaryPreferred",
            Self::Secondary => "secondary",
            Self::SecondaryPreferred => "secondaryPreferred",
            Self::Nearest => "nearest",
        }
    }

    /// Parse a mode name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::Primary,
            Self::PrimaryPreferred,
            Self::Secondary,
            Self::SecondaryPreferred,
            Self::Nearest,
        ]
        .into_iter()
        .find(|mode| mode.as_str().eq_ignore_ascii_case(name))
    }
}

/// Caller-supplied overrides for a connection string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientOptions {
    /// Application name reported in the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Required replica set name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<String>,
    /// Interval between server checks.
    #[serde(rename = "heartbeatFrequencyMS", with = "millis", skip_serializing_if = "Option::is_none")]
    pub heartbeat_frequency: Option<Duration>,
    /// How long server selection may block.
    #[serde(rename = "serverSelectionTimeoutMS", with = "millis", skip_serializing_if = "Option::is_none")]
    pub server_selection_timeout: Option<Duration>,
    /// Latency window for choosing among suitable servers.
    #[serde(rename = "localThresholdMS", with = "millis", skip_serializing_if = "Option::is_none")]
    pub local_threshold: Option<Duration>,
    /// Socket connect timeout.
    #[serde(rename = "connectTimeoutMS", with = "millis", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,
    /// Socket read/write timeout.
    #[serde(rename = "socketTimeoutMS", with = "millis", skip_serializing_if = "Option::is_none")]
    pub socket_timeout: Option<Duration>,
    /// Maximum connections per server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    /// Maximum connections being established concurrently per server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connecting: Option<u32>,
    /// Compressors in preference order. Replaces the URI's list as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressors: Option<Vec<CompressorSpec>>,
    /// Enable TLS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    /// Disable every TLS validation check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_insecure: Option<bool>,
    /// Accept invalid server certificates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_allow_invalid_certificates: Option<bool>,
    /// Accept certificates whose hostname does not match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_allow_invalid_hostnames: Option<bool>,
    /// CA bundle.
    #[serde(rename = "tlsCAFile", skip_serializing_if = "Option::is_none")]
    pub tls_ca_file: Option<PathBuf>,
    /// Client certificate and key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_certificate_key_file: Option<PathBuf>,
    /// Connect to the single seed host without discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_connection: Option<bool>,
    /// Connect through a load balancer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balanced: Option<bool>,
    /// Retry supported writes once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_writes: Option<bool>,
    /// Retry supported reads once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_reads: Option<bool>,
    /// Read preference mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_preference: Option<ReadPreference>,
    /// Maximum replication lag for secondaries.
    #[serde(rename = "maxStalenessSeconds", with = "seconds", skip_serializing_if = "Option::is_none")]
    pub max_staleness: Option<Duration>,
    /// Credential. Replaces the URI's credential as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    /// Maximum number of SRV hosts to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srv_max_hosts: Option<u32>,
    /// SRV service name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srv_service_name: Option<String>,
}

impl ClientOptions {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::new()
    }

    /// Parse a patch from TOML.
    pub fn from_toml_str(s: &str) -> UriResult<Self> {
        toml::from_str(s)
            .map_err(|e| UriError::domain(format!("invalid client options: {}", e.message())))
    }

    /// Serialize the patch to TOML.
    pub fn to_toml_string(&self) -> UriResult<String> {
        toml::to_string(self)
            .map_err(|e| UriError::domain(format!("cannot serialize client options: {}", e)))
    }

    /// Check every set field against the same rules the URI path uses.
    pub fn validate(&self) -> UriResult<()> {
        self.apply_to(&mut OptionsMap::new())?;
        if let Some(credential) = &self.credential {
            credential.validate()?;
        }
        Ok(())
    }

    /// Write every set field over `options`, leaving the rest untouched.
    pub(crate) fn apply_to(&self, options: &mut OptionsMap) -> UriResult<()> {
        let string = |s: &Option<String>| s.clone().map(OptionValue::String);
        let path = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| OptionValue::String(p.to_string_lossy().into_owned()))
        };
        let boolean = |b: Option<bool>| b.map(OptionValue::Boolean);

        let entries = vec![
            ("appName", string(&self.app_name)),
            ("replicaSet", string(&self.replica_set)),
            ("heartbeatFrequencyMS", millis_value("heartbeatFrequencyMS", self.heartbeat_frequency)?),
            ("serverSelectionTimeoutMS", millis_value("serverSelectionTimeoutMS", self.server_selection_timeout)?),
            ("localThresholdMS", millis_value("localThresholdMS", self.local_threshold)?),
            ("connectTimeoutMS", millis_value("connectTimeoutMS", self.connect_timeout)?),
            ("socketTimeoutMS", millis_value("socketTimeoutMS", self.socket_timeout)?),
            ("maxPoolSize", count_value("maxPoolSize", self.max_pool_size)?),
            ("maxConnecting", count_value("maxConnecting", self.max_connecting)?),
            ("tls", boolean(self.tls)),
            ("tlsInsecure", boolean(self.tls_insecure)),
            ("tlsAllowInvalidCertificates", boolean(self.tls_allow_invalid_certificates)),
            ("tlsAllowInvalidHostnames", boolean(self.tls_allow_invalid_hostnames)),
            ("tlsCAFile", path(&self.tls_ca_file)),
            ("tlsCertificateKeyFile", path(&self.tls_certificate_key_file)),
            ("directConnection", boolean(self.direct_connection)),
            ("loadBalanced", boolean(self.load_balanced)),
            ("retryWrites", boolean(self.retry_writes)),
            ("retryReads", boolean(self.retry_reads)),
            (
                "readPreference",
                self.read_preference
                    .map(|mode| OptionValue::String(mode.as_str().to_string())),
            ),
            ("maxStalenessSeconds", seconds_value("maxStalenessSeconds", self.max_staleness)?),
            ("srvMaxHosts", count_value("srvMaxHosts", self.srv_max_hosts)?),
            ("srvServiceName", string(&self.srv_service_name)),
        ];

        for (name, value) in entries {
            if let Some(value) = value {
                registry::check_named(name, &value)?;
                debug!(option = name, "Option overridden by client options");
                options.insert(name, value);
            }
        }

        if let Some(specs) = &self.compressors {
            compression::check_override(specs)?;
            let names = specs.iter().map(|s| s.name.to_ascii_lowercase()).collect();
            options.insert("compressors", OptionValue::StringList(names));
            if let Some(level) = specs.iter().find(|s| s.is_zlib()).and_then(|s| s.level) {
                options.insert("zlibCompressionLevel", OptionValue::Int32(level));
            }
            debug!(count = specs.len(), "Compressors overridden by client options");
        }

        Ok(())
    }
}

fn out_of_range(name: &str, shown: String) -> UriError {
    UriError::domain(format!(
        "option '{}' value {} is outside the 32-bit signed range",
        name, shown
    ))
}

fn millis_value(name: &str, value: Option<Duration>) -> UriResult<Option<OptionValue>> {
    value
        .map(|d| {
            i32::try_from(d.as_millis())
                .map(OptionValue::Int32)
                .map_err(|_| out_of_range(name, format!("{}ms", d.as_millis())))
        })
        .transpose()
}

fn seconds_value(name: &str, value: Option<Duration>) -> UriResult<Option<OptionValue>> {
    value
        .map(|d| {
            i32::try_from(d.as_secs())
                .map(OptionValue::Int32)
                .map_err(|_| out_of_range(name, format!("{}s", d.as_secs())))
        })
        .transpose()
}

fn count_value(name: &str, value: Option<u32>) -> UriResult<Option<OptionValue>> {
    value
        .map(|n| {
            i32::try_from(n)
                .map(OptionValue::Int32)
                .map_err(|_| out_of_range(name, n.to_string()))
        })
        .transpose()
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// Builder for [`ClientOptions`].
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.options.app_name = Some(name.into());
        self
    }

    /// Set the replica set name.
    pub fn replica_set(mut self, name: impl Into<String>) -> Self {
        self.options.replica_set = Some(name.into());
        self
    }

    /// Set the heartbeat frequency.
    pub fn heartbeat_frequency(mut self, duration: Duration) -> Self {
        self.options.heartbeat_frequency = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.options.server_selection_timeout = Some(duration);
        self
    }

    /// Set the local threshold.
    pub fn local_threshold(mut self, duration: Duration) -> Self {
        self.options.local_threshold = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.options.connect_timeout = Some(duration);
        self
    }

    /// Set the socket timeout.
    pub fn socket_timeout(mut self, duration: Duration) -> Self {
        self.options.socket_timeout = Some(duration);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.options.max_pool_size = Some(size);
        self
    }

    /// Set the maximum number of concurrently establishing connections.
    pub fn max_connecting(mut self, count: u32) -> Self {
        self.options.max_connecting = Some(count);
        self
    }

    /// Set the compressors (zlib, snappy, or zstd).
    pub fn compressors(mut self, compressors: Vec<CompressorSpec>) -> Self {
        self.options.compressors = Some(compressors);
        self
    }

    /// Enable or disable TLS.
    pub fn tls(mut self, enabled: bool) -> Self {
        self.options.tls = Some(enabled);
        self
    }

    /// Disable all TLS validation.
    pub fn tls_insecure(mut self, enabled: bool) -> Self {
        self.options.tls_insecure = Some(enabled);
        self
    }

    /// Accept invalid server certificates.
    pub fn tls_allow_invalid_certificates(mut self, enabled: bool) -> Self {
        self.options.tls_allow_invalid_certificates = Some(enabled);
        self
    }

    /// Accept mismatched server hostnames.
    pub fn tls_allow_invalid_hostnames(mut self, enabled: bool) -> Self {
        self.options.tls_allow_invalid_hostnames = Some(enabled);
        self
    }

    /// Set the CA bundle path.
    pub fn tls_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.tls_ca_file = Some(path.into());
        self
    }

    /// Set the client certificate path.
    pub fn tls_certificate_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.tls_certificate_key_file = Some(path.into());
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.options.direct_connection = Some(enabled);
        self
    }

    /// Enable load-balanced mode.
    pub fn load_balanced(mut self, enabled: bool) -> Self {
        self.options.load_balanced = Some(enabled);
        self
    }

    /// Enable or disable retry writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.options.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable retry reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.options.retry_reads = Some(enabled);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, mode: ReadPreference) -> Self {
        self.options.read_preference = Some(mode);
        self
    }

    /// Set the maximum staleness.
    pub fn max_staleness(mut self, duration: Duration) -> Self {
        self.options.max_staleness = Some(duration);
        self
    }

    /// Set the credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.options.credential = Some(credential);
        self
    }

    /// Limit the number of SRV hosts.
    pub fn srv_max_hosts(mut self, count: u32) -> Self {
        self.options.srv_max_hosts = Some(count);
        self
    }

    /// Set the SRV service name.
    pub fn srv_service_name(mut self, name: impl Into<String>) -> Self {
        self.options.srv_service_name = Some(name.into());
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> UriResult<ClientOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
