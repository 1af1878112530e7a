//! The validated connection string.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::compression::{self, CompressorSpec};
use crate::credential::{self, Credential};
use crate::error::{UriError, UriResult};
use crate::host::HostIdentifier;
use crate::options::{ClientOptions, ReadPreference};
use crate::parser::{Scheme, parse_uri, url_encode, url_encode_value};
use crate::registry;
use crate::srv::{self, SrvResolver};
use crate::validate;
use crate::value::{OptionValue, OptionsMap};

/// Environment variable read by [`ConnectionString::from_default_env`].
pub const DEFAULT_ENV_VAR: &str = "MONGODB_URI";

const AUTH_OPTIONS: &[&str] = &["authMechanism", "authSource", "authMechanismProperties"];

/// A fully parsed, merged and validated connection string.
///
/// Values are immutable once built. `Display` renders the canonical form,
/// which parses back into an equal value.
///
/// ```rust
/// use mongo_uri_core::ConnectionString;
///
/// let conn: ConnectionString = "mongodb://app:pw@db1,db2:27018/orders?replicaSet=rs0&compressors=zlib"
///     .parse()
///     .unwrap();
/// assert_eq!(conn.hosts().len(), 2);
/// assert_eq!(conn.database(), Some("orders"));
/// assert_eq!(conn.replica_set(), Some("rs0"));
/// assert_eq!(conn.credential().unwrap().username.as_deref(), Some("app"));
/// assert_eq!(conn.to_string().parse::<ConnectionString>().unwrap(), conn);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    scheme: Scheme,
    hosts: Vec<HostIdentifier>,
    srv_host: Option<HostIdentifier>,
    database: Option<String>,
    credential: Option<Credential>,
    options: OptionsMap,
    compressors: Vec<CompressorSpec>,
}

impl ConnectionString {
    /// Parse and validate a URI.
    ///
    /// For `mongodb+srv://` the seed list is left unresolved; see
    /// [`resolve`](Self::resolve).
    pub fn parse(uri: &str) -> UriResult<Self> {
        Self::build(uri, None)
    }

    /// Parse a URI and apply `overrides` field by field before validating.
    pub fn parse_with(uri: &str, overrides: &ClientOptions) -> UriResult<Self> {
        Self::build(uri, Some(overrides))
    }

    /// Parse, merge, validate and, for SRV URIs, resolve the seed list.
    pub async fn construct(
        uri: &str,
        overrides: Option<&ClientOptions>,
        resolver: &dyn SrvResolver,
    ) -> UriResult<Self> {
        Self::build(uri, overrides)?.resolve(resolver).await
    }

    /// Parse from an environment variable.
    pub fn from_env(var: &str) -> UriResult<Self> {
        let uri = std::env::var(var).map_err(|_| UriError::EnvNotFound(var.to_string()))?;
        Self::parse(&uri)
    }

    /// Parse from the `MONGODB_URI` environment variable.
    pub fn from_default_env() -> UriResult<Self> {
        Self::from_env(DEFAULT_ENV_VAR)
    }

    fn build(uri: &str, overrides: Option<&ClientOptions>) -> UriResult<Self> {
        debug!(uri_len = uri.len(), overrides = overrides.is_some(), "ConnectionString::parse()");

        let parsed = parse_uri(uri)?;
        let mut options = registry::coerce_options(&parsed.options)?;
        let mut credential = credential::extract(
            parsed.username.as_deref(),
            parsed.password.as_deref(),
            &options,
        )?;

        if let Some(overrides) = overrides {
            overrides.apply_to(&mut options)?;
            if let Some(replacement) = &overrides.credential {
                credential = replace_credential(&mut options, replacement)?;
            }
        }

        let compressors = compression::negotiate(&options)?;

        let (hosts, srv_host) = match parsed.scheme {
            Scheme::Standard => (parsed.hosts, None),
            Scheme::Srv => (Vec::new(), parsed.hosts.into_iter().next()),
        };

        let conn = Self {
            scheme: parsed.scheme,
            hosts,
            srv_host,
            database: parsed.database,
            credential,
            options,
            compressors,
        };
        validate::validate(&conn)?;

        debug!(
            scheme = %conn.scheme,
            hosts = conn.hosts.len(),
            options = conn.options.len(),
            pending = conn.is_resolution_pending(),
            "Connection string built"
        );
        Ok(conn)
    }

    /// Resolve the SRV seed list and re-validate against it.
    ///
    /// Values that are not pending resolution are returned unchanged.
    pub async fn resolve(mut self, resolver: &dyn SrvResolver) -> UriResult<Self> {
        let srv_host = match &self.srv_host {
            Some(host) if self.hosts.is_empty() => host.host().to_string(),
            _ => return Ok(self),
        };

        self.hosts = srv::resolve_hosts(
            resolver,
            &srv_host,
            self.options.get_str("srvServiceName")?,
            self.options.get_i32("srvMaxHosts")?,
        )
        .await?;
        validate::validate(&self)?;
        Ok(self)
    }

    /// [`resolve`](Self::resolve), giving up after `timeout`.
    pub async fn resolve_with_timeout(
        self,
        resolver: &dyn SrvResolver,
        timeout: Duration,
    ) -> UriResult<Self> {
        let host = self
            .srv_host
            .as_ref()
            .map(|h| h.host().to_string())
            .unwrap_or_default();
        tokio::time::timeout(timeout, self.resolve(resolver))
            .await
            .map_err(|_| UriError::ResolutionTimeout {
                host,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    /// URI scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Seed list. Empty while an SRV lookup is pending.
    pub fn hosts(&self) -> &[HostIdentifier] {
        &self.hosts
    }

    /// The SRV host, for `mongodb+srv://` URIs.
    pub fn srv_host(&self) -> Option<&HostIdentifier> {
        self.srv_host.as_ref()
    }

    /// Check if the seed list still has to be resolved through DNS.
    pub fn is_resolution_pending(&self) -> bool {
        self.srv_host.is_some() && self.hosts.is_empty()
    }

    /// Default database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Credential, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// All recognised options after merging.
    pub fn options(&self) -> &OptionsMap {
        &self.options
    }

    /// Compressors in preference order.
    pub fn compressors(&self) -> &[CompressorSpec] {
        &self.compressors
    }

    fn str_option(&self, name: &str) -> Option<&str> {
        self.options.get_str(name).ok().flatten()
    }

    fn bool_option(&self, name: &str) -> Option<bool> {
        self.options.get_bool(name).ok().flatten()
    }

    fn millis_option(&self, name: &str) -> Option<Duration> {
        self.options
            .get_i32(name)
            .ok()
            .flatten()
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis)
    }

    /// `appName`.
    pub fn app_name(&self) -> Option<&str> {
        self.str_option("appName")
    }

    /// `replicaSet`.
    pub fn replica_set(&self) -> Option<&str> {
        self.str_option("replicaSet")
    }

    /// `heartbeatFrequencyMS`.
    pub fn heartbeat_frequency(&self) -> Option<Duration> {
        self.millis_option("heartbeatFrequencyMS")
    }

    /// `serverSelectionTimeoutMS`.
    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.millis_option("serverSelectionTimeoutMS")
    }

    /// `localThresholdMS`.
    pub fn local_threshold(&self) -> Option<Duration> {
        self.millis_option("localThresholdMS")
    }

    /// `connectTimeoutMS`.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.millis_option("connectTimeoutMS")
    }

    /// `socketTimeoutMS`.
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.millis_option("socketTimeoutMS")
    }

    /// Whether TLS is on. SRV URIs default to TLS.
    pub fn tls_enabled(&self) -> bool {
        self.bool_option("tls").unwrap_or(self.scheme.is_srv())
    }

    /// `tlsInsecure`.
    pub fn tls_insecure(&self) -> Option<bool> {
        self.bool_option("tlsInsecure")
    }

    /// `tlsAllowInvalidCertificates`.
    pub fn tls_allow_invalid_certificates(&self) -> Option<bool> {
        self.bool_option("tlsAllowInvalidCertificates")
    }

    /// `tlsAllowInvalidHostnames`.
    pub fn tls_allow_invalid_hostnames(&self) -> Option<bool> {
        self.bool_option("tlsAllowInvalidHostnames")
    }

    /// `directConnection`.
    pub fn direct_connection(&self) -> Option<bool> {
        self.bool_option("directConnection")
    }

    /// `loadBalanced`.
    pub fn load_balanced(&self) -> Option<bool> {
        self.bool_option("loadBalanced")
    }

    /// `retryWrites`.
    pub fn retry_writes(&self) -> Option<bool> {
        self.bool_option("retryWrites")
    }

    /// `retryReads`.
    pub fn retry_reads(&self) -> Option<bool> {
        self.bool_option("retryReads")
    }

    /// `readPreference`.
    pub fn read_preference(&self) -> Option<ReadPreference> {
        self.str_option("readPreference")
            .and_then(ReadPreference::from_name)
    }

    /// `maxPoolSize`.
    pub fn max_pool_size(&self) -> Option<u32> {
        self.options
            .get_i32("maxPoolSize")
            .ok()
            .flatten()
            .and_then(|n| u32::try_from(n).ok())
    }

    /// The canonical URI.
    pub fn to_uri_string(&self) -> String {
        self.to_string()
    }
}

/// Swap in a caller-supplied credential and rewrite the auth options to match.
fn replace_credential(
    options: &mut OptionsMap,
    replacement: &Credential,
) -> UriResult<Option<Credential>> {
    replacement.validate()?;
    for name in AUTH_OPTIONS {
        options.remove(name);
    }
    if replacement.username.is_none() && replacement.mechanism.is_none() {
        return Ok(None);
    }

    if let Some(mechanism) = replacement.mechanism {
        options.insert(
            "authMechanism",
            OptionValue::String(mechanism.as_str().to_string()),
        );
    }
    if let Some(source) = &replacement.source {
        let value = OptionValue::String(source.clone());
        registry::check_named("authSource", &value)?;
        options.insert("authSource", value);
    }
    if !replacement.mechanism_properties.is_empty() {
        let value = OptionValue::Document(replacement.mechanism_properties.clone());
        registry::check_named("authMechanismProperties", &value)?;
        options.insert("authMechanismProperties", value);
    }
    debug!(mechanism = ?replacement.mechanism, "Credential overridden by client options");
    Ok(Some(replacement.clone()))
}

impl FromStr for ConnectionString {
    type Err = UriError;

    fn from_str(s: &str) -> UriResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme.prefix())?;

        if let Some(username) = self.credential.as_ref().and_then(|c| c.username.as_deref()) {
            f.write_str(&url_encode(username))?;
            if let Some(password) = self.credential.as_ref().and_then(|c| c.password.as_deref()) {
                write!(f, ":{}", url_encode(password))?;
            }
            f.write_str("@")?;
        }

        match &self.srv_host {
            Some(srv_host) => write!(f, "{}", srv_host)?,
            None => {
                let hosts: Vec<_> = self.hosts.iter().map(ToString::to_string).collect();
                f.write_str(&hosts.join(","))?;
            }
        }

        if self.database.is_none() && self.options.is_empty() {
            return Ok(());
        }
        f.write_str("/")?;
        if let Some(database) = &self.database {
            f.write_str(&url_encode(database))?;
        }

        let pairs: Vec<_> = self
            .options
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    registry::canonical_name(key),
                    url_encode_value(&value.to_string())
                )
            })
            .collect();
        if !pairs.is_empty() {
            write!(f, "?{}", pairs.join("&"))?;
        }
        Ok(())
    }
}
