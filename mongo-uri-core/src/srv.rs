//! SRV seed-list resolution.
//!
//! DNS itself is not performed here. Callers plug in an [`SrvResolver`];
//! [`StaticSrvResolver`] serves fixed answers for tests and offline use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{UriError, UriResult};
use crate::host::{HostIdentifier, is_valid_hostname};

/// Service name used when `srvServiceName` is not set.
pub const DEFAULT_SERVICE_NAME: &str = "mongodb";

/// One SRV answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvRecord {
    /// Target hostname, possibly with a trailing dot.
    pub target: String,
    /// Target port.
    pub port: u16,
}

impl SrvRecord {
    /// Create a record.
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
        }
    }
}

/// Failure reported by an [`SrvResolver`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolveError {
    /// Description of the failure.
    pub message: String,
}

impl ResolveError {
    /// Create a resolver error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Asynchronous SRV lookup.
#[async_trait]
pub trait SrvResolver: Send + Sync {
    /// Look up the SRV records for a fully-qualified query such as
    /// `_mongodb._tcp.cluster0.example.com`.
    async fn lookup_srv(&self, query: &str) -> Result<Vec<SrvRecord>, ResolveError>;
}

/// Resolver backed by a fixed table of answers.
#[derive(Debug, Clone, Default)]
pub struct StaticSrvResolver {
    records: HashMap<String, Vec<SrvRecord>>,
    delay: Option<Duration>,
}

impl StaticSrvResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `records`.
    pub fn with_records(mut self, query: impl Into<String>, records: Vec<SrvRecord>) -> Self {
        self.records
            .insert(query.into().to_ascii_lowercase(), records);
        self
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SrvResolver for StaticSrvResolver {
    async fn lookup_srv(&self, query: &str) -> Result<Vec<SrvRecord>, ResolveError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.records
            .get(query.to_ascii_lowercase().as_str())
            .cloned()
            .ok_or_else(|| ResolveError::new(format!("no such name: {}", query)))
    }
}

/// Build the SRV query name for a host.
///
/// ```rust
/// use mongo_uri_core::srv::srv_query;
///
/// assert_eq!(srv_query("cluster0.example.com", "mongodb"), "_mongodb._tcp.cluster0.example.com");
/// ```
pub fn srv_query(host: &str, service_name: &str) -> String {
    format!("_{}._tcp.{}", service_name, host)
}

/// Domain every SRV target must belong to.
fn parent_domain(host: &str) -> &str {
    match host.split_once('.') {
        Some((_, parent)) if parent.contains('.') => parent,
        _ => host,
    }
}

/// Resolve an SRV host into a seed list.
pub(crate) async fn resolve_hosts(
    resolver: &dyn SrvResolver,
    srv_host: &str,
    service_name: Option<&str>,
    max_hosts: Option<i32>,
) -> UriResult<Vec<HostIdentifier>> {
    let query = srv_query(srv_host, service_name.unwrap_or(DEFAULT_SERVICE_NAME));
    debug!(query = %query, "Resolving SRV seed list");

    let records = resolver.lookup_srv(&query).await.map_err(|e| {
        warn!(query = %query, error = %e, "SRV lookup failed");
        UriError::resolution(srv_host, e.message)
    })?;
    if records.is_empty() {
        return Err(UriError::resolution(srv_host, "no SRV records found"));
    }

    let parent = parent_domain(srv_host).to_ascii_lowercase();
    let suffix = format!(".{}", parent);
    let mut hosts = Vec::with_capacity(records.len());
    for record in records {
        let target = record.target.trim_end_matches('.').to_ascii_lowercase();
        if !is_valid_hostname(&target) {
            return Err(UriError::resolution(
                srv_host,
                format!("record target '{}' is not a valid hostname", target),
            ));
        }
        if record.port == 0 {
            return Err(UriError::resolution(
                srv_host,
                format!("record target '{}' has invalid port 0", target),
            ));
        }
        if !target.ends_with(&suffix) {
            return Err(UriError::resolution(
                srv_host,
                format!("record target '{}' is not within domain '{}'", target, parent),
            ));
        }
        hosts.push(HostIdentifier::new(target, Some(record.port)));
    }

    if let Some(max) = max_hosts.and_then(|n| usize::try_from(n).ok()).filter(|n| *n > 0) {
        hosts.truncate(max);
    }

    debug!(hosts = hosts.len(), "SRV seed list resolved");
    Ok(hosts)
}
