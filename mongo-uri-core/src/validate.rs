//! Cross-option conflict rules.
//!
//! Rules run in a fixed order against the merged configuration and stop at
//! the first violation.

use tracing::trace;

use crate::connection_string::ConnectionString;
use crate::error::{UriError, UriResult};

type Rule = fn(&ConnectionString) -> UriResult<()>;

const RULES: &[(&str, Rule)] = &[
    ("tls_insecure_exclusive", tls_insecure_exclusive),
    ("direct_connection_not_srv", direct_connection_not_srv),
    ("direct_connection_single_host", direct_connection_single_host),
    ("load_balanced_single_host", load_balanced_single_host),
    ("load_balanced_without_replica_set", load_balanced_without_replica_set),
    ("load_balanced_not_direct", load_balanced_not_direct),
    ("srv_options_need_srv", srv_options_need_srv),
    ("srv_max_hosts_without_replica_set", srv_max_hosts_without_replica_set),
    ("srv_max_hosts_not_load_balanced", srv_max_hosts_not_load_balanced),
    ("max_staleness_needs_secondary_reads", max_staleness_needs_secondary_reads),
];

/// Run every rule in order, returning the first violation.
pub fn validate(conn: &ConnectionString) -> UriResult<()> {
    for (name, rule) in RULES {
        rule(conn)?;
        trace!(rule = name, "Rule passed");
    }
    Ok(())
}

fn tls_insecure_exclusive(conn: &ConnectionString) -> UriResult<()> {
    let options = conn.options();
    if !options.is_true("tlsInsecure") {
        return Ok(());
    }
    for other in ["tlsAllowInvalidCertificates", "tlsAllowInvalidHostnames"] {
        if options.is_true(other) {
            return Err(UriError::conflict(format!(
                "tlsInsecure cannot be combined with {}",
                other
            )));
        }
    }
    Ok(())
}

fn direct_connection_not_srv(conn: &ConnectionString) -> UriResult<()> {
    if conn.options().is_true("directConnection") && conn.scheme().is_srv() {
        return Err(UriError::conflict(
            "directConnection=true is incompatible with mongodb+srv://",
        ));
    }
    Ok(())
}

fn direct_connection_single_host(conn: &ConnectionString) -> UriResult<()> {
    if conn.options().is_true("directConnection") && conn.hosts().len() > 1 {
        return Err(UriError::conflict(format!(
            "directConnection=true requires exactly one host, found {}",
            conn.hosts().len()
        )));
    }
    Ok(())
}

fn load_balanced_single_host(conn: &ConnectionString) -> UriResult<()> {
    if conn.options().is_true("loadBalanced") && conn.hosts().len() > 1 {
        return Err(UriError::conflict(format!(
            "loadBalanced=true requires exactly one host, found {}",
            conn.hosts().len()
        )));
    }
    Ok(())
}

fn load_balanced_without_replica_set(conn: &ConnectionString) -> UriResult<()> {
    if conn.options().is_true("loadBalanced") && conn.options().contains("replicaSet") {
        return Err(UriError::conflict(
            "loadBalanced=true is incompatible with replicaSet",
        ));
    }
    Ok(())
}

fn load_balanced_not_direct(conn: &ConnectionString) -> UriResult<()> {
    if conn.options().is_true("loadBalanced") && conn.options().is_true("directConnection") {
        return Err(UriError::conflict(
            "loadBalanced=true is incompatible with directConnection=true",
        ));
    }
    Ok(())
}

fn srv_options_need_srv(conn: &ConnectionString) -> UriResult<()> {
    if conn.scheme().is_srv() {
        return Ok(());
    }
    for option in ["srvMaxHosts", "srvServiceName"] {
        if conn.options().contains(option) {
            return Err(UriError::conflict(format!(
                "{} requires the mongodb+srv:// scheme",
                option
            )));
        }
    }
    Ok(())
}

fn srv_max_hosts(conn: &ConnectionString) -> UriResult<i32> {
    Ok(conn.options().get_i32("srvMaxHosts")?.unwrap_or(0))
}

fn srv_max_hosts_without_replica_set(conn: &ConnectionString) -> UriResult<()> {
    if srv_max_hosts(conn)? > 0 && conn.options().contains("replicaSet") {
        return Err(UriError::conflict(
            "srvMaxHosts is incompatible with replicaSet",
        ));
    }
    Ok(())
}

fn srv_max_hosts_not_load_balanced(conn: &ConnectionString) -> UriResult<()> {
    if srv_max_hosts(conn)? > 0 && conn.options().is_true("loadBalanced") {
        return Err(UriError::conflict(
            "srvMaxHosts is incompatible with loadBalanced=true",
        ));
    }
    Ok(())
}

fn max_staleness_needs_secondary_reads(conn: &ConnectionString) -> UriResult<()> {
    let options = conn.options();
    let staleness = options.get_i32("maxStalenessSeconds")?.unwrap_or(-1);
    if staleness == -1 {
        return Ok(());
    }
    let mode = options.get_str("readPreference")?.unwrap_or("primary");
    if mode == "primary" {
        return Err(UriError::conflict(
            "maxStalenessSeconds cannot be combined with readPreference=primary",
        ));
    }
    Ok(())
}
