//! Seed-list host identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv6Addr;

use crate::error::{UriError, UriResult};
use crate::parser::{url_decode, url_encode};

/// Port a server listens on when the URI does not name one.
pub const DEFAULT_PORT: u16 = 27017;

/// A host and optional port from the seed list.
///
/// The host is a hostname, an IPv4 literal, an IPv6 literal (stored without
/// brackets) or a unix-domain socket path. Equality and hashing ignore ASCII
/// case in the host, except for socket paths.
#[derive(Debug, Clone)]
pub struct HostIdentifier {
    host: String,
    port: Option<u16>,
}

impl HostIdentifier {
    /// Create a host identifier without validation.
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a raw host token as it appears in a URI.
    ///
    /// ```rust
    /// use mongo_uri_core::HostIdentifier;
    ///
    /// let host = HostIdentifier::parse("[::1]:27018").unwrap();
    /// assert_eq!(host.host(), "::1");
    /// assert_eq!(host.port(), Some(27018));
    ///
    /// let socket = HostIdentifier::parse("%2Ftmp%2Fmongodb-27017.sock").unwrap();
    /// assert!(socket.is_unix_socket());
    /// assert_eq!(socket.host(), "/tmp/mongodb-27017.sock");
    /// ```
    pub fn parse(token: &str) -> UriResult<Self> {
        if token.is_empty() {
            return Err(UriError::grammar("empty host in seed list"));
        }

        if let Some(literal) = token.strip_prefix('[') {
            let close = literal.find(']').ok_or_else(|| {
                UriError::grammar(format!("unterminated IPv6 literal in host '{}'", token))
            })?;
            let address = &literal[..close];
            address.parse::<Ipv6Addr>().map_err(|_| {
                UriError::grammar(format!("invalid IPv6 address '{}'", address))
            })?;
            let port = match &literal[close + 1..] {
                "" => None,
                rest => match rest.strip_prefix(':') {
                    Some(port) => Some(parse_port(port, token)?),
                    None => {
                        return Err(UriError::grammar(format!(
                            "unexpected characters after IPv6 literal in host '{}'",
                            token
                        )));
                    }
                },
            };
            return Ok(Self::new(address, port));
        }

        let decoded = url_decode(token)?;
        if decoded.ends_with(".sock") {
            return Ok(Self::new(decoded, None));
        }

        let (name, port) = match token.rsplit_once(':') {
            Some((name, port)) => (name, Some(parse_port(port, token)?)),
            None => (token, None),
        };

        if name.contains(':') {
            return Err(UriError::grammar(format!(
                "IPv6 address in host '{}' must be enclosed in brackets",
                token
            )));
        }
        if !is_valid_hostname(name) {
            return Err(UriError::grammar(format!("invalid host '{}'", token)));
        }

        Ok(Self::new(name, port))
    }

    /// The host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, if any.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The explicit port or [`DEFAULT_PORT`]. Sockets have no port.
    pub fn port_or_default(&self) -> Option<u16> {
        if self.is_unix_socket() {
            None
        } else {
            Some(self.port.unwrap_or(DEFAULT_PORT))
        }
    }

    /// Check if this is a unix-domain socket path.
    pub fn is_unix_socket(&self) -> bool {
        self.host.ends_with(".sock")
    }

    /// Check if this is an IPv6 literal.
    pub fn is_ipv6(&self) -> bool {
        !self.is_unix_socket() && self.host.contains(':')
    }
}

/// Check if `name` is a non-empty hostname or IPv4 literal.
pub(crate) fn is_valid_hostname(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

fn parse_port(port: &str, token: &str) -> UriResult<u16> {
    let invalid = || UriError::grammar(format!("invalid port '{}' in host '{}'", port, token));

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match port.parse::<u32>() {
        Ok(n) if (1..=u16::MAX as u32).contains(&n) => Ok(n as u16),
        _ => Err(invalid()),
    }
}

impl PartialEq for HostIdentifier {
    fn eq(&self, other: &Self) -> bool {
        if self.port != other.port {
            return false;
        }
        if self.is_unix_socket() || other.is_unix_socket() {
            self.host == other.host
        } else {
            self.host.eq_ignore_ascii_case(&other.host)
        }
    }
}

impl Eq for HostIdentifier {}

impl Hash for HostIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_unix_socket() {
            self.host.hash(state);
        } else {
            self.host.to_ascii_lowercase().hash(state);
        }
        self.port.hash(state);
    }
}

impl fmt::Display for HostIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unix_socket() {
            f.write_str(&url_encode(&self.host))?;
        } else if self.is_ipv6() {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}
