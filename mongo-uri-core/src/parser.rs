//! Connection string grammar.
//!
//! ```text
//! mongodb://[username[:password]@]host[:port][,host[:port]...][/[database]][?key=value[&key=value...]]
//! mongodb+srv://[username[:password]@]host[/[database]][?key=value[&key=value...]]
//! ```
//!
//! This stage only tokenizes. Option values stay raw strings here; typing and
//! range checks belong to the [registry](crate::registry).

use std::fmt;
use tracing::debug;

use crate::error::{UriError, UriResult};
use crate::host::HostIdentifier;

/// Connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `mongodb://` with an explicit seed list.
    Standard,
    /// `mongodb+srv://` with a seed list discovered through DNS.
    Srv,
}

impl Scheme {
    /// The scheme name without `://`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "mongodb",
            Self::Srv => "mongodb+srv",
        }
    }

    /// The scheme followed by `://`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Standard => "mongodb://",
            Self::Srv => "mongodb+srv://",
        }
    }

    /// Check if this is the SRV scheme.
    pub fn is_srv(&self) -> bool {
        matches!(self, Self::Srv)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tokens of a connection string, before any option is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    /// URI scheme.
    pub scheme: Scheme,
    /// Seed list in the order written.
    pub hosts: Vec<HostIdentifier>,
    /// Default database, if one is named.
    pub database: Option<String>,
    /// Percent-decoded username.
    pub username: Option<String>,
    /// Percent-decoded password.
    pub password: Option<String>,
    /// Option pairs in the order written, keys lower-cased.
    pub options: Vec<(String, String)>,
}

impl ParsedUri {
    /// Get the last raw value written for an option.
    pub fn option(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.options
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

const USERINFO_RESERVED: &[char] = &[':', '/', '?', '#', '[', ']', '@'];
const DATABASE_FORBIDDEN: &[char] = &['/', '\\', ' ', '"', '$', '.'];

/// Tokenize a connection string.
pub fn parse_uri(uri: &str) -> UriResult<ParsedUri> {
    let (scheme, rest) = if let Some(rest) = uri.strip_prefix(Scheme::Srv.prefix()) {
        (Scheme::Srv, rest)
    } else if let Some(rest) = uri.strip_prefix(Scheme::Standard.prefix()) {
        (Scheme::Standard, rest)
    } else if let Some((scheme, _)) = uri.split_once("://") {
        return Err(UriError::grammar(format!("unsupported scheme '{}'", scheme)));
    } else {
        return Err(UriError::grammar(
            "missing scheme (expected mongodb:// or mongodb+srv://)",
        ));
    };

    let (head, query) = match rest.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (rest, None),
    };

    let (authority, path) = match head.split_once('/') {
        Some((authority, path)) => (authority, Some(path)),
        None => (head, None),
    };
    let (userinfo, host_list) = match authority.rsplit_once('@') {
        Some((userinfo, hosts)) => (Some(userinfo), hosts),
        None => (None, authority),
    };
    let (username, password) = match userinfo {
        Some(userinfo) => parse_userinfo(userinfo)?,
        None => (None, None),
    };
    let database = match path {
        Some(path) => parse_database(path)?,
        None => None,
    };

    if host_list.is_empty() {
        return Err(UriError::grammar("connection string contains no hosts"));
    }
    let hosts = host_list
        .split(',')
        .map(HostIdentifier::parse)
        .collect::<UriResult<Vec<_>>>()?;

    if scheme.is_srv() {
        if hosts.len() != 1 {
            return Err(UriError::grammar(format!(
                "{} requires exactly one host, found {}",
                scheme.prefix(),
                hosts.len()
            )));
        }
        if hosts[0].port().is_some() {
            return Err(UriError::grammar(format!(
                "{} host '{}' must not specify a port",
                scheme.prefix(),
                host_list
            )));
        }
        if hosts[0].is_unix_socket() {
            return Err(UriError::grammar(format!(
                "{} host must not be a unix socket",
                scheme.prefix()
            )));
        }
    }

    let options = match query {
        Some(query) => parse_options(query)?,
        None => Vec::new(),
    };

    debug!(
        scheme = %scheme,
        hosts = hosts.len(),
        database = ?database,
        options = options.len(),
        "URI tokenized"
    );

    Ok(ParsedUri {
        scheme,
        hosts,
        database,
        username,
        password,
        options,
    })
}

fn parse_userinfo(userinfo: &str) -> UriResult<(Option<String>, Option<String>)> {
    let (user, pass) = match userinfo.split_once(':') {
        Some((user, pass)) => (user, Some(pass)),
        None => (userinfo, None),
    };

    for part in std::iter::once(user).chain(pass) {
        if let Some(c) = part.chars().find(|c| USERINFO_RESERVED.contains(c)) {
            return Err(UriError::grammar(format!(
                "user info contains unescaped '{}'; percent-encode it",
                c
            )));
        }
    }

    let user = url_decode(user)?;
    if user.is_empty() {
        return Err(UriError::grammar("username must not be empty"));
    }
    let pass = pass.map(url_decode).transpose()?;
    Ok((Some(user), pass))
}

fn parse_database(raw: &str) -> UriResult<Option<String>> {
    if raw.contains('@') {
        return Err(UriError::grammar(format!(
            "database name '{}' contains unescaped '@'; percent-encode it",
            raw
        )));
    }
    let database = url_decode(raw)?;
    if database.is_empty() {
        return Ok(None);
    }
    if let Some(c) = database.chars().find(|c| DATABASE_FORBIDDEN.contains(c)) {
        return Err(UriError::grammar(format!(
            "database name '{}' contains illegal character '{}'",
            database, c
        )));
    }
    Ok(Some(database))
}

fn parse_options(query: &str) -> UriResult<Vec<(String, String)>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                UriError::grammar(format!("option '{}' is missing '=value'", pair))
            })?;
            let key = url_decode(key)?.to_ascii_lowercase();
            if key.is_empty() {
                return Err(UriError::grammar(format!("option '{}' has an empty key", pair)));
            }
            Ok((key, url_decode(value)?))
        })
        .collect()
}

/// Percent-decode a URI component.
pub(crate) fn url_decode(s: &str) -> UriResult<String> {
    if !s.contains('%') {
        return Ok(s.to_string());
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    UriError::grammar(format!("invalid percent-encoding in '{}'", s))
                })?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out)
        .map_err(|_| UriError::grammar(format!("percent-decoded '{}' is not valid UTF-8", s)))
}

/// Percent-encode everything outside the unreserved set.
pub(crate) fn url_encode(s: &str) -> String {
    encode_with(s, &[])
}

/// Percent-encode an option value. `,`, `:` and `$` stay readable.
pub(crate) fn url_encode_value(s: &str) -> String {
    encode_with(s, &[',', ':', '$'])
}

fn encode_with(s: &str, keep: &[char]) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            c if keep.contains(&c) => result.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    result.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    result
}
