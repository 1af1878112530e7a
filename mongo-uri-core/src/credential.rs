//! Authentication credentials.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{UriError, UriResult};
use crate::value::{Document, OptionsMap};

/// Authentication source used by mechanisms that authenticate outside the server.
pub const EXTERNAL_SOURCE: &str = "$external";

/// Authentication database used when nothing else applies.
pub const DEFAULT_SOURCE: &str = "admin";

/// Authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMechanism {
    /// SCRAM with SHA-1.
    #[serde(rename = "SCRAM-SHA-1")]
    ScramSha1,
    /// SCRAM with SHA-256.
    #[serde(rename = "SCRAM-SHA-256")]
    ScramSha256,
    /// Client certificate.
    #[serde(rename = "MONGODB-X509", alias = "X509")]
    X509,
    /// SASL PLAIN (LDAP).
    #[serde(rename = "PLAIN")]
    Plain,
    /// Kerberos.
    #[serde(rename = "GSSAPI")]
    Gssapi,
    /// AWS IAM.
    #[serde(rename = "MONGODB-AWS")]
    Aws,
    /// OpenID Connect.
    #[serde(rename = "MONGODB-OIDC")]
    Oidc,
}

impl AuthMechanism {
    /// Canonical mechanism name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScramSha1 => "SCRAM-SHA-1",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::X509 => "MONGODB-X509",
            Self::Plain => "PLAIN",
            Self::Gssapi => "GSSAPI",
            Self::Aws => "MONGODB-AWS",
            Self::Oidc => "MONGODB-OIDC",
        }
    }

    /// Check if the mechanism authenticates against `$external`.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::X509 | Self::Gssapi | Self::Aws | Self::Oidc)
    }

    /// Property keys the mechanism understands in `authMechanismProperties`.
    pub fn allowed_properties(&self) -> &'static [&'static str] {
        match self {
            Self::Gssapi => &[
                "SERVICE_NAME",
                "CANONICALIZE_HOST_NAME",
                "SERVICE_REALM",
                "SERVICE_HOST",
            ],
            Self::Aws => &["AWS_SESSION_TOKEN"],
            Self::Oidc => &["ENVIRONMENT", "TOKEN_RESOURCE"],
            Self::ScramSha1 | Self::ScramSha256 | Self::X509 | Self::Plain => &[],
        }
    }
}

impl FromStr for AuthMechanism {
    type Err = UriError;

    fn from_str(s: &str) -> UriResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SCRAM-SHA-1" => Ok(Self::ScramSha1),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "MONGODB-X509" | "X509" => Ok(Self::X509),
            "PLAIN" => Ok(Self::Plain),
            "GSSAPI" => Ok(Self::Gssapi),
            "MONGODB-AWS" => Ok(Self::Aws),
            "MONGODB-OIDC" => Ok(Self::Oidc),
            _ => Err(UriError::domain(format!(
                "option 'authMechanism' has unknown value '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication credential.
///
/// `Debug` output never includes the password.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credential {
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Authentication database, when given explicitly.
    pub source: Option<String>,
    /// Authentication mechanism, when given explicitly.
    pub mechanism: Option<AuthMechanism>,
    /// Mechanism properties in the order written.
    pub mechanism_properties: Document,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("mechanism", &self.mechanism)
            .field("mechanism_properties", &self.mechanism_properties)
            .finish()
    }
}

impl Credential {
    /// Create an empty credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the authentication database.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the mechanism.
    pub fn with_mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.mechanism = Some(mechanism);
        self
    }

    /// Add a mechanism property. An existing key keeps its first value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mechanism_properties
            .entry(key.into())
            .or_insert_with(|| value.into());
        self
    }

    /// The authentication database that will actually be used.
    ///
    /// ```rust
    /// use mongo_uri_core::{AuthMechanism, Credential};
    ///
    /// let scram = Credential::new().with_username("app");
    /// assert_eq!(scram.effective_source(Some("orders")), "orders");
    /// assert_eq!(scram.effective_source(None), "admin");
    ///
    /// let x509 = Credential::new().with_mechanism(AuthMechanism::X509);
    /// assert_eq!(x509.effective_source(Some("orders")), "$external");
    /// ```
    pub fn effective_source<'a>(&'a self, database: Option<&'a str>) -> &'a str {
        if let Some(source) = self.source.as_deref() {
            return source;
        }
        match self.mechanism {
            Some(mechanism) if mechanism.is_external() => EXTERNAL_SOURCE,
            _ => database.unwrap_or(DEFAULT_SOURCE),
        }
    }

    /// Check the credential against its mechanism's requirements.
    pub fn validate(&self) -> UriResult<()> {
        if self.username.as_deref() == Some("") {
            return Err(UriError::domain("credential username must not be empty"));
        }
        if self.source.as_deref() == Some("") {
            return Err(UriError::domain("option 'authSource' must not be empty"));
        }
        if let Some(key) = self
            .mechanism_properties
            .iter()
            .find_map(|(key, value)| value.contains(',').then_some(key))
        {
            return Err(UriError::domain(format!(
                "option 'authMechanismProperties' value for '{}' must not contain ','",
                key
            )));
        }

        let Some(mechanism) = self.mechanism else {
            if !self.mechanism_properties.is_empty() {
                return Err(UriError::domain(
                    "option 'authMechanismProperties' requires 'authMechanism'",
                ));
            }
            return Ok(());
        };

        let has_user = self.username.is_some();
        let has_password = self.password.is_some();
        let require = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(UriError::domain(format!(
                    "authMechanism '{}' {}",
                    mechanism, what
                )))
            }
        };

        match mechanism {
            AuthMechanism::ScramSha1 | AuthMechanism::ScramSha256 | AuthMechanism::Plain => {
                require(has_user, "requires a username")?;
                require(has_password, "requires a password")?;
            }
            AuthMechanism::Gssapi => require(has_user, "requires a username")?,
            AuthMechanism::X509 | AuthMechanism::Oidc => {
                require(!has_password, "does not accept a password")?
            }
            AuthMechanism::Aws => require(
                has_user == has_password,
                "requires both username and password, or neither",
            )?,
        }

        if mechanism.is_external() {
            if let Some(source) = self.source.as_deref() {
                require(
                    source == EXTERNAL_SOURCE,
                    "requires authSource to be '$external'",
                )?;
            }
        }

        let allowed = mechanism.allowed_properties();
        if let Some(key) = self
            .mechanism_properties
            .keys()
            .find(|k| !allowed.contains(&k.as_str()))
        {
            return Err(UriError::domain(format!(
                "authMechanismProperties key '{}' is not valid for authMechanism '{}'",
                key, mechanism
            )));
        }

        Ok(())
    }
}

/// Build the credential described by the user-info and the auth options.
///
/// Returns `None` when neither a username nor a mechanism is present; an
/// `authSource` on its own does not create a credential.
pub fn extract(
    username: Option<&str>,
    password: Option<&str>,
    options: &OptionsMap,
) -> UriResult<Option<Credential>> {
    let mechanism = options
        .get_str("authMechanism")?
        .map(AuthMechanism::from_str)
        .transpose()?;

    if username.is_none() && mechanism.is_none() {
        if options.contains("authMechanismProperties") {
            return Err(UriError::domain(
                "option 'authMechanismProperties' requires 'authMechanism'",
            ));
        }
        return Ok(None);
    }

    let credential = Credential {
        username: username.map(str::to_string),
        password: password.map(str::to_string),
        source: options.get_str("authSource")?.map(str::to_string),
        mechanism,
        mechanism_properties: options
            .get_document("authMechanismProperties")?
            .cloned()
            .unwrap_or_default(),
    };
    credential.validate()?;

    debug!(
        mechanism = ?credential.mechanism,
        has_username = credential.username.is_some(),
        "Credential extracted"
    );
    Ok(Some(credential))
}
