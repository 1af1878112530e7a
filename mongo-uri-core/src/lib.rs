//! # mongo-uri-core
//!
//! Parsing, merging and validation of MongoDB connection strings.
//!
//! A URI goes through four stages:
//! - tokenizing the `mongodb://` or `mongodb+srv://` grammar ([`parser`])
//! - typing every recognised option against the option table ([`registry`])
//! - merging caller-supplied [`ClientOptions`] field by field
//! - checking cross-option conflicts ([`validate`])
//!
//! Any failure rejects the whole string. SRV seed lists are resolved
//! asynchronously through a pluggable [`SrvResolver`].
//!
//! ## Parsing
//!
//! ```rust
//! use mongo_uri_core::{ConnectionString, ReadPreference};
//!
//! let conn = ConnectionString::parse(
//!     "mongodb://localhost:27017,localhost:27018/app?replicaSet=rs0&readPreference=secondary",
//! )
//! .unwrap();
//! assert_eq!(conn.hosts().len(), 2);
//! assert_eq!(conn.read_preference(), Some(ReadPreference::Secondary));
//! ```
//!
//! ## Overrides
//!
//! ```rust
//! use mongo_uri_core::{ClientOptions, ConnectionString};
//!
//! let overrides = ClientOptions::builder().app_name("reporting").build().unwrap();
//! let conn = ConnectionString::parse_with("mongodb://localhost/?appName=default", &overrides).unwrap();
//! assert_eq!(conn.app_name(), Some("reporting"));
//! ```
//!
//! ## Errors
//!
//! ```rust
//! use mongo_uri_core::{ConnectionString, InvalidArgumentKind};
//!
//! let err = ConnectionString::parse("mongodb://a,b/?directConnection=true").unwrap_err();
//! assert_eq!(err.invalid_argument_kind(), Some(InvalidArgumentKind::Conflict));
//! ```

pub mod compression;
pub mod connection_string;
pub mod credential;
pub mod error;
pub mod host;
pub mod logging;
pub mod options;
pub mod parser;
pub mod registry;
pub mod srv;
pub mod validate;
pub mod value;

pub use compression::{Compressor, CompressorSpec};
pub use connection_string::ConnectionString;
pub use credential::{AuthMechanism, Credential};
pub use error::{InvalidArgumentKind, UriError, UriResult};
pub use host::HostIdentifier;
pub use options::{ClientOptions, ClientOptionsBuilder, ReadPreference};
pub use parser::{ParsedUri, Scheme, parse_uri};
pub use srv::{ResolveError, SrvRecord, SrvResolver, StaticSrvResolver};
pub use value::{Document, OptionValue, OptionsMap};

pub use logging::{init as init_logging, init_with_level, is_debug_enabled, log_format, log_level};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::compression::{Compressor, CompressorSpec};
    pub use crate::connection_string::ConnectionString;
    pub use crate::credential::{AuthMechanism, Credential};
    pub use crate::error::{InvalidArgumentKind, UriError, UriResult};
    pub use crate::host::HostIdentifier;
    pub use crate::options::{ClientOptions, ReadPreference};
    pub use crate::srv::{SrvResolver, StaticSrvResolver};
}
