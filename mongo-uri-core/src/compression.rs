//! Wire compression selection.
//!
//! Names that arrive through the URI are passed through even when this crate
//! does not know them, since the final list is negotiated with the server
//! later. Names that arrive through [`ClientOptions`](crate::ClientOptions)
//! must be known.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{UriError, UriResult};
use crate::registry;
use crate::value::{OptionValue, OptionsMap};

/// Compression algorithms this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compressor {
    /// Snappy.
    Snappy,
    /// zlib, with an optional level.
    Zlib,
    /// Zstandard.
    Zstd,
}

impl Compressor {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Zlib => "zlib",
            Self::Zstd => "zstd",
        }
    }

    /// Look up a compressor by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zlib" => Some(Self::Zlib),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compressor selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressorSpec {
    /// Algorithm name as given.
    pub name: String,
    /// Compression level; only meaningful for zlib, where -1 means the library default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

impl CompressorSpec {
    /// Select an algorithm by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
        }
    }

    /// Select zlib at the given level.
    pub fn zlib(level: i32) -> Self {
        Self::new(Compressor::Zlib.as_str()).with_level(level)
    }

    /// Set the level.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// The known algorithm, if the name is recognised.
    pub fn compressor(&self) -> Option<Compressor> {
        Compressor::from_name(&self.name)
    }

    /// Check if this selects zlib.
    pub fn is_zlib(&self) -> bool {
        self.compressor() == Some(Compressor::Zlib)
    }
}

impl From<Compressor> for CompressorSpec {
    fn from(compressor: Compressor) -> Self {
        Self::new(compressor.as_str())
    }
}

/// Check a zlib level against `[-1, 9]`.
pub fn check_level(level: i32) -> UriResult<()> {
    registry::check_named("zlibCompressionLevel", &OptionValue::Int32(level))
}

fn check_duplicates<'a>(names: impl IntoIterator<Item = &'a str>) -> UriResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(UriError::domain(format!(
                "compressor '{}' is specified more than once",
                name
            )));
        }
    }
    Ok(())
}

/// Validate a compressor list supplied through [`ClientOptions`](crate::ClientOptions).
pub fn check_override(specs: &[CompressorSpec]) -> UriResult<()> {
    for spec in specs {
        let compressor = spec.compressor().ok_or_else(|| {
            UriError::domain(format!("compressor '{}' is not supported", spec.name))
        })?;
        if let Some(level) = spec.level {
            if compressor != Compressor::Zlib {
                return Err(UriError::domain(format!(
                    "compressor '{}' does not accept a level",
                    spec.name
                )));
            }
            check_level(level)?;
        }
    }
    check_duplicates(specs.iter().map(|s| s.name.as_str()))
}

/// Build the effective compressor list from the merged options.
pub fn negotiate(options: &OptionsMap) -> UriResult<Vec<CompressorSpec>> {
    let names = options.get_list("compressors")?.unwrap_or_default();
    let level = options.get_i32("zlibCompressionLevel")?;
    if let Some(level) = level {
        check_level(level)?;
    }
    check_duplicates(names.iter().map(String::as_str))?;

    let specs: Vec<CompressorSpec> = names
        .iter()
        .map(|name| {
            let mut spec = CompressorSpec::new(name.as_str());
            match spec.compressor() {
                Some(Compressor::Zlib) => spec.level = level,
                Some(_) => {}
                None => debug!(compressor = %name, "Unknown compressor passed through"),
            }
            spec
        })
        .collect();

    debug!(count = specs.len(), "Compressors negotiated");
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(names: &[&str], level: Option<i32>) -> OptionsMap {
        let mut map = OptionsMap::new();
        map.insert(
            "compressors",
            OptionValue::StringList(names.iter().map(|n| n.to_string()).collect()),
        );
        if let Some(level) = level {
            map.insert("zlibCompressionLevel", OptionValue::Int32(level));
        }
        map
    }

    #[test]
    fn test_negotiate_applies_level_to_zlib_only() {
        let specs = negotiate(&options(&["snappy", "zlib"], Some(6))).unwrap();
        assert_eq!(
            specs,
            vec![CompressorSpec::new("snappy"), CompressorSpec::zlib(6)]
        );
    }

    #[test]
    fn test_negotiate_passes_unknown_through() {
        let specs = negotiate(&options(&["lz4", "zstd"], None)).unwrap();
        assert_eq!(specs[0].name, "lz4");
        assert_eq!(specs[0].compressor(), None);
        assert_eq!(specs[1].compressor(), Some(Compressor::Zstd));
    }

    #[test]
    fn test_negotiate_rejects_duplicates() {
        let err = negotiate(&options(&["zlib", "snappy", "ZLIB"], None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: compressor 'ZLIB' is specified more than once"
        );
    }

    #[test]
    fn test_negotiate_empty() {
        assert!(negotiate(&OptionsMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_level_bounds() {
        assert!(check_level(-1).is_ok());
        assert!(check_level(9).is_ok());
        assert!(check_level(-2).is_err());
        assert!(check_level(10).is_err());
    }

    #[test]
    fn test_override_rules() {
        assert!(check_override(&[CompressorSpec::zlib(9), Compressor::Snappy.into()]).is_ok());

        let err = check_override(&[CompressorSpec::new("lz4")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: compressor 'lz4' is not supported");

        assert!(check_override(&[CompressorSpec::new("zstd").with_level(3)]).is_err());
        assert!(check_override(&[CompressorSpec::zlib(10)]).is_err());
        assert!(check_override(&[CompressorSpec::zlib(1), CompressorSpec::zlib(2)]).is_err());
    }
}
