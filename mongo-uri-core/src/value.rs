//! Typed option values and the option map.

use indexmap::IndexMap;
use std::fmt;

use crate::error::{UriError, UriResult};

/// Ordered string-to-string mapping used by document-valued options.
pub type Document = IndexMap<String, String>;

/// A coerced option value.
///
/// Consumers read values through the fallible `expect_*` accessors, which fail
/// with a domain error when the stored variant is not the one the option needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// `true` / `false`.
    Boolean(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// Free-form string.
    String(String),
    /// Comma-separated list.
    StringList(Vec<String>),
    /// Comma-separated `key:value` pairs.
    Document(Document),
}

impl OptionValue {
    /// Name of the variant, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::String(_) => "string",
            Self::StringList(_) => "string list",
            Self::Document(_) => "document",
        }
    }

    /// Get the boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer, if this is an integer.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list, if this is a string list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(items) => Some(items),
            _ => None,
        }
    }

    /// Get the document, if this is a document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Read a boolean for `option`, failing on any other variant.
    pub fn expect_bool(&self, option: &str) -> UriResult<bool> {
        self.as_bool().ok_or_else(|| self.mismatch(option, "boolean"))
    }

    /// Read an integer for `option`, failing on any other variant.
    pub fn expect_i32(&self, option: &str) -> UriResult<i32> {
        self.as_i32().ok_or_else(|| self.mismatch(option, "int32"))
    }

    /// Read a string for `option`, failing on any other variant.
    pub fn expect_str(&self, option: &str) -> UriResult<&str> {
        self.as_str().ok_or_else(|| self.mismatch(option, "string"))
    }

    /// Read a string list for `option`, failing on any other variant.
    pub fn expect_list(&self, option: &str) -> UriResult<&[String]> {
        self.as_list().ok_or_else(|| self.mismatch(option, "string list"))
    }

    /// Read a document for `option`, failing on any other variant.
    pub fn expect_document(&self, option: &str) -> UriResult<&Document> {
        self.as_document()
            .ok_or_else(|| self.mismatch(option, "document"))
    }

    fn mismatch(&self, option: &str, expected: &str) -> UriError {
        UriError::domain(format!(
            "option '{}' expects a {} value, found {}",
            option,
            expected,
            self.type_name()
        ))
    }
}

impl fmt::Display for OptionValue {
    /// Renders the value the way it is written in a URI, before percent-encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Int32(n) => write!(f, "{}", n),
            Self::String(s) => f.write_str(s),
            Self::StringList(items) => f.write_str(&items.join(",")),
            Self::Document(doc) => {
                let pairs: Vec<_> = doc.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                f.write_str(&pairs.join(","))
            }
        }
    }
}

/// Option values keyed by lower-cased option name, in insertion order.
///
/// Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsMap {
    entries: IndexMap<String, OptionValue>,
}

impl OptionsMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the value it replaced.
    pub fn insert(&mut self, name: &str, value: OptionValue) -> Option<OptionValue> {
        self.entries.insert(name.to_ascii_lowercase(), value)
    }

    /// Get a value by (case-insensitive) name.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.get(name.to_ascii_lowercase().as_str())
    }

    /// Remove a value, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.entries.shift_remove(name.to_ascii_lowercase().as_str())
    }

    /// Check if a value is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no options are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lower-cased name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Typed read of a boolean option.
    pub fn get_bool(&self, name: &str) -> UriResult<Option<bool>> {
        self.get(name).map(|v| v.expect_bool(name)).transpose()
    }

    /// Typed read of an integer option.
    pub fn get_i32(&self, name: &str) -> UriResult<Option<i32>> {
        self.get(name).map(|v| v.expect_i32(name)).transpose()
    }

    /// Typed read of a string option.
    pub fn get_str(&self, name: &str) -> UriResult<Option<&str>> {
        self.get(name).map(|v| v.expect_str(name)).transpose()
    }

    /// Typed read of a string-list option.
    pub fn get_list(&self, name: &str) -> UriResult<Option<&[String]>> {
        self.get(name).map(|v| v.expect_list(name)).transpose()
    }

    /// Typed read of a document option.
    pub fn get_document(&self, name: &str) -> UriResult<Option<&Document>> {
        self.get(name).map(|v| v.expect_document(name)).transpose()
    }

    /// `true` only if the option is present and set to `true`.
    pub fn is_true(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptionValue::Boolean(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut map = OptionsMap::new();
        map.insert("appName", OptionValue::String("billing".into()));
        assert_eq!(map.get_str("APPNAME").unwrap(), Some("billing"));
        assert_eq!(map.iter().next().unwrap().0, "appname");
    }

    #[test]
    fn test_typed_access_rejects_wrong_variant() {
        let mut map = OptionsMap::new();
        map.insert("tls", OptionValue::String("yes".into()));
        let err = map.get_bool("tls").unwrap_err();
        assert!(err.to_string().contains("expects a boolean value, found string"));
        assert_eq!(map.get_bool("directConnection").unwrap(), None);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = OptionsMap::new();
        map.insert("a", OptionValue::Int32(1));
        map.insert("b", OptionValue::Int32(2));
        let previous = map.insert("A", OptionValue::Int32(3));
        assert_eq!(previous, Some(OptionValue::Int32(1)));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut left = OptionsMap::new();
        left.insert("a", OptionValue::Boolean(true));
        left.insert("b", OptionValue::Int32(5));
        let mut right = OptionsMap::new();
        right.insert("b", OptionValue::Int32(5));
        right.insert("a", OptionValue::Boolean(true));
        assert_eq!(left, right);
    }

    #[test]
    fn test_display() {
        let mut doc = Document::new();
        doc.insert("SERVICE_NAME".into(), "mongodb".into());
        doc.insert("CANONICALIZE_HOST_NAME".into(), "true".into());
        assert_eq!(
            OptionValue::Document(doc).to_string(),
            "SERVICE_NAME:mongodb,CANONICALIZE_HOST_NAME:true"
        );
        assert_eq!(
            OptionValue::StringList(vec!["zlib".into(), "snappy".into()]).to_string(),
            "zlib,snappy"
        );
        assert_eq!(OptionValue::Int32(-1).to_string(), "-1");
    }
}
