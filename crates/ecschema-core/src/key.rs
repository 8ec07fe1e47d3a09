//! Schema identity: three-part versions, schema keys, and match semantics
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Returns true when `name` is a valid EC name: a letter or underscore
/// followed by letters, digits, or underscores.
pub fn is_valid_ec_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Three-part schema version
///
/// The read component changes when existing consumers can no longer read
/// the schema, the write component when they can no longer safely write to
/// it, and the minor component for additive changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub read: u32,
    pub write: u32,
    pub minor: u32,
}

impl SchemaVersion {
    /// Create a new version
    pub fn new(read: u32, write: u32, minor: u32) -> Self {
        Self { read, write, minor }
    }

    /// Parse a version string in `read.write.minor` form
    ///
    /// Exactly three dot-separated non-negative integer components are
    /// required; anything else fails with `Error::InvalidVersion`.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::invalid_version(
                version_str,
                "expected exactly three components in 'read.write.minor' form",
            ));
        }

        let mut components = [0u32; 3];
        for (idx, part) in parts.iter().enumerate() {
            components[idx] = part.trim().parse::<u32>().map_err(|_| {
                Error::invalid_version(
                    version_str,
                    format!("component '{}' is not a non-negative integer", part),
                )
            })?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.read, self.write, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How a candidate schema version may satisfy a requested key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaMatchType {
    /// Same name and exact version triple
    Identical,
    /// Treated like [`SchemaMatchType::Identical`] when comparing keys
    Exact,
    /// Same name and read version; candidate (write, minor) at least the requested pair
    LatestReadCompatible,
    /// Same name, read, and write version; candidate minor at least the requested minor
    LatestWriteCompatible,
    /// Same name, any version
    Latest,
}

/// Identity of a schema: case-insensitive name plus version
#[derive(Debug, Clone)]
pub struct SchemaKey {
    pub name: String,
    pub version: SchemaVersion,
}

impl SchemaKey {
    /// Create a new key
    pub fn new(name: impl Into<String>, version: SchemaVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse a key string in `Name.read.write.minor` form
    pub fn parse(key_str: &str) -> Result<Self> {
        let (name, version) = key_str.split_once('.').ok_or_else(|| {
            Error::invalid_version(key_str, "expected 'Name.read.write.minor' form")
        })?;
        if !is_valid_ec_name(name) {
            return Err(Error::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self::new(name, SchemaVersion::parse(version)?))
    }

    /// Case-insensitive name comparison
    pub fn compare_by_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true when `candidate` satisfies a request for this key under
    /// the given match type
    pub fn matches(&self, candidate: &SchemaKey, match_type: SchemaMatchType) -> bool {
        if !self.compare_by_name(&candidate.name) {
            return false;
        }
        let (req, cand) = (&self.version, &candidate.version);
        match match_type {
            SchemaMatchType::Identical | SchemaMatchType::Exact => req == cand,
            SchemaMatchType::LatestReadCompatible => {
                cand.read == req.read && (cand.write, cand.minor) >= (req.write, req.minor)
            }
            SchemaMatchType::LatestWriteCompatible => {
                cand.read == req.read && cand.write == req.write && cand.minor >= req.minor
            }
            SchemaMatchType::Latest => true,
        }
    }
}

impl PartialEq for SchemaKey {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for SchemaKey {}

impl Hash for SchemaKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        self.version.hash(state);
    }
}

impl PartialOrd for SchemaKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_name = self
            .name
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.name.bytes().map(|b| b.to_ascii_lowercase()));
        match by_name {
            Ordering::Equal => self.version.cmp(&other.version),
            unequal => unequal,
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.version)
    }
}

/// Identity of a schema item: owning schema name plus item name
#[derive(Debug, Clone)]
pub struct SchemaItemKey {
    pub schema_name: String,
    pub item_name: String,
}

impl SchemaItemKey {
    /// Create a new item key
    pub fn new(schema_name: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            item_name: item_name.into(),
        }
    }

    /// Parse a full item name in `Schema.Item` form
    pub fn parse(full_name: &str) -> Result<Self> {
        match full_name.split_once('.') {
            Some((schema, item)) if is_valid_ec_name(schema) && is_valid_ec_name(item) => {
                Ok(Self::new(schema, item))
            }
            _ => Err(Error::InvalidName {
                name: full_name.to_string(),
            }),
        }
    }

    /// The `Schema.Item` spelling used by the canonical JSON form
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.item_name)
    }
}

impl PartialEq for SchemaItemKey {
    fn eq(&self, other: &Self) -> bool {
        self.schema_name.eq_ignore_ascii_case(&other.schema_name)
            && self.item_name.eq_ignore_ascii_case(&other.item_name)
    }
}

impl Eq for SchemaItemKey {}

impl Hash for SchemaItemKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.schema_name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        for byte in self.item_name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for SchemaItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.item_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_version() {
        let version = SchemaVersion::parse("1.2.3").unwrap();
        assert_eq!(version, SchemaVersion::new(1, 2, 3));
    }

    #[test]
    fn test_parse_padded_version() {
        let version = SchemaVersion::parse("01.00.12").unwrap();
        assert_eq!(version, SchemaVersion::new(1, 0, 12));
    }

    #[test]
    fn test_parse_rejects_wrong_component_count() {
        assert!(SchemaVersion::parse("1.2").is_err());
        assert!(SchemaVersion::parse("1.2.3.4").is_err());
        assert!(SchemaVersion::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_components() {
        assert!(SchemaVersion::parse("1.x.3").is_err());
        assert!(SchemaVersion::parse("-1.0.0").is_err());
        assert!(matches!(
            SchemaVersion::parse("1.2.three"),
            Err(Error::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_display_pads_components() {
        assert_eq!(SchemaVersion::new(1, 0, 2).to_string(), "01.00.02");
        assert_eq!(SchemaVersion::new(10, 20, 103).to_string(), "10.20.103");
    }

    #[test]
    fn test_version_ordering() {
        let v100 = SchemaVersion::new(1, 0, 0);
        let v102 = SchemaVersion::new(1, 0, 2);
        let v110 = SchemaVersion::new(1, 1, 0);
        let v200 = SchemaVersion::new(2, 0, 0);
        assert!(v100 < v102);
        assert!(v102 < v110);
        assert!(v110 < v200);
    }

    #[test]
    fn test_key_parse_and_display() {
        let key = SchemaKey::parse("BisCore.1.0.4").unwrap();
        assert_eq!(key.name, "BisCore");
        assert_eq!(key.version, SchemaVersion::new(1, 0, 4));
        assert_eq!(key.to_string(), "BisCore.01.00.04");
    }

    #[test]
    fn test_key_parse_rejects_bad_names() {
        assert!(SchemaKey::parse("1Bad.1.0.0").is_err());
        assert!(SchemaKey::parse("NoVersion").is_err());
    }

    #[test]
    fn test_key_name_comparison_ignores_case() {
        let a = SchemaKey::new("BisCore", SchemaVersion::new(1, 0, 0));
        let b = SchemaKey::new("biscore", SchemaVersion::new(1, 0, 0));
        assert_eq!(a, b);
        assert!(a.compare_by_name("BISCORE"));

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_identical_and_exact_require_full_triple() {
        let requested = SchemaKey::new("Foo", SchemaVersion::new(1, 0, 0));
        let same = SchemaKey::new("foo", SchemaVersion::new(1, 0, 0));
        let newer = SchemaKey::new("Foo", SchemaVersion::new(1, 0, 1));
        assert!(requested.matches(&same, SchemaMatchType::Identical));
        assert!(requested.matches(&same, SchemaMatchType::Exact));
        assert!(!requested.matches(&newer, SchemaMatchType::Exact));
    }

    #[test]
    fn test_latest_write_compatible_allows_newer_minor_only() {
        let requested = SchemaKey::new("Foo", SchemaVersion::new(1, 1, 2));
        let newer_minor = SchemaKey::new("Foo", SchemaVersion::new(1, 1, 5));
        let older_minor = SchemaKey::new("Foo", SchemaVersion::new(1, 1, 1));
        let newer_write = SchemaKey::new("Foo", SchemaVersion::new(1, 2, 0));
        let newer_read = SchemaKey::new("Foo", SchemaVersion::new(2, 1, 2));
        let mt = SchemaMatchType::LatestWriteCompatible;
        assert!(requested.matches(&newer_minor, mt));
        assert!(!requested.matches(&older_minor, mt));
        assert!(!requested.matches(&newer_write, mt));
        assert!(!requested.matches(&newer_read, mt));
    }

    #[test]
    fn test_latest_read_compatible_orders_write_minor_pair() {
        let requested = SchemaKey::new("Foo", SchemaVersion::new(1, 1, 2));
        let mt = SchemaMatchType::LatestReadCompatible;
        // Higher write resets the minor comparison.
        assert!(requested.matches(
            &SchemaKey::new("Foo", SchemaVersion::new(1, 2, 0)),
            mt
        ));
        assert!(requested.matches(
            &SchemaKey::new("Foo", SchemaVersion::new(1, 1, 2)),
            mt
        ));
        assert!(!requested.matches(
            &SchemaKey::new("Foo", SchemaVersion::new(1, 1, 1)),
            mt
        ));
        assert!(!requested.matches(
            &SchemaKey::new("Foo", SchemaVersion::new(2, 0, 0)),
            mt
        ));
    }

    #[test]
    fn test_latest_matches_any_version_of_same_name() {
        let requested = SchemaKey::new("Foo", SchemaVersion::new(9, 9, 9));
        let old = SchemaKey::new("foo", SchemaVersion::new(1, 0, 0));
        let other = SchemaKey::new("Bar", SchemaVersion::new(9, 9, 9));
        assert!(requested.matches(&old, SchemaMatchType::Latest));
        assert!(!requested.matches(&other, SchemaMatchType::Latest));
    }

    #[test]
    fn test_item_key_parse_and_case_insensitive_eq() {
        let key = SchemaItemKey::parse("BisCore.Element").unwrap();
        assert_eq!(key, SchemaItemKey::new("biscore", "ELEMENT"));
        assert_eq!(key.full_name(), "BisCore.Element");
        assert!(SchemaItemKey::parse("NoDot").is_err());
    }

    #[test]
    fn test_ec_name_validation() {
        assert!(is_valid_ec_name("_Underscore"));
        assert!(is_valid_ec_name("Pipe2"));
        assert!(!is_valid_ec_name("2Pipe"));
        assert!(!is_valid_ec_name("has space"));
        assert!(!is_valid_ec_name(""));
        assert!(!is_valid_ec_name("dotted.name"));
    }
}
