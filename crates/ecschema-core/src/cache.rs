//! Thread-safe storage of resolved schemas
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::error::{Error, Result};
use crate::key::{SchemaKey, SchemaMatchType};
use crate::schema::Schema;

/// Thread-safe store of resolved schemas
///
/// Storage is keyed case-insensitively by schema name and deduplicates by
/// identical version triple; multiple versions of one schema may coexist.
/// Lookups honor any [`SchemaMatchType`].
#[derive(Debug, Default)]
pub struct SchemaCache {
    // lowercased schema name -> held versions
    schemas: RwLock<HashMap<String, Vec<Arc<Schema>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema, failing when the identical key is already held
    pub fn insert(&self, schema: Arc<Schema>) -> Result<()> {
        let mut schemas = self.schemas.write().unwrap();
        let versions = schemas
            .entry(schema.name().to_ascii_lowercase())
            .or_default();
        if versions
            .iter()
            .any(|held| held.version() == schema.version())
        {
            return Err(Error::DuplicateSchema {
                key: schema.key().clone(),
            });
        }
        trace!(schema = %schema.key(), "cached schema");
        versions.push(schema);
        Ok(())
    }

    /// Insert a schema, returning the held one when the identical key is
    /// already present; the first insert wins
    pub fn insert_or_get(&self, schema: Arc<Schema>) -> Arc<Schema> {
        let mut schemas = self.schemas.write().unwrap();
        let versions = schemas
            .entry(schema.name().to_ascii_lowercase())
            .or_default();
        if let Some(held) = versions
            .iter()
            .find(|held| held.version() == schema.version())
        {
            return Arc::clone(held);
        }
        trace!(schema = %schema.key(), "cached schema");
        versions.push(Arc::clone(&schema));
        schema
    }

    /// The best held schema satisfying the key under the given match type
    ///
    /// Identical and Exact return that precise version; the Latest family
    /// returns the highest compatible version held.
    pub fn get(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<Arc<Schema>> {
        let schemas = self.schemas.read().unwrap();
        let versions = schemas.get(&key.name.to_ascii_lowercase())?;
        let best = versions
            .iter()
            .filter(|held| key.matches(held.key(), match_type))
            .max_by_key(|held| held.version())
            .map(Arc::clone);
        match &best {
            Some(found) => trace!(requested = %key, found = %found.key(), "cache hit"),
            None => trace!(requested = %key, "cache miss"),
        }
        best
    }

    /// Every key currently held, ordered by name and version
    pub fn keys(&self) -> Vec<SchemaKey> {
        let schemas = self.schemas.read().unwrap();
        let mut keys: Vec<SchemaKey> = schemas
            .values()
            .flatten()
            .map(|schema| schema.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.schemas.read().unwrap().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SchemaVersion;

    fn cached(name: &str, read: u32, write: u32, minor: u32) -> Arc<Schema> {
        Arc::new(Schema::new(SchemaKey::new(
            name,
            SchemaVersion::new(read, write, minor),
        )))
    }

    #[test]
    fn test_identical_keys_collide() {
        let cache = SchemaCache::new();
        cache.insert(cached("Plant", 1, 0, 0)).unwrap();
        let err = cache.insert(cached("PLANT", 1, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateSchema { .. }));
        cache.insert(cached("Plant", 1, 0, 1)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_insert_or_get_keeps_the_first() {
        let cache = SchemaCache::new();
        let first = cache.insert_or_get(cached("Plant", 1, 0, 0));
        let second = cache.insert_or_get(cached("plant", 1, 0, 0));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lookup_honors_match_type() {
        let cache = SchemaCache::new();
        cache.insert(cached("Plant", 1, 0, 0)).unwrap();
        cache.insert(cached("Plant", 1, 0, 5)).unwrap();
        cache.insert(cached("Plant", 2, 0, 0)).unwrap();

        let requested = SchemaKey::new("Plant", SchemaVersion::new(1, 0, 2));
        assert!(cache.get(&requested, SchemaMatchType::Identical).is_none());

        let compatible = cache
            .get(&requested, SchemaMatchType::LatestWriteCompatible)
            .unwrap();
        assert_eq!(compatible.version(), SchemaVersion::new(1, 0, 5));

        let latest = cache.get(&requested, SchemaMatchType::Latest).unwrap();
        assert_eq!(latest.version(), SchemaVersion::new(2, 0, 0));

        let missing = SchemaKey::new("Units", SchemaVersion::new(1, 0, 0));
        assert!(cache.get(&missing, SchemaMatchType::Latest).is_none());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let cache = SchemaCache::new();
        cache.insert(cached("Plant", 1, 0, 0)).unwrap();
        let requested = SchemaKey::new("pLaNt", SchemaVersion::new(1, 0, 0));
        assert!(cache.get(&requested, SchemaMatchType::Identical).is_some());
    }
}
