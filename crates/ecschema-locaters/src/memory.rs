//! In-memory schema document store
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::sync::RwLock;

use async_trait::async_trait;

use ecschema_core::{SchemaDocument, SchemaKey, SchemaLocater, SchemaMatchType};

/// Thread-safe locater over documents registered at run time
///
/// Useful for tests and for embedders shipping schemas inside the binary.
/// Documents registered under equal keys shadow earlier registrations.
#[derive(Default)]
pub struct InMemoryLocater {
    documents: RwLock<Vec<(SchemaKey, SchemaDocument)>>,
}

impl InMemoryLocater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under the key its content declares
    pub fn add_document(&self, key: SchemaKey, document: SchemaDocument) {
        let mut documents = self.documents.write().unwrap();
        documents.retain(|(held, _)| held != &key);
        documents.push((key, document));
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pick(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        let documents = self.documents.read().unwrap();
        documents
            .iter()
            .filter(|(held, _)| key.matches(held, match_type))
            .max_by_key(|(held, _)| held.version)
            .map(|(_, document)| document.clone())
    }
}

#[async_trait]
impl SchemaLocater for InMemoryLocater {
    async fn locate(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Option<SchemaDocument> {
        self.pick(key, match_type)
    }

    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        self.pick(key, match_type)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
