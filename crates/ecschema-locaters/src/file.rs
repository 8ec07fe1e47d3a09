//! Directory-scanning locaters for version-stamped schema files
//!
//! Candidate files follow the `{Name}.{RR}.{WW}.{mm}.ecschema.json|xml`
//! naming convention; the schema key is parsed from the file name, so
//! non-conforming files are skipped without being opened. Unreadable
//! directories and files are logged and count as misses, never as errors.
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use ecschema_core::{SchemaDocument, SchemaKey, SchemaLocater, SchemaMatchType};

const JSON_SUFFIX: &str = ".ecschema.json";
const XML_SUFFIX: &str = ".ecschema.xml";

/// Parse `Name.RR.WW.mm` out of a file name carrying the given suffix
fn key_from_file_name(file_name: &str, suffix: &str) -> Option<SchemaKey> {
    let split = file_name.len().checked_sub(suffix.len())?;
    if !file_name.is_char_boundary(split) || !file_name[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    SchemaKey::parse(&file_name[..split]).ok()
}

/// Scan-and-match logic shared by the JSON and XML locaters
struct FileLocater {
    label: String,
    suffix: &'static str,
    search_paths: Vec<PathBuf>,
}

impl FileLocater {
    fn new(label: String, suffix: &'static str, search_paths: Vec<PathBuf>) -> Self {
        Self {
            label,
            suffix,
            search_paths,
        }
    }

    fn document(&self, text: String, path: &Path) -> SchemaDocument {
        let document = if self.suffix == JSON_SUFFIX {
            SchemaDocument::json(text)
        } else {
            SchemaDocument::xml(text)
        };
        document.with_origin(path.display().to_string())
    }

    /// Matching files across every search path, best version first
    fn rank(&self, mut found: Vec<(SchemaKey, PathBuf)>) -> Vec<(SchemaKey, PathBuf)> {
        found.sort_by(|a, b| b.0.version.cmp(&a.0.version));
        found
    }

    fn candidates_sync(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Vec<(SchemaKey, PathBuf)> {
        let mut found = Vec::new();
        for dir in &self.search_paths {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(path = %dir.display(), %error, "cannot scan schema directory");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if let Some(candidate) = key_from_file_name(name, self.suffix) {
                    if key.matches(&candidate, match_type) {
                        found.push((candidate, entry.path()));
                    }
                }
            }
        }
        self.rank(found)
    }

    async fn candidates(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Vec<(SchemaKey, PathBuf)> {
        let mut found = Vec::new();
        for dir in &self.search_paths {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(path = %dir.display(), %error, "cannot scan schema directory");
                    continue;
                }
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if let Some(candidate) = key_from_file_name(name, self.suffix) {
                    if key.matches(&candidate, match_type) {
                        found.push((candidate, entry.path()));
                    }
                }
            }
        }
        self.rank(found)
    }

    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        for (_, path) in self.candidates_sync(key, match_type) {
            match std::fs::read_to_string(&path) {
                Ok(text) => return Some(self.document(text, &path)),
                Err(error) => {
                    warn!(path = %path.display(), %error, "cannot read schema file");
                }
            }
        }
        None
    }

    async fn locate(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        for (_, path) in self.candidates(key, match_type).await {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => return Some(self.document(text, &path)),
                Err(error) => {
                    warn!(path = %path.display(), %error, "cannot read schema file");
                }
            }
        }
        None
    }
}

/// Locater over `*.ecschema.json` files in one or more directories
pub struct JsonFileLocater {
    inner: FileLocater,
}

impl JsonFileLocater {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inner: FileLocater::new(
                "json-files".to_string(),
                JSON_SUFFIX,
                search_paths.into_iter().map(Into::into).collect(),
            ),
        }
    }
}

#[async_trait]
impl SchemaLocater for JsonFileLocater {
    async fn locate(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Option<SchemaDocument> {
        self.inner.locate(key, match_type).await
    }

    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        self.inner.locate_sync(key, match_type)
    }

    fn name(&self) -> &str {
        &self.inner.label
    }
}

/// Locater over `*.ecschema.xml` files in one or more directories
pub struct XmlFileLocater {
    inner: FileLocater,
}

impl XmlFileLocater {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inner: FileLocater::new(
                "xml-files".to_string(),
                XML_SUFFIX,
                search_paths.into_iter().map(Into::into).collect(),
            ),
        }
    }
}

#[async_trait]
impl SchemaLocater for XmlFileLocater {
    async fn locate(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Option<SchemaDocument> {
        self.inner.locate(key, match_type).await
    }

    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        self.inner.locate_sync(key, match_type)
    }

    fn name(&self) -> &str {
        &self.inner.label
    }
}
