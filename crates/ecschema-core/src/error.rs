//! Error types for schema parsing, resolution, and context operations
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use thiserror::Error;

use crate::key::{SchemaItemKey, SchemaKey};

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema reading and resolution
///
/// Every variant is terminal for the operation that raised it: a failed
/// schema is never cached, so the same key can be retried after the caller
/// fixes the underlying problem (for example by registering another
/// locater).
#[derive(Error, Debug)]
pub enum Error {
    /// Version string could not be parsed as `read.write.minor`
    #[error("Invalid schema version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Schema or item name violates EC naming rules
    #[error("Invalid EC name '{name}': names start with a letter or underscore followed by letters, digits, or underscores")]
    InvalidName { name: String },

    /// Source document was located but could not be parsed into a schema
    #[error("Failed to read schema '{schema}': {message}")]
    SchemaRead {
        schema: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A referenced schema could not be located by any registered locater
    #[error("Could not locate referenced schema '{key}', referenced by '{referenced_by}'")]
    ReferencedSchemaNotFound {
        key: SchemaKey,
        referenced_by: SchemaKey,
    },

    /// Schema reference graph contains a cycle
    #[error("Circular schema references detected: {chain}")]
    ReferenceCycle { chain: String },

    /// A schema with an identical key is already held by the context
    #[error("Schema '{key}' is already present in the context")]
    DuplicateSchema { key: SchemaKey },

    /// Two items in one schema share a name (names compare case-insensitively)
    #[error("Schema '{schema}' defines item '{item}' more than once")]
    DuplicateItem { schema: String, item: String },

    /// A class defines or inherits two properties with the same name
    #[error("Class '{class}' defines or inherits property '{property}' more than once")]
    DuplicateProperty { class: String, property: String },

    /// An item link points at a missing item or an item of the wrong kind
    #[error("Invalid item reference '{reference}': {reason}")]
    InvalidItemReference {
        reference: SchemaItemKey,
        reason: String,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Create a read error without an underlying source
    pub fn schema_read(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaRead {
            schema: schema.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a read error wrapping an underlying parse failure
    pub fn schema_read_with(
        schema: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::SchemaRead {
            schema: schema.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a version error
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a cycle error from the chain of keys that closed the loop
    pub fn reference_cycle(chain: &[SchemaKey]) -> Self {
        let chain = chain
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::ReferenceCycle { chain }
    }

    /// Create an item reference error
    pub fn invalid_item_reference(reference: SchemaItemKey, reason: impl Into<String>) -> Self {
        Self::InvalidItemReference {
            reference,
            reason: reason.into(),
        }
    }
}

// Coalesced resolutions hand one outcome to every awaiting caller, so
// errors must be clonable; anyhow sources are flattened to their rendered
// message chain.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidVersion { version, reason } => Self::InvalidVersion {
                version: version.clone(),
                reason: reason.clone(),
            },
            Self::InvalidName { name } => Self::InvalidName { name: name.clone() },
            Self::SchemaRead {
                schema,
                message,
                source,
            } => Self::SchemaRead {
                schema: schema.clone(),
                message: message.clone(),
                source: source.as_ref().map(|s| anyhow::anyhow!("{s:#}")),
            },
            Self::ReferencedSchemaNotFound { key, referenced_by } => {
                Self::ReferencedSchemaNotFound {
                    key: key.clone(),
                    referenced_by: referenced_by.clone(),
                }
            }
            Self::ReferenceCycle { chain } => Self::ReferenceCycle {
                chain: chain.clone(),
            },
            Self::DuplicateSchema { key } => Self::DuplicateSchema { key: key.clone() },
            Self::DuplicateItem { schema, item } => Self::DuplicateItem {
                schema: schema.clone(),
                item: item.clone(),
            },
            Self::DuplicateProperty { class, property } => Self::DuplicateProperty {
                class: class.clone(),
                property: property.clone(),
            },
            Self::InvalidItemReference { reference, reason } => Self::InvalidItemReference {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::Internal { message, source } => Self::Internal {
                message: message.clone(),
                source: anyhow::anyhow!("{source:#}"),
            },
        }
    }
}

// Conversion implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
