//! Merge failure taxonomy
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use ecschema_core::SchemaVersion;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

/// Why a merge was rejected
///
/// Every rejection leaves both input schemas untouched; the merger works
/// on a copy and reports problems instead of panicking.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Merging is defined between two versions of the same schema
    #[error("cannot merge schema '{source}' into '{target}': names differ")]
    SchemaNameMismatch { target: String, r#source: String },

    /// An item exists in both schemas with conflicting definitions
    #[error("item '{item}' is defined differently in both schemas (first conflicting attribute: '{attribute}')")]
    ItemConflict { item: String, attribute: String },

    /// Both schemas reference the same schema at different versions
    #[error("schema reference '{name}' is declared as {target} by the target and {source} by the source")]
    ReferenceVersionConflict {
        name: String,
        target: SchemaVersion,
        r#source: SchemaVersion,
    },

    /// The merged schema failed validation or link resolution
    #[error("merge produced an invalid schema")]
    InvalidTarget(#[from] ecschema_core::Error),
}
