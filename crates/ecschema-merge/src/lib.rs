//! Structural merging of EC schemas
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license
//!
//! [`SchemaMerger`] folds the items and references of one resolved schema
//! into another of the same name, producing a fresh linked schema. Merging
//! is structural: an item present in both inputs must serialize to the
//! same canonical JSON, otherwise the merge fails with the first
//! conflicting attribute and the inputs are left untouched.
//!
//! ```no_run
//! use ecschema_core::SchemaContext;
//! use ecschema_merge::SchemaMerger;
//!
//! # fn demo(context: &SchemaContext, a: &str, b: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let target = context.schema_from_json(a)?;
//! let source = context.schema_from_json(b)?;
//! let merged = SchemaMerger::merge(&target, &source)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod merger;

pub use error::MergeError;
pub use merger::SchemaMerger;
