//! ecschema-core - Versioned schema metadata and context-based resolution
//!
//! This crate models EC schemas: named, versioned collections of typed item
//! definitions (classes, enumerations, units, formats) that reference each
//! other across schema boundaries. A [`SchemaContext`] resolves schemas on
//! demand through pluggable [`SchemaLocater`] strategies, caches the result
//! for the lifetime of the context, and coalesces concurrent requests for
//! the same key onto a single construction.
//!
//! # Main Components
//!
//! - **Identity**: [`SchemaKey`], [`SchemaVersion`], and the
//!   [`SchemaMatchType`] rules governing how strictly a requested version
//!   must match a candidate
//! - **Item Graph**: [`Schema`] and the fourteen [`SchemaItem`] kinds, with
//!   two-phase [`item::ItemLink`]s flipped from unresolved to resolved once
//!   references are loaded
//! - **Parsing**: the format-agnostic [`SchemaParser`] contract with JSON
//!   and ECXML implementations feeding one [`builder::SchemaBuilder`]
//! - **Resolution**: [`SchemaContext`] with its locater registry,
//!   match-type-aware cache, and missing-reference diagnostics
//!
//! # Example
//!
//! ```no_run
//! use ecschema_core::{Result, SchemaContext, SchemaKey, SchemaMatchType};
//!
//! async fn example(context: &SchemaContext) -> Result<()> {
//!     let key = SchemaKey::parse("BisCore.1.0.4")?;
//!     if let Some(schema) = context.get_schema(&key, SchemaMatchType::Latest).await? {
//!         println!("{} has {} items", schema.key(), schema.item_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

pub mod builder;
pub mod cache;
pub mod context;
pub mod error;
pub mod item;
pub mod key;
pub mod locater;
pub mod parser;
pub mod props;
pub mod schema;

pub use cache::SchemaCache;
pub use context::SchemaContext;
pub use error::{Error, Result};
pub use item::{Property, SchemaItem, SchemaItemType};
pub use key::{SchemaItemKey, SchemaKey, SchemaMatchType, SchemaVersion};
pub use locater::SchemaLocater;
pub use parser::{DocumentBody, JsonParser, SchemaDocument, SchemaParser, XmlParser};
pub use schema::{Schema, SchemaReference};
