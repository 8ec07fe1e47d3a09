//! The pluggable schema locating contract
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use async_trait::async_trait;

use crate::key::{SchemaKey, SchemaMatchType};
use crate::parser::SchemaDocument;

/// A strategy for finding the source document of a schema
///
/// Locaters are registered on a [`crate::context::SchemaContext`] and probed
/// in registration order. Both variants must apply identical match
/// semantics: when the backing store holds several candidate versions, the
/// best match under the requested [`SchemaMatchType`] wins (for the Latest
/// family, the highest version).
///
/// A locater that cannot reach its backing store returns `None` so the
/// context can continue probing other locaters; malformed content is not
/// the locater's concern and surfaces when the context parses the returned
/// document. Implementations must be idempotent, side-effect-free on the
/// store, and safe for concurrent use. The context never mutates a locater.
#[async_trait]
pub trait SchemaLocater: Send + Sync {
    /// Find a schema document, suspending on I/O as needed
    async fn locate(&self, key: &SchemaKey, match_type: SchemaMatchType)
        -> Option<SchemaDocument>;

    /// Find a schema document, blocking the calling thread on I/O
    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType)
        -> Option<SchemaDocument>;

    /// Short name used in probe diagnostics
    fn name(&self) -> &str;
}
