//! Dependency-ordered structural merge
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::sync::Arc;

use ecschema_core::{Schema, SchemaItem, SchemaItemType};
use serde_json::Value;

use crate::error::{MergeError, Result};

/// Merges the items and references of a source schema into a target
///
/// Both inputs must be resolved (linked) schemas of the same name; they
/// may come from different contexts. The result carries the target's key
/// and metadata, with the source's items folded in.
pub struct SchemaMerger;

impl SchemaMerger {
    /// Produce a new linked schema holding the union of both inputs
    ///
    /// Items are copied in dependency order so that a unit lands before
    /// the kind of quantity that names it. Intra-source item links are
    /// re-pointed to the target's schema name spelling, which also makes
    /// the structural comparison of items present in both inputs
    /// insensitive to name casing.
    pub fn merge(target: &Schema, source: &Schema) -> Result<Schema> {
        if !target.key().compare_by_name(source.name()) {
            return Err(MergeError::SchemaNameMismatch {
                target: target.name().to_string(),
                source: source.name().to_string(),
            });
        }

        let mut merged = target.clone();
        merge_references(&mut merged, target, source)?;

        let mut pending: Vec<&SchemaItem> = source.items().collect();
        pending.sort_by_key(|item| dependency_rank(item.item_type()));

        for item in pending {
            let mut incoming = item.clone();
            incoming.repoint_schema(source.name(), target.name())?;
            match merged.any_item(item.name()) {
                None => merged.add_item(incoming)?,
                Some(existing) => {
                    let ours = existing.to_json();
                    let theirs = incoming.to_json();
                    if ours != theirs {
                        return Err(MergeError::ItemConflict {
                            item: item.name().to_string(),
                            attribute: first_conflict(&ours, &theirs),
                        });
                    }
                }
            }
        }

        // Relationship constraints and every other copied link resolve
        // against the merged item set and the union of references.
        merged.link()?;
        Ok(merged)
    }
}

fn merge_references(merged: &mut Schema, target: &Schema, source: &Schema) -> Result<()> {
    for reference in source.references() {
        let existing = target
            .references()
            .iter()
            .find(|r| r.key.compare_by_name(&reference.key.name));
        match existing {
            Some(held) => {
                if held.key.version != reference.key.version {
                    return Err(MergeError::ReferenceVersionConflict {
                        name: held.key.name.clone(),
                        target: held.key.version,
                        source: reference.key.version,
                    });
                }
            }
            None => {
                merged.add_reference(reference.key.clone(), reference.alias.clone())?;
                if let Some(schema) = &reference.schema {
                    merged.attach_reference(&reference.key.name, Arc::clone(schema))?;
                }
            }
        }
    }
    Ok(())
}

/// Copy order: an item's dependencies always rank at or below it
fn dependency_rank(kind: SchemaItemType) -> u8 {
    match kind {
        SchemaItemType::UnitSystem | SchemaItemType::Phenomenon => 0,
        SchemaItemType::Unit | SchemaItemType::InvertedUnit | SchemaItemType::Constant => 1,
        SchemaItemType::Format
        | SchemaItemType::KindOfQuantity
        | SchemaItemType::PropertyCategory
        | SchemaItemType::Enumeration => 2,
        SchemaItemType::EntityClass
        | SchemaItemType::Mixin
        | SchemaItemType::StructClass
        | SchemaItemType::CustomAttributeClass => 3,
        SchemaItemType::RelationshipClass => 4,
    }
}

/// First attribute whose serialized value differs between the two forms
fn first_conflict(ours: &Value, theirs: &Value) -> String {
    if let (Value::Object(a), Value::Object(b)) = (ours, theirs) {
        let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            if a.get(key.as_str()) != b.get(key.as_str()) {
                return key.clone();
            }
        }
    }
    "schemaItemType".to_string()
}
