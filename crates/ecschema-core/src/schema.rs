//! The schema aggregate: items, references, and link resolution
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::item::{SchemaItem, SchemaItemType, TypedItem};
use crate::key::{SchemaItemKey, SchemaKey, SchemaVersion};
use crate::parser::json::ECSCHEMA_JSON_URL;

/// A declared reference to another schema
///
/// `schema` stays `None` until the owning context resolves the reference;
/// `key` keeps the declared version even when a later write-compatible
/// version was attached.
#[derive(Debug, Clone)]
pub struct SchemaReference {
    pub key: SchemaKey,
    pub alias: Option<String>,
    pub schema: Option<Arc<Schema>>,
}

/// A named, versioned set of schema items
///
/// Items are held in insertion order and indexed case-insensitively by name.
/// A schema built from a source document is not usable until [`Schema::link`]
/// has resolved every item link against the schema and its attached
/// references.
#[derive(Debug, Clone)]
pub struct Schema {
    key: SchemaKey,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    references: Vec<SchemaReference>,
    items: Vec<SchemaItem>,
    // lowercased item name -> position in items
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(key: SchemaKey) -> Self {
        Self {
            key,
            alias: None,
            label: None,
            description: None,
            references: Vec::new(),
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn key(&self) -> &SchemaKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn version(&self) -> SchemaVersion {
        self.key.version
    }

    /// Add an item; item names are unique case-insensitively within a schema
    pub fn add_item(&mut self, item: SchemaItem) -> Result<()> {
        let lowered = item.name().to_ascii_lowercase();
        if self.index.contains_key(&lowered) {
            return Err(Error::DuplicateItem {
                schema: self.key.name.clone(),
                item: item.name().to_string(),
            });
        }
        self.index.insert(lowered, self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Look up an item of this schema by name, any kind
    pub fn any_item(&self, name: &str) -> Option<&SchemaItem> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&position| &self.items[position])
    }

    /// Look up an item of this schema by name and kind
    pub fn item<T: TypedItem>(&self, name: &str) -> Option<&T> {
        self.any_item(name).and_then(T::from_item)
    }

    pub fn items(&self) -> impl Iterator<Item = &SchemaItem> {
        self.items.iter()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Declare a reference to another schema
    pub fn add_reference(&mut self, key: SchemaKey, alias: Option<String>) -> Result<()> {
        if key.compare_by_name(&self.key.name) {
            return Err(Error::schema_read(
                &self.key.name,
                "a schema cannot reference itself",
            ));
        }
        if self
            .references
            .iter()
            .any(|r| r.key.compare_by_name(&key.name))
        {
            return Err(Error::schema_read(
                &self.key.name,
                format!("declares schema reference '{}' more than once", key.name),
            ));
        }
        self.references.push(SchemaReference {
            key,
            alias,
            schema: None,
        });
        Ok(())
    }

    /// Attach the resolved schema for a declared reference
    pub fn attach_reference(&mut self, name: &str, schema: Arc<Schema>) -> Result<()> {
        let reference = self
            .references
            .iter_mut()
            .find(|r| r.key.compare_by_name(name))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "schema '{}' declares no reference named '{}'",
                    self.key.name,
                    name
                )
            })?;
        reference.schema = Some(schema);
        Ok(())
    }

    pub fn references(&self) -> &[SchemaReference] {
        &self.references
    }

    /// The attached schema for a declared reference, by name
    pub fn reference_schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.references
            .iter()
            .find(|r| r.key.compare_by_name(name))
            .and_then(|r| r.schema.as_ref())
    }

    /// Find an item in this schema or one of its attached references
    ///
    /// Item links may only target the owning schema or a directly referenced
    /// schema; transitively referenced schemas are not searched.
    pub fn lookup(&self, key: &SchemaItemKey) -> Option<&SchemaItem> {
        self.find_in(self, key).map(|(_, item)| item)
    }

    fn find_in<'a>(
        &'a self,
        from: &'a Schema,
        key: &SchemaItemKey,
    ) -> Option<(&'a Schema, &'a SchemaItem)> {
        if from.key.compare_by_name(&key.schema_name) {
            return from.any_item(&key.item_name).map(|item| (from, item));
        }
        for reference in &from.references {
            if let Some(schema) = &reference.schema {
                if schema.key.compare_by_name(&key.schema_name) {
                    return schema
                        .any_item(&key.item_name)
                        .map(|item| (schema.as_ref(), item));
                }
            }
        }
        None
    }

    /// Resolve every item link against this schema and its attached
    /// references, then enforce property uniqueness along base chains
    ///
    /// Fails with [`Error::InvalidItemReference`] when a link targets a
    /// missing item or an item of a kind the holder does not accept.
    pub fn link(&mut self) -> Result<()> {
        let own = self.key.name.to_ascii_lowercase();
        let mut targets: HashMap<(String, String), SchemaItemType> = HashMap::new();
        for item in &self.items {
            targets.insert(
                (own.clone(), item.name().to_ascii_lowercase()),
                item.item_type(),
            );
        }
        for reference in &self.references {
            if let Some(schema) = &reference.schema {
                let ref_name = schema.key.name.to_ascii_lowercase();
                for item in schema.items() {
                    targets.insert(
                        (ref_name.clone(), item.name().to_ascii_lowercase()),
                        item.item_type(),
                    );
                }
            }
        }

        for item in &mut self.items {
            item.visit_links(&mut |link, allowed| {
                let key = link.key();
                let kind = targets
                    .get(&(
                        key.schema_name.to_ascii_lowercase(),
                        key.item_name.to_ascii_lowercase(),
                    ))
                    .copied()
                    .ok_or_else(|| {
                        Error::invalid_item_reference(
                            key.clone(),
                            "target item does not exist in the schema or its references",
                        )
                    })?;
                if !allowed.contains(&kind) {
                    return Err(Error::invalid_item_reference(
                        key.clone(),
                        format!("target is a {}, expected {}", kind, expected_kinds(allowed)),
                    ));
                }
                link.resolve(kind);
                Ok(())
            })?;
        }

        self.check_property_uniqueness()
    }

    /// Property names are unique within a class, including properties
    /// inherited along the base class and mixin chains
    fn check_property_uniqueness(&self) -> Result<()> {
        for item in &self.items {
            let Some(properties) = item.properties() else {
                continue;
            };
            let class = SchemaItemKey::new(self.key.name.clone(), item.name());

            let mut seen = HashSet::new();
            for property in properties {
                if !seen.insert(property.name().to_ascii_lowercase()) {
                    return Err(Error::DuplicateProperty {
                        class: class.full_name(),
                        property: property.name().to_string(),
                    });
                }
            }

            let mut visited = HashSet::new();
            visited.insert(class.full_name().to_ascii_lowercase());
            let mut pending: Vec<(&Schema, SchemaItemKey)> = ancestor_keys(item)
                .into_iter()
                .map(|key| (self, key))
                .collect();
            while let Some((scope, key)) = pending.pop() {
                if !visited.insert(key.full_name().to_ascii_lowercase()) {
                    continue;
                }
                // link() already verified the target exists
                let Some((schema, ancestor)) = self.find_in(scope, &key) else {
                    continue;
                };
                if let Some(inherited) = ancestor.properties() {
                    for property in inherited {
                        if seen.contains(&property.name().to_ascii_lowercase()) {
                            return Err(Error::DuplicateProperty {
                                class: class.full_name(),
                                property: property.name().to_string(),
                            });
                        }
                    }
                }
                pending.extend(
                    ancestor_keys(ancestor)
                        .into_iter()
                        .map(|key| (schema, key)),
                );
            }
        }
        Ok(())
    }

    /// Serialize the whole schema into the canonical JSON form
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "$schema".to_string(),
            Value::String(ECSCHEMA_JSON_URL.to_string()),
        );
        obj.insert("name".to_string(), Value::String(self.key.name.clone()));
        obj.insert(
            "version".to_string(),
            Value::String(self.key.version.to_string()),
        );
        if let Some(alias) = &self.alias {
            obj.insert("alias".to_string(), Value::String(alias.clone()));
        }
        if let Some(label) = &self.label {
            obj.insert("label".to_string(), Value::String(label.clone()));
        }
        if let Some(description) = &self.description {
            obj.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        if !self.references.is_empty() {
            let references: Vec<Value> = self
                .references
                .iter()
                .map(|reference| {
                    let mut entry = serde_json::Map::new();
                    entry.insert(
                        "name".to_string(),
                        Value::String(reference.key.name.clone()),
                    );
                    entry.insert(
                        "version".to_string(),
                        Value::String(reference.key.version.to_string()),
                    );
                    Value::Object(entry)
                })
                .collect();
            obj.insert("references".to_string(), Value::Array(references));
        }
        if !self.items.is_empty() {
            let mut items = serde_json::Map::new();
            for item in &self.items {
                items.insert(item.name().to_string(), item.to_json());
            }
            obj.insert("items".to_string(), Value::Object(items));
        }
        Value::Object(obj)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn ancestor_keys(item: &SchemaItem) -> Vec<SchemaItemKey> {
    let mut keys = Vec::new();
    if let Some(base) = item.base_class() {
        keys.push(base.key().clone());
    }
    if let SchemaItem::EntityClass(entity) = item {
        keys.extend(entity.mixins.iter().map(|mixin| mixin.key().clone()));
    }
    keys
}

fn expected_kinds(allowed: &[SchemaItemType]) -> String {
    allowed
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}
