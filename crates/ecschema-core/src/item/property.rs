//! Property kinds carried by the class item kinds
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::fmt;

use serde_json::Value;

use super::class::StrengthDirection;
use super::{ItemLink, LinkVisitor, SchemaItemType};
use crate::error::Result;

/// Primitive value types for properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Binary,
    Boolean,
    DateTime,
    Double,
    Integer,
    Long,
    Point2d,
    Point3d,
    String,
}

impl PrimitiveType {
    /// Canonical type name used by both source formats
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Double => "double",
            Self::Integer => "int",
            Self::Long => "long",
            Self::Point2d => "point2d",
            Self::Point3d => "point3d",
            Self::String => "string",
        }
    }

    /// Parse a primitive type name (case-insensitive); `None` when the name
    /// does not denote a primitive
    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            Self::Binary,
            Self::Boolean,
            Self::DateTime,
            Self::Double,
            Self::Integer,
            Self::Long,
            Self::Point2d,
            Self::Point3d,
            Self::String,
        ];
        all.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every property kind
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyDetails {
    pub label: Option<String>,
    pub description: Option<String>,
    pub is_read_only: bool,
    pub category: Option<ItemLink>,
    pub kind_of_quantity: Option<ItemLink>,
    pub extended_type_name: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl PropertyDetails {
    fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(link) = self.category.as_mut() {
            visit(link, &[SchemaItemType::PropertyCategory])?;
        }
        if let Some(link) = self.kind_of_quantity.as_mut() {
            visit(link, &[SchemaItemType::KindOfQuantity])?;
        }
        Ok(())
    }

    fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        if let Some(label) = &self.label {
            obj.insert("label".to_string(), Value::String(label.clone()));
        }
        if let Some(description) = &self.description {
            obj.insert("description".to_string(), Value::String(description.clone()));
        }
        if self.is_read_only {
            obj.insert("isReadOnly".to_string(), Value::Bool(true));
        }
        if let Some(category) = &self.category {
            obj.insert(
                "category".to_string(),
                Value::String(category.key().full_name()),
            );
        }
        if let Some(koq) = &self.kind_of_quantity {
            obj.insert(
                "kindOfQuantity".to_string(),
                Value::String(koq.key().full_name()),
            );
        }
        if let Some(extended) = &self.extended_type_name {
            obj.insert(
                "extendedTypeName".to_string(),
                Value::String(extended.clone()),
            );
        }
        if let Some(min) = self.min_length {
            obj.insert("minLength".to_string(), Value::from(min));
        }
        if let Some(max) = self.max_length {
            obj.insert("maxLength".to_string(), Value::from(max));
        }
        if let Some(min) = self.min_value {
            obj.insert("minValue".to_string(), Value::from(min));
        }
        if let Some(max) = self.max_value {
            obj.insert("maxValue".to_string(), Value::from(max));
        }
    }
}

/// A property of a primitive type
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub primitive_type: PrimitiveType,
}

/// A property whose values come from an enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub enumeration: ItemLink,
}

/// A property embedding a struct class value
#[derive(Debug, Clone, PartialEq)]
pub struct StructProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub struct_class: ItemLink,
}

/// An ordered collection of primitive values
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArrayProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub primitive_type: PrimitiveType,
    pub min_occurs: u32,
    /// `None` means unbounded
    pub max_occurs: Option<u32>,
}

/// An ordered collection of struct values
#[derive(Debug, Clone, PartialEq)]
pub struct StructArrayProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub struct_class: ItemLink,
    pub min_occurs: u32,
    /// `None` means unbounded
    pub max_occurs: Option<u32>,
}

/// A pointer to related instances through a relationship class
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationProperty {
    pub name: String,
    pub details: PropertyDetails,
    pub relationship: ItemLink,
    pub direction: StrengthDirection,
}

/// A property of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Primitive(PrimitiveProperty),
    Enumeration(EnumerationProperty),
    Struct(StructProperty),
    PrimitiveArray(PrimitiveArrayProperty),
    StructArray(StructArrayProperty),
    Navigation(NavigationProperty),
}

impl Property {
    /// The property's name within its class
    pub fn name(&self) -> &str {
        match self {
            Self::Primitive(p) => &p.name,
            Self::Enumeration(p) => &p.name,
            Self::Struct(p) => &p.name,
            Self::PrimitiveArray(p) => &p.name,
            Self::StructArray(p) => &p.name,
            Self::Navigation(p) => &p.name,
        }
    }

    /// Fields shared by every property kind
    pub fn details(&self) -> &PropertyDetails {
        match self {
            Self::Primitive(p) => &p.details,
            Self::Enumeration(p) => &p.details,
            Self::Struct(p) => &p.details,
            Self::PrimitiveArray(p) => &p.details,
            Self::StructArray(p) => &p.details,
            Self::Navigation(p) => &p.details,
        }
    }

    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        match self {
            Self::Primitive(p) => p.details.visit_links(visit),
            Self::Enumeration(p) => {
                p.details.visit_links(visit)?;
                visit(&mut p.enumeration, &[SchemaItemType::Enumeration])
            }
            Self::Struct(p) => {
                p.details.visit_links(visit)?;
                visit(&mut p.struct_class, &[SchemaItemType::StructClass])
            }
            Self::PrimitiveArray(p) => p.details.visit_links(visit),
            Self::StructArray(p) => {
                p.details.visit_links(visit)?;
                visit(&mut p.struct_class, &[SchemaItemType::StructClass])
            }
            Self::Navigation(p) => {
                p.details.visit_links(visit)?;
                visit(&mut p.relationship, &[SchemaItemType::RelationshipClass])
            }
        }
    }

    /// Serialize into the canonical JSON form
    ///
    /// Enumeration properties serialize as `PrimitiveProperty` entries whose
    /// `typeName` is the enumeration's full name, matching the source form
    /// they are parsed from.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".to_string(), Value::String(self.name().to_string()));
        match self {
            Self::Primitive(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("PrimitiveProperty".to_string()),
                );
                obj.insert(
                    "typeName".to_string(),
                    Value::String(p.primitive_type.as_str().to_string()),
                );
            }
            Self::Enumeration(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("PrimitiveProperty".to_string()),
                );
                obj.insert(
                    "typeName".to_string(),
                    Value::String(p.enumeration.key().full_name()),
                );
            }
            Self::Struct(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("StructProperty".to_string()),
                );
                obj.insert(
                    "typeName".to_string(),
                    Value::String(p.struct_class.key().full_name()),
                );
            }
            Self::PrimitiveArray(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("PrimitiveArrayProperty".to_string()),
                );
                obj.insert(
                    "typeName".to_string(),
                    Value::String(p.primitive_type.as_str().to_string()),
                );
                obj.insert("minOccurs".to_string(), Value::from(p.min_occurs));
                if let Some(max) = p.max_occurs {
                    obj.insert("maxOccurs".to_string(), Value::from(max));
                }
            }
            Self::StructArray(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("StructArrayProperty".to_string()),
                );
                obj.insert(
                    "typeName".to_string(),
                    Value::String(p.struct_class.key().full_name()),
                );
                obj.insert("minOccurs".to_string(), Value::from(p.min_occurs));
                if let Some(max) = p.max_occurs {
                    obj.insert("maxOccurs".to_string(), Value::from(max));
                }
            }
            Self::Navigation(p) => {
                obj.insert(
                    "type".to_string(),
                    Value::String("NavigationProperty".to_string()),
                );
                obj.insert(
                    "relationshipName".to_string(),
                    Value::String(p.relationship.key().full_name()),
                );
                obj.insert(
                    "direction".to_string(),
                    Value::String(p.direction.as_str().to_string()),
                );
            }
        }
        self.details().write_json(&mut obj);
        Value::Object(obj)
    }
}
