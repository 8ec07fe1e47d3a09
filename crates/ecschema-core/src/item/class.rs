//! Class item kinds: entities, mixins, structs, custom attributes, relationships
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::fmt;

use serde_json::Value;

use super::property::Property;
use super::{ItemLink, LinkVisitor, SchemaItemType};
use crate::error::Result;

/// Instantiability modifier for class kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassModifier {
    #[default]
    None,
    Abstract,
    Sealed,
}

impl ClassModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Abstract => "Abstract",
            Self::Sealed => "Sealed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::None, Self::Abstract, Self::Sealed]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ClassModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime coupling between related instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthType {
    Referencing,
    Holding,
    Embedding,
}

impl StrengthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Referencing => "referencing",
            Self::Holding => "holding",
            Self::Embedding => "embedding",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Referencing, Self::Holding, Self::Embedding]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for StrengthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction in which a relationship (or navigation property) is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthDirection {
    Forward,
    Backward,
}

impl StrengthDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Forward, Self::Backward]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for StrengthDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance count bounds for one end of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplicity {
    pub lower: u32,
    /// `None` means unbounded
    pub upper: Option<u32>,
}

impl Multiplicity {
    /// Parse the `(lower..upper)` spelling, where upper may be `*`
    pub fn parse(s: &str) -> Option<Self> {
        let body = s.trim().strip_prefix('(')?.strip_suffix(')')?;
        let (lower, upper) = body.split_once("..")?;
        let lower = lower.trim().parse::<u32>().ok()?;
        let upper = match upper.trim() {
            "*" => None,
            bounded => Some(bounded.parse::<u32>().ok()?),
        };
        if let Some(upper) = upper {
            if upper < lower {
                return None;
            }
        }
        Some(Self { lower, upper })
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "({}..{})", self.lower, upper),
            None => write!(f, "({}..*)", self.lower),
        }
    }
}

/// Kinds allowed at a relationship endpoint
const CONSTRAINT_KINDS: &[SchemaItemType] = &[
    SchemaItemType::EntityClass,
    SchemaItemType::Mixin,
    SchemaItemType::RelationshipClass,
];

/// One endpoint of a relationship class
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipConstraint {
    pub multiplicity: Multiplicity,
    pub role_label: String,
    pub polymorphic: bool,
    pub abstract_constraint: Option<ItemLink>,
    pub constraint_classes: Vec<ItemLink>,
}

impl RelationshipConstraint {
    fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(link) = self.abstract_constraint.as_mut() {
            visit(link, CONSTRAINT_KINDS)?;
        }
        for link in &mut self.constraint_classes {
            visit(link, CONSTRAINT_KINDS)?;
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "multiplicity".to_string(),
            Value::String(self.multiplicity.to_string()),
        );
        obj.insert(
            "roleLabel".to_string(),
            Value::String(self.role_label.clone()),
        );
        obj.insert("polymorphic".to_string(), Value::Bool(self.polymorphic));
        if let Some(abstract_constraint) = &self.abstract_constraint {
            obj.insert(
                "abstractConstraint".to_string(),
                Value::String(abstract_constraint.key().full_name()),
            );
        }
        obj.insert(
            "constraintClasses".to_string(),
            Value::Array(
                self.constraint_classes
                    .iter()
                    .map(|c| Value::String(c.key().full_name()))
                    .collect(),
            ),
        );
        Value::Object(obj)
    }
}

fn write_properties(properties: &[Property], obj: &mut serde_json::Map<String, Value>) {
    if !properties.is_empty() {
        obj.insert(
            "properties".to_string(),
            Value::Array(properties.iter().map(Property::to_json).collect()),
        );
    }
}

fn write_modifier(modifier: ClassModifier, obj: &mut serde_json::Map<String, Value>) {
    if modifier != ClassModifier::None {
        obj.insert(
            "modifier".to_string(),
            Value::String(modifier.as_str().to_string()),
        );
    }
}

fn write_base_class(base: &Option<ItemLink>, obj: &mut serde_json::Map<String, Value>) {
    if let Some(base) = base {
        obj.insert(
            "baseClass".to_string(),
            Value::String(base.key().full_name()),
        );
    }
}

/// A concrete or abstract class whose instances are business objects
#[derive(Debug, Clone, PartialEq)]
pub struct EntityClass {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: ClassModifier,
    pub base_class: Option<ItemLink>,
    pub mixins: Vec<ItemLink>,
    pub properties: Vec<Property>,
}

impl EntityClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            modifier: ClassModifier::None,
            base_class: None,
            mixins: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(base) = self.base_class.as_mut() {
            visit(base, &[SchemaItemType::EntityClass])?;
        }
        for mixin in &mut self.mixins {
            visit(mixin, &[SchemaItemType::Mixin])?;
        }
        for property in &mut self.properties {
            property.visit_links(visit)?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        write_modifier(self.modifier, obj);
        write_base_class(&self.base_class, obj);
        if !self.mixins.is_empty() {
            obj.insert(
                "mixins".to_string(),
                Value::Array(
                    self.mixins
                        .iter()
                        .map(|m| Value::String(m.key().full_name()))
                        .collect(),
                ),
            );
        }
        write_properties(&self.properties, obj);
    }
}

/// Auxiliary behavior attachable to entity classes
#[derive(Debug, Clone, PartialEq)]
pub struct Mixin {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub applies_to: ItemLink,
    pub base_class: Option<ItemLink>,
    pub properties: Vec<Property>,
}

impl Mixin {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        visit(&mut self.applies_to, &[SchemaItemType::EntityClass])?;
        if let Some(base) = self.base_class.as_mut() {
            visit(base, &[SchemaItemType::Mixin])?;
        }
        for property in &mut self.properties {
            property.visit_links(visit)?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "appliesTo".to_string(),
            Value::String(self.applies_to.key().full_name()),
        );
        write_base_class(&self.base_class, obj);
        write_properties(&self.properties, obj);
    }
}

/// A value type with named members and no identity of its own
#[derive(Debug, Clone, PartialEq)]
pub struct StructClass {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: ClassModifier,
    pub base_class: Option<ItemLink>,
    pub properties: Vec<Property>,
}

impl StructClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            modifier: ClassModifier::None,
            base_class: None,
            properties: Vec::new(),
        }
    }

    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(base) = self.base_class.as_mut() {
            visit(base, &[SchemaItemType::StructClass])?;
        }
        for property in &mut self.properties {
            property.visit_links(visit)?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        write_modifier(self.modifier, obj);
        write_base_class(&self.base_class, obj);
        write_properties(&self.properties, obj);
    }
}

/// A class whose instances annotate other schema elements
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeClass {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: ClassModifier,
    pub base_class: Option<ItemLink>,
    /// Comma-separated container kinds the attribute may decorate
    pub applies_to: String,
    pub properties: Vec<Property>,
}

impl CustomAttributeClass {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(base) = self.base_class.as_mut() {
            visit(base, &[SchemaItemType::CustomAttributeClass])?;
        }
        for property in &mut self.properties {
            property.visit_links(visit)?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "appliesTo".to_string(),
            Value::String(self.applies_to.clone()),
        );
        write_modifier(self.modifier, obj);
        write_base_class(&self.base_class, obj);
        write_properties(&self.properties, obj);
    }
}

/// A class connecting source and target instances
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipClass {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: ClassModifier,
    pub base_class: Option<ItemLink>,
    pub strength: StrengthType,
    pub strength_direction: StrengthDirection,
    pub source: RelationshipConstraint,
    pub target: RelationshipConstraint,
    pub properties: Vec<Property>,
}

impl RelationshipClass {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(base) = self.base_class.as_mut() {
            visit(base, &[SchemaItemType::RelationshipClass])?;
        }
        self.source.visit_links(visit)?;
        self.target.visit_links(visit)?;
        for property in &mut self.properties {
            property.visit_links(visit)?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        write_modifier(self.modifier, obj);
        write_base_class(&self.base_class, obj);
        obj.insert(
            "strength".to_string(),
            Value::String(self.strength.as_str().to_string()),
        );
        obj.insert(
            "strengthDirection".to_string(),
            Value::String(self.strength_direction.as_str().to_string()),
        );
        obj.insert("source".to_string(), self.source.to_json());
        obj.insert("target".to_string(), self.target.to_json());
        write_properties(&self.properties, obj);
    }
}
