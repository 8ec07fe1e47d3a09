//! Unit system item kinds: phenomena, unit systems, units, inversions, constants
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use serde_json::Value;

use super::{ItemLink, LinkVisitor, SchemaItemType};
use crate::error::Result;

/// A measurable quality (length, temperature, pressure)
#[derive(Debug, Clone, PartialEq)]
pub struct Phenomenon {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Dimensional definition, e.g. `LENGTH*LENGTH` for area
    pub definition: String,
}

impl Phenomenon {
    pub(crate) fn visit_links(&mut self, _visit: &mut LinkVisitor<'_>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "definition".to_string(),
            Value::String(self.definition.clone()),
        );
    }
}

/// A named family of units (SI, metric, imperial)
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSystem {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl UnitSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
        }
    }

    pub(crate) fn visit_links(&mut self, _visit: &mut LinkVisitor<'_>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn write_json(&self, _obj: &mut serde_json::Map<String, Value>) {}
}

/// A unit of measure for a phenomenon within a unit system
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub phenomenon: ItemLink,
    pub unit_system: ItemLink,
    /// Definition in terms of other units, e.g. `MM` or `M*M`
    pub definition: String,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    pub offset: Option<f64>,
}

impl Unit {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        visit(&mut self.phenomenon, &[SchemaItemType::Phenomenon])?;
        visit(&mut self.unit_system, &[SchemaItemType::UnitSystem])
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "phenomenon".to_string(),
            Value::String(self.phenomenon.key().full_name()),
        );
        obj.insert(
            "unitSystem".to_string(),
            Value::String(self.unit_system.key().full_name()),
        );
        obj.insert(
            "definition".to_string(),
            Value::String(self.definition.clone()),
        );
        if let Some(numerator) = self.numerator {
            obj.insert("numerator".to_string(), Value::from(numerator));
        }
        if let Some(denominator) = self.denominator {
            obj.insert("denominator".to_string(), Value::from(denominator));
        }
        if let Some(offset) = self.offset {
            obj.insert("offset".to_string(), Value::from(offset));
        }
    }
}

/// A unit defined as the inverse of another unit
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedUnit {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub inverts_unit: ItemLink,
    pub unit_system: ItemLink,
}

impl InvertedUnit {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        visit(&mut self.inverts_unit, &[SchemaItemType::Unit])?;
        visit(&mut self.unit_system, &[SchemaItemType::UnitSystem])
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "invertsUnit".to_string(),
            Value::String(self.inverts_unit.key().full_name()),
        );
        obj.insert(
            "unitSystem".to_string(),
            Value::String(self.unit_system.key().full_name()),
        );
    }
}

/// A dimensionless or dimensioned constant tied to a phenomenon
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub phenomenon: ItemLink,
    pub definition: String,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
}

impl Constant {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        visit(&mut self.phenomenon, &[SchemaItemType::Phenomenon])
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "phenomenon".to_string(),
            Value::String(self.phenomenon.key().full_name()),
        );
        obj.insert(
            "definition".to_string(),
            Value::String(self.definition.clone()),
        );
        if let Some(numerator) = self.numerator {
            obj.insert("numerator".to_string(), Value::from(numerator));
        }
        if let Some(denominator) = self.denominator {
            obj.insert("denominator".to_string(), Value::from(denominator));
        }
    }
}
