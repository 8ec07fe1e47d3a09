//! Presentation item kinds: kinds of quantity, property categories, formats
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::fmt;

use serde_json::Value;

use super::{ItemLink, LinkVisitor, SchemaItemType};
use crate::error::Result;

const UNIT_KINDS: &[SchemaItemType] = &[SchemaItemType::Unit, SchemaItemType::InvertedUnit];

/// Binds a phenomenon's persistence unit to presentation formats
#[derive(Debug, Clone, PartialEq)]
pub struct KindOfQuantity {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub relative_error: f64,
    pub persistence_unit: ItemLink,
    pub presentation_formats: Vec<ItemLink>,
}

impl KindOfQuantity {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        visit(&mut self.persistence_unit, UNIT_KINDS)?;
        for format in &mut self.presentation_formats {
            visit(format, &[SchemaItemType::Format])?;
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "relativeError".to_string(),
            Value::from(self.relative_error),
        );
        obj.insert(
            "persistenceUnit".to_string(),
            Value::String(self.persistence_unit.key().full_name()),
        );
        if !self.presentation_formats.is_empty() {
            obj.insert(
                "presentationUnits".to_string(),
                Value::Array(
                    self.presentation_formats
                        .iter()
                        .map(|f| Value::String(f.key().full_name()))
                        .collect(),
                ),
            );
        }
    }
}

/// Grouping and ordering hint for properties in consuming UIs
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCategory {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub priority: i32,
}

impl PropertyCategory {
    pub(crate) fn visit_links(&mut self, _visit: &mut LinkVisitor<'_>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert("priority".to_string(), Value::from(self.priority));
    }
}

/// Numeric rendering style of a format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    Decimal,
    Fractional,
    Scientific,
    Station,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decimal => "decimal",
            Self::Fractional => "fractional",
            Self::Scientific => "scientific",
            Self::Station => "station",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Decimal,
            Self::Fractional,
            Self::Scientific,
            Self::Station,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit participating in a composite format
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCompositeUnit {
    pub unit: ItemLink,
    pub label: Option<String>,
}

/// Multi-unit presentation (e.g. feet and inches)
#[derive(Debug, Clone, PartialEq)]
pub struct FormatComposite {
    pub spacer: Option<String>,
    pub units: Vec<FormatCompositeUnit>,
}

/// A display format for quantity values
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub format_type: FormatType,
    pub precision: Option<u32>,
    pub decimal_separator: Option<String>,
    pub thousand_separator: Option<String>,
    pub uom_separator: Option<String>,
    pub composite: Option<FormatComposite>,
}

impl Format {
    pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
        if let Some(composite) = self.composite.as_mut() {
            for unit in &mut composite.units {
                visit(&mut unit.unit, UNIT_KINDS)?;
            }
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "type".to_string(),
            Value::String(self.format_type.as_str().to_string()),
        );
        if let Some(precision) = self.precision {
            obj.insert("precision".to_string(), Value::from(precision));
        }
        if let Some(sep) = &self.decimal_separator {
            obj.insert("decimalSeparator".to_string(), Value::String(sep.clone()));
        }
        if let Some(sep) = &self.thousand_separator {
            obj.insert("thousandSeparator".to_string(), Value::String(sep.clone()));
        }
        if let Some(sep) = &self.uom_separator {
            obj.insert("uomSeparator".to_string(), Value::String(sep.clone()));
        }
        if let Some(composite) = &self.composite {
            let mut comp = serde_json::Map::new();
            if let Some(spacer) = &composite.spacer {
                comp.insert("spacer".to_string(), Value::String(spacer.clone()));
            }
            comp.insert(
                "units".to_string(),
                Value::Array(
                    composite
                        .units
                        .iter()
                        .map(|u| {
                            let mut unit = serde_json::Map::new();
                            unit.insert(
                                "name".to_string(),
                                Value::String(u.unit.key().full_name()),
                            );
                            if let Some(label) = &u.label {
                                unit.insert("label".to_string(), Value::String(label.clone()));
                            }
                            Value::Object(unit)
                        })
                        .collect(),
                ),
            );
            obj.insert("composite".to_string(), Value::Object(comp));
        }
    }
}
