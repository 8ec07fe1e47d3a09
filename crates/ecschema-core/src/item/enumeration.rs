//! Enumerations and their enumerators
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::fmt;

use serde_json::Value;

use super::LinkVisitor;
use crate::error::Result;

/// Primitive type backing an enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationBacking {
    Integer,
    String,
}

impl EnumerationBacking {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::String => "string",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Integer, Self::String]
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for EnumerationBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named value of an enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
    pub name: String,
    pub value: EnumeratorValue,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Enumerator payload; must agree with the enumeration's backing type
#[derive(Debug, Clone, PartialEq)]
pub enum EnumeratorValue {
    Integer(i64),
    String(String),
}

impl EnumeratorValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Integer(v) => Value::from(*v),
            Self::String(v) => Value::String(v.clone()),
        }
    }
}

/// A closed or open set of named primitive values
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub backing: EnumerationBacking,
    /// When true, property values outside the enumerator set are invalid
    pub is_strict: bool,
    pub enumerators: Vec<Enumerator>,
}

impl Enumeration {
    pub(crate) fn visit_links(&mut self, _visit: &mut LinkVisitor<'_>) -> Result<()> {
        Ok(())
    }

    /// Check enumerator name uniqueness and value/backing agreement,
    /// returning the failure reason
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let mut seen: Vec<String> = Vec::new();
        for enumerator in &self.enumerators {
            let lowered = enumerator.name.to_ascii_lowercase();
            if seen.contains(&lowered) {
                return Err(format!(
                    "enumeration '{}' defines enumerator '{}' more than once",
                    self.name, enumerator.name
                ));
            }
            seen.push(lowered);

            let agrees = matches!(
                (&enumerator.value, self.backing),
                (EnumeratorValue::Integer(_), EnumerationBacking::Integer)
                    | (EnumeratorValue::String(_), EnumerationBacking::String)
            );
            if !agrees {
                return Err(format!(
                    "enumerator '{}' of enumeration '{}' does not match the '{}' backing type",
                    enumerator.name, self.name, self.backing
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn write_json(&self, obj: &mut serde_json::Map<String, Value>) {
        obj.insert(
            "type".to_string(),
            Value::String(self.backing.as_str().to_string()),
        );
        obj.insert("isStrict".to_string(), Value::Bool(self.is_strict));
        obj.insert(
            "enumerators".to_string(),
            Value::Array(
                self.enumerators
                    .iter()
                    .map(|e| {
                        let mut entry = serde_json::Map::new();
                        entry.insert("name".to_string(), Value::String(e.name.clone()));
                        entry.insert("value".to_string(), e.value.to_json());
                        if let Some(label) = &e.label {
                            entry.insert("label".to_string(), Value::String(label.clone()));
                        }
                        if let Some(description) = &e.description {
                            entry.insert(
                                "description".to_string(),
                                Value::String(description.clone()),
                            );
                        }
                        Value::Object(entry)
                    })
                    .collect(),
            ),
        );
    }
}
