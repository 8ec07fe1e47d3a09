//! Typed deserialization structs for the canonical document spellings
//!
//! Both parsers lower source documents into these structs before the
//! builder turns them into domain types, so untyped values never cross the
//! parser boundary.
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use serde::Deserialize;
use serde_json::Value;

/// Top-level schema fields, excluding the item collection
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaProps {
    #[serde(rename = "$schema")]
    pub schema_url: String,
    pub name: String,
    pub version: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub references: Vec<SchemaReferenceProps>,
}

/// One entry of the schema reference list
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaReferenceProps {
    pub name: String,
    pub version: String,
    /// Only the XML form carries reference aliases
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityClassProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: Option<String>,
    pub base_class: Option<String>,
    #[serde(default)]
    pub mixins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub applies_to: String,
    pub base_class: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructClassProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: Option<String>,
    pub base_class: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributeClassProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: Option<String>,
    pub base_class: Option<String>,
    pub applies_to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipClassProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub modifier: Option<String>,
    pub base_class: Option<String>,
    pub strength: String,
    pub strength_direction: Option<String>,
    pub source: RelationshipConstraintProps,
    pub target: RelationshipConstraintProps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipConstraintProps {
    pub multiplicity: String,
    pub role_label: String,
    pub polymorphic: Option<bool>,
    pub abstract_constraint: Option<String>,
    #[serde(default)]
    pub constraint_classes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerationProps {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub backing: String,
    pub is_strict: Option<bool>,
    #[serde(default)]
    pub enumerators: Vec<EnumeratorProps>,
}

/// Enumerator value stays a raw `Value` until the builder checks it against
/// the enumeration's backing type
#[derive(Debug, Clone, Deserialize)]
pub struct EnumeratorProps {
    pub name: String,
    pub value: Value,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindOfQuantityProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub relative_error: f64,
    pub persistence_unit: String,
    #[serde(default)]
    pub presentation_units: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCategoryProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub phenomenon: String,
    pub unit_system: String,
    pub definition: String,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    pub offset: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvertedUnitProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub inverts_unit: String,
    pub unit_system: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub phenomenon: String,
    pub definition: String,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhenomenonProps {
    pub label: Option<String>,
    pub description: Option<String>,
    pub definition: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSystemProps {
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatProps {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub format_type: String,
    pub precision: Option<u32>,
    pub decimal_separator: Option<String>,
    pub thousand_separator: Option<String>,
    pub uom_separator: Option<String>,
    pub composite: Option<FormatCompositeProps>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCompositeProps {
    pub spacer: Option<String>,
    #[serde(default)]
    pub units: Vec<FormatCompositeUnitProps>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCompositeUnitProps {
    pub name: String,
    pub label: Option<String>,
}

/// Fields shared by every property kind
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyProps {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub is_read_only: Option<bool>,
    pub category: Option<String>,
    pub kind_of_quantity: Option<String>,
    pub extended_type_name: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitivePropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerationPropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructPropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveArrayPropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub type_name: String,
    pub min_occurs: Option<u32>,
    pub max_occurs: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructArrayPropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub type_name: String,
    pub min_occurs: Option<u32>,
    pub max_occurs: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPropertyProps {
    #[serde(flatten)]
    pub base: PropertyProps,
    pub relationship_name: String,
    pub direction: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_props_from_json() {
        let props: SchemaProps = serde_json::from_value(json!({
            "$schema": "https://dev.bentley.com/json_schemas/ec/32/ecschema",
            "name": "Plant",
            "version": "01.00.02",
            "alias": "plant",
            "references": [{"name": "Units", "version": "01.00.00"}],
            "items": {}
        }))
        .unwrap();
        assert_eq!(props.name, "Plant");
        assert_eq!(props.references.len(), 1);
        assert_eq!(props.references[0].alias, None);
    }

    #[test]
    fn test_property_props_flatten_shared_fields() {
        let props: PrimitivePropertyProps = serde_json::from_value(json!({
            "name": "Diameter",
            "type": "PrimitiveProperty",
            "typeName": "double",
            "isReadOnly": true,
            "kindOfQuantity": "Plant.PipeDiameter"
        }))
        .unwrap();
        assert_eq!(props.base.name, "Diameter");
        assert_eq!(props.base.is_read_only, Some(true));
        assert_eq!(props.type_name, "double");
    }

    #[test]
    fn test_relationship_props_require_endpoints() {
        let result: Result<RelationshipClassProps, _> = serde_json::from_value(json!({
            "strength": "referencing",
            "source": {"multiplicity": "(0..*)", "roleLabel": "feeds", "constraintClasses": ["Plant.Pipe"]}
        }));
        assert!(result.is_err());
    }
}
