//! JSON source format parser
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{PropertyKind, RawItem, RawProperty, SchemaParser};
use crate::error::{Error, Result};
use crate::item::{PrimitiveType, SchemaItemType};
use crate::key::is_valid_ec_name;
use crate::props::{
    ConstantProps, CustomAttributeClassProps, EntityClassProps, EnumerationPropertyProps,
    EnumerationProps, FormatProps, InvertedUnitProps, KindOfQuantityProps, MixinProps,
    NavigationPropertyProps, PhenomenonProps, PrimitiveArrayPropertyProps,
    PrimitivePropertyProps, PropertyCategoryProps, RelationshipClassProps, SchemaProps,
    SchemaReferenceProps, StructArrayPropertyProps, StructClassProps, StructPropertyProps,
    UnitProps, UnitSystemProps,
};

/// The schema-of-schemas URL accepted at the document top level
pub const ECSCHEMA_JSON_URL: &str = "https://dev.bentley.com/json_schemas/ec/32/ecschema";

/// Parser for the canonical JSON form
pub struct JsonParser {
    root: Value,
    schema_name: String,
}

impl JsonParser {
    /// Parse document text; fails on malformed JSON or missing header fields
    pub fn new(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| Error::schema_read_with("<document>", "invalid JSON", e))?;
        Self::from_value(root)
    }

    /// Wrap an already-parsed JSON value
    pub fn from_value(root: Value) -> Result<Self> {
        let obj = root.as_object().ok_or_else(|| {
            Error::schema_read("<document>", "top level must be a JSON object")
        })?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::schema_read("<document>", "missing required field 'name'"))?
            .to_string();
        if !is_valid_ec_name(&name) {
            return Err(Error::InvalidName { name });
        }
        let url = obj
            .get("$schema")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::schema_read(&name, "missing required field '$schema'"))?;
        if url != ECSCHEMA_JSON_URL {
            return Err(Error::schema_read(
                &name,
                format!("unsupported $schema '{}'", url),
            ));
        }
        if obj.get("version").and_then(Value::as_str).is_none() {
            return Err(Error::schema_read(&name, "missing required field 'version'"));
        }
        Ok(Self {
            root,
            schema_name: name,
        })
    }

    fn read_err(&self, message: impl Into<String>) -> Error {
        Error::schema_read(&self.schema_name, message)
    }

    /// Expand same-schema shorthand to the full `Schema.Item` spelling
    fn qualify(&self, reference: &str) -> String {
        if reference.contains('.') {
            reference.to_string()
        } else {
            format!("{}.{}", self.schema_name, reference)
        }
    }

    fn qualify_opt(&self, reference: &mut Option<String>) {
        if let Some(r) = reference.as_mut() {
            *r = self.qualify(r);
        }
    }

    fn item_props<T: DeserializeOwned>(&self, item: &RawItem<Value>) -> Result<T> {
        serde_json::from_value(item.data.clone()).map_err(|e| {
            Error::schema_read_with(
                &self.schema_name,
                format!("item '{}' is malformed", item.name),
                e,
            )
        })
    }

    fn property_props<T: DeserializeOwned>(&self, property: &RawProperty<Value>) -> Result<T> {
        let name = property
            .data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        serde_json::from_value(property.data.clone()).map_err(|e| {
            Error::schema_read_with(
                &self.schema_name,
                format!("property '{}' is malformed", name),
                e,
            )
        })
    }

    fn qualify_property_base(&self, props: &mut crate::props::PropertyProps) {
        self.qualify_opt(&mut props.category);
        self.qualify_opt(&mut props.kind_of_quantity);
    }

    fn raw_item(&self, name: &str, data: &Value) -> Result<RawItem<Value>> {
        let type_str = data
            .get("schemaItemType")
            .and_then(Value::as_str)
            .ok_or_else(|| self.read_err(format!("item '{}' is missing 'schemaItemType'", name)))?;
        let item_type = SchemaItemType::parse(type_str).ok_or_else(|| {
            self.read_err(format!(
                "item '{}' has unknown schemaItemType '{}'",
                name, type_str
            ))
        })?;
        Ok(RawItem {
            name: name.to_string(),
            item_type,
            data: data.clone(),
        })
    }
}

impl SchemaParser for JsonParser {
    type Item = Value;
    type Property = Value;

    fn schema_props(&self) -> Result<SchemaProps> {
        serde_json::from_value(self.root.clone()).map_err(|e| {
            Error::schema_read_with(&self.schema_name, "invalid schema header", e)
        })
    }

    fn references(&self) -> Result<Vec<SchemaReferenceProps>> {
        Ok(self.schema_props()?.references)
    }

    fn items(&self) -> Result<Vec<RawItem<Value>>> {
        let Some(items) = self.root.get("items") else {
            return Ok(Vec::new());
        };
        let map = items
            .as_object()
            .ok_or_else(|| self.read_err("'items' must be an object keyed by item name"))?;
        let mut raw = Vec::with_capacity(map.len());
        for (name, data) in map {
            raw.push(self.raw_item(name, data)?);
        }
        Ok(raw)
    }

    fn find_item(&self, name: &str) -> Result<Option<RawItem<Value>>> {
        let Some(items) = self.root.get("items").and_then(Value::as_object) else {
            return Ok(None);
        };
        for (item_name, data) in items {
            if item_name.eq_ignore_ascii_case(name) {
                return Ok(Some(self.raw_item(item_name, data)?));
            }
        }
        Ok(None)
    }

    fn parse_entity_class(&self, item: &RawItem<Value>) -> Result<EntityClassProps> {
        let mut props: EntityClassProps = self.item_props(item)?;
        self.qualify_opt(&mut props.base_class);
        for mixin in &mut props.mixins {
            *mixin = self.qualify(mixin);
        }
        Ok(props)
    }

    fn parse_mixin(&self, item: &RawItem<Value>) -> Result<MixinProps> {
        let mut props: MixinProps = self.item_props(item)?;
        props.applies_to = self.qualify(&props.applies_to);
        self.qualify_opt(&mut props.base_class);
        Ok(props)
    }

    fn parse_struct_class(&self, item: &RawItem<Value>) -> Result<StructClassProps> {
        let mut props: StructClassProps = self.item_props(item)?;
        self.qualify_opt(&mut props.base_class);
        Ok(props)
    }

    fn parse_custom_attribute_class(
        &self,
        item: &RawItem<Value>,
    ) -> Result<CustomAttributeClassProps> {
        let mut props: CustomAttributeClassProps = self.item_props(item)?;
        self.qualify_opt(&mut props.base_class);
        Ok(props)
    }

    fn parse_relationship_class(&self, item: &RawItem<Value>) -> Result<RelationshipClassProps> {
        let mut props: RelationshipClassProps = self.item_props(item)?;
        self.qualify_opt(&mut props.base_class);
        for constraint in [&mut props.source, &mut props.target] {
            self.qualify_opt(&mut constraint.abstract_constraint);
            for class in &mut constraint.constraint_classes {
                *class = self.qualify(class);
            }
        }
        Ok(props)
    }

    fn parse_enumeration(&self, item: &RawItem<Value>) -> Result<EnumerationProps> {
        self.item_props(item)
    }

    fn parse_kind_of_quantity(&self, item: &RawItem<Value>) -> Result<KindOfQuantityProps> {
        let mut props: KindOfQuantityProps = self.item_props(item)?;
        props.persistence_unit = self.qualify(&props.persistence_unit);
        for format in &mut props.presentation_units {
            *format = self.qualify(format);
        }
        Ok(props)
    }

    fn parse_property_category(&self, item: &RawItem<Value>) -> Result<PropertyCategoryProps> {
        self.item_props(item)
    }

    fn parse_unit(&self, item: &RawItem<Value>) -> Result<UnitProps> {
        let mut props: UnitProps = self.item_props(item)?;
        props.phenomenon = self.qualify(&props.phenomenon);
        props.unit_system = self.qualify(&props.unit_system);
        Ok(props)
    }

    fn parse_inverted_unit(&self, item: &RawItem<Value>) -> Result<InvertedUnitProps> {
        let mut props: InvertedUnitProps = self.item_props(item)?;
        props.inverts_unit = self.qualify(&props.inverts_unit);
        props.unit_system = self.qualify(&props.unit_system);
        Ok(props)
    }

    fn parse_constant(&self, item: &RawItem<Value>) -> Result<ConstantProps> {
        let mut props: ConstantProps = self.item_props(item)?;
        props.phenomenon = self.qualify(&props.phenomenon);
        Ok(props)
    }

    fn parse_phenomenon(&self, item: &RawItem<Value>) -> Result<PhenomenonProps> {
        self.item_props(item)
    }

    fn parse_format(&self, item: &RawItem<Value>) -> Result<FormatProps> {
        let mut props: FormatProps = self.item_props(item)?;
        if let Some(composite) = props.composite.as_mut() {
            for unit in &mut composite.units {
                unit.name = self.qualify(&unit.name);
            }
        }
        Ok(props)
    }

    fn parse_unit_system(&self, item: &RawItem<Value>) -> Result<UnitSystemProps> {
        self.item_props(item)
    }

    fn properties(&self, item: &RawItem<Value>) -> Result<Vec<RawProperty<Value>>> {
        let Some(entries) = item.data.get("properties") else {
            return Ok(Vec::new());
        };
        let entries = entries.as_array().ok_or_else(|| {
            self.read_err(format!("'properties' of item '{}' must be an array", item.name))
        })?;

        let mut raw = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
            let type_str = entry.get("type").and_then(Value::as_str).ok_or_else(|| {
                self.read_err(format!(
                    "property '{}' of item '{}' is missing 'type'",
                    name, item.name
                ))
            })?;

            let element_type = |field: &str| -> Result<&str> {
                entry.get(field).and_then(Value::as_str).ok_or_else(|| {
                    self.read_err(format!(
                        "property '{}' of item '{}' is missing '{}'",
                        name, item.name, field
                    ))
                })
            };

            let kind = match type_str {
                // A primitive entry whose typeName is not a primitive
                // denotes an enumeration property.
                "PrimitiveProperty" => {
                    if PrimitiveType::parse(element_type("typeName")?).is_some() {
                        PropertyKind::Primitive
                    } else {
                        PropertyKind::Enumeration
                    }
                }
                "PrimitiveArrayProperty" => {
                    let type_name = element_type("typeName")?;
                    if PrimitiveType::parse(type_name).is_none() {
                        return Err(self.read_err(format!(
                            "array property '{}' of item '{}' has non-primitive element type '{}'",
                            name, item.name, type_name
                        )));
                    }
                    PropertyKind::PrimitiveArray
                }
                "StructProperty" => PropertyKind::Struct,
                "StructArrayProperty" => PropertyKind::StructArray,
                "NavigationProperty" => PropertyKind::Navigation,
                other => {
                    return Err(self.read_err(format!(
                        "property '{}' of item '{}' has unknown type '{}'",
                        name, item.name, other
                    )))
                }
            };
            raw.push(RawProperty {
                kind,
                data: entry.clone(),
            });
        }
        Ok(raw)
    }

    fn parse_primitive_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<PrimitivePropertyProps> {
        let mut props: PrimitivePropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        Ok(props)
    }

    fn parse_enumeration_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<EnumerationPropertyProps> {
        let mut props: EnumerationPropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        props.type_name = self.qualify(&props.type_name);
        Ok(props)
    }

    fn parse_struct_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<StructPropertyProps> {
        let mut props: StructPropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        props.type_name = self.qualify(&props.type_name);
        Ok(props)
    }

    fn parse_primitive_array_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<PrimitiveArrayPropertyProps> {
        let mut props: PrimitiveArrayPropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        Ok(props)
    }

    fn parse_struct_array_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<StructArrayPropertyProps> {
        let mut props: StructArrayPropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        props.type_name = self.qualify(&props.type_name);
        Ok(props)
    }

    fn parse_navigation_property(
        &self,
        property: &RawProperty<Value>,
    ) -> Result<NavigationPropertyProps> {
        let mut props: NavigationPropertyProps = self.property_props(property)?;
        self.qualify_property_base(&mut props.base);
        props.relationship_name = self.qualify(&props.relationship_name);
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plant_doc() -> Value {
        json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": "Plant",
            "version": "01.00.00",
            "alias": "plant",
            "references": [{"name": "Units", "version": "01.00.00"}],
            "items": {
                "Component": {"schemaItemType": "EntityClass", "modifier": "Abstract"},
                "Pipe": {
                    "schemaItemType": "EntityClass",
                    "baseClass": "Component",
                    "properties": [
                        {"name": "Diameter", "type": "PrimitiveProperty", "typeName": "double"},
                        {"name": "Status", "type": "PrimitiveProperty", "typeName": "PipeStatus"}
                    ]
                },
                "PipeStatus": {
                    "schemaItemType": "Enumeration",
                    "type": "int",
                    "enumerators": [{"name": "Open", "value": 0}]
                }
            }
        })
    }

    #[test]
    fn test_header_fields_required() {
        assert!(JsonParser::from_value(json!({"name": "NoUrl", "version": "01.00.00"})).is_err());
        assert!(JsonParser::from_value(json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": "NoVersion"
        }))
        .is_err());
        assert!(JsonParser::from_value(json!({
            "$schema": "https://example.com/other",
            "name": "BadUrl",
            "version": "01.00.00"
        }))
        .is_err());
    }

    #[test]
    fn test_items_and_kinds() {
        let parser = JsonParser::from_value(plant_doc()).unwrap();
        let items = parser.items().unwrap();
        assert_eq!(items.len(), 3);
        let pipe = parser.find_item("pipe").unwrap().unwrap();
        assert_eq!(pipe.item_type, SchemaItemType::EntityClass);
        assert!(parser.find_item("Valve").unwrap().is_none());
    }

    #[test]
    fn test_unknown_item_type_is_a_read_error() {
        let parser = JsonParser::from_value(json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": "Bad",
            "version": "01.00.00",
            "items": {"Thing": {"schemaItemType": "Widget"}}
        }))
        .unwrap();
        assert!(matches!(parser.items(), Err(Error::SchemaRead { .. })));
    }

    #[test]
    fn test_bare_references_are_qualified() {
        let parser = JsonParser::from_value(plant_doc()).unwrap();
        let pipe = parser.find_item("Pipe").unwrap().unwrap();
        let props = parser.parse_entity_class(&pipe).unwrap();
        assert_eq!(props.base_class.as_deref(), Some("Plant.Component"));
    }

    #[test]
    fn test_property_kind_detection_splits_primitive_and_enumeration() {
        let parser = JsonParser::from_value(plant_doc()).unwrap();
        let pipe = parser.find_item("Pipe").unwrap().unwrap();
        let properties = parser.properties(&pipe).unwrap();
        assert_eq!(properties[0].kind, PropertyKind::Primitive);
        assert_eq!(properties[1].kind, PropertyKind::Enumeration);

        let status = parser.parse_enumeration_property(&properties[1]).unwrap();
        assert_eq!(status.type_name, "Plant.PipeStatus");
    }
}
