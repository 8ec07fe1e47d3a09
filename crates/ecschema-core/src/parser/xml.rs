//! ECXML source format parser
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

use super::json::ECSCHEMA_JSON_URL;
use super::{PropertyKind, RawItem, RawProperty, SchemaParser};
use crate::error::{Error, Result};
use crate::item::{PrimitiveType, SchemaItemType};
use crate::key::is_valid_ec_name;
use crate::props::{
    ConstantProps, CustomAttributeClassProps, EntityClassProps, EnumerationPropertyProps,
    EnumerationProps, EnumeratorProps, FormatCompositeProps, FormatCompositeUnitProps,
    FormatProps, InvertedUnitProps, KindOfQuantityProps, MixinProps, NavigationPropertyProps,
    PhenomenonProps, PrimitiveArrayPropertyProps, PrimitivePropertyProps, PropertyCategoryProps,
    PropertyProps, RelationshipClassProps, RelationshipConstraintProps, SchemaProps,
    SchemaReferenceProps, StructArrayPropertyProps, StructClassProps, StructPropertyProps,
    UnitProps, UnitSystemProps,
};

/// An element parsed into owned form, with namespace prefixes stripped from
/// element names and attribute keys kept verbatim
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn local_name_str(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn element_from(start: &BytesStart<'_>, label: &str) -> Result<XmlElement> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| Error::schema_read_with(label, "invalid XML attribute", e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::schema_read_with(label, "invalid XML attribute value", e))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name: local_name_str(start),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn parse_tree(text: &str, label: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(element_from(&start, label)?),
            Ok(Event::Empty(start)) => {
                let element = element_from(&start, label)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::schema_read(label, "unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| Error::schema_read_with(label, "invalid XML text", e))?;
                    top.text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::schema_read_with(label, "invalid XML", e)),
        }
    }
    root.ok_or_else(|| Error::schema_read(label, "document has no root element"))
}

/// Parser for the ECXML 3.x form
///
/// Alias-prefixed references (`alias:Item`) are resolved against the alias
/// table declared by the document's `ECSchemaReference` elements and the
/// schema's own alias; bare names resolve to the schema itself.
pub struct XmlParser {
    root: XmlElement,
    schema_name: String,
    // lowercased alias -> schema name
    aliases: HashMap<String, String>,
}

impl XmlParser {
    pub fn new(text: &str) -> Result<Self> {
        let root = parse_tree(text, "<document>")?;
        if root.name != "ECSchema" {
            return Err(Error::schema_read(
                "<document>",
                format!("expected an ECSchema root element, found '{}'", root.name),
            ));
        }
        let ecxml = root
            .attributes
            .iter()
            .any(|(key, value)| {
                (key == "xmlns" || key.starts_with("xmlns:")) && value.contains("ECXML")
            });
        if !ecxml {
            return Err(Error::schema_read(
                "<document>",
                "missing or unsupported ECSchema xmlns",
            ));
        }
        let name = root
            .attr("schemaName")
            .ok_or_else(|| Error::schema_read("<document>", "missing 'schemaName' attribute"))?
            .to_string();
        if !is_valid_ec_name(&name) {
            return Err(Error::InvalidName { name });
        }
        if root.attr("version").is_none() {
            return Err(Error::schema_read(&name, "missing 'version' attribute"));
        }

        let mut aliases = HashMap::new();
        if let Some(alias) = root.attr("alias") {
            aliases.insert(alias.to_ascii_lowercase(), name.clone());
        }
        for reference in root.children_named("ECSchemaReference") {
            let ref_name = reference.attr("name").ok_or_else(|| {
                Error::schema_read(&name, "schema reference is missing 'name'")
            })?;
            let alias = reference.attr("alias").ok_or_else(|| {
                Error::schema_read(
                    &name,
                    format!("schema reference '{}' is missing 'alias'", ref_name),
                )
            })?;
            aliases.insert(alias.to_ascii_lowercase(), ref_name.to_string());
        }

        Ok(Self {
            root,
            schema_name: name,
            aliases,
        })
    }

    fn read_err(&self, message: impl Into<String>) -> Error {
        Error::schema_read(&self.schema_name, message)
    }

    /// Resolve `alias:Item` and bare spellings to the full `Schema.Item` form
    fn qualify(&self, reference: &str) -> Result<String> {
        if let Some((alias, item)) = reference.split_once(':') {
            let schema = self
                .aliases
                .get(&alias.to_ascii_lowercase())
                .ok_or_else(|| {
                    self.read_err(format!(
                        "reference '{}' uses undeclared alias '{}'",
                        reference, alias
                    ))
                })?;
            Ok(format!("{}.{}", schema, item))
        } else if reference.contains('.') {
            Ok(reference.to_string())
        } else {
            Ok(format!("{}.{}", self.schema_name, reference))
        }
    }

    fn qualify_opt(&self, reference: Option<&str>) -> Result<Option<String>> {
        reference.map(|r| self.qualify(r)).transpose()
    }

    fn required_attr(&self, element: &XmlElement, owner: &str, attr: &str) -> Result<String> {
        element
            .attr(attr)
            .map(str::to_string)
            .ok_or_else(|| self.read_err(format!("'{}' is missing '{}'", owner, attr)))
    }

    fn opt_bool(&self, element: &XmlElement, owner: &str, attr: &str) -> Result<Option<bool>> {
        match element.attr(attr) {
            None => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(raw) => Err(self.read_err(format!(
                "'{}' of '{}' must be true or false, got '{}'",
                attr, owner, raw
            ))),
        }
    }

    fn opt_u32(&self, element: &XmlElement, owner: &str, attr: &str) -> Result<Option<u32>> {
        element
            .attr(attr)
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    self.read_err(format!(
                        "'{}' of '{}' must be a non-negative integer, got '{}'",
                        attr, owner, raw
                    ))
                })
            })
            .transpose()
    }

    fn opt_i32(&self, element: &XmlElement, owner: &str, attr: &str) -> Result<Option<i32>> {
        element
            .attr(attr)
            .map(|raw| {
                raw.parse::<i32>().map_err(|_| {
                    self.read_err(format!(
                        "'{}' of '{}' must be an integer, got '{}'",
                        attr, owner, raw
                    ))
                })
            })
            .transpose()
    }

    fn opt_f64(&self, element: &XmlElement, owner: &str, attr: &str) -> Result<Option<f64>> {
        element
            .attr(attr)
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| {
                    self.read_err(format!(
                        "'{}' of '{}' must be numeric, got '{}'",
                        attr, owner, raw
                    ))
                })
            })
            .transpose()
    }

    fn base_and_mixins(&self, item: &RawItem<XmlElement>) -> Result<(Option<String>, Vec<String>)> {
        let mut bases = Vec::new();
        for base in item.data.children_named("BaseClass") {
            let text = base.text.trim();
            if text.is_empty() {
                return Err(self.read_err(format!(
                    "item '{}' has an empty BaseClass element",
                    item.name
                )));
            }
            bases.push(self.qualify(text)?);
        }
        let mut bases = bases.into_iter();
        let base_class = bases.next();
        Ok((base_class, bases.collect()))
    }

    fn mixin_marker<'a>(element: &'a XmlElement) -> Option<&'a XmlElement> {
        element
            .children_named("ECCustomAttributes")
            .flat_map(|ca| ca.children_named("IsMixin"))
            .next()
    }

    fn parse_constraint(
        &self,
        item: &RawItem<XmlElement>,
        side: &str,
    ) -> Result<RelationshipConstraintProps> {
        let element = item.data.child(side).ok_or_else(|| {
            self.read_err(format!(
                "relationship '{}' is missing its {} constraint",
                item.name, side
            ))
        })?;
        let owner = format!("{}.{}", item.name, side);
        let mut constraint_classes = Vec::new();
        for class in element.children_named("Class") {
            let name = self.required_attr(class, &owner, "class")?;
            constraint_classes.push(self.qualify(&name)?);
        }
        Ok(RelationshipConstraintProps {
            multiplicity: self.required_attr(element, &owner, "multiplicity")?,
            role_label: self.required_attr(element, &owner, "roleLabel")?,
            polymorphic: self.opt_bool(element, &owner, "polymorphic")?,
            abstract_constraint: self.qualify_opt(element.attr("abstractConstraint"))?,
            constraint_classes,
        })
    }

    fn property_base(&self, element: &XmlElement) -> Result<PropertyProps> {
        let name = self.required_attr(element, &format!("<{}>", element.name), "propertyName")?;
        Ok(PropertyProps {
            label: element.attr("displayLabel").map(str::to_string),
            description: element.attr("description").map(str::to_string),
            is_read_only: self.opt_bool(element, &name, "readOnly")?,
            category: self.qualify_opt(element.attr("category"))?,
            kind_of_quantity: self.qualify_opt(element.attr("kindOfQuantity"))?,
            extended_type_name: element.attr("extendedTypeName").map(str::to_string),
            min_length: self.opt_u32(element, &name, "minimumLength")?,
            max_length: self.opt_u32(element, &name, "maximumLength")?,
            min_value: self.opt_f64(element, &name, "minimumValue")?,
            max_value: self.opt_f64(element, &name, "maximumValue")?,
            name,
        })
    }

    fn occurs(&self, element: &XmlElement, owner: &str) -> Result<(Option<u32>, Option<u32>)> {
        let min_occurs = self.opt_u32(element, owner, "minOccurs")?;
        let max_occurs = match element.attr("maxOccurs") {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("unbounded") => None,
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                self.read_err(format!(
                    "'maxOccurs' of '{}' must be an integer or unbounded, got '{}'",
                    owner, raw
                ))
            })?),
        };
        Ok((min_occurs, max_occurs))
    }

    fn classify(&self, element: &XmlElement) -> Result<Option<RawItem<XmlElement>>> {
        let item_type = match element.name.as_str() {
            "ECSchemaReference" | "ECCustomAttributes" => return Ok(None),
            "ECEntityClass" => {
                if Self::mixin_marker(element).is_some() {
                    SchemaItemType::Mixin
                } else {
                    SchemaItemType::EntityClass
                }
            }
            "ECStructClass" => SchemaItemType::StructClass,
            "ECCustomAttributeClass" => SchemaItemType::CustomAttributeClass,
            "ECRelationshipClass" => SchemaItemType::RelationshipClass,
            "ECEnumeration" => SchemaItemType::Enumeration,
            "KindOfQuantity" => SchemaItemType::KindOfQuantity,
            "PropertyCategory" => SchemaItemType::PropertyCategory,
            "Unit" => SchemaItemType::Unit,
            "InvertedUnit" => SchemaItemType::InvertedUnit,
            "Constant" => SchemaItemType::Constant,
            "Phenomenon" => SchemaItemType::Phenomenon,
            "UnitSystem" => SchemaItemType::UnitSystem,
            "Format" => SchemaItemType::Format,
            other => {
                return Err(self.read_err(format!("unsupported element '{}'", other)));
            }
        };
        let name = self.required_attr(element, &format!("<{}>", element.name), "typeName")?;
        Ok(Some(RawItem {
            name,
            item_type,
            data: element.clone(),
        }))
    }
}

/// Take the format reference out of a presentation entry, dropping any
/// precision or unit override decorations, e.g. `f:DefaultReal(4)[u:M]`
fn presentation_format_ref(entry: &str) -> &str {
    let end = entry
        .find(|c| c == '(' || c == '[')
        .unwrap_or(entry.len());
    entry[..end].trim()
}

impl SchemaParser for XmlParser {
    type Item = XmlElement;
    type Property = XmlElement;

    fn schema_props(&self) -> Result<SchemaProps> {
        Ok(SchemaProps {
            schema_url: ECSCHEMA_JSON_URL.to_string(),
            name: self.schema_name.clone(),
            version: self
                .required_attr(&self.root, &self.schema_name, "version")?,
            alias: self.root.attr("alias").map(str::to_string),
            label: self.root.attr("displayLabel").map(str::to_string),
            description: self.root.attr("description").map(str::to_string),
            references: self.references()?,
        })
    }

    fn references(&self) -> Result<Vec<SchemaReferenceProps>> {
        let mut references = Vec::new();
        for reference in self.root.children_named("ECSchemaReference") {
            let name = self.required_attr(reference, "<ECSchemaReference>", "name")?;
            references.push(SchemaReferenceProps {
                version: self.required_attr(reference, &name, "version")?,
                alias: Some(self.required_attr(reference, &name, "alias")?),
                name,
            });
        }
        Ok(references)
    }

    fn items(&self) -> Result<Vec<RawItem<XmlElement>>> {
        let mut items = Vec::new();
        for child in &self.root.children {
            if let Some(item) = self.classify(child)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn find_item(&self, name: &str) -> Result<Option<RawItem<XmlElement>>> {
        for child in &self.root.children {
            let matches = child
                .attr("typeName")
                .is_some_and(|n| n.eq_ignore_ascii_case(name));
            if matches {
                return self.classify(child);
            }
        }
        Ok(None)
    }

    fn parse_entity_class(&self, item: &RawItem<XmlElement>) -> Result<EntityClassProps> {
        let (base_class, mixins) = self.base_and_mixins(item)?;
        Ok(EntityClassProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            modifier: item.data.attr("modifier").map(str::to_string),
            base_class,
            mixins,
        })
    }

    fn parse_mixin(&self, item: &RawItem<XmlElement>) -> Result<MixinProps> {
        let marker = Self::mixin_marker(&item.data).ok_or_else(|| {
            self.read_err(format!(
                "mixin '{}' is missing the IsMixin custom attribute",
                item.name
            ))
        })?;
        let applies_to = marker
            .child("AppliesToEntityClass")
            .map(|e| e.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                self.read_err(format!(
                    "mixin '{}' is missing AppliesToEntityClass",
                    item.name
                ))
            })?;
        let (base_class, _) = self.base_and_mixins(item)?;
        Ok(MixinProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            applies_to: self.qualify(&applies_to)?,
            base_class,
        })
    }

    fn parse_struct_class(&self, item: &RawItem<XmlElement>) -> Result<StructClassProps> {
        let (base_class, _) = self.base_and_mixins(item)?;
        Ok(StructClassProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            modifier: item.data.attr("modifier").map(str::to_string),
            base_class,
        })
    }

    fn parse_custom_attribute_class(
        &self,
        item: &RawItem<XmlElement>,
    ) -> Result<CustomAttributeClassProps> {
        let (base_class, _) = self.base_and_mixins(item)?;
        Ok(CustomAttributeClassProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            modifier: item.data.attr("modifier").map(str::to_string),
            base_class,
            applies_to: self.required_attr(&item.data, &item.name, "appliesTo")?,
        })
    }

    fn parse_relationship_class(
        &self,
        item: &RawItem<XmlElement>,
    ) -> Result<RelationshipClassProps> {
        let (base_class, _) = self.base_and_mixins(item)?;
        Ok(RelationshipClassProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            modifier: item.data.attr("modifier").map(str::to_string),
            base_class,
            strength: self.required_attr(&item.data, &item.name, "strength")?,
            strength_direction: item.data.attr("strengthDirection").map(str::to_string),
            source: self.parse_constraint(item, "Source")?,
            target: self.parse_constraint(item, "Target")?,
        })
    }

    fn parse_enumeration(&self, item: &RawItem<XmlElement>) -> Result<EnumerationProps> {
        let backing = self.required_attr(&item.data, &item.name, "backingTypeName")?;
        let mut enumerators = Vec::new();
        for enumerator in item.data.children_named("ECEnumerator") {
            let name = self.required_attr(enumerator, &item.name, "name")?;
            let raw = self.required_attr(enumerator, &name, "value")?;
            let value = if backing.eq_ignore_ascii_case("int") {
                Value::from(raw.parse::<i64>().map_err(|_| {
                    self.read_err(format!(
                        "enumerator '{}' of '{}' must have an integer value, got '{}'",
                        name, item.name, raw
                    ))
                })?)
            } else {
                Value::String(raw)
            };
            enumerators.push(EnumeratorProps {
                value,
                label: enumerator.attr("displayLabel").map(str::to_string),
                description: enumerator.attr("description").map(str::to_string),
                name,
            });
        }
        Ok(EnumerationProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            backing,
            is_strict: self.opt_bool(&item.data, &item.name, "isStrict")?,
            enumerators,
        })
    }

    fn parse_kind_of_quantity(&self, item: &RawItem<XmlElement>) -> Result<KindOfQuantityProps> {
        let relative_error = self
            .opt_f64(&item.data, &item.name, "relativeError")?
            .ok_or_else(|| {
                self.read_err(format!("'{}' is missing 'relativeError'", item.name))
            })?;
        let persistence_unit =
            self.required_attr(&item.data, &item.name, "persistenceUnit")?;
        let mut presentation_units = Vec::new();
        if let Some(list) = item.data.attr("presentationUnits") {
            for entry in list.split(';') {
                let format = presentation_format_ref(entry);
                if !format.is_empty() {
                    presentation_units.push(self.qualify(format)?);
                }
            }
        }
        Ok(KindOfQuantityProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            relative_error,
            persistence_unit: self.qualify(&persistence_unit)?,
            presentation_units,
        })
    }

    fn parse_property_category(
        &self,
        item: &RawItem<XmlElement>,
    ) -> Result<PropertyCategoryProps> {
        Ok(PropertyCategoryProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            priority: self.opt_i32(&item.data, &item.name, "priority")?,
        })
    }

    fn parse_unit(&self, item: &RawItem<XmlElement>) -> Result<UnitProps> {
        Ok(UnitProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            phenomenon: self
                .qualify(&self.required_attr(&item.data, &item.name, "phenomenon")?)?,
            unit_system: self
                .qualify(&self.required_attr(&item.data, &item.name, "unitSystem")?)?,
            definition: self.required_attr(&item.data, &item.name, "definition")?,
            numerator: self.opt_f64(&item.data, &item.name, "numerator")?,
            denominator: self.opt_f64(&item.data, &item.name, "denominator")?,
            offset: self.opt_f64(&item.data, &item.name, "offset")?,
        })
    }

    fn parse_inverted_unit(&self, item: &RawItem<XmlElement>) -> Result<InvertedUnitProps> {
        Ok(InvertedUnitProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            inverts_unit: self
                .qualify(&self.required_attr(&item.data, &item.name, "invertsUnit")?)?,
            unit_system: self
                .qualify(&self.required_attr(&item.data, &item.name, "unitSystem")?)?,
        })
    }

    fn parse_constant(&self, item: &RawItem<XmlElement>) -> Result<ConstantProps> {
        Ok(ConstantProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            phenomenon: self
                .qualify(&self.required_attr(&item.data, &item.name, "phenomenon")?)?,
            definition: self.required_attr(&item.data, &item.name, "definition")?,
            numerator: self.opt_f64(&item.data, &item.name, "numerator")?,
            denominator: self.opt_f64(&item.data, &item.name, "denominator")?,
        })
    }

    fn parse_phenomenon(&self, item: &RawItem<XmlElement>) -> Result<PhenomenonProps> {
        Ok(PhenomenonProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            definition: self.required_attr(&item.data, &item.name, "definition")?,
        })
    }

    fn parse_format(&self, item: &RawItem<XmlElement>) -> Result<FormatProps> {
        let composite = item
            .data
            .child("Composite")
            .map(|composite| -> Result<FormatCompositeProps> {
                let mut units = Vec::new();
                for unit in composite.children_named("Unit") {
                    let text = unit.text.trim();
                    if text.is_empty() {
                        return Err(self.read_err(format!(
                            "format '{}' has a composite unit with no name",
                            item.name
                        )));
                    }
                    units.push(FormatCompositeUnitProps {
                        name: self.qualify(text)?,
                        label: unit.attr("label").map(str::to_string),
                    });
                }
                Ok(FormatCompositeProps {
                    spacer: composite.attr("spacer").map(str::to_string),
                    units,
                })
            })
            .transpose()?;
        Ok(FormatProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
            format_type: self.required_attr(&item.data, &item.name, "type")?,
            precision: self.opt_u32(&item.data, &item.name, "precision")?,
            decimal_separator: item.data.attr("decimalSeparator").map(str::to_string),
            thousand_separator: item.data.attr("thousandSeparator").map(str::to_string),
            uom_separator: item.data.attr("uomSeparator").map(str::to_string),
            composite,
        })
    }

    fn parse_unit_system(&self, item: &RawItem<XmlElement>) -> Result<UnitSystemProps> {
        Ok(UnitSystemProps {
            label: item.data.attr("displayLabel").map(str::to_string),
            description: item.data.attr("description").map(str::to_string),
        })
    }

    fn properties(&self, item: &RawItem<XmlElement>) -> Result<Vec<RawProperty<XmlElement>>> {
        let mut raw = Vec::new();
        for child in &item.data.children {
            let kind = match child.name.as_str() {
                "BaseClass" | "ECCustomAttributes" | "Source" | "Target" => continue,
                "ECProperty" => {
                    let name = child.attr("propertyName").unwrap_or("<unnamed>");
                    let type_name = self.required_attr(child, name, "typeName")?;
                    if PrimitiveType::parse(&type_name).is_some() {
                        PropertyKind::Primitive
                    } else {
                        PropertyKind::Enumeration
                    }
                }
                "ECArrayProperty" => {
                    let name = child.attr("propertyName").unwrap_or("<unnamed>");
                    let type_name = self.required_attr(child, name, "typeName")?;
                    if PrimitiveType::parse(&type_name).is_none() {
                        return Err(self.read_err(format!(
                            "array property '{}' of item '{}' has non-primitive element type '{}'",
                            name, item.name, type_name
                        )));
                    }
                    PropertyKind::PrimitiveArray
                }
                "ECStructProperty" => PropertyKind::Struct,
                "ECStructArrayProperty" => PropertyKind::StructArray,
                "ECNavigationProperty" => PropertyKind::Navigation,
                other => {
                    return Err(self.read_err(format!(
                        "item '{}' has an unexpected element '{}'",
                        item.name, other
                    )));
                }
            };
            raw.push(RawProperty {
                kind,
                data: child.clone(),
            });
        }
        Ok(raw)
    }

    fn parse_primitive_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<PrimitivePropertyProps> {
        let base = self.property_base(&property.data)?;
        Ok(PrimitivePropertyProps {
            type_name: self.required_attr(&property.data, &base.name, "typeName")?,
            base,
        })
    }

    fn parse_enumeration_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<EnumerationPropertyProps> {
        let base = self.property_base(&property.data)?;
        let type_name = self.required_attr(&property.data, &base.name, "typeName")?;
        Ok(EnumerationPropertyProps {
            type_name: self.qualify(&type_name)?,
            base,
        })
    }

    fn parse_struct_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<StructPropertyProps> {
        let base = self.property_base(&property.data)?;
        let type_name = self.required_attr(&property.data, &base.name, "typeName")?;
        Ok(StructPropertyProps {
            type_name: self.qualify(&type_name)?,
            base,
        })
    }

    fn parse_primitive_array_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<PrimitiveArrayPropertyProps> {
        let base = self.property_base(&property.data)?;
        let (min_occurs, max_occurs) = self.occurs(&property.data, &base.name)?;
        Ok(PrimitiveArrayPropertyProps {
            type_name: self.required_attr(&property.data, &base.name, "typeName")?,
            min_occurs,
            max_occurs,
            base,
        })
    }

    fn parse_struct_array_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<StructArrayPropertyProps> {
        let base = self.property_base(&property.data)?;
        let type_name = self.required_attr(&property.data, &base.name, "typeName")?;
        let (min_occurs, max_occurs) = self.occurs(&property.data, &base.name)?;
        Ok(StructArrayPropertyProps {
            type_name: self.qualify(&type_name)?,
            min_occurs,
            max_occurs,
            base,
        })
    }

    fn parse_navigation_property(
        &self,
        property: &RawProperty<XmlElement>,
    ) -> Result<NavigationPropertyProps> {
        let base = self.property_base(&property.data)?;
        let relationship = self.required_attr(&property.data, &base.name, "relationshipName")?;
        Ok(NavigationPropertyProps {
            relationship_name: self.qualify(&relationship)?,
            direction: self.required_attr(&property.data, &base.name, "direction")?,
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ECSchema schemaName="Plant" alias="plant" version="01.00.02" description="Piping"
          xmlns="http://www.bentley.com/schemas/Bentley.ECXML.3.2">
    <ECSchemaReference name="Units" version="01.00.00" alias="u"/>
    <ECEntityClass typeName="Component" modifier="Abstract"/>
    <ECEntityClass typeName="ILabeled" description="Naming surface">
        <ECCustomAttributes>
            <IsMixin xmlns="CoreCustomAttributes.01.00.00">
                <AppliesToEntityClass>Component</AppliesToEntityClass>
            </IsMixin>
        </ECCustomAttributes>
        <ECProperty propertyName="Tag" typeName="string"/>
    </ECEntityClass>
    <ECEntityClass typeName="Pipe">
        <BaseClass>Component</BaseClass>
        <BaseClass>ILabeled</BaseClass>
        <ECProperty propertyName="Diameter" typeName="double" kindOfQuantity="u:LENGTH"/>
        <ECProperty propertyName="Status" typeName="PipeStatus" readOnly="true"/>
        <ECArrayProperty propertyName="Inspections" typeName="dateTime" minOccurs="0" maxOccurs="unbounded"/>
    </ECEntityClass>
    <ECRelationshipClass typeName="PipeHasComponent" strength="embedding" strengthDirection="forward" modifier="Sealed">
        <Source multiplicity="(1..1)" roleLabel="has" polymorphic="true">
            <Class class="Pipe"/>
        </Source>
        <Target multiplicity="(0..*)" roleLabel="belongs to" polymorphic="true" abstractConstraint="Component">
            <Class class="Component"/>
        </Target>
    </ECRelationshipClass>
    <ECEnumeration typeName="PipeStatus" backingTypeName="int" isStrict="true">
        <ECEnumerator name="Open" value="0" displayLabel="Open"/>
        <ECEnumerator name="Closed" value="1"/>
    </ECEnumeration>
    <KindOfQuantity typeName="FlowRate" relativeError="0.001" persistenceUnit="u:M"
                    presentationUnits="u:DefaultReal(4)[u:M];u:AmerFI"/>
</ECSchema>"#;

    #[test]
    fn test_rejects_non_ecschema_documents() {
        assert!(XmlParser::new("<Other/>").is_err());
        assert!(XmlParser::new(r#"<ECSchema schemaName="A" version="01.00.00"/>"#).is_err());
        assert!(XmlParser::new("not xml at all").is_err());
    }

    #[test]
    fn test_header_and_references() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let props = parser.schema_props().unwrap();
        assert_eq!(props.name, "Plant");
        assert_eq!(props.version, "01.00.02");
        assert_eq!(props.alias.as_deref(), Some("plant"));
        assert_eq!(props.references.len(), 1);
        assert_eq!(props.references[0].name, "Units");
    }

    #[test]
    fn test_mixin_detection_via_custom_attribute() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let labeled = parser.find_item("ILabeled").unwrap().unwrap();
        assert_eq!(labeled.item_type, SchemaItemType::Mixin);
        let props = parser.parse_mixin(&labeled).unwrap();
        assert_eq!(props.applies_to, "Plant.Component");

        let component = parser.find_item("Component").unwrap().unwrap();
        assert_eq!(component.item_type, SchemaItemType::EntityClass);
    }

    #[test]
    fn test_base_class_list_splits_base_and_mixins() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let pipe = parser.find_item("Pipe").unwrap().unwrap();
        let props = parser.parse_entity_class(&pipe).unwrap();
        assert_eq!(props.base_class.as_deref(), Some("Plant.Component"));
        assert_eq!(props.mixins, vec!["Plant.ILabeled".to_string()]);
    }

    #[test]
    fn test_alias_references_resolve_to_schema_names() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let pipe = parser.find_item("Pipe").unwrap().unwrap();
        let properties = parser.properties(&pipe).unwrap();
        assert_eq!(properties.len(), 3);
        assert_eq!(properties[0].kind, PropertyKind::Primitive);
        assert_eq!(properties[1].kind, PropertyKind::Enumeration);
        assert_eq!(properties[2].kind, PropertyKind::PrimitiveArray);

        let diameter = parser.parse_primitive_property(&properties[0]).unwrap();
        assert_eq!(diameter.base.kind_of_quantity.as_deref(), Some("Units.LENGTH"));

        let status = parser.parse_enumeration_property(&properties[1]).unwrap();
        assert_eq!(status.type_name, "Plant.PipeStatus");
        assert_eq!(status.base.is_read_only, Some(true));

        let inspections = parser
            .parse_primitive_array_property(&properties[2])
            .unwrap();
        assert_eq!(inspections.min_occurs, Some(0));
        assert_eq!(inspections.max_occurs, None);
    }

    #[test]
    fn test_undeclared_alias_is_a_read_error() {
        let xml = r#"<ECSchema schemaName="A" alias="a" version="01.00.00"
                               xmlns="http://www.bentley.com/schemas/Bentley.ECXML.3.2">
            <ECEntityClass typeName="Thing">
                <BaseClass>nosuch:Base</BaseClass>
            </ECEntityClass>
        </ECSchema>"#;
        let parser = XmlParser::new(xml).unwrap();
        let thing = parser.find_item("Thing").unwrap().unwrap();
        assert!(matches!(
            parser.parse_entity_class(&thing),
            Err(Error::SchemaRead { .. })
        ));
    }

    #[test]
    fn test_relationship_constraints() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let rel = parser.find_item("PipeHasComponent").unwrap().unwrap();
        assert_eq!(rel.item_type, SchemaItemType::RelationshipClass);
        let props = parser.parse_relationship_class(&rel).unwrap();
        assert_eq!(props.strength, "embedding");
        assert_eq!(props.source.multiplicity, "(1..1)");
        assert_eq!(props.source.constraint_classes, vec!["Plant.Pipe".to_string()]);
        assert_eq!(
            props.target.abstract_constraint.as_deref(),
            Some("Plant.Component")
        );
    }

    #[test]
    fn test_enumeration_values_follow_backing_type() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let status = parser.find_item("PipeStatus").unwrap().unwrap();
        let props = parser.parse_enumeration(&status).unwrap();
        assert_eq!(props.backing, "int");
        assert_eq!(props.enumerators.len(), 2);
        assert_eq!(props.enumerators[0].value, Value::from(0));
    }

    #[test]
    fn test_presentation_units_drop_override_decorations() {
        let parser = XmlParser::new(PLANT_XML).unwrap();
        let koq = parser.find_item("FlowRate").unwrap().unwrap();
        let props = parser.parse_kind_of_quantity(&koq).unwrap();
        assert_eq!(props.persistence_unit, "Units.M");
        assert_eq!(
            props.presentation_units,
            vec!["Units.DefaultReal".to_string(), "Units.AmerFI".to_string()]
        );
    }
}
