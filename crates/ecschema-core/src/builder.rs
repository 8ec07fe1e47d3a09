//! Assembles unlinked schemas from any source format
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use serde_json::Value;

use crate::error::{Error, Result};
use crate::item::{
    ClassModifier, Constant, CustomAttributeClass, EntityClass, Enumeration, EnumerationBacking,
    EnumerationProperty, Enumerator, EnumeratorValue, Format, FormatComposite,
    FormatCompositeUnit, FormatType, InvertedUnit, ItemLink, KindOfQuantity, Mixin, Multiplicity,
    NavigationProperty, Phenomenon, PrimitiveArrayProperty, PrimitiveProperty, PrimitiveType,
    Property, PropertyCategory, PropertyDetails, RelationshipClass, RelationshipConstraint,
    SchemaItem, SchemaItemType, StrengthDirection, StrengthType, StructArrayProperty,
    StructClass, StructProperty, Unit, UnitSystem,
};
use crate::key::{is_valid_ec_name, SchemaItemKey, SchemaKey, SchemaVersion};
use crate::parser::{PropertyKind, RawItem, RawProperty, SchemaParser};
use crate::props::{EnumeratorProps, PropertyProps, RelationshipConstraintProps};
use crate::schema::Schema;

/// Builds a [`Schema`] from a parsed source document
///
/// The result holds unresolved item links and unattached references; the
/// owning context resolves references and calls [`Schema::link`] before the
/// schema is handed out.
pub struct SchemaBuilder;

impl SchemaBuilder {
    pub fn build<P: SchemaParser>(parser: &P) -> Result<Schema> {
        let props = parser.schema_props()?;
        if !is_valid_ec_name(&props.name) {
            return Err(Error::InvalidName { name: props.name });
        }
        let version = SchemaVersion::parse(&props.version)?;
        let mut schema = Schema::new(SchemaKey::new(props.name.clone(), version));
        schema.alias = props.alias;
        schema.label = props.label;
        schema.description = props.description;

        for reference in parser.references()? {
            if !is_valid_ec_name(&reference.name) {
                return Err(Error::InvalidName {
                    name: reference.name,
                });
            }
            let version = SchemaVersion::parse(&reference.version)?;
            schema.add_reference(SchemaKey::new(reference.name, version), reference.alias)?;
        }

        for raw in parser.items()? {
            let item = Self::build_item(parser, &props.name, &raw)?;
            schema.add_item(item)?;
        }
        Ok(schema)
    }

    /// Build one item in isolation, without touching its siblings
    pub fn build_item<P: SchemaParser>(
        parser: &P,
        schema_name: &str,
        raw: &RawItem<P::Item>,
    ) -> Result<SchemaItem> {
        if !is_valid_ec_name(&raw.name) {
            return Err(Error::InvalidName {
                name: raw.name.clone(),
            });
        }
        let item = match raw.item_type {
            SchemaItemType::EntityClass => {
                let props = parser.parse_entity_class(raw)?;
                let mut class = EntityClass::new(&raw.name);
                class.label = props.label;
                class.description = props.description;
                class.modifier = modifier(schema_name, &raw.name, props.modifier.as_deref())?;
                class.base_class = opt_link(props.base_class)?;
                class.mixins = links(&props.mixins)?;
                class.properties = Self::build_properties(parser, schema_name, raw)?;
                class.into()
            }
            SchemaItemType::Mixin => {
                let props = parser.parse_mixin(raw)?;
                Mixin {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    applies_to: link(&props.applies_to)?,
                    base_class: opt_link(props.base_class)?,
                    properties: Self::build_properties(parser, schema_name, raw)?,
                }
                .into()
            }
            SchemaItemType::StructClass => {
                let props = parser.parse_struct_class(raw)?;
                let mut class = StructClass::new(&raw.name);
                class.label = props.label;
                class.description = props.description;
                class.modifier = modifier(schema_name, &raw.name, props.modifier.as_deref())?;
                class.base_class = opt_link(props.base_class)?;
                class.properties = Self::build_properties(parser, schema_name, raw)?;
                class.into()
            }
            SchemaItemType::CustomAttributeClass => {
                let props = parser.parse_custom_attribute_class(raw)?;
                CustomAttributeClass {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    modifier: modifier(schema_name, &raw.name, props.modifier.as_deref())?,
                    base_class: opt_link(props.base_class)?,
                    applies_to: props.applies_to,
                    properties: Self::build_properties(parser, schema_name, raw)?,
                }
                .into()
            }
            SchemaItemType::RelationshipClass => {
                let props = parser.parse_relationship_class(raw)?;
                let strength = StrengthType::parse(&props.strength).ok_or_else(|| {
                    Error::schema_read(
                        schema_name,
                        format!(
                            "relationship '{}' has unknown strength '{}'",
                            raw.name, props.strength
                        ),
                    )
                })?;
                let strength_direction = match props.strength_direction.as_deref() {
                    None => StrengthDirection::Forward,
                    Some(value) => StrengthDirection::parse(value).ok_or_else(|| {
                        Error::schema_read(
                            schema_name,
                            format!(
                                "relationship '{}' has unknown strengthDirection '{}'",
                                raw.name, value
                            ),
                        )
                    })?,
                };
                RelationshipClass {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    modifier: modifier(schema_name, &raw.name, props.modifier.as_deref())?,
                    base_class: opt_link(props.base_class)?,
                    strength,
                    strength_direction,
                    source: constraint(schema_name, &raw.name, "Source", props.source)?,
                    target: constraint(schema_name, &raw.name, "Target", props.target)?,
                    properties: Self::build_properties(parser, schema_name, raw)?,
                }
                .into()
            }
            SchemaItemType::Enumeration => {
                let props = parser.parse_enumeration(raw)?;
                let backing = EnumerationBacking::parse(&props.backing).ok_or_else(|| {
                    Error::schema_read(
                        schema_name,
                        format!(
                            "enumeration '{}' has unknown backing type '{}'",
                            raw.name, props.backing
                        ),
                    )
                })?;
                let enumerators = props
                    .enumerators
                    .into_iter()
                    .map(|props| {
                        let value = enumerator_value(schema_name, &raw.name, &props)?;
                        Ok(Enumerator {
                            name: props.name,
                            value,
                            label: props.label,
                            description: props.description,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let enumeration = Enumeration {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    backing,
                    is_strict: props.is_strict.unwrap_or(true),
                    enumerators,
                };
                enumeration
                    .validate()
                    .map_err(|reason| Error::schema_read(schema_name, reason))?;
                enumeration.into()
            }
            SchemaItemType::KindOfQuantity => {
                let props = parser.parse_kind_of_quantity(raw)?;
                KindOfQuantity {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    relative_error: props.relative_error,
                    persistence_unit: link(&props.persistence_unit)?,
                    presentation_formats: links(&props.presentation_units)?,
                }
                .into()
            }
            SchemaItemType::PropertyCategory => {
                let props = parser.parse_property_category(raw)?;
                PropertyCategory {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    priority: props.priority.unwrap_or(0),
                }
                .into()
            }
            SchemaItemType::Unit => {
                let props = parser.parse_unit(raw)?;
                Unit {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    phenomenon: link(&props.phenomenon)?,
                    unit_system: link(&props.unit_system)?,
                    definition: props.definition,
                    numerator: props.numerator,
                    denominator: props.denominator,
                    offset: props.offset,
                }
                .into()
            }
            SchemaItemType::InvertedUnit => {
                let props = parser.parse_inverted_unit(raw)?;
                InvertedUnit {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    inverts_unit: link(&props.inverts_unit)?,
                    unit_system: link(&props.unit_system)?,
                }
                .into()
            }
            SchemaItemType::Constant => {
                let props = parser.parse_constant(raw)?;
                Constant {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    phenomenon: link(&props.phenomenon)?,
                    definition: props.definition,
                    numerator: props.numerator,
                    denominator: props.denominator,
                }
                .into()
            }
            SchemaItemType::Phenomenon => {
                let props = parser.parse_phenomenon(raw)?;
                Phenomenon {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    definition: props.definition,
                }
                .into()
            }
            SchemaItemType::UnitSystem => {
                let props = parser.parse_unit_system(raw)?;
                let mut system = UnitSystem::new(&raw.name);
                system.label = props.label;
                system.description = props.description;
                system.into()
            }
            SchemaItemType::Format => {
                let props = parser.parse_format(raw)?;
                let format_type = FormatType::parse(&props.format_type).ok_or_else(|| {
                    Error::schema_read(
                        schema_name,
                        format!(
                            "format '{}' has unknown type '{}'",
                            raw.name, props.format_type
                        ),
                    )
                })?;
                let composite = props
                    .composite
                    .map(|composite| -> Result<FormatComposite> {
                        let units = composite
                            .units
                            .into_iter()
                            .map(|unit| {
                                Ok(FormatCompositeUnit {
                                    unit: link(&unit.name)?,
                                    label: unit.label,
                                })
                            })
                            .collect::<Result<Vec<_>>>()?;
                        Ok(FormatComposite {
                            spacer: composite.spacer,
                            units,
                        })
                    })
                    .transpose()?;
                Format {
                    name: raw.name.clone(),
                    label: props.label,
                    description: props.description,
                    format_type,
                    precision: props.precision,
                    decimal_separator: props.decimal_separator,
                    thousand_separator: props.thousand_separator,
                    uom_separator: props.uom_separator,
                    composite,
                }
                .into()
            }
        };
        Ok(item)
    }

    fn build_properties<P: SchemaParser>(
        parser: &P,
        schema_name: &str,
        raw: &RawItem<P::Item>,
    ) -> Result<Vec<Property>> {
        let mut properties = Vec::new();
        for raw_property in parser.properties(raw)? {
            properties.push(Self::build_property(
                parser,
                schema_name,
                &raw.name,
                &raw_property,
            )?);
        }
        Ok(properties)
    }

    fn build_property<P: SchemaParser>(
        parser: &P,
        schema_name: &str,
        item_name: &str,
        raw: &RawProperty<P::Property>,
    ) -> Result<Property> {
        let property = match raw.kind {
            PropertyKind::Primitive => {
                let props = parser.parse_primitive_property(raw)?;
                let primitive_type =
                    primitive(schema_name, item_name, &props.base.name, &props.type_name)?;
                let (name, details) = details(props.base)?;
                Property::Primitive(PrimitiveProperty {
                    name,
                    details,
                    primitive_type,
                })
            }
            PropertyKind::Enumeration => {
                let props = parser.parse_enumeration_property(raw)?;
                let enumeration = link(&props.type_name)?;
                let (name, details) = details(props.base)?;
                Property::Enumeration(EnumerationProperty {
                    name,
                    details,
                    enumeration,
                })
            }
            PropertyKind::Struct => {
                let props = parser.parse_struct_property(raw)?;
                let struct_class = link(&props.type_name)?;
                let (name, details) = details(props.base)?;
                Property::Struct(StructProperty {
                    name,
                    details,
                    struct_class,
                })
            }
            PropertyKind::PrimitiveArray => {
                let props = parser.parse_primitive_array_property(raw)?;
                let primitive_type =
                    primitive(schema_name, item_name, &props.base.name, &props.type_name)?;
                let (name, details) = details(props.base)?;
                Property::PrimitiveArray(PrimitiveArrayProperty {
                    name,
                    details,
                    primitive_type,
                    min_occurs: props.min_occurs.unwrap_or(0),
                    max_occurs: props.max_occurs,
                })
            }
            PropertyKind::StructArray => {
                let props = parser.parse_struct_array_property(raw)?;
                let struct_class = link(&props.type_name)?;
                let (name, details) = details(props.base)?;
                Property::StructArray(StructArrayProperty {
                    name,
                    details,
                    struct_class,
                    min_occurs: props.min_occurs.unwrap_or(0),
                    max_occurs: props.max_occurs,
                })
            }
            PropertyKind::Navigation => {
                let props = parser.parse_navigation_property(raw)?;
                let relationship = link(&props.relationship_name)?;
                let direction = StrengthDirection::parse(&props.direction).ok_or_else(|| {
                    Error::schema_read(
                        schema_name,
                        format!(
                            "navigation property '{}' of item '{}' has unknown direction '{}'",
                            props.base.name, item_name, props.direction
                        ),
                    )
                })?;
                let (name, details) = details(props.base)?;
                Property::Navigation(NavigationProperty {
                    name,
                    details,
                    relationship,
                    direction,
                })
            }
        };
        Ok(property)
    }
}

fn link(reference: &str) -> Result<ItemLink> {
    Ok(ItemLink::new(SchemaItemKey::parse(reference)?))
}

fn opt_link(reference: Option<String>) -> Result<Option<ItemLink>> {
    reference.as_deref().map(link).transpose()
}

fn links(references: &[String]) -> Result<Vec<ItemLink>> {
    references.iter().map(|r| link(r)).collect()
}

fn modifier(schema_name: &str, item_name: &str, value: Option<&str>) -> Result<ClassModifier> {
    match value {
        None => Ok(ClassModifier::None),
        Some(raw) => ClassModifier::parse(raw).ok_or_else(|| {
            Error::schema_read(
                schema_name,
                format!("item '{}' has unknown modifier '{}'", item_name, raw),
            )
        }),
    }
}

fn constraint(
    schema_name: &str,
    item_name: &str,
    side: &str,
    props: RelationshipConstraintProps,
) -> Result<RelationshipConstraint> {
    let multiplicity = Multiplicity::parse(&props.multiplicity).ok_or_else(|| {
        Error::schema_read(
            schema_name,
            format!(
                "{} constraint of '{}' has invalid multiplicity '{}'",
                side, item_name, props.multiplicity
            ),
        )
    })?;
    Ok(RelationshipConstraint {
        multiplicity,
        role_label: props.role_label,
        polymorphic: props.polymorphic.unwrap_or(true),
        abstract_constraint: opt_link(props.abstract_constraint)?,
        constraint_classes: links(&props.constraint_classes)?,
    })
}

fn enumerator_value(
    schema_name: &str,
    item_name: &str,
    props: &EnumeratorProps,
) -> Result<EnumeratorValue> {
    match &props.value {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Ok(EnumeratorValue::Integer(integer));
            }
            Err(Error::schema_read(
                schema_name,
                format!(
                    "enumerator '{}' of '{}' must have an integer or string value",
                    props.name, item_name
                ),
            ))
        }
        Value::String(text) => Ok(EnumeratorValue::String(text.clone())),
        _ => Err(Error::schema_read(
            schema_name,
            format!(
                "enumerator '{}' of '{}' must have an integer or string value",
                props.name, item_name
            ),
        )),
    }
}

fn primitive(
    schema_name: &str,
    item_name: &str,
    property_name: &str,
    type_name: &str,
) -> Result<PrimitiveType> {
    PrimitiveType::parse(type_name).ok_or_else(|| {
        Error::schema_read(
            schema_name,
            format!(
                "property '{}' of item '{}' has unknown primitive type '{}'",
                property_name, item_name, type_name
            ),
        )
    })
}

fn details(base: PropertyProps) -> Result<(String, PropertyDetails)> {
    Ok((
        base.name,
        PropertyDetails {
            label: base.label,
            description: base.description,
            is_read_only: base.is_read_only.unwrap_or(false),
            category: opt_link(base.category)?,
            kind_of_quantity: opt_link(base.kind_of_quantity)?,
            extended_type_name: base.extended_type_name,
            min_length: base.min_length,
            max_length: base.max_length,
            min_value: base.min_value,
            max_value: base.max_value,
        },
    ))
}
