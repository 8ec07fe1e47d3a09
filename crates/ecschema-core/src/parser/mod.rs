//! Format-agnostic parsing contract and source documents
//!
//! A schema source format plugs in by implementing [`SchemaParser`]; the
//! graph builder consumes the contract and never sees format details, so a
//! new format never touches the builder.
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

pub mod json;
pub mod xml;

pub use json::JsonParser;
pub use xml::XmlParser;

use crate::error::Result;
use crate::item::SchemaItemType;
use crate::props::{
    ConstantProps, CustomAttributeClassProps, EntityClassProps, EnumerationPropertyProps,
    EnumerationProps, FormatProps, InvertedUnitProps, KindOfQuantityProps, MixinProps,
    NavigationPropertyProps, PhenomenonProps, PrimitiveArrayPropertyProps,
    PrimitivePropertyProps, PropertyCategoryProps, RelationshipClassProps, SchemaProps,
    SchemaReferenceProps, StructArrayPropertyProps, StructClassProps, StructPropertyProps,
    UnitProps, UnitSystemProps,
};

/// Source text of a schema in one of the supported formats
#[derive(Debug, Clone)]
pub enum DocumentBody {
    Json(String),
    Xml(String),
}

/// A located schema source plus an optional origin for diagnostics
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub body: DocumentBody,
    pub origin: Option<String>,
}

impl SchemaDocument {
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            body: DocumentBody::Json(text.into()),
            origin: None,
        }
    }

    pub fn xml(text: impl Into<String>) -> Self {
        Self {
            body: DocumentBody::Xml(text.into()),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// An item entry extracted from the source, before kind-specific parsing
#[derive(Debug, Clone)]
pub struct RawItem<T> {
    pub name: String,
    pub item_type: SchemaItemType,
    pub data: T,
}

/// Property kinds as detected by a parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Primitive,
    Enumeration,
    Struct,
    PrimitiveArray,
    StructArray,
    Navigation,
}

/// A property entry plus its detected kind
#[derive(Debug, Clone)]
pub struct RawProperty<T> {
    pub kind: PropertyKind,
    pub data: T,
}

/// Format-agnostic extraction of schema structure
///
/// Implementations normalize every item reference they return to the fully
/// qualified `Schema.Item` spelling; alias resolution and same-schema
/// shorthand are format concerns that stay behind this trait. Parse methods
/// fail with `Error::SchemaRead` naming the offending item; they never
/// silently default required fields.
pub trait SchemaParser {
    /// Raw per-item payload
    type Item;
    /// Raw per-property payload
    type Property;

    /// Top-level schema fields, including the reference list
    fn schema_props(&self) -> Result<SchemaProps>;

    /// The schema reference list
    fn references(&self) -> Result<Vec<SchemaReferenceProps>>;

    /// Every item declared by the document, with detected kinds
    fn items(&self) -> Result<Vec<RawItem<Self::Item>>>;

    /// A single item by name, `None` when the document does not declare it
    fn find_item(&self, name: &str) -> Result<Option<RawItem<Self::Item>>>;

    fn parse_entity_class(&self, item: &RawItem<Self::Item>) -> Result<EntityClassProps>;
    fn parse_mixin(&self, item: &RawItem<Self::Item>) -> Result<MixinProps>;
    fn parse_struct_class(&self, item: &RawItem<Self::Item>) -> Result<StructClassProps>;
    fn parse_custom_attribute_class(
        &self,
        item: &RawItem<Self::Item>,
    ) -> Result<CustomAttributeClassProps>;
    fn parse_relationship_class(
        &self,
        item: &RawItem<Self::Item>,
    ) -> Result<RelationshipClassProps>;
    fn parse_enumeration(&self, item: &RawItem<Self::Item>) -> Result<EnumerationProps>;
    fn parse_kind_of_quantity(&self, item: &RawItem<Self::Item>) -> Result<KindOfQuantityProps>;
    fn parse_property_category(
        &self,
        item: &RawItem<Self::Item>,
    ) -> Result<PropertyCategoryProps>;
    fn parse_unit(&self, item: &RawItem<Self::Item>) -> Result<UnitProps>;
    fn parse_inverted_unit(&self, item: &RawItem<Self::Item>) -> Result<InvertedUnitProps>;
    fn parse_constant(&self, item: &RawItem<Self::Item>) -> Result<ConstantProps>;
    fn parse_phenomenon(&self, item: &RawItem<Self::Item>) -> Result<PhenomenonProps>;
    fn parse_format(&self, item: &RawItem<Self::Item>) -> Result<FormatProps>;
    fn parse_unit_system(&self, item: &RawItem<Self::Item>) -> Result<UnitSystemProps>;

    /// Property entries of a class item, with detected kinds
    fn properties(&self, item: &RawItem<Self::Item>)
        -> Result<Vec<RawProperty<Self::Property>>>;

    fn parse_primitive_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<PrimitivePropertyProps>;
    fn parse_enumeration_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<EnumerationPropertyProps>;
    fn parse_struct_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<StructPropertyProps>;
    fn parse_primitive_array_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<PrimitiveArrayPropertyProps>;
    fn parse_struct_array_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<StructArrayPropertyProps>;
    fn parse_navigation_property(
        &self,
        property: &RawProperty<Self::Property>,
    ) -> Result<NavigationPropertyProps>;
}
