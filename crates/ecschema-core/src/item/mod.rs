//! The schema item graph: item kinds, typed payloads, and two-phase links
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::key::SchemaItemKey;

pub mod class;
pub mod enumeration;
pub mod property;
pub mod quantity;
pub mod units;

pub use class::{
    ClassModifier, CustomAttributeClass, EntityClass, Mixin, Multiplicity, RelationshipClass,
    RelationshipConstraint, StrengthDirection, StrengthType, StructClass,
};
pub use enumeration::{Enumeration, EnumerationBacking, Enumerator, EnumeratorValue};
pub use property::{
    EnumerationProperty, NavigationProperty, PrimitiveArrayProperty, PrimitiveProperty,
    PrimitiveType, Property, PropertyDetails, StructArrayProperty, StructProperty,
};
pub use quantity::{
    Format, FormatComposite, FormatCompositeUnit, FormatType, KindOfQuantity, PropertyCategory,
};
pub use units::{Constant, InvertedUnit, Phenomenon, Unit, UnitSystem};

/// Discriminator for the fourteen schema item kinds
///
/// The spellings of `as_str` are the `schemaItemType` values of the
/// canonical JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaItemType {
    EntityClass,
    Mixin,
    StructClass,
    CustomAttributeClass,
    RelationshipClass,
    Enumeration,
    KindOfQuantity,
    PropertyCategory,
    Unit,
    InvertedUnit,
    Constant,
    Phenomenon,
    Format,
    UnitSystem,
}

impl SchemaItemType {
    /// Canonical `schemaItemType` spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityClass => "EntityClass",
            Self::Mixin => "Mixin",
            Self::StructClass => "StructClass",
            Self::CustomAttributeClass => "CustomAttributeClass",
            Self::RelationshipClass => "RelationshipClass",
            Self::Enumeration => "Enumeration",
            Self::KindOfQuantity => "KindOfQuantity",
            Self::PropertyCategory => "PropertyCategory",
            Self::Unit => "Unit",
            Self::InvertedUnit => "InvertedUnit",
            Self::Constant => "Constant",
            Self::Phenomenon => "Phenomenon",
            Self::Format => "Format",
            Self::UnitSystem => "UnitSystem",
        }
    }

    /// Parse a canonical `schemaItemType` spelling
    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            Self::EntityClass,
            Self::Mixin,
            Self::StructClass,
            Self::CustomAttributeClass,
            Self::RelationshipClass,
            Self::Enumeration,
            Self::KindOfQuantity,
            Self::PropertyCategory,
            Self::Unit,
            Self::InvertedUnit,
            Self::Constant,
            Self::Phenomenon,
            Self::Format,
            Self::UnitSystem,
        ];
        all.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for SchemaItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link from one schema item to another
///
/// Links are parsed as `Unresolved` keys and flipped to `Resolved` (with
/// the kind of the target captured) once the owning context has loaded all
/// referenced schemas. Consumers must match on the state; an unresolved
/// link is a first-class value, not a missing one.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemLink {
    Unresolved(SchemaItemKey),
    Resolved {
        key: SchemaItemKey,
        kind: SchemaItemType,
    },
}

impl ItemLink {
    /// A fresh, unresolved link
    pub fn new(key: SchemaItemKey) -> Self {
        Self::Unresolved(key)
    }

    /// The target key, in either state
    pub fn key(&self) -> &SchemaItemKey {
        match self {
            Self::Unresolved(key) => key,
            Self::Resolved { key, .. } => key,
        }
    }

    /// The kind of the target, once resolved
    pub fn resolved_kind(&self) -> Option<SchemaItemType> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved { kind, .. } => Some(*kind),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Mark the link resolved with the kind of its target
    pub(crate) fn resolve(&mut self, kind: SchemaItemType) {
        let key = self.key().clone();
        *self = Self::Resolved { key, kind };
    }

    /// Rename the schema component of the key when it matches `from`
    ///
    /// Used when copying items between schemas so intra-schema links follow
    /// the item to its new home.
    pub(crate) fn repoint_schema(&mut self, from: &str, to: &str) {
        let key = match self {
            Self::Unresolved(key) => key,
            Self::Resolved { key, .. } => key,
        };
        if key.schema_name.eq_ignore_ascii_case(from) {
            key.schema_name = to.to_string();
        }
    }
}

impl fmt::Display for ItemLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Visitor signature shared by link resolution and link rewriting
///
/// The second argument lists the item kinds acceptable at that position.
pub(crate) type LinkVisitor<'a> =
    dyn FnMut(&mut ItemLink, &'static [SchemaItemType]) -> Result<()> + 'a;

/// Typed view over `SchemaItem` payloads, used by `Schema::item::<T>()`
pub trait TypedItem: Sized {
    const ITEM_TYPE: SchemaItemType;

    fn from_item(item: &SchemaItem) -> Option<&Self>;
}

macro_rules! schema_items {
    ($($variant:ident),+ $(,)?) => {
        /// A schema item of any kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum SchemaItem {
            $($variant($variant),)+
        }

        impl SchemaItem {
            /// The kind discriminator for this item
            pub fn item_type(&self) -> SchemaItemType {
                match self {
                    $(Self::$variant(_) => SchemaItemType::$variant,)+
                }
            }

            /// The item's name within its schema
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant(item) => &item.name,)+
                }
            }

            /// Optional display label
            pub fn label(&self) -> Option<&str> {
                match self {
                    $(Self::$variant(item) => item.label.as_deref(),)+
                }
            }

            /// Optional description
            pub fn description(&self) -> Option<&str> {
                match self {
                    $(Self::$variant(item) => item.description.as_deref(),)+
                }
            }

            /// Visit every item link held by this item, including links
            /// inside properties and relationship constraints
            pub(crate) fn visit_links(&mut self, visit: &mut LinkVisitor<'_>) -> Result<()> {
                match self {
                    $(Self::$variant(item) => item.visit_links(visit),)+
                }
            }

            /// Serialize the item body into the canonical JSON form
            pub fn to_json(&self) -> Value {
                let mut obj = serde_json::Map::new();
                obj.insert(
                    "schemaItemType".to_string(),
                    Value::String(self.item_type().as_str().to_string()),
                );
                if let Some(label) = self.label() {
                    obj.insert("label".to_string(), Value::String(label.to_string()));
                }
                if let Some(description) = self.description() {
                    obj.insert(
                        "description".to_string(),
                        Value::String(description.to_string()),
                    );
                }
                match self {
                    $(Self::$variant(item) => item.write_json(&mut obj),)+
                }
                Value::Object(obj)
            }
        }

        $(
            impl From<$variant> for SchemaItem {
                fn from(item: $variant) -> Self {
                    Self::$variant(item)
                }
            }

            impl TypedItem for $variant {
                const ITEM_TYPE: SchemaItemType = SchemaItemType::$variant;

                fn from_item(item: &SchemaItem) -> Option<&Self> {
                    match item {
                        SchemaItem::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }
        )+
    };
}

schema_items! {
    EntityClass,
    Mixin,
    StructClass,
    CustomAttributeClass,
    RelationshipClass,
    Enumeration,
    KindOfQuantity,
    PropertyCategory,
    Unit,
    InvertedUnit,
    Constant,
    Phenomenon,
    Format,
    UnitSystem,
}

impl SchemaItem {
    /// Properties of the item when it is one of the five class kinds
    pub fn properties(&self) -> Option<&[Property]> {
        match self {
            Self::EntityClass(c) => Some(&c.properties),
            Self::Mixin(c) => Some(&c.properties),
            Self::StructClass(c) => Some(&c.properties),
            Self::CustomAttributeClass(c) => Some(&c.properties),
            Self::RelationshipClass(c) => Some(&c.properties),
            _ => None,
        }
    }

    /// Base class link when the item kind carries one
    pub fn base_class(&self) -> Option<&ItemLink> {
        match self {
            Self::EntityClass(c) => c.base_class.as_ref(),
            Self::Mixin(c) => c.base_class.as_ref(),
            Self::StructClass(c) => c.base_class.as_ref(),
            Self::CustomAttributeClass(c) => c.base_class.as_ref(),
            Self::RelationshipClass(c) => c.base_class.as_ref(),
            _ => None,
        }
    }

    /// Rename the schema component of every link that points into `from`
    pub fn repoint_schema(&mut self, from: &str, to: &str) -> Result<()> {
        self.visit_links(&mut |link, _| {
            link.repoint_schema(from, to);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SchemaItemKey;

    #[test]
    fn test_item_type_spellings_round_trip() {
        for s in [
            "EntityClass",
            "Mixin",
            "StructClass",
            "CustomAttributeClass",
            "RelationshipClass",
            "Enumeration",
            "KindOfQuantity",
            "PropertyCategory",
            "Unit",
            "InvertedUnit",
            "Constant",
            "Phenomenon",
            "Format",
            "UnitSystem",
        ] {
            let parsed = SchemaItemType::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!(SchemaItemType::parse("NotAKind").is_none());
    }

    #[test]
    fn test_link_resolution_keeps_key() {
        let key = SchemaItemKey::new("Units", "M");
        let mut link = ItemLink::new(key.clone());
        assert!(!link.is_resolved());
        assert_eq!(link.resolved_kind(), None);

        link.resolve(SchemaItemType::Unit);
        assert!(link.is_resolved());
        assert_eq!(link.key(), &key);
        assert_eq!(link.resolved_kind(), Some(SchemaItemType::Unit));
    }

    #[test]
    fn test_link_repoint_matches_schema_case_insensitively() {
        let mut link = ItemLink::new(SchemaItemKey::new("SourceSchema", "Widget"));
        link.repoint_schema("sourceschema", "Target");
        assert_eq!(link.key().schema_name, "Target");

        let mut other = ItemLink::new(SchemaItemKey::new("Elsewhere", "Widget"));
        other.repoint_schema("SourceSchema", "Target");
        assert_eq!(other.key().schema_name, "Elsewhere");
    }

    #[test]
    fn test_typed_view_downcast() {
        let item: SchemaItem = UnitSystem::new("SI").into();
        assert!(UnitSystem::from_item(&item).is_some());
        assert!(Phenomenon::from_item(&item).is_none());
        assert_eq!(item.item_type(), SchemaItemType::UnitSystem);
    }
}
