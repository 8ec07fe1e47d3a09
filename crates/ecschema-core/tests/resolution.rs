//! End-to-end resolution tests: cross-schema references, round-tripping,
//! and concurrent access to one context

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ecschema_core::item::{EntityClass, KindOfQuantity, Unit};
use ecschema_core::parser::json::ECSCHEMA_JSON_URL;
use ecschema_core::{
    SchemaContext, SchemaDocument, SchemaKey, SchemaLocater, SchemaMatchType, SchemaVersion,
};

/// In-test locater over a fixed document set
struct FixtureLocater {
    documents: Vec<(SchemaKey, SchemaDocument)>,
}

impl FixtureLocater {
    fn new(documents: Vec<(SchemaKey, SchemaDocument)>) -> Self {
        Self { documents }
    }

    fn pick(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        self.documents
            .iter()
            .filter(|(held, _)| key.matches(held, match_type))
            .max_by_key(|(held, _)| held.version)
            .map(|(_, document)| document.clone())
    }
}

#[async_trait]
impl SchemaLocater for FixtureLocater {
    async fn locate(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Option<SchemaDocument> {
        self.pick(key, match_type)
    }

    fn locate_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        self.pick(key, match_type)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

fn key(name: &str, version: &str) -> SchemaKey {
    SchemaKey::new(name, SchemaVersion::parse(version).unwrap())
}

fn units_json() -> String {
    json!({
        "$schema": ECSCHEMA_JSON_URL,
        "name": "Units",
        "version": "01.00.00",
        "alias": "u",
        "items": {
            "SI": { "schemaItemType": "UnitSystem", "label": "International System" },
            "Length": { "schemaItemType": "Phenomenon", "definition": "LENGTH" },
            "M": {
                "schemaItemType": "Unit",
                "phenomenon": "Units.Length",
                "unitSystem": "Units.SI",
                "definition": "M"
            },
            "MM": {
                "schemaItemType": "Unit",
                "phenomenon": "Units.Length",
                "unitSystem": "Units.SI",
                "definition": "[MILLI]*M",
                "numerator": 0.001
            },
            "DefaultReal": {
                "schemaItemType": "Format",
                "type": "Decimal",
                "precision": 4
            }
        }
    })
    .to_string()
}

fn plant_json() -> String {
    json!({
        "$schema": ECSCHEMA_JSON_URL,
        "name": "Plant",
        "version": "01.00.02",
        "alias": "plant",
        "description": "Piping",
        "references": [
            { "name": "Units", "version": "01.00.00" }
        ],
        "items": {
            "PipeLength": {
                "schemaItemType": "KindOfQuantity",
                "relativeError": 0.001,
                "persistenceUnit": "Units.M",
                "presentationUnits": ["Units.DefaultReal"]
            },
            "PipeStatus": {
                "schemaItemType": "Enumeration",
                "type": "int",
                "isStrict": true,
                "enumerators": [
                    { "name": "Open", "value": 0 },
                    { "name": "Closed", "value": 1 }
                ]
            },
            "Component": { "schemaItemType": "EntityClass", "modifier": "Abstract" },
            "Pipe": {
                "schemaItemType": "EntityClass",
                "baseClass": "Plant.Component",
                "properties": [
                    {
                        "name": "Diameter",
                        "type": "PrimitiveProperty",
                        "typeName": "double",
                        "kindOfQuantity": "Plant.PipeLength"
                    },
                    {
                        "name": "Status",
                        "type": "PrimitiveProperty",
                        "typeName": "Plant.PipeStatus",
                        "isReadOnly": true
                    }
                ]
            }
        }
    })
    .to_string()
}

const PLANT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ECSchema schemaName="Plant" alias="plant" version="01.00.02" description="Piping"
          xmlns="http://www.bentley.com/schemas/Bentley.ECXML.3.2">
    <ECSchemaReference name="Units" version="01.00.00" alias="u"/>
    <KindOfQuantity typeName="PipeLength" relativeError="0.001" persistenceUnit="u:M"
                    presentationUnits="u:DefaultReal(4)"/>
    <ECEnumeration typeName="PipeStatus" backingTypeName="int" isStrict="true">
        <ECEnumerator name="Open" value="0"/>
        <ECEnumerator name="Closed" value="1"/>
    </ECEnumeration>
    <ECEntityClass typeName="Component" modifier="Abstract"/>
    <ECEntityClass typeName="Pipe">
        <BaseClass>Component</BaseClass>
        <ECProperty propertyName="Diameter" typeName="double" kindOfQuantity="PipeLength"/>
        <ECProperty propertyName="Status" typeName="PipeStatus" readOnly="true"/>
    </ECEntityClass>
</ECSchema>"#;

fn fixture_locater() -> Arc<FixtureLocater> {
    Arc::new(FixtureLocater::new(vec![
        (key("Units", "1.0.0"), SchemaDocument::json(units_json())),
        (key("Plant", "1.0.2"), SchemaDocument::json(plant_json())),
    ]))
}

#[tokio::test]
async fn test_cross_schema_links_resolve_through_the_context() {
    let context = SchemaContext::new();
    context.add_locater(fixture_locater());

    let plant = context
        .get_schema(&key("Plant", "1.0.2"), SchemaMatchType::Exact)
        .await
        .unwrap()
        .unwrap();

    let koq = plant.item::<KindOfQuantity>("PipeLength").unwrap();
    assert!(koq.persistence_unit.is_resolved());

    let units = plant.reference_schema("Units").unwrap();
    assert!(units.item::<Unit>("M").is_some());
    assert_eq!(context.schema_count(), 2);
}

#[tokio::test]
async fn test_resolved_schema_round_trips_through_json() {
    let context = SchemaContext::new();
    context.add_locater(fixture_locater());

    let plant = context
        .get_schema(&key("Plant", "1.0.2"), SchemaMatchType::Exact)
        .await
        .unwrap()
        .unwrap();

    // Re-read the serialized form through a fresh context.
    let reread_context = SchemaContext::new();
    reread_context.add_locater(Arc::new(FixtureLocater::new(vec![(
        key("Units", "1.0.0"),
        SchemaDocument::json(units_json()),
    )])));
    let reread = reread_context
        .schema_from_json(&plant.to_json().to_string())
        .unwrap();

    assert_eq!(plant.to_json(), reread.to_json());
}

#[test]
fn test_xml_and_json_sources_build_the_same_graph() {
    let xml_context = SchemaContext::new();
    xml_context.add_locater(Arc::new(FixtureLocater::new(vec![(
        key("Units", "1.0.0"),
        SchemaDocument::json(units_json()),
    )])));
    let from_xml = xml_context.schema_from_xml(PLANT_XML).unwrap();

    let json_context = SchemaContext::new();
    json_context.add_locater(Arc::new(FixtureLocater::new(vec![(
        key("Units", "1.0.0"),
        SchemaDocument::json(units_json()),
    )])));
    let from_json = json_context.schema_from_json(&plant_json()).unwrap();

    assert_eq!(from_xml.key(), from_json.key());
    assert_eq!(from_xml.item_count(), from_json.item_count());

    let xml_pipe = from_xml.item::<EntityClass>("Pipe").unwrap();
    let json_pipe = from_json.item::<EntityClass>("Pipe").unwrap();
    assert_eq!(xml_pipe, json_pipe);

    assert_eq!(from_xml.to_json(), from_json.to_json());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_sync_and_async_resolution_converge() {
    let context = SchemaContext::new();
    context.add_locater(fixture_locater());

    let keys = [key("Plant", "1.0.2"), key("Units", "1.0.0")];

    // Resolve every key on both paths at once against one context.
    let sync_task = {
        let context = context.clone();
        let keys = keys.clone();
        tokio::task::spawn_blocking(move || {
            keys.iter()
                .map(|k| {
                    context
                        .get_schema_sync(k, SchemaMatchType::Exact)
                        .unwrap()
                        .unwrap()
                        .to_json()
                })
                .collect::<Vec<_>>()
        })
    };
    let async_task = {
        let context = context.clone();
        let keys = keys.clone();
        tokio::spawn(async move {
            let mut serialized = Vec::new();
            for k in &keys {
                let schema = context
                    .get_schema(k, SchemaMatchType::Exact)
                    .await
                    .unwrap()
                    .unwrap();
                serialized.push(schema.to_json());
            }
            serialized
        })
    };

    let from_sync = sync_task.await.unwrap();
    let from_async = async_task.await.unwrap();
    assert_eq!(from_sync, from_async);
    assert_eq!(context.schema_count(), 2);
}

#[tokio::test]
async fn test_write_compatible_reference_upgrade() {
    // The locater only has Units 1.0.3; Plant declares 1.0.0. References
    // resolve write-compatibly, so the newer minor is accepted.
    let newer_units = units_json().replace("01.00.00", "01.00.03");
    let context = SchemaContext::new();
    context.add_locater(Arc::new(FixtureLocater::new(vec![
        (key("Units", "1.0.3"), SchemaDocument::json(newer_units)),
        (key("Plant", "1.0.2"), SchemaDocument::json(plant_json())),
    ])));

    let plant = context
        .get_schema(&key("Plant", "1.0.2"), SchemaMatchType::Exact)
        .await
        .unwrap()
        .unwrap();
    let units = plant.reference_schema("Units").unwrap();
    assert_eq!(units.version(), SchemaVersion::new(1, 0, 3));
    // The declared reference key keeps the version from the source document.
    assert_eq!(
        plant.references()[0].key.version,
        SchemaVersion::new(1, 0, 0)
    );
}
