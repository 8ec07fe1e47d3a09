//! Filesystem locater tests against temporary schema directories

use std::fs;
use std::sync::Arc;

use ecschema_core::{SchemaContext, SchemaKey, SchemaMatchType, SchemaVersion};
use ecschema_locaters::{JsonFileLocater, XmlFileLocater};

fn key(name: &str, version: &str) -> SchemaKey {
    SchemaKey::new(name, SchemaVersion::parse(version).unwrap())
}

fn json_doc(name: &str, version: &str) -> String {
    format!(
        r#"{{
            "$schema": "https://dev.bentley.com/json_schemas/ec/32/ecschema",
            "name": "{name}",
            "version": "{version}",
            "items": {{
                "Widget": {{ "schemaItemType": "EntityClass" }}
            }}
        }}"#
    )
}

fn write_json_schema(dir: &std::path::Path, name: &str, version: &str) {
    let file = dir.join(format!("{name}.{version}.ecschema.json"));
    fs::write(file, json_doc(name, version)).unwrap();
}

#[test]
fn test_exact_and_latest_pick_the_right_file() {
    let dir = tempfile::tempdir().unwrap();
    write_json_schema(dir.path(), "Foo", "01.00.00");
    write_json_schema(dir.path(), "Foo", "01.02.00");
    // Files outside the naming convention are ignored.
    fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();
    fs::write(dir.path().join("Foo.ecschema.json"), "unversioned").unwrap();

    let context = SchemaContext::new();
    context.add_locater(Arc::new(JsonFileLocater::new([dir.path()])));

    let latest = context
        .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::Latest)
        .unwrap()
        .unwrap();
    assert_eq!(latest.version(), SchemaVersion::new(1, 2, 0));

    let exact = context
        .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::Exact)
        .unwrap()
        .unwrap();
    assert_eq!(exact.version(), SchemaVersion::new(1, 0, 0));
}

#[tokio::test]
async fn test_async_resolution_reads_files() {
    let dir = tempfile::tempdir().unwrap();
    write_json_schema(dir.path(), "Bar", "02.00.01");

    let context = SchemaContext::new();
    context.add_locater(Arc::new(JsonFileLocater::new([dir.path()])));

    let schema = context
        .get_schema(&key("Bar", "2.0.1"), SchemaMatchType::Identical)
        .await
        .unwrap()
        .unwrap();
    assert!(schema.any_item("Widget").is_some());
}

#[test]
fn test_missing_directory_is_a_miss_not_an_error() {
    let context = SchemaContext::new();
    context.add_locater(Arc::new(JsonFileLocater::new(["/no/such/directory"])));

    let resolved = context
        .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::Latest)
        .unwrap();
    assert!(resolved.is_none());
}

#[test]
fn test_search_paths_probe_in_order_across_directories() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write_json_schema(first.path(), "Foo", "01.00.00");
    write_json_schema(second.path(), "Foo", "01.00.04");

    let context = SchemaContext::new();
    context.add_locater(Arc::new(JsonFileLocater::new([
        first.path(),
        second.path(),
    ])));

    // Candidates from every search path compete; the best version wins.
    let found = context
        .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::LatestWriteCompatible)
        .unwrap()
        .unwrap();
    assert_eq!(found.version(), SchemaVersion::new(1, 0, 4));
}

#[test]
fn test_xml_locater_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ECSchema schemaName="Fixtures" alias="fx" version="01.00.00"
          xmlns="http://www.bentley.com/schemas/Bentley.ECXML.3.2">
    <ECEntityClass typeName="Widget"/>
</ECSchema>"#;
    fs::write(dir.path().join("Fixtures.01.00.00.ecschema.xml"), xml).unwrap();

    let context = SchemaContext::new();
    context.add_locater(Arc::new(XmlFileLocater::new([dir.path()])));

    let schema = context
        .get_schema_sync(&key("Fixtures", "1.0.0"), SchemaMatchType::Exact)
        .unwrap()
        .unwrap();
    assert_eq!(schema.alias.as_deref(), Some("fx"));
    assert!(schema.any_item("Widget").is_some());
}

#[test]
fn test_schema_references_resolve_across_locater_files() {
    let dir = tempfile::tempdir().unwrap();
    write_json_schema(dir.path(), "Base", "01.00.00");
    let dependent = r#"{
        "$schema": "https://dev.bentley.com/json_schemas/ec/32/ecschema",
        "name": "App",
        "version": "01.00.00",
        "references": [{ "name": "Base", "version": "01.00.00" }],
        "items": {
            "Thing": { "schemaItemType": "EntityClass", "baseClass": "Base.Widget" }
        }
    }"#;
    fs::write(dir.path().join("App.01.00.00.ecschema.json"), dependent).unwrap();

    let context = SchemaContext::new();
    context.add_locater(Arc::new(JsonFileLocater::new([dir.path()])));

    let app = context
        .get_schema_sync(&key("App", "1.0.0"), SchemaMatchType::Exact)
        .unwrap()
        .unwrap();
    assert!(app.reference_schema("Base").is_some());
    assert_eq!(context.schema_count(), 2);
}
