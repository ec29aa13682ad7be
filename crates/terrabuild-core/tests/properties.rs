use std::collections::BTreeMap;
use terrabuild_core::properties::{interpolate, interpolate_value, load_env_file};

#[test]
fn test_load_env_file_skips_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".terrabuild.env");
    std::fs::write(&path, "# secrets\nUSER = alice\n\nTOKEN=abc=def\n").unwrap();
    let vars = load_env_file(&path).unwrap();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars["USER"], "alice");
    assert_eq!(vars["TOKEN"], "abc=def");
}

#[test]
fn test_load_env_file_missing_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_env_file(&dir.path().join(".terrabuild.env"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_interpolate_prefers_overrides() {
    let mut vars = BTreeMap::new();
    vars.insert("TERRABUILD_TEST_USER".to_string(), "alice".to_string());
    assert_eq!(
        interpolate("user=${env:TERRABUILD_TEST_USER}", &vars),
        "user=alice"
    );
}

#[test]
fn test_interpolate_unknown_is_empty() {
    let vars = BTreeMap::new();
    assert_eq!(
        interpolate("[${env:TERRABUILD_SURELY_UNSET_VAR}]", &vars),
        "[]"
    );
}

#[test]
fn test_interpolate_leaves_catalog_placeholders() {
    let vars = BTreeMap::new();
    let input = "cloud-fabric:${Libraries.cloud} and $minecraft";
    assert_eq!(interpolate(input, &vars), input);
}

#[test]
fn test_interpolate_value_reaches_nested_strings() {
    let mut vars = BTreeMap::new();
    vars.insert("TERRABUILD_TEST_JVM".to_string(), "-Xmx2G".to_string());
    let mut doc: toml::Value = toml::from_str(
        r#"
[platform.fabric.run]
server = ["java", "${env:TERRABUILD_TEST_JVM}", "-jar", "server.jar"]
"${env:TERRABUILD_TEST_JVM}" = 1
"#,
    )
    .unwrap();
    interpolate_value(&mut doc, &vars);
    assert_eq!(doc["platform"]["fabric"]["run"]["server"][1].as_str(), Some("-Xmx2G"));
    assert!(doc["platform"]["fabric"]["run"]
        .as_table()
        .unwrap()
        .contains_key("${env:TERRABUILD_TEST_JVM}"));
}
