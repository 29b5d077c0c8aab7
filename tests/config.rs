use chrono::NaiveDate;
use smartc::config::Config;
use std::fs;
use std::path::PathBuf;

#[test]
fn loads_a_configuration_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smartc.json");
    fs::write(
        &path,
        r#"{
            "calendar_start": "2025-06-01",
            "identifier_limit": 16,
            "output": "build/home.smt"
        }"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.calendar_start, NaiveDate::from_ymd_opt(2025, 6, 1));
    assert_eq!(config.identifier_limit, 16);
    assert_eq!(config.output, Some(PathBuf::from("build/home.smt")));
}

#[test]
fn unknown_keys_are_rejected_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smartc.json");
    fs::write(&path, r#"{ "identifer_limit": 16 }"#).unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
    assert!(matches!(err.downcast_ref::<smartc::Error>(), Some(smartc::Error::Config(_))));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("absent.json"))).is_err());
}

#[test]
fn identifier_limit_shortens_written_names() {
    let config = Config {
        calendar_start: NaiveDate::from_ymd_opt(2024, 3, 1),
        identifier_limit: 4,
        output: None,
    };
    let compilation = smartc::processor::run("ROOM Kitchen;\nINT counter = 2;", &config);
    let project = compilation.project.unwrap();
    assert_eq!(project.variables[0].name, "coun");
}
