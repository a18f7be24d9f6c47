use chainquery_core::{ConfigError, ConfigManager};
use std::io::Write;

#[test]
fn default_config_file_round_trips_through_loader() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&path).expect("write default config");
    assert!(path.exists());

    let manager = ConfigManager::from_path(&path).expect("load written config");
    assert_eq!(manager.config_path(), Some(path.as_path()));
    assert_eq!(manager.config().intent.readiness_threshold, 0.7);
    assert_eq!(manager.config().server.max_history_turns, 100);
}

#[test]
fn custom_thresholds_are_read_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chainquery.toml");
    let mut file = std::fs::File::create(&path).expect("create config");
    writeln!(
        file,
        r#"
[intent]
readiness_threshold = 0.9
include_assistant_turns = false

[llm]
provider = "anthropic"
"#
    )
    .unwrap();

    let manager = ConfigManager::from_path(&path).expect("load config");
    let config = manager.config();
    assert_eq!(config.intent.readiness_threshold, 0.9);
    assert!(!config.intent.include_assistant_turns);
    assert_eq!(config.llm.provider, "anthropic");
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[intent\nreadiness_threshold = ").unwrap();

    match ConfigManager::from_path(&path) {
        Err(ConfigError::ParseError(_)) => {}
        other => panic!("expected parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        ConfigManager::from_path(&path),
        Err(ConfigError::NotFound(_))
    ));
}
