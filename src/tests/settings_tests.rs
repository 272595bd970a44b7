use crate::Error;
use crate::model::Settings;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_settings_default() {
    let settings = Settings::default();
    assert_eq!(settings.api_base_url, "http://localhost:5000/api");
    assert_eq!(settings.room_cache_ttl(), Duration::from_secs(3));
    assert_eq!(settings.polling_config().interval, Duration::from_secs(5));
    assert_eq!(settings.polling_config().debounce, Duration::from_millis(300));
    assert_eq!(settings.conversation_config().page_size, 20);
    assert_eq!(
        settings.conversation_config().poll_interval,
        Duration::from_secs(2)
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn test_load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("missing.json");

    let settings = Settings::load(&path).expect("Failed to load settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_load_empty_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "  \n").expect("Failed to write file");

    let settings = Settings::load(&path).expect("Failed to load settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nested").join("settings.json");

    let settings = Settings {
        api_base_url: "https://clinic.example/api".to_string(),
        auth_token: Some("token-123".to_string()),
        room_poll_interval_ms: 10_000,
        ..Settings::default()
    };
    settings.save(&path).expect("Failed to save settings");

    let loaded = Settings::load(&path).expect("Failed to load settings");
    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"message_page_size": 50}"#).expect("Failed to write file");

    let settings = Settings::load(&path).expect("Failed to load settings");
    assert_eq!(settings.message_page_size, 50);
    assert_eq!(settings.room_page_size, 50);
    assert_eq!(settings.room_cache_ttl_ms, 3_000);
}

#[test]
fn test_invalid_json_is_config_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").expect("Failed to write file");

    let result = Settings::load(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_zero_interval_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"room_poll_interval_ms": 0}"#).expect("Failed to write file");

    match Settings::load(&path) {
        Err(Error::Config(message)) => assert!(message.contains("room_poll_interval_ms")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_empty_base_url_is_rejected() {
    let settings = Settings {
        api_base_url: "  ".to_string(),
        ..Settings::default()
    };
    assert!(matches!(settings.validate(), Err(Error::Config(_))));
}
