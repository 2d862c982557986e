use helion::config::Config;
use tempfile::tempdir;

#[test]
fn save_and_reload_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("helion_config.yaml");

    let mut config = Config::default();
    config.inverter.host = "10.0.0.42".to_string();
    config.inverter.port = 8899;
    config.poll_interval_ms = 15000;
    config.glitch_filter.margin_kwh = 1.0;

    config.save_to_file(&path).unwrap();
    let reloaded = Config::from_file(&path).unwrap();

    assert_eq!(reloaded.inverter.host, "10.0.0.42");
    assert_eq!(reloaded.poll_interval_ms, 15000);
    assert!((reloaded.glitch_filter.margin_kwh - 1.0).abs() < f64::EPSILON);
}

#[test]
fn from_file_missing_path_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does_not_exist.yaml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn from_file_invalid_yaml_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "inverter: [not, a, mapping").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.yaml");
    std::fs::write(&path, "poll_interval_ms: 10000\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.poll_interval_ms, 10000);
    assert_eq!(config.inverter.host, "192.168.1.50");
    assert_eq!(config.inverter.read_timeout_ms, 500);
    assert_eq!(config.inverter.max_read_chunks, 40);
}

#[test]
fn validate_rejects_bad_values() {
    let mut config = Config::default();
    config.inverter.read_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.poll_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.glitch_filter.margin_kwh = -0.1;
    assert!(config.validate().is_err());
}
