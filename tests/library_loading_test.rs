/// 指纹库与配置文件加载测试

use blunav_guide::algorithms::{FingerprintMatcher, ReferencePointLibrary, ScanSnapshot};
use blunav_guide::config::PositioningConfig;
use blunav_guide::error::{ConfigError, ProfileError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_library_with_both_record_shapes() {
    let file = write_temp(
        r#"[
            {"name": "Lobby", "rssiByKey": {"10001_1": -58.0, "10001_2": -74.5}},
            {"name": "Gallery", "rssis": "10001_1:-80,10001_2:-61"}
        ]"#,
    );

    let library = ReferencePointLibrary::load_json(file.path()).unwrap();
    assert_eq!(library.names(), vec!["Lobby", "Gallery"]);
    assert_eq!(library.get("Gallery").unwrap().get("10001_2"), Some(-61.0));

    let snapshot = ScanSnapshot::from_tuples(vec![(10001, 1, 4.0, -79.0), (10001, 2, 1.1, -60.0)]);
    let outcome = FingerprintMatcher::default()
        .match_snapshot(&snapshot, &library)
        .unwrap();
    assert_eq!(outcome.name, "Gallery");
}

#[test]
fn test_load_library_rejects_bad_rssi() {
    let file = write_temp(r#"[{"name": "Lobby", "rssis": "10001_1:loud"}]"#);
    let err = ReferencePointLibrary::load_json(file.path()).unwrap_err();
    assert!(matches!(err, ProfileError::InvalidRssi { .. }));
}

#[test]
fn test_load_library_rejects_duplicate_names() {
    let file = write_temp(
        r#"[{"name": "Lobby", "rssis": "1_1:-60"}, {"name": "Lobby", "rssis": "1_2:-60"}]"#,
    );
    let err = ReferencePointLibrary::load_json(file.path()).unwrap_err();
    assert!(matches!(err, ProfileError::DuplicateName(name) if name == "Lobby"));
}

#[test]
fn test_load_library_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReferencePointLibrary::load_json(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ProfileError::Io(_)));
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = PositioningConfig::load_from(dir.path().join("guide.json")).unwrap();
    assert_eq!(config, PositioningConfig::default());
}

#[test]
fn test_load_partial_config() {
    let file = write_temp(
        r#"{
            "dwell": {"window_ms": 3000},
            "exhibit": {"max_distance_m": 2.0, "empty_cycle_policy": {"mode": "retain"}}
        }"#,
    );
    let config = PositioningConfig::load_from(file.path()).unwrap();
    assert_eq!(config.dwell.window_ms, 3000);
    assert_eq!(config.dwell.min_count, 2);
    assert_eq!(config.exhibit.max_distance_m, 2.0);
    assert_eq!(config.exhibit.min_dwell_ms, 3000);
    assert_eq!(config.fingerprint.min_overlap, 1);
}

#[test]
fn test_load_invalid_config() {
    let file = write_temp(r#"{"scanner": {"uuid_pattern": "("}}"#);
    assert!(matches!(
        PositioningConfig::load_from(file.path()),
        Err(ConfigError::InvalidValue { field: "scanner.uuid_pattern", .. })
    ));

    let file = write_temp(r#"{"dwell": {"window_ms": 0}}"#);
    assert!(matches!(
        PositioningConfig::load_from(file.path()),
        Err(ConfigError::InvalidValue { field: "dwell.window_ms", .. })
    ));
}
