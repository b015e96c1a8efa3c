// tests/config_validation.rs
//
// Config loading is fail-closed: a candidate that does not validate never
// replaces the config in use.

use std::fs;
use std::path::PathBuf;

use pd_multimodal_analyzer::config::{ConfigHandle, FusionConfig};

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pd-analyzer-test-{}-{name}", std::process::id()));
    fs::write(&path, content).expect("write scratch config");
    path
}

#[test]
fn shipped_config_file_loads_and_matches_defaults() {
    let cfg = FusionConfig::load_from_file("config/fusion.toml").unwrap();
    assert_eq!(cfg, FusionConfig::default());
}

#[test]
fn json_config_is_accepted() {
    let path = scratch_file(
        "valid.json",
        r#"{
            "base_weights": { "dat_scan": 0.6, "handwriting": 0.2, "voice": 0.2 },
            "stage_bands": [
                { "upper": 0.5, "stage": 0, "label": "Healthy" },
                { "upper": 1.0, "stage": 1, "label": "PD" }
            ]
        }"#,
    );
    let cfg = FusionConfig::load_from_file(&path).unwrap();
    assert_eq!(cfg.base_weights.dat_scan, 0.6);
    let _ = fs::remove_file(path);
}

#[test]
fn overlapping_bands_fail_at_load_time() {
    let path = scratch_file(
        "overlap.toml",
        r#"
            [[stage_bands]]
            upper = 0.5
            stage = 0
            label = "a"

            [[stage_bands]]
            upper = 0.5
            stage = 1
            label = "b"

            [[stage_bands]]
            upper = 1.0
            stage = 2
            label = "c"
        "#,
    );
    let err = FusionConfig::load_from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("invalid fusion config"));
    let _ = fs::remove_file(path);
}

#[test]
fn bands_not_spanning_unit_interval_fail_at_load_time() {
    let path = scratch_file(
        "short.toml",
        r#"
            [[stage_bands]]
            upper = 0.9
            stage = 0
            label = "only"
        "#,
    );
    assert!(FusionConfig::load_from_file(&path).is_err());
    let _ = fs::remove_file(path);
}

#[test]
fn rejected_reload_keeps_last_known_good() {
    let handle = ConfigHandle::new(FusionConfig::default());

    let bad = scratch_file(
        "bad-weights.toml",
        r#"
            [base_weights]
            dat_scan = 0.9
            handwriting = 0.9
            voice = 0.9
        "#,
    );
    assert!(handle.reload_from(&bad).is_err());
    // Still serving the previous config.
    assert_eq!(*handle.snapshot(), FusionConfig::default());
    let _ = fs::remove_file(bad);

    let good = scratch_file(
        "good.toml",
        r#"
            [base_weights]
            dat_scan = 0.4
            handwriting = 0.3
            voice = 0.3
        "#,
    );
    handle.reload_from(&good).unwrap();
    assert_eq!(handle.snapshot().base_weights.dat_scan, 0.4);
    let _ = fs::remove_file(good);
}

#[test]
fn missing_file_errors_with_context() {
    let err = FusionConfig::load_from_file("config/does-not-exist.toml").unwrap_err();
    assert!(format!("{err:#}").contains("reading fusion config"));
}
