//! Tests for `mousegestr::config` - TOML parsing, defaults, validation,
//! gesture registration, collision reporting, and error handling.

use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

use mousegestr::config::{AppConfig, parse_config_file, parse_config_str, report_collisions};
use mousegestr::controller::{MouseButton, Platform, SuppressionKey};
use mousegestr::matcher::MatchingAlgorithm;
use mousegestr::rocker::RockerSide;
use mousegestr::vector::Vector;
use mousegestr::wheel::WheelDirection;

// ── Helpers ──────────────────────────────────────────────────

/// Write TOML to a temp file and parse it.
fn load(toml_content: &str) -> AppConfig {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap()
}

/// Parse raw TOML that is expected to fail.
fn load_err(toml_content: &str) -> String {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap_err().to_string()
}

// ── Error handling ───────────────────────────────────────────

#[test]
fn test_file_not_found() {
    let msg = parse_config_file(Path::new("/no/such/file.toml"))
        .unwrap_err()
        .to_string();
    assert!(msg.contains("Failed to read config file"));
    assert!(msg.contains("/no/such/file.toml"));
}

#[test]
fn test_invalid_toml() {
    let msg = load_err("this is not valid toml [[[");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_wrong_value_type() {
    let msg = load_err("[gesture]\ndistance_threshold = \"far\"\n");
    assert!(msg.contains("Failed to parse config file"));
}

// ── Defaults ─────────────────────────────────────────────────

#[test]
fn test_empty_config() {
    let config = load("");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_file, None);
    assert_eq!(config.platform, Platform::Linux);
    assert_eq!(config.settings.mouse_button, MouseButton::Right);
    assert_eq!(config.settings.suppression_key, SuppressionKey::None);
    assert_eq!(config.settings.distance_threshold, 10.0);
    assert_eq!(config.settings.deviation_tolerance, 0.15);
    assert_eq!(
        config.settings.matching_algorithm,
        MatchingAlgorithm::Combined
    );
    assert!(!config.settings.timeout.active);
    assert_eq!(config.settings.timeout.duration, Duration::from_secs(1));
    assert!(config.device.mouse_usb_id.is_none());
    assert!(config.gestures.is_empty());
}

#[test]
fn test_unknown_keys_ignored() {
    let config = load(
        r#"
[global]
log_level = "debug"
colour = "blue"

[gesture]
trail = true
"#,
    );
    assert_eq!(config.log_level, "debug");
}

// ── Settings ─────────────────────────────────────────────────

#[test]
fn test_full_settings() {
    let config = load(
        r#"
[global]
log_level = "warn"
log_file = "/tmp/mousegestr.log"
platform = "windows"

[gesture]
mouse_button = "middle"
suppression_key = "ctrl"
distance_threshold = 25.0
deviation_tolerance = 0.3
matching_algorithm = "strict"

[gesture.timeout]
active = true
duration = 0.5

[device]
mouse_usb_id = "046d:c52b"
keyboard_usb_id = "1234:5678"
"#,
    );
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.log_file.as_deref(), Some("/tmp/mousegestr.log"));
    assert_eq!(config.platform, Platform::Windows);

    let s = config.settings;
    assert_eq!(s.mouse_button, MouseButton::Middle);
    assert_eq!(s.suppression_key, SuppressionKey::Ctrl);
    assert_eq!(s.distance_threshold, 25.0);
    assert_eq!(s.deviation_tolerance, 0.3);
    assert_eq!(s.matching_algorithm, MatchingAlgorithm::Strict);
    assert!(s.timeout.active);
    assert_eq!(s.timeout.duration, Duration::from_millis(500));

    assert_eq!(config.device.mouse_usb_id.as_deref(), Some("046d:c52b"));
    assert_eq!(config.device.keyboard_usb_id.as_deref(), Some("1234:5678"));
}

#[test]
fn test_enum_aliases() {
    let config = load(
        r#"
[global]
platform = "MacOS"

[gesture]
mouse_button = "Left"
suppression_key = "altKey"
matching_algorithm = "shapeIndependent"
"#,
    );
    assert_eq!(config.platform, Platform::Mac);
    assert_eq!(config.settings.mouse_button, MouseButton::Left);
    assert_eq!(config.settings.suppression_key, SuppressionKey::Alt);
    assert_eq!(
        config.settings.matching_algorithm,
        MatchingAlgorithm::ShapeIndependent
    );
}

#[test]
fn test_empty_usb_id_treated_as_missing() {
    let config = load("[device]\nmouse_usb_id = \"\"\n");
    assert!(config.device.mouse_usb_id.is_none());
}

#[test]
fn test_invalid_tolerance() {
    let msg = load_err("[gesture]\ndeviation_tolerance = 1.5\n");
    assert!(msg.contains("deviation_tolerance"));
    assert!(msg.contains("1.5"));
}

#[test]
fn test_negative_distance_threshold() {
    let msg = load_err("[gesture]\ndistance_threshold = -1.0\n");
    assert!(msg.contains("distance_threshold"));
}

#[test]
fn test_invalid_algorithm() {
    let msg = load_err("[gesture]\nmatching_algorithm = \"fuzzy\"\n");
    assert!(msg.contains("matching_algorithm"));
    assert!(msg.contains("fuzzy"));
}

#[test]
fn test_invalid_mouse_button() {
    let msg = load_err("[gesture]\nmouse_button = \"thumb\"\n");
    assert!(msg.contains("mouse_button"));
}

#[test]
fn test_invalid_platform() {
    let msg = load_err("[global]\nplatform = \"amiga\"\n");
    assert!(msg.contains("platform"));
}

#[test]
fn test_zero_timeout_duration() {
    let msg = load_err("[gesture.timeout]\nactive = true\nduration = 0.0\n");
    assert!(msg.contains("timeout.duration"));
}

#[test]
fn test_huge_timeout_duration() {
    let msg = load_err("[gesture.timeout]\nactive = true\nduration = 1e20\n");
    assert!(msg.contains("timeout.duration"));
    assert!(msg.contains("100000000000000000000"));
}

#[test]
fn test_negative_and_nan_timeout_duration() {
    for value in ["-1.0", "nan", "inf"] {
        let msg = load_err(&format!("[gesture.timeout]\nduration = {value}\n"));
        assert!(msg.contains("timeout.duration"), "{value}: {msg}");
    }
}

// ── Rocker and wheel ─────────────────────────────────────────

#[test]
fn test_rocker_and_wheel_defaults() {
    let config = load("");
    assert!(!config.rocker.active);
    assert_eq!(config.rocker.action(RockerSide::Left), None);
    assert!(!config.wheel.active);
    assert_eq!(config.wheel.mouse_button, MouseButton::Left);
    assert_eq!(config.wheel.sensitivity, 30.0);
    assert_eq!(config.wheel.action(WheelDirection::Up), None);
}

#[test]
fn test_rocker_and_wheel_sections() {
    let config = load(
        r#"
[rocker]
active = true
left_action = "xdotool key alt+Left"
right_action = ""

[wheel]
active = true
mouse_button = "Right"
sensitivity = 120.0
up_action = "xdotool key ctrl+Prior"
down_action = "xdotool key ctrl+Next"
"#,
    );
    assert!(config.rocker.active);
    assert_eq!(
        config.rocker.action(RockerSide::Left),
        Some("xdotool key alt+Left")
    );
    assert_eq!(config.rocker.action(RockerSide::Right), None);

    assert!(config.wheel.active);
    assert_eq!(config.wheel.mouse_button, MouseButton::Right);
    assert_eq!(config.wheel.sensitivity, 120.0);
    assert_eq!(
        config.wheel.action(WheelDirection::Up),
        Some("xdotool key ctrl+Prior")
    );
    assert_eq!(
        config.wheel.action(WheelDirection::Down),
        Some("xdotool key ctrl+Next")
    );
}

#[test]
fn test_invalid_wheel_sensitivity() {
    for value in ["0.0", "-5.0", "inf"] {
        let msg = load_err(&format!("[wheel]\nsensitivity = {value}\n"));
        assert!(msg.contains("wheel.sensitivity"), "{value}: {msg}");
    }
}

#[test]
fn test_invalid_wheel_button() {
    let msg = load_err("[wheel]\nmouse_button = \"thumb\"\n");
    assert!(msg.contains("wheel.mouse_button"));
}

// ── Gestures ─────────────────────────────────────────────────

#[test]
fn test_gestures_loaded_in_order() {
    let config = load(
        r#"
[[gestures]]
label = "back"
pattern = [[-1.0, 0.0]]
action = "xdotool key alt+Left"

[[gestures]]
label = "close"
pattern = [[0.0, 1.0], [1.0, 0.0]]
enabled = false

[[gestures]]
label = "reload"
pattern = [[0.0, -1.0], [0.0, 1.0]]
action = ""
"#,
    );
    let labels: Vec<_> = config.gestures.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, vec!["back", "close", "reload"]);

    let back = config.gestures.get("back").unwrap();
    assert_eq!(back.pattern, vec![Vector::new(-1.0, 0.0)]);
    assert_eq!(back.action.as_deref(), Some("xdotool key alt+Left"));
    assert!(back.enabled);

    let close = config.gestures.get("close").unwrap();
    assert_eq!(close.pattern.len(), 2);
    assert!(!close.enabled);
    assert_eq!(close.action, None);

    assert_eq!(config.gestures.get("reload").unwrap().action, None);
}

#[test]
fn test_gesture_missing_label() {
    let msg = load_err("[[gestures]]\npattern = [[1.0, 0.0]]\n");
    assert!(msg.contains("Invalid gesture #0"));
    assert!(msg.contains("missing label"));
}

#[test]
fn test_gesture_empty_pattern() {
    let msg = load_err("[[gestures]]\nlabel = \"nothing\"\npattern = []\n");
    assert!(msg.contains("'nothing'"));
    assert!(msg.contains("empty pattern"));
}

#[test]
fn test_gesture_duplicate_label() {
    let msg = load_err(
        r#"
[[gestures]]
label = "back"
pattern = [[-1.0, 0.0]]

[[gestures]]
label = "back"
pattern = [[1.0, 0.0]]
"#,
    );
    assert!(msg.contains("Invalid gesture #1"));
    assert!(msg.contains("duplicate label"));
}

#[test]
fn test_gesture_malformed_vector() {
    let msg = load_err("[[gestures]]\nlabel = \"bad\"\npattern = [[1.0]]\n");
    assert!(msg.contains("Failed to parse config file"));
}

// ── Collisions ───────────────────────────────────────────────

#[test]
fn test_no_collisions() {
    let config = parse_config_str(
        r#"
[[gestures]]
label = "left"
pattern = [[-1.0, 0.0]]

[[gestures]]
label = "right"
pattern = [[1.0, 0.0]]
"#,
        Path::new("inline.toml"),
    )
    .unwrap();
    assert_eq!(report_collisions(&config), 0);
}

#[test]
fn test_collisions_counted_both_ways() {
    let config = parse_config_str(
        r#"
[[gestures]]
label = "right"
pattern = [[1.0, 0.0]]

[[gestures]]
label = "also_right"
pattern = [[10.0, 0.5]]

[[gestures]]
label = "down"
pattern = [[0.0, 1.0]]
"#,
        Path::new("inline.toml"),
    )
    .unwrap();
    assert_eq!(report_collisions(&config), 2);
}

#[test]
fn test_disabled_gestures_do_not_collide() {
    let config = parse_config_str(
        r#"
[[gestures]]
label = "right"
pattern = [[1.0, 0.0]]

[[gestures]]
label = "old_right"
pattern = [[1.0, 0.0]]
enabled = false
"#,
        Path::new("inline.toml"),
    )
    .unwrap();
    assert_eq!(report_collisions(&config), 0);
}
