//! Configuration data structures and TOML parsing.
//!
//! The config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//! platform = "linux"
//!
//! [gesture]
//! mouse_button = "right"
//! suppression_key = "none"
//! distance_threshold = 10.0
//! deviation_tolerance = 0.15
//! matching_algorithm = "combined"
//!
//! [gesture.timeout]
//! active = true
//! duration = 1.0
//!
//! [device]
//! mouse_usb_id = "046d:c52b"
//!
//! [rocker]
//! active = true
//! left_action = "xdotool key ctrl+shift+Tab"
//! right_action = "xdotool key ctrl+Tab"
//!
//! [wheel]
//! active = true
//! mouse_button = "left"
//! sensitivity = 30.0
//! up_action = "xdotool key ctrl+plus"
//! down_action = "xdotool key ctrl+minus"
//!
//! [[gestures]]
//! label = "back"
//! pattern = [[-1.0, 0.0]]
//! action = "xdotool key alt+Left"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::controller::{MouseButton, Platform, SuppressionKey};
use crate::matcher::MatchingAlgorithm;
use crate::pattern::Pattern;
use crate::rocker::RockerSide;
use crate::session::{Gesture, GestureRegistry};
use crate::wheel::WheelDirection;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum MousegestrError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Invalid value for '{field}': {value}")]
    InvalidSetting { field: &'static str, value: String },

    #[error("Invalid gesture #{index} ('{label}'): {reason}")]
    InvalidGesture {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("Failed to read trace file {path}: {source}")]
    TraceReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse trace file {path}: {message}")]
    TraceParseError { path: PathBuf, message: String },
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    gesture: RawGestureSettings,
    device: RawDevice,
    rocker: RawRocker,
    wheel: RawWheel,
    gestures: Vec<RawGesture>,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
    platform: Option<String>,
}

/// The `[gesture]` section - every value optional, defaults fill the gaps.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawGestureSettings {
    mouse_button: Option<String>,
    suppression_key: Option<String>,
    distance_threshold: Option<f64>,
    deviation_tolerance: Option<f64>,
    matching_algorithm: Option<String>,
    timeout: RawTimeout,
}

/// The `[gesture.timeout]` section.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawTimeout {
    active: Option<bool>,
    duration: Option<f64>,
}

/// The `[device]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    mouse_usb_id: Option<String>,
    keyboard_usb_id: Option<String>,
}

/// The `[rocker]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawRocker {
    active: Option<bool>,
    left_action: Option<String>,
    right_action: Option<String>,
}

/// The `[wheel]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawWheel {
    active: Option<bool>,
    mouse_button: Option<String>,
    sensitivity: Option<f64>,
    up_action: Option<String>,
    down_action: Option<String>,
}

/// A `[[gestures]]` entry.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGesture {
    label: Option<String>,
    pattern: Pattern,
    action: Option<String>,
    enabled: Option<bool>,
}

/// Abort countdown for an active gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutSettings {
    pub active: bool,
    pub duration: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            active: false,
            duration: Duration::from_secs(1),
        }
    }
}

/// Fully validated gesture settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    pub mouse_button: MouseButton,
    pub suppression_key: SuppressionKey,
    /// Pixels; movement up to this distance is treated as jitter.
    pub distance_threshold: f64,
    /// Unitless in `[0, 1]`; fraction of a half turn.
    pub deviation_tolerance: f64,
    pub matching_algorithm: MatchingAlgorithm,
    pub timeout: TimeoutSettings,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            mouse_button: MouseButton::Right,
            suppression_key: SuppressionKey::None,
            distance_threshold: 10.0,
            deviation_tolerance: 0.15,
            matching_algorithm: MatchingAlgorithm::Combined,
            timeout: TimeoutSettings::default(),
        }
    }
}

/// Which input devices to read.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    pub mouse_usb_id: Option<String>,
    pub keyboard_usb_id: Option<String>,
}

/// Rocker gestures and their actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RockerSettings {
    pub active: bool,
    pub left_action: Option<String>,
    pub right_action: Option<String>,
}

impl RockerSettings {
    pub fn action(&self, side: RockerSide) -> Option<&str> {
        match side {
            RockerSide::Left => self.left_action.as_deref(),
            RockerSide::Right => self.right_action.as_deref(),
        }
    }
}

/// Wheel gestures and their actions.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelSettings {
    pub active: bool,
    pub mouse_button: MouseButton,
    /// Scroll distance that fires a wheel gesture.
    pub sensitivity: f64,
    pub up_action: Option<String>,
    pub down_action: Option<String>,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            active: false,
            mouse_button: MouseButton::Left,
            sensitivity: 30.0,
            up_action: None,
            down_action: None,
        }
    }
}

impl WheelSettings {
    pub fn action(&self, direction: WheelDirection) -> Option<&str> {
        match direction {
            WheelDirection::Up => self.up_action.as_deref(),
            WheelDirection::Down => self.down_action.as_deref(),
        }
    }
}

/// Top-level parsed configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub platform: Platform,
    pub settings: GestureSettings,
    pub device: DeviceConfig,
    pub rocker: RockerSettings,
    pub wheel: WheelSettings,
    pub gestures: GestureRegistry,
}

/// Parse an optional enum setting, falling back to `default` when absent.
fn parse_enum<T: FromStr>(
    field: &'static str,
    raw: Option<&str>,
    default: T,
) -> Result<T, MousegestrError> {
    raw.map_or(Ok(default), |value| {
        value.parse().map_err(|_| MousegestrError::InvalidSetting {
            field,
            value: value.to_string(),
        })
    })
}

impl RawGestureSettings {
    fn into_validated(self) -> Result<GestureSettings, MousegestrError> {
        let defaults = GestureSettings::default();

        let distance_threshold = self.distance_threshold.unwrap_or(defaults.distance_threshold);
        if !(distance_threshold >= 0.0 && distance_threshold.is_finite()) {
            return Err(MousegestrError::InvalidSetting {
                field: "distance_threshold",
                value: distance_threshold.to_string(),
            });
        }

        let deviation_tolerance = self.deviation_tolerance.unwrap_or(defaults.deviation_tolerance);
        if !(0.0..=1.0).contains(&deviation_tolerance) {
            return Err(MousegestrError::InvalidSetting {
                field: "deviation_tolerance",
                value: deviation_tolerance.to_string(),
            });
        }

        let duration = match self.timeout.duration {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| MousegestrError::InvalidSetting {
                    field: "timeout.duration",
                    value: secs.to_string(),
                })?,
            None => defaults.timeout.duration,
        };

        Ok(GestureSettings {
            mouse_button: parse_enum(
                "mouse_button",
                self.mouse_button.as_deref(),
                defaults.mouse_button,
            )?,
            suppression_key: parse_enum(
                "suppression_key",
                self.suppression_key.as_deref(),
                defaults.suppression_key,
            )?,
            distance_threshold,
            deviation_tolerance,
            matching_algorithm: parse_enum(
                "matching_algorithm",
                self.matching_algorithm.as_deref(),
                defaults.matching_algorithm,
            )?,
            timeout: TimeoutSettings {
                active: self.timeout.active.unwrap_or(defaults.timeout.active),
                duration,
            },
        })
    }
}

impl RawRocker {
    fn into_validated(self) -> RockerSettings {
        RockerSettings {
            active: self.active.unwrap_or(false),
            left_action: self.left_action.filter(|a| !a.is_empty()),
            right_action: self.right_action.filter(|a| !a.is_empty()),
        }
    }
}

impl RawWheel {
    fn into_validated(self) -> Result<WheelSettings, MousegestrError> {
        let defaults = WheelSettings::default();

        let sensitivity = self.sensitivity.unwrap_or(defaults.sensitivity);
        if !(sensitivity > 0.0 && sensitivity.is_finite()) {
            return Err(MousegestrError::InvalidSetting {
                field: "wheel.sensitivity",
                value: sensitivity.to_string(),
            });
        }

        Ok(WheelSettings {
            active: self.active.unwrap_or(defaults.active),
            mouse_button: parse_enum(
                "wheel.mouse_button",
                self.mouse_button.as_deref(),
                defaults.mouse_button,
            )?,
            sensitivity,
            up_action: self.up_action.filter(|a| !a.is_empty()),
            down_action: self.down_action.filter(|a| !a.is_empty()),
        })
    }
}

/// Validate the `[[gestures]]` list: labels present and unique, patterns
/// non-empty.
fn build_registry(raw: Vec<RawGesture>) -> Result<GestureRegistry, MousegestrError> {
    let mut seen = HashSet::new();
    let mut gestures = Vec::with_capacity(raw.len());

    for (index, entry) in raw.into_iter().enumerate() {
        let label = entry.label.unwrap_or_default();
        let invalid = |reason: &str| MousegestrError::InvalidGesture {
            index,
            label: label.clone(),
            reason: reason.to_string(),
        };

        if label.is_empty() {
            return Err(invalid("missing label"));
        }
        if entry.pattern.is_empty() {
            return Err(invalid("empty pattern"));
        }
        if !seen.insert(label.clone()) {
            return Err(invalid("duplicate label"));
        }

        gestures.push(Gesture {
            label,
            pattern: entry.pattern,
            action: entry.action.filter(|a| !a.is_empty()),
            enabled: entry.enabled.unwrap_or(true),
        });
    }

    Ok(GestureRegistry::new(gestures))
}

/// Warn about every enabled gesture that would be recognized as another
/// one, and return how many there are.
pub fn report_collisions(config: &AppConfig) -> usize {
    let settings = &config.settings;
    let mut collisions = 0;

    for (_, gesture) in config.gestures.candidates() {
        if let Some(similar) = config.gestures.find_similar(
            &gesture.pattern,
            Some(&gesture.label),
            settings.matching_algorithm,
            settings.deviation_tolerance,
        ) {
            warn!(
                "Gesture '{}' is similar to '{}' and may be recognized as it",
                gesture.label, similar.label
            );
            collisions += 1;
        }
    }

    collisions
}

/// Parse TOML config text (the file path is used for error messages only).
pub fn parse_config_str(content: &str, path: &Path) -> Result<AppConfig, MousegestrError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| MousegestrError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let settings = raw.gesture.into_validated()?;
    let rocker = raw.rocker.into_validated();
    let wheel = raw.wheel.into_validated()?;
    let gestures = build_registry(raw.gestures)?;
    debug!("Loaded {} gesture(s)", gestures.len());

    if raw.device.mouse_usb_id.as_deref().is_some_and(str::is_empty) {
        warn!("[device] mouse_usb_id is empty - live capture will be unavailable.");
    }

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        platform: parse_enum("platform", raw.global.platform.as_deref(), Platform::default())?,
        settings,
        device: DeviceConfig {
            mouse_usb_id: raw.device.mouse_usb_id.filter(|s| !s.is_empty()),
            keyboard_usb_id: raw.device.keyboard_usb_id.filter(|s| !s.is_empty()),
        },
        rocker,
        wheel,
        gestures,
    })
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, MousegestrError> {
    let content = fs::read_to_string(path).map_err(|e| MousegestrError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config_str(&content, path)
}
