//! Recorded pointer traces for offline replay and gesture recording.
//!
//! A trace is a TOML file with one `[[events]]` table per input:
//!
//! ```toml
//! [[events]]
//! kind = "down"
//! x = 400.0
//! y = 300.0
//! buttons = 2
//! button = "right"
//! t_ms = 0
//!
//! [[events]]
//! kind = "move"
//! buttons = 2
//! t_ms = 16
//! coalesced = [[396.0, 300.0], [390.0, 300.0]]
//! ```
//!
//! Coalesced positions are unbatched into individual moves in order.
//! `kind = "wheel"` takes the scroll amount in `delta_y` (positive scrolls
//! down) and `kind = "context_menu"` records a context-menu request.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use strum::EnumString;

use crate::config::MousegestrError;
use crate::controller::{Modifiers, MouseButton, PointerInput, Sample};
use crate::event::ModifierKey;
use crate::vector::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum TraceKind {
    Down,
    Move,
    Up,
    Wheel,
    #[strum(serialize = "context_menu", serialize = "contextmenu")]
    ContextMenu,
    Visibility,
    Tick,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawTrace {
    events: Vec<RawTraceEvent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawTraceEvent {
    kind: String,
    x: f64,
    y: f64,
    buttons: u8,
    button: Option<String>,
    modifiers: Vec<String>,
    t_ms: u64,
    delta_y: f64,
    trusted: Option<bool>,
    coalesced: Vec<[f64; 2]>,
}

impl RawTraceEvent {
    fn into_inputs(self, index: usize, path: &Path) -> Result<Vec<PointerInput>, MousegestrError> {
        let invalid = |message: String| MousegestrError::TraceParseError {
            path: path.to_path_buf(),
            message: format!("event #{index}: {message}"),
        };

        let kind: TraceKind = self
            .kind
            .parse()
            .map_err(|_| invalid(format!("unknown kind '{}'", self.kind)))?;
        let timestamp = Duration::from_millis(self.t_ms);

        let mut modifiers = Modifiers::default();
        for name in &self.modifiers {
            match name.parse() {
                Ok(ModifierKey::Alt) => modifiers.alt = true,
                Ok(ModifierKey::Ctrl) => modifiers.ctrl = true,
                Ok(ModifierKey::Shift) => modifiers.shift = true,
                Err(_) => return Err(invalid(format!("unknown modifier '{name}'"))),
            }
        }

        let button: Option<MouseButton> = self
            .button
            .as_deref()
            .map(|b| b.parse().map_err(|_| invalid(format!("unknown button '{b}'"))))
            .transpose()?;

        let sample_at = |x: f64, y: f64| {
            let mut sample =
                Sample::new(x, y, self.buttons, timestamp).with_modifiers(modifiers);
            sample.button = button;
            sample.trusted = self.trusted.unwrap_or(true);
            sample
        };

        Ok(match kind {
            TraceKind::Down => vec![PointerInput::Down(sample_at(self.x, self.y))],
            TraceKind::Up => vec![PointerInput::Up(sample_at(self.x, self.y))],
            TraceKind::Move if self.coalesced.is_empty() => {
                vec![PointerInput::Move(sample_at(self.x, self.y))]
            }
            TraceKind::Move => self
                .coalesced
                .iter()
                .map(|[x, y]| PointerInput::Move(sample_at(*x, *y)))
                .collect(),
            TraceKind::Wheel => vec![PointerInput::Wheel {
                sample: sample_at(self.x, self.y),
                delta: self.delta_y,
            }],
            TraceKind::ContextMenu => vec![PointerInput::ContextMenu(sample_at(self.x, self.y))],
            TraceKind::Visibility => vec![PointerInput::VisibilityChange(timestamp)],
            TraceKind::Tick => vec![PointerInput::Tick(timestamp)],
        })
    }
}

/// Parse trace TOML (the path is used for error messages only).
pub fn parse_trace_str(content: &str, path: &Path) -> Result<Vec<PointerInput>, MousegestrError> {
    let raw: RawTrace = toml::from_str(content).map_err(|e| MousegestrError::TraceParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut inputs = Vec::new();
    for (index, event) in raw.events.into_iter().enumerate() {
        inputs.extend(event.into_inputs(index, path)?);
    }
    Ok(inputs)
}

/// Read and parse a trace file.
pub fn parse_trace_file(path: &Path) -> Result<Vec<PointerInput>, MousegestrError> {
    let content = fs::read_to_string(path).map_err(|e| MousegestrError::TraceReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_trace_str(&content, path)
}

/// Positions of every trusted pointer sample in the trace, in order.
pub fn trace_points(inputs: &[PointerInput]) -> Vec<Point> {
    inputs
        .iter()
        .filter_map(|input| match input {
            PointerInput::Down(s) | PointerInput::Move(s) | PointerInput::Up(s) => Some(s),
            PointerInput::Wheel { .. }
            | PointerInput::ContextMenu(_)
            | PointerInput::VisibilityChange(_)
            | PointerInput::Tick(_) => None,
        })
        .filter(|s| s.trusted)
        .map(Sample::point)
        .collect()
}
