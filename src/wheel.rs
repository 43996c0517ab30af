//! Wheel gestures: scrolling while a mouse button is held.
use strum::{Display, IntoStaticStr};

use crate::controller::{MouseButton, Sample};

/// Scroll distance of one evdev wheel notch, in the units `sensitivity`
/// is configured in.
pub const WHEEL_NOTCH_DELTA: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum WheelDirection {
    #[strum(to_string = "wheel_up")]
    Up,
    #[strum(to_string = "wheel_down")]
    Down,
}

/// Accumulates scroll deltas while the configured button is held and
/// fires once the total reaches `sensitivity`.
#[derive(Debug, Clone)]
pub struct WheelController {
    mouse_button: MouseButton,
    sensitivity: f64,
    accumulated: f64,
}

impl WheelController {
    pub fn new(mouse_button: MouseButton, sensitivity: f64) -> Self {
        Self {
            mouse_button,
            sensitivity,
            accumulated: 0.0,
        }
    }

    pub fn apply_config(&mut self, mouse_button: MouseButton, sensitivity: f64) {
        self.mouse_button = mouse_button;
        self.sensitivity = sensitivity;
    }

    pub fn mouse_button(&self) -> MouseButton {
        self.mouse_button
    }

    /// Forget the scroll total (on a button press or visibility loss).
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Feed one scroll step; `delta > 0` scrolls down.
    pub fn scroll(&mut self, sample: &Sample, delta: f64) -> Option<WheelDirection> {
        if !sample.trusted || sample.buttons != self.mouse_button.mask() || delta == 0.0 {
            return None;
        }

        // A direction change starts over.
        if (self.accumulated < 0.0) != (delta < 0.0) {
            self.accumulated = 0.0;
        }
        self.accumulated += delta;

        if self.accumulated.abs() < self.sensitivity {
            return None;
        }
        let direction = if self.accumulated < 0.0 {
            WheelDirection::Up
        } else {
            WheelDirection::Down
        };
        self.accumulated = 0.0;
        Some(direction)
    }
}
