//! Pointer event classification and processing - no I/O, no hardware, fully testable.
//!
//! Raw evdev events are classified into [`RawInput`], integrated into
//! absolute pointer samples by [`PointerTracker`], and run through a
//! [`GestureSession`].  Everything here is deterministic given the
//! timestamps passed in.

use std::time::Duration;

use strum::{Display, EnumString};

use crate::controller::{Modifiers, MouseButton, PointerInput, Sample};
use crate::session::{GestureRegistry, GestureSession, SessionEvent};
use crate::wheel::WHEEL_NOTCH_DELTA;

// -- RawInput -------------------------------------------------

/// Modifier keys tracked for the suppression key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModifierKey {
    Alt,
    Ctrl,
    Shift,
}

/// Intermediate representation of a relevant input event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    MotionX(i32),
    MotionY(i32),
    /// Wheel notches, positive away from the user.
    Wheel(i32),
    Button { button: MouseButton, pressed: bool },
    Modifier { key: ModifierKey, pressed: bool },
    SynReport,
}

// -- PointerTracker -------------------------------------------

/// Integrates relative motion and button/modifier state into samples,
/// one flush per `SYN_REPORT`.
#[derive(Debug, Default)]
pub struct PointerTracker {
    x: f64,
    y: f64,
    buttons: u8,
    modifiers: Modifiers,
    pending_dx: i32,
    pending_dy: i32,
    pending_wheel: i32,
    pending_buttons: Vec<(MouseButton, bool)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current integrated pointer position.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Currently held buttons.
    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Buffer one raw input; returns the pointer inputs completed by it.
    pub fn push(&mut self, raw: RawInput, timestamp: Duration) -> Vec<PointerInput> {
        match raw {
            RawInput::MotionX(dx) => self.pending_dx += dx,
            RawInput::MotionY(dy) => self.pending_dy += dy,
            RawInput::Wheel(notches) => self.pending_wheel += notches,
            RawInput::Button { button, pressed } => self.pending_buttons.push((button, pressed)),
            RawInput::Modifier { key, pressed } => match key {
                ModifierKey::Alt => self.modifiers.alt = pressed,
                ModifierKey::Ctrl => self.modifiers.ctrl = pressed,
                ModifierKey::Shift => self.modifiers.shift = pressed,
            },
            RawInput::SynReport => return self.flush(timestamp),
        }
        Vec::new()
    }

    /// Commit buffered motion and button changes.
    ///
    /// Motion is reported first with the old button mask; each button
    /// change then becomes a down (first button), an up (last button) or
    /// a move carrying the changed button. Scrolling comes last, with the
    /// new mask.
    fn flush(&mut self, timestamp: Duration) -> Vec<PointerInput> {
        let mut inputs = Vec::new();

        if self.pending_dx != 0 || self.pending_dy != 0 {
            self.x += f64::from(self.pending_dx);
            self.y += f64::from(self.pending_dy);
            self.pending_dx = 0;
            self.pending_dy = 0;
            inputs.push(PointerInput::Move(self.sample(timestamp)));
        }

        for (button, pressed) in std::mem::take(&mut self.pending_buttons) {
            let before = self.buttons;
            if pressed {
                self.buttons |= button.mask();
            } else {
                self.buttons &= !button.mask();
            }
            if before == self.buttons {
                continue;
            }

            let sample = self.sample(timestamp).with_button(button);
            inputs.push(if before == 0 {
                PointerInput::Down(sample)
            } else if self.buttons == 0 {
                PointerInput::Up(sample)
            } else {
                PointerInput::Move(sample)
            });
        }

        if self.pending_wheel != 0 {
            // Notches count up, deltas count down.
            let delta = -f64::from(self.pending_wheel) * WHEEL_NOTCH_DELTA;
            self.pending_wheel = 0;
            inputs.push(PointerInput::Wheel {
                sample: self.sample(timestamp),
                delta,
            });
        }

        inputs
    }

    fn sample(&self, timestamp: Duration) -> Sample {
        Sample::new(self.x, self.y, self.buttons, timestamp).with_modifiers(self.modifiers)
    }
}

// -- Core processing ------------------------------------------

/// Feed pointer inputs into a session and collect everything that
/// happened.  This is the **core event-processing logic** - pure,
/// deterministic, and fully testable without hardware.
pub fn process_pointer_inputs(
    session: &mut GestureSession,
    inputs: impl IntoIterator<Item = PointerInput>,
) -> Vec<SessionEvent> {
    inputs
        .into_iter()
        .flat_map(|input| session.feed(input))
        .collect()
}

/// Run raw inputs through a tracker and then the session.
pub fn process_raw_inputs(
    session: &mut GestureSession,
    tracker: &mut PointerTracker,
    events: &[RawInput],
    timestamp: Duration,
) -> Vec<SessionEvent> {
    let inputs: Vec<PointerInput> = events
        .iter()
        .flat_map(|raw| tracker.push(*raw, timestamp))
        .collect();
    process_pointer_inputs(session, inputs)
}

// -- Helpers --------------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"046d:c52b"` or `"USB:046d:c52b"` (case-insensitive).
/// Returns `None` if the format is invalid or the hex values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// Look up the action for a recognized gesture label.
///
/// Returns `Some(action)` if the gesture is registered, enabled, and has an action.
pub fn resolve_action<'a>(label: &str, gestures: &'a GestureRegistry) -> Option<&'a str> {
    gestures
        .get(label)
        .filter(|g| g.enabled)
        .and_then(|g| g.action.as_deref())
}

/// Classify a single `evdev::InputEvent` into one of the pointer-relevant
/// categories the handler cares about.  Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<RawInput> {
    use evdev::{InputEventKind, Key, RelativeAxisType};

    match event.kind() {
        InputEventKind::RelAxis(RelativeAxisType::REL_X) => Some(RawInput::MotionX(event.value())),
        InputEventKind::RelAxis(RelativeAxisType::REL_Y) => Some(RawInput::MotionY(event.value())),
        InputEventKind::RelAxis(RelativeAxisType::REL_WHEEL) => Some(RawInput::Wheel(event.value())),
        InputEventKind::Key(key) => {
            // 2 is autorepeat; only edges matter.
            let pressed = match event.value() {
                0 => false,
                1 => true,
                _ => return None,
            };
            let button = |button| Some(RawInput::Button { button, pressed });
            let modifier = |key| Some(RawInput::Modifier { key, pressed });
            match key {
                Key::BTN_LEFT => button(MouseButton::Left),
                Key::BTN_RIGHT => button(MouseButton::Right),
                Key::BTN_MIDDLE => button(MouseButton::Middle),
                Key::KEY_LEFTALT | Key::KEY_RIGHTALT => modifier(ModifierKey::Alt),
                Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => modifier(ModifierKey::Ctrl),
                Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => modifier(ModifierKey::Shift),
                _ => None,
            }
        }
        InputEventKind::Synchronization(evdev::Synchronization::SYN_REPORT) => {
            Some(RawInput::SynReport)
        }
        _ => None,
    }
}
