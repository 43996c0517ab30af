//! Pointer state machine for one gesture attempt.
//!
//! The controller is fed pointer samples and decides when a press turns
//! into a gesture (`start`), how it continues (`update`), and how it ends
//! (`end`, or `abort` on timeout, visibility loss or a foreign button).
//! It owns no clock: timestamps come in with the samples and through
//! [`MouseController::tick`].
use std::time::Duration;

use log::debug;
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::GestureSettings;
use crate::vector::{Point, distance};

/// Two context-menu requests closer than this form a double click.
const DOUBLE_CLICK_THRESHOLD: Duration = Duration::from_millis(300);

/// How long default click handling stays suppressed after a gesture on
/// platforms that open the context menu on release.
const PREVENTION_LINGER: Duration = Duration::from_millis(200);

/// Mouse buttons that can trigger a gesture, with their `buttons` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Bit of this button in a `buttons` mask.
    pub const fn mask(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Right => 2,
            MouseButton::Middle => 4,
        }
    }
}

/// Modifier keys held while a sample was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

/// Modifier that, while held, lets the trigger button through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum SuppressionKey {
    #[strum(to_string = "alt", serialize = "altkey")]
    Alt,
    #[strum(to_string = "ctrl", serialize = "ctrlkey")]
    Ctrl,
    #[strum(to_string = "shift", serialize = "shiftkey")]
    Shift,
    #[default]
    #[strum(to_string = "none")]
    None,
}

impl SuppressionKey {
    pub fn is_held(self, modifiers: Modifiers) -> bool {
        match self {
            SuppressionKey::Alt => modifiers.alt,
            SuppressionKey::Ctrl => modifiers.ctrl,
            SuppressionKey::Shift => modifiers.shift,
            SuppressionKey::None => false,
        }
    }
}

/// Host platform; decides when the context menu would open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[default]
    #[strum(to_string = "linux")]
    Linux,
    #[strum(to_string = "mac", serialize = "macos")]
    Mac,
    #[strum(to_string = "windows", serialize = "win")]
    Windows,
}

/// One raw pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Mask of the buttons held after this event.
    pub buttons: u8,
    /// Button whose state changed with this event, if any.
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
    pub timestamp: Duration,
    /// `false` for synthetic events that must never drive a gesture.
    pub trusted: bool,
}

impl Sample {
    pub fn new(x: f64, y: f64, buttons: u8, timestamp: Duration) -> Self {
        Self {
            x,
            y,
            buttons,
            button: None,
            modifiers: Modifiers::default(),
            timestamp,
            trusted: true,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Input delivered to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Down(Sample),
    Move(Sample),
    Up(Sample),
    /// Scroll while `sample.buttons` are held; positive `delta` scrolls down.
    Wheel { sample: Sample, delta: f64 },
    /// A context-menu request at the sample position.
    ///
    /// Only traces carry these: the evdev loop sits below the application
    /// that would open the menu and has nothing to suppress.
    ContextMenu(Sample),
    /// The input target lost visibility (or focus) at the given time.
    VisibilityChange(Duration),
    /// Time passed without input.
    Tick(Duration),
}

impl PointerInput {
    /// The sample of a button press: every down, and moves whose changed
    /// button is held afterwards.
    pub fn pressed(&self) -> Option<&Sample> {
        match self {
            PointerInput::Down(sample) => Some(sample),
            PointerInput::Move(sample)
                if sample.button.is_some_and(|b| sample.buttons & b.mask() != 0) =>
            {
                Some(sample)
            }
            _ => None,
        }
    }
}

/// Lifecycle state of the current gesture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Passive,
    Pending,
    Active,
    Aborted,
}

/// Receiver of lifecycle events; all methods default to no-ops.
///
/// Delivery is synchronous and always ordered
/// `register → start → update* → (end | abort)`.
pub trait ControllerListener {
    fn on_register(&mut self, _buffer: &[Sample], _sample: &Sample) {}
    fn on_start(&mut self, _buffer: &[Sample], _sample: &Sample) {}
    fn on_update(&mut self, _buffer: &[Sample], _sample: &Sample) {}
    fn on_end(&mut self, _buffer: &[Sample], _sample: &Sample) {}
    fn on_abort(&mut self, _buffer: &[Sample]) {}
}

impl ControllerListener for () {}

/// State machine for the trigger-button lifecycle.
#[derive(Debug, Clone)]
pub struct MouseController {
    settings: GestureSettings,
    platform: Platform,
    state: MachineState,
    buffer: Vec<Sample>,
    abort_deadline: Option<Duration>,
    activated: bool,
    last_context_click: Option<(Duration, Point)>,
    prevent_default_until: Option<Duration>,
}

impl MouseController {
    pub fn new(settings: GestureSettings, platform: Platform) -> Self {
        Self {
            settings,
            platform,
            state: MachineState::Passive,
            buffer: Vec::new(),
            abort_deadline: None,
            activated: false,
            last_context_click: None,
            prevent_default_until: None,
        }
    }

    /// Replace the settings; takes effect from the next sample.
    pub fn apply_config(&mut self, settings: GestureSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Samples buffered for the current attempt.
    pub fn buffer(&self) -> &[Sample] {
        &self.buffer
    }

    /// When the armed timeout fires, if one is armed.
    pub fn abort_deadline(&self) -> Option<Duration> {
        self.abort_deadline
    }

    /// Dispatch one input to the matching handler.
    ///
    /// Wheel and context-menu inputs only advance the clock here; see
    /// [`MouseController::context_menu`] for the menu decision.
    pub fn feed(&mut self, input: PointerInput, listener: &mut impl ControllerListener) {
        match input {
            PointerInput::Down(sample) => self.pointer_down(sample, listener),
            PointerInput::Move(sample) => self.pointer_move(sample, listener),
            PointerInput::Up(sample) => self.pointer_up(sample, listener),
            PointerInput::Wheel { sample, .. } | PointerInput::ContextMenu(sample) => {
                if sample.trusted {
                    self.tick(sample.timestamp, listener);
                }
            }
            PointerInput::VisibilityChange(now) => self.visibility_change(now, listener),
            PointerInput::Tick(now) => self.tick(now, listener),
        }
    }

    pub fn pointer_down(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        if !sample.trusted {
            return;
        }
        self.expire(sample.timestamp, listener);

        match self.state {
            MachineState::Passive => {
                if self.settings.suppression_key.is_held(sample.modifiers) {
                    return;
                }
                if sample.buttons == self.trigger_mask() {
                    self.initialize(sample, listener);
                }
            }
            MachineState::Pending | MachineState::Active => {
                if sample.buttons & !self.trigger_mask() != 0 {
                    debug!("Second button pressed during gesture, aborting");
                    self.abort(sample.timestamp, listener);
                }
            }
            MachineState::Aborted => {}
        }
    }

    pub fn pointer_move(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        if !sample.trusted {
            return;
        }
        self.expire(sample.timestamp, listener);
        if self.is_idle() {
            return;
        }

        if sample.buttons == self.trigger_mask() {
            self.update(sample, listener);
        } else if let Some(button) = sample.button {
            if button == self.settings.mouse_button {
                self.terminate(sample, listener);
            } else {
                debug!("Button '{button}' changed during gesture, aborting");
                self.abort(sample.timestamp, listener);
            }
        } else if sample.buttons == 0 {
            self.terminate(sample, listener);
        } else {
            debug!("Foreign button mask {:#05b} during gesture, aborting", sample.buttons);
            self.abort(sample.timestamp, listener);
        }
    }

    pub fn pointer_up(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        if !sample.trusted {
            return;
        }
        self.expire(sample.timestamp, listener);
        if self.is_idle() {
            return;
        }
        self.terminate(sample, listener);
    }

    pub fn visibility_change(&mut self, now: Duration, listener: &mut impl ControllerListener) {
        if self.is_idle() {
            return;
        }
        debug!("Input target hidden, aborting gesture");
        self.abort(now, listener);
    }

    /// Fire the timeout if it is due at `now`.
    pub fn tick(&mut self, now: Duration, listener: &mut impl ControllerListener) {
        self.expire(now, listener);
    }

    /// Drop the current attempt without emitting anything.
    pub fn cancel(&mut self, now: Duration) {
        self.reset(now);
    }

    /// Decide whether a context-menu request at `sample` must be suppressed.
    ///
    /// On Windows the menu opens on release, so it is suppressed exactly
    /// while default handling is. Elsewhere it opens on press: it is
    /// suppressed during an attempt unless it is the second request of a
    /// double click, which is let through and ends the attempt.
    pub fn context_menu(&mut self, sample: &Sample) -> bool {
        if self.platform == Platform::Windows {
            return self.suppresses_default(sample.timestamp);
        }
        if self.is_idle() {
            return false;
        }

        let point = sample.point();
        let double_click = self.last_context_click.is_some_and(|(time, last)| {
            sample.timestamp.saturating_sub(time) < DOUBLE_CLICK_THRESHOLD
                && distance(last, point) < self.settings.distance_threshold
        });

        if double_click {
            self.reset(sample.timestamp);
            self.last_context_click = None;
            return false;
        }

        self.last_context_click = Some((sample.timestamp, point));
        true
    }

    /// Whether clicks and button events should be kept from the
    /// application underneath at `now`.
    pub fn suppresses_default(&self, now: Duration) -> bool {
        self.state == MachineState::Active
            || self.prevent_default_until.is_some_and(|until| now < until)
    }

    // -- Transitions ------------------------------------------

    fn trigger_mask(&self) -> u8 {
        self.settings.mouse_button.mask()
    }

    fn is_idle(&self) -> bool {
        matches!(self.state, MachineState::Passive | MachineState::Aborted)
    }

    fn initialize(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        self.buffer.clear();
        self.buffer.push(sample);
        self.state = MachineState::Pending;
        listener.on_register(&self.buffer, &sample);
    }

    fn update(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        self.buffer.push(sample);

        match self.state {
            MachineState::Pending => {
                let initial = self.buffer[0].point();
                if distance(initial, sample.point()) > self.settings.distance_threshold {
                    self.state = MachineState::Active;
                    self.activated = true;
                    self.prevent_default_until = None;
                    self.arm_timeout(sample.timestamp);
                    listener.on_start(&self.buffer, &sample);
                }
            }
            MachineState::Active => {
                self.arm_timeout(sample.timestamp);
                listener.on_update(&self.buffer, &sample);
            }
            MachineState::Passive | MachineState::Aborted => {}
        }
    }

    fn terminate(&mut self, sample: Sample, listener: &mut impl ControllerListener) {
        self.buffer.push(sample);
        if self.state == MachineState::Active {
            listener.on_end(&self.buffer, &sample);
        }
        self.reset(sample.timestamp);
    }

    fn abort(&mut self, now: Duration, listener: &mut impl ControllerListener) {
        self.state = MachineState::Aborted;
        listener.on_abort(&self.buffer);
        self.reset(now);
    }

    fn expire(&mut self, now: Duration, listener: &mut impl ControllerListener) {
        if self.abort_deadline.is_some_and(|deadline| now >= deadline) {
            debug!("Gesture timed out, aborting");
            self.abort(now, listener);
        }
    }

    /// Cancel any running countdown and start a new one, if enabled.
    fn arm_timeout(&mut self, now: Duration) {
        self.abort_deadline = self
            .settings
            .timeout
            .active
            .then(|| now + self.settings.timeout.duration);
    }

    fn reset(&mut self, now: Duration) {
        self.abort_deadline = None;

        // Windows delivers the context menu after the release, so default
        // handling stays suppressed for a moment after an activated gesture.
        if self.platform == Platform::Windows && self.activated {
            self.prevent_default_until = Some(now + PREVENTION_LINGER);
        }

        self.activated = false;
        self.buffer.clear();
        self.state = MachineState::Passive;
    }
}
