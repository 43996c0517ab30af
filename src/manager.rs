//! Gesture manager: live capture, trace replay and device discovery (I/O layer).
//!
//! Pure event-processing logic lives in [`crate::event`].
use std::path::Path;
use std::process::{Command, ExitCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use evdev::{Device, InputEvent, Key, RelativeAxisType};
use log::{debug, error, info, warn};

use crate::config::{AppConfig, MousegestrError, parse_config_file, report_collisions};
use crate::controller::PointerInput;
use crate::pattern::{Pattern, extract_pattern};
use crate::session::{GestureSession, SessionEvent};
use crate::trace::{parse_trace_file, trace_points};
use crate::wheel::WheelController;

// Re-export event symbols so `use mousegestr::manager::*` covers the pipeline.
pub use crate::event::{
    PointerTracker, RawInput, classify_event, parse_usb_id, process_pointer_inputs,
    process_raw_inputs, resolve_action,
};

/// Upper bound on how long the session loop blocks without checking the
/// running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A pattern recorded from a trace, with the gesture it collides with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGesture {
    pub pattern: Pattern,
    pub similar: Option<String>,
}

/// Render a pattern the way it is written in the config file.
pub fn format_pattern(pattern: &[crate::vector::Vector]) -> String {
    let vectors: Vec<String> = pattern
        .iter()
        .map(|v| format!("[{:.1}, {:.1}]", v.dx, v.dy))
        .collect();
    format!("pattern = [{}]", vectors.join(", "))
}

// -- GestureManager (top-level orchestrator) ------------------

/// Owns the configuration and drives capture sessions.
pub struct GestureManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
}

impl GestureManager {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, MousegestrError> {
        Ok(Self::from_config(parse_config_file(config_path.as_ref())?))
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A fresh capture session for the loaded settings and gestures.
    pub fn session(&self) -> GestureSession {
        let mut session = GestureSession::new(
            self.config.settings,
            self.config.platform,
            self.config.gestures.clone(),
        );
        let wheel = &self.config.wheel;
        session.set_rocker(self.config.rocker.active);
        session.set_wheel(
            wheel
                .active
                .then(|| WheelController::new(wheel.mouse_button, wheel.sensitivity)),
        );
        session
    }

    /// Log registered gestures that shadow each other.
    pub fn check_gestures(&self) {
        let collisions = report_collisions(&self.config);
        debug!(
            "{} gesture(s) registered, {collisions} collision(s)",
            self.config.gestures.len()
        );
    }

    /// Feed a recorded trace through a fresh session.
    pub fn replay(&self, trace: &Path) -> Result<Vec<SessionEvent>, MousegestrError> {
        let inputs = parse_trace_file(trace)?;
        info!("Replaying {} input(s) from {}", inputs.len(), trace.display());
        let mut session = self.session();
        Ok(process_pointer_inputs(&mut session, inputs))
    }

    /// Extract a gesture pattern from a trace and check it for collisions.
    pub fn record(&self, trace: &Path) -> Result<RecordedGesture, MousegestrError> {
        let settings = &self.config.settings;
        let points = trace_points(&parse_trace_file(trace)?);
        let pattern = extract_pattern(
            points,
            settings.distance_threshold,
            settings.deviation_tolerance,
        );
        let similar = self
            .config
            .gestures
            .find_similar(
                &pattern,
                None,
                settings.matching_algorithm,
                settings.deviation_tolerance,
            )
            .map(|g| g.label.clone());
        Ok(RecordedGesture { pattern, similar })
    }

    /// Capture gestures from the configured mouse until stopped.
    pub fn start(&mut self) {
        let Some(mouse_id) = self.config.device.mouse_usb_id.clone() else {
            error!("No mouse device configured");
            return;
        };
        if self.config.gestures.is_empty() {
            warn!("No gestures configured - nothing will be recognized");
        }

        self.running.store(true, Ordering::Relaxed);
        info!("Starting gesture manager");

        let (tx, rx) = mpsc::channel();

        let Some(mouse) = find_device("mouse", &mouse_id, is_pointer_device) else {
            error!("Mouse not found, exiting");
            return;
        };
        spawn_reader("mouse", mouse_id, mouse, is_pointer_device, tx.clone(), &self.running);

        if let Some(keyboard_id) = self.config.device.keyboard_usb_id.clone() {
            match find_device("keyboard", &keyboard_id, is_keyboard_device) {
                Some(keyboard) => spawn_reader(
                    "keyboard",
                    keyboard_id,
                    keyboard,
                    is_keyboard_device,
                    tx.clone(),
                    &self.running,
                ),
                None => warn!("Keyboard not found, suppression key will not work"),
            }
        }
        drop(tx);

        let mut session = self.session();
        session_loop(&rx, &mut session, &self.config, &self.running);
    }

    /// Stop capturing.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Gesture manager stopped");
    }

    /// Get a reference to the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get the log level from the parsed configuration.
    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    /// Get the optional log file path from the parsed configuration.
    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

// -- Session loop ---------------------------------------------

/// Messages from device reader threads.
enum DeviceMessage {
    Events(Vec<InputEvent>),
    Disconnected(&'static str),
}

/// Drive the session from device events, ticking the timeout in between.
fn session_loop(
    rx: &Receiver<DeviceMessage>,
    session: &mut GestureSession,
    config: &AppConfig,
    running: &Arc<AtomicBool>,
) {
    let origin = Instant::now();
    let mut tracker = PointerTracker::new();

    while running.load(Ordering::Relaxed) {
        let wait = session
            .abort_deadline()
            .map_or(POLL_INTERVAL, |deadline| {
                deadline.saturating_sub(origin.elapsed()).min(POLL_INTERVAL)
            });

        let fired = match rx.recv_timeout(wait) {
            Ok(DeviceMessage::Events(events)) => {
                let raw: Vec<RawInput> = events.iter().filter_map(classify_event).collect();
                process_raw_inputs(session, &mut tracker, &raw, origin.elapsed())
            }
            Ok(DeviceMessage::Disconnected("mouse")) => {
                error!("Mouse is gone, stopping");
                break;
            }
            Ok(DeviceMessage::Disconnected(role)) => {
                warn!("Lost {role} device, continuing without it");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => session.feed(PointerInput::Tick(origin.elapsed())),
            Err(RecvTimeoutError::Disconnected) => break,
        };

        for event in fired {
            handle_session_event(event, config);
        }
    }

    session.cancel(origin.elapsed());
}

fn handle_session_event(event: SessionEvent, config: &AppConfig) {
    match event {
        SessionEvent::Registered => {}
        SessionEvent::Started => debug!("Gesture started"),
        SessionEvent::Changed { pattern, matching } => {
            debug!(
                "Pattern now {} vector(s), matching {}",
                pattern.len(),
                matching.as_deref().unwrap_or("nothing")
            );
        }
        SessionEvent::Recognized { label, .. } => {
            execute_gesture(&label, resolve_action(&label, &config.gestures));
        }
        SessionEvent::Unrecognized { pattern } => {
            info!("Unrecognized gesture: {}", format_pattern(&pattern));
        }
        SessionEvent::Aborted => info!("Gesture aborted"),
        SessionEvent::Rocker(side) => execute_gesture(side.into(), config.rocker.action(side)),
        SessionEvent::Wheel(direction) => {
            execute_gesture(direction.into(), config.wheel.action(direction));
        }
        SessionEvent::ContextMenu { suppressed } => debug!("Context menu suppressed: {suppressed}"),
    }
}

/// Spawn the shell command for a recognized gesture.
fn execute_gesture(label: &str, action: Option<&str>) {
    if let Some(action) = action {
        match Command::new("sh").arg("-c").arg(action).spawn() {
            Ok(_) => debug!("Spawned action: {action}"),
            Err(e) => error!("Failed to execute action '{action}': {e}"),
        }
    }
    info!("Gesture: {label}");
}

// -- Device I/O -----------------------------------------------

/// Check if a device reports relative motion and a left button.
fn is_pointer_device(device: &Device) -> bool {
    let (Some(axes), Some(keys)) = (device.supported_relative_axes(), device.supported_keys())
    else {
        return false;
    };
    axes.contains(RelativeAxisType::REL_X)
        && axes.contains(RelativeAxisType::REL_Y)
        && keys.contains(Key::BTN_LEFT)
}

/// Check if a device has modifier keys.
fn is_keyboard_device(device: &Device) -> bool {
    device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::KEY_LEFTALT) && keys.contains(Key::KEY_LEFTCTRL))
}

/// Find an input device by USB vendor:product ID.
fn find_device(role: &str, usb_id: &str, accept: fn(&Device) -> bool) -> Option<Device> {
    let Some((vendor, product)) = parse_usb_id(usb_id) else {
        warn!("{role}: invalid USB ID format '{usb_id}' (expected vendor:product)");
        return None;
    };

    for (path, device) in evdev::enumerate() {
        if !accept(&device) {
            continue;
        }
        let id = device.input_id();
        if id.vendor() == vendor && id.product() == product {
            info!(
                "Found {role} by USB ID {usb_id}: {} ({})",
                device.name().unwrap_or("unknown"),
                path.display()
            );
            return Some(device);
        }
    }

    warn!("{role}: no matching device with USB ID {usb_id} found");
    None
}

/// Read a device on its own thread, forwarding event batches.
fn spawn_reader(
    role: &'static str,
    usb_id: String,
    mut device: Device,
    accept: fn(&Device) -> bool,
    tx: Sender<DeviceMessage>,
    running: &Arc<AtomicBool>,
) {
    let running = Arc::clone(running);
    let spawned = thread::Builder::new()
        .name(format!("gesture-{role}"))
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                match device.fetch_events().map(|iter| iter.collect::<Vec<_>>()) {
                    Ok(events) => {
                        if tx.send(DeviceMessage::Events(events)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }
                        warn!("{role} disconnected: {e}");
                        match attempt_reconnect(role, &usb_id, accept, &running) {
                            Some(new_device) => device = new_device,
                            None => {
                                let _ = tx.send(DeviceMessage::Disconnected(role));
                                return;
                            }
                        }
                    }
                }
            }
        });

    if let Err(e) = spawned {
        error!("Failed to spawn {role} reader: {e}");
    }
}

/// Attempt to find a device again after it disconnects.
fn attempt_reconnect(
    role: &str,
    usb_id: &str,
    accept: fn(&Device) -> bool,
    running: &Arc<AtomicBool>,
) -> Option<Device> {
    const MAX_RETRIES: usize = 10;
    const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    for attempt in 1..=MAX_RETRIES {
        if !running.load(Ordering::Relaxed) {
            return None;
        }
        info!("Reconnect attempt {attempt}/{MAX_RETRIES} for {role}...");
        thread::sleep(RETRY_INTERVAL);

        if let Some(device) = find_device(role, usb_id, accept) {
            info!("Reconnected to {role}");
            return Some(device);
        }
    }
    error!("Failed to reconnect to {role} after {MAX_RETRIES} attempts");
    None
}

/// List all pointer devices.
pub fn list_pointer_devices() -> ExitCode {
    println!("\n=== mousegestr: Available Pointer Devices ===\n");
    let mut count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_pointer_device(&device) {
            continue;
        }

        count += 1;
        println!(
            "Device {count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n\
             \x20 Phys:      {}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
            device.physical_path().unwrap_or("N/A"),
        );
    }

    if count == 0 {
        println!(
            "No pointer devices found.\n\n\
             Troubleshooting:\n\
             \x20 - Check if the mouse is connected\n\
             \x20 - Run 'libinput list-devices' to see all devices\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {count} pointer device(s).\n\n\
         Add the USB ID to your gestures.toml:\n\
         \x20 [device]\n\
         \x20 mouse_usb_id = \"<USB ID>\""
    );
    ExitCode::SUCCESS
}
