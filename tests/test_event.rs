//! Integration tests for the event-processing logic in `event`.
//!
//! Tests drive `PointerTracker` with `RawInput` directly (no hardware)
//! and also verify `classify_event` with synthetic `evdev::InputEvent`s.
use std::time::Duration;

use evdev::{EventType, InputEvent, Key, RelativeAxisType, Synchronization};
use mousegestr::config::GestureSettings;
use mousegestr::controller::{MouseButton, Platform, PointerInput};
use mousegestr::event::{
    ModifierKey, PointerTracker, RawInput, classify_event, parse_usb_id, process_raw_inputs,
    resolve_action,
};
use mousegestr::session::{Gesture, GestureRegistry, GestureSession, SessionEvent};
use mousegestr::vector::Vector;
use mousegestr::wheel::{WHEEL_NOTCH_DELTA, WheelController, WheelDirection};

// -- Helpers --------------------------------------------------

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn make_registry(entries: &[(&str, (f64, f64), &str, bool)]) -> GestureRegistry {
    GestureRegistry::new(
        entries
            .iter()
            .map(|(label, vector, action, enabled)| Gesture {
                label: label.to_string(),
                pattern: vec![Vector::from(*vector)],
                action: if action.is_empty() {
                    None
                } else {
                    Some(action.to_string())
                },
                enabled: *enabled,
            })
            .collect(),
    )
}

fn press(button: MouseButton) -> RawInput {
    RawInput::Button {
        button,
        pressed: true,
    }
}

fn release(button: MouseButton) -> RawInput {
    RawInput::Button {
        button,
        pressed: false,
    }
}

/// Push a whole report and return what it flushed.
fn report(tracker: &mut PointerTracker, raws: &[RawInput], t: u64) -> Vec<PointerInput> {
    let mut out = Vec::new();
    for raw in raws {
        out.extend(tracker.push(*raw, ms(t)));
    }
    out.extend(tracker.push(RawInput::SynReport, ms(t)));
    out
}

// -- PointerTracker -------------------------------------------

#[test]
fn test_nothing_flushed_before_syn_report() {
    let mut tracker = PointerTracker::new();
    assert!(tracker.push(RawInput::MotionX(5), ms(0)).is_empty());
    assert!(tracker.push(press(MouseButton::Right), ms(0)).is_empty());
    assert_eq!(tracker.position(), (0.0, 0.0));
    assert_eq!(tracker.buttons(), 0);
}

#[test]
fn test_motion_is_integrated() {
    let mut tracker = PointerTracker::new();
    let first = report(&mut tracker, &[RawInput::MotionX(5), RawInput::MotionY(-3)], 0);
    let second = report(&mut tracker, &[RawInput::MotionX(2), RawInput::MotionX(3)], 8);

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    let PointerInput::Move(sample) = second[0] else {
        panic!("expected a move, got {:?}", second[0]);
    };
    assert_eq!((sample.x, sample.y), (10.0, -3.0));
    assert_eq!(sample.buttons, 0);
    assert_eq!(sample.timestamp, ms(8));
    assert_eq!(tracker.position(), (10.0, -3.0));
}

#[test]
fn test_empty_report_flushes_nothing() {
    let mut tracker = PointerTracker::new();
    assert!(report(&mut tracker, &[], 0).is_empty());
}

#[test]
fn test_motion_precedes_press_in_same_report() {
    let mut tracker = PointerTracker::new();
    let inputs = report(&mut tracker, &[RawInput::MotionX(4), press(MouseButton::Right)], 0);

    assert_eq!(inputs.len(), 2);
    let PointerInput::Move(moved) = inputs[0] else {
        panic!("expected a move first");
    };
    assert_eq!(moved.buttons, 0);
    let PointerInput::Down(pressed) = inputs[1] else {
        panic!("expected a down second");
    };
    assert_eq!(pressed.buttons, 2);
    assert_eq!(pressed.button, Some(MouseButton::Right));
    assert_eq!(pressed.x, 4.0);
}

#[test]
fn test_second_button_is_a_move_with_changed_button() {
    let mut tracker = PointerTracker::new();
    let _ = report(&mut tracker, &[press(MouseButton::Right)], 0);
    let inputs = report(&mut tracker, &[press(MouseButton::Left)], 5);

    let [PointerInput::Move(sample)] = inputs.as_slice() else {
        panic!("expected a single move, got {inputs:?}");
    };
    assert_eq!(sample.buttons, 3);
    assert_eq!(sample.button, Some(MouseButton::Left));

    let inputs = report(&mut tracker, &[release(MouseButton::Left)], 6);
    assert!(matches!(inputs.as_slice(), [PointerInput::Move(s)] if s.buttons == 2));
}

#[test]
fn test_last_release_is_an_up() {
    let mut tracker = PointerTracker::new();
    let _ = report(&mut tracker, &[press(MouseButton::Right)], 0);
    let inputs = report(&mut tracker, &[release(MouseButton::Right)], 5);
    assert!(matches!(
        inputs.as_slice(),
        [PointerInput::Up(s)] if s.buttons == 0 && s.button == Some(MouseButton::Right)
    ));
    assert_eq!(tracker.buttons(), 0);
}

#[test]
fn test_unchanged_button_state_is_skipped() {
    let mut tracker = PointerTracker::new();
    assert!(report(&mut tracker, &[release(MouseButton::Middle)], 0).is_empty());
    let _ = report(&mut tracker, &[press(MouseButton::Middle)], 1);
    assert!(report(&mut tracker, &[press(MouseButton::Middle)], 2).is_empty());
}

#[test]
fn test_modifiers_are_carried_on_samples() {
    let mut tracker = PointerTracker::new();
    let alt_down = RawInput::Modifier {
        key: ModifierKey::Alt,
        pressed: true,
    };
    let inputs = report(&mut tracker, &[alt_down, press(MouseButton::Right)], 0);
    let [PointerInput::Down(sample)] = inputs.as_slice() else {
        panic!("expected a down, got {inputs:?}");
    };
    assert!(sample.modifiers.alt);
    assert!(!sample.modifiers.ctrl);
}

#[test]
fn test_wheel_notches_become_one_scroll_delta() {
    let mut tracker = PointerTracker::new();
    let _ = report(&mut tracker, &[press(MouseButton::Left)], 0);
    let inputs = report(&mut tracker, &[RawInput::Wheel(1), RawInput::Wheel(1)], 5);

    let [PointerInput::Wheel { sample, delta }] = inputs.as_slice() else {
        panic!("expected a single wheel input, got {inputs:?}");
    };
    assert_eq!(*delta, -2.0 * WHEEL_NOTCH_DELTA);
    assert_eq!(sample.buttons, 1);
}

#[test]
fn test_wheel_follows_motion_and_buttons() {
    let mut tracker = PointerTracker::new();
    let inputs = report(
        &mut tracker,
        &[
            RawInput::Wheel(-1),
            RawInput::MotionX(3),
            press(MouseButton::Left),
        ],
        0,
    );
    assert!(matches!(
        inputs.as_slice(),
        [
            PointerInput::Move(_),
            PointerInput::Down(_),
            PointerInput::Wheel { delta, .. },
        ] if *delta == WHEEL_NOTCH_DELTA
    ));
}

// -- process_raw_inputs ---------------------------------------

#[test]
fn test_raw_stroke_is_recognized() {
    let registry = make_registry(&[("right", (1.0, 0.0), "echo right", true)]);
    let mut session = GestureSession::new(GestureSettings::default(), Platform::Linux, registry);
    let mut tracker = PointerTracker::new();

    let mut events = process_raw_inputs(
        &mut session,
        &mut tracker,
        &[press(MouseButton::Right), RawInput::SynReport],
        ms(0),
    );
    for i in 1..=10 {
        events.extend(process_raw_inputs(
            &mut session,
            &mut tracker,
            &[RawInput::MotionX(10), RawInput::SynReport],
            ms(i * 8),
        ));
    }
    events.extend(process_raw_inputs(
        &mut session,
        &mut tracker,
        &[release(MouseButton::Right), RawInput::SynReport],
        ms(100),
    ));

    assert_eq!(events.first(), Some(&SessionEvent::Registered));
    assert!(events.contains(&SessionEvent::Started));
    assert_eq!(
        events.last(),
        Some(&SessionEvent::Recognized {
            label: "right".to_string(),
            pattern: vec![Vector::new(100.0, 0.0)],
        })
    );
}

#[test]
fn test_raw_second_button_aborts() {
    let registry = make_registry(&[("right", (1.0, 0.0), "", true)]);
    let mut session = GestureSession::new(GestureSettings::default(), Platform::Linux, registry);
    let mut tracker = PointerTracker::new();

    let raws = [
        press(MouseButton::Right),
        RawInput::SynReport,
        RawInput::MotionX(50),
        RawInput::SynReport,
        press(MouseButton::Left),
        RawInput::SynReport,
    ];
    let events = process_raw_inputs(&mut session, &mut tracker, &raws, ms(0));
    assert_eq!(events.last(), Some(&SessionEvent::Aborted));
}

#[test]
fn test_raw_scroll_with_left_held_fires_wheel() {
    let mut session =
        GestureSession::new(GestureSettings::default(), Platform::Linux, GestureRegistry::default());
    session.set_wheel(Some(WheelController::new(MouseButton::Left, 30.0)));
    let mut tracker = PointerTracker::new();

    let raws = [
        press(MouseButton::Left),
        RawInput::SynReport,
        RawInput::Wheel(1),
        RawInput::SynReport,
        RawInput::Wheel(-1),
        RawInput::SynReport,
    ];
    let events = process_raw_inputs(&mut session, &mut tracker, &raws, ms(0));
    assert_eq!(
        events,
        vec![
            SessionEvent::Wheel(WheelDirection::Up),
            SessionEvent::Wheel(WheelDirection::Down),
        ]
    );
}

// -- classify_event: evdev → RawInput -------------------------

#[test]
fn test_classify_relative_motion() {
    let ev = InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, 5);
    assert_eq!(classify_event(&ev), Some(RawInput::MotionX(5)));
    let ev = InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, -7);
    assert_eq!(classify_event(&ev), Some(RawInput::MotionY(-7)));
}

#[test]
fn test_classify_wheel() {
    let ev = InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, -1);
    assert_eq!(classify_event(&ev), Some(RawInput::Wheel(-1)));
}

#[test]
fn test_classify_horizontal_wheel_ignored() {
    let ev = InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_HWHEEL.0, 1);
    assert_eq!(classify_event(&ev), None);
}

#[test]
fn test_classify_mouse_buttons() {
    let cases = [
        (0x110, MouseButton::Left),
        (0x111, MouseButton::Right),
        (0x112, MouseButton::Middle),
    ];
    for (code, button) in cases {
        let ev = InputEvent::new(EventType::KEY, code, 1);
        assert_eq!(
            classify_event(&ev),
            Some(RawInput::Button {
                button,
                pressed: true
            })
        );
        let ev = InputEvent::new(EventType::KEY, code, 0);
        assert_eq!(
            classify_event(&ev),
            Some(RawInput::Button {
                button,
                pressed: false
            })
        );
    }
}

#[test]
fn test_classify_key_autorepeat_ignored() {
    let ev = InputEvent::new(EventType::KEY, Key::KEY_LEFTALT.code(), 2);
    assert_eq!(classify_event(&ev), None);
}

#[test]
fn test_classify_modifiers() {
    let cases = [
        (Key::KEY_LEFTALT, ModifierKey::Alt),
        (Key::KEY_RIGHTALT, ModifierKey::Alt),
        (Key::KEY_LEFTCTRL, ModifierKey::Ctrl),
        (Key::KEY_LEFTSHIFT, ModifierKey::Shift),
        (Key::KEY_RIGHTSHIFT, ModifierKey::Shift),
    ];
    for (key, modifier) in cases {
        let ev = InputEvent::new(EventType::KEY, key.code(), 1);
        assert_eq!(
            classify_event(&ev),
            Some(RawInput::Modifier {
                key: modifier,
                pressed: true
            })
        );
    }
}

#[test]
fn test_classify_other_key_ignored() {
    let ev = InputEvent::new(EventType::KEY, Key::KEY_A.code(), 1);
    assert_eq!(classify_event(&ev), None);
}

#[test]
fn test_classify_syn_report() {
    let ev = InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0);
    assert_eq!(classify_event(&ev), Some(RawInput::SynReport));
}

// -- resolve_action -------------------------------------------

#[test]
fn test_resolve_action_enabled() {
    let g = make_registry(&[("back", (-1.0, 0.0), "xdotool key alt+Left", true)]);
    assert_eq!(resolve_action("back", &g), Some("xdotool key alt+Left"));
}

#[test]
fn test_resolve_action_disabled() {
    let g = make_registry(&[("back", (-1.0, 0.0), "xdotool key alt+Left", false)]);
    assert_eq!(resolve_action("back", &g), None);
}

#[test]
fn test_resolve_action_no_action_string() {
    let g = make_registry(&[("back", (-1.0, 0.0), "", true)]);
    assert_eq!(resolve_action("back", &g), None);
}

#[test]
fn test_resolve_action_not_registered() {
    let g = make_registry(&[("back", (-1.0, 0.0), "echo back", true)]);
    assert_eq!(resolve_action("forward", &g), None);
    assert_eq!(resolve_action("back", &GestureRegistry::default()), None);
}

// -- parse_usb_id ---------------------------------------------

#[test]
fn test_parse_usb_id_plain() {
    assert_eq!(parse_usb_id("046d:c52b"), Some((0x046d, 0xc52b)));
}

#[test]
fn test_parse_usb_id_with_prefix() {
    assert_eq!(parse_usb_id("USB:046D:C52B"), Some((0x046d, 0xc52b)));
}

#[test]
fn test_parse_usb_id_invalid() {
    assert_eq!(parse_usb_id(""), None);
    assert_eq!(parse_usb_id("046d"), None);
    assert_eq!(parse_usb_id("zzzz:c52b"), None);
    assert_eq!(parse_usb_id("046d:c52b:extra"), None);
}
