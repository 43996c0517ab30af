//! Rocker gestures: pressing one of left/right while the other is held.
use strum::{Display, IntoStaticStr};

use crate::controller::{MouseButton, PointerInput};

const ROCKER_MASK: u8 = MouseButton::Left.mask() | MouseButton::Right.mask();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum RockerSide {
    #[strum(to_string = "rocker_left")]
    Left,
    #[strum(to_string = "rocker_right")]
    Right,
}

/// The rocker side `input` completes, if it is a trusted press that leaves
/// exactly left and right held.
pub fn rocker_side(input: &PointerInput) -> Option<RockerSide> {
    let sample = input.pressed().filter(|s| s.trusted)?;
    if sample.buttons != ROCKER_MASK {
        return None;
    }
    match sample.button? {
        MouseButton::Left => Some(RockerSide::Left),
        MouseButton::Right => Some(RockerSide::Right),
        MouseButton::Middle => None,
    }
}
