//! mousegestr – Mouse gesture recognition for Linux pointer devices.
//!
//! Pipeline: [`controller`] decides when a press becomes a gesture,
//! [`pattern`] reduces the pointer stream to direction vectors, and
//! [`matcher`] resolves the final pattern to a registered gesture.
//! [`rocker`] and [`wheel`] recognize the button-chord and scroll gestures
//! alongside.

pub mod config;
pub mod controller;
pub mod event;
pub mod manager;
pub mod matcher;
pub mod pattern;
pub mod rocker;
pub mod session;
pub mod trace;
pub mod vector;
pub mod wheel;
