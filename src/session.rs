//! Gesture registry and the capture-to-recognition pipeline.
//!
//! [`GestureSession`] wires the [`MouseController`] lifecycle to a
//! [`PatternExtractor`] and a [`GestureMatcher`]: every accepted sample
//! extends the live pattern, and the final pattern is matched against the
//! registry when the trigger button is released.
use log::debug;

use crate::config::GestureSettings;
use crate::controller::{
    ControllerListener, MachineState, MouseController, Platform, PointerInput, Sample,
};
use crate::matcher::{GestureMatcher, MatchingAlgorithm, match_pattern};
use crate::pattern::{Pattern, PatternExtractor, PatternStatus};
use crate::rocker::{RockerSide, rocker_side};
use crate::vector::Vector;
use crate::wheel::{WheelController, WheelDirection};

// -- Registry -------------------------------------------------

/// A registered gesture: the pattern to recognize and what to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub label: String,
    pub pattern: Pattern,
    pub action: Option<String>,
    pub enabled: bool,
}

/// Ordered set of registered gestures. Registration order breaks ties.
#[derive(Debug, Clone, Default)]
pub struct GestureRegistry {
    gestures: Vec<Gesture>,
}

impl GestureRegistry {
    pub fn new(gestures: Vec<Gesture>) -> Self {
        Self { gestures }
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gesture> {
        self.gestures.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Gesture> {
        self.gestures.iter().find(|g| g.label == label)
    }

    /// Enabled gestures as matcher candidates.
    pub fn candidates(&self) -> impl Iterator<Item = (&[Vector], &Gesture)> {
        self.gestures
            .iter()
            .filter(|g| g.enabled)
            .map(|g| (g.pattern.as_slice(), g))
    }

    /// The registered gesture `pattern` would be recognized as, ignoring
    /// the gesture labelled `exclude`.
    pub fn find_similar(
        &self,
        pattern: &[Vector],
        exclude: Option<&str>,
        algorithm: MatchingAlgorithm,
        tolerance: f64,
    ) -> Option<&Gesture> {
        let others = self
            .candidates()
            .filter(|(_, g)| exclude.is_none_or(|label| g.label != label));
        match_pattern(pattern, others, algorithm, tolerance).map(|m| m.id)
    }
}

// -- Session --------------------------------------------------

/// Observable outcome of feeding input to a [`GestureSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The trigger button went down; a gesture may follow.
    Registered,
    /// The movement crossed the distance threshold.
    Started,
    /// The live pattern changed shape.
    Changed {
        pattern: Pattern,
        matching: Option<String>,
    },
    /// The gesture ended and matched a registered one.
    Recognized { label: String, pattern: Pattern },
    /// The gesture ended without a match.
    Unrecognized { pattern: Pattern },
    /// The gesture was abandoned (timeout, visibility, foreign button).
    Aborted,
    /// A rocker chord completed.
    Rocker(RockerSide),
    /// Enough scrolling with the wheel button held.
    Wheel(WheelDirection),
    /// A context-menu request was decided.
    ContextMenu { suppressed: bool },
}

/// Listener side of the session: everything the controller drives.
#[derive(Debug)]
struct Pipeline {
    extractor: PatternExtractor,
    matcher: GestureMatcher,
    registry: GestureRegistry,
    events: Vec<SessionEvent>,
}

impl Pipeline {
    fn best_label(&self, pattern: &[Vector]) -> Option<String> {
        self.matcher
            .best_match(pattern, self.registry.candidates())
            .map(|m| m.id.label.clone())
    }

    fn push_change(&mut self) {
        let pattern = self.extractor.pattern();
        let matching = self.best_label(&pattern);
        self.events.push(SessionEvent::Changed { pattern, matching });
    }
}

impl ControllerListener for Pipeline {
    fn on_register(&mut self, _buffer: &[Sample], _sample: &Sample) {
        self.extractor.clear();
        self.events.push(SessionEvent::Registered);
    }

    fn on_start(&mut self, buffer: &[Sample], _sample: &Sample) {
        self.events.push(SessionEvent::Started);
        let mut changed = false;
        for s in buffer {
            changed |= self.extractor.add_point(s.x, s.y).changed();
        }
        if changed {
            self.push_change();
        }
    }

    fn on_update(&mut self, _buffer: &[Sample], sample: &Sample) {
        if self.extractor.add_point(sample.x, sample.y) != PatternStatus::NoThreshold {
            self.push_change();
        }
    }

    fn on_end(&mut self, _buffer: &[Sample], sample: &Sample) {
        self.extractor.add_point(sample.x, sample.y);
        let pattern = self.extractor.pattern();

        let event = match self.best_label(&pattern) {
            Some(label) => SessionEvent::Recognized { label, pattern },
            None => SessionEvent::Unrecognized { pattern },
        };
        self.events.push(event);
        self.extractor.clear();
    }

    fn on_abort(&mut self, buffer: &[Sample]) {
        debug!("Gesture aborted after {} sample(s)", buffer.len());
        self.extractor.clear();
        self.events.push(SessionEvent::Aborted);
    }
}

/// One capture pipeline: controller, extractor, matcher and registry,
/// plus the optional rocker and wheel recognizers.
#[derive(Debug)]
pub struct GestureSession {
    controller: MouseController,
    pipeline: Pipeline,
    rocker: bool,
    wheel: Option<WheelController>,
}

impl GestureSession {
    pub fn new(settings: GestureSettings, platform: Platform, registry: GestureRegistry) -> Self {
        Self {
            controller: MouseController::new(settings, platform),
            pipeline: Pipeline {
                extractor: PatternExtractor::new(
                    settings.distance_threshold,
                    settings.deviation_tolerance,
                ),
                matcher: GestureMatcher::new(
                    settings.deviation_tolerance,
                    settings.matching_algorithm,
                ),
                registry,
                events: Vec::new(),
            },
            rocker: false,
            wheel: None,
        }
    }

    /// Enable or disable rocker gestures.
    pub fn set_rocker(&mut self, active: bool) {
        self.rocker = active;
    }

    /// Enable wheel gestures with `wheel`, or disable them with `None`.
    pub fn set_wheel(&mut self, wheel: Option<WheelController>) {
        self.wheel = wheel;
    }

    /// Apply new settings to every stage.
    pub fn apply_config(&mut self, settings: GestureSettings) {
        self.controller.apply_config(settings);
        self.pipeline
            .extractor
            .apply_config(settings.distance_threshold, settings.deviation_tolerance);
        self.pipeline
            .matcher
            .apply_config(settings.deviation_tolerance, settings.matching_algorithm);
    }

    /// Replace the registered gestures.
    pub fn set_gestures(&mut self, registry: GestureRegistry) {
        self.pipeline.registry = registry;
    }

    pub fn gestures(&self) -> &GestureRegistry {
        &self.pipeline.registry
    }

    pub fn state(&self) -> MachineState {
        self.controller.state()
    }

    pub fn abort_deadline(&self) -> Option<std::time::Duration> {
        self.controller.abort_deadline()
    }

    /// Pattern of the gesture in progress (empty when idle).
    pub fn live_pattern(&self) -> Pattern {
        self.pipeline.extractor.pattern()
    }

    /// Feed one input and collect what it caused.
    pub fn feed(&mut self, input: PointerInput) -> Vec<SessionEvent> {
        let extra = self.side_gesture(&input);
        let menu = match &input {
            PointerInput::ContextMenu(sample) if sample.trusted => Some(*sample),
            _ => None,
        };

        self.controller.feed(input, &mut self.pipeline);
        if let Some(sample) = menu {
            let suppressed = self.context_menu(&sample);
            self.pipeline.events.push(SessionEvent::ContextMenu { suppressed });
        }
        self.pipeline.events.extend(extra);
        std::mem::take(&mut self.pipeline.events)
    }

    /// Rocker and wheel recognition for one input.
    fn side_gesture(&mut self, input: &PointerInput) -> Option<SessionEvent> {
        match input {
            PointerInput::Wheel { sample, delta } => self
                .wheel
                .as_mut()
                .and_then(|wheel| wheel.scroll(sample, *delta))
                .map(SessionEvent::Wheel),
            PointerInput::VisibilityChange(_) => {
                if let Some(wheel) = &mut self.wheel {
                    wheel.reset();
                }
                None
            }
            _ => {
                if input.pressed().is_some_and(|s| s.trusted) {
                    if let Some(wheel) = &mut self.wheel {
                        wheel.reset();
                    }
                }
                rocker_side(input)
                    .filter(|_| self.rocker)
                    .map(SessionEvent::Rocker)
            }
        }
    }

    /// See [`MouseController::context_menu`].
    pub fn context_menu(&mut self, sample: &Sample) -> bool {
        let suppress = self.controller.context_menu(sample);
        if self.controller.state() == MachineState::Passive {
            self.pipeline.extractor.clear();
        }
        suppress
    }

    pub fn suppresses_default(&self, now: std::time::Duration) -> bool {
        self.controller.suppresses_default(now)
    }

    /// Drop the gesture in progress without reporting it.
    pub fn cancel(&mut self, now: std::time::Duration) {
        self.controller.cancel(now);
        self.pipeline.extractor.clear();
    }
}
