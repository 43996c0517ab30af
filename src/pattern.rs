//! Reduction of a raw pointer stream into a compact direction pattern.
//!
//! Only points where the movement direction changes beyond the deviation
//! tolerance survive; collinear motion and jitter below the distance
//! threshold are folded into the current run.
use crate::vector::{Point, Vector, direction_difference};

/// An ordered sequence of direction vectors. Empty means "no movement yet".
pub type Pattern = Vec<Vector>;

/// What a call to [`PatternExtractor::add_point`] did to the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternStatus {
    /// The point was the first one, or within the jitter radius.
    NoThreshold,
    /// The point extended the current run.
    PassedDistance,
    /// The point changed direction and committed a new vector.
    PassedDifference,
}

impl PatternStatus {
    /// `true` when the extracted pattern changed shape.
    pub fn changed(self) -> bool {
        self != PatternStatus::NoThreshold
    }
}

/// Incremental pattern extractor for one gesture cycle.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    distance_threshold: f64,
    deviation_tolerance: f64,

    anchor: Option<Point>,
    previous_point: Option<Point>,
    last_point: Option<Point>,
    previous_vector: Option<Vector>,
    extracted: Pattern,
}

impl PatternExtractor {
    pub fn new(distance_threshold: f64, deviation_tolerance: f64) -> Self {
        Self {
            distance_threshold,
            deviation_tolerance,
            anchor: None,
            previous_point: None,
            last_point: None,
            previous_vector: None,
            extracted: Vec::new(),
        }
    }

    /// Replace the thresholds used for subsequent points.
    pub fn apply_config(&mut self, distance_threshold: f64, deviation_tolerance: f64) {
        self.distance_threshold = distance_threshold;
        self.deviation_tolerance = deviation_tolerance;
    }

    /// Forget all points, ready for a new gesture cycle.
    pub fn clear(&mut self) {
        self.extracted.clear();
        self.anchor = None;
        self.previous_point = None;
        self.last_point = None;
        self.previous_vector = None;
    }

    /// Feed the next raw point.
    pub fn add_point(&mut self, x: f64, y: f64) -> PatternStatus {
        let point = Point::new(x, y);

        let Some(previous) = self.previous_point else {
            self.previous_point = Some(point);
            self.anchor = Some(point);
            self.last_point = Some(point);
            return PatternStatus::NoThreshold;
        };

        let candidate = point - previous;
        if candidate.magnitude() <= self.distance_threshold {
            // Jitter: remember where the pointer is, keep the run anchored.
            self.last_point = Some(point);
            return PatternStatus::NoThreshold;
        }

        let status = match (self.previous_vector, self.anchor) {
            (Some(current), Some(anchor))
                if direction_difference(current, candidate).abs() > self.deviation_tolerance =>
            {
                self.extracted.push(previous - anchor);
                self.anchor = Some(previous);
                self.previous_vector = Some(candidate);
                PatternStatus::PassedDifference
            }
            (Some(_), _) => PatternStatus::PassedDistance,
            (None, _) => {
                self.previous_vector = Some(candidate);
                PatternStatus::PassedDistance
            }
        };

        self.previous_point = Some(point);
        self.last_point = Some(point);
        status
    }

    /// Committed vectors plus the still-open run up to the latest point.
    pub fn pattern(&self) -> Pattern {
        let (Some(last), Some(anchor)) = (self.last_point, self.anchor) else {
            return Vec::new();
        };

        let mut pattern = self.extracted.clone();
        pattern.push(last - anchor);
        pattern
    }

    /// Number of committed (closed) vectors.
    pub fn committed_len(&self) -> usize {
        self.extracted.len()
    }
}

/// Extract a pattern from a complete point sequence in one call.
///
/// Produces exactly what feeding the same points through
/// [`PatternExtractor::add_point`] would.
pub fn extract_pattern(
    points: impl IntoIterator<Item = Point>,
    distance_threshold: f64,
    deviation_tolerance: f64,
) -> Pattern {
    let mut extractor = PatternExtractor::new(distance_threshold, deviation_tolerance);
    for point in points {
        extractor.add_point(point.x, point.y);
    }
    extractor.pattern()
}
