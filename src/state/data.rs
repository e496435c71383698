/// Shared data structures for the annotation state
///
/// Every circle stored here is in original-image coordinates. Conversions to
/// and from the screen go through `ViewState` (view.rs).

use cgmath::{MetricSpace, Point2};

/// A circle in original-image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Euclidean distance from the circle's center to `point`
    pub fn distance_to(&self, point: Point2<f64>) -> f64 {
        self.center().distance(point)
    }

    /// Hit test: `point` lies on or inside the circle
    pub fn contains(&self, point: Point2<f64>) -> bool {
        self.distance_to(point) <= self.r
    }
}

/// Stable handle for a manual circle, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CircleId(pub u64);

/// A circle the user placed (or resized) by hand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualCircle {
    pub id: CircleId,
    pub circle: Circle,
}

/// A suppression zone left behind when an auto-detected circle is removed
///
/// Any later detection whose center falls strictly inside the mark is hidden,
/// even if its center or radius drifted slightly between detection passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedMark {
    pub circle: Circle,
}

impl RemovedMark {
    pub fn suppresses(&self, candidate: &Circle) -> bool {
        candidate.distance_to(self.circle.center()) < self.circle.r
    }
}

/// Where a reconciled circle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Auto,
    Manual(CircleId),
}
