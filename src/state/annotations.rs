/// The annotation store: manual circles and removal marks
///
/// The store only changes through the explicit operations below. It never
/// sees the detector; callers hand in the currently reconciled auto circles
/// when a removal has to hit-test them.

use cgmath::Point2;

use super::data::{Circle, CircleId, ManualCircle, RemovedMark};

/// Anchor of an in-progress resize drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub id: CircleId,
    pub start_y: f64,
    pub start_radius: f64,
}

/// What a removal click hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Removal {
    /// A manual circle was deleted from the store
    Manual(ManualCircle),
    /// An auto-detected circle was turned into a removal mark
    Auto(Circle),
    /// Nothing under the cursor
    Nothing,
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
    manual: Vec<ManualCircle>,
    removed: Vec<RemovedMark>,
    next_id: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manual circles in insertion order
    pub fn manual(&self) -> &[ManualCircle] {
        &self.manual
    }

    pub fn removed(&self) -> &[RemovedMark] {
        &self.removed
    }

    pub fn get(&self, id: CircleId) -> Option<&ManualCircle> {
        self.manual.iter().find(|m| m.id == id)
    }

    /// Append a new manual circle and return its handle
    pub fn add_manual(&mut self, at: Point2<f64>, radius: f64) -> CircleId {
        let id = CircleId(self.next_id);
        self.next_id += 1;
        self.manual.push(ManualCircle {
            id,
            circle: Circle::new(at.x, at.y, radius),
        });
        id
    }

    /// First manual circle (by index) containing `point`
    pub fn find_manual_at(&self, point: Point2<f64>) -> Option<&ManualCircle> {
        self.manual.iter().find(|m| m.circle.contains(point))
    }

    /// Start a resize drag on an existing manual circle
    pub fn begin_drag(&self, id: CircleId, start_y: f64) -> Option<DragAnchor> {
        self.get(id).map(|m| DragAnchor {
            id,
            start_y,
            start_radius: m.circle.r,
        })
    }

    /// Resize the dragged circle from the pointer's current y
    ///
    /// radius = max(floor, start_radius + (y - start_y)). Returns the new
    /// radius, or None if the circle no longer exists.
    pub fn resize_active(&mut self, anchor: &DragAnchor, original_y: f64, floor: f64) -> Option<f64> {
        let radius = (anchor.start_radius + (original_y - anchor.start_y)).max(floor);
        let manual = self.manual.iter_mut().find(|m| m.id == anchor.id)?;
        manual.circle.r = radius;
        Some(radius)
    }

    /// Remove the first circle under `point`
    ///
    /// Manual circles are tested first, in store order, then `auto_circles`
    /// (the auto-detected circles that survived suppression). At most one
    /// circle is removed.
    pub fn remove_at(&mut self, point: Point2<f64>, auto_circles: &[Circle]) -> Removal {
        if let Some(index) = self.manual.iter().position(|m| m.circle.contains(point)) {
            return Removal::Manual(self.manual.remove(index));
        }

        if let Some(circle) = auto_circles.iter().find(|c| c.contains(point)) {
            self.removed.push(RemovedMark { circle: *circle });
            return Removal::Auto(*circle);
        }

        Removal::Nothing
    }
}
