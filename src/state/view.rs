/// Viewport state and coordinate mapping
///
/// Three coordinate spaces are in play:
/// - original: pixels of the source image (all stored circles live here)
/// - scaled:   original * scale
/// - viewport: scaled - offset, i.e. what is on screen
///
/// Display conversions truncate toward zero in both directions so that the
/// point a click maps to and the point a circle is drawn at agree.

use cgmath::{Point2, Vector2};

/// A pixel position inside the viewport
pub type ViewportPoint = Point2<i32>;

/// Zoom level, pan offset and viewport size for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    scale: f64,
    /// Top-left of the visible window, scaled pixels
    offset: Vector2<i32>,
    view_width: u32,
    view_height: u32,
    image_width: u32,
    image_height: u32,
}

impl ViewState {
    /// Unzoomed, unpanned view of an image
    pub fn new(image_size: (u32, u32), view_size: (u32, u32)) -> Self {
        Self {
            scale: 1.0,
            offset: Vector2::new(0, 0),
            view_width: view_size.0,
            view_height: view_size.1,
            image_width: image_size.0,
            image_height: image_size.1,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Vector2<i32> {
        self.offset
    }

    pub fn view_size(&self) -> (u32, u32) {
        (self.view_width, self.view_height)
    }

    /// Size of the whole image at the current zoom
    pub fn scaled_size(&self) -> (u32, u32) {
        (
            (f64::from(self.image_width) * self.scale) as u32,
            (f64::from(self.image_height) * self.scale) as u32,
        )
    }

    /// Largest offset that keeps the viewport inside the scaled image
    pub fn max_offset(&self) -> Vector2<i32> {
        let (scaled_w, scaled_h) = self.scaled_size();
        Vector2::new(
            (i64::from(scaled_w) - i64::from(self.view_width)).max(0) as i32,
            (i64::from(scaled_h) - i64::from(self.view_height)).max(0) as i32,
        )
    }

    /// Re-establish `0 <= offset <= max_offset` on both axes
    pub fn clamp(&mut self) {
        let max = self.max_offset();
        self.offset.x = self.offset.x.clamp(0, max.x);
        self.offset.y = self.offset.y.clamp(0, max.y);
    }

    /// Viewport pixel -> original-image position
    pub fn to_original(&self, point: ViewportPoint) -> Point2<f64> {
        Point2::new(
            f64::from(point.x + self.offset.x) / self.scale,
            f64::from(point.y + self.offset.y) / self.scale,
        )
    }

    /// Original-image position -> viewport pixel
    pub fn to_viewport(&self, point: Point2<f64>) -> ViewportPoint {
        Point2::new(
            (point.x * self.scale) as i32 - self.offset.x,
            (point.y * self.scale) as i32 - self.offset.y,
        )
    }

    /// Length in original pixels -> length on screen
    pub fn to_viewport_length(&self, length: f64) -> i32 {
        (length * self.scale) as i32
    }

    pub fn is_visible(&self, point: ViewportPoint) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as u32) < self.view_width
            && (point.y as u32) < self.view_height
    }

    /// The part of the scaled image that is on screen, as (x, y, width, height)
    pub fn visible_region(&self) -> (u32, u32, u32, u32) {
        let (scaled_w, scaled_h) = self.scaled_size();
        let x = (self.offset.x.max(0) as u32).min(scaled_w);
        let y = (self.offset.y.max(0) as u32).min(scaled_h);
        (
            x,
            y,
            self.view_width.min(scaled_w - x),
            self.view_height.min(scaled_h - y),
        )
    }

    /// Shift the view by a delta in scaled pixels
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.offset.x = self.offset.x.saturating_add(dx);
        self.offset.y = self.offset.y.saturating_add(dy);
        self.clamp();
    }

    pub fn reset_pan(&mut self) {
        self.offset = Vector2::new(0, 0);
    }

    /// Change zoom by `notches * step`, keeping the viewport center fixed
    ///
    /// Returns false when the zoom floor prevented any change.
    pub fn zoom(&mut self, notches: i32, step: f64, min_scale: f64) -> bool {
        let old = self.scale;
        let new = round_scale((old + step * f64::from(notches)).max(min_scale));
        if new == old {
            return false;
        }

        let ratio = new / old;
        let half_w = f64::from(self.view_width / 2);
        let half_h = f64::from(self.view_height / 2);
        self.scale = new;
        self.offset = Vector2::new(
            ((f64::from(self.offset.x) + half_w) * ratio - half_w) as i32,
            ((f64::from(self.offset.y) + half_h) * ratio - half_h) as i32,
        );
        self.clamp();
        true
    }

    /// Adopt a new viewport size
    ///
    /// Returns false when the size did not change.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if (width, height) == (self.view_width, self.view_height) {
            return false;
        }
        self.view_width = width;
        self.view_height = height;
        self.clamp();
        true
    }
}

/// Drop the float noise that repeated 0.1 steps accumulate
fn round_scale(scale: f64) -> f64 {
    (scale * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_clamped(view: &ViewState) {
        let max = view.max_offset();
        let offset = view.offset();
        assert!(offset.x >= 0 && offset.x <= max.x, "x offset {} outside 0..={}", offset.x, max.x);
        assert!(offset.y >= 0 && offset.y <= max.y, "y offset {} outside 0..={}", offset.y, max.y);
    }

    #[test]
    fn test_round_trip_within_one_pixel() {
        let mut view = ViewState::new((3000, 2000), (800, 600));
        for notches in [0, 3, 7, -5, 12] {
            view.zoom(notches, 0.1, 0.1);
            view.pan(137, 59);
            for (x, y) in [(0, 0), (1, 1), (399, 299), (799, 599), (123, 456)] {
                let point = Point2::new(x, y);
                let back = view.to_viewport(view.to_original(point));
                assert!((back.x - x).abs() <= 1 && (back.y - y).abs() <= 1,
                    "scale {} offset {:?}: {:?} -> {:?}", view.scale(), view.offset(), point, back);
            }
        }
    }

    #[test]
    fn test_to_original_and_back_at_unit_scale() {
        let mut view = ViewState::new((1000, 1000), (200, 200));
        view.pan(50, 80);
        let original = view.to_original(Point2::new(10, 20));
        assert_eq!(original, Point2::new(60.0, 100.0));
        assert_eq!(view.to_viewport(original), Point2::new(10, 20));
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut view = ViewState::new((500, 400), (300, 300));
        view.pan(-20, -20);
        assert_eq!(view.offset(), Vector2::new(0, 0));

        view.pan(10_000, 10_000);
        assert_eq!(view.offset(), Vector2::new(200, 100));
        assert_clamped(&view);
    }

    #[test]
    fn test_image_smaller_than_viewport_never_pans() {
        let mut view = ViewState::new((100, 100), (800, 600));
        view.pan(20, 20);
        assert_eq!(view.offset(), Vector2::new(0, 0));
        assert_eq!(view.max_offset(), Vector2::new(0, 0));
    }

    #[test]
    fn test_zoom_keeps_center_point() {
        let mut view = ViewState::new((2000, 2000), (800, 600));
        let before = view.to_original(Point2::new(400, 300));

        assert!(view.zoom(1, 0.1, 0.1));
        assert!((view.scale() - 1.1).abs() < 1e-9);

        let after = view.to_original(Point2::new(400, 300));
        assert!((after.x - before.x).abs() <= 1.0);
        assert!((after.y - before.y).abs() <= 1.0);
        assert_eq!(view.offset(), Vector2::new(40, 30));
    }

    #[test]
    fn test_zoom_floor() {
        let mut view = ViewState::new((500, 500), (200, 200));
        for _ in 0..20 {
            view.zoom(-1, 0.1, 0.1);
            assert!(view.scale() >= 0.1);
            assert_clamped(&view);
        }
        assert!((view.scale() - 0.1).abs() < 1e-9);
        assert!(!view.zoom(-1, 0.1, 0.1));
    }

    #[test]
    fn test_every_zoom_and_pan_stays_clamped() {
        let mut view = ViewState::new((1200, 900), (640, 480));
        let steps = [(1, 40, -10), (3, -300, 500), (-2, 900, 900), (-6, 5, 5), (10, 2000, -2000)];
        for (notches, dx, dy) in steps {
            view.zoom(notches, 0.1, 0.1);
            assert_clamped(&view);
            view.pan(dx, dy);
            assert_clamped(&view);
        }
    }

    #[test]
    fn test_resize_reclamps() {
        let mut view = ViewState::new((1000, 1000), (400, 400));
        view.pan(600, 600);
        assert_eq!(view.offset(), Vector2::new(600, 600));

        assert!(view.resize(800, 800));
        assert_eq!(view.offset(), Vector2::new(200, 200));
        assert!(!view.resize(800, 800));
    }

    #[test]
    fn test_visibility_is_half_open() {
        let view = ViewState::new((1000, 1000), (100, 50));
        assert!(view.is_visible(Point2::new(0, 0)));
        assert!(view.is_visible(Point2::new(99, 49)));
        assert!(!view.is_visible(Point2::new(100, 10)));
        assert!(!view.is_visible(Point2::new(10, 50)));
        assert!(!view.is_visible(Point2::new(-1, 10)));
    }

    #[test]
    fn test_visible_region() {
        let mut view = ViewState::new((500, 300), (400, 400));
        assert_eq!(view.visible_region(), (0, 0, 400, 300));

        view.zoom(10, 0.1, 0.1);
        // 1000x600 scaled, centered zoom on a 400x400 viewport
        let (x, y, w, h) = view.visible_region();
        assert_eq!((w, h), (400, 400));
        assert!(x + w <= 1000 && y + h <= 600);
    }
}
