/// Reconciliation of the three circle sources
///
/// auto-detected - removal marks + manual circles = the circles of one frame.
/// The frame then gets projected into the viewport, where the visible subset
/// feeds the count and the area-variation statistic.

use crate::state::annotations::AnnotationStore;
use crate::state::data::{Circle, RemovedMark, Source};
use crate::state::view::{ViewState, ViewportPoint};

/// One circle of the combined set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub circle: Circle,
    pub source: Source,
}

/// A combined circle mapped into viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleCircle {
    pub center: ViewportPoint,
    pub radius: i32,
    pub source: Source,
}

/// Counts for the status line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// Circles in the whole image
    pub total: usize,
    /// Circles whose center is on screen; this is "the count"
    pub visible: usize,
    /// Coefficient of variation of visible areas, percent.
    /// None with fewer than two visible circles.
    pub area_variation: Option<f64>,
}

/// Everything the renderer needs for one redraw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub combined: Vec<Reconciled>,
    pub circles: Vec<VisibleCircle>,
    pub summary: Summary,
    /// Circle drawing suppressed for this frame
    pub hidden: bool,
}

/// Auto circles not covered by any removal mark
pub fn suppress(auto_circles: &[Circle], removed: &[RemovedMark]) -> Vec<Circle> {
    auto_circles
        .iter()
        .filter(|c| !removed.iter().any(|mark| mark.suppresses(c)))
        .copied()
        .collect()
}

/// Combine detector output with the store: surviving auto circles first,
/// then every manual circle in store order
pub fn reconcile(auto_circles: &[Circle], store: &AnnotationStore) -> Vec<Reconciled> {
    let auto = suppress(auto_circles, store.removed())
        .into_iter()
        .map(|circle| Reconciled { circle, source: Source::Auto });

    let manual = store.manual().iter().map(|m| Reconciled {
        circle: m.circle,
        source: Source::Manual(m.id),
    });

    auto.chain(manual).collect()
}

/// Population coefficient of variation of circle areas, in percent
pub fn area_variation<'a>(circles: impl IntoIterator<Item = &'a Circle>) -> Option<f64> {
    // pi cancels out of stdev / mean, so r^2 stands in for the area
    let areas: Vec<f64> = circles.into_iter().map(|c| c.r * c.r).collect();
    if areas.len() < 2 {
        return None;
    }

    let n = areas.len() as f64;
    let mean = areas.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = areas.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt() / mean * 100.0)
}

/// Project the combined set into the viewport and summarise what is visible
pub fn build_frame(combined: Vec<Reconciled>, view: &ViewState, hidden: bool) -> Frame {
    let mut visible_circles = Vec::new();
    let mut circles = Vec::new();

    for item in &combined {
        let center = view.to_viewport(item.circle.center());
        if !view.is_visible(center) {
            continue;
        }
        visible_circles.push(item.circle);
        circles.push(VisibleCircle {
            center,
            radius: view.to_viewport_length(item.circle.r),
            source: item.source,
        });
    }

    let summary = Summary {
        total: combined.len(),
        visible: visible_circles.len(),
        area_variation: area_variation(&visible_circles),
    };

    Frame {
        combined,
        circles,
        summary,
        hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    fn radii(circles: &[f64]) -> Vec<Circle> {
        circles
            .iter()
            .enumerate()
            .map(|(i, &r)| Circle::new(i as f64 * 50.0, 0.0, r))
            .collect()
    }

    #[test]
    fn test_equal_radii_have_zero_variation() {
        assert_eq!(area_variation(&radii(&[10.0, 10.0, 10.0])), Some(0.0));
    }

    #[test]
    fn test_variation_not_applicable_below_two() {
        assert_eq!(area_variation(&radii(&[10.0])), None);
        assert_eq!(area_variation(&radii(&[])), None);
    }

    #[test]
    fn test_variation_value() {
        // Areas are pi*100 and pi*400: mean 250pi, stdev 150pi -> 60%
        let cv = area_variation(&radii(&[10.0, 20.0])).unwrap();
        assert!((cv - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_removed_auto_stays_suppressed_across_detections() {
        let mut store = AnnotationStore::new();
        let first_pass = [Circle::new(100.0, 100.0, 15.0), Circle::new(200.0, 200.0, 20.0)];
        store.remove_at(Point2::new(100.0, 100.0), &suppress(&first_pass, store.removed()));

        // Every later pass reports the same object slightly differently
        let passes = [
            [Circle::new(100.0, 100.0, 15.0), Circle::new(200.0, 200.0, 20.0)],
            [Circle::new(104.0, 97.0, 16.0), Circle::new(201.0, 199.0, 21.0)],
            [Circle::new(92.0, 108.0, 12.0), Circle::new(200.0, 200.0, 20.0)],
        ];
        for pass in passes {
            let combined = reconcile(&pass, &store);
            assert_eq!(combined.len(), 1);
            assert_eq!(combined[0].circle, pass[1]);
        }
    }

    #[test]
    fn test_manual_circles_ignore_removal_marks() {
        let mut store = AnnotationStore::new();
        let auto = [Circle::new(100.0, 100.0, 30.0)];
        store.remove_at(Point2::new(100.0, 100.0), &auto);
        let id = store.add_manual(Point2::new(100.0, 100.0), 20.0);

        let combined = reconcile(&auto, &store);
        assert_eq!(combined, vec![Reconciled {
            circle: Circle::new(100.0, 100.0, 20.0),
            source: Source::Manual(id),
        }]);
    }

    #[test]
    fn test_manual_follow_auto_in_order() {
        let mut store = AnnotationStore::new();
        let a = store.add_manual(Point2::new(1.0, 1.0), 5.0);
        let b = store.add_manual(Point2::new(2.0, 2.0), 5.0);
        let auto = [Circle::new(300.0, 300.0, 10.0)];

        let sources: Vec<Source> = reconcile(&auto, &store).iter().map(|r| r.source).collect();
        assert_eq!(sources, vec![Source::Auto, Source::Manual(a), Source::Manual(b)]);
    }

    #[test]
    fn test_frame_counts_only_visible() {
        let store = AnnotationStore::new();
        let auto = [
            Circle::new(50.0, 50.0, 10.0),
            Circle::new(150.0, 50.0, 10.0),
            Circle::new(450.0, 450.0, 30.0),
        ];
        let view = ViewState::new((500, 500), (200, 200));

        let frame = build_frame(reconcile(&auto, &store), &view, false);
        assert_eq!(frame.summary.total, 3);
        assert_eq!(frame.summary.visible, 2);
        assert_eq!(frame.summary.area_variation, Some(0.0));
        assert_eq!(frame.circles[1].center, Point2::new(150, 50));
        assert_eq!(frame.circles[1].radius, 10);
    }

    #[test]
    fn test_frame_projection_follows_zoom_and_pan() {
        let store = AnnotationStore::new();
        let auto = [Circle::new(50.0, 50.0, 15.0), Circle::new(100.0, 100.0, 15.0)];
        let mut view = ViewState::new((500, 500), (200, 200));
        view.zoom(10, 0.1, 0.1);
        view.pan(-1000, -1000);

        // Scale 2: the second circle lands exactly on the viewport edge
        let frame = build_frame(reconcile(&auto, &store), &view, false);
        assert_eq!(frame.circles.len(), 1);
        assert_eq!(frame.circles[0].center, Point2::new(100, 100));
        assert_eq!(frame.circles[0].radius, 30);
        assert_eq!(frame.summary.total, 2);
        assert_eq!(frame.summary.visible, 1);
        assert_eq!(frame.summary.area_variation, None);
    }
}
