/// Hough gradient circle finder
///
/// Every Canny edge pixel votes for possible centers along its gradient
/// direction (both ways, for each radius in range). Accumulator peaks above
/// the sensitivity threshold become centers, strongest first, skipping any
/// center closer than `min_dist` to an accepted one. The radius of each
/// center is the best-supported distance to the edge pixels around it.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_scharr, vertical_scharr};

use super::{CircleFinder, FinderParams};
use crate::state::data::Circle;
use crate::state::settings::DetectionSettings;

/// Gradients weaker than this carry no usable direction
const MIN_GRADIENT: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct HoughFinder {
    /// Inverse accumulator resolution
    dp: f64,
    /// Minimum distance between centers, pixels
    min_dist: f64,
    /// Upper Canny threshold
    canny_high: f32,
}

impl HoughFinder {
    pub fn new(dp: f64, min_dist: f64, canny_high: f32) -> Self {
        Self {
            dp: dp.max(1.0),
            min_dist,
            canny_high,
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(settings.dp, settings.min_dist, settings.canny_high)
    }
}

/// Accumulator peak
struct Candidate {
    votes: u32,
    x: f64,
    y: f64,
}

impl CircleFinder for HoughFinder {
    fn find(&self, image: &GrayImage, params: &FinderParams) -> Vec<Circle> {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return Vec::new();
        }

        let min_r = params.min_radius.max(1);
        let max_r = if params.max_radius == 0 {
            width.max(height)
        } else {
            params.max_radius
        };
        if max_r < min_r {
            return Vec::new();
        }
        let threshold = params.sensitivity.max(1);

        let edges = canny(image, self.canny_high / 2.0, self.canny_high);
        let gx = horizontal_scharr(image);
        let gy = vertical_scharr(image);

        let acc_w = (f64::from(width) / self.dp).ceil() as usize + 1;
        let acc_h = (f64::from(height) / self.dp).ceil() as usize + 1;
        let mut accumulator = vec![0u32; acc_w * acc_h];
        let mut edge_points = Vec::new();

        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel[0] == 0 {
                continue;
            }
            let dx = f64::from(gx.get_pixel(x, y)[0]);
            let dy = f64::from(gy.get_pixel(x, y)[0]);
            let magnitude = dx.hypot(dy);
            if magnitude < MIN_GRADIENT {
                continue;
            }

            let (px, py) = (f64::from(x), f64::from(y));
            edge_points.push((px, py));
            let (ux, uy) = (dx / magnitude, dy / magnitude);

            for sign in [1.0, -1.0] {
                for r in min_r..=max_r {
                    let cx = px + sign * ux * f64::from(r);
                    let cy = py + sign * uy * f64::from(r);
                    // The ray only moves further out from here
                    if cx < 0.0 || cy < 0.0 || cx >= f64::from(width) || cy >= f64::from(height) {
                        break;
                    }
                    let ax = (cx / self.dp) as usize;
                    let ay = (cy / self.dp) as usize;
                    accumulator[ay * acc_w + ax] += 1;
                }
            }
        }

        if edge_points.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for ay in 1..acc_h - 1 {
            for ax in 1..acc_w - 1 {
                let index = ay * acc_w + ax;
                let votes = accumulator[index];
                if votes < threshold {
                    continue;
                }
                let is_peak = votes > accumulator[index - 1]
                    && votes >= accumulator[index + 1]
                    && votes > accumulator[index - acc_w]
                    && votes >= accumulator[index + acc_w];
                if is_peak {
                    candidates.push(Candidate {
                        votes,
                        x: (ax as f64 + 0.5) * self.dp,
                        y: (ay as f64 + 0.5) * self.dp,
                    });
                }
            }
        }
        // Strongest first; stable sort keeps scan order among ties
        candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

        let mut circles: Vec<Circle> = Vec::new();
        for candidate in candidates {
            let too_close = circles.iter().any(|c| {
                (c.x - candidate.x).hypot(c.y - candidate.y) < self.min_dist
            });
            if too_close {
                continue;
            }
            if let Some(r) = estimate_radius(candidate.x, candidate.y, &edge_points, min_r, max_r) {
                circles.push(Circle::new(candidate.x, candidate.y, r));
            }
        }

        circles
    }
}

/// Distance to the edge pixels with the best support per unit of radius
fn estimate_radius(cx: f64, cy: f64, edge_points: &[(f64, f64)], min_r: u32, max_r: u32) -> Option<f64> {
    let bins = (max_r - min_r + 1) as usize;
    let mut histogram = vec![0u32; bins];

    for &(x, y) in edge_points {
        let distance = (x - cx).hypot(y - cy).round();
        if distance < f64::from(min_r) || distance > f64::from(max_r) {
            continue;
        }
        histogram[distance as usize - min_r as usize] += 1;
    }

    let radius_of = |i: usize| f64::from(min_r) + i as f64;
    let mut best: Option<(f64, f64)> = None;
    for i in 0..bins {
        // Edge pixels scatter by about a pixel, so pool neighbouring bins
        let window = i.saturating_sub(1)..(i + 2).min(bins);
        let support: u32 = histogram[window.clone()].iter().sum();
        if support == 0 {
            continue;
        }
        let score = f64::from(support) / radius_of(i);
        if best.map_or(true, |(_, s)| score > s) {
            let weighted: f64 = window.map(|j| f64::from(histogram[j]) * radius_of(j)).sum();
            best = Some((weighted / f64::from(support), score));
        }
    }

    best.map(|(radius, _)| radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;
    use imageproc::filter::gaussian_blur_f32;

    fn finder() -> HoughFinder {
        HoughFinder::from_settings(&DetectionSettings::default())
    }

    fn params(sensitivity: u32, min_radius: u32, max_radius: u32) -> FinderParams {
        FinderParams {
            sensitivity,
            min_radius,
            max_radius,
        }
    }

    #[test]
    fn test_finds_a_single_disc() {
        let mut image = GrayImage::new(200, 200);
        draw_filled_circle_mut(&mut image, (100, 100), 30, Luma([255u8]));
        let blurred = gaussian_blur_f32(&image, 2.0);

        let circles = finder().find(&blurred, &params(20, 10, 80));

        assert!(!circles.is_empty());
        let best = circles[0];
        assert!((best.x - 100.0).abs() <= 3.0, "x = {}", best.x);
        assert!((best.y - 100.0).abs() <= 3.0, "y = {}", best.y);
        assert!((best.r - 30.0).abs() <= 3.0, "r = {}", best.r);
    }

    #[test]
    fn test_blank_image_has_no_circles() {
        let image = GrayImage::new(120, 120);
        assert!(finder().find(&image, &params(1, 10, 80)).is_empty());
    }

    #[test]
    fn test_empty_radius_range() {
        let mut image = GrayImage::new(200, 200);
        draw_filled_circle_mut(&mut image, (100, 100), 30, Luma([255u8]));

        assert!(finder().find(&image, &params(20, 50, 40)).is_empty());
    }

    #[test]
    fn test_radius_estimate_prefers_dense_ring() {
        // 60 points on a ring of radius 20 around the origin, plus scattered noise
        let mut points: Vec<(f64, f64)> = (0..60)
            .map(|i| {
                let angle = f64::from(i) * std::f64::consts::TAU / 60.0;
                (20.0 * angle.cos(), 20.0 * angle.sin())
            })
            .collect();
        points.extend([(45.0, 0.0), (0.0, 47.0), (-50.0, 3.0)]);

        assert_eq!(estimate_radius(0.0, 0.0, &points, 10, 60), Some(20.0));
        assert_eq!(estimate_radius(0.0, 0.0, &[], 10, 60), None);
    }
}
