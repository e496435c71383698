/// Detector adapter: original image in, original-space circles out
///
/// Detection runs on a copy of the image resized to the current zoom, so the
/// cost follows what the user is looking at. Radii limits are given in
/// original pixels and scaled on the way in; results are scaled back out.
/// The working copy is capped at `max_pixels`; past that, detection runs at
/// the largest scale that fits.

use image::imageops::FilterType;
use image::DynamicImage;
use imageproc::filter::gaussian_blur_f32;
use std::time::Instant;

use super::{CircleFinder, FinderParams};
use crate::state::data::Circle;

/// Default cap on the working image, pixels
pub const DEFAULT_MAX_PIXELS: u64 = 16_000_000;

pub struct DetectorAdapter {
    finder: Box<dyn CircleFinder>,
    /// Smallest radius worth reporting, original pixels
    min_radius: u32,
    blur_sigma: f32,
    max_pixels: u64,
}

impl DetectorAdapter {
    pub fn new(finder: Box<dyn CircleFinder>, min_radius: u32, blur_sigma: f32) -> Self {
        Self {
            finder,
            min_radius,
            blur_sigma,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels.max(1);
        self
    }

    /// `requested`, or the largest scale whose working image fits the cap
    fn working_scale(&self, image: &DynamicImage, requested: f64) -> f64 {
        let original = f64::from(image.width()) * f64::from(image.height());
        if original <= 0.0 {
            return requested;
        }
        let ceiling = (self.max_pixels as f64 / original).sqrt();
        if requested > ceiling {
            log::warn!(
                "Detection at scale {:.2} would exceed {} pixels; running at scale {:.2}",
                requested,
                self.max_pixels,
                ceiling
            );
            ceiling
        } else {
            requested
        }
    }

    /// Detect circles on `image` viewed at `scale`
    ///
    /// `max_radius == 0` leaves the radius unbounded. A sensitivity of 0 is
    /// treated as 1.
    pub fn detect(&self, image: &DynamicImage, scale: f64, sensitivity: u8, max_radius: u8) -> Vec<Circle> {
        let started = Instant::now();
        let scale = self.working_scale(image, scale);

        let width = ((f64::from(image.width()) * scale) as u32).max(1);
        let height = ((f64::from(image.height()) * scale) as u32).max(1);
        let gray = if (width, height) == (image.width(), image.height()) {
            image.to_luma8()
        } else {
            image.resize_exact(width, height, FilterType::Triangle).to_luma8()
        };
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);

        let params = FinderParams {
            sensitivity: u32::from(sensitivity.max(1)),
            min_radius: scale_length(f64::from(self.min_radius), scale),
            max_radius: if max_radius == 0 {
                0
            } else {
                scale_length(f64::from(max_radius), scale).max(1)
            },
        };

        let circles: Vec<Circle> = self
            .finder
            .find(&blurred, &params)
            .into_iter()
            .map(|c| Circle::new(c.x / scale, c.y / scale, c.r / scale))
            .collect();

        log::debug!(
            "Detected {} circles at scale {:.2} ({}x{}, sensitivity {}, max radius {}) in {:?}",
            circles.len(),
            scale,
            width,
            height,
            params.sensitivity,
            params.max_radius,
            started.elapsed()
        );

        circles
    }
}

fn scale_length(length: f64, scale: f64) -> u32 {
    (length * scale).round() as u32
}
