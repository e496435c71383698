/// Circle detection
///
/// This module handles:
/// - The circle-finder seam (`CircleFinder`), working in scaled pixels
/// - A Hough gradient finder built on imageproc (hough.rs)
/// - The adapter that runs a finder on the original image at the current
///   zoom and maps results back to original coordinates (adapter.rs)

pub mod adapter;
pub mod hough;

use image::GrayImage;

use crate::state::data::Circle;

pub use adapter::DetectorAdapter;
pub use hough::HoughFinder;

/// Parameters handed to a finder, all in the pixels of the image it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinderParams {
    /// Accumulator threshold; higher = fewer, stronger circles
    pub sensitivity: u32,
    pub min_radius: u32,
    /// 0 = no upper bound
    pub max_radius: u32,
}

/// Anything that can find circles in a prepared (grayscale, blurred) image
pub trait CircleFinder: Send {
    fn find(&self, image: &GrayImage, params: &FinderParams) -> Vec<Circle>;
}
