/// Session settings
///
/// Initial slider values, gesture constants and detector tuning. Settings are
/// read once at startup (optionally from a JSON file) and never written back.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::CounterError;

/// Range of the "Stringency" slider
pub const SENSITIVITY_RANGE: RangeInclusive<u8> = 0..=100;

/// Range of the "Max Radius" slider
pub const MAX_RADIUS_RANGE: RangeInclusive<u8> = 0..=200;

/// All tunable values for one counting session
///
/// Missing fields in a settings file fall back to the defaults below.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Initial detector threshold (0 to 100)
    /// - Higher values report fewer, stronger circles
    pub sensitivity: u8,

    /// Initial upper bound on detected radius, original pixels (0 to 200)
    /// - 0 = no upper bound
    pub max_radius: u8,

    /// Radius of a freshly placed manual circle, original pixels
    pub default_radius: f64,

    /// Smallest radius a drag can shrink a manual circle to
    pub min_manual_radius: f64,

    /// Zoom change per scroll notch
    pub zoom_step: f64,

    /// Zoom floor (there is no ceiling)
    pub min_scale: f64,

    /// Keyboard pan step, scaled pixels
    pub pan_step: i32,

    /// Hough transform tuning
    pub detection: DetectionSettings,
}

/// Tuning for the built-in Hough circle finder
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Inverse accumulator resolution (1.0 = one cell per pixel)
    pub dp: f64,

    /// Minimum distance between two detected centers, scaled pixels
    pub min_dist: f64,

    /// Upper Canny threshold; the lower one is half of it
    pub canny_high: f32,

    /// Smallest detectable radius, original pixels
    pub min_radius: u32,

    /// Gaussian blur applied before detection
    pub blur_sigma: f32,

    /// Largest image (in pixels) detection will run on; deeper zoom is capped
    pub max_working_pixels: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: 40,
            max_radius: 80,
            default_radius: 20.0,
            min_manual_radius: 5.0,
            zoom_step: 0.1,
            min_scale: 0.1,
            pan_step: 20,
            detection: DetectionSettings::default(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            dp: 1.2,
            min_dist: 30.0,
            canny_high: 100.0,
            min_radius: 10,
            blur_sigma: 2.0,
            max_working_pixels: 16_000_000,
        }
    }
}

impl Settings {
    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, CounterError> {
        let json = std::fs::read_to_string(path).map_err(|source| CounterError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::from_json(&json).map_err(|source| CounterError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Loaded settings from {}", path.display());
        Ok(settings.clamped())
    }

    /// Apply command-line overrides for the initial slider positions
    pub fn with_overrides(mut self, sensitivity: Option<u8>, max_radius: Option<u8>) -> Self {
        if let Some(value) = sensitivity {
            self.sensitivity = value;
        }
        if let Some(value) = max_radius {
            self.max_radius = value;
        }
        self.clamped()
    }

    /// Force every value into a usable range
    pub fn clamped(mut self) -> Self {
        self.sensitivity = self.sensitivity.min(*SENSITIVITY_RANGE.end());
        self.max_radius = self.max_radius.min(*MAX_RADIUS_RANGE.end());
        self.min_manual_radius = self.min_manual_radius.max(1.0);
        self.default_radius = self.default_radius.max(self.min_manual_radius);
        self.min_scale = self.min_scale.max(0.01);
        self.zoom_step = self.zoom_step.abs().max(0.01);
        self.pan_step = self.pan_step.max(1);
        self.detection.dp = self.detection.dp.max(1.0);
        self.detection.min_dist = self.detection.min_dist.max(1.0);
        self.detection.blur_sigma = self.detection.blur_sigma.max(0.1);
        self.detection.max_working_pixels = self.detection.max_working_pixels.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_classic_tool() {
        let settings = Settings::default();
        assert_eq!(settings.sensitivity, 40);
        assert_eq!(settings.max_radius, 80);
        assert_eq!(settings.default_radius, 20.0);
        assert_eq!(settings.min_manual_radius, 5.0);
        assert_eq!(settings.pan_step, 20);
        assert_eq!(settings.detection.min_radius, 10);
        assert_eq!(settings.detection.max_working_pixels, 16_000_000);
    }

    #[test]
    fn test_serialization() {
        let mut settings = Settings::default();
        settings.sensitivity = 55;
        settings.detection.min_dist = 12.5;

        let json = settings.to_json().unwrap();
        let restored = Settings::from_json(&json).unwrap();

        assert_eq!(settings, restored);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "max_radius": 120, "detection": { "dp": 2.0 } }"#).unwrap();

        assert_eq!(settings.max_radius, 120);
        assert_eq!(settings.sensitivity, 40);
        assert_eq!(settings.detection.dp, 2.0);
        assert_eq!(settings.detection.min_dist, 30.0);
    }

    #[test]
    fn test_overrides_are_clamped_to_slider_ranges() {
        let settings = Settings::default().with_overrides(Some(250), Some(255));
        assert_eq!(settings.sensitivity, 100);
        assert_eq!(settings.max_radius, 200);

        let untouched = Settings::default().with_overrides(None, None);
        assert_eq!(untouched, Settings::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load(Path::new("/nonexistent/circle-counter.json"));
        assert!(matches!(result, Err(CounterError::ConfigRead { .. })));
    }
}
