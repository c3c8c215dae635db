//! Contract with the external source detector.
//!
//! When a cutout arrives without a catalog or segmentation map, the batch
//! runner asks a detector to produce them using one of three named
//! parameter presets. The detector's internals (thresholding, deblending,
//! output format) are its own business; the engine only needs to know
//! which preset to request and whether the run succeeded.

use anyhow::Result;

/// Named parameter presets for the external detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionProfile {
    /// Tuned for the brightest objects: high detection threshold, low
    /// deblending contrast.
    Bright,
    /// Tuned for the faintest objects: low threshold, higher contrast.
    Faint,
    /// Faint-object parameters with Gaussian pre-smoothing.
    SmoothedFaint,
}

/// Detector parameters implied by a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Detection threshold in background-sigma units.
    pub detect_threshold: f64,
    /// Minimum deblending contrast.
    pub deblend_min_contrast: f64,
    /// FWHM of the pre-detection Gaussian smoothing, if any.
    pub filter_fwhm: Option<f64>,
}

impl DetectionProfile {
    /// Parameter preset for this profile.
    pub fn params(self) -> DetectionParams {
        match self {
            DetectionProfile::Bright => DetectionParams {
                detect_threshold: 2.2,
                deblend_min_contrast: 0.04,
                filter_fwhm: None,
            },
            DetectionProfile::Faint => DetectionParams {
                detect_threshold: 1.0,
                deblend_min_contrast: 0.065,
                filter_fwhm: None,
            },
            DetectionProfile::SmoothedFaint => DetectionParams {
                detect_threshold: 1.0,
                deblend_min_contrast: 0.065,
                filter_fwhm: Some(2.0),
            },
        }
    }

    /// Short label used in artifact file names.
    pub fn label(self) -> &'static str {
        match self {
            DetectionProfile::Bright => "bright",
            DetectionProfile::Faint => "faint",
            DetectionProfile::SmoothedFaint => "smooth",
        }
    }
}

/// External detection/segmentation tool invoked for images that arrive
/// without precomputed artifacts.
///
/// An `Err` means this image could not be processed (commonly a corrupt
/// cutout); the batch runner logs it, skips the image and continues.
pub trait SourceDetector {
    /// Produce catalog and segmentation artifacts for `image_name` with
    /// the given profile.
    fn detect(&mut self, image_name: &str, profile: DetectionProfile) -> Result<()>;
}
