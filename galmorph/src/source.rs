//! Input data model: catalog records and co-registered image planes.
//!
//! Both types are owned by the caller and borrowed by the engine for the
//! duration of one source's analysis. The engine never mutates them.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::MorphError;

/// One catalog row produced by the external source detector.
///
/// Positions follow the image convention used throughout the crate:
/// `x` is the column coordinate, `y` the row coordinate, both in pixels
/// and possibly sub-pixel. The position angle is stored in radians,
/// counter-clockwise from the +x axis; detectors report degrees, so use
/// [`SourceRecord::from_catalog`] when ingesting raw rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Ratio of semi-major to semi-minor axis.
    pub elongation: f64,
    /// Image-plane centroid, column coordinate.
    pub x: f64,
    /// Image-plane centroid, row coordinate.
    pub y: f64,
    /// Kron radius in pixels.
    pub kron_radius: f64,
    /// Semi-major axis length in pixels.
    pub semi_major: f64,
    /// Semi-minor axis length in pixels.
    pub semi_minor: f64,
    /// Position angle in radians.
    pub theta: f64,
    /// Right ascension in degrees.
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
    /// Ellipticity, 1 - b/a.
    pub ellipticity: f64,
}

impl SourceRecord {
    /// Build a record from raw detector output, converting the position
    /// angle from degrees to radians and validating the axis invariants
    /// (`semi_major >= semi_minor > 0`, `elongation > 0`).
    #[allow(clippy::too_many_arguments)]
    pub fn from_catalog(
        elongation: f64,
        x: f64,
        y: f64,
        kron_radius: f64,
        semi_major: f64,
        semi_minor: f64,
        theta_deg: f64,
        ra: f64,
        dec: f64,
        ellipticity: f64,
    ) -> Result<Self, MorphError> {
        if !(semi_minor > 0.0) || semi_major < semi_minor {
            return Err(MorphError::InvalidRecord(format!(
                "semi-axes must satisfy a >= b > 0, got a={semi_major}, b={semi_minor}"
            )));
        }
        if !(elongation > 0.0) {
            return Err(MorphError::InvalidRecord(format!(
                "elongation must be positive, got {elongation}"
            )));
        }
        Ok(Self {
            elongation,
            x,
            y,
            kron_radius,
            semi_major,
            semi_minor,
            theta: theta_deg * PI / 180.0,
            ra,
            dec,
            ellipticity,
        })
    }
}

/// A cleaned science image with its co-registered segmentation map.
///
/// The segmentation map carries integer labels from the external detector;
/// zero marks background pixels not assigned to any source. Shapes must
/// match exactly.
#[derive(Debug, Clone, Copy)]
pub struct ImagePlane<'a> {
    image: ArrayView2<'a, f64>,
    segmap: ArrayView2<'a, i32>,
}

impl<'a> ImagePlane<'a> {
    /// Pair an image with its segmentation map, checking shapes.
    pub fn new(
        image: ArrayView2<'a, f64>,
        segmap: ArrayView2<'a, i32>,
    ) -> Result<Self, MorphError> {
        if image.is_empty() {
            return Err(MorphError::EmptyImage);
        }
        if image.dim() != segmap.dim() {
            return Err(MorphError::ShapeMismatch {
                image: image.dim(),
                segmap: segmap.dim(),
            });
        }
        Ok(Self { image, segmap })
    }

    /// The science image.
    pub fn image(&self) -> ArrayView2<'a, f64> {
        self.image
    }

    /// The segmentation map.
    pub fn segmap(&self) -> ArrayView2<'a, i32> {
        self.segmap
    }

    /// Image shape as (rows, cols).
    pub fn dim(&self) -> (usize, usize) {
        self.image.dim()
    }
}
