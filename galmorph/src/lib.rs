//! Quantitative morphology statistics for astronomical sources.
//!
//! Given a cleaned science image, a segmentation map and a catalog record
//! from an external detector, the engine measures a fixed set of
//! structural parameters for one source: sky background, Petrosian radius,
//! rotational asymmetry with its minimizing center, light concentration,
//! Gini coefficient and the M20 moment statistic.
//!
//! # Pipeline order
//!
//! Within one source the dependency order is strict: background and
//! Petrosian radius first, then the asymmetry center, then concentration
//! (which needs that center), Gini and M20 (which need only the radius).
//! A non-positive Petrosian radius short-circuits everything downstream.
//! Across sources there are no dependencies at all; [`batch`] fans the
//! pipeline out with rayon.
//!
//! # Failure model
//!
//! Numerical failure is data, not an error: a statistic that cannot be
//! computed is NaN with a companion [`result::Flag`], and a failed source
//! still produces a complete output row. `Err` is reserved for contract
//! violations by collaborators (mismatched shapes, missing upstream
//! artifacts).
//!
//! # Module organization
//!
//! - **aperture**: exact sub-pixel elliptical aperture photometry
//! - **background**: sigma-clipped sky statistics
//! - **interpolate**: cubic resampling and threshold-crossing location
//! - **petrosian**, **asymmetry**, **concentration**, **gini**, **m20**:
//!   the individual statistics
//! - **pipeline**: per-source orchestration
//! - **batch**, **table**, **detect**, **diagnostics**: collaborator
//!   contracts and the batch driver
//! - **synthetic**: controlled test inputs with known morphology

pub mod aperture;
pub mod asymmetry;
pub mod background;
pub mod batch;
pub mod concentration;
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod gini;
pub mod interpolate;
pub mod m20;
pub mod petrosian;
pub mod pipeline;
pub mod result;
pub mod shift;
pub mod source;
pub mod synthetic;
pub mod table;

pub use aperture::{
    radial_photometry, ApertureSum, EllipticalAnnulus, EllipticalAperture, RadialPhotometry,
};
pub use background::{estimate_background, BackgroundEstimate};
pub use batch::{analyze_frames, run_batch, BatchSummary, FrameSupplier, SourceFrame};
pub use config::MorphConfig;
pub use error::MorphError;
pub use pipeline::{analyze_source, SourceAnalysis};
pub use result::{Flag, MorphologyResult, MorphologyResultBuilder};
pub use source::{ImagePlane, SourceRecord};
