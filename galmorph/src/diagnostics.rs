//! Diagnostics sink contract for intermediate images.
//!
//! The engine can retain the synthesized background patch and the final
//! rotation residual for each source; persistence (FITS, PNG, a debug
//! viewer) is the collaborator's responsibility. Tags identify the image
//! kind, the source name identifies the origin.

use anyhow::Result;
use ndarray::Array2;

/// Tag for the synthesized background patch image.
pub const TAG_BACKGROUND_PATCH: &str = "bkg";
/// Tag for the rotation residual image at the converged asymmetry center.
pub const TAG_ROTATION_RESIDUAL: &str = "res";

/// Receiver for per-source diagnostic images.
pub trait DiagnosticsSink {
    /// Persist one diagnostic image for `source` under `tag`.
    fn save_image(&mut self, source: &str, tag: &str, image: &Array2<f64>) -> Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NullDiagnosticsSink;

impl DiagnosticsSink for NullDiagnosticsSink {
    fn save_image(&mut self, _source: &str, _tag: &str, _image: &Array2<f64>) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every image in memory, for tests and interactive use.
#[derive(Debug, Default)]
pub struct MemoryDiagnosticsSink {
    /// Collected `(source, tag, image)` triples in arrival order.
    pub images: Vec<(String, String, Array2<f64>)>,
}

impl DiagnosticsSink for MemoryDiagnosticsSink {
    fn save_image(&mut self, source: &str, tag: &str, image: &Array2<f64>) -> Result<()> {
        self.images
            .push((source.to_string(), tag.to_string(), image.clone()));
        Ok(())
    }
}
