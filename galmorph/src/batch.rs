//! Batch processing across a catalog of sources.
//!
//! Sources are embarrassingly parallel: each one owns its image,
//! segmentation map and catalog record, and the pipeline writes no shared
//! state, so the batch fans out with rayon and collects rows back in input
//! order. A frame the supplier cannot produce is logged and skipped; a
//! frame that violates the image contract still yields a sentinel row, so
//! one bad cutout never aborts the rest of the batch.

use anyhow::Result;
use log::warn;
use ndarray::Array2;
use rayon::prelude::*;
use std::io::Write;

use crate::asymmetry::AsymmetryDiagnostics;
use crate::config::MorphConfig;
use crate::diagnostics::{DiagnosticsSink, TAG_BACKGROUND_PATCH, TAG_ROTATION_RESIDUAL};
use crate::pipeline::{analyze_source, SourceAnalysis};
use crate::result::MorphologyResultBuilder;
use crate::source::{ImagePlane, SourceRecord};
use crate::table::FixedWidthTableWriter;

/// One unit of work: a named cutout with its detector artifacts.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Source name, used for table rows and diagnostic tags.
    pub name: String,
    /// Cleaned science image.
    pub image: Array2<f64>,
    /// Co-registered segmentation map.
    pub segmap: Array2<i32>,
    /// Catalog record for the source.
    pub record: SourceRecord,
}

/// Upstream provider of frames (cutout preparation, detector invocation).
///
/// A `Some(Err(_))` item marks a frame that could not be produced; the
/// batch runner logs it, counts it as skipped and moves on.
pub trait FrameSupplier {
    /// Next frame, or `None` when the batch is exhausted.
    fn next_frame(&mut self) -> Option<Result<SourceFrame>>;
}

/// Counters describing a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Sources analyzed (including ones that produced sentinel rows).
    pub processed: usize,
    /// Frames the supplier failed to produce.
    pub skipped: usize,
}

/// Analyze a slice of frames in parallel, preserving input order.
///
/// A frame whose image and segmentation shapes disagree gets a sentinel
/// row rather than poisoning the batch.
pub fn analyze_frames(frames: &[SourceFrame], config: &MorphConfig) -> Vec<SourceAnalysis> {
    frames
        .par_iter()
        .map(|frame| match ImagePlane::new(frame.image.view(), frame.segmap.view()) {
            Ok(plane) => analyze_source(&plane, &frame.record, config),
            Err(err) => {
                warn!("frame {} violates the image contract: {err}", frame.name);
                SourceAnalysis {
                    result: MorphologyResultBuilder::new(&frame.record).build(),
                    diagnostics: AsymmetryDiagnostics::default(),
                }
            }
        })
        .collect()
}

/// Drain a supplier, analyze every frame and hand results to the sinks.
///
/// Rows are written in supplier order. Diagnostic images are forwarded
/// when the pipeline retained them (`config.emit_diagnostics`).
pub fn run_batch<S, W>(
    supplier: &mut S,
    config: &MorphConfig,
    table: &mut FixedWidthTableWriter<W>,
    diagnostics: &mut dyn DiagnosticsSink,
) -> Result<BatchSummary>
where
    S: FrameSupplier,
    W: Write,
{
    let mut frames = Vec::new();
    let mut summary = BatchSummary::default();
    while let Some(item) = supplier.next_frame() {
        match item {
            Ok(frame) => frames.push(frame),
            Err(err) => {
                warn!("skipping unavailable frame: {err}");
                summary.skipped += 1;
            }
        }
    }

    let analyses = analyze_frames(&frames, config);
    for (frame, analysis) in frames.iter().zip(&analyses) {
        table.write_row(&frame.name, &frame.record, &analysis.result)?;
        if let Some(patch) = &analysis.diagnostics.background_patch {
            diagnostics.save_image(&frame.name, TAG_BACKGROUND_PATCH, patch)?;
        }
        if let Some(residual) = &analysis.diagnostics.rotation_residual {
            diagnostics.save_image(&frame.name, TAG_ROTATION_RESIDUAL, residual)?;
        }
        summary.processed += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemoryDiagnosticsSink;
    use crate::result::Flag;

    struct VecSupplier {
        items: Vec<Result<SourceFrame>>,
    }

    impl FrameSupplier for VecSupplier {
        fn next_frame(&mut self) -> Option<Result<SourceFrame>> {
            if self.items.is_empty() {
                None
            } else {
                Some(self.items.remove(0))
            }
        }
    }

    fn gaussian_frame(name: &str, size: usize, sigma: f64) -> SourceFrame {
        let c = (size as f64 - 1.0) / 2.0;
        let image = Array2::from_shape_fn((size, size), |(r, col)| {
            let dr = r as f64 - c;
            let dc = col as f64 - c;
            (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp()
        });
        let segmap = Array2::from_shape_fn((size, size), |(r, col)| {
            let dr = r as f64 - c;
            let dc = col as f64 - c;
            if dr * dr + dc * dc < (3.0 * sigma) * (3.0 * sigma) {
                1
            } else {
                0
            }
        });
        let record =
            SourceRecord::from_catalog(1.0, c, c, 3.5, 2.0 * sigma, 2.0 * sigma, 0.0, 0.0, 0.0, 0.0)
                .unwrap();
        SourceFrame {
            name: name.to_string(),
            image,
            segmap,
            record,
        }
    }

    #[test]
    fn test_batch_writes_row_per_source_and_skips_failures() {
        let mut supplier = VecSupplier {
            items: vec![
                Ok(gaussian_frame("src_a", 129, 5.0)),
                Err(anyhow::anyhow!("no cutout for src_b")),
                Ok(gaussian_frame("src_c", 129, 4.0)),
            ],
        };
        let mut table = FixedWidthTableWriter::new(Vec::new());
        let mut sink = MemoryDiagnosticsSink::default();
        let summary = run_batch(
            &mut supplier,
            &MorphConfig::default(),
            &mut table,
            &mut sink,
        )
        .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 1);

        let text = String::from_utf8(table.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("src_a"));
        assert!(lines[2].starts_with("src_c"));
    }

    #[test]
    fn test_contract_violation_yields_sentinel_row() {
        let mut frame = gaussian_frame("bad_shape", 65, 4.0);
        frame.segmap = Array2::zeros((65, 66));
        let analyses = analyze_frames(&[frame], &MorphConfig::default());
        assert_eq!(analyses.len(), 1);
        let result = &analyses[0].result;
        assert!(result.asymmetry.is_nan());
        assert_eq!(result.petrosian_flag, Flag::DegenerateGeometry);
    }

    #[test]
    fn test_diagnostics_forwarded_when_enabled() {
        let mut supplier = VecSupplier {
            items: vec![Ok(gaussian_frame("src_a", 129, 5.0))],
        };
        let config = MorphConfig {
            emit_diagnostics: true,
            ..MorphConfig::default()
        };
        let mut table = FixedWidthTableWriter::new(Vec::new());
        let mut sink = MemoryDiagnosticsSink::default();
        run_batch(&mut supplier, &config, &mut table, &mut sink).unwrap();

        let tags: Vec<&str> = sink.images.iter().map(|(_, tag, _)| tag.as_str()).collect();
        assert!(tags.contains(&TAG_BACKGROUND_PATCH));
        assert!(tags.contains(&TAG_ROTATION_RESIDUAL));
        assert!(sink.images.iter().all(|(name, _, _)| name == "src_a"));
    }

    #[test]
    fn test_parallel_analysis_preserves_order() {
        let frames: Vec<SourceFrame> = (0..6)
            .map(|i| gaussian_frame(&format!("src_{i}"), 65, 3.0 + 0.2 * i as f64))
            .collect();
        let analyses = analyze_frames(&frames, &MorphConfig::default());
        assert_eq!(analyses.len(), frames.len());
        // Each result corresponds positionally to its frame: radii grow
        // with the injected source size.
        let radii: Vec<f64> = analyses.iter().map(|a| a.result.petrosian_radius).collect();
        assert!(radii.windows(2).all(|w| w[1] > w[0]), "radii {radii:?}");
    }
}
