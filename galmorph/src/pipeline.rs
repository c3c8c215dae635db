//! Per-source orchestration of the morphology statistics.
//!
//! The dependency order within one source is fixed: background and
//! Petrosian radius first, then the asymmetry center, then concentration,
//! Gini and M20, which consume the radius and/or the refined center. A
//! non-positive Petrosian radius short-circuits everything downstream to
//! undefined. Sources are independent of each other; see
//! [`batch`](crate::batch) for fanning the pipeline out across a catalog.

use log::{debug, warn};

use crate::asymmetry::{measure_asymmetry, AsymmetryDiagnostics, AsymmetryMeasure};
use crate::background::estimate_background;
use crate::concentration::concentration;
use crate::config::MorphConfig;
use crate::gini::gini;
use crate::m20::m20;
use crate::petrosian::petrosian_radius;
use crate::result::{Flag, MorphologyResult, MorphologyResultBuilder};
use crate::source::{ImagePlane, SourceRecord};

/// Everything produced for one source: the statistics row plus any
/// diagnostic images retained for the sink.
#[derive(Debug, Clone)]
pub struct SourceAnalysis {
    /// The assembled statistics.
    pub result: MorphologyResult,
    /// Diagnostic images, populated when `config.emit_diagnostics` is set.
    pub diagnostics: AsymmetryDiagnostics,
}

/// Run the full morphology pipeline on one source.
///
/// Never fails: numerical and geometric problems surface as NaN statistics
/// with flags in the result, so a batch caller always gets a complete row.
pub fn analyze_source(
    frame: &ImagePlane<'_>,
    record: &SourceRecord,
    config: &MorphConfig,
) -> SourceAnalysis {
    let image = frame.image();
    let mut builder = MorphologyResultBuilder::new(record);

    let background = match estimate_background(
        &image,
        &frame.segmap(),
        config.clip_sigma,
        config.clip_max_iters,
    ) {
        Ok(est) => {
            builder = builder.background(est.median, est.rms);
            Some(est)
        }
        Err(err) => {
            warn!("background estimation failed: {err}");
            None
        }
    };

    let petro = petrosian_radius(&image, record, config);
    builder = builder.petrosian(petro.radius, petro.flag);

    if !petro.is_valid() {
        debug!(
            "petrosian radius invalid (r={}, flag={:?}); skipping dependent statistics",
            petro.radius, petro.flag
        );
        return SourceAnalysis {
            result: builder.build(),
            diagnostics: AsymmetryDiagnostics::default(),
        };
    }

    // Asymmetry refines the center used by concentration. When the
    // background is unavailable the asymmetry is undefined and the center
    // stays at the catalog centroid.
    let (asym, diagnostics) = match &background {
        Some(est) => measure_asymmetry(&image, record, petro.radius, est, config),
        None => (
            AsymmetryMeasure {
                asymmetry: f64::NAN,
                center: (record.x, record.y),
                flag: Flag::DegenerateGeometry,
            },
            AsymmetryDiagnostics::default(),
        ),
    };
    builder = builder.asymmetry(asym.asymmetry, asym.center, asym.flag);

    let conc = concentration(&image, asym.center, petro.radius, config);
    builder = builder.concentration(conc.concentration, conc.flag);

    let g = gini(&image, record, petro.radius);
    builder = builder.gini(g.gini, g.flag);

    let m = m20(&image, record, petro.radius);
    builder = builder.m20(m.m20, m.center, m.flag);

    SourceAnalysis {
        result: builder.build(),
        diagnostics,
    }
}
