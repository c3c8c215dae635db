//! Rotational asymmetry minimization.
//!
//! The asymmetry of a source is the normalized residual between the image
//! and its 180-degree rotation, minimized over sub-pixel placements of the
//! rotation center and corrected for the residual a pure-noise field would
//! show. The center search is a discrete local descent: the image is
//! shifted so the trial center lands on the frame's rotation-invariant
//! point, the shifted frame is compared against its flip, and the search
//! recenters on whichever member of the 8-connected ring of step-offsets
//! improves the measure, until the current center is itself the minimum.
//!
//! Every evaluated offset is memoized in a cache scoped to the call, so a
//! candidate revisited from a different direction costs nothing. The
//! search is boxed by the frame and geometrically exhausted by the fixed
//! step, but an iteration cap guards against oscillation on pathological
//! inputs; exceeding it reports [`Flag::DidNotConverge`] rather than
//! looping forever.

use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

use crate::aperture::EllipticalAperture;
use crate::background::BackgroundEstimate;
use crate::config::MorphConfig;
use crate::result::Flag;
use crate::shift::{rotate_180, shift_bilinear, shift_wrapped};
use crate::source::SourceRecord;

/// Ring of candidate lattice offsets: the current point first, then its
/// 8-connected neighbors. The search converges when the first entry wins.
const RING: [(i64, i64); 9] = [
    (0, 0),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Background-corrected asymmetry with the center that minimizes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymmetryMeasure {
    /// Corrected asymmetry; NaN when the measurement failed.
    pub asymmetry: f64,
    /// Center `(x, y)` minimizing the rotation residual. Falls back to the
    /// catalog centroid on failure.
    pub center: (f64, f64),
    /// Validity flag.
    pub flag: Flag,
}

/// Intermediate images retained for the diagnostics sink.
#[derive(Debug, Clone, Default)]
pub struct AsymmetryDiagnostics {
    /// The synthesized background patch.
    pub background_patch: Option<Array2<f64>>,
    /// The rotation residual at the converged center.
    pub rotation_residual: Option<Array2<f64>>,
}

/// Measure the rotational asymmetry of the source within an elliptical
/// aperture of one Petrosian radius.
///
/// # Arguments
///
/// * `image` - cleaned science image
/// * `record` - catalog record supplying centroid, elongation and angle
/// * `petrosian_radius` - semi-major aperture radius; must be positive
/// * `background` - clipped sky estimate parameterizing the noise patch
/// * `config` - step size, iteration budget, cache bound and noise seed
///
/// # Returns
///
/// The measure plus diagnostic images (populated when
/// `config.emit_diagnostics` is set).
pub fn measure_asymmetry(
    image: &ArrayView2<f64>,
    record: &SourceRecord,
    petrosian_radius: f64,
    background: &BackgroundEstimate,
    config: &MorphConfig,
) -> (AsymmetryMeasure, AsymmetryDiagnostics) {
    let failed = |flag: Flag| AsymmetryMeasure {
        asymmetry: f64::NAN,
        center: (record.x, record.y),
        flag,
    };

    if petrosian_radius <= 0.0 {
        return (failed(Flag::DegenerateGeometry), AsymmetryDiagnostics::default());
    }
    if !background.median.is_finite() || !background.rms.is_finite() || background.rms < 0.0 {
        return (failed(Flag::DegenerateGeometry), AsymmetryDiagnostics::default());
    }

    let (rows, cols) = image.dim();
    // Rotation-invariant point of the frame: rotate_180 maps a pixel at
    // (cx + d, cy + d) onto (cx - d, cy - d) about this center, so trial
    // centers shifted here compare cleanly against the flipped frame.
    let cx = (cols as f64 - 1.0) / 2.0;
    let cy = (rows as f64 - 1.0) / 2.0;

    let aperture = EllipticalAperture::new(
        cx,
        cy,
        petrosian_radius,
        petrosian_radius / record.elongation,
        record.theta,
    );

    let mut rng = StdRng::seed_from_u64(config.noise_seed);
    let normal = match Normal::new(background.median, background.rms) {
        Ok(dist) => dist,
        Err(_) => return (failed(Flag::NumericallyInvalid), AsymmetryDiagnostics::default()),
    };
    let (bkg_asym, patch) = background_asymmetry(&aperture, &normal, &mut rng);

    // Shift that places the catalog centroid on the rotation center; the
    // lattice search moves in whole steps around it.
    let base_dx = cx - record.x;
    let base_dy = cy - record.y;
    let step = config.asymmetry_step;
    let delta_of = |(i, j): (i64, i64)| (base_dx + step * i as f64, base_dy + step * j as f64);

    let mut cache: HashMap<(i64, i64), (f64, f64)> = HashMap::new();
    let mut current = (0i64, 0i64);
    let mut converged = None;

    for _ in 0..config.asymmetry_max_iters {
        let mut trials = [(f64::INFINITY, 0.0); 9];
        for (slot, offset) in RING.iter().enumerate() {
            let key = (current.0 + offset.0, current.1 + offset.1);
            let value = match cache.get(&key) {
                Some(&cached) => cached,
                None => {
                    let (dx, dy) = delta_of(key);
                    let evaluated = evaluate_offset(image, &aperture, dx, dy);
                    if cache.len() < config.asymmetry_cache_capacity {
                        cache.insert(key, evaluated);
                    }
                    evaluated
                }
            };
            trials[slot] = value;
        }

        let (current_asym, current_den) = trials[0];
        let ring_min = trials
            .iter()
            .map(|t| t.0)
            .fold(f64::INFINITY, f64::min);
        if current_asym <= ring_min {
            converged = Some((current_asym, current_den));
            break;
        }
        // First slot achieving the minimum, so ties resolve the same way
        // on every run.
        let mut best_slot = 0;
        for (slot, trial) in trials.iter().enumerate() {
            if trial.0 < trials[best_slot].0 {
                best_slot = slot;
            }
        }
        current = (
            current.0 + RING[best_slot].0,
            current.1 + RING[best_slot].1,
        );
    }

    let mut diagnostics = AsymmetryDiagnostics::default();
    if config.emit_diagnostics {
        diagnostics.background_patch = Some(patch);
    }

    let Some((asym, den)) = converged else {
        debug!(
            "asymmetry search exhausted {} iterations without converging",
            config.asymmetry_max_iters
        );
        return (failed(Flag::DidNotConverge), diagnostics);
    };

    if !asym.is_finite() || den <= 0.0 {
        return (failed(Flag::NumericallyInvalid), diagnostics);
    }

    let (dx, dy) = delta_of(current);
    if config.emit_diagnostics {
        let shifted = shift_bilinear(image, dx, dy);
        let residual = (&shifted - &rotate_180(&shifted.view())).mapv(f64::abs);
        diagnostics.rotation_residual = Some(residual);
    }

    let measure = AsymmetryMeasure {
        asymmetry: asym - bkg_asym / den,
        center: (cx - dx, cy - dy),
        flag: Flag::Ok,
    };
    (measure, diagnostics)
}

/// Trial asymmetry for one shift: residual flux over total absolute flux,
/// both restricted to the aperture. A non-positive denominator poisons the
/// trial with infinity so the descent routes around it.
fn evaluate_offset(
    image: &ArrayView2<f64>,
    aperture: &EllipticalAperture,
    dx: f64,
    dy: f64,
) -> (f64, f64) {
    let shifted = shift_bilinear(image, dx, dy);
    let rotated = rotate_180(&shifted.view());
    let residual = (&shifted - &rotated).mapv(f64::abs);
    let numerator = aperture.photometry(&residual.view()).flux;
    let denominator = aperture
        .photometry(&shifted.mapv(f64::abs).view())
        .flux;
    if denominator > 0.0 && numerator.is_finite() {
        (numerator / denominator, denominator)
    } else {
        (f64::INFINITY, denominator)
    }
}

/// Expected rotation residual of pure background noise over the aperture.
///
/// A square patch matching the aperture area is filled with independent
/// draws from the clipped sky distribution, and the wrapped 180-degree
/// residual is minimized over every integer offset of the patch. The
/// minimum is rescaled from patch pixels to the exact aperture area.
fn background_asymmetry(
    aperture: &EllipticalAperture,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> (f64, Array2<f64>) {
    let size = aperture.area().ceil().sqrt().ceil().max(1.0) as usize;
    let patch = Array2::from_shape_fn((size, size), |_| noise.sample(rng));

    let mut min_residual = f64::INFINITY;
    for dr in 0..size as i64 {
        for dc in 0..size as i64 {
            let shifted = shift_wrapped(&patch.view(), dr, dc);
            let rotated = rotate_180(&shifted.view());
            let residual: f64 = shifted
                .iter()
                .zip(rotated.iter())
                .map(|(s, r)| (s - r).abs())
                .sum();
            min_residual = min_residual.min(residual);
        }
    }

    let scaled = min_residual * aperture.area() / (size * size) as f64;
    (scaled, patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn symmetric_gaussian(size: usize, sigma: f64) -> Array2<f64> {
        let c = (size as f64 - 1.0) / 2.0;
        Array2::from_shape_fn((size, size), |(r, col)| {
            let dr = r as f64 - c;
            let dc = col as f64 - c;
            (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp()
        })
    }

    fn round_record(x: f64, y: f64) -> SourceRecord {
        SourceRecord::from_catalog(1.0, x, y, 3.5, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0).unwrap()
    }

    fn quiet_background() -> BackgroundEstimate {
        BackgroundEstimate {
            median: 0.0,
            rms: 0.0,
            n_pixels: 1,
            iterations: 1,
        }
    }

    #[test]
    fn test_symmetric_source_has_zero_asymmetry() {
        let image = symmetric_gaussian(129, 6.0);
        let record = round_record(64.0, 64.0);
        let (measure, _) = measure_asymmetry(
            &image.view(),
            &record,
            12.0,
            &quiet_background(),
            &MorphConfig::default(),
        );
        assert!(measure.flag.is_ok(), "flag {:?}", measure.flag);
        assert!(
            measure.asymmetry.abs() < 1e-10,
            "asymmetry {} should vanish",
            measure.asymmetry
        );
        assert_relative_eq!(measure.center.0, 64.0, epsilon = 1e-9);
        assert_relative_eq!(measure.center.1, 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_search_recovers_miscentered_catalog_position() {
        // Catalog centroid off by two search steps from the symmetry
        // center: the minimizer must walk back within one step.
        let image = symmetric_gaussian(129, 6.0);
        let record = round_record(64.6, 64.0);
        let config = MorphConfig::default();
        let (measure, _) =
            measure_asymmetry(&image.view(), &record, 12.0, &quiet_background(), &config);
        assert!(measure.flag.is_ok(), "flag {:?}", measure.flag);
        assert!(
            (measure.center.0 - 64.0).abs() <= config.asymmetry_step + 1e-9,
            "center {:?} should be within one step of (64, 64)",
            measure.center
        );
        assert!(measure.asymmetry.abs() < 0.05);
    }

    #[test]
    fn test_degenerate_radius_is_flagged() {
        let image = symmetric_gaussian(65, 4.0);
        let record = round_record(32.0, 32.0);
        let (measure, _) = measure_asymmetry(
            &image.view(),
            &record,
            -1.0,
            &quiet_background(),
            &MorphConfig::default(),
        );
        assert_eq!(measure.flag, Flag::DegenerateGeometry);
        assert!(measure.asymmetry.is_nan());
        assert_eq!(measure.center, (32.0, 32.0));
    }

    #[test]
    fn test_iteration_cap_reports_did_not_converge() {
        let image = symmetric_gaussian(129, 6.0);
        // Catalog centroid far from the symmetry center with a one-shot
        // iteration budget: the walk cannot finish.
        let record = round_record(40.0, 40.0);
        let config = MorphConfig {
            asymmetry_max_iters: 1,
            ..MorphConfig::default()
        };
        let (measure, _) =
            measure_asymmetry(&image.view(), &record, 12.0, &quiet_background(), &config);
        assert_eq!(measure.flag, Flag::DidNotConverge);
        assert!(measure.asymmetry.is_nan());
        assert_eq!(measure.center, (40.0, 40.0));
    }

    #[test]
    fn test_noise_patch_is_deterministic() {
        let image = symmetric_gaussian(129, 6.0);
        let record = round_record(64.0, 64.0);
        let background = BackgroundEstimate {
            median: 0.0,
            rms: 1.0,
            n_pixels: 4096,
            iterations: 2,
        };
        let config = MorphConfig {
            emit_diagnostics: true,
            ..MorphConfig::default()
        };
        let (m1, d1) = measure_asymmetry(&image.view(), &record, 12.0, &background, &config);
        let (m2, d2) = measure_asymmetry(&image.view(), &record, 12.0, &background, &config);
        assert_eq!(m1.asymmetry.to_bits(), m2.asymmetry.to_bits());
        assert_eq!(d1.background_patch, d2.background_patch);
    }

    #[test]
    fn test_diagnostics_emitted_on_request() {
        let image = symmetric_gaussian(65, 4.0);
        let record = round_record(32.0, 32.0);
        let config = MorphConfig {
            emit_diagnostics: true,
            ..MorphConfig::default()
        };
        let (_, diag) =
            measure_asymmetry(&image.view(), &record, 8.0, &quiet_background(), &config);
        assert!(diag.background_patch.is_some());
        assert!(diag.rotation_residual.is_some());

        let (_, diag) = measure_asymmetry(
            &image.view(),
            &record,
            8.0,
            &quiet_background(),
            &MorphConfig::default(),
        );
        assert!(diag.background_patch.is_none());
        assert!(diag.rotation_residual.is_none());
    }
}
