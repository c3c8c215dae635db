//! Petrosian radius solver.
//!
//! The Petrosian radius is where the ratio of local to mean surface
//! brightness drops to a fixed threshold (0.2). Local surface brightness at
//! radius `r[i]` is measured in the elliptical annulus spanning
//! `[r[i-1], r[i+1]]`; mean surface brightness is the cumulative flux
//! within `r[i]` over the cumulative area, accumulated from single-step
//! annuli. The ratio curve is cubic-resampled and scanned for a decreasing
//! crossing of the threshold.

use log::debug;
use ndarray::ArrayView2;

use crate::aperture::{log_spaced_radii, radial_photometry, EllipticalAnnulus};
use crate::config::MorphConfig;
use crate::interpolate::{solve_crossing, CrossingDirection};
use crate::result::Flag;
use crate::source::SourceRecord;

/// Petrosian radius with its validity flag.
///
/// `radius` is -1 when the solver fails; every downstream statistic checks
/// `radius > 0` before running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetrosianRadius {
    /// Semi-major Petrosian radius in pixels, or -1.
    pub radius: f64,
    /// 0 = ok, 1 = no crossing found, 2 = interpolation invalid.
    pub flag: Flag,
}

impl PetrosianRadius {
    /// Whether downstream statistics may use this radius.
    pub fn is_valid(&self) -> bool {
        self.radius > 0.0 && self.flag.is_ok()
    }
}

/// Solve for the Petrosian radius of the source described by `record`.
///
/// The radius ladder is log-spaced from 1 px to half the image size, so the
/// outermost annulus is bounded by the frame by construction. Semi-minor
/// axes follow the catalog elongation; annuli share the catalog position
/// angle and centroid.
pub fn petrosian_radius(
    image: &ArrayView2<f64>,
    record: &SourceRecord,
    config: &MorphConfig,
) -> PetrosianRadius {
    let (rows, _) = image.dim();
    let radii = log_spaced_radii(rows, config.num_radii);
    let n = radii.len();
    let elong = record.elongation;

    // Two annulus ladders: a wide one spanning [r[i-1], r[i+1]] for the
    // local surface brightness at r[i], and a one-step one accumulated
    // into the mean surface brightness within r[i]. Both use analytic
    // areas so the ratio is insensitive to frame truncation of the
    // weighted area.
    let annuli_at: Vec<EllipticalAnnulus> = (1..n - 1)
        .map(|i| {
            EllipticalAnnulus::new(
                record.x,
                record.y,
                radii[i - 1],
                radii[i + 1],
                radii[i + 1] / elong,
                record.theta,
            )
        })
        .collect();
    let annuli_in: Vec<EllipticalAnnulus> = (1..n - 1)
        .map(|i| {
            EllipticalAnnulus::new(
                record.x,
                record.y,
                radii[i - 1],
                radii[i],
                radii[i] / elong,
                record.theta,
            )
        })
        .collect();
    let at_r = radial_photometry(image, &annuli_at);
    let in_r = radial_photometry(image, &annuli_in);

    let mut sample_radii = Vec::with_capacity(n - 2);
    let mut ratio = Vec::with_capacity(n - 2);
    let mut cumulative_flux = 0.0;
    let mut cumulative_area = 0.0;
    for i in 0..annuli_at.len() {
        let local_sb = at_r.fluxes[i] / at_r.areas[i];
        cumulative_flux += in_r.fluxes[i];
        cumulative_area += in_r.areas[i];
        let mean_sb = cumulative_flux / cumulative_area;

        sample_radii.push(radii[i + 1]);
        ratio.push(local_sb / mean_sb);
    }

    match solve_crossing(
        &sample_radii,
        &ratio,
        config.petrosian_threshold,
        CrossingDirection::Decreasing,
        config.resample_points,
    ) {
        Ok(Some(radius)) => PetrosianRadius {
            radius,
            flag: Flag::Ok,
        },
        Ok(None) => {
            debug!(
                "petrosian ratio never crossed {} (range {:.3}..{:.3})",
                config.petrosian_threshold,
                ratio.iter().cloned().fold(f64::INFINITY, f64::min),
                ratio.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            );
            PetrosianRadius {
                radius: -1.0,
                flag: Flag::NoCrossing,
            }
        }
        Err(err) => {
            debug!("petrosian interpolation failed: {err}");
            PetrosianRadius {
                radius: -1.0,
                flag: Flag::NumericallyInvalid,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn config() -> MorphConfig {
        MorphConfig::default()
    }

    fn round_record(x: f64, y: f64) -> SourceRecord {
        SourceRecord::from_catalog(1.0, x, y, 3.5, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0).unwrap()
    }

    /// Circular Gaussian test image; analytic Petrosian radius is
    /// sigma * sqrt(2 u*) with u* ~= 2.661 solving u e^-u = 0.2 (1 - e^-u),
    /// i.e. about 2.307 sigma.
    fn gaussian_image(size: usize, sigma: f64) -> Array2<f64> {
        let c = size as f64 / 2.0;
        Array2::from_shape_fn((size, size), |(r, col)| {
            let dr = r as f64 - c;
            let dc = col as f64 - c;
            (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp()
        })
    }

    #[test]
    fn test_gaussian_radius_matches_analytic() {
        let sigma = 6.0;
        let image = gaussian_image(128, sigma);
        let record = round_record(64.0, 64.0);
        let petro = petrosian_radius(&image.view(), &record, &config());
        assert!(petro.is_valid(), "flag {:?}", petro.flag);
        assert_relative_eq!(petro.radius, 2.307 * sigma, max_relative = 0.08);
    }

    #[test]
    fn test_flat_image_has_no_crossing() {
        // Constant surface brightness: the ratio sits at 1.0 everywhere and
        // never reaches the threshold.
        let image = Array2::<f64>::ones((64, 64));
        let record = round_record(32.0, 32.0);
        let petro = petrosian_radius(&image.view(), &record, &config());
        assert_eq!(petro.flag, Flag::NoCrossing);
        assert_eq!(petro.radius, -1.0);
        assert!(!petro.is_valid());
    }

    #[test]
    fn test_zero_image_is_numerically_invalid() {
        // All-zero flux: 0/0 surface brightness ratios poison the fit.
        let image = Array2::<f64>::zeros((64, 64));
        let record = round_record(32.0, 32.0);
        let petro = petrosian_radius(&image.view(), &record, &config());
        assert_eq!(petro.flag, Flag::NumericallyInvalid);
        assert!(!petro.is_valid());
    }

    #[test]
    fn test_elongated_source() {
        // Elliptical Gaussian aligned with the catalog orientation still
        // yields a valid decreasing crossing.
        let (sa, sb) = (8.0, 4.0);
        let image = Array2::from_shape_fn((128, 128), |(r, c)| {
            let dr = r as f64 - 64.0;
            let dc = c as f64 - 64.0;
            (-(dc * dc / (2.0 * sa * sa) + dr * dr / (2.0 * sb * sb))).exp()
        });
        let record =
            SourceRecord::from_catalog(2.0, 64.0, 64.0, 3.5, 8.0, 4.0, 0.0, 0.0, 0.0, 0.5)
                .unwrap();
        let petro = petrosian_radius(&image.view(), &record, &config());
        assert!(petro.is_valid(), "flag {:?}", petro.flag);
        assert!(petro.radius > 2.307 * sb && petro.radius < 4.0 * sa);
    }
}
