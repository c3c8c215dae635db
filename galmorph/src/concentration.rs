//! Light concentration from cumulative radial flux.
//!
//! Concentration compares the radii enclosing 20% and 80% of the source's
//! light, where "total light" is the flux inside a circular aperture of one
//! Petrosian radius centered on the asymmetry center. The normalized
//! cumulative-flux curve is cubic-resampled and solved for both crossings;
//! a missing crossing leaves the sentinel radii at -1 and the concentration
//! undefined rather than feeding a non-positive ratio into the logarithm.

use log::debug;
use ndarray::ArrayView2;

use crate::aperture::{log_spaced_radii, radial_photometry, EllipticalAnnulus, EllipticalAperture};
use crate::config::MorphConfig;
use crate::interpolate::{solve_crossing, CrossingDirection};
use crate::result::Flag;

/// Concentration statistic with its defining radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Concentration {
    /// `5 log10(r80 / r20)`, NaN when undefined.
    pub concentration: f64,
    /// Radius enclosing 20% of the total flux, or -1.
    pub r20: f64,
    /// Radius enclosing 80% of the total flux, or -1.
    pub r80: f64,
    /// Validity flag.
    pub flag: Flag,
}

impl Concentration {
    fn undefined(flag: Flag) -> Self {
        Self {
            concentration: f64::NAN,
            r20: -1.0,
            r80: -1.0,
            flag,
        }
    }
}

/// Compute the concentration about `center` (the asymmetry center).
///
/// Builds the log-spaced circular annulus ladder, accumulates flux with
/// radius, normalizes by the flux within `petrosian_radius`, and locates
/// the 0.2 and 0.8 crossings of the increasing cumulative curve.
pub fn concentration(
    image: &ArrayView2<f64>,
    center: (f64, f64),
    petrosian_radius: f64,
    config: &MorphConfig,
) -> Concentration {
    if petrosian_radius <= 0.0 {
        return Concentration::undefined(Flag::DegenerateGeometry);
    }

    let (rows, _) = image.dim();
    let radii = log_spaced_radii(rows, config.num_radii);
    let (cx, cy) = center;

    let total_flux = EllipticalAperture::circular(cx, cy, petrosian_radius)
        .photometry(image)
        .flux;
    if !(total_flux > 0.0) {
        debug!("concentration: non-positive total flux {total_flux}");
        return Concentration::undefined(Flag::DegenerateGeometry);
    }

    let annuli: Vec<EllipticalAnnulus> = (1..radii.len())
        .map(|i| EllipticalAnnulus::circular(cx, cy, radii[i - 1], radii[i]))
        .collect();
    let rings = radial_photometry(image, &annuli);

    let mut ratio = Vec::with_capacity(rings.fluxes.len());
    let mut cumulative = 0.0;
    for flux in &rings.fluxes {
        cumulative += flux;
        ratio.push(cumulative / total_flux);
    }
    let sample_radii = rings.radii;

    let r20 = solve_crossing(
        &sample_radii,
        &ratio,
        0.2,
        CrossingDirection::Increasing,
        config.resample_points,
    );
    let r80 = solve_crossing(
        &sample_radii,
        &ratio,
        0.8,
        CrossingDirection::Increasing,
        config.resample_points,
    );

    match (r20, r80) {
        (Ok(Some(r20)), Ok(Some(r80))) if r20 > 0.0 && r80 > 0.0 => Concentration {
            concentration: 5.0 * (r80 / r20).log10(),
            r20,
            r80,
            flag: Flag::Ok,
        },
        (Ok(_), Ok(_)) => {
            debug!("concentration: cumulative curve missed a crossing");
            Concentration::undefined(Flag::NoCrossing)
        }
        _ => {
            debug!("concentration: interpolation failed");
            Concentration::undefined(Flag::NumericallyInvalid)
        }
    }
}
