//! Gini coefficient of the pixel flux distribution.

use ndarray::ArrayView2;

use crate::aperture::EllipticalAperture;
use crate::result::Flag;
use crate::source::SourceRecord;

/// Gini coefficient with validity flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiniCoefficient {
    /// Rank-weighted Gini coefficient, NaN when undefined.
    pub gini: f64,
    /// Validity flag.
    pub flag: Flag,
}

/// Gini coefficient of the strictly positive pixels inside the elliptical
/// aperture of one Petrosian radius at the catalog centroid.
///
/// Uses the rank-weighted form `G = sum_i (2i - n - 1) v[i] / (mean n (n-1))`
/// over the ascending-sorted values with 0-indexed ranks. Degenerate
/// samples (`n <= 1` or non-positive mean) are undefined.
pub fn gini(
    image: &ArrayView2<f64>,
    record: &SourceRecord,
    petrosian_radius: f64,
) -> GiniCoefficient {
    let undefined = |flag| GiniCoefficient {
        gini: f64::NAN,
        flag,
    };
    if petrosian_radius <= 0.0 {
        return undefined(Flag::DegenerateGeometry);
    }

    let aperture = EllipticalAperture::new(
        record.x,
        record.y,
        petrosian_radius,
        petrosian_radius / record.elongation,
        record.theta,
    );
    let mut values: Vec<f64> = aperture
        .masked_pixels(image)
        .into_iter()
        .filter(|&v| v > 0.0)
        .collect();
    values.sort_by(|a, b| a.partial_cmp(b).expect("positive finite pixels"));

    let n = values.len();
    if n <= 1 {
        return undefined(Flag::DegenerateGeometry);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return undefined(Flag::DegenerateGeometry);
    }

    let weighted: f64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * i as f64 - n as f64 - 1.0) * v)
        .sum();
    GiniCoefficient {
        gini: weighted / (mean * n as f64 * (n as f64 - 1.0)),
        flag: Flag::Ok,
    }
}
