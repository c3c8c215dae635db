//! Robust sky background estimation from segmentation-free pixels.
//!
//! The estimate feeds the asymmetry statistic's synthetic background patch,
//! so it must be immune to residual source flux: pixels are clipped
//! iteratively about the running median until the sample is stable or the
//! iteration cap is reached.

use ndarray::ArrayView2;

use crate::error::MorphError;

/// Robust location and scatter of the sky background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundEstimate {
    /// Median of the surviving background pixels.
    pub median: f64,
    /// Standard deviation of the surviving background pixels.
    pub rms: f64,
    /// Number of pixels surviving the clip.
    pub n_pixels: usize,
    /// Clipping iterations actually performed.
    pub iterations: usize,
}

/// Estimate the sky background from pixels the detector left unassigned
/// (`segmap == 0`), using iterative sigma clipping about the median.
///
/// Pixels beyond `sigma * std` of the running median are rejected and the
/// statistics recomputed, until no pixel is rejected or `max_iters` passes
/// have run. Non-finite pixels are excluded up front.
///
/// # Errors
///
/// [`MorphError::NoBackgroundPixels`] when the segmentation map assigns
/// every (finite) pixel to a source, or clipping rejects everything.
pub fn estimate_background(
    image: &ArrayView2<f64>,
    segmap: &ArrayView2<i32>,
    sigma: f64,
    max_iters: usize,
) -> Result<BackgroundEstimate, MorphError> {
    let mut values: Vec<f64> = image
        .iter()
        .zip(segmap.iter())
        .filter(|&(v, &s)| s == 0 && v.is_finite())
        .map(|(&v, _)| v)
        .collect();

    if values.is_empty() {
        return Err(MorphError::NoBackgroundPixels);
    }

    let mut iterations = 0;
    for _ in 0..max_iters {
        let center = median_of(&mut values);
        let std = std_of(&values);
        let before = values.len();
        values.retain(|v| (v - center).abs() <= sigma * std);
        if values.is_empty() {
            return Err(MorphError::NoBackgroundPixels);
        }
        iterations += 1;
        if values.len() == before {
            break;
        }
    }

    let median = median_of(&mut values);
    let rms = std_of(&values);
    Ok(BackgroundEstimate {
        median,
        rms,
        n_pixels: values.len(),
        iterations,
    })
}

fn median_of(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).expect("background pixels are finite"));
    let n = values.len();
    if n % 2 == 0 {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    } else {
        values[n / 2]
    }
}

fn std_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}
