//! Shared scene construction for the integration tests.

use galmorph::synthetic::{
    circular_segmap, noise_field, render_sources, round_source_record, GaussianSource,
};
use galmorph::SourceRecord;
use ndarray::Array2;

/// A synthetic observation: one circular Gaussian source on a noisy sky.
pub struct Scene {
    pub image: Array2<f64>,
    pub segmap: Array2<i32>,
    pub record: SourceRecord,
    pub source: GaussianSource,
    pub noise_sigma: f64,
}

/// Build a frame with a single Gaussian of the given sigma at the frame's
/// rotation center, injected into a zero-mean noise field, with the
/// segmentation map marking only the source footprint (3 sigma).
pub fn gaussian_scene(size: usize, sigma: f64, peak: f64, noise_sigma: f64, seed: u64) -> Scene {
    let center = (size as f64 - 1.0) / 2.0;
    let source = GaussianSource {
        x: center,
        y: center,
        peak,
        sigma,
    };
    let mut image = render_sources((size, size), &[source]);
    image = image + noise_field((size, size), noise_sigma, seed);
    let segmap = circular_segmap((size, size), (center, center), 3.0 * sigma, 1);
    let record = round_source_record(center, center, 2.0 * sigma);
    Scene {
        image,
        segmap,
        record,
        source,
        noise_sigma,
    }
}
