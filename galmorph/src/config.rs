//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunable parameters for the morphology pipeline.
///
/// The defaults reproduce the survey-calibrated values; they are exposed so
/// tests and reprocessing runs can tighten or loosen individual searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphConfig {
    /// Sigma-clipping threshold for the background estimate (e.g. 3.0 for
    /// 3-sigma rejection).
    pub clip_sigma: f64,
    /// Maximum sigma-clipping iterations.
    pub clip_max_iters: usize,
    /// Number of log-spaced radii in the radial ladders.
    pub num_radii: usize,
    /// Surface-brightness ratio defining the Petrosian radius.
    pub petrosian_threshold: f64,
    /// Resampling density for the crossing solver (floor of 1000 applies).
    pub resample_points: usize,
    /// Asymmetry search step in pixels.
    pub asymmetry_step: f64,
    /// Iteration budget for the asymmetry center search.
    pub asymmetry_max_iters: usize,
    /// Capacity bound of the per-source asymmetry evaluation cache.
    pub asymmetry_cache_capacity: usize,
    /// Seed for the synthetic background patch used by the asymmetry
    /// correction; fixed so reruns are bit-identical.
    pub noise_seed: u64,
    /// Whether to retain intermediate diagnostic images alongside results.
    pub emit_diagnostics: bool,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            clip_sigma: 3.0,
            clip_max_iters: 5,
            num_radii: 20,
            petrosian_threshold: 0.2,
            resample_points: 1000,
            asymmetry_step: 0.3,
            asymmetry_max_iters: 100,
            asymmetry_cache_capacity: 4096,
            noise_seed: 42,
            emit_diagnostics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_serde() {
        let config = MorphConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: MorphConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.clip_sigma, 3.0);
        assert_eq!(back.num_radii, 20);
        assert_eq!(back.noise_seed, 42);
    }
}
