//! Output value type for one source's morphology statistics.
//!
//! A statistic that fails numerically is represented by a NaN value plus a
//! companion [`Flag`], never by an error that aborts the source. The result
//! is assembled once through [`MorphologyResultBuilder`] and immutable
//! afterwards; statistics that were never set remain at their sentinel
//! defaults, so a source that fails early still yields a complete row.

use serde::{Deserialize, Serialize};

use crate::source::SourceRecord;

/// Validity flag attached to each statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    /// Statistic computed normally.
    Ok,
    /// The interpolated curve never crossed the target threshold.
    NoCrossing,
    /// Interpolation or photometry produced non-finite values.
    NumericallyInvalid,
    /// A geometric precondition failed (non-positive Petrosian radius,
    /// empty aperture, empty pixel sample).
    DegenerateGeometry,
    /// An iterative search exceeded its iteration budget.
    DidNotConverge,
}

impl Flag {
    /// Integer code written to tabular output.
    pub fn code(self) -> i32 {
        match self {
            Flag::Ok => 0,
            Flag::NoCrossing => 1,
            Flag::NumericallyInvalid => 2,
            Flag::DegenerateGeometry => 3,
            Flag::DidNotConverge => 4,
        }
    }

    /// Whether the statistic carrying this flag is usable.
    pub fn is_ok(self) -> bool {
        matches!(self, Flag::Ok)
    }
}

/// Morphology statistics for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphologyResult {
    /// Sky background median.
    pub background_median: f64,
    /// Sky background scatter.
    pub background_rms: f64,
    /// Petrosian semi-major radius in pixels, or -1 when not found.
    pub petrosian_radius: f64,
    /// Validity of the Petrosian radius (only ever 0, 1 or 2).
    pub petrosian_flag: Flag,
    /// Background-corrected rotational asymmetry.
    pub asymmetry: f64,
    /// Center `(x, y)` minimizing the rotational asymmetry.
    pub asymmetry_center: (f64, f64),
    /// Validity of the asymmetry measurement.
    pub asymmetry_flag: Flag,
    /// Concentration, `5 log10(r80 / r20)`.
    pub concentration: f64,
    /// Validity of the concentration.
    pub concentration_flag: Flag,
    /// Gini coefficient of the pixel flux distribution.
    pub gini: f64,
    /// Validity of the Gini coefficient.
    pub gini_flag: Flag,
    /// M20 moment statistic.
    pub m20: f64,
    /// Center `(x, y)` minimizing the total second moment.
    pub m20_center: (f64, f64),
    /// Validity of the M20 statistic.
    pub m20_flag: Flag,
}

/// Incremental builder for [`MorphologyResult`].
///
/// Seeded from the catalog record so the sentinel centers default to the
/// catalog centroid; each statistic is filled in as it completes.
#[derive(Debug, Clone)]
pub struct MorphologyResultBuilder {
    result: MorphologyResult,
}

impl MorphologyResultBuilder {
    /// Start a result for `record` with every statistic at its sentinel.
    pub fn new(record: &SourceRecord) -> Self {
        Self {
            result: MorphologyResult {
                background_median: f64::NAN,
                background_rms: f64::NAN,
                petrosian_radius: -1.0,
                petrosian_flag: Flag::DegenerateGeometry,
                asymmetry: f64::NAN,
                asymmetry_center: (record.x, record.y),
                asymmetry_flag: Flag::DegenerateGeometry,
                concentration: f64::NAN,
                concentration_flag: Flag::DegenerateGeometry,
                gini: f64::NAN,
                gini_flag: Flag::DegenerateGeometry,
                m20: f64::NAN,
                m20_center: (record.x, record.y),
                m20_flag: Flag::DegenerateGeometry,
            },
        }
    }

    /// Record the background estimate.
    pub fn background(mut self, median: f64, rms: f64) -> Self {
        self.result.background_median = median;
        self.result.background_rms = rms;
        self
    }

    /// Record the Petrosian radius and its flag.
    pub fn petrosian(mut self, radius: f64, flag: Flag) -> Self {
        self.result.petrosian_radius = radius;
        self.result.petrosian_flag = flag;
        self
    }

    /// Record the asymmetry statistic.
    pub fn asymmetry(mut self, value: f64, center: (f64, f64), flag: Flag) -> Self {
        self.result.asymmetry = value;
        self.result.asymmetry_center = center;
        self.result.asymmetry_flag = flag;
        self
    }

    /// Record the concentration statistic.
    pub fn concentration(mut self, value: f64, flag: Flag) -> Self {
        self.result.concentration = value;
        self.result.concentration_flag = flag;
        self
    }

    /// Record the Gini coefficient.
    pub fn gini(mut self, value: f64, flag: Flag) -> Self {
        self.result.gini = value;
        self.result.gini_flag = flag;
        self
    }

    /// Record the M20 statistic.
    pub fn m20(mut self, value: f64, center: (f64, f64), flag: Flag) -> Self {
        self.result.m20 = value;
        self.result.m20_center = center;
        self.result.m20_flag = flag;
        self
    }

    /// Finalize the result.
    pub fn build(self) -> MorphologyResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SourceRecord {
        SourceRecord::from_catalog(1.2, 31.5, 33.0, 3.0, 9.0, 7.5, 20.0, 0.0, 0.0, 0.17)
            .unwrap()
    }

    #[test]
    fn test_flag_codes_are_stable() {
        assert_eq!(Flag::Ok.code(), 0);
        assert_eq!(Flag::NoCrossing.code(), 1);
        assert_eq!(Flag::NumericallyInvalid.code(), 2);
        assert_eq!(Flag::DegenerateGeometry.code(), 3);
        assert_eq!(Flag::DidNotConverge.code(), 4);
    }

    #[test]
    fn test_unset_statistics_are_sentinels() {
        let result = MorphologyResultBuilder::new(&record()).build();
        assert!(result.asymmetry.is_nan());
        assert!(result.concentration.is_nan());
        assert_eq!(result.petrosian_radius, -1.0);
        assert_eq!(result.asymmetry_center, (31.5, 33.0));
        assert!(!result.petrosian_flag.is_ok());
    }

    #[test]
    fn test_builder_fills_fields() {
        let result = MorphologyResultBuilder::new(&record())
            .background(0.01, 1.3)
            .petrosian(12.5, Flag::Ok)
            .asymmetry(0.08, (31.8, 32.7), Flag::Ok)
            .concentration(2.7, Flag::Ok)
            .gini(0.45, Flag::Ok)
            .m20(-1.8, (32.0, 32.0), Flag::Ok)
            .build();
        assert_eq!(result.petrosian_radius, 12.5);
        assert!(result.petrosian_flag.is_ok());
        assert_eq!(result.asymmetry, 0.08);
        assert_eq!(result.m20_center, (32.0, 32.0));
    }

    #[test]
    fn test_result_serializes() {
        let result = MorphologyResultBuilder::new(&record())
            .background(0.0, 1.0)
            .build();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("petrosian_radius"));
    }
}
