//! Cubic resampling and threshold-crossing location for sampled curves.
//!
//! The radius solvers sample their curves at a handful of log-spaced radii,
//! which is far too sparse to read a crossing off directly. A natural cubic
//! spline is fitted through the samples and evaluated on a dense, evenly
//! spaced grid (1000 points for radius solving), and the crossing is then
//! taken from the first sign change of the resampled curve in the declared
//! direction, with linear interpolation between grid points.
//!
//! "Not found" is an ordinary outcome here, reported as `Ok(None)`; it is
//! the caller's job to translate it into a validity flag. A curve that
//! produces any non-finite resampled value is reported as an error so the
//! caller can distinguish "no crossing" from "numerically invalid".

use thiserror::Error;

/// Minimum resampling density used by the radius solvers.
pub const MIN_RESAMPLE_POINTS: usize = 1000;

/// Errors from curve fitting and crossing location.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    /// Fewer than two samples, or mismatched sample vectors.
    #[error("need at least 2 matching samples, got {xs} x-values and {ys} y-values")]
    InsufficientData {
        /// Number of x samples supplied.
        xs: usize,
        /// Number of y samples supplied.
        ys: usize,
    },

    /// Abscissae are not strictly increasing.
    #[error("x samples must be strictly increasing")]
    UnsortedAbscissae,

    /// The input samples or the fitted curve contain non-finite values.
    #[error("interpolated curve contains non-finite values")]
    NonFinite,
}

/// Declared monotonic direction of the curve near the sought crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingDirection {
    /// Accept only crossings from below the target to above it.
    Increasing,
    /// Accept only crossings from above the target to below it.
    Decreasing,
    /// Accept the first sign change in either direction.
    Any,
}

/// Natural cubic spline through strictly increasing abscissae.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots; zero at both ends (natural spline).
    second: Vec<f64>,
}

impl CubicSpline {
    /// Fit a natural cubic spline through `(xs, ys)`.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, InterpError> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(InterpError::InsufficientData {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(InterpError::UnsortedAbscissae);
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(InterpError::NonFinite);
        }

        let n = xs.len();
        let mut second = vec![0.0; n];
        if n > 2 {
            // Tridiagonal system for interior second derivatives, solved
            // with the Thomas algorithm.
            let m = n - 2;
            let mut diag = vec![0.0; m];
            let mut rhs = vec![0.0; m];
            let mut upper = vec![0.0; m];
            for i in 0..m {
                let h0 = xs[i + 1] - xs[i];
                let h1 = xs[i + 2] - xs[i + 1];
                diag[i] = 2.0 * (h0 + h1);
                upper[i] = h1;
                rhs[i] = 6.0 * ((ys[i + 2] - ys[i + 1]) / h1 - (ys[i + 1] - ys[i]) / h0);
            }
            // Forward elimination: the sub-diagonal entry for row i is
            // h(i+1) = xs[i+1] - xs[i], equal to the previous row's upper.
            for i in 1..m {
                let lower = xs[i + 1] - xs[i];
                let factor = lower / diag[i - 1];
                diag[i] -= factor * upper[i - 1];
                rhs[i] -= factor * rhs[i - 1];
            }
            second[m] = rhs[m - 1] / diag[m - 1];
            for i in (0..m - 1).rev() {
                second[i + 1] = (rhs[i] - upper[i] * second[i + 2]) / diag[i];
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second,
        })
    }

    /// Evaluate the spline at `x`. Outside the knot range the boundary
    /// polynomial is extended.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let idx = match self.xs.partition_point(|&knot| knot <= x) {
            0 => 0,
            i if i >= n => n - 2,
            i => i - 1,
        };
        let h = self.xs[idx + 1] - self.xs[idx];
        let a = (self.xs[idx + 1] - x) / h;
        let b = (x - self.xs[idx]) / h;
        a * self.ys[idx]
            + b * self.ys[idx + 1]
            + ((a * a * a - a) * self.second[idx] + (b * b * b - b) * self.second[idx + 1])
                * h * h
                / 6.0
    }
}

/// Resample `(xs, ys)` onto `n` evenly spaced abscissae spanning the
/// sample range, using a natural cubic spline.
pub fn resample_cubic(
    xs: &[f64],
    ys: &[f64],
    n: usize,
) -> Result<(Vec<f64>, Vec<f64>), InterpError> {
    let spline = CubicSpline::new(xs, ys)?;
    let x0 = xs[0];
    let x1 = xs[xs.len() - 1];
    let grid: Vec<f64> = (0..n)
        .map(|i| x0 + (x1 - x0) * i as f64 / (n - 1) as f64)
        .collect();
    let values: Vec<f64> = grid.iter().map(|&x| spline.evaluate(x)).collect();
    Ok((grid, values))
}

/// Scan a densely sampled curve for the first crossing of `target` in the
/// declared direction, returning the linearly interpolated crossing x.
pub fn scan_crossing(
    xs: &[f64],
    ys: &[f64],
    target: f64,
    direction: CrossingDirection,
) -> Option<f64> {
    for i in 0..xs.len().saturating_sub(1) {
        let d0 = ys[i] - target;
        let d1 = ys[i + 1] - target;
        let crosses = match direction {
            CrossingDirection::Decreasing => d0 >= 0.0 && d1 < 0.0,
            CrossingDirection::Increasing => d0 <= 0.0 && d1 > 0.0,
            CrossingDirection::Any => d0 == 0.0 || d0.signum() != d1.signum(),
        };
        if crosses {
            if d0 == d1 {
                return Some(xs[i]);
            }
            let t = d0 / (d0 - d1);
            return Some(xs[i] + t * (xs[i + 1] - xs[i]));
        }
    }
    None
}

/// Locate the crossing of `target` on a sparsely sampled curve.
///
/// Fits a cubic spline, resamples onto `n_resample` (at least
/// [`MIN_RESAMPLE_POINTS`]) evenly spaced points, verifies every resampled
/// value is finite, and scans for the crossing.
///
/// # Returns
///
/// * `Ok(Some(x))` - crossing located at `x`
/// * `Ok(None)` - curve never crosses the target in the declared direction
/// * `Err(InterpError::NonFinite)` - the fit produced non-finite values
pub fn solve_crossing(
    xs: &[f64],
    ys: &[f64],
    target: f64,
    direction: CrossingDirection,
    n_resample: usize,
) -> Result<Option<f64>, InterpError> {
    let n = n_resample.max(MIN_RESAMPLE_POINTS);
    let (grid, values) = resample_cubic(xs, ys, n)?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(InterpError::NonFinite);
    }
    Ok(scan_crossing(&grid, &values, target, direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_reproduces_knots() {
        let xs = [1.0, 2.0, 4.0, 7.0, 11.0];
        let ys = [3.0, -1.0, 0.5, 2.0, -4.0];
        let spline = CubicSpline::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(spline.evaluate(*x), *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_spline_matches_line_exactly() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 3.0).collect();
        let spline = CubicSpline::new(&xs, &ys).unwrap();
        assert_relative_eq!(spline.evaluate(4.37), 2.0 * 4.37 - 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_spline_rejects_bad_input() {
        assert!(matches!(
            CubicSpline::new(&[1.0], &[1.0]),
            Err(InterpError::InsufficientData { .. })
        ));
        assert!(matches!(
            CubicSpline::new(&[1.0, 1.0, 2.0], &[0.0, 1.0, 2.0]),
            Err(InterpError::UnsortedAbscissae)
        ));
        assert!(matches!(
            CubicSpline::new(&[1.0, 2.0], &[0.0, f64::NAN]),
            Err(InterpError::NonFinite)
        ));
    }

    #[test]
    fn test_decreasing_crossing_located() {
        // Smooth decreasing curve crossing 0.2 at a known point:
        // y = exp(-x/2) crosses 0.2 at x = 2 ln 5 = 3.2189.
        let xs: Vec<f64> = (0..20).map(|i| 0.5 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (-x / 2.0).exp()).collect();
        let root = solve_crossing(&xs, &ys, 0.2, CrossingDirection::Decreasing, 1000)
            .unwrap()
            .unwrap();
        assert_relative_eq!(root, 2.0 * 5.0_f64.ln(), epsilon = 1e-3);
    }

    #[test]
    fn test_increasing_direction_ignores_decreasing_crossing() {
        let xs: Vec<f64> = (0..20).map(|i| 0.5 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (-x / 2.0).exp()).collect();
        let root = solve_crossing(&xs, &ys, 0.2, CrossingDirection::Increasing, 1000).unwrap();
        assert_eq!(root, None);
    }

    #[test]
    fn test_flat_curve_has_no_crossing() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64 + 1.0).collect();
        let ys = vec![1.0; 10];
        let root = solve_crossing(&xs, &ys, 0.2, CrossingDirection::Decreasing, 1000).unwrap();
        assert_eq!(root, None);
    }

    #[test]
    fn test_non_finite_samples_reported() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, f64::INFINITY, 0.1, 0.05];
        assert_eq!(
            solve_crossing(&xs, &ys, 0.2, CrossingDirection::Decreasing, 1000),
            Err(InterpError::NonFinite)
        );
    }

    #[test]
    fn test_scan_crossing_linear_interpolation() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 0.0, -1.0];
        let root = scan_crossing(&xs, &ys, 0.5, CrossingDirection::Decreasing).unwrap();
        assert_relative_eq!(root, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_resample_density_floor() {
        // Requests below the floor are bumped to MIN_RESAMPLE_POINTS.
        let xs: Vec<f64> = (0..5).map(|i| i as f64 + 1.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 / x).collect();
        let root = solve_crossing(&xs, &ys, 0.5, CrossingDirection::Decreasing, 10)
            .unwrap()
            .unwrap();
        assert_relative_eq!(root, 2.0, epsilon = 1e-2);
    }
}
