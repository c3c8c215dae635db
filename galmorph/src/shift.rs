//! Array shifting and rotation primitives for the minimization searches.
//!
//! Sub-pixel shifts use bilinear resampling with zero fill outside the
//! frame; integer shifts wrap around, matching the toroidal indexing the
//! background-asymmetry and moment searches rely on.

use ndarray::{Array2, ArrayView2};

/// Shift an image by a sub-pixel offset `(dx, dy)` (columns, rows) using
/// bilinear resampling.
///
/// Output pixel `(r, c)` samples the input at `(r - dy, c - dx)`, so a
/// positive offset moves image content toward larger indices. Samples
/// falling outside the frame read as zero.
pub fn shift_bilinear(image: &ArrayView2<f64>, dx: f64, dy: f64) -> Array2<f64> {
    let (rows, cols) = image.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let src_y = r as f64 - dy;
        let src_x = c as f64 - dx;
        sample_bilinear(image, src_x, src_y)
    })
}

/// Rotate an image by 180 degrees (flip both axes).
pub fn rotate_180(image: &ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = image.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| image[[rows - 1 - r, cols - 1 - c]])
}

/// Shift an image by an integer offset with wrap-around indexing.
///
/// Output pixel `(r, c)` reads input pixel `((r + dr) mod rows,
/// (c + dc) mod cols)`.
pub fn shift_wrapped(image: &ArrayView2<f64>, dr: i64, dc: i64) -> Array2<f64> {
    let (rows, cols) = image.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let src_r = (r as i64 + dr).rem_euclid(rows as i64) as usize;
        let src_c = (c as i64 + dc).rem_euclid(cols as i64) as usize;
        image[[src_r, src_c]]
    })
}

fn sample_bilinear(image: &ArrayView2<f64>, x: f64, y: f64) -> f64 {
    let (rows, cols) = image.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;

    let fetch = |r: f64, c: f64| -> f64 {
        if r < 0.0 || c < 0.0 || r >= rows as f64 || c >= cols as f64 {
            0.0
        } else {
            image[[r as usize, c as usize]]
        }
    };

    let q00 = fetch(y0, x0);
    let q01 = fetch(y0, x0 + 1.0);
    let q10 = fetch(y0 + 1.0, x0);
    let q11 = fetch(y0 + 1.0, x0 + 1.0);

    q00 * (1.0 - tx) * (1.0 - ty)
        + q01 * tx * (1.0 - ty)
        + q10 * (1.0 - tx) * ty
        + q11 * tx * ty
}
