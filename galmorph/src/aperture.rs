//! Elliptical and circular aperture geometry with exact sub-pixel weighting.
//!
//! Every statistic in the engine reduces to "sum flux and area of an image
//! restricted to an elliptical region", so this module is the leaf dependency
//! for all of them. Boundary pixels are weighted by the exact geometric
//! overlap between the pixel square and the ellipse, computed analytically:
//! the pixel corners are mapped by the affine transform that carries the
//! ellipse onto the unit circle, and the area of intersection between the
//! resulting parallelogram and the unit disk is evaluated edge by edge with
//! Green's theorem (straight-chord terms inside the disk, circular-arc
//! terms outside). Annulus sums are formed as outer minus inner with the
//! same kernel, so `annulus_area == outer_area - inner_area` holds exactly.
//!
//! Apertures that extend past the image frame are truncated: flux and the
//! weighted pixel area only accumulate over in-bounds pixels, while
//! [`EllipticalAperture::area`] stays analytic. Faint extended sources
//! routinely push annuli off the frame, so truncation is not an error.

use ndarray::ArrayView2;
use std::f64::consts::PI;

/// Pixel half-diagonal, the farthest a pixel corner sits from its center.
const HALF_DIAGONAL: f64 = std::f64::consts::SQRT_2 / 2.0;

/// Flux and weighted area collected from an image restricted to an aperture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApertureSum {
    /// Overlap-weighted sum of pixel values over in-bounds pixels.
    pub flux: f64,
    /// Sum of overlap weights over in-bounds pixels, in pixel units.
    pub area: f64,
}

/// An elliptical aperture described by center, semi-axes and position angle.
///
/// `x` is the column coordinate and `y` the row coordinate of the center,
/// matching the catalog convention. A circle is the degenerate case
/// `a == b`, `theta == 0`.
#[derive(Debug, Clone, Copy)]
pub struct EllipticalAperture {
    /// Center column coordinate.
    pub x: f64,
    /// Center row coordinate.
    pub y: f64,
    /// Semi-major axis in pixels.
    pub a: f64,
    /// Semi-minor axis in pixels.
    pub b: f64,
    /// Position angle in radians, counter-clockwise from +x.
    pub theta: f64,
}

impl EllipticalAperture {
    /// Elliptical aperture at `(x, y)` with semi-axes `a >= b` and position
    /// angle `theta` in radians.
    pub fn new(x: f64, y: f64, a: f64, b: f64, theta: f64) -> Self {
        Self { x, y, a, b, theta }
    }

    /// Circular aperture of radius `r`.
    pub fn circular(x: f64, y: f64, r: f64) -> Self {
        Self::new(x, y, r, r, 0.0)
    }

    /// Analytic enclosed area, `pi * a * b`.
    pub fn area(&self) -> f64 {
        PI * self.a * self.b
    }

    /// Whether the point `(px, py)` lies inside the ellipse boundary.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let (u, v) = self.to_unit_frame(px, py);
        u * u + v * v <= 1.0
    }

    /// Exact overlap between this aperture and the unit pixel centered on
    /// `(px, py)`, as a weight in `[0, 1]`.
    pub fn pixel_overlap(&self, px: f64, py: f64) -> f64 {
        let (uc, vc) = self.to_unit_frame(px, py);
        let center_dist = (uc * uc + vc * vc).sqrt();
        // The affine map scales distances by at most 1/b, so a pixel whose
        // center is farther than 1 + diag/b from the origin in the unit
        // frame cannot touch the disk, and one closer than 1 - diag/b is
        // fully enclosed.
        let reach = HALF_DIAGONAL / self.b;
        if center_dist > 1.0 + reach {
            return 0.0;
        }
        if center_dist < 1.0 - reach {
            return 1.0;
        }

        let corners = [
            self.to_unit_frame(px - 0.5, py - 0.5),
            self.to_unit_frame(px + 0.5, py - 0.5),
            self.to_unit_frame(px + 0.5, py + 0.5),
            self.to_unit_frame(px - 0.5, py + 0.5),
        ];
        let overlap = unit_disk_quad_area(&corners) * self.a * self.b;
        overlap.clamp(0.0, 1.0)
    }

    /// Flux and overlap-weighted area of `image` restricted to the aperture.
    ///
    /// Out-of-bounds portions of the aperture contribute nothing; the
    /// returned `area` therefore reports the in-bounds weighted pixel area,
    /// which is smaller than [`area`](Self::area) for truncated apertures.
    pub fn photometry(&self, image: &ArrayView2<f64>) -> ApertureSum {
        let mut flux = 0.0;
        let mut area = 0.0;
        for (row, col) in self.bounding_box(image.dim()) {
            let weight = self.pixel_overlap(col as f64, row as f64);
            if weight > 0.0 {
                flux += weight * image[[row, col]];
                area += weight;
            }
        }
        ApertureSum { flux, area }
    }

    /// In-bounds pixel indices whose centers fall inside the ellipse.
    ///
    /// This is the binary-mask view of the aperture used by the rank and
    /// moment statistics, which need individual pixel values rather than a
    /// weighted sum.
    pub fn footprint(&self, shape: (usize, usize)) -> Vec<(usize, usize)> {
        self.bounding_box(shape)
            .filter(|&(row, col)| self.contains(col as f64, row as f64))
            .collect()
    }

    /// In-bounds pixel values whose centers fall inside the ellipse.
    pub fn masked_pixels(&self, image: &ArrayView2<f64>) -> Vec<f64> {
        self.footprint(image.dim())
            .into_iter()
            .map(|(row, col)| image[[row, col]])
            .collect()
    }

    fn to_unit_frame(&self, px: f64, py: f64) -> (f64, f64) {
        let dx = px - self.x;
        let dy = py - self.y;
        let (sin_t, cos_t) = self.theta.sin_cos();
        let u = (dx * cos_t + dy * sin_t) / self.a;
        let v = (-dx * sin_t + dy * cos_t) / self.b;
        (u, v)
    }

    /// Iterator over in-bounds pixel indices covering the aperture extent.
    fn bounding_box(
        &self,
        shape: (usize, usize),
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (rows, cols) = shape;
        // The ellipse fits inside the circle of radius a about its center.
        let reach = self.a + 1.0;
        let row_min = ((self.y - reach).floor().max(0.0)) as usize;
        let row_max = ((self.y + reach).ceil().min(rows as f64 - 1.0)).max(0.0) as usize;
        let col_min = ((self.x - reach).floor().max(0.0)) as usize;
        let col_max = ((self.x + reach).ceil().min(cols as f64 - 1.0)).max(0.0) as usize;
        (row_min..=row_max.min(rows.saturating_sub(1)))
            .flat_map(move |row| (col_min..=col_max.min(cols.saturating_sub(1))).map(move |col| (row, col)))
    }
}

/// An elliptical annulus: outer aperture minus a concentric, co-oriented
/// inner aperture with the same axis ratio.
#[derive(Debug, Clone, Copy)]
pub struct EllipticalAnnulus {
    /// Inner boundary.
    pub inner: EllipticalAperture,
    /// Outer boundary.
    pub outer: EllipticalAperture,
}

impl EllipticalAnnulus {
    /// Annulus at `(x, y)` between semi-major radii `a_in` and `a_out`,
    /// with outer semi-minor axis `b_out`. The inner semi-minor axis is
    /// derived so the axis ratio is constant across the annulus.
    pub fn new(x: f64, y: f64, a_in: f64, a_out: f64, b_out: f64, theta: f64) -> Self {
        let b_in = b_out * a_in / a_out;
        Self {
            inner: EllipticalAperture::new(x, y, a_in, b_in, theta),
            outer: EllipticalAperture::new(x, y, a_out, b_out, theta),
        }
    }

    /// Circular annulus between radii `r_in` and `r_out`.
    pub fn circular(x: f64, y: f64, r_in: f64, r_out: f64) -> Self {
        Self::new(x, y, r_in, r_out, r_out, 0.0)
    }

    /// Analytic annulus area, exactly `outer.area() - inner.area()`.
    pub fn area(&self) -> f64 {
        self.outer.area() - self.inner.area()
    }

    /// Flux and weighted area in the annulus, formed as the difference of
    /// the outer and inner aperture sums so the two boundaries are weighted
    /// consistently.
    pub fn photometry(&self, image: &ArrayView2<f64>) -> ApertureSum {
        let outer = self.outer.photometry(image);
        let inner = self.inner.photometry(image);
        ApertureSum {
            flux: outer.flux - inner.flux,
            area: outer.area - inner.area,
        }
    }
}

/// Parallel per-annulus sequences from a batch photometry pass.
#[derive(Debug, Clone, Default)]
pub struct RadialPhotometry {
    /// Outer semi-major radius of each annulus.
    pub radii: Vec<f64>,
    /// Analytic area of each annulus.
    pub areas: Vec<f64>,
    /// Measured flux in each annulus.
    pub fluxes: Vec<f64>,
}

/// Measure a ladder of concentric annuli sharing a center and orientation,
/// returning parallel `(radius, area, flux)` sequences.
pub fn radial_photometry(
    image: &ArrayView2<f64>,
    annuli: &[EllipticalAnnulus],
) -> RadialPhotometry {
    let mut profile = RadialPhotometry::default();
    for annulus in annuli {
        profile.radii.push(annulus.outer.a);
        profile.areas.push(annulus.area());
        profile.fluxes.push(annulus.photometry(image).flux);
    }
    profile
}

/// Log-spaced semi-major radii from 1 px up to half the image size.
///
/// The upper bound is tied to the frame by construction, so no radius in
/// the ladder can run off the edge uncontrolled.
pub fn log_spaced_radii(image_rows: usize, n: usize) -> Vec<f64> {
    debug_assert!(n >= 2);
    let max_exp = (image_rows as f64 / 20.0).log10();
    (0..n)
        .map(|i| {
            let exp = -1.0 + (max_exp + 1.0) * i as f64 / (n - 1) as f64;
            10.0 * 10f64.powf(exp)
        })
        .collect()
}

/// Exact area of intersection between the unit disk and a convex
/// quadrilateral traversed counter-clockwise.
///
/// Green's theorem applied edge by edge: sub-segments inside the disk
/// contribute the triangle term `cross(p, q) / 2`, sub-segments outside
/// contribute the circular sector swept between their endpoint directions.
fn unit_disk_quad_area(quad: &[(f64, f64); 4]) -> f64 {
    let mut area = 0.0;
    for i in 0..4 {
        let (ax, ay) = quad[i];
        let (bx, by) = quad[(i + 1) % 4];
        area += edge_contribution(ax, ay, bx, by);
    }
    area
}

fn edge_contribution(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let qa = dx * dx + dy * dy;
    if qa == 0.0 {
        return 0.0;
    }
    // |a + t d|^2 = 1 as a quadratic in t, with qb the half-coefficient.
    let qb = ax * dx + ay * dy;
    let qc = ax * ax + ay * ay - 1.0;
    let disc = qb * qb - qa * qc;

    let mut cuts = [0.0_f64, 1.0, 1.0, 1.0];
    let mut n_cuts = 1;
    if disc > 0.0 {
        let sqrt_disc = disc.sqrt();
        for t in [(-qb - sqrt_disc) / qa, (-qb + sqrt_disc) / qa] {
            if t > 0.0 && t < 1.0 {
                cuts[n_cuts] = t;
                n_cuts += 1;
            }
        }
    }
    cuts[n_cuts] = 1.0;
    n_cuts += 1;

    let mut total = 0.0;
    for w in 0..n_cuts - 1 {
        let t0 = cuts[w];
        let t1 = cuts[w + 1];
        if t1 <= t0 {
            continue;
        }
        let px = ax + t0 * dx;
        let py = ay + t0 * dy;
        let qx = ax + t1 * dx;
        let qy = ay + t1 * dy;
        let tm = 0.5 * (t0 + t1);
        let mx = ax + tm * dx;
        let my = ay + tm * dy;
        if mx * mx + my * my <= 1.0 {
            total += 0.5 * (px * qy - py * qx);
        } else {
            let mut sweep = qy.atan2(qx) - py.atan2(px);
            if sweep <= -PI {
                sweep += 2.0 * PI;
            } else if sweep > PI {
                sweep -= 2.0 * PI;
            }
            total += 0.5 * sweep;
        }
    }
    total
}
