//! Per-image affine transform: fit from control points, apply to the rest.
//!
//! Each map-sheet image gets its own transform from pixel space to Web
//! Mercator meters, fitted from the records on that image with surveyed
//! coordinates:
//!
//! 1. Flip pixel y (`flipped_y = max_y - y`) — pixel row 0 is the top of the
//!    image while projected y grows upward.
//! 2. Fit `projected = slope · pixel + intercept` independently per axis by
//!    ordinary least squares (x against unflipped pixel x, y against flipped
//!    pixel y).
//!
//! The per-axis fit deliberately ignores rotation/shear coupling between the
//! axes; sheets are scanned axis-aligned and the approximation holds to
//! within survey accuracy.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// A control point: unit-normalized pixel position paired with the Web
/// Mercator projection of its surveyed coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub px: i64,
    pub py: i64,
    /// EPSG:3857 meters.
    pub mercator: (f64, f64),
}

/// Fitted pixel→mercator transform for one map-sheet image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetTransform {
    /// Maximum unit-normalized pixel y over the image's known-coordinate
    /// records; the baseline of the vertical flip.
    pub max_y: i64,
    pub x_slope: f64,
    pub x_intercept: f64,
    pub y_slope: f64,
    pub y_intercept: f64,
}

impl SheetTransform {
    /// Fit a transform from an image group's control points.
    ///
    /// `max_y` must be computed over all of the group's known-coordinate
    /// records, including any whose projection failed and therefore never
    /// became a [`ControlPoint`].
    ///
    /// Returns `None` with fewer than two control points or when the x-axis
    /// regression is degenerate (all control points share one pixel x). When
    /// every control point shares one flipped y — control points digitized on
    /// a single sheet row — the y regression is rank deficient and its
    /// minimum-norm solution is the constant fit, which is used instead of
    /// rejecting the group.
    pub fn fit(control: &[ControlPoint], max_y: i64) -> Option<Self> {
        if control.len() < 2 {
            return None;
        }

        let x_pixels: Vec<f64> = control.iter().map(|c| c.px as f64).collect();
        let y_flipped: Vec<f64> = control.iter().map(|c| (max_y - c.py) as f64).collect();
        let merc_x: Vec<f64> = control.iter().map(|c| c.mercator.0).collect();
        let merc_y: Vec<f64> = control.iter().map(|c| c.mercator.1).collect();

        let (x_slope, x_intercept) = match fit_axis(&x_pixels, &merc_x) {
            Some(fit) => fit,
            None => {
                debug!("x regression degenerate over {} control points", control.len());
                return None;
            }
        };

        let (y_slope, y_intercept) = match fit_axis(&y_flipped, &merc_y) {
            Some(fit) => fit,
            None => {
                let mean = merc_y.iter().sum::<f64>() / merc_y.len() as f64;
                (0.0, mean)
            }
        };

        Some(Self {
            max_y,
            x_slope,
            x_intercept,
            y_slope,
            y_intercept,
        })
    }

    /// `flipped_y = max_y - pixel_y`.
    pub fn flip_y(&self, py: i64) -> i64 {
        self.max_y - py
    }

    /// Map a unit-normalized pixel coordinate to EPSG:3857 meters.
    pub fn apply(&self, px: i64, py: i64) -> (f64, f64) {
        let flipped = self.flip_y(py);
        (
            self.x_slope * px as f64 + self.x_intercept,
            self.y_slope * flipped as f64 + self.y_intercept,
        )
    }
}

/// Ordinary least squares for one axis: `projected = slope · pixel + intercept`.
///
/// Solved via SVD of the 2-column design matrix `[pixel, 1]`. A rank-deficient
/// design (all pixel values identical) admits no unique line and is reported
/// as `None` rather than the minimum-norm solution the SVD would return.
fn fit_axis(pixels: &[f64], projected: &[f64]) -> Option<(f64, f64)> {
    debug_assert_eq!(pixels.len(), projected.len());
    if pixels.len() < 2 {
        return None;
    }

    let mut a = DMatrix::<f64>::from_element(pixels.len(), 2, 1.0);
    for (i, &p) in pixels.iter().enumerate() {
        a[(i, 0)] = p;
    }
    let b = DVector::<f64>::from_column_slice(projected);

    let svd = a.svd(true, true);
    let sigma_max = svd.singular_values.iter().fold(0.0_f64, |m, &s| m.max(s));
    let sigma_min = svd
        .singular_values
        .iter()
        .fold(f64::INFINITY, |m, &s| m.min(s));
    if sigma_max <= 0.0 || sigma_min <= sigma_max * 1e-12 {
        return None;
    }

    let sol = svd.solve(&b, 1e-12).ok()?;
    Some((sol[0], sol[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(px: i64, py: i64, mx: f64, my: f64) -> ControlPoint {
        ControlPoint {
            px,
            py,
            mercator: (mx, my),
        }
    }

    #[test]
    fn test_vertical_flip() {
        let t = SheetTransform {
            max_y: 500,
            x_slope: 1.0,
            x_intercept: 0.0,
            y_slope: 1.0,
            y_intercept: 0.0,
        };
        assert_eq!(t.flip_y(120), 380);
    }

    #[test]
    fn test_two_point_fit_is_exact() {
        // x: 10 → 1000, 110 → 2000 ⇒ slope 10, intercept 900.
        // y (flipped from max_y = 200): 0 → 50, 100 → 150 ⇒ slope 1, intercept 50.
        let control = [cp(10, 200, 1000.0, 50.0), cp(110, 100, 2000.0, 150.0)];
        let t = SheetTransform::fit(&control, 200).unwrap();

        assert!((t.x_slope - 10.0).abs() < 1e-9, "x_slope = {}", t.x_slope);
        assert!((t.x_intercept - 900.0).abs() < 1e-6);
        assert!((t.y_slope - 1.0).abs() < 1e-9, "y_slope = {}", t.y_slope);
        assert!((t.y_intercept - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_reproduces_control_points() {
        // Three collinear-in-model points with a touch of redundancy.
        let control = [
            cp(0, 300, 100.0, 40.0),
            cp(150, 150, 400.0, 340.0),
            cp(300, 0, 700.0, 640.0),
        ];
        let t = SheetTransform::fit(&control, 300).unwrap();

        for c in &control {
            let (x, y) = t.apply(c.px, c.py);
            assert!(
                (x - c.mercator.0).abs() < 1e-6 && (y - c.mercator.1).abs() < 1e-6,
                "residual at ({}, {}): ({x}, {y}) vs {:?}",
                c.px,
                c.py,
                c.mercator
            );
        }
    }

    #[test]
    fn test_least_squares_over_noisy_points() {
        // Truth: x = 2·px + 10. Perturb one observation; the LS line must
        // split the residual rather than chase it.
        let control = [
            cp(0, 0, 10.0, 0.0),
            cp(100, 10, 210.0, 100.0),
            cp(200, 20, 412.0, 200.0),
        ];
        let t = SheetTransform::fit(&control, 20).unwrap();
        assert!((t.x_slope - 2.0).abs() < 0.02, "x_slope = {}", t.x_slope);
        assert!((t.x_intercept - 10.0).abs() < 2.0);
    }

    #[test]
    fn test_identical_pixel_x_yields_no_transform() {
        let control = [cp(5, 5, 100.0, 200.0), cp(5, 5, 300.0, 400.0)];
        assert_eq!(SheetTransform::fit(&control, 5), None);
    }

    #[test]
    fn test_shared_sheet_row_uses_constant_y_fit() {
        // Both control points at pixel y = 10 ⇒ flipped y = 0 for both; the y
        // axis degrades to the mean while x still fits.
        let control = [cp(10, 10, 100.0, 50.0), cp(100, 10, 1000.0, 54.0)];
        let t = SheetTransform::fit(&control, 10).unwrap();

        assert!((t.x_slope - 10.0).abs() < 1e-9);
        assert_eq!(t.y_slope, 0.0);
        assert!((t.y_intercept - 52.0).abs() < 1e-9);

        let (x, y) = t.apply(55, 10);
        assert!((x - 550.0).abs() < 1e-6);
        assert!((y - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_control_point_is_not_enough() {
        let control = [cp(10, 10, 100.0, 50.0)];
        assert_eq!(SheetTransform::fit(&control, 10), None);
    }
}
