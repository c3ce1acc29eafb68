//! Least squares solver.
//!
//! Every candidate partition fits one small regression per segment:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! with `degree + 1` columns, so thousands of solves per search are routine.
//!
//! We solve through an SVD: the systems are tall (more rows than columns), and
//! rank deficiency shows up directly in the singular values. Singular values
//! below `rel_tol * σ_max` are treated as zero, so the cutoff follows the scale
//! of the design matrix rather than its units. Callers condition the design
//! first (see [`crate::math::polyfit`]), so the looser cutoffs only matter for
//! near-collinear inputs.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoffs, tried from strictest to loosest.
const RELATIVE_TOLERANCES: [f64; 3] = [1e-12, 1e-10, 1e-8];

/// Minimum-norm least squares solution of `x β ≈ y`.
///
/// Returns `None` for an all-zero or non-finite design, or when no cutoff gives
/// a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return None;
    }

    RELATIVE_TOLERANCES.iter().find_map(|&rel| {
        svd.solve(y, rel * sigma_max)
            .ok()
            .filter(|beta| beta.iter().all(|v| v.is_finite()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_averages_overdetermined_noise() {
        // Intercept-only model: β is the mean of y.
        let x = DMatrix::from_element(4, 1, 1.0);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 6.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn cutoff_scales_with_the_design() {
        // Same system as above at 1e-14 scale: every singular value is below
        // any fixed absolute cutoff, but the solve must not zero them out.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]) * 1e-14;
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] / 2e14 - 1.0).abs() < 1e-9);
        assert!((beta[1] / 3e14 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duplicated_column_gives_minimum_norm_solution() {
        let x = DMatrix::from_element(3, 2, 1.0);
        let y = DVector::from_row_slice(&[2.0, 2.0, 2.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-9);
        assert!((beta[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_design_has_no_solution() {
        let x = DMatrix::<f64>::zeros(3, 2);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
