//! Polynomial helpers: evaluation, design rows and a conditioned polyfit.
//!
//! Levels run into the hundreds, so a raw Vandermonde matrix (`level^3` next to
//! `1`) is badly conditioned. We fit in a centered/scaled variable
//!
//! `u = (x - c) / s`, with `c` the midpoint and `s` the half-width of the x range
//!
//! and expand the result back into plain monomial coefficients of `x`.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Output of [`polyfit`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolyfitOutput {
    /// Coefficients in `x`, highest degree first.
    pub coefficients: Vec<f64>,
    /// Fitted values at the input `xs`.
    pub predictions: Vec<f64>,
}

/// Evaluate a polynomial given highest-degree-first coefficients.
pub fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Fill a design row of ascending powers: `[1, u, u^2, ...]`.
///
/// # Panics
/// Panics if `out` is empty. Callers size it as `degree + 1`.
pub fn fill_design_row(u: f64, out: &mut [f64]) {
    out[0] = 1.0;
    for j in 1..out.len() {
        out[j] = out[j - 1] * u;
    }
}

/// Ordinary least-squares polynomial fit of `ys` on `xs`.
///
/// Returns `None` when there are fewer than `degree + 1` points (or `degree + 1`
/// overflows), the inputs are not finite, or the solve fails.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<PolyfitOutput> {
    let n = xs.len();
    let p = degree.checked_add(1)?;
    if n != ys.len() || n < p {
        return None;
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let (x_min, x_max) = xs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    let center = (x_min + x_max) / 2.0;
    let scale = if x_max > x_min { (x_max - x_min) / 2.0 } else { 1.0 };

    let mut design = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, &x) in xs.iter().enumerate() {
        fill_design_row((x - center) / scale, &mut row);
        for j in 0..p {
            design[(i, j)] = row[j];
        }
    }
    let y = DVector::from_column_slice(ys);

    let beta = solve_least_squares(&design, &y)?;
    let fitted = &design * &beta;

    let ascending = expand_shifted(beta.as_slice(), center, scale);
    let coefficients: Vec<f64> = ascending.into_iter().rev().collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }

    Some(PolyfitOutput {
        coefficients,
        predictions: fitted.iter().copied().collect(),
    })
}

/// Rewrite `Σ b_k ((x - c)/s)^k` as ascending monomial coefficients in `x`.
fn expand_shifted(b: &[f64], c: f64, s: f64) -> Vec<f64> {
    let p = b.len();
    let mut a = vec![0.0; p];
    for (k, &bk) in b.iter().enumerate() {
        let scaled = bk / s.powi(k as i32);
        // (x - c)^k = Σ_j C(k, j) x^j (-c)^(k-j)
        let mut binom = 1.0;
        for j in 0..=k {
            a[j] += scaled * binom * (-c).powi((k - j) as i32);
            binom = binom * (k - j) as f64 / (j + 1) as f64;
        }
    }
    a
}
