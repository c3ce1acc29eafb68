//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid with deterministic output (golden-testable).
//!
//! Plot elements:
//! - observed points: `o`
//! - outliers (single-segment fits only): `X`
//! - fitted curve: `-`, each segment drawn over its own level range only

use std::collections::HashSet;

use crate::domain::{FitReport, ObservationSeries, Polynomial};

/// Render observations and the fitted segments.
pub fn render_ascii_plot(
    series: &ObservationSeries,
    report: &FitReport,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let first = series.points().first().map_or(0, |p| p.level);
    let last = series.points().last().map_or(first, |p| p.level);
    let (l_min, l_max) = if last > first {
        (first as f64, last as f64)
    } else {
        (first as f64 - 1.0, first as f64 + 1.0)
    };

    let curves: Vec<Vec<(f64, f64)>> = report
        .segments
        .iter()
        .map(|s| {
            let poly = Polynomial {
                coefficients: s.coefficients.clone(),
            };
            sample_segment(&poly, s.level_range[0] as f64, s.level_range[1] as f64, l_min, l_max, width)
        })
        .collect();

    let (y_min, y_max) = y_range(series, &curves).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so points overlay them.
    for curve in &curves {
        draw_curve(&mut grid, curve, l_min, l_max, y_min, y_max);
    }

    let outliers: HashSet<i64> = report
        .outliers
        .iter()
        .flatten()
        .map(|p| p.level)
        .collect();

    for p in series.points() {
        let x = map_x(p.level as f64, l_min, l_max, width);
        let y = map_y(p.value as f64, y_min, y_max, height);
        grid[y][x] = if outliers.contains(&p.level) { 'X' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: level=[{first}, {last}] | value=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

/// One sample per plot column spanned by `[start, end]`.
fn sample_segment(
    poly: &Polynomial,
    start: f64,
    end: f64,
    l_min: f64,
    l_max: f64,
    width: usize,
) -> Vec<(f64, f64)> {
    let cols = (map_x(end, l_min, l_max, width) - map_x(start, l_min, l_max, width)).max(1);
    (0..=cols)
        .map(|i| {
            let t = start + (end - start) * i as f64 / cols as f64;
            (t, poly.evaluate(t))
        })
        .collect()
}

fn y_range(series: &ObservationSeries, curves: &[Vec<(f64, f64)>]) -> Option<(f64, f64)> {
    let ys = series
        .points()
        .iter()
        .map(|p| p.value as f64)
        .chain(curves.iter().flatten().map(|&(_, y)| y));

    let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, '-'),
            None => grid[yy][x] = '-',
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
        {
            if *cell == ' ' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
