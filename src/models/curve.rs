//! Segmented curve evaluator.
//!
//! Each piece covers the levels from its start level up to the next piece's
//! start. Levels below the first start fall back to the first piece, and
//! levels below [`FIRST_LEVEL`] are worth nothing. A piece
//! may carry a safety margin in percent, applied multiplicatively, and any
//! level can be pinned to an exact value (the hand-authored low levels).

use std::collections::BTreeMap;

use crate::domain::{CurveFile, FitReport, Polynomial, ReferenceCurve};
use crate::error::FitError;

/// Lowest level with a value; anything below evaluates to 0.
pub const FIRST_LEVEL: i64 = 1;

/// One polynomial piece of a [`SegmentedCurve`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePiece {
    pub start_level: i64,
    pub poly: Polynomial,
    /// Percent added on top of the polynomial, e.g. `1.8` -> `x 1.018`.
    pub margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCurve {
    pieces: Vec<CurvePiece>,
    exact: BTreeMap<i64, i64>,
}

impl SegmentedCurve {
    /// Build from `(start_level, polynomial)` pairs with no margins.
    pub fn new(pieces: Vec<(i64, Polynomial)>) -> Result<Self, FitError> {
        if pieces.is_empty() {
            return Err(FitError::invalid("curve must have at least one segment"));
        }
        if pieces.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(FitError::invalid(
                "curve segment start levels must be strictly ascending",
            ));
        }
        if let Some((level, _)) = pieces.iter().find(|(_, p)| p.coefficients.is_empty()) {
            return Err(FitError::invalid(format!(
                "curve segment starting at level {level} has no coefficients"
            )));
        }
        Ok(Self {
            pieces: pieces
                .into_iter()
                .map(|(start_level, poly)| CurvePiece {
                    start_level,
                    poly,
                    margin_pct: 0.0,
                })
                .collect(),
            exact: BTreeMap::new(),
        })
    }

    pub fn from_report(report: &FitReport) -> Result<Self, FitError> {
        Self::new(
            report
                .segments
                .iter()
                .map(|s| {
                    (
                        s.level_range[0],
                        Polynomial {
                            coefficients: s.coefficients.clone(),
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn from_curve_file(curve: &CurveFile) -> Result<Self, FitError> {
        Self::new(
            curve
                .segments
                .iter()
                .map(|s| {
                    (
                        s.level_range[0],
                        Polynomial {
                            coefficients: s.coefficients.clone(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Set per-segment margins in percent.
    ///
    /// A single value applies to every segment; otherwise one value per
    /// segment is required.
    pub fn with_margins(mut self, margins_pct: &[f64]) -> Result<Self, FitError> {
        if margins_pct.iter().any(|m| !m.is_finite()) {
            return Err(FitError::invalid("margins must be finite"));
        }
        match margins_pct {
            [] => {}
            [all] => {
                for piece in &mut self.pieces {
                    piece.margin_pct = *all;
                }
            }
            many if many.len() == self.pieces.len() => {
                for (piece, m) in self.pieces.iter_mut().zip(many) {
                    piece.margin_pct = *m;
                }
            }
            many => {
                return Err(FitError::invalid(format!(
                    "expected 1 or {} margins, got {}",
                    self.pieces.len(),
                    many.len()
                )));
            }
        }
        Ok(self)
    }

    /// Pin exact values for specific levels. Later entries win.
    pub fn with_exact(mut self, table: impl IntoIterator<Item = (i64, i64)>) -> Self {
        self.exact.extend(table);
        self
    }

    pub fn pieces(&self) -> &[CurvePiece] {
        &self.pieces
    }

    /// Index of the piece responsible for `level`.
    pub fn piece_index(&self, level: i64) -> usize {
        self.pieces
            .partition_point(|p| p.start_level <= level)
            .saturating_sub(1)
    }

    /// Unrounded value at `level`, margin included.
    pub fn evaluate(&self, level: i64) -> f64 {
        if level < FIRST_LEVEL {
            return 0.0;
        }
        if let Some(&v) = self.exact.get(&level) {
            return v as f64;
        }
        let piece = &self.pieces[self.piece_index(level)];
        piece.poly.evaluate(level as f64) * (1.0 + piece.margin_pct / 100.0)
    }

    /// Value at `level` rounded to the nearest integer.
    pub fn value_at(&self, level: i64) -> i64 {
        self.evaluate(level).round() as i64
    }
}

fn cubic(c: [f64; 4]) -> Polynomial {
    Polynomial {
        coefficients: c.to_vec(),
    }
}

fn exact_table(values: [i64; 10]) -> impl Iterator<Item = (i64, i64)> {
    (1..=10).zip(values)
}

pub fn reference_curve(kind: ReferenceCurve) -> SegmentedCurve {
    match kind {
        ReferenceCurve::Character => character_reference(),
        ReferenceCurve::Specialization => specialization_reference(),
    }
}

/// Shipped character XP curve: one cubic from level 11 with a 1.8% margin.
pub fn character_reference() -> SegmentedCurve {
    SegmentedCurve {
        pieces: vec![CurvePiece {
            start_level: 11,
            poly: cubic([20.43597, 445.42202, -5301.02934, 27953.516161]),
            margin_pct: 1.8,
        }],
        exact: BTreeMap::new(),
    }
    .with_exact(exact_table([
        0, 857, 1740, 3349, 5875, 9496, 14385, 20707, 28625, 38297,
    ]))
}

/// Shipped specialization XP curve: four cubics split at 32, 201 and 500.
pub fn specialization_reference() -> SegmentedCurve {
    let piece = |start_level, c, margin_pct| CurvePiece {
        start_level,
        poly: cubic(c),
        margin_pct,
    };
    SegmentedCurve {
        pieces: vec![
            piece(11, [83.390778, -2314.676389, 41061.771085, -216525.913214], 1.8),
            piece(32, [20.903278, 1701.31766, -74334.753724, 1403361.683375], 2.6),
            piece(201, [16.708444, 4297.272805, -645890.804295, 46158303.367444], 0.01),
            piece(500, [14.960904, 6708.446543, -1773218.961259, 224787945.740717], 0.001),
        ],
        exact: BTreeMap::new(),
    }
    .with_exact(exact_table([
        0, 1143, 2320, 4466, 7834, 12662, 19180, 27609, 38167, 51062,
    ]))
}
