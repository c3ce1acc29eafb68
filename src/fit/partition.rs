//! Partition enumeration.
//!
//! A partition of `n` ordered points into `k` contiguous segments of at least
//! `m` points each is an integer composition `n = s_1 + ... + s_k` with every
//! `s_i >= m`. We enumerate compositions in lexicographic order of the segment
//! sizes, which is exactly the order of the recursive definition:
//!
//! - choose the first size from `m` up to `n - m (k - 1)`
//! - recurse on the remaining points with `k - 1` segments
//!
//! The order matters: the selector breaks score ties in favor of the
//! partition generated first.

use crate::domain::Partition;

/// Number of partitions the enumerator yields: `C(n - k m + k - 1, k - 1)`.
///
/// Returns `0` when no composition exists. Saturates at `u128::MAX`.
pub fn count_partitions(n: usize, k: usize, m: usize) -> u128 {
    if k == 0 {
        return 0;
    }
    let Some(required) = k.checked_mul(m) else {
        return 0;
    };
    if n < required {
        return 0;
    }
    let slack = (n - required) as u128;
    binomial(slack + (k as u128) - 1, (k as u128) - 1)
}

fn binomial(n: u128, r: u128) -> u128 {
    let r = r.min(n - r);
    let mut acc: u128 = 1;
    for i in 0..r {
        // acc * (n - i) / (i + 1) stays integral at every step.
        acc = match acc.checked_mul(n - i) {
            Some(v) => v / (i + 1),
            None => return u128::MAX,
        };
    }
    acc
}

/// Lazy enumerator over all partitions, in generation order.
#[derive(Debug, Clone)]
pub struct Partitions {
    n: usize,
    m: usize,
    sizes: Option<Vec<usize>>,
}

impl Partitions {
    pub fn new(n: usize, k: usize, m: usize) -> Self {
        let feasible = k >= 1 && k.checked_mul(m).is_some_and(|req| req <= n);
        let sizes = feasible.then(|| {
            let mut sizes = vec![m; k];
            sizes[k - 1] = n - m * (k - 1);
            sizes
        });
        Self { n, m, sizes }
    }

    /// Advance `sizes` to the next composition in lexicographic order.
    fn advance(sizes: &mut [usize], n: usize, m: usize) -> bool {
        let k = sizes.len();
        if k < 2 {
            return false;
        }
        // Rightmost position (excluding the last) whose size can still grow
        // while leaving `m` points for every later segment.
        let mut prefix: usize = sizes.iter().sum::<usize>() - sizes[k - 1];
        for i in (0..k - 1).rev() {
            prefix -= sizes[i];
            let later = k - 1 - i;
            let used = prefix + sizes[i] + 1;
            if used + later * m <= n {
                sizes[i] += 1;
                for s in sizes.iter_mut().take(k - 1).skip(i + 1) {
                    *s = m;
                }
                let head: usize = sizes[..k - 1].iter().sum();
                sizes[k - 1] = n - head;
                return true;
            }
        }
        false
    }
}

impl Iterator for Partitions {
    type Item = Partition;

    fn next(&mut self) -> Option<Self::Item> {
        let sizes = self.sizes.as_mut()?;
        let mut splits = Vec::with_capacity(sizes.len() - 1);
        let mut acc = 0;
        for &s in &sizes[..sizes.len() - 1] {
            acc += s;
            splits.push(acc);
        }
        if !Self::advance(sizes, self.n, self.m) {
            self.sizes = None;
        }
        Some(Partition { splits })
    }
}

/// Collect every partition of `n` points into `k` segments of size `>= m`.
///
/// Empty when no composition exists; exactly one (no splits) when `k == 1`.
pub fn enumerate_partitions(n: usize, k: usize, m: usize) -> Vec<Partition> {
    Partitions::new(n, k, m).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Direct transcription of the recursive definition, for cross-checking.
    fn recursive(n: usize, k: usize, m: usize) -> Vec<Vec<usize>> {
        if k == 1 {
            return if n >= m { vec![vec![]] } else { vec![] };
        }
        let mut out = Vec::new();
        if n < m * k {
            return out;
        }
        for first in m..=(n - m * (k - 1)) {
            for rest in recursive(n - first, k - 1, m) {
                let mut splits = vec![first];
                splits.extend(rest.iter().map(|s| s + first));
                out.push(splits);
            }
        }
        out
    }

    #[test]
    fn single_segment_is_whole_series() {
        assert_eq!(enumerate_partitions(5, 1, 2), vec![Partition::whole()]);
        assert_eq!(count_partitions(5, 1, 2), 1);
    }

    #[test]
    fn infeasible_yields_nothing() {
        assert!(enumerate_partitions(3, 2, 2).is_empty());
        assert_eq!(count_partitions(3, 2, 2), 0);
        assert!(enumerate_partitions(4, 0, 1).is_empty());
        assert!(enumerate_partitions(1, 1, 2).is_empty());
    }

    #[test]
    fn matches_recursive_definition_in_order() {
        for n in 1..=14 {
            for k in 1..=4 {
                for m in 1..=4 {
                    let lazy: Vec<Vec<usize>> = enumerate_partitions(n, k, m)
                        .into_iter()
                        .map(|p| p.splits)
                        .collect();
                    assert_eq!(lazy, recursive(n, k, m), "n={n} k={k} m={m}");
                    assert_eq!(lazy.len() as u128, count_partitions(n, k, m));
                }
            }
        }
    }

    #[test]
    fn partitions_are_distinct_and_respect_min_size() {
        let n = 20;
        let m = 3;
        let all = enumerate_partitions(n, 3, m);
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(unique.len(), all.len());
        for p in &all {
            assert_eq!(p.splits.len(), 2);
            for seg in p.segments(n) {
                assert!(seg.len() >= m);
            }
        }
    }

    #[test]
    fn first_partition_has_smallest_leading_segment() {
        let all = enumerate_partitions(10, 3, 2);
        assert_eq!(all.first().unwrap().splits, vec![2, 4]);
        assert_eq!(all.last().unwrap().splits, vec![6, 8]);
    }

    #[test]
    fn count_saturates_instead_of_overflowing() {
        assert_eq!(count_partitions(10_000, 4, 1), 166_566_684_999);
        assert!(count_partitions(usize::MAX / 2, 40, 1) > 0);
    }
}
