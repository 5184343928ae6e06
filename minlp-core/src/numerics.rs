//! Shared numeric helpers.
//!
//! Inner products over dense and sparse views, a symmetric triplet
//! mat-vec, integrality and distance predicates, and the clock-time
//! formatter used by statistics output.

use std::collections::BTreeMap;

/// Sparse coefficient map keyed by variable index.
pub type CoefMap = BTreeMap<usize, f64>;

/// Dense inner product `x . a`.
///
/// The shorter slice decides the length.
pub fn inner_product(x: &[f64], a: &[f64]) -> f64 {
    x.iter().zip(a.iter()).map(|(xi, ai)| xi * ai).sum()
}

/// Inner product of two sparse coefficient maps.
///
/// Walks both maps in index order and multiplies matching entries.
pub fn sparse_inner_product(v1: &CoefMap, v2: &CoefMap) -> f64 {
    let mut i1 = v1.iter().peekable();
    let mut i2 = v2.iter().peekable();
    let mut sum = 0.0;

    while let (Some(&(k1, a)), Some(&(k2, b))) = (i1.peek(), i2.peek()) {
        match k1.cmp(k2) {
            std::cmp::Ordering::Less => {
                i1.next();
            }
            std::cmp::Ordering::Greater => {
                i2.next();
            }
            std::cmp::Ordering::Equal => {
                sum += a * b;
                i1.next();
                i2.next();
            }
        }
    }
    sum
}

/// Inner product of a dense point with a sparse coefficient map.
pub fn sparse_dense_inner_product(x: &[f64], g: &CoefMap) -> f64 {
    g.iter().map(|(&i, &a)| a * x[i]).sum()
}

/// Accumulate `prod += M v` for a symmetric matrix given as triplets of
/// one triangle. Diagonal entries are counted once.
pub fn sym_mat_dot_v(mat: &[f64], irow: &[usize], jcol: &[usize], v: &[f64], prod: &mut [f64]) {
    for ((&m, &i), &j) in mat.iter().zip(irow.iter()).zip(jcol.iter()) {
        if i == j {
            prod[i] += m * v[j];
        } else {
            prod[i] += m * v[j];
            prod[j] += m * v[i];
        }
    }
}

/// True if `v` is within `tol` of an integer.
pub fn is_int(v: f64, tol: f64) -> bool {
    ((v + 0.5).floor() - v).abs() < tol
}

/// Greatest common divisor of two floats, to tolerance `etol`.
///
/// `gcd(d1, 0) = d1`; signs are ignored.
pub fn gcd(d1: f64, d2: f64, etol: f64) -> f64 {
    let mut d1 = d1.abs();
    let mut d2 = d2.abs();

    if d2 < d1 {
        std::mem::swap(&mut d1, &mut d2);
    }
    if d1 < etol {
        return d2;
    }

    loop {
        let rem = d2 % d1;
        d2 = d1;
        d1 = rem;
        if rem <= etol {
            break;
        }
    }
    d2
}

/// Euclidean distance between two points of equal length.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Minimum of a nonempty slice.
pub fn min_array(a: &[f64]) -> f64 {
    a.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Sort an index vector by a parallel value array, keeping both aligned.
///
/// The sort is stable, so equal values keep their input order; this is
/// what makes orderings derived from it deterministic.
pub fn sort_by_values(indices: &mut [usize], values: &mut [f64], ascending: bool) {
    let mut pairs: Vec<(usize, f64)> = indices
        .iter()
        .copied()
        .zip(values.iter().copied())
        .collect();
    if ascending {
        pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
    } else {
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    }
    for (slot, (idx, val)) in pairs.into_iter().enumerate() {
        indices[slot] = idx;
        values[slot] = val;
    }
}

/// Format seconds as `HH:MM:SS:CC` (centiseconds), each field zero-padded
/// to width 2. Hours are unbounded.
pub fn to_clock_time(t: f64) -> String {
    let mut it = (t * 100.0) as i64;
    let hours = it / 360_000;
    it %= 360_000;
    let mins = it / 6_000;
    it %= 6_000;
    let secs = it / 100;
    let centis = it % 100;
    format!("{:02}:{:02}:{:02}:{:02}", hours, mins, secs, centis)
}
