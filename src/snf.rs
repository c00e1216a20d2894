// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Smith normal forms.
//!
//! The Smith normal form of an m x n integer matrix A is the unique
//! matrix S = U A V (U, V unimodular) which is diagonal, with
//! nonnegative diagonal entries d_1 | d_2 | ... | d_r
//! (zeros come last). It has the shape of A.
//!
//! Two algorithms are available: elimination by gcd row and column
//! combinations (in the manner of Kannan and Bachem) and reduction
//! modulo a multiple D of the determinant (Iliopoulos) for
//! nonsingular square matrices: in that case the row lattice contains
//! D Z^n and all computations can be done modulo D.
//!
//! Reference:
//! Costas S. Iliopoulos, Worst-case complexity bounds on algorithms for
//! computing the canonical structure of finite abelian groups and the
//! Hermite and Smith normal forms of an integer matrix (1989)

use std::cmp::min;

use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::arith_gcd::{eliminate, xgcd, Mat22};
use crate::det::det;
use crate::hnf::{row_combine, row_negate};
use crate::{Error, Int, IntMatrix, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnfStrategy {
    KannanBachem,
    Iliopoulos,
}

/// Below this dimension (depending on entry size) gcd elimination
/// is used without computing a determinant.
pub fn iliopoulos_min_dim(bits: u64) -> usize {
    match bits {
        0..=2 => 15,
        3..=8 => 13,
        9..=32 => 11,
        33..=64 => 10,
        _ => 9,
    }
}

pub fn select_strategy(m: usize, n: usize, bits: u64) -> SnfStrategy {
    if m == n && n >= iliopoulos_min_dim(bits) {
        SnfStrategy::Iliopoulos
    } else {
        SnfStrategy::KannanBachem
    }
}

/// The Smith normal form of a matrix.
pub fn snf(a: &IntMatrix) -> Result<IntMatrix> {
    let strategy = select_strategy(a.nrows(), a.ncols(), a.max_bits());
    log::debug!("snf {}x{}: {strategy:?}", a.nrows(), a.ncols());
    match strategy {
        SnfStrategy::KannanBachem => Ok(snf_kannan_bachem(a)),
        SnfStrategy::Iliopoulos => {
            let d = det(a)?.abs();
            if d.is_zero() {
                log::debug!("snf: singular input");
                return Ok(snf_kannan_bachem(a));
            }
            snf_iliopoulos(a, &d)
        }
    }
}

/// A matrix being reduced, with optional transforms such that
/// U A V = S at all times.
struct Reduction {
    s: IntMatrix,
    u: Option<IntMatrix>,
    v: Option<IntMatrix>,
    modulus: Option<Int>,
}

fn col_combine(h: &mut IntMatrix, i: usize, j: usize, m: &Mat22) {
    for r in 0..h.nrows() {
        let (x, y) = (&h[(r, i)], &h[(r, j)]);
        if x.is_zero() && y.is_zero() {
            continue;
        }
        let (x, y) = m.apply(x, y);
        h[(r, i)] = x;
        h[(r, j)] = y;
    }
}

impl Reduction {
    fn new(a: &IntMatrix, transforms: bool) -> Self {
        let (m, n) = a.shape();
        Reduction {
            s: a.clone(),
            u: transforms.then(|| IntMatrix::identity(m)),
            v: transforms.then(|| IntMatrix::identity(n)),
            modulus: None,
        }
    }

    fn with_modulus(a: &IntMatrix, d: &Int) -> Self {
        let mut s = a.clone();
        for x in s.data_mut() {
            *x = x.mod_floor(d);
        }
        Reduction {
            s,
            u: None,
            v: None,
            modulus: Some(d.clone()),
        }
    }

    /// (row i, row j) = M (row i, row j)
    fn left(&mut self, m: &Mat22, i: usize, j: usize) {
        row_combine(&mut self.s, i, j, m);
        if let Some(u) = self.u.as_mut() {
            row_combine(u, i, j, m);
        }
        if let Some(d) = &self.modulus {
            for k in [i, j] {
                for x in self.s.row_mut(k) {
                    *x = x.mod_floor(d);
                }
            }
        }
    }

    /// (col i, col j) = M (col i, col j)
    fn right(&mut self, m: &Mat22, i: usize, j: usize) {
        col_combine(&mut self.s, i, j, m);
        if let Some(v) = self.v.as_mut() {
            col_combine(v, i, j, m);
        }
        if let Some(d) = &self.modulus {
            for r in 0..self.s.nrows() {
                for k in [i, j] {
                    let x = &mut self.s[(r, k)];
                    *x = x.mod_floor(d);
                }
            }
        }
    }

    fn swap_rows(&mut self, i: usize, j: usize) {
        self.s.swap_rows(i, j);
        if let Some(u) = self.u.as_mut() {
            u.swap_rows(i, j);
        }
    }

    fn swap_cols(&mut self, i: usize, j: usize) {
        self.s.swap_cols(i, j);
        if let Some(v) = self.v.as_mut() {
            v.swap_cols(i, j);
        }
    }

    fn negate_row(&mut self, i: usize) {
        row_negate(&mut self.s, i);
        if let Some(u) = self.u.as_mut() {
            row_negate(u, i);
        }
    }

    /// Move the smallest nonzero entry of the trailing submatrix to (k, k).
    fn select_pivot(&mut self, k: usize) -> bool {
        let (m, n) = self.s.shape();
        let mut best: Option<(usize, usize)> = None;
        for i in k..m {
            for j in k..n {
                let x = &self.s[(i, j)];
                if x.is_zero() {
                    continue;
                }
                if best.map_or(true, |(bi, bj)| x.magnitude() < self.s[(bi, bj)].magnitude()) {
                    best = Some((i, j));
                }
            }
        }
        let Some((i, j)) = best else {
            return false;
        };
        self.swap_rows(k, i);
        self.swap_cols(k, j);
        true
    }

    /// Clear row k and column k except for the pivot.
    fn clear_pivot(&mut self, k: usize) {
        let (m, n) = self.s.shape();
        loop {
            for i in k + 1..m {
                if self.s[(i, k)].is_zero() {
                    continue;
                }
                let (_, mat) = eliminate(&self.s[(k, k)], &self.s[(i, k)]);
                self.left(&mat, k, i);
            }
            let mut changed = false;
            for j in k + 1..n {
                if self.s[(k, j)].is_zero() {
                    continue;
                }
                let (_, mat) = eliminate(&self.s[(k, k)], &self.s[(k, j)]);
                self.right(&mat, k, j);
                changed = true;
            }
            if !changed || (k + 1..m).all(|i| self.s[(i, k)].is_zero()) {
                break;
            }
        }
    }

    /// Enforce the divisibility chain on a diagonal matrix
    /// and make diagonal entries nonnegative.
    fn normalize_diagonal(&mut self) {
        let r = min(self.s.nrows(), self.s.ncols());
        for i in 0..r {
            for j in i + 1..r {
                let (x, y) = (&self.s[(i, i)], &self.s[(j, j)]);
                if y.is_zero() || (!x.is_zero() && y.is_multiple_of(x)) {
                    continue;
                }
                // [1 1; -tb sa] diag(x, y) [s -b; t a] = diag(g, xy/g)
                let (g, s, t) = xgcd(x, y);
                let (a, b) = (x / &g, y / &g);
                let l = Mat22 {
                    m11: Int::one(),
                    m12: Int::one(),
                    m21: -(&t * &b),
                    m22: &s * &a,
                    det: 1,
                };
                let rt = Mat22 {
                    m11: s,
                    m12: t,
                    m21: -b,
                    m22: a,
                    det: 1,
                };
                self.left(&l, i, j);
                self.right(&rt, i, j);
                debug_assert!(self.s[(i, i)] == g && self.s[(i, j)].is_zero());
            }
        }
        for i in 0..r {
            if self.s[(i, i)].is_negative() {
                self.negate_row(i);
            }
        }
    }
}

fn kannan_bachem(a: &IntMatrix, transforms: bool) -> Reduction {
    let mut red = Reduction::new(a, transforms);
    let r = min(a.nrows(), a.ncols());
    for k in 0..r {
        if !red.select_pivot(k) {
            break;
        }
        red.clear_pivot(k);
    }
    red.normalize_diagonal();
    red
}

/// Smith normal form by gcd elimination on rows and columns.
pub fn snf_kannan_bachem(a: &IntMatrix) -> IntMatrix {
    kannan_bachem(a, false).s
}

/// Smith normal form S and unimodular U, V such that U A V = S.
pub fn snf_transform(a: &IntMatrix) -> (IntMatrix, IntMatrix, IntMatrix) {
    let red = kannan_bachem(a, true);
    let (m, n) = a.shape();
    (
        red.s,
        red.u.unwrap_or_else(|| IntMatrix::identity(m)),
        red.v.unwrap_or_else(|| IntMatrix::identity(n)),
    )
}

/// Smith normal form of a nonsingular square matrix using
/// arithmetic modulo d, a positive multiple of |det A|.
pub fn snf_iliopoulos(a: &IntMatrix, d: &Int) -> Result<IntMatrix> {
    let op = "snf_iliopoulos";
    if !a.is_square() {
        return Err(Error::NotSquare {
            op,
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    if d.is_zero() {
        return Err(Error::Singular { op });
    }
    if d.is_negative() {
        return Err(Error::InvalidParameter {
            op,
            reason: "modulus must be positive",
        });
    }
    let n = a.nrows();
    let mut red = Reduction::with_modulus(a, d);
    for k in 0..n {
        red.clear_pivot(k);
    }
    // The row lattice is generated by the diagonal and d Z^n.
    for k in 0..n {
        let x = red.s[(k, k)].gcd(d);
        red.s[(k, k)] = x;
    }
    red.modulus = None;
    red.normalize_diagonal();
    Ok(red.s)
}

/// The Smith normal form of a diagonal matrix.
pub fn snf_diagonal(a: &IntMatrix) -> Result<IntMatrix> {
    let (m, n) = a.shape();
    for i in 0..m {
        for j in 0..n {
            if i != j && !a[(i, j)].is_zero() {
                return Err(Error::InvalidParameter {
                    op: "snf_diagonal",
                    reason: "matrix is not diagonal",
                });
            }
        }
    }
    let mut red = Reduction::new(a, false);
    red.normalize_diagonal();
    Ok(red.s)
}

/// Whether s is in Smith normal form.
pub fn is_snf(s: &IntMatrix) -> bool {
    let (m, n) = s.shape();
    for i in 0..m {
        for j in 0..n {
            if i != j && !s[(i, j)].is_zero() {
                return false;
            }
        }
    }
    let r = min(m, n);
    for i in 0..r {
        let x = &s[(i, i)];
        if x.is_negative() {
            return false;
        }
        if i + 1 < r {
            let y = &s[(i + 1, i + 1)];
            if x.is_zero() && !y.is_zero() {
                return false;
            }
            if !x.is_zero() && !y.is_multiple_of(x) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matmul;
    use rand::{Rng, SeedableRng};

    fn diag(m: usize, n: usize, d: &[i64]) -> IntMatrix {
        IntMatrix::from_fn(m, n, |i, j| {
            if i == j && i < d.len() {
                Int::from(d[i])
            } else {
                Int::zero()
            }
        })
    }

    fn check_transform(a: &IntMatrix) -> IntMatrix {
        let (s, u, v) = snf_transform(a);
        assert!(is_snf(&s), "not in SNF: {s}");
        let uav = matmul::mul(&matmul::mul(&u, a).unwrap(), &v).unwrap();
        assert_eq!(uav, s);
        assert_eq!(det(&u).unwrap().abs(), Int::one());
        assert_eq!(det(&v).unwrap().abs(), Int::one());
        assert_eq!(snf_kannan_bachem(a), s);
        s
    }

    #[test]
    fn test_snf_small() {
        let a = IntMatrix::from_i64(&[[2, 4, 4], [-6, 6, 12], [10, -4, -16]]);
        let s = check_transform(&a);
        assert_eq!(s, diag(3, 3, &[2, 6, 12]));
        assert_eq!(snf_iliopoulos(&a, &Int::from(144)).unwrap(), s);
        assert_eq!(snf_iliopoulos(&a, &Int::from(288)).unwrap(), s);
        assert_eq!(snf(&a).unwrap(), s);

        let a = IntMatrix::from_i64(&[[2, 0, 0], [0, 3, 0]]);
        assert_eq!(check_transform(&a), diag(2, 3, &[1, 6]));
        let a = IntMatrix::from_i64(&[[0, 0], [0, 0], [0, 5]]);
        assert_eq!(check_transform(&a), diag(3, 2, &[5]));
        let a = IntMatrix::from_i64(&[[2, 4], [1, 2]]);
        assert_eq!(check_transform(&a), diag(2, 2, &[1, 0]));
        assert_eq!(check_transform(&IntMatrix::zeros(2, 3)), IntMatrix::zeros(2, 3));
    }

    #[test]
    fn test_snf_diagonal() {
        let s = snf_diagonal(&diag(2, 2, &[4, 6])).unwrap();
        assert_eq!(s, diag(2, 2, &[2, 12]));
        let s = snf_diagonal(&diag(2, 2, &[0, 3])).unwrap();
        assert_eq!(s, diag(2, 2, &[3, 0]));
        let s = snf_diagonal(&diag(3, 3, &[-2, 0, 4])).unwrap();
        assert_eq!(s, diag(3, 3, &[2, 4, 0]));
        let s = snf_diagonal(&diag(3, 3, &[12, 18, 8])).unwrap();
        assert_eq!(s, diag(3, 3, &[2, 12, 72]));
        assert!(snf_diagonal(&IntMatrix::from_i64(&[[1, 1], [0, 1]])).is_err());
    }

    #[test]
    fn test_snf_random() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(4321);
        for (m, n, bound) in [(4, 4, 20), (5, 3, 10), (3, 6, 10), (7, 7, 100), (12, 12, 3)] {
            let a = IntMatrix::from_fn(m, n, |_, _| Int::from(rng.gen_range(-bound..=bound)));
            let s = check_transform(&a);
            assert_eq!(snf(&a).unwrap(), s);
            if m == n {
                let d = det(&a).unwrap().abs();
                if !d.is_zero() {
                    assert_eq!(snf_iliopoulos(&a, &d).unwrap(), s);
                    let prod = (0..n).fold(Int::one(), |acc, i| acc * &s[(i, i)]);
                    assert_eq!(prod, d);
                }
            }
        }
    }

    #[test]
    fn test_snf_dispatch() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(15);
        for (bound, dim) in [(1_i64, 15), (1 << 40, 10)] {
            let a = IntMatrix::from_fn(dim, dim, |_, _| Int::from(rng.gen_range(-bound..=bound)));
            let bits = a.max_bits();
            assert_eq!(iliopoulos_min_dim(bits), dim);
            assert_eq!(select_strategy(dim, dim, bits), SnfStrategy::Iliopoulos);
            let s = snf(&a).unwrap();
            assert!(is_snf(&s));
            assert_eq!(s, snf_kannan_bachem(&a));
        }
        // singular input of the same size
        let mut a = IntMatrix::from_fn(15, 15, |_, _| Int::from(rng.gen_range(-1..=1_i64)));
        for j in 0..15 {
            a[(14, j)] = &a[(0, j)] + &a[(1, j)];
        }
        let s = snf(&a).unwrap();
        assert!(s[(14, 14)].is_zero());
        assert_eq!(s, snf_kannan_bachem(&a));
    }

    #[test]
    fn test_snf_errors() {
        let a = IntMatrix::from_i64(&[[1, 2], [3, 4]]);
        assert!(snf_iliopoulos(&a, &Int::zero()).is_err());
        assert!(snf_iliopoulos(&a, &Int::from(-2)).is_err());
        assert!(snf_iliopoulos(&IntMatrix::zeros(2, 3), &Int::from(2)).is_err());
    }

    #[test]
    fn test_is_snf() {
        assert!(is_snf(&diag(3, 3, &[1, 2, 0])));
        assert!(is_snf(&diag(2, 4, &[3, 6])));
        assert!(!is_snf(&diag(2, 2, &[2, 3])));
        assert!(!is_snf(&diag(2, 2, &[0, 3])));
        assert!(!is_snf(&diag(2, 2, &[-1, 3])));
        assert!(!is_snf(&IntMatrix::from_i64(&[[1, 1], [0, 1]])));
    }
}
