// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Hermite normal forms.
//!
//! The Hermite normal form H of an integer matrix A is the unique
//! matrix H = U A with U unimodular such that:
//! - nonzero rows come first and their leading entries (pivots)
//!   are positive, in strictly increasing columns
//! - entries above a pivot p are in the interval [0, p)
//!
//! Several algorithms are available:
//! - classical elimination, which is simple but suffers from
//!   coefficient growth
//! - the Kannan-Bachem algorithm, which brings leading minors to
//!   Hermite form one at a time
//! - elimination modulo a multiple D of the determinant
//!   (Domich, Kannan, Trotter) for nonsingular square matrices
//! - the strong echelon form modulo D with fixed up pivots
//!
//! References:
//! Henri Cohen, A course in computational algebraic number theory,
//! Algorithm 2.4.8
//! Arne Storjohann, Algorithms for Matrix Canonical Forms (2000)

use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::arith::fdiv;
use crate::arith_gcd::{eliminate, xgcd, Mat22};
use crate::det::det;
use crate::{Error, Int, IntMatrix, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HnfStrategy {
    Classical,
    Minors,
    ModD,
    Modular,
}

/// Square matrices of this dimension or more are reduced modulo their determinant.
pub const MODULAR_MIN_DIM: usize = 6;
/// Above this entry size, use the strong echelon form.
pub const STRONG_ECHELON_MIN_BITS: u64 = 128;

pub fn select_strategy(m: usize, n: usize, bits: u64) -> HnfStrategy {
    if m != n {
        if m > n {
            HnfStrategy::Minors
        } else {
            HnfStrategy::Classical
        }
    } else if n < MODULAR_MIN_DIM {
        HnfStrategy::Classical
    } else if bits < STRONG_ECHELON_MIN_BITS {
        HnfStrategy::ModD
    } else {
        HnfStrategy::Modular
    }
}

/// The Hermite normal form of a matrix.
pub fn hnf(a: &IntMatrix) -> Result<IntMatrix> {
    let strategy = select_strategy(a.nrows(), a.ncols(), a.max_bits());
    log::debug!("hnf {}x{}: {strategy:?}", a.nrows(), a.ncols());
    hnf_with(a, strategy)
}

/// The Hermite normal form using a given strategy.
///
/// Modular strategies use the determinant of the input as modulus.
/// They fall back to the Kannan-Bachem algorithm if the matrix is singular.
pub fn hnf_with(a: &IntMatrix, strategy: HnfStrategy) -> Result<IntMatrix> {
    match strategy {
        HnfStrategy::Classical => Ok(hnf_classical(a)),
        HnfStrategy::Minors => Ok(hnf_minors(a)),
        HnfStrategy::ModD | HnfStrategy::Modular => {
            if !a.is_square() {
                return Err(Error::NotSquare {
                    op: "hnf",
                    rows: a.nrows(),
                    cols: a.ncols(),
                });
            }
            let d = det(a)?.abs();
            if d.is_zero() {
                log::debug!("hnf: singular input, using minors algorithm");
                return Ok(hnf_minors(a));
            }
            if strategy == HnfStrategy::ModD {
                hnf_mod_d(a, &d)
            } else {
                hnf_modular(a, &d)
            }
        }
    }
}

// Row operations

/// row i -= q row j
pub(crate) fn row_submul(h: &mut IntMatrix, i: usize, j: usize, q: &Int) {
    if q.is_zero() {
        return;
    }
    let (ri, rj) = h.two_rows_mut(i, j);
    for (x, y) in ri.iter_mut().zip(rj.iter()) {
        if !y.is_zero() {
            *x -= q * y;
        }
    }
}

/// (row i, row j) = M (row i, row j)
pub(crate) fn row_combine(h: &mut IntMatrix, i: usize, j: usize, m: &Mat22) {
    let (ri, rj) = h.two_rows_mut(i, j);
    m.apply_rows(ri, rj);
}

pub(crate) fn row_negate(h: &mut IntMatrix, i: usize) {
    for x in h.row_mut(i) {
        *x = -&*x;
    }
}

fn row_mod(r: &mut [Int], m: &Int) {
    for x in r.iter_mut() {
        if x.is_negative() || *x >= *m {
            *x = x.mod_floor(m);
        }
    }
}

/// Reduce entries above the pivots of rows 0..k, assuming the pivot
/// of row j is in column j.
fn reduce_above_diagonal(h: &mut IntMatrix, k: usize) {
    for j in 0..k {
        for l in 0..j {
            let q = fdiv(&h[(l, j)], &h[(j, j)]);
            row_submul(h, l, j, &q);
        }
    }
}

/// Classical elimination: repeatedly use the smallest entry of
/// a column to reduce the entries below it.
pub fn hnf_classical(a: &IntMatrix) -> IntMatrix {
    let (m, n) = a.shape();
    let mut h = a.clone();
    let mut row = 0;
    for col in 0..n {
        if row == m {
            break;
        }
        loop {
            let piv = (row..m)
                .filter(|&i| !h[(i, col)].is_zero())
                .min_by(|&i, &j| h[(i, col)].magnitude().cmp(h[(j, col)].magnitude()));
            let Some(piv) = piv else {
                break;
            };
            h.swap_rows(row, piv);
            let mut done = true;
            for i in row + 1..m {
                if h[(i, col)].is_zero() {
                    continue;
                }
                let q = fdiv(&h[(i, col)], &h[(row, col)]);
                row_submul(&mut h, i, row, &q);
                if !h[(i, col)].is_zero() {
                    done = false;
                }
            }
            if done {
                break;
            }
        }
        if h[(row, col)].is_zero() {
            continue;
        }
        if h[(row, col)].is_negative() {
            row_negate(&mut h, row);
        }
        for i in 0..row {
            let q = fdiv(&h[(i, col)], &h[(row, col)]);
            row_submul(&mut h, i, row, &q);
        }
        row += 1;
    }
    h
}

/// Kannan-Bachem algorithm: rows are added one at a time and the
/// leading minor is kept in Hermite normal form.
///
/// It requires the leading minors to be nonsingular (after discarding
/// dependent rows): otherwise the classical algorithm is used.
pub fn hnf_minors(a: &IntMatrix) -> IntMatrix {
    let (m, n) = a.shape();
    if m < n {
        return hnf_classical(a);
    }
    let mut h = a.clone();
    // Rows 0..k have their pivot on the diagonal.
    let mut k = 0;
    for i in 0..m {
        for j in 0..k {
            if h[(i, j)].is_zero() {
                continue;
            }
            let (_, mat) = eliminate(&h[(j, j)], &h[(i, j)]);
            row_combine(&mut h, j, i, &mat);
            debug_assert!(h[(i, j)].is_zero());
        }
        if k == n {
            debug_assert!(h.row(i).iter().all(|x| x.is_zero()));
            reduce_above_diagonal(&mut h, k);
            continue;
        }
        if h[(i, k)].is_zero() {
            if h.row(i).iter().all(|x| x.is_zero()) {
                // dependent row: the combinations above may have
                // changed the pivot rows
                reduce_above_diagonal(&mut h, k);
                continue;
            }
            log::debug!("hnf: singular leading minor, using classical algorithm");
            return hnf_classical(a);
        }
        h.swap_rows(i, k);
        if h[(k, k)].is_negative() {
            row_negate(&mut h, k);
        }
        k += 1;
        reduce_above_diagonal(&mut h, k);
    }
    h
}

fn check_modulus(a: &IntMatrix, d: &Int, op: &'static str) -> Result<()> {
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
    Ok(())
}

/// Hermite normal form of a nonsingular square matrix,
/// computed modulo d which must be a multiple of |det A|.
pub fn hnf_mod_d(a: &IntMatrix, d: &Int) -> Result<IntMatrix> {
    check_modulus(a, d, "hnf_mod_d")?;
    let n = a.nrows();
    let mut h = a.clone();
    for i in 0..n {
        row_mod(h.row_mut(i), d);
    }
    let mut r = d.clone();
    for k in 0..n {
        // Gather the gcd of column k in row k.
        for i in k + 1..n {
            if h[(i, k)].is_zero() {
                continue;
            }
            let (_, mat) = eliminate(&h[(k, k)], &h[(i, k)]);
            row_combine(&mut h, k, i, &mat);
            row_mod(h.row_mut(k), &r);
            row_mod(h.row_mut(i), &r);
        }
        // Include R e_k in the lattice.
        let (g, u, _) = xgcd(&h[(k, k)], &r);
        for x in h.row_mut(k) {
            *x = (&*x * &u).mod_floor(&r);
        }
        if h[(k, k)].is_zero() {
            h[(k, k)] = r.clone();
        }
        debug_assert!(h[(k, k)] == g || (g == r && h[(k, k)] == r));
        for i in 0..k {
            let q = fdiv(&h[(i, k)], &h[(k, k)]);
            row_submul(&mut h, i, k, &q);
        }
        r = &r / &g;
    }
    Ok(h)
}

/// A unit u modulo n such that u x = gcd(x, n) mod n.
fn unit_normalizer(x: &Int, n: &Int) -> Int {
    let g = x.gcd(n);
    let (x1, n1) = (x / &g, n / &g);
    if n1.is_one() {
        return Int::one();
    }
    let (_, s, _) = xgcd(&x1, &n1);
    let mut u = s.mod_floor(&n1);
    // u + t n1 is a unit modulo n for some small t.
    while !u.gcd(n).is_one() {
        u += &n1;
    }
    u
}

/// The strong echelon form (Howell form) of a matrix over Z/nZ
/// with at least as many rows as columns.
///
/// The result is upper triangular with entries in [0, n).
/// Diagonal entries divide n, and are zero for columns without a pivot.
/// Entries above a nonzero diagonal entry are reduced modulo it.
pub fn strong_echelon_form_mod(a: &IntMatrix, n: &Int) -> Result<IntMatrix> {
    let op = "strong_echelon_form_mod";
    if !n.is_positive() {
        return Err(Error::InvalidParameter {
            op,
            reason: "modulus must be positive",
        });
    }
    let (m, c) = a.shape();
    if m < c {
        return Err(Error::InvalidParameter {
            op,
            reason: "matrix must have at least as many rows as columns",
        });
    }
    let mut rows: Vec<Vec<Int>> = a.clone().into_rows();
    for r in rows.iter_mut() {
        row_mod(r, n);
    }
    for k in 0..c {
        for i in k + 1..rows.len() {
            if rows[i][k].is_zero() {
                continue;
            }
            let (_, mat) = eliminate(&rows[k][k], &rows[i][k]);
            let (lo, hi) = rows.split_at_mut(i);
            mat.apply_rows(&mut lo[k], &mut hi[0]);
            row_mod(&mut lo[k], n);
            row_mod(&mut hi[0], n);
        }
        if rows[k][k].is_zero() {
            // No pivot: the row is moved down and handled by later columns.
            let r = std::mem::replace(&mut rows[k], vec![Int::zero(); c]);
            if r.iter().any(|x| !x.is_zero()) {
                rows.push(r);
            }
            continue;
        }
        let u = unit_normalizer(&rows[k][k], n);
        if !u.is_one() {
            for x in rows[k].iter_mut() {
                *x = (&*x * &u).mod_floor(n);
            }
        }
        let g = rows[k][k].clone();
        // (n/g) row_k vanishes in column k but belongs to the module.
        let ann = n / &g;
        let spare: Vec<Int> = rows[k].iter().map(|x| (x * &ann).mod_floor(n)).collect();
        if spare.iter().any(|x| !x.is_zero()) {
            rows.push(spare);
        }
        let (lo, hi) = rows.split_at_mut(k);
        for r in lo.iter_mut() {
            let q = fdiv(&r[k], &g);
            if q.is_zero() {
                continue;
            }
            for (x, y) in r.iter_mut().zip(&hi[0]) {
                *x -= &q * y;
            }
            row_mod(r, n);
        }
    }
    debug_assert!(rows[c..].iter().all(|r| r.iter().all(|x| x.is_zero())));
    rows.truncate(c);
    Ok(IntMatrix::from_rows(rows))
}

/// Hermite normal form of a nonsingular square matrix from its
/// strong echelon form modulo d, a multiple of the largest
/// elementary divisor of A (for example |det A|).
pub fn hnf_modular(a: &IntMatrix, d: &Int) -> Result<IntMatrix> {
    check_modulus(a, d, "hnf_modular")?;
    let mut h = strong_echelon_form_mod(a, d)?;
    for i in 0..h.nrows() {
        if h[(i, i)].is_zero() {
            h[(i, i)] = d.clone();
        }
    }
    Ok(h)
}

/// Hermite normal form H and unimodular U such that U A = H.
pub fn hnf_transform(a: &IntMatrix) -> Result<(IntMatrix, IntMatrix)> {
    let (m, n) = a.shape();
    let aug = a.hstack(&IntMatrix::identity(m))?;
    let h = hnf_classical(&aug);
    let cols: Vec<usize> = (0..n).collect();
    let ucols: Vec<usize> = (n..n + m).collect();
    let rows: Vec<usize> = (0..m).collect();
    Ok((h.submatrix(&rows, &cols), h.submatrix(&rows, &ucols)))
}

/// Whether h is in Hermite normal form.
pub fn is_hnf(h: &IntMatrix) -> bool {
    let mut last: Option<usize> = None;
    let mut zero_rows = false;
    for i in 0..h.nrows() {
        let Some(p) = h.row(i).iter().position(|x| !x.is_zero()) else {
            zero_rows = true;
            continue;
        };
        if zero_rows || last.is_some_and(|l| p <= l) {
            return false;
        }
        let piv = &h[(i, p)];
        if !piv.is_positive() {
            return false;
        }
        if (0..i).any(|l| h[(l, p)].is_negative() || h[(l, p)] >= *piv) {
            return false;
        }
        last = Some(p);
    }
    true
}
