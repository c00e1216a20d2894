// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Reduced row echelon forms of integer matrices.
//!
//! The result is scaled to have integer entries: pivot columns
//! contain `den` on the pivot row and 0 elsewhere. It is normalized
//! so that den > 0 and the entries have no common factor with den.
//!
//! Small or wide matrices use fraction-free elimination followed by
//! back substitution. Larger matrices guess the pivot structure
//! modulo a random prime, solve for the non-pivot columns exactly
//! and verify the candidate against the input.

use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::Rng;

use crate::arith::{self, exact_div};
use crate::arith_montgomery::Zmod64;
use crate::fflu::fflu;
use crate::matmul;
use crate::matrix_nmod::{NmodEchelon, NmodMatrix};
use crate::solve;
use crate::{default_rng, Int, IntMatrix, Preferences, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rref {
    /// The scaled reduced row echelon form, with the shape of the input.
    pub r: IntMatrix,
    pub den: Int,
    pub rank: usize,
    /// Pivot columns, increasing.
    pub pivots: Vec<usize>,
}

impl Rref {
    fn zero(m: usize, n: usize) -> Self {
        Rref {
            r: IntMatrix::zeros(m, n),
            den: Int::one(),
            rank: 0,
            pivots: vec![],
        }
    }

    fn normalize(&mut self) {
        if self.den.is_negative() {
            self.den = -&self.den;
            self.r = self.r.neg();
        }
        let g = self.r.content().gcd(&self.den);
        if !g.is_zero() && !g.is_one() {
            self.r.div_exact(&g);
            self.den = exact_div(&self.den, &g);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RrefStrategy {
    Fflu,
    MultiModular,
}

/// Matrices with fewer rows use fraction-free elimination.
pub const MULTIMOD_MIN_ROWS: usize = 20;

pub fn select_strategy(m: usize, n: usize) -> RrefStrategy {
    if m < MULTIMOD_MIN_ROWS || n > 2 * m {
        RrefStrategy::Fflu
    } else {
        RrefStrategy::MultiModular
    }
}

pub fn rref(a: &IntMatrix) -> Result<Rref> {
    rref_opts(a, &Preferences::default(), &mut default_rng())
}

pub fn rref_opts<R: Rng>(a: &IntMatrix, prefs: &Preferences, rng: &mut R) -> Result<Rref> {
    let (m, n) = a.shape();
    let strategy = select_strategy(m, n);
    log::debug!("rref {m}x{n}: {strategy:?}");
    match strategy {
        RrefStrategy::Fflu => Ok(rref_fflu(a)),
        RrefStrategy::MultiModular => rref_multimod(a, prefs, rng),
    }
}

fn nonpivot_columns(pivots: &[usize], n: usize) -> Vec<usize> {
    let mut cols = Vec::with_capacity(n - pivots.len());
    let mut piv = pivots.iter().peekable();
    for j in 0..n {
        if piv.peek() == Some(&&j) {
            piv.next();
        } else {
            cols.push(j);
        }
    }
    cols
}

/// Reduced row echelon form from a fraction-free LU decomposition.
pub fn rref_fflu(a: &IntMatrix) -> Rref {
    let (m, n) = a.shape();
    let f = fflu(a, false);
    let r = f.rank;
    if r == 0 {
        return Rref::zero(m, n);
    }
    let u = &f.lu;
    let den = f.den;
    let piv = f.pivots;
    let mut res = IntMatrix::zeros(m, n);
    for (i, &c) in piv.iter().enumerate() {
        res[(i, c)] = den.clone();
    }
    // Each non-pivot column is den U_p^-1 u where U_p is the
    // triangular block on pivot columns: back substitution divides exactly.
    for k in nonpivot_columns(&piv, n) {
        for i in (0..r).rev() {
            let mut t = &den * &u[(i, k)];
            for j in i + 1..r {
                let x = &res[(j, k)];
                if !x.is_zero() {
                    t -= &u[(i, piv[j])] * x;
                }
            }
            if !t.is_zero() {
                res[(i, k)] = exact_div(&t, &u[(i, piv[i])]);
            }
        }
    }
    let mut out = Rref {
        r: res,
        den,
        rank: r,
        pivots: piv,
    };
    out.normalize();
    out
}

/// Reduced row echelon form by guessing the pivot structure
/// modulo random primes until the candidate is verified.
pub fn rref_multimod<R: Rng>(a: &IntMatrix, prefs: &Preferences, rng: &mut R) -> Result<Rref> {
    let (m, n) = a.shape();
    if a.is_zero() {
        return Ok(Rref::zero(m, n));
    }
    let mut attempt = 0;
    loop {
        attempt += 1;
        prefs.check_retry("rref", attempt)?;
        let zp = Zmod64::new(arith::random_prime(rng, 62));
        let ech = NmodMatrix::from_ints(zp, a.as_ref()).echelon();
        log::trace!("rref: rank {} modulo {}", ech.rank, zp.p);
        if let Some(res) = rref_candidate(a, &ech, prefs, rng)? {
            return Ok(res);
        }
        log::info!("rref: candidate modulo {} rejected", zp.p);
    }
}

fn rref_candidate<R: Rng>(
    a: &IntMatrix,
    ech: &NmodEchelon,
    prefs: &Preferences,
    rng: &mut R,
) -> Result<Option<Rref>> {
    let (m, n) = a.shape();
    let r = ech.rank;
    if r == 0 {
        return Ok(None);
    }
    let nonpivots = nonpivot_columns(&ech.pivots, n);
    let b = a.submatrix(&ech.rows, &ech.pivots);
    let c = a.submatrix(&ech.rows, &nonpivots);
    let Some(sol) = solve::solve_opts(&b, &c, prefs, rng)? else {
        return Ok(None);
    };
    let mut res = IntMatrix::zeros(m, n);
    for (i, &p) in ech.pivots.iter().enumerate() {
        res[(i, p)] = sol.den.clone();
        for (j, &k) in nonpivots.iter().enumerate() {
            let x = &sol.x[(i, j)];
            if !x.is_zero() && k < p {
                // Not an echelon form: the pivot set was wrong.
                return Ok(None);
            }
            res[(i, k)] = x.clone();
        }
    }
    // Rows of the candidate span the space orthogonal to the nullspace
    // vectors: all input rows must be orthogonal to them.
    if !nonpivots.is_empty() {
        let mut in_basis = vec![false; m];
        for &i in &ech.rows {
            in_basis[i] = true;
        }
        let rest: Vec<usize> = (0..m).filter(|&i| !in_basis[i]).collect();
        if !rest.is_empty() {
            let kernel = kernel_from_rref(&res, &sol.den, &ech.pivots, &nonpivots);
            let prod = matmul::mul_opts(&a.select_rows(&rest), &kernel, prefs)?;
            if !prod.is_zero() {
                return Ok(None);
            }
        }
    }
    // The solution is normalized, hence so is the candidate.
    Ok(Some(Rref {
        r: res,
        den: sol.den,
        rank: r,
        pivots: ech.pivots.clone(),
    }))
}

/// The n x (n - rank) matrix whose columns are den e_k - R[:, k]
/// over pivot coordinates, for non-pivot columns k.
fn kernel_from_rref(r: &IntMatrix, den: &Int, pivots: &[usize], nonpivots: &[usize]) -> IntMatrix {
    let n = r.ncols();
    let mut v = IntMatrix::zeros(n, nonpivots.len());
    for (j, &k) in nonpivots.iter().enumerate() {
        v[(k, j)] = den.clone();
        for (i, &p) in pivots.iter().enumerate() {
            v[(p, j)] = -&r[(i, k)];
        }
    }
    v
}

/// Whether r is a reduced row echelon form, scaled by a common
/// positive pivot value.
pub fn is_rref(r: &IntMatrix) -> bool {
    let m = r.nrows();
    let mut den: Option<&Int> = None;
    let mut last: Option<usize> = None;
    let mut zero_rows = false;
    for i in 0..m {
        let Some(p) = r.row(i).iter().position(|x| !x.is_zero()) else {
            zero_rows = true;
            continue;
        };
        if zero_rows || last.is_some_and(|l| p <= l) {
            return false;
        }
        let d = &r[(i, p)];
        if !d.is_positive() || den.is_some_and(|den| den != d) {
            return false;
        }
        den = Some(d);
        last = Some(p);
        if (0..m).any(|l| l != i && !r[(l, p)].is_zero()) {
            return false;
        }
    }
    true
}

/// The rank of a matrix.
pub fn rank(a: &IntMatrix) -> usize {
    fflu(a, false).rank
}

/// A basis of the right nullspace {x : A x = 0} as columns of a
/// n x (n - rank) matrix. Each column is primitive.
pub fn nullspace(a: &IntMatrix) -> Result<IntMatrix> {
    let n = a.ncols();
    let rr = rref(a)?;
    let nonpivots = nonpivot_columns(&rr.pivots, n);
    let mut v = kernel_from_rref(&rr.r, &rr.den, &rr.pivots, &nonpivots);
    for j in 0..v.ncols() {
        let mut g = Int::zero();
        for i in 0..n {
            g = g.gcd(&v[(i, j)]);
        }
        if !g.is_one() && !g.is_zero() {
            for i in 0..n {
                v[(i, j)] = exact_div(&v[(i, j)], &g);
            }
        }
    }
    Ok(v)
}
