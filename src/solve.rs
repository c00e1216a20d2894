// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Exact solutions of linear systems A X = B.
//!
//! Solutions are returned as an integer matrix X and a positive
//! denominator den such that A X = den B. A singular system is
//! not an error: solvers return `Ok(None)`.
//!
//! Small systems use fraction-free substitution. Large systems use
//! Dixon's p-adic lifting: the solution is computed modulo p^k
//! using a single inverse of A modulo p, and the rational solution
//! is recovered by rational reconstruction once p^k is large
//! enough, then checked exactly.
//!
//! Reference:
//! John D. Dixon, Exact solution of linear equations using P-adic expansions
//! Numerische Mathematik 40 (1982)

use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::Rng;

use crate::arith;
use crate::arith_montgomery::Zmod64;
use crate::det::hadamard_bits;
use crate::fflu::{fflu, solve_fflu_precomp};
use crate::matmul;
use crate::matrix_nmod::NmodMatrix;
use crate::{default_rng, Error, Int, IntMatrix, Preferences, Rat, RatMatrix, Result};

/// X / den is the solution of a linear system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub x: IntMatrix,
    pub den: Int,
}

impl Solution {
    /// Make den positive and coprime to the entries of X.
    pub fn normalize(mut self) -> Self {
        if self.den.is_negative() {
            self.den = -self.den;
            self.x = self.x.neg();
        }
        let g = self.x.content().gcd(&self.den);
        if !g.is_zero() && !g.is_one() {
            self.x.div_exact(&g);
            self.den = arith::exact_div(&self.den, &g);
        }
        self
    }

    pub fn to_rat(&self) -> RatMatrix {
        self.x.map(|e| Rat::new(e.clone(), self.den.clone()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStrategy {
    Fflu,
    Dixon,
}

/// Systems of this dimension or more use p-adic lifting.
pub const DIXON_MIN_DIM: usize = 16;
/// Smaller systems use p-adic lifting when entries have at least
/// this many bits.
pub const DIXON_MIN_BITS: u64 = 512;
/// Number of random primes tried before declaring the matrix singular.
const DIXON_PRIME_ATTEMPTS: usize = 6;

/// Choose a solver for an n x n system whose entries have at most
/// `bits` bits.
pub fn select_strategy(n: usize, bits: u64) -> SolveStrategy {
    // Fraction-free elimination works on entries of size about n bits,
    // while each lifting step only uses word-sized residues.
    if n >= DIXON_MIN_DIM / 2 && bits >= DIXON_MIN_BITS {
        return SolveStrategy::Dixon;
    }
    // Dixon lifting costs a few word-sized products per step:
    // tiny entries are better handled by elimination.
    if n < DIXON_MIN_DIM || (n < 2 * DIXON_MIN_DIM && bits <= 8) {
        SolveStrategy::Fflu
    } else {
        SolveStrategy::Dixon
    }
}

fn check_square(a: &IntMatrix, op: &'static str) -> Result<()> {
    if !a.is_square() {
        return Err(Error::NotSquare {
            op,
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(())
}

fn check_rows(a: &IntMatrix, b: &IntMatrix, op: &'static str) -> Result<()> {
    if a.nrows() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op,
            left: a.shape(),
            right: b.shape(),
        });
    }
    Ok(())
}

/// Solve A X = B for a square matrix A.
/// Returns None if A is singular.
pub fn solve(a: &IntMatrix, b: &IntMatrix) -> Result<Option<Solution>> {
    solve_opts(a, b, &Preferences::default(), &mut default_rng())
}

pub fn solve_opts<R: Rng>(
    a: &IntMatrix,
    b: &IntMatrix,
    prefs: &Preferences,
    rng: &mut R,
) -> Result<Option<Solution>> {
    check_square(a, "solve")?;
    check_rows(a, b, "solve")?;
    let strategy = select_strategy(a.nrows(), a.max_bits());
    log::debug!("solve {}x{} by {}: {strategy:?}", a.nrows(), a.ncols(), b.ncols());
    match strategy {
        SolveStrategy::Fflu => solve_fflu(a, b),
        SolveStrategy::Dixon => solve_dixon(a, b, prefs, rng),
    }
}

/// Solve a square system using fraction-free elimination.
pub fn solve_fflu(a: &IntMatrix, b: &IntMatrix) -> Result<Option<Solution>> {
    check_square(a, "solve")?;
    check_rows(a, b, "solve")?;
    let f = fflu(a, true);
    if f.den.is_zero() || f.rank < a.nrows() {
        return Ok(None);
    }
    let x = solve_fflu_precomp(&f.lu, &f.perm.apply_rows(b));
    Ok(Some(Solution { x, den: f.den }.normalize()))
}

/// Solve A X = B for any matrix A, if a solution exists.
///
/// If A has a nontrivial kernel, the returned solution is zero
/// at non-pivot coordinates.
pub fn can_solve(a: &IntMatrix, b: &IntMatrix) -> Result<Option<Solution>> {
    check_rows(a, b, "can_solve")?;
    let (n, k) = (a.ncols(), b.ncols());
    let f = fflu(a, false);
    if f.rank == 0 {
        if b.is_zero() {
            return Ok(Some(Solution {
                x: IntMatrix::zeros(n, k),
                den: Int::one(),
            }));
        }
        return Ok(None);
    }
    let pb = b.select_rows(f.pivot_rows());
    let y = solve_fflu_precomp(&f.pivot_block(), &pb);
    let mut x = IntMatrix::zeros(n, k);
    for (i, &c) in f.pivots.iter().enumerate() {
        x.row_mut(c).clone_from_slice(y.row(i));
    }
    // Only the pivot rows are guaranteed to be satisfied.
    if f.rank < a.nrows() {
        let ax = matmul::mul(a, &x)?;
        if ax != b.scalar_mul(&f.den) {
            return Ok(None);
        }
    }
    Ok(Some(Solution { x, den: f.den }.normalize()))
}

/// The inverse of A as X / den, or None if A is singular.
pub fn inverse(a: &IntMatrix) -> Result<Option<Solution>> {
    check_square(a, "inverse")?;
    solve(a, &IntMatrix::identity(a.nrows()))
}

/// Solve a square system using Dixon p-adic lifting.
///
/// Returns None if A was found singular modulo several random primes,
/// which almost surely means that A is singular.
pub fn solve_dixon<R: Rng>(
    a: &IntMatrix,
    b: &IntMatrix,
    prefs: &Preferences,
    rng: &mut R,
) -> Result<Option<Solution>> {
    check_square(a, "solve")?;
    check_rows(a, b, "solve")?;
    let (n, k) = (a.nrows(), b.ncols());
    if n == 0 || k == 0 {
        return Ok(Some(Solution {
            x: IntMatrix::zeros(n, k),
            den: Int::one(),
        }));
    }
    let mut modp = None;
    for _ in 0..DIXON_PRIME_ATTEMPTS {
        let zp = Zmod64::new(arith::random_prime(rng, 62));
        if let Some(inv) = NmodMatrix::from_ints(zp, a.as_ref()).inverse() {
            modp = Some((zp, inv));
            break;
        }
        log::debug!("dixon: matrix is singular modulo {}", zp.p);
    }
    let Some((zp, ainv)) = modp else {
        return Ok(None);
    };
    let p = Int::from(zp.p);
    // Cramer's rule: denominators divide det A, numerators are
    // determinants of A with a column replaced by a column of B.
    let dbits = hadamard_bits(a);
    let nbits = hadamard_bits(&a.hstack(b)?);
    let target = nbits + dbits + 2;
    log::trace!("dixon: n={n} target precision {target} bits");

    let tpool = prefs.tpool();
    // Invariant: A X = B - M R
    let mut x = IntMatrix::zeros(n, k);
    let mut residual = b.clone();
    let mut modulus = Int::one();
    let mut steps = 0;
    let mut next_check = 4;
    let mut final_attempts = 0;
    loop {
        let rp = NmodMatrix::from_ints(zp, residual.as_ref());
        let xi = ainv.mul(&rp);
        let xi = IntMatrix::new(n, k, xi.to_signed().into_iter().map(Int::from).collect());
        for (xe, d) in x.data_mut().iter_mut().zip(xi.data()) {
            if !d.is_zero() {
                *xe += d * &modulus;
            }
        }
        let axi = matmul::mul_ref(a.as_ref(), xi.as_ref(), tpool);
        residual = residual.sub(&axi)?;
        residual.div_exact(&p);
        modulus *= &p;
        steps += 1;
        if residual.is_zero() {
            // The solution is an integer matrix.
            return Ok(Some(Solution { x, den: Int::one() }.normalize()));
        }
        let reached = modulus.bits() > target;
        if steps < next_check && !reached {
            continue;
        }
        next_check *= 2;
        let (nbound, dbound) = if reached {
            (Int::one() << nbits, Int::one() << dbits)
        } else {
            let bal = (&modulus >> 1u32).sqrt();
            (bal.clone(), bal)
        };
        if let Some(sol) = reconstruct(&x, &modulus, &nbound, &dbound) {
            let ax = matmul::mul_ref(a.as_ref(), sol.x.as_ref(), tpool);
            if ax == b.scalar_mul(&sol.den) {
                log::debug!("dixon: solution found after {steps} steps");
                return Ok(Some(sol.normalize()));
            }
            log::info!("dixon: candidate solution rejected after {steps} steps");
        }
        if reached {
            final_attempts += 1;
            prefs.check_retry("solve_dixon", final_attempts)?;
        }
    }
}

/// Rational reconstruction of all entries with a common denominator.
fn reconstruct(x: &IntMatrix, m: &Int, nbound: &Int, dbound: &Int) -> Option<Solution> {
    let mut den = Int::one();
    for e in x.data() {
        let y = (e * &den).mod_floor(m);
        let (_, d) = arith::rational_reconstruct(&y, m, nbound, dbound)?;
        if !d.is_one() {
            den *= d;
            if den > *dbound {
                return None;
            }
        }
    }
    let xs = x.map(|e| arith::smod(&(e * &den), m));
    Some(Solution { x: xs, den })
}
