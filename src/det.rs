// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Determinants of integer matrices.
//!
//! Small matrices use closed formulas, medium matrices use
//! Bareiss elimination and large matrices use a multi-modular
//! computation over 63-bit primes, with enough primes to cover
//! the Hadamard bound.
//!
//! The accelerated multi-modular variant first finds a large divisor
//! of the determinant (the denominator of the solution of a random
//! linear system) so that fewer primes are needed.

use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::Rng;
use rayon::prelude::*;

use crate::arith;
use crate::arith_crt::{self, CrtBasis};
use crate::arith_montgomery::Zmod64;
use crate::fflu::fflu;
use crate::matrix_nmod::NmodMatrix;
use crate::solve;
use crate::{default_rng, Error, Int, IntMatrix, Preferences, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetStrategy {
    Cofactor,
    Bareiss,
    MultiModular,
    MultiModularAccelerated,
}

pub const COFACTOR_MAX_DIM: usize = 4;
pub const BAREISS_MAX_DIM: usize = 24;
pub const MULTIMOD_MAX_DIM: usize = 59;

pub fn select_strategy(n: usize) -> DetStrategy {
    if n <= COFACTOR_MAX_DIM {
        DetStrategy::Cofactor
    } else if n <= BAREISS_MAX_DIM {
        DetStrategy::Bareiss
    } else if n <= MULTIMOD_MAX_DIM {
        DetStrategy::MultiModular
    } else {
        DetStrategy::MultiModularAccelerated
    }
}

fn check_square(a: &IntMatrix) -> Result<()> {
    if !a.is_square() {
        return Err(Error::NotSquare {
            op: "det",
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(())
}

/// Determinant of a square integer matrix.
pub fn det(a: &IntMatrix) -> Result<Int> {
    check_square(a)?;
    let strategy = select_strategy(a.nrows());
    det_with(a, strategy, &Preferences::default(), &mut default_rng())
}

/// Determinant using the given algorithm.
pub fn det_with<R: Rng>(
    a: &IntMatrix,
    strategy: DetStrategy,
    prefs: &Preferences,
    rng: &mut R,
) -> Result<Int> {
    check_square(a)?;
    log::debug!("det {}x{}: {strategy:?}", a.nrows(), a.ncols());
    match strategy {
        DetStrategy::Cofactor => {
            if a.nrows() > COFACTOR_MAX_DIM {
                return Err(Error::InvalidParameter {
                    op: "det",
                    reason: "cofactor formulas are only available up to dimension 4",
                });
            }
            Ok(det_cofactor(a))
        }
        DetStrategy::Bareiss => Ok(det_bareiss(a)),
        DetStrategy::MultiModular => Ok(det_multimod(a, prefs.tpool())),
        DetStrategy::MultiModularAccelerated => det_multimod_accel(a, prefs, rng),
    }
}

fn det_cofactor(a: &IntMatrix) -> Int {
    let e = |i: usize, j: usize| &a[(i, j)];
    match a.nrows() {
        0 => Int::one(),
        1 => e(0, 0).clone(),
        2 => e(0, 0) * e(1, 1) - e(0, 1) * e(1, 0),
        3 => {
            e(0, 0) * (e(1, 1) * e(2, 2) - e(1, 2) * e(2, 1))
                - e(0, 1) * (e(1, 0) * e(2, 2) - e(1, 2) * e(2, 0))
                + e(0, 2) * (e(1, 0) * e(2, 1) - e(1, 1) * e(2, 0))
        }
        4 => {
            // Laplace expansion along the first two rows.
            let s0 = e(0, 0) * e(1, 1) - e(1, 0) * e(0, 1);
            let s1 = e(0, 0) * e(1, 2) - e(1, 0) * e(0, 2);
            let s2 = e(0, 0) * e(1, 3) - e(1, 0) * e(0, 3);
            let s3 = e(0, 1) * e(1, 2) - e(1, 1) * e(0, 2);
            let s4 = e(0, 1) * e(1, 3) - e(1, 1) * e(0, 3);
            let s5 = e(0, 2) * e(1, 3) - e(1, 2) * e(0, 3);
            let c5 = e(2, 2) * e(3, 3) - e(3, 2) * e(2, 3);
            let c4 = e(2, 1) * e(3, 3) - e(3, 1) * e(2, 3);
            let c3 = e(2, 1) * e(3, 2) - e(3, 1) * e(2, 2);
            let c2 = e(2, 0) * e(3, 3) - e(3, 0) * e(2, 3);
            let c1 = e(2, 0) * e(3, 2) - e(3, 0) * e(2, 2);
            let c0 = e(2, 0) * e(3, 1) - e(3, 0) * e(2, 1);
            s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0
        }
        _ => unreachable!("matrix is too large for cofactor expansion"),
    }
}

fn det_bareiss(a: &IntMatrix) -> Int {
    let f = fflu(a, true);
    if f.den.is_zero() || f.rank < a.nrows() {
        return Int::zero();
    }
    if f.perm.is_odd() {
        -f.den
    } else {
        f.den
    }
}

/// An upper bound for log2 |det A| using Hadamard's inequality
/// |det A| <= prod ||A_i||. It is 0 if a row is zero.
pub fn hadamard_bits(a: &IntMatrix) -> u64 {
    let mut bits = 0;
    for row in a.rows() {
        let norm2: Int = row.iter().map(|x| x * x).sum();
        if norm2.is_zero() {
            return 0;
        }
        // ||row||^2 < 2^bits(||row||^2)
        bits += norm2.bits();
    }
    // det^2 <= prod ||row||^2 < 2^bits
    (bits + 1) / 2
}

fn det_modp(a: &IntMatrix, p: u64) -> u64 {
    let zp = Zmod64::new(p);
    NmodMatrix::from_ints(zp, a.as_ref()).det()
}

fn residues_modp(a: &IntMatrix, primes: &[u64], tpool: Option<&rayon::ThreadPool>) -> Vec<u64> {
    if let Some(pool) = tpool {
        pool.install(|| primes.par_iter().map(|&p| det_modp(a, p)).collect())
    } else {
        primes.iter().map(|&p| det_modp(a, p)).collect()
    }
}

fn det_multimod(a: &IntMatrix, tpool: Option<&rayon::ThreadPool>) -> Int {
    let n = a.nrows();
    if n == 0 {
        return Int::one();
    }
    let bound = hadamard_bits(a);
    if bound == 0 {
        return Int::zero();
    }
    let basis = CrtBasis::for_bits(bound);
    log::trace!("det: {bound} bits, {} primes", basis.len());
    let residues = residues_modp(a, &basis.primes, tpool);
    basis.reconstruct_signed(&residues)
}

/// A positive divisor of det(A), or None if A looks singular.
///
/// It is the common denominator of the solution of A x = b for
/// a random vector b, which is usually the largest invariant
/// factor of A.
pub fn det_divisor<R: Rng>(a: &IntMatrix, prefs: &Preferences, rng: &mut R) -> Result<Option<Int>> {
    let n = a.nrows();
    let b = IntMatrix::from_fn(n, 1, |_, _| Int::from(rng.gen_range(-100_i64..=100)));
    match solve::solve_dixon(a, &b, prefs, rng) {
        Ok(Some(sol)) => Ok(Some(sol.den)),
        Ok(None) => Ok(None),
        Err(Error::RetriesExhausted { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn det_multimod_accel<R: Rng>(a: &IntMatrix, prefs: &Preferences, rng: &mut R) -> Result<Int> {
    let n = a.nrows();
    let bound = hadamard_bits(a);
    if n == 0 || bound == 0 {
        return Ok(det_multimod(a, prefs.tpool()));
    }
    let Some(d) = det_divisor(a, prefs, rng)? else {
        log::debug!("det: no divisor found, matrix may be singular");
        return Ok(det_multimod(a, prefs.tpool()));
    };
    // |det / d| < 2^(bound - bits(d) + 1)
    let qbits = (bound + 1).saturating_sub(d.bits());
    let count = (qbits + 1 + arith_crt::BITS_PER_PRIME) / arith_crt::BITS_PER_PRIME;
    let mut primes = vec![];
    let mut candidates = arith_crt::primes(count as usize + 8);
    let mut i = 0;
    while primes.len() < count as usize {
        if i == candidates.len() {
            candidates = arith_crt::primes(2 * candidates.len());
        }
        let p = candidates[i];
        if !arith::mod_u64(&d, p).is_zero() {
            primes.push(p);
        }
        i += 1;
    }
    log::debug!(
        "det: divisor of {} bits, {} primes instead of {}",
        d.bits(),
        primes.len(),
        CrtBasis::for_bits(bound).len()
    );
    let residues = residues_modp(a, &primes, prefs.tpool());
    let qres: Vec<u64> = residues
        .iter()
        .zip(&primes)
        .map(|(&r, &p)| {
            let dp = arith::mod_u64(&d, p);
            let dinv = arith::inv_mod64(dp, p).unwrap_or(0);
            arith::mulmod64(r, dinv, p)
        })
        .collect();
    let basis = CrtBasis::new(primes);
    let q = basis.reconstruct_signed(&qres);
    let det = q * &d;
    debug_assert!(det.is_zero() || det.abs().bits() <= bound + 1);
    debug_assert!(det.is_zero() || det.is_multiple_of(&d));
    Ok(det)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const ALL: [DetStrategy; 4] = [
        DetStrategy::Cofactor,
        DetStrategy::Bareiss,
        DetStrategy::MultiModular,
        DetStrategy::MultiModularAccelerated,
    ];

    fn det_all(a: &IntMatrix) -> Vec<Int> {
        let prefs = Preferences::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        ALL.iter()
            .filter(|&&s| s != DetStrategy::Cofactor || a.nrows() <= COFACTOR_MAX_DIM)
            .map(|&s| det_with(a, s, &prefs, &mut rng).unwrap())
            .collect()
    }

    #[test]
    fn test_det_examples() {
        let a = IntMatrix::from_i64(&[[1, 2], [3, 4]]);
        assert_eq!(det(&a).unwrap(), Int::from(-2));
        for d in det_all(&a) {
            assert_eq!(d, Int::from(-2));
        }
        let s = IntMatrix::from_i64(&[[2, 4], [1, 2]]);
        for d in det_all(&s) {
            assert!(d.is_zero());
        }
        assert_eq!(det(&IntMatrix::zeros(0, 0)).unwrap(), Int::one());
        assert!(det(&IntMatrix::zeros(2, 3)).is_err());
        let big = IntMatrix::zeros(5, 5);
        let res = det_with(&big, DetStrategy::Cofactor, &Preferences::default(), &mut default_rng());
        assert!(res.is_err());
    }

    #[test]
    fn test_det_strategies_agree() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(77);
        for n in 1..=4 {
            for bits in [3, 40, 200] {
                let a = random_matrix(&mut rng, n, bits);
                let ds = det_all(&a);
                assert!(ds.windows(2).all(|w| w[0] == w[1]), "n={n} {ds:?}");
            }
        }
        for n in [5, 8, 13] {
            for bits in [5, 100] {
                let a = random_matrix(&mut rng, n, bits);
                let ds = det_all(&a);
                assert_eq!(ds.len(), 3);
                assert!(ds.windows(2).all(|w| w[0] == w[1]), "n={n} {ds:?}");
            }
        }
        // singular matrix: last row is a combination of the others
        let mut a = random_matrix(&mut rng, 7, 30);
        for j in 0..7 {
            a[(6, j)] = &a[(0, j)] * 3 - &a[(1, j)];
        }
        for d in det_all(&a) {
            assert!(d.is_zero());
        }
    }

    #[test]
    fn test_det_structured() {
        // det of a triangular matrix is the product of its diagonal
        let n = 30;
        let a = IntMatrix::from_fn(n, n, |i, j| {
            if i == j {
                Int::from(2 * i as i64 + 1)
            } else if i < j {
                Int::from((i * j) as i64 - 40)
            } else {
                Int::zero()
            }
        });
        let expect: Int = (0..n).map(|i| Int::from(2 * i as i64 + 1)).product();
        assert_eq!(det(&a).unwrap(), expect);
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let d = det_with(&a, DetStrategy::MultiModularAccelerated, &Preferences::default(), &mut rng);
        assert_eq!(d.unwrap(), expect);
        // swapping two rows changes the sign
        let mut b = a.clone();
        b.swap_rows(3, 17);
        assert_eq!(det_with(&b, DetStrategy::Bareiss, &Preferences::default(), &mut rng).unwrap(), -expect);
    }

    #[test]
    fn test_det_large_dim() {
        let n = 60;
        assert_eq!(select_strategy(n), DetStrategy::MultiModularAccelerated);
        let mut rng = rand::rngs::StdRng::seed_from_u64(60);
        let prefs = Preferences::default();
        let a = random_matrix(&mut rng, n, 8);
        let d = det(&a).unwrap();
        assert_eq!(d, det_with(&a, DetStrategy::Bareiss, &prefs, &mut rng).unwrap());
        // singular input
        let mut s = a.clone();
        for j in 0..n {
            s[(n - 1, j)] = &a[(3, j)] - &a[(10, j)] * 2;
        }
        assert!(det(&s).unwrap().is_zero());
    }

    #[test]
    fn test_hadamard() {
        let a = IntMatrix::from_i64(&[[3, 4], [0, 1]]);
        // rows of norm 5 and 1: |det| < 2^((5 + 1 + 1) / 2)
        assert_eq!(hadamard_bits(&a), 3);
        // unit rows do not add to the bound
        assert_eq!(hadamard_bits(&IntMatrix::identity(8)), 4);
        assert_eq!(hadamard_bits(&IntMatrix::from_i64(&[[7]])), 3);
        assert_eq!(hadamard_bits(&IntMatrix::from_i64(&[[0, 0], [1, 1]])), 0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let a = random_matrix(&mut rng, 10, 50);
        let d = det(&a).unwrap();
        assert!(d.bits() <= hadamard_bits(&a));
    }

    #[test]
    fn test_det_divisor() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(123);
        let a = random_matrix(&mut rng, 6, 20);
        let d = det(&a).unwrap();
        let div = det_divisor(&a, &Preferences::default(), &mut rng).unwrap().unwrap();
        assert!(div.is_positive());
        assert!(d.is_multiple_of(&div));
    }

    fn random_matrix(rng: &mut impl Rng, n: usize, bits: u32) -> IntMatrix {
        IntMatrix::from_fn(n, n, |_, _| {
            let x = Int::from(rng.gen::<u64>()) << bits;
            let x: Int = x >> 64;
            if rng.gen::<bool>() {
                -x
            } else {
                x
            }
        })
    }
}
