// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Integral LLL reduction of a row basis.
//!
//! The Gram-Schmidt data is kept as integers: d[i] is the Gram
//! determinant of the first i rows and lam[k][j] = d[j+1] mu[k][j].
//! All divisions in the update formulas are exact and the
//! subdiagonal coefficients are reduced by symmetric residues modulo
//! the current d[j+1], so that entries never grow beyond the Gram
//! determinants.
//!
//! The Gram matrix of the basis is computed once by matrix
//! multiplication and updated along with the row operations.
//!
//! Reference:
//! H. Cohen, A course in computational algebraic number theory,
//! Algorithm 2.6.7

use num_traits::{One, Signed, Zero};

use crate::arith::{exact_div, smod};
use crate::hnf::row_submul;
use crate::{matmul, Error, Int, IntMatrix, Rat, Result};

/// Reduce the rows of a (which must be linearly independent) in place.
///
/// The result satisfies |mu[k][j]| <= eta and the Lovász condition
/// |b*_k|^2 >= (delta - mu[k][k-1]^2) |b*_{k-1}|^2.
pub fn lll_reduce(a: &mut IntMatrix, delta: &Rat, eta: &Rat) -> Result<()> {
    check_params(delta, eta)?;
    let n = a.nrows();
    if n == 0 {
        return Ok(());
    }
    let mut lat = Lattice::new(a)?;
    lat.incorporate(0)?;
    let (p, q) = (delta.numer(), delta.denom());
    let mut k = 1;
    let mut kmax = 0;
    let mut swaps = 0;
    while k < n {
        if k > kmax {
            kmax = k;
            lat.incorporate(k)?;
        }
        lat.reduce(k, k - 1, eta);
        let l = &lat.lam[(k, k - 1)];
        let lhs = q * (&lat.d[k + 1] * &lat.d[k - 1] + l * l);
        let rhs = p * &lat.d[k] * &lat.d[k];
        if lhs < rhs {
            lat.swap(k, kmax);
            swaps += 1;
            if k > 1 {
                k -= 1;
            }
        } else {
            for l in (0..k - 1).rev() {
                lat.reduce(k, l, eta);
            }
            k += 1;
        }
    }
    // Final size reduction.
    for k in (1..n).rev() {
        for l in (0..k).rev() {
            lat.reduce(k, l, eta);
        }
    }
    log::debug!("LLL reduced {}x{} basis with {swaps} swaps", n, lat.b.ncols());
    Ok(())
}

/// LLL reduction with the usual parameters (0.99, 0.51).
pub fn lll(a: &IntMatrix) -> Result<IntMatrix> {
    let mut b = a.clone();
    let delta = Rat::new(Int::from(99), Int::from(100));
    let eta = Rat::new(Int::from(51), Int::from(100));
    lll_reduce(&mut b, &delta, &eta)?;
    Ok(b)
}

fn check_params(delta: &Rat, eta: &Rat) -> Result<()> {
    let op = "lll_reduce";
    let quarter = Rat::new(Int::one(), Int::from(4));
    let half = Rat::new(Int::one(), Int::from(2));
    if *delta <= quarter || *delta > Rat::one() {
        return Err(Error::InvalidParameter {
            op,
            reason: "delta must be in (1/4, 1]",
        });
    }
    if *eta < half {
        return Err(Error::InvalidParameter {
            op,
            reason: "eta must be at least 1/2",
        });
    }
    if eta * eta >= *delta {
        return Err(Error::InvalidParameter {
            op,
            reason: "eta^2 must be less than delta",
        });
    }
    Ok(())
}

/// Check that rows of a are linearly independent and LLL-reduced
/// for the given parameters.
pub fn is_lll_reduced(a: &IntMatrix, delta: &Rat, eta: &Rat) -> bool {
    let n = a.nrows();
    let mut b = a.clone();
    let Ok(mut lat) = Lattice::new(&mut b) else {
        return false;
    };
    for k in 0..n {
        if lat.incorporate(k).is_err() {
            return false;
        }
    }
    let (p, q) = (delta.numer(), delta.denom());
    for k in 0..n {
        for j in 0..k {
            if eta.denom() * lat.lam[(k, j)].abs() > eta.numer() * &lat.d[j + 1] {
                return false;
            }
        }
        if k > 0 {
            let l = &lat.lam[(k, k - 1)];
            let lhs = q * (&lat.d[k + 1] * &lat.d[k - 1] + l * l);
            if lhs < p * &lat.d[k] * &lat.d[k] {
                return false;
            }
        }
    }
    true
}

struct Lattice<'a> {
    b: &'a mut IntMatrix,
    gram: IntMatrix,
    d: Vec<Int>,
    lam: IntMatrix,
}

impl<'a> Lattice<'a> {
    fn new(b: &'a mut IntMatrix) -> Result<Self> {
        let n = b.nrows();
        let gram = matmul::mul(b, &b.transpose())?;
        Ok(Lattice {
            b,
            gram,
            d: vec![Int::one(); n + 1],
            lam: IntMatrix::zeros(n, n),
        })
    }

    /// Compute lam[k][*] and d[k+1] from the Gram matrix.
    fn incorporate(&mut self, k: usize) -> Result<()> {
        for j in 0..=k {
            let mut u = self.gram[(k, j)].clone();
            for i in 0..j {
                let v = &self.d[i + 1] * &u - &self.lam[(k, i)] * &self.lam[(j, i)];
                u = exact_div(&v, &self.d[i]);
            }
            if j < k {
                self.lam[(k, j)] = u;
            } else {
                if u.is_zero() {
                    return Err(Error::Singular { op: "lll_reduce" });
                }
                self.d[k + 1] = u;
            }
        }
        Ok(())
    }

    /// Size-reduce row k against row l if |mu[k][l]| > eta.
    fn reduce(&mut self, k: usize, l: usize, eta: &Rat) {
        let dl = &self.d[l + 1];
        let x = &self.lam[(k, l)];
        if eta.denom() * x.abs() <= eta.numer() * dl {
            return;
        }
        let r = smod(x, dl);
        let q = exact_div(&(x - &r), dl);
        self.lam[(k, l)] = r;
        for i in 0..l {
            let y = &q * &self.lam[(l, i)];
            self.lam[(k, i)] -= y;
        }
        row_submul(self.b, k, l, &q);
        // G = E G E^T
        row_submul(&mut self.gram, k, l, &q);
        for i in 0..self.gram.nrows() {
            let y = &q * &self.gram[(i, l)];
            self.gram[(i, k)] -= y;
        }
    }

    /// Exchange rows k-1 and k.
    fn swap(&mut self, k: usize, kmax: usize) {
        self.b.swap_rows(k - 1, k);
        self.gram.swap_rows(k - 1, k);
        self.gram.swap_cols(k - 1, k);
        {
            let (r1, r2) = self.lam.two_rows_mut(k - 1, k);
            r1[..k - 1].swap_with_slice(&mut r2[..k - 1]);
        }
        let l = self.lam[(k, k - 1)].clone();
        let d = &mut self.d;
        let bb = exact_div(&(&d[k - 1] * &d[k + 1] + &l * &l), &d[k]);
        for i in k + 1..=kmax {
            let t = self.lam[(i, k)].clone();
            let lk = exact_div(&(&d[k + 1] * &self.lam[(i, k - 1)] - &l * &t), &d[k]);
            let lk1 = exact_div(&(&bb * &t + &l * &lk), &d[k + 1]);
            self.lam[(i, k)] = lk;
            self.lam[(i, k - 1)] = lk1;
        }
        d[k] = bb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::det::det;
    use crate::hnf::hnf;
    use rand::{Rng, SeedableRng};

    fn rat(n: i64, d: i64) -> Rat {
        Rat::new(Int::from(n), Int::from(d))
    }

    #[test]
    fn test_lll_small() {
        let mut a = IntMatrix::from_i64(&[[1, 1, 1], [-1, 0, 2], [3, 5, 6]]);
        let (delta, eta) = (rat(3, 4), rat(1, 2));
        assert!(!is_lll_reduced(&a, &delta, &eta));
        lll_reduce(&mut a, &delta, &eta).unwrap();
        assert_eq!(a, IntMatrix::from_i64(&[[0, 1, 0], [1, 0, 1], [-1, 0, 2]]));
        assert!(is_lll_reduced(&a, &delta, &eta));

        let mut id = IntMatrix::identity(4);
        lll_reduce(&mut id, &delta, &eta).unwrap();
        assert_eq!(id, IntMatrix::identity(4));

        let mut empty = IntMatrix::zeros(0, 3);
        lll_reduce(&mut empty, &delta, &eta).unwrap();
    }

    #[test]
    fn test_lll_errors() {
        let mut a = IntMatrix::from_i64(&[[1, 2], [2, 4]]);
        assert_eq!(
            lll_reduce(&mut a, &rat(3, 4), &rat(1, 2)),
            Err(Error::Singular { op: "lll_reduce" })
        );
        let mut a = IntMatrix::identity(2);
        assert!(lll_reduce(&mut a, &rat(1, 4), &rat(1, 2)).is_err());
        assert!(lll_reduce(&mut a, &rat(5, 4), &rat(1, 2)).is_err());
        assert!(lll_reduce(&mut a, &rat(3, 4), &rat(1, 3)).is_err());
        assert!(lll_reduce(&mut a, &rat(3, 4), &rat(9, 10)).is_err());
    }

    #[test]
    fn test_lll_random() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(777);
        for (m, n, bound) in [(6, 6, 1000), (4, 7, 1 << 20), (10, 10, 100)] {
            let a = IntMatrix::from_fn(m, n, |_, _| Int::from(rng.gen_range(-bound..=bound)));
            if m == n && det(&a).unwrap().is_zero() {
                continue;
            }
            for (delta, eta) in [(rat(3, 4), rat(1, 2)), (rat(99, 100), rat(51, 100))] {
                let mut b = a.clone();
                lll_reduce(&mut b, &delta, &eta).unwrap();
                assert!(is_lll_reduced(&b, &delta, &eta));
                // Same lattice.
                assert_eq!(hnf(&b).unwrap(), hnf(&a).unwrap());
            }
        }
    }

    #[test]
    fn test_lll_knapsack() {
        // Subset sum 3 + 7 + 12 = 22 with weights [3, 7, 12, 20, 26]
        let w = [3, 7, 12, 20, 26];
        let n = w.len();
        let big = 1000;
        let mut a = IntMatrix::from_fn(n + 1, n + 1, |i, j| {
            if j == n {
                Int::from(if i < n { big * w[i] } else { big * 22 })
            } else if i == j {
                Int::from(2)
            } else if i == n {
                Int::one()
            } else {
                Int::zero()
            }
        });
        a = lll(&a).unwrap();
        assert!(is_lll_reduced(&a, &rat(99, 100), &rat(51, 100)));
        // Short vectors have a zero knapsack coordinate.
        assert!(a.row(0)[n].is_zero());
        assert!(!a.row(0).iter().all(|x| x.is_zero()));
    }
}
