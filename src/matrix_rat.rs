// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Rational matrices.
//!
//! Operations on rational matrices clear denominators (row by row,
//! or column by column when it suits the operation better) and
//! delegate to the integer algorithms.

use num_integer::Integer;
use num_traits::One;

use crate::matmul;
use crate::{Error, Int, IntMatrix, Rat, RatMatrix, Result};

/// Write A as diag(dens)^-1 M with M an integer matrix.
///
/// dens[i] is the least common multiple of denominators of row i.
pub fn to_int_rows(a: &RatMatrix) -> (IntMatrix, Vec<Int>) {
    let dens: Vec<Int> = a
        .rows()
        .map(|r| r.iter().fold(Int::one(), |l, x| l.lcm(x.denom())))
        .collect();
    let m = IntMatrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        let x = &a[(i, j)];
        x.numer() * (&dens[i] / x.denom())
    });
    (m, dens)
}

/// Write A as M / den with M an integer matrix.
pub fn to_int(a: &RatMatrix) -> (IntMatrix, Int) {
    let den = a.data().iter().fold(Int::one(), |l, x| l.lcm(x.denom()));
    let m = a.map(|x| x.numer() * (&den / x.denom()));
    (m, den)
}

pub fn from_int(m: &IntMatrix, den: &Int) -> RatMatrix {
    m.map(|x| Rat::new(x.clone(), den.clone()))
}

/// Product of rational matrices.
pub fn mul(a: &RatMatrix, b: &RatMatrix) -> Result<RatMatrix> {
    if a.ncols() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op: "mul",
            left: a.shape(),
            right: b.shape(),
        });
    }
    // A = Da^-1 Ma, B = Mb Db^-1
    let (ma, da) = to_int_rows(a);
    let (mbt, db) = to_int_rows(&b.transpose());
    let c = matmul::mul(&ma, &mbt.transpose())?;
    Ok(RatMatrix::from_fn(c.nrows(), c.ncols(), |i, j| {
        Rat::new(c[(i, j)].clone(), &da[i] * &db[j])
    }))
}

pub fn det(a: &RatMatrix) -> Result<Rat> {
    let (m, dens) = to_int_rows(a);
    let d = crate::det::det(&m)?;
    let den = dens.iter().fold(Int::one(), |acc, x| acc * x);
    Ok(Rat::new(d, den))
}

/// Solve A X = B for square nonsingular A.
///
/// Returns None if A is singular.
pub fn solve(a: &RatMatrix, b: &RatMatrix) -> Result<Option<RatMatrix>> {
    if a.nrows() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op: "solve",
            left: a.shape(),
            right: b.shape(),
        });
    }
    // Scaling row i of both sides by the same integer does not
    // change the solution.
    let (ma, da) = to_int_rows(a);
    let (mb, db) = to_int_rows(b);
    let mut ai = ma;
    let mut bi = mb;
    for i in 0..a.nrows() {
        let l = da[i].lcm(&db[i]);
        let (ka, kb) = (&l / &da[i], &l / &db[i]);
        if !ka.is_one() {
            ai.row_mut(i).iter_mut().for_each(|x| *x *= &ka);
        }
        if !kb.is_one() {
            bi.row_mut(i).iter_mut().for_each(|x| *x *= &kb);
        }
    }
    Ok(crate::solve::solve(&ai, &bi)?.map(|s| s.to_rat()))
}

/// Inverse of a square rational matrix, None if singular.
pub fn inverse(a: &RatMatrix) -> Result<Option<RatMatrix>> {
    // A^-1 = M^-1 diag(dens)
    let (m, dens) = to_int_rows(a);
    let Some(sol) = crate::solve::inverse(&m)? else {
        return Ok(None);
    };
    Ok(Some(RatMatrix::from_fn(m.nrows(), m.ncols(), |i, j| {
        Rat::new(&sol.x[(i, j)] * &dens[j], sol.den.clone())
    })))
}

/// Reduced row echelon form and rank.
pub fn rref(a: &RatMatrix) -> Result<(RatMatrix, usize)> {
    let (m, _) = to_int_rows(a);
    let r = crate::rref::rref(&m)?;
    Ok((from_int(&r.r, &r.den), r.rank))
}

pub fn is_integral(a: &RatMatrix) -> bool {
    a.data().iter().all(|x| x.is_integer())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64, d: i64) -> Rat {
        Rat::new(Int::from(n), Int::from(d))
    }

    fn qmat<const N: usize>(rows: &[[(i64, i64); N]]) -> RatMatrix {
        RatMatrix::from_fn(rows.len(), N, |i, j| q(rows[i][j].0, rows[i][j].1))
    }

    #[test]
    fn test_to_int() {
        let a = qmat(&[[(1, 2), (1, 3)], [(2, 1), (5, 4)]]);
        let (m, dens) = to_int_rows(&a);
        assert_eq!(m, IntMatrix::from_i64(&[[3, 2], [8, 5]]));
        assert_eq!(dens, vec![Int::from(6), Int::from(4)]);
        let (m, den) = to_int(&a);
        assert_eq!(m, IntMatrix::from_i64(&[[6, 4], [24, 15]]));
        assert_eq!(den, Int::from(12));
        assert_eq!(from_int(&m, &den), a);
    }

    #[test]
    fn test_rat_mul_det() {
        let a = qmat(&[[(1, 2), (1, 3)], [(2, 1), (5, 4)]]);
        let b = qmat(&[[(2, 1), (0, 1)], [(-3, 5), (1, 7)]]);
        let c = mul(&a, &b).unwrap();
        // [1 - 1/5, 1/21], [4 - 3/4, 5/28]
        assert_eq!(c, qmat(&[[(4, 5), (1, 21)], [(13, 4), (5, 28)]]));
        // 5/8 - 2/3
        assert_eq!(det(&a).unwrap(), q(-1, 24));
        assert!(mul(&a, &RatMatrix::from_fn(3, 1, |_, _| q(1, 1))).is_err());
    }

    #[test]
    fn test_rat_solve() {
        let a = qmat(&[[(1, 2), (1, 3)], [(2, 1), (5, 4)]]);
        let b = qmat(&[[(1, 1)], [(1, 6)]]);
        let x = solve(&a, &b).unwrap().unwrap();
        assert_eq!(mul(&a, &x).unwrap(), b);
        let ainv = inverse(&a).unwrap().unwrap();
        assert!(mul(&a, &ainv).unwrap().is_identity());
        assert!(mul(&ainv, &a).unwrap().is_identity());

        let s = qmat(&[[(1, 2), (1, 3)], [(3, 2), (1, 1)]]);
        assert_eq!(solve(&s, &b).unwrap(), None);
        assert_eq!(inverse(&s).unwrap(), None);
    }

    #[test]
    fn test_rat_rref() {
        let a = qmat(&[[(1, 2), (1, 3), (1, 1)], [(1, 1), (2, 3), (5, 1)]]);
        let (r, rank) = rref(&a).unwrap();
        assert_eq!(rank, 2);
        assert_eq!(r, qmat(&[[(1, 1), (2, 3), (0, 1)], [(0, 1), (0, 1), (1, 1)]]));
        assert!(!is_integral(&r));
        assert!(is_integral(&mul(&a, &RatMatrix::from_fn(3, 1, |_, _| q(6, 1))).unwrap()));
    }
}
