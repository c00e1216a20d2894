// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Multiplication of integer matrices.
//!
//! The product is computed by one of several interchangeable
//! algorithms which must all return the same result:
//! - a classical triple loop over big integers
//! - "double-word" kernels accumulating in fixed-size registers
//!   (u128, i128 or 256-bit integers) when entries are small
//! - a multi-modular product over 63-bit primes, reconstructed
//!   using CRT
//! - Strassen-Winograd recursion (Bodrato's variant for squares)
//!   for large dimensions and large entries.
//!
//! Reference for the squaring scheme:
//! Marco Bodrato, A Strassen-like matrix multiplication suited
//! for squaring and higher power computation, ISSAC 2010

use std::cmp::{max, min};

use bnum::types::I256;
use num_traits::{ToPrimitive, Zero};
use rayon::prelude::*;

use crate::arith;
use crate::arith_crt::CrtBasis;
use crate::arith_montgomery::Zmod64;
use crate::matrix::MatRef;
use crate::matrix_nmod::NmodMatrix;
use crate::{Error, Int, IntMatrix, Preferences, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MulStrategy {
    /// One of the dimensions is zero.
    Zero,
    Classical,
    DoubleWord,
    MultiModular,
    Strassen,
}

/// Entries up to this size use the double-word kernels.
pub const DOUBLE_WORD_MAX_BITS: u64 = 127;
/// Strassen recursion is used above these sizes.
pub const STRASSEN_MIN_BITS: u64 = 6000;
pub const STRASSEN_MIN_DIM: usize = 16;
/// Below this dimension the multi-modular setup cost is not worth it.
pub const CLASSICAL_MAX_DIM: usize = 3;

/// Choose a multiplication algorithm for a (m x k) by (k x n) product
/// whose entries have at most `bits` bits.
pub fn select_strategy(m: usize, k: usize, n: usize, bits: u64) -> MulStrategy {
    if m == 0 || k == 0 || n == 0 {
        return MulStrategy::Zero;
    }
    if bits <= DOUBLE_WORD_MAX_BITS {
        return MulStrategy::DoubleWord;
    }
    let dim = min(m, min(k, n));
    if dim >= STRASSEN_MIN_DIM && bits >= STRASSEN_MIN_BITS {
        return MulStrategy::Strassen;
    }
    if dim <= CLASSICAL_MAX_DIM {
        return MulStrategy::Classical;
    }
    MulStrategy::MultiModular
}

fn check_dims(a: &IntMatrix, b: &IntMatrix, op: &'static str) -> Result<()> {
    if a.ncols() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op,
            left: a.shape(),
            right: b.shape(),
        });
    }
    Ok(())
}

/// Product of integer matrices.
pub fn mul(a: &IntMatrix, b: &IntMatrix) -> Result<IntMatrix> {
    mul_opts(a, b, &Preferences::default())
}

/// Product of integer matrices, using the thread pool from preferences.
pub fn mul_opts(a: &IntMatrix, b: &IntMatrix, prefs: &Preferences) -> Result<IntMatrix> {
    check_dims(a, b, "mul")?;
    Ok(mul_ref(a.as_ref(), b.as_ref(), prefs.tpool()))
}

/// Product of integer matrices using a given algorithm.
pub fn mul_with(
    a: &IntMatrix,
    b: &IntMatrix,
    strategy: MulStrategy,
    prefs: &Preferences,
) -> Result<IntMatrix> {
    check_dims(a, b, "mul")?;
    let (a, b) = (a.as_ref(), b.as_ref());
    let tpool = prefs.tpool();
    let res = match strategy {
        MulStrategy::Zero => {
            if a.nrows() > 0 && a.ncols() > 0 && b.ncols() > 0 {
                return Err(Error::InvalidParameter {
                    op: "mul",
                    reason: "zero product strategy requires an empty dimension",
                });
            }
            IntMatrix::zeros(a.nrows(), b.ncols())
        }
        MulStrategy::Classical => mul_classical(a, b),
        MulStrategy::DoubleWord => {
            if max(a.max_bits(), b.max_bits()) > DOUBLE_WORD_MAX_BITS {
                return Err(Error::InvalidParameter {
                    op: "mul",
                    reason: "entries are too large for double-word arithmetic",
                });
            }
            mul_doubleword(a, b)
        }
        MulStrategy::MultiModular => mul_multimod(a, b, tpool),
        MulStrategy::Strassen => mul_strassen(a, b, tpool),
    };
    Ok(res)
}

/// Square of a square matrix.
pub fn sqr(a: &IntMatrix) -> Result<IntMatrix> {
    sqr_opts(a, &Preferences::default())
}

pub fn sqr_opts(a: &IntMatrix, prefs: &Preferences) -> Result<IntMatrix> {
    if !a.is_square() {
        return Err(Error::NotSquare {
            op: "sqr",
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(sqr_ref(a.as_ref(), prefs.tpool()))
}

/// Square of a square matrix using Bodrato's recursion
/// regardless of sizes.
pub fn sqr_bodrato(a: &IntMatrix, prefs: &Preferences) -> Result<IntMatrix> {
    if !a.is_square() {
        return Err(Error::NotSquare {
            op: "sqr",
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(sqr_strassen(a.as_ref(), prefs.tpool()))
}

/// Dispatching product on matrix views.
pub(crate) fn mul_ref(
    a: MatRef<'_, Int>,
    b: MatRef<'_, Int>,
    tpool: Option<&rayon::ThreadPool>,
) -> IntMatrix {
    assert_eq!(a.ncols(), b.nrows());
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let bits = if m == 0 || k == 0 || n == 0 {
        0
    } else {
        max(a.max_bits(), b.max_bits())
    };
    let strategy = select_strategy(m, k, n, bits);
    if m * n * k > 1000 {
        log::debug!("matmul {m}x{k}x{n} {bits} bits: {strategy:?}");
    }
    match strategy {
        MulStrategy::Zero => IntMatrix::zeros(m, n),
        MulStrategy::Classical => mul_classical(a, b),
        MulStrategy::DoubleWord => mul_doubleword(a, b),
        MulStrategy::MultiModular => mul_multimod(a, b, tpool),
        MulStrategy::Strassen => mul_strassen(a, b, tpool),
    }
}

fn sqr_ref(a: MatRef<'_, Int>, tpool: Option<&rayon::ThreadPool>) -> IntMatrix {
    let n = a.nrows();
    let bits = if n == 0 { 0 } else { a.max_bits() };
    match select_strategy(n, n, n, bits) {
        MulStrategy::Strassen => sqr_strassen(a, tpool),
        _ => mul_ref(a, a, tpool),
    }
}

pub(crate) fn mul_classical(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let mut c = IntMatrix::zeros(m, n);
    for i in 0..m {
        let ci = c.row_mut(i);
        for (l, ail) in a.row(i).iter().enumerate().take(k) {
            if ail.is_zero() {
                continue;
            }
            for (cij, blj) in ci.iter_mut().zip(b.row(l)) {
                if !blj.is_zero() {
                    *cij += ail * blj;
                }
            }
        }
    }
    c
}

// Double-word kernels

fn mul_doubleword(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    let bits = max(a.max_bits(), b.max_bits());
    let signed = a.has_negative() || b.has_negative();
    if !signed && bits <= 64 {
        dw_kernel_u64(a, b)
    } else if bits <= 63 {
        dw_kernel_i64(a, b)
    } else {
        debug_assert!(bits <= DOUBLE_WORD_MAX_BITS);
        dw_kernel_i128(a, b)
    }
}

fn flatten<T, F: Fn(&Int) -> T>(a: MatRef<'_, Int>, f: F) -> Vec<T> {
    let mut v = Vec::with_capacity(a.nrows() * a.ncols());
    for i in 0..a.nrows() {
        v.extend(a.row(i).iter().map(&f));
    }
    v
}

fn flatten_transpose<T, F: Fn(&Int) -> T>(b: MatRef<'_, Int>, f: F) -> Vec<T> {
    let mut v = Vec::with_capacity(b.nrows() * b.ncols());
    for j in 0..b.ncols() {
        v.extend((0..b.nrows()).map(|i| f(b.get(i, j))));
    }
    v
}

/// Dot product of row i of a and column j of b over big integers.
/// This is the fallback when an accumulator overflows.
fn dot_big(a: MatRef<'_, Int>, b: MatRef<'_, Int>, i: usize, j: usize) -> Int {
    let mut s = Int::zero();
    for (l, x) in a.row(i).iter().enumerate() {
        s += x * b.get(l, j);
    }
    s
}

fn dw_kernel_u64(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let av = flatten(a, |x| x.to_u64().unwrap_or_default());
    let bt = flatten_transpose(b, |x| x.to_u64().unwrap_or_default());
    IntMatrix::from_fn(m, n, |i, j| {
        let (ai, bj) = (&av[i * k..(i + 1) * k], &bt[j * k..(j + 1) * k]);
        let mut acc: u128 = 0;
        for (&x, &y) in ai.iter().zip(bj) {
            match acc.checked_add(x as u128 * y as u128) {
                Some(s) => acc = s,
                None => return dot_big(a, b, i, j),
            }
        }
        Int::from(acc)
    })
}

fn dw_kernel_i64(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let av = flatten(a, |x| x.to_i64().unwrap_or_default());
    let bt = flatten_transpose(b, |x| x.to_i64().unwrap_or_default());
    IntMatrix::from_fn(m, n, |i, j| {
        let (ai, bj) = (&av[i * k..(i + 1) * k], &bt[j * k..(j + 1) * k]);
        let mut acc: i128 = 0;
        for (&x, &y) in ai.iter().zip(bj) {
            match acc.checked_add(x as i128 * y as i128) {
                Some(s) => acc = s,
                None => return dot_big(a, b, i, j),
            }
        }
        Int::from(acc)
    })
}

fn dw_kernel_i128(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let av = flatten(a, |x| x.to_i128().unwrap_or_default());
    let bt = flatten_transpose(b, |x| x.to_i128().unwrap_or_default());
    IntMatrix::from_fn(m, n, |i, j| {
        let (ai, bj) = (&av[i * k..(i + 1) * k], &bt[j * k..(j + 1) * k]);
        let mut acc = I256::ZERO;
        for (&x, &y) in ai.iter().zip(bj) {
            // Products of 127-bit integers fit in 255 bits.
            match acc.checked_add(I256::from(x) * I256::from(y)) {
                Some(s) => acc = s,
                None => return dot_big(a, b, i, j),
            }
        }
        i256_to_int(&acc)
    })
}

fn i256_to_int(x: &I256) -> Int {
    let neg = x.is_negative();
    let abs = x.unsigned_abs();
    let mut r = Int::zero();
    for &w in abs.digits().iter().rev() {
        r <<= 64;
        r += w;
    }
    if neg {
        -r
    } else {
        r
    }
}

// Multi-modular product

fn mul_multimod(
    a: MatRef<'_, Int>,
    b: MatRef<'_, Int>,
    tpool: Option<&rayon::ThreadPool>,
) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    if m == 0 || n == 0 || k == 0 {
        return IntMatrix::zeros(m, n);
    }
    // |C[i][j]| <= k |A| |B| < 2^bits
    let bits = a.max_bits() + b.max_bits() + arith::clog2(k) + 1;
    let signed = a.has_negative() || b.has_negative();
    let basis = CrtBasis::for_bits(bits);
    log::trace!("multimodular product with {} primes", basis.len());
    let modp = |&p: &u64| -> Vec<u64> {
        let zp = Zmod64::new(p);
        let am = NmodMatrix::from_ints(zp, a);
        let bm = NmodMatrix::from_ints(zp, b);
        am.mul(&bm).to_residues()
    };
    let crt_row = |residues: &[Vec<u64>], i: usize| -> Vec<Int> {
        let mut r = vec![0; residues.len()];
        (0..n)
            .map(|j| {
                for (rp, res) in r.iter_mut().zip(residues) {
                    *rp = res[i * n + j];
                }
                if signed {
                    basis.reconstruct_signed(&r)
                } else {
                    basis.reconstruct(&r)
                }
            })
            .collect()
    };
    let rows: Vec<Vec<Int>> = if let Some(pool) = tpool {
        pool.install(|| {
            let residues: Vec<Vec<u64>> = basis.primes.par_iter().map(modp).collect();
            (0..m)
                .into_par_iter()
                .map(|i| crt_row(&residues, i))
                .collect()
        })
    } else {
        let residues: Vec<Vec<u64>> = basis.primes.iter().map(modp).collect();
        (0..m).map(|i| crt_row(&residues, i)).collect()
    };
    IntMatrix::from_rows(rows)
}

// Strassen-Winograd recursion

fn add_views(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    IntMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a.get(i, j) + b.get(i, j))
}

fn sub_views(a: MatRef<'_, Int>, b: MatRef<'_, Int>) -> IntMatrix {
    IntMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a.get(i, j) - b.get(i, j))
}

/// Complete a product computed on the even-sized leading blocks:
/// c[0..m2][0..n2] must hold a[0..m2][0..k2] b[0..k2][0..n2].
fn peel(a: MatRef<'_, Int>, b: MatRef<'_, Int>, c: &mut IntMatrix, m2: usize, k2: usize, n2: usize) {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    if k2 < k {
        // rank 1 correction from the last column of a
        let brow = b.row(k - 1);
        for i in 0..m2 {
            let aik = a.get(i, k - 1);
            if aik.is_zero() {
                continue;
            }
            for (cij, bkj) in c.row_mut(i)[..n2].iter_mut().zip(brow) {
                *cij += aik * bkj;
            }
        }
    }
    if n2 < n {
        for i in 0..m {
            c[(i, n - 1)] = dot_big(a, b, i, n - 1);
        }
    }
    if m2 < m {
        for j in 0..n2 {
            c[(m - 1, j)] = dot_big(a, b, m - 1, j);
        }
    }
}

fn mul_strassen(
    a: MatRef<'_, Int>,
    b: MatRef<'_, Int>,
    tpool: Option<&rayon::ThreadPool>,
) -> IntMatrix {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let (hm, hk, hn) = (m / 2, k / 2, n / 2);
    if hm == 0 || hk == 0 || hn == 0 {
        return mul_classical(a, b);
    }
    let a11 = a.window(0, 0, hm, hk);
    let a12 = a.window(0, hk, hm, hk);
    let a21 = a.window(hm, 0, hm, hk);
    let a22 = a.window(hm, hk, hm, hk);
    let b11 = b.window(0, 0, hk, hn);
    let b12 = b.window(0, hn, hk, hn);
    let b21 = b.window(hk, 0, hk, hn);
    let b22 = b.window(hk, hn, hk, hn);

    let s1 = add_views(a21, a22);
    let s2 = sub_views(s1.as_ref(), a11);
    let s3 = sub_views(a11, a21);
    let s4 = sub_views(a12, s2.as_ref());
    let t1 = sub_views(b12, b11);
    let t2 = sub_views(b22, t1.as_ref());
    let t3 = sub_views(b22, b12);
    let t4 = sub_views(t2.as_ref(), b21);

    let p1 = mul_ref(a11, b11, tpool);
    let p2 = mul_ref(a12, b21, tpool);
    let p3 = mul_ref(s4.as_ref(), b22, tpool);
    let p4 = mul_ref(a22, t4.as_ref(), tpool);
    let p5 = mul_ref(s1.as_ref(), t1.as_ref(), tpool);
    let p6 = mul_ref(s2.as_ref(), t2.as_ref(), tpool);
    let p7 = mul_ref(s3.as_ref(), t3.as_ref(), tpool);

    let c11 = add_views(p1.as_ref(), p2.as_ref());
    let u2 = add_views(p1.as_ref(), p6.as_ref());
    let u3 = add_views(u2.as_ref(), p7.as_ref());
    let u4 = add_views(u2.as_ref(), p5.as_ref());
    let c12 = add_views(u4.as_ref(), p3.as_ref());
    let c21 = sub_views(u3.as_ref(), p4.as_ref());
    let c22 = add_views(u3.as_ref(), p5.as_ref());

    let mut c = IntMatrix::zeros(m, n);
    c.window_mut(0, 0, hm, hn).copy_from(c11.as_ref());
    c.window_mut(0, hn, hm, hn).copy_from(c12.as_ref());
    c.window_mut(hm, 0, hm, hn).copy_from(c21.as_ref());
    c.window_mut(hm, hn, hm, hn).copy_from(c22.as_ref());
    peel(a, b, &mut c, 2 * hm, 2 * hk, 2 * hn);
    c
}

fn sqr_strassen(a: MatRef<'_, Int>, tpool: Option<&rayon::ThreadPool>) -> IntMatrix {
    let n = a.nrows();
    let h = n / 2;
    if h == 0 {
        return mul_classical(a, a);
    }
    let x = a.window(0, 0, h, h);
    let y = a.window(0, h, h, h);
    let z = a.window(h, 0, h, h);
    let w = a.window(h, h, h, h);

    let wy = add_views(w, y);
    let wz = sub_views(w, z);
    let wzy = add_views(wz.as_ref(), y);
    let wzyx = sub_views(wzy.as_ref(), x);

    let p1 = sqr_ref(wy.as_ref(), tpool);
    let p2 = sqr_ref(wz.as_ref(), tpool);
    let p3 = sqr_ref(wzy.as_ref(), tpool);
    let p4 = mul_ref(wzyx.as_ref(), y, tpool);
    let p5 = mul_ref(z, wzyx.as_ref(), tpool);
    let p6 = mul_ref(y, z, tpool);
    let p7 = sqr_ref(x, tpool);

    let c11 = add_views(p7.as_ref(), p6.as_ref());
    // c12 = p3 - p2 - p4 + p6
    let mut c12 = sub_views(p3.as_ref(), p2.as_ref());
    c12 = sub_views(c12.as_ref(), p4.as_ref());
    c12 = add_views(c12.as_ref(), p6.as_ref());
    // c21 = p1 - p3 - p5 - p6
    let p13 = sub_views(p1.as_ref(), p3.as_ref());
    let mut c21 = sub_views(p13.as_ref(), p5.as_ref());
    c21 = sub_views(c21.as_ref(), p6.as_ref());
    // c22 = p1 + p2 - p3 - p6
    let mut c22 = add_views(p13.as_ref(), p2.as_ref());
    c22 = sub_views(c22.as_ref(), p6.as_ref());

    let mut c = IntMatrix::zeros(n, n);
    c.window_mut(0, 0, h, h).copy_from(c11.as_ref());
    c.window_mut(0, h, h, h).copy_from(c12.as_ref());
    c.window_mut(h, 0, h, h).copy_from(c21.as_ref());
    c.window_mut(h, h, h, h).copy_from(c22.as_ref());
    peel(a, a, &mut c, 2 * h, 2 * h, 2 * h);
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut impl Rng, m: usize, n: usize, bits: u64, signed: bool) -> IntMatrix {
        IntMatrix::from_fn(m, n, |_, _| {
            let words: Vec<u32> = (0..(bits + 31) / 32).map(|_| rng.gen()).collect();
            let mut x = Int::from_slice(num_bigint::Sign::Plus, &words);
            x >>= (32 * words.len() as u64).saturating_sub(bits);
            if signed && rng.gen::<bool>() {
                -x
            } else {
                x
            }
        })
    }

    const ALL: [MulStrategy; 4] = [
        MulStrategy::Classical,
        MulStrategy::DoubleWord,
        MulStrategy::MultiModular,
        MulStrategy::Strassen,
    ];

    #[test]
    fn test_select_strategy() {
        assert_eq!(select_strategy(0, 5, 5, 1000), MulStrategy::Zero);
        assert_eq!(select_strategy(5, 0, 5, 1000), MulStrategy::Zero);
        assert_eq!(select_strategy(100, 100, 100, 64), MulStrategy::DoubleWord);
        assert_eq!(select_strategy(100, 100, 100, 127), MulStrategy::DoubleWord);
        assert_eq!(select_strategy(100, 100, 100, 128), MulStrategy::MultiModular);
        assert_eq!(select_strategy(2, 100, 100, 500), MulStrategy::Classical);
        assert_eq!(select_strategy(32, 32, 32, 8000), MulStrategy::Strassen);
        assert_eq!(select_strategy(8, 32, 32, 8000), MulStrategy::MultiModular);
    }

    #[test]
    fn test_small_product() {
        let a = IntMatrix::from_i64(&[[1, 2], [3, 4]]);
        let b = IntMatrix::from_i64(&[[5, 6, 7], [8, 9, 10]]);
        let expect = IntMatrix::from_i64(&[[21, 24, 27], [47, 54, 61]]);
        let prefs = Preferences::default();
        for s in ALL {
            assert_eq!(mul_with(&a, &b, s, &prefs).unwrap(), expect, "{s:?}");
        }
        assert!(mul(&b, &a).is_err());
        let e = mul(&IntMatrix::zeros(3, 0), &IntMatrix::zeros(0, 2)).unwrap();
        assert_eq!(e, IntMatrix::zeros(3, 2));
        let e = mul_with(&IntMatrix::zeros(3, 0), &IntMatrix::zeros(0, 2), MulStrategy::Zero, &prefs);
        assert_eq!(e.unwrap(), IntMatrix::zeros(3, 2));
    }

    #[test]
    fn test_strategies_agree() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1234);
        let prefs = Preferences::default();
        for (m, k, n, bits, signed) in [
            (5, 7, 3, 20, false),
            (6, 9, 11, 63, true),
            (4, 4, 4, 64, false),
            (7, 5, 9, 100, true),
            (9, 9, 9, 127, true),
        ] {
            let a = random_matrix(&mut rng, m, k, bits, signed);
            let b = random_matrix(&mut rng, k, n, bits, signed);
            let c = mul_with(&a, &b, MulStrategy::Classical, &prefs).unwrap();
            for s in ALL {
                assert_eq!(mul_with(&a, &b, s, &prefs).unwrap(), c, "{s:?} {m}x{k}x{n}");
            }
        }
        // Large entries: double-word is not applicable.
        for (m, k, n) in [(5, 6, 7), (8, 8, 8), (17, 3, 18)] {
            let a = random_matrix(&mut rng, m, k, 300, true);
            let b = random_matrix(&mut rng, k, n, 200, false);
            let c = mul_with(&a, &b, MulStrategy::Classical, &prefs).unwrap();
            assert_eq!(mul_with(&a, &b, MulStrategy::MultiModular, &prefs).unwrap(), c);
            assert_eq!(mul_with(&a, &b, MulStrategy::Strassen, &prefs).unwrap(), c);
            assert!(mul_with(&a, &b, MulStrategy::DoubleWord, &prefs).is_err());
        }
    }

    #[test]
    fn test_strassen_dispatch() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(6000);
        let prefs = Preferences::default();
        let a = random_matrix(&mut rng, 16, 16, 6100, true);
        let b = random_matrix(&mut rng, 16, 17, 6100, false);
        let bits = max(a.max_bits(), b.max_bits());
        assert_eq!(select_strategy(16, 16, 17, bits), MulStrategy::Strassen);
        let c = mul_with(&a, &b, MulStrategy::Classical, &prefs).unwrap();
        assert_eq!(mul(&a, &b).unwrap(), c);
        let c = mul_with(&a, &a, MulStrategy::Classical, &prefs).unwrap();
        assert_eq!(sqr(&a).unwrap(), c);
    }

    #[test]
    fn test_doubleword_overflow() {
        // Sums of products overflow 128 bits: the kernels fall back
        // to big integer arithmetic.
        let big = (1_u64 << 63) + 12345;
        let a = IntMatrix::from_fn(2, 8, |_, _| Int::from(big));
        let b = IntMatrix::from_fn(8, 2, |_, _| Int::from(u64::MAX));
        let c = mul_with(&a, &b, MulStrategy::DoubleWord, &Preferences::default()).unwrap();
        assert_eq!(c[(1, 1)], Int::from(big) * Int::from(u64::MAX) * 8);

        let x: i128 = (1 << 126) + 1;
        let a = IntMatrix::from_fn(1, 8, |_, _| Int::from(x));
        let b = IntMatrix::from_fn(8, 1, |_, _| Int::from(-x));
        let c = mul_with(&a, &b, MulStrategy::DoubleWord, &Preferences::default()).unwrap();
        assert_eq!(c[(0, 0)], Int::from(x) * Int::from(-x) * 8);
        let a = IntMatrix::from_fn(1, 2, |_, j| Int::from(if j == 0 { x } else { -x }));
        let b = IntMatrix::from_fn(2, 1, |_, _| Int::from(x));
        let c = mul_with(&a, &b, MulStrategy::DoubleWord, &Preferences::default()).unwrap();
        assert!(c[(0, 0)].is_zero());
    }

    #[test]
    fn test_squaring() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        let prefs = Preferences::default();
        for n in [1, 2, 3, 6, 7] {
            let a = random_matrix(&mut rng, n, n, 150, true);
            let c = mul_with(&a, &a, MulStrategy::Classical, &prefs).unwrap();
            assert_eq!(sqr_bodrato(&a, &prefs).unwrap(), c);
            assert_eq!(sqr(&a).unwrap(), c);
        }
        assert!(sqr(&IntMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_multimod_threads() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let a = random_matrix(&mut rng, 12, 10, 400, true);
        let b = random_matrix(&mut rng, 10, 13, 400, true);
        let single = mul_with(&a, &b, MulStrategy::MultiModular, &Preferences::default()).unwrap();
        let prefs = Preferences::with_threads(3);
        let multi = mul_with(&a, &b, MulStrategy::MultiModular, &prefs).unwrap();
        assert_eq!(single, multi);
        assert_eq!(single, mul_with(&a, &b, MulStrategy::Classical, &prefs).unwrap());
    }
}
