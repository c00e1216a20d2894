// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Fraction-free LU decomposition (Bareiss elimination).
//!
//! After step k, the trailing entries of the matrix are k x k minors
//! of the input: the division by the previous pivot is always exact.
//! Entries below a pivot are left in place and form the L part
//! used by fraction-free substitution.
//!
//! Elimination starts on 128-bit integers as long as entries are
//! less than 2^62 (checked with a bitmask after each step) and
//! promotes the whole state to big integers otherwise.

use num_traits::{One, ToPrimitive, Zero};

use crate::arith::exact_div;
use crate::{Int, IntMatrix, Permutation};

/// Entries must stay below 2^SMALL_BITS on the 128-bit path.
const SMALL_BITS: u32 = 62;

#[derive(Clone, Debug)]
pub struct Fflu {
    /// The row-permuted input after elimination.
    pub lu: IntMatrix,
    /// The last pivot: the determinant of the leading rank x rank
    /// block of the permuted input restricted to pivot columns.
    /// It is 0 if a rank check was requested and failed.
    pub den: Int,
    pub perm: Permutation,
    pub rank: usize,
    /// Pivot columns, increasing.
    pub pivots: Vec<usize>,
}

impl Fflu {
    /// Indices of input rows which are linearly independent.
    pub fn pivot_rows(&self) -> &[usize] {
        &self.perm.as_slice()[..self.rank]
    }

    /// The square upper triangular factor restricted to pivot columns
    /// (with the L part below the diagonal).
    pub fn pivot_block(&self) -> IntMatrix {
        let rows: Vec<usize> = (0..self.rank).collect();
        self.lu.submatrix(&rows, &self.pivots)
    }
}

struct Progress {
    r: usize,
    col: usize,
    perm: Permutation,
    pivots: Vec<usize>,
    singular: bool,
}

/// Fraction-free LU decomposition.
///
/// If `rank_check` is set, elimination stops at the first column
/// without a pivot and `den` is 0.
pub fn fflu(a: &IntMatrix, rank_check: bool) -> Fflu {
    fflu_impl(a, rank_check, true)
}

fn fflu_impl(a: &IntMatrix, rank_check: bool, allow_small: bool) -> Fflu {
    let (m, n) = a.shape();
    let mut st = Progress {
        r: 0,
        col: 0,
        perm: Permutation::identity(m),
        pivots: vec![],
        singular: false,
    };
    let mut data: Vec<Int>;
    let mut prev: Int;
    if allow_small && a.max_bits() <= SMALL_BITS as u64 {
        let mut small: Vec<i128> = a
            .data()
            .iter()
            .map(|x| x.to_i128().unwrap_or_default())
            .collect();
        let mut sprev: i128 = 1;
        let done = eliminate_small(&mut small, m, n, &mut st, &mut sprev, rank_check);
        data = small.into_iter().map(Int::from).collect();
        prev = Int::from(sprev);
        if !done {
            log::trace!("fflu: promoting to big integers at column {}", st.col);
            eliminate_big(&mut data, m, n, &mut st, &mut prev, rank_check);
        }
    } else {
        data = a.data().to_vec();
        prev = Int::one();
        eliminate_big(&mut data, m, n, &mut st, &mut prev, rank_check);
    }
    let den = if st.singular { Int::zero() } else { prev };
    Fflu {
        lu: IntMatrix::new(m, n, data),
        den,
        perm: st.perm,
        rank: st.r,
        pivots: st.pivots,
    }
}

/// Returns false if entries became too large: the state is then
/// consistent and elimination must continue with big integers.
fn eliminate_small(
    b: &mut [i128],
    m: usize,
    n: usize,
    st: &mut Progress,
    prev: &mut i128,
    rank_check: bool,
) -> bool {
    while st.col < n && st.r < m {
        let (r, c) = (st.r, st.col);
        let Some(p) = (r..m).find(|&i| b[i * n + c] != 0) else {
            if rank_check {
                st.singular = true;
                return true;
            }
            st.col += 1;
            continue;
        };
        if p != r {
            for j in 0..n {
                b.swap(p * n + j, r * n + j);
            }
            st.perm.swap(p, r);
        }
        let piv = b[r * n + c];
        let mut mask: u128 = 0;
        for i in r + 1..m {
            let bic = b[i * n + c];
            for j in c + 1..n {
                let x = b[i * n + j] * piv - bic * b[r * n + j];
                debug_assert!(x % *prev == 0);
                let x = x / *prev;
                mask |= x.unsigned_abs();
                b[i * n + j] = x;
            }
        }
        *prev = piv;
        st.pivots.push(c);
        st.r += 1;
        st.col += 1;
        if mask >> SMALL_BITS != 0 {
            return false;
        }
    }
    true
}

fn eliminate_big(
    b: &mut [Int],
    m: usize,
    n: usize,
    st: &mut Progress,
    prev: &mut Int,
    rank_check: bool,
) {
    while st.col < n && st.r < m {
        let (r, c) = (st.r, st.col);
        let Some(p) = (r..m).find(|&i| !b[i * n + c].is_zero()) else {
            if rank_check {
                st.singular = true;
                return;
            }
            st.col += 1;
            continue;
        };
        if p != r {
            for j in 0..n {
                b.swap(p * n + j, r * n + j);
            }
            st.perm.swap(p, r);
        }
        let (head, tail) = b.split_at_mut((r + 1) * n);
        let rowr = &head[r * n..];
        let piv = &rowr[c];
        for i in 0..m - r - 1 {
            let rowi = &mut tail[i * n..(i + 1) * n];
            let bic = rowi[c].clone();
            for j in c + 1..n {
                let mut x = &rowi[j] * piv;
                if !bic.is_zero() && !rowr[j].is_zero() {
                    x -= &bic * &rowr[j];
                }
                rowi[j] = if prev.is_one() { x } else { exact_div(&x, prev) };
            }
        }
        *prev = piv.clone();
        st.pivots.push(c);
        st.r += 1;
        st.col += 1;
    }
}

/// Fraction-free substitution against a square nonsingular FFLU
/// factorization `lu` (the output of `fflu` restricted to pivot
/// rows and columns).
///
/// Returns X such that A X = den B where den = lu[n-1][n-1]
/// and B is already permuted.
pub fn solve_fflu_precomp(lu: &IntMatrix, b: &IntMatrix) -> IntMatrix {
    let n = lu.nrows();
    assert!(lu.is_square() && b.nrows() == n);
    let mut x = b.clone();
    let k = b.ncols();
    if n == 0 {
        return x;
    }
    // Forward substitution: apply the Bareiss updates to X.
    for l in 0..n - 1 {
        for i in l + 1..n {
            for j in 0..k {
                let mut t = &x[(i, j)] * &lu[(l, l)];
                t -= &lu[(i, l)] * &x[(l, j)];
                x[(i, j)] = if l > 0 {
                    exact_div(&t, &lu[(l - 1, l - 1)])
                } else {
                    t
                };
            }
        }
    }
    // Back substitution.
    let den = lu[(n - 1, n - 1)].clone();
    for i in (0..n).rev() {
        for j in 0..k {
            let mut t = &den * &x[(i, j)];
            for l in i + 1..n {
                t -= &lu[(i, l)] * &x[(l, j)];
            }
            x[(i, j)] = exact_div(&t, &lu[(i, i)]);
        }
    }
    x
}
