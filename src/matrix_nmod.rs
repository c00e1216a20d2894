// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Dense matrices over GF(p) for word-sized primes p.
//!
//! Entries are stored in Montgomery form. These matrices are the
//! building blocks of multi-modular algorithms: they are created
//! by reducing an integer matrix, used for a few operations and
//! discarded.

use crate::arith_montgomery::Zmod64;
use crate::matrix::MatRef;
use crate::Int;

#[derive(Clone, Debug)]
pub struct NmodMatrix {
    pub zp: Zmod64,
    rows: usize,
    cols: usize,
    data: Vec<u64>,
}

impl NmodMatrix {
    pub fn zeros(zp: Zmod64, rows: usize, cols: usize) -> Self {
        NmodMatrix {
            zp,
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn identity(zp: Zmod64, n: usize) -> Self {
        let mut m = Self::zeros(zp, n, n);
        for i in 0..n {
            m.data[i * n + i] = zp.one();
        }
        m
    }

    /// Reduce an integer matrix modulo p.
    pub fn from_ints(zp: Zmod64, a: MatRef<'_, Int>) -> Self {
        let mut data = Vec::with_capacity(a.nrows() * a.ncols());
        for i in 0..a.nrows() {
            data.extend(a.row(i).iter().map(|x| zp.from_int(x)));
        }
        NmodMatrix {
            zp,
            rows: a.nrows(),
            cols: a.ncols(),
            data,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Entry (i, j) as a plain residue.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.zp.to_u64(self.data[i * self.cols + j])
    }

    /// Set entry (i, j) from a plain residue.
    pub fn set(&mut self, i: usize, j: usize, x: u64) {
        self.data[i * self.cols + j] = self.zp.from_u64(x % self.zp.p);
    }

    /// Row i in Montgomery form.
    pub fn row(&self, i: usize) -> &[u64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    fn row_mut(&mut self, i: usize) -> &mut [u64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Entries as plain residues, row-major.
    pub fn to_residues(&self) -> Vec<u64> {
        self.data.iter().map(|&x| self.zp.to_u64(x)).collect()
    }

    /// Entries lifted to the symmetric interval.
    pub fn to_signed(&self) -> Vec<i64> {
        self.data.iter().map(|&x| self.zp.to_i64(x)).collect()
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.zp, self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        t
    }

    pub fn mul(&self, other: &NmodMatrix) -> NmodMatrix {
        assert_eq!(self.cols, other.rows);
        assert_eq!(self.zp.p, other.zp.p);
        let zp = self.zp;
        let mut res = Self::zeros(zp, self.rows, other.cols);
        if self.cols == 0 {
            return res;
        }
        let bt = other.transpose();
        // Products are less than p^2: accumulate as many as possible
        // while the sum stays below p R.
        let batch = std::cmp::max(1, (u64::MAX / zp.p) as usize);
        for i in 0..self.rows {
            let ai = self.row(i);
            for j in 0..other.cols {
                let bj = bt.row(j);
                let mut acc = 0;
                for (ca, cb) in ai.chunks(batch).zip(bj.chunks(batch)) {
                    let mut s: u128 = 0;
                    for (&x, &y) in ca.iter().zip(cb) {
                        s += x as u128 * y as u128;
                    }
                    acc = zp.add(acc, zp.redc(s));
                }
                res.data[i * other.cols + j] = acc;
            }
        }
        res
    }

    /// Determinant as a plain residue.
    pub fn det(&self) -> u64 {
        assert_eq!(self.rows, self.cols);
        if self.rows == 0 {
            return 1 % self.zp.p;
        }
        let mut eb = EchelonBuilder::new(self.zp, self.cols);
        for i in 0..self.rows {
            if !eb.add(self.row(i).to_vec(), i) {
                return 0;
            }
        }
        eb.det()
    }

    pub fn rank(&self) -> usize {
        let mut eb = EchelonBuilder::new(self.zp, self.cols);
        for i in 0..self.rows {
            eb.add(self.row(i).to_vec(), i);
        }
        eb.rank()
    }

    /// Inverse by Gauss-Jordan elimination, None if singular mod p.
    pub fn inverse(&self) -> Option<NmodMatrix> {
        assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let zp = self.zp;
        let mut a = self.clone();
        let mut inv = Self::identity(zp, n);
        for c in 0..n {
            let piv = (c..n).find(|&i| a.data[i * n + c] != 0)?;
            if piv != c {
                for j in 0..n {
                    a.data.swap(piv * n + j, c * n + j);
                    inv.data.swap(piv * n + j, c * n + j);
                }
            }
            let pinv = zp.inv(a.data[c * n + c])?;
            zp.scale(a.row_mut(c), pinv);
            zp.scale(inv.row_mut(c), pinv);
            let arow = a.row(c).to_vec();
            let irow = inv.row(c).to_vec();
            for i in 0..n {
                let m = a.data[i * n + c];
                if i == c || m == 0 {
                    continue;
                }
                zp.submul(a.row_mut(i), &arow, m);
                zp.submul(inv.row_mut(i), &irow, m);
            }
        }
        Some(inv)
    }

    /// Echelon form with row tracking.
    pub fn echelon(&self) -> NmodEchelon {
        let mut eb = EchelonBuilder::new(self.zp, self.cols);
        for i in 0..self.rows {
            eb.add(self.row(i).to_vec(), i);
        }
        eb.finish()
    }
}

/// The reduced row echelon form of a matrix modulo p.
#[derive(Clone, Debug)]
pub struct NmodEchelon {
    pub rank: usize,
    /// Pivot columns, increasing.
    pub pivots: Vec<usize>,
    /// Indices of a maximal set of independent input rows
    /// (the first ones in input order).
    pub rows: Vec<usize>,
    /// rank x cols reduced echelon form.
    pub rref: NmodMatrix,
}

/// Incremental echelon form over GF(p): rows are added one at a time
/// and reduced against the current basis.
pub struct EchelonBuilder {
    zp: Zmod64,
    cols: usize,
    basis: Vec<Vec<u64>>,
    // pivot column of each basis vector
    indices: Vec<usize>,
    // original pivot value (before normalization)
    factors: Vec<u64>,
    // input row of each basis vector
    rows: Vec<usize>,
}

impl EchelonBuilder {
    pub fn new(zp: Zmod64, cols: usize) -> Self {
        EchelonBuilder {
            zp,
            cols,
            basis: vec![],
            indices: vec![],
            factors: vec![],
            rows: vec![],
        }
    }

    pub fn rank(&self) -> usize {
        self.basis.len()
    }

    /// Add a row (in Montgomery form) tagged by its input index.
    /// Returns false if it is dependent on the previous rows.
    pub fn add(&mut self, mut vp: Vec<u64>, tag: usize) -> bool {
        assert_eq!(vp.len(), self.cols);
        let zp = self.zp;
        // Eliminate
        for (&idx, b) in self.indices.iter().zip(&self.basis) {
            let vi = vp[idx];
            if vi == 0 {
                continue;
            }
            zp.submul(&mut vp, b, vi);
        }
        // Find next echelon index
        let Some(i) = vp.iter().position(|&x| x != 0) else {
            return false;
        };
        let vi = vp[i];
        let Some(vinv) = zp.inv(vi) else {
            // p is not prime
            return false;
        };
        zp.scale(&mut vp, vinv);
        debug_assert_eq!(vp[i], zp.one());
        self.indices.push(i);
        self.basis.push(vp);
        self.factors.push(vi);
        self.rows.push(tag);
        true
    }

    /// Determinant of the square matrix made of the added rows.
    pub fn det(&self) -> u64 {
        let zp = self.zp;
        if self.basis.len() < self.cols {
            return 0;
        }
        // The determinant sign depends on the order of echelon indices.
        let mut ind = self.indices.clone();
        let mut swaps = 0;
        for i in 0..ind.len() {
            let mut j = ind[i];
            while j != i {
                ind.swap(i, j);
                swaps += 1;
                j = ind[i];
            }
        }
        // Multiply diagonal elements
        let mut det = zp.one();
        for &f in &self.factors {
            det = zp.mul(det, f);
        }
        let det = zp.to_u64(det);
        if swaps % 2 == 1 && det > 0 {
            zp.p - det
        } else {
            det
        }
    }

    /// Sort the basis by pivot and clear entries above pivots.
    pub fn finish(mut self) -> NmodEchelon {
        let zp = self.zp;
        let r = self.basis.len();
        let mut order: Vec<usize> = (0..r).collect();
        order.sort_by_key(|&k| self.indices[k]);
        let pivots: Vec<usize> = order.iter().map(|&k| self.indices[k]).collect();
        let mut basis: Vec<Vec<u64>> = order
            .iter()
            .map(|&k| std::mem::take(&mut self.basis[k]))
            .collect();
        for k in (0..r).rev() {
            let (head, tail) = basis.split_at_mut(k);
            let bk = &tail[0];
            for bi in head.iter_mut() {
                let m = bi[pivots[k]];
                if m != 0 {
                    zp.submul(bi, bk, m);
                }
            }
        }
        let mut rows = self.rows.clone();
        rows.sort();
        let mut rref = NmodMatrix::zeros(zp, r, self.cols);
        for (k, b) in basis.into_iter().enumerate() {
            rref.row_mut(k).copy_from_slice(&b);
        }
        NmodEchelon {
            rank: r,
            pivots,
            rows,
            rref,
        }
    }
}
