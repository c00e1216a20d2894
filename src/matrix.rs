// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Dense row-major matrices of exact numbers.
//!
//! A `Matrix` owns its entries. Recursive algorithms work on
//! windows (`MatRef`, `MatMut`) which borrow a rectangular block of
//! the parent matrix: a write through a `MatMut` is a write into
//! the parent.

use std::fmt;
use std::ops::{AddAssign, Index, IndexMut, MulAssign, Neg, SubAssign};

use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::{Error, Int, Rat, Result};

/// Entries of a matrix: exact numbers with in-place ring operations.
pub trait Scalar:
    Clone
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + Zero
    + One
    + Neg<Output = Self>
    + for<'a> AddAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
{
}

impl<T> Scalar for T where
    T: Clone
        + fmt::Debug
        + fmt::Display
        + PartialEq
        + Zero
        + One
        + Neg<Output = Self>
        + for<'a> AddAssign<&'a Self>
        + for<'a> SubAssign<&'a Self>
        + for<'a> MulAssign<&'a Self>
{
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

pub type IntMatrix = Matrix<Int>;
pub type RatMatrix = Matrix<Rat>;

impl<T> Matrix<T> {
    /// Build a matrix from row-major entries.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), rows * cols, "wrong number of entries");
        if rows == 0 || cols == 0 {
            return Matrix {
                rows,
                cols,
                data: vec![],
            };
        }
        Matrix { rows, cols, data }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self::new(rows, cols, data)
    }

    /// Build a matrix from a list of rows, which must have equal lengths.
    /// The column count of an empty list is 0.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(nrows * ncols);
        for r in rows {
            assert_eq!(r.len(), ncols, "rows have different lengths");
            data.extend(r);
        }
        Self::new(nrows, ncols, data)
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// A matrix with no entries (but possibly a nonzero dimension).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Mutable access to two distinct rows.
    pub fn two_rows_mut(&mut self, i: usize, j: usize) -> (&mut [T], &mut [T]) {
        assert!(i != j);
        let c = self.cols;
        if i < j {
            let (lo, hi) = self.data.split_at_mut(j * c);
            (&mut lo[i * c..(i + 1) * c], &mut hi[..c])
        } else {
            let (lo, hi) = self.data.split_at_mut(i * c);
            (&mut hi[..c], &mut lo[j * c..(j + 1) * c])
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn into_rows(self) -> Vec<Vec<T>> {
        let cols = self.cols;
        let rows = self.rows;
        if cols == 0 {
            return (0..rows).map(|_| vec![]).collect();
        }
        let mut res = Vec::with_capacity(rows);
        let mut it = self.data.into_iter();
        for _ in 0..rows {
            res.push(it.by_ref().take(cols).collect());
        }
        res
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (ri, rj) = self.two_rows_mut(i, j);
        ri.swap_with_slice(rj);
    }

    pub fn swap_cols(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for r in 0..self.rows {
            self.data.swap(r * self.cols + i, r * self.cols + j);
        }
    }

    pub fn as_ref(&self) -> MatRef<'_, T> {
        MatRef {
            data: &self.data,
            stride: self.cols,
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        MatMut {
            data: &mut self.data,
            stride: self.cols,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// A borrowed view of rows r0..r0+rows and columns c0..c0+cols.
    pub fn window(&self, r0: usize, c0: usize, rows: usize, cols: usize) -> MatRef<'_, T> {
        self.as_ref().window(r0, c0, rows, cols)
    }

    pub fn window_mut(&mut self, r0: usize, c0: usize, rows: usize, cols: usize) -> MatMut<'_, T> {
        self.as_mut().into_window(r0, c0, rows, cols)
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Matrix<T> {
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)].clone())
    }

    /// The matrix made of the selected rows and columns, in the given order.
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self::from_fn(rows.len(), cols.len(), |i, j| self[(rows[i], cols[j])].clone())
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &i in rows {
            data.extend_from_slice(self.row(i));
        }
        Self::new(rows.len(), self.cols, data)
    }

    /// Concatenate columns of self and other.
    pub fn hstack(&self, other: &Self) -> Result<Self> {
        if self.rows != other.rows {
            return Err(Error::DimensionMismatch {
                op: "hstack",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.extend_from_slice(self.row(i));
            data.extend_from_slice(other.row(i));
        }
        Ok(Self::new(self.rows, cols, data))
    }

    /// Concatenate rows of self and other.
    pub fn vstack(&self, other: &Self) -> Result<Self> {
        if self.cols != other.cols {
            return Err(Error::DimensionMismatch {
                op: "vstack",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Ok(Self::new(self.rows + other.rows, self.cols, data))
    }
}

impl<T: Scalar> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, vec![T::zero(); rows * cols])
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|x| x.is_zero())
    }

    pub fn is_identity(&self) -> bool {
        self.is_square()
            && (0..self.rows).all(|i| {
                self.row(i)
                    .iter()
                    .enumerate()
                    .all(|(j, x)| if i == j { x.is_one() } else { x.is_zero() })
            })
    }

    fn check_same_shape(&self, other: &Self, op: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::DimensionMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_shape(other, "add")?;
        let mut res = self.clone();
        for (x, y) in res.data.iter_mut().zip(&other.data) {
            *x += y;
        }
        Ok(res)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_same_shape(other, "sub")?;
        let mut res = self.clone();
        for (x, y) in res.data.iter_mut().zip(&other.data) {
            *x -= y;
        }
        Ok(res)
    }

    pub fn neg(&self) -> Self {
        self.map(|x| -x.clone())
    }

    pub fn scalar_mul(&self, c: &T) -> Self {
        let mut res = self.clone();
        res.scale(c);
        res
    }

    pub fn scale(&mut self, c: &T) {
        for x in self.data.iter_mut() {
            *x *= c;
        }
    }
}

impl IntMatrix {
    /// Convenience constructor from small integers.
    pub fn from_i64<const N: usize>(rows: &[[i64; N]]) -> Self {
        Self::from_fn(rows.len(), N, |i, j| Int::from(rows[i][j]))
    }

    /// Maximal bit length of entries.
    pub fn max_bits(&self) -> u64 {
        self.data.iter().map(|x| x.bits()).max().unwrap_or(0)
    }

    pub fn has_negative(&self) -> bool {
        self.data.iter().any(|x| x.is_negative())
    }

    /// GCD of all entries (0 for the zero matrix).
    pub fn content(&self) -> Int {
        let mut g = Int::zero();
        for x in &self.data {
            if !x.is_zero() {
                g = g.gcd(x);
                if g.is_one() {
                    break;
                }
            }
        }
        g
    }

    pub fn to_rat(&self) -> RatMatrix {
        self.map(|x| Rat::from_integer(x.clone()))
    }

    /// Divide all entries by an exact divisor.
    pub fn div_exact(&mut self, d: &Int) {
        for x in self.data.iter_mut() {
            *x = crate::arith::exact_div(x, d);
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i * self.cols + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i * self.cols + j]
    }
}

impl<T: fmt::Display> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows {
            if i > 0 {
                write!(f, ",\n ")?;
            }
            write!(f, "[")?;
            for (j, x) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{x}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

impl<T: fmt::Display> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix {}x{} ", self.rows, self.cols)?;
        fmt::Display::fmt(self, f)
    }
}

/// A read-only view of a rectangular block of a matrix.
pub struct MatRef<'a, T> {
    data: &'a [T],
    stride: usize,
    rows: usize,
    cols: usize,
}

impl<'a, T> Clone for MatRef<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for MatRef<'a, T> {}

impl<'a, T> MatRef<'a, T> {
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row(&self, i: usize) -> &'a [T] {
        debug_assert!(i < self.rows);
        let start = i * self.stride;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &'a T {
        debug_assert!(j < self.cols);
        &self.data[i * self.stride + j]
    }

    pub fn window(&self, r0: usize, c0: usize, rows: usize, cols: usize) -> MatRef<'a, T> {
        assert!(r0 + rows <= self.rows && c0 + cols <= self.cols);
        if rows == 0 || cols == 0 {
            return MatRef {
                data: Default::default(),
                stride: 0,
                rows,
                cols,
            };
        }
        MatRef {
            data: &self.data[r0 * self.stride + c0..],
            stride: self.stride,
            rows,
            cols,
        }
    }

    pub fn to_owned(&self) -> Matrix<T>
    where
        T: Clone,
    {
        let mut data = Vec::with_capacity(self.rows * self.cols);
        for i in 0..self.rows {
            data.extend_from_slice(self.row(i));
        }
        Matrix::new(self.rows, self.cols, data)
    }
}

impl<'a> MatRef<'a, Int> {
    pub fn max_bits(&self) -> u64 {
        (0..self.rows)
            .flat_map(|i| self.row(i).iter().map(|x| x.bits()))
            .max()
            .unwrap_or(0)
    }

    pub fn has_negative(&self) -> bool {
        (0..self.rows).any(|i| self.row(i).iter().any(|x| x.is_negative()))
    }
}

/// A mutable view of a rectangular block of a matrix.
pub struct MatMut<'a, T> {
    data: &'a mut [T],
    stride: usize,
    rows: usize,
    cols: usize,
}

impl<'a, T> MatMut<'a, T> {
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        debug_assert!(i < self.rows);
        let start = i * self.stride;
        &mut self.data[start..start + self.cols]
    }

    pub fn rb(&self) -> MatRef<'_, T> {
        MatRef {
            data: &*self.data,
            stride: self.stride,
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn window_mut(&mut self, r0: usize, c0: usize, rows: usize, cols: usize) -> MatMut<'_, T> {
        MatMut {
            data: &mut *self.data,
            stride: self.stride,
            rows: self.rows,
            cols: self.cols,
        }
        .into_window(r0, c0, rows, cols)
    }

    pub fn into_window(self, r0: usize, c0: usize, rows: usize, cols: usize) -> MatMut<'a, T> {
        assert!(r0 + rows <= self.rows && c0 + cols <= self.cols);
        if rows == 0 || cols == 0 {
            return MatMut {
                data: Default::default(),
                stride: 0,
                rows,
                cols,
            };
        }
        MatMut {
            data: &mut self.data[r0 * self.stride + c0..],
            stride: self.stride,
            rows,
            cols,
        }
    }

    /// Overwrite the block with the entries of src.
    pub fn copy_from(&mut self, src: MatRef<'_, T>)
    where
        T: Clone,
    {
        assert!(src.rows == self.rows && src.cols == self.cols);
        for i in 0..self.rows {
            self.row_mut(i).clone_from_slice(src.row(i));
        }
    }

    pub fn add_assign(&mut self, src: MatRef<'_, T>)
    where
        T: Scalar,
    {
        assert!(src.rows == self.rows && src.cols == self.cols);
        for i in 0..self.rows {
            for (x, y) in self.row_mut(i).iter_mut().zip(src.row(i)) {
                *x += y;
            }
        }
    }
}

/// A permutation of rows, with its parity.
///
/// `perm[i]` is the original index of the row found at position i.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    perm: Vec<usize>,
    odd: bool,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Permutation {
            perm: (0..n).collect(),
            odd: false,
        }
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.perm
    }

    /// Record a transposition of positions i and j.
    pub fn swap(&mut self, i: usize, j: usize) {
        if i != j {
            self.perm.swap(i, j);
            self.odd = !self.odd;
        }
    }

    pub fn is_odd(&self) -> bool {
        self.odd
    }

    /// +1 or -1 according to parity.
    pub fn sign(&self) -> i8 {
        if self.odd {
            -1
        } else {
            1
        }
    }

    pub fn inverse(&self) -> Permutation {
        let mut inv = vec![0; self.perm.len()];
        for (i, &p) in self.perm.iter().enumerate() {
            inv[p] = i;
        }
        Permutation {
            perm: inv,
            odd: self.odd,
        }
    }

    /// The rows of m in permuted order: row i of the result is row perm[i] of m.
    pub fn apply_rows<T: Clone>(&self, m: &Matrix<T>) -> Matrix<T> {
        assert_eq!(self.perm.len(), m.nrows());
        m.select_rows(&self.perm)
    }
}

impl Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.perm[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows() {
        let mut m = IntMatrix::from_fn(4, 5, |i, j| Int::from(10 * i + j));
        let w = m.window(1, 2, 2, 3);
        assert_eq!(w.row(0), &[Int::from(12), Int::from(13), Int::from(14)]);
        assert_eq!(*w.get(1, 0), Int::from(22));
        let ww = w.window(1, 1, 1, 2);
        assert_eq!(ww.to_owned(), IntMatrix::from_i64(&[[23, 24]]));
        let empty = m.window(4, 0, 0, 5);
        assert_eq!(empty.nrows(), 0);

        // Writes through a window land in the parent.
        let src = IntMatrix::from_i64(&[[-1, -2], [-3, -4]]);
        m.window_mut(2, 3, 2, 2).copy_from(src.as_ref());
        assert_eq!(m[(3, 4)], Int::from(-4));
        assert_eq!(m[(2, 3)], Int::from(-1));
        let mut wm = m.window_mut(0, 0, 2, 2);
        wm.window_mut(1, 1, 1, 1).add_assign(src.window(0, 0, 1, 1));
        assert_eq!(m[(1, 1)], Int::from(10));
    }

    #[test]
    fn test_shapes() {
        let a = IntMatrix::from_i64(&[[1, 2, 3], [4, 5, 6]]);
        assert_eq!(a.transpose().shape(), (3, 2));
        assert_eq!(a.transpose()[(2, 1)], Int::from(6));
        let b = IntMatrix::identity(2);
        let ab = b.hstack(&a).unwrap();
        assert_eq!(ab.shape(), (2, 5));
        assert_eq!(ab.row(1)[2..], a.row(1)[..]);
        assert!(a.vstack(&b).is_err());
        let c = a.vstack(&a).unwrap();
        assert_eq!(c.nrows(), 4);
        assert_eq!(a.submatrix(&[1], &[2, 0]), IntMatrix::from_i64(&[[6, 4]]));
        let z = IntMatrix::zeros(3, 0);
        assert!(z.is_empty() && z.is_zero());
        assert_eq!(z.nrows(), 3);
        assert_eq!(z.row(2).len(), 0);
        assert_eq!(IntMatrix::from_rows(vec![]).shape(), (0, 0));
    }

    #[test]
    fn test_arith() {
        let a = IntMatrix::from_i64(&[[1, -2], [3, 4]]);
        let b = a.add(&a.neg()).unwrap();
        assert!(b.is_zero());
        assert_eq!(a.scalar_mul(&Int::from(3))[(0, 1)], Int::from(-6));
        assert_eq!(a.sub(&a).unwrap(), IntMatrix::zeros(2, 2));
        assert_eq!(a.max_bits(), 3);
        assert!(a.has_negative());
        assert_eq!(IntMatrix::from_i64(&[[4, 6], [0, -10]]).content(), Int::from(2));
        assert!(IntMatrix::identity(3).is_identity());
        assert_eq!(format!("{a}"), "[[1, -2],\n [3, 4]]");
    }

    #[test]
    fn test_swaps_permutation() {
        let mut a = IntMatrix::from_i64(&[[1, 2], [3, 4], [5, 6]]);
        a.swap_rows(0, 2);
        assert_eq!(a.row(0), IntMatrix::from_i64(&[[5, 6]]).row(0));
        a.swap_cols(0, 1);
        assert_eq!(a[(0, 0)], Int::from(6));
        let mut p = Permutation::identity(3);
        p.swap(0, 2);
        assert_eq!(p.sign(), -1);
        p.swap(1, 1);
        assert_eq!(p.sign(), -1);
        p.swap(0, 1);
        assert_eq!(p.as_slice(), &[1, 2, 0]);
        assert_eq!(p.inverse().as_slice(), &[2, 0, 1]);
        let m = IntMatrix::from_i64(&[[0], [1], [2]]);
        assert_eq!(p.apply_rows(&m), IntMatrix::from_i64(&[[1], [2], [0]]));
        let (r2, r0) = a.two_rows_mut(2, 0);
        assert_eq!(r2[0], Int::from(2));
        assert_eq!(r0[0], Int::from(6));
    }
}
