// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Extended GCD of big integers using 2x2 unimodular transforms.
//!
//! As described in https://cr.yp.to/lineartime/multapps-20080515.pdf
//! the best asymptotic complexity is O(n (log n)^2+ε), however the
//! same idea can be used to reduce 32 bits at a time (Lehmer), which
//! is good enough for the operand sizes of matrix normal forms.
//!
//! The reduction steps are accumulated into a `Mat22` which is also
//! the natural way to describe a combination of two matrix rows
//! or columns.

use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::Int;

/// A 2x2 integer matrix with determinant ±1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mat22 {
    pub m11: Int,
    pub m12: Int,
    pub m21: Int,
    pub m22: Int,
    pub det: i8,
}

impl Mat22 {
    pub fn identity() -> Self {
        Mat22 {
            m11: Int::one(),
            m12: Int::zero(),
            m21: Int::zero(),
            m22: Int::one(),
            det: 1,
        }
    }

    /// Build a matrix from its entries, which must have determinant ±1.
    pub fn new(m11: Int, m12: Int, m21: Int, m22: Int) -> Self {
        let d = &m11 * &m22 - &m12 * &m21;
        let det = if d.is_one() {
            1
        } else {
            assert!(d == -Int::one(), "matrix is not unimodular");
            -1
        };
        Mat22 {
            m11,
            m12,
            m21,
            m22,
            det,
        }
    }

    fn from_i64(a: i64, b: i64, c: i64, d: i64) -> Self {
        let det = a as i128 * d as i128 - b as i128 * c as i128;
        debug_assert!(det == 1 || det == -1);
        Mat22 {
            m11: a.into(),
            m12: b.into(),
            m21: c.into(),
            m22: d.into(),
            det: det as i8,
        }
    }

    /// M = N M
    pub fn lmul(&mut self, n: &Mat22) {
        let m11 = &n.m11 * &self.m11 + &n.m12 * &self.m21;
        let m12 = &n.m11 * &self.m12 + &n.m12 * &self.m22;
        let m21 = &n.m21 * &self.m11 + &n.m22 * &self.m21;
        let m22 = &n.m21 * &self.m12 + &n.m22 * &self.m22;
        (self.m11, self.m12, self.m21, self.m22) = (m11, m12, m21, m22);
        self.det *= n.det;
    }

    /// M = M N
    pub fn rmul(&mut self, n: &Mat22) {
        let m11 = &self.m11 * &n.m11 + &self.m12 * &n.m21;
        let m12 = &self.m11 * &n.m12 + &self.m12 * &n.m22;
        let m21 = &self.m21 * &n.m11 + &self.m22 * &n.m21;
        let m22 = &self.m21 * &n.m12 + &self.m22 * &n.m22;
        (self.m11, self.m12, self.m21, self.m22) = (m11, m12, m21, m22);
        self.det *= n.det;
    }

    /// M = M N^-1
    pub fn rmul_inv(&mut self, n: &Mat22) {
        self.rmul(&n.inverse());
    }

    pub fn inverse(&self) -> Mat22 {
        // M^-1 = det(M) [[m22, -m12], [-m21, m11]]
        let s = Int::from(self.det);
        Mat22 {
            m11: &s * &self.m22,
            m12: -(&s * &self.m12),
            m21: -(&s * &self.m21),
            m22: &s * &self.m11,
            det: self.det,
        }
    }

    /// Apply the matrix to a column vector (x, y).
    pub fn apply(&self, x: &Int, y: &Int) -> (Int, Int) {
        (
            &self.m11 * x + &self.m12 * y,
            &self.m21 * x + &self.m22 * y,
        )
    }

    /// Replace (r1, r2) by (m11 r1 + m12 r2, m21 r1 + m22 r2) elementwise.
    pub fn apply_rows(&self, r1: &mut [Int], r2: &mut [Int]) {
        debug_assert_eq!(r1.len(), r2.len());
        for (x, y) in r1.iter_mut().zip(r2.iter_mut()) {
            if x.is_zero() && y.is_zero() {
                continue;
            }
            let (u, v) = self.apply(x, y);
            *x = u;
            *y = v;
        }
    }
}

/// Extended GCD: returns (g, M) such that M (a, b) = (g, 0)
/// with g = gcd(a, b) >= 0 and det M = ±1.
///
/// The first row of M gives Bézout coefficients.
pub fn xgcd_mat(a: &Int, b: &Int) -> (Int, Mat22) {
    let mut m = Mat22::identity();
    // Work with absolute values.
    if a.is_negative() {
        m.m11 = -Int::one();
        m.det = -m.det;
    }
    if b.is_negative() {
        m.m22 = -Int::one();
        m.det = -m.det;
    }
    let mut x = a.abs();
    let mut y = b.abs();
    loop {
        // Make sure x >= y.
        if y > x {
            (x, y) = (y, x);
            m.lmul(&Mat22::from_i64(0, 1, 1, 0));
        }
        if y.is_zero() {
            return (x, m);
        }
        let lx = x.bits();
        if lx < 64 {
            let (Some(x0), Some(y0)) = (x.to_i64(), y.to_i64()) else {
                unreachable!()
            };
            let e = Integer::extended_gcd(&x0, &y0);
            m.lmul(&Mat22::from_i64(e.x, e.y, -y0 / e.gcd, x0 / e.gcd));
            return (Int::from(e.gcd), m);
        }
        // xtop and ytop are the top 64 bits of x and the same
        // bits of y.
        let shift = lx - 64;
        let top = |z: &Int| (z >> shift).to_u64().unwrap_or(0);
        let (xtop, ytop) = (top(&x), top(&y));
        if ytop >= 1 << 32 {
            let (a, b, c, d) = reduce64(xtop, ytop);
            let mut step = Mat22::from_i64(a, b, c, d);
            let mut nx = &step.m11 * &x + &step.m12 * &y;
            let mut ny = &step.m21 * &x + &step.m22 * &y;
            if nx.is_negative() {
                nx = -nx;
                step.m11 = -step.m11;
                step.m12 = -step.m12;
                step.det = -step.det;
            }
            if ny.is_negative() {
                ny = -ny;
                step.m21 = -step.m21;
                step.m22 = -step.m22;
                step.det = -step.det;
            }
            // The approximate matrix must make progress.
            if nx < x && ny < x {
                (x, y) = (nx, ny);
                m.lmul(&step);
                continue;
            }
        }
        // Use a multiprecision quotient.
        let (q, r) = x.div_rem(&y);
        m.lmul(&Mat22 {
            m11: Int::zero(),
            m12: Int::one(),
            m21: Int::one(),
            m22: -q,
            det: -1,
        });
        (x, y) = (y, r);
    }
}

/// Extended GCD: returns (g, s, t) with g = s a + t b and g >= 0.
pub fn xgcd(a: &Int, b: &Int) -> (Int, Int, Int) {
    let (g, m) = xgcd_mat(a, b);
    (g, m.m11, m.m12)
}

/// A determinant 1 transform M such that M (a, b) = (g, 0),
/// with g = gcd(a, b) >= 0. It is the identity if b = 0 and a >= 0.
///
/// If a divides b, the first row of M is (±1, 0) so that
/// the combined vector is not enlarged.
pub fn eliminate(a: &Int, b: &Int) -> (Int, Mat22) {
    if b.is_zero() {
        let g = a.abs();
        if a.is_negative() {
            let m = Mat22::from_i64(-1, 0, 0, -1);
            return (g, m);
        }
        return (g, Mat22::identity());
    }
    if !a.is_zero() && b.is_multiple_of(a) {
        let q = b / a;
        let m = if a.is_negative() {
            Mat22 {
                m11: -Int::one(),
                m12: Int::zero(),
                m21: q,
                m22: -Int::one(),
                det: 1,
            }
        } else {
            Mat22 {
                m11: Int::one(),
                m12: Int::zero(),
                m21: -q,
                m22: Int::one(),
                det: 1,
            }
        };
        return (a.abs(), m);
    }
    let (g, s, t) = xgcd(a, b);
    let m = Mat22 {
        m11: s,
        m12: t,
        m21: -(b / &g),
        m22: a / &g,
        det: 1,
    };
    debug_assert!((&m.m11 * &m.m22 - &m.m12 * &m.m21).is_one());
    (g, m)
}

/// Determine a matrix of 64-bit signed integers such that (ax+by, cx+dy)
/// are "small" (less than (x,y) and preferably less than 32 bits),
/// but (a,b,c,d) are also small, guaranteed to be less than 36 bits.
///
/// In the worst case, (ax+by, cx+dy) correspond to a single
/// iteration of Euclid algorithm (y, x % y) if x >= y.
/// The reduction is performed using Gauss reduction.
fn reduce64(x: u64, y: u64) -> (i64, i64, i64, i64) {
    let bits = |z: u64| 64 - z.leading_zeros();
    // Reduce vector: invariant u=ax+by, v=cx+dy
    let (mut a, mut b, mut c, mut d) = (1_i64, 0_i64, 0_i64, 1_i64);
    let (mut u, mut v) = (x, y);
    // Loop until (u,v) are small enough.
    while u >> 24 > 0 && v >> 24 > 0 {
        if u < v {
            (a, b, c, d, u, v) = (c, d, a, b, v, u);
        } else {
            let (q, r) = ((u / v) as i64, u % v);
            // But stop if the matrix is too large
            // (cannot happen at first iteration since y >= 1<<32)
            if bits((q + 1) as u64) + bits(c.unsigned_abs().max(d.unsigned_abs())) > 36 {
                break;
            }
            // Ensure that r < |v/2| to reduce matrix size and speed up iteration.
            if r > v / 2 {
                (a, b, c, d, u, v) = (c, d, (q + 1) * c - a, (q + 1) * d - b, v, v - r);
            } else {
                (a, b, c, d, u, v) = (c, d, a - q * c, b - q * d, v, r);
            }
        }
        debug_assert!(a as i128 * x as i128 + b as i128 * y as i128 == u as i128);
        debug_assert!(c as i128 * x as i128 + d as i128 * y as i128 == v as i128);
    }
    debug_assert!(a.abs() <= 1 << 36 && b.abs() <= 1 << 36);
    debug_assert!(c.abs() <= 1 << 36 && d.abs() <= 1 << 36);
    (a, b, c, d)
}
