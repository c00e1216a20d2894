// Copyright 2022, 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Montgomery form arithmetic for 64-bit moduli.
//!
//! This is the word-modular layer used by residue systems:
//! all moduli are odd and less than 2^63 so that a sum of two
//! residues never overflows.
//!
//! Reference:
//! Peter L. Montgomery, Modular Multiplication Without Trial Division
//! <https://www.ams.org/journals/mcom/1985-44-170/S0025-5718-1985-0777282-X/S0025-5718-1985-0777282-X.pdf>

use crate::arith;
use crate::Int;

/// Returns ninv such that n*ninv = -1 mod 2^64
pub fn mg_2adic_inv(n: u64) -> u64 {
    // Invariant: nx = 1 + 2^k s, k increasing
    let mut x = 1u64;
    loop {
        let rem = n.wrapping_mul(x) - 1;
        if rem == 0 {
            break;
        }
        x += 1 << rem.trailing_zeros();
    }
    debug_assert!(n.wrapping_mul(x) == 1);
    1 + !x
}

#[inline(always)]
pub fn mg_mul(n: u64, ninv: u64, x: u64, y: u64) -> u64 {
    mg_redc(n, ninv, (x as u128) * (y as u128))
}

/// Montgomery reduction (x/R mod n).
#[inline(always)]
pub fn mg_redc(n: u64, ninv: u64, x: u128) -> u64 {
    // compute -x/N mod R
    let mul: u64 = (x as u64).wrapping_mul(ninv);
    // reduce
    let m = mul as u128 * n as u128;
    // x + m may overflow 128 bits if x is close to 2^128 (x < n R is enough).
    let (s, carry) = x.overflowing_add(m);
    let res = (s >> 64) as u64 | ((carry as u64) << 63 << 1);
    if carry || res >= n {
        res.wrapping_sub(n)
    } else {
        res
    }
}

/// Context for arithmetic modulo an odd word-sized modulus.
/// Values are stored in Montgomery form x R mod p where R = 2^64.
#[derive(Clone, Copy, Debug)]
pub struct Zmod64 {
    pub p: u64,
    pinv: u64,
    r: u64,  // 2^64 % p
    r2: u64, // 2^128 % p
}

impl Zmod64 {
    pub fn new(p: u64) -> Self {
        assert!(p % 2 == 1 && p < 1 << 63);
        let pinv = mg_2adic_inv(p);
        let r = (1u128 << 64).rem_euclid(p as u128) as u64;
        let r2 = (r as u128 * r as u128).rem_euclid(p as u128) as u64;
        Zmod64 { p, pinv, r, r2 }
    }

    #[inline]
    pub fn zero(&self) -> u64 {
        0
    }

    #[inline]
    pub fn one(&self) -> u64 {
        self.r
    }

    /// Convert a plain residue (less than p) to Montgomery form.
    #[inline]
    pub fn from_u64(&self, x: u64) -> u64 {
        debug_assert!(x < self.p);
        mg_mul(self.p, self.pinv, x, self.r2)
    }

    #[inline]
    pub fn from_i64(&self, x: i64) -> u64 {
        let p = self.p as i64;
        self.from_u64(x.rem_euclid(p) as u64)
    }

    pub fn from_int(&self, x: &Int) -> u64 {
        self.from_u64(arith::mod_u64(x, self.p))
    }

    /// Convert back to a plain residue in [0, p).
    #[inline]
    pub fn to_u64(&self, x: u64) -> u64 {
        mg_redc(self.p, self.pinv, x as u128)
    }

    /// Convert back to a residue in the symmetric interval.
    #[inline]
    pub fn to_i64(&self, x: u64) -> i64 {
        arith::signed_lift(self.to_u64(x), self.p)
    }

    #[inline]
    pub fn mul(&self, x: u64, y: u64) -> u64 {
        mg_mul(self.p, self.pinv, x, y)
    }

    /// Reduce a double-word accumulator of Montgomery products.
    /// The accumulator must be less than p R.
    #[inline]
    pub fn redc(&self, x: u128) -> u64 {
        mg_redc(self.p, self.pinv, x)
    }

    #[inline]
    pub fn add(&self, x: u64, y: u64) -> u64 {
        let s = x + y;
        if s >= self.p {
            s - self.p
        } else {
            s
        }
    }

    #[inline]
    pub fn sub(&self, x: u64, y: u64) -> u64 {
        if x >= y {
            x - y
        } else {
            x + (self.p - y)
        }
    }

    #[inline]
    pub fn neg(&self, x: u64) -> u64 {
        if x == 0 {
            0
        } else {
            self.p - x
        }
    }

    /// Inverse of a Montgomery form value, if it exists.
    pub fn inv(&self, x: u64) -> Option<u64> {
        // x = aR, we want R/a = R^2 / x
        let xx = self.to_u64(x);
        let xinv = arith::inv_mod64(xx, self.p)?;
        Some(self.from_u64(xinv))
    }

    /// Subtract m*w from v elementwise.
    pub fn submul(&self, v: &mut [u64], w: &[u64], m: u64) {
        debug_assert!(v.len() == w.len());
        for (vi, &wi) in v.iter_mut().zip(w) {
            let mw = self.mul(m, wi);
            *vi = self.sub(*vi, mw);
        }
    }

    /// Multiply v elementwise by m.
    pub fn scale(&self, v: &mut [u64], m: u64) {
        for vi in v {
            *vi = self.mul(*vi, m);
        }
    }
}

#[test]
fn test_montgomery64() {
    for p in [3, 97, 1_000_000_007, 0x7fffffffffffffe7] {
        let zp = Zmod64::new(p);
        for x in [0_u64, 1, 2, 12345, p - 1, p / 2] {
            let x = x % p;
            let xm = zp.from_u64(x);
            assert_eq!(zp.to_u64(xm), x);
            if x != 0 {
                let xinv = zp.inv(xm).unwrap();
                assert_eq!(zp.mul(xm, xinv), zp.one());
            }
            assert_eq!(zp.add(xm, zp.neg(xm)), 0);
        }
        assert_eq!(zp.to_i64(zp.from_i64(-1)), -1);
        let a = zp.from_int(&(Int::from(1) << 100u32));
        assert_eq!(zp.to_u64(a), arith::pow_mod64(2, 100, p));
    }
}

#[test]
fn test_redc_accumulate() {
    // Accumulating products in 128 bits then reducing once
    // gives the same result as reducing each product,
    // as long as at most R/p products are added.
    for (p, count) in [(0x7ffffffffffffe7d_u64, 2), (1_000_003, 1000)] {
        let zp = Zmod64::new(p);
        let batch = (u64::MAX / p) as usize;
        assert!(count <= batch);
        let xs: Vec<u64> = (1..=count as u64).map(|i| zp.from_u64(p - i)).collect();
        let mut acc = 0_u128;
        let mut expect = 0;
        for &x in &xs {
            acc += x as u128 * x as u128;
            expect = zp.add(expect, zp.mul(x, x));
        }
        // acc < count p^2 < p R
        assert!(acc < (p as u128) << 64);
        assert_eq!(zp.redc(acc), expect);
    }
}
