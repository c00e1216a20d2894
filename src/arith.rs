// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Small helpers on top of the big integer substrate:
//! bit sizes, rounded divisions, symmetric residues, 64-bit primes
//! and rational reconstruction.

use num_bigint::Sign;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::Rng;

use crate::Int;

/// Number of bits of |x| (0 for x=0).
#[inline]
pub fn bits(x: &Int) -> u64 {
    x.bits()
}

/// Number of bits needed to count up to n, that is ceil(log2(n)).
pub fn clog2(n: usize) -> u64 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u64
    }
}

/// Floor division.
#[inline]
pub fn fdiv(a: &Int, b: &Int) -> Int {
    a.div_floor(b)
}

/// Division rounded to the nearest integer (ties rounded up).
pub fn round_div(a: &Int, b: &Int) -> Int {
    debug_assert!(!b.is_zero());
    let (a, b) = if b.is_negative() { (-a, -b) } else { (a.clone(), b.clone()) };
    // floor((2a + b) / 2b)
    let num: Int = (a << 1) + &b;
    num.div_floor(&(b << 1))
}

/// Division which is known to be exact.
#[inline]
pub fn exact_div(a: &Int, b: &Int) -> Int {
    let (q, r) = a.div_rem(b);
    debug_assert!(r.is_zero(), "inexact division {a} / {b}");
    q
}

/// Symmetric residue of a modulo m, in the interval (-m/2, m/2].
pub fn smod(a: &Int, m: &Int) -> Int {
    debug_assert!(m.is_positive());
    let r = a.mod_floor(m);
    if (&r << 1u32) > *m {
        r - m
    } else {
        r
    }
}

/// Reduce a big integer modulo a word p.
pub fn mod_u64(x: &Int, p: u64) -> u64 {
    let (sign, digits) = x.to_u64_digits();
    let p128 = p as u128;
    let mut r: u128 = 0;
    for &d in digits.iter().rev() {
        r = ((r << 64) | d as u128) % p128;
    }
    let r = r as u64;
    if sign == Sign::Minus && r != 0 {
        p - r
    } else {
        r
    }
}

/// Lift a residue modulo p to the symmetric interval.
#[inline]
pub fn signed_lift(x: u64, p: u64) -> i64 {
    if x > p / 2 {
        -((p - x) as i64)
    } else {
        x as i64
    }
}

#[inline]
pub fn mulmod64(a: u64, b: u64, p: u64) -> u64 {
    ((a as u128 * b as u128) % p as u128) as u64
}

pub fn pow_mod64(n: u64, k: u64, p: u64) -> u64 {
    let mut res: u64 = 1 % p;
    let mut nn = n % p;
    let mut k = k;
    while k > 0 {
        if k & 1 == 1 {
            res = mulmod64(res, nn, p);
        }
        nn = mulmod64(nn, nn, p);
        k >>= 1;
    }
    res
}

/// Modular inverse of n modulo p (p need not be prime).
pub fn inv_mod64(n: u64, p: u64) -> Option<u64> {
    let e = Integer::extended_gcd(&((n % p) as i128), &(p as i128));
    if e.gcd != 1 {
        return None;
    }
    Some(e.x.rem_euclid(p as i128) as u64)
}

/// Deterministic Miller-Rabin test for 64-bit integers.
pub fn is_prime64(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if n % p == 0 {
            return n == p;
        }
    }
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    // These bases are enough for all 64-bit integers.
    'witness: for a in [2, 325, 9375, 28178, 450775, 9780504, 1795265022] {
        let a = a % n;
        if a == 0 {
            continue;
        }
        let mut x = pow_mod64(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mulmod64(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Largest prime strictly below n.
pub fn prev_prime64(n: u64) -> u64 {
    assert!(n > 3);
    let mut p = (n - 2) | 1;
    while !is_prime64(p) {
        p -= 2;
    }
    p
}

/// A uniformly chosen odd prime of exactly `bits` bits.
pub fn random_prime<R: Rng + ?Sized>(rng: &mut R, bits: u32) -> u64 {
    assert!((3..=63).contains(&bits));
    loop {
        let x: u64 = rng.gen::<u64>() >> (64 - bits);
        let x = x | (1 << (bits - 1)) | 1;
        if is_prime64(x) {
            return x;
        }
    }
}

/// Rational reconstruction: find (n, d) with n/d = a mod m,
/// |n| <= nbound and 0 < d <= dbound.
///
/// The result is unique if 2 nbound dbound < m.
pub fn rational_reconstruct(a: &Int, m: &Int, nbound: &Int, dbound: &Int) -> Option<(Int, Int)> {
    let a = a.mod_floor(m);
    if a <= *nbound {
        return Some((a, Int::one()));
    }
    if &a - m >= -nbound {
        return Some((a - m, Int::one()));
    }
    // Half extended Euclid on (m, a): invariant r_i = t_i a mod m.
    let (mut r0, mut r1) = (m.clone(), a);
    let (mut t0, mut t1) = (Int::zero(), Int::one());
    while r1 > *nbound {
        let (q, r) = r0.div_rem(&r1);
        let t = &t0 - &q * &t1;
        (r0, r1) = (r1, r);
        (t0, t1) = (t1, t);
    }
    if t1.is_zero() || t1.abs() > *dbound {
        return None;
    }
    let (n, d) = if t1.is_negative() { (-r1, -t1) } else { (r1, t1) };
    if !n.gcd(&d).is_one() {
        return None;
    }
    Some((n, d))
}

/// Rational reconstruction with balanced bounds sqrt(m/2).
pub fn rational_reconstruct_balanced(a: &Int, m: &Int) -> Option<(Int, Int)> {
    let bound = (m >> 1u32).sqrt();
    rational_reconstruct(a, m, &bound, &bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_divisions() {
        let i = |x: i64| Int::from(x);
        assert_eq!(fdiv(&i(-7), &i(2)), i(-4));
        assert_eq!(round_div(&i(7), &i(2)), i(4));
        assert_eq!(round_div(&i(-7), &i(2)), i(-3));
        assert_eq!(round_div(&i(5), &i(-3)), i(-2));
        assert_eq!(smod(&i(7), &i(10)), i(-3));
        assert_eq!(smod(&i(5), &i(10)), i(5));
        assert_eq!(smod(&i(-5), &i(10)), i(5));
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(5), 3);
        assert_eq!(clog2(8), 3);
    }

    #[test]
    fn test_mod_u64() {
        let p = 0x7fffffffffffffe7;
        let x: Int = Int::from(3) << 200u32;
        let expect = mulmod64(3, pow_mod64(2, 200, p), p);
        assert_eq!(mod_u64(&x, p), expect);
        assert_eq!(mod_u64(&-x, p), p - expect);
        assert_eq!(mod_u64(&Int::from(-1), 97), 96);
    }

    #[test]
    fn test_primes() {
        assert!(is_prime64(0x7fffffffffffffe7));
        assert!(!is_prime64(3215031751));
        assert_eq!(prev_prime64(1 << 63), 0x7fffffffffffffe7);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for bits in [10, 31, 62] {
            let p = random_prime(&mut rng, bits);
            assert_eq!(64 - p.leading_zeros(), bits);
            assert!(is_prime64(p));
        }
        assert_eq!(inv_mod64(3, 7), Some(5));
        assert_eq!(inv_mod64(6, 9), None);
    }

    #[test]
    fn test_rational_reconstruct() {
        let m = Int::from(1_000_000_007u64);
        // -22/7 mod m
        let inv7 = Int::from(inv_mod64(7, 1_000_000_007).unwrap());
        let a = (Int::from(-22) * inv7).mod_floor(&m);
        assert_eq!(
            rational_reconstruct_balanced(&a, &m),
            Some((Int::from(-22), Int::from(7)))
        );
        assert_eq!(
            rational_reconstruct_balanced(&Int::from(12), &m),
            Some((Int::from(12), Int::one()))
        );
    }
}
