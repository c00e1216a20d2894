// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Residue number systems over word-sized primes.
//!
//! Integers are reconstructed from their residues using Garner's
//! mixed-radix algorithm: all modular work is done with single words
//! and big integer arithmetic only appears in the final Horner
//! evaluation.

use num_integer::Integer;
use num_traits::{One, Zero};

use crate::arith;
use crate::Int;

// A few large 63-bit primes, enough for 4000-bit results.
// Larger residue systems are extended with smaller primes.
pub const PRIMES: [u64; 64] = [
    0x7fffffffffffffe7,
    0x7fffffffffffff5b,
    0x7ffffffffffffefd,
    0x7ffffffffffffed3,
    0x7ffffffffffffe89,
    0x7ffffffffffffe7d,
    0x7ffffffffffffe79,
    0x7ffffffffffffe67,
    0x7ffffffffffffe37,
    0x7ffffffffffffe29,
    0x7ffffffffffffdfb,
    0x7ffffffffffffdef,
    0x7ffffffffffffddb,
    0x7ffffffffffffd8d,
    0x7ffffffffffffd77,
    0x7ffffffffffffd63,
    0x7ffffffffffffd39,
    0x7ffffffffffffd21,
    0x7ffffffffffffd11,
    0x7ffffffffffffcaf,
    0x7ffffffffffffc99,
    0x7ffffffffffffc85,
    0x7ffffffffffffc6d,
    0x7ffffffffffffc0d,
    0x7ffffffffffffbd3,
    0x7ffffffffffffbb9,
    0x7ffffffffffffb97,
    0x7ffffffffffffb65,
    0x7ffffffffffffb3b,
    0x7ffffffffffffb2b,
    0x7ffffffffffffb1f,
    0x7ffffffffffffaef,
    0x7ffffffffffffaed,
    0x7ffffffffffffae3,
    0x7ffffffffffffab3,
    0x7ffffffffffffa8d,
    0x7ffffffffffffa45,
    0x7ffffffffffffa2f,
    0x7ffffffffffffa23,
    0x7ffffffffffffa05,
    0x7ffffffffffff9f1,
    0x7ffffffffffff9e7,
    0x7ffffffffffff9d9,
    0x7ffffffffffff9b7,
    0x7ffffffffffff9a3,
    0x7ffffffffffff99d,
    0x7ffffffffffff925,
    0x7ffffffffffff8ef,
    0x7ffffffffffff8d9,
    0x7ffffffffffff8c1,
    0x7ffffffffffff88b,
    0x7ffffffffffff86b,
    0x7ffffffffffff817,
    0x7ffffffffffff787,
    0x7ffffffffffff739,
    0x7ffffffffffff735,
    0x7ffffffffffff70f,
    0x7ffffffffffff703,
    0x7ffffffffffff6f1,
    0x7ffffffffffff6e5,
    0x7ffffffffffff6c3,
    0x7ffffffffffff6b5,
    0x7ffffffffffff69f,
    0x7ffffffffffff669,
];

/// Every prime of the residue system is larger than 2^62.
pub const BITS_PER_PRIME: u64 = 62;

/// The first `count` primes of the residue system, in decreasing order.
pub fn primes(count: usize) -> Vec<u64> {
    let mut ps: Vec<u64> = PRIMES.iter().copied().take(count).collect();
    while ps.len() < count {
        let last = ps[ps.len() - 1];
        ps.push(arith::prev_prime64(last));
    }
    ps
}

/// Enough primes so that their product is larger than 2^bits.
pub fn primes_for_bits(bits: u64) -> Vec<u64> {
    let count = (bits + BITS_PER_PRIME) / BITS_PER_PRIME;
    primes(count as usize)
}

/// Precomputed data for Garner reconstruction over a fixed
/// list of pairwise coprime moduli.
#[derive(Clone, Debug)]
pub struct CrtBasis {
    pub primes: Vec<u64>,
    // inverse of p[0]...p[i-1] modulo p[i]
    inverses: Vec<u64>,
    pub product: Int,
    half: Int,
}

impl CrtBasis {
    /// The moduli must be pairwise coprime, which holds for
    /// the distinct primes returned by `primes`.
    pub fn new(primes: Vec<u64>) -> Self {
        debug_assert!(!primes.is_empty());
        let mut inverses = Vec::with_capacity(primes.len());
        for (i, &pi) in primes.iter().enumerate() {
            let mut prod = 1 % pi;
            for &pj in &primes[..i] {
                prod = arith::mulmod64(prod, pj % pi, pi);
            }
            let inv = arith::inv_mod64(prod, pi);
            debug_assert!(inv.is_some(), "moduli are not coprime");
            inverses.push(inv.unwrap_or(0));
        }
        let product: Int = primes.iter().map(|&p| Int::from(p)).product();
        let half = &product >> 1u32;
        CrtBasis {
            primes,
            inverses,
            product,
            half,
        }
    }

    /// A basis with enough primes to represent signed integers
    /// of absolute value less than 2^bits.
    pub fn for_bits(bits: u64) -> Self {
        Self::new(primes_for_bits(bits + 1))
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// Mixed-radix digits v such that
    /// x = v[0] + v[1] p[0] + v[2] p[0] p[1] + ...
    fn mixed_radix(&self, residues: &[u64]) -> Vec<u64> {
        debug_assert_eq!(residues.len(), self.primes.len());
        let mut v: Vec<u64> = Vec::with_capacity(residues.len());
        for (i, &pi) in self.primes.iter().enumerate() {
            // Evaluate the partial expansion modulo p[i] (Horner).
            let mut s = 0;
            for j in (0..i).rev() {
                s = arith::mulmod64(s, self.primes[j] % pi, pi);
                s = (s + v[j] % pi) % pi;
            }
            let r = residues[i] % pi;
            let diff = if r >= s { r - s } else { r + (pi - s) };
            v.push(arith::mulmod64(diff, self.inverses[i], pi));
        }
        v
    }

    /// The unique integer in [0, P) with the given residues.
    pub fn reconstruct(&self, residues: &[u64]) -> Int {
        let v = self.mixed_radix(residues);
        let mut x = Int::zero();
        for i in (0..v.len()).rev() {
            x *= self.primes[i];
            x += v[i];
        }
        debug_assert!(x < self.product);
        x
    }

    /// The unique integer in (-P/2, P/2] with the given residues.
    pub fn reconstruct_signed(&self, residues: &[u64]) -> Int {
        let x = self.reconstruct(residues);
        if x > self.half {
            x - &self.product
        } else {
            x
        }
    }

    /// Residues of a big integer.
    pub fn reduce(&self, x: &Int) -> Vec<u64> {
        self.primes.iter().map(|&p| arith::mod_u64(x, p)).collect()
    }
}

/// Incremental CRT: combine x mod m with r mod p into a residue
/// modulo m p (in the symmetric interval).
pub fn crt_step(x: &Int, m: &Int, r: u64, p: u64) -> Int {
    let xp = arith::mod_u64(x, p);
    let minv = arith::inv_mod64(arith::mod_u64(m, p), p).unwrap_or(0);
    debug_assert!(minv != 0 || m.is_one());
    let diff = if r >= xp { r - xp } else { r + (p - xp) };
    let t = arith::mulmod64(diff, minv, p);
    let mp: Int = m * p;
    arith::smod(&(x + m * t), &mp)
}

/// Whether the product of the moduli is coprime to n.
pub fn is_coprime(primes: &[u64], n: &Int) -> bool {
    primes
        .iter()
        .all(|&p| Integer::gcd(&arith::mod_u64(n, p), &p) == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primes_table() {
        for &p in &PRIMES {
            assert!(arith::is_prime64(p));
            assert!(p >> BITS_PER_PRIME > 0);
        }
        let ps = primes(70);
        assert_eq!(ps.len(), 70);
        for w in ps.windows(2) {
            assert!(w[0] > w[1]);
        }
        assert!(arith::is_prime64(ps[69]));
    }

    #[test]
    fn test_crt_reconstruction() {
        let basis = CrtBasis::for_bits(300);
        for x in [
            Int::from(12345),
            Int::from(-12345),
            (Int::from(1) << 300u32) - 1,
            -(Int::from(3) << 299u32),
        ] {
            let res = basis.reduce(&x);
            assert_eq!(basis.reconstruct_signed(&res), x);
        }
        let x = Int::from(1) << 200u32;
        assert_eq!(basis.reconstruct(&basis.reduce(&x)), x);
    }

    #[test]
    fn test_crt_coprime_moduli() {
        // Pairwise coprime moduli need not be prime.
        let basis = CrtBasis::new(vec![8, 9, 25, 7]);
        assert_eq!(basis.product, Int::from(12600));
        for x in [0_i64, 1, -1, 6299, -6299, 4321] {
            let x = Int::from(x);
            assert_eq!(basis.reconstruct_signed(&basis.reduce(&x)), x);
        }
        assert_eq!(basis.reconstruct(&basis.reduce(&Int::from(-1))), Int::from(12599));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "moduli are not coprime")]
    fn test_crt_common_factor() {
        CrtBasis::new(vec![6, 35, 10]);
    }

    #[test]
    fn test_crt_step() {
        let x = Int::from(-987654321987654321_i64) * 1234567;
        let mut m = Int::one();
        let mut acc = Int::zero();
        for &p in &PRIMES[..3] {
            acc = crt_step(&acc, &m, arith::mod_u64(&x, p), p);
            m *= p;
        }
        assert_eq!(acc, x);
    }
}
