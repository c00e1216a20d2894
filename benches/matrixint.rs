// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Timings for determinants, linear systems and normal forms
//! of random integer matrices of increasing size.

use std::time::Instant;

use rand::{Rng, SeedableRng};

use intmat::{det, hnf, lll, rref, snf, solve};
use intmat::{Int, IntMatrix};

fn main() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    for size in [10, 20, 50, 100, 200] {
        for bound in [10i64, 1 << 30] {
            let bits = 64 - bound.leading_zeros();
            let a = IntMatrix::from_fn(size, size, |_, _| Int::from(rng.gen_range(-bound..=bound)));
            let b = IntMatrix::from_fn(size, 1, |_, _| Int::from(rng.gen_range(-bound..=bound)));

            let start = Instant::now();
            let d = det::det(&a).unwrap();
            eprintln!(
                "size={size} bits={bits} det {:.3}s ({} bits)",
                start.elapsed().as_secs_f64(),
                d.bits()
            );

            let start = Instant::now();
            let sol = solve::solve(&a, &b).unwrap();
            eprintln!(
                "size={size} bits={bits} solve {:.3}s (den {} bits)",
                start.elapsed().as_secs_f64(),
                sol.map_or(0, |s| s.den.bits())
            );

            let start = Instant::now();
            let r = rref::rref(&a).unwrap();
            eprintln!(
                "size={size} bits={bits} rref {:.3}s rank={}",
                start.elapsed().as_secs_f64(),
                r.rank
            );

            if size > 50 {
                continue;
            }
            let start = Instant::now();
            let h = hnf::hnf(&a).unwrap();
            eprintln!(
                "size={size} bits={bits} hnf {:.3}s ({} bits)",
                start.elapsed().as_secs_f64(),
                h.max_bits()
            );

            let start = Instant::now();
            let s = snf::snf(&a).unwrap();
            eprintln!(
                "size={size} bits={bits} snf {:.3}s ({} bits)",
                start.elapsed().as_secs_f64(),
                s.max_bits()
            );

            let start = Instant::now();
            match lll::lll(&a) {
                Ok(l) => eprintln!(
                    "size={size} bits={bits} lll {:.3}s ({} bits)",
                    start.elapsed().as_secs_f64(),
                    l.max_bits()
                ),
                Err(e) => eprintln!("size={size} bits={bits} lll: {e}"),
            }
        }
    }
}
