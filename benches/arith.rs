// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use brunch::Bench;
use num_traits::One;
use std::str::FromStr;

use intmat::arith::{self, rational_reconstruct_balanced};
use intmat::arith_crt::CrtBasis;
use intmat::arith_gcd::xgcd;
use intmat::arith_montgomery::Zmod64;
use intmat::Int;

const N256: &str = "23374454829417248628572084580131596971714744792262629806178559231363799527559";
const P160: &str = "1267700734046967910160193878489299434564357851243";

brunch::benches! {
    {
        let a = Int::from_str(N256).unwrap();
        let b = Int::from_str(P160).unwrap();
        Bench::new("xgcd(256-bit, 160-bit)").run_seeded((a, b), |(a, b)| xgcd(&a, &b))
    },
    {
        let a = Int::from_str(N256).unwrap();
        let b: Int = (Int::one() << 1024u32) + 1u32;
        Bench::new("xgcd(1024-bit, 256-bit)").run_seeded((b, a), |(a, b)| xgcd(&a, &b))
    },
    {
        let zp = Zmod64::new(arith::prev_prime64(1 << 62));
        let x = zp.from_u64(1234567890123);
        Bench::new("1000x Zmod64 mul")
        .with_samples(10_000)
        .run_seeded(x, |x| {
            let mut y = x;
            for _ in 0..1000 {
                y = zp.mul(y, x);
            }
            y
        })
    },
    Bench::new("is_prime64(2^62-57)").run_seeded((1u64 << 62) - 57, arith::is_prime64),
    {
        let basis = CrtBasis::for_bits(2048);
        let x = Int::from_str(N256).unwrap().pow(8);
        let res = basis.reduce(&x);
        Bench::new("CRT reconstruct 2048 bits").run_seeded(res, |r| basis.reconstruct_signed(&r))
    },
    {
        // 22/7 modulo a 256-bit number
        let m = Int::from_str(N256).unwrap();
        let inv7 = Int::from(7).modpow(&(&m - 2u32), &m);
        let a = (Int::from(22) * inv7) % &m;
        Bench::new("rational reconstruction 256 bits")
        .run_seeded((a, m), |(a, m)| rational_reconstruct_balanced(&a, &m))
    },
}
