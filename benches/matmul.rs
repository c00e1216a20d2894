// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use brunch::Bench;
use rand::{Rng, SeedableRng};

use intmat::matmul::{self, MulStrategy};
use intmat::{Int, IntMatrix, Preferences};

fn random_matrix(n: usize, bits: u32, seed: u64) -> IntMatrix {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    IntMatrix::from_fn(n, n, |_, _| {
        let mut x = Int::from(rng.gen::<i64>());
        for _ in 1..(bits + 63) / 64 {
            x = (x << 64u32) + rng.gen::<u64>();
        }
        x >> (64 * ((bits + 63) / 64) - bits)
    })
}

brunch::benches! {
    {
        let a = random_matrix(50, 20, 1);
        let b = random_matrix(50, 20, 2);
        let prefs = Preferences::default();
        Bench::new("mul 50x50 20 bits classical")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::Classical, &prefs))
    },
    {
        let a = random_matrix(50, 20, 1);
        let b = random_matrix(50, 20, 2);
        let prefs = Preferences::default();
        Bench::new("mul 50x50 20 bits double-word")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::DoubleWord, &prefs))
    },
    {
        let a = random_matrix(100, 500, 1);
        let b = random_matrix(100, 500, 2);
        let prefs = Preferences::default();
        Bench::new("mul 100x100 500 bits classical")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::Classical, &prefs))
    },
    {
        let a = random_matrix(100, 500, 1);
        let b = random_matrix(100, 500, 2);
        let prefs = Preferences::default();
        Bench::new("mul 100x100 500 bits multimodular")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::MultiModular, &prefs))
    },
    {
        let a = random_matrix(100, 500, 1);
        let b = random_matrix(100, 500, 2);
        let prefs = Preferences::with_threads(4);
        Bench::new("mul 100x100 500 bits multimodular 4 threads")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::MultiModular, &prefs))
    },
    {
        let a = random_matrix(128, 2000, 1);
        let b = random_matrix(128, 2000, 2);
        let prefs = Preferences::default();
        Bench::new("mul 128x128 2000 bits strassen")
        .run_seeded((a, b), |(a, b)| matmul::mul_with(&a, &b, MulStrategy::Strassen, &prefs))
    },
    {
        let a = random_matrix(64, 1000, 3);
        Bench::new("sqr 64x64 1000 bits").run_seeded(a, |a| matmul::sqr(&a))
    },
}
