// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Exact linear algebra for matrices of big integers and rationals.
//!
//! Every operation is a dispatcher on matrix shape and entry bit size:
//! small inputs use direct fraction-free elimination, larger inputs use
//! multi-modular or p-adic methods whose results are either provably
//! correct by a bound argument or verified before being returned.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod arith;
pub mod arith_crt;
pub mod arith_gcd;
pub mod arith_montgomery;
pub mod matrix;
pub mod matrix_nmod;
pub mod matrix_rat;

// Algorithms
pub mod det;
pub mod fflu;
pub mod hnf;
pub mod lll;
pub mod matmul;
pub mod rref;
pub mod snf;
pub mod solve;

pub use matrix::{IntMatrix, MatRef, Matrix, Permutation, RatMatrix};

pub type Int = num_bigint::BigInt;
pub type Rat = num_rational::BigRational;

/// Errors reported by high-level operations.
///
/// A singular matrix is usually a legitimate answer and is reported
/// as `Ok(None)` by solvers: the `Singular` variant is only used by
/// operations whose input must be nonsingular.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Operands have non-conformal shapes.
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    /// A square matrix was expected.
    NotSquare {
        op: &'static str,
        rows: usize,
        cols: usize,
    },
    InvalidParameter {
        op: &'static str,
        reason: &'static str,
    },
    Singular {
        op: &'static str,
    },
    /// A randomized algorithm reached `Preferences::max_retries`.
    RetriesExhausted {
        op: &'static str,
        attempts: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch { op, left, right } => write!(
                f,
                "{op}: incompatible dimensions {}x{} and {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Error::NotSquare { op, rows, cols } => {
                write!(f, "{op}: expected a square matrix, got {rows}x{cols}")
            }
            Error::InvalidParameter { op, reason } => write!(f, "{op}: {reason}"),
            Error::Singular { op } => write!(f, "{op}: matrix is singular"),
            Error::RetriesExhausted { op, attempts } => {
                write!(f, "{op}: gave up after {attempts} attempts")
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Knobs shared by high-level operations.
#[derive(Clone, Debug, Default)]
pub struct Preferences {
    /// Maximal number of attempts for randomized algorithms.
    /// They terminate with probability 1 so the default is no limit.
    pub max_retries: Option<usize>,
    /// Worker threads for multi-modular computations.
    pub tpool: Option<Arc<rayon::ThreadPool>>,
}

impl Preferences {
    pub fn with_threads(threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .ok()
            .map(Arc::new);
        Preferences {
            max_retries: None,
            tpool: pool,
        }
    }

    pub(crate) fn tpool(&self) -> Option<&rayon::ThreadPool> {
        self.tpool.as_deref()
    }

    /// Returns an error if attempt number `attempt` (counting from 1)
    /// exceeds the retry budget.
    pub(crate) fn check_retry(&self, op: &'static str, attempt: usize) -> Result<()> {
        match self.max_retries {
            Some(max) if attempt > max => Err(Error::RetriesExhausted {
                op,
                attempts: attempt - 1,
            }),
            _ => Ok(()),
        }
    }
}

const DEFAULT_SEED: u64 = 0x1337_cafe_f00d_beef;

/// The random source used by convenience wrappers.
/// It is seeded with a constant so that results are reproducible.
pub fn default_rng() -> StdRng {
    StdRng::seed_from_u64(DEFAULT_SEED)
}
