//! Permutation simulator: null distribution of the concordance statistic.
//!
//! Each iteration shuffles every rater's row of a private working copy
//! independently, recomputes the statistic, and counts values at least as large
//! as the reference. Rater identity and each rater's label totals are kept;
//! only which items a rater labeled is randomized.
//!
//! [`simulate_distribution`] takes the generator from the caller.
//! [`simulate_with_config`] derives one seeded stream per chunk of iterations
//! (see [`RngHierarchy`]) and may run chunks on a private rayon pool;
//! [`simulate_in_pool`] does the same on a pool the caller owns. Their output
//! depends on `seed` and `chunk_size` only, never on the thread count.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, SimulationConfig};
use crate::matrix::RatingMatrix;
use crate::rng::RngHierarchy;
use crate::statistic::{compute_statistic, compute_statistic_with};

// ─── Result types ────────────────────────────────────────────────────

/// Outcome of one permutation run.
///
/// Owned by the caller; holds no reference to the input matrix. Turning `geq`
/// into a p-value (e.g. `(geq + 1) / (iterations + 1)`) is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Reference statistic: computed from the input, or the value supplied.
    pub observed: f64,
    /// Permutations whose statistic was `>= observed`.
    pub geq: usize,
    pub iterations: usize,
    /// Permuted statistics in iteration order, when retention was requested.
    pub distribution: Option<Vec<f64>>,
}

/// Errors from the permutation simulator.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("reference statistic must be finite, got {0}")]
    InvalidReference(f64),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// ─── Simulation ──────────────────────────────────────────────────────

/// Simulate the permutation distribution of the concordance statistic.
///
/// When `reference` is `None` it is computed from the unpermuted matrix. The
/// caller's matrix is never mutated. With `iterations == 0` the result has
/// `geq == 0` and, if retained, an empty distribution.
pub fn simulate_distribution<R: Rng + ?Sized>(
    matrix: &RatingMatrix,
    reference: Option<f64>,
    iterations: usize,
    keep_distribution: bool,
    rng: &mut R,
) -> Result<SimulationResult, SimulationError> {
    let observed = resolve_reference(matrix, reference)?;

    let mut distribution = keep_distribution.then(|| Vec::with_capacity(iterations));
    let geq = run_permutations(matrix, observed, iterations, rng, |_, value| {
        if let Some(values) = distribution.as_mut() {
            values.push(value);
        }
    });

    log::debug!(
        "permutation run: raters={} items={} iterations={} observed={:.6} geq={}",
        matrix.raters(),
        matrix.items(),
        iterations,
        observed,
        geq
    );

    Ok(SimulationResult {
        observed,
        geq,
        iterations,
        distribution,
    })
}

/// Seeded, optionally parallel permutation run driven by a [`SimulationConfig`].
///
/// Iterations are split into chunks of `config.chunk_size`; chunk `k` uses
/// `RngHierarchy::new(config.seed).rng_for(k)` and its own working copy.
/// Retained values land in each chunk's disjoint slice of the output, so the
/// distribution is in iteration order regardless of scheduling.
///
/// With `config.threads > 1` a private pool is built for this call. Callers
/// running many strata or categories should build one pool and use
/// [`simulate_in_pool`] instead.
pub fn simulate_with_config(
    matrix: &RatingMatrix,
    reference: Option<f64>,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    if config.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        run_seeded(matrix, reference, config, Some(&pool))
    } else {
        run_seeded(matrix, reference, config, None)
    }
}

/// Same as [`simulate_with_config`], but chunks run on a caller-owned pool.
///
/// `config.threads` is ignored; the pool's size decides the parallelism. The
/// result is identical to [`simulate_with_config`] for the same seed and chunk
/// size.
pub fn simulate_in_pool(
    matrix: &RatingMatrix,
    reference: Option<f64>,
    config: &SimulationConfig,
    pool: &rayon::ThreadPool,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    run_seeded(matrix, reference, config, Some(pool))
}

fn run_seeded(
    matrix: &RatingMatrix,
    reference: Option<f64>,
    config: &SimulationConfig,
    pool: Option<&rayon::ThreadPool>,
) -> Result<SimulationResult, SimulationError> {
    let observed = resolve_reference(matrix, reference)?;
    let hierarchy = RngHierarchy::new(config.seed);
    let iterations = config.iterations;
    let chunk_size = config.chunk_size;

    let mut distribution = config.keep_distribution.then(|| vec![0.0; iterations]);

    let chunks: Vec<Chunk<'_>> = match distribution.as_mut() {
        Some(values) => values
            .chunks_mut(chunk_size)
            .enumerate()
            .map(|(index, out)| Chunk {
                index,
                len: out.len(),
                out: Some(out),
            })
            .collect(),
        None => (0..config.chunk_count())
            .map(|index| Chunk {
                index,
                len: chunk_size.min(iterations - index * chunk_size),
                out: None,
            })
            .collect(),
    };

    let run = |chunk: Chunk<'_>| chunk.run(matrix, observed, &hierarchy);

    let (geq, threads) = match pool {
        Some(pool) => (
            pool.install(|| chunks.into_par_iter().map(run).sum::<usize>()),
            pool.current_num_threads(),
        ),
        None => (chunks.into_iter().map(run).sum::<usize>(), 1),
    };

    log::debug!(
        "seeded permutation run: seed={} raters={} items={} iterations={} chunks={} threads={} observed={:.6} geq={}",
        hierarchy.master_seed(),
        matrix.raters(),
        matrix.items(),
        iterations,
        config.chunk_count(),
        threads,
        observed,
        geq
    );

    Ok(SimulationResult {
        observed,
        geq,
        iterations,
        distribution,
    })
}

/// A contiguous block of iterations sharing one RNG stream.
struct Chunk<'a> {
    index: usize,
    len: usize,
    out: Option<&'a mut [f64]>,
}

impl Chunk<'_> {
    fn run(self, matrix: &RatingMatrix, observed: f64, hierarchy: &RngHierarchy) -> usize {
        let mut rng = hierarchy.rng_for(self.index as u64);
        let mut out = self.out;
        let geq = run_permutations(matrix, observed, self.len, &mut rng, |i, value| {
            if let Some(slot) = out.as_mut() {
                slot[i] = value;
            }
        });
        log::trace!("chunk {} done: len={} geq={}", self.index, self.len, geq);
        geq
    }
}

/// The permutation loop. Every permuted statistic goes to `sink` with its
/// iteration index; returns how many were `>= observed`.
fn run_permutations<R, F>(
    matrix: &RatingMatrix,
    observed: f64,
    iterations: usize,
    rng: &mut R,
    mut sink: F,
) -> usize
where
    R: Rng + ?Sized,
    F: FnMut(usize, f64),
{
    let mut working = matrix.clone();
    let mut scratch = vec![0usize; matrix.items()];
    let mut geq = 0;

    for i in 0..iterations {
        working.permute_rows(rng);
        let value = compute_statistic_with(&working, &mut scratch);
        if value >= observed {
            geq += 1;
        }
        sink(i, value);
    }

    geq
}

fn resolve_reference(
    matrix: &RatingMatrix,
    reference: Option<f64>,
) -> Result<f64, SimulationError> {
    match reference {
        Some(value) if !value.is_finite() => Err(SimulationError::InvalidReference(value)),
        Some(value) => Ok(value),
        None => Ok(compute_statistic(matrix)),
    }
}
