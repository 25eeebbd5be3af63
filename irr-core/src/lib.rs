//! IRR Core: permutation test for inter-rater concordance.
//!
//! `R` raters each decide, for `N` items in one stratum, whether an item
//! carries a given category label. This crate provides:
//! - [`RatingMatrix`], the validated binary rater × item matrix
//! - [`compute_statistic`], the concordance statistic (fraction of agreeing
//!   ordered rater pairs, averaged over items)
//! - [`simulate_distribution`], the within-row permutation test with a
//!   caller-supplied RNG
//! - [`simulate_with_config`], a seeded, optionally parallel driver, and
//!   [`simulate_in_pool`] for reusing one rayon pool across runs
//!
//! Loading labels, looping over strata and categories, and turning `geq`
//! counts into p-values are the caller's job.

pub mod config;
pub mod matrix;
pub mod rng;
pub mod simulate;
pub mod statistic;

pub use config::{ConfigError, SimulationConfig};
pub use matrix::{MatrixError, RatingMatrix};
pub use rng::RngHierarchy;
pub use simulate::{
    simulate_distribution, simulate_in_pool, simulate_with_config, SimulationError,
    SimulationResult,
};
pub use statistic::{compute_statistic, statistic_from_agreement};
