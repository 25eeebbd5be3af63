//! Property tests for the concordance statistic and the permutation simulator.
//!
//! Uses proptest to verify:
//! 1. The statistic stays in [0, 1] and hits 1.0 on unanimous matrices
//! 2. Raters and items are exchangeable (row/column order does not matter)
//! 3. Simulation leaves the input untouched and keeps `geq` in range
//! 4. Retained distributions have one value per iteration

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use irr_core::{compute_statistic, simulate_distribution, statistic_from_agreement, RatingMatrix};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Valid rating matrices: 2..8 raters, 1..12 items, 0/1 entries.
fn arb_matrix() -> impl Strategy<Value = RatingMatrix> {
    (2usize..8, 1usize..12).prop_flat_map(|(raters, items)| {
        prop::collection::vec(0u8..=1, raters * items).prop_map(move |data| {
            RatingMatrix::from_flat(raters, items, data).expect("generated matrix is valid")
        })
    })
}

/// Matrix plus a permutation of its rows and one of its columns.
fn arb_matrix_with_orders() -> impl Strategy<Value = (RatingMatrix, Vec<usize>, Vec<usize>)> {
    arb_matrix().prop_flat_map(|m| {
        let rows = Just((0..m.raters()).collect::<Vec<_>>()).prop_shuffle();
        let cols = Just((0..m.items()).collect::<Vec<_>>()).prop_shuffle();
        (Just(m), rows, cols)
    })
}

fn reorder(m: &RatingMatrix, row_order: &[usize], col_order: &[usize]) -> RatingMatrix {
    let rows: Vec<Vec<u8>> = row_order
        .iter()
        .map(|&r| col_order.iter().map(|&c| m.row(r)[c]).collect())
        .collect();
    RatingMatrix::from_rows(rows).unwrap()
}

// ── 1. Range and unanimity ───────────────────────────────────────────

proptest! {
    #[test]
    fn statistic_in_unit_interval(m in arb_matrix()) {
        let rho = compute_statistic(&m);
        prop_assert!((0.0..=1.0).contains(&rho), "rho = {}", rho);
    }

    /// Every column all-0 or all-1 gives exactly 1.0.
    #[test]
    fn unanimous_columns_give_one(
        raters in 2usize..8,
        columns in prop::collection::vec(prop::bool::ANY, 1..12),
    ) {
        let row: Vec<u8> = columns.iter().map(|&b| b as u8).collect();
        let m = RatingMatrix::from_rows(vec![row; raters]).unwrap();
        prop_assert_eq!(compute_statistic(&m), 1.0);
    }

    /// The statistic equals the mean of per-item closed-form pair counts.
    #[test]
    fn statistic_matches_per_item_formula(m in arb_matrix()) {
        let r = m.raters() as f64;
        let expected: f64 = m
            .item_agreement()
            .iter()
            .map(|&y| {
                let y = y as f64;
                (y * (y - 1.0) + (r - y) * (r - y - 1.0)) / (r * (r - 1.0))
            })
            .sum::<f64>()
            / m.items() as f64;
        prop_assert!((compute_statistic(&m) - expected).abs() < 1e-12);
    }

    /// Agreement counts lifted out of a matrix give the same statistic as the matrix.
    #[test]
    fn from_agreement_agrees_with_matrix(m in arb_matrix()) {
        let rho = statistic_from_agreement(&m.item_agreement(), m.raters()).unwrap();
        prop_assert_eq!(rho, compute_statistic(&m));
    }

    /// Out-of-range inputs are rejected rather than yielding NaN or values above 1.
    #[test]
    fn from_agreement_rejects_out_of_range(
        raters in 0usize..8,
        agreement in prop::collection::vec(0usize..12, 0..6),
    ) {
        let result = statistic_from_agreement(&agreement, raters);
        let valid = raters >= 2 && !agreement.is_empty() && agreement.iter().all(|&y| y <= raters);
        prop_assert_eq!(result.is_ok(), valid);
        if let Ok(rho) = result {
            prop_assert!((0.0..=1.0).contains(&rho), "rho = {}", rho);
        }
    }
}

// ── 2. Exchangeability ───────────────────────────────────────────────

proptest! {
    #[test]
    fn invariant_under_row_and_column_reordering(
        (m, row_order, col_order) in arb_matrix_with_orders(),
    ) {
        let reordered = reorder(&m, &row_order, &col_order);
        prop_assert_eq!(compute_statistic(&m), compute_statistic(&reordered));
    }
}

// ── 3-4. Simulation invariants ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn simulation_respects_bounds(
        m in arb_matrix(),
        iterations in 0usize..60,
        keep in prop::bool::ANY,
        seed in any::<u64>(),
    ) {
        let before = m.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        let r = simulate_distribution(&m, None, iterations, keep, &mut rng).unwrap();

        prop_assert_eq!(&m, &before);
        prop_assert!(r.geq <= iterations);
        prop_assert_eq!(r.iterations, iterations);
        match r.distribution {
            Some(dist) => {
                prop_assert!(keep);
                prop_assert_eq!(dist.len(), iterations);
                let counted = dist.iter().filter(|&&v| v >= r.observed).count();
                prop_assert_eq!(counted, r.geq);
            }
            None => prop_assert!(!keep),
        }
    }

    #[test]
    fn same_seed_same_result(m in arb_matrix(), seed in any::<u64>()) {
        let a = simulate_distribution(&m, None, 30, true, &mut StdRng::seed_from_u64(seed)).unwrap();
        let b = simulate_distribution(&m, None, 30, true, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Reference 0 is met by every permutation; anything above 1 by none.
    #[test]
    fn extreme_references(m in arb_matrix(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let low = simulate_distribution(&m, Some(0.0), 25, false, &mut rng).unwrap();
        prop_assert_eq!(low.geq, 25);
        let high = simulate_distribution(&m, Some(1.5), 25, false, &mut rng).unwrap();
        prop_assert_eq!(high.geq, 0);
    }
}
