//! Concordance statistic over a binary rating matrix.
//!
//! For `R` raters and `N` items, with `y_i` raters applying the label to item `i`:
//!
//! ```text
//! rho = sum_i [ y_i (y_i - 1) + (R - y_i)(R - y_i - 1) ] / (N R (R - 1))
//! ```
//!
//! The numerator counts ordered pairs of distinct raters that agree on item `i`
//! (both apply the label or both withhold it). `rho` is the fraction of all
//! ordered rater pairs that agree, averaged over items: 1.0 when every item is
//! rated unanimously, never below 0 or above 1.

use crate::matrix::{MatrixError, RatingMatrix};

/// Ordered concordant rater pairs for one item with `agreement` of `raters` raters
/// applying the label. Callers guarantee `agreement <= raters`.
///
/// Equal to `2 * C(y, 2) + 2 * C(R - y, 2)`.
#[inline]
pub(crate) fn concordant_pairs(agreement: usize, raters: usize) -> u64 {
    let yes = agreement as u64;
    let no = (raters - agreement) as u64;
    yes * yes.saturating_sub(1) + no * no.saturating_sub(1)
}

/// Concordance statistic from precomputed per-item agreement counts.
///
/// Rejects fewer than 2 raters, an empty item list, and any count above
/// `raters`, with the same errors a [`RatingMatrix`] of that shape would give.
pub fn statistic_from_agreement(agreement: &[usize], raters: usize) -> Result<f64, MatrixError> {
    if raters == 0 {
        return Err(MatrixError::NoRaters);
    }
    if raters < 2 {
        return Err(MatrixError::TooFewRaters { raters });
    }
    if agreement.is_empty() {
        return Err(MatrixError::NoItems);
    }
    if let Some((item, &count)) = agreement.iter().enumerate().find(|(_, &y)| y > raters) {
        return Err(MatrixError::AgreementOutOfRange {
            item,
            agreement: count,
            raters,
        });
    }
    Ok(rho(agreement, raters))
}

/// The closed form itself. Shape has already been checked.
fn rho(agreement: &[usize], raters: usize) -> f64 {
    let concordant: u64 = agreement
        .iter()
        .map(|&y| concordant_pairs(y, raters))
        .sum();
    let pairs = agreement.len() as u64 * raters as u64 * (raters as u64 - 1);
    concordant as f64 / pairs as f64
}

/// Compute the concordance statistic of a rating matrix.
///
/// Pure and deterministic. The matrix type guarantees at least two raters,
/// one item, and column sums within `[0, R]`, so this cannot fail.
pub fn compute_statistic(matrix: &RatingMatrix) -> f64 {
    rho(&matrix.item_agreement(), matrix.raters())
}

/// Same as [`compute_statistic`] but reuses `scratch` for the column sums.
///
/// `scratch.len()` must equal `matrix.items()`.
pub(crate) fn compute_statistic_with(matrix: &RatingMatrix, scratch: &mut [usize]) -> f64 {
    matrix.item_agreement_into(scratch);
    rho(scratch, matrix.raters())
}
