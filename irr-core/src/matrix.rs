//! Validated binary rater × item rating matrix.
//!
//! Row `r`, column `i` holds 1 if rater `r` applied the category under test to
//! item `i`, else 0. The matrix is stored row-major in one contiguous buffer so
//! that each rater's ratings form a contiguous slice that can be shuffled in
//! place.
//!
//! Shape and value invariants are checked once at construction:
//! - rectangular (every row has the same length)
//! - every value is exactly 0 or 1
//! - at least 2 raters (the statistic divides by `R * (R - 1)`)
//! - at least 1 item

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building a rating matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("rating matrix has no raters")]
    NoRaters,

    #[error("rating matrix needs at least 2 raters, got {raters}")]
    TooFewRaters { raters: usize },

    #[error("rating matrix has no items")]
    NoItems,

    #[error("row {row} has {found} ratings, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("rating at row {row}, item {item} is {value}; ratings must be 0 or 1")]
    InvalidRating { row: usize, item: usize, value: u8 },

    #[error("item {item} has agreement count {agreement}, more than {raters} raters")]
    AgreementOutOfRange {
        item: usize,
        agreement: usize,
        raters: usize,
    },

    #[error("buffer of length {len} does not match shape [{raters}, {items}]")]
    ShapeMismatch {
        raters: usize,
        items: usize,
        len: usize,
    },
}

/// Binary rating matrix of shape `[raters, items]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct RatingMatrix {
    raters: usize,
    items: usize,
    data: Vec<u8>,
}

impl RatingMatrix {
    /// Build a matrix from one row of ratings per rater.
    pub fn from_rows<I, Row>(rows: I) -> Result<Self, MatrixError>
    where
        I: IntoIterator<Item = Row>,
        Row: AsRef<[u8]>,
    {
        let mut data = Vec::new();
        let mut items = None;
        let mut raters = 0;

        for (row_idx, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            let expected = *items.get_or_insert(row.len());
            if row.len() != expected {
                return Err(MatrixError::Ragged {
                    row: row_idx,
                    expected,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
            raters += 1;
        }

        Self::from_flat(raters, items.unwrap_or(0), data)
    }

    /// Build a matrix from a row-major buffer of `raters * items` ratings.
    pub fn from_flat(raters: usize, items: usize, data: Vec<u8>) -> Result<Self, MatrixError> {
        if raters == 0 {
            return Err(MatrixError::NoRaters);
        }
        if raters < 2 {
            return Err(MatrixError::TooFewRaters { raters });
        }
        if items == 0 {
            return Err(MatrixError::NoItems);
        }
        if raters.checked_mul(items) != Some(data.len()) {
            return Err(MatrixError::ShapeMismatch {
                raters,
                items,
                len: data.len(),
            });
        }
        if let Some(pos) = data.iter().position(|&v| v > 1) {
            return Err(MatrixError::InvalidRating {
                row: pos / items,
                item: pos % items,
                value: data[pos],
            });
        }

        Ok(Self {
            raters,
            items,
            data,
        })
    }

    /// Number of raters (R).
    pub fn raters(&self) -> usize {
        self.raters
    }

    /// Number of items (N).
    pub fn items(&self) -> usize {
        self.items
    }

    /// Rating given by `rater` to `item`, or `None` when out of range.
    pub fn get(&self, rater: usize, item: usize) -> Option<u8> {
        if rater < self.raters && item < self.items {
            Some(self.data[rater * self.items + item])
        } else {
            None
        }
    }

    /// All ratings given by one rater, in item order.
    ///
    /// # Panics
    /// Panics if `rater >= self.raters()`.
    pub fn row(&self, rater: usize) -> &[u8] {
        let start = rater * self.items;
        &self.data[start..start + self.items]
    }

    /// Iterate over rater rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.items)
    }

    /// Row-major view of every rating.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Per-item agreement counts `y_i`: how many raters applied the label to item `i`.
    pub fn item_agreement(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.items];
        self.item_agreement_into(&mut counts);
        counts
    }

    /// Like [`item_agreement`](Self::item_agreement), reusing the caller's buffer.
    pub(crate) fn item_agreement_into(&self, counts: &mut [usize]) {
        counts.iter_mut().for_each(|c| *c = 0);
        for row in self.rows() {
            for (count, &rating) in counts.iter_mut().zip(row) {
                *count += rating as usize;
            }
        }
    }

    /// Number of items each rater labeled.
    pub fn rater_totals(&self) -> Vec<usize> {
        self.rows()
            .map(|row| row.iter().map(|&v| v as usize).sum())
            .collect()
    }

    /// Shuffle every rater's row independently and uniformly, in place.
    ///
    /// Each row keeps its own multiset of ratings; only the assignment of
    /// ratings to items changes.
    pub fn permute_rows<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for row in self.data.chunks_exact_mut(self.items) {
            row.shuffle(rng);
        }
    }

    /// Copy the matrix out as one `Vec` per rater.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows().map(<[u8]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<u8>>> for RatingMatrix {
    type Error = MatrixError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<RatingMatrix> for Vec<Vec<u8>> {
    fn from(matrix: RatingMatrix) -> Self {
        matrix.to_rows()
    }
}
