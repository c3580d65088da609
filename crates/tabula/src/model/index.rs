//! Cell coordinates.
//!
//! A [`ModelIndex`] names a cell of one model's current row order. It holds
//! no reference to that model, so it goes stale on the next structural
//! change; follow rows through
//! [`ItemRole::RowIdentity`](super::ItemRole::RowIdentity) instead.

use std::fmt;

/// A `(row, column)` position, or the null index.
///
/// Models answer any query on a null or out-of-range index with an empty
/// value.
///
/// ```
/// use tabula::model::ModelIndex;
///
/// let index = ModelIndex::new(2, 1);
/// assert_eq!(index.sibling_at_column(0), ModelIndex::new(2, 0));
/// assert!(!ModelIndex::invalid().is_valid());
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelIndex(Option<(usize, usize)>);

impl ModelIndex {
    pub const fn invalid() -> Self {
        Self(None)
    }

    /// A non-null index. Bounds are checked by whichever model receives it.
    pub const fn new(row: usize, column: usize) -> Self {
        Self(Some((row, column)))
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// The row, or 0 for the null index.
    #[inline]
    pub fn row(&self) -> usize {
        self.0.map_or(0, |(row, _)| row)
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.0.map_or(0, |(_, column)| column)
    }

    /// Same column, another row. The null index stays null.
    pub fn sibling_at_row(&self, row: usize) -> ModelIndex {
        Self(self.0.map(|(_, column)| (row, column)))
    }

    pub fn sibling_at_column(&self, column: usize) -> ModelIndex {
        Self(self.0.map(|(row, _)| (row, column)))
    }
}

impl fmt::Debug for ModelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some((row, column)) => write!(f, "ModelIndex({row}, {column})"),
            None => f.write_str("ModelIndex(invalid)"),
        }
    }
}
