//! In-flight edits that survive structural mutation.
//!
//! An editor opened at a coordinate may outlive that coordinate: rows can be
//! inserted, removed or re-sorted while the user is still typing. A
//! [`PendingEdit`] remembers the row's identity and the model's layout
//! generation at the moment editing began, and re-resolves its target before
//! committing:
//!
//! 1. the row at the captured coordinate is checked by identity, whatever
//!    the generation says, since an in-place replacement keeps positions;
//! 2. if another row sits there, the edited row is re-located by an
//!    identity search;
//! 3. if that search fails the edit is dropped and reported as
//!    [`Error::RowNotFound`]. It is never applied to another row.

use tabula_core::logging::targets;

use super::index::ModelIndex;
use super::role::ItemData;
use super::row::RowRef;
use super::traits::{EditOutcome, ItemModel};
use crate::error::{Error, Result};

/// An edit captured at a coordinate, committed later.
#[derive(Debug, Clone)]
pub struct PendingEdit {
    index: ModelIndex,
    identity: RowRef,
    generation: u64,
}

impl PendingEdit {
    /// Captures an edit of `index` in `model`.
    ///
    /// Fails if the coordinate is out of range or the cell is not editable.
    pub fn capture<M: ItemModel + ?Sized>(model: &M, index: ModelIndex) -> Result<Self> {
        if !model.contains(&index) {
            return Err(Error::InvalidIndex {
                row: index.row(),
                column: index.column(),
            });
        }
        if !model.flags(&index).editable {
            return Err(Error::NotEditable {
                row: index.row(),
                column: index.column(),
            });
        }
        let identity = model.row_identity(index.row()).ok_or(Error::InvalidIndex {
            row: index.row(),
            column: index.column(),
        })?;
        Ok(Self {
            index,
            identity,
            generation: model.layout_generation(),
        })
    }

    /// Returns the coordinate the edit was captured at.
    pub fn index(&self) -> ModelIndex {
        self.index
    }

    /// Returns the identity of the edited row.
    pub fn identity(&self) -> &RowRef {
        &self.identity
    }

    /// Returns the layout generation at capture time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if `model`'s layout changed since capture.
    pub fn is_stale<M: ItemModel + ?Sized>(&self, model: &M) -> bool {
        model.layout_generation() != self.generation
    }

    /// Locates the edited cell in `model`'s current layout.
    pub fn resolve<M: ItemModel + ?Sized>(&self, model: &M) -> Result<ModelIndex> {
        let row = self.index.row();
        let still_there = model
            .row_identity(row)
            .is_some_and(|current| current.same_row(&self.identity));
        if still_there {
            return Ok(self.index);
        }

        match model.find_row(&self.identity) {
            Some(found) => {
                tracing::debug!(
                    target: targets::EDIT,
                    from = row,
                    to = found,
                    "edited row moved; remapped by identity"
                );
                Ok(self.index.sibling_at_row(found))
            }
            None => {
                tracing::warn!(
                    target: targets::EDIT,
                    row,
                    column = self.index.column(),
                    "edited row no longer present; dropping edit"
                );
                Err(Error::RowNotFound {
                    column: self.index.column(),
                })
            }
        }
    }

    /// Resolves the target and commits `value` to it.
    pub fn commit<M: ItemModel + ?Sized>(&self, model: &M, value: ItemData) -> Result<EditOutcome> {
        let target = self.resolve(model)?;
        model.commit_data(&target, value)
    }
}
