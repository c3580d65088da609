//! Positional selection: selected cells, the current cell and the anchor.
//!
//! Selection holds coordinates of whatever model the view shows. Code that
//! must follow rows across sorting and structural changes reads row
//! identities through that model (see
//! [`TableBinding`](crate::view::TableBinding)).
//!
//! ```
//! use tabula::model::{SelectionFlags, SelectionMode, SelectionModel};
//!
//! let selection = SelectionModel::new();
//! selection.set_selection_mode(SelectionMode::ContiguousSelection);
//!
//! selection.select_rows(&[2, 3], 1, SelectionFlags::SELECT);
//! // Row 7 does not touch the run 2..=3, so it replaces it.
//! selection.select_row(7, 1, SelectionFlags::SELECT);
//! assert_eq!(selection.selected_rows(), vec![7]);
//!
//! selection.selection_changed.connect(|(added, removed)| {
//!     tracing::trace!(added = added.len(), removed = removed.len(), "selection");
//! });
//! ```

use std::collections::HashSet;
use std::ops::BitOr;

use parking_lot::RwLock;
use tabula_core::Signal;
use tabula_core::logging::targets;

use super::index::ModelIndex;

/// How many rows a selection may hold and how requests combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SelectionMode {
    /// Selection requests are ignored.
    NoSelection,
    /// At most one row; every request replaces the selection.
    #[default]
    SingleSelection,
    /// Selected rows always form one unbroken run.
    ContiguousSelection,
    /// Requests add to or toggle within the selection.
    MultiSelection,
    /// Like `MultiSelection`; views add anchor-based range extension.
    ExtendedSelection,
}

/// The granularity of a selection: single cells, whole rows or whole columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SelectionBehavior {
    #[default]
    SelectItems,
    SelectRows,
    SelectColumns,
}

/// What a selection request does. Named flags combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SelectionFlags {
    /// Drop the existing selection first.
    pub clear: bool,
    pub select: bool,
    pub deselect: bool,
    pub toggle: bool,
    /// Make the index the current (focused) one.
    pub current: bool,
    /// Make the index the anchor of later range requests.
    pub anchor: bool,
}

impl SelectionFlags {
    pub const NONE: Self = Self {
        clear: false,
        select: false,
        deselect: false,
        toggle: false,
        current: false,
        anchor: false,
    };
    pub const CLEAR: Self = Self { clear: true, ..Self::NONE };
    pub const SELECT: Self = Self { select: true, ..Self::NONE };
    pub const DESELECT: Self = Self { deselect: true, ..Self::NONE };
    pub const TOGGLE: Self = Self { toggle: true, ..Self::NONE };
    pub const CURRENT: Self = Self { current: true, ..Self::NONE };
    pub const CLEAR_AND_SELECT: Self = Self {
        clear: true,
        ..Self::SELECT
    };
    pub const SELECT_CURRENT: Self = Self {
        current: true,
        ..Self::SELECT
    };
    pub const CLEAR_SELECT_CURRENT: Self = Self {
        current: true,
        ..Self::CLEAR_AND_SELECT
    };

    /// Returns these flags with `anchor` set.
    pub const fn with_anchor(self) -> Self {
        Self { anchor: true, ..self }
    }

    fn changes_selection(self) -> bool {
        self.clear || self.select || self.deselect || self.toggle
    }
}

impl BitOr for SelectionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            clear: self.clear || rhs.clear,
            select: self.select || rhs.select,
            deselect: self.deselect || rhs.deselect,
            toggle: self.toggle || rhs.toggle,
            current: self.current || rhs.current,
            anchor: self.anchor || rhs.anchor,
        }
    }
}

#[derive(Default)]
struct SelectionState {
    mode: SelectionMode,
    behavior: SelectionBehavior,
    current: ModelIndex,
    anchor: ModelIndex,
    selected_set: HashSet<ModelIndex>,
    /// Selection order; `selected_set` mirrors it.
    selected: Vec<ModelIndex>,
}

impl SelectionState {
    fn add(&mut self, index: ModelIndex) -> bool {
        if self.selected_set.insert(index) {
            self.selected.push(index);
            true
        } else {
            false
        }
    }

    fn remove(&mut self, index: &ModelIndex) -> bool {
        if self.selected_set.remove(index) {
            self.selected.retain(|selected| selected != index);
            true
        } else {
            false
        }
    }

    fn take_all(&mut self) -> Vec<ModelIndex> {
        self.selected_set.clear();
        std::mem::take(&mut self.selected)
    }

    fn row_span(&self) -> Option<(usize, usize)> {
        let mut rows = self.selected.iter().map(ModelIndex::row);
        let first = rows.next()?;
        Some(rows.fold((first, first), |(lo, hi), row| (lo.min(row), hi.max(row))))
    }

    /// Returns `true` if rows `first..=last` would extend the current run.
    fn touches_run(&self, first: usize, last: usize) -> bool {
        match self.row_span() {
            None => true,
            Some((lo, hi)) => last.saturating_add(1) >= lo && first <= hi.saturating_add(1),
        }
    }
}

/// Selected cells plus the current and anchor cells of one view.
///
/// Methods take `&self`. `selection_changed` carries `(added, removed)` and
/// `current_changed` carries `(new, old)`; both fire after the state lock is
/// released, so slots may read or change the selection again.
pub struct SelectionModel {
    state: RwLock<SelectionState>,
    pub selection_changed: Signal<(Vec<ModelIndex>, Vec<ModelIndex>)>,
    pub current_changed: Signal<(ModelIndex, ModelIndex)>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SelectionState::default()),
            selection_changed: Signal::new(),
            current_changed: Signal::new(),
        }
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.state.read().mode
    }

    /// Applies to later requests; the existing selection is kept as is.
    pub fn set_selection_mode(&self, mode: SelectionMode) {
        self.state.write().mode = mode;
    }

    pub fn selection_behavior(&self) -> SelectionBehavior {
        self.state.read().behavior
    }

    pub fn set_selection_behavior(&self, behavior: SelectionBehavior) {
        self.state.write().behavior = behavior;
    }

    pub fn current_index(&self) -> ModelIndex {
        self.state.read().current
    }

    /// Moves the current cell, then applies whatever selection bits `flags`
    /// carries to it. `current_changed` fires only with
    /// `flags.current` and an actual move.
    pub fn set_current_index(&self, index: ModelIndex, flags: SelectionFlags) {
        let previous = std::mem::replace(&mut self.state.write().current, index);
        if flags.current && previous != index {
            self.current_changed.emit((index, previous));
        }
        if flags.changes_selection() {
            self.select(index, flags);
        }
        if flags.anchor {
            self.state.write().anchor = index;
        }
    }

    /// Start point for shift-extended ranges.
    pub fn anchor_index(&self) -> ModelIndex {
        self.state.read().anchor
    }

    pub fn is_selected(&self, index: &ModelIndex) -> bool {
        index.is_valid() && self.state.read().selected_set.contains(index)
    }

    pub fn has_selection(&self) -> bool {
        !self.state.read().selected.is_empty()
    }

    /// Selected cells, not rows.
    pub fn selected_count(&self) -> usize {
        self.state.read().selected.len()
    }

    /// Selected cells in the order they were selected.
    pub fn selected_indices(&self) -> Vec<ModelIndex> {
        self.state.read().selected.clone()
    }

    /// Distinct rows with at least one selected cell, ascending.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.distinct(ModelIndex::row)
    }

    /// Distinct columns with at least one selected cell, ascending.
    pub fn selected_columns(&self) -> Vec<usize> {
        self.distinct(ModelIndex::column)
    }

    fn distinct(&self, key: fn(&ModelIndex) -> usize) -> Vec<usize> {
        let mut keys: Vec<usize> = self.state.read().selected.iter().map(key).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Applies `flags` to one cell. A null index only honours the clear bit.
    pub fn select(&self, index: ModelIndex, flags: SelectionFlags) {
        self.select_indices(&[index], flags);
    }

    /// Applies `flags` to a batch of cells with at most one
    /// `selection_changed`.
    pub fn select_indices(&self, indices: &[ModelIndex], flags: SelectionFlags) {
        let targets = indices.iter().copied().filter(ModelIndex::is_valid).collect();
        self.apply(targets, flags);
    }

    /// Every cell of rows `from..=to`; the bounds may come in either order.
    pub fn select_range(&self, from: usize, to: usize, column_count: usize, flags: SelectionFlags) {
        let (first, last) = (from.min(to), from.max(to));
        self.apply(row_cells(first..=last, column_count), flags);
    }

    pub fn select_row(&self, row: usize, column_count: usize, flags: SelectionFlags) {
        self.select_range(row, row, column_count, flags);
    }

    /// Every cell of each listed row. `rows` may be unsorted or sparse.
    pub fn select_rows(&self, rows: &[usize], column_count: usize, flags: SelectionFlags) {
        self.apply(row_cells(rows.iter().copied(), column_count), flags);
    }

    /// Selects the whole table. Ignored by the single and no-selection modes.
    pub fn select_all(&self, row_count: usize, column_count: usize) {
        let mode = self.selection_mode();
        if row_count == 0 || matches!(mode, SelectionMode::NoSelection | SelectionMode::SingleSelection) {
            return;
        }
        self.select_range(0, row_count - 1, column_count, SelectionFlags::SELECT);
    }

    /// Deselects everything but keeps the current and anchor cells.
    pub fn clear_selection(&self) {
        let removed = self.state.write().take_all();
        if !removed.is_empty() {
            self.selection_changed.emit((Vec::new(), removed));
        }
    }

    /// Deselects everything and forgets the current and anchor cells.
    pub fn clear(&self) {
        self.clear_selection();
        let mut state = self.state.write();
        state.current = ModelIndex::invalid();
        state.anchor = ModelIndex::invalid();
    }

    /// Called when the underlying model resets.
    pub fn reset(&self) {
        self.clear();
    }

    fn apply(&self, indices: Vec<ModelIndex>, flags: SelectionFlags) {
        let SelectionFlags {
            mut clear,
            select,
            deselect,
            toggle,
            ..
        } = flags;

        let mut newly_selected = Vec::new();
        let mut newly_deselected = Vec::new();
        {
            let mut state = self.state.write();
            match state.mode {
                SelectionMode::NoSelection => return,
                SelectionMode::SingleSelection if select || toggle => {
                    let mut rows = indices.iter().map(ModelIndex::row);
                    let single_row = rows.next().is_some_and(|first| rows.all(|row| row == first));
                    if !single_row {
                        tracing::debug!(target: targets::SELECTION, "single selection ignores multi-row request");
                        return;
                    }
                    clear = true;
                }
                SelectionMode::ContiguousSelection if select && !clear => {
                    let span = indices.iter().map(ModelIndex::row).fold(None, |span, row| match span {
                        None => Some((row, row)),
                        Some((lo, hi)) => Some((row.min(lo), row.max(hi))),
                    });
                    if let Some((first, last)) = span
                        && !state.touches_run(first, last)
                    {
                        clear = true;
                    }
                }
                _ => {}
            }

            // Cleared indices are reported only if they stay unselected.
            let mut cleared = HashSet::new();
            if clear {
                newly_deselected = state.take_all();
                cleared.extend(newly_deselected.iter().copied());
            }

            for index in indices {
                if toggle {
                    if state.remove(&index) {
                        newly_deselected.push(index);
                    } else if state.add(index) {
                        newly_selected.push(index);
                    }
                } else if select {
                    if state.add(index) {
                        newly_selected.push(index);
                    }
                } else if deselect && state.remove(&index) {
                    newly_deselected.push(index);
                }
            }

            // Items that were cleared and then re-selected did not change.
            newly_deselected.retain(|idx| !state.selected_set.contains(idx));
            newly_selected.retain(|idx| !cleared.contains(idx));
        }

        if !newly_selected.is_empty() || !newly_deselected.is_empty() {
            self.selection_changed.emit((newly_selected, newly_deselected));
        }
    }
}

fn row_cells(rows: impl IntoIterator<Item = usize>, column_count: usize) -> Vec<ModelIndex> {
    rows.into_iter()
        .flat_map(|row| (0..column_count.max(1)).map(move |column| ModelIndex::new(row, column)))
        .collect()
}
