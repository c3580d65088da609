//! The model contract shared by stores, proxies and views.

use tabula_core::Signal;

use super::index::ModelIndex;
use super::role::{ItemData, ItemRole};
use super::row::RowRef;
use crate::error::{Error, Result};

/// What a view may do with a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    pub selectable: bool,
    pub editable: bool,
    pub enabled: bool,
}

impl ItemFlags {
    /// Selectable and enabled, but read-only.
    pub fn new() -> Self {
        Self {
            selectable: true,
            editable: false,
            enabled: true,
        }
    }

    /// No interaction at all; what models answer for out-of-range cells.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_editable(self, editable: bool) -> Self {
        Self { editable, ..self }
    }
}

/// What a successful commit did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The value was stored and a change notification was emitted.
    Applied,
    /// The formatted value already matched; nothing was stored or emitted.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Column headers.
    Horizontal,
    /// Row headers.
    Vertical,
}

/// A flat table of cells answered by role.
///
/// Views and selection only ever see this trait, which is what lets a
/// [`ProxyModel`](super::ProxyModel) stand in for its source. The four
/// required methods make a read-only model; editable models add
/// [`commit_data`](ItemModel::commit_data) and [`flags`](ItemModel::flags).
///
/// ```
/// use tabula::model::{ItemData, ItemModel, ItemRole, ModelIndex, ModelSignals};
///
/// struct Names {
///     items: Vec<String>,
///     signals: ModelSignals,
/// }
///
/// impl ItemModel for Names {
///     fn row_count(&self) -> usize {
///         self.items.len()
///     }
///
///     fn column_count(&self) -> usize {
///         1
///     }
///
///     fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
///         if !self.contains(index) {
///             return ItemData::None;
///         }
///         match role {
///             ItemRole::Display => ItemData::from(&self.items[index.row()]),
///             _ => ItemData::None,
///         }
///     }
///
///     fn signals(&self) -> &ModelSignals {
///         &self.signals
///     }
/// }
/// ```
pub trait ItemModel: Send + Sync {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    /// Answers one role of one cell. Anything unanswerable, including a stale
    /// or null index, is `ItemData::None`.
    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData;

    fn signals(&self) -> &ModelSignals;

    fn contains(&self, index: &ModelIndex) -> bool {
        index.is_valid() && index.row() < self.row_count() && index.column() < self.column_count()
    }

    /// A checked index: null when `(row, column)` is outside the model.
    fn index(&self, row: usize, column: usize) -> ModelIndex {
        Some(ModelIndex::new(row, column))
            .filter(|index| self.contains(index))
            .unwrap_or_default()
    }

    /// Stores an edited value and says whether anything changed.
    /// Models are read-only unless they override this.
    fn commit_data(&self, index: &ModelIndex, _value: ItemData) -> Result<EditOutcome> {
        Err(Error::NotEditable {
            row: index.row(),
            column: index.column(),
        })
    }

    /// Boolean form of [`commit_data`](ItemModel::commit_data) for the
    /// [`ItemRole::Edit`] role. A rejected edit leaves storage untouched and
    /// emits nothing; a value that already matched still counts as success.
    fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        role == ItemRole::Edit && self.commit_data(index, value).is_ok()
    }

    fn flags(&self, _index: &ModelIndex) -> ItemFlags {
        ItemFlags::new()
    }

    /// `section` is a column for horizontal headers and a row otherwise.
    fn header_data(&self, _section: usize, _orientation: Orientation, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    /// Bumped whenever row positions may have moved. An index taken at some
    /// generation still addresses the same row while the value holds.
    fn layout_generation(&self) -> u64 {
        0
    }

    /// Current position of a stored row, by identity. The default scans
    /// column 0's `RowIdentity` answers.
    fn find_row(&self, identity: &RowRef) -> Option<usize> {
        if self.column_count() == 0 {
            return None;
        }
        (0..self.row_count()).find(|&row| {
            self.data(&ModelIndex::new(row, 0), ItemRole::RowIdentity)
                .as_row()
                .is_some_and(|candidate| candidate.same_row(identity))
        })
    }

    fn display_text(&self, index: &ModelIndex) -> String {
        self.data(index, ItemRole::Display).to_string()
    }

    /// The stored row behind a position of this model.
    fn row_identity(&self, row: usize) -> Option<RowRef> {
        self.data(&ModelIndex::new(row, 0), ItemRole::RowIdentity)
            .into_row()
    }
}

/// Change notifications every model carries.
///
/// Structural changes come in `about_to`/done pairs with the same inclusive
/// `(first, last)` range. Cell edits emit one `data_changed` covering exactly
/// the touched cells. Reorders are bracketed by the layout pair and wholesale
/// replacement by the reset pair.
pub struct ModelSignals {
    pub rows_about_to_be_inserted: Signal<(usize, usize)>,
    pub rows_inserted: Signal<(usize, usize)>,
    pub rows_about_to_be_removed: Signal<(usize, usize)>,
    pub rows_removed: Signal<(usize, usize)>,
    /// Columns are only ever appended.
    pub columns_about_to_be_inserted: Signal<(usize, usize)>,
    pub columns_inserted: Signal<(usize, usize)>,
    /// `(top_left, bottom_right, roles)`.
    pub data_changed: Signal<(ModelIndex, ModelIndex, Vec<ItemRole>)>,
    pub header_data_changed: Signal<(Orientation, usize, usize)>,
    pub layout_about_to_change: Signal<()>,
    pub layout_changed: Signal<()>,
    pub model_about_to_reset: Signal<()>,
    pub model_reset: Signal<()>,
}

impl Default for ModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSignals {
    pub fn new() -> Self {
        Self {
            rows_about_to_be_inserted: Signal::new(),
            rows_inserted: Signal::new(),
            rows_about_to_be_removed: Signal::new(),
            rows_removed: Signal::new(),
            columns_about_to_be_inserted: Signal::new(),
            columns_inserted: Signal::new(),
            data_changed: Signal::new(),
            header_data_changed: Signal::new(),
            layout_about_to_change: Signal::new(),
            layout_changed: Signal::new(),
            model_about_to_reset: Signal::new(),
            model_reset: Signal::new(),
        }
    }

    /// Runs `mutate` between `rows_about_to_be_inserted` and `rows_inserted`.
    pub fn emit_rows_inserted(&self, first: usize, last: usize, mutate: impl FnOnce()) {
        bracket(&self.rows_about_to_be_inserted, &self.rows_inserted, (first, last), mutate);
    }

    pub fn emit_rows_removed(&self, first: usize, last: usize, mutate: impl FnOnce()) {
        bracket(&self.rows_about_to_be_removed, &self.rows_removed, (first, last), mutate);
    }

    pub fn emit_columns_inserted(&self, first: usize, last: usize, mutate: impl FnOnce()) {
        bracket(&self.columns_about_to_be_inserted, &self.columns_inserted, (first, last), mutate);
    }

    pub fn emit_reset(&self, mutate: impl FnOnce()) {
        bracket(&self.model_about_to_reset, &self.model_reset, (), mutate);
    }

    pub fn emit_layout_changed(&self, mutate: impl FnOnce()) {
        bracket(&self.layout_about_to_change, &self.layout_changed, (), mutate);
    }

    pub fn emit_data_changed_single(&self, index: ModelIndex, roles: Vec<ItemRole>) {
        self.data_changed.emit((index, index, roles));
    }
}

fn bracket<A: Clone + Send + 'static>(before: &Signal<A>, after: &Signal<A>, args: A, mutate: impl FnOnce()) {
    before.emit(args.clone());
    mutate();
    after.emit(args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Fixed {
        values: Vec<i64>,
        signals: ModelSignals,
    }

    impl ItemModel for Fixed {
        fn row_count(&self) -> usize {
            self.values.len()
        }

        fn column_count(&self) -> usize {
            1
        }

        fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
            if !self.contains(index) || role != ItemRole::Display {
                return ItemData::None;
            }
            ItemData::Int(self.values[index.row()])
        }

        fn signals(&self) -> &ModelSignals {
            &self.signals
        }
    }

    #[test]
    fn flags_default_to_read_only() {
        let flags = ItemFlags::new();
        assert!(flags.selectable && flags.enabled && !flags.editable);
        assert!(flags.with_editable(true).editable);
        assert_eq!(ItemFlags::disabled(), ItemFlags::default());
    }

    #[test]
    fn index_is_checked_against_bounds() {
        let model = Fixed {
            values: vec![1, 2],
            signals: ModelSignals::new(),
        };
        assert!(model.index(1, 0).is_valid());
        assert!(!model.index(2, 0).is_valid());
        assert!(!model.index(0, 1).is_valid());
        assert_eq!(model.display_text(&ModelIndex::new(9, 9)), "");
    }

    #[test]
    fn models_are_read_only_by_default() {
        let model = Fixed {
            values: vec![1],
            signals: ModelSignals::new(),
        };
        let index = model.index(0, 0);
        assert!(!model.set_data(&index, ItemData::Int(5), ItemRole::Edit));
        assert!(matches!(
            model.commit_data(&index, ItemData::Int(5)),
            Err(Error::NotEditable { row: 0, column: 0 })
        ));
        assert_eq!(model.find_row(&RowRef::new(crate::model::Row::scalar(1))), None);
    }

    #[test]
    fn mutation_runs_between_the_pair() {
        let signals = ModelSignals::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        signals.rows_about_to_be_removed.connect(move |&range| sink.lock().push(("before", range)));
        let sink = log.clone();
        signals.rows_removed.connect(move |&range| sink.lock().push(("after", range)));

        let sink = log.clone();
        signals.emit_rows_removed(1, 3, || sink.lock().push(("mutate", (1, 3))));

        assert_eq!(*log.lock(), vec![("before", (1, 3)), ("mutate", (1, 3)), ("after", (1, 3))]);
    }

    #[test]
    fn reset_pair_fires_once_each() {
        let signals = ModelSignals::new();
        let count = Arc::new(Mutex::new(0));

        let before = count.clone();
        signals.model_about_to_reset.connect(move |_| *before.lock() += 1);
        let after = count.clone();
        signals.model_reset.connect(move |_| *after.lock() += 10);

        signals.emit_reset(|| {});
        assert_eq!(*count.lock(), 11);
    }
}
