//! The tabular model: row storage, role dispatch and change notification.
//!
//! `TableModel` owns an ordered sequence of [`RowRef`]s and an append-only set
//! of [`TableColumn`]s. Every query goes through the owning column or through
//! the rule lists; every mutation announces exactly the range it touched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tabula_core::logging::targets;

use super::column::{GraphemeMeasure, TableColumn, TextMeasure};
use super::index::ModelIndex;
use super::role::{ItemData, ItemRole};
use super::row::{FieldKey, RowRef};
use super::rule::{CellContext, RuleSet, StyleRule};
use super::traits::{EditOutcome, ItemFlags, ItemModel, ModelSignals, Orientation};
use crate::error::{Error, Result};

/// A table of externally supplied rows presented through typed columns.
///
/// # Example
///
/// ```
/// use tabula::model::{ItemModel, ItemRole, Row, TableModel};
///
/// let model = TableModel::new();
/// model.add_column("n", "Name", true);
/// model.append_rows([Row::record([("n", "b")]), Row::record([("n", "a")])]);
///
/// assert_eq!(model.row_count(), 2);
/// let index = model.index(1, 0);
/// assert_eq!(model.display_text(&index), "a");
///
/// assert!(model.set_data(&index, "z".into(), ItemRole::Edit));
/// assert_eq!(model.display_text(&index), "z");
/// ```
pub struct TableModel {
    rows: RwLock<Vec<RowRef>>,
    columns: RwLock<Vec<Arc<TableColumn>>>,
    foreground: RuleSet,
    background: RuleSet,
    generation: AtomicU64,
    signals: ModelSignals,
}

impl Default for TableModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TableModel {
    /// Creates an empty model with no columns.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            columns: RwLock::new(Vec::new()),
            foreground: RuleSet::new(),
            background: RuleSet::new(),
            generation: AtomicU64::new(0),
            signals: ModelSignals::new(),
        }
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Appends a keyed column. Returns its index.
    pub fn add_column(&self, key: impl Into<FieldKey>, name: impl Into<String>, editable: bool) -> usize {
        self.add_table_column(TableColumn::keyed(name, key).with_editable(editable))
    }

    /// Appends a whole-row column. Returns its index.
    pub fn add_list_column(&self, name: impl Into<String>) -> usize {
        self.add_table_column(TableColumn::list(name))
    }

    /// Appends a read-only computed column. Returns its index.
    ///
    /// Build the column with [`TableColumn::transform`] and
    /// [`TableColumn::with_reverse`] to make it editable.
    pub fn add_transform_column<F>(&self, key: Option<FieldKey>, name: impl Into<String>, forward: F) -> usize
    where
        F: Fn(&[RowRef], usize, Option<&FieldKey>) -> ItemData + Send + Sync + 'static,
    {
        self.add_table_column(TableColumn::transform(name, key, forward))
    }

    /// Appends a prepared column. Returns its index.
    pub fn add_table_column(&self, column: TableColumn) -> usize {
        let column = Arc::new(column);
        let index = self.columns.read().len();
        tracing::debug!(target: targets::MODEL, index, name = %column.name(), "adding column");
        self.signals.emit_columns_inserted(index, index, || {
            self.columns.write().push(column);
        });
        index
    }

    /// Returns the column at `index`.
    pub fn column(&self, index: usize) -> Option<Arc<TableColumn>> {
        self.columns.read().get(index).cloned()
    }

    /// Returns the index of the first column called `name`.
    pub fn column_index_by_name(&self, name: &str) -> Result<usize> {
        self.columns
            .read()
            .iter()
            .position(|column| column.name() == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Renames a column and announces the header change.
    pub fn set_column_name(&self, index: usize, name: impl Into<String>) -> Result<()> {
        let column = self.column(index).ok_or(Error::InvalidIndex { row: 0, column: index })?;
        column.set_name(name);
        self.signals
            .header_data_changed
            .emit((Orientation::Horizontal, index, index));
        Ok(())
    }

    /// Sets the short name of a column and announces the header change.
    pub fn set_column_short_name(&self, index: usize, short_name: impl Into<String>) -> Result<()> {
        let column = self.column(index).ok_or(Error::InvalidIndex { row: 0, column: index })?;
        column.set_short_name(Some(short_name.into()));
        self.signals
            .header_data_changed
            .emit((Orientation::Horizontal, index, index));
        Ok(())
    }

    /// Returns the header text of a column for a section `available_width` wide.
    pub fn column_display_name(&self, index: usize, available_width: f32, measure: &dyn TextMeasure) -> Option<String> {
        self.column(index)
            .map(|column| column.header_text(available_width, measure))
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// Appends a foreground rule.
    pub fn add_foreground_rule<F>(&self, name: impl Into<String>, rule: F)
    where
        F: Fn(&CellContext<'_>) -> Option<ItemData> + Send + Sync + 'static,
    {
        self.foreground.push(StyleRule::new(name, rule));
    }

    /// Appends a background rule.
    pub fn add_background_rule<F>(&self, name: impl Into<String>, rule: F)
    where
        F: Fn(&CellContext<'_>) -> Option<ItemData> + Send + Sync + 'static,
    {
        self.background.push(StyleRule::new(name, rule));
    }

    /// Removes rules called `name` from both lists.
    pub fn remove_rule(&self, name: &str) -> bool {
        let foreground = self.foreground.remove(name);
        let background = self.background.remove(name);
        foreground || background
    }

    /// Returns the foreground rule list.
    pub fn foreground_rules(&self) -> &RuleSet {
        &self.foreground
    }

    /// Returns the background rule list.
    pub fn background_rules(&self) -> &RuleSet {
        &self.background
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Returns `true` if the model holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Returns the row stored at `row`.
    pub fn row(&self, row: usize) -> Option<RowRef> {
        self.rows.read().get(row).cloned()
    }

    /// Returns every stored row reference in order.
    pub fn rows(&self) -> Vec<RowRef> {
        self.rows.read().clone()
    }

    /// Inserts a row before `at`, shifting later rows down.
    ///
    /// `at == row_count()` appends. Returns `false` (no mutation, no
    /// notification) when `at` is out of range.
    pub fn insert_row(&self, at: usize, row: impl Into<RowRef>) -> bool {
        if at > self.row_count() {
            return false;
        }
        let row = row.into();
        tracing::trace!(target: targets::MODEL, at, "inserting row");
        self.signals.emit_rows_inserted(at, at, || {
            self.rows.write().insert(at, row);
            self.bump_generation();
        });
        true
    }

    /// Appends one row.
    pub fn append_row(&self, row: impl Into<RowRef>) {
        let at = self.row_count();
        self.insert_row(at, row);
    }

    /// Appends a batch of rows with a single bracketed notification.
    ///
    /// An empty batch is a no-op.
    pub fn append_rows<I>(&self, rows: I)
    where
        I: IntoIterator,
        I::Item: Into<RowRef>,
    {
        let batch: Vec<RowRef> = rows.into_iter().map(Into::into).collect();
        if batch.is_empty() {
            return;
        }
        let first = self.row_count();
        let last = first + batch.len() - 1;
        tracing::debug!(target: targets::MODEL, first, last, "appending row batch");
        self.signals.emit_rows_inserted(first, last, || {
            self.rows.write().extend(batch);
            self.bump_generation();
        });
    }

    /// Removes the row at `at`.
    pub fn remove_row(&self, at: usize) -> bool {
        self.remove_rows(at, 1)
    }

    /// Removes `count` rows starting at `at`.
    ///
    /// Returns `false` (no mutation, no notification) when the range is empty
    /// or extends past the last row.
    pub fn remove_rows(&self, at: usize, count: usize) -> bool {
        let len = self.row_count();
        let end = match at.checked_add(count) {
            Some(end) if count > 0 && end <= len => end,
            _ => {
                tracing::debug!(target: targets::MODEL, at, count, len, "remove out of range");
                return false;
            }
        };
        tracing::trace!(target: targets::MODEL, at, count, "removing rows");
        self.signals.emit_rows_removed(at, end - 1, || {
            self.rows.write().drain(at..end);
            self.bump_generation();
        });
        true
    }

    /// Replaces the row at `at` in place.
    ///
    /// Row positions do not change; every cell of the row is announced as
    /// changed. The layout generation still moves, so coordinates captured
    /// against the old row are re-checked.
    pub fn replace_row(&self, at: usize, row: impl Into<RowRef>) -> bool {
        let row = row.into();
        {
            let mut rows = self.rows.write();
            match rows.get_mut(at) {
                Some(slot) => *slot = row,
                None => return false,
            }
        }
        // Positions hold but the identity at `at` changed.
        self.bump_generation();
        let columns = self.column_count();
        if columns > 0 {
            self.signals.data_changed.emit((
                ModelIndex::new(at, 0),
                ModelIndex::new(at, columns - 1),
                vec![ItemRole::Display, ItemRole::Edit],
            ));
        }
        true
    }

    /// Replaces the whole dataset.
    ///
    /// Every coordinate, selection and in-flight edit from before the call is
    /// void afterwards.
    pub fn reset<I>(&self, rows: I)
    where
        I: IntoIterator,
        I::Item: Into<RowRef>,
    {
        let rows: Vec<RowRef> = rows.into_iter().map(Into::into).collect();
        tracing::debug!(target: targets::MODEL, count = rows.len(), "resetting model");
        self.signals.emit_reset(|| {
            *self.rows.write() = rows;
            self.bump_generation();
        });
    }

    /// Removes every row.
    pub fn clear(&self) {
        self.reset(Vec::<RowRef>::new());
    }

    /// Announces a repaint of every cell for the Display and style roles.
    ///
    /// Used when rule inputs changed without the rows changing.
    pub fn force_repaint(&self) {
        let (rows, columns) = (self.row_count(), self.column_count());
        if rows == 0 || columns == 0 {
            return;
        }
        self.signals.data_changed.emit((
            ModelIndex::new(0, 0),
            ModelIndex::new(rows - 1, columns - 1),
            ItemRole::REPAINT.to_vec(),
        ));
    }

    fn cell(&self, index: &ModelIndex) -> Option<(Arc<TableColumn>, RowRef)> {
        if !index.is_valid() {
            return None;
        }
        let column = self.column(index.column())?;
        let row = self.row(index.row())?;
        Some((column, row))
    }

    fn style(&self, rules: &RuleSet, index: &ModelIndex) -> ItemData {
        if rules.is_empty() {
            return ItemData::None;
        }
        match self.cell(index) {
            Some((column, row)) => rules.evaluate(&CellContext {
                index: *index,
                column: &column,
                row: &row,
            }),
            None => ItemData::None,
        }
    }
}

impl ItemModel for TableModel {
    fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    fn column_count(&self) -> usize {
        self.columns.read().len()
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        if !self.contains(index) {
            return ItemData::None;
        }
        let row = index.row();
        match role {
            ItemRole::Foreground => return self.style(&self.foreground, index),
            ItemRole::Background => return self.style(&self.background, index),
            ItemRole::RowIndex => return ItemData::from(row),
            _ => {}
        }
        let Some(column) = self.column(index.column()) else {
            return ItemData::None;
        };
        let rows = self.rows.read();
        match role {
            ItemRole::Display | ItemRole::Edit => column.data(&rows, row),
            ItemRole::Decoration => column.decoration(&rows, row),
            ItemRole::SortValue => column.sort_value(&rows, row),
            ItemRole::TextAlignment => ItemData::TextAlignment(column.text_alignment()),
            ItemRole::RowIdentity => rows
                .get(row)
                .map(|stored| ItemData::Row(stored.clone()))
                .unwrap_or_default(),
            _ => ItemData::None,
        }
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn commit_data(&self, index: &ModelIndex, value: ItemData) -> Result<EditOutcome> {
        let (row, column_index) = (index.row(), index.column());
        if !self.contains(index) {
            return Err(Error::InvalidIndex {
                row,
                column: column_index,
            });
        }
        let column = self
            .column(column_index)
            .ok_or(Error::InvalidIndex { row, column: column_index })?;
        if !column.is_editable() {
            return Err(Error::NotEditable {
                row,
                column: column_index,
            });
        }

        let current = column.data(&self.rows.read(), row);
        if current.to_string() == value.to_string() {
            tracing::trace!(target: targets::EDIT, row, column = column_index, "edit is a no-op");
            return Ok(EditOutcome::Unchanged);
        }

        let stored = column.set_data(&self.rows.read(), row, &value);
        if let Err(reason) = stored {
            tracing::debug!(target: targets::EDIT, row, column = column_index, %reason, "edit rejected");
            return Err(Error::edit_rejected(column_index, reason.message()));
        }

        tracing::trace!(target: targets::EDIT, row, column = column_index, "edit applied");
        self.signals
            .emit_data_changed_single(*index, vec![ItemRole::Display, ItemRole::Edit]);
        Ok(EditOutcome::Applied)
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let editable = self
            .column(index.column())
            .is_some_and(|column| column.is_editable());
        ItemFlags::new().with_editable(editable)
    }

    fn header_data(&self, section: usize, orientation: Orientation, role: ItemRole) -> ItemData {
        match (orientation, role) {
            (Orientation::Horizontal, ItemRole::Display) => self
                .column_display_name(section, 0.0, &GraphemeMeasure::default())
                .map(ItemData::from)
                .unwrap_or_default(),
            (Orientation::Horizontal, ItemRole::SizeHint) => self
                .column(section)
                .and_then(|column| column.claim_initial_width())
                .map(|width| ItemData::Size(width, 0.0))
                .unwrap_or_default(),
            (Orientation::Vertical, ItemRole::Display) if section < self.row_count() => {
                ItemData::from(section + 1)
            }
            _ => ItemData::None,
        }
    }

    fn layout_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn find_row(&self, identity: &RowRef) -> Option<usize> {
        self.rows.read().iter().position(|row| row.same_row(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::model::{Color, Row};
    use parking_lot::Mutex;

    fn names_model(names: &[&str]) -> TableModel {
        let model = TableModel::new();
        model.add_column("n", "Name", true);
        model.append_rows(names.iter().map(|name| Row::record([("n", *name)])));
        model
    }

    fn names(model: &TableModel) -> Vec<String> {
        (0..model.row_count())
            .map(|row| model.display_text(&ModelIndex::new(row, 0)))
            .collect()
    }

    #[test]
    fn test_empty_model() {
        let model = TableModel::new();
        assert_eq!(model.row_count(), 0);
        assert_eq!(model.column_count(), 0);
        assert!(model.is_empty());
        assert!(model.data(&ModelIndex::new(0, 0), ItemRole::Display).is_none());
    }

    #[test]
    fn test_invalid_coordinates_yield_none() {
        let model = names_model(&["a"]);
        for index in [ModelIndex::invalid(), ModelIndex::new(1, 0), ModelIndex::new(0, 1)] {
            assert!(model.data(&index, ItemRole::Display).is_none());
            assert!(model.data(&index, ItemRole::RowIdentity).is_none());
            assert!(model.data(&index, ItemRole::RowIndex).is_none());
        }
    }

    #[test]
    fn test_add_column_returns_index() {
        let model = TableModel::new();
        assert_eq!(model.add_column("a", "A", false), 0);
        assert_eq!(model.add_list_column("Row"), 1);
        assert_eq!(
            model.add_transform_column(None, "Const", |_, _, _| ItemData::Int(1)),
            2
        );
        assert_eq!(model.column_count(), 3);
        assert_eq!(model.column_index_by_name("Row").unwrap(), 1);
        assert!(matches!(
            model.column_index_by_name("missing"),
            Err(Error::UnknownColumn(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_column_append_is_announced() {
        let model = TableModel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        model.signals().columns_inserted.connect(move |&range| {
            seen_clone.lock().push(range);
        });

        model.add_column("a", "A", false);
        model.add_column("b", "B", false);
        assert_eq!(*seen.lock(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_insert_row_shifts() {
        let model = names_model(&["a", "c"]);
        assert!(model.insert_row(1, Row::record([("n", "b")])));
        assert_eq!(names(&model), vec!["a", "b", "c"]);

        assert!(model.insert_row(3, Row::record([("n", "d")])));
        assert!(!model.insert_row(9, Row::record([("n", "x")])));
        assert_eq!(names(&model), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_insert_then_remove_restores_rows() {
        let model = names_model(&["a", "b", "c"]);
        let before = model.rows();

        assert!(model.insert_row(1, Row::record([("n", "x")])));
        assert!(model.remove_row(1));

        let after = model.rows();
        assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(&after) {
            assert!(old.same_row(new));
        }
        assert_eq!(names(&model), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_bounds() {
        let model = names_model(&["a", "b", "c"]);
        let events = Arc::new(Mutex::new(0));
        let events_clone = events.clone();
        model.signals().rows_removed.connect(move |_| *events_clone.lock() += 1);

        assert!(!model.remove_row(3));
        assert!(!model.remove_rows(2, 2));
        assert!(!model.remove_rows(0, 0));
        assert!(!model.remove_rows(usize::MAX, 2));
        assert_eq!(*events.lock(), 0);
        assert_eq!(model.row_count(), 3);

        assert!(model.remove_rows(0, 2));
        assert_eq!(names(&model), vec!["c"]);
        assert_eq!(*events.lock(), 1);
    }

    #[test]
    fn test_remove_range_announces_exact_range() {
        let model = names_model(&["a", "b", "c", "d"]);
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let about = ranges.clone();
        model
            .signals()
            .rows_about_to_be_removed
            .connect(move |&range| about.lock().push(("about", range)));
        let done = ranges.clone();
        model
            .signals()
            .rows_removed
            .connect(move |&range| done.lock().push(("done", range)));

        assert!(model.remove_rows(1, 2));
        assert_eq!(*ranges.lock(), vec![("about", (1, 2)), ("done", (1, 2))]);
    }

    #[test]
    fn test_empty_batch_is_silent() {
        let model = names_model(&[]);
        let events = Arc::new(Mutex::new(0));
        let events_clone = events.clone();
        model
            .signals()
            .rows_about_to_be_inserted
            .connect(move |_| *events_clone.lock() += 1);

        model.append_rows(Vec::<Row>::new());
        assert_eq!(*events.lock(), 0);
    }

    #[test]
    fn test_row_identity_is_stored_reference() {
        let row = RowRef::new(Row::record([("n", "a")]));
        let model = TableModel::new();
        model.add_column("n", "Name", false);
        model.append_row(row.clone());

        let identity = model.data(&ModelIndex::new(0, 0), ItemRole::RowIdentity);
        assert!(identity.as_row().is_some_and(|stored| stored.same_row(&row)));
        assert_eq!(model.data(&ModelIndex::new(0, 0), ItemRole::RowIndex), ItemData::Int(0));
        assert_eq!(model.find_row(&row), Some(0));
        assert_eq!(model.find_row(&RowRef::new(Row::record([("n", "a")]))), None);
    }

    #[test]
    fn test_edit_emits_single_scoped_change() {
        let model = names_model(&["a", "b"]);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        model.signals().data_changed.connect(move |(tl, br, _)| {
            changes_clone.lock().push((*tl, *br));
        });

        let index = model.index(1, 0);
        assert_eq!(model.commit_data(&index, "z".into()).unwrap(), EditOutcome::Applied);
        assert_eq!(*changes.lock(), vec![(index, index)]);
        assert_eq!(names(&model), vec!["a", "z"]);
    }

    #[test]
    fn test_no_op_edit_is_silent() {
        let model = names_model(&["a"]);
        let changes = Arc::new(Mutex::new(0));
        let changes_clone = changes.clone();
        model.signals().data_changed.connect(move |_| *changes_clone.lock() += 1);

        let index = model.index(0, 0);
        assert_eq!(model.commit_data(&index, "a".into()).unwrap(), EditOutcome::Unchanged);
        assert!(model.set_data(&index, "a".into(), ItemRole::Edit));
        assert_eq!(*changes.lock(), 0);
    }

    #[test]
    fn test_rejected_edits() {
        let model = TableModel::new();
        model.add_column("n", "Name", false);
        model.add_table_column(
            TableColumn::transform("Count", Some("c".into()), |rows, row, key| {
                key.and_then(|k| rows[row].field(k)).unwrap_or_default()
            })
            .with_reverse(|_, _, _, _| Err(TransformError::new("never"))),
        );
        model.append_row(Row::record([("n", "a"), ("c", "1")]));

        assert!(matches!(
            model.commit_data(&ModelIndex::new(0, 0), "b".into()),
            Err(Error::NotEditable { row: 0, column: 0 })
        ));
        assert!(matches!(
            model.commit_data(&ModelIndex::new(0, 1), "2".into()),
            Err(Error::EditRejected { column: 1, .. })
        ));
        assert!(matches!(
            model.commit_data(&ModelIndex::new(5, 0), "b".into()),
            Err(Error::InvalidIndex { row: 5, column: 0 })
        ));
        assert!(!model.set_data(&ModelIndex::new(0, 1), "2".into(), ItemRole::Edit));
        assert!(!model.set_data(&ModelIndex::new(0, 1), "2".into(), ItemRole::Display));
        assert_eq!(model.display_text(&ModelIndex::new(0, 1)), "1");
    }

    #[test]
    fn test_flags_follow_column() {
        let model = TableModel::new();
        model.add_column("a", "A", true);
        model.add_column("b", "B", false);
        model.append_row(Row::record([("a", 1), ("b", 2)]));

        assert!(model.flags(&model.index(0, 0)).editable);
        let read_only = model.flags(&model.index(0, 1));
        assert!(!read_only.editable);
        assert!(read_only.selectable);
        assert!(read_only.enabled);
    }

    #[test]
    fn test_replace_row_announces_full_row() {
        let model = TableModel::new();
        model.add_column("a", "A", false);
        model.add_column("b", "B", false);
        model.append_rows([Row::record([("a", 1), ("b", 2)])]);

        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        model.signals().data_changed.connect(move |(tl, br, _)| {
            changes_clone.lock().push((*tl, *br));
        });

        assert!(model.replace_row(0, Row::record([("a", 3), ("b", 4)])));
        assert!(!model.replace_row(1, Row::record([("a", 0)])));
        assert_eq!(
            *changes.lock(),
            vec![(ModelIndex::new(0, 0), ModelIndex::new(0, 1))]
        );
        assert_eq!(model.display_text(&ModelIndex::new(0, 1)), "4");
    }

    #[test]
    fn test_reset_replaces_everything() {
        let model = names_model(&["a", "b"]);
        let resets = Arc::new(Mutex::new(0));
        let resets_clone = resets.clone();
        model.signals().model_reset.connect(move |_| *resets_clone.lock() += 1);

        let fresh: Vec<RowRef> = ["x", "y", "z"]
            .iter()
            .map(|n| RowRef::new(Row::record([("n", *n)])))
            .collect();
        model.reset(fresh.clone());

        assert_eq!(*resets.lock(), 1);
        let stored = model.rows();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().zip(&fresh).all(|(a, b)| a.same_row(b)));

        model.clear();
        assert!(model.is_empty());
    }

    #[test]
    fn test_generation_tracks_structure() {
        let model = names_model(&["a"]);
        let start = model.layout_generation();

        model.commit_data(&model.index(0, 0), "b".into()).unwrap();
        assert_eq!(model.layout_generation(), start);

        model.replace_row(0, Row::record([("n", "c")]));
        let replaced = model.layout_generation();
        assert!(replaced > start);

        model.append_row(Row::record([("n", "d")]));
        assert!(model.layout_generation() > replaced);
    }

    #[test]
    fn test_style_rules() {
        let model = names_model(&["keep", "warn"]);
        model.add_foreground_rule("warn", |cell| {
            let value = cell.column.key().and_then(|key| cell.row.field(key))?;
            (value.as_string() == Some("warn")).then_some(ItemData::Color(Color::RED))
        });
        model.add_background_rule("stripe", |cell| {
            (cell.index.row() % 2 == 0).then_some(ItemData::Color(Color::GRAY))
        });

        assert!(model.data(&model.index(0, 0), ItemRole::Foreground).is_none());
        assert_eq!(
            model.data(&model.index(1, 0), ItemRole::Foreground),
            ItemData::Color(Color::RED)
        );
        assert_eq!(
            model.data(&model.index(0, 0), ItemRole::Background),
            ItemData::Color(Color::GRAY)
        );

        assert!(model.remove_rule("warn"));
        assert!(model.data(&model.index(1, 0), ItemRole::Foreground).is_none());
    }

    #[test]
    fn test_force_repaint() {
        let model = names_model(&["a", "b"]);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        model.signals().data_changed.connect(move |(tl, br, roles)| {
            changes_clone.lock().push((*tl, *br, roles.clone()));
        });

        model.force_repaint();
        assert_eq!(
            *changes.lock(),
            vec![(
                ModelIndex::new(0, 0),
                ModelIndex::new(1, 0),
                ItemRole::REPAINT.to_vec()
            )]
        );

        names_model(&[]).force_repaint();
    }

    #[test]
    fn test_header_data() {
        let model = TableModel::new();
        model.add_table_column(TableColumn::keyed("Modified", "m").with_default_width(150.0));
        model.append_row(Row::record([("m", 1)]));

        assert_eq!(
            model.header_data(0, Orientation::Horizontal, ItemRole::Display),
            ItemData::from("Modified")
        );
        assert_eq!(
            model.header_data(0, Orientation::Vertical, ItemRole::Display),
            ItemData::Int(1)
        );
        assert_eq!(
            model.header_data(0, Orientation::Horizontal, ItemRole::SizeHint),
            ItemData::Size(150.0, 0.0)
        );
        assert!(model.header_data(0, Orientation::Horizontal, ItemRole::SizeHint).is_none());
        assert!(model.header_data(4, Orientation::Horizontal, ItemRole::Display).is_none());
    }

    #[test]
    fn test_short_name_update_is_announced() {
        let model = TableModel::new();
        model.add_column("m", "Modified", false);
        let headers = Arc::new(Mutex::new(Vec::new()));
        let headers_clone = headers.clone();
        model
            .signals()
            .header_data_changed
            .connect(move |&change| headers_clone.lock().push(change));

        model.set_column_short_name(0, "Mod").unwrap();
        assert!(model.set_column_short_name(3, "X").is_err());
        assert_eq!(*headers.lock(), vec![(Orientation::Horizontal, 0, 0)]);

        let measure = GraphemeMeasure { advance: 10.0 };
        assert_eq!(model.column_display_name(0, 50.0, &measure).as_deref(), Some("Mod"));
    }
}
