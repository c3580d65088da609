//! The table binding: a model, its optional proxy, and per-view state.
//!
//! [`TableBinding`] is what a hosting toolkit's table widget holds. It binds
//! a [`TableModel`], inserts a sort/filter [`ProxyModel`] when sorting is
//! enabled, and owns everything that belongs to the view rather than the
//! data: selection, header sections, and per-column edit delegates.
//!
//! Selection is positional, but it follows rows. Before any structural or
//! layout change of the displayed model the binding records the identity of
//! every selected row; afterwards it re-locates those rows and reselects
//! them. A reset clears the selection.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tabula::model::{Row, SortOrder, TableModel};
//! use tabula::view::TableBinding;
//!
//! let model = Arc::new(TableModel::new());
//! model.add_column("n", "Name", true);
//! model.append_rows(["b", "a", "c"].map(|n| Row::record([("n", n)])));
//!
//! let binding = TableBinding::new();
//! binding.set_model(model.clone());
//! binding.set_selected_rows(&[0]).unwrap();
//!
//! binding.sort_by_column(0, SortOrder::Ascending);
//! // The same row is still selected, now at position 1.
//! assert_eq!(binding.selected_rows(), vec![1]);
//! assert!(binding.selection()[0].same_row(&model.row(0).unwrap()));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tabula_core::logging::targets;
use tabula_core::{ConnectionGuard, Signal};

use super::delegate::{EditDelegate, TextDelegate};
use super::header::HeaderState;
use super::layout::{ColumnLayout, LayoutStore, RestoreReport};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::model::{
    EditOutcome, ItemData, ItemModel, ItemRole, ModelIndex, ModelSignals, Orientation, PendingEdit,
    ProxyModel, Row, RowRef, SelectionBehavior, SelectionFlags, SelectionMode, SelectionModel, SortOrder,
    TableModel, TextMeasure,
};

type DataChange = (ModelIndex, ModelIndex, Vec<ItemRole>);

struct Bound {
    model: Arc<TableModel>,
    proxy: Option<Arc<ProxyModel<TableModel>>>,
    _connections: BindingConnections,
}

impl Bound {
    fn view(&self) -> Arc<dyn ItemModel> {
        match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => self.model.clone(),
        }
    }
}

struct BindingConnections {
    _ranges: Vec<ConnectionGuard<(usize, usize)>>,
    _events: Vec<ConnectionGuard<()>>,
    _data: ConnectionGuard<DataChange>,
}

/// Selected cells recorded by row identity across a structural change.
struct SelectionStash {
    rows: Vec<(RowRef, Vec<usize>)>,
    current: Option<(RowRef, usize)>,
}

/// An edit opened with [`TableBinding::begin_edit`].
#[derive(Debug, Clone)]
pub struct ActiveEdit {
    pending: PendingEdit,
    original: String,
}

impl ActiveEdit {
    /// Returns the coordinate the edit was opened at.
    pub fn index(&self) -> ModelIndex {
        self.pending.index()
    }

    /// Returns the identity of the edited row.
    pub fn row(&self) -> &RowRef {
        self.pending.identity()
    }

    /// Returns the text the editor started with.
    pub fn original_text(&self) -> &str {
        &self.original
    }
}

/// Binds a [`TableModel`] to view state.
///
/// # Signals
///
/// - `row_changed(usize)`: Emitted once per model row whose data changed
/// - `edit_committed((ModelIndex, String, String))`: Emitted after an edit
///   reached storage, with the edited coordinate and the old and new text
pub struct TableBinding {
    this: Weak<Self>,
    config: RwLock<TableConfig>,
    bound: RwLock<Option<Bound>>,
    selection: Arc<SelectionModel>,
    header: RwLock<HeaderState>,
    delegates: RwLock<HashMap<usize, Arc<dyn EditDelegate>>>,
    stash: Mutex<Option<SelectionStash>>,

    /// Emitted once per model row whose data changed.
    pub row_changed: Signal<usize>,

    /// Emitted after an edit was stored. Args: (index, old text, new text)
    pub edit_committed: Signal<(ModelIndex, String, String)>,
}

impl TableBinding {
    /// Creates an unbound binding with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(TableConfig::default())
    }

    /// Creates an unbound binding.
    pub fn with_config(config: TableConfig) -> Arc<Self> {
        let selection = Arc::new(SelectionModel::new());
        selection.set_selection_mode(config.selection_mode);
        selection.set_selection_behavior(config.selection_behavior);

        let mut header = HeaderState::new();
        header.set_minimum_section_size(config.minimum_column_width);
        header.set_default_section_size(config.default_column_width);

        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            config: RwLock::new(config),
            bound: RwLock::new(None),
            selection,
            header: RwLock::new(header),
            delegates: RwLock::new(HashMap::new()),
            stash: Mutex::new(None),
            row_changed: Signal::new(),
            edit_committed: Signal::new(),
        })
    }

    /// Creates a binding showing a single list column headed `header`.
    ///
    /// Fill it with [`set_list_items`](Self::set_list_items).
    pub fn list(header: impl Into<String>) -> Arc<Self> {
        let binding = Self::new();
        let model = Arc::new(TableModel::new());
        model.add_list_column(header);
        binding.set_model(model);
        binding
    }

    /// Replaces the rows of the bound model with one scalar row per item.
    pub fn set_list_items<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ItemData>,
    {
        let model = self.model().ok_or(Error::NoModel)?;
        model.reset(items.into_iter().map(Row::scalar));
        Ok(())
    }

    // =========================================================================
    // Model
    // =========================================================================

    /// Binds `model`, replacing any previous model.
    ///
    /// A proxy is inserted when sorting is enabled. Selection is cleared;
    /// header sections keep their state where the column count allows.
    pub fn set_model(&self, model: Arc<TableModel>) {
        let (sorting, dynamic) = {
            let config = self.config.read();
            (config.sorting_enabled, config.dynamic_sort)
        };
        let proxy = sorting.then(|| {
            let proxy = ProxyModel::new(model.clone());
            proxy.set_dynamic_sort(dynamic);
            proxy
        });

        let view: Arc<dyn ItemModel> = match &proxy {
            Some(proxy) => proxy.clone(),
            None => model.clone(),
        };
        let connections = self.connect(view.signals(), model.signals());

        tracing::debug!(
            target: targets::MODEL,
            columns = model.column_count(),
            rows = model.row_count(),
            sorting,
            "binding model"
        );
        let previous = self.bound.write().replace(Bound {
            model: model.clone(),
            proxy,
            _connections: connections,
        });
        drop(previous);

        *self.stash.lock() = None;
        self.selection.reset();
        self.header.write().clear_sort_indicator();
        self.sync_header(&model);
    }

    /// Returns the bound model.
    pub fn model(&self) -> Option<Arc<TableModel>> {
        self.bound.read().as_ref().map(|bound| bound.model.clone())
    }

    /// Returns the sort/filter proxy, if sorting is enabled.
    pub fn proxy(&self) -> Option<Arc<ProxyModel<TableModel>>> {
        self.bound.read().as_ref().and_then(|bound| bound.proxy.clone())
    }

    /// Returns the model whose coordinates the view shows.
    pub fn view_model(&self) -> Option<Arc<dyn ItemModel>> {
        self.bound.read().as_ref().map(Bound::view)
    }

    /// Returns the number of displayed rows.
    pub fn row_count(&self) -> usize {
        self.view_model().map_or(0, |view| view.row_count())
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.view_model().map_or(0, |view| view.column_count())
    }

    fn subscribe<A, F>(&self, signal: &Signal<A>, handler: F) -> ConnectionGuard<A>
    where
        A: Clone + Send + 'static,
        F: Fn(&Self, &A) + Send + Sync + 'static,
    {
        let weak = self.this.clone();
        signal.connect_scoped(move |args| {
            if let Some(binding) = weak.upgrade() {
                handler(&binding, args);
            }
        })
    }

    fn connect(&self, view: &ModelSignals, model: &ModelSignals) -> BindingConnections {
        let stash = |binding: &Self, _: &(usize, usize)| binding.stash_selection();
        let restore = |binding: &Self, _: &(usize, usize)| binding.restore_selection();

        BindingConnections {
            _ranges: vec![
                self.subscribe(&view.rows_about_to_be_inserted, stash),
                self.subscribe(&view.rows_inserted, restore),
                self.subscribe(&view.rows_about_to_be_removed, stash),
                self.subscribe(&view.rows_removed, restore),
                self.subscribe(&view.columns_inserted, |binding, _| {
                    if let Some(model) = binding.model() {
                        binding.sync_header(&model);
                    }
                }),
            ],
            _events: vec![
                self.subscribe(&view.layout_about_to_change, |binding, _| binding.stash_selection()),
                self.subscribe(&view.layout_changed, |binding, _| binding.restore_selection()),
                self.subscribe(&view.model_reset, |binding, _| {
                    *binding.stash.lock() = None;
                    binding.selection.reset();
                    tracing::trace!(target: targets::SELECTION, "model reset; selection cleared");
                }),
            ],
            _data: self.subscribe(&model.data_changed, |binding, (top_left, bottom_right, _)| {
                for row in top_left.row()..=bottom_right.row() {
                    binding.row_changed.emit(row);
                }
            }),
        }
    }

    /// Grows or shrinks the header to the model's columns.
    ///
    /// New columns take the model's size hint when it still offers one, the
    /// header default otherwise.
    fn sync_header(&self, model: &TableModel) {
        let count = model.column_count();
        let hints: Vec<(usize, f32)> = (0..count)
            .filter_map(|column| {
                model
                    .header_data(column, Orientation::Horizontal, ItemRole::SizeHint)
                    .as_size()
                    .map(|(width, _)| (column, width))
            })
            .collect();

        let mut header = self.header.write();
        header.set_section_count(count);
        for (column, width) in hints {
            header.set_section_size(column, width);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Returns the selection model.
    pub fn selection_model(&self) -> &Arc<SelectionModel> {
        &self.selection
    }

    /// Returns `true` if anything is selected.
    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    /// Returns the displayed positions of selected rows, ascending.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.selection.selected_rows()
    }

    /// Returns the number of selected rows.
    pub fn selection_count(&self) -> usize {
        self.selection.selected_rows().len()
    }

    /// Returns the identities of the selected rows, in displayed order.
    ///
    /// These are the stored rows themselves, whatever the sort order.
    pub fn selection(&self) -> Vec<RowRef> {
        let Some(view) = self.view_model() else {
            return Vec::new();
        };
        self.selection
            .selected_rows()
            .into_iter()
            .filter_map(|row| view.row_identity(row))
            .collect()
    }

    /// Returns the storage positions of the selected rows.
    ///
    /// Requires row selection behavior.
    pub fn selected_row_indices(&self) -> Result<Vec<usize>> {
        self.require_behavior(SelectionBehavior::SelectRows)?;
        let Some(view) = self.view_model() else {
            return Ok(Vec::new());
        };
        Ok(self
            .selection
            .selected_rows()
            .into_iter()
            .filter_map(|row| {
                view.data(&ModelIndex::new(row, 0), ItemRole::RowIndex)
                    .as_int()
                    .and_then(|index| usize::try_from(index).ok())
            })
            .collect())
    }

    /// Selects the given displayed rows.
    ///
    /// The first row becomes the current row and the anchor; the rest extend
    /// the selection unless the mode allows only one row. Rows outside the
    /// model are skipped. Requires row selection behavior.
    pub fn set_selected_rows(&self, rows: &[usize]) -> Result<()> {
        self.require_behavior(SelectionBehavior::SelectRows)?;
        let view = self.view_model().ok_or(Error::NoModel)?;
        let (row_count, columns) = (view.row_count(), view.column_count());
        let rows: Vec<usize> = rows.iter().copied().filter(|&row| row < row_count).collect();

        let Some((&first, rest)) = rows.split_first() else {
            return Ok(());
        };
        self.selection
            .set_current_index(ModelIndex::new(first, 0), SelectionFlags::CURRENT.with_anchor());
        self.selection
            .select_row(first, columns, SelectionFlags::CLEAR_AND_SELECT);
        let single = matches!(
            self.selection.selection_mode(),
            SelectionMode::SingleSelection | SelectionMode::NoSelection
        );
        if !rest.is_empty() && !single {
            self.selection.select_rows(rest, columns, SelectionFlags::SELECT);
        }
        tracing::debug!(target: targets::SELECTION, count = rows.len(), "rows selected");
        Ok(())
    }

    /// Selects the given displayed cells.
    ///
    /// Works under any selection behavior. The first cell becomes current and
    /// the anchor; the rest extend the selection unless the mode allows only
    /// one. With row behavior each cell stands for its whole row. Cells outside
    /// the model are skipped.
    pub fn set_selected_indices(&self, indices: &[ModelIndex]) -> Result<()> {
        let view = self.view_model().ok_or(Error::NoModel)?;
        let indices: Vec<ModelIndex> = indices.iter().copied().filter(|index| view.contains(index)).collect();

        let Some((&first, rest)) = indices.split_first() else {
            return Ok(());
        };
        let columns = view.column_count();
        let whole_rows = self.selection.selection_behavior() == SelectionBehavior::SelectRows;
        let apply = |cells: &[ModelIndex], flags: SelectionFlags| {
            if whole_rows {
                let rows: Vec<usize> = cells.iter().map(ModelIndex::row).collect();
                self.selection.select_rows(&rows, columns, flags);
            } else {
                self.selection.select_indices(cells, flags);
            }
        };

        self.selection
            .set_current_index(first, SelectionFlags::CURRENT.with_anchor());
        apply(&[first], SelectionFlags::CLEAR_AND_SELECT);
        let single = matches!(
            self.selection.selection_mode(),
            SelectionMode::SingleSelection | SelectionMode::NoSelection
        );
        if !rest.is_empty() && !single {
            apply(rest, SelectionFlags::SELECT);
        }
        tracing::debug!(target: targets::SELECTION, count = indices.len(), "cells selected");
        Ok(())
    }

    /// Returns the selected columns, ascending.
    ///
    /// Requires column selection behavior.
    pub fn selected_columns(&self) -> Result<Vec<usize>> {
        self.require_behavior(SelectionBehavior::SelectColumns)?;
        Ok(self.selection.selected_columns())
    }

    fn require_behavior(&self, required: SelectionBehavior) -> Result<()> {
        let actual = self.selection.selection_behavior();
        if actual == required {
            Ok(())
        } else {
            Err(Error::SelectionBehavior { required, actual })
        }
    }

    fn stash_selection(&self) {
        if self.stash.lock().is_some() {
            return;
        }
        let Some(view) = self.view_model() else {
            return;
        };

        let mut rows: Vec<(usize, Vec<usize>)> = Vec::new();
        for index in self.selection.selected_indices() {
            match rows.iter_mut().find(|(row, _)| *row == index.row()) {
                Some((_, columns)) => columns.push(index.column()),
                None => rows.push((index.row(), vec![index.column()])),
            }
        }
        let rows = rows
            .into_iter()
            .filter_map(|(row, columns)| view.row_identity(row).map(|identity| (identity, columns)))
            .collect();

        let current = self.selection.current_index();
        let current = current
            .is_valid()
            .then(|| view.row_identity(current.row()))
            .flatten()
            .map(|identity| (identity, current.column()));

        *self.stash.lock() = Some(SelectionStash { rows, current });
    }

    fn restore_selection(&self) {
        let Some(stash) = self.stash.lock().take() else {
            return;
        };
        let Some(view) = self.view_model() else {
            return;
        };

        let mut indices = Vec::new();
        let mut lost = 0usize;
        for (identity, columns) in &stash.rows {
            match view.find_row(identity) {
                Some(row) => indices.extend(columns.iter().map(|&column| ModelIndex::new(row, column))),
                None => lost += 1,
            }
        }
        if indices.is_empty() {
            self.selection.clear_selection();
        } else {
            self.selection
                .select_indices(&indices, SelectionFlags::CLEAR_AND_SELECT);
        }

        let current = stash
            .current
            .and_then(|(identity, column)| view.find_row(&identity).map(|row| ModelIndex::new(row, column)))
            .unwrap_or_else(ModelIndex::invalid);
        self.selection.set_current_index(current, SelectionFlags::CURRENT);

        tracing::trace!(
            target: targets::SELECTION,
            kept = stash.rows.len() - lost,
            lost,
            "selection re-mapped by row identity"
        );
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Attaches an edit delegate to a column.
    ///
    /// Fails with [`Error::NoModel`] when no model is bound.
    pub fn set_delegate<D>(&self, column: usize, delegate: D) -> Result<()>
    where
        D: EditDelegate + 'static,
    {
        if self.bound.read().is_none() {
            return Err(Error::NoModel);
        }
        self.delegates.write().insert(column, Arc::new(delegate));
        Ok(())
    }

    /// Removes a column's delegate. Returns `true` if one was attached.
    pub fn clear_delegate(&self, column: usize) -> bool {
        self.delegates.write().remove(&column).is_some()
    }

    /// Returns the delegate for a column, [`TextDelegate`] if none is attached.
    pub fn delegate(&self, column: usize) -> Arc<dyn EditDelegate> {
        self.delegates
            .read()
            .get(&column)
            .cloned()
            .unwrap_or_else(|| Arc::new(TextDelegate))
    }

    /// Opens an edit at a displayed coordinate.
    pub fn begin_edit(&self, index: ModelIndex) -> Result<ActiveEdit> {
        let view = self.view_model().ok_or(Error::NoModel)?;
        let pending = PendingEdit::capture(view.as_ref(), index)?;
        let original = self
            .delegate(index.column())
            .editor_text(&view.data(&index, ItemRole::Edit));
        tracing::debug!(target: targets::EDIT, row = index.row(), column = index.column(), "edit opened");
        Ok(ActiveEdit { pending, original })
    }

    /// Commits editor text for an open edit.
    ///
    /// Text equal to what the editor started with is a no-op. Otherwise the
    /// edit is re-located by row identity if the view changed meanwhile,
    /// parsed by the column's delegate, and stored. A row that disappeared
    /// fails with [`Error::RowNotFound`]; the edit is never applied
    /// elsewhere.
    pub fn commit_edit(&self, edit: &ActiveEdit, text: &str) -> Result<EditOutcome> {
        if text == edit.original {
            tracing::trace!(target: targets::EDIT, "edit text unchanged");
            return Ok(EditOutcome::Unchanged);
        }
        let view = self.view_model().ok_or(Error::NoModel)?;
        let target = edit.pending.resolve(view.as_ref())?;

        let current = view.data(&target, ItemRole::Edit);
        let value = self
            .delegate(target.column())
            .parse(text, &current)
            .map_err(|err| {
                tracing::warn!(target: targets::EDIT, column = target.column(), error = %err, "editor text rejected");
                Error::edit_rejected(target.column(), err.message())
            })?;

        let outcome = view.commit_data(&target, value)?;
        if outcome == EditOutcome::Applied {
            self.edit_committed
                .emit((target, edit.original.clone(), text.to_string()));
        }
        Ok(outcome)
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Enables or disables sorting, re-binding the current model.
    pub fn set_sorting_enabled(&self, enabled: bool) {
        if std::mem::replace(&mut self.config.write().sorting_enabled, enabled) == enabled {
            return;
        }
        if let Some(model) = self.model() {
            self.set_model(model);
        }
    }

    /// Returns `true` if a proxy sorts the displayed rows.
    pub fn is_sorting_enabled(&self) -> bool {
        self.config.read().sorting_enabled
    }

    /// Sorts the displayed rows by a column.
    ///
    /// Returns `false` if sorting is disabled or the column does not exist.
    pub fn sort_by_column(&self, column: usize, order: SortOrder) -> bool {
        let Some(proxy) = self.proxy() else {
            return false;
        };
        if column >= proxy.column_count() {
            return false;
        }
        proxy.sort(column, order);

        let applied = proxy.sort_column().zip(proxy.sort_order());
        let mut header = self.header.write();
        match applied {
            Some((column, order)) => header.set_sort_indicator(column, order),
            None => header.clear_sort_indicator(),
        }
        true
    }

    /// Sorts by a column as a header click would: ascending on a new column,
    /// reversed on the column already sorted.
    pub fn toggle_sort(&self, column: usize) -> bool {
        let order = {
            let header = self.header.read();
            match header.sort_indicator_section() {
                Some(current) if current == column => header.sort_indicator_order().reversed(),
                _ => SortOrder::Ascending,
            }
        };
        self.sort_by_column(column, order)
    }

    // =========================================================================
    // Columns and Header
    // =========================================================================

    /// Runs `f` with read access to the header state.
    pub fn with_header<R>(&self, f: impl FnOnce(&HeaderState) -> R) -> R {
        f(&self.header.read())
    }

    /// Returns a column's width.
    pub fn column_width(&self, column: usize) -> f32 {
        self.header.read().section_size(column)
    }

    /// Sets a column's width, clamped to the minimum width.
    pub fn set_column_width(&self, column: usize, width: f32) {
        self.header.write().set_section_size(column, width);
    }

    /// Returns whether a column is hidden.
    pub fn is_column_hidden(&self, column: usize) -> bool {
        self.header.read().is_section_hidden(column)
    }

    /// Hides or shows a column.
    pub fn set_column_hidden(&self, column: usize, hidden: bool) {
        self.header.write().set_section_hidden(column, hidden);
    }

    /// Returns the hidden columns, ascending.
    pub fn hidden_columns(&self) -> Vec<usize> {
        let header = self.header.read();
        (0..header.section_count())
            .filter(|&column| header.is_section_hidden(column))
            .collect()
    }

    /// Moves a column between visual positions.
    pub fn move_column(&self, from_visual: usize, to_visual: usize) {
        self.header.write().move_section(from_visual, to_visual);
    }

    /// Renames a column of the bound model.
    pub fn set_column_name(&self, column: usize, name: impl Into<String>) -> Result<()> {
        self.model().ok_or(Error::NoModel)?.set_column_name(column, name)
    }

    /// Returns the header text for a column at its current width.
    pub fn header_text(&self, column: usize, measure: &dyn TextMeasure) -> Option<String> {
        let width = self.column_width(column);
        self.model()?.column_display_name(column, width, measure)
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Captures the column layout.
    pub fn capture_layout(&self) -> ColumnLayout {
        ColumnLayout::capture(&self.header.read())
    }

    /// Restores a column layout, skipping fields that no longer fit.
    pub fn restore_layout(&self, layout: &ColumnLayout) -> RestoreReport {
        layout.restore(&mut self.header.write())
    }

    /// Saves the column layout to `store`.
    pub fn save_layout(&self, store: &dyn LayoutStore) -> Result<()> {
        store.save(&self.capture_layout())?;
        Ok(())
    }

    /// Restores the column layout from `store`, if it holds one.
    pub fn load_layout(&self, store: &dyn LayoutStore) -> Result<Option<RestoreReport>> {
        Ok(store.load()?.map(|layout| self.restore_layout(&layout)))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Returns the current configuration.
    pub fn config(&self) -> TableConfig {
        self.config.read().clone()
    }

    /// Applies a configuration.
    ///
    /// Changing `sorting_enabled` re-binds the current model.
    pub fn apply_config(&self, config: TableConfig) {
        self.selection.set_selection_mode(config.selection_mode);
        self.selection
            .set_selection_behavior(config.selection_behavior);
        {
            let mut header = self.header.write();
            header.set_minimum_section_size(config.minimum_column_width);
            header.set_default_section_size(config.default_column_width);
        }
        if let Some(proxy) = self.proxy() {
            proxy.set_dynamic_sort(config.dynamic_sort);
        }

        let sorting = config.sorting_enabled;
        *self.config.write() = TableConfig {
            sorting_enabled: self.is_sorting_enabled(),
            ..config
        };
        self.set_sorting_enabled(sorting);
    }
}
