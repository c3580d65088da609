//! Proxy model for filtering and sorting.
//!
//! `ProxyModel` wraps a source model and presents its rows reordered and
//! filtered, without copying or mutating source storage. Sorting always reads
//! the [`ItemRole::SortValue`] role and is stable: rows with equal sort values
//! keep their source order.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tabula_core::logging::targets;
use tabula_core::{ConnectionGuard, Signal};

use super::index::ModelIndex;
use super::role::{ItemData, ItemRole};
use super::row::RowRef;
use super::traits::{EditOutcome, ItemFlags, ItemModel, ModelSignals, Orientation};
use crate::error::{Error, Result};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    /// Returns the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Type alias for a filter function.
///
/// Receives the source model and a source row; returns `true` to show it.
pub type FilterFn<S> = Arc<dyn Fn(&S, usize) -> bool + Send + Sync>;

/// Type alias for a per-column sort policy.
///
/// Receives the requested column and order; returns the order to apply, or
/// `None` to leave the column unsorted.
pub type SortPolicyFn = Arc<dyn Fn(usize, SortOrder) -> Option<SortOrder> + Send + Sync>;

/// Internal row mapping from proxy to source.
struct RowMapping {
    /// Mapping from proxy row index to source row index.
    proxy_to_source: Vec<usize>,
    /// Mapping from source row index to proxy row index (None if filtered out).
    source_to_proxy: Vec<Option<usize>>,
}

impl RowMapping {
    fn new() -> Self {
        Self {
            proxy_to_source: Vec::new(),
            source_to_proxy: Vec::new(),
        }
    }

    fn from_visible(visible: Vec<usize>, source_count: usize) -> Self {
        let mut source_to_proxy = vec![None; source_count];
        for (proxy_row, &source_row) in visible.iter().enumerate() {
            source_to_proxy[source_row] = Some(proxy_row);
        }
        Self {
            proxy_to_source: visible,
            source_to_proxy,
        }
    }

    fn proxy_row_count(&self) -> usize {
        self.proxy_to_source.len()
    }

    fn map_to_source(&self, proxy_row: usize) -> Option<usize> {
        self.proxy_to_source.get(proxy_row).copied()
    }

    fn map_from_source(&self, source_row: usize) -> Option<usize> {
        self.source_to_proxy.get(source_row).and_then(|&x| x)
    }
}

/// Guards for the proxy's subscriptions to its source.
///
/// Dropping the proxy drops these, which disconnects it from the source.
struct SourceConnections {
    _ranges: Vec<ConnectionGuard<(usize, usize)>>,
    _events: Vec<ConnectionGuard<()>>,
    _data: ConnectionGuard<(ModelIndex, ModelIndex, Vec<ItemRole>)>,
    _headers: ConnectionGuard<(Orientation, usize, usize)>,
}

/// A proxy model that filters and sorts a source model.
///
/// The proxy listens to its source and keeps its mapping current: structural
/// source changes are re-announced as layout changes, resets are forwarded,
/// and content changes are forwarded at proxy coordinates (re-sorting first
/// when the sort column changed and dynamic sorting is on).
///
/// # Example
///
/// ```
/// use tabula::model::{ItemModel, ProxyModel, Row, SortOrder, TableModel};
/// use std::sync::Arc;
///
/// let model = Arc::new(TableModel::new());
/// model.add_column("n", "Name", false);
/// model.append_rows(["b", "a", "c"].map(|n| Row::record([("n", n)])));
///
/// let proxy = ProxyModel::new(model.clone());
/// proxy.sort(0, SortOrder::Ascending);
///
/// let names: Vec<String> = (0..proxy.row_count())
///     .map(|row| proxy.display_text(&proxy.index(row, 0)))
///     .collect();
/// assert_eq!(names, ["a", "b", "c"]);
/// ```
pub struct ProxyModel<S: ItemModel> {
    source: Arc<S>,
    /// Filter function with interior mutability for dynamic updates.
    filter: RwLock<Option<FilterFn<S>>>,
    sort_policy: RwLock<Option<SortPolicyFn>>,
    /// Applied sort column and order.
    sort: RwLock<Option<(usize, SortOrder)>>,
    dynamic_sort: AtomicBool,
    mapping: RwLock<RowMapping>,
    generation: AtomicU64,
    signals: ModelSignals,
    _connections: SourceConnections,
}

impl<S: ItemModel + 'static> ProxyModel<S> {
    /// Creates a new proxy model wrapping the given source.
    pub fn new(source: Arc<S>) -> Arc<Self> {
        Self::from_parts(source, None, None)
    }

    fn from_parts(source: Arc<S>, filter: Option<FilterFn<S>>, sort_policy: Option<SortPolicyFn>) -> Arc<Self> {
        let proxy = Arc::new_cyclic(|weak: &Weak<Self>| {
            let connections = Self::connect_source(source.signals(), weak);
            Self {
                source,
                filter: RwLock::new(filter),
                sort_policy: RwLock::new(sort_policy),
                sort: RwLock::new(None),
                dynamic_sort: AtomicBool::new(true),
                mapping: RwLock::new(RowMapping::new()),
                generation: AtomicU64::new(0),
                signals: ModelSignals::new(),
                _connections: connections,
            }
        });
        proxy.rebuild_mapping();
        proxy
    }

    fn subscribe<A, F>(signal: &Signal<A>, weak: &Weak<Self>, handler: F) -> ConnectionGuard<A>
    where
        A: Clone + Send + 'static,
        F: Fn(&Self, &A) + Send + Sync + 'static,
    {
        let weak = weak.clone();
        signal.connect_scoped(move |args| {
            if let Some(proxy) = weak.upgrade() {
                handler(&proxy, args);
            }
        })
    }

    fn connect_source(source: &ModelSignals, weak: &Weak<Self>) -> SourceConnections {
        let about_to_change = |proxy: &Self, _: &(usize, usize)| {
            proxy.signals.layout_about_to_change.emit(());
        };
        let changed = |proxy: &Self, _: &(usize, usize)| {
            proxy.rebuild_mapping();
            proxy.signals.layout_changed.emit(());
        };

        SourceConnections {
            _ranges: vec![
                Self::subscribe(&source.rows_about_to_be_inserted, weak, about_to_change),
                Self::subscribe(&source.rows_inserted, weak, changed),
                Self::subscribe(&source.rows_about_to_be_removed, weak, about_to_change),
                Self::subscribe(&source.rows_removed, weak, changed),
                Self::subscribe(&source.columns_about_to_be_inserted, weak, |proxy, &range| {
                    proxy.signals.columns_about_to_be_inserted.emit(range);
                }),
                Self::subscribe(&source.columns_inserted, weak, |proxy, &range| {
                    proxy.signals.columns_inserted.emit(range);
                }),
            ],
            _events: vec![
                Self::subscribe(&source.layout_about_to_change, weak, |proxy, _| {
                    proxy.signals.layout_about_to_change.emit(());
                }),
                Self::subscribe(&source.layout_changed, weak, |proxy, _| {
                    proxy.rebuild_mapping();
                    proxy.signals.layout_changed.emit(());
                }),
                Self::subscribe(&source.model_about_to_reset, weak, |proxy, _| {
                    proxy.signals.model_about_to_reset.emit(());
                }),
                Self::subscribe(&source.model_reset, weak, |proxy, _| {
                    proxy.rebuild_mapping();
                    proxy.signals.model_reset.emit(());
                }),
            ],
            _data: Self::subscribe(&source.data_changed, weak, |proxy, (top_left, bottom_right, roles)| {
                proxy.source_data_changed(*top_left, *bottom_right, roles);
            }),
            _headers: Self::subscribe(&source.header_data_changed, weak, |proxy, &change| {
                proxy.signals.header_data_changed.emit(change);
            }),
        }
    }

    fn source_data_changed(&self, top_left: ModelIndex, bottom_right: ModelIndex, roles: &[ItemRole]) {
        let sort_column_touched = self
            .sort
            .read()
            .is_some_and(|(column, _)| (top_left.column()..=bottom_right.column()).contains(&column));
        let has_filter = self.filter.read().is_some();
        if self.is_dynamic_sort() && (sort_column_touched || has_filter) {
            tracing::trace!(target: targets::PROXY, "source data changed under sort/filter; re-mapping");
            self.invalidate();
        }

        let (first, last) = {
            let mapping = self.mapping.read();
            let mut rows = (top_left.row()..=bottom_right.row()).filter_map(|row| mapping.map_from_source(row));
            let Some(first) = rows.next() else {
                return;
            };
            rows.fold((first, first), |(lo, hi), row| (lo.min(row), hi.max(row)))
        };
        self.signals.data_changed.emit((
            ModelIndex::new(first, top_left.column()),
            ModelIndex::new(last, bottom_right.column()),
            roles.to_vec(),
        ));
    }

    /// Sets the filter function dynamically.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&S, usize) -> bool + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
        self.invalidate();
    }

    /// Clears the filter, showing all rows from the source model.
    pub fn clear_filter(&self) {
        *self.filter.write() = None;
        self.invalidate();
    }

    /// Sets the per-column sort policy.
    ///
    /// The policy is consulted on the next call to [`sort`](Self::sort).
    pub fn set_sort_policy<F>(&self, policy: F)
    where
        F: Fn(usize, SortOrder) -> Option<SortOrder> + Send + Sync + 'static,
    {
        *self.sort_policy.write() = Some(Arc::new(policy));
    }

    /// Sorts by `column` in `order`, subject to the sort policy.
    ///
    /// A policy that declines the column clears sorting; rows then appear in
    /// source order.
    pub fn sort(&self, column: usize, order: SortOrder) {
        let policy = self.sort_policy.read().clone();
        let applied = match policy {
            Some(policy) => policy(column, order),
            None => Some(order),
        };
        tracing::debug!(target: targets::PROXY, column, ?order, ?applied, "sorting");
        *self.sort.write() = applied.map(|order| (column, order));
        self.invalidate();
    }

    /// Clears sorting.
    pub fn clear_sort(&self) {
        *self.sort.write() = None;
        self.invalidate();
    }

    /// Returns the applied sort column.
    pub fn sort_column(&self) -> Option<usize> {
        self.sort.read().map(|(column, _)| column)
    }

    /// Returns the applied sort order.
    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort.read().map(|(_, order)| order)
    }

    /// Sets whether source content changes re-sort and re-filter.
    pub fn set_dynamic_sort(&self, enabled: bool) {
        self.dynamic_sort.store(enabled, AtomicOrdering::Release);
    }

    /// Returns `true` if source content changes re-sort and re-filter.
    pub fn is_dynamic_sort(&self) -> bool {
        self.dynamic_sort.load(AtomicOrdering::Acquire)
    }

    /// Forces a rebuild of the proxy mapping, announced as a layout change.
    pub fn invalidate(&self) {
        self.signals.emit_layout_changed(|| {
            self.rebuild_mapping();
        });
    }

    /// Returns a reference to the source model.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Maps a proxy index to a source index.
    pub fn map_to_source(&self, proxy_index: &ModelIndex) -> ModelIndex {
        if !proxy_index.is_valid() {
            return ModelIndex::invalid();
        }
        let source_row = match self.mapping.read().map_to_source(proxy_index.row()) {
            Some(r) => r,
            None => return ModelIndex::invalid(),
        };
        self.source.index(source_row, proxy_index.column())
    }

    /// Maps a source index to a proxy index.
    pub fn map_from_source(&self, source_index: &ModelIndex) -> ModelIndex {
        if !source_index.is_valid() {
            return ModelIndex::invalid();
        }
        let proxy_row = match self.mapping.read().map_from_source(source_index.row()) {
            Some(r) => r,
            None => return ModelIndex::invalid(), // Filtered out
        };
        ModelIndex::new(proxy_row, source_index.column())
    }

    /// Rebuilds the internal mapping based on filter and sort.
    ///
    /// User callbacks run without the mapping locked.
    fn rebuild_mapping(&self) {
        let source_count = self.source.row_count();
        let filter = self.filter.read().clone();

        // First, collect rows that pass the filter
        let visible: Vec<usize> = (0..source_count)
            .filter(|&row| filter.as_ref().is_none_or(|filter| filter(&self.source, row)))
            .collect();

        // Then sort on the SortValue role; sort_by is stable.
        let sort = *self.sort.read();
        let visible = match sort {
            Some((column, order)) if column < self.source.column_count() => {
                let mut keyed: Vec<(usize, ItemData)> = visible
                    .into_iter()
                    .map(|row| {
                        let key = self.source.data(&ModelIndex::new(row, column), ItemRole::SortValue);
                        (row, key)
                    })
                    .collect();
                keyed.sort_by(|(_, a), (_, b)| {
                    let cmp = compare_item_data(a, b);
                    match order {
                        SortOrder::Ascending => cmp,
                        SortOrder::Descending => cmp.reverse(),
                    }
                });
                keyed.into_iter().map(|(row, _)| row).collect()
            }
            _ => visible,
        };

        tracing::trace!(
            target: targets::PROXY,
            source_count,
            visible = visible.len(),
            "rebuilt proxy mapping"
        );
        *self.mapping.write() = RowMapping::from_visible(visible, source_count);
        self.generation.fetch_add(1, AtomicOrdering::AcqRel);
    }
}

/// Compares two ItemData values for sorting.
///
/// Numbers compare numerically across `Int` and `Float`, strings compare
/// lexically, and `None` sorts before everything else. Values of unrelated
/// types are ordered by a fixed type rank so the order stays total.
pub fn compare_item_data(a: &ItemData, b: &ItemData) -> Ordering {
    fn rank(data: &ItemData) -> u8 {
        match data {
            ItemData::None => 0,
            ItemData::Bool(_) => 1,
            ItemData::Int(_) | ItemData::Float(_) => 2,
            ItemData::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (ItemData::String(sa), ItemData::String(sb)) => sa.cmp(sb),
        (ItemData::Int(ia), ItemData::Int(ib)) => ia.cmp(ib),
        (ItemData::Bool(ba), ItemData::Bool(bb)) => ba.cmp(bb),
        (ItemData::Int(_) | ItemData::Float(_), ItemData::Int(_) | ItemData::Float(_)) => {
            let (fa, fb) = (a.as_float().unwrap_or_default(), b.as_float().unwrap_or_default());
            fa.total_cmp(&fb)
        }
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal if rank(a) == 4 => a.to_string().cmp(&b.to_string()),
            other => other,
        },
    }
}

impl<S: ItemModel + 'static> ItemModel for ProxyModel<S> {
    fn row_count(&self) -> usize {
        self.mapping.read().proxy_row_count()
    }

    fn column_count(&self) -> usize {
        self.source.column_count()
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        let source_index = self.map_to_source(index);
        self.source.data(&source_index, role)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn commit_data(&self, index: &ModelIndex, value: ItemData) -> Result<EditOutcome> {
        let source_index = self.map_to_source(index);
        if !source_index.is_valid() {
            return Err(Error::InvalidIndex {
                row: index.row(),
                column: index.column(),
            });
        }
        tracing::trace!(
            target: targets::PROXY,
            proxy_row = index.row(),
            source_row = source_index.row(),
            "forwarding edit to source"
        );
        self.source.commit_data(&source_index, value)
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let source_index = self.map_to_source(index);
        if !source_index.is_valid() {
            return ItemFlags::disabled();
        }
        self.source.flags(&source_index)
    }

    fn header_data(&self, section: usize, orientation: Orientation, role: ItemRole) -> ItemData {
        match (orientation, role) {
            (Orientation::Vertical, ItemRole::Display) if section < self.row_count() => {
                ItemData::from(section + 1)
            }
            (Orientation::Vertical, _) => ItemData::None,
            (Orientation::Horizontal, _) => self.source.header_data(section, orientation, role),
        }
    }

    fn layout_generation(&self) -> u64 {
        self.generation.load(AtomicOrdering::Acquire)
    }

    fn find_row(&self, identity: &RowRef) -> Option<usize> {
        let source_row = self.source.find_row(identity)?;
        self.mapping.read().map_from_source(source_row)
    }
}

/// Builder pattern for creating proxy models.
pub struct ProxyModelBuilder<S: ItemModel> {
    source: Arc<S>,
    filter: Option<FilterFn<S>>,
    sort_policy: Option<SortPolicyFn>,
    sort: Option<(usize, SortOrder)>,
    dynamic_sort: bool,
}

impl<S: ItemModel + 'static> ProxyModelBuilder<S> {
    /// Creates a new builder with the given source model.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            filter: None,
            sort_policy: None,
            sort: None,
            dynamic_sort: true,
        }
    }

    /// Adds a filter function.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&S, usize) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(f));
        self
    }

    /// Adds a per-column sort policy.
    pub fn sort_policy<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, SortOrder) -> Option<SortOrder> + Send + Sync + 'static,
    {
        self.sort_policy = Some(Arc::new(f));
        self
    }

    /// Sorts by `column` once built.
    pub fn sort(mut self, column: usize, order: SortOrder) -> Self {
        self.sort = Some((column, order));
        self
    }

    /// Sets whether source content changes re-sort and re-filter.
    pub fn dynamic_sort(mut self, enabled: bool) -> Self {
        self.dynamic_sort = enabled;
        self
    }

    /// Builds the proxy model.
    pub fn build(self) -> Arc<ProxyModel<S>> {
        let proxy = ProxyModel::from_parts(self.source, self.filter, self.sort_policy);
        proxy.set_dynamic_sort(self.dynamic_sort);
        if let Some((column, order)) = self.sort {
            proxy.sort(column, order);
        }
        proxy
    }
}
