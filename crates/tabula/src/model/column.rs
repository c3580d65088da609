//! Column definitions.
//!
//! A [`TableColumn`] is the unit of field access for a [`TableModel`]: it
//! decides what a cell shows, whether and how it can be edited, what the
//! proxy sorts on, and how the header names it. The column kinds form a
//! closed set ([`ColumnKind`]) behind one capability surface:
//!
//! | Kind        | `data`                         | `set_data`                          |
//! |-------------|--------------------------------|-------------------------------------|
//! | `Keyed`     | the row's field at `key`       | stores into that field              |
//! | `List`      | the whole row                  | always rejected                     |
//! | `Transform` | `forward(rows, row, key)`      | stores `reverse(rows, row, key, v)` |
//!
//! [`TableModel`]: super::TableModel

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use unicode_segmentation::UnicodeSegmentation;

use super::role::{ItemData, TextAlignment};
use super::row::{FieldKey, Row, RowRef};
use crate::error::TransformError;

/// Width applied to a column the first time a view asks for its size hint.
pub const DEFAULT_COLUMN_WIDTH: f32 = 100.0;

/// Padding placed on each side of a header name before it is measured.
const NAME_PADDING: &str = "   ";

/// Computes a displayed value: `(rows, row, key) -> value`.
pub type ForwardTransform = Arc<dyn Fn(&[RowRef], usize, Option<&FieldKey>) -> ItemData + Send + Sync>;

/// Computes the value to store for an edit: `(rows, row, key, new) -> stored`.
pub type ReverseTransform = Arc<
    dyn Fn(&[RowRef], usize, Option<&FieldKey>, &ItemData) -> Result<ItemData, TransformError>
        + Send
        + Sync,
>;

/// Computes the value the proxy sorts on: `(rows, row) -> value`.
pub type SortTransform = Arc<dyn Fn(&[RowRef], usize) -> ItemData + Send + Sync>;

/// Measures the rendered width of header text.
///
/// Decouples short-name selection from any particular font or painter.
pub trait TextMeasure: Send + Sync {
    /// Returns the width `text` occupies when rendered.
    fn text_width(&self, text: &str) -> f32;
}

/// Measures text as a fixed advance per grapheme cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphemeMeasure {
    /// Advance of one grapheme cluster.
    pub advance: f32,
}

impl Default for GraphemeMeasure {
    fn default() -> Self {
        Self { advance: 7.0 }
    }
}

impl TextMeasure for GraphemeMeasure {
    fn text_width(&self, text: &str) -> f32 {
        text.graphemes(true).count() as f32 * self.advance
    }
}

/// The closed set of column kinds.
#[derive(Clone)]
pub enum ColumnKind {
    /// Reads and writes the row's field at `key`.
    Keyed { key: FieldKey },
    /// Shows the whole row; not editable.
    List,
    /// Computed column; editable iff `reverse` is present.
    Transform {
        key: Option<FieldKey>,
        forward: ForwardTransform,
        reverse: Option<ReverseTransform>,
    },
}

impl fmt::Debug for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Keyed { key } => f.debug_struct("Keyed").field("key", key).finish(),
            ColumnKind::List => f.write_str("List"),
            ColumnKind::Transform { key, reverse, .. } => f
                .debug_struct("Transform")
                .field("key", key)
                .field("reversible", &reverse.is_some())
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnLabels {
    name: String,
    short_name: Option<String>,
    display_name: Option<String>,
}

impl ColumnLabels {
    fn header_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A column of a [`TableModel`](super::TableModel).
///
/// # Example
///
/// ```
/// use tabula::model::{FieldKey, ItemData, Row, RowRef, TableColumn};
///
/// let size = TableColumn::transform("Size", Some(FieldKey::from("bytes")), |rows, row, key| {
///     let bytes = key
///         .and_then(|key| rows[row].field(key))
///         .and_then(|value| value.as_int())
///         .unwrap_or(0);
///     ItemData::from(format!("{} KB", bytes / 1024))
/// })
/// .with_sort_transform(|rows, row| rows[row].field(&"bytes".into()).unwrap_or_default());
///
/// let rows = vec![RowRef::new(Row::record([("bytes", 4096)]))];
/// assert_eq!(size.data(&rows, 0).as_string(), Some("4 KB"));
/// assert_eq!(size.sort_value(&rows, 0).as_int(), Some(4096));
/// assert!(!size.is_editable());
/// ```
pub struct TableColumn {
    kind: ColumnKind,
    labels: RwLock<ColumnLabels>,
    editable: bool,
    decoration_key: Option<FieldKey>,
    alignment: TextAlignment,
    sort_transform: Option<SortTransform>,
    default_width: f32,
    width_initialized: AtomicBool,
    /// Measured width of the padded header name, keyed on that name.
    name_width: Mutex<Option<(String, f32)>>,
}

impl TableColumn {
    fn with_kind(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            kind,
            labels: RwLock::new(ColumnLabels {
                name: name.into(),
                short_name: None,
                display_name: None,
            }),
            editable: false,
            decoration_key: None,
            alignment: TextAlignment::left(),
            sort_transform: None,
            default_width: DEFAULT_COLUMN_WIDTH,
            width_initialized: AtomicBool::new(false),
            name_width: Mutex::new(None),
        }
    }

    /// Creates a column bound to the row field at `key`.
    pub fn keyed(name: impl Into<String>, key: impl Into<FieldKey>) -> Self {
        Self::with_kind(name, ColumnKind::Keyed { key: key.into() })
    }

    /// Creates a column showing the whole row.
    pub fn list(name: impl Into<String>) -> Self {
        Self::with_kind(name, ColumnKind::List)
    }

    /// Creates a computed column.
    pub fn transform<F>(name: impl Into<String>, key: Option<FieldKey>, forward: F) -> Self
    where
        F: Fn(&[RowRef], usize, Option<&FieldKey>) -> ItemData + Send + Sync + 'static,
    {
        Self::with_kind(
            name,
            ColumnKind::Transform {
                key,
                forward: Arc::new(forward),
                reverse: None,
            },
        )
    }

    /// Makes a transform column editable through a reverse transform.
    ///
    /// Has no effect on other kinds.
    pub fn with_reverse<F>(mut self, reverse: F) -> Self
    where
        F: Fn(&[RowRef], usize, Option<&FieldKey>, &ItemData) -> Result<ItemData, TransformError>
            + Send
            + Sync
            + 'static,
    {
        if let ColumnKind::Transform { reverse: slot, .. } = &mut self.kind {
            *slot = Some(Arc::new(reverse));
        }
        self
    }

    /// Sets whether a keyed column accepts edits.
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Sets the name shown when the full name does not fit.
    pub fn with_short_name(self, short_name: impl Into<String>) -> Self {
        self.labels.write().short_name = Some(short_name.into());
        self
    }

    /// Overrides the header text without changing the column's name.
    pub fn with_display_name(self, display_name: impl Into<String>) -> Self {
        self.labels.write().display_name = Some(display_name.into());
        self
    }

    /// Sets the field read for the Decoration role.
    pub fn with_decoration_key(mut self, key: impl Into<FieldKey>) -> Self {
        self.decoration_key = Some(key.into());
        self
    }

    /// Sets the text alignment.
    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the value the proxy sorts on.
    pub fn with_sort_transform<F>(mut self, sort: F) -> Self
    where
        F: Fn(&[RowRef], usize) -> ItemData + Send + Sync + 'static,
    {
        self.sort_transform = Some(Arc::new(sort));
        self
    }

    /// Sets the width applied the first time a view sizes this column.
    pub fn with_default_width(mut self, width: f32) -> Self {
        self.default_width = width;
        self
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Returns the column kind.
    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Returns the field key, if the column has one.
    pub fn key(&self) -> Option<&FieldKey> {
        match &self.kind {
            ColumnKind::Keyed { key } => Some(key),
            ColumnKind::List => None,
            ColumnKind::Transform { key, .. } => key.as_ref(),
        }
    }

    /// Returns `true` if the column accepts edits.
    pub fn is_editable(&self) -> bool {
        match &self.kind {
            ColumnKind::Keyed { .. } => self.editable,
            ColumnKind::List => false,
            ColumnKind::Transform { reverse, .. } => reverse.is_some(),
        }
    }

    /// Returns the displayed value of `rows[row]`.
    ///
    /// Missing fields and keys that do not fit the row's shape yield
    /// `ItemData::None`.
    pub fn data(&self, rows: &[RowRef], row: usize) -> ItemData {
        let Some(stored) = rows.get(row) else {
            return ItemData::None;
        };
        match &self.kind {
            ColumnKind::Keyed { key } => stored.field(key).unwrap_or_default(),
            ColumnKind::List => match &*stored.read() {
                Row::Scalar(value) => value.clone(),
                _ => ItemData::Row(stored.clone()),
            },
            ColumnKind::Transform { key, forward, .. } => forward(rows, row, key.as_ref()),
        }
    }

    /// Returns the decoration value of `rows[row]`.
    pub fn decoration(&self, rows: &[RowRef], row: usize) -> ItemData {
        match (&self.decoration_key, rows.get(row)) {
            (Some(key), Some(stored)) => stored.field(key).unwrap_or_default(),
            _ => ItemData::None,
        }
    }

    /// Returns the value `rows[row]` sorts on.
    pub fn sort_value(&self, rows: &[RowRef], row: usize) -> ItemData {
        match &self.sort_transform {
            Some(sort) if row < rows.len() => sort(rows, row),
            _ => self.data(rows, row),
        }
    }

    /// Returns the text alignment.
    pub fn text_alignment(&self) -> TextAlignment {
        self.alignment
    }

    /// Stores `value` into `rows[row]`.
    ///
    /// The row is either fully updated or untouched; on failure the error
    /// carries the reason the column refused the value.
    pub fn set_data(&self, rows: &[RowRef], row: usize, value: &ItemData) -> Result<(), TransformError> {
        let stored = rows
            .get(row)
            .ok_or_else(|| TransformError::new(format!("row {row} out of range")))?;
        match &self.kind {
            ColumnKind::Keyed { key } => {
                if !self.editable {
                    return Err(TransformError::new("column is read-only"));
                }
                if stored.write().set_field(key, value.clone()) {
                    Ok(())
                } else {
                    Err(TransformError::new(format!("row has no field '{key}'")))
                }
            }
            ColumnKind::List => Err(TransformError::new("list columns are read-only")),
            ColumnKind::Transform { key, reverse, .. } => {
                let reverse = reverse
                    .as_ref()
                    .ok_or_else(|| TransformError::new("column has no reverse transform"))?;
                let key = key
                    .as_ref()
                    .ok_or_else(|| TransformError::new("column has no field to store into"))?;
                let converted = reverse(rows, row, Some(key), value)?;
                if stored.write().set_field(key, converted) {
                    Ok(())
                } else {
                    Err(TransformError::new(format!("row has no field '{key}'")))
                }
            }
        }
    }

    // =========================================================================
    // Naming
    // =========================================================================

    /// Returns the column's name.
    pub fn name(&self) -> String {
        self.labels.read().name.clone()
    }

    /// Renames the column. The measured width is recomputed on next use.
    pub fn set_name(&self, name: impl Into<String>) {
        self.labels.write().name = name.into();
    }

    /// Returns the short name, if any.
    pub fn short_name(&self) -> Option<String> {
        self.labels.read().short_name.clone()
    }

    /// Sets or clears the short name.
    pub fn set_short_name(&self, short_name: Option<String>) {
        self.labels.write().short_name = short_name;
    }

    /// Sets or clears the header text override.
    pub fn set_display_name(&self, display_name: Option<String>) {
        self.labels.write().display_name = display_name;
    }

    /// Returns the header text for a section `available_width` wide.
    ///
    /// The short name is used when one exists and the padded full name is
    /// wider than a known (non-zero) available width.
    pub fn header_text(&self, available_width: f32, measure: &dyn TextMeasure) -> String {
        let labels = self.labels.read().clone();
        let full = labels.header_name();
        if let Some(short) = &labels.short_name
            && available_width > 0.0
            && available_width < self.measured_name_width(full, measure)
        {
            return short.clone();
        }
        full.to_string()
    }

    fn measured_name_width(&self, name: &str, measure: &dyn TextMeasure) -> f32 {
        let mut cache = self.name_width.lock();
        if let Some((cached_name, width)) = cache.as_ref()
            && cached_name == name
        {
            return *width;
        }
        let width = measure.text_width(&format!("{NAME_PADDING}{name}{NAME_PADDING}"));
        *cache = Some((name.to_string(), width));
        width
    }

    // =========================================================================
    // Sizing
    // =========================================================================

    /// Returns the configured default width.
    pub fn default_width(&self) -> f32 {
        self.default_width
    }

    /// Returns the default width the first time it is called, `None` after.
    ///
    /// Views apply the returned width once, so later user resizes are never
    /// overwritten by the default.
    pub fn claim_initial_width(&self) -> Option<f32> {
        if self.width_initialized.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(self.default_width)
        }
    }

    /// Returns `true` once the default width has been handed out.
    pub fn is_width_initialized(&self) -> bool {
        self.width_initialized.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TableColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableColumn")
            .field("name", &self.labels.read().name)
            .field("kind", &self.kind)
            .field("editable", &self.is_editable())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn rows(values: Vec<Row>) -> Vec<RowRef> {
        values.into_iter().map(RowRef::new).collect()
    }

    struct CountingMeasure {
        calls: AtomicUsize,
    }

    impl TextMeasure for CountingMeasure {
        fn text_width(&self, text: &str) -> f32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            text.chars().count() as f32 * 10.0
        }
    }

    #[test]
    fn test_keyed_column_reads_field() {
        let column = TableColumn::keyed("Name", "n");
        let data = rows(vec![Row::record([("n", "a")]), Row::record([("other", 1)])]);

        assert_eq!(column.data(&data, 0), ItemData::from("a"));
        assert!(column.data(&data, 1).is_none());
        assert!(column.data(&data, 5).is_none());
    }

    #[test]
    fn test_keyed_column_on_sequence_rows() {
        let column = TableColumn::keyed("Dir", 0usize).with_editable(true);
        let data = rows(vec![Row::sequence(["/tmp", "a.txt"])]);
        assert_eq!(column.data(&data, 0), ItemData::from("/tmp"));

        column.set_data(&data, 0, &ItemData::from("/var")).unwrap();
        assert_eq!(data[0].snapshot(), Row::sequence(["/var", "a.txt"]));
    }

    #[test]
    fn test_keyed_column_editability() {
        let data = rows(vec![Row::record([("n", "a")])]);

        let read_only = TableColumn::keyed("Name", "n");
        assert!(!read_only.is_editable());
        assert!(read_only.set_data(&data, 0, &ItemData::from("b")).is_err());
        assert_eq!(data[0].field(&"n".into()), Some(ItemData::from("a")));

        let editable = TableColumn::keyed("Name", "n").with_editable(true);
        assert!(editable.is_editable());
        editable.set_data(&data, 0, &ItemData::from("b")).unwrap();
        assert_eq!(data[0].field(&"n".into()), Some(ItemData::from("b")));
    }

    #[test]
    fn test_list_column() {
        let column = TableColumn::list("Item");
        let data = rows(vec![Row::scalar("alpha"), Row::record([("n", 1)])]);

        assert_eq!(column.data(&data, 0), ItemData::from("alpha"));
        let whole = column.data(&data, 1);
        assert!(whole.as_row().is_some_and(|row| row.same_row(&data[1])));
        assert!(!column.is_editable());
        assert!(column.set_data(&data, 0, &ItemData::from("beta")).is_err());
        assert!(column.key().is_none());
    }

    #[test]
    fn test_transform_column_without_reverse_is_read_only() {
        let column = TableColumn::transform("Twice", Some("n".into()), |rows, row, key| {
            let n = key.and_then(|k| rows[row].field(k)).and_then(|v| v.as_int()).unwrap_or(0);
            ItemData::Int(n * 2)
        });
        let data = rows(vec![Row::record([("n", 21)])]);

        assert_eq!(column.data(&data, 0), ItemData::Int(42));
        assert!(!column.is_editable());
        assert!(column.set_data(&data, 0, &ItemData::Int(1)).is_err());
    }

    #[test]
    fn test_transform_reverse_stores_converted_value() {
        let column = TableColumn::transform("Tags", Some("tags".into()), |rows, row, key| {
            key.and_then(|k| rows[row].field(k)).unwrap_or_default()
        })
        .with_reverse(|rows, row, key, new| {
            let old = key.and_then(|k| rows[row].field(k)).unwrap_or_default();
            Ok(ItemData::from(format!("{old}+{new}")))
        });
        let data = rows(vec![Row::record([("tags", "a")])]);

        assert!(column.is_editable());
        column.set_data(&data, 0, &ItemData::from("b")).unwrap();
        assert_eq!(data[0].field(&"tags".into()), Some(ItemData::from("a+b")));
    }

    #[test]
    fn test_failing_reverse_leaves_row_untouched() {
        let column = TableColumn::transform("Count", Some("n".into()), |rows, row, key| {
            key.and_then(|k| rows[row].field(k)).unwrap_or_default()
        })
        .with_reverse(|_, _, _, new| {
            new.as_string()
                .and_then(|s| s.parse::<i64>().ok())
                .map(ItemData::Int)
                .ok_or_else(|| TransformError::new("not a number"))
        });
        let data = rows(vec![Row::record([("n", 1)])]);

        let err = column.set_data(&data, 0, &ItemData::from("many")).unwrap_err();
        assert_eq!(err.message(), "not a number");
        assert_eq!(data[0].field(&"n".into()), Some(ItemData::Int(1)));

        column.set_data(&data, 0, &ItemData::from("7")).unwrap();
        assert_eq!(data[0].field(&"n".into()), Some(ItemData::Int(7)));
    }

    #[test]
    fn test_sort_value_defaults_to_display() {
        let data = rows(vec![Row::record([("n", "b")])]);
        let plain = TableColumn::keyed("N", "n");
        assert_eq!(plain.sort_value(&data, 0), ItemData::from("b"));

        let custom = TableColumn::keyed("N", "n").with_sort_transform(|_, row| ItemData::from(row));
        assert_eq!(custom.sort_value(&data, 0), ItemData::Int(0));
    }

    #[test]
    fn test_decoration_key() {
        let column = TableColumn::keyed("Name", "name").with_decoration_key("icon");
        let data = rows(vec![Row::record([("name", "a"), ("icon", "folder")])]);
        assert_eq!(column.decoration(&data, 0), ItemData::from("folder"));
        assert!(TableColumn::keyed("Name", "name").decoration(&data, 0).is_none());
    }

    #[test]
    fn test_default_alignment_is_left_center() {
        assert_eq!(TableColumn::list("x").text_alignment(), TextAlignment::left());
    }

    #[test]
    fn test_initial_width_claimed_once() {
        let column = TableColumn::keyed("Name", "n").with_default_width(140.0);
        assert!(!column.is_width_initialized());
        assert_eq!(column.claim_initial_width(), Some(140.0));
        assert_eq!(column.claim_initial_width(), None);
        assert!(column.is_width_initialized());
    }

    #[test]
    fn test_short_name_selection() {
        let measure = GraphemeMeasure { advance: 10.0 };
        let column = TableColumn::keyed("Modified", "mtime").with_short_name("Mod");
        // "   Modified   " is 14 graphemes wide.
        assert_eq!(column.header_text(200.0, &measure), "Modified");
        assert_eq!(column.header_text(100.0, &measure), "Mod");
        assert_eq!(column.header_text(0.0, &measure), "Modified");

        let no_short = TableColumn::keyed("Modified", "mtime");
        assert_eq!(no_short.header_text(10.0, &measure), "Modified");
    }

    #[test]
    fn test_display_name_override() {
        let measure = GraphemeMeasure::default();
        let column = TableColumn::keyed("size", "size").with_display_name("Size (KB)");
        assert_eq!(column.header_text(0.0, &measure), "Size (KB)");
        assert_eq!(column.name(), "size");
    }

    #[test]
    fn test_name_width_cached_until_rename() {
        let measure = CountingMeasure {
            calls: AtomicUsize::new(0),
        };
        let column = TableColumn::keyed("Name", "n").with_short_name("N");

        column.header_text(50.0, &measure);
        column.header_text(60.0, &measure);
        assert_eq!(measure.calls.load(Ordering::SeqCst), 1);

        column.set_name("Filename");
        column.header_text(50.0, &measure);
        assert_eq!(measure.calls.load(Ordering::SeqCst), 2);
    }
}
