//! Row values and row identity.
//!
//! A [`Row`] is the opaque value a collaborator hands to the model. It is
//! either key-addressable ([`Row::Record`]), position-addressable
//! ([`Row::Sequence`]) or a single value ([`Row::Scalar`], for whole-row
//! columns). Columns read fields out of it with a [`FieldKey`].
//!
//! The model stores every row behind a [`RowRef`]. The reference is the row's
//! identity: edits mutate the row in place, so the same `RowRef` keeps
//! pointing at the same logical row across edits, sorting and insertions
//! around it. [`RowRef::same_row`] compares identities, not values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::role::ItemData;

/// Selects a field of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// A named field of a record row.
    Name(String),
    /// A position in a sequence row.
    Position(usize),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => f.write_str(name),
            FieldKey::Position(position) => write!(f, "{position}"),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        FieldKey::Name(name)
    }
}

impl From<usize> for FieldKey {
    fn from(position: usize) -> Self {
        FieldKey::Position(position)
    }
}

/// A row value supplied by a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Mapping-like row addressed by field name.
    Record(BTreeMap<String, ItemData>),
    /// Sequence-like row addressed by position.
    Sequence(Vec<ItemData>),
    /// A single value, shown whole by list columns.
    Scalar(ItemData),
}

impl Row {
    /// Creates a record row from `(name, value)` pairs.
    ///
    /// ```
    /// use tabula::model::{FieldKey, Row};
    ///
    /// let row = Row::record([("name", "notes.txt"), ("kind", "file")]);
    /// assert_eq!(
    ///     row.field(&FieldKey::from("name")).and_then(|v| v.as_string()),
    ///     Some("notes.txt")
    /// );
    /// ```
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<ItemData>,
        I: IntoIterator<Item = (K, V)>,
    {
        Row::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Creates a sequence row.
    pub fn sequence<V, I>(values: I) -> Self
    where
        V: Into<ItemData>,
        I: IntoIterator<Item = V>,
    {
        Row::Sequence(values.into_iter().map(Into::into).collect())
    }

    /// Creates a scalar row.
    pub fn scalar(value: impl Into<ItemData>) -> Self {
        Row::Scalar(value.into())
    }

    /// Returns the field selected by `key`.
    ///
    /// Keys that do not fit the row's shape, missing names and out-of-range
    /// positions all yield `None`.
    pub fn field(&self, key: &FieldKey) -> Option<&ItemData> {
        match (self, key) {
            (Row::Record(fields), FieldKey::Name(name)) => fields.get(name),
            (Row::Sequence(values), FieldKey::Position(position)) => values.get(*position),
            _ => None,
        }
    }

    /// Stores `value` in the field selected by `key`.
    ///
    /// Record rows accept any name (a missing field is created). Sequence rows
    /// accept only in-range positions. Returns `false` when the value cannot
    /// be stored; the row is then unchanged.
    pub fn set_field(&mut self, key: &FieldKey, value: ItemData) -> bool {
        match (self, key) {
            (Row::Record(fields), FieldKey::Name(name)) => {
                fields.insert(name.clone(), value);
                true
            }
            (Row::Sequence(values), FieldKey::Position(position)) => match values.get_mut(*position) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Scalar(value) => write!(f, "{value}"),
            Row::Sequence(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Row::Record(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<ItemData> for Row {
    fn from(value: ItemData) -> Self {
        Row::Scalar(value)
    }
}

/// Shared reference to a stored row; the row's identity.
///
/// Cloning a `RowRef` clones the reference, not the row.
#[derive(Clone)]
pub struct RowRef(Arc<RwLock<Row>>);

impl RowRef {
    /// Wraps a row in a fresh identity.
    pub fn new(row: Row) -> Self {
        RowRef(Arc::new(RwLock::new(row)))
    }

    /// Returns `true` if both references point at the same stored row.
    #[inline]
    pub fn same_row(&self, other: &RowRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Locks the row for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Row> {
        self.0.read()
    }

    /// Locks the row for writing.
    ///
    /// Mutating through this bypasses the model's notifications; callers
    /// that do so should follow up with `replace_row` or `force_repaint`.
    pub fn write(&self) -> RwLockWriteGuard<'_, Row> {
        self.0.write()
    }

    /// Returns a copy of the field selected by `key`.
    pub fn field(&self, key: &FieldKey) -> Option<ItemData> {
        self.0.read().field(key).cloned()
    }

    /// Returns a copy of the row's current value.
    pub fn snapshot(&self) -> Row {
        self.0.read().clone()
    }
}

impl From<Row> for RowRef {
    fn from(row: Row) -> Self {
        RowRef::new(row)
    }
}

impl fmt::Debug for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RowRef").field(&*self.0.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_access() {
        let row = Row::record([("n", "a")]);
        assert_eq!(row.field(&"n".into()), Some(&ItemData::from("a")));
        assert_eq!(row.field(&"missing".into()), None);
        assert_eq!(row.field(&FieldKey::Position(0)), None);
    }

    #[test]
    fn test_sequence_field_access() {
        let mut row = Row::sequence(["dir", "name"]);
        assert_eq!(row.field(&1.into()), Some(&ItemData::from("name")));
        assert_eq!(row.field(&5.into()), None);

        assert!(row.set_field(&0.into(), ItemData::from("other")));
        assert!(!row.set_field(&2.into(), ItemData::from("x")));
        assert!(!row.set_field(&"name".into(), ItemData::from("x")));
        assert_eq!(row, Row::sequence(["other", "name"]));
    }

    #[test]
    fn test_scalar_has_no_fields() {
        let mut row = Row::scalar(42);
        assert_eq!(row.field(&"x".into()), None);
        assert!(!row.set_field(&0.into(), ItemData::Int(1)));
    }

    #[test]
    fn test_record_set_creates_field() {
        let mut row = Row::record::<&str, &str, _>([]);
        assert!(row.set_field(&"size".into(), ItemData::Int(10)));
        assert_eq!(row.field(&"size".into()), Some(&ItemData::Int(10)));
    }

    #[test]
    fn test_identity_survives_mutation() {
        let a = RowRef::new(Row::record([("n", "a")]));
        let alias = a.clone();
        let b = RowRef::new(Row::record([("n", "a")]));

        assert!(a.same_row(&alias));
        assert!(!a.same_row(&b));

        a.write().set_field(&"n".into(), ItemData::from("z"));
        assert!(a.same_row(&alias));
        assert_eq!(alias.field(&"n".into()), Some(ItemData::from("z")));
    }

    #[test]
    fn test_row_display() {
        assert_eq!(Row::scalar("x").to_string(), "x");
        assert_eq!(Row::sequence([1, 2]).to_string(), "[1, 2]");
        assert_eq!(Row::record([("b", 2), ("a", 1)]).to_string(), "{a: 1, b: 2}");
    }
}
