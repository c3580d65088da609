//! Integration tests for the table model and its sort/filter proxy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tabula::Error;
use tabula::model::{
    Color, ItemData, ItemModel, ItemRole, ModelIndex, PendingEdit, ProxyModel, ProxyModelBuilder, Row,
    RowRef, SortOrder, TableColumn, TableModel,
};

fn names_model(names: &[&str]) -> Arc<TableModel> {
    let model = Arc::new(TableModel::new());
    model.add_column("n", "Name", true);
    model.append_rows(names.iter().map(|n| Row::record([("n", *n)])));
    model
}

fn column_text<M: ItemModel + ?Sized>(model: &M, column: usize) -> Vec<String> {
    (0..model.row_count())
        .map(|row| model.display_text(&ModelIndex::new(row, column)))
        .collect()
}

#[test]
fn bulk_insert_is_one_notification() {
    let model = TableModel::new();
    model.add_column("v", "Value", false);

    let inserts = Arc::new(Mutex::new(Vec::new()));
    let inserts_clone = inserts.clone();
    model
        .signals()
        .rows_inserted
        .connect(move |&range| inserts_clone.lock().push(range));

    model.append_rows((1..=5).map(|v| Row::record([("v", v)])));

    assert_eq!(model.row_count(), 5);
    assert_eq!(*inserts.lock(), vec![(0, 4)]);
    assert_eq!(column_text(&model, 0), vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn insert_then_remove_restores_rows() {
    let model = names_model(&["a", "b", "c"]);
    let before = model.rows();

    assert!(model.insert_row(1, Row::record([("n", "x")])));
    assert!(model.remove_row(1));

    let after = model.rows();
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(&after) {
        assert!(old.same_row(new));
    }
    assert_eq!(column_text(model.as_ref(), 0), vec!["a", "b", "c"]);
}

#[test]
fn out_of_range_mutations_are_refused_silently() {
    let model = names_model(&["a", "b"]);
    let notified = Arc::new(AtomicUsize::new(0));
    let notified_clone = notified.clone();
    model.signals().rows_removed.connect(move |_| {
        notified_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!model.remove_rows(1, 5));
    assert!(!model.remove_row(2));
    assert!(!model.insert_row(3, Row::record([("n", "z")])));
    assert_eq!(model.row_count(), 2);
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

#[test]
fn reset_reads_back_identically() {
    let model = names_model(&["old"]);
    let rows: Vec<RowRef> = ["x", "y", "z"]
        .into_iter()
        .map(|n| RowRef::new(Row::record([("n", n)])))
        .collect();

    model.reset(rows.clone());

    let read_back: Vec<RowRef> = (0..model.row_count())
        .filter_map(|row| model.data(&ModelIndex::new(row, 0), ItemRole::RowIdentity).into_row())
        .collect();
    assert_eq!(read_back.len(), rows.len());
    for (stored, given) in read_back.iter().zip(&rows) {
        assert!(stored.same_row(given));
    }
}

#[test]
fn transform_reverse_stores_derived_value_once() {
    let model = TableModel::new();
    model.add_table_column(
        TableColumn::transform("KiB", Some("bytes".into()), |rows, row, key| {
            let bytes = key.and_then(|key| rows[row].field(key)).and_then(|v| v.as_int());
            bytes.map(|b| ItemData::Int(b / 1024)).unwrap_or_default()
        })
        .with_reverse(|_, _, _, new| {
            let kib = new
                .to_string()
                .trim()
                .parse::<i64>()
                .map_err(|_| tabula::error::TransformError::new("not a number"))?;
            Ok(ItemData::Int(kib * 1024))
        }),
    );
    model.append_row(Row::record([("bytes", 2048)]));

    let changes = Arc::new(AtomicUsize::new(0));
    let changes_clone = changes.clone();
    model.signals().data_changed.connect(move |_| {
        changes_clone.fetch_add(1, Ordering::SeqCst);
    });

    let index = ModelIndex::new(0, 0);
    assert!(model.set_data(&index, "4".into(), ItemRole::Edit));
    // Same displayed value again: accepted, but nothing is stored or announced.
    assert!(model.set_data(&index, "4".into(), ItemRole::Edit));

    assert_eq!(changes.load(Ordering::SeqCst), 1);
    assert_eq!(model.row(0).unwrap().field(&"bytes".into()), Some(ItemData::Int(4096)));

    // A failing reverse transform leaves storage untouched.
    assert!(!model.set_data(&index, "lots".into(), ItemRole::Edit));
    assert_eq!(model.display_text(&index), "4");
}

#[test]
fn first_matching_rule_is_stable_under_later_registrations() {
    let model = names_model(&["a", "b"]);
    model.add_foreground_rule("a-is-red", |cell| {
        (cell.row.field(&"n".into())?.as_string()? == "a").then_some(Color::RED.into())
    });
    let index = ModelIndex::new(0, 0);
    assert_eq!(model.data(&index, ItemRole::Foreground).as_color(), Some(Color::RED));

    model.add_foreground_rule("everything-gray", |_| Some(Color::GRAY.into()));

    assert_eq!(model.data(&index, ItemRole::Foreground).as_color(), Some(Color::RED));
    assert_eq!(
        model.data(&ModelIndex::new(1, 0), ItemRole::Foreground).as_color(),
        Some(Color::GRAY)
    );
}

#[test]
fn proxy_sorts_on_sort_value() {
    let model = names_model(&["b", "a", "c"]);
    let proxy = ProxyModel::new(model.clone());
    proxy.sort(0, SortOrder::Ascending);

    assert_eq!(column_text(proxy.as_ref(), 0), vec!["a", "b", "c"]);
    let first = proxy.row_identity(0).unwrap();
    assert_eq!(first.field(&"n".into()), Some(ItemData::from("a")));
    assert!(first.same_row(&model.row(1).unwrap()));

    // Source storage is untouched.
    assert_eq!(column_text(model.as_ref(), 0), vec!["b", "a", "c"]);
}

#[test]
fn proxy_sort_uses_sort_transform_not_display_text() {
    let model = Arc::new(TableModel::new());
    model.add_table_column(
        TableColumn::keyed("Size", "size").with_sort_transform(|rows, row| {
            rows[row].field(&"bytes".into()).unwrap_or_default()
        }),
    );
    model.append_rows([
        Row::record([("size", ItemData::from("9 KB")), ("bytes", ItemData::Int(9_000))]),
        Row::record([("size", ItemData::from("10 KB")), ("bytes", ItemData::Int(10_000))]),
        Row::record([("size", ItemData::from("1 MB")), ("bytes", ItemData::Int(1_000_000))]),
    ]);

    let proxy = ProxyModelBuilder::new(model).sort(0, SortOrder::Ascending).build();
    assert_eq!(column_text(proxy.as_ref(), 0), vec!["9 KB", "10 KB", "1 MB"]);
}

#[test]
fn proxy_edit_after_structural_change_is_remapped() {
    let model = names_model(&["b", "a", "c"]);
    let proxy = ProxyModel::new(model.clone());
    proxy.sort(0, SortOrder::Ascending);

    // Displayed: a, b, c. Edit "b" at proxy row 1.
    let edit = PendingEdit::capture(proxy.as_ref(), ModelIndex::new(1, 0)).unwrap();
    model.insert_row(0, Row::record([("n", "0")]));
    // Displayed: 0, a, b, c

    assert!(edit.is_stale(proxy.as_ref()));
    edit.commit(proxy.as_ref(), "bb".into()).unwrap();
    assert_eq!(column_text(model.as_ref(), 0), vec!["0", "bb", "a", "c"]);
}

#[test]
fn proxy_edit_of_vanished_row_is_dropped() {
    let model = names_model(&["b", "a", "c"]);
    let proxy = ProxyModel::new(model.clone());
    proxy.sort(0, SortOrder::Ascending);

    let edit = PendingEdit::capture(proxy.as_ref(), ModelIndex::new(0, 0)).unwrap();
    model.remove_row(1);

    let err = edit.commit(proxy.as_ref(), "zz".into()).unwrap_err();
    assert!(matches!(err, Error::RowNotFound { column: 0 }));
    assert_eq!(column_text(model.as_ref(), 0), vec!["b", "c"]);
}

#[test]
fn proxy_filter_hides_rows() {
    let model = names_model(&["apple", "bean", "avocado"]);
    let proxy = ProxyModel::new(model.clone());
    proxy.set_filter(|source: &TableModel, row| {
        source.display_text(&ModelIndex::new(row, 0)).starts_with('a')
    });
    assert_eq!(column_text(proxy.as_ref(), 0), vec!["apple", "avocado"]);

    model.append_row(Row::record([("n", "almond")]));
    assert_eq!(proxy.row_count(), 3);

    proxy.clear_filter();
    assert_eq!(proxy.row_count(), 4);
}

#[test]
fn replace_announces_whole_row() {
    let model = TableModel::new();
    model.add_column("a", "A", false);
    model.add_column("b", "B", false);
    model.append_row(Row::record([("a", 1), ("b", 2)]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    model
        .signals()
        .data_changed
        .connect(move |(top_left, bottom_right, _)| seen_clone.lock().push((*top_left, *bottom_right)));

    model.replace_row(0, Row::record([("a", 3), ("b", 4)]));
    assert_eq!(
        *seen.lock(),
        vec![(ModelIndex::new(0, 0), ModelIndex::new(0, 1))]
    );
}
