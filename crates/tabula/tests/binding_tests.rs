//! Integration tests for table bindings: selection by identity, edits through
//! the proxy, and layout persistence.

use std::sync::Arc;

use tabula::Error;
use tabula::config::TableConfig;
use tabula::model::{
    EditOutcome, ItemModel, ModelIndex, Row, SelectionBehavior, SelectionMode, SortOrder, TableModel,
};
use tabula::view::{ColumnLayout, FileLayoutStore, IntegerDelegate, TableBinding};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn files_model() -> Arc<TableModel> {
    let model = Arc::new(TableModel::new());
    model.add_column("name", "Name", true);
    model.add_column("size", "Size", true);
    model.append_rows([("b.txt", 20), ("a.txt", 10), ("c.txt", 30)].map(|(name, size)| {
        Row::record([("name", tabula::model::ItemData::from(name)), ("size", size.into())])
    }));
    model
}

fn displayed_names(binding: &TableBinding) -> Vec<String> {
    let Some(view) = binding.view_model() else {
        return Vec::new();
    };
    (0..view.row_count())
        .map(|row| view.display_text(&ModelIndex::new(row, 0)))
        .collect()
}

#[test]
fn selection_survives_sort_and_insert() {
    init_tracing();
    let model = files_model();
    let binding = TableBinding::new();
    binding.set_model(model.clone());

    // Select "b.txt" and "c.txt".
    binding.set_selected_rows(&[0, 2]).unwrap();

    binding.sort_by_column(1, SortOrder::Descending);
    assert_eq!(displayed_names(&binding), vec!["c.txt", "b.txt", "a.txt"]);
    assert_eq!(binding.selected_rows(), vec![0, 1]);

    model.insert_row(0, Row::record([("name", "d.txt")]));
    // Sizes: d has none and sorts last when descending.
    assert_eq!(displayed_names(&binding), vec!["c.txt", "b.txt", "a.txt", "d.txt"]);
    assert_eq!(binding.selected_rows(), vec![0, 1]);

    let selected: Vec<String> = binding
        .selection()
        .iter()
        .filter_map(|row| row.field(&"name".into()))
        .map(|name| name.to_string())
        .collect();
    assert_eq!(selected, vec!["c.txt", "b.txt"]);
}

#[test]
fn removing_a_selected_row_drops_it_from_selection() {
    init_tracing();
    let model = files_model();
    let binding = TableBinding::new();
    binding.set_model(model.clone());
    binding.set_selected_rows(&[0, 1]).unwrap();

    model.remove_row(0);
    assert_eq!(binding.selection_count(), 1);
    assert_eq!(
        binding.selection()[0].field(&"name".into()).map(|v| v.to_string()),
        Some("a.txt".to_string())
    );
}

#[test]
fn selected_indices_follow_the_sorted_view() {
    init_tracing();
    let model = files_model();
    let binding = TableBinding::new();
    binding.set_model(model.clone());
    binding.sort_by_column(0, SortOrder::Ascending);
    assert_eq!(displayed_names(&binding), vec!["a.txt", "b.txt", "c.txt"]);

    binding
        .set_selected_indices(&[ModelIndex::new(2, 1), ModelIndex::new(0, 0)])
        .unwrap();
    assert_eq!(binding.selected_rows(), vec![0, 2]);
    assert_eq!(binding.selection_model().current_index(), ModelIndex::new(2, 1));
    // Row behavior widens each cell to its whole row.
    assert_eq!(binding.selection_count(), 2);
    assert!(binding.selection_model().is_selected(&ModelIndex::new(0, 1)));

    // Storage positions: "c.txt" is stored at 2, "a.txt" at 1.
    assert_eq!(binding.selected_row_indices().unwrap(), vec![1, 2]);
}

#[test]
fn column_behavior_rejects_row_selection() {
    init_tracing();
    let binding = TableBinding::with_config(TableConfig {
        selection_behavior: SelectionBehavior::SelectColumns,
        selection_mode: SelectionMode::MultiSelection,
        ..Default::default()
    });
    binding.set_model(files_model());

    assert!(matches!(
        binding.set_selected_rows(&[0]),
        Err(Error::SelectionBehavior { .. })
    ));
}

#[test]
fn single_mode_keeps_one_row() {
    init_tracing();
    let binding = TableBinding::with_config(TableConfig {
        selection_mode: SelectionMode::SingleSelection,
        ..Default::default()
    });
    binding.set_model(files_model());

    binding.set_selected_rows(&[0, 2]).unwrap();
    assert_eq!(binding.selected_rows(), vec![0]);
}

#[test]
fn edit_commits_through_sorted_view() {
    init_tracing();
    let model = files_model();
    let binding = TableBinding::new();
    binding.set_model(model.clone());
    binding.set_delegate(1, IntegerDelegate).unwrap();
    binding.sort_by_column(0, SortOrder::Ascending);

    // Displayed row 0 is "a.txt", stored at position 1.
    let edit = binding.begin_edit(ModelIndex::new(0, 1)).unwrap();
    assert_eq!(edit.original_text(), "10");
    assert_eq!(binding.commit_edit(&edit, "11").unwrap(), EditOutcome::Applied);
    assert_eq!(model.display_text(&ModelIndex::new(1, 1)), "11");

    assert!(binding.commit_edit(&edit, "eleven").unwrap_err().is_edit_failure());
}

#[test]
fn dropped_edit_is_reported_not_misapplied() {
    init_tracing();
    let model = files_model();
    let binding = TableBinding::new();
    binding.set_model(model.clone());

    let edit = binding.begin_edit(ModelIndex::new(0, 0)).unwrap();
    model.reset([Row::record([("name", "fresh.txt")])]);

    let err = binding.commit_edit(&edit, "renamed.txt").unwrap_err();
    assert!(matches!(err, Error::RowNotFound { column: 0 }));
    assert_eq!(displayed_names(&binding), vec!["fresh.txt"]);
}

#[test]
fn layout_order_mismatch_keeps_current_order() {
    init_tracing();
    let binding = TableBinding::new();
    binding.set_model(files_model());
    binding.move_column(1, 0);
    let before = binding.capture_layout();

    let stale = ColumnLayout {
        order: vec![2, 0, 1],
        hidden: vec![0],
        widths: vec![0.0, 250.0],
    };
    let report = binding.restore_layout(&stale);

    assert!(!report.order_applied);
    assert_eq!(binding.capture_layout().order, before.order);
    assert!(binding.is_column_hidden(0));
    assert_eq!(binding.column_width(1), 250.0);
    assert_eq!(binding.column_width(0), before.widths[0]);
}

#[test]
fn layout_persists_through_file_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = FileLayoutStore::new(dir.path().join("files.toml"));

    let binding = TableBinding::new();
    binding.set_model(files_model());
    assert!(binding.load_layout(&store).unwrap().is_none());

    binding.set_column_width(0, 240.0);
    binding.set_column_hidden(1, true);
    binding.save_layout(&store).unwrap();

    let reopened = TableBinding::new();
    reopened.set_model(files_model());
    let report = reopened.load_layout(&store).unwrap().unwrap();
    assert!(report.widths_applied);
    assert_eq!(reopened.column_width(0), 240.0);
    assert!(reopened.is_column_hidden(1));
}

#[test]
fn list_binding_shows_items() {
    init_tracing();
    let binding = TableBinding::list("Results");
    binding.set_list_items(["/usr/bin/env", "/etc/hosts"]).unwrap();

    binding.sort_by_column(0, SortOrder::Ascending);
    assert_eq!(displayed_names(&binding), vec!["/etc/hosts", "/usr/bin/env"]);
    assert!(binding.begin_edit(ModelIndex::new(0, 0)).is_err());
}
