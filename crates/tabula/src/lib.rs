//! Tabula - a virtual tabular data-binding engine.
//!
//! Tabula sits between a table widget and the data a collaborator supplies.
//! It never draws anything; a hosting toolkit asks it for cell values and
//! styles by coordinate and role, and listens to its signals.
//!
//! - [`model`]: Rows, columns, style rules, the table model and the sort/filter proxy
//! - [`view`]: Selection by row identity, header state, layout persistence, edit delegates
//! - [`source`]: Line streams produced on a worker thread, with cancellation
//! - [`config`]: Serializable settings for bindings and searches
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tabula::model::{Color, ItemData, ItemModel, ItemRole, ModelIndex, Row, SortOrder, TableModel};
//! use tabula::view::TableBinding;
//!
//! let model = Arc::new(TableModel::new());
//! model.add_column("name", "Name", true);
//! model.add_column("size", "Size", false);
//! model.append_rows([
//!     Row::record([("name", ItemData::from("b.txt")), ("size", ItemData::Int(20))]),
//!     Row::record([("name", ItemData::from("a.txt")), ("size", ItemData::Int(10))]),
//! ]);
//! model.add_foreground_rule("large", |cell| {
//!     let size = cell.row.field(&"size".into())?.as_int()?;
//!     (size > 15).then_some(Color::RED.into())
//! });
//!
//! let binding = TableBinding::new();
//! binding.set_model(model.clone());
//! binding.sort_by_column(0, SortOrder::Ascending);
//!
//! let view = binding.view_model().unwrap();
//! assert_eq!(view.display_text(&ModelIndex::new(0, 0)), "a.txt");
//! assert!(view.data(&ModelIndex::new(1, 1), ItemRole::Foreground).is_some());
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod view;

pub use error::{Error, Result};
