//! Model layer: rows, columns, roles, the table model and its proxies.
//!
//! # Core Types
//!
//! - `ModelIndex`: Identifies a cell's position in a model
//! - `Row` / `RowRef`: A collaborator's row value and its stable identity
//! - `ItemRole`: Specifies which facet of a cell to access
//! - `ItemData`: Type-erased container for cell data
//! - `ItemModel`: The trait that models and proxies implement
//! - `ModelSignals`: Signals for change notifications
//!
//! # Model Implementations
//!
//! - `TableModel`: Row storage presented through typed `TableColumn`s
//! - `ProxyModel`: Wraps another model to provide filtering and stable sorting
//!
//! # Example
//!
//! ```
//! use tabula::model::{ItemModel, ModelIndex, Row, TableModel};
//!
//! let model = TableModel::new();
//! model.add_column("name", "Name", false);
//! model.append_row(Row::record([("name", "Apple")]));
//!
//! let first = model.index(0, 0);
//! assert_eq!(model.display_text(&first), "Apple");
//!
//! model.signals().data_changed.connect(|(top_left, bottom_right, _roles)| {
//!     println!("Data changed from {:?} to {:?}", top_left, bottom_right);
//! });
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ TableModel  │────>│ ProxyModel  │────>│ TableBinding│
//! │ (ItemModel) │     │ (ItemModel) │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!       │ signals           │ signals           │
//!       └──────────>  ModelIndex / ItemRole  <──┘
//! ```

mod column;
mod edit;
mod index;
mod proxy_model;
mod role;
mod row;
mod rule;
pub mod selection;
mod table_model;
mod traits;

pub use column::{
    ColumnKind, DEFAULT_COLUMN_WIDTH, ForwardTransform, GraphemeMeasure, ReverseTransform,
    SortTransform, TableColumn, TextMeasure,
};
pub use edit::PendingEdit;
pub use index::ModelIndex;
pub use proxy_model::{FilterFn, ProxyModel, ProxyModelBuilder, SortOrder, SortPolicyFn, compare_item_data};
pub use role::{Color, HorizontalAlignment, ItemData, ItemRole, TextAlignment, VerticalAlignment};
pub use row::{FieldKey, Row, RowRef};
pub use rule::{CellContext, RuleSet, StyleRule};
pub use selection::{SelectionBehavior, SelectionFlags, SelectionMode, SelectionModel};
pub use table_model::TableModel;
pub use traits::{EditOutcome, ItemFlags, ItemModel, ModelSignals, Orientation};
