//! View-side state: header sections, column layouts, edit delegates and the
//! binding that ties them to a model.
//!
//! # Core Types
//!
//! - `TableBinding`: Binds a `TableModel` (and its proxy) to view state
//! - `HeaderState`: column widths, visibility, display order and sort indicator
//! - `ColumnLayout`: Persistable snapshot of a header's layout
//! - `EditDelegate`: Turns editor text into cell values, per column

mod binding;
mod delegate;
mod header;
mod layout;

pub use binding::{ActiveEdit, TableBinding};
pub use delegate::{ChoiceDelegate, EditDelegate, IntegerDelegate, TextDelegate};
pub use header::{HeaderState, MINIMUM_SECTION_SIZE};
pub use layout::{ColumnLayout, FileLayoutStore, LayoutFormat, LayoutStore, MemoryLayoutStore, RestoreReport};
