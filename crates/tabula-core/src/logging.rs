//! Logging facilities for Tabula.
//!
//! Tabula uses the `tracing` crate for instrumentation. To see logs, install a
//! subscriber in the hosting application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tabula::proxy=debug,tabula::model=trace")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "tabula_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tabula_core::signal";
    /// Tabular model target (storage, mutation, notification).
    pub const MODEL: &str = "tabula::model";
    /// Sort/filter proxy target.
    pub const PROXY: &str = "tabula::proxy";
    /// Selection and row identity target.
    pub const SELECTION: &str = "tabula::selection";
    /// Editing target (delegates, commits, remapping).
    pub const EDIT: &str = "tabula::edit";
    /// Column layout capture/restore and persistence target.
    pub const LAYOUT: &str = "tabula::layout";
    /// Result source target.
    pub const SOURCE: &str = "tabula::source";
}
