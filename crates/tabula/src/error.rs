//! Error types for the binding engine.

use std::path::PathBuf;

use crate::model::SelectionBehavior;

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the binding engine.
///
/// Bounds violations on structural mutation are not errors: those operations
/// return `false` and leave the model untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A row- or column-granular operation was requested under a selection
    /// behavior that does not support it.
    #[error("selection behavior {actual:?} does not support this operation (requires {required:?})")]
    SelectionBehavior {
        required: SelectionBehavior,
        actual: SelectionBehavior,
    },

    /// No model is bound to the view.
    #[error("no model set")]
    NoModel,

    /// No column with the given name exists.
    #[error("no column named '{0}'")]
    UnknownColumn(String),

    /// The coordinate does not address a cell of the current model.
    #[error("invalid index ({row}, {column})")]
    InvalidIndex { row: usize, column: usize },

    /// The cell is not editable.
    #[error("cell ({row}, {column}) is not editable")]
    NotEditable { row: usize, column: usize },

    /// The owning column refused the value; storage is untouched.
    #[error("edit rejected by column {column}: {reason}")]
    EditRejected { column: usize, reason: String },

    /// The edited row no longer exists in the model; the edit was dropped.
    #[error("edited row could not be located in column {column}; edit dropped")]
    RowNotFound { column: usize },

    /// Layout persistence failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl Error {
    /// Create an edit rejection.
    pub fn edit_rejected(column: usize, reason: impl Into<String>) -> Self {
        Self::EditRejected {
            column,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the edit never reached storage.
    pub fn is_edit_failure(&self) -> bool {
        matches!(
            self,
            Self::NotEditable { .. } | Self::EditRejected { .. } | Self::RowNotFound { .. }
        )
    }
}

/// Failure reported by a reverse transform.
///
/// A failing reverse transform rejects the edit as a whole; nothing is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    /// Create a transform error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors reading or writing persisted state (layout snapshots, configuration).
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Reading or writing the store failed.
    #[error("failed to access layout store '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("invalid JSON layout: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding failed.
    #[error("invalid TOML layout: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// TOML encoding failed.
    #[error("failed to encode TOML layout: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

impl LayoutError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure reported by a result source once its sequence has completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The producer finished with a failure status.
    #[error("result source failed with status {code}")]
    Failed { code: i64 },

    /// The producer reported an error message.
    #[error("result source error: {0}")]
    Producer(String),

    /// The producer thread went away without reporting an outcome.
    #[error("result source disconnected before completion")]
    Disconnected,
}
