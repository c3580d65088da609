//! Column layout snapshots and their persistence.
//!
//! A [`ColumnLayout`] is the logical `{order, hidden, widths}` state of a
//! header, independent of any wire format. Capturing is exact; restoring is
//! defensive, because a snapshot written for one column set is routinely
//! read back after the column set changed:
//!
//! - `order` is applied only if it is a permutation of the current columns;
//!   otherwise it is ignored as a whole.
//! - `hidden` lists hidden column positions; positions past the current
//!   column count are ignored.
//! - `widths` is applied only if it has one entry per column; a width of
//!   zero leaves that column's width unchanged.
//!
//! The three fields are applied independently of each other.
//!
//! Snapshots are stored through a [`LayoutStore`]. [`FileLayoutStore`] keeps
//! one snapshot per file as JSON or TOML and replaces the file atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tabula_core::logging::targets;

use super::header::{HeaderState, is_permutation};
use crate::error::LayoutError;

/// The persisted shape of a header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Visual position of each column, by column position.
    pub order: Vec<usize>,
    /// Positions of hidden columns.
    pub hidden: Vec<usize>,
    /// Width of each column, by column position. Zero means unspecified.
    pub widths: Vec<f32>,
}

/// What a restore actually applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub order_applied: bool,
    pub hidden_applied: bool,
    pub widths_applied: bool,
}

impl ColumnLayout {
    /// Captures the current state of `header`.
    pub fn capture(header: &HeaderState) -> Self {
        let count = header.section_count();
        Self {
            order: (0..count).map(|logical| header.visual_index(logical)).collect(),
            hidden: (0..count)
                .filter(|&logical| header.is_section_hidden(logical))
                .collect(),
            widths: header.section_sizes(),
        }
    }

    /// Applies this snapshot to `header`, skipping fields that no longer fit.
    pub fn restore(&self, header: &mut HeaderState) -> RestoreReport {
        let count = header.section_count();
        let mut report = RestoreReport::default();

        if is_permutation(&self.order, count) {
            let mut logical_order = vec![0; count];
            for (logical, &visual) in self.order.iter().enumerate() {
                logical_order[visual] = logical;
            }
            report.order_applied = header.set_logical_order(&logical_order);
        } else if !self.order.is_empty() {
            tracing::warn!(
                target: targets::LAYOUT,
                saved = self.order.len(),
                current = count,
                "column order does not match current columns; ignored"
            );
        }

        for logical in 0..count {
            header.set_section_hidden(logical, self.hidden.contains(&logical));
        }
        let stray = self.hidden.iter().filter(|&&logical| logical >= count).count();
        if stray > 0 {
            tracing::debug!(
                target: targets::LAYOUT,
                stray,
                "hidden entries past the last column ignored"
            );
        }
        report.hidden_applied = true;

        if self.widths.len() == count {
            for (logical, &width) in self.widths.iter().enumerate() {
                if width > 0.0 {
                    header.set_section_size(logical, width);
                }
            }
            report.widths_applied = true;
        } else if !self.widths.is_empty() {
            tracing::warn!(
                target: targets::LAYOUT,
                saved = self.widths.len(),
                current = count,
                "column widths do not match current columns; ignored"
            );
        }

        tracing::debug!(target: targets::LAYOUT, ?report, "layout restored");
        report
    }

    /// Parses a snapshot from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes the snapshot as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        Ok(toml::from_str(text)?)
    }

    /// Encodes the snapshot as TOML.
    pub fn to_toml_string(&self) -> Result<String, LayoutError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Somewhere a layout snapshot can be kept between sessions.
pub trait LayoutStore: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing has been stored.
    fn load(&self) -> Result<Option<ColumnLayout>, LayoutError>;

    /// Replaces the stored snapshot.
    fn save(&self, layout: &ColumnLayout) -> Result<(), LayoutError>;
}

/// The format for layout file persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutFormat {
    /// JSON format.
    #[default]
    Json,
    /// TOML format.
    Toml,
}

impl LayoutFormat {
    /// Picks a format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Stores a layout snapshot in a single file.
///
/// Saving writes to a temporary file beside the target and renames it over
/// the target, so a reader never sees a partially written snapshot.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    path: PathBuf,
    format: LayoutFormat,
}

impl FileLayoutStore {
    /// Creates a store at `path`, choosing the format from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = LayoutFormat::from_path(&path);
        Self { path, format }
    }

    /// Creates a store at `path` with an explicit format.
    pub fn with_format(path: impl Into<PathBuf>, format: LayoutFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file format.
    pub fn format(&self) -> LayoutFormat {
        self.format
    }

    fn write_atomic(&self, contents: &str) -> Result<(), LayoutError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| LayoutError::io(&self.path, e))?;
        temp.write_all(contents.as_bytes())
            .map_err(|e| LayoutError::io(&self.path, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| LayoutError::io(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| LayoutError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl LayoutStore for FileLayoutStore {
    fn load(&self) -> Result<Option<ColumnLayout>, LayoutError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LayoutError::io(&self.path, e)),
        };
        let layout = match self.format {
            LayoutFormat::Json => ColumnLayout::from_json_str(&text)?,
            LayoutFormat::Toml => ColumnLayout::from_toml_str(&text)?,
        };
        Ok(Some(layout))
    }

    fn save(&self, layout: &ColumnLayout) -> Result<(), LayoutError> {
        let text = match self.format {
            LayoutFormat::Json => layout.to_json_string()?,
            LayoutFormat::Toml => layout.to_toml_string()?,
        };
        self.write_atomic(&text)?;
        tracing::debug!(target: targets::LAYOUT, path = %self.path.display(), "layout saved");
        Ok(())
    }
}

/// Keeps a layout snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    layout: Mutex<Option<ColumnLayout>>,
}

impl MemoryLayoutStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&self) -> Result<Option<ColumnLayout>, LayoutError> {
        Ok(self.layout.lock().clone())
    }

    fn save(&self, layout: &ColumnLayout) -> Result<(), LayoutError> {
        *self.layout.lock() = Some(layout.clone());
        Ok(())
    }
}
