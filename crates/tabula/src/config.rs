//! Configuration for table bindings and result sources.
//!
//! Both types deserialize from JSON or TOML with every field optional;
//! missing fields take their defaults.
//!
//! ```
//! use tabula::config::TableConfig;
//! use tabula::model::SelectionMode;
//!
//! let config = TableConfig::from_toml_str(r#"
//!     selection_mode = "MultiSelection"
//!     default_column_width = 140.0
//! "#).unwrap();
//! assert_eq!(config.selection_mode, SelectionMode::MultiSelection);
//! assert!(config.sorting_enabled);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::model::{DEFAULT_COLUMN_WIDTH, SelectionBehavior, SelectionMode};
use crate::view::MINIMUM_SECTION_SIZE;

/// Settings applied to a [`TableBinding`](crate::view::TableBinding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Width given to columns that do not specify one.
    pub default_column_width: f32,
    /// Lower bound for column widths.
    pub minimum_column_width: f32,
    pub selection_mode: SelectionMode,
    pub selection_behavior: SelectionBehavior,
    /// Bind a sort/filter proxy between the model and the view.
    pub sorting_enabled: bool,
    /// Re-sort when data in the sort column changes.
    pub dynamic_sort: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_column_width: DEFAULT_COLUMN_WIDTH,
            minimum_column_width: MINIMUM_SECTION_SIZE,
            selection_mode: SelectionMode::ExtendedSelection,
            selection_behavior: SelectionBehavior::SelectRows,
            sorting_enabled: true,
            dynamic_sort: true,
        }
    }
}

impl TableConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        Ok(toml::from_str(text)?)
    }
}

/// Pattern matching flags understood by search producers.
///
/// `CASE_SENSITIVE` is the empty set; the other flags combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchFlags(u32);

impl MatchFlags {
    pub const CASE_SENSITIVE: Self = Self(0);
    pub const CASE_INSENSITIVE: Self = Self(1);
    pub const GLOB: Self = Self(2);
    pub const REGEX: Self = Self(4);

    /// Creates flags from raw bits, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0b111)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_case_insensitive(self) -> bool {
        self.contains(Self::CASE_INSENSITIVE)
    }

    pub fn is_glob(self) -> bool {
        self.contains(Self::GLOB) && !self.is_regex()
    }

    pub fn is_regex(self) -> bool {
        self.contains(Self::REGEX)
    }
}

impl std::ops::BitOr for MatchFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for MatchFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Default cap on the number of results a search delivers.
pub const DEFAULT_SEARCH_LIMIT: usize = 1000;

/// Default number of rows applied to a model per batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Options for a [`ResultStream`](crate::source::ResultStream) search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    #[serde(rename = "search_flags")]
    pub flags: MatchFlags,
    /// Maximum number of lines delivered; zero means unlimited.
    #[serde(rename = "search_limit")]
    pub limit: usize,
    /// Rows per batch when results are applied to a model.
    pub batch_size: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            flags: MatchFlags::CASE_SENSITIVE,
            limit: DEFAULT_SEARCH_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SearchOptions {
    /// Parses options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the limit as an option; `None` when unlimited.
    pub fn effective_limit(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit)
    }
}
