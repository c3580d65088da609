//! Column header bookkeeping.
//!
//! [`HeaderState`] is the toolkit-neutral half of a horizontal header: the
//! width and visibility of every column, the order columns are shown in, and
//! which column carries the sort indicator. A hosting widget paints from it;
//! [`ColumnLayout`](super::ColumnLayout) snapshots it for persistence.
//!
//! ```
//! use tabula::view::HeaderState;
//!
//! let mut header = HeaderState::new();
//! header.set_section_count(3);
//! header.set_section_size(0, 150.0);
//! header.move_section(0, 2);
//! assert_eq!(header.logical_order(), vec![1, 2, 0]);
//! assert_eq!(header.visual_index(0), 2);
//! ```

use crate::model::{DEFAULT_COLUMN_WIDTH, SortOrder};

/// Lower bound applied to every width unless configured otherwise.
pub const MINIMUM_SECTION_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
struct Section {
    width: f32,
    hidden: bool,
}

/// Per-column header state. Sections are addressed by logical (model)
/// column; positions on screen are visual indices.
#[derive(Debug, Clone)]
pub struct HeaderState {
    /// Indexed by logical column.
    sections: Vec<Section>,
    /// Logical columns in display order.
    order: Vec<usize>,
    default_width: f32,
    minimum_width: f32,
    sort_indicator: Option<(usize, SortOrder)>,
}

impl Default for HeaderState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderState {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            order: Vec::new(),
            default_width: DEFAULT_COLUMN_WIDTH,
            minimum_width: MINIMUM_SECTION_SIZE,
            sort_indicator: None,
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Grows or shrinks to `count` sections.
    ///
    /// Surviving sections keep width, visibility and relative order. New
    /// ones get the default width and are shown last.
    pub fn set_section_count(&mut self, count: usize) {
        let previous = self.sections.len();
        if count == previous {
            return;
        }
        self.sections.resize(
            count,
            Section {
                width: self.default_width,
                hidden: false,
            },
        );
        self.order.retain(|&logical| logical < count);
        self.order.extend(previous..count);

        if self.sort_indicator.is_some_and(|(section, _)| section >= count) {
            self.sort_indicator = None;
        }
    }

    /// Width of a column; unknown columns report the default.
    pub fn section_size(&self, logical: usize) -> f32 {
        self.sections
            .get(logical)
            .map_or(self.default_width, |section| section.width)
    }

    /// Sets a width, clamped to the minimum. Returns the old width, or
    /// `None` for an unknown column.
    pub fn set_section_size(&mut self, logical: usize, width: f32) -> Option<f32> {
        let minimum = self.minimum_width;
        let section = self.sections.get_mut(logical)?;
        Some(std::mem::replace(&mut section.width, width.max(minimum)))
    }

    /// All widths, by logical column.
    pub fn section_sizes(&self) -> Vec<f32> {
        self.sections.iter().map(|section| section.width).collect()
    }

    /// Width used for sections added later.
    pub fn set_default_section_size(&mut self, width: f32) {
        self.default_width = width.max(self.minimum_width);
    }

    /// Changes the clamp for future resizes. Existing widths are untouched.
    pub fn set_minimum_section_size(&mut self, width: f32) {
        self.minimum_width = width.max(1.0);
    }

    pub fn is_section_hidden(&self, logical: usize) -> bool {
        self.sections.get(logical).is_some_and(|section| section.hidden)
    }

    pub fn set_section_hidden(&mut self, logical: usize, hidden: bool) {
        if let Some(section) = self.sections.get_mut(logical) {
            section.hidden = hidden;
        }
    }

    pub fn hide_section(&mut self, logical: usize) {
        self.set_section_hidden(logical, true);
    }

    /// Display position of a logical column.
    pub fn visual_index(&self, logical: usize) -> usize {
        self.order
            .iter()
            .position(|&candidate| candidate == logical)
            .unwrap_or(logical)
    }

    pub fn logical_order(&self) -> Vec<usize> {
        self.order.clone()
    }

    /// Replaces the display order. `order` must list every logical column
    /// exactly once; anything else is refused and `false` returned.
    pub fn set_logical_order(&mut self, order: &[usize]) -> bool {
        if !is_permutation(order, self.sections.len()) {
            return false;
        }
        self.order = order.to_vec();
        true
    }

    /// Drags the column shown at `from_visual` to `to_visual`.
    pub fn move_section(&mut self, from_visual: usize, to_visual: usize) {
        let count = self.order.len();
        if from_visual == to_visual || from_visual >= count || to_visual >= count {
            return;
        }
        let logical = self.order.remove(from_visual);
        self.order.insert(to_visual, logical);
    }

    pub fn sort_indicator_section(&self) -> Option<usize> {
        self.sort_indicator.map(|(section, _)| section)
    }

    /// Order shown by the indicator; ascending when there is none.
    pub fn sort_indicator_order(&self) -> SortOrder {
        self.sort_indicator.map(|(_, order)| order).unwrap_or_default()
    }

    pub fn set_sort_indicator(&mut self, logical: usize, order: SortOrder) {
        if logical < self.sections.len() {
            self.sort_indicator = Some((logical, order));
        }
    }

    pub fn clear_sort_indicator(&mut self) {
        self.sort_indicator = None;
    }
}

/// `true` if `order` holds each of `0..len` exactly once.
pub(crate) fn is_permutation(order: &[usize], len: usize) -> bool {
    let mut seen = vec![false; len];
    order.len() == len
        && order
            .iter()
            .all(|&index| seen.get_mut(index).is_some_and(|slot| !std::mem::replace(slot, true)))
}
