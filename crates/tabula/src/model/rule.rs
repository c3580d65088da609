//! Style rules for the Foreground and Background roles.
//!
//! Each model keeps two ordered rule lists. A query for a style role walks
//! the matching list in insertion order and returns the first non-empty
//! result; when no rule matches the role is unstyled (`ItemData::None`).

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::column::TableColumn;
use super::index::ModelIndex;
use super::role::ItemData;
use super::row::RowRef;

/// The cell a rule is asked about.
pub struct CellContext<'a> {
    /// Position of the cell in the model.
    pub index: ModelIndex,
    /// The column the cell belongs to.
    pub column: &'a TableColumn,
    /// The row the cell belongs to.
    pub row: &'a RowRef,
}

type RuleFn = Arc<dyn Fn(&CellContext<'_>) -> Option<ItemData> + Send + Sync>;

/// A named style rule.
#[derive(Clone)]
pub struct StyleRule {
    name: String,
    apply: RuleFn,
}

impl StyleRule {
    /// Creates a rule. Returning `None` means "no opinion".
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&CellContext<'_>) -> Option<ItemData> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Returns the rule's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the rule to a cell.
    pub fn apply(&self, cell: &CellContext<'_>) -> Option<ItemData> {
        (self.apply)(cell)
    }
}

impl fmt::Debug for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleRule").field("name", &self.name).finish_non_exhaustive()
    }
}

/// An ordered, first-match-wins list of style rules.
#[derive(Default)]
pub struct RuleSet {
    rules: RwLock<Vec<StyleRule>>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule; it is consulted after every existing rule.
    pub fn push(&self, rule: StyleRule) {
        self.rules.write().push(rule);
    }

    /// Removes every rule called `name`. Returns `true` if any was removed.
    pub fn remove(&self, name: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|rule| rule.name != name);
        rules.len() != before
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Returns the rule names in evaluation order.
    pub fn names(&self) -> Vec<String> {
        self.rules.read().iter().map(|rule| rule.name.clone()).collect()
    }

    /// Returns the first non-empty result, or `ItemData::None`.
    ///
    /// The list is snapshotted first, so a rule may add or remove rules
    /// without deadlocking; such changes apply from the next evaluation.
    pub fn evaluate(&self, cell: &CellContext<'_>) -> ItemData {
        let rules = self.rules.read().clone();
        rules
            .iter()
            .find_map(|rule| rule.apply(cell).filter(ItemData::is_some))
            .unwrap_or_default()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.read().iter()).finish()
    }
}
