//! Highlight selection over audit findings.
//!
//! DESIGN
//! ======
//! Highlights are category-scoped: the active tab picks which finding
//! category (violations, passes, incomplete) the selection belongs to, and
//! that category keys the emphasis color. Switching tabs therefore clears
//! the selection first, otherwise stale elements would repaint in the new
//! category's color.
//!
//! Every mutator returns the payload to send to the preview-side painter,
//! or `None` when the call left the selection untouched. Callers emit at
//! most once per committed change.

use std::collections::BTreeSet;

use events::HighlightPayload;

/// Finding category selected by the panel's tab strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindingCategory {
    Violations,
    Passes,
    Incomplete,
}

impl FindingCategory {
    /// Category shown at the given tab index. Out-of-range indices fall
    /// back to violations rather than an unpainted highlight.
    #[must_use]
    pub fn from_tab(index: usize) -> Self {
        match index {
            1 => Self::Passes,
            2 => Self::Incomplete,
            _ => Self::Violations,
        }
    }

    /// Emphasis color painted over elements in this category.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Violations => "#e03131",
            Self::Passes => "#2f9e44",
            Self::Incomplete => "#f08c00",
        }
    }
}

/// Currently highlighted element identifiers plus the active tab.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightState {
    highlighted: BTreeSet<String>,
    tab: usize,
}

impl HighlightState {
    /// Add or remove a batch of element identifiers.
    pub fn toggle(&mut self, targets: &[String], add: bool) -> Option<HighlightPayload> {
        let mut changed = false;
        for target in targets {
            changed |= if add {
                self.highlighted.insert(target.clone())
            } else {
                self.highlighted.remove(target)
            };
        }
        changed.then(|| self.payload())
    }

    /// Drop every highlighted element.
    pub fn clear(&mut self) -> Option<HighlightPayload> {
        if self.highlighted.is_empty() {
            return None;
        }
        self.highlighted.clear();
        Some(self.payload())
    }

    /// Switch the active tab, clearing the selection as a side effect.
    /// Both the clear and the tab change fold into a single payload.
    pub fn set_tab(&mut self, index: usize) -> Option<HighlightPayload> {
        let changed = !self.highlighted.is_empty() || self.tab != index;
        self.highlighted.clear();
        self.tab = index;
        changed.then(|| self.payload())
    }

    /// Snapshot of the selection as the preview painter expects it.
    #[must_use]
    pub fn payload(&self) -> HighlightPayload {
        HighlightPayload {
            elements: self.elements(),
            color: FindingCategory::from_tab(self.tab).color().to_owned(),
        }
    }

    /// Highlighted element identifiers in stable order.
    #[must_use]
    pub fn elements(&self) -> Vec<String> {
        self.highlighted.iter().cloned().collect()
    }

    #[must_use]
    pub fn tab(&self) -> usize {
        self.tab
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.highlighted.is_empty()
    }
}

#[cfg(test)]
#[path = "highlight_test.rs"]
mod tests;
