//! Selection, keys and edit outcomes

use std::time::Duration;

use varkit::VariableMap;

use super::node::PillId;

/// Current selection on a surface
///
/// Offsets count characters within the pill (or within the surface text
/// when `pill` is `None`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Caret { pill: Option<PillId>, offset: usize },
    Range { pill: Option<PillId>, start: usize, end: usize },
}

impl Selection {
    /// Pill holding the selection, if any
    pub fn pill(&self) -> Option<PillId> {
        match *self {
            Selection::None => None,
            Selection::Caret { pill, .. } | Selection::Range { pill, .. } => pill,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match *self {
            Selection::None | Selection::Caret { .. } => true,
            Selection::Range { start, end, .. } => start == end,
        }
    }
}

/// Auto-select timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTiming {
    /// Same pill is not auto-selected twice within this window
    pub auto_select_guard: Duration,
    /// Auto-select stays off this long after a double click
    pub auto_select_suppress: Duration,
    /// Delay before a single click selects the whole pill
    pub click_select_delay: Duration,
}

impl Default for SelectionTiming {
    fn default() -> Self {
        Self {
            auto_select_guard: Duration::from_millis(200),
            auto_select_suppress: Duration::from_millis(600),
            click_select_delay: Duration::from_millis(220),
        }
    }
}

/// Keys the surface reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Enter,
    Tab,
    Other,
}

/// Where keyboard navigation moved focus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// A pill on this surface, now selected
    Pill(PillId),
    /// A variable with no pill here; the host moves focus
    External(String),
}

/// Result of a key press
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// The key must not reach the document (no line break, no tab)
    pub prevent_default: bool,
    pub navigate: Option<Navigation>,
}

/// Result of committing the surface content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Extracted text, placeholder tokens intact
    pub text: String,
    /// Variables whose value differs from the map they were committed against
    pub updates: VariableMap,
    /// Whether the extracted text differs from the previous commit
    pub text_changed: bool,
}
