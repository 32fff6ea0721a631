//! Sidebar status derivation for audited stories.
//!
//! Pure data helpers behind the sidebar's status area: per-story severity
//! entries, the toggle-driven story filter, and the mapping from reporter
//! outcomes to sidebar severities. UI-framework agnostic so hosts can feed
//! their own tree views from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use events::{ADDON_ID, Report, ReportStatus};

/// Title shown on every status entry this addon produces.
pub const STATUS_TITLE: &str = "Accessibility tests";

/// Severity attached to a story in the sidebar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusValue {
    Pending,
    Success,
    Error,
    Warn,
    #[default]
    Unknown,
}

/// One addon's status entry for one story.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryStatus {
    pub title: String,
    pub status: StatusValue,
    /// Run that produced the entry, when the producer tracks one.
    pub test_run_id: Option<Uuid>,
}

/// A story's status entries keyed by the addon that produced them.
pub type StatusByAddon = BTreeMap<String, StoryStatus>;

/// Sidebar-wide status entries keyed by story id.
pub type StatusMap = BTreeMap<String, StatusByAddon>;

// =============================================================================
// FILTERING
// =============================================================================

/// Story filter derived from the sidebar's two severity toggles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// No toggle active: every story passes.
    #[default]
    None,
    /// Only stories carrying at least one warning entry.
    Warnings,
    /// Only stories carrying at least one error entry.
    Errors,
    /// Stories carrying at least one warning or error entry.
    Both,
}

impl StatusFilter {
    /// Filter matching the given toggle states.
    #[must_use]
    pub fn from_toggles(warnings: bool, errors: bool) -> Self {
        match (warnings, errors) {
            (true, true) => Self::Both,
            (true, false) => Self::Warnings,
            (false, true) => Self::Errors,
            (false, false) => Self::None,
        }
    }

    /// Whether a story with these status entries stays visible.
    #[must_use]
    pub fn allows(self, statuses: &StatusByAddon) -> bool {
        match self {
            Self::None => true,
            Self::Warnings => has_status(statuses, StatusValue::Warn),
            Self::Errors => has_status(statuses, StatusValue::Error),
            Self::Both => {
                has_status(statuses, StatusValue::Warn)
                    || has_status(statuses, StatusValue::Error)
            }
        }
    }
}

fn has_status(statuses: &StatusByAddon, value: StatusValue) -> bool {
    statuses.values().any(|entry| entry.status == value)
}

/// Number of stories carrying at least one warning entry.
#[must_use]
pub fn warning_count(map: &StatusMap) -> usize {
    map.values()
        .filter(|statuses| has_status(statuses, StatusValue::Warn))
        .count()
}

/// Number of stories carrying at least one error entry.
#[must_use]
pub fn error_count(map: &StatusMap) -> usize {
    map.values()
        .filter(|statuses| has_status(statuses, StatusValue::Error))
        .count()
}

// =============================================================================
// REPORTER MAPPING
// =============================================================================

/// Sidebar severity for a reporter outcome.
#[must_use]
pub fn report_status_value(status: ReportStatus) -> StatusValue {
    match status {
        ReportStatus::Failed => StatusValue::Error,
        ReportStatus::Passed => StatusValue::Success,
        ReportStatus::Warning => StatusValue::Warn,
        ReportStatus::Pending => StatusValue::Pending,
    }
}

/// Derive the accessibility status entry from a finished story's reporter
/// list. `None` when no accessibility reporter ran for the story.
#[must_use]
pub fn status_from_reporters(
    reports: &[Report],
    test_run_id: Option<Uuid>,
) -> Option<StoryStatus> {
    let report = reports.iter().find(|report| report.id == ADDON_ID)?;
    Some(StoryStatus {
        title: STATUS_TITLE.to_owned(),
        status: report_status_value(report.status),
        test_run_id,
    })
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
