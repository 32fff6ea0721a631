//! Aggregate panel state: run status, results, error, and highlights for
//! the active story.
//!
//! DESIGN
//! ======
//! Operations are pure business logic. They validate, mutate state, and
//! return an [`Effects`] value; the bridge owns all outbound concerns:
//! channel emission, persistence, and settle scheduling. Handlers never
//! touch the channel or the store directly.
//!
//! Every run-state transition bumps an epoch counter. The deferred settle
//! captures the epoch at schedule time and is applied only if it still
//! matches, so a settle can never overwrite a newer status.
//!
//! Results and status move together inside one `&mut self` call, so no
//! reader can observe `Ran` paired with the previous run's findings.

use serde::Serialize;
use serde_json::Value;

use events::{A11yParameters, AuditResults, HighlightPayload, ManualPayload};

use crate::state::highlight::HighlightState;
use crate::state::run::{RunStatus, SettleToken};

/// Side effects requested by a panel operation. The bridge applies them;
/// a default value means the operation changed nothing observable outside
/// the panel.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    /// Send the current selection to the preview-side painter.
    pub highlight: Option<HighlightPayload>,
    /// Emit a manual-run request on the channel.
    pub manual: Option<ManualPayload>,
    /// Results changed; write them through to the persisted addon slot.
    pub persist: bool,
    /// Schedule a deferred settle carrying this token.
    pub settle: Option<SettleToken>,
}

/// Read-only view handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub results: AuditResults,
    pub highlighted: Vec<String>,
    pub tab: usize,
    pub status: RunStatus,
    pub error: Option<Value>,
}

/// All panel-side state for the accessibility addon.
#[derive(Clone, Debug, Default)]
pub struct PanelState {
    story_id: Option<String>,
    parameters: A11yParameters,
    results: AuditResults,
    status: RunStatus,
    error: Option<Value>,
    highlight: HighlightState,
    epoch: u64,
}

impl PanelState {
    /// Panel for the given story and its resolved parameters.
    #[must_use]
    pub fn new(story_id: Option<String>, parameters: A11yParameters) -> Self {
        let status = RunStatus::entry(parameters.manual);
        Self {
            story_id,
            parameters,
            status,
            ..Self::default()
        }
    }

    // =========================================================================
    // RUN LIFECYCLE
    // =========================================================================

    /// The active story entered a new load phase: drop the previous run's
    /// results and error and re-arm the machine. Automatic mode goes
    /// straight to `Running`; manual mode waits for the user. Highlights
    /// are left alone.
    pub fn reset(&mut self) -> Effects {
        self.results = AuditResults::default();
        self.error = None;
        self.set_run_status(RunStatus::after_reset(self.parameters.manual));
        Effects {
            persist: true,
            ..Effects::default()
        }
    }

    /// A run finished for `for_story`. Results from a story that is no
    /// longer active are discarded wholesale.
    ///
    /// On a match the results are replaced, status moves to `Ran`, and a
    /// settle is scheduled. Reporting again while already `Ran` re-enters
    /// the state and restarts the settle window.
    pub fn report_result(&mut self, results: AuditResults, for_story: &str) -> Effects {
        if self.story_id.as_deref() != Some(for_story) {
            return Effects::default();
        }

        self.results = results;
        self.set_run_status(RunStatus::Ran);
        Effects {
            persist: true,
            settle: Some(SettleToken { epoch: self.epoch }),
            ..Effects::default()
        }
    }

    /// A run failed. Errors carry no story id and are accepted
    /// unconditionally, unlike results; see the module docs in
    /// [`crate::bridge`] for the asymmetry. Results from the previous run
    /// stay in place until the next reset.
    pub fn report_error(&mut self, error: Value) -> Effects {
        self.error = Some(error);
        self.set_run_status(RunStatus::Error);
        Effects::default()
    }

    /// User asked for a run. Meaningful only while `Manual`, but callers
    /// are trusted on that; the only hard gate is having an active story
    /// to run against.
    pub fn trigger_manual(&mut self) -> Effects {
        let Some(story_id) = self.story_id.clone() else {
            return Effects::default();
        };

        self.set_run_status(RunStatus::Running);
        Effects {
            manual: Some(ManualPayload {
                story_id,
                parameters: self.parameters.clone(),
            }),
            ..Effects::default()
        }
    }

    /// Direct status override from the renderer.
    pub fn set_status(&mut self, status: RunStatus) -> Effects {
        self.set_run_status(status);
        Effects::default()
    }

    /// Apply a deferred settle. Returns true when it landed; a stale token
    /// or a status other than `Ran` makes it a silent no-op.
    pub fn settle(&mut self, token: SettleToken) -> bool {
        if self.status != RunStatus::Ran || token.epoch != self.epoch {
            return false;
        }
        self.set_run_status(RunStatus::Ready);
        true
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Adopt the host's current story and its resolved parameters. A flip
    /// of the `manual` parameter re-enters the matching entry status; a
    /// story change alone does not, since the load phase of the new story
    /// resets the machine separately.
    pub fn sync_session(
        &mut self,
        story_id: Option<String>,
        parameters: A11yParameters,
    ) -> Effects {
        let manual_changed = self.parameters.manual != parameters.manual;
        self.story_id = story_id;
        self.parameters = parameters;
        if manual_changed {
            self.set_run_status(RunStatus::entry(self.parameters.manual));
        }
        Effects::default()
    }

    /// Seed results restored from the persisted addon slot. Touches
    /// neither status nor epoch.
    pub fn restore_results(&mut self, results: AuditResults) {
        self.results = results;
    }

    // =========================================================================
    // HIGHLIGHTS
    // =========================================================================

    /// Add or remove a batch of highlighted element identifiers.
    pub fn toggle_highlight(&mut self, targets: &[String], add: bool) -> Effects {
        Effects {
            highlight: self.highlight.toggle(targets, add),
            ..Effects::default()
        }
    }

    /// Drop every highlighted element.
    pub fn clear_highlights(&mut self) -> Effects {
        Effects {
            highlight: self.highlight.clear(),
            ..Effects::default()
        }
    }

    /// Switch the finding-category tab, clearing highlights first.
    pub fn set_tab(&mut self, index: usize) -> Effects {
        Effects {
            highlight: self.highlight.set_tab(index),
            ..Effects::default()
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            results: self.results.clone(),
            highlighted: self.highlight.elements(),
            tab: self.highlight.tab(),
            status: self.status,
            error: self.error.clone(),
        }
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn results(&self) -> &AuditResults {
        &self.results
    }

    #[must_use]
    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn story_id(&self) -> Option<&str> {
        self.story_id.as_deref()
    }

    #[must_use]
    pub fn parameters(&self) -> &A11yParameters {
        &self.parameters
    }

    // Only run-state transitions go through here. Highlight and tab
    // changes must not bump the epoch or they would cancel a pending
    // settle.
    fn set_run_status(&mut self, status: RunStatus) {
        self.status = status;
        self.epoch += 1;
    }
}

#[cfg(test)]
#[path = "panel_test.rs"]
mod tests;
