use super::*;
use events::Finding;
use serde_json::json;

fn automatic_panel(story: &str) -> PanelState {
    PanelState::new(Some(story.to_owned()), A11yParameters::default())
}

fn manual_panel(story: &str) -> PanelState {
    let parameters = A11yParameters {
        manual: true,
        ..A11yParameters::default()
    };
    PanelState::new(Some(story.to_owned()), parameters)
}

fn violations(ids: &[&str]) -> AuditResults {
    AuditResults {
        violations: ids
            .iter()
            .map(|id| Finding {
                id: (*id).to_owned(),
                ..Finding::default()
            })
            .collect(),
        ..AuditResults::default()
    }
}

fn targets(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_owned()).collect()
}

// =============================================================================
// ENTRY AND RESET
// =============================================================================

#[test]
fn new_panel_enters_initial_or_manual() {
    assert_eq!(automatic_panel("button--primary").status(), RunStatus::Initial);
    assert_eq!(manual_panel("button--primary").status(), RunStatus::Manual);
}

#[test]
fn reset_enters_running_in_automatic_mode() {
    let mut panel = automatic_panel("button--primary");
    let effects = panel.reset();

    assert_eq!(panel.status(), RunStatus::Running);
    assert!(panel.results().is_empty());
    assert!(effects.persist);
    assert!(effects.settle.is_none());
}

#[test]
fn reset_enters_manual_when_story_requires_it() {
    let mut panel = manual_panel("button--primary");
    panel.reset();
    assert_eq!(panel.status(), RunStatus::Manual);
}

#[test]
fn reset_clears_error_and_results() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    panel.report_error(json!("engine exploded"));
    panel.report_result(violations(&["image-alt"]), "button--primary");

    panel.reset();

    assert_eq!(panel.status(), RunStatus::Running);
    assert!(panel.error().is_none());
    assert!(panel.results().is_empty());
}

// =============================================================================
// RESULTS AND STALENESS
// =============================================================================

#[test]
fn matching_result_replaces_results_and_enters_ran() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();

    let effects = panel.report_result(violations(&["image-alt"]), "button--primary");

    assert_eq!(panel.status(), RunStatus::Ran);
    assert_eq!(panel.results().violations.len(), 1);
    assert!(effects.persist);
    assert!(effects.settle.is_some());
}

#[test]
fn result_for_another_story_changes_nothing() {
    let mut panel = automatic_panel("X");
    panel.reset();

    let effects = panel.report_result(violations(&["image-alt"]), "Y");

    assert_eq!(effects, Effects::default());
    assert_eq!(panel.status(), RunStatus::Running);
    assert!(panel.results().is_empty());
    assert!(panel.error().is_none());
}

#[test]
fn result_without_an_active_story_is_discarded() {
    let mut panel = PanelState::new(None, A11yParameters::default());
    let effects = panel.report_result(violations(&["image-alt"]), "button--primary");

    assert_eq!(effects, Effects::default());
    assert_eq!(panel.status(), RunStatus::Initial);
}

// =============================================================================
// SETTLE
// =============================================================================

#[test]
fn settle_lands_when_nothing_intervened() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();

    assert!(panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Ready);
}

#[test]
fn settle_is_dropped_after_a_reset() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();

    panel.reset();

    assert!(!panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Running);
}

#[test]
fn settle_is_dropped_after_an_error() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();

    panel.report_error(json!("engine exploded"));

    assert!(!panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Error);
}

#[test]
fn reporting_again_restarts_the_settle_window() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let first = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();
    let second = panel
        .report_result(violations(&["label"]), "button--primary")
        .settle
        .unwrap();

    assert_eq!(panel.status(), RunStatus::Ran);
    assert!(!panel.settle(first));
    assert!(panel.settle(second));
    assert_eq!(panel.status(), RunStatus::Ready);
}

#[test]
fn settle_ignores_a_status_override() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();

    panel.set_status(RunStatus::Running);

    assert!(!panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Running);
}

#[test]
fn highlight_changes_keep_the_settle_window_open() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();

    panel.toggle_highlight(&targets(&["#a"]), true);
    panel.set_tab(2);

    assert!(panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Ready);
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn error_is_stored_until_the_next_reset() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();

    panel.report_error(json!({ "message": "engine exploded" }));
    assert_eq!(panel.status(), RunStatus::Error);
    assert_eq!(panel.error(), Some(&json!({ "message": "engine exploded" })));

    panel.reset();
    assert_eq!(panel.status(), RunStatus::Running);
    assert!(panel.error().is_none());
}

#[test]
fn errors_are_accepted_even_for_stale_stories() {
    // Errors carry no story id so they pass no staleness gate.
    let mut panel = automatic_panel("X");
    panel.reset();

    panel.report_error(json!("late failure from Y"));
    assert_eq!(panel.status(), RunStatus::Error);
}

#[test]
fn matching_result_keeps_a_previous_error_until_reset() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    panel.report_error(json!("first run failed"));

    panel.report_result(violations(&["image-alt"]), "button--primary");

    assert_eq!(panel.status(), RunStatus::Ran);
    assert!(panel.error().is_some());
}

// =============================================================================
// MANUAL TRIGGER
// =============================================================================

#[test]
fn manual_trigger_enters_running_and_requests_a_run() {
    let mut panel = manual_panel("button--primary");
    let effects = panel.trigger_manual();

    assert_eq!(panel.status(), RunStatus::Running);
    let manual = effects.manual.unwrap();
    assert_eq!(manual.story_id, "button--primary");
    assert!(manual.parameters.manual);
}

#[test]
fn manual_trigger_without_a_story_is_a_noop() {
    let parameters = A11yParameters {
        manual: true,
        ..A11yParameters::default()
    };
    let mut panel = PanelState::new(None, parameters);

    let effects = panel.trigger_manual();

    assert_eq!(effects, Effects::default());
    assert_eq!(panel.status(), RunStatus::Manual);
}

// =============================================================================
// SESSION
// =============================================================================

#[test]
fn manual_parameter_flip_reenters_entry_status() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();

    panel.sync_session(
        Some("button--primary".to_owned()),
        A11yParameters {
            manual: true,
            ..A11yParameters::default()
        },
    );
    assert_eq!(panel.status(), RunStatus::Manual);

    panel.sync_session(Some("button--primary".to_owned()), A11yParameters::default());
    assert_eq!(panel.status(), RunStatus::Initial);
}

#[test]
fn story_change_alone_keeps_the_current_status() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();

    panel.sync_session(Some("card--default".to_owned()), A11yParameters::default());

    assert_eq!(panel.status(), RunStatus::Running);
    assert_eq!(panel.story_id(), Some("card--default"));
}

#[test]
fn restored_results_do_not_move_the_machine() {
    let mut panel = automatic_panel("button--primary");
    panel.restore_results(violations(&["image-alt"]));

    assert_eq!(panel.status(), RunStatus::Initial);
    assert_eq!(panel.results().violations.len(), 1);
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[test]
fn snapshot_reflects_every_tracked_field() {
    let mut panel = automatic_panel("button--primary");
    panel.reset();
    panel.report_result(violations(&["image-alt"]), "button--primary");
    panel.toggle_highlight(&targets(&["#a", "#b"]), true);
    panel.set_tab(0);

    let snapshot = panel.snapshot();
    assert_eq!(snapshot.status, RunStatus::Ran);
    assert_eq!(snapshot.results.violations.len(), 1);
    assert!(snapshot.highlighted.is_empty());
    assert_eq!(snapshot.tab, 0);
    assert!(snapshot.error.is_none());
}

#[test]
fn full_automatic_run_reaches_ready() {
    let mut panel = automatic_panel("button--primary");
    assert_eq!(panel.status(), RunStatus::Initial);

    panel.reset();
    assert_eq!(panel.status(), RunStatus::Running);

    let token = panel
        .report_result(violations(&["image-alt"]), "button--primary")
        .settle
        .unwrap();
    assert_eq!(panel.status(), RunStatus::Ran);
    assert_eq!(panel.results().violations[0].id, "image-alt");

    assert!(panel.settle(token));
    assert_eq!(panel.status(), RunStatus::Ready);
}
