use super::*;
use std::sync::Mutex;
use std::time::Duration;

use events::{Finding, ManualPayload, PhasePayload};

struct ScriptedEngine {
    outcomes: Mutex<Vec<Result<AuditResults, AuditError>>>,
    requests: Mutex<Vec<AuditRequest>>,
}

impl ScriptedEngine {
    fn new(outcomes: Vec<Result<AuditResults, AuditError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<AuditRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuditEngine for ScriptedEngine {
    async fn run(&self, request: &AuditRequest) -> Result<AuditResults, AuditError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Ok(AuditResults::default())
        } else {
            outcomes.remove(0)
        }
    }
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

fn manual_event(story: &str, parameters: A11yParameters) -> Event {
    Event::ManualRun(ManualPayload {
        story_id: story.to_owned(),
        parameters,
    })
}

fn completed_event(story: &str) -> Event {
    Event::PhaseChanged(PhasePayload {
        story_id: story.to_owned(),
        new_phase: RenderPhase::Completed,
    })
}

async fn next_run_outcome(rx: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await.expect("channel closed") {
                event @ (Event::RunResult(_) | Event::RunError(_)) => return event,
                _ => {}
            }
        }
    })
    .await
    .expect("timed out waiting for a run outcome")
}

// =============================================================================
// MANUAL RUNS
// =============================================================================

#[tokio::test]
async fn manual_request_runs_the_engine_and_emits_results() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    let engine = ScriptedEngine::new(vec![Ok(violations(&["image-alt"]))]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    let parameters = A11yParameters {
        manual: true,
        ..A11yParameters::default()
    };
    channel.emit(manual_event("button--primary", parameters));

    let Event::RunResult(payload) = next_run_outcome(&mut outcomes).await else {
        panic!("expected a result event");
    };
    assert_eq!(payload.story_id, "button--primary");
    assert_eq!(payload.results.violations[0].id, "image-alt");

    let requests = engine.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].story_id, "button--primary");
    assert!(requests[0].parameters.manual);
    task.abort();
}

#[tokio::test]
async fn disabled_story_skips_manual_runs() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    let engine = ScriptedEngine::new(vec![]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    let disabled = A11yParameters {
        manual: true,
        disable: true,
        ..A11yParameters::default()
    };
    channel.emit(manual_event("button--primary", disabled));
    channel.emit(manual_event("card--default", A11yParameters::default()));

    // The sentinel run for the second story proves the first was skipped.
    let Event::RunResult(payload) = next_run_outcome(&mut outcomes).await else {
        panic!("expected a result event");
    };
    assert_eq!(payload.story_id, "card--default");
    assert_eq!(engine.requests().len(), 1);
    task.abort();
}

#[tokio::test]
async fn engine_failure_becomes_an_error_event() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    let engine = ScriptedEngine::new(vec![Err(AuditError::Engine("selector crashed".into()))]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine);

    channel.emit(manual_event("button--primary", A11yParameters::default()));

    let Event::RunError(payload) = next_run_outcome(&mut outcomes).await else {
        panic!("expected an error event");
    };
    assert_eq!(
        payload.error,
        json!({ "message": "audit engine failed: selector crashed" })
    );
    task.abort();
}

// =============================================================================
// AUTOMATIC RUNS
// =============================================================================

#[tokio::test]
async fn completed_phase_triggers_an_automatic_run() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    session.select_story("button--primary", A11yParameters::default());
    let engine = ScriptedEngine::new(vec![Ok(violations(&["label"]))]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    channel.emit(completed_event("button--primary"));

    let Event::RunResult(payload) = next_run_outcome(&mut outcomes).await else {
        panic!("expected a result event");
    };
    assert_eq!(payload.story_id, "button--primary");
    assert!(!engine.requests()[0].parameters.manual);
    task.abort();
}

#[tokio::test]
async fn completed_phase_for_an_inactive_story_is_ignored() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    session.select_story("button--primary", A11yParameters::default());
    let engine = ScriptedEngine::new(vec![]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    channel.emit(completed_event("card--default"));
    channel.emit(completed_event("button--primary"));

    let Event::RunResult(payload) = next_run_outcome(&mut outcomes).await else {
        panic!("expected a result event");
    };
    assert_eq!(payload.story_id, "button--primary");
    assert_eq!(engine.requests().len(), 1);
    task.abort();
}

#[tokio::test]
async fn manual_stories_do_not_run_automatically() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    let manual = A11yParameters {
        manual: true,
        ..A11yParameters::default()
    };
    session.select_story("button--primary", manual.clone());
    let engine = ScriptedEngine::new(vec![]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    channel.emit(completed_event("button--primary"));
    channel.emit(manual_event("button--primary", manual));

    let Event::RunResult(_) = next_run_outcome(&mut outcomes).await else {
        panic!("expected a result event");
    };
    assert_eq!(engine.requests().len(), 1);
    assert!(engine.requests()[0].parameters.manual);
    task.abort();
}

#[tokio::test]
async fn each_run_gets_a_fresh_run_id() {
    let channel = MemoryChannel::default();
    let session = SessionState::new();
    let engine = ScriptedEngine::new(vec![]);
    let mut outcomes = channel.subscribe();
    let task = AuditRunner::spawn(channel.clone(), &session, engine.clone());

    channel.emit(manual_event("button--primary", A11yParameters::default()));
    next_run_outcome(&mut outcomes).await;
    channel.emit(manual_event("button--primary", A11yParameters::default()));
    next_run_outcome(&mut outcomes).await;

    let requests = engine.requests();
    assert_ne!(requests[0].run_id, requests[1].run_id);
    task.abort();
}
