//! Preview-side audit runner.
//!
//! DESIGN
//! ======
//! The preview half of the addon: listens for run requests on the channel,
//! invokes the injected audit engine, and publishes the outcome back as
//! result or error events for the panel bridge to consume. The engine
//! itself is an external collaborator behind [`AuditEngine`], so tests run
//! against a scripted fake.
//!
//! Two triggers start a run:
//! - a `ManualRun` request from the panel, carrying its own parameters;
//! - the active story's render phase reaching `completed`, when that
//!   story is neither `manual` nor `disable`d.
//!
//! Runs execute one at a time in arrival order; a story is never audited
//! by two overlapping engine invocations.
//!
//! ERROR HANDLING
//! ==============
//! Engine failures do not stop the runner. They are logged and forwarded
//! as an opaque `{ "message": ... }` error payload; the panel collapses
//! every failure into its single run-failed state.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use events::{A11yParameters, AuditResults, ErrorPayload, Event, RenderPhase, ResultPayload};

use crate::host::{MemoryChannel, SessionSnapshot, SessionState};

// =============================================================================
// ENGINE
// =============================================================================

/// One audit invocation.
#[derive(Clone, Debug)]
pub struct AuditRequest {
    /// Story the audit runs against.
    pub story_id: String,
    /// Fresh identifier for this invocation, for log correlation.
    pub run_id: Uuid,
    /// Engine configuration resolved for the story.
    pub parameters: A11yParameters,
}

/// Errors produced by an audit engine invocation.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The scope selector did not match anything in the preview.
    #[error("audit scope not found: {0}")]
    ScopeNotFound(String),
    /// The engine rejected the supplied rule configuration.
    #[error("invalid audit configuration: {0}")]
    InvalidConfig(String),
    /// The engine itself failed while auditing.
    #[error("audit engine failed: {0}")]
    Engine(String),
}

/// Engine-neutral async trait for running one audit. Enables mocking in
/// tests; production hosts adapt their real engine behind it.
#[async_trait::async_trait]
pub trait AuditEngine: Send + Sync {
    /// Run the audit described by `request`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditError`] when the scope cannot be resolved, the
    /// configuration is rejected, or the engine fails mid-run.
    async fn run(&self, request: &AuditRequest) -> Result<AuditResults, AuditError>;
}

// =============================================================================
// RUNNER
// =============================================================================

/// The runner task state. Constructed and consumed by [`AuditRunner::spawn`].
pub struct AuditRunner {
    channel: MemoryChannel,
    session: watch::Receiver<SessionSnapshot>,
    engine: Arc<dyn AuditEngine>,
}

impl AuditRunner {
    /// Start the runner task. Subscribes to the channel before the task
    /// starts, so no request published after this call is missed. The
    /// task runs until aborted.
    pub fn spawn(
        channel: MemoryChannel,
        session: &SessionState,
        engine: Arc<dyn AuditEngine>,
    ) -> JoinHandle<()> {
        let events = channel.subscribe();
        let runner = Self {
            channel,
            session: session.subscribe(),
            engine,
        };
        tokio::spawn(runner.run(events))
    }

    async fn run(self, mut events: broadcast::Receiver<Event>) {
        info!("runner: started");
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "runner: event stream lagged, continuing");
                }
                Err(RecvError::Closed) => {
                    info!("runner: event channel closed, stopping");
                    break;
                }
            }
        }
    }

    async fn handle_event(&self, event: Event) {
        match event {
            Event::ManualRun(payload) => {
                if payload.parameters.disable {
                    debug!(story_id = %payload.story_id, "runner: story disabled, manual run skipped");
                    return;
                }
                self.run_audit(payload.story_id, payload.parameters).await;
            }
            Event::PhaseChanged(payload) => {
                if payload.new_phase == RenderPhase::Completed {
                    self.maybe_auto_run(&payload.story_id).await;
                }
            }
            // Results, errors, and highlights loop back through the
            // shared channel.
            Event::RunResult(_) | Event::RunError(_) | Event::StoryFinished(_) | Event::Highlight(_) => {}
        }
    }

    /// Automatic trigger: audit the story that just finished rendering,
    /// unless it is inactive, manually triggered, or disabled.
    async fn maybe_auto_run(&self, story_id: &str) {
        let SessionSnapshot { story_id: active, parameters } = self.session.borrow().clone();
        if active.as_deref() != Some(story_id) {
            debug!(story_id, "runner: completed phase for inactive story ignored");
            return;
        }
        if parameters.manual || parameters.disable {
            return;
        }
        self.run_audit(story_id.to_owned(), parameters).await;
    }

    async fn run_audit(&self, story_id: String, parameters: A11yParameters) {
        let request = AuditRequest {
            story_id,
            run_id: Uuid::new_v4(),
            parameters,
        };
        info!(story_id = %request.story_id, run_id = %request.run_id, "runner: audit started");

        match self.engine.run(&request).await {
            Ok(results) => {
                info!(
                    run_id = %request.run_id,
                    violations = results.violations.len(),
                    passes = results.passes.len(),
                    incomplete = results.incomplete.len(),
                    "runner: audit finished",
                );
                self.channel.emit(Event::RunResult(ResultPayload {
                    results,
                    story_id: request.story_id,
                }));
            }
            Err(e) => {
                warn!(run_id = %request.run_id, error = %e, "runner: audit failed");
                self.channel.emit(Event::RunError(ErrorPayload {
                    error: json!({ "message": e.to_string() }),
                }));
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
