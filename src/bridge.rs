//! Event bridge between the addon channel and the panel state machine.
//!
//! DESIGN
//! ======
//! One task owns the whole panel state and enters a `select!` loop:
//! - Inbound channel events: results, errors, phase changes, story reports
//! - Renderer commands from [`PanelHandle`]: highlights, tab, status, manual
//! - Host session changes: active story and its parameters
//!
//! Handlers are pure business logic. They mutate [`PanelState`] and return
//! an [`Effects`] value; the loop owns all outbound concerns: highlight
//! emission, manual-run requests, persistence, settle scheduling, and
//! snapshot publication. A scheduled settle is never cancelled; it fires
//! through the same mailbox as commands and is dropped at apply time when
//! its epoch token is stale.
//!
//! ERROR HANDLING
//! ==============
//! Runs have exactly one failure kind, "run failed" with an opaque
//! payload, surfaced as [`RunStatus::Error`] until the next reset. A
//! malformed accessibility report collapses into the same failure. Result
//! events are filtered by the active story id; error events carry no
//! story id on the channel and are accepted unconditionally.
//!
//! LIFECYCLE
//! =========
//! 1. Spawn: adopt the host session, restore persisted results, subscribe
//! 2. Loop: events, commands, and session changes in arrival order
//! 3. Results: `Ran` immediately, `Ready` after the settle delay if no
//!    newer transition intervened
//! 4. Stop: every panel handle dropped, or the event channel closed

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use events::{ADDON_ID, AuditResults, Event, FinishedPayload, RenderPhase};

use crate::host::store::{AddonStore, load_json, save_json};
use crate::host::{MemoryChannel, SessionSnapshot, SessionState};
use crate::state::panel::{Effects, PanelSnapshot, PanelState};
use crate::state::run::{RUN_SETTLE_DELAY, RunStatus, SettleToken};

const DEFAULT_SETTLE_MS: u64 = 900;
const DEFAULT_MAILBOX_CAPACITY: usize = 32;

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// CONFIG
// =============================================================================

/// Tunables for the bridge task.
#[derive(Clone, Copy, Debug)]
pub struct BridgeConfig {
    /// Delay between `Ran` and the deferred settle into `Ready`.
    pub settle_delay: Duration,
    /// Capacity of the renderer command mailbox.
    pub mailbox_capacity: usize,
}

impl BridgeConfig {
    /// Read `A11Y_SETTLE_MS` and `A11Y_MAILBOX_CAPACITY` from the
    /// environment, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            settle_delay: Duration::from_millis(env_parse("A11Y_SETTLE_MS", DEFAULT_SETTLE_MS)),
            mailbox_capacity: env_parse("A11Y_MAILBOX_CAPACITY", DEFAULT_MAILBOX_CAPACITY),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            settle_delay: RUN_SETTLE_DELAY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

// =============================================================================
// COMMANDS AND HANDLE
// =============================================================================

/// Mutations the renderer can request. Settles arrive through the same
/// mailbox so every state change is serialized in one place.
#[derive(Clone, Debug)]
pub enum Command {
    ToggleHighlight { targets: Vec<String>, add: bool },
    ClearHighlights,
    SetTab(usize),
    SetStatus(RunStatus),
    TriggerManual,
    Settle(SettleToken),
}

/// The bridge task is gone; commands have nowhere to go.
#[derive(Debug, thiserror::Error)]
#[error("bridge task is no longer running")]
pub struct BridgeClosed;

/// Cloneable renderer-facing handle: command submission plus a watch on
/// the latest [`PanelSnapshot`]. Dropping every handle stops the bridge.
#[derive(Clone, Debug)]
pub struct PanelHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<PanelSnapshot>,
}

impl PanelHandle {
    /// Add or remove a batch of highlighted element identifiers.
    pub async fn toggle_highlight(&self, targets: Vec<String>, add: bool) -> Result<(), BridgeClosed> {
        self.send(Command::ToggleHighlight { targets, add }).await
    }

    /// Drop every highlighted element.
    pub async fn clear_highlights(&self) -> Result<(), BridgeClosed> {
        self.send(Command::ClearHighlights).await
    }

    /// Switch the finding-category tab, clearing highlights first.
    pub async fn set_tab(&self, index: usize) -> Result<(), BridgeClosed> {
        self.send(Command::SetTab(index)).await
    }

    /// Override the run status directly.
    pub async fn set_status(&self, status: RunStatus) -> Result<(), BridgeClosed> {
        self.send(Command::SetStatus(status)).await
    }

    /// Request a manual run for the active story.
    pub async fn trigger_manual(&self) -> Result<(), BridgeClosed> {
        self.send(Command::TriggerManual).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: Command) -> Result<(), BridgeClosed> {
        self.commands.send(command).await.map_err(|_| BridgeClosed)
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

/// The bridge task state. Constructed and consumed by [`Bridge::spawn`].
pub struct Bridge {
    panel: PanelState,
    channel: MemoryChannel,
    store: Arc<dyn AddonStore>,
    snapshots: watch::Sender<PanelSnapshot>,
    // Weak so the task's own settle scheduling never keeps the mailbox
    // open after the last handle is gone.
    commands: mpsc::WeakSender<Command>,
    settle_delay: Duration,
}

impl Bridge {
    /// Start the bridge task and return the renderer-facing handle.
    ///
    /// Adopts the current host session, restores any persisted results
    /// for [`ADDON_ID`], and subscribes to the channel before the task
    /// starts, so no event published after this call is missed.
    #[must_use]
    pub fn spawn(
        channel: MemoryChannel,
        store: Arc<dyn AddonStore>,
        session: &SessionState,
        config: BridgeConfig,
    ) -> PanelHandle {
        let (command_tx, command_rx) = mpsc::channel(config.mailbox_capacity);
        let events = channel.subscribe();
        let session_rx = session.subscribe();

        let current = session.snapshot();
        let mut panel = PanelState::new(current.story_id, current.parameters);
        if let Some(results) = load_json::<AuditResults>(store.as_ref(), ADDON_ID) {
            panel.restore_results(results);
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(panel.snapshot());

        let bridge = Self {
            panel,
            channel,
            store,
            snapshots: snapshot_tx,
            commands: command_tx.downgrade(),
            settle_delay: config.settle_delay,
        };
        tokio::spawn(bridge.run(events, command_rx, session_rx));

        PanelHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(
        mut self,
        mut events: broadcast::Receiver<Event>,
        mut commands: mpsc::Receiver<Command>,
        mut session: watch::Receiver<SessionSnapshot>,
    ) {
        info!(story_id = ?self.panel.story_id(), "bridge: started");
        let mut session_open = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bridge: event stream lagged, continuing");
                    }
                    Err(RecvError::Closed) => {
                        info!("bridge: event channel closed, stopping");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("bridge: all panel handles dropped, stopping");
                        break;
                    }
                },
                changed = session.changed(), if session_open => match changed {
                    Ok(()) => {
                        let SessionSnapshot { story_id, parameters } = session.borrow_and_update().clone();
                        debug!(story_id = ?story_id, "bridge: session changed");
                        let effects = self.panel.sync_session(story_id, parameters);
                        self.apply(effects);
                    }
                    Err(_) => {
                        debug!("bridge: session state dropped, keeping last selection");
                        session_open = false;
                    }
                },
            }
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::RunResult(payload) => {
                let effects = self.panel.report_result(payload.results, &payload.story_id);
                if effects.persist {
                    debug!(story_id = %payload.story_id, "bridge: results received");
                } else {
                    debug!(story_id = %payload.story_id, "bridge: result for inactive story discarded");
                }
                self.apply(effects);
            }
            Event::RunError(payload) => {
                warn!("bridge: run failed");
                let effects = self.panel.report_error(payload.error);
                self.apply(effects);
            }
            Event::PhaseChanged(payload) => {
                if payload.new_phase == RenderPhase::Loading {
                    debug!(story_id = %payload.story_id, "bridge: story loading, run state reset");
                    let effects = self.panel.reset();
                    self.apply(effects);
                }
            }
            Event::StoryFinished(payload) => self.handle_story_finished(payload),
            // Outbound kinds loop back through the shared channel.
            Event::ManualRun(_) | Event::Highlight(_) => {}
        }
    }

    fn handle_story_finished(&mut self, payload: FinishedPayload) {
        let Some(report) = payload.reporters.into_iter().find(|r| r.id == ADDON_ID) else {
            return;
        };

        let effects = if let Some(error) = report.result.get("error") {
            warn!(story_id = %payload.story_id, "bridge: story report carried a run failure");
            self.panel.report_error(error.clone())
        } else {
            match serde_json::from_value::<AuditResults>(report.result) {
                Ok(results) => self.panel.report_result(results, &payload.story_id),
                Err(e) => {
                    warn!(error = %e, "bridge: malformed accessibility report treated as run failure");
                    self.panel
                        .report_error(Value::String(format!("invalid accessibility report: {e}")))
                }
            }
        };
        self.apply(effects);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ToggleHighlight { targets, add } => {
                let effects = self.panel.toggle_highlight(&targets, add);
                self.apply(effects);
            }
            Command::ClearHighlights => {
                let effects = self.panel.clear_highlights();
                self.apply(effects);
            }
            Command::SetTab(index) => {
                let effects = self.panel.set_tab(index);
                self.apply(effects);
            }
            Command::SetStatus(status) => {
                let effects = self.panel.set_status(status);
                self.apply(effects);
            }
            Command::TriggerManual => {
                let effects = self.panel.trigger_manual();
                if effects.manual.is_none() {
                    debug!("bridge: manual run requested without an active story");
                }
                self.apply(effects);
            }
            Command::Settle(token) => {
                if self.panel.settle(token) {
                    debug!("bridge: results settled");
                    self.publish_snapshot();
                } else {
                    debug!("bridge: stale settle dropped");
                }
            }
        }
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    fn apply(&mut self, effects: Effects) {
        if let Some(payload) = effects.highlight {
            self.channel.emit(Event::Highlight(payload));
        }
        if let Some(payload) = effects.manual {
            info!(story_id = %payload.story_id, "bridge: manual run requested");
            self.channel.emit(Event::ManualRun(payload));
        }
        if effects.persist {
            save_json(self.store.as_ref(), ADDON_ID, self.panel.results());
        }
        if let Some(token) = effects.settle {
            self.schedule_settle(token);
        }
        self.publish_snapshot();
    }

    fn schedule_settle(&self, token: SettleToken) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::Settle(token)).await;
        });
    }

    fn publish_snapshot(&self) {
        let next = self.panel.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
