//! Host session state: which story is active and with what parameters.
//!
//! DESIGN
//! ======
//! A watch channel holding the latest selection. The bridge keeps a
//! receiver and folds every change into the panel; the host (or a test)
//! drives the sender side. Late subscribers immediately observe the
//! current value, so the bridge never misses the selection that existed
//! before it started.

use tokio::sync::watch;

use events::A11yParameters;

/// Active story plus its resolved addon parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Identifier of the story under test, if one is selected.
    pub story_id: Option<String>,
    /// Addon parameters the host resolved for that story.
    pub parameters: A11yParameters,
}

/// Handle the host uses to publish story selection changes.
#[derive(Clone, Debug)]
pub struct SessionState {
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self { tx }
    }

    /// Make `story_id` the active story with the given parameters.
    pub fn select_story(&self, story_id: impl Into<String>, parameters: A11yParameters) {
        self.publish(SessionSnapshot {
            story_id: Some(story_id.into()),
            parameters,
        });
    }

    /// Drop the active story, e.g. when the preview navigates away.
    pub fn clear_story(&self) {
        self.publish(SessionSnapshot::default());
    }

    /// Current selection.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to selection changes. The receiver starts out already
    /// holding the current value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        // send_if_modified keeps no-op republishes from waking the bridge.
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
