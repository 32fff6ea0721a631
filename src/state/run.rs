//! Run lifecycle vocabulary for one audit of the active story.
//!
//! DESIGN
//! ======
//! The status machine has two entry states (`Initial` at mount, `Manual`
//! when the story opts into manual triggering) and a deferred settle from
//! `Ran` to `Ready`. The settle timer itself lives in the bridge; this
//! module defines the states and the epoch token the bridge uses to drop
//! settles that a newer transition has outrun.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long results sit in [`RunStatus::Ran`] before the panel settles
/// into [`RunStatus::Ready`].
pub const RUN_SETTLE_DELAY: Duration = Duration::from_millis(900);

/// Lifecycle of the audit run for the currently active story.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run yet; automatic mode will start one when the story renders.
    #[default]
    Initial,
    /// Waiting for the user to request a run.
    Manual,
    /// An audit is in flight.
    Running,
    /// The last run failed. Terminal until the next reset.
    Error,
    /// Results just arrived; the settle delay is counting down.
    Ran,
    /// Results are on screen and the settle delay elapsed. Terminal until
    /// the next reset.
    Ready,
}

impl RunStatus {
    /// Status taken at mount and whenever the story's `manual` parameter
    /// flips.
    #[must_use]
    pub fn entry(manual: bool) -> Self {
        if manual { Self::Manual } else { Self::Initial }
    }

    /// Status taken when the active story begins a new load phase. Unlike
    /// [`RunStatus::entry`], automatic mode goes straight to `Running`
    /// since a run starts as soon as the story finishes rendering.
    #[must_use]
    pub fn after_reset(manual: bool) -> Self {
        if manual { Self::Manual } else { Self::Running }
    }
}

/// Staleness token for the deferred `Ran` to `Ready` settle.
///
/// Captured when a settle is scheduled and compared against the panel's
/// current epoch when it fires. Every run-state transition bumps the
/// epoch, so a token only matches if nothing moved the machine in the
/// meantime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleToken {
    pub(crate) epoch: u64,
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
