//! Accessibility addon core for the component workbench.
//!
//! SYSTEM CONTEXT
//! ==============
//! The preview side runs an audit engine against the rendered story and
//! publishes results on the addon channel. This crate owns everything the
//! panel side needs on top of that stream: the run-status lifecycle, the
//! result store, element highlighting, and the bridge that wires all three
//! to the channel and to host persistence.
//!
//! The crate is host-framework agnostic. The host's channel, persisted
//! addon state, and per-story session info come in through the collaborators
//! in [`host`], so the core logic stays testable without a running preview.

pub mod bridge;
pub mod host;
pub mod runner;
pub mod state;
pub mod status;

pub use bridge::{Bridge, BridgeClosed, BridgeConfig, Command, PanelHandle};
pub use runner::{AuditEngine, AuditError, AuditRequest, AuditRunner};
pub use state::highlight::{FindingCategory, HighlightState};
pub use state::panel::{PanelSnapshot, PanelState};
pub use state::run::{RUN_SETTLE_DELAY, RunStatus, SettleToken};
pub use status::{StatusFilter, StatusValue, StoryStatus};
