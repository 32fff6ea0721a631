//! Host collaborators the addon core depends on.
//!
//! SYSTEM CONTEXT
//! ==============
//! The workbench host owns the event channel between panel and preview,
//! a persisted per-addon state slot, and the session info saying which
//! story is active. This module models each as an explicit, injectable
//! value so the core never reaches into host globals: a broadcast-backed
//! [`channel::MemoryChannel`], a key-value [`store::AddonStore`], and a
//! watch-backed [`session::SessionState`].

pub mod channel;
pub mod session;
pub mod store;

pub use channel::MemoryChannel;
pub use session::{SessionSnapshot, SessionState};
pub use store::{AddonStore, MemoryStore, load_json, save_json};
