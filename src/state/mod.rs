//! Panel-side state for the accessibility addon.
//!
//! Split into the run lifecycle vocabulary ([`run`]), the highlight
//! selection ([`highlight`]), and the aggregate that ties them to results
//! and the active story ([`panel`]). All three are plain values; every
//! side effect they imply is returned to the caller instead of performed.

pub mod highlight;
pub mod panel;
pub mod run;
