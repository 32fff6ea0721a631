//! Shared event model for the workbench addon channel.
//!
//! This crate owns the event vocabulary spoken between the a11y panel core,
//! the preview-side audit runner, and the workbench host. It intentionally
//! keeps engine payloads flexible (`serde_json::Value`) while giving every
//! event kind a typed shape and a stable name on the channel.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Addon identifier. Doubles as the persisted-state slot key and as the
/// reporter id the host attaches to accessibility entries in story reports.
pub const ADDON_ID: &str = "a11y";

/// Inbound: a completed audit run for one story.
pub const RESULT_EVENT: &str = "a11y:result";
/// Inbound: an audit run failed.
pub const ERROR_EVENT: &str = "a11y:error";
/// Outbound: the panel requests a manual audit run.
pub const MANUAL_EVENT: &str = "a11y:manual";
/// Inbound: the active story moved to a new render phase.
pub const PHASE_EVENT: &str = "story:phase";
/// Inbound: a story finished rendering, with per-addon reports attached.
pub const FINISHED_EVENT: &str = "story:finished";
/// Outbound: the current highlight selection for the preview to paint.
pub const HIGHLIGHT_EVENT: &str = "highlight:apply";

/// Error returned by [`decode_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The envelope is missing a required field.
    #[error("missing `{0}` field in event envelope")]
    MissingField(&'static str),
    /// The envelope names an event this addon does not speak.
    #[error("unknown event name: {0}")]
    UnknownEvent(String),
    /// The payload does not match the named event's schema.
    #[error("invalid payload for {event}: {source}")]
    Payload {
        event: &'static str,
        source: serde_json::Error,
    },
}

// =============================================================================
// EVENT
// =============================================================================

/// A single message on the addon channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A finished audit run, tagged with the story it ran against.
    RunResult(ResultPayload),
    /// A failed audit run. Accepted without a story id; see the panel core
    /// for why errors are not stale-filtered.
    RunError(ErrorPayload),
    /// Render-phase transition for a story.
    PhaseChanged(PhasePayload),
    /// Story finished with its collected per-addon reports.
    StoryFinished(FinishedPayload),
    /// Manual run request from the panel, carrying the active story id and
    /// the configuration to run with.
    ManualRun(ManualPayload),
    /// Highlight selection for the preview-side painter.
    Highlight(HighlightPayload),
}

impl Event {
    /// Stable name of this event on the channel.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunResult(_) => RESULT_EVENT,
            Self::RunError(_) => ERROR_EVENT,
            Self::PhaseChanged(_) => PHASE_EVENT,
            Self::StoryFinished(_) => FINISHED_EVENT,
            Self::ManualRun(_) => MANUAL_EVENT,
            Self::Highlight(_) => HIGHLIGHT_EVENT,
        }
    }
}

/// Payload of [`RESULT_EVENT`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// The full result of the run, replacing any previous result wholesale.
    #[serde(default)]
    pub results: AuditResults,
    /// Story the run was executed against. Consumers must discard results
    /// whose story id no longer matches the active story.
    pub story_id: String,
}

/// Payload of [`ERROR_EVENT`]. The error shape is owned by whatever failed
/// (engine, report pipeline); this addon carries it opaquely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: Value,
}

/// Payload of [`PHASE_EVENT`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhasePayload {
    pub story_id: String,
    pub new_phase: RenderPhase,
}

/// Payload of [`FINISHED_EVENT`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishedPayload {
    pub story_id: String,
    /// Reports attached by addons during the story lifecycle. The a11y
    /// entry is identified by [`ADDON_ID`].
    #[serde(default)]
    pub reporters: Vec<Report>,
}

/// Payload of [`MANUAL_EVENT`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualPayload {
    pub story_id: String,
    #[serde(default)]
    pub parameters: A11yParameters,
}

/// Payload of [`HIGHLIGHT_EVENT`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightPayload {
    /// Element identifiers to emphasize. Ordered and de-duplicated.
    pub elements: Vec<String>,
    /// Emphasis color as a hex string, keyed by the active finding category.
    pub color: String,
}

// =============================================================================
// AUDIT RESULT MODEL
// =============================================================================

/// One audit run's findings, split by outcome. Treated as immutable once
/// built: consumers replace the whole value, never mutate it in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditResults {
    #[serde(default)]
    pub passes: Vec<Finding>,
    #[serde(default)]
    pub violations: Vec<Finding>,
    #[serde(default)]
    pub incomplete: Vec<Finding>,
}

impl AuditResults {
    /// True when the run produced no findings in any category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty() && self.violations.is_empty() && self.incomplete.is_empty()
    }
}

/// One reported item from the audit engine. Only `id` and `target` carry
/// meaning here; everything else the engine reports rides along opaquely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable rule/check identifier assigned by the engine.
    pub id: String,
    /// Element identifiers this finding points at.
    #[serde(default)]
    pub target: Vec<String>,
    /// Engine-specific remainder (impact, description, help text, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Render phase of a story in the preview. Only `loading` (reset trigger)
/// and `completed` (automatic-run trigger) carry semantics for this addon;
/// the rest exist so host payloads decode without loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPhase {
    Preparing,
    Loading,
    Rendering,
    Playing,
    Played,
    Completed,
    Errored,
    Aborted,
}

/// A per-addon report attached to a finished story.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Reporter identifier; the a11y entry uses [`ADDON_ID`].
    pub id: String,
    /// Reporter schema version, if the producer stamps one.
    #[serde(default)]
    pub version: Option<u32>,
    pub status: ReportStatus,
    /// Reporter-specific result. For the a11y reporter this is either an
    /// [`AuditResults`] value or an object with an `error` field.
    #[serde(default)]
    pub result: Value,
}

/// Outcome attached to a [`Report`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Failed,
    Passed,
    Warning,
    Pending,
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Per-story addon configuration, resolved by the host for the active story.
///
/// `element`, `config`, and `options` use the audit engine's own shapes and
/// are passed through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct A11yParameters {
    /// Scope selector limiting which part of the preview is audited.
    pub element: Option<Value>,
    /// Engine rule configuration.
    pub config: Option<Value>,
    /// Engine run options.
    pub options: Option<Value>,
    /// When true, runs start only on explicit request from the panel.
    pub manual: bool,
    /// When true, the addon skips audits for this story entirely.
    pub disable: bool,
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode an event into its channel envelope `{ "event": ..., "payload": ... }`.
#[must_use]
pub fn encode_event(event: &Event) -> Value {
    let payload = match event {
        Event::RunResult(p) => to_value(p),
        Event::RunError(p) => to_value(p),
        Event::PhaseChanged(p) => to_value(p),
        Event::StoryFinished(p) => to_value(p),
        Event::ManualRun(p) => to_value(p),
        Event::Highlight(p) => to_value(p),
    };

    let mut envelope = Map::new();
    envelope.insert("event".to_owned(), Value::String(event.name().to_owned()));
    envelope.insert("payload".to_owned(), payload);
    Value::Object(envelope)
}

/// Decode a channel envelope into a typed event.
///
/// # Errors
///
/// Returns [`CodecError::MissingField`] when the envelope lacks an event
/// name, [`CodecError::UnknownEvent`] for names outside this addon's
/// vocabulary, and [`CodecError::Payload`] when the payload does not match
/// the named event's schema.
pub fn decode_event(value: &Value) -> Result<Event, CodecError> {
    let name = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingField("event"))?;
    // A missing payload decodes like an empty object so events whose
    // fields all default stay accepted.
    let payload = match value.get("payload") {
        Some(payload) => payload.clone(),
        None => Value::Object(Map::new()),
    };

    match name {
        RESULT_EVENT => Ok(Event::RunResult(parse_payload(RESULT_EVENT, payload)?)),
        ERROR_EVENT => Ok(Event::RunError(parse_payload(ERROR_EVENT, payload)?)),
        PHASE_EVENT => Ok(Event::PhaseChanged(parse_payload(PHASE_EVENT, payload)?)),
        FINISHED_EVENT => Ok(Event::StoryFinished(parse_payload(FINISHED_EVENT, payload)?)),
        MANUAL_EVENT => Ok(Event::ManualRun(parse_payload(MANUAL_EVENT, payload)?)),
        HIGHLIGHT_EVENT => Ok(Event::Highlight(parse_payload(HIGHLIGHT_EVENT, payload)?)),
        other => Err(CodecError::UnknownEvent(other.to_owned())),
    }
}

fn to_value<T: Serialize>(payload: &T) -> Value {
    // Serializing these payload types into a Value cannot fail; the only
    // serde_json error paths are non-string map keys and non-finite floats,
    // neither of which the event model can produce.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn parse_payload<T: DeserializeOwned>(
    event: &'static str,
    payload: Value,
) -> Result<T, CodecError> {
    serde_json::from_value(payload).map_err(|source| CodecError::Payload { event, source })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
