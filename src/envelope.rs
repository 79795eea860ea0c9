//! Wire envelope model and JSON codec for the shared channel.
//!
//! DESIGN
//! ======
//! Four envelope kinds travel over the channel: two full-snapshot shapes
//! and two deltas. The channel is unreliable and unordered, so nothing
//! here is fatal: a recognized kind with a broken payload is droppable
//! noise, and an unrecognized kind is a forward-compatible ignore. The
//! caller decides; this module only classifies.

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error returned by [`decode_envelope`] / [`envelope_from_value`].
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Payload is not JSON, or a recognized kind is missing/mistyping a
    /// required field.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload has no string `kind` field.
    #[error("envelope has no kind")]
    MissingKind,
    /// `kind` is well-formed but not one this engine understands.
    #[error("unknown envelope kind: {0}")]
    UnknownKind(String),
}

/// One user as carried inside a snapshot envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    pub user_id: String,
    pub user_name: String,
}

/// A single message on the shared presence channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    /// Authoritative full snapshot of the active user set.
    #[serde(rename_all = "camelCase")]
    Presence { active_users: Vec<WireUser> },
    /// Full snapshot, alternate source (reply to an active-users request).
    ActiveUsers { users: Vec<WireUser> },
    /// A user focused a section: marks them editing and claims the lock
    /// in one envelope. There is no separate claim step.
    #[serde(rename_all = "camelCase")]
    SectionFocus {
        user_id: String,
        user_name: String,
        section_index: u32,
    },
    /// Typing started or stopped. Stopping is the only lock release.
    #[serde(rename_all = "camelCase")]
    Typing {
        user_id: String,
        is_typing: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        section_index: Option<u32>,
    },
}

/// Decode a raw channel payload.
///
/// # Errors
///
/// [`EnvelopeError::Json`] for non-JSON input or a recognized kind with a
/// broken payload, [`EnvelopeError::MissingKind`] when no `kind` field is
/// present, [`EnvelopeError::UnknownKind`] for kinds this engine does not
/// speak.
pub fn decode_envelope(text: &str) -> Result<Envelope, EnvelopeError> {
    let value: Value = serde_json::from_str(text)?;
    envelope_from_value(&value)
}

/// Classify and decode an already-parsed JSON value.
///
/// # Errors
///
/// Same taxonomy as [`decode_envelope`].
pub fn envelope_from_value(value: &Value) -> Result<Envelope, EnvelopeError> {
    let Some(kind) = value.get("kind").and_then(Value::as_str) else {
        return Err(EnvelopeError::MissingKind);
    };
    match kind {
        "presence" | "active_users" | "section_focus" | "typing" => {
            Ok(serde_json::from_value(value.clone())?)
        }
        other => Err(EnvelopeError::UnknownKind(other.to_owned())),
    }
}
