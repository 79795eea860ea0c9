//! Collaborative session — wiring between transport, reducer, and store.
//!
//! DESIGN
//! ======
//! One session per mounted document. The session owns the presence store
//! outright; the store must never be shared across two concurrent
//! documents. Inbound text from the channel goes through
//! [`CollabSession::handle_message`]; outbound intents (typing, focus,
//! edits) pass straight through to the transport and are never reflected
//! into local state — the next inbound envelope does that.
//!
//! Teardown order matters: disconnect the transport first, then reset the
//! store, so no further envelopes are processed against a store the
//! renderer has already unmounted from.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use serde_json::Value;
use uuid::Uuid;

use crate::envelope::decode_envelope;
use crate::identity::IdentityProvider;
use crate::reducer::apply;
use crate::store::{PresenceState, PresenceStore, SubscriberId};

/// Error returned by [`CollabSession::start`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No credential in the identity store; the engine must not connect.
    #[error("no local identity; refusing to connect")]
    MissingIdentity,
}

/// Channel connection status, surfaced to the renderer. A disconnect does
/// not clear presence — the last-known view stays visible (typically
/// dimmed) until explicit teardown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// The shared-channel seam. Implementations wrap whatever realtime
/// transport the host application uses; every method is fire-and-forget
/// from the engine's perspective.
pub trait ChannelTransport {
    /// Begin receiving envelopes. The host signals readiness by calling
    /// [`CollabSession::handle_connected`].
    fn connect(&mut self);
    /// Stop receiving. Must be safe to call multiple times.
    fn disconnect(&mut self);
    /// Announce typing start/stop in a section.
    fn send_typing(&mut self, section_index: u32, is_typing: bool);
    /// Send a field edit, optionally persisted by the far side.
    fn send_edit(&mut self, section_index: u32, field: &str, value: &Value, persist: bool);
    /// Claim editing focus on a section.
    fn send_section_focus(&mut self, section_index: u32);
    /// Ask the channel to emit a fresh full snapshot.
    fn request_active_users(&mut self);
}

/// A live collaborative session over one document.
pub struct CollabSession<T: ChannelTransport> {
    id: Uuid,
    self_id: String,
    transport: T,
    store: PresenceStore,
    status: ConnectionStatus,
}

impl<T: ChannelTransport> std::fmt::Debug for CollabSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabSession")
            .field("id", &self.id)
            .field("self_id", &self.self_id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<T: ChannelTransport> CollabSession<T> {
    /// Read the local identity once, seed the store, and start connecting.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingIdentity`] when the provider has no stored
    /// credential; no connect attempt is made in that case.
    pub fn start(provider: &impl IdentityProvider, mut transport: T) -> Result<Self, SessionError> {
        let Some(identity) = provider.current_identity() else {
            return Err(SessionError::MissingIdentity);
        };

        let id = Uuid::new_v4();
        let self_id = identity.id.clone();
        let mut store = PresenceStore::new();
        store.set_current_user(Some(identity.into_presence()));

        tracing::debug!(session = %id, user = %self_id, "starting collaborative session");
        transport.connect();

        Ok(Self { id, self_id, transport, store, status: ConnectionStatus::Connecting })
    }

    // -------------------------------------------------------------------------
    // Inbound: transport callbacks
    // -------------------------------------------------------------------------

    /// Connection established. Immediately requests a full snapshot so the
    /// viewer set is seeded without waiting for the periodic resync.
    pub fn handle_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        tracing::debug!(session = %self.id, "channel connected, requesting snapshot");
        self.transport.request_active_users();
    }

    /// Connection lost. Presence state is kept as the last-known view.
    pub fn handle_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        tracing::debug!(session = %self.id, "channel disconnected, keeping last-known view");
    }

    /// Process one raw inbound payload. Malformed and unknown envelopes
    /// are dropped as noise — the next valid envelope or snapshot corrects
    /// the view.
    pub fn handle_message(&mut self, text: &str) {
        match decode_envelope(text) {
            Ok(envelope) => apply(&mut self.store, &envelope, &self.self_id),
            Err(err) => {
                tracing::debug!(session = %self.id, error = %err, "dropping envelope");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Outbound: renderer intents, fire-and-forget
    // -------------------------------------------------------------------------

    pub fn send_typing(&mut self, section_index: u32, is_typing: bool) {
        self.transport.send_typing(section_index, is_typing);
    }

    pub fn send_edit(&mut self, section_index: u32, field: &str, value: &Value, persist: bool) {
        self.transport.send_edit(section_index, field, value, persist);
    }

    pub fn send_section_focus(&mut self, section_index: u32) {
        self.transport.send_section_focus(section_index);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Tear the session down: disconnect first, then clear the store.
    /// Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        tracing::debug!(session = %self.id, "shutting down session");
        self.transport.disconnect();
        self.store.reset();
        self.status = ConnectionStatus::Disconnected;
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &PresenceState {
        self.store.state()
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn subscribe(&mut self, callback: impl Fn(&PresenceState) + 'static) -> SubscriberId {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.store.unsubscribe(id);
    }
}
