//! Copresence — collaborative presence and section-locking reconciliation.
//!
//! ARCHITECTURE
//! ============
//! Multiple users viewing the same document see each other's presence,
//! editing focus, and advisory section locks in real time over an
//! unreliable, unordered event channel. Inbound envelopes flow:
//!
//! channel transport → envelope reducer → presence store → subscribers.
//!
//! Outbound intents (typing, focus, edits) flow the other way, straight
//! from the renderer through the session to the transport, and are never
//! reflected back into local state except via the next inbound envelope.
//!
//! DESIGN
//! ======
//! - The store is the single mutable resource, owned by one session and
//!   mutated only by the reducer and session teardown.
//! - Everything is synchronous and single-threaded; suspension lives in
//!   the transport, behind the [`ChannelTransport`] seam.
//! - Locks are advisory data, not mutexes: last writer wins, and a full
//!   snapshot can always overwrite local derived state to self-heal after
//!   dropped or reordered deltas.

pub mod color;
pub mod envelope;
pub mod identity;
pub mod reducer;
pub mod session;
pub mod store;

pub use color::color_for;
pub use envelope::{Envelope, EnvelopeError, WireUser, decode_envelope};
pub use identity::{Identity, IdentityProvider};
pub use reducer::apply;
pub use session::{ChannelTransport, CollabSession, ConnectionStatus, SessionError};
pub use store::{ActivityMode, Presence, PresenceState, PresenceStore, SubscriberId, ViewerPatch};
