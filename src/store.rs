//! Presence store — the reconciled view of who is here and what they hold.
//!
//! DESIGN
//! ======
//! A plain observer container, no framework reactivity: state plus a list
//! of subscriber callbacks invoked synchronously after each committed
//! mutation. Every operation is total, never panics, and fires exactly one
//! notification batch; debouncing, if wanted, belongs to the renderer.
//!
//! The central consistency rule lives here: removing a viewer purges every
//! section lock that viewer holds, in the same operation. A lock entry
//! referencing an absent user is a correctness bug, not a display glitch.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// =============================================================================
// RECORDS
// =============================================================================

/// What a present user is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMode {
    #[default]
    Viewing,
    Editing,
}

/// One user's visibility/activity record, local or remote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// Stable opaque identifier; unique key within the store.
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Derived locally from `id`, never transmitted.
    pub color: String,
    pub mode: ActivityMode,
    /// Human-readable label of the focused section; editing mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Local clock, milliseconds since Unix epoch. Not trusted across peers.
    pub last_active: i64,
}

/// Partial update merged onto an existing viewer record.
///
/// `section` distinguishes "leave alone" (`None`) from "clear"
/// (`Some(None)`), since a typing-stop must erase the label while a
/// typing-start without an index must not touch it.
#[derive(Clone, Debug, Default)]
pub struct ViewerPatch {
    pub mode: Option<ActivityMode>,
    pub section: Option<Option<String>>,
}

/// The reconciled session view handed to subscribers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    /// Remote viewers, unique by id. A re-upserted id keeps its position
    /// so avatar rows do not jump around.
    pub viewers: Vec<Presence>,
    /// The local user; never included in `viewers`.
    pub current_user: Option<Presence>,
    /// Section key (decimal zero-based index) -> lock holder.
    pub locked_sections: HashMap<String, Presence>,
}

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// STORE
// =============================================================================

/// Handle returned by [`PresenceStore::subscribe`]; pass back to
/// [`PresenceStore::unsubscribe`] to stop delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(u64);

type Subscriber = Box<dyn Fn(&PresenceState)>;

/// Reactive container for [`PresenceState`].
///
/// Owned by exactly one collaborative session; mutated only by the
/// envelope reducer and by session teardown. Renderers are read-only
/// consumers via [`PresenceStore::subscribe`].
#[derive(Default)]
pub struct PresenceStore {
    state: PresenceState,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_subscriber: u64,
}

impl PresenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the committed state.
    #[must_use]
    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    /// Register a callback invoked synchronously after every committed
    /// mutation.
    pub fn subscribe(&mut self, callback: impl Fn(&PresenceState) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. No-op for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    fn notify(&self) {
        for (_, callback) in &self.subscribers {
            callback(&self.state);
        }
    }

    // -------------------------------------------------------------------------
    // Mutations. Each commits, then notifies exactly once.
    // -------------------------------------------------------------------------

    /// Set or clear the local user.
    pub fn set_current_user(&mut self, user: Option<Presence>) {
        self.state.current_user = user;
        self.notify();
    }

    /// Insert or replace a remote viewer by id. Locks are untouched.
    pub fn upsert_viewer(&mut self, viewer: Presence) {
        if let Some(existing) = self.state.viewers.iter_mut().find(|v| v.id == viewer.id) {
            *existing = viewer;
        } else {
            self.state.viewers.push(viewer);
        }
        self.notify();
    }

    /// Remove a viewer and, atomically, every lock that viewer holds.
    pub fn remove_viewer(&mut self, id: &str) {
        self.state.viewers.retain(|v| v.id != id);
        self.state.locked_sections.retain(|_, holder| holder.id != id);
        self.notify();
    }

    /// Merge a partial update onto a known viewer and bump `last_active`.
    /// Unknown ids are dropped — a delta never materializes a phantom
    /// viewer; it must first arrive via snapshot or focus claim.
    pub fn update_viewer(&mut self, id: &str, patch: ViewerPatch) {
        if let Some(viewer) = self.state.viewers.iter_mut().find(|v| v.id == id) {
            if let Some(mode) = patch.mode {
                viewer.mode = mode;
            }
            if let Some(section) = patch.section {
                viewer.section = section;
            }
            viewer.last_active = now_ms();
        }
        self.notify();
    }

    /// Claim a section lock. Unconditional overwrite: last writer wins,
    /// there is no compare-and-swap because locks are advisory.
    pub fn lock_section(&mut self, key: impl Into<String>, holder: Presence) {
        self.state.locked_sections.insert(key.into(), holder);
        self.notify();
    }

    /// Release a section lock. Idempotent; absent keys are a no-op.
    pub fn unlock_section(&mut self, key: &str) {
        self.state.locked_sections.remove(key);
        self.notify();
    }

    /// Wholesale snapshot replacement of the remote viewer set.
    ///
    /// Filters out the local user's id, then sweeps `locked_sections`
    /// for entries whose holder is absent from the new set. A snapshot
    /// that drops a lock holder must not leave that lock dangling.
    pub fn replace_viewers(&mut self, viewers: Vec<Presence>) {
        let self_id = self.state.current_user.as_ref().map(|u| u.id.clone());
        self.state.viewers = viewers
            .into_iter()
            .filter(|v| self_id.as_deref() != Some(v.id.as_str()))
            .collect();
        let present: Vec<&str> = self.state.viewers.iter().map(|v| v.id.as_str()).collect();
        self.state
            .locked_sections
            .retain(|_, holder| present.contains(&holder.id.as_str()));
        self.notify();
    }

    /// Clear everything. Session teardown only.
    pub fn reset(&mut self) {
        self.state = PresenceState::default();
        self.notify();
    }
}
