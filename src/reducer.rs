//! Envelope reducer — translates channel envelopes into store mutations.
//!
//! DESIGN
//! ======
//! One match over envelope kinds, in the spirit of the transport's frame
//! dispatch: each inbound envelope becomes one or more atomic store
//! operations. The channel is unordered and lossy, so every arm is written
//! to tolerate duplicates and reordering — upserts are idempotent by id,
//! locks are last-writer-wins, and periodic full snapshots overwrite local
//! derived state wholesale instead of merging.

#[cfg(test)]
#[path = "reducer_test.rs"]
mod tests;

use crate::color::color_for;
use crate::envelope::{Envelope, WireUser};
use crate::store::{ActivityMode, Presence, PresenceStore, ViewerPatch, now_ms};

/// Display label for a zero-based section index.
#[must_use]
pub fn section_label(index: u32) -> String {
    format!("Section {}", index + 1)
}

/// Canonical lock key for a zero-based section index (invariant: always
/// the decimal string, so renderer lookups and reducer writes agree).
#[must_use]
pub fn section_key(index: u32) -> String {
    index.to_string()
}

fn remote_viewer(user_id: &str, user_name: &str) -> Presence {
    Presence {
        id: user_id.to_owned(),
        name: user_name.to_owned(),
        email: None,
        avatar_url: None,
        color: color_for(user_id).to_owned(),
        mode: ActivityMode::Viewing,
        section: None,
        last_active: now_ms(),
    }
}

fn snapshot_viewers(users: &[WireUser], self_id: &str) -> Vec<Presence> {
    users
        .iter()
        .filter(|u| u.user_id != self_id)
        .map(|u| remote_viewer(&u.user_id, &u.user_name))
        .collect()
}

/// Apply one inbound envelope to the store.
///
/// `self_id` is the local user's id; the local user is excluded from any
/// derived viewer record. Total over its input — nothing here errors, the
/// worst case is momentarily stale state corrected by the next snapshot.
pub fn apply(store: &mut PresenceStore, envelope: &Envelope, self_id: &str) {
    match envelope {
        // Authoritative resync: no merge logic, full replacement. The
        // store sweeps stale locks as part of the replace.
        Envelope::Presence { active_users } => {
            store.replace_viewers(snapshot_viewers(active_users, self_id));
        }
        Envelope::ActiveUsers { users } => {
            store.replace_viewers(snapshot_viewers(users, self_id));
        }

        // Focus claim: marks the user editing and claims the lock in one
        // envelope. Upsert before lock so no notified snapshot shows a
        // lock held by an absent viewer.
        Envelope::SectionFocus { user_id, user_name, section_index } => {
            if user_id == self_id {
                return;
            }
            let claimant = Presence {
                mode: ActivityMode::Editing,
                section: Some(section_label(*section_index)),
                ..remote_viewer(user_id, user_name)
            };
            store.upsert_viewer(claimant.clone());
            store.lock_section(section_key(*section_index), claimant);
        }

        // Typing from an unknown user is dropped, not materialized; a
        // viewer must first arrive via snapshot or focus claim.
        Envelope::Typing { user_id, is_typing: true, section_index } => {
            store.update_viewer(
                user_id,
                ViewerPatch {
                    mode: Some(ActivityMode::Editing),
                    section: section_index.as_ref().map(|i| Some(section_label(*i))),
                },
            );
        }

        // Ceasing to type is the only signal that releases a lock.
        Envelope::Typing { user_id, is_typing: false, section_index } => {
            store.update_viewer(
                user_id,
                ViewerPatch { mode: Some(ActivityMode::Viewing), section: Some(None) },
            );
            if let Some(index) = section_index {
                store.unlock_section(&section_key(*index));
            }
        }
    }
}
