//! Local identity seam.
//!
//! The engine reads the current user's identity once at session start from
//! whatever credential store the host application keeps. Without an
//! identity the engine refuses to connect at all.

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::color::color_for;
use crate::store::{ActivityMode, Presence, now_ms};

/// The local user's identity as read from the credential store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Build the local user's presence record: viewing, derived color.
    #[must_use]
    pub fn into_presence(self) -> Presence {
        Presence {
            color: color_for(&self.id).to_owned(),
            id: self.id,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
            mode: ActivityMode::Viewing,
            section: None,
            last_active: now_ms(),
        }
    }
}

/// Read-only source of the local user's identity.
pub trait IdentityProvider {
    /// `None` when no credential is stored; the session must not connect.
    fn current_identity(&self) -> Option<Identity>;
}

impl IdentityProvider for Option<Identity> {
    fn current_identity(&self) -> Option<Identity> {
        self.clone()
    }
}
