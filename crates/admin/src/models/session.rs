//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};
use vesture_core::{Profile, UserId};

/// Session-stored admin identity.
///
/// Only written after the profile's role was checked at sign-in. Back-office
/// calls run under the service key, so no user token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// The admin's auth user id.
    pub id: UserId,
    /// Admin's email address.
    pub email: String,
    /// Admin's display name.
    pub full_name: Option<String>,
}

impl From<&Profile> for CurrentAdmin {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
