//! Session-related types.

use serde::{Deserialize, Serialize};

use keyiflibox_core::{Email, OwnerId};

/// The signed-in identity.
///
/// Authentication itself is delegated to the hosted backend; the storefront
/// only needs a stable owner identity, which is derived from the validated
/// email address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Owner identity used to key remote cart and favorite rows.
    pub owner: OwnerId,
    /// The user's email address.
    pub email: Email,
}

impl CurrentUser {
    /// Build the session identity from a validated email.
    #[must_use]
    pub fn from_email(email: Email) -> Self {
        Self {
            owner: OwnerId::from(&email),
            email,
        }
    }
}
