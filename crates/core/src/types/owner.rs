//! Owner identity with the anonymous sentinel.
//!
//! Cart and favorite rows are keyed by `(owner, product)`. While a visitor
//! is signed out the owner is the empty-string sentinel rather than a null,
//! keeping locally persisted rows shape-compatible with remote rows.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::email::Email;

/// Errors that can occur when constructing an [`OwnerId`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum OwnerIdError {
    /// An authenticated owner identity cannot be empty; the empty string is
    /// reserved for the anonymous sentinel.
    #[error("authenticated owner identity cannot be empty")]
    Empty,
}

/// The identity that owns a cart line or favorite entry.
///
/// Either an opaque authenticated identity or the empty-string sentinel
/// meaning "anonymous, browser-local".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// The anonymous sentinel identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(String::new())
    }

    /// An authenticated owner identity.
    ///
    /// # Errors
    ///
    /// Returns [`OwnerIdError::Empty`] if `id` is empty, since the empty
    /// string would alias the anonymous sentinel.
    pub fn for_user(id: &str) -> Result<Self, OwnerIdError> {
        if id.is_empty() {
            return Err(OwnerIdError::Empty);
        }
        Ok(Self(id.to_owned()))
    }

    /// Whether this is the anonymous sentinel.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw identity value (empty for anonymous).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Email> for OwnerId {
    /// The session identity is the validated email address.
    fn from(email: &Email) -> Self {
        Self(email.as_str().to_owned())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            write!(f, "(anonymous)")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OwnerId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OwnerId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OwnerId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_empty_string() {
        let owner = OwnerId::anonymous();
        assert!(owner.is_anonymous());
        assert_eq!(owner.as_str(), "");
    }

    #[test]
    fn test_for_user_rejects_empty() {
        assert!(matches!(OwnerId::for_user(""), Err(OwnerIdError::Empty)));
    }

    #[test]
    fn test_for_user_is_authenticated() {
        let owner = OwnerId::for_user("ayse@example.com").unwrap();
        assert!(!owner.is_anonymous());
        assert_eq!(owner.as_str(), "ayse@example.com");
    }

    #[test]
    fn test_from_email() {
        let email = Email::parse("ayse@example.com").unwrap();
        let owner = OwnerId::from(&email);
        assert_eq!(owner.as_str(), "ayse@example.com");
    }

    #[test]
    fn test_serde_keeps_sentinel_shape() {
        let json = serde_json::to_string(&OwnerId::anonymous()).unwrap();
        assert_eq!(json, "\"\"");

        let parsed: OwnerId = serde_json::from_str("\"\"").unwrap();
        assert!(parsed.is_anonymous());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", OwnerId::anonymous()), "(anonymous)");
        let owner = OwnerId::for_user("ayse@example.com").unwrap();
        assert_eq!(format!("{owner}"), "ayse@example.com");
    }
}
