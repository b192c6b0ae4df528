//! Versioned schema for the locally persisted arrays.
//!
//! The payloads carry an explicit `version` field and are validated on
//! read. Anything that does not decode cleanly - corrupt JSON, a missing
//! field, an unknown version - falls back to an empty list with a logged
//! warning. A corrupt local cache must never take the page down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use keyiflibox_core::{LineId, ProductId};

/// Current version of the persisted payloads.
pub const SCHEMA_VERSION: u32 = 1;

/// One anonymous cart line as persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedCartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

/// One anonymous favorite entry as persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedFavorite {
    pub id: LineId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CartPayload {
    version: u32,
    lines: Vec<PersistedCartLine>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FavoritesPayload {
    version: u32,
    entries: Vec<PersistedFavorite>,
}

/// Decode the persisted cart array; absent or malformed input is empty.
#[must_use]
pub fn decode_cart(raw: Option<&str>) -> Vec<PersistedCartLine> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<CartPayload>(raw) {
        Ok(payload) if payload.version == SCHEMA_VERSION => payload.lines,
        Ok(payload) => {
            warn!(version = payload.version, "unknown local cart schema version");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "malformed local cart payload");
            Vec::new()
        }
    }
}

/// Encode cart lines for local persistence.
#[must_use]
pub fn encode_cart(lines: &[PersistedCartLine]) -> String {
    let payload = CartPayload {
        version: SCHEMA_VERSION,
        lines: lines.to_vec(),
    };
    // Plain structs with no map keys or non-string types cannot fail to
    // serialize.
    serde_json::to_string(&payload).expect("local cart payload serialization")
}

/// Decode the persisted favorites array; absent or malformed input is empty.
#[must_use]
pub fn decode_favorites(raw: Option<&str>) -> Vec<PersistedFavorite> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<FavoritesPayload>(raw) {
        Ok(payload) if payload.version == SCHEMA_VERSION => payload.entries,
        Ok(payload) => {
            warn!(
                version = payload.version,
                "unknown local favorites schema version"
            );
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "malformed local favorites payload");
            Vec::new()
        }
    }
}

/// Encode favorite entries for local persistence.
#[must_use]
pub fn encode_favorites(entries: &[PersistedFavorite]) -> String {
    let payload = FavoritesPayload {
        version: SCHEMA_VERSION,
        entries: entries.to_vec(),
    };
    serde_json::to_string(&payload).expect("local favorites payload serialization")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_line() -> PersistedCartLine {
        PersistedCartLine {
            id: LineId::new("local_1700000000000_0"),
            product_id: ProductId::new("p-1"),
            quantity: 2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_roundtrip() {
        let lines = vec![sample_line()];
        let encoded = encode_cart(&lines);
        assert_eq!(decode_cart(Some(&encoded)), lines);
    }

    #[test]
    fn test_absent_decodes_empty() {
        assert!(decode_cart(None).is_empty());
        assert!(decode_favorites(None).is_empty());
    }

    #[test]
    fn test_corrupt_json_decodes_empty() {
        assert!(decode_cart(Some("{not json")).is_empty());
        assert!(decode_favorites(Some("[1, 2")).is_empty());
    }

    #[test]
    fn test_wrong_shape_decodes_empty() {
        // A bare array is the legacy untyped shape; it has no version
        // envelope and must not be partially parsed.
        assert!(decode_cart(Some("[{\"product_id\": \"p-1\"}]")).is_empty());
    }

    #[test]
    fn test_unknown_version_decodes_empty() {
        let payload = "{\"version\": 99, \"lines\": []}";
        assert!(decode_cart(Some(payload)).is_empty());
    }
}
