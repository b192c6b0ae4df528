//! Local Persistent Store.
//!
//! Key-value persistence for the anonymous visitor's cart and favorites,
//! the server-side analog of a browser's local storage. Values are JSON
//! text under two fixed keys; the payload schema (with its explicit
//! version) lives in [`schema`].
//!
//! The store is scoped per profile, not per identity: it is only ever used
//! for the anonymous case, and is emptied when its contents merge into the
//! remote store on sign-in.

mod file;
mod memory;
pub mod schema;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Fixed keys for the two persisted arrays.
pub mod keys {
    /// Anonymous cart lines.
    pub const CART: &str = "keyiflibox_cart";
    /// Anonymous favorite entries.
    pub const FAVORITES: &str = "keyiflibox_favorites";
}

/// Errors that can occur when touching the local store.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The local persistent store contract.
///
/// Concurrent writers (multiple tabs in the original design) are not
/// coordinated: the last full write wins. That is an accepted limitation of
/// a single-user local cache.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Remove `key`; no-op if absent.
    async fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}
