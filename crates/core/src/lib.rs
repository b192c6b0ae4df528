//! KeyifliBox Core - Shared types library.
//!
//! This crate provides common types used across all KeyifliBox components:
//! - `storefront` - Public-facing experiences storefront
//! - `cli` - Command-line tools for migrations and catalog imports
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, owner identities,
//!   emails, and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
