//! Leather Shop Core - Shared types library.
//!
//! This crate provides common types used across all Leather Shop components:
//! - `storefront` - Catalog, cart and checkout engine
//! - `cli` - Command-line front-end for the engine
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
