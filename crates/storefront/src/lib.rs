//! Leather Shop storefront engine.
//!
//! Catalog, cart and checkout logic for the storefront, as a library so every
//! front-end (and the integration tests) drives the same engine through a
//! single [`state::Storefront`] service.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod state;
pub mod storage;
pub mod zip;
