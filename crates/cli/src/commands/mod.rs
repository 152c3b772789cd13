//! Command implementations.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod zip;

use leather_shop_storefront::config::StorefrontConfig;
use leather_shop_storefront::state::Storefront;

/// Everything a command needs.
pub struct Context {
    pub config: StorefrontConfig,
    pub storefront: Storefront,
}
