//! LabMarket client library.
//!
//! Session-side logic of the lab equipment marketplace: the buy and donate
//! carts, live paginated lists kept current by the backend's change feed,
//! two-phase request submission, admin search, and confirmation cards.
//! The hosted backend is reached through the [`backend::Backend`] seam.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod live;
pub mod models;
pub mod pagination;
pub mod search;
pub mod services;
pub mod state;

pub use error::{MarketError, Result};
pub use state::Marketplace;
