//! LabMarket Core - Shared domain types.
//!
//! This crate provides the types used across all LabMarket components:
//! - `client` - Cart store, live queries and request submission against the hosted backend
//! - `cli` - Operator tooling for moderating products, requests and sellers
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, statuses, categories and contact info

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
