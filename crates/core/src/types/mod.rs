//! Core types for LabMarket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod contact;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use category::{BUY_CATEGORIES, DonateCategory};
pub use contact::{ContactError, ContactInfo};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use status::*;
