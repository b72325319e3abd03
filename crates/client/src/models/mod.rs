//! Rows of the backend collections.
//!
//! Field names follow the column names; `type` is exposed as `kind`.

mod product;
mod request;
mod seller;

pub use product::Product;
pub use request::{NewRequest, Request, RequestLine};
pub use seller::{Seller, SellerRegistration};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::backend::Table;

/// A row type stored in one backend collection.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the rows live in.
    const TABLE: Table;

    /// Primary key.
    fn uuid(&self) -> Uuid;
}
