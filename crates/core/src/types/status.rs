//! Status and kind enums for marketplace entities.
//!
//! Wire values are the lowercase strings stored in the backend's
//! `status` / `type` columns.

use serde::{Deserialize, Serialize};

/// Which cart a product or request belongs to.
///
/// Stored in the `type` column of both `products` and `requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A quote request for priced equipment.
    Buy,
    /// An offer to receive donated equipment.
    Donate,
}

impl RequestKind {
    /// Both kinds, in display order.
    pub const ALL: [Self; 2] = [Self::Buy, Self::Donate];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Donate => "donate",
        }
    }
}

/// Listing lifecycle of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Awaiting admin review.
    #[default]
    Pending,
    /// Visible in the catalogue.
    Active,
    /// Hidden from the catalogue but retained.
    Inactive,
}

impl ProductStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Review state of a buy/donate request (and of a seller registration).
///
/// `Pending` is the only non-terminal state; an admin moves it to either
/// `Approved` or `Rejected`, after which it never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether an admin may move a request from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

/// Account standing of a seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SellerStatus {
    #[default]
    Pending,
    Active,
    Suspended,
    Banned,
}

impl SellerStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }
}

macro_rules! impl_wire_str {
    ($ty:ty, $label:literal, [$($variant:ident),+ $(,)?]) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case(Self::$variant.as_str()) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!(concat!("invalid ", $label, ": {}"), s))
            }
        }
    };
}

impl_wire_str!(RequestKind, "request kind", [Buy, Donate]);
impl_wire_str!(ProductStatus, "product status", [Pending, Active, Inactive]);
impl_wire_str!(RequestStatus, "request status", [Pending, Approved, Rejected]);
impl_wire_str!(SellerStatus, "seller status", [Pending, Active, Suspended, Banned]);
