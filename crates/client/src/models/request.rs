//! Buy-quote and donation requests.

use chrono::{DateTime, Utc};
use labmarket_core::{ContactInfo, ProductId, RequestId, RequestKind, RequestStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::backend::Table;

/// A submitted request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Request {
    const TABLE: Table = Table::Requests;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Header row written by the first phase of a submission.
#[derive(Debug, Clone, Serialize)]
pub struct NewRequest<'a> {
    pub user_name: &'a str,
    pub user_email: &'a str,
    pub user_phone: &'a str,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub status: RequestStatus,
}

impl<'a> NewRequest<'a> {
    /// A pending request of `kind` from `contact`.
    #[must_use]
    pub fn pending(kind: RequestKind, contact: &'a ContactInfo) -> Self {
        Self {
            user_name: &contact.name,
            user_email: contact.email.as_str(),
            user_phone: &contact.phone,
            kind,
            status: RequestStatus::Pending,
        }
    }
}

/// A `request_products` join row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub request_id: RequestId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_wire_shape() {
        let contact = ContactInfo::new("Ada", "ada@lab.org", "555").unwrap();
        let row = serde_json::to_value(NewRequest::pending(RequestKind::Donate, &contact)).unwrap();

        assert_eq!(
            row,
            serde_json::json!({
                "user_name": "Ada",
                "user_email": "ada@lab.org",
                "user_phone": "555",
                "type": "donate",
                "status": "pending"
            })
        );
    }
}
