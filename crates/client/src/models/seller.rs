//! Sellers and seller registrations.

use chrono::{DateTime, Utc};
use labmarket_core::{ContactError, Email, SellerId, SellerStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::backend::Table;

/// An approved (or moderated) seller account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: SellerStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Seller {
    const TABLE: Table = Table::Sellers;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// The seller registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerRegistration {
    pub company_name: String,
    pub contact_name: String,
    pub email: Email,
    pub phone: String,
    pub business_description: String,
    pub product_categories: String,
}

impl SellerRegistration {
    /// Validate raw form fields.
    ///
    /// Company, contact, email and phone are required; the descriptive
    /// fields may be blank.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError`] for a blank required field or bad email.
    pub fn new(
        company_name: &str,
        contact_name: &str,
        email: &str,
        phone: &str,
        business_description: &str,
        product_categories: &str,
    ) -> Result<Self, ContactError> {
        let required = |value: &str, field: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(ContactError::Missing(field))
            } else {
                Ok(value.to_owned())
            }
        };

        Ok(Self {
            company_name: required(company_name, "company name")?,
            contact_name: required(contact_name, "contact name")?,
            email: Email::parse(email)?,
            phone: required(phone, "phone")?,
            business_description: business_description.trim().to_owned(),
            product_categories: product_categories.trim().to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_requires_company() {
        assert_eq!(
            SellerRegistration::new(" ", "Ada", "ada@lab.org", "555", "", ""),
            Err(ContactError::Missing("company name"))
        );
    }

    #[test]
    fn test_registration_trims() {
        let form = SellerRegistration::new(
            " Acme Labs ",
            "Ada",
            "Ada@Lab.org",
            "555",
            " Used microscopes ",
            "Microscopes",
        )
        .unwrap();
        assert_eq!(form.company_name, "Acme Labs");
        assert_eq!(form.email.as_str(), "ada@lab.org");
        assert_eq!(form.business_description, "Used microscopes");
    }
}
