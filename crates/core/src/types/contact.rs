//! Requester contact details attached to every request.

use serde::{Deserialize, Serialize};

use crate::types::email::{Email, EmailError};

/// Errors raised while validating [`ContactInfo`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// A required field was blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The email address failed validation.
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
}

/// Name, email and phone of the person submitting a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

impl ContactInfo {
    /// Build contact info from raw form fields.
    ///
    /// All three fields are required; surrounding whitespace is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::Missing`] for a blank field or
    /// [`ContactError::Email`] for a malformed address.
    pub fn new(name: &str, email: &str, phone: &str) -> Result<Self, ContactError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ContactError::Missing("name"));
        }
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ContactError::Missing("phone"));
        }
        Ok(Self {
            name: name.to_owned(),
            email: Email::parse(email)?,
            phone: phone.to_owned(),
        })
    }
}
