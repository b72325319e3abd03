//! Unified error handling with Sentry integration.
//!
//! Every user action returns `Result<T, MarketError>`. Nothing is fatal:
//! [`report`] logs the failure, captures remote failures to Sentry and hands
//! back the short notice to show the user.

use std::sync::Arc;

use labmarket_core::{ContactError, RequestId, RequestKind, RequestStatus};
use thiserror::Error;

use crate::backend::BackendError;
use crate::services::email::EmailRelayError;

/// Marketplace-level error type.
#[derive(Debug, Error)]
pub enum MarketError {
    /// A backend read or write failed.
    #[error("Backend error: {0}")]
    Backend(#[source] Arc<BackendError>),

    /// The email relay rejected or failed a send.
    #[error("Email relay error: {0}")]
    EmailRelay(#[from] EmailRelayError),

    /// Form input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ContactError),

    /// Submission of a cart with no lines.
    #[error("The {0} cart is empty")]
    EmptyCart(RequestKind),

    /// A status change the request state machine does not allow.
    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Line items failed and the header could not be removed either.
    #[error(
        "Request {request_id} was left without line items: {source} (cleanup failed: {cleanup})"
    )]
    OrphanedRequest {
        request_id: RequestId,
        #[source]
        source: BackendError,
        cleanup: BackendError,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<BackendError> for MarketError {
    fn from(err: BackendError) -> Self {
        Self::Backend(Arc::new(err))
    }
}

impl From<Arc<BackendError>> for MarketError {
    fn from(err: Arc<BackendError>) -> Self {
        Self::Backend(err)
    }
}

impl MarketError {
    /// Short notice for the user. Never includes internal detail.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(err) => match err.as_ref() {
                BackendError::RateLimited(_) => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                BackendError::NotFound(_) => "That item no longer exists.".to_string(),
                _ => "Something went wrong. Please try again.".to_string(),
            },
            Self::EmailRelay(_) => "Failed to send email.".to_string(),
            Self::Validation(err) => match err {
                ContactError::Missing(field) => format!("Please enter your {field}."),
                ContactError::Email(_) => "Please enter a valid email address.".to_string(),
            },
            Self::EmptyCart(_) => "Your cart is empty.".to_string(),
            Self::InvalidTransition { from, .. } if from.is_terminal() => {
                format!("This request has already been {from}.")
            }
            Self::InvalidTransition { .. } => {
                "Requests can only be approved or rejected.".to_string()
            }
            Self::OrphanedRequest { .. } => {
                "Failed to submit request. Please try again.".to_string()
            }
            Self::NotFound(_) => "That item no longer exists.".to_string(),
        }
    }

    /// Whether the failure came from a remote service.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::EmailRelay(_) | Self::OrphanedRequest { .. }
        )
    }
}

/// Result type alias for `MarketError`.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Log `err`, capture remote failures to Sentry, and return the user notice.
pub fn report(err: &MarketError) -> String {
    if err.is_remote() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Action failed"
        );
    } else {
        tracing::warn!(error = %err, "Action rejected");
    }
    err.user_message()
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to buy cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
