//! Transactional email through a hosted relay.
//!
//! The relay stores the template; we send the service/template/public-key
//! triple plus template parameters. Anything but HTTP 200 is a failure.

use askama::Template;
use labmarket_core::{RequestKind, RequestStatus};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::EmailRelayConfig;
use crate::models::Request;

/// Relay REST endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Errors that can occur when sending through the email relay.
#[derive(Debug, Error)]
pub enum EmailRelayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with something other than 200.
    #[error("Failed to send email: {status} - {message}")]
    Rejected { status: u16, message: String },
}

/// One message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub message: String,
}

impl OutgoingEmail {
    /// Tell a requester their request was approved or rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the message template fails to render.
    pub fn request_status(request: &Request, status: RequestStatus) -> Result<Self, askama::Error> {
        let kind_label = match request.kind {
            RequestKind::Buy => "quote request",
            RequestKind::Donate => "donation request",
        };
        let reference = request.id.to_string();
        let message = RequestStatusText {
            name: &request.user_name,
            kind_label,
            reference: &reference,
            status: status.as_str(),
            approved: status == RequestStatus::Approved,
        }
        .render()?;

        Ok(Self {
            to_email: request.user_email.clone(),
            to_name: request.user_name.clone(),
            subject: format!("Your {kind_label} has been {status}"),
            message,
        })
    }
}

/// Plain text body for request status notifications.
#[derive(Template)]
#[template(path = "email/request_status.txt")]
struct RequestStatusText<'a> {
    name: &'a str,
    kind_label: &'a str,
    reference: &'a str,
    status: &'a str,
    approved: bool,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    to_name: &'a str,
    subject: &'a str,
    message: &'a str,
    from_name: &'a str,
    from_email: &'a str,
    reply_to: &'a str,
}

/// Email relay client.
#[derive(Debug, Clone)]
pub struct EmailRelayClient {
    client: reqwest::Client,
    endpoint: String,
    config: EmailRelayConfig,
}

impl EmailRelayClient {
    /// Create a client for the public relay endpoint.
    #[must_use]
    pub fn new(config: EmailRelayConfig) -> Self {
        Self::with_endpoint(config, DEFAULT_ENDPOINT)
    }

    /// Create a client posting to `endpoint` instead.
    #[must_use]
    pub fn with_endpoint(config: EmailRelayConfig, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            config,
        }
    }

    /// Send `email` from the configured sender.
    ///
    /// # Errors
    ///
    /// Returns [`EmailRelayError::Rejected`] with the relay's response text
    /// for any status other than 200.
    #[instrument(skip(self, email), fields(to = %email.to_email))]
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailRelayError> {
        let body = self.payload(email);
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %message, "email relay rejected send");
            return Err(EmailRelayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!("email sent");
        Ok(())
    }

    fn payload<'a>(&'a self, email: &'a OutgoingEmail) -> SendRequest<'a> {
        SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: TemplateParams {
                to_email: &email.to_email,
                to_name: &email.to_name,
                subject: &email.subject,
                message: &email.message,
                from_name: &self.config.from_name,
                from_email: &self.config.from_address,
                reply_to: &self.config.from_address,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> EmailRelayConfig {
        EmailRelayConfig {
            service_id: "service_1".to_string(),
            template_id: "template_1".to_string(),
            public_key: "pk_1".to_string(),
            from_address: "team@labmarket.test".to_string(),
            from_name: "LabMarket Team".to_string(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let client = EmailRelayClient::new(config());
        let email = OutgoingEmail {
            to_email: "ada@lab.org".to_string(),
            to_name: "Ada".to_string(),
            subject: "Your quote request".to_string(),
            message: "Approved".to_string(),
        };

        let body = serde_json::to_value(client.payload(&email)).unwrap();
        assert_eq!(body["service_id"], "service_1");
        assert_eq!(body["user_id"], "pk_1");
        assert_eq!(body["template_params"]["to_email"], "ada@lab.org");
        assert_eq!(body["template_params"]["reply_to"], "team@labmarket.test");
        assert_eq!(body["template_params"]["from_name"], "LabMarket Team");
    }

    #[test]
    fn test_request_status_email() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "id": "0b6b1c7e-51b5-4d0c-8f3a-6a1c1f3d9e20",
            "user_name": "Ada",
            "user_email": "ada@lab.org",
            "user_phone": "555",
            "type": "buy",
            "status": "pending",
            "created_at": "2024-02-01T00:00:00Z"
        }))
        .unwrap();

        let email = OutgoingEmail::request_status(&request, RequestStatus::Approved).unwrap();
        assert_eq!(email.to_email, "ada@lab.org");
        assert_eq!(email.subject, "Your quote request has been approved");
        assert!(email.message.contains("Hello Ada,"));
        assert!(email.message.contains("0b6b1c7e-51b5-4d0c-8f3a-6a1c1f3d9e20"));
        assert!(email.message.contains("contact you shortly"));
    }

    #[test]
    fn test_rejected_display() {
        let err = EmailRelayError::Rejected {
            status: 400,
            message: "The template ID is invalid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to send email: 400 - The template ID is invalid"
        );
    }
}
