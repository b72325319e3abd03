//! Outbound third-party services.

pub mod contact;
pub mod email;

pub use contact::{ContactMessage, whatsapp_link};
pub use email::{EmailRelayClient, EmailRelayError, OutgoingEmail};
