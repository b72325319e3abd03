//! Confirmation cards for submitted requests and seller registrations.
//!
//! A card is rendered synchronously to HTML from the finished submission, so
//! an export captures exactly what was rendered at call time. Exporting to
//! PNG goes through a [`Rasterizer`]; a failed export is logged and never
//! blocks closing the card.

use askama::Template;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use labmarket_core::{Price, RequestKind};
use thiserror::Error;

use crate::checkout::{Registration, Submission};

/// Leading bytes of every PNG file.
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// What was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Buy,
    Donate,
    Seller,
}

impl ConfirmationKind {
    /// Prefix of the exported file name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Donate => "donate",
            Self::Seller => "seller",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Buy => "Quote Request Confirmation",
            Self::Donate => "Donation Request Confirmation",
            Self::Seller => "Seller Registration Confirmation",
        }
    }

    const fn thanks(self) -> &'static str {
        match self {
            Self::Seller => "Thank you for registering as a seller!",
            Self::Buy | Self::Donate => "Thank you for your request!",
        }
    }
}

impl From<RequestKind> for ConfirmationKind {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Buy => Self::Buy,
            RequestKind::Donate => Self::Donate,
        }
    }
}

/// One confirmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationItem {
    pub title: String,
    pub category: Option<String>,
    pub quantity: u32,
    /// Shown for buy requests only.
    pub unit_price: Option<Price>,
}

/// Everything a confirmation card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub kind: ConfirmationKind,
    pub reference: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub categories: Option<String>,
    pub items: Vec<ConfirmationItem>,
}

impl Confirmation {
    /// Card for a submitted buy or donate request.
    #[must_use]
    pub fn for_submission(submission: &Submission) -> Self {
        let kind = ConfirmationKind::from(submission.kind);
        let items = submission
            .items
            .iter()
            .map(|line| ConfirmationItem {
                title: line.product.title.clone(),
                category: line.product.category.clone(),
                quantity: line.quantity(),
                unit_price: match kind {
                    ConfirmationKind::Buy => line.product.price,
                    _ => None,
                },
            })
            .collect();

        Self {
            kind,
            reference: Some(submission.request_id.to_string()),
            name: submission.contact.name.clone(),
            email: submission.contact.email.to_string(),
            phone: submission.contact.phone.clone(),
            company: None,
            categories: None,
            items,
        }
    }

    /// Card for a seller registration.
    #[must_use]
    pub fn for_registration(registration: &Registration) -> Self {
        let form = &registration.form;
        Self {
            kind: ConfirmationKind::Seller,
            reference: Some(registration.id.to_string()),
            name: form.contact_name.clone(),
            email: form.email.to_string(),
            phone: form.phone.clone(),
            company: Some(form.company_name.clone()),
            categories: Some(form.product_categories.clone()).filter(|c| !c.is_empty()),
            items: Vec::new(),
        }
    }

    /// Render the card.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render_html(&self) -> Result<String, askama::Error> {
        let seller = self.kind == ConfirmationKind::Seller;
        ConfirmationCard {
            title: self.kind.title(),
            thanks: self.kind.thanks(),
            reference: self.reference.as_deref(),
            contact_heading: if seller { "Company Details" } else { "Contact Details" },
            company: self.company.as_deref(),
            name: &self.name,
            email: &self.email,
            phone: &self.phone,
            categories: self.categories.as_deref(),
            items_heading: if self.kind == ConfirmationKind::Buy {
                "Requested Items"
            } else {
                "Items for Donation"
            },
            items: self
                .items
                .iter()
                .map(|item| CardItem {
                    title: &item.title,
                    category: item.category.as_deref(),
                    quantity: item.quantity,
                    line_total: item.unit_price.map(|p| p.times(item.quantity)),
                })
                .collect(),
        }
        .render()
    }

    /// Download file name for an export taken at `at`.
    #[must_use]
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        format!(
            "{}-confirmation-{}.png",
            self.kind.as_str(),
            at.timestamp_millis()
        )
    }

    /// Render and rasterize the card.
    ///
    /// Returns `None` after logging a warning if any step fails.
    #[must_use]
    pub fn export_png(&self, rasterizer: &dyn Rasterizer, at: DateTime<Utc>) -> Option<PngExport> {
        match self.try_export_png(rasterizer, at) {
            Ok(export) => Some(export),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kind = self.kind.as_str(),
                    "failed to generate confirmation image"
                );
                None
            }
        }
    }

    fn try_export_png(
        &self,
        rasterizer: &dyn Rasterizer,
        at: DateTime<Utc>,
    ) -> Result<PngExport, ExportError> {
        let html = self.render_html()?;
        let png = rasterizer.rasterize(&html).map_err(ExportError::Raster)?;
        if !png.starts_with(PNG_SIGNATURE) {
            return Err(ExportError::NotPng);
        }

        Ok(PngExport {
            file_name: self.file_name(at),
            data_url: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
        })
    }
}

#[derive(Template)]
#[template(path = "confirmation.html")]
struct ConfirmationCard<'a> {
    title: &'a str,
    thanks: &'a str,
    reference: Option<&'a str>,
    contact_heading: &'a str,
    company: Option<&'a str>,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    categories: Option<&'a str>,
    items_heading: &'a str,
    items: Vec<CardItem<'a>>,
}

struct CardItem<'a> {
    title: &'a str,
    category: Option<&'a str>,
    quantity: u32,
    line_total: Option<Price>,
}

/// Turns rendered card HTML into PNG bytes.
pub trait Rasterizer {
    /// # Errors
    ///
    /// Returns a description of what went wrong.
    fn rasterize(&self, html: &str) -> Result<Vec<u8>, String>;
}

/// An exported card, ready for a download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngExport {
    /// `{kind}-confirmation-{unix_millis}.png`
    pub file_name: String,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

#[derive(Debug, Error)]
enum ExportError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Rasterizer error: {0}")]
    Raster(String),

    #[error("Rasterizer output is not a PNG")]
    NotPng,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedPng;

    impl Rasterizer for FixedPng {
        fn rasterize(&self, _html: &str) -> Result<Vec<u8>, String> {
            let mut bytes = PNG_SIGNATURE.to_vec();
            bytes.extend_from_slice(b"IHDR");
            Ok(bytes)
        }
    }

    struct Broken;

    impl Rasterizer for Broken {
        fn rasterize(&self, _html: &str) -> Result<Vec<u8>, String> {
            Err("canvas unavailable".to_string())
        }
    }

    fn buy_card() -> Confirmation {
        Confirmation {
            kind: ConfirmationKind::Buy,
            reference: Some("a1b2".to_string()),
            name: "Ada <script>".to_string(),
            email: "ada@lab.org".to_string(),
            phone: "555".to_string(),
            company: None,
            categories: None,
            items: vec![ConfirmationItem {
                title: "Pipette".to_string(),
                category: Some("Liquid Handling".to_string()),
                quantity: 3,
                unit_price: Some(Price::from_cents(1250)),
            }],
        }
    }

    #[test]
    fn test_render_buy_card() {
        let html = buy_card().render_html().unwrap();
        assert!(html.contains("Quote Request Confirmation"));
        assert!(html.contains("Reference Number"));
        assert!(html.contains("Requested Items"));
        assert!(html.contains("37.50"));
        assert!(html.contains("Ada &#60;script&#62;") || html.contains("Ada &lt;script&gt;"));
    }

    #[test]
    fn test_render_seller_card() {
        let card = Confirmation {
            kind: ConfirmationKind::Seller,
            company: Some("Acme Labs".to_string()),
            items: Vec::new(),
            ..buy_card()
        };
        let html = card.render_html().unwrap();
        assert!(html.contains("Seller Registration Confirmation"));
        assert!(html.contains("Thank you for registering as a seller!"));
        assert!(html.contains("Company Details"));
        assert!(!html.contains("Requested Items"));
    }

    #[test]
    fn test_export_png() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let export = buy_card().export_png(&FixedPng, at).unwrap();

        assert_eq!(export.file_name, "buy-confirmation-1700000000123.png");
        let encoded = export.data_url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert!(decoded.starts_with(PNG_SIGNATURE));
        assert!(decoded.ends_with(b"IHDR"));
    }

    #[test]
    fn test_export_failure_is_swallowed() {
        assert!(buy_card().export_png(&Broken, Utc::now()).is_none());
    }
}
