//! The static contact form's messaging hand-off.
//!
//! The form never touches the backend; it opens a chat deep link with the
//! message pre-filled.

/// What the contact form collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}

impl ContactMessage {
    /// Pre-filled chat text.
    #[must_use]
    pub fn text(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nSubject: {}\n\n{}",
            self.name.trim(),
            self.email.trim(),
            self.subject.trim(),
            self.body.trim()
        )
    }
}

/// `https://wa.me/{digits}?text={message}` for `number`.
///
/// Everything but digits is stripped from the number, so `+1 (555) 010-0`
/// and `15550100` give the same link.
#[must_use]
pub fn whatsapp_link(number: &str, message: &ContactMessage) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(&message.text())
    )
}
