use std::fmt;

/// Strips every non-digit character from a raw phone number.
///
/// `"+1 (555) 123-4567"` becomes `"15551234567"`. The result may be empty.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// A digit-only recipient number, guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientId(String);

impl RecipientId {
    /// Normalizes `raw` and rejects it if nothing is left.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = normalize(raw);
        if digits.is_empty() { None } else { Some(Self(digits)) }
    }

    /// Builds the chat-network address for this recipient, e.g. `15551234567@c.us`.
    #[must_use]
    pub fn destination(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
