//! Payment details handed to the backend at checkout.
//!
//! The client never sees card numbers; it carries an opaque token from the
//! payment provider and, for display, the last four digits.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokenized payment method.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// Opaque payment token.
    pub token: String,
    /// Last four card digits, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
}

impl PaymentDetails {
    /// Create payment details from a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            card_last4: None,
        }
    }

    /// Attach the last four digits; must be exactly four ASCII digits.
    pub fn with_last4(mut self, last4: impl Into<String>) -> Result<Self, CommerceError> {
        let last4 = last4.into();
        if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
            return Err(CommerceError::ValidationError(format!(
                "card last4 must be four digits, got {:?}",
                last4
            )));
        }
        self.card_last4 = Some(last4);
        Ok(self)
    }

    /// Check if a token is present.
    pub fn is_complete(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Masked card label, e.g. `**** 4242`.
    pub fn masked(&self) -> String {
        match &self.card_last4 {
            Some(last4) => format!("**** {}", last4),
            None => "****".to_string(),
        }
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("token", &"[REDACTED]")
            .field("card_last4", &self.card_last4)
            .finish()
    }
}

impl fmt::Display for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let payment = PaymentDetails::new("tok_secret").with_last4("4242").unwrap();
        let debug = format!("{:?}", payment);
        assert!(!debug.contains("tok_secret"));
        assert_eq!(payment.to_string(), "**** 4242");
    }

    #[test]
    fn test_last4_validation() {
        assert!(PaymentDetails::new("t").with_last4("42a2").is_err());
        assert!(PaymentDetails::new("t").with_last4("12345").is_err());
    }

    #[test]
    fn test_blank_token_incomplete() {
        assert!(!PaymentDetails::new("  ").is_complete());
        assert_eq!(PaymentDetails::new("t").masked(), "****");
    }
}
