//! Bearer tokens.

use crate::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque bearer token. Never printed in full.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BearerToken(String);

impl BearerToken {
    /// Create a token. Surrounding whitespace and a leading `Bearer ` are
    /// stripped; empty tokens and tokens with inner whitespace are rejected.
    pub fn new(token: impl Into<String>) -> Result<Self, AuthError> {
        let token = token.into();
        let trimmed = token.trim();
        let trimmed = trimmed
            .strip_prefix("Bearer ")
            .map(str::trim)
            .unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Err(AuthError::InvalidToken("empty token".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidToken("token contains whitespace".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BearerToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BearerToken {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BearerToken> for String {
    fn from(token: BearerToken) -> Self {
        token.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "BearerToken({}...)", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_whitespace_stripped() {
        let token = BearerToken::new("  Bearer abc.def  ").unwrap();
        assert_eq!(token.expose(), "abc.def");
    }

    #[test]
    fn test_invalid_tokens() {
        assert!(BearerToken::new("   ").is_err());
        assert!(BearerToken::new("abc def").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = BearerToken::new("secret-token-value").unwrap();
        assert_eq!(format!("{:?}", token), "BearerToken(secr...)");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<BearerToken, _> = serde_json::from_str(r#""tok""#);
        assert!(ok.is_ok());
        let bad: Result<BearerToken, _> = serde_json::from_str(r#""""#);
        assert!(bad.is_err());
    }
}
