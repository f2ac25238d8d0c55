//! Product category used to select a tax rate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An enum-like product category name.
///
/// Names are normalized (trimmed, lowercased) so that `"Electronics "` and
/// `"electronics"` select the same tax rate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Category name the default pricing table gives a reduced rate.
    pub const ELECTRONICS: &'static str = "electronics";

    /// Create a category from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// The electronics category.
    pub fn electronics() -> Self {
        Self::new(Self::ELECTRONICS)
    }

    /// Get the normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.0
    }
}
