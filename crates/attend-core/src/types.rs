//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of hex characters in an issued scan code.
pub const ISSUED_CODE_LEN: usize = 12;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The provided value contained whitespace where none is allowed.
    #[error("{field} cannot contain whitespace")]
    Whitespace { field: &'static str },

    /// Invalid person category value.
    #[error("invalid person category: {value}")]
    InvalidCategory { value: String },

    /// Invalid event kind value.
    #[error("invalid event kind: {value}")]
    InvalidEventKind { value: String },

    /// Invalid timeliness value.
    #[error("invalid timeliness: {value}")]
    InvalidTimeliness { value: String },
}

/// A validated scan code (the string printed in a person's barcode).
///
/// Scan codes are the sole join key between the person registry and the
/// event log. They must be non-empty and free of whitespace; uniqueness is
/// enforced by the store across staff and students alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanCode(String);

impl ScanCode {
    const FIELD: &'static str = "scan code";

    /// Creates a new code after validation.
    ///
    /// Surrounding whitespace is trimmed; inner whitespace is rejected.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::Whitespace { field: Self::FIELD });
        }
        if trimmed.len() == code.len() {
            Ok(Self(code))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Issues a fresh random code: the leading hex digits of a v4 UUID.
    #[must_use]
    pub fn issue() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..ISSUED_CODE_LEN].to_string())
    }
}

impl TryFrom<String> for ScanCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScanCode> for String {
    fn from(code: ScanCode) -> Self {
        code.0
    }
}

impl FromStr for ScanCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ScanCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_code_rejects_empty() {
        assert_eq!(
            ScanCode::new(""),
            Err(ValidationError::Empty { field: "scan code" })
        );
        assert!(ScanCode::new("   ").is_err());
        assert!(ScanCode::new("abc123").is_ok());
    }

    #[test]
    fn scan_code_trims_surrounding_whitespace() {
        let code = ScanCode::new("  abc123\n").unwrap();
        assert_eq!(code.as_str(), "abc123");
    }

    #[test]
    fn scan_code_rejects_inner_whitespace() {
        let err = ScanCode::new("abc 123").unwrap_err();
        assert_eq!(err.to_string(), "scan code cannot contain whitespace");
    }

    #[test]
    fn scan_code_serde_rejects_empty() {
        let result: Result<ScanCode, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let parsed: ScanCode = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(parsed.as_ref(), "abc123");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"abc123\"");
    }

    #[test]
    fn issued_codes_are_twelve_hex_chars() {
        let code = ScanCode::issue();
        assert_eq!(code.as_str().len(), ISSUED_CODE_LEN);
        assert!(code.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(ScanCode::issue(), code);
    }

    #[test]
    fn scan_code_parses_from_str() {
        let code: ScanCode = "f00dfeed".parse().unwrap();
        assert_eq!(code.to_string(), "f00dfeed");
    }
}
