//! Validated text types shared across the Perisentez crates.
//!
//! Values of these types are checked once at the boundary (form input, CLI argument,
//! deserialisation) so the rest of the code can rely on their invariants.

use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The username exceeded [`Username::MAX_LEN`] bytes
    #[error("username exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    /// The username contained characters outside `[A-Za-z0-9._-]`
    #[error("username contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A clinician login name.
///
/// Usernames double as directory names for per-clinician patient records, so they are
/// restricted to a conservative ASCII set: alphanumerics, `.`, `-` and `_`. A name made
/// only of dots is rejected so it can never resolve to `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    pub const MAX_LEN: usize = 64;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }

        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok || trimmed.bytes().all(|b| b == b'.') {
            return Err(TextError::InvalidCharacters);
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Username {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Username::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Ayşe Yılmaz \n").unwrap();
        assert_eq!(text.as_str(), "Ayşe Yılmaz");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn non_empty_text_rejects_blank_json() {
        let err = serde_json::from_str::<NonEmptyText>("\" \"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn username_accepts_conservative_ascii() {
        let name = Username::parse("dr.sema_k-1").unwrap();
        assert_eq!(name.as_str(), "dr.sema_k-1");
    }

    #[test]
    fn username_rejects_path_like_values() {
        assert_eq!(
            Username::parse("../etc").unwrap_err(),
            TextError::InvalidCharacters
        );
        assert_eq!(Username::parse("..").unwrap_err(), TextError::InvalidCharacters);
        assert_eq!(
            Username::parse("dr sema").unwrap_err(),
            TextError::InvalidCharacters
        );
        assert_eq!(
            Username::parse("şema").unwrap_err(),
            TextError::InvalidCharacters
        );
    }

    #[test]
    fn username_rejects_overlong_values() {
        let long = "a".repeat(Username::MAX_LEN + 1);
        assert_eq!(
            Username::parse(long).unwrap_err(),
            TextError::TooLong {
                max: Username::MAX_LEN
            }
        );
    }
}
