use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?([0-9a-fA-F]{6})$").expect("Failed to compile color regex"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid color {0:?}: expected a #RRGGBB hex value")]
    InvalidHex(String),
}

/// A mark color, normalized to `#RRGGBB` with uppercase hex digits.
///
/// Normalization happens once at parse time so the same color always
/// serializes to the same string and round-trips through storage unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkColor(String);

impl MarkColor {
    /// Parse user input into a normalized color. The leading `#` is
    /// optional; anything that is not six hex digits is rejected so the
    /// caller can reprompt.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        match HEX_COLOR_RE.captures(input.trim()) {
            Some(caps) => Ok(Self(format!("#{}", caps[1].to_ascii_uppercase()))),
            None => Err(ColorError::InvalidHex(input.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MarkColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MarkColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MarkColor> for String {
    fn from(color: MarkColor) -> Self {
        color.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalizes_hex() {
        assert_eq!(MarkColor::parse("#ff00aa").unwrap().as_str(), "#FF00AA");
        assert_eq!(MarkColor::parse("ff00aa").unwrap().as_str(), "#FF00AA");
        assert_eq!(MarkColor::parse(" #FFFF00 ").unwrap().as_str(), "#FFFF00");
    }

    #[test]
    fn rejects_non_hex_input() {
        assert!(MarkColor::parse("red").is_err());
        assert!(MarkColor::parse("#f00").is_err());
        assert!(MarkColor::parse("#ff00aa00").is_err());
        assert!(MarkColor::parse("").is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let color = MarkColor::parse("#ff00aa").unwrap();
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#FF00AA\"");

        let parsed: MarkColor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, color);
    }

    #[test]
    fn deserializing_garbage_fails() {
        let result: Result<MarkColor, _> = serde_json::from_str("\"not-a-color\"");
        assert!(result.is_err());
    }
}
