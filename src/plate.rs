//! License-plate normalization and validation.
//!
//! Every path that accepts plate text from a user goes through [`Plate::parse`]
//! before it touches the registry or the lookup API.
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Two province digits, a one or two letter series, then five or six digits.
const PLATE_PATTERN: &str = r"^\d{2}[A-Z]{1,2}\d{5,6}$";

fn plate_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(PLATE_PATTERN).expect("plate pattern compiles"))
}

/// Uppercase and strip everything that is not an ASCII letter or digit.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// A normalized plate that matches the issuing authority's format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Plate(String);

impl Plate {
    /// Normalize `raw` and validate the result.
    pub fn parse(raw: &str) -> Result<Self, PlateError> {
        let normalized = normalize(raw);
        if plate_regex().is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(PlateError {
                input: raw.to_string(),
                normalized,
            })
        }
    }

    /// Accept only text that is already in normalized form.
    ///
    /// Used when reading persisted keys, which must never need rewriting.
    pub fn parse_stored(stored: &str) -> Result<Self, PlateError> {
        let plate = Self::parse(stored)?;
        if plate.0 != stored {
            return Err(PlateError {
                input: stored.to_string(),
                normalized: plate.0,
            });
        }
        Ok(plate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plate text that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateError {
    pub input: String,
    pub normalized: String,
}

impl fmt::Display for PlateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid plate {:?} (normalized {:?})",
            self.input, self.normalized
        )
    }
}

impl std::error::Error for PlateError {}
