//! Athlete identifier parsing
//!
//! parkrun athlete IDs are printed on barcodes as `A` followed by up to nine
//! digits. Input is accepted in any case and normalized to upper case before
//! validation.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Upper-cased athlete ID: `A`, then 1-9 digits with no leading zero
static ATHLETE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^A([1-9][0-9]{0,8})$").expect("athlete ID pattern is valid"));

/// Errors produced while parsing an athlete identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AthleteIdError {
    /// Nothing (or only the `A` prefix) was supplied
    #[error("Athlete ID is required")]
    Missing,

    /// The value does not look like an athlete ID; carries the upper-cased input
    #[error("Invalid Athlete ID ({0})")]
    Invalid(String),
}

/// A validated athlete identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AthleteId {
    key: String,
}

impl AthleteId {
    /// Parses a raw identifier, e.g. from the `aid` query parameter.
    ///
    /// # Returns
    /// * `Ok(AthleteId)` for `A208864`, `a208864`, ...
    /// * `Err(AthleteIdError::Missing)` for an empty string or a bare `A`
    /// * `Err(AthleteIdError::Invalid)` for anything else that fails the pattern
    pub fn parse(raw: &str) -> Result<Self, AthleteIdError> {
        let normalized = raw.to_uppercase();

        if normalized.is_empty() || normalized == "A" {
            return Err(AthleteIdError::Missing);
        }

        let captures = ATHLETE_ID_PATTERN
            .captures(&normalized)
            .ok_or_else(|| AthleteIdError::Invalid(normalized.clone()))?;

        Ok(Self {
            key: captures[1].to_string(),
        })
    }

    /// The numeric part of the ID, used as the cache key and in profile URLs
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.key)
    }
}
