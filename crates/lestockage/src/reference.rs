//! Human-readable reference numbers
//!
//! *Le Numéro de Référence* - `ONB-<YYYYMMDD>-<8 hex>` identifiers handed to customers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reference number assigned to an onboarding request at creation.
///
/// Format: `ONB-<YYYYMMDD>-<suffix>` where the date is the UTC creation
/// day and the suffix is the first 8 lowercase hex characters of a fresh
/// random UUID.
///
/// # Example
///
/// ```
/// use lestockage::ReferenceNumber;
///
/// let reference = ReferenceNumber::generate();
/// assert!(reference.as_str().starts_with("ONB-"));
/// assert_eq!(reference.as_str().len(), 21);
/// assert!(ReferenceNumber::parse(reference.as_str()).is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Fixed prefix of every reference number
    pub const PREFIX: &'static str = "ONB";

    /// Character length of the random suffix
    const SUFFIX_LEN: usize = 8;

    /// Character length of the date component
    const DATE_LEN: usize = 8;

    /// Generate a reference number for the current UTC day
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate a reference number for the day of `now`
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}-{}",
            Self::PREFIX,
            now.format("%Y%m%d"),
            &random[..Self::SUFFIX_LEN]
        ))
    }

    /// Parse and validate an existing reference number
    ///
    /// Returns `None` unless the prefix, a real calendar date and an
    /// 8-character hex suffix are all present.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('-');
        let (prefix, date, suffix) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || prefix != Self::PREFIX {
            return None;
        }

        if date.len() != Self::DATE_LEN || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return None;
        }

        if suffix.len() != Self::SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        Some(Self(s.to_string()))
    }

    /// Borrow the formatted value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar day encoded in the reference number
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        let date = self.0.split('-').nth(1)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ReferenceNumber> for String {
    fn from(reference: ReferenceNumber) -> Self {
        reference.0
    }
}
