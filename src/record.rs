//! Review records and their building blocks.
//!
//! A [`ReviewRecord`] is one user's review and score for one catalog item.
//! Field names on the wire (`id`, `title`, `review`, `rating`) match the blob
//! layout the mobile client already wrote, so existing ledgers stay readable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound for review text, in bytes after trimming.
pub const MAX_REVIEW_LEN: usize = 16 * 1024;

/// Upper bound for a captured title, in bytes.
pub const MAX_TITLE_LEN: usize = 1024;

/// Opaque catalog item identifier.
///
/// The catalog hands out numeric ids for movies and shows, but any string id
/// is accepted as well. Serialized untagged, as a bare JSON number or string.
///
/// # Examples
///
/// ```
/// use reviewledger::ItemId;
///
/// assert_eq!(ItemId::from(42), ItemId::Int(42));
/// assert_eq!(ItemId::parse("42"), ItemId::Int(42));
/// assert_eq!(ItemId::parse("tt0111161"), ItemId::Str("tt0111161".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric catalog id.
    Int(i64),
    /// Any non-numeric id.
    Str(String),
}

impl ItemId {
    /// Interpret user-supplied text: integers become [`ItemId::Int`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map_or_else(|_| Self::Str(raw.to_string()), Self::Int)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// A validated rating in the inclusive range `[1, 10]`.
///
/// Fractional scores are allowed; NaN and infinities are not.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "ScoreRepr", into = "f64")]
pub struct Score(f64);

impl Score {
    /// Lowest accepted score.
    pub const MIN: f64 = 1.0;
    /// Highest accepted score.
    pub const MAX: f64 = 10.0;

    /// Validate a numeric score.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidScore` for non-finite or out-of-range values.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::invalid_score(value.to_string()))
        }
    }

    /// Parse a score typed into a text field.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidScore` when the text is blank, not a
    /// number, or out of range.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| ValidationError::invalid_score(raw))?;
        Self::new(value).map_err(|_| ValidationError::invalid_score(raw))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Stored form of a score; older blobs kept the raw text field.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<ScoreRepr> for Score {
    type Error = ValidationError;

    fn try_from(repr: ScoreRepr) -> Result<Self, Self::Error> {
        match repr {
            ScoreRepr::Number(v) => Self::new(v),
            ScoreRepr::Text(s) => Self::parse(&s),
        }
    }
}

/// Raw score as received from a form, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreInput {
    /// Nothing was entered.
    Missing,
    /// A numeric value from a typed source.
    Number(f64),
    /// Free text from an input field.
    Text(String),
}

impl ScoreInput {
    /// Validate into a [`Score`].
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidScore` if missing, non-numeric, or out of range.
    pub fn validate(&self) -> Result<Score, ValidationError> {
        match self {
            Self::Missing => Err(ValidationError::invalid_score("")),
            Self::Number(v) => Score::new(*v),
            Self::Text(s) => Score::parse(s),
        }
    }
}

impl From<f64> for ScoreInput {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u8> for ScoreInput {
    fn from(v: u8) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for ScoreInput {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for ScoreInput {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ScoreInput {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<ScoreInput>> From<Option<T>> for ScoreInput {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

/// One stored review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Catalog item this review belongs to.
    #[serde(rename = "id")]
    pub item_id: ItemId,
    /// Display title captured when the record was created.
    pub title: String,
    /// Review body.
    #[serde(rename = "review")]
    pub review_text: String,
    /// Rating in `[1, 10]`.
    #[serde(rename = "rating")]
    pub score: Score,
    /// When the review was last written. Absent in records from older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Check the stored-record invariants (used when hydrating from storage).
    pub(crate) fn check(&self) -> Result<(), ValidationError> {
        validate_review(&self.review_text)
    }
}

/// Unvalidated input to an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate {
    /// Item being rated.
    pub item_id: ItemId,
    /// Only used when the upsert creates a record.
    pub title: String,
    /// Review body, as entered.
    pub review_text: String,
    /// Raw score input.
    pub score: ScoreInput,
}

impl ReviewCandidate {
    /// Create a candidate.
    pub fn new(
        item_id: impl Into<ItemId>,
        title: impl Into<String>,
        review_text: impl Into<String>,
        score: impl Into<ScoreInput>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            review_text: review_text.into(),
            score: score.into(),
        }
    }

    /// Validate all fields, score first.
    pub(crate) fn validate(&self) -> Result<Score, ValidationError> {
        let score = self.score.validate()?;
        validate_review(&self.review_text)?;
        if self.title.len() > MAX_TITLE_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "title".to_string(),
                max_length: MAX_TITLE_LEN,
            });
        }
        Ok(score)
    }
}

fn validate_review(text: &str) -> Result<(), ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyReview);
    }
    if trimmed.len() > MAX_REVIEW_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "review".to_string(),
            max_length: MAX_REVIEW_LEN,
        });
    }
    Ok(())
}
