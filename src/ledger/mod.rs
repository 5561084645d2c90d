//! The rating ledger.
//!
//! A [`Ledger`] is the ordered collection of a user's reviews. It keeps two
//! invariants at all times:
//! - at most one [`ReviewRecord`] per [`ItemId`]
//! - every record has a score in `[1, 10]` and non-empty review text
//!
//! New records are appended; updates replace a record in its original slot.
//! All merge logic is pure; persistence lives in [`LedgerRepository`].

mod repository;

pub use repository::LedgerRepository;

use std::collections::HashMap;

use chrono::Utc;

use crate::error::{LedgerError, ValidationError};
use crate::record::{ItemId, ReviewCandidate, ReviewRecord};
use crate::storage::StorageError;

/// What an upsert did (or would do) for a given item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// No record existed; one was appended.
    Create,
    /// A record existed; its review and score were replaced in place.
    Update,
}

/// Ordered, id-unique collection of review records.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<ReviewRecord>,
    /// item id -> position in `records`
    index: HashMap<ItemId, usize>,
}

impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from stored records, enforcing the ledger invariants.
    ///
    /// # Errors
    /// Returns `LedgerError::Corrupt` on a duplicate id or a record with
    /// empty or oversized review text.
    pub fn from_records(records: Vec<ReviewRecord>) -> Result<Self, LedgerError> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            record.check().map_err(|e| {
                LedgerError::corrupt(format!("record {} (id {}): {e}", pos, record.item_id))
            })?;
            if index.insert(record.item_id.clone(), pos).is_some() {
                return Err(LedgerError::corrupt(format!(
                    "duplicate item id {} at position {pos}",
                    record.item_id
                )));
            }
        }
        Ok(Self { records, index })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ledger order.
    #[must_use]
    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    /// Iterate over records in ledger order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReviewRecord> {
        self.records.iter()
    }

    /// Look up the record for `item_id`.
    #[must_use]
    pub fn find_by_id(&self, item_id: &ItemId) -> Option<&ReviewRecord> {
        self.position(item_id).map(|pos| &self.records[pos])
    }

    /// Position of the record for `item_id`, if any.
    #[must_use]
    pub fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.index.get(item_id).copied()
    }

    /// Returns true if a record exists for `item_id`.
    #[must_use]
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.index.contains_key(item_id)
    }

    /// Whether an upsert for `item_id` would create or update.
    #[must_use]
    pub fn upsert_kind(&self, item_id: &ItemId) -> UpsertKind {
        if self.contains(item_id) {
            UpsertKind::Update
        } else {
            UpsertKind::Create
        }
    }

    /// Insert or update the record for `candidate.item_id`, returning the new ledger.
    ///
    /// `self` is left untouched, on success and on failure.
    ///
    /// # Errors
    /// Returns the first validation failure; nothing is merged in that case.
    pub fn upsert(&self, candidate: &ReviewCandidate) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.upsert_in_place(candidate)?;
        Ok(next)
    }

    /// Same as [`Ledger::upsert`] but mutates `self`, for single-owner callers.
    ///
    /// Validation runs before any mutation, so on error `self` is unchanged.
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn upsert_in_place(&mut self, candidate: &ReviewCandidate) -> Result<UpsertKind, ValidationError> {
        let score = candidate.validate()?;
        let now = Utc::now();

        if let Some(pos) = self.position(&candidate.item_id) {
            // Title is captured at creation only.
            let record = &mut self.records[pos];
            record.review_text.clone_from(&candidate.review_text);
            record.score = score;
            record.rated_at = Some(now);
            return Ok(UpsertKind::Update);
        }

        self.index.insert(candidate.item_id.clone(), self.records.len());
        self.records.push(ReviewRecord {
            item_id: candidate.item_id.clone(),
            title: candidate.title.clone(),
            review_text: candidate.review_text.clone(),
            score,
            rated_at: Some(now),
        });
        Ok(UpsertKind::Create)
    }

    /// Serialize the whole ledger as one blob (a JSON array of records).
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(&self.records)
            .map_err(|e| StorageError::Backend(format!("ledger serialization failed: {e}")))
    }

    /// Rebuild a ledger from a blob produced by [`Ledger::to_bytes`].
    ///
    /// # Errors
    /// Returns `LedgerError::Corrupt` if the blob does not decode or breaks
    /// a ledger invariant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let records: Vec<ReviewRecord> = serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::corrupt(format!("ledger blob does not decode: {e}")))?;
        Self::from_records(records)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a ReviewRecord;
    type IntoIter = std::slice::Iter<'a, ReviewRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
