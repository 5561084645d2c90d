//! Per-item rating flow.
//!
//! A [`RatingSession`] is what a details view holds while one catalog item is
//! on screen: the hydrated ledger, the edit form, and whether the form was
//! pre-filled from an existing review.

use tracing::{info, warn};

use crate::error::LedgerResult;
use crate::ledger::{Ledger, LedgerRepository, UpsertKind};
use crate::record::{ItemId, ReviewCandidate, ReviewRecord, ScoreInput};

/// Edit state for rating one item.
#[derive(Debug)]
pub struct RatingSession {
    repo: LedgerRepository,
    item_id: ItemId,
    title: String,
    ledger: Ledger,
    /// False when activation could not read the stored ledger.
    hydrated: bool,
    /// Kind of an upsert whose save failed, reported again on retry.
    pending: Option<UpsertKind>,
    review: String,
    score_text: String,
    editing: bool,
}

impl RatingSession {
    /// Hydrate the ledger and open the form for `item_id`.
    ///
    /// `title` comes from the catalog and is only stored if this item has no
    /// record yet. If a record exists, the form is pre-filled from it.
    ///
    /// A failed or corrupt read still opens the session with an empty ledger
    /// so the item can be shown, but [`submit`](Self::submit) will not save
    /// until the stored ledger has been read successfully.
    pub fn activate(repo: LedgerRepository, item_id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        let item_id = item_id.into();
        let (ledger, hydrated) = match repo.load() {
            Ok(ledger) => (ledger, true),
            Err(e) => {
                warn!(key = repo.key(), error = %e, "ledger unavailable; submits are held until it can be read");
                (Ledger::new(), false)
            }
        };

        let (review, score_text, editing) = match ledger.find_by_id(&item_id) {
            Some(existing) => (existing.review_text.clone(), existing.score.to_string(), true),
            None => (String::new(), String::new(), false),
        };

        Self {
            repo,
            item_id,
            title: title.into(),
            ledger,
            hydrated,
            pending: None,
            review,
            score_text,
            editing,
        }
    }

    /// The item this session rates.
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Catalog title given at activation.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current review field.
    pub fn review(&self) -> &str {
        &self.review
    }

    /// Current score field, as typed.
    pub fn score_text(&self) -> &str {
        &self.score_text
    }

    /// True while the form holds an existing review for this item.
    pub const fn editing(&self) -> bool {
        self.editing
    }

    /// True once the stored ledger has been read successfully.
    pub const fn hydrated(&self) -> bool {
        self.hydrated
    }

    /// The in-memory ledger.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// All stored reviews, in ledger order.
    pub fn entries(&self) -> &[ReviewRecord] {
        self.ledger.records()
    }

    /// Replace the review field.
    pub fn set_review(&mut self, text: impl Into<String>) {
        self.review = text.into();
    }

    /// Replace the score field; parsed only on submit.
    pub fn set_score(&mut self, text: impl Into<String>) {
        self.score_text = text.into();
    }

    /// Validate the form, merge it into the ledger and persist the ledger.
    ///
    /// On a validation error nothing changes. If activation could not read
    /// the stored ledger, it is read again first and the submit fails without
    /// writing when that read fails too. Once validation passes the session
    /// adopts the merged ledger; if the save then fails, the error is
    /// returned and the form is kept so the caller can retry. The reported
    /// kind is relative to what was last persisted, so a retried first
    /// rating is still a `Create`.
    ///
    /// Takes `&mut self`, so submits on one session cannot overlap.
    ///
    /// # Errors
    /// - `LedgerError::Validation` for a bad score or empty review
    /// - `LedgerError::Corrupt` if the stored ledger cannot be decoded
    /// - `LedgerError::Storage` if the stored ledger cannot be read or the
    ///   write failed
    pub fn submit(&mut self) -> LedgerResult<UpsertKind> {
        let candidate = ReviewCandidate::new(
            self.item_id.clone(),
            self.title.clone(),
            self.review.clone(),
            ScoreInput::Text(self.score_text.clone()),
        );
        candidate.validate()?;

        if !self.hydrated {
            self.ledger = self.repo.load().inspect_err(|e| {
                warn!(item = %self.item_id, error = %e, "refusing to save over an unread ledger");
            })?;
            self.hydrated = true;
            info!(item = %self.item_id, records = self.ledger.len(), "ledger recovered on submit");
        }

        let kind = self
            .pending
            .unwrap_or_else(|| self.ledger.upsert_kind(&self.item_id));
        self.ledger = self.ledger.upsert(&candidate)?;

        if let Err(e) = self.repo.save(&self.ledger) {
            warn!(item = %self.item_id, error = %e, "review kept in memory but not persisted");
            self.pending = Some(kind);
            return Err(e.into());
        }

        info!(item = %self.item_id, ?kind, records = self.ledger.len(), "review submitted");
        self.pending = None;
        self.review.clear();
        self.score_text.clear();
        self.editing = false;
        Ok(kind)
    }
}
