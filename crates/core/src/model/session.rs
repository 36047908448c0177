use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ItemId, SessionId, StudySetId};
use crate::model::item::StudyItem;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("too many items for a single session: {len}")]
    TooManyItems { len: usize },
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Correctness per answered item, keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionResults(BTreeMap<ItemId, bool>);

impl SessionResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record correctness for `item`, returning the previous value if the item
    /// had already been answered.
    pub fn record(&mut self, item: ItemId, correct: bool) -> Option<bool> {
        self.0.insert(item, correct)
    }

    #[must_use]
    pub fn get(&self, item: ItemId) -> Option<bool> {
        self.0.get(&item).copied()
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.0.values().filter(|c| **c).count()
    }
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Payload of the single aggregation call made when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub set_id: StudySetId,
    pub results: SessionResults,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// What the backend returned after aggregating a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    #[serde(default)]
    pub xp_awarded: Option<i64>,
    #[serde(default)]
    pub level: Option<u32>,
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Local aggregate of a finished session, independent of the backend outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    set_id: StudySetId,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    total_items: u32,
    scored_items: u32,
    answered: u32,
    correct: u32,
}

fn count(len: usize) -> Result<u32, SummaryError> {
    u32::try_from(len).map_err(|_| SummaryError::TooManyItems { len })
}

impl SessionSummary {
    /// Build a summary from the session report and the items that were played.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` if `finished_at` is before `started_at`.
    /// Returns `SummaryError::TooManyItems` if a count cannot fit in `u32`.
    pub fn from_report(report: &SessionReport, items: &[StudyItem]) -> Result<Self, SummaryError> {
        if report.finished_at < report.started_at {
            return Err(SummaryError::InvalidTimeRange);
        }
        let scored = items.iter().filter(|i| i.is_scored()).count();

        Ok(Self {
            set_id: report.set_id,
            started_at: report.started_at,
            finished_at: report.finished_at,
            total_items: count(items.len())?,
            scored_items: count(scored)?,
            answered: count(report.results.answered())?,
            correct: count(report.results.correct())?,
        })
    }

    #[must_use]
    pub fn set_id(&self) -> StudySetId {
        self.set_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub fn scored_items(&self) -> u32 {
        self.scored_items
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Share of scored items answered correctly, rounded down; 0 when nothing is scored.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        if self.scored_items == 0 {
            return 0;
        }
        let pct = u64::from(self.correct) * 100 / u64::from(self.scored_items);
        u32::try_from(pct).unwrap_or(100)
    }
}
