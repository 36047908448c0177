use chrono::{DateTime, Utc};
use std::collections::HashSet;
use rand::rngs::StdRng;
use std::fmt;
use study_core::model::{
    ChoiceId, ItemKind, Response, SessionId, SessionOutcome, SessionReport, SessionResults,
    SessionSummary, StudyItem, StudySetId,
};
use tracing::{debug, info, warn};

use super::progress::SessionProgress;
use super::state::PlayerState;
use super::visit::ItemVisit;
use crate::error::PlayerError;
use crate::notice::Notice;

//
// ─── ADVANCE ───────────────────────────────────────────────────────────────────
//

/// Where `next` took the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Presenting { index: usize },
    /// The last item was left; the report must be sent exactly once and its
    /// outcome handed to `StudyPlayer::finish`.
    Finishing(SessionReport),
}

//
// ─── PLAYER ────────────────────────────────────────────────────────────────────
//

/// Study-session player: steps through heterogeneous items, grades answers
/// locally and produces one aggregated report at the end.
///
/// Timestamps come from the caller so the services layer clock stays in charge.
pub struct StudyPlayer {
    set_id: StudySetId,
    session_id: SessionId,
    items: Vec<StudyItem>,
    state: PlayerState,
    visit: Option<ItemVisit>,
    results: SessionResults,
    rng: StdRng,
    shuffle: bool,
    started_at: Option<DateTime<Utc>>,
    report: Option<SessionReport>,
    outcome: Option<SessionOutcome>,
    notices: Vec<Notice>,
}

impl StudyPlayer {
    #[must_use]
    pub fn new(set_id: StudySetId, session_id: SessionId, rng: StdRng) -> Self {
        Self {
            set_id,
            session_id,
            items: Vec::new(),
            state: PlayerState::Loading,
            visit: None,
            results: SessionResults::new(),
            rng,
            shuffle: true,
            started_at: None,
            report: None,
            outcome: None,
            notices: Vec::new(),
        }
    }

    /// Enable or disable shuffling of options, pairs and steps.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Hand the loaded items to the player and present the first one.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidState` outside `Loading`,
    /// `PlayerError::Empty` if `items` is empty, and
    /// `PlayerError::DuplicateItem` if two items share an id.
    pub fn load(
        &mut self,
        items: Vec<StudyItem>,
        started_at: DateTime<Utc>,
    ) -> Result<(), PlayerError> {
        if self.state != PlayerState::Loading {
            return Err(self.invalid("load"));
        }
        if items.is_empty() {
            return Err(PlayerError::Empty);
        }
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(dup) = items.iter().map(StudyItem::id).find(|id| !seen.insert(*id)) {
            return Err(PlayerError::DuplicateItem(dup));
        }
        info!(set_id = %self.set_id, session_id = %self.session_id, items = items.len(), "study session started");
        self.items = items;
        self.started_at = Some(started_at);
        self.present(0);
        Ok(())
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn set_id(&self) -> StudySetId {
        self.set_id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    #[must_use]
    pub fn items(&self) -> &[StudyItem] {
        &self.items
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.state.index()
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&StudyItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    #[must_use]
    pub fn visit(&self) -> Option<&ItemVisit> {
        self.visit.as_ref()
    }

    #[must_use]
    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    /// Correctness recorded for the current item, possibly on an earlier visit.
    #[must_use]
    pub fn recorded_result(&self) -> Option<bool> {
        self.current_item()
            .and_then(|item| self.results.get(item.id()))
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == PlayerState::Finished
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.items.len();
        let position = match self.state {
            PlayerState::Loading => 0,
            PlayerState::Finishing | PlayerState::Finished => total,
            PlayerState::Presenting { index } | PlayerState::Answered { index, .. } => index + 1,
        };
        SessionProgress {
            total,
            position,
            answered: self.results.answered(),
            correct: self.results.correct(),
            remaining: total.saturating_sub(position),
            is_finished: self.is_finished(),
        }
    }

    /// Local summary, available once the session has left its last item.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidState` before finishing, or a summary error.
    pub fn summary(&self) -> Result<SessionSummary, PlayerError> {
        let report = self.report.as_ref().ok_or_else(|| self.invalid("summarize"))?;
        Ok(SessionSummary::from_report(report, &self.items)?)
    }

    /// Drain pending toast notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ─── Per-item interactions ────────────────────────────────────────────────

    fn invalid(&self, action: &'static str) -> PlayerError {
        PlayerError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    fn editable_visit(&mut self, action: &'static str) -> Result<&mut ItemVisit, PlayerError> {
        match self.state {
            PlayerState::Presenting { .. } => {}
            PlayerState::Answered { .. } => return Err(PlayerError::AlreadyAnswered),
            _ => return Err(self.invalid(action)),
        }
        self.visit.as_mut().ok_or(PlayerError::InvalidState {
            action,
            state: "presenting",
        })
    }

    /// Flip the current flashcard.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if no flashcard is being presented.
    pub fn flip(&mut self) -> Result<(), PlayerError> {
        self.editable_visit("flip")?.flip()
    }

    /// Select the single answer of a quiz question.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a non-quiz item or an unknown choice.
    pub fn select_choice(&mut self, id: ChoiceId) -> Result<(), PlayerError> {
        self.editable_visit("select")?.select_choice(id)
    }

    /// Toggle one option of a checkbox question.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a non-checkbox item or an unknown choice.
    pub fn toggle_choice(&mut self, id: ChoiceId) -> Result<(), PlayerError> {
        self.editable_visit("toggle")?.toggle_choice(id)
    }

    /// Replace the free-text draft.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a non-written item.
    pub fn set_text(&mut self, text: &str) -> Result<(), PlayerError> {
        self.editable_visit("type")?.set_text(text)
    }

    /// Match a left-hand entry to a right-hand entry (both by pair id).
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a non-matching item or unknown pair ids.
    pub fn match_pair(&mut self, left: ChoiceId, right: ChoiceId) -> Result<(), PlayerError> {
        self.editable_visit("match")?.match_pair(left, right)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` for a non-matching item or an unknown pair id.
    pub fn unmatch(&mut self, left: ChoiceId) -> Result<(), PlayerError> {
        self.editable_visit("unmatch")?.unmatch(left)
    }

    /// Move a step of an order item from one position to another (0-based).
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a non-order item or out-of-range positions.
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), PlayerError> {
        self.editable_visit("move")?.move_step(from, to)
    }

    // ─── Answering ────────────────────────────────────────────────────────────

    /// Grade the current draft (quiz, checkbox, written, matching, order).
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if nothing can be graded yet or the item was
    /// already answered on this visit.
    pub fn check(&mut self) -> Result<bool, PlayerError> {
        let response = self.editable_visit("check")?.response()?;
        self.answer(response)
    }

    /// Record a flashcard self-assessment. The card must be flipped first.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotFlipped` or other answering errors.
    pub fn assess(&mut self, knew: bool) -> Result<bool, PlayerError> {
        self.answer(Response::Recall { knew })
    }

    /// Grade an explicit response for the current item and record it.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::AlreadyAnswered` on a second answer in the same
    /// visit, `PlayerError::NotFlipped` for an unflipped flashcard, and grading errors.
    pub fn answer(&mut self, response: Response) -> Result<bool, PlayerError> {
        let flipped = self.editable_visit("answer")?.is_flipped();
        let index = self.current_index().ok_or_else(|| self.invalid("answer"))?;
        let item = &self.items[index];
        if matches!(item, StudyItem::Flashcard(_)) && !flipped {
            return Err(PlayerError::NotFlipped);
        }
        let correct = item.grade(&response)?;
        let item_id = item.id();

        if let Some(previous) = self.results.record(item_id, correct) {
            debug!(%item_id, previous, correct, "re-answered item");
            self.notices.push(Notice::info("Earlier answer replaced"));
        }
        if let Some(visit) = self.visit.as_mut() {
            visit.set_verdict(correct);
        }
        self.state = PlayerState::Answered { index, correct };
        debug!(%item_id, kind = %item.kind(), correct, "answered item");
        Ok(correct)
    }

    // ─── Navigation ───────────────────────────────────────────────────────────

    fn present(&mut self, index: usize) {
        let item = &self.items[index];
        let visit = if self.shuffle {
            ItemVisit::begin(item, Some(&mut self.rng))
        } else {
            ItemVisit::begin::<StdRng>(item, None)
        };
        self.visit = Some(visit);
        self.state = PlayerState::Presenting { index };
        debug!(index, item_id = %item.id(), "presenting item");
    }

    /// Leave the current item. Advances to the next one, or, from the last
    /// item, enters `Finishing` and returns the report to send.
    ///
    /// `now` becomes the finish timestamp when the session ends here.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidState` when no item is current.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<Advance, PlayerError> {
        let index = self.current_index().ok_or_else(|| self.invalid("go next"))?;
        if index + 1 < self.items.len() {
            self.present(index + 1);
            return Ok(Advance::Presenting { index: index + 1 });
        }

        let started_at = self.started_at.unwrap_or(now);
        let report = SessionReport {
            session_id: self.session_id,
            set_id: self.set_id,
            results: self.results.clone(),
            started_at,
            finished_at: now.max(started_at),
        };
        self.visit = None;
        self.state = PlayerState::Finishing;
        self.report = Some(report.clone());
        debug!(session_id = %self.session_id, "finishing study session");
        Ok(Advance::Finishing(report))
    }

    /// Go back one item with fresh transient state. Recorded results stay.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::AtStart` on the first item and
    /// `PlayerError::InvalidState` when no item is current.
    pub fn prev(&mut self) -> Result<usize, PlayerError> {
        let index = self.current_index().ok_or_else(|| self.invalid("go back"))?;
        if index == 0 {
            return Err(PlayerError::AtStart);
        }
        self.present(index - 1);
        Ok(index - 1)
    }

    /// Complete the session with the result of the aggregation call.
    ///
    /// A failed call is not retried: it becomes an error notice and the
    /// session still ends.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidState` outside `Finishing`.
    pub fn finish<E: fmt::Display>(
        &mut self,
        outcome: Result<SessionOutcome, E>,
    ) -> Result<SessionSummary, PlayerError> {
        if self.state != PlayerState::Finishing {
            return Err(self.invalid("finish"));
        }
        match outcome {
            Ok(outcome) => {
                let message = match outcome.xp_awarded {
                    Some(xp) => format!("Session saved: +{xp} XP"),
                    None => "Session saved".to_string(),
                };
                self.notices.push(Notice::success(message));
                self.outcome = Some(outcome);
            }
            Err(err) => {
                warn!(session_id = %self.session_id, "could not report study session: {err}");
                self.notices
                    .push(Notice::error(format!("Could not save your session results: {err}")));
            }
        }
        self.state = PlayerState::Finished;
        let summary = self.summary()?;
        info!(
            session_id = %self.session_id,
            answered = summary.answered(),
            correct = summary.correct(),
            "study session finished"
        );
        Ok(summary)
    }

    /// Kind of the current item, for callers that dispatch on it.
    #[must_use]
    pub fn current_kind(&self) -> Option<ItemKind> {
        self.current_item().map(StudyItem::kind)
    }
}

impl fmt::Debug for StudyPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyPlayer")
            .field("set_id", &self.set_id)
            .field("session_id", &self.session_id)
            .field("items_len", &self.items.len())
            .field("state", &self.state)
            .field("answered", &self.results.answered())
            .field("shuffle", &self.shuffle)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
