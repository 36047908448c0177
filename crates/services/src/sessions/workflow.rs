use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{SessionReporter, Storage, StudySetRepository};
use study_core::model::{SessionId, SessionOutcome, SessionSummary, StudySetId};
use tracing::debug;

use super::service::{Advance, StudyPlayer};
use crate::Clock;
use crate::error::SessionError;
use crate::notice::Notice;

/// Everything the caller needs to show once a session has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishReport {
    pub summary: SessionSummary,
    /// Backend outcome; `None` when the aggregation call failed.
    pub outcome: Option<SessionOutcome>,
    pub notices: Vec<Notice>,
}

/// Result of moving past the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    Presenting { index: usize },
    Finished(FinishReport),
}

/// Orchestrates loading a study set and the single aggregation call at the end.
#[derive(Clone)]
pub struct StudySessionService {
    clock: Clock,
    sets: Arc<dyn StudySetRepository>,
    reporter: Arc<dyn SessionReporter>,
    shuffle: bool,
    seed: Option<u64>,
}

impl StudySessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sets: Arc<dyn StudySetRepository>,
        reporter: Arc<dyn SessionReporter>,
    ) -> Self {
        Self {
            clock,
            sets,
            reporter,
            shuffle: true,
            seed: None,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.sets),
            Arc::clone(&storage.reporter),
        )
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seed the shuffle RNG for reproducible presentation order.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Load a study set and present its first item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the set cannot be loaded and
    /// `SessionError::Player` if it has no items.
    pub async fn start(&self, set_id: StudySetId) -> Result<StudyPlayer, SessionError> {
        let mut player =
            StudyPlayer::new(set_id, SessionId::generate(), self.rng()).with_shuffle(self.shuffle);
        let items = self.sets.load_items(set_id).await?;
        player.load(items, self.clock.now())?;
        Ok(player)
    }

    /// Move past the current item. Leaving the last item reports the session
    /// once; a failed report ends the session with an error notice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Player` if no item is current.
    pub async fn next(&self, player: &mut StudyPlayer) -> Result<NextOutcome, SessionError> {
        let report = match player.next(self.clock.now())? {
            Advance::Presenting { index } => return Ok(NextOutcome::Presenting { index }),
            Advance::Finishing(report) => report,
        };

        debug!(session_id = %report.session_id, answered = report.results.answered(), "reporting study session");
        let outcome = self.reporter.report_session(&report).await;
        let summary = player.finish(outcome)?;

        Ok(NextOutcome::Finished(FinishReport {
            summary,
            outcome: player.outcome().cloned(),
            notices: player.take_notices(),
        }))
    }
}
