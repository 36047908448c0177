use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use study_core::model::{SessionOutcome, SessionReport, StudyItem, StudySetId};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote call failed with status {status}: {message}")]
    Remote { status: u16, message: String },
}

/// Source of the items a study session plays through.
#[async_trait]
pub trait StudySetRepository: Send + Sync {
    /// Fetch the items of a study set in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the set does not exist, or other storage errors.
    async fn load_items(&self, set_id: StudySetId) -> Result<Vec<StudyItem>, StorageError>;
}

/// Destination of the single aggregation call made when a session finishes.
#[async_trait]
pub trait SessionReporter: Send + Sync {
    /// Report a finished session and return what the backend made of it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the report cannot be delivered.
    async fn report_session(&self, report: &SessionReport) -> Result<SessionOutcome, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sets: Arc<Mutex<HashMap<StudySetId, Vec<StudyItem>>>>,
    reports: Arc<Mutex<Vec<SessionReport>>>,
    outcome: Arc<Mutex<SessionOutcome>>,
    fail_reports: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the items of a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_set(&self, set_id: StudySetId, items: Vec<StudyItem>) -> Result<(), StorageError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(set_id, items);
        Ok(())
    }

    /// Outcome returned by subsequent successful reports.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_outcome(&self, outcome: SessionOutcome) -> Result<(), StorageError> {
        let mut guard = self
            .outcome
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = outcome;
        Ok(())
    }

    /// Make subsequent reports fail, simulating an unreachable backend.
    pub fn fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    /// Reports that were accepted, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn reports(&self) -> Result<Vec<SessionReport>, StorageError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl StudySetRepository for InMemoryRepository {
    async fn load_items(&self, set_id: StudySetId) -> Result<Vec<StudyItem>, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&set_id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SessionReporter for InMemoryRepository {
    async fn report_session(&self, report: &SessionReport) -> Result<SessionOutcome, StorageError> {
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("backend unavailable".into()));
        }
        let outcome = self
            .outcome
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .clone();
        self.reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .push(report.clone());
        Ok(outcome)
    }
}

/// Aggregates the session-facing repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sets: Arc<dyn StudySetRepository>,
    pub reporter: Arc<dyn SessionReporter>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let sets: Arc<dyn StudySetRepository> = Arc::new(repo.clone());
        let reporter: Arc<dyn SessionReporter> = Arc::new(repo);
        Self { sets, reporter }
    }
}
