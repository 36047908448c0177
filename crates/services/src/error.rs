//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::model::{ChoiceId, GradeError, ItemId, ItemKind, SummaryError};

/// Errors emitted by `StudyPlayer`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("no items to study")]
    Empty,
    #[error("item {0} appears more than once in the set")]
    DuplicateItem(ItemId),
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("{action} does not apply to a {kind} item")]
    Interaction {
        action: &'static str,
        kind: ItemKind,
    },
    #[error("unknown choice {0}")]
    UnknownChoice(ChoiceId),
    #[error("position {index} is out of range for {len} entries")]
    Position { index: usize, len: usize },
    #[error("nothing selected")]
    NothingSelected,
    #[error("flip the card before assessing it")]
    NotFlipped,
    #[error("item already answered on this visit")]
    AlreadyAnswered,
    #[error("already at the first item")]
    AtStart,
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Errors emitted by `StudySessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
