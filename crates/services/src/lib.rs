#![forbid(unsafe_code)]

pub mod error;
pub mod notice;
pub mod sessions;

pub use study_core::Clock;

pub use error::{PlayerError, SessionError};
pub use notice::{Notice, NoticeLevel};

pub use sessions::{
    Advance, Draft, FinishReport, ItemVisit, NextOutcome, PlayerState, SessionProgress,
    StudyPlayer, StudySessionService,
};
