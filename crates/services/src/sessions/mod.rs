mod progress;
mod service;
mod state;
mod visit;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{PlayerError, SessionError};
pub use progress::SessionProgress;
pub use service::{Advance, StudyPlayer};
pub use state::PlayerState;
pub use visit::{Draft, ItemVisit};
pub use workflow::{FinishReport, NextOutcome, StudySessionService};
