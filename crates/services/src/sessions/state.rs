/// Lifecycle of a study session player.
///
/// `Loading → Presenting(i) → Answered(i) → Presenting(i+1) | Finishing → Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Loading,
    Presenting { index: usize },
    Answered { index: usize, correct: bool },
    Finishing,
    Finished,
}

impl PlayerState {
    /// Index of the current item, if any item is current.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            PlayerState::Presenting { index } | PlayerState::Answered { index, .. } => Some(*index),
            PlayerState::Loading | PlayerState::Finishing | PlayerState::Finished => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::Loading => "loading",
            PlayerState::Presenting { .. } => "presenting",
            PlayerState::Answered { .. } => "answered",
            PlayerState::Finishing => "finishing",
            PlayerState::Finished => "finished",
        }
    }
}
