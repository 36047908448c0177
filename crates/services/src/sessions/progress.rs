/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    /// 1-based position of the current item; `total` once the session is over.
    pub position: usize,
    pub answered: usize,
    pub correct: usize,
    /// Items after the current one.
    pub remaining: usize,
    pub is_finished: bool,
}
