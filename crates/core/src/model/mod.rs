mod ids;
mod item;
mod response;
mod session;
mod text;

pub use ids::{ChoiceId, ItemId, ParseIdError, SessionId, StudySetId};
pub use item::{
    CheckboxQuestion, Choice, Flashcard, ItemError, ItemKind, MatchPair, MatchingPairs, Note,
    OrderSequence, QuizQuestion, StudyItem, WrittenAnswer,
};
pub use response::{GradeError, Response};
pub use session::{SessionOutcome, SessionReport, SessionResults, SessionSummary, SummaryError};
pub use text::{Text, TextError, normalize_answer};
