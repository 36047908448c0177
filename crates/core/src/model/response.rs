use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::ids::ChoiceId;
use crate::model::item::{
    CheckboxQuestion, ItemKind, MatchingPairs, OrderSequence, QuizQuestion, StudyItem,
    WrittenAnswer,
};
use crate::model::text::normalize_answer;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("{response} response cannot answer a {item} item")]
    KindMismatch {
        item: ItemKind,
        response: &'static str,
    },

    #[error("notes are not scored")]
    NotScored,

    #[error("unknown choice {0}")]
    UnknownChoice(ChoiceId),

    #[error("written response is empty")]
    EmptyText,

    #[error("every pair must be matched exactly once")]
    IncompleteMatching,

    #[error("sequence must contain every step exactly once")]
    InvalidSequence,
}

//
// ─── RESPONSE ──────────────────────────────────────────────────────────────────
//

/// A learner's answer to one item, expressed in stable ids rather than display positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Flashcard self-assessment after flipping.
    Recall { knew: bool },
    Choice(ChoiceId),
    Choices(BTreeSet<ChoiceId>),
    Text(String),
    /// Left pair id to the pair id of the chosen right-hand side.
    Matches(BTreeMap<ChoiceId, ChoiceId>),
    Sequence(Vec<ChoiceId>),
}

impl Response {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Response::Recall { .. } => "recall",
            Response::Choice(_) => "choice",
            Response::Choices(_) => "choices",
            Response::Text(_) => "text",
            Response::Matches(_) => "matches",
            Response::Sequence(_) => "sequence",
        }
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

impl StudyItem {
    /// Decide whether `response` answers this item correctly.
    ///
    /// # Errors
    ///
    /// Returns `GradeError` when the response does not fit the item: wrong kind,
    /// unknown ids, incomplete matching, malformed sequence, empty text, or a note.
    pub fn grade(&self, response: &Response) -> Result<bool, GradeError> {
        match (self, response) {
            (StudyItem::Note(_), _) => Err(GradeError::NotScored),
            (StudyItem::Flashcard(_), Response::Recall { knew }) => Ok(*knew),
            (StudyItem::Quiz(q), Response::Choice(id)) => grade_quiz(q, *id),
            (StudyItem::Checkbox(q), Response::Choices(ids)) => grade_checkbox(q, ids),
            (StudyItem::Written(w), Response::Text(raw)) => grade_written(w, raw),
            (StudyItem::Matching(m), Response::Matches(map)) => grade_matching(m, map),
            (StudyItem::Order(o), Response::Sequence(seq)) => grade_order(o, seq),
            (item, response) => Err(GradeError::KindMismatch {
                item: item.kind(),
                response: response.name(),
            }),
        }
    }
}

fn grade_quiz(q: &QuizQuestion, id: ChoiceId) -> Result<bool, GradeError> {
    if q.choice(id).is_none() {
        return Err(GradeError::UnknownChoice(id));
    }
    Ok(id == q.correct())
}

fn grade_checkbox(q: &CheckboxQuestion, ids: &BTreeSet<ChoiceId>) -> Result<bool, GradeError> {
    if let Some(unknown) = ids.iter().find(|id| q.choice(**id).is_none()) {
        return Err(GradeError::UnknownChoice(*unknown));
    }
    Ok(ids == q.correct())
}

fn grade_written(w: &WrittenAnswer, raw: &str) -> Result<bool, GradeError> {
    let given = normalize_answer(raw);
    if given.is_empty() {
        return Err(GradeError::EmptyText);
    }
    Ok(w
        .accepted()
        .iter()
        .any(|accepted| normalize_answer(accepted.as_str()) == given))
}

fn grade_matching(
    m: &MatchingPairs,
    map: &BTreeMap<ChoiceId, ChoiceId>,
) -> Result<bool, GradeError> {
    for (left, right) in map {
        for id in [left, right] {
            if m.pair(*id).is_none() {
                return Err(GradeError::UnknownChoice(*id));
            }
        }
    }
    let rights: BTreeSet<_> = map.values().collect();
    if map.len() != m.pairs().len() || rights.len() != map.len() {
        return Err(GradeError::IncompleteMatching);
    }
    Ok(map.iter().all(|(left, right)| left == right))
}

fn grade_order(o: &OrderSequence, seq: &[ChoiceId]) -> Result<bool, GradeError> {
    if let Some(unknown) = seq.iter().find(|id| o.step(**id).is_none()) {
        return Err(GradeError::UnknownChoice(*unknown));
    }
    let distinct: BTreeSet<_> = seq.iter().collect();
    if seq.len() != o.steps().len() || distinct.len() != seq.len() {
        return Err(GradeError::InvalidSequence);
    }
    Ok(seq.iter().zip(o.steps()).all(|(given, step)| *given == step.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::ItemId;
    use crate::model::item::{Choice, Flashcard, MatchPair, Note};

    fn cid(i: u64) -> ChoiceId {
        ChoiceId::new(i)
    }

    fn choices(n: u64) -> Vec<Choice> {
        (1..=n)
            .map(|i| Choice::new(cid(i), format!("option {i}")).unwrap())
            .collect()
    }

    fn quiz() -> StudyItem {
        StudyItem::Quiz(QuizQuestion::new(ItemId::new(1), "Pick two", choices(3), cid(2)).unwrap())
    }

    fn checkbox() -> StudyItem {
        StudyItem::Checkbox(
            CheckboxQuestion::new(
                ItemId::new(2),
                "Pick evens",
                choices(4),
                [cid(2), cid(4)].into_iter().collect(),
            )
            .unwrap(),
        )
    }

    fn matching() -> StudyItem {
        StudyItem::Matching(
            MatchingPairs::new(
                ItemId::new(3),
                "Capitals",
                vec![
                    MatchPair::new(cid(1), "France", "Paris").unwrap(),
                    MatchPair::new(cid(2), "Japan", "Tokyo").unwrap(),
                    MatchPair::new(cid(3), "Peru", "Lima").unwrap(),
                ],
            )
            .unwrap(),
        )
    }

    fn order() -> StudyItem {
        StudyItem::Order(OrderSequence::new(ItemId::new(4), "Count up", choices(3)).unwrap())
    }

    #[test]
    fn flashcard_uses_self_assessment() {
        let card = StudyItem::Flashcard(Flashcard::new(ItemId::new(9), "2+2", "4").unwrap());
        assert!(card.grade(&Response::Recall { knew: true }).unwrap());
        assert!(!card.grade(&Response::Recall { knew: false }).unwrap());
    }

    #[test]
    fn quiz_grades_by_choice_id() {
        assert!(quiz().grade(&Response::Choice(cid(2))).unwrap());
        assert!(!quiz().grade(&Response::Choice(cid(1))).unwrap());
        assert_eq!(
            quiz().grade(&Response::Choice(cid(7))).unwrap_err(),
            GradeError::UnknownChoice(cid(7))
        );
    }

    #[test]
    fn checkbox_requires_exact_set() {
        let exact = [cid(2), cid(4)].into_iter().collect();
        let partial = [cid(2)].into_iter().collect();
        let extra = [cid(1), cid(2), cid(4)].into_iter().collect();
        assert!(checkbox().grade(&Response::Choices(exact)).unwrap());
        assert!(!checkbox().grade(&Response::Choices(partial)).unwrap());
        assert!(!checkbox().grade(&Response::Choices(extra)).unwrap());
    }

    #[test]
    fn written_accepts_any_normalized_answer() {
        let item = StudyItem::Written(
            WrittenAnswer::new(ItemId::new(5), "Powerhouse of the cell?", ["Mitochondria", "the mitochondria"])
                .unwrap(),
        );
        assert!(item.grade(&Response::Text("  THE   mitochondria ".into())).unwrap());
        assert!(!item.grade(&Response::Text("ribosome".into())).unwrap());
        assert_eq!(
            item.grade(&Response::Text("   ".into())).unwrap_err(),
            GradeError::EmptyText
        );
    }

    #[test]
    fn matching_requires_every_pair() {
        let all_right: BTreeMap<_, _> = [(cid(1), cid(1)), (cid(2), cid(2)), (cid(3), cid(3))].into();
        let swapped: BTreeMap<_, _> = [(cid(1), cid(2)), (cid(2), cid(1)), (cid(3), cid(3))].into();
        let partial: BTreeMap<_, _> = [(cid(1), cid(1)), (cid(2), cid(2))].into();
        let reused: BTreeMap<_, _> = [(cid(1), cid(1)), (cid(2), cid(1)), (cid(3), cid(3))].into();

        assert!(matching().grade(&Response::Matches(all_right)).unwrap());
        assert!(!matching().grade(&Response::Matches(swapped)).unwrap());
        assert_eq!(
            matching().grade(&Response::Matches(partial)).unwrap_err(),
            GradeError::IncompleteMatching
        );
        assert_eq!(
            matching().grade(&Response::Matches(reused)).unwrap_err(),
            GradeError::IncompleteMatching
        );
    }

    #[test]
    fn order_compares_against_canonical_sequence() {
        assert!(order().grade(&Response::Sequence(vec![cid(1), cid(2), cid(3)])).unwrap());
        assert!(!order().grade(&Response::Sequence(vec![cid(2), cid(1), cid(3)])).unwrap());
        assert_eq!(
            order().grade(&Response::Sequence(vec![cid(1), cid(1), cid(3)])).unwrap_err(),
            GradeError::InvalidSequence
        );
    }

    #[test]
    fn mismatched_response_kind_is_an_error() {
        let err = quiz().grade(&Response::Text("two".into())).unwrap_err();
        assert_eq!(
            err,
            GradeError::KindMismatch {
                item: ItemKind::Quiz,
                response: "text"
            }
        );
    }

    #[test]
    fn notes_cannot_be_graded() {
        let note = StudyItem::Note(Note::new(ItemId::new(6), "Heads up", "Chapter 2").unwrap());
        assert_eq!(
            note.grade(&Response::Recall { knew: true }).unwrap_err(),
            GradeError::NotScored
        );
    }
}
