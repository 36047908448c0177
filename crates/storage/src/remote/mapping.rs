use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use study_core::model::{
    CheckboxQuestion, Choice, ChoiceId, Flashcard, ItemError, ItemId, MatchPair, MatchingPairs,
    Note, OrderSequence, QuizQuestion, SessionId, SessionReport, SessionResults, StudyItem,
    StudySetId, WrittenAnswer,
};

use crate::repository::StorageError;

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceDto {
    id: ChoiceId,
    text: String,
}

impl ChoiceDto {
    fn into_choice(self) -> Result<Choice, ItemError> {
        Choice::new(self.id, self.text)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PairDto {
    id: ChoiceId,
    left: String,
    right: String,
}

/// Wire shape of a study item as returned by `get_study_set_items`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ItemDto {
    Flashcard {
        id: ItemId,
        front: String,
        back: String,
    },
    Quiz {
        id: ItemId,
        question: String,
        choices: Vec<ChoiceDto>,
        correct_choice: ChoiceId,
    },
    Checkbox {
        id: ItemId,
        question: String,
        choices: Vec<ChoiceDto>,
        correct_choices: BTreeSet<ChoiceId>,
    },
    Written {
        id: ItemId,
        question: String,
        accepted_answers: Vec<String>,
    },
    Matching {
        id: ItemId,
        prompt: String,
        pairs: Vec<PairDto>,
    },
    Order {
        id: ItemId,
        prompt: String,
        steps: Vec<ChoiceDto>,
    },
    Note {
        id: ItemId,
        title: String,
        body: String,
    },
}

fn choices(dtos: Vec<ChoiceDto>) -> Result<Vec<Choice>, ItemError> {
    dtos.into_iter().map(ChoiceDto::into_choice).collect()
}

impl ItemDto {
    fn id(&self) -> ItemId {
        match self {
            ItemDto::Flashcard { id, .. }
            | ItemDto::Quiz { id, .. }
            | ItemDto::Checkbox { id, .. }
            | ItemDto::Written { id, .. }
            | ItemDto::Matching { id, .. }
            | ItemDto::Order { id, .. }
            | ItemDto::Note { id, .. } => *id,
        }
    }

    fn into_item(self) -> Result<StudyItem, ItemError> {
        let item = match self {
            ItemDto::Flashcard { id, front, back } => {
                StudyItem::Flashcard(Flashcard::new(id, front, back)?)
            }
            ItemDto::Quiz {
                id,
                question,
                choices: opts,
                correct_choice,
            } => StudyItem::Quiz(QuizQuestion::new(id, question, choices(opts)?, correct_choice)?),
            ItemDto::Checkbox {
                id,
                question,
                choices: opts,
                correct_choices,
            } => StudyItem::Checkbox(CheckboxQuestion::new(
                id,
                question,
                choices(opts)?,
                correct_choices,
            )?),
            ItemDto::Written {
                id,
                question,
                accepted_answers,
            } => StudyItem::Written(WrittenAnswer::new(id, question, accepted_answers)?),
            ItemDto::Matching { id, prompt, pairs } => {
                let pairs = pairs
                    .into_iter()
                    .map(|p| MatchPair::new(p.id, p.left, p.right))
                    .collect::<Result<Vec<_>, _>>()?;
                StudyItem::Matching(MatchingPairs::new(id, prompt, pairs)?)
            }
            ItemDto::Order { id, prompt, steps } => {
                StudyItem::Order(OrderSequence::new(id, prompt, choices(steps)?)?)
            }
            ItemDto::Note { id, title, body } => StudyItem::Note(Note::new(id, title, body)?),
        };
        Ok(item)
    }
}

/// Validate wire items into domain items, naming the offending item on failure.
pub(crate) fn items_from_wire(dtos: Vec<ItemDto>) -> Result<Vec<StudyItem>, StorageError> {
    let mut seen = HashSet::with_capacity(dtos.len());
    dtos.into_iter()
        .map(|dto| {
            let id = dto.id();
            if !seen.insert(id) {
                return Err(StorageError::Serialization(format!("duplicate item {id}")));
            }
            dto.into_item()
                .map_err(|e| StorageError::Serialization(format!("item {id}: {e}")))
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct LoadItemsParams {
    pub p_set_id: StudySetId,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteSessionParams<'a> {
    pub p_session_id: SessionId,
    pub p_set_id: StudySetId,
    pub p_results: &'a SessionResults,
    pub p_started_at: DateTime<Utc>,
    pub p_finished_at: DateTime<Utc>,
}

impl<'a> CompleteSessionParams<'a> {
    pub(crate) fn from_report(report: &'a SessionReport) -> Self {
        Self {
            p_session_id: report.session_id,
            p_set_id: report.set_id,
            p_results: &report.results,
            p_started_at: report.started_at,
            p_finished_at: report.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use study_core::model::ItemKind;
    use study_core::time::fixed_now;

    fn decode(value: serde_json::Value) -> Result<Vec<StudyItem>, StorageError> {
        let dtos: Vec<ItemDto> = serde_json::from_value(value).unwrap();
        items_from_wire(dtos)
    }

    #[test]
    fn decodes_every_item_kind() {
        let items = decode(json!([
            {"type": "flashcard", "id": 1, "front": "hola", "back": "hello"},
            {"type": "quiz", "id": 2, "question": "2+2?",
             "choices": [{"id": 1, "text": "3"}, {"id": 2, "text": "4"}], "correct_choice": 2},
            {"type": "checkbox", "id": 3, "question": "Primes?",
             "choices": [{"id": 1, "text": "2"}, {"id": 2, "text": "4"}, {"id": 3, "text": "5"}],
             "correct_choices": [1, 3]},
            {"type": "written", "id": 4, "question": "H2O?", "accepted_answers": ["water"]},
            {"type": "matching", "id": 5, "prompt": "Match",
             "pairs": [{"id": 1, "left": "a", "right": "A"}, {"id": 2, "left": "b", "right": "B"}]},
            {"type": "order", "id": 6, "prompt": "Sort",
             "steps": [{"id": 1, "text": "first"}, {"id": 2, "text": "second"}]},
            {"type": "note", "id": 7, "title": "Tip", "body": "Breathe"}
        ]))
        .unwrap();

        let kinds: Vec<_> = items.iter().map(StudyItem::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Flashcard,
                ItemKind::Quiz,
                ItemKind::Checkbox,
                ItemKind::Written,
                ItemKind::Matching,
                ItemKind::Order,
                ItemKind::Note,
            ]
        );
    }

    #[test]
    fn invalid_item_names_its_id() {
        let err = decode(json!([
            {"type": "quiz", "id": 12, "question": "Only one?",
             "choices": [{"id": 1, "text": "yes"}], "correct_choice": 1}
        ]))
        .unwrap_err();
        match err {
            StorageError::Serialization(msg) => assert!(msg.starts_with("item 12:"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn repeated_item_id_is_rejected() {
        let err = decode(json!([
            {"type": "flashcard", "id": 5, "front": "uno", "back": "one"},
            {"type": "note", "id": 6, "title": "Tip", "body": "Count"},
            {"type": "flashcard", "id": 5, "front": "dos", "back": "two"}
        ]))
        .unwrap_err();
        match err {
            StorageError::Serialization(msg) => assert_eq!(msg, "duplicate item 5"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn completion_params_use_prefixed_names_and_string_keys() {
        let mut results = SessionResults::new();
        results.record(ItemId::new(4), true);
        results.record(ItemId::new(9), false);
        let report = SessionReport {
            session_id: SessionId::generate(),
            set_id: StudySetId::new(3),
            results,
            started_at: fixed_now(),
            finished_at: fixed_now(),
        };

        let value = serde_json::to_value(CompleteSessionParams::from_report(&report)).unwrap();
        assert_eq!(value["p_set_id"], json!(3));
        assert_eq!(value["p_results"], json!({"4": true, "9": false}));
        assert_eq!(value["p_session_id"], json!(report.session_id.to_string()));
    }
}
