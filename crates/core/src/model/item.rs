use std::collections::{BTreeSet, HashSet};
use std::fmt;

use thiserror::Error;

use crate::model::ids::{ChoiceId, ItemId};
use crate::model::text::{Text, TextError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("invalid {field}: {source}")]
    Text {
        field: &'static str,
        #[source]
        source: TextError,
    },

    #[error("{kind} needs at least {min} entries, found {found}")]
    TooFew {
        kind: ItemKind,
        min: usize,
        found: usize,
    },

    #[error("duplicate id {0} within item")]
    DuplicateChoice(ChoiceId),

    #[error("correct choice {0} is not one of the choices")]
    UnknownCorrectChoice(ChoiceId),

    #[error("checkbox question has no correct choices")]
    NoCorrectChoices,

    #[error("written answer has no accepted answers")]
    NoAcceptedAnswers,
}

fn text(field: &'static str, raw: impl Into<String>) -> Result<Text, ItemError> {
    Text::parse(raw).map_err(|source| ItemError::Text { field, source })
}

fn ensure_min(kind: ItemKind, min: usize, found: usize) -> Result<(), ItemError> {
    if found < min {
        return Err(ItemError::TooFew { kind, min, found });
    }
    Ok(())
}

fn ensure_unique(ids: impl IntoIterator<Item = ChoiceId>) -> Result<(), ItemError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ItemError::DuplicateChoice(id));
        }
    }
    Ok(())
}

//
// ─── ITEM KIND ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Flashcard,
    Quiz,
    Checkbox,
    Written,
    Matching,
    Order,
    Note,
}

impl ItemKind {
    /// Wire tag used by the backend for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Flashcard => "flashcard",
            ItemKind::Quiz => "quiz",
            ItemKind::Checkbox => "checkbox",
            ItemKind::Written => "written",
            ItemKind::Matching => "matching",
            ItemKind::Order => "order",
            ItemKind::Note => "note",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── BUILDING BLOCKS ───────────────────────────────────────────────────────────
//

/// A selectable option or an orderable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: ChoiceId,
    pub text: Text,
}

impl Choice {
    /// # Errors
    ///
    /// Returns `ItemError::Text` if the text is blank.
    pub fn new(id: ChoiceId, raw: impl Into<String>) -> Result<Self, ItemError> {
        Ok(Self {
            id,
            text: text("choice", raw)?,
        })
    }
}

/// One left/right pair of a matching item. The pair id identifies both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub id: ChoiceId,
    pub left: Text,
    pub right: Text,
}

impl MatchPair {
    /// # Errors
    ///
    /// Returns `ItemError::Text` if either side is blank.
    pub fn new(
        id: ChoiceId,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Result<Self, ItemError> {
        Ok(Self {
            id,
            left: text("pair left", left)?,
            right: text("pair right", right)?,
        })
    }
}

fn find_choice(choices: &[Choice], id: ChoiceId) -> Option<&Choice> {
    choices.iter().find(|c| c.id == id)
}

//
// ─── VARIANTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    id: ItemId,
    front: Text,
    back: Text,
}

impl Flashcard {
    /// # Errors
    ///
    /// Returns `ItemError::Text` if either side is blank.
    pub fn new(
        id: ItemId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Self, ItemError> {
        Ok(Self {
            id,
            front: text("front", front)?,
            back: text("back", back)?,
        })
    }

    #[must_use]
    pub fn front(&self) -> &Text {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &Text {
        &self.back
    }
}

/// Multiple-choice question with a single correct choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    id: ItemId,
    question: Text,
    choices: Vec<Choice>,
    correct: ChoiceId,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns `ItemError` for a blank question, fewer than two choices,
    /// duplicate choice ids, or a correct id that is not among the choices.
    pub fn new(
        id: ItemId,
        question: impl Into<String>,
        choices: Vec<Choice>,
        correct: ChoiceId,
    ) -> Result<Self, ItemError> {
        let question = text("question", question)?;
        ensure_min(ItemKind::Quiz, 2, choices.len())?;
        ensure_unique(choices.iter().map(|c| c.id))?;
        if find_choice(&choices, correct).is_none() {
            return Err(ItemError::UnknownCorrectChoice(correct));
        }
        Ok(Self {
            id,
            question,
            choices,
            correct,
        })
    }

    #[must_use]
    pub fn question(&self) -> &Text {
        &self.question
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        find_choice(&self.choices, id)
    }

    #[must_use]
    pub fn correct(&self) -> ChoiceId {
        self.correct
    }
}

/// Multi-select question; every correct choice and nothing else must be picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxQuestion {
    id: ItemId,
    question: Text,
    choices: Vec<Choice>,
    correct: BTreeSet<ChoiceId>,
}

impl CheckboxQuestion {
    /// # Errors
    ///
    /// Returns `ItemError` for a blank question, fewer than two choices,
    /// duplicate ids, an empty correct set or a correct id not among the choices.
    pub fn new(
        id: ItemId,
        question: impl Into<String>,
        choices: Vec<Choice>,
        correct: BTreeSet<ChoiceId>,
    ) -> Result<Self, ItemError> {
        let question = text("question", question)?;
        ensure_min(ItemKind::Checkbox, 2, choices.len())?;
        ensure_unique(choices.iter().map(|c| c.id))?;
        if correct.is_empty() {
            return Err(ItemError::NoCorrectChoices);
        }
        if let Some(unknown) = correct
            .iter()
            .find(|id| find_choice(&choices, **id).is_none())
        {
            return Err(ItemError::UnknownCorrectChoice(*unknown));
        }
        Ok(Self {
            id,
            question,
            choices,
            correct,
        })
    }

    #[must_use]
    pub fn question(&self) -> &Text {
        &self.question
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        find_choice(&self.choices, id)
    }

    #[must_use]
    pub fn correct(&self) -> &BTreeSet<ChoiceId> {
        &self.correct
    }
}

/// Free-text question graded against a list of accepted answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenAnswer {
    id: ItemId,
    question: Text,
    accepted: Vec<Text>,
}

impl WrittenAnswer {
    /// # Errors
    ///
    /// Returns `ItemError` for a blank question, no accepted answers or a blank
    /// accepted answer.
    pub fn new<S: Into<String>>(
        id: ItemId,
        question: impl Into<String>,
        accepted: impl IntoIterator<Item = S>,
    ) -> Result<Self, ItemError> {
        let question = text("question", question)?;
        let accepted = accepted
            .into_iter()
            .map(|a| text("accepted answer", a))
            .collect::<Result<Vec<_>, _>>()?;
        if accepted.is_empty() {
            return Err(ItemError::NoAcceptedAnswers);
        }
        Ok(Self {
            id,
            question,
            accepted,
        })
    }

    #[must_use]
    pub fn question(&self) -> &Text {
        &self.question
    }

    #[must_use]
    pub fn accepted(&self) -> &[Text] {
        &self.accepted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingPairs {
    id: ItemId,
    prompt: Text,
    pairs: Vec<MatchPair>,
}

impl MatchingPairs {
    /// # Errors
    ///
    /// Returns `ItemError` for a blank prompt, fewer than two pairs or duplicate pair ids.
    pub fn new(
        id: ItemId,
        prompt: impl Into<String>,
        pairs: Vec<MatchPair>,
    ) -> Result<Self, ItemError> {
        let prompt = text("prompt", prompt)?;
        ensure_min(ItemKind::Matching, 2, pairs.len())?;
        ensure_unique(pairs.iter().map(|p| p.id))?;
        Ok(Self { id, prompt, pairs })
    }

    #[must_use]
    pub fn prompt(&self) -> &Text {
        &self.prompt
    }

    #[must_use]
    pub fn pairs(&self) -> &[MatchPair] {
        &self.pairs
    }

    #[must_use]
    pub fn pair(&self, id: ChoiceId) -> Option<&MatchPair> {
        self.pairs.iter().find(|p| p.id == id)
    }
}

/// Steps stored in their canonical (correct) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSequence {
    id: ItemId,
    prompt: Text,
    steps: Vec<Choice>,
}

impl OrderSequence {
    /// # Errors
    ///
    /// Returns `ItemError` for a blank prompt, fewer than two steps or duplicate step ids.
    pub fn new(
        id: ItemId,
        prompt: impl Into<String>,
        steps: Vec<Choice>,
    ) -> Result<Self, ItemError> {
        let prompt = text("prompt", prompt)?;
        ensure_min(ItemKind::Order, 2, steps.len())?;
        ensure_unique(steps.iter().map(|s| s.id))?;
        Ok(Self { id, prompt, steps })
    }

    #[must_use]
    pub fn prompt(&self) -> &Text {
        &self.prompt
    }

    #[must_use]
    pub fn steps(&self) -> &[Choice] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, id: ChoiceId) -> Option<&Choice> {
        find_choice(&self.steps, id)
    }
}

/// Reading material shown in the flow; never scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: ItemId,
    title: Text,
    body: Text,
}

impl Note {
    /// # Errors
    ///
    /// Returns `ItemError::Text` if title or body is blank.
    pub fn new(
        id: ItemId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ItemError> {
        Ok(Self {
            id,
            title: text("title", title)?,
            body: text("body", body)?,
        })
    }

    #[must_use]
    pub fn title(&self) -> &Text {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &Text {
        &self.body
    }
}

//
// ─── STUDY ITEM ────────────────────────────────────────────────────────────────
//

/// One entry of a study set, as consumed by the session player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyItem {
    Flashcard(Flashcard),
    Quiz(QuizQuestion),
    Checkbox(CheckboxQuestion),
    Written(WrittenAnswer),
    Matching(MatchingPairs),
    Order(OrderSequence),
    Note(Note),
}

impl StudyItem {
    #[must_use]
    pub fn id(&self) -> ItemId {
        match self {
            StudyItem::Flashcard(i) => i.id,
            StudyItem::Quiz(i) => i.id,
            StudyItem::Checkbox(i) => i.id,
            StudyItem::Written(i) => i.id,
            StudyItem::Matching(i) => i.id,
            StudyItem::Order(i) => i.id,
            StudyItem::Note(i) => i.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            StudyItem::Flashcard(_) => ItemKind::Flashcard,
            StudyItem::Quiz(_) => ItemKind::Quiz,
            StudyItem::Checkbox(_) => ItemKind::Checkbox,
            StudyItem::Written(_) => ItemKind::Written,
            StudyItem::Matching(_) => ItemKind::Matching,
            StudyItem::Order(_) => ItemKind::Order,
            StudyItem::Note(_) => ItemKind::Note,
        }
    }

    /// Whether answering this item contributes to the session score.
    #[must_use]
    pub fn is_scored(&self) -> bool {
        !matches!(self, StudyItem::Note(_))
    }

    /// Ids whose display order is shuffled on every visit, in canonical order.
    ///
    /// Choices for quiz/checkbox, right-hand sides for matching, steps for order.
    #[must_use]
    pub fn shufflable_ids(&self) -> Vec<ChoiceId> {
        match self {
            StudyItem::Quiz(q) => q.choices.iter().map(|c| c.id).collect(),
            StudyItem::Checkbox(q) => q.choices.iter().map(|c| c.id).collect(),
            StudyItem::Matching(m) => m.pairs.iter().map(|p| p.id).collect(),
            StudyItem::Order(o) => o.steps.iter().map(|s| s.id).collect(),
            StudyItem::Flashcard(_) | StudyItem::Written(_) | StudyItem::Note(_) => Vec::new(),
        }
    }
}
