use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::SliceRandom;
use study_core::model::{ChoiceId, ItemKind, Response, StudyItem};

use crate::error::PlayerError;

/// In-progress input for the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Flashcard { flipped: bool },
    Quiz { selected: Option<ChoiceId> },
    Checkbox { selected: BTreeSet<ChoiceId> },
    Written { text: String },
    /// Left pair id to the right-hand side (pair id) placed next to it.
    Matching { matches: BTreeMap<ChoiceId, ChoiceId> },
    /// Steps in the order the learner currently has them.
    Order { arrangement: Vec<ChoiceId> },
    Note,
}

/// Transient state of one stay on an item. Discarded on every navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemVisit {
    kind: ItemKind,
    order: Vec<ChoiceId>,
    draft: Draft,
    verdict: Option<bool>,
}

impl ItemVisit {
    /// Start a visit, shuffling the presentation order when an RNG is given.
    pub(crate) fn begin<R: Rng + ?Sized>(item: &StudyItem, rng: Option<&mut R>) -> Self {
        let mut order = item.shufflable_ids();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        let draft = match item {
            StudyItem::Flashcard(_) => Draft::Flashcard { flipped: false },
            StudyItem::Quiz(_) => Draft::Quiz { selected: None },
            StudyItem::Checkbox(_) => Draft::Checkbox {
                selected: BTreeSet::new(),
            },
            StudyItem::Written(_) => Draft::Written {
                text: String::new(),
            },
            StudyItem::Matching(_) => Draft::Matching {
                matches: BTreeMap::new(),
            },
            StudyItem::Order(_) => Draft::Order {
                arrangement: order.clone(),
            },
            StudyItem::Note(_) => Draft::Note,
        };
        Self {
            kind: item.kind(),
            order,
            draft,
            verdict: None,
        }
    }

    /// Presentation order fixed for this visit: choices (quiz, checkbox),
    /// right-hand sides (matching) or the initial step order (order).
    #[must_use]
    pub fn order(&self) -> &[ChoiceId] {
        &self.order
    }

    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Correctness recorded during this visit.
    #[must_use]
    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        matches!(self.draft, Draft::Flashcard { flipped: true })
    }

    pub(crate) fn set_verdict(&mut self, correct: bool) {
        self.verdict = Some(correct);
    }

    fn mismatch(&self, action: &'static str) -> PlayerError {
        PlayerError::Interaction {
            action,
            kind: self.kind,
        }
    }

    fn known(&self, id: ChoiceId) -> Result<ChoiceId, PlayerError> {
        if self.order.contains(&id) {
            Ok(id)
        } else {
            Err(PlayerError::UnknownChoice(id))
        }
    }

    fn expect_kind(&self, kind: ItemKind, action: &'static str) -> Result<(), PlayerError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(self.mismatch(action))
        }
    }

    pub(crate) fn flip(&mut self) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Flashcard, "flip")?;
        if let Draft::Flashcard { flipped } = &mut self.draft {
            *flipped = !*flipped;
        }
        Ok(())
    }

    pub(crate) fn select_choice(&mut self, id: ChoiceId) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Quiz, "select")?;
        let id = self.known(id)?;
        if let Draft::Quiz { selected } = &mut self.draft {
            *selected = Some(id);
        }
        Ok(())
    }

    pub(crate) fn toggle_choice(&mut self, id: ChoiceId) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Checkbox, "toggle")?;
        let id = self.known(id)?;
        if let Draft::Checkbox { selected } = &mut self.draft {
            if !selected.remove(&id) {
                selected.insert(id);
            }
        }
        Ok(())
    }

    pub(crate) fn set_text(&mut self, value: &str) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Written, "type")?;
        if let Draft::Written { text } = &mut self.draft {
            value.clone_into(text);
        }
        Ok(())
    }

    /// Place `right` next to `left`. A right-hand side can only be used once,
    /// so it is taken away from any other left it was matched to.
    pub(crate) fn match_pair(&mut self, left: ChoiceId, right: ChoiceId) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Matching, "match")?;
        let left = self.known(left)?;
        let right = self.known(right)?;
        if let Draft::Matching { matches } = &mut self.draft {
            matches.retain(|_, r| *r != right);
            matches.insert(left, right);
        }
        Ok(())
    }

    pub(crate) fn unmatch(&mut self, left: ChoiceId) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Matching, "unmatch")?;
        let left = self.known(left)?;
        if let Draft::Matching { matches } = &mut self.draft {
            matches.remove(&left);
        }
        Ok(())
    }

    /// Move the step at position `from` to position `to` (0-based).
    pub(crate) fn move_step(&mut self, from: usize, to: usize) -> Result<(), PlayerError> {
        self.expect_kind(ItemKind::Order, "move")?;
        let Draft::Order { arrangement } = &mut self.draft else {
            return Ok(());
        };
        let len = arrangement.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlayerError::Position { index, len });
            }
        }
        let step = arrangement.remove(from);
        arrangement.insert(to, step);
        Ok(())
    }

    /// Turn the draft into a gradable response. Flashcards are answered by
    /// self-assessment instead.
    pub(crate) fn response(&self) -> Result<Response, PlayerError> {
        match &self.draft {
            Draft::Quiz { selected } => selected
                .map(Response::Choice)
                .ok_or(PlayerError::NothingSelected),
            Draft::Checkbox { selected } if selected.is_empty() => {
                Err(PlayerError::NothingSelected)
            }
            Draft::Checkbox { selected } => Ok(Response::Choices(selected.clone())),
            Draft::Written { text } => Ok(Response::Text(text.clone())),
            Draft::Matching { matches } => Ok(Response::Matches(matches.clone())),
            Draft::Order { arrangement } => Ok(Response::Sequence(arrangement.clone())),
            Draft::Flashcard { .. } => Err(self.mismatch("check")),
            Draft::Note => Err(self.mismatch("check")),
        }
    }
}
