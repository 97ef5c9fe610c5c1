//! Interactive learning modes. Each one owns its local state and only ever
//! sees its finished data set.

pub mod flashcards;
pub mod matching;
pub mod quiz;

use rand::Rng;
use serde::Serialize;

use crate::schemas::{ContentKind, ContentSet};

pub use flashcards::{FlashcardAction, FlashcardDeck, FlashcardSnapshot};
pub use matching::{Attempt, MatchingAction, MatchingGame, MatchingSnapshot};
pub use quiz::{QuizAction, QuizSnapshot, QuizView};

/// The mounted view.
#[derive(Clone, Debug)]
pub enum ActiveView {
  Quiz(QuizView),
  Flashcards(FlashcardDeck),
  Matching(MatchingGame),
}

impl ActiveView {
  pub fn mount<R: Rng + ?Sized>(set: ContentSet, rng: &mut R) -> Self {
    match set {
      ContentSet::Quiz(q) => ActiveView::Quiz(QuizView::new(q)),
      ContentSet::Flashcards(f) => ActiveView::Flashcards(FlashcardDeck::new(f)),
      ContentSet::Matching(m) => ActiveView::Matching(MatchingGame::new(m, rng)),
    }
  }

  pub fn kind(&self) -> ContentKind {
    match self {
      ActiveView::Quiz(_) => ContentKind::Quiz,
      ActiveView::Flashcards(_) => ContentKind::Flashcards,
      ActiveView::Matching(_) => ContentKind::Matching,
    }
  }

  pub fn snapshot(&self) -> ViewSnapshot {
    match self {
      ActiveView::Quiz(v) => ViewSnapshot::Quiz(v.snapshot()),
      ActiveView::Flashcards(v) => ViewSnapshot::Flashcards(v.snapshot()),
      ActiveView::Matching(v) => ViewSnapshot::Matching(v.snapshot()),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewSnapshot {
  Quiz(QuizSnapshot),
  Flashcards(FlashcardSnapshot),
  Matching(MatchingSnapshot),
}
