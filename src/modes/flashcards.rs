//! Flippable flashcard deck.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::schemas::FlashcardSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlashcardAction {
  Flip,
  Next,
  Prev,
  Restart,
}

#[derive(Clone, Debug)]
pub struct FlashcardDeck {
  cards: FlashcardSet,
  current: usize,
  flipped: bool,
  reviewed: BTreeSet<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlashcardSnapshot {
  pub index: usize,
  pub total: usize,
  pub term: String,
  /// Present only while the card shows its back.
  pub definition: Option<String>,
  pub flipped: bool,
  pub reviewed: usize,
  pub progress: u8,
}

impl FlashcardDeck {
  pub fn new(cards: FlashcardSet) -> Self {
    Self { cards, current: 0, flipped: false, reviewed: BTreeSet::new() }
  }

  pub fn apply(&mut self, action: FlashcardAction) {
    match action {
      FlashcardAction::Flip => self.flip(),
      FlashcardAction::Next => self.next(),
      FlashcardAction::Prev => self.prev(),
      FlashcardAction::Restart => self.restart(),
    }
  }

  /// Turn the current card over. The first time a card shows its definition
  /// it counts as reviewed.
  pub fn flip(&mut self) {
    self.flipped = !self.flipped;
    if self.flipped {
      self.reviewed.insert(self.current);
    }
  }

  pub fn next(&mut self) {
    self.current = (self.current + 1) % self.len();
    self.flipped = false;
  }

  pub fn prev(&mut self) {
    self.current = (self.current + self.len() - 1) % self.len();
    self.flipped = false;
  }

  pub fn restart(&mut self) {
    self.current = 0;
    self.flipped = false;
    self.reviewed.clear();
  }

  pub fn current(&self) -> usize {
    self.current
  }

  pub fn len(&self) -> usize {
    self.cards.cards().len()
  }

  pub fn reviewed(&self) -> usize {
    self.reviewed.len()
  }

  pub fn progress(&self) -> u8 {
    crate::schemas::progress_percent(self.reviewed(), self.len())
  }

  pub fn snapshot(&self) -> FlashcardSnapshot {
    let card = &self.cards.cards()[self.current];
    FlashcardSnapshot {
      index: self.current,
      total: self.len(),
      term: card.term.clone(),
      definition: self.flipped.then(|| card.definition.clone()),
      flipped: self.flipped,
      reviewed: self.reviewed(),
      progress: self.progress(),
    }
  }
}
