//! Term/definition matching game.
//!
//! Terms and definitions are shown in two independently shuffled columns. A
//! pick from each column forms an attempt; the pair matches iff both picks
//! carry the same id. Either way the picks stay visible until the caller
//! clears them with the token handed out for that attempt.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::schemas::MatchingSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchingAction {
  SelectTerm(String),
  SelectDefinition(String),
  Restart,
}

/// Result of a completed term + definition pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt {
  pub correct: bool,
  /// Pass to `clear` once the reveal delay has elapsed.
  pub clear_token: u64,
}

#[derive(Clone, Debug)]
pub struct MatchingGame {
  items: MatchingSet,
  terms: Vec<usize>,
  definitions: Vec<usize>,
  selected_term: Option<String>,
  selected_definition: Option<String>,
  matched: HashSet<String>,
  attempts: u32,
  correct: u32,
  pending_clear: Option<u64>,
  next_token: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchingCard {
  pub id: String,
  pub text: String,
  pub matched: bool,
  pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchingSnapshot {
  pub terms: Vec<MatchingCard>,
  pub definitions: Vec<MatchingCard>,
  pub matched: usize,
  pub total: usize,
  pub attempts: u32,
  pub accuracy: u32,
  pub complete: bool,
}

impl MatchingGame {
  pub fn new<R: Rng + ?Sized>(items: MatchingSet, rng: &mut R) -> Self {
    let n = items.items().len();
    let mut game = Self {
      items,
      terms: (0..n).collect(),
      definitions: (0..n).collect(),
      selected_term: None,
      selected_definition: None,
      matched: HashSet::new(),
      attempts: 0,
      correct: 0,
      pending_clear: None,
      next_token: 0,
    };
    game.shuffle(rng);
    game
  }

  fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    self.terms.shuffle(rng);
    self.definitions.shuffle(rng);
  }

  /// Apply a user action; returns the attempt when it completed a pair.
  pub fn apply<R: Rng + ?Sized>(&mut self, action: MatchingAction, rng: &mut R) -> Option<Attempt> {
    match action {
      MatchingAction::SelectTerm(id) => self.select_term(&id),
      MatchingAction::SelectDefinition(id) => self.select_definition(&id),
      MatchingAction::Restart => {
        self.restart(rng);
        None
      }
    }
  }

  pub fn select_term(&mut self, id: &str) -> Option<Attempt> {
    if !self.selectable(id) {
      return None;
    }
    self.selected_term = Some(id.to_string());
    self.try_pair()
  }

  pub fn select_definition(&mut self, id: &str) -> Option<Attempt> {
    if !self.selectable(id) {
      return None;
    }
    self.selected_definition = Some(id.to_string());
    self.try_pair()
  }

  // Matched and unknown items are inert, and so is everything while an
  // attempt is still on display.
  fn selectable(&self, id: &str) -> bool {
    self.pending_clear.is_none() && !self.matched.contains(id) && self.items.get(id).is_some()
  }

  fn try_pair(&mut self) -> Option<Attempt> {
    let (Some(term), Some(def)) = (&self.selected_term, &self.selected_definition) else {
      return None;
    };
    let matched_id = (term == def).then(|| term.clone());
    let correct = matched_id.is_some();
    self.attempts += 1;
    if let Some(id) = matched_id {
      self.matched.insert(id);
      self.correct += 1;
    }
    self.next_token += 1;
    self.pending_clear = Some(self.next_token);
    Some(Attempt { correct, clear_token: self.next_token })
  }

  /// Continue numbering clear tokens after `last`, so tokens handed out by an
  /// earlier game for the same session are never reused.
  pub fn continue_tokens_after(&mut self, last: u64) {
    self.next_token = self.next_token.max(last);
  }

  /// Clear both picks for the attempt identified by `token`. Stale tokens
  /// (from before a restart or an earlier attempt) are ignored.
  pub fn clear(&mut self, token: u64) -> bool {
    if self.pending_clear != Some(token) {
      return false;
    }
    self.pending_clear = None;
    self.selected_term = None;
    self.selected_definition = None;
    true
  }

  pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    self.selected_term = None;
    self.selected_definition = None;
    self.matched.clear();
    self.attempts = 0;
    self.correct = 0;
    self.pending_clear = None;
    self.shuffle(rng);
  }

  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  pub fn matched(&self) -> &HashSet<String> {
    &self.matched
  }

  pub fn is_complete(&self) -> bool {
    self.matched.len() == self.items.items().len()
  }

  /// correct / attempts, 0 before the first attempt.
  pub fn accuracy(&self) -> f64 {
    if self.attempts == 0 {
      return 0.0;
    }
    f64::from(self.correct) / f64::from(self.attempts)
  }

  pub fn term_order(&self) -> Vec<&str> {
    self.terms.iter().map(|&i| self.items.items()[i].id.as_str()).collect()
  }

  pub fn definition_order(&self) -> Vec<&str> {
    self.definitions.iter().map(|&i| self.items.items()[i].id.as_str()).collect()
  }

  pub fn snapshot(&self) -> MatchingSnapshot {
    let card = |i: usize, definition: bool, selected: &Option<String>| {
      let it = &self.items.items()[i];
      MatchingCard {
        id: it.id.clone(),
        text: if definition { it.definition.clone() } else { it.term.clone() },
        matched: self.matched.contains(&it.id),
        selected: selected.as_deref() == Some(it.id.as_str()),
      }
    };
    MatchingSnapshot {
      terms: self.terms.iter().map(|&i| card(i, false, &self.selected_term)).collect(),
      definitions: self.definitions.iter().map(|&i| card(i, true, &self.selected_definition)).collect(),
      matched: self.matched.len(),
      total: self.items.items().len(),
      attempts: self.attempts,
      accuracy: (self.accuracy() * 100.0).round() as u32,
      complete: self.is_complete(),
    }
  }
}
