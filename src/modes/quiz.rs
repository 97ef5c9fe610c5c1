//! Sequential quiz: walk the questions, answer each once, see correctness at once.

use serde::Serialize;

use crate::schemas::{AnswerKey, QuestionSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizAction {
  Answer(AnswerKey),
  Next,
  Prev,
  Restart,
}

#[derive(Clone, Debug)]
pub struct QuizView {
  questions: QuestionSet,
  current: usize,
  answers: Vec<Option<AnswerKey>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuizSnapshot {
  pub index: usize,
  pub total: usize,
  pub question: String,
  pub options: Vec<String>,
  pub selected: Option<AnswerKey>,
  /// Only revealed once the current question has been answered.
  pub correct_answer: Option<AnswerKey>,
  pub is_correct: Option<bool>,
  pub answered: usize,
  pub score: usize,
  pub complete: bool,
}

impl QuizView {
  pub fn new(questions: QuestionSet) -> Self {
    let n = questions.questions().len();
    Self { questions, current: 0, answers: vec![None; n] }
  }

  pub fn apply(&mut self, action: QuizAction) {
    match action {
      QuizAction::Answer(key) => {
        self.answer(key);
      }
      QuizAction::Next => self.next(),
      QuizAction::Prev => self.prev(),
      QuizAction::Restart => self.restart(),
    }
  }

  /// Record an answer for the current question. Returns its correctness, or
  /// `None` if the question was already answered (answers are final).
  pub fn answer(&mut self, key: AnswerKey) -> Option<bool> {
    let slot = &mut self.answers[self.current];
    if slot.is_some() {
      return None;
    }
    *slot = Some(key);
    Some(self.questions.questions()[self.current].answer == key)
  }

  pub fn next(&mut self) {
    self.current = (self.current + 1) % self.len();
  }

  pub fn prev(&mut self) {
    self.current = (self.current + self.len() - 1) % self.len();
  }

  pub fn restart(&mut self) {
    self.current = 0;
    self.answers.iter_mut().for_each(|a| *a = None);
  }

  pub fn current(&self) -> usize {
    self.current
  }

  pub fn len(&self) -> usize {
    self.answers.len()
  }

  pub fn score(&self) -> usize {
    self
      .answers
      .iter()
      .zip(self.questions.questions())
      .filter(|(a, q)| **a == Some(q.answer))
      .count()
  }

  pub fn is_complete(&self) -> bool {
    self.answers.iter().all(Option::is_some)
  }

  pub fn snapshot(&self) -> QuizSnapshot {
    let q = &self.questions.questions()[self.current];
    let selected = self.answers[self.current];
    QuizSnapshot {
      index: self.current,
      total: self.len(),
      question: q.question.clone(),
      options: q.options.clone(),
      selected,
      correct_answer: selected.map(|_| q.answer),
      is_correct: selected.map(|s| s == q.answer),
      answered: self.answers.iter().filter(|a| a.is_some()).count(),
      score: self.score(),
      complete: self.is_complete(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schemas::fixtures::question_set;

  #[test]
  fn navigation_wraps_both_ways() {
    let mut quiz = QuizView::new(question_set());
    quiz.prev();
    assert_eq!(quiz.current(), 3);
    quiz.next();
    assert_eq!(quiz.current(), 0);
    quiz.next();
    assert_eq!(quiz.current(), 1);
  }

  #[test]
  fn correctness_is_revealed_immediately_and_locked() {
    // fixture answers: A, B, C, D
    let mut quiz = QuizView::new(question_set());
    assert_eq!(quiz.snapshot().correct_answer, None);
    assert_eq!(quiz.answer(AnswerKey::B), Some(false));
    let snap = quiz.snapshot();
    assert_eq!(snap.is_correct, Some(false));
    assert_eq!(snap.correct_answer, Some(AnswerKey::A));
    assert_eq!(quiz.answer(AnswerKey::A), None);
    assert_eq!(quiz.snapshot().selected, Some(AnswerKey::B));
  }

  #[test]
  fn score_and_completion() {
    let mut quiz = QuizView::new(question_set());
    for key in [AnswerKey::A, AnswerKey::B, AnswerKey::A, AnswerKey::D] {
      quiz.apply(QuizAction::Answer(key));
      quiz.apply(QuizAction::Next);
    }
    assert!(quiz.is_complete());
    assert_eq!(quiz.score(), 3);

    quiz.apply(QuizAction::Restart);
    assert_eq!(quiz.current(), 0);
    assert_eq!(quiz.score(), 0);
    assert!(!quiz.is_complete());
  }
}
