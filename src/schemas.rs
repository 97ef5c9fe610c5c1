//! Content kinds, item shapes and the validated sets produced by generation.
//!
//! Every set type can only be built through its validating constructor, so a
//! `QuestionSet` in hand always has exactly four well-formed questions.

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use schemars::{schema_for, JsonSchema};
use serde_json::Value;
use uuid::Uuid;

use crate::error::SchemaError;

/// Which kind of learning material is generated (and which mode shows it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
  Quiz,
  Flashcards,
  Matching,
}

impl ContentKind {
  pub const ALL: [ContentKind; 3] = [ContentKind::Quiz, ContentKind::Flashcards, ContentKind::Matching];

  /// Exact number of items a finished set of this kind holds.
  pub fn target_count(self) -> usize {
    match self {
      ContentKind::Quiz => 4,
      ContentKind::Flashcards => 8,
      ContentKind::Matching => 6,
    }
  }

  /// Singular noun used in progress lines ("Generating question 2 of 4").
  pub fn item_label(self) -> &'static str {
    match self {
      ContentKind::Quiz => "question",
      ContentKind::Flashcards => "flashcard",
      ContentKind::Matching => "matching item",
    }
  }

  /// Noun used in user-facing failure notices.
  pub fn noun(self) -> &'static str {
    match self {
      ContentKind::Quiz => "quiz",
      ContentKind::Flashcards => "flashcards",
      ContentKind::Matching => "matching items",
    }
  }

  /// Title shown by the mode's view when no generated title is available.
  pub fn default_title(self) -> &'static str {
    match self {
      ContentKind::Quiz => "Quiz",
      ContentKind::Flashcards => "Flashcards",
      ContentKind::Matching => "Matching Game",
    }
  }
}

impl fmt::Display for ContentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ContentKind::Quiz => "quiz",
      ContentKind::Flashcards => "flashcards",
      ContentKind::Matching => "matching",
    };
    f.write_str(s)
  }
}

/// Percentage of a set observed so far, clamped to 0..=100.
pub fn progress_percent(observed: usize, target: usize) -> u8 {
  if target == 0 {
    return 0;
  }
  ((observed.min(target) * 100) / target) as u8
}

/// Correct answer of a question; A is the first option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[schemars(inline)]
pub enum AnswerKey {
  A,
  B,
  C,
  D,
}

impl AnswerKey {
  pub fn index(self) -> usize {
    match self {
      AnswerKey::A => 0,
      AnswerKey::B => 1,
      AnswerKey::C => 2,
      AnswerKey::D => 3,
    }
  }

  pub fn from_index(i: usize) -> Option<Self> {
    match i {
      0 => Some(AnswerKey::A),
      1 => Some(AnswerKey::B),
      2 => Some(AnswerKey::C),
      3 => Some(AnswerKey::D),
      _ => None,
    }
  }
}

// Field docs on the draft types double as schema descriptions for the model.

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct Question {
  pub question: String,
  /// Four possible answers to the question. Only one should be correct. They should all be of equal lengths.
  pub options: Vec<String>,
  /// The correct answer, where A is the first option, B is the second, and so on.
  pub answer: AnswerKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct Flashcard {
  /// The term or concept to learn
  pub term: String,
  /// The definition or explanation of the term
  pub definition: String,
}

/// A matching pair as the model emits it; ids are assigned after generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct MatchingDraft {
  pub term: String,
  pub definition: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingItem {
  pub id: String,
  pub term: String,
  pub definition: String,
}

fn check_count(actual: usize, expected: usize) -> Result<(), SchemaError> {
  if actual != expected {
    return Err(SchemaError::WrongCount { expected, actual });
  }
  Ok(())
}

fn check_non_empty(index: usize, field: &'static str, value: &str) -> Result<(), SchemaError> {
  if value.trim().is_empty() {
    return Err(SchemaError::EmptyField { index, field });
  }
  Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionSet(Vec<Question>);

impl QuestionSet {
  pub fn new(questions: Vec<Question>) -> Result<Self, SchemaError> {
    check_count(questions.len(), ContentKind::Quiz.target_count())?;
    for (index, q) in questions.iter().enumerate() {
      check_non_empty(index, "question", &q.question)?;
      if q.options.len() != 4 {
        return Err(SchemaError::WrongOptionCount { index, actual: q.options.len() });
      }
    }
    Ok(Self(questions))
  }

  pub fn questions(&self) -> &[Question] {
    &self.0
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlashcardSet(Vec<Flashcard>);

impl FlashcardSet {
  pub fn new(cards: Vec<Flashcard>) -> Result<Self, SchemaError> {
    check_count(cards.len(), ContentKind::Flashcards.target_count())?;
    for (index, c) in cards.iter().enumerate() {
      check_non_empty(index, "term", &c.term)?;
      check_non_empty(index, "definition", &c.definition)?;
    }
    Ok(Self(cards))
  }

  pub fn cards(&self) -> &[Flashcard] {
    &self.0
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchingSet(Vec<MatchingItem>);

impl MatchingSet {
  pub fn new(items: Vec<MatchingItem>) -> Result<Self, SchemaError> {
    check_count(items.len(), ContentKind::Matching.target_count())?;
    let mut seen = HashSet::new();
    for (index, it) in items.iter().enumerate() {
      check_non_empty(index, "id", &it.id)?;
      check_non_empty(index, "term", &it.term)?;
      check_non_empty(index, "definition", &it.definition)?;
      if !seen.insert(it.id.as_str()) {
        return Err(SchemaError::DuplicateId { index, id: it.id.clone() });
      }
    }
    Ok(Self(items))
  }

  /// Give every draft a fresh UUID, then validate the full set.
  pub fn assign_ids(drafts: Vec<MatchingDraft>) -> Result<Self, SchemaError> {
    let items = drafts
      .into_iter()
      .map(|d| MatchingItem { id: Uuid::new_v4().to_string(), term: d.term, definition: d.definition })
      .collect();
    Self::new(items)
  }

  pub fn items(&self) -> &[MatchingItem] {
    &self.0
  }

  pub fn get(&self, id: &str) -> Option<&MatchingItem> {
    self.0.iter().find(|it| it.id == id)
  }
}

/// Any finished set, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum ContentSet {
  Quiz(QuestionSet),
  Flashcards(FlashcardSet),
  Matching(MatchingSet),
}

impl ContentSet {
  pub fn kind(&self) -> ContentKind {
    match self {
      ContentSet::Quiz(_) => ContentKind::Quiz,
      ContentSet::Flashcards(_) => ContentKind::Flashcards,
      ContentSet::Matching(_) => ContentKind::Matching,
    }
  }
}

/// Parametrises generation by content kind: what the model streams per item,
/// what the finished set looks like, and how the one becomes the other.
pub trait ContentSchema: Send + Sync + 'static {
  const KIND: ContentKind;
  type Draft: DeserializeOwned + Serialize + JsonSchema + Clone + fmt::Debug + Send + Sync + 'static;
  type Set: Serialize + Clone + fmt::Debug + Send + Sync + Into<ContentSet> + 'static;

  /// JSON schema of one streamed item, for structured model output.
  fn item_schema() -> Value {
    draft_schema::<Self::Draft>()
  }

  fn finish(drafts: Vec<Self::Draft>) -> Result<Self::Set, SchemaError>;
}

/// Item schema without the document-level keys, ready to nest under `items`.
fn draft_schema<T: JsonSchema>() -> Value {
  let mut schema = schema_for!(T).to_value();
  if let Some(obj) = schema.as_object_mut() {
    obj.remove("$schema");
    obj.remove("title");
    obj.remove("description");
  }
  schema
}

#[derive(Debug)]
pub struct QuizSchema;
#[derive(Debug)]
pub struct FlashcardSchema;
#[derive(Debug)]
pub struct MatchingSchema;

impl ContentSchema for QuizSchema {
  const KIND: ContentKind = ContentKind::Quiz;
  type Draft = Question;
  type Set = QuestionSet;

  fn finish(drafts: Vec<Question>) -> Result<QuestionSet, SchemaError> {
    QuestionSet::new(drafts)
  }
}

impl ContentSchema for FlashcardSchema {
  const KIND: ContentKind = ContentKind::Flashcards;
  type Draft = Flashcard;
  type Set = FlashcardSet;

  fn finish(drafts: Vec<Flashcard>) -> Result<FlashcardSet, SchemaError> {
    FlashcardSet::new(drafts)
  }
}

impl ContentSchema for MatchingSchema {
  const KIND: ContentKind = ContentKind::Matching;
  type Draft = MatchingDraft;
  type Set = MatchingSet;

  fn finish(drafts: Vec<MatchingDraft>) -> Result<MatchingSet, SchemaError> {
    MatchingSet::assign_ids(drafts)
  }
}

impl From<QuestionSet> for ContentSet {
  fn from(s: QuestionSet) -> Self { ContentSet::Quiz(s) }
}
impl From<FlashcardSet> for ContentSet {
  fn from(s: FlashcardSet) -> Self { ContentSet::Flashcards(s) }
}
impl From<MatchingSet> for ContentSet {
  fn from(s: MatchingSet) -> Self { ContentSet::Matching(s) }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;

  pub fn question(n: usize, answer: AnswerKey) -> Question {
    Question {
      question: format!("Question {n}?"),
      options: (0..4).map(|i| format!("Option {n}.{i}")).collect(),
      answer,
    }
  }

  pub fn question_set() -> QuestionSet {
    let keys = [AnswerKey::A, AnswerKey::B, AnswerKey::C, AnswerKey::D];
    QuestionSet::new((0..4).map(|n| question(n, keys[n])).collect()).expect("valid quiz")
  }

  pub fn flashcard_set() -> FlashcardSet {
    FlashcardSet::new(
      (0..8)
        .map(|n| Flashcard { term: format!("term {n}"), definition: format!("definition {n}") })
        .collect(),
    )
    .expect("valid deck")
  }

  pub fn matching_drafts() -> Vec<MatchingDraft> {
    (0..6)
      .map(|n| MatchingDraft { term: format!("term {n}"), definition: format!("definition {n}") })
      .collect()
  }

  pub fn matching_set() -> MatchingSet {
    MatchingSet::new(
      (0..6)
        .map(|n| MatchingItem { id: format!("id-{n}"), term: format!("term {n}"), definition: format!("definition {n}") })
        .collect(),
    )
    .expect("valid matching set")
  }
}

#[cfg(test)]
mod tests {
  use super::fixtures::*;
  use super::*;

  #[test]
  fn quiz_item_schema_is_closed_and_inline() {
    let schema = QuizSchema::item_schema();
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["additionalProperties"], false);
    assert!(schema.get("$schema").is_none());
    assert!(schema.get("$defs").is_none());

    let mut required: Vec<&str> = schema["required"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    required.sort();
    assert_eq!(required, vec!["answer", "options", "question"]);

    let props = &schema["properties"];
    assert_eq!(props["options"]["type"], "array");
    assert_eq!(props["options"]["items"]["type"], "string");
    assert!(props["options"]["description"].as_str().unwrap().starts_with("Four possible answers"));
    assert_eq!(props["answer"]["enum"], serde_json::json!(["A", "B", "C", "D"]));
    assert!(props["answer"]["description"].as_str().unwrap().contains("A is the first option"));
  }

  #[test]
  fn pair_schemas_require_term_and_definition() {
    for schema in [FlashcardSchema::item_schema(), MatchingSchema::item_schema()] {
      assert_eq!(schema["additionalProperties"], false);
      assert_eq!(schema["properties"]["term"]["type"], "string");
      assert_eq!(schema["properties"]["definition"]["type"], "string");
      assert_eq!(schema["required"].as_array().map(Vec::len), Some(2));
    }
    let cards = FlashcardSchema::item_schema();
    assert_eq!(cards["properties"]["term"]["description"], "The term or concept to learn");
  }

  #[test]
  fn question_set_requires_exactly_four_questions() {
    let three: Vec<_> = (0..3).map(|n| question(n, AnswerKey::A)).collect();
    assert_eq!(QuestionSet::new(three), Err(SchemaError::WrongCount { expected: 4, actual: 3 }));

    let set = question_set();
    assert_eq!(set.questions().len(), 4);
    for q in set.questions() {
      assert_eq!(q.options.len(), 4);
      assert!(q.answer.index() < q.options.len());
    }
  }

  #[test]
  fn question_with_three_options_rejects_the_whole_set() {
    let mut qs: Vec<_> = (0..4).map(|n| question(n, AnswerKey::B)).collect();
    qs[2].options.pop();
    assert_eq!(QuestionSet::new(qs), Err(SchemaError::WrongOptionCount { index: 2, actual: 3 }));
  }

  #[test]
  fn flashcards_need_eight_non_empty_cards() {
    let mut cards = flashcard_set().cards().to_vec();
    cards[5].definition = "  ".into();
    assert_eq!(FlashcardSet::new(cards.clone()), Err(SchemaError::EmptyField { index: 5, field: "definition" }));
    cards.truncate(7);
    assert!(matches!(FlashcardSet::new(cards), Err(SchemaError::WrongCount { expected: 8, actual: 7 })));
  }

  #[test]
  fn matching_ids_are_assigned_and_distinct() {
    let set = MatchingSchema::finish(matching_drafts()).unwrap();
    let ids: HashSet<_> = set.items().iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids.len(), 6);
    assert!(set.items().iter().all(|i| Uuid::parse_str(&i.id).is_ok()));
  }

  #[test]
  fn matching_rejects_duplicate_ids() {
    let mut items = matching_set().items().to_vec();
    items[4].id = items[1].id.clone();
    assert!(matches!(MatchingSet::new(items), Err(SchemaError::DuplicateId { index: 4, .. })));
  }

  #[test]
  fn matching_draft_ignores_model_supplied_ids() {
    let raw = r#"{"id":"model-made","term":"t","definition":"d"}"#;
    let draft: MatchingDraft = serde_json::from_str(raw).unwrap();
    let mut drafts = matching_drafts();
    drafts[0] = draft;
    let set = MatchingSchema::finish(drafts).unwrap();
    assert!(set.items().iter().all(|i| i.id != "model-made"));
  }

  #[test]
  fn answer_key_parses_letters() {
    let q: Question = serde_json::from_str(r#"{"question":"q","options":["a","b","c","d"],"answer":"C"}"#).unwrap();
    assert_eq!(q.answer, AnswerKey::C);
    assert_eq!(AnswerKey::from_index(q.answer.index()), Some(AnswerKey::C));
  }

  #[test]
  fn progress_is_a_clamped_percentage() {
    assert_eq!(progress_percent(0, 4), 0);
    assert_eq!(progress_percent(1, 4), 25);
    assert_eq!(progress_percent(3, 6), 50);
    assert_eq!(progress_percent(9, 8), 100);
  }

  #[test]
  fn kinds_round_trip_as_snake_case() {
    assert_eq!(serde_json::to_string(&ContentKind::Flashcards).unwrap(), "\"flashcards\"");
    let k: ContentKind = serde_json::from_str("\"matching\"").unwrap();
    assert_eq!(k, ContentKind::Matching);
  }
}
