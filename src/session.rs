//! Per-user study session: one explicit state value driven by `apply(Action)`.
//!
//! The reducer is synchronous and performs no I/O. Anything that has to happen
//! outside (model calls, title lookup, timers, user notices) comes back as an
//! `Effect` for the coordinator to execute; results re-enter as actions.
//!
//! Every generation is tagged with a `Ticket` carrying the document epoch.
//! Reset, a new file selection and a failure all bump the epoch, so results of
//! streams started for an older document are dropped on arrival.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::document::{FileIn, UploadedDocument};
use crate::gateway::GenerationUpdate;
use crate::modes::{ActiveView, FlashcardAction, MatchingAction, QuizAction, ViewSnapshot};
use crate::schemas::{progress_percent, ContentKind, ContentSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "mode", rename_all = "snake_case")]
pub enum Phase {
  Idle,
  AwaitingFirstGeneration,
  ModeSelectionPending,
  Generating(ContentKind),
  ModeActive(ContentKind),
}

/// Identifies one generation: which kind, for which document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
  pub epoch: u64,
  pub kind: ContentKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
  InputRejected,
  MultipleFiles,
  GenerationFailed(ContentKind),
}

impl Notice {
  pub fn message(&self) -> String {
    match self {
      Notice::InputRejected => "Only PDF files under 5MB are allowed.".into(),
      Notice::MultipleFiles => "Please upload a single PDF.".into(),
      Notice::GenerationFailed(kind) => format!("Failed to generate {}. Please try again.", kind.noun()),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
  SelectFiles(Vec<FileIn>),
  Submit,
  SelectMode(ContentKind),
  Reset,
  Generation { ticket: Ticket, update: GenerationUpdate },
  TitleResolved { epoch: u64, title: Option<String> },
  Quiz(QuizAction),
  Flashcards(FlashcardAction),
  Matching(MatchingAction),
  MatchClearElapsed { token: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  Notify(Notice),
  RequestTitle { epoch: u64, filename: String },
  StartGeneration { ticket: Ticket, document: UploadedDocument },
  ScheduleMatchClear { token: u64 },
}

#[derive(Clone, Debug, Default)]
struct Slot {
  set: Option<ContentSet>,
  in_flight: bool,
  observed: usize,
}

impl Slot {
  fn percent(&self, kind: ContentKind) -> u8 {
    if self.set.is_some() {
      return 100;
    }
    progress_percent(self.observed, kind.target_count()).min(99)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
  pub kind: ContentKind,
  pub observed: usize,
  pub target: usize,
  pub percent: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
  pub phase: Phase,
  pub file_name: Option<String>,
  pub title: String,
  pub progress: Option<Progress>,
  pub status: Option<String>,
  /// Modes whose data is ready to show without generating.
  pub ready: Vec<ContentKind>,
  pub view: Option<ViewSnapshot>,
}

pub struct Session<R = StdRng> {
  limits: Limits,
  phase: Phase,
  document: Option<UploadedDocument>,
  slots: [Slot; 3],
  selected_mode: Option<ContentKind>,
  content_generated: bool,
  title: Option<String>,
  epoch: u64,
  view: Option<ActiveView>,
  /// Last matching clear token handed out; survives remounts and resets.
  last_clear_token: u64,
  rng: R,
}

fn slot_index(kind: ContentKind) -> usize {
  match kind {
    ContentKind::Quiz => 0,
    ContentKind::Flashcards => 1,
    ContentKind::Matching => 2,
  }
}

impl Session<StdRng> {
  pub fn new(limits: Limits) -> Self {
    Self::with_rng(limits, StdRng::from_entropy())
  }
}

impl<R: Rng> Session<R> {
  pub fn with_rng(limits: Limits, rng: R) -> Self {
    Self {
      limits,
      phase: Phase::Idle,
      document: None,
      slots: Default::default(),
      selected_mode: None,
      content_generated: false,
      title: None,
      epoch: 0,
      view: None,
      last_clear_token: 0,
      rng,
    }
  }

  pub fn apply(&mut self, action: Action) -> Vec<Effect> {
    match action {
      Action::SelectFiles(files) => self.select_files(files),
      Action::Submit => self.submit(),
      Action::SelectMode(kind) => self.select_mode(kind),
      Action::Reset => {
        self.clear();
        Vec::new()
      }
      Action::Generation { ticket, update } => self.on_generation(ticket, update),
      Action::TitleResolved { epoch, title } => {
        if epoch == self.epoch {
          self.title = title;
        }
        Vec::new()
      }
      Action::Quiz(a) => {
        if let Some(ActiveView::Quiz(v)) = self.view.as_mut() {
          v.apply(a);
        }
        Vec::new()
      }
      Action::Flashcards(a) => {
        if let Some(ActiveView::Flashcards(v)) = self.view.as_mut() {
          v.apply(a);
        }
        Vec::new()
      }
      Action::Matching(a) => match self.view.as_mut() {
        Some(ActiveView::Matching(g)) => match g.apply(a, &mut self.rng) {
          Some(attempt) => {
            self.last_clear_token = attempt.clear_token;
            vec![Effect::ScheduleMatchClear { token: attempt.clear_token }]
          }
          None => Vec::new(),
        },
        _ => Vec::new(),
      },
      Action::MatchClearElapsed { token } => {
        if let Some(ActiveView::Matching(g)) = self.view.as_mut() {
          g.clear(token);
        }
        Vec::new()
      }
    }
  }

  /// Back to `Idle` with nothing selected, generated or mounted.
  fn clear(&mut self) {
    self.epoch += 1;
    self.phase = Phase::Idle;
    self.document = None;
    self.slots = Default::default();
    self.selected_mode = None;
    self.content_generated = false;
    self.title = None;
    self.view = None;
  }

  fn select_files(&mut self, files: Vec<FileIn>) -> Vec<Effect> {
    self.clear();
    let mut effects = Vec::new();
    let given = files.len();
    let mut valid: Vec<UploadedDocument> = files
      .into_iter()
      .filter_map(|f| match UploadedDocument::from_upload(f, &self.limits) {
        Ok(doc) => Some(doc),
        Err(e) => {
          info!(target: "session", error = %e, "Upload rejected");
          None
        }
      })
      .collect();

    if valid.len() != given {
      effects.push(Effect::Notify(Notice::InputRejected));
    }
    if valid.len() > 1 {
      info!(target: "session", count = valid.len(), "Multiple files rejected");
      effects.push(Effect::Notify(Notice::MultipleFiles));
      return effects;
    }
    self.document = valid.pop();
    effects
  }

  fn submit(&mut self) -> Vec<Effect> {
    if self.phase != Phase::Idle {
      debug!(target: "session", phase = ?self.phase, "Submit ignored");
      return Vec::new();
    }
    let Some(doc) = self.document.clone() else {
      return Vec::new();
    };
    info!(target: "session", file = %doc.name(), size = doc.size(), "Document submitted");
    self.phase = Phase::AwaitingFirstGeneration;
    vec![
      Effect::RequestTitle { epoch: self.epoch, filename: doc.name().to_string() },
      self.start(ContentKind::Quiz, doc),
    ]
  }

  fn start(&mut self, kind: ContentKind, document: UploadedDocument) -> Effect {
    let slot = &mut self.slots[slot_index(kind)];
    slot.in_flight = true;
    slot.observed = 0;
    Effect::StartGeneration { ticket: Ticket { epoch: self.epoch, kind }, document }
  }

  fn select_mode(&mut self, kind: ContentKind) -> Vec<Effect> {
    if matches!(self.phase, Phase::Idle) {
      return Vec::new();
    }
    let Some(doc) = self.document.clone() else {
      return Vec::new();
    };
    self.selected_mode = Some(kind);
    let slot = &self.slots[slot_index(kind)];

    if let Some(set) = slot.set.clone() {
      self.activate(kind, set);
      return Vec::new();
    }
    self.phase = Phase::Generating(kind);
    if slot.in_flight {
      debug!(target: "session", %kind, "Generation already in flight");
      return Vec::new();
    }
    vec![self.start(kind, doc)]
  }

  fn activate(&mut self, kind: ContentKind, set: ContentSet) {
    let already = matches!(&self.view, Some(v) if v.kind() == kind) && self.phase == Phase::ModeActive(kind);
    if !already {
      let mut view = ActiveView::mount(set, &mut self.rng);
      if let ActiveView::Matching(g) = &mut view {
        g.continue_tokens_after(self.last_clear_token);
      }
      self.view = Some(view);
    }
    self.phase = Phase::ModeActive(kind);
  }

  fn on_generation(&mut self, ticket: Ticket, update: GenerationUpdate) -> Vec<Effect> {
    if ticket.epoch != self.epoch {
      debug!(target: "session", kind = %ticket.kind, epoch = ticket.epoch, current = self.epoch, "Stale generation update dropped");
      return Vec::new();
    }
    let kind = ticket.kind;
    let slot = &mut self.slots[slot_index(kind)];

    match update {
      GenerationUpdate::Started => {
        if self.phase == Phase::AwaitingFirstGeneration {
          self.phase = Phase::Generating(kind);
        }
        Vec::new()
      }
      GenerationUpdate::Progress { observed } => {
        slot.observed = slot.observed.max(observed);
        Vec::new()
      }
      GenerationUpdate::Finished(set) => {
        if set.kind() != kind {
          warn!(target: "session", %kind, got = %set.kind(), "Finished set of unexpected kind dropped");
          return Vec::new();
        }
        slot.observed = kind.target_count();
        slot.in_flight = false;
        slot.set = Some(set.clone());
        self.content_generated = true;
        info!(target: "session", %kind, "Content generated");

        match self.selected_mode {
          Some(m) if m == kind => self.activate(kind, set),
          Some(_) => {}
          None => self.phase = Phase::ModeSelectionPending,
        }
        Vec::new()
      }
      GenerationUpdate::Failed(message) => {
        warn!(target: "session", %kind, error = %message, "Generation failed; session reset");
        self.clear();
        vec![Effect::Notify(Notice::GenerationFailed(kind))]
      }
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn document(&self) -> Option<&UploadedDocument> {
    self.document.as_ref()
  }

  pub fn set(&self, kind: ContentKind) -> Option<&ContentSet> {
    self.slots[slot_index(kind)].set.as_ref()
  }

  pub fn in_flight(&self, kind: ContentKind) -> bool {
    self.slots[slot_index(kind)].in_flight
  }

  pub fn selected_mode(&self) -> Option<ContentKind> {
    self.selected_mode
  }

  pub fn content_generated(&self) -> bool {
    self.content_generated
  }

  pub fn title(&self) -> Option<&str> {
    self.title.as_deref()
  }

  pub fn epoch(&self) -> u64 {
    self.epoch
  }

  pub fn view(&self) -> Option<&ActiveView> {
    self.view.as_ref()
  }

  /// Generation percentage for `kind`: capped at 99 while streaming, 100 once
  /// the set is stored.
  pub fn percent(&self, kind: ContentKind) -> u8 {
    self.slots[slot_index(kind)].percent(kind)
  }

  /// Progress of the generation the user is currently waiting on.
  pub fn progress(&self) -> Option<Progress> {
    let kind = match self.phase {
      Phase::AwaitingFirstGeneration => ContentKind::Quiz,
      Phase::Generating(k) => k,
      _ => return None,
    };
    let slot = &self.slots[slot_index(kind)];
    Some(Progress { kind, observed: slot.observed, target: kind.target_count(), percent: slot.percent(kind) })
  }

  fn status_line(&self) -> Option<String> {
    let p = self.progress()?;
    if p.observed == 0 {
      return Some("Analyzing PDF content".into());
    }
    Some(format!("Generating {} {} of {}", p.kind.item_label(), (p.observed + 1).min(p.target), p.target))
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let default_title = match self.phase {
      Phase::ModeActive(k) => k.default_title(),
      Phase::ModeSelectionPending => "Choose Learning Mode",
      _ => "PDF Quiz Generator",
    };
    SessionSnapshot {
      phase: self.phase,
      file_name: self.document.as_ref().map(|d| d.name().to_string()),
      title: self.title.clone().unwrap_or_else(|| default_title.to_string()),
      progress: self.progress(),
      status: self.status_line(),
      ready: ContentKind::ALL.into_iter().filter(|k| self.set(*k).is_some()).collect(),
      view: self.view.as_ref().map(ActiveView::snapshot),
    }
  }
}
