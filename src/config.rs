//! Loading service configuration (prompts + limits) from TOML.
//!
//! See `AppConfig`, `Prompts` and `Limits` for the expected schema. Every table
//! and field is optional; anything missing falls back to the defaults below.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::schemas::ContentKind;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
}

/// System + user instruction for one content kind. `{count}` is replaced with
/// the kind's target cardinality.
#[derive(Clone, Debug, Deserialize)]
pub struct KindPrompt {
  pub system: String,
  pub instruction: String,
}

/// Prompts used by the generation gateway. Override them in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz: KindPrompt,
  pub flashcards: KindPrompt,
  pub matching: KindPrompt,
  pub title_system: String,
  pub title_user_template: String,
}

impl Prompts {
  pub fn for_kind(&self, kind: ContentKind) -> &KindPrompt {
    match kind {
      ContentKind::Quiz => &self.quiz,
      ContentKind::Flashcards => &self.flashcards,
      ContentKind::Matching => &self.matching,
    }
  }
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz: KindPrompt {
        system: "You are a teacher. Your job is to take a document, and create a multiple choice test (with {count} questions) based on the content of the document. Each option should be roughly equal in length.".into(),
        instruction: "Create a multiple choice test based on this document.".into(),
      },
      flashcards: KindPrompt {
        system: "You are a teacher. Your job is to take a document, and create a set of {count} flashcards based on the content of the document. Each flashcard should have a term and a concise definition.".into(),
        instruction: "Create a set of flashcards based on this document.".into(),
      },
      matching: KindPrompt {
        system: "You are a teacher. Your job is to take a document, and create a set of {count} matching items based on the content of the document. Each item should have a term and a definition that can be matched together.".into(),
        instruction: "Create a set of matching items based on this document.".into(),
      },
      title_system: "You name study sets. Reply with the title only, at most five words, no quotes.".into(),
      title_user_template: "Generate a title for a quiz based on the following (PDF) file name. Try and extract as much info from the file name as possible. If the file name is just numbers or incoherent, just return quiz.\n\n{file}".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Largest accepted decoded upload, in bytes.
  pub max_upload_bytes: usize,
  /// Wall-clock ceiling for one generation call.
  pub generation_timeout_secs: u64,
  /// How long a matching-game attempt stays visible before both selections clear.
  pub match_clear_delay_ms: u64,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_upload_bytes: 5 * 1024 * 1024,
      generation_timeout_secs: 60,
      match_clear_delay_ms: 1000,
    }
  }
}

impl Limits {
  pub fn generation_timeout(&self) -> Duration {
    Duration::from_secs(self.generation_timeout_secs)
  }

  pub fn match_clear_delay(&self) -> Duration {
    Duration::from_millis(self.match_clear_delay_ms)
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from STUDY_CONFIG_PATH. On any parsing/IO error,
/// logs it and returns defaults.
pub fn load_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("STUDY_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "pdfstudy", %path, "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "pdfstudy", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "pdfstudy", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}
