//! Loading service configuration (decoding parameters, limits, prompt templates) from TOML.
//!
//! Every table and field is optional; anything missing falls back to `Default`.

use serde::Deserialize;
use tracing::{error, info};

use crate::prompt::{DEFAULT_CLASSIFICATION_TEMPLATE, DEFAULT_LEARNING_PATH_TEMPLATE};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub limits: Limits,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Decoding parameters handed to the model unchanged.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationOptions {
  pub temperature: f32,
  pub top_p: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    Self { temperature: 0.3, top_p: 0.8, max_output_tokens: 2048 }
  }
}

/// Per-call decoding parameters. Learning paths are narrative, so they run warmer.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
  pub classification: GenerationOptions,
  pub learning_path: GenerationOptions,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      classification: GenerationOptions::default(),
      learning_path: GenerationOptions { temperature: 0.7, ..GenerationOptions::default() },
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Cap applied to every free-text field of a classification.
  pub max_field_chars: usize,
  /// HTTP timeout for one model call.
  pub request_timeout_secs: u64,
}

impl Default for Limits {
  fn default() -> Self {
    Self { max_field_chars: 2000, request_timeout_secs: 60 }
  }
}

/// Prompt templates. Placeholders: `{curriculum}`, `{question}`, and for the
/// classification template `{schema_example}`. Literal braces must be doubled.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub classification_template: String,
  pub learning_path_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      classification_template: DEFAULT_CLASSIFICATION_TEMPLATE.into(),
      learning_path_template: DEFAULT_LEARNING_PATH_TEMPLATE.into(),
    }
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from BLOOM_TUTOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("BLOOM_TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "bloom_tutor", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "bloom_tutor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "bloom_tutor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
