//! Minimal Gemini client: one non-streaming `generateContent` call, prompt in, text out.
//!
//! Calls are instrumented and log model name, latency, token usage and response size
//! (not contents). The API key is never logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::GenerationOptions;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Opaque provider failure. Surfaced to the user verbatim, never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("language model is not configured (GEMINI_API_KEY missing)")]
  NotConfigured,
  /// Built through `From`, which strips the request URL first.
  #[error("request to language model failed: {0}")]
  Http(reqwest::Error),
  #[error("Gemini HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("could not decode Gemini response: {0}")]
  Decode(String),
  #[error("Gemini returned no text")]
  EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
  fn from(e: reqwest::Error) -> Self {
    ProviderError::Http(e.without_url())
  }
}

/// Text-completion seam: prompt in, raw text out, no output schema guaranteed.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

    let client = match reqwest::Client::builder().timeout(timeout).build() {
      Ok(c) => c,
      Err(e) => {
        warn!(target: "bloom_tutor", error = %e, "Could not build HTTP client; model disabled");
        return None;
      }
    };

    Some(Self { client, api_key, base_url, model })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
  }
}

#[async_trait]
impl TextGenerator for Gemini {
  #[instrument(level = "info", skip(self, prompt, options), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
    let req = GenerateRequest {
      contents: vec![Content { role: "user".into(), parts: vec![Part { text: prompt.into() }] }],
      generation_config: GenerationConfigReq {
        temperature: options.temperature,
        top_p: options.top_p,
        max_output_tokens: options.max_output_tokens,
      },
    };

    let start = Instant::now();
    let res = self.client.post(self.endpoint())
      .header(API_KEY_HEADER, self.api_key.as_str())
      .header(USER_AGENT, "bloom-tutor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or(body);
      return Err(ProviderError::Status { status, message });
    }

    let body: GenerateResponse = res.json().await.map_err(|e| ProviderError::Decode(e.without_url().to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text = first_candidate_text(&body).ok_or(ProviderError::EmptyResponse)?;
    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Model response received");
    Ok(text)
  }
}

/// Concatenate the text parts of the first candidate. `None` if there is no text at all.
fn first_candidate_text(body: &GenerateResponse) -> Option<String> {
  let parts = &body.candidates.first()?.content.as_ref()?.parts;
  let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
  let text = text.trim();
  (!text.is_empty()).then(|| text.to_string())
}

// --- Request / response DTOs ---

#[derive(Serialize)]
struct GenerateRequest {
  contents: Vec<Content>,
  #[serde(rename = "generationConfig")]
  generation_config: GenerationConfigReq,
}
#[derive(Serialize)]
struct Content { role: String, parts: Vec<Part> }
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigReq {
  temperature: f32,
  top_p: f32,
  max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<CandidateContent> }
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
