//! Domain models: Bloom taxonomy levels, the normalized classification result,
//! and the append-only history entry.

use serde::{Deserialize, Serialize};

/// Cognitive level from Bloom's taxonomy, carried on the wire as its Korean label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloomLevel {
  #[serde(rename = "기억")]
  Remember,
  #[serde(rename = "이해")]
  Understand,
  #[serde(rename = "적용")]
  Apply,
  #[serde(rename = "분석")]
  Analyze,
  #[serde(rename = "평가")]
  Evaluate,
  #[serde(rename = "창조")]
  Create,
  #[serde(rename = "미분류")]
  Unclassified,
}

impl Default for BloomLevel {
  fn default() -> Self { BloomLevel::Unclassified }
}

impl BloomLevel {
  /// The six real levels in taxonomy order (Unclassified excluded).
  pub const ALL: [BloomLevel; 6] = [
    BloomLevel::Remember,
    BloomLevel::Understand,
    BloomLevel::Apply,
    BloomLevel::Analyze,
    BloomLevel::Evaluate,
    BloomLevel::Create,
  ];

  /// Exact match against the six labels. Anything else is `Unclassified`.
  pub fn from_label(label: &str) -> Self {
    Self::ALL
      .into_iter()
      .find(|lvl| lvl.label() == label)
      .unwrap_or(BloomLevel::Unclassified)
  }

  pub fn label(self) -> &'static str {
    match self {
      BloomLevel::Remember => "기억",
      BloomLevel::Understand => "이해",
      BloomLevel::Apply => "적용",
      BloomLevel::Analyze => "분석",
      BloomLevel::Evaluate => "평가",
      BloomLevel::Create => "창조",
      BloomLevel::Unclassified => "미분류",
    }
  }
}

impl std::fmt::Display for BloomLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Outcome of one classification. Built only by the response normalizer,
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
  pub is_relevant: bool,
  pub relevance_reason: String,
  pub bloom_level: BloomLevel,
  pub bloom_explanation: String,
  pub quality_score: u8,
  pub quality_feedback: String,
}

/// History entry appended after every successful classification.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionRecord {
  pub position: usize,
  pub question: String,
  pub result: ClassificationResult,
}

/// Who authored a chat-log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  User,
  Assistant,
}

/// One line of the session chat log (question in, short verdict out).
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}
