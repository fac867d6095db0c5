//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Classifying a question (prompt → model → normalizer → history)
//!   - Generating a learning path (raw model text, no parsing)
//!   - Curriculum updates and the session chat log

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::{ChatMessage, QuestionRecord, Role};
use crate::gemini::{ProviderError, TextGenerator};
use crate::normalize::relevance_text;
use crate::prompt::{build_classification_prompt, build_learning_path_prompt};
use crate::state::{AppState, Session};

#[derive(Debug, Error)]
pub enum ClassifyError {
  #[error("수업 내용을 먼저 입력하세요.")]
  CurriculumMissing,
  #[error("질문이 비어 있습니다.")]
  EmptyQuestion,
  #[error(transparent)]
  Provider(#[from] ProviderError),
  /// No JSON object in the model output; carries the raw text for display.
  #[error("모델 응답에서 분석 결과(JSON)를 찾지 못했습니다.")]
  Parse { raw: String },
}

fn model(state: &AppState) -> Result<&dyn TextGenerator, ProviderError> {
  state.llm.as_deref().ok_or(ProviderError::NotConfigured)
}

fn check_inputs(session: &Session, question: &str) -> Result<(), ClassifyError> {
  if !session.has_curriculum() {
    return Err(ClassifyError::CurriculumMissing);
  }
  if question.trim().is_empty() {
    return Err(ClassifyError::EmptyQuestion);
  }
  Ok(())
}

#[instrument(level = "info", skip(session, curriculum), fields(session_id = %session.id, curriculum_len = curriculum.len()))]
pub fn set_curriculum(session: &mut Session, curriculum: String) {
  session.set_curriculum(curriculum);
  info!(target: "session", session_id = %session.id, "Curriculum updated");
}

/// Classify one question for the session. On success the record is appended to the
/// history and a short verdict goes to the chat log.
#[instrument(level = "info", skip(state, session, question), fields(session_id = %session.id, question_len = question.len()))]
pub async fn classify_question(
  state: &AppState,
  session: &mut Session,
  question: &str,
) -> Result<QuestionRecord, ClassifyError> {
  check_inputs(session, question)?;
  let question = question.trim();

  session.messages.push(ChatMessage { role: Role::User, content: question.to_string() });

  let prompt = build_classification_prompt(&state.prompts, &session.curriculum, question);
  let raw = match model(state)?.generate(&prompt, &state.generation.classification).await {
    Ok(raw) => raw,
    Err(e) => {
      error!(target: "classifier", session_id = %session.id, error = %e, "Model call failed");
      return Err(e.into());
    }
  };

  let Some(result) = state.normalizer.parse(&raw) else {
    warn!(target: "classifier", session_id = %session.id, raw_len = raw.len(), "Classification parse failure");
    return Err(ClassifyError::Parse { raw });
  };

  session.messages.push(ChatMessage {
    role: Role::Assistant,
    content: format!(
      "{} · {} · 질문 점수 {}/5",
      relevance_text(result.is_relevant),
      result.bloom_level,
      result.quality_score
    ),
  });

  let record = session.history.append(question.to_string(), result).clone();
  info!(
    target: "classifier",
    session_id = %session.id,
    position = record.position,
    is_relevant = record.result.is_relevant,
    level = %record.result.bloom_level,
    score = record.result.quality_score,
    "Question classified"
  );
  Ok(record)
}

/// Ask the model for a learning path. The text is returned untouched.
#[instrument(level = "info", skip(state, session, question), fields(session_id = %session.id, question_len = question.len()))]
pub async fn learning_path(state: &AppState, session: &Session, question: &str) -> Result<String, ClassifyError> {
  check_inputs(session, question)?;
  let prompt = build_learning_path_prompt(&state.prompts, &session.curriculum, question.trim());
  let text = model(state)?.generate(&prompt, &state.generation.learning_path).await.map_err(|e| {
    error!(target: "classifier", session_id = %session.id, error = %e, "Learning path generation failed");
    e
  })?;
  info!(target: "classifier", session_id = %session.id, text_len = text.len(), "Learning path generated");
  Ok(text)
}
