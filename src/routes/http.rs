//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::history::HistoryFilter;
use crate::logic::{classify_question, learning_path, set_curriculum, ClassifyError};
use crate::protocol::*;
use crate::state::{AppState, SessionHandle};

async fn lookup(state: &AppState, id: &str) -> Result<SessionHandle, Response> {
  state.session(id).await.ok_or_else(|| {
    warn!(target: "session", session_id = %id, "Unknown session");
    (StatusCode::NOT_FOUND, Json(ErrorOut { message: format!("Unknown session: {}", id) })).into_response()
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, model_configured: state.llm.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (session_id, _) = state.create_session().await;
  (StatusCode::CREATED, Json(SessionOut { session_id }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  if state.remove_session(&id).await {
    StatusCode::NO_CONTENT.into_response()
  } else {
    warn!(target: "session", session_id = %id, "Unknown session");
    (StatusCode::NOT_FOUND, Json(ErrorOut { message: format!("Unknown session: {}", id) })).into_response()
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_curriculum(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let curriculum = handle.lock().await.curriculum.clone();
  Json(CurriculumBody { curriculum }).into_response()
}

#[instrument(level = "info", skip(state, body), fields(%id, curriculum_len = body.curriculum.len()))]
pub async fn http_put_curriculum(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<CurriculumBody>,
) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let mut session = handle.lock().await;
  set_curriculum(&mut session, body.curriculum);
  Json(CurriculumBody { curriculum: session.curriculum.clone() }).into_response()
}

#[instrument(level = "info", skip(state, body), fields(%id, question_len = body.question.len()))]
pub async fn http_post_classify(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuestionIn>,
) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  // Held for the whole request: one classification at a time per session.
  let mut session = handle.lock().await;
  let outcome = ClassifyOut::from(classify_question(&state, &mut session, &body.question).await);
  info!(target: "classifier", session_id = %id, ok = matches!(outcome, ClassifyOut::Ok { .. }), "HTTP classify served");
  Json(outcome).into_response()
}

#[instrument(level = "info", skip(state, body), fields(%id, question_len = body.question.len()))]
pub async fn http_post_learning_path(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuestionIn>,
) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let session = handle.lock().await;
  match learning_path(&state, &session, &body.question).await {
    Ok(text) => Json(LearningPathOut { text }).into_response(),
    Err(e) => {
      let status = match e {
        ClassifyError::CurriculumMissing | ClassifyError::EmptyQuestion => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
      };
      (status, Json(ErrorOut { message: e.to_string() })).into_response()
    }
  }
}

#[instrument(level = "info", skip(state), fields(%id, ?filter))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Query(filter): Query<HistoryFilter>,
) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let records = handle.lock().await.history.filtered(&filter);
  Json(HistoryOut { records }).into_response()
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_history(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  handle.lock().await.history.reset();
  info!(target: "session", session_id = %id, "History reset");
  StatusCode::NO_CONTENT.into_response()
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_stats(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let stats = handle.lock().await.history.stats();
  Json(stats).into_response()
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_messages(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  let handle = match lookup(&state, &id).await { Ok(h) => h, Err(r) => return r };
  let messages = handle.lock().await.messages.clone();
  Json(MessagesOut { messages }).into_response()
}
