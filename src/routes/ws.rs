//! WebSocket upgrade + message loop. Every connection owns a private session that lives
//! as long as the socket. Each client message is parsed as JSON and forwarded to core
//! logic; we reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::history::HistoryFilter;
use crate::logic::{classify_question, learning_path, set_curriculum};
use crate::protocol::{ClassifyOut, ClientWsMessage, ServerWsMessage};
use crate::state::{AppState, Session};

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "bloom_tutor", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (session_id, handle) = state.create_session().await;
  info!(target: "bloom_tutor", %session_id, "WebSocket connected");

  if send(&mut socket, &ServerWsMessage::Session { session_id: session_id.clone() }).await {
    while let Some(Ok(msg)) = socket.recv().await {
      match msg {
        Message::Text(txt) => {
          // Parse, dispatch, serialize response.
          let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "bloom_tutor", "WS received: {:?}", &incoming);
              let mut session = handle.lock().await;
              handle_client_ws(incoming, &state, &mut session).await
            }
            Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
          };
          if !send(&mut socket, &reply).await {
            break;
          }
        }
        Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
        Message::Close(_) => break,
        _ => {}
      }
    }
  }

  state.remove_session(&session_id).await;
  info!(target: "bloom_tutor", %session_id, "WebSocket disconnected");
}

/// Serialize and send one reply. Returns false when the socket is gone.
async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  match socket.send(Message::Text(out)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "bloom_tutor", error = %e, "WS send error");
      false
    }
  }
}

#[instrument(level = "info", skip(state, session), fields(session_id = %session.id))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &mut Session) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SetCurriculum { curriculum } => {
      set_curriculum(session, curriculum);
      ServerWsMessage::Curriculum { curriculum: session.curriculum.clone() }
    }

    ClientWsMessage::Classify { question } => {
      let outcome = ClassifyOut::from(classify_question(state, session, &question).await);
      info!(target: "classifier", session_id = %session.id, ok = matches!(outcome, ClassifyOut::Ok { .. }), "WS classify served");
      ServerWsMessage::Classification { outcome }
    }

    ClientWsMessage::LearningPath { question } => match learning_path(state, session, &question).await {
      Ok(text) => ServerWsMessage::LearningPath { question, text },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::History { relevance, level } => {
      let records = session.history.filtered(&HistoryFilter { relevance, level });
      ServerWsMessage::History { records }
    }

    ClientWsMessage::Stats => ServerWsMessage::Stats { stats: session.history.stats() },

    ClientWsMessage::ResetHistory => {
      session.history.reset();
      info!(target: "session", session_id = %session.id, "History reset");
      ServerWsMessage::HistoryReset
    }

    ClientWsMessage::Messages => ServerWsMessage::Messages { messages: session.messages.clone() },
  }
}
