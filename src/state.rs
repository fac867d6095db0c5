//! Application state: per-session contexts, prompts, decoding options, and the model client.
//!
//! Each session owns its curriculum, chat log and history. A session sits behind its own
//! async mutex; whoever holds the guard is the single writer, and the guard is held for a
//! whole classification so requests within one session never overlap. Sessions never share
//! state with each other.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_config_from_env, AppConfig, GenerationConfig, Prompts};
use crate::domain::ChatMessage;
use crate::gemini::{Gemini, TextGenerator};
use crate::history::History;
use crate::normalize::ResponseNormalizer;

/// Explicit per-session context passed to every handler.
#[derive(Debug, Default)]
pub struct Session {
    pub id: String,
    /// Written only through `set_curriculum`; read by the prompt builder.
    pub curriculum: String,
    pub messages: Vec<ChatMessage>,
    pub history: History,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn set_curriculum(&mut self, curriculum: String) {
        self.curriculum = curriculum;
    }

    /// An empty curriculum disables question submission.
    pub fn has_curriculum(&self) -> bool {
        !self.curriculum.trim().is_empty()
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    pub llm: Option<Arc<dyn TextGenerator>>,
    pub normalizer: ResponseNormalizer,
    pub prompts: Prompts,
    pub generation: GenerationConfig,
}

impl AppState {
    /// Build state from env: load TOML config, init the Gemini client if a key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();
        let timeout = Duration::from_secs(cfg.limits.request_timeout_secs);

        let llm: Option<Arc<dyn TextGenerator>> = match Gemini::from_env(timeout) {
            Some(g) => {
                info!(target: "bloom_tutor", base_url = %g.base_url, model = %g.model, ?timeout, "Gemini enabled.");
                Some(Arc::new(g) as Arc<dyn TextGenerator>)
            }
            None => {
                info!(target: "bloom_tutor", "Gemini disabled (no GEMINI_API_KEY). Classification requests will report a provider error.");
                None
            }
        };

        Self::with_parts(cfg, llm)
    }

    /// Assemble state from an already loaded config and an optional model client.
    pub fn with_parts(cfg: AppConfig, llm: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            llm,
            normalizer: ResponseNormalizer::new(cfg.limits.max_field_chars),
            prompts: cfg.prompts,
            generation: cfg.generation,
        }
    }

    /// Create a fresh, isolated session.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(Session::new(id.clone())));
        let total = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id.clone(), handle.clone());
            sessions.len()
        };
        info!(target: "session", session_id = %id, total, "Session created");
        (id, handle)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn session(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Forget a session. WebSocket sessions die with their connection; HTTP clients
    /// release theirs explicitly. Returns false if the id was unknown.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "session", session_id = %id, "Session removed");
        }
        removed
    }
}
