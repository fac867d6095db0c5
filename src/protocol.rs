//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{BloomLevel, ChatMessage, QuestionRecord};
use crate::history::{HistoryStats, RelevanceFilter};
use crate::logic::ClassifyError;
use crate::normalize::Presentation;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SetCurriculum {
        curriculum: String,
    },
    Classify {
        question: String,
    },
    LearningPath {
        question: String,
    },
    History {
        #[serde(default)]
        relevance: RelevanceFilter,
        #[serde(default)]
        level: Option<BloomLevel>,
    },
    Stats,
    ResetHistory,
    Messages,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Curriculum {
        curriculum: String,
    },
    Classification {
        outcome: ClassifyOut,
    },
    LearningPath {
        question: String,
        text: String,
    },
    History {
        records: Vec<QuestionRecord>,
    },
    Stats {
        stats: HistoryStats,
    },
    HistoryReset,
    Messages {
        messages: Vec<ChatMessage>,
    },
    Error {
        message: String,
    },
}

/// Result of one classification request, as the UI renders it.
/// `parse_failure` ships the raw model text so it can be shown for diagnosis.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifyOut {
    Ok {
        record: QuestionRecord,
        presentation: Presentation,
    },
    ParseFailure {
        message: String,
        raw: String,
    },
    Error {
        message: String,
    },
}

impl From<Result<QuestionRecord, ClassifyError>> for ClassifyOut {
    fn from(res: Result<QuestionRecord, ClassifyError>) -> Self {
        match res {
            Ok(record) => {
                let presentation = Presentation::for_result(&record.result);
                ClassifyOut::Ok { record, presentation }
            }
            Err(e) => {
                let message = e.to_string();
                match e {
                    ClassifyError::Parse { raw } => ClassifyOut::ParseFailure { message, raw },
                    _ => ClassifyOut::Error { message },
                }
            }
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Deserialize, Serialize)]
pub struct CurriculumBody {
    pub curriculum: String,
}

#[derive(Deserialize)]
pub struct QuestionIn {
    pub question: String,
}

#[derive(Serialize)]
pub struct LearningPathOut {
    pub text: String,
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub records: Vec<QuestionRecord>,
}

#[derive(Serialize)]
pub struct MessagesOut {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub model_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::ProviderError;
    use crate::normalize::parse_classification;
    use crate::prompt::CLASSIFICATION_SCHEMA_EXAMPLE;

    #[test]
    fn ok_outcome_carries_presentation() {
        let result = parse_classification(CLASSIFICATION_SCHEMA_EXAMPLE).unwrap();
        let record = QuestionRecord { position: 0, question: "q".into(), result };
        let v = serde_json::to_value(ClassifyOut::from(Ok(record))).unwrap();
        assert_eq!(v["status"], "ok");
        assert_eq!(v["record"]["result"]["bloom_level"], "이해");
        assert_eq!(v["presentation"]["bloom_class"], "bloom-understand");
    }

    #[test]
    fn parse_failure_keeps_raw_text() {
        let out = ClassifyOut::from(Err(ClassifyError::Parse { raw: "no json here".into() }));
        let v = serde_json::to_value(out).unwrap();
        assert_eq!(v["status"], "parse_failure");
        assert_eq!(v["raw"], "no json here");
        assert!(v["message"].as_str().unwrap().contains("JSON"));
    }

    #[test]
    fn provider_error_is_plain_error() {
        let out = ClassifyOut::from(Err(ClassifyError::Provider(ProviderError::NotConfigured)));
        let v = serde_json::to_value(out).unwrap();
        assert_eq!(v["status"], "error");
        assert!(v.get("raw").is_none());
    }

    #[test]
    fn client_messages_parse() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"history","relevance":"relevant","level":"적용"}"#).unwrap();
        assert!(matches!(
            m,
            ClientWsMessage::History { relevance: RelevanceFilter::Relevant, level: Some(BloomLevel::Apply) }
        ));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"history"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::History { relevance: RelevanceFilter::All, level: None }));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"reset_history"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::ResetHistory));
    }

    #[test]
    fn server_messages_are_tagged() {
        let v = serde_json::to_value(ServerWsMessage::Session { session_id: "abc".into() }).unwrap();
        assert_eq!(v, serde_json::json!({ "type": "session", "sessionId": "abc" }));
        let v = serde_json::to_value(ServerWsMessage::HistoryReset).unwrap();
        assert_eq!(v["type"], "history_reset");
    }
}
