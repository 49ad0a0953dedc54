use serde::Serialize;
use tauri::{AppHandle, Emitter};

use fu_core::domain::generation::StateTransition;

/// イベント名定数
pub const STATUS_MESSAGE: &str = "status_message";
pub const GENERATION_STATE_CHANGED: &str = "generation_state_changed";
pub const BULK_PROGRESS: &str = "bulk_progress";
pub const FETCH_FINISHED: &str = "fetch_finished";
pub const FETCH_FAILED: &str = "fetch_failed";
pub const ERROR: &str = "error";

/// 統一イベント送信関数
pub fn emit_event<S: Serialize + Clone>(
    app: &AppHandle,
    event_name: &str,
    payload: S,
) {
    if let Err(e) = app.emit(event_name, payload) {
        log::error!("イベント送信失敗 [{event_name}]: {e}");
    }
}

/// generation_state_changed ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct GenerationStateChangedPayload {
    pub generation_id: String,
    pub prev_state: String,
    pub new_state: String,
    pub timestamp: String,
}

impl From<StateTransition> for GenerationStateChangedPayload {
    fn from(t: StateTransition) -> Self {
        Self {
            generation_id: t.generation_id,
            prev_state: t.prev_state,
            new_state: t.new_state.as_str().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// error ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
    pub command: String,
}

/// bulk_progress ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct BulkProgressPayload {
    pub kind: String,
    pub current: usize,
    pub total: usize,
    pub label: String,
}

/// fetch_finished ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct FetchFinishedPayload {
    pub request_id: String,
    pub url: String,
    pub output: String,
}

/// fetch_failed ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailedPayload {
    pub request_id: String,
    pub url: String,
    pub message: String,
}
