use serde::{Deserialize, Serialize};

use super::bulk::Progress;

/// HTML 抽出モード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "input", rename_all = "snake_case")]
pub enum ExtractionMode {
    /// テキストまたは属性値にキーワードを含む要素
    Keyword(String),
    /// 指定タグ名の要素
    Tag(String),
    /// body のテキストのみ
    BodyText,
}

/// 取得ジョブ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Running,
}

/// 取得リクエスト
#[derive(Debug, Clone, Serialize)]
pub struct FetchRequest {
    pub request_id: String,
    pub url: String,
    pub mode: ExtractionMode,
    pub created_at: String,
}

/// URL 一覧を1件ずつ処理するときの1ステップ
#[derive(Debug, Clone, Serialize)]
pub struct FetchBatchStep {
    pub request: FetchRequest,
    pub progress: Progress,
}

/// ワーカーから UI スレッドへ返す結果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchEvent {
    Finished { request_id: String, url: String, output: String },
    Failed { request_id: String, url: String, message: String },
}

impl FetchEvent {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Finished { request_id, .. } | Self::Failed { request_id, .. } => request_id,
        }
    }
}
