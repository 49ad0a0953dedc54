use serde::{Deserialize, Serialize};

use super::types::StatusMessage;

/// 一括送信の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkKind {
    /// Contacts タブ: セラーフォローアップ
    SellerFollowup,
    /// Metabase タブ: リードメール
    LeadEmail,
}

impl BulkKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SellerFollowup => "Contacts",
            Self::LeadEmail => "Metabase",
        }
    }
}

/// 初期化パラメータ
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkParams {
    SellerFollowup {
        csv_path: String,
        #[serde(default)]
        start_email: Option<String>,
    },
    LeadEmail {
        csv_path: String,
        price: String,
        link: String,
        machine: String,
    },
}

impl BulkParams {
    pub fn kind(&self) -> BulkKind {
        match self {
            Self::SellerFollowup { .. } => BulkKind::SellerFollowup,
            Self::LeadEmail { .. } => BulkKind::LeadEmail,
        }
    }

    pub fn csv_path(&self) -> &str {
        match self {
            Self::SellerFollowup { csv_path, .. } | Self::LeadEmail { csv_path, .. } => csv_path,
        }
    }
}

/// 1行分の生成結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItem {
    /// CSV 上の行番号（ヘッダー行 = 1）
    pub row_index: usize,
    pub email: String,
    pub country: String,
    pub language: String,
    pub message: String,
    pub progress: Progress,
}

/// 進捗（current は全行に対する1始まりの位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (self.current * 100 / self.total) as u32
        }
    }

    /// `Progress: 3/10 (30%)`
    pub fn label(&self) -> String {
        format!("Progress: {}/{} ({}%)", self.current, self.total, self.percent())
    }
}

/// copy_next の結果。枯渇はエラーではなく完了として区別する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NextOutcome {
    Item(BulkItem),
    Completed,
}

/// copy_next の結果とタブ出力
#[derive(Debug, Clone, Serialize)]
pub struct BulkStep {
    pub outcome: NextOutcome,
    pub status: StatusMessage,
}

/// 送信セッション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderState {
    Idle,
    Ready,
}
