use serde::Serialize;

use super::error::AppError;
use super::types::{Field, ParsedFields, StatusMessage};

/// テンプレート生成の状態
///
/// `Rendered` と `Cancelled` は終端状態。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerateState {
    /// 全フィールド抽出済み（そのまま描画可能）
    Parsed,
    /// 1つ以上のフィールドが空（修正フォーム表示中）
    Incomplete { missing: Vec<Field> },
    Rendered,
    Cancelled,
}

impl GenerateState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Parsed => "parsed",
            Self::Incomplete { .. } => "incomplete",
            Self::Rendered => "rendered",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_fields(fields: &ParsedFields) -> Self {
        let missing = fields.missing();
        if missing.is_empty() {
            Self::Parsed
        } else {
            Self::Incomplete { missing }
        }
    }
}

/// 1回の "Generate Template" 操作
#[derive(Debug, Clone)]
pub struct Generation {
    pub generation_id: String,
    pub language: String,
    pub fields: ParsedFields,
    pub state: GenerateState,
    pub created_at: String,
    pub updated_at: String,
}

/// 生成マネージャー（修正待ちは常に高々1件）
pub struct GenerationManager {
    active: Option<Generation>,
}

impl GenerationManager {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn active(&self) -> Option<&Generation> {
        self.active.as_ref()
    }

    /// 抽出結果から生成を開始（修正待ちがあれば破棄して置き換える）
    pub fn begin(
        &mut self,
        generation_id: String,
        language: String,
        fields: ParsedFields,
        now: String,
    ) -> StateTransition {
        let state = GenerateState::from_fields(&fields);
        let generation = Generation {
            generation_id: generation_id.clone(),
            language,
            fields,
            state: state.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.active = Some(generation);
        StateTransition {
            generation_id,
            prev_state: "none".to_string(),
            new_state: state,
        }
    }

    /// 修正フォームの確定: Incomplete→Parsed
    ///
    /// 空フィールドが残っていれば検証エラーを返し、Incomplete のまま留まる。
    pub fn confirm_correction(
        &mut self,
        fields: ParsedFields,
        now: String,
    ) -> Result<StateTransition, AppError> {
        let generation = self
            .active
            .as_mut()
            .ok_or_else(|| AppError::invalid_state("修正待ちのテンプレート生成がありません"))?;

        let prev = generation.state.as_str().to_string();

        match &generation.state {
            GenerateState::Incomplete { .. } => {
                let missing = fields.missing();
                if !missing.is_empty() {
                    let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
                    return Err(AppError::validation(format!(
                        "Please fill in all fields: {}",
                        names.join(", ")
                    )));
                }
                generation.fields = trimmed(fields);
                generation.state = GenerateState::Parsed;
                generation.updated_at = now;
                Ok(StateTransition {
                    generation_id: generation.generation_id.clone(),
                    prev_state: prev,
                    new_state: generation.state.clone(),
                })
            }
            other => Err(AppError::invalid_state(format!(
                "confirm_correction は {} 状態では実行できません",
                other.as_str()
            ))),
        }
    }

    /// 修正フォームのキャンセル: Incomplete→Cancelled（副作用なし）
    pub fn cancel(&mut self, now: String) -> Result<StateTransition, AppError> {
        let generation = self
            .active
            .as_mut()
            .ok_or_else(|| AppError::invalid_state("修正待ちのテンプレート生成がありません"))?;

        let prev = generation.state.as_str().to_string();

        match &generation.state {
            GenerateState::Incomplete { .. } => {
                generation.state = GenerateState::Cancelled;
                generation.updated_at = now;
                let transition = StateTransition {
                    generation_id: generation.generation_id.clone(),
                    prev_state: prev,
                    new_state: GenerateState::Cancelled,
                };
                self.active = None;
                Ok(transition)
            }
            other => Err(AppError::invalid_state(format!(
                "cancel は {} 状態では実行できません",
                other.as_str()
            ))),
        }
    }

    /// 描画完了: Parsed→Rendered。終端なので生成を取り出す。
    pub fn mark_rendered(&mut self, now: String) -> Result<(StateTransition, Generation), AppError> {
        let generation = self
            .active
            .as_ref()
            .ok_or_else(|| AppError::invalid_state("描画可能なテンプレート生成がありません"))?;

        match &generation.state {
            GenerateState::Parsed => {
                let mut done = self.active.take().ok_or_else(|| {
                    AppError::internal("描画可能なテンプレート生成がありません")
                })?;
                let prev = done.state.as_str().to_string();
                done.state = GenerateState::Rendered;
                done.updated_at = now;
                Ok((
                    StateTransition {
                        generation_id: done.generation_id.clone(),
                        prev_state: prev,
                        new_state: GenerateState::Rendered,
                    },
                    done,
                ))
            }
            other => Err(AppError::invalid_state(format!(
                "mark_rendered は {} 状態では実行できません",
                other.as_str()
            ))),
        }
    }

    /// 描画失敗時などに生成を破棄する
    pub fn abandon(&mut self) -> Option<Generation> {
        self.active.take()
    }
}

impl Default for GenerationManager {
    fn default() -> Self {
        Self::new()
    }
}

fn trimmed(fields: ParsedFields) -> ParsedFields {
    ParsedFields {
        name: fields.name.trim().to_string(),
        machine: fields.machine.trim().to_string(),
        location: fields.location.trim().to_string(),
        link: fields.link.trim().to_string(),
    }
}

/// 状態遷移イベントペイロード
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub generation_id: String,
    pub prev_state: String,
    pub new_state: GenerateState,
}

/// "Generate Template" / 修正確定の結果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateOutcome {
    /// 描画してクリップボードにコピー済み
    Rendered {
        generation_id: String,
        language: String,
        fields: ParsedFields,
        text: String,
        transitions: Vec<StateTransition>,
        status: StatusMessage,
    },
    /// 修正フォームを表示する（抽出できた値で事前入力）
    NeedsCorrection {
        generation_id: String,
        language: String,
        fields: ParsedFields,
        missing: Vec<Field>,
        transition: StateTransition,
        status: StatusMessage,
    },
}
