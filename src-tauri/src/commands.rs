use std::collections::BTreeMap;

use serde::Deserialize;
use tauri::{AppHandle, State};

use fu_core::domain::bulk::{BulkKind, BulkParams, BulkStep, NextOutcome, SenderState};
use fu_core::domain::error::AppError;
use fu_core::domain::fetch::{ExtractionMode, FetchBatchStep, FetchStatus};
use fu_core::domain::generation::GenerateOutcome;
use fu_core::domain::settings::AppSettings;
use fu_core::domain::stats::DailyStats;
use fu_core::domain::types::{
    JournalEntry, ParsedFields, QuickCopy, QuickCounts, Rule, StatusLevel, StatusMessage,
    TemplateKind, TemplateSet,
};
use fu_core::infra::metrics::MetricsSummary;
use fu_core::infra::rules::RuleIssue;
use fu_core::infra::template::TemplateEdit;
use fu_core::usecase::app_service::AppService;

use crate::events::{
    self, BulkProgressPayload, ErrorPayload, GenerationStateChangedPayload, BULK_PROGRESS, ERROR,
    GENERATION_STATE_CHANGED, STATUS_MESSAGE,
};

/// コマンドエラー型（Tauri の Result で使用）
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    App(#[from] AppError),
}

impl serde::Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

type CmdResult<T> = Result<T, CommandError>;

/// エラーを記録して error イベントを送る
fn report(app: &AppHandle, service: &AppService, command: &str, e: AppError) -> CommandError {
    service.record_error(e.code);
    log::warn!("[{command}] {}: {}", e.code.as_str(), e.message);
    events::emit_event(
        app,
        ERROR,
        ErrorPayload {
            code: e.code.as_str().to_string(),
            message: e.message.clone(),
            recoverable: e.recoverable,
            command: command.to_string(),
        },
    );
    e.into()
}

fn emit_status(app: &AppHandle, status: &StatusMessage) {
    log::info!("{}", status.log_line());
    events::emit_event(app, STATUS_MESSAGE, status.clone());
}

// --- Leads ---

fn emit_generation(app: &AppHandle, outcome: &GenerateOutcome) {
    match outcome {
        GenerateOutcome::Rendered {
            transitions,
            status,
            ..
        } => {
            for t in transitions {
                events::emit_event(
                    app,
                    GENERATION_STATE_CHANGED,
                    GenerationStateChangedPayload::from(t.clone()),
                );
            }
            emit_status(app, status);
        }
        GenerateOutcome::NeedsCorrection {
            transition, status, ..
        } => {
            events::emit_event(
                app,
                GENERATION_STATE_CHANGED,
                GenerationStateChangedPayload::from(transition.clone()),
            );
            emit_status(app, status);
        }
    }
}

#[tauri::command]
pub fn generate_template(
    app: AppHandle,
    service: State<'_, AppService>,
    text: String,
) -> CmdResult<GenerateOutcome> {
    let outcome = service
        .generate_template(&text)
        .map_err(|e| report(&app, &service, "generate_template", e))?;
    emit_generation(&app, &outcome);
    Ok(outcome)
}

#[tauri::command]
pub fn confirm_correction(
    app: AppHandle,
    service: State<'_, AppService>,
    fields: ParsedFields,
) -> CmdResult<GenerateOutcome> {
    let outcome = service
        .confirm_correction(fields)
        .map_err(|e| report(&app, &service, "confirm_correction", e))?;
    emit_generation(&app, &outcome);
    Ok(outcome)
}

#[tauri::command]
pub fn cancel_correction(app: AppHandle, service: State<'_, AppService>) -> CmdResult<()> {
    let (transition, status) = service
        .cancel_correction()
        .map_err(|e| report(&app, &service, "cancel_correction", e))?;
    events::emit_event(
        &app,
        GENERATION_STATE_CHANGED,
        GenerationStateChangedPayload::from(transition),
    );
    emit_status(&app, &status);
    Ok(())
}

// --- Rules / Templates ---

#[tauri::command]
pub fn list_rules(service: State<'_, AppService>) -> CmdResult<Vec<Rule>> {
    Ok(service.list_rules()?)
}

#[tauri::command]
pub fn save_rules(
    app: AppHandle,
    service: State<'_, AppService>,
    rules: Vec<Rule>,
) -> CmdResult<Vec<RuleIssue>> {
    service
        .save_rules(rules)
        .map_err(|e| report(&app, &service, "save_rules", e))
}

#[tauri::command]
pub fn validate_rules(service: State<'_, AppService>, rules: Vec<Rule>) -> Vec<RuleIssue> {
    service.validate_rules(&rules)
}

#[tauri::command]
pub fn get_templates(service: State<'_, AppService>, kind: TemplateKind) -> CmdResult<TemplateSet> {
    Ok(service.get_templates(kind)?)
}

#[tauri::command]
pub fn edit_templates(
    service: State<'_, AppService>,
    set: TemplateSet,
    edit: TemplateEdit,
) -> CmdResult<TemplateSet> {
    Ok(service.edit_templates(set, edit)?)
}

#[tauri::command]
pub fn save_templates(
    app: AppHandle,
    service: State<'_, AppService>,
    kind: TemplateKind,
    set: TemplateSet,
) -> CmdResult<()> {
    let status = service
        .save_templates(kind, set)
        .map_err(|e| report(&app, &service, "save_templates", e))?;
    emit_status(&app, &status);
    Ok(())
}

// --- Bulk senders ---

#[tauri::command]
pub fn bulk_initialize(
    app: AppHandle,
    service: State<'_, AppService>,
    params: BulkParams,
) -> CmdResult<()> {
    let status = service
        .bulk_initialize(params)
        .map_err(|e| report(&app, &service, "bulk_initialize", e))?;
    emit_status(&app, &status);
    Ok(())
}

#[tauri::command]
pub fn bulk_copy_next(
    app: AppHandle,
    service: State<'_, AppService>,
    kind: BulkKind,
) -> CmdResult<BulkStep> {
    let step = service
        .bulk_copy_next(kind)
        .map_err(|e| report(&app, &service, "bulk_copy_next", e))?;
    if let NextOutcome::Item(item) = &step.outcome {
        events::emit_event(
            &app,
            BULK_PROGRESS,
            BulkProgressPayload {
                kind: kind.label().to_string(),
                current: item.progress.current,
                total: item.progress.total,
                label: item.progress.label(),
            },
        );
    }
    emit_status(&app, &step.status);
    Ok(step)
}

#[tauri::command]
pub fn bulk_reset(app: AppHandle, service: State<'_, AppService>, kind: BulkKind) {
    let status = service.bulk_reset(kind);
    emit_status(&app, &status);
}

#[tauri::command]
pub fn bulk_state(service: State<'_, AppService>, kind: BulkKind) -> SenderState {
    service.bulk_state(kind)
}

// --- Quick follow-up ---

#[tauri::command]
pub fn quick_languages(service: State<'_, AppService>) -> CmdResult<Vec<String>> {
    Ok(service.quick_languages()?)
}

#[tauri::command]
pub fn copy_quick_followup(
    app: AppHandle,
    service: State<'_, AppService>,
    language: String,
) -> CmdResult<QuickCopy> {
    let copy = service
        .copy_quick_followup(&language)
        .map_err(|e| report(&app, &service, "copy_quick_followup", e))?;
    emit_status(&app, &copy.status);
    Ok(copy)
}

#[tauri::command]
pub fn quick_counts(service: State<'_, AppService>) -> QuickCounts {
    service.quick_counts()
}

#[tauri::command]
pub fn append_urls(
    app: AppHandle,
    service: State<'_, AppService>,
    text: String,
) -> CmdResult<bool> {
    let status = service
        .append_urls(&text)
        .map_err(|e| report(&app, &service, "append_urls", e))?;
    if let Some(status) = &status {
        emit_status(&app, status);
    }
    Ok(status.is_some())
}

#[tauri::command]
pub fn read_url_list(service: State<'_, AppService>) -> CmdResult<String> {
    Ok(service.read_url_list()?)
}

// --- Journal ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalAppendArgs {
    message: String,
    #[serde(default)]
    password: Option<String>,
}

#[tauri::command]
pub fn journal_append(
    app: AppHandle,
    service: State<'_, AppService>,
    args: JournalAppendArgs,
) -> CmdResult<Option<JournalEntry>> {
    service
        .journal_append(&args.message, args.password.as_deref())
        .map_err(|e| report(&app, &service, "journal_append", e))
}

#[tauri::command]
pub fn journal_entries(service: State<'_, AppService>) -> CmdResult<Vec<JournalEntry>> {
    Ok(service.journal_entries()?)
}

#[tauri::command]
pub fn journal_decrypt(
    app: AppHandle,
    service: State<'_, AppService>,
    entry: JournalEntry,
    password: String,
) -> CmdResult<String> {
    service
        .journal_decrypt(&entry, &password)
        .map_err(|e| report(&app, &service, "journal_decrypt", e))
}

#[tauri::command]
pub fn journal_delete(app: AppHandle, service: State<'_, AppService>) -> CmdResult<()> {
    let status = service
        .journal_delete()
        .map_err(|e| report(&app, &service, "journal_delete", e))?;
    emit_status(&app, &status);
    Ok(())
}

// --- Statistics ---

#[tauri::command]
pub fn get_daily_stats(service: State<'_, AppService>, date: String) -> CmdResult<DailyStats> {
    Ok(service.get_daily_stats(&date)?)
}

#[tauri::command]
pub fn list_daily_stats(service: State<'_, AppService>) -> CmdResult<Vec<DailyStats>> {
    Ok(service.list_daily_stats()?)
}

#[tauri::command]
pub fn save_daily_stats(
    app: AppHandle,
    service: State<'_, AppService>,
    date: String,
    values: BTreeMap<String, String>,
) -> CmdResult<DailyStats> {
    service
        .save_daily_stats(&date, values)
        .map_err(|e| report(&app, &service, "save_daily_stats", e))
}

#[tauri::command]
pub fn delete_all_stats(app: AppHandle, service: State<'_, AppService>) -> CmdResult<u32> {
    service
        .delete_all_stats()
        .map_err(|e| report(&app, &service, "delete_all_stats", e))
}

// --- HTML fetch ---

/// URL 一覧の処理を開始する（ワーカーが tokio タスクを spawn するため async）
#[tauri::command]
pub async fn start_fetch_batch(
    app: AppHandle,
    service: State<'_, AppService>,
    urls: String,
    mode: ExtractionMode,
) -> CmdResult<FetchBatchStep> {
    service
        .start_fetch_batch(&urls, mode)
        .map_err(|e| report(&app, &service, "start_fetch_batch", e))
}

#[tauri::command]
pub async fn fetch_next_url(
    app: AppHandle,
    service: State<'_, AppService>,
) -> CmdResult<Option<FetchBatchStep>> {
    let step = service
        .fetch_next_url()
        .map_err(|e| report(&app, &service, "fetch_next_url", e))?;
    if step.is_none() {
        emit_status(
            &app,
            &StatusMessage::new("HTML Parser", "--- All URLs processed. ---", StatusLevel::Success),
        );
    }
    Ok(step)
}

#[tauri::command]
pub fn reset_fetch_batch(service: State<'_, AppService>) {
    service.reset_fetch_batch();
}

#[tauri::command]
pub fn fetch_status(service: State<'_, AppService>) -> FetchStatus {
    service.fetch_status()
}

// --- Settings / Metrics ---

#[tauri::command]
pub fn get_settings(service: State<'_, AppService>) -> CmdResult<AppSettings> {
    Ok(service.get_settings()?)
}

#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    service: State<'_, AppService>,
    settings: AppSettings,
) -> CmdResult<()> {
    service
        .update_settings(settings)
        .map_err(|e| report(&app, &service, "update_settings", e))
}

#[tauri::command]
pub fn get_metrics(service: State<'_, AppService>) -> MetricsSummary {
    service.get_metrics()
}
