use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::domain::bulk::{BulkKind, BulkParams, BulkStep, NextOutcome, SenderState};
use crate::domain::error::{AppError, ErrorCode};
use crate::domain::fetch::{ExtractionMode, FetchBatchStep, FetchEvent, FetchStatus};
use crate::domain::generation::{GenerateOutcome, GenerateState, GenerationManager, StateTransition};
use crate::domain::settings::AppSettings;
use crate::domain::stats::{DailyStats, StatKey};
use crate::domain::types::{
    JournalEntry, ParsedFields, QuickCopy, QuickCounts, Rule, StatusLevel, StatusMessage,
    TemplateKind, TemplateSet,
};
use crate::infra::fetcher::PageFetcher;
use crate::infra::journal::{Journal, TIMESTAMP_FORMAT};
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::output::OutputRouter;
use crate::infra::rules::{CompiledRules, RuleIssue};
use crate::infra::storage::{quick_followup_defaults, JsonStore, Storage};
use crate::infra::template::{render, select_template, validate_set, TemplateEdit};
use crate::infra::text_normalizer::TextNormalizer;
use crate::infra::url_list::UrlList;
use crate::usecase::bulk_sender::BulkSender;
use crate::usecase::fetch_worker::{FetchBatch, FetchWorker};

const LEADS_SOURCE: &str = "Leads Tab";
const QUICK_SOURCE: &str = "Email Sent Tab";
const MANAGER_SOURCE: &str = "Manager";
const JOURNAL_SOURCE: &str = "Log Tab";

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// アプリケーションサービス（Tauri State として管理される）
pub struct AppService {
    storage: Mutex<Storage>,
    store: JsonStore,
    generation_mgr: Mutex<GenerationManager>,
    contacts: Mutex<BulkSender>,
    metabase: Mutex<BulkSender>,
    quick_counts: Mutex<QuickCounts>,
    url_list: Mutex<Option<UrlList>>,
    output_router: OutputRouter,
    metrics: Arc<Metrics>,
    fetch_worker: FetchWorker,
    fetch_events: Mutex<Option<mpsc::UnboundedReceiver<FetchEvent>>>,
    fetch_batch: Mutex<Option<FetchBatch>>,
}

impl AppService {
    pub fn new(storage: Storage, data_dir: impl Into<PathBuf>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_output(storage, data_dir, fetcher, OutputRouter::new())
    }

    /// 出力先を指定して構築する（テストでは MemoryOutput）
    pub fn with_output(
        storage: Storage,
        data_dir: impl Into<PathBuf>,
        fetcher: Arc<dyn PageFetcher>,
        output_router: OutputRouter,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let (fetch_worker, fetch_rx) = FetchWorker::new(fetcher, metrics.clone());
        Self {
            storage: Mutex::new(storage),
            store: JsonStore::new(data_dir),
            generation_mgr: Mutex::new(GenerationManager::new()),
            contacts: Mutex::new(BulkSender::new(BulkKind::SellerFollowup)),
            metabase: Mutex::new(BulkSender::new(BulkKind::LeadEmail)),
            quick_counts: Mutex::new(QuickCounts::default()),
            url_list: Mutex::new(None),
            output_router,
            metrics,
            fetch_worker,
            fetch_events: Mutex::new(Some(fetch_rx)),
            fetch_batch: Mutex::new(None),
        }
    }

    // ==================== Leads: Generate Template ====================

    /// 貼り付けテキストから言語判定・フィールド抽出を行い、
    /// 全フィールドが揃っていれば描画してクリップボードへコピーする
    pub fn generate_template(&self, text: &str) -> Result<GenerateOutcome, AppError> {
        let settings = self.get_settings()?;
        let rules = self.store.load_rules(&settings.rules_file)?;

        let start = Instant::now();
        let normalized = TextNormalizer::normalize(text);
        let compiled = CompiledRules::new(&rules);
        let language = compiled.detect_language(&normalized, &settings.fallback_language);
        let fields = compiled.extract(&normalized);
        self.metrics.record_latency("extract", elapsed_ms(start));

        let generation_id = uuid::Uuid::new_v4().to_string();
        let transition = self.generation_mgr.lock().unwrap().begin(
            generation_id.clone(),
            language.clone(),
            fields.clone(),
            now_rfc3339(),
        );

        let GenerateState::Incomplete { missing } = transition.new_state.clone() else {
            return self.render_active(vec![transition]);
        };

        self.metrics.inc_corrections_requested();
        let names = missing
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        log::info!("抽出が不完全なため修正を要求: {names}");
        Ok(GenerateOutcome::NeedsCorrection {
            generation_id,
            language,
            fields,
            missing,
            transition,
            status: StatusMessage::new(
                LEADS_SOURCE,
                format!("Please complete the missing fields: {names}"),
                StatusLevel::Warning,
            ),
        })
    }

    /// 修正フォームの確定。空フィールドが残っていれば検証エラー（修正待ちのまま）。
    pub fn confirm_correction(&self, fields: ParsedFields) -> Result<GenerateOutcome, AppError> {
        let transition = self
            .generation_mgr
            .lock()
            .unwrap()
            .confirm_correction(fields, now_rfc3339())?;
        self.render_active(vec![transition])
    }

    /// 修正フォームのキャンセル（描画もコピーもしない）
    pub fn cancel_correction(&self) -> Result<(StateTransition, StatusMessage), AppError> {
        let transition = self.generation_mgr.lock().unwrap().cancel(now_rfc3339())?;
        self.metrics.inc_corrections_cancelled();
        Ok((
            transition,
            StatusMessage::new(LEADS_SOURCE, "Template generation cancelled.", StatusLevel::Info),
        ))
    }

    pub fn pending_generation_state(&self) -> Option<String> {
        let mgr = self.generation_mgr.lock().unwrap();
        mgr.active().map(|g| g.state.as_str().to_string())
    }

    /// Parsed 状態の生成を描画する。失敗したら生成を破棄する。
    fn render_active(
        &self,
        mut transitions: Vec<StateTransition>,
    ) -> Result<GenerateOutcome, AppError> {
        let (generation_id, language, fields) = {
            let mgr = self.generation_mgr.lock().unwrap();
            let active = mgr
                .active()
                .ok_or_else(|| AppError::internal("描画可能なテンプレート生成がありません"))?;
            (
                active.generation_id.clone(),
                active.language.clone(),
                active.fields.clone(),
            )
        };

        let start = Instant::now();
        let text = match self.render_lead(&language, &fields) {
            Ok(text) => text,
            Err(e) => {
                self.generation_mgr.lock().unwrap().abandon();
                return Err(e);
            }
        };
        self.metrics.record_latency("render", elapsed_ms(start));

        let (transition, _) = self
            .generation_mgr
            .lock()
            .unwrap()
            .mark_rendered(now_rfc3339())?;
        transitions.push(transition);

        self.metrics.inc_templates_rendered();
        self.increment_stat(StatKey::TemplateLeads);

        Ok(GenerateOutcome::Rendered {
            generation_id,
            language,
            fields,
            text,
            transitions,
            status: StatusMessage::new(
                LEADS_SOURCE,
                "Template generated and copied to clipboard!",
                StatusLevel::Success,
            ),
        })
    }

    fn render_lead(&self, language: &str, fields: &ParsedFields) -> Result<String, AppError> {
        let settings = self.get_settings()?;
        let templates = self
            .store
            .load_templates(TemplateKind::Leads, &settings.leads_templates_file)?;
        let template = select_template(
            &templates,
            language,
            &settings.fallback_language,
            &mut rand::thread_rng(),
        );
        let text = render(template, &fields.placeholders())
            .map_err(|e| AppError::template(format!("Template error ({language}): {e}")))?;
        self.output_router.deliver_clipboard(&text)?;
        Ok(text)
    }

    /// 統計の自動加算（失敗しても操作自体は成功扱い）
    fn increment_stat(&self, key: StatKey) {
        let storage = self.storage.lock().unwrap();
        if let Err(e) = storage.increment_stat(&today(), key) {
            log::warn!("統計 {} の更新に失敗: {e}", key.as_str());
        }
    }

    // ==================== Rules ====================

    pub fn list_rules(&self) -> Result<Vec<Rule>, AppError> {
        let settings = self.get_settings()?;
        self.store.load_rules(&settings.rules_file)
    }

    /// ルール一覧を丸ごと置き換える。不正なパターンも保存し、問題点を返す。
    pub fn save_rules(&self, rules: Vec<Rule>) -> Result<Vec<RuleIssue>, AppError> {
        let settings = self.get_settings()?;
        self.store.save_rules(&settings.rules_file, &rules)?;
        Ok(self.validate_rules(&rules))
    }

    pub fn validate_rules(&self, rules: &[Rule]) -> Vec<RuleIssue> {
        CompiledRules::new(rules).issues().to_vec()
    }

    // ==================== Templates ====================

    pub fn get_templates(&self, kind: TemplateKind) -> Result<TemplateSet, AppError> {
        let settings = self.get_settings()?;
        self.store.load_templates(kind, settings.templates_file(kind))
    }

    /// 編集中のコピーに操作を適用して返す（保存はしない）
    pub fn edit_templates(
        &self,
        mut set: TemplateSet,
        edit: TemplateEdit,
    ) -> Result<TemplateSet, AppError> {
        set.apply(edit)?;
        Ok(set)
    }

    pub fn save_templates(
        &self,
        kind: TemplateKind,
        set: TemplateSet,
    ) -> Result<StatusMessage, AppError> {
        validate_set(kind, &set)?;
        let settings = self.get_settings()?;
        let file = settings.templates_file(kind);
        self.store.save_templates(file, &set)?;
        Ok(StatusMessage::new(
            MANAGER_SOURCE,
            format!("Successfully updated '{file}'."),
            StatusLevel::Success,
        ))
    }

    // ==================== Bulk Senders ====================

    fn sender(&self, kind: BulkKind) -> &Mutex<BulkSender> {
        match kind {
            BulkKind::SellerFollowup => &self.contacts,
            BulkKind::LeadEmail => &self.metabase,
        }
    }

    pub fn bulk_initialize(&self, params: BulkParams) -> Result<StatusMessage, AppError> {
        let kind = params.kind();
        let template_kind = match kind {
            BulkKind::SellerFollowup => TemplateKind::Contacts,
            BulkKind::LeadEmail => TemplateKind::Metabase,
        };

        let mut sender = self.sender(kind).lock().unwrap();
        sender.reset();

        let settings = self.get_settings()?;
        let templates = self
            .store
            .load_templates(template_kind, settings.templates_file(template_kind))?;
        sender.initialize(params, templates, &settings)?;

        Ok(StatusMessage::new(
            kind.label(),
            "Initialized successfully. Click 'Copy Next Email'.",
            StatusLevel::Info,
        ))
    }

    /// 次の1件をクリップボードへコピーする。完了・エラー時は Idle に戻る。
    pub fn bulk_copy_next(&self, kind: BulkKind) -> Result<BulkStep, AppError> {
        let mut sender = self.sender(kind).lock().unwrap();
        let outcome = sender.copy_next(&mut rand::thread_rng())?;

        let status = match &outcome {
            NextOutcome::Item(item) => {
                if let Err(e) = self.output_router.deliver_clipboard(&item.message) {
                    sender.reset();
                    return Err(e);
                }
                self.metrics.inc_bulk_items_copied();
                self.increment_stat(match kind {
                    BulkKind::SellerFollowup => StatKey::Contacts,
                    BulkKind::LeadEmail => StatKey::Metabase,
                });
                StatusMessage::new(
                    kind.label(),
                    format!("Copied email for {}.", item.email),
                    StatusLevel::Info,
                )
            }
            NextOutcome::Completed => {
                StatusMessage::new(kind.label(), "All emails processed.", StatusLevel::Success)
            }
        };

        Ok(BulkStep { outcome, status })
    }

    pub fn bulk_reset(&self, kind: BulkKind) -> StatusMessage {
        self.sender(kind).lock().unwrap().reset();
        StatusMessage::new(kind.label(), "Process reset.", StatusLevel::Info)
    }

    pub fn bulk_state(&self, kind: BulkKind) -> SenderState {
        self.sender(kind).lock().unwrap().state()
    }

    // ==================== Quick Follow-up ====================

    fn quick_templates(&self) -> Result<TemplateSet, AppError> {
        let set = self.get_templates(TemplateKind::QuickFollowup)?;
        if set.languages.values().all(|t| t.is_empty()) {
            Ok(quick_followup_defaults())
        } else {
            Ok(set)
        }
    }

    /// ボタンを表示する言語コード
    pub fn quick_languages(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .quick_templates()?
            .languages
            .into_iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(lang, _)| lang)
            .collect())
    }

    pub fn copy_quick_followup(&self, language: &str) -> Result<QuickCopy, AppError> {
        let set = self.quick_templates()?;
        if !set.has_templates(language) {
            return Err(AppError::validation(format!(
                "No quick follow-up template for '{language}'"
            )));
        }
        let text = select_template(&set, language, language, &mut rand::thread_rng()).to_string();
        self.output_router.deliver_clipboard(&text)?;

        let counts = {
            let mut counts = self.quick_counts.lock().unwrap();
            *counts.counts.entry(language.to_string()).or_insert(0) += 1;
            counts.total += 1;
            counts.clone()
        };
        self.metrics.inc_quick_copies();
        self.increment_stat(StatKey::EmailSent);

        Ok(QuickCopy {
            language: language.to_string(),
            text,
            counts,
            status: StatusMessage::new(
                QUICK_SOURCE,
                format!("Copied {language} template."),
                StatusLevel::Success,
            ),
        })
    }

    pub fn quick_counts(&self) -> QuickCounts {
        self.quick_counts.lock().unwrap().clone()
    }

    /// URL テキストを一覧ファイルに追記する。空なら `None`。
    pub fn append_urls(&self, text: &str) -> Result<Option<StatusMessage>, AppError> {
        let settings = self.get_settings()?;
        let path = self.store.resolve(&settings.url_list_file);

        let mut slot = self.url_list.lock().unwrap();
        if slot.as_ref().map(|l| l.path()) != Some(path.as_path()) {
            *slot = Some(UrlList::new(path));
        }
        let Some(list) = slot.as_mut() else {
            return Err(AppError::internal("URL 一覧を開けません"));
        };

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        if !list.append(text, &timestamp)? {
            return Ok(None);
        }
        Ok(Some(StatusMessage::new(
            QUICK_SOURCE,
            format!("URLs saved to {}", settings.url_list_file),
            StatusLevel::Success,
        )))
    }

    pub fn read_url_list(&self) -> Result<String, AppError> {
        let settings = self.get_settings()?;
        UrlList::new(self.store.resolve(&settings.url_list_file)).read()
    }

    // ==================== Journal ====================

    fn journal(&self) -> Result<Journal, AppError> {
        let settings = self.get_settings()?;
        Ok(Journal::new(self.store.resolve(&settings.journal_file)))
    }

    /// `password` が `Some` なら暗号化して追記する
    pub fn journal_append(
        &self,
        message: &str,
        password: Option<&str>,
    ) -> Result<Option<JournalEntry>, AppError> {
        Ok(self.journal()?.append(message, password)?)
    }

    pub fn journal_entries(&self) -> Result<Vec<JournalEntry>, AppError> {
        Ok(self.journal()?.load()?)
    }

    pub fn journal_decrypt(&self, entry: &JournalEntry, password: &str) -> Result<String, AppError> {
        Ok(Journal::decrypt(entry, password)?)
    }

    pub fn journal_delete(&self) -> Result<StatusMessage, AppError> {
        let removed = self.journal()?.delete()?;
        let text = if removed {
            "Temporary log file has been deleted."
        } else {
            "No temporary log file to delete."
        };
        Ok(StatusMessage::new(JOURNAL_SOURCE, text, StatusLevel::Info))
    }

    // ==================== Statistics ====================

    pub fn today_stats(&self) -> Result<DailyStats, AppError> {
        self.get_daily_stats(&today())
    }

    pub fn get_daily_stats(&self, date: &str) -> Result<DailyStats, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.get_daily_stats(date)
    }

    pub fn list_daily_stats(&self) -> Result<Vec<DailyStats>, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.list_daily_stats()
    }

    pub fn save_daily_stats(
        &self,
        date: &str,
        values: BTreeMap<String, String>,
    ) -> Result<DailyStats, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.save_daily_stats(date, &values)
    }

    pub fn delete_all_stats(&self) -> Result<u32, AppError> {
        let storage = self.storage.lock().unwrap();
        let deleted = storage.delete_all_stats()?;
        log::info!("統計を全削除: {deleted} 行");
        Ok(deleted)
    }

    // ==================== HTML Fetch ====================

    /// URL 一覧の処理を開始し、最初の1件を取得する
    pub fn start_fetch_batch(
        &self,
        text: &str,
        mode: ExtractionMode,
    ) -> Result<FetchBatchStep, AppError> {
        let batch = FetchBatch::parse(text, mode)?;
        let mut slot = self.fetch_batch.lock().unwrap();
        if slot.is_some() {
            return Err(AppError::invalid_state(
                "A URL list is already being processed. Reset it first.",
            ));
        }
        let request = self
            .fetch_worker
            .submit(batch.current_url(), batch.mode().clone())?;
        let step = FetchBatchStep {
            request,
            progress: batch.progress(),
        };
        *slot = Some(batch);
        Ok(step)
    }

    /// 次の URL を取得する。全件処理済みなら `None`。
    pub fn fetch_next_url(&self) -> Result<Option<FetchBatchStep>, AppError> {
        let mut slot = self.fetch_batch.lock().unwrap();
        let batch = slot
            .as_mut()
            .ok_or_else(|| AppError::invalid_state("No URL list is being processed"))?;
        if self.fetch_worker.status() == FetchStatus::Running {
            return Err(AppError::invalid_state("The current URL is still being processed"));
        }
        if !batch.advance() {
            *slot = None;
            return Ok(None);
        }
        let request = self
            .fetch_worker
            .submit(batch.current_url(), batch.mode().clone())?;
        Ok(Some(FetchBatchStep {
            request,
            progress: batch.progress(),
        }))
    }

    pub fn reset_fetch_batch(&self) {
        *self.fetch_batch.lock().unwrap() = None;
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.fetch_worker.status()
    }

    /// 取得結果の受信側（最初の1回だけ取り出せる）
    pub fn take_fetch_events(&self) -> Option<mpsc::UnboundedReceiver<FetchEvent>> {
        self.fetch_events.lock().unwrap().take()
    }

    // ==================== Settings ====================

    pub fn get_settings(&self) -> Result<AppSettings, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.get_settings()
    }

    pub fn update_settings(&self, settings: AppSettings) -> Result<(), AppError> {
        let code = settings.fallback_language.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(AppError::validation(format!(
                "Invalid fallback language '{code}'"
            )));
        }
        let files = [
            &settings.rules_file,
            &settings.leads_templates_file,
            &settings.contacts_templates_file,
            &settings.metabase_templates_file,
            &settings.quick_templates_file,
            &settings.journal_file,
            &settings.url_list_file,
        ];
        if files.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::validation("File paths must not be empty"));
        }
        let storage = self.storage.lock().unwrap();
        storage.save_settings(&settings)
    }

    // ==================== Metrics ====================

    pub fn get_metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    pub fn record_error(&self, code: ErrorCode) {
        self.metrics.inc_error(code);
    }
}
