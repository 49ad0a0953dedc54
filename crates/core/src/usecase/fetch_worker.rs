use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::domain::bulk::Progress;
use crate::domain::error::AppError;
use crate::domain::fetch::{ExtractionMode, FetchEvent, FetchRequest, FetchStatus};
use crate::infra::fetcher::{extract, FetchError, PageFetcher};
use crate::infra::metrics::Metrics;

/// HTML 取得ワーカー: 同時に1件だけ実行し、結果をチャネルで返す
///
/// 実行中のリクエストは中断できない。リトライもしない。
pub struct FetchWorker {
    fetcher: Arc<dyn PageFetcher>,
    metrics: Arc<Metrics>,
    current: Arc<Mutex<Option<FetchRequest>>>,
    events: mpsc::UnboundedSender<FetchEvent>,
}

impl FetchWorker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        metrics: Arc<Metrics>,
    ) -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let worker = Self {
            fetcher,
            metrics,
            current: Arc::new(Mutex::new(None)),
            events,
        };
        (worker, rx)
    }

    pub fn status(&self) -> FetchStatus {
        if self.current.lock().unwrap().is_some() {
            FetchStatus::Running
        } else {
            FetchStatus::Idle
        }
    }

    /// 取得を開始する（Tokio ランタイム上で呼ぶこと）
    ///
    /// 実行中なら `E_INVALID_STATE`。入力不足は取得前に検証エラーにする。
    pub fn submit(&self, url: &str, mode: ExtractionMode) -> Result<FetchRequest, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::validation("Please enter at least one valid URL."));
        }
        match &mode {
            ExtractionMode::Keyword(k) if k.trim().is_empty() => {
                return Err(FetchError::EmptyInput("a keyword").into())
            }
            ExtractionMode::Tag(t) if t.trim().is_empty() => {
                return Err(FetchError::EmptyInput("an HTML tag (e.g., h3, div)").into())
            }
            _ => {}
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AppError::internal("Tokio ランタイム外から呼び出されました"))?;

        let request = {
            let mut slot = self.current.lock().unwrap();
            if let Some(running) = slot.as_ref() {
                return Err(AppError::invalid_state(format!(
                    "A request is already running for {}",
                    running.url
                )));
            }
            let request = FetchRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                url: url.to_string(),
                mode,
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            *slot = Some(request.clone());
            request
        };

        let fetcher = self.fetcher.clone();
        let metrics = self.metrics.clone();
        let current = self.current.clone();
        let events = self.events.clone();
        let job = request.clone();

        runtime.spawn(async move {
            let start = Instant::now();
            let result = match fetcher.fetch(&job.url).await {
                Ok(page) => extract(&page.body, &page.final_url, &job.mode),
                Err(e) => Err(e),
            };
            metrics.record_latency("fetch", start.elapsed().as_millis() as u64);

            let event = match result {
                Ok(output) => FetchEvent::Finished {
                    request_id: job.request_id,
                    url: job.url,
                    output,
                },
                Err(e) => {
                    let err: AppError = e.into();
                    log::warn!("取得失敗 ({}): {}", job.url, err.message);
                    metrics.inc_error(err.code);
                    FetchEvent::Failed {
                        request_id: job.request_id,
                        url: job.url,
                        message: err.message,
                    }
                }
            };

            // 次のリクエストを受け付けられるよう先にスロットを空ける
            *current.lock().unwrap() = None;
            if events.send(event).is_err() {
                log::error!("取得結果の受信側が閉じています");
            }
        });

        log::info!(
            "取得リクエスト登録 [{}]: {} ({})",
            self.fetcher.name(),
            request.url,
            request.request_id
        );
        Ok(request)
    }
}

/// 貼り付けられた URL 一覧（1行1件）。利用者の操作で1件ずつ進める。
#[derive(Debug, Clone)]
pub struct FetchBatch {
    urls: Vec<String>,
    mode: ExtractionMode,
    index: usize,
}

impl FetchBatch {
    /// 空行を除いた URL 一覧。1件もなければ検証エラー。
    pub fn parse(text: &str, mode: ExtractionMode) -> Result<Self, AppError> {
        let urls: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if urls.is_empty() {
            return Err(AppError::validation("Please enter at least one valid URL."));
        }
        let mode = match mode {
            ExtractionMode::Keyword(k) => ExtractionMode::Keyword(k.trim().to_string()),
            ExtractionMode::Tag(t) => ExtractionMode::Tag(t.trim().to_lowercase()),
            ExtractionMode::BodyText => ExtractionMode::BodyText,
        };
        Ok(Self {
            urls,
            mode,
            index: 0,
        })
    }

    pub fn current_url(&self) -> &str {
        &self.urls[self.index]
    }

    pub fn mode(&self) -> &ExtractionMode {
        &self.mode
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.index + 1,
            total: self.urls.len(),
        }
    }

    /// 次の URL へ進む。残りがなければ `false`。
    pub fn advance(&mut self) -> bool {
        if self.index + 1 >= self.urls.len() {
            return false;
        }
        self.index += 1;
        true
    }
}
