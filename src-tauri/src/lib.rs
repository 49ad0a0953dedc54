mod commands;
mod events;

use std::path::PathBuf;
use std::sync::Arc;

use tauri::AppHandle;
use tokio::sync::mpsc::UnboundedReceiver;

use fu_core::domain::fetch::FetchEvent;
use fu_core::infra::fetcher::{HttpFetcher, PageFetcher};
use fu_core::infra::storage::Storage;
use fu_core::usecase::app_service::AppService;

use crate::events::{FetchFailedPayload, FetchFinishedPayload, FETCH_FAILED, FETCH_FINISHED};

/// データディレクトリ（ルール・テンプレート・統計 DB の置き場所）
///
/// 開発時は `FU_DATA_DIR` で差し替えられる。
fn data_dir() -> PathBuf {
    std::env::var("FU_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("followupSuite")
        })
}

/// 取得ワーカーの結果をフロントエンドへ転送する
fn forward_fetch_events(app: AppHandle, mut rx: UnboundedReceiver<FetchEvent>) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = rx.recv().await {
            log::debug!("取得結果を転送: {}", event.request_id());
            match event {
                FetchEvent::Finished {
                    request_id,
                    url,
                    output,
                } => events::emit_event(
                    &app,
                    FETCH_FINISHED,
                    FetchFinishedPayload {
                        request_id,
                        url,
                        output,
                    },
                ),
                FetchEvent::Failed {
                    request_id,
                    url,
                    message,
                } => events::emit_event(
                    &app,
                    FETCH_FAILED,
                    FetchFailedPayload {
                        request_id,
                        url,
                        message,
                    },
                ),
            }
        }
        log::debug!("取得イベントの転送を終了");
    });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let dir = data_dir();
    std::fs::create_dir_all(&dir).ok();
    let db_path = dir.join("followup.db").to_string_lossy().to_string();

    let storage = Storage::open(&db_path).expect("SQLite の初期化に失敗しました");
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new().expect("HTTP クライアントの初期化に失敗しました"));
    let app_service = AppService::new(storage, dir, fetcher);
    let fetch_events = app_service.take_fetch_events();

    tauri::Builder::default()
        .plugin(tauri_plugin_log::Builder::default().build())
        .manage(app_service)
        .setup(move |app| {
            if let Some(rx) = fetch_events {
                forward_fetch_events(app.handle().clone(), rx);
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::generate_template,
            commands::confirm_correction,
            commands::cancel_correction,
            commands::list_rules,
            commands::save_rules,
            commands::validate_rules,
            commands::get_templates,
            commands::edit_templates,
            commands::save_templates,
            commands::bulk_initialize,
            commands::bulk_copy_next,
            commands::bulk_reset,
            commands::bulk_state,
            commands::quick_languages,
            commands::copy_quick_followup,
            commands::quick_counts,
            commands::append_urls,
            commands::read_url_list,
            commands::journal_append,
            commands::journal_entries,
            commands::journal_decrypt,
            commands::journal_delete,
            commands::get_daily_stats,
            commands::list_daily_stats,
            commands::save_daily_stats,
            commands::delete_all_stats,
            commands::start_fetch_batch,
            commands::fetch_next_url,
            commands::reset_fetch_batch,
            commands::fetch_status,
            commands::get_settings,
            commands::update_settings,
            commands::get_metrics,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
