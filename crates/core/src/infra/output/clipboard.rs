use std::sync::Mutex;

use crate::domain::error::AppError;
use super::OutputTarget;

/// OS クリップボード出力
///
/// X11/Wayland ではハンドルを破棄すると内容が消えるため、最初の書き込みで
/// 開いたハンドルをアプリ終了まで保持する。
#[derive(Default)]
pub struct ClipboardOutput {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl ClipboardOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputTarget for ClipboardOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| AppError::internal("クリップボードのロックに失敗"))?;
        if guard.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| {
                AppError::internal(format!("Could not access the clipboard: {e}"))
            })?;
            *guard = Some(clipboard);
        }
        let Some(clipboard) = guard.as_mut() else {
            return Err(AppError::internal("Could not access the clipboard"));
        };

        if let Err(e) = clipboard.set_text(text) {
            // 次回は開き直す
            *guard = None;
            return Err(AppError::internal(format!("Could not copy to the clipboard: {e}")));
        }
        log::info!("クリップボードに出力: {} 文字", text.chars().count());
        Ok(())
    }

    fn name(&self) -> &str {
        "clipboard"
    }
}
