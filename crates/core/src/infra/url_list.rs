use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::domain::error::AppError;

/// 保存済み URL 一覧ファイル（追記のみ）
///
/// セッション最初の追記の前に区切りヘッダーを書く。
pub struct UrlList {
    path: PathBuf,
    header_written: bool,
}

impl UrlList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header_written: false,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// 貼り付けられた URL テキストを追記する。空なら何もしない。
    pub fn append(&mut self, content: &str, timestamp: &str) -> Result<bool, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::storage(format!("Failed to save URLs: {e}")))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::storage(format!("Failed to save URLs: {e}")))?;

        let mut chunk = String::new();
        if !self.header_written {
            chunk.push_str(&format!("\n\n--- Session started at {timestamp} ---\n"));
        }
        chunk.push_str(content);
        chunk.push('\n');
        file.write_all(chunk.as_bytes())
            .map_err(|e| AppError::storage(format!("Failed to save URLs: {e}")))?;
        self.header_written = true;
        log::info!("URL を {} に保存", self.path.display());
        Ok(true)
    }

    /// ファイル内容（前後トリム）。ファイルがなければ空文字。
    pub fn read(&self) -> Result<String, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(c) => Ok(c.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(AppError::storage(format!("Error reading URL file: {e}"))),
        }
    }
}
