//! 暗号化ジャーナル（ログタブ）
//!
//! 1行1エントリ: `timestamp|||ENC|||token` または `timestamp|||PLAIN|||message`。
//! 暗号化は Fernet、鍵はパスワードから PBKDF2-HMAC-SHA256 で導出する。
//! 既存ファイルとの互換のため塩は固定値。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use fernet::Fernet;
use sha2::Sha256;

use crate::domain::error::AppError;
use crate::domain::types::JournalEntry;

const SEPARATOR: &str = "|||";
const KEY_SALT: &[u8] = b"gindumac_static_salt_";
const KEY_ITERATIONS: u32 = 100_000;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("A password is required for encryption.")]
    PasswordRequired,
    #[error("Invalid password or corrupted data.")]
    Decrypt,
    #[error("Entry is not encrypted.")]
    NotEncrypted,
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JournalError> for AppError {
    fn from(e: JournalError) -> Self {
        match e {
            JournalError::PasswordRequired | JournalError::NotEncrypted => {
                AppError::validation(e.to_string())
            }
            JournalError::Decrypt => AppError::crypto(e.to_string()),
            JournalError::Io(_) => AppError::storage(e.to_string()),
        }
    }
}

/// パスワードから Fernet 鍵を導出する
fn derive_key(password: &str) -> Result<Fernet, JournalError> {
    if password.is_empty() {
        return Err(JournalError::PasswordRequired);
    }
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), KEY_SALT, KEY_ITERATIONS, &mut key);
    // 32バイト鍵の URL-safe base64 は常に有効な Fernet 鍵
    Fernet::new(&URL_SAFE.encode(key)).ok_or(JournalError::Decrypt)
}

/// 平文の改行を1行に収める
fn escape_plain(message: &str) -> String {
    message.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape_plain(stored: &str) -> String {
    let mut out = String::with_capacity(stored.len());
    let mut chars = stored.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 現在時刻でエントリを追加する
    pub fn append(
        &self,
        message: &str,
        password: Option<&str>,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.append_at(&timestamp, message, password)
    }

    /// エントリを追加する。空メッセージは無視して `None`。
    ///
    /// `password` が `Some` なら暗号化（空パスワードはエラー）。
    pub fn append_at(
        &self,
        timestamp: &str,
        message: &str,
        password: Option<&str>,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let entry = match password {
            Some(password) => {
                let fernet = derive_key(password)?;
                JournalEntry {
                    timestamp: timestamp.to_string(),
                    encrypted: true,
                    message: fernet.encrypt(message.as_bytes()),
                }
            }
            None => JournalEntry {
                timestamp: timestamp.to_string(),
                encrypted: false,
                message: message.to_string(),
            },
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let (flag, payload) = if entry.encrypted {
            ("ENC", entry.message.clone())
        } else {
            ("PLAIN", escape_plain(&entry.message))
        };
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}{SEPARATOR}{flag}{SEPARATOR}{payload}", entry.timestamp)?;
        log::info!("ジャーナルに追記 (encrypted={})", entry.encrypted);

        Ok(Some(entry))
    }

    /// 全エントリを読み込む（空行・不正行はスキップ）
    pub fn load(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let mut parts = line.splitn(3, SEPARATOR);
                let (timestamp, flag, message) = (parts.next()?, parts.next()?, parts.next()?);
                let encrypted = match flag {
                    "ENC" => true,
                    "PLAIN" => false,
                    _ => return None,
                };
                Some(JournalEntry {
                    timestamp: timestamp.to_string(),
                    encrypted,
                    message: if encrypted {
                        message.to_string()
                    } else {
                        unescape_plain(message)
                    },
                })
            })
            .collect())
    }

    /// 暗号化エントリを復号する
    pub fn decrypt(entry: &JournalEntry, password: &str) -> Result<String, JournalError> {
        if !entry.encrypted {
            return Err(JournalError::NotEncrypted);
        }
        let fernet = derive_key(password)?;
        let plain = fernet
            .decrypt(&entry.message)
            .map_err(|_| JournalError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| JournalError::Decrypt)
    }

    /// ファイルを削除する。存在しなかった場合は `false`。
    pub fn delete(&self) -> Result<bool, JournalError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("ジャーナルファイルを削除: {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-01-15 10:30:00";

    fn journal() -> (tempfile::TempDir, Journal) {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("other/temporal_log.txt"));
        (dir, journal)
    }

    #[test]
    fn test_plain_append_and_load() {
        let (_dir, journal) = journal();
        journal.append_at(TS, "  called Marco  ", None).unwrap();
        let raw = fs::read_to_string(&journal.path).unwrap();
        assert_eq!(raw, "2025-01-15 10:30:00|||PLAIN|||called Marco\n");

        let entries = journal.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "called Marco");
        assert!(!entries[0].encrypted);
    }

    #[test]
    fn test_empty_message_ignored() {
        let (_dir, journal) = journal();
        assert!(journal.append_at(TS, "   ", Some("pw")).unwrap().is_none());
        assert!(journal.load().unwrap().is_empty());
    }

    #[test]
    fn test_encrypt_requires_password() {
        let (_dir, journal) = journal();
        let err = journal.append_at(TS, "secret", Some("")).unwrap_err();
        assert!(matches!(err, JournalError::PasswordRequired));
        let app: AppError = err.into();
        assert_eq!(app.code, crate::domain::error::ErrorCode::Validation);
    }

    #[test]
    fn test_encrypted_round_trip() {
        let (_dir, journal) = journal();
        let entry = journal.append_at(TS, "price is 12k", Some("hunter2")).unwrap().unwrap();
        assert!(entry.encrypted);
        assert_ne!(entry.message, "price is 12k");

        let loaded = journal.load().unwrap();
        assert_eq!(loaded[0], entry);
        assert_eq!(Journal::decrypt(&loaded[0], "hunter2").unwrap(), "price is 12k");
    }

    #[test]
    fn test_wrong_password_is_recoverable_crypto_error() {
        let (_dir, journal) = journal();
        let entry = journal.append_at(TS, "secret", Some("right")).unwrap().unwrap();
        let err = Journal::decrypt(&entry, "wrong").unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, crate::domain::error::ErrorCode::Crypto);
        assert!(app.recoverable);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let (_dir, journal) = journal();
        fs::create_dir_all(journal.path.parent().unwrap()).unwrap();
        fs::write(
            &journal.path,
            "garbage line\n\n2025-01-01 00:00:00|||PLAIN|||ok|||with sep\n",
        )
        .unwrap();
        let entries = journal.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "ok|||with sep");
    }

    #[test]
    fn test_unknown_flag_skipped() {
        let (_dir, journal) = journal();
        fs::create_dir_all(journal.path.parent().unwrap()).unwrap();
        fs::write(
            &journal.path,
            "2026-01-01 00:00:00|||GARBAGE|||hello\n2026-01-01 00:00:01|||PLAIN|||kept\n",
        )
        .unwrap();
        let entries = journal.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
    }

    #[test]
    fn test_multiline_plain_message_kept_on_one_line() {
        let (_dir, journal) = journal();
        journal.append_at(TS, "line one\nline \\two", None).unwrap();
        assert_eq!(fs::read_to_string(&journal.path).unwrap().lines().count(), 1);
        assert_eq!(journal.load().unwrap()[0].message, "line one\nline \\two");
    }

    #[test]
    fn test_delete() {
        let (_dir, journal) = journal();
        assert!(!journal.delete().unwrap());
        journal.append_at(TS, "x", None).unwrap();
        assert!(journal.delete().unwrap());
        assert!(journal.load().unwrap().is_empty());
    }
}
