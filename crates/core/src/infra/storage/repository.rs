use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::domain::error::AppError;
use crate::domain::settings::AppSettings;
use crate::domain::stats::{DailyStats, StatKey};

/// SQLiteストレージ（settings + daily_stats）
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// 新規接続（ファイルパス指定）
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::storage(format!("DB接続に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::storage(format!("in-memory DB作成に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// スキーママイグレーション
    fn migrate(&self) -> Result<(), AppError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_stats (
                    date  TEXT NOT NULL,
                    key   TEXT NOT NULL,
                    value INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (date, key)
                );

                CREATE INDEX IF NOT EXISTS idx_daily_stats_date
                    ON daily_stats(date DESC);
                ",
            )
            .map_err(|e| AppError::storage(format!("マイグレーション失敗: {e}")))?;
        Ok(())
    }

    // --- Daily stats ---

    /// 統計を1つ加算し、加算後の値を返す
    pub fn increment_stat(&self, date: &str, key: StatKey) -> Result<u64, AppError> {
        self.conn
            .execute(
                "INSERT INTO daily_stats (date, key, value) VALUES (?1, ?2, 1)
                 ON CONFLICT(date, key) DO UPDATE SET value = value + 1",
                params![date, key.as_str()],
            )
            .map_err(|e| AppError::storage(format!("統計更新失敗: {e}")))?;

        let value: i64 = self
            .conn
            .query_row(
                "SELECT value FROM daily_stats WHERE date = ?1 AND key = ?2",
                params![date, key.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| AppError::storage(format!("統計取得失敗: {e}")))?;
        Ok(value.max(0) as u64)
    }

    /// 手動入力された統計を保存する（指定キーのみ上書き）
    ///
    /// 日付は `YYYY-MM-DD`、値は非負整数でなければならない。
    pub fn save_daily_stats(
        &self,
        date: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<DailyStats, AppError> {
        validate_date(date)?;

        let mut parsed = Vec::with_capacity(values.len());
        for (key, raw) in values {
            let stat = StatKey::parse(key)
                .ok_or_else(|| AppError::validation(format!("Unknown statistic '{key}'")))?;
            let value: i64 = raw.trim().parse().map_err(|_| {
                AppError::validation(format!("Invalid value for {key}: '{raw}' is not a number"))
            })?;
            if value < 0 {
                return Err(AppError::validation(format!(
                    "Invalid value for {key}: '{raw}' must not be negative"
                )));
            }
            parsed.push((stat, value));
        }

        for (stat, value) in parsed {
            self.conn
                .execute(
                    "INSERT INTO daily_stats (date, key, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(date, key) DO UPDATE SET value = excluded.value",
                    params![date, stat.as_str(), value],
                )
                .map_err(|e| AppError::storage(format!("統計保存失敗: {e}")))?;
        }

        self.get_daily_stats(date)
    }

    /// 1日分の統計（記録がなければ全て 0）
    pub fn get_daily_stats(&self, date: &str) -> Result<DailyStats, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM daily_stats WHERE date = ?1")
            .map_err(|e| AppError::storage(format!("クエリ準備失敗: {e}")))?;

        let rows: Vec<(String, i64)> = stmt
            .query_map(params![date], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| AppError::storage(format!("クエリ実行失敗: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::storage(format!("行読み取り失敗: {e}")))?;

        let mut stats = DailyStats::empty(date);
        for (key, value) in rows {
            stats.counts.insert(key, value.max(0) as u64);
        }
        Ok(stats)
    }

    /// 記録のある全日付の統計（新しい順）
    pub fn list_daily_stats(&self) -> Result<Vec<DailyStats>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, key, value FROM daily_stats ORDER BY date DESC, key")
            .map_err(|e| AppError::storage(format!("クエリ準備失敗: {e}")))?;

        let rows: Vec<(String, String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map_err(|e| AppError::storage(format!("クエリ実行失敗: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::storage(format!("行読み取り失敗: {e}")))?;

        let mut days: Vec<DailyStats> = Vec::new();
        for (date, key, value) in rows {
            if days.last().map(|d| d.date.as_str()) != Some(date.as_str()) {
                days.push(DailyStats::empty(&date));
            }
            if let Some(day) = days.last_mut() {
                day.counts.insert(key, value.max(0) as u64);
            }
        }
        Ok(days)
    }

    /// 全統計を削除し、削除した行数を返す
    pub fn delete_all_stats(&self) -> Result<u32, AppError> {
        let count = self
            .conn
            .execute("DELETE FROM daily_stats", [])
            .map_err(|e| AppError::storage(format!("統計削除失敗: {e}")))?;
        Ok(count as u32)
    }

    // --- Settings ---

    pub fn get_settings(&self) -> Result<AppSettings, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings")
            .map_err(|e| AppError::storage(format!("クエリ準備失敗: {e}")))?;

        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| AppError::storage(format!("クエリ実行失敗: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::storage(format!("行読み取り失敗: {e}")))?;

        if rows.is_empty() {
            return Ok(AppSettings::default());
        }

        // key-value をJSONに組み立ててデシリアライズ
        let mut map = serde_json::Map::new();
        for (key, value) in &rows {
            if let Ok(v) = serde_json::from_str(value) {
                map.insert(key.clone(), v);
            } else {
                map.insert(key.clone(), serde_json::Value::String(value.clone()));
            }
        }

        match serde_json::from_value::<AppSettings>(serde_json::Value::Object(map)) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log::warn!("設定の読み込みに失敗したため既定値を使用: {e}");
                Ok(AppSettings::default())
            }
        }
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<(), AppError> {
        let json = serde_json::to_value(settings)
            .map_err(|e| AppError::internal(format!("settings serialize: {e}")))?;

        if let Some(obj) = json.as_object() {
            for (key, value) in obj {
                self.conn
                    .execute(
                        "INSERT INTO settings (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                        params![key, value.to_string()],
                    )
                    .map_err(|e| AppError::storage(format!("設定保存失敗: {e}")))?;
            }
        }

        Ok(())
    }
}

fn validate_date(date: &str) -> Result<(), AppError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("Invalid date '{date}': expected YYYY-MM-DD")))
}
