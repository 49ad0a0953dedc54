use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::domain::error::AppError;
use crate::domain::types::{Rule, TemplateKind, TemplateSet};

/// データディレクトリ配下の JSON ファイル（ルール・テンプレート）
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 相対パスはデータディレクトリ基準、絶対パスはそのまま
    pub fn resolve(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// JSON として読む。ファイルがない・構文が壊れている場合は None。
    fn read_json(&self, rel: &str) -> Result<Option<Value>, AppError> {
        let path = self.resolve(rel);
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    log::warn!("{} の解析に失敗したため既定値で初期化: {e}", path.display());
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} がないため既定値で作成", path.display());
                Ok(None)
            }
            Err(e) => Err(AppError::storage(format!(
                "{} の読み込みに失敗: {e}",
                path.display()
            ))),
        }
    }

    /// 整形済み UTF-8 で保存（親ディレクトリは作成する）
    pub fn save<T: Serialize>(&self, rel: &str, value: &T) -> Result<(), AppError> {
        let path = self.resolve(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::storage(format!("{} の作成に失敗: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| AppError::internal(format!("JSON serialize: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| AppError::storage(format!("{} の保存に失敗: {e}", path.display())))?;
        log::info!("{} を保存しました", path.display());
        Ok(())
    }

    /// ルールファイルを読む。形式の合わない要素は警告を出して読み飛ばす。
    ///
    /// JSON として読めたファイルは書き換えない。
    pub fn load_rules(&self, rel: &str) -> Result<Vec<Rule>, AppError> {
        let Some(value) = self.read_json(rel)? else {
            let rules = Vec::new();
            self.save_rules(rel, &rules)?;
            return Ok(rules);
        };
        let Value::Array(items) = value else {
            log::warn!("{} がルールの配列ではないため読み飛ばします", rel);
            return Ok(Vec::new());
        };

        let rules = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<Rule>(item) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::warn!("{rel} のルール #{i} を読み飛ばします: {e}");
                    None
                }
            })
            .collect();
        Ok(rules)
    }

    pub fn save_rules(&self, rel: &str, rules: &[Rule]) -> Result<(), AppError> {
        self.save(rel, &rules)
    }

    /// テンプレートファイルを読む。文字列でない項目は警告を出して読み飛ばす。
    pub fn load_templates(&self, kind: TemplateKind, rel: &str) -> Result<TemplateSet, AppError> {
        let Some(value) = self.read_json(rel)? else {
            let set = default_templates(kind);
            self.save_templates(rel, &set)?;
            return Ok(set);
        };
        let Value::Object(map) = value else {
            log::warn!("{} が言語コードのオブジェクトではないため読み飛ばします", rel);
            return Ok(TemplateSet::new());
        };

        let mut set = TemplateSet::new();
        for (lang, entry) in map {
            let list = match entry {
                Value::String(text) => vec![text],
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, item)| match item {
                        Value::String(text) => Some(text),
                        other => {
                            log::warn!("{rel} の {lang}[{i}] は文字列ではないため読み飛ばします: {other}");
                            None
                        }
                    })
                    .collect(),
                other => {
                    log::warn!("{rel} の {lang} を読み飛ばします: {other}");
                    continue;
                }
            };
            set.languages.insert(lang, list);
        }
        Ok(set)
    }

    pub fn save_templates(&self, rel: &str, set: &TemplateSet) -> Result<(), AppError> {
        self.save(rel, set)
    }
}

/// 種別ごとの初期テンプレートファイル内容
pub fn default_templates(kind: TemplateKind) -> TemplateSet {
    match kind {
        TemplateKind::Leads => TemplateSet::with_languages(&["en", "it", "fr"]),
        _ => TemplateSet::new(),
    }
}

/// クイックフォローアップのテンプレートファイルが空のときの既定文面
pub fn quick_followup_defaults() -> TemplateSet {
    let mut set = TemplateSet::new();
    for (lang, text) in [
        ("en", "Hello,\n\nDid you get my offer? Are you still interested?"),
        ("it", "Ciao,\n\nHai ricevuto la mia offerta? Sei ancora interessato?"),
        (
            "fr",
            "Bonjour,\n\nAvez-vous reçu mon offre ? Êtes-vous toujours intéressé ?",
        ),
    ] {
        set.languages.insert(lang.to_string(), vec![text.to_string()]);
    }
    set
}
