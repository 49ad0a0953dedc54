use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// ルール種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    #[default]
    Extraction,
    LanguageDetect,
}

/// 解析ルール（ルールファイルの1要素）
///
/// `value` は `Extraction` なら対象フィールド名、`LanguageDetect` なら言語コード。
/// 並び順が評価順かつ優先順位になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: RuleKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub pattern: String,
}

impl Rule {
    pub fn extraction(name: &str, field: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::Extraction,
            value: field.to_string(),
            pattern: pattern.to_string(),
        }
    }

    pub fn language(name: &str, lang: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::LanguageDetect,
            value: lang.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// 抽出対象フィールド（チェック順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Machine,
    Location,
    Link,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Machine, Field::Location, Field::Link];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Machine => "machine",
            Self::Location => "location",
            Self::Link => "link",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "name" => Some(Self::Name),
            "machine" => Some(Self::Machine),
            "location" => Some(Self::Location),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// 抽出結果。全フィールドは常に存在し、未抽出は空文字。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub link: String,
}

impl ParsedFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Machine => &self.machine,
            Field::Location => &self.location,
            Field::Link => &self.link,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Machine => self.machine = value,
            Field::Location => self.location = value,
            Field::Link => self.link = value,
        }
    }

    /// 空のフィールド一覧（チェック順）
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// リードテンプレートのプレースホルダー値
    pub fn placeholders(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("client_name".to_string(), self.name.clone()),
            ("machine_name".to_string(), self.machine.clone()),
            ("location".to_string(), self.location.clone()),
            ("link".to_string(), self.link.clone()),
        ])
    }
}

/// テンプレートファイル種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Leads,
    Contacts,
    Metabase,
    QuickFollowup,
}

impl TemplateKind {
    /// この種別のテンプレートで使えるプレースホルダー
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            Self::Leads => &["client_name", "machine_name", "location", "link"],
            Self::Contacts => &["name"],
            Self::Metabase => &["name", "machine", "price", "link"],
            Self::QuickFollowup => &[],
        }
    }
}

/// 言語コード → テンプレート一覧
///
/// ファイル上は `"en": "..."` の単一文字列も受け付け、1要素リストとして読む。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub languages: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn deserialize_one_or_many<'de, D>(de: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, OneOrMany>::deserialize(de)?;
    Ok(raw
        .into_iter()
        .map(|(lang, v)| {
            let list = match v {
                OneOrMany::One(s) => vec![s],
                OneOrMany::Many(list) => list,
            };
            (lang, list)
        })
        .collect())
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_languages(codes: &[&str]) -> Self {
        Self {
            languages: codes.iter().map(|c| (c.to_string(), vec![])).collect(),
        }
    }

    pub fn templates(&self, lang: &str) -> Option<&[String]> {
        self.languages.get(lang).map(|v| v.as_slice())
    }

    pub fn has_templates(&self, lang: &str) -> bool {
        self.templates(lang).is_some_and(|t| !t.is_empty())
    }
}

/// ジャーナル（ログタブ）の1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub encrypted: bool,
    /// 暗号化時は Fernet トークン、平文時はメッセージ本体
    pub message: String,
}

/// ステータス表示レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 各タブの出力メッセージ（UI の status ラベル + 出力ログ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub source: String,
    pub text: String,
    pub level: StatusLevel,
}

impl StatusMessage {
    pub fn new(source: &str, text: impl Into<String>, level: StatusLevel) -> Self {
        Self {
            source: source.to_string(),
            text: text.into(),
            level,
        }
    }

    /// `[Leads Tab] 先頭行...` 形式の出力ログ行
    pub fn log_line(&self) -> String {
        let first = self.text.lines().next().unwrap_or_default();
        format!("[{}] {first}", self.source)
    }
}

/// クイックフォローアップのクリック数（セッション内のみ）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuickCounts {
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
}

/// クイックフォローアップのコピー結果
#[derive(Debug, Clone, Serialize)]
pub struct QuickCopy {
    pub language: String,
    pub text: String,
    pub counts: QuickCounts,
    pub status: StatusMessage,
}
