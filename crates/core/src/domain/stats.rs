use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 日次統計のキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    /// Leads タブで描画したテンプレート
    TemplateLeads,
    /// I-sent（クイックフォローアップ）のコピー
    EmailSent,
    /// Contacts タブでコピーした行
    Contacts,
    /// Metabase タブでコピーした行
    Metabase,
}

impl StatKey {
    pub const ALL: [StatKey; 4] = [
        StatKey::TemplateLeads,
        StatKey::EmailSent,
        StatKey::Contacts,
        StatKey::Metabase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemplateLeads => "template_leads",
            Self::EmailSent => "email_sent",
            Self::Contacts => "contacts",
            Self::Metabase => "metabase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// 1日分の統計。全キーが常に存在する（未記録は 0）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// `YYYY-MM-DD`
    pub date: String,
    pub counts: BTreeMap<String, u64>,
}

impl DailyStats {
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            counts: StatKey::ALL
                .into_iter()
                .map(|k| (k.as_str().to_string(), 0))
                .collect(),
        }
    }

    pub fn get(&self, key: StatKey) -> u64 {
        self.counts.get(key.as_str()).copied().unwrap_or(0)
    }
}
