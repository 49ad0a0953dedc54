use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::types::TemplateKind;

/// アプリケーション設定
///
/// パスはデータディレクトリからの相対パス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 解析ルールファイル
    pub rules_file: String,
    /// リード用テンプレート
    pub leads_templates_file: String,
    /// Contacts（セラーフォローアップ）用テンプレート
    pub contacts_templates_file: String,
    /// Metabase（リードメール）用テンプレート
    pub metabase_templates_file: String,
    /// I-sent（クイックフォローアップ）用テンプレート
    pub quick_templates_file: String,
    /// ジャーナルファイル
    pub journal_file: String,
    /// 保存済み URL 一覧
    pub url_list_file: String,
    /// フォールバック言語
    pub fallback_language: String,
    /// Contacts で除外する国（小文字）
    pub excluded_countries: BTreeSet<String>,
    /// セラー国名（タイトルケース） → 言語
    pub seller_country_languages: BTreeMap<String, String>,
    /// リード国名（完全一致） → 言語
    pub lead_country_languages: BTreeMap<String, String>,
}

impl AppSettings {
    pub fn templates_file(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::Leads => &self.leads_templates_file,
            TemplateKind::Contacts => &self.contacts_templates_file,
            TemplateKind::Metabase => &self.metabase_templates_file,
            TemplateKind::QuickFollowup => &self.quick_templates_file,
        }
    }
}

fn default_country_languages() -> BTreeMap<String, String> {
    [
        ("Italy", "it"),
        ("France", "fr"),
        ("Belgium", "fr"),
        ("Switzerland", "fr"),
        ("Canada", "fr"),
        ("USA", "en"),
        ("United States", "en"),
        ("UK", "en"),
        ("Germany", "en"),
        ("Spain", "en"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            rules_file: "regex/parsing_rules.json".to_string(),
            leads_templates_file: "templates/leads_templates.json".to_string(),
            contacts_templates_file: "templates/contacts_templates.json".to_string(),
            metabase_templates_file: "templates/metabase_templates.json".to_string(),
            quick_templates_file: "templates/isent_templates.json".to_string(),
            journal_file: "other/temporal_log.txt".to_string(),
            url_list_file: "other/urls.txt".to_string(),
            fallback_language: "en".to_string(),
            excluded_countries: [
                "australia",
                "belarus",
                "brazil",
                "egypt",
                "germany",
                "india",
                "indonesia",
                "israel",
                "jordan",
                "korea republic of",
                "kuwait",
                "mexico",
                "moroco",
                "pakistan",
                "turkey",
                "ukraine",
                "united arab emirates",
                "united states",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            seller_country_languages: default_country_languages(),
            lead_country_languages: default_country_languages(),
        }
    }
}
