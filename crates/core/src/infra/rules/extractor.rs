use once_cell::sync::Lazy;
use regex::Regex;

use super::CompiledRules;
use crate::domain::types::{Field, ParsedFields, RuleKind};
use crate::infra::text_normalizer::TextNormalizer;

/// `scheme://` に続く非空白列
static URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://\S+").expect("URL pattern is valid")
});

impl CompiledRules {
    /// ルールに従って4フィールドを抽出する
    ///
    /// フィールドごとにチェック順で、まだ空のフィールドを対象とする抽出ルールを
    /// 一覧順に試す。最初の非空キャプチャが採用される。
    /// `link` がルールで埋まらなければ本文中の最初の URL を使う。
    pub fn extract(&self, text: &str) -> ParsedFields {
        let mut fields = ParsedFields::default();

        for field in Field::ALL {
            for (rule, re) in self.active(RuleKind::Extraction) {
                if !fields.get(field).is_empty() {
                    break;
                }
                if Field::parse(&rule.value) != Some(field) {
                    continue;
                }
                if re.captures_len() < 2 {
                    log::debug!("ルール '{}' にキャプチャグループがありません", rule.name);
                    continue;
                }
                let Some(captured) = re
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| TextNormalizer::clean_capture(m.as_str()))
                else {
                    continue;
                };
                if !captured.is_empty() {
                    log::debug!("ルール '{}' が {} を抽出", rule.name, field.as_str());
                    fields.set(field, captured);
                }
            }
        }

        if fields.link.is_empty() {
            if let Some(m) = URL_SHAPE.find(text) {
                fields.link = m.as_str().to_string();
            }
        }

        fields
    }
}
