//! ルールエンジン: ルールファイルのパターンをコンパイルし、
//! フィールド抽出と言語判定を行う。
//!
//! コンパイルできないパターンは警告ログを出してスキップする。
//! 1つの壊れたルールが後続ルールの評価を止めることはない。
//!
//! パターンは `regex` クレートの構文で解釈される（先読み・後読みは非対応）。
//! 非対応構文を含むルールは `CompiledRules::issues` で確認できる。

mod extractor;
mod language;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::domain::types::{Rule, RuleKind};

/// コンパイル済みルール
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    regex: Option<Regex>,
}

/// ルールの問題点（UI でハイライトする用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleIssue {
    pub index: usize,
    pub name: String,
    pub message: String,
}

/// ルール一覧をコンパイルしたもの。順序は元の一覧と同じ。
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    rules: Vec<CompiledRule>,
    issues: Vec<RuleIssue>,
}

impl CompiledRules {
    pub fn new(rules: &[Rule]) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut issues = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            let regex = if rule.pattern.trim().is_empty() || rule.value.trim().is_empty() {
                None
            } else {
                match compile_pattern(&rule.pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("ルール '{}' のパターンが不正なためスキップ: {e}", rule.name);
                        issues.push(RuleIssue {
                            index,
                            name: rule.name.clone(),
                            message: e.to_string(),
                        });
                        None
                    }
                }
            };
            compiled.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }

        Self {
            rules: compiled,
            issues,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// パターンがコンパイルできなかったルール
    pub fn issues(&self) -> &[RuleIssue] {
        &self.issues
    }

    /// 有効な（評価対象の）ルールを種別で絞り込む
    fn active(&self, kind: RuleKind) -> impl Iterator<Item = (&Rule, &Regex)> {
        self.rules.iter().filter_map(move |c| match &c.regex {
            Some(re) if c.rule.kind == kind => Some((&c.rule, re)),
            _ => None,
        })
    }
}

/// 大文字小文字無視 + 複数行モードでコンパイル
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_reported_not_fatal() {
        let rules = vec![
            Rule::extraction("broken", "name", "Dear (["),
            Rule::extraction("ok", "name", r"Dear\s+(\w+)"),
        ];
        let compiled = CompiledRules::new(&rules);
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled.issues().len(), 1);
        assert_eq!(compiled.issues()[0].index, 0);
        assert_eq!(compiled.issues()[0].name, "broken");
        assert_eq!(compiled.active(RuleKind::Extraction).count(), 1);
    }

    #[test]
    fn test_lookahead_is_reported() {
        let rules = vec![Rule::extraction("la", "machine", r"machine:\s*(.*?)(?=\n)")];
        let compiled = CompiledRules::new(&rules);
        assert_eq!(compiled.issues().len(), 1);
    }

    #[test]
    fn test_empty_pattern_or_value_ignored_silently() {
        let rules = vec![
            Rule::extraction("no pattern", "name", ""),
            Rule::extraction("no value", "", r"(\w+)"),
        ];
        let compiled = CompiledRules::new(&rules);
        assert!(compiled.issues().is_empty());
        assert_eq!(compiled.active(RuleKind::Extraction).count(), 0);
    }
}
