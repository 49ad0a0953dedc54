use super::CompiledRules;
use crate::domain::types::RuleKind;

impl CompiledRules {
    /// 言語判定: 小文字化した本文に最初にマッチした `language_detect` ルールの言語
    pub fn detect_language(&self, text: &str, default_lang: &str) -> String {
        let lowered = text.to_lowercase();
        self.active(RuleKind::LanguageDetect)
            .find(|(_, re)| re.is_match(&lowered))
            .map(|(rule, _)| rule.value.trim().to_string())
            .unwrap_or_else(|| default_lang.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::types::Rule;
    use crate::infra::rules::CompiledRules;

    #[test]
    fn test_default_when_no_rule_matches() {
        let rules = CompiledRules::new(&[Rule::language("it", "it", r"\bbuongiorno\b")]);
        assert_eq!(rules.detect_language("Hello there", "en"), "en");
        assert_eq!(CompiledRules::default().detect_language("", "en"), "en");
    }

    #[test]
    fn test_first_matching_language_wins() {
        let rules = CompiledRules::new(&[
            Rule::extraction("name", "name", r"Dear\s+(\w+)"),
            Rule::language("fr", "fr", r"bonjour|prix"),
            Rule::language("it", "it", r"gentile|prezzo"),
        ]);
        assert_eq!(rules.detect_language("Gentile cliente, prix?", "en"), "fr");
        assert_eq!(rules.detect_language("GENTILE cliente", "en"), "it");
    }

    #[test]
    fn test_uppercase_pattern_still_matches() {
        let rules = CompiledRules::new(&[Rule::language("fr", "fr", "BONJOUR")]);
        assert_eq!(rules.detect_language("Bonjour Marie", "en"), "fr");
    }

    #[test]
    fn test_broken_language_rule_skipped() {
        let rules = CompiledRules::new(&[
            Rule::language("bad", "de", "(["),
            Rule::language("it", "it", "località"),
        ]);
        assert_eq!(rules.detect_language("Località: Roma", "en"), "it");
    }
}
