#[cfg(test)]
mod tests {
    use crate::domain::bulk::{BulkItem, BulkParams, NextOutcome, Progress};
    use crate::domain::error::{AppError, ErrorCode};
    use crate::domain::fetch::{ExtractionMode, FetchEvent};
    use crate::domain::generation::{GenerateState, StateTransition};
    use crate::domain::stats::StatKey;
    use crate::domain::types::{Field, Rule, RuleKind, TemplateKind, TemplateSet};

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::Validation).unwrap(),
            "\"E_VALIDATION\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::InvalidState).unwrap(),
            "\"E_INVALID_STATE\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::Crypto).unwrap(),
            "\"E_CRYPTO\""
        );
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::invalid_state("テスト");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("E_INVALID_STATE"));
        assert!(json.contains("recoverable"));
    }

    #[test]
    fn test_rule_file_format() {
        let json = r#"[
            {"name": "Dear", "type": "extraction", "value": "name", "pattern": "Dear (\\w+)"},
            {"name": "Italian", "type": "language_detect", "value": "it", "pattern": "ciao"},
            {"name": "legacy", "value": "machine", "pattern": "Machine: (.+)"}
        ]"#;
        let rules: Vec<Rule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0].kind, RuleKind::Extraction);
        assert_eq!(rules[1].kind, RuleKind::LanguageDetect);
        // type 省略時は extraction
        assert_eq!(rules[2].kind, RuleKind::Extraction);

        let out = serde_json::to_string(&rules[1]).unwrap();
        assert!(out.contains("\"type\":\"language_detect\""));
    }

    #[test]
    fn test_template_set_accepts_single_string() {
        let set: TemplateSet =
            serde_json::from_str(r#"{"en": "Hello {name}", "it": ["a", "b"], "fr": []}"#).unwrap();
        assert_eq!(set.templates("en").unwrap(), ["Hello {name}".to_string()]);
        assert_eq!(set.templates("it").unwrap().len(), 2);
        assert!(!set.has_templates("fr"));

        // 書き出しは常にリスト
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains(r#""en":["Hello {name}"]"#));
    }

    #[test]
    fn test_template_kind_names() {
        assert_eq!(
            serde_json::to_string(&TemplateKind::QuickFollowup).unwrap(),
            "\"quick_followup\""
        );
    }

    #[test]
    fn test_generate_state_serialization() {
        let t = StateTransition {
            generation_id: "g-1".to_string(),
            prev_state: "none".to_string(),
            new_state: GenerateState::Incomplete {
                missing: vec![Field::Machine, Field::Link],
            },
        };
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"state\":\"incomplete\""));
        assert!(json.contains("[\"machine\",\"link\"]"));
        assert_eq!(
            serde_json::to_string(&GenerateState::Rendered).unwrap(),
            r#"{"state":"rendered"}"#
        );
    }

    #[test]
    fn test_bulk_params_from_ui() {
        let seller: BulkParams =
            serde_json::from_str(r#"{"kind": "seller_followup", "csv_path": "a.csv"}"#).unwrap();
        assert!(matches!(
            seller,
            BulkParams::SellerFollowup { start_email: None, .. }
        ));

        let lead: BulkParams = serde_json::from_str(
            r#"{"kind": "lead_email", "csv_path": "b.csv", "price": "1", "link": "l", "machine": "m"}"#,
        )
        .unwrap();
        assert_eq!(lead.csv_path(), "b.csv");
    }

    #[test]
    fn test_next_outcome_tagging() {
        let item = NextOutcome::Item(BulkItem {
            row_index: 2,
            email: "a@b.c".to_string(),
            country: "italy".to_string(),
            language: "it".to_string(),
            message: "Ciao".to_string(),
            progress: Progress { current: 1, total: 3 },
        });
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"outcome\":\"item\""));
        assert!(json.contains("\"row_index\":2"));
        assert_eq!(
            serde_json::to_string(&NextOutcome::Completed).unwrap(),
            r#"{"outcome":"completed"}"#
        );
    }

    #[test]
    fn test_extraction_mode_tagging() {
        let mode: ExtractionMode =
            serde_json::from_str(r#"{"mode": "keyword", "input": "Price"}"#).unwrap();
        assert_eq!(mode, ExtractionMode::Keyword("Price".to_string()));
        let body: ExtractionMode = serde_json::from_str(r#"{"mode": "body_text"}"#).unwrap();
        assert_eq!(body, ExtractionMode::BodyText);
    }

    #[test]
    fn test_fetch_event_kind() {
        let ev = FetchEvent::Failed {
            request_id: "r".to_string(),
            url: "u".to_string(),
            message: "m".to_string(),
        };
        assert!(serde_json::to_string(&ev).unwrap().contains("\"kind\":\"failed\""));
    }

    #[test]
    fn test_stat_key_matches_column_name() {
        for key in StatKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }
}
