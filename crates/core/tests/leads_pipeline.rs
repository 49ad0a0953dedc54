//! Leads タブの一連の流れ（ルール保存 → 生成 → 修正 → 統計）の統合テスト。

use std::sync::Arc;

use async_trait::async_trait;
use fu_core::domain::generation::GenerateOutcome;
use fu_core::domain::stats::StatKey;
use fu_core::domain::types::{ParsedFields, Rule, TemplateKind};
use fu_core::infra::fetcher::{FetchError, FetchedPage, PageFetcher};
use fu_core::infra::output::{MemoryOutput, OutputRouter};
use fu_core::infra::storage::Storage;
use fu_core::infra::template::TemplateEdit;
use fu_core::usecase::app_service::AppService;

struct NoNetwork;

#[async_trait]
impl PageFetcher for NoNetwork {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        Err(FetchError::InvalidUrl(url.to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

fn setup() -> (tempfile::TempDir, AppService, MemoryOutput) {
    let dir = tempfile::tempdir().unwrap();
    let out = MemoryOutput::new();
    let svc = AppService::with_output(
        Storage::open(dir.path().join("stats.db").to_str().unwrap()).unwrap(),
        dir.path(),
        Arc::new(NoNetwork),
        OutputRouter::with_target(Box::new(out.clone())),
    );
    (dir, svc, out)
}

fn lead_rules() -> Vec<Rule> {
    vec![
        Rule::extraction("dear", "name", r"Dear\s+([\w]+)\s*,"),
        Rule::extraction("gentile", "name", r"Gentile\s+([\w]+)"),
        Rule::extraction("machine", "machine", r"^Machine:\s*(.+)$"),
        Rule::extraction("macchina", "machine", r"^Macchina:\s*(.+)$"),
        Rule::extraction("location", "location", r"^(?:Location|Località):\s*(.+)$"),
        Rule::language("italian", "it", r"gentile|macchina"),
    ]
}

#[test]
fn generate_with_templates_edited_through_the_manager() {
    let (dir, svc, out) = setup();
    svc.save_rules(lead_rules()).unwrap();

    // 初回読み込みで既定のテンプレートファイルが作られる
    let set = svc.get_templates(TemplateKind::Leads).unwrap();
    assert!(dir.path().join("templates/leads_templates.json").exists());
    assert_eq!(set.languages.keys().collect::<Vec<_>>(), ["en", "fr", "it"]);

    let set = svc
        .edit_templates(
            set,
            TemplateEdit::Upsert {
                lang: "it".into(),
                index: 0,
                text: "Gentile {client_name}, la {machine_name} ({location}): {link}".into(),
            },
        )
        .unwrap();
    svc.save_templates(TemplateKind::Leads, set).unwrap();

    let text = "Gentile Paolo\r\nMacchina: Tornio CNC.\r\nLocalità:\u{00A0}Torino\r\nhttps://m.example/42";
    let GenerateOutcome::Rendered { text, language, .. } = svc.generate_template(text).unwrap()
    else {
        panic!("all fields should have been extracted");
    };
    assert_eq!(language, "it");
    assert_eq!(
        text,
        "Gentile Paolo, la Tornio CNC (Torino): https://m.example/42"
    );
    assert_eq!(out.last().as_deref(), Some(text.as_str()));
    assert_eq!(svc.today_stats().unwrap().get(StatKey::TemplateLeads), 1);
}

#[test]
fn correction_replaces_pending_generation() {
    let (_dir, svc, out) = setup();
    svc.save_rules(lead_rules()).unwrap();

    let first = svc.generate_template("Dear Anna, hello").unwrap();
    assert!(matches!(first, GenerateOutcome::NeedsCorrection { .. }));

    // 新しい貼り付けで修正待ちが置き換わる
    let second = svc.generate_template("Dear Bruno, again").unwrap();
    let GenerateOutcome::NeedsCorrection { fields, .. } = second else {
        panic!("expected correction");
    };
    assert_eq!(fields.name, "Bruno");

    let outcome = svc
        .confirm_correction(ParsedFields {
            name: " Bruno ".into(),
            machine: "Press".into(),
            location: "Lyon".into(),
            link: "https://p/1".into(),
        })
        .unwrap();
    let GenerateOutcome::Rendered { fields, text, .. } = outcome else {
        panic!("expected render");
    };
    assert_eq!(fields.name, "Bruno");
    // 既定テンプレートは空なので固定文字列
    assert_eq!(text, "Template not found");
    assert_eq!(out.delivered().len(), 1);

    let metrics = svc.get_metrics();
    assert_eq!(metrics.corrections_requested, 2);
    assert_eq!(metrics.templates_rendered, 1);
}

#[test]
fn invalid_rules_are_saved_and_reported() {
    let (_dir, svc, _out) = setup();
    let mut rules = lead_rules();
    rules.insert(0, Rule::extraction("broken", "name", "Dear (["));
    let issues = svc.save_rules(rules).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].name, "broken");
    assert_eq!(svc.list_rules().unwrap().len(), 7);

    // 壊れたルールがあっても後続ルールで抽出できる
    let GenerateOutcome::NeedsCorrection { fields, .. } =
        svc.generate_template("Dear Carla, hi").unwrap()
    else {
        panic!("expected correction");
    };
    assert_eq!(fields.name, "Carla");
}

#[test]
fn stats_survive_reopen_and_manual_edit() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stats.db");
    {
        let svc = AppService::with_output(
            Storage::open(db.to_str().unwrap()).unwrap(),
            dir.path(),
            Arc::new(NoNetwork),
            OutputRouter::with_target(Box::new(MemoryOutput::new())),
        );
        svc.copy_quick_followup("en").unwrap();
        svc.save_daily_stats(
            "2024-03-01",
            [("contacts".to_string(), "7".to_string())].into(),
        )
        .unwrap();
    }

    let svc = AppService::with_output(
        Storage::open(db.to_str().unwrap()).unwrap(),
        dir.path(),
        Arc::new(NoNetwork),
        OutputRouter::with_target(Box::new(MemoryOutput::new())),
    );
    assert_eq!(svc.today_stats().unwrap().get(StatKey::EmailSent), 1);
    let all = svc.list_daily_stats().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.last().unwrap().date, "2024-03-01");
    assert_eq!(all.last().unwrap().get(StatKey::Contacts), 7);

    assert!(svc
        .save_daily_stats("2024-03-01", [("contacts".to_string(), "-1".to_string())].into())
        .is_err());
    assert_eq!(svc.delete_all_stats().unwrap(), 2);
    assert!(svc.list_daily_stats().unwrap().is_empty());
}
