//! CSV 一括送信（Contacts / Metabase タブ）
//!
//! CSV は初期化時に読み込み、`copy_next` ごとに1行ずつ進める。
//! 先頭からのやり直しのみ可能（`reset` → `initialize`）。

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::Rng;

use crate::domain::bulk::{BulkItem, BulkKind, BulkParams, NextOutcome, Progress, SenderState};
use crate::domain::error::AppError;
use crate::domain::settings::AppSettings;
use crate::domain::types::TemplateSet;
use crate::infra::csv_source::CsvTable;
use crate::infra::template::{render, select_template};

/// 先頭だけ大文字、残りは小文字
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// 英字の連続ごとに先頭を大文字に（"usa" → "Usa"）
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// セラー宛の呼び名: ローカル部の最初の `.` まで。`@` がなければ "Client"。
pub fn seller_name(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) => capitalize(local.split('.').next().unwrap_or_default()),
        None => "Client".to_string(),
    }
}

/// リード宛の呼び名: `@` の前（なければ全体）の最初の `.` まで
pub fn lead_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    capitalize(local.split('.').next().unwrap_or_default())
}

enum RowRule {
    Seller {
        start_email: Option<String>,
        started: bool,
        excluded: BTreeSet<String>,
        languages: BTreeMap<String, String>,
    },
    Lead {
        price: String,
        link: String,
        machine: String,
        languages: BTreeMap<String, String>,
    },
}

/// 初期化済みの送信セッション
struct BulkSession {
    table: CsvTable,
    email_col: Option<usize>,
    country_col: Option<usize>,
    templates: TemplateSet,
    fallback: String,
    rule: RowRule,
    cursor: usize,
}

impl BulkSession {
    fn open(
        params: BulkParams,
        templates: TemplateSet,
        settings: &AppSettings,
    ) -> Result<Self, AppError> {
        let rule = match &params {
            BulkParams::SellerFollowup { start_email, .. } => RowRule::Seller {
                start_email: start_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_lowercase),
                started: false,
                excluded: settings.excluded_countries.clone(),
                languages: settings.seller_country_languages.clone(),
            },
            BulkParams::LeadEmail {
                price,
                link,
                machine,
                ..
            } => {
                let (price, link, machine) = (price.trim(), link.trim(), machine.trim());
                if price.is_empty() || link.is_empty() || machine.is_empty() {
                    return Err(AppError::validation(
                        "Please fill in Price, Link and Machine Name.",
                    ));
                }
                RowRule::Lead {
                    price: price.to_string(),
                    link: link.to_string(),
                    machine: machine.to_string(),
                    languages: settings.lead_country_languages.clone(),
                }
            }
        };

        let fallback = settings.fallback_language.clone();
        if !templates.has_templates(&fallback) {
            return Err(AppError::validation(format!(
                "{} templates must contain at least one '{fallback}' template.",
                params.kind().label()
            )));
        }

        let table = CsvTable::open(Path::new(params.csv_path().trim()))?;
        let (email_header, country_header) = match params.kind() {
            BulkKind::SellerFollowup => ("Email address", "Country"),
            BulkKind::LeadEmail => ("Lead Email", "Lead Country"),
        };
        let email_col = table.column(email_header);
        let country_col = table.column(country_header);
        if email_col.is_none() || country_col.is_none() {
            log::warn!("CSV に '{email_header}' / '{country_header}' 列がありません");
        }

        Ok(Self {
            table,
            email_col,
            country_col,
            templates,
            fallback,
            rule,
            cursor: 0,
        })
    }

    /// 次の送信対象行を生成する。枯渇したら `None`。
    fn next_item<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<BulkItem>, AppError> {
        let total = self.table.len();
        while self.cursor < total {
            let i = self.cursor;
            self.cursor += 1;

            let email = self.table.value(i, self.email_col).to_string();
            let country_raw = self.table.value(i, self.country_col);

            let (country, language, values) = match &mut self.rule {
                RowRule::Seller {
                    start_email,
                    started,
                    excluded,
                    languages,
                } => {
                    if let Some(start) = start_email.as_deref() {
                        if !*started {
                            if email.to_lowercase() != start {
                                continue;
                            }
                            *started = true;
                        }
                    }
                    let country = country_raw.to_lowercase();
                    if email.is_empty() || excluded.contains(&country) {
                        log::debug!("行 {} をスキップ", i + 2);
                        continue;
                    }
                    let language = languages
                        .get(&title_case(&country))
                        .cloned()
                        .unwrap_or_else(|| self.fallback.clone());
                    let values = BTreeMap::from([("name".to_string(), seller_name(&email))]);
                    (country, language, values)
                }
                RowRule::Lead {
                    price,
                    link,
                    machine,
                    languages,
                } => {
                    if email.is_empty() || country_raw.is_empty() {
                        log::debug!("行 {} をスキップ", i + 2);
                        continue;
                    }
                    let language = languages
                        .get(country_raw)
                        .cloned()
                        .unwrap_or_else(|| self.fallback.clone());
                    let values = BTreeMap::from([
                        ("name".to_string(), lead_name(&email)),
                        ("machine".to_string(), machine.clone()),
                        ("price".to_string(), price.clone()),
                        ("link".to_string(), link.clone()),
                    ]);
                    (country_raw.to_string(), language, values)
                }
            };

            let template = select_template(&self.templates, &language, &self.fallback, rng);
            let message = render(template, &values).map_err(|e| {
                AppError::template(format!("Template error for '{language}': {e}"))
            })?;

            return Ok(Some(BulkItem {
                row_index: i + 2,
                email,
                country,
                language,
                message,
                progress: Progress {
                    current: i + 1,
                    total,
                },
            }));
        }
        Ok(None)
    }
}

/// 1タブ分の送信状態（Idle / Ready）
pub struct BulkSender {
    kind: BulkKind,
    session: Option<BulkSession>,
}

impl BulkSender {
    pub fn new(kind: BulkKind) -> Self {
        Self {
            kind,
            session: None,
        }
    }

    pub fn kind(&self) -> BulkKind {
        self.kind
    }

    pub fn state(&self) -> SenderState {
        if self.session.is_some() {
            SenderState::Ready
        } else {
            SenderState::Idle
        }
    }

    /// CSV とテンプレートを読み込んで Ready にする。失敗時は Idle に戻す。
    pub fn initialize(
        &mut self,
        params: BulkParams,
        templates: TemplateSet,
        settings: &AppSettings,
    ) -> Result<(), AppError> {
        self.session = None;
        if params.kind() != self.kind {
            return Err(AppError::validation(format!(
                "{} parameters sent to the {} sender",
                params.kind().label(),
                self.kind.label()
            )));
        }
        self.session = Some(BulkSession::open(params, templates, settings)?);
        log::info!("{} 送信を初期化", self.kind.label());
        Ok(())
    }

    /// 次の1件。枯渇時とエラー時は Idle に戻る。
    pub fn copy_next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<NextOutcome, AppError> {
        let session = self.session.as_mut().ok_or_else(|| {
            AppError::invalid_state(format!("{} sender is not initialized", self.kind.label()))
        })?;

        match session.next_item(rng) {
            Ok(Some(item)) => Ok(NextOutcome::Item(item)),
            Ok(None) => {
                log::info!("{} 送信が完了", self.kind.label());
                self.session = None;
                Ok(NextOutcome::Completed)
            }
            Err(e) => {
                self.session = None;
                Err(e)
            }
        }
    }

    pub fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn templates(pairs: &[(&str, &str)]) -> TemplateSet {
        let mut set = TemplateSet::new();
        for (lang, text) in pairs {
            set.languages
                .entry(lang.to_string())
                .or_default()
                .push(text.to_string());
        }
        set
    }

    fn seller(path: &Path, start: Option<&str>) -> BulkParams {
        BulkParams::SellerFollowup {
            csv_path: path.to_string_lossy().into_owned(),
            start_email: start.map(String::from),
        }
    }

    fn drain(sender: &mut BulkSender) -> Vec<BulkItem> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut items = Vec::new();
        loop {
            match sender.copy_next(&mut rng).unwrap() {
                NextOutcome::Item(item) => items.push(item),
                NextOutcome::Completed => return items,
            }
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(seller_name("luca.rossi@x.it"), "Luca");
        assert_eq!(seller_name("ANNA@x.it"), "Anna");
        assert_eq!(seller_name("no-at-sign"), "Client");
        assert_eq!(lead_name("jean.dupont@x.fr"), "Jean");
        assert_eq!(lead_name("plain"), "Plain");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("united states"), "United States");
        assert_eq!(title_case("italy"), "Italy");
        assert_eq!(title_case("usa"), "Usa");
    }

    #[test]
    fn test_skipped_row_still_advances_progress() {
        let csv = csv_file("Email address,Country\na@x.it,Italy\n,France\nc@x.fr,France\n");
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        sender
            .initialize(
                seller(csv.path(), None),
                templates(&[("en", "Hi {name}"), ("it", "Ciao {name}"), ("fr", "Salut {name}")]),
                &AppSettings::default(),
            )
            .unwrap();
        assert_eq!(sender.state(), SenderState::Ready);

        let items = drain(&mut sender);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].progress, Progress { current: 1, total: 3 });
        assert_eq!(items[1].progress, Progress { current: 3, total: 3 });
        assert_eq!(items[0].message, "Ciao A");
        assert_eq!(items[1].message, "Salut C");
        assert_eq!(items[1].row_index, 4);
        assert_eq!(items[1].country, "france");
        assert_eq!(sender.state(), SenderState::Idle);
    }

    #[test]
    fn test_start_email_and_exclusions() {
        let csv = csv_file(
            "Email address,Country\n\
             first@x.it,Italy\n\
             START@x.it,Italy\n\
             kurt@x.de,Germany\n\
             last@x.ch,Switzerland\n",
        );
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        sender
            .initialize(
                seller(csv.path(), Some("start@X.it")),
                templates(&[("en", "Hi {name}"), ("fr", "Salut {name}")]),
                &AppSettings::default(),
            )
            .unwrap();
        let items = drain(&mut sender);
        let emails: Vec<&str> = items.iter().map(|i| i.email.as_str()).collect();
        assert_eq!(emails, ["START@x.it", "last@x.ch"]);
        // it テンプレートがないのでフォールバック
        assert_eq!(items[0].language, "it");
        assert_eq!(items[0].message, "Hi Start");
        assert_eq!(items[1].message, "Salut Last");
    }

    #[test]
    fn test_lead_requires_params() {
        let csv = csv_file("Lead Email,Lead Country\na@b.c,Italy\n");
        let mut sender = BulkSender::new(BulkKind::LeadEmail);
        let err = sender
            .initialize(
                BulkParams::LeadEmail {
                    csv_path: csv.path().to_string_lossy().into_owned(),
                    price: " ".into(),
                    link: "https://x".into(),
                    machine: "Lathe".into(),
                },
                templates(&[("en", "{name}")]),
                &AppSettings::default(),
            )
            .unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Validation);
        assert_eq!(sender.state(), SenderState::Idle);
    }

    #[test]
    fn test_lead_messages() {
        let csv = csv_file(
            "Lead Email,Lead Country,Other\n\
             marie.curie@x.fr,France,1\n\
             bob@x.com,,2\n\
             carl@x.com,italy,3\n",
        );
        let mut sender = BulkSender::new(BulkKind::LeadEmail);
        sender
            .initialize(
                BulkParams::LeadEmail {
                    csv_path: csv.path().to_string_lossy().into_owned(),
                    price: "12.000 €".into(),
                    link: "https://x/m/1".into(),
                    machine: "Mazak".into(),
                },
                templates(&[
                    ("en", "Hi {name}, {machine} at {price}: {link}"),
                    ("fr", "Bonjour {name}, {machine} à {price} : {link}"),
                ]),
                &AppSettings::default(),
            )
            .unwrap();
        let items = drain(&mut sender);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message, "Bonjour Marie, Mazak à 12.000 € : https://x/m/1");
        // 完全一致のみ: "italy" は既定の en
        assert_eq!(items[1].language, "en");
        assert_eq!(items[1].progress, Progress { current: 3, total: 3 });
    }

    #[test]
    fn test_unmapped_country_uses_configured_fallback() {
        let settings = AppSettings {
            fallback_language: "it".to_string(),
            ..AppSettings::default()
        };
        let tpl = templates(&[("en", "Hi {name}"), ("it", "Ciao {name}")]);

        let csv = csv_file("Email address,Country
paulo@x.pt,Portugal
");
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        sender
            .initialize(seller(csv.path(), None), tpl.clone(), &settings)
            .unwrap();
        let items = drain(&mut sender);
        assert_eq!(items[0].language, "it");
        assert_eq!(items[0].message, "Ciao Paulo");

        let csv = csv_file("Lead Email,Lead Country
anna@x.nl,Netherlands
");
        let mut sender = BulkSender::new(BulkKind::LeadEmail);
        sender
            .initialize(
                BulkParams::LeadEmail {
                    csv_path: csv.path().to_string_lossy().into_owned(),
                    price: "10".into(),
                    link: "https://x".into(),
                    machine: "Lathe".into(),
                },
                tpl,
                &settings,
            )
            .unwrap();
        let items = drain(&mut sender);
        assert_eq!(items[0].language, "it");
        assert_eq!(items[0].message, "Ciao Anna");
    }

    #[test]
    fn test_missing_fallback_templates_rejected() {
        let csv = csv_file("Email address,Country\na@x.it,Italy\n");
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        let err = sender
            .initialize(
                seller(csv.path(), None),
                templates(&[("it", "Ciao {name}")]),
                &AppSettings::default(),
            )
            .unwrap_err();
        assert!(err.message.contains("'en'"));
    }

    #[test]
    fn test_missing_csv_is_validation_error() {
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        let err = sender
            .initialize(
                seller(Path::new("/no/such/file.csv"), None),
                templates(&[("en", "Hi {name}")]),
                &AppSettings::default(),
            )
            .unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Validation);
    }

    #[test]
    fn test_render_error_resets() {
        let csv = csv_file("Email address,Country\na@x.it,Spain\n");
        let mut sender = BulkSender::new(BulkKind::SellerFollowup);
        sender
            .initialize(
                seller(csv.path(), None),
                templates(&[("en", "Hi {first_name}")]),
                &AppSettings::default(),
            )
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = sender.copy_next(&mut rng).unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Template);
        assert_eq!(sender.state(), SenderState::Idle);
        assert!(sender.copy_next(&mut rng).is_err());
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let csv = csv_file("Email address,Country\n");
        let mut sender = BulkSender::new(BulkKind::LeadEmail);
        assert!(sender
            .initialize(seller(csv.path(), None), templates(&[("en", "x")]), &AppSettings::default())
            .is_err());
    }
}
