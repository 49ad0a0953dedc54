mod editor;
mod render;
mod selector;

pub use editor::TemplateEdit;
pub use render::{placeholders_in, render, RenderError};
pub use selector::{select_template, TEMPLATE_NOT_FOUND};

use crate::domain::error::AppError;
use crate::domain::types::{TemplateKind, TemplateSet};

/// テンプレートが種別ごとのプレースホルダーだけを使っているか検証する
pub fn validate_set(kind: TemplateKind, set: &TemplateSet) -> Result<(), AppError> {
    let allowed = kind.placeholders();
    for (lang, templates) in &set.languages {
        for (i, template) in templates.iter().enumerate() {
            let names = placeholders_in(template).map_err(|e| {
                AppError::validation(format!("{lang} template {}: {e}", i + 1))
            })?;
            if let Some(unknown) = names.iter().find(|n| !allowed.contains(&n.as_str())) {
                return Err(AppError::validation(format!(
                    "{lang} template {}: unsupported placeholder {{{unknown}}} (allowed: {})",
                    i + 1,
                    allowed.join(", ")
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;

    #[test]
    fn test_validate_accepts_known_placeholders() {
        let mut set = TemplateSet::new();
        set.languages.insert(
            "en".into(),
            vec!["Hi {client_name}, {machine_name} in {location}: {link}".into()],
        );
        assert!(validate_set(TemplateKind::Leads, &set).is_ok());
    }

    #[test]
    fn test_validate_rejects_foreign_placeholder() {
        let mut set = TemplateSet::new();
        set.languages
            .insert("it".into(), vec!["Ciao {name}".into(), "Ciao {price}".into()]);
        let err = validate_set(TemplateKind::Contacts, &set).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(err.message.contains("it template 2"));
        assert!(err.message.contains("{price}"));
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let mut set = TemplateSet::new();
        set.languages.insert("en".into(), vec!["Hello {name".into()]);
        assert!(validate_set(TemplateKind::Contacts, &set).is_err());
    }
}
