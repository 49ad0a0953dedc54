use serde::Deserialize;

use crate::domain::error::AppError;
use crate::domain::types::TemplateSet;

/// テンプレート管理ダイアログの編集操作
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TemplateEdit {
    AddLanguage { code: String },
    DeleteLanguage { code: String },
    Upsert { lang: String, index: usize, text: String },
    Delete { lang: String, index: usize },
}

/// 言語コード: ASCII 英字2文字（小文字に正規化）
fn normalize_code(code: &str) -> Result<String, AppError> {
    let code = code.trim().to_ascii_lowercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation(format!(
            "Invalid language code '{code}': use two letters (e.g. en, it, fr)"
        )));
    }
    Ok(code)
}

impl TemplateSet {
    /// 編集操作を適用する（呼び出し側はコピーに適用し、確定時に保存する）
    pub fn apply(&mut self, edit: TemplateEdit) -> Result<(), AppError> {
        match edit {
            TemplateEdit::AddLanguage { code } => self.add_language(&code).map(|_| ()),
            TemplateEdit::DeleteLanguage { code } => self.delete_language(&code),
            TemplateEdit::Upsert { lang, index, text } => {
                self.upsert_template(&lang, index, &text).map(|_| ())
            }
            TemplateEdit::Delete { lang, index } => self.delete_template(&lang, index).map(|_| ()),
        }
    }

    /// 言語を追加する（空リストで開始）
    pub fn add_language(&mut self, code: &str) -> Result<String, AppError> {
        let code = normalize_code(code)?;
        if self.languages.contains_key(&code) {
            return Err(AppError::validation(format!("Language '{code}' already exists")));
        }
        self.languages.insert(code.clone(), Vec::new());
        Ok(code)
    }

    /// 言語を削除する。最後の1言語は削除できない。
    pub fn delete_language(&mut self, code: &str) -> Result<(), AppError> {
        if !self.languages.contains_key(code) {
            return Err(AppError::validation(format!("Language '{code}' not found")));
        }
        if self.languages.len() == 1 {
            return Err(AppError::validation("Cannot delete the last language"));
        }
        self.languages.remove(code);
        Ok(())
    }

    /// `index` の位置を置き換える。`index == len` なら末尾に追加。
    ///
    /// 空白のみのテキストは無視して `Ok(false)` を返す。
    pub fn upsert_template(
        &mut self,
        code: &str,
        index: usize,
        text: &str,
    ) -> Result<bool, AppError> {
        let list = self
            .languages
            .get_mut(code)
            .ok_or_else(|| AppError::validation(format!("Language '{code}' not found")))?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        match index.cmp(&list.len()) {
            std::cmp::Ordering::Less => list[index] = text.to_string(),
            std::cmp::Ordering::Equal => list.push(text.to_string()),
            std::cmp::Ordering::Greater => {
                return Err(AppError::validation(format!(
                    "Template index {index} out of range for '{code}'"
                )))
            }
        }
        Ok(true)
    }

    pub fn delete_template(&mut self, code: &str, index: usize) -> Result<String, AppError> {
        let list = self
            .languages
            .get_mut(code)
            .ok_or_else(|| AppError::validation(format!("Language '{code}' not found")))?;
        if index >= list.len() {
            return Err(AppError::validation(format!(
                "Template index {index} out of range for '{code}'"
            )));
        }
        Ok(list.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_language() {
        let mut set = TemplateSet::with_languages(&["en"]);
        assert_eq!(set.add_language(" DE ").unwrap(), "de");
        assert!(set.templates("de").unwrap().is_empty());
        assert!(set.add_language("de").is_err());
        assert!(set.add_language("deu").is_err());
        assert!(set.add_language("d1").is_err());
    }

    #[test]
    fn test_cannot_delete_last_language() {
        let mut set = TemplateSet::with_languages(&["en", "it"]);
        set.delete_language("it").unwrap();
        let err = set.delete_language("en").unwrap_err();
        assert!(err.message.contains("last language"));
        assert!(set.delete_language("xx").is_err());
    }

    #[test]
    fn test_upsert_replace_and_append() {
        let mut set = TemplateSet::with_languages(&["en"]);
        assert!(set.upsert_template("en", 0, "first").unwrap());
        assert!(set.upsert_template("en", 1, "second").unwrap());
        assert!(set.upsert_template("en", 0, "FIRST").unwrap());
        assert_eq!(set.templates("en").unwrap(), ["FIRST", "second"]);
        assert!(set.upsert_template("en", 5, "x").is_err());
    }

    #[test]
    fn test_upsert_ignores_blank() {
        let mut set = TemplateSet::with_languages(&["en"]);
        assert!(!set.upsert_template("en", 0, "  \n").unwrap());
        assert!(set.templates("en").unwrap().is_empty());
    }

    #[test]
    fn test_apply_edits_from_json() {
        let mut set = TemplateSet::with_languages(&["en"]);
        let edits: Vec<TemplateEdit> = serde_json::from_str(
            r#"[
                {"op": "add_language", "code": "IT"},
                {"op": "upsert", "lang": "it", "index": 0, "text": "Ciao {client_name}"},
                {"op": "delete_language", "code": "en"}
            ]"#,
        )
        .unwrap();
        for edit in edits {
            set.apply(edit).unwrap();
        }
        assert_eq!(set.languages.len(), 1);
        assert_eq!(set.templates("it").unwrap(), ["Ciao {client_name}"]);
    }

    #[test]
    fn test_delete_template() {
        let mut set = TemplateSet::with_languages(&["fr"]);
        set.upsert_template("fr", 0, "a").unwrap();
        set.upsert_template("fr", 1, "b").unwrap();
        assert_eq!(set.delete_template("fr", 0).unwrap(), "a");
        assert_eq!(set.templates("fr").unwrap(), ["b"]);
        assert!(set.delete_template("fr", 3).is_err());
    }
}
