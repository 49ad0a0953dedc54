use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::types::TemplateSet;

/// 該当テンプレートが1件もないときに返す文字列
pub const TEMPLATE_NOT_FOUND: &str = "Template not found";

/// 言語のテンプレートからランダムに1件選ぶ
///
/// 言語に1件もなければフォールバック言語から選び、
/// それも空なら `TEMPLATE_NOT_FOUND` を返す。
pub fn select_template<'a, R: Rng + ?Sized>(
    set: &'a TemplateSet,
    language: &str,
    fallback: &str,
    rng: &mut R,
) -> &'a str {
    [language, fallback]
        .into_iter()
        .filter_map(|lang| set.templates(lang))
        .find_map(|list| list.choose(&mut *rng))
        .map(String::as_str)
        .unwrap_or(TEMPLATE_NOT_FOUND)
}
