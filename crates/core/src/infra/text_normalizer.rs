/// 貼り付けテキストの前処理: 抽出・言語判定の前に適用する
pub struct TextNormalizer;

impl TextNormalizer {
    /// NBSP（U+00A0 と `&nbsp;`）を空白に、CRLF / CR を LF に揃える
    pub fn normalize(text: &str) -> String {
        let replaced = text.replace('\u{00A0}', " ").replace("&nbsp;", " ");

        let mut result = String::with_capacity(replaced.len());
        let mut chars = replaced.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\r' {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                result.push('\n');
            } else {
                result.push(ch);
            }
        }
        result
    }

    /// 抽出値の整形: 前後トリムのあと末尾のピリオドを全て除去
    pub fn clean_capture(value: &str) -> String {
        value.trim().trim_end_matches('.').to_string()
    }
}
