use std::collections::BTreeMap;

/// テンプレート描画エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
    #[error("single '}}' encountered at byte {0}")]
    StrayClose(usize),
}

enum Piece<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

/// `{name}` 置換、`{{` / `}}` はリテラルの波括弧
fn tokenize(template: &str) -> Result<Vec<Piece<'_>>, RenderError> {
    let mut pieces = Vec::new();
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                if bytes.get(i + 1) == Some(&b'{') {
                    pieces.push(Piece::Brace('{'));
                    i += 2;
                } else {
                    let close = template[i + 1..]
                        .find('}')
                        .map(|off| i + 1 + off)
                        .ok_or(RenderError::Unclosed(i))?;
                    let inner = &template[i + 1..close];
                    if inner.contains('{') {
                        return Err(RenderError::Unclosed(i));
                    }
                    pieces.push(Piece::Placeholder(inner));
                    i = close + 1;
                }
                literal_start = i;
            }
            b'}' => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                if bytes.get(i + 1) == Some(&b'}') {
                    pieces.push(Piece::Brace('}'));
                    i += 2;
                    literal_start = i;
                } else {
                    return Err(RenderError::StrayClose(i));
                }
            }
            _ => i += 1,
        }
    }
    if literal_start < bytes.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }
    Ok(pieces)
}

/// テンプレートを描画する。値のないプレースホルダーはエラー。
pub fn render(template: &str, values: &BTreeMap<String, String>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    for piece in tokenize(template)? {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Brace(c) => out.push(c),
            Piece::Placeholder(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| RenderError::UnknownPlaceholder(name.to_string()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// テンプレート中のプレースホルダー名（出現順、重複あり）
pub fn placeholders_in(template: &str) -> Result<Vec<String>, RenderError> {
    Ok(tokenize(template)?
        .into_iter()
        .filter_map(|p| match p {
            Piece::Placeholder(name) => Some(name.to_string()),
            _ => None,
        })
        .collect())
}
