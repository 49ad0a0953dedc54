use std::collections::HashSet;

use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};

use super::FetchError;
use crate::domain::fetch::ExtractionMode;

pub const NO_LINK_FOUND: &str = "[No link found nearby]";

/// 近くのリンクを探す兄弟要素の数
const SIBLING_LIMIT: usize = 5;

fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// HTML からモードに応じたテキストを抽出する
///
/// `page_url` はリダイレクト後の URL で、相対リンクの解決に使う。
pub fn extract(html: &str, page_url: &str, mode: &ExtractionMode) -> Result<String, FetchError> {
    let base = Url::parse(page_url).map_err(|_| FetchError::InvalidUrl(page_url.to_string()))?;
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").map_err(|_| FetchError::NoBody(page_url.to_string()))?;
    let body = document
        .select(&body_selector)
        .next()
        .ok_or_else(|| FetchError::NoBody(page_url.to_string()))?;

    let (input, matches) = match mode {
        ExtractionMode::BodyText => return Ok(body_text(body)),
        ExtractionMode::Keyword(keyword) => {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                return Err(FetchError::EmptyInput("a keyword"));
            }
            (keyword.to_string(), find_by_keyword(body, keyword))
        }
        ExtractionMode::Tag(tag) => {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                return Err(FetchError::EmptyInput("an HTML tag (e.g., h3, div)"));
            }
            let matches = elements(body).filter(|e| e.value().name() == tag).collect();
            (tag, matches)
        }
    };

    if matches.is_empty() {
        return Ok(format!("No matching content found for '{input}' in {page_url}."));
    }

    let lines: Vec<String> = matches
        .into_iter()
        .filter_map(|element| {
            let text = element_text(element);
            if text.is_empty() {
                return None;
            }
            let link = nearby_link(element, &base).unwrap_or_else(|| NO_LINK_FOUND.to_string());
            Some(format!("{text} -> {link}"))
        })
        .collect();

    Ok(lines.join("\n"))
}

/// body の子孫要素（body 自身は除く、文書順）
fn elements(body: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    body.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// テキストノードまたは属性値にキーワードを含む要素（大文字小文字無視、文書順）
///
/// 属性は body の子孫のみ見る。body 直下のテキストは body 自身を返す。
fn find_by_keyword<'a>(body: ElementRef<'a>, keyword: &str) -> Vec<ElementRef<'a>> {
    let needle = keyword.to_lowercase();
    let mut hits = HashSet::new();

    for node in body.descendants() {
        match node.value() {
            Node::Text(text) if text.to_lowercase().contains(&needle) => {
                let Some(parent) = node.parent() else {
                    continue;
                };
                if ElementRef::wrap(parent).is_some_and(|e| !is_hidden(e.value().name())) {
                    hits.insert(parent.id());
                }
            }
            Node::Element(element) if node.id() != body.id() && !is_hidden(element.name()) => {
                if element
                    .attrs()
                    .any(|(_, value)| value.to_lowercase().contains(&needle))
                {
                    hits.insert(node.id());
                }
            }
            _ => {}
        }
    }

    body.descendants()
        .filter(|node| hits.contains(&node.id()))
        .filter_map(ElementRef::wrap)
        .collect()
}

/// 要素のテキスト: 各テキストノードをトリムして連結、改行は空白に
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .collect::<String>()
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// body のテキスト: 1テキストノード1行、空行は除く
fn body_text(body: ElementRef<'_>) -> String {
    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            if is_hidden(parent.value().name()) {
                return None;
            }
            let line = text.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn anchor_link(element: ElementRef<'_>, base: &Url) -> Option<String> {
    if element.value().name() != "a" {
        return None;
    }
    element.value().attr("href").map(|href| resolve(base, href))
}

/// GET フォーム: action に name+value を持つ input をクエリとして付ける
fn form_link(element: ElementRef<'_>, base: &Url) -> Option<String> {
    let form = element.value();
    if form.name() != "form" {
        return None;
    }
    let method = form.attr("method").unwrap_or("get");
    if !method.eq_ignore_ascii_case("get") {
        return None;
    }
    let action = form.attr("action")?;

    let params: Vec<(&str, &str)> = descendants(element)
        .filter(|e| e.value().name() == "input")
        .filter_map(|e| Some((e.value().attr("name")?, e.value().attr("value")?)))
        .collect();

    let Ok(mut url) = base.join(action) else {
        return Some(action.to_string());
    };
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Some(url.to_string())
}

/// 自身を除く子孫要素
fn descendants(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// 近くのリンク: 自身 → 祖先 → 子孫 → 後続の兄弟（とその中の a / form）
fn nearby_link(element: ElementRef<'_>, base: &Url) -> Option<String> {
    if let Some(link) = anchor_link(element, base) {
        return Some(link);
    }

    let ancestor = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|a| anchor_link(a, base));
    if ancestor.is_some() {
        return ancestor;
    }

    let inner = descendants(element).find_map(|d| anchor_link(d, base));
    if inner.is_some() {
        return inner;
    }

    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take(SIBLING_LIMIT)
        .find_map(|sibling| {
            std::iter::once(sibling)
                .chain(descendants(sibling).filter(|e| matches!(e.value().name(), "a" | "form")))
                .find_map(|candidate| {
                    anchor_link(candidate, base).or_else(|| form_link(candidate, base))
                })
        })
}
