//! HTML 텍스트 추출
//!
//! 로컬 .html 파일과 웹 스크래퍼가 함께 사용합니다.
//! script/style 등 보이지 않는 요소는 건너뛰고, 블록 요소는 줄바꿈으로 구분합니다.

use scraper::{ElementRef, Html, Node, Selector};

/// 텍스트를 수집하지 않는 요소
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// 앞뒤로 줄바꿈을 넣는 블록 요소
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "aside", "nav", "ul", "ol",
    "li", "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote", "br", "dd",
    "dt", "form",
];

/// 본문 후보 셀렉터 (우선순위 순)
const MAIN_SELECTORS: &[&str] = &["article", "main", "[role=main]", ".content", "#content"];

/// 본문으로 인정하는 최소 길이
const MIN_MAIN_CONTENT_LEN: usize = 100;

/// 제목 추출 (`<title>` > `<h1>`)
pub fn extract_title(document: &Html) -> Option<String> {
    for selector in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(selector) {
            if let Some(element) = document.select(&selector).next() {
                let title = collapse_whitespace(&element.text().collect::<String>());
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
    }

    None
}

/// 문서 전체의 보이는 텍스트
pub fn extract_body_text(document: &Html) -> String {
    match Selector::parse("body") {
        Ok(selector) => match document.select(&selector).next() {
            Some(body) => visible_text(body),
            None => visible_text(document.root_element()),
        },
        Err(_) => visible_text(document.root_element()),
    }
}

/// 본문 영역 텍스트 (article > main > ... > body)
///
/// 웹 페이지의 내비게이션/푸터를 줄이기 위해 사용합니다.
pub fn extract_main_text(document: &Html) -> String {
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = visible_text(element);
                if text.len() > MIN_MAIN_CONTENT_LEN {
                    return text;
                }
            }
        }
    }

    extract_body_text(document)
}

/// 요소의 보이는 텍스트 (블록 단위 줄바꿈)
pub fn visible_text(element: ElementRef) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);

    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }

                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    push_text(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
