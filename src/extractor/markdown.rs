//! 마크다운 → 평문 변환
//!
//! 문단, 제목, 목록 항목은 줄바꿈으로 구분하고 마크업은 제거합니다.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// 변환 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownText {
    /// 첫 번째 H1 제목
    pub title: Option<String>,
    pub text: String,
}

/// 마크다운을 평문으로 렌더링
pub fn markdown_to_text(markdown: &str) -> MarkdownText {
    let mut text = String::new();
    let mut title: Option<String> = None;
    let mut h1_text: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if title.is_none() => {
                h1_text = Some(String::new());
            }
            Event::Start(Tag::Item) => {
                text.push_str("- ");
            }
            Event::End(tag_end) => {
                if let TagEnd::Heading(HeadingLevel::H1) = tag_end {
                    if let Some(h1) = h1_text.take() {
                        let h1 = h1.trim();
                        if !h1.is_empty() {
                            title = Some(h1.to_string());
                        }
                    }
                }

                match tag_end {
                    TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::BlockQuote(_) => {
                        text.push_str("\n\n");
                    }
                    TagEnd::Item | TagEnd::TableRow | TagEnd::TableHead => {
                        text.push('\n');
                    }
                    TagEnd::TableCell => {
                        text.push(' ');
                    }
                    _ => {}
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(h1) = h1_text.as_mut() {
                    h1.push_str(&t);
                }
                text.push_str(&t);
            }
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            _ => {}
        }
    }

    MarkdownText {
        title,
        text: tidy(&text),
    }
}

/// 줄 끝 공백 제거, 3줄 이상 연속 빈 줄 축소
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}
