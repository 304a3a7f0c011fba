//! Word 문서 텍스트 추출
//!
//! - .docx: zip 컨테이너의 `word/document.xml`에서 문단별 텍스트
//! - .doc (레거시 바이너리): 출력 가능한 문자열 구간 추출

use std::io::{Cursor, Read};

use regex::Regex;

/// zip 로컬 파일 헤더 시그니처
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// 레거시 .doc에서 텍스트로 인정하는 최소 연속 문자 수
const MIN_RUN_LEN: usize = 4;

/// 바이트에서 텍스트 추출 (컨테이너 형식 자동 판별)
pub fn extract_word_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.starts_with(ZIP_MAGIC) {
        extract_docx_text(bytes)
    } else {
        Ok(extract_legacy_doc_text(bytes))
    }
}

/// .docx 본문 추출 (문단당 한 줄)
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("invalid docx container: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read word/document.xml: {}", e))?;

    document_xml_to_text(&xml)
}

/// WordprocessingML → 평문
fn document_xml_to_text(xml: &str) -> Result<String, String> {
    let paragraph_re = Regex::new(r"(?s)<w:p[\s>].*?</w:p>").map_err(|e| e.to_string())?;
    // 속성이 붙은 자기 닫힘 태그 포함 (예: <w:br w:type="page"/>)
    let run_re = Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:(tab|br|cr)\b[^>]*/>")
        .map_err(|e| e.to_string())?;
    let char_ref_re = Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").map_err(|e| e.to_string())?;
    // 문단 속성의 탭 정지 위치(<w:tabs><w:tab .../>)는 본문이 아님
    let properties_re = Regex::new(r"(?s)<w:pPr>.*?</w:pPr>").map_err(|e| e.to_string())?;

    let mut lines = Vec::new();
    for paragraph in paragraph_re.find_iter(xml) {
        let body = properties_re.replace_all(paragraph.as_str(), "");
        let mut line = String::new();
        for run in run_re.captures_iter(&body) {
            match (run.get(1), run.get(2).map(|tag| tag.as_str())) {
                (Some(text), _) => line.push_str(&unescape_xml(&char_ref_re, text.as_str())),
                (None, Some("tab")) => line.push('\t'),
                _ => line.push('\n'),
            }
        }
        lines.push(line);
    }

    Ok(lines.join("\n").trim().to_string())
}

/// 문자 참조(`&#8217;`, `&#x2019;`)와 기본 엔티티 복원
fn unescape_xml(char_ref_re: &Regex, text: &str) -> String {
    let decoded = char_ref_re.replace_all(text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });

    decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// 레거시 .doc: UTF-16LE 구간과 8비트 구간 중 더 많은 텍스트를 반환
pub fn extract_legacy_doc_text(bytes: &[u8]) -> String {
    let utf16 = utf16_runs(bytes);
    let ascii = byte_runs(bytes);

    let total = |runs: &[String]| runs.iter().map(|r| r.chars().count()).sum::<usize>();
    let runs = if total(&utf16) >= total(&ascii) { utf16 } else { ascii };
    runs.join("\n")
}

/// UTF-16 코드 유닛 중 텍스트로 보는 범위 (Latin-1, 한글 음절)
fn is_text_unit(unit: u16) -> bool {
    matches!(unit, 0x09 | 0x20..=0x7e | 0xa0..=0xff | 0xac00..=0xd7a3)
}

fn flush_run(run: &mut String, runs: &mut Vec<String>) {
    if run.trim().chars().count() >= MIN_RUN_LEN {
        runs.push(run.trim().to_string());
    }
    run.clear();
}

fn utf16_runs(bytes: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut run = String::new();

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(unit as u32).filter(|_| is_text_unit(unit)) {
            Some(c) => run.push(c),
            None => flush_run(&mut run, &mut runs),
        }
    }
    flush_run(&mut run, &mut runs);
    runs
}

fn byte_runs(bytes: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut run = String::new();

    for &b in bytes {
        if (0x20..0x7f).contains(&b) || b == b'\t' {
            run.push(b as char);
        } else {
            flush_run(&mut run, &mut runs);
        }
    }
    flush_run(&mut run, &mut runs);
    runs
}
