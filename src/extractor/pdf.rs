//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 페이지별 텍스트를 추출합니다.

use std::path::Path;

use regex::Regex;

/// PDF에서 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작합니다.
/// 텍스트가 없는 페이지(스캔 이미지 등)는 제외됩니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<(usize, String)>, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    extract_pages_from_mem(&bytes)
}

/// 메모리의 PDF 바이트에서 페이지별 텍스트 추출
pub fn extract_pages_from_mem(bytes: &[u8]) -> Result<Vec<(usize, String)>, String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| format!("failed to extract text from PDF: {}", e))?;

    Ok(split_pdf_pages(&text)
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .filter(|(_, text)| !text.trim().is_empty())
        .collect())
}

/// PDF 텍스트를 페이지별로 분리
fn split_pdf_pages(text: &str) -> Vec<String> {
    // 폼피드 문자 (\x0c)로 페이지 분리
    if text.contains('\x0c') {
        return text.split('\x0c').map(|s| s.trim().to_string()).collect();
    }

    // 페이지 구분자 패턴 (예: "--- Page 2 ---"). 빈 페이지도 번호를 유지
    if let Ok(page_pattern) = Regex::new(r"(?mi)^\s*[-=]+\s*Page\s+\d+\s*[-=]+\s*$") {
        let mut pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .collect();

        // 첫 구분자 앞이 비어 있으면 그 구분자가 1페이지 시작
        if pages.len() > 1 && pages[0].is_empty() {
            pages.remove(0);
        }

        if pages.len() > 1 {
            return pages;
        }
    }

    // 분리 실패 - 전체를 하나의 페이지로
    vec![text.trim().to_string()]
}

// ============================================================================
// Tests
// ============================================================================
