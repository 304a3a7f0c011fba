//! 문서 로더 모듈
//!
//! 파일 확장자에 따라 로더를 골라 텍스트를 추출하고 `Document`로 만듭니다.
//! - csv: 행마다 문서 하나
//! - doc/docx: 문단 텍스트
//! - html: 보이는 텍스트 + 제목
//! - md: 평문 렌더링
//! - pdf: 페이지마다 문서 하나
//! - txt: 파일 전체 (UTF-8)

pub mod csv;
pub mod html;
pub mod markdown;
pub mod pdf;
pub mod word;

use std::path::Path;

use crate::collector::FileType;
use crate::error::{Error, Result};
use crate::knowledge::Document;

// ============================================================================
// Document Loader
// ============================================================================

/// 파일 → 문서 로더
#[derive(Debug, Default, Clone)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// 파일 하나를 로드
    ///
    /// 지원하지 않는 확장자는 `UnsupportedFormat`, 읽기/파싱 실패는 `Load`.
    /// 추출된 텍스트가 없으면 경고 후 빈 목록을 반환합니다.
    pub async fn load_file(&self, path: &Path) -> Result<Vec<Document>> {
        let file_type = FileType::from_path(path)?;
        let source = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());

        tracing::debug!("Loading {} as {}", source, file_type.as_str());

        let documents = match file_type {
            FileType::Text => {
                let text = read_utf8(path, &source).await?;
                vec![Document::new(&source, text).with_title(file_name)]
            }
            FileType::Csv => {
                let text = read_utf8(path, &source).await?;
                csv::csv_to_documents(&source, &text)
                    .into_iter()
                    .map(|doc| doc.with_title(file_name.clone()))
                    .collect()
            }
            FileType::Markdown => {
                let raw = read_utf8(path, &source).await?;
                let rendered = markdown::markdown_to_text(&raw);
                vec![Document::new(&source, rendered.text).with_title(rendered.title.or(file_name))]
            }
            FileType::Html => {
                let raw = read_bytes(path, &source).await?;
                let (title, text) = html_to_text(&String::from_utf8_lossy(&raw));
                vec![Document::new(&source, text).with_title(title.or(file_name))]
            }
            FileType::Word => {
                let raw = read_bytes(path, &source).await?;
                let text = word::extract_word_text(&raw).map_err(|e| Error::load(&source, e))?;
                vec![Document::new(&source, text).with_title(file_name)]
            }
            FileType::Pdf => {
                // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
                let pdf_path = path.to_path_buf();
                let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&pdf_path))
                    .await
                    .map_err(|e| Error::load(&source, format!("PDF extraction task failed: {}", e)))?
                    .map_err(|e| Error::load(&source, e))?;

                pages
                    .into_iter()
                    .map(|(page, text)| {
                        Document::new(&source, text)
                            .with_title(file_name.clone())
                            .with_page(page)
                    })
                    .collect()
            }
        };

        let documents: Vec<Document> = documents
            .into_iter()
            .filter(|doc| !doc.text.trim().is_empty())
            .collect();

        if documents.is_empty() {
            tracing::warn!("No text extracted from {}", source);
        }

        Ok(documents)
    }
}

/// HTML 파싱 (제목, 본문) - `Html`은 Send가 아니므로 동기 함수에서만 사용
fn html_to_text(raw: &str) -> (Option<String>, String) {
    let document = scraper::Html::parse_document(raw);
    (html::extract_title(&document), html::extract_body_text(&document))
}

async fn read_bytes(path: &Path, source: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| Error::load(source, e))
}

async fn read_utf8(path: &Path, source: &str) -> Result<String> {
    let bytes = read_bytes(path, source).await?;
    String::from_utf8(bytes).map_err(|e| Error::load(source, format!("not valid UTF-8: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
