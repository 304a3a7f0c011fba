//! 문서 / 청크 타입
//!
//! 로더가 만든 `Document`는 이후 변경되지 않으며, 청커가 `Chunk`로 나눕니다.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Types
// ============================================================================

/// 문서 메타데이터 (청크에 상속됨)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 파일 경로 또는 URL
    pub source: String,
    /// 제목 (HTML <title>, 파일명 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// PDF 페이지 번호 (1부터 시작)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// CSV 행 번호 (0부터 시작)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// source + text의 SHA-256 (재수집 판단 및 엔트리 ID 유도)
    pub fingerprint: String,
}

/// 로드된 문서
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// 새 문서 생성 (fingerprint 자동 계산)
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        let fingerprint = fingerprint(&source, &text);

        Self {
            text,
            metadata: DocumentMetadata {
                source,
                title: None,
                page: None,
                row: None,
                fingerprint,
            },
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.metadata.title = title;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.metadata.page = Some(page);
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.metadata.row = Some(row);
        self
    }
}

/// 청크 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    /// 문서 내 청크 순번 (0-based)
    pub chunk_index: usize,
}

impl ChunkMetadata {
    /// 인덱스 엔트리 ID (같은 청크는 항상 같은 ID)
    pub fn entry_id(&self) -> String {
        entry_id(&self.document.fingerprint, self.chunk_index)
    }
}

/// 문서에서 잘라낸 청크
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// source와 text로 문서 지문 계산
pub fn fingerprint(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    to_hex(&hasher.finalize())
}

/// 문서 지문 + 청크 순번 → 엔트리 ID
pub fn entry_id(fingerprint: &str, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(chunk_index.to_le_bytes());
    // 앞 16바이트면 충분
    to_hex(&hasher.finalize()[..16])
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_stable() {
        let a = Document::new("resume.txt", "Alice is a software engineer.");
        let b = Document::new("resume.txt", "Alice is a software engineer.");
        assert_eq!(a.metadata.fingerprint, b.metadata.fingerprint);
        assert_eq!(a.metadata.fingerprint.len(), 64);
    }

    #[test]
    fn test_fingerprint_depends_on_source() {
        let a = Document::new("a.txt", "same");
        let b = Document::new("b.txt", "same");
        assert_ne!(a.metadata.fingerprint, b.metadata.fingerprint);
    }

    #[test]
    fn test_entry_id() {
        let fp = fingerprint("a.txt", "text");
        assert_eq!(entry_id(&fp, 0), entry_id(&fp, 0));
        assert_ne!(entry_id(&fp, 0), entry_id(&fp, 1));
        assert_eq!(entry_id(&fp, 3).len(), 32);
    }

    #[test]
    fn test_chunk_metadata_flattens_document() {
        let doc = Document::new("cv.pdf", "text").with_page(2);
        let meta = ChunkMetadata {
            document: doc.metadata,
            chunk_index: 1,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["source"], "cv.pdf");
        assert_eq!(json["page"], 2);
        assert_eq!(json["chunk_index"], 1);
        assert!(json.get("row").is_none());
    }
}
