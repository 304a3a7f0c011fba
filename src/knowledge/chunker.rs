//! Text Chunking Module
//!
//! 문서를 임베딩 단위인 고정 크기 윈도우로 나눕니다.
//! 가능하면 문단 > 줄 > 문장 > 단어 경계에서 자르고,
//! 인접 청크는 정확히 `chunk_overlap` 문자를 공유합니다.

use super::document::{Chunk, ChunkMetadata, Document};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (단위: 문자 수)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 최대 청크 크기
    pub chunk_size: usize,
    /// 인접 청크 간 오버랩
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// 검증 후 생성 (`chunk_overlap < chunk_size`)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Option<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return None;
        }
        Some(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WindowChunker
// ============================================================================

/// 경계 우선순위
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    /// `chars[..end]`이 이 경계에서 끝나는지
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        match self {
            Boundary::Paragraph => last == '\n' && end >= 2 && chars[end - 2] == '\n',
            Boundary::Line => last == '\n',
            Boundary::Sentence => {
                last.is_whitespace() && end >= 2 && matches!(chars[end - 2], '.' | '!' | '?')
            }
            Boundary::Word => last.is_whitespace(),
        }
    }
}

/// 오버랩 고정 윈도우 청커
///
/// - 각 청크 길이 <= `chunk_size`
/// - `c0 + c1[overlap..] + c2[overlap..] + ...` == 원문
/// - 같은 입력/설정이면 항상 같은 결과
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// `start`에서 시작하는 윈도우의 끝 위치 (문자 인덱스, exclusive)
    fn window_end(&self, chars: &[char], start: usize) -> usize {
        let ChunkConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;
        let max_end = start + chunk_size;

        // 다음 윈도우가 앞으로 나아가려면 end > start + overlap
        let progress_floor = start + chunk_overlap + 1;
        // 구조적 경계는 윈도우 후반부에서만 (너무 작은 청크 방지)
        let structural_floor = progress_floor.max(start + chunk_size / 2);

        for boundary in BOUNDARIES {
            let floor = match boundary {
                Boundary::Word => progress_floor,
                _ => structural_floor,
            };
            if let Some(end) = (floor..=max_end).rev().find(|&e| boundary.ends_at(chars, e)) {
                return end;
            }
        }

        // 경계 없음 - 강제 분할
        max_end
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        let chars: Vec<char> = text.chars().collect();
        // 문자 인덱스 → 바이트 오프셋 (끝 위치 포함)
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if start + self.config.chunk_size >= total {
                chunks.push(text[offsets[start]..].to_string());
                break;
            }

            let end = self.window_end(&chars, start);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            start = end - self.config.chunk_overlap;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WindowChunker"
    }
}

// ============================================================================
// Document Splitting
// ============================================================================

/// 문서 목록을 청크 목록으로 분할 (원본 순서 유지)
pub fn split_documents(chunker: &dyn Chunker, documents: &[Document]) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            chunker
                .chunk(&doc.text)
                .into_iter()
                .enumerate()
                .map(move |(chunk_index, text)| Chunk {
                    text,
                    metadata: ChunkMetadata {
                        document: doc.metadata.clone(),
                        chunk_index,
                    },
                })
        })
        .collect()
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 윈도우 청커 생성 (설정 지정)
pub fn window_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(WindowChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================
