//! Vector Index - 벡터 검색 트레이트 및 유틸리티
//!
//! 두 가지 구현이 있습니다:
//! - `LocalIndex`: 프로세스 내 코사인 검색 + 버전 관리되는 인덱스 파일
//! - `ManagedIndex`: 원격 관리형 벡터 인덱스 서비스

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::document::{Chunk, ChunkMetadata};

/// 기본 검색 결과 개수
pub const DEFAULT_TOP_K: usize = 4;

/// 유사도 메트릭 (코사인만 지원)
pub const METRIC_COSINE: &str = "cosine";

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// 엔트리 ID (문서 지문 + 청크 순번에서 유도)
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    /// 임베딩 벡터
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    /// 청크와 임베딩으로 엔트리 생성
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.metadata.entry_id(),
            text: chunk.text,
            vector,
            metadata: chunk.metadata,
        }
    }
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 청크 텍스트
    pub text: String,
    pub metadata: ChunkMetadata,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub score: f32,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// VectorIndex 트레이트 (async)
///
/// 벡터 인덱스의 공통 인터페이스입니다.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 엔트리 삽입 (같은 ID는 덮어씀)
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<usize>;

    /// 유사도 내림차순으로 최대 k개 반환
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// 인덱스에 기록된 임베딩 차원
    fn dimension(&self) -> usize;

    /// 엔트리 개수
    async fn count(&self) -> Result<usize>;

    /// 해당 지문의 문서가 이미 수집되었는지
    async fn contains_document(&self, fingerprint: &str) -> Result<bool>;

    /// 변경 사항 영구 저장 (원격 인덱스는 no-op)
    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    /// 백엔드 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// 벡터 길이가 인덱스 차원과 같은지 확인
pub fn ensure_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// 점수 내림차순 정렬 후 k개로 자르기 (동점은 삽입 순서 유지)
pub fn rank_hits(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(k);
    hits
}

// ============================================================================
// Tests
// ============================================================================
