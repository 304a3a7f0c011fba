//! Knowledge 모듈 - 검색 증강 지식 저장소
//!
//! - Document/Chunk: 로드된 문서와 청크 타입
//! - Chunker: 오버랩 고정 윈도우 분할
//! - VectorIndex: 로컬 파일 인덱스 / 관리형 원격 인덱스
//! - Augment: 검색 결과를 질문 앞에 붙이기
//! - Ingest: 로드 → 청킹 → 임베딩 → 업서트 파이프라인

mod augment;
mod backend;
mod chunker;
mod document;
mod ingest;
mod local;
mod managed;
mod vector;

// Re-exports
pub use augment::{augment_query, SEARCH_RESULTS_END, SEARCH_RESULTS_START};
pub use backend::{open_index, IndexMode};
pub use chunker::{split_documents, window_chunker, ChunkConfig, Chunker, WindowChunker};
pub use document::{entry_id, fingerprint, Chunk, ChunkMetadata, Document, DocumentMetadata};
pub use ingest::{IngestFailure, IngestOptions, IngestReport, Ingestor};
pub use local::{LocalIndex, INDEX_FILE_NAME};
pub use managed::{IndexDescription, ManagedIndex, ManagedIndexClient};
pub use vector::{
    cosine_similarity, ensure_dimension, rank_hits, IndexEntry, SearchHit, VectorIndex,
    DEFAULT_TOP_K, METRIC_COSINE,
};
