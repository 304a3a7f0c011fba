//! 에러 타입
//!
//! 라이브러리 전체에서 사용하는 에러 분류입니다.
//! CLI 경계에서는 anyhow로 감싸서 컨텍스트를 추가합니다.

use std::path::PathBuf;

/// persona-rag 에러
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 시작 시 설정 오류 (.env 누락, 잘못된 값 등) - 프로세스 중단
    #[error("configuration error: {0}")]
    StartupConfig(String),

    /// 로더가 등록되지 않은 확장자
    #[error("unsupported file extension '{extension}': {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// 개별 파일/URL 로드 실패
    #[error("failed to load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// 임베딩 API 또는 로컬 모델 오류
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// 인덱스와 쿼리 벡터의 차원 불일치
    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 인덱스가 다른 임베딩 모델로 만들어짐
    #[error("index was built with embedding model '{indexed}', but '{configured}' is configured")]
    EmbeddingModelMismatch { indexed: String, configured: String },

    /// 인덱스 파일 형식 오류 (손상, 버전 불일치)
    #[error("invalid index file {}: {reason}", .path.display())]
    IndexFormat { path: PathBuf, reason: String },

    /// 인덱스 파일 없음 (ingest 먼저 실행 필요)
    #[error("index not found at {} (run `persona-rag ingest` first)", .0.display())]
    IndexNotFound(PathBuf),

    /// 관리형 벡터 인덱스 서비스 오류
    #[error("vector index error: {0}")]
    VectorIndex(String),

    /// 채팅 완성 스트림 실패 (부분 응답은 폐기됨)
    #[error("completion stream failed: {0}")]
    CompletionStream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// persona-rag Result
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Load {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
