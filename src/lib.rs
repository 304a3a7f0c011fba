//! persona-rag - 이력서 기반 페르소나 RAG 어시스턴트
//!
//! 개인 문서(이력서, 소개글, 프로필 페이지)를 청킹/임베딩하여 벡터 인덱스에 저장하고,
//! 질문과 가까운 청크를 검색 결과 블록으로 붙여 페르소나 역할의 답변을 스트리밍합니다.

pub mod chat;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod scraper;

// Re-exports
pub use chat::{
    build_system_prompt, create_completion, Assistant, ChatMessage, ChatSession, CompletionProvider,
    ConversationTurn, FragmentStream, Role,
};
pub use config::{Persona, Settings};
pub use embedding::{create_embedder, EmbeddingProvider, HashedEmbedding, OpenAiEmbedding};
pub use error::{Error, Result};
pub use knowledge::{
    augment_query, open_index, Chunk, ChunkConfig, Chunker, Document, IndexMode, IngestOptions,
    IngestReport, Ingestor, LocalIndex, ManagedIndex, SearchHit, VectorIndex,
};
pub use crate::scraper::{ScrapedContent, WebScraper};
