//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환하는 프로바이더입니다.
//! 백엔드는 시작 시 `EMBEDDINGS_BACKEND`로 한 번 결정됩니다.
//!
//! - `openai`: 호스팅 `/embeddings` API (배치 요청)
//! - `local`: 프로세스 내 ONNX 모델 (`local-embeddings` feature, 기본 활성)
//! - `hashed`: 결정적 해시 임베딩 (항상 사용 가능)
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&settings)?;
//! let vector = embedder.embed("Hello, world!").await?;
//! ```

mod hashed;
#[cfg(feature = "local-embeddings")]
mod local;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingBackend, Settings};
use crate::error::{Error, Result};

pub use hashed::{HashedEmbedding, DEFAULT_HASHED_DIMENSION};
#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedding;
pub use openai::OpenAiEmbedding;

/// 로컬 모델 기본값
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 같은 인스턴스는 항상 같은 차원의 벡터를 반환합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (입력 순서 유지, 기본 구현: 순차 호출)
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 식별자 (인덱스에 기록되어 모델 변경 감지에 사용)
    fn model_id(&self) -> &str;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

/// "test"를 임베딩해 실제 차원 확인 (관리형 인덱스 생성용)
pub async fn probe_dimension(provider: &dyn EmbeddingProvider) -> Result<usize> {
    let vector = provider.embed("test").await?;
    Ok(vector.len())
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 임베딩 프로바이더 생성
pub fn create_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &settings.embedding;

    let embedder: Arc<dyn EmbeddingProvider> = match embedding.backend {
        EmbeddingBackend::OpenAi => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                Error::StartupConfig("OPENAI_API_KEY is required for openai embeddings".to_string())
            })?;
            Arc::new(OpenAiEmbedding::new(
                api_key,
                &settings.openai_base_url,
                embedding.model.clone(),
                embedding.dimension,
                embedding.batch_size,
            )?)
        }
        EmbeddingBackend::Local => create_local(settings)?,
        EmbeddingBackend::Hashed => Arc::new(HashedEmbedding::new(
            embedding.dimension.unwrap_or(DEFAULT_HASHED_DIMENSION),
        )),
    };

    tracing::info!(
        "Using {} embeddings {} (dimension: {})",
        embedder.name(),
        embedder.model_id(),
        embedder.dimension()
    );
    Ok(embedder)
}

#[cfg(feature = "local-embeddings")]
fn create_local(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let model = settings
        .embedding
        .model
        .as_deref()
        .unwrap_or(DEFAULT_LOCAL_MODEL);
    Ok(Arc::new(LocalEmbedding::new(model)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn create_local(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    tracing::warn!(
        "Local embedding model requested but 'local-embeddings' feature is not enabled, falling back to hashed"
    );
    Ok(Arc::new(HashedEmbedding::new(
        settings.embedding.dimension.unwrap_or(DEFAULT_HASHED_DIMENSION),
    )))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_probe_dimension() {
        let embedder = HashedEmbedding::new(64);
        assert_eq!(probe_dimension(&embedder).await.unwrap(), 64);
    }

    #[test]
    fn test_create_hashed_embedder() {
        let settings = settings_from(&[
            ("EMBEDDINGS_BACKEND", "hashed"),
            ("EMBEDDING_DIMENSION", "32"),
        ]);
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.dimension(), 32);
        assert_eq!(embedder.model_id(), "hashed-32");
    }

    #[test]
    fn test_create_openai_embedder() {
        let settings = settings_from(&[("OPENAI_API_KEY", "k"), ("OPENAI_EMBEDDINGS", "true")]);
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.name(), "openai");
        assert_eq!(embedder.model_id(), "text-embedding-ada-002");
        assert_eq!(embedder.dimension(), 1536);
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_local_without_feature_falls_back_to_hashed() {
        let settings = settings_from(&[]);
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.name(), "hashed");
        assert_eq!(embedder.dimension(), DEFAULT_HASHED_DIMENSION);
    }

    #[cfg(feature = "local-embeddings")]
    #[test]
    fn test_local_backend_uses_onnx_model() {
        // 모델을 내려받기 전에 이름 검증에서 실패해야 함
        let settings = settings_from(&[("EMBEDDINGS_BACKEND", "local"), ("EMBEDDING_MODEL", "gpt-2")]);
        let err = create_embedder(&settings).err().unwrap();
        assert!(matches!(err, Error::StartupConfig(ref m) if m.contains("gpt-2")));
    }
}
