//! 로컬 ONNX 임베딩 (fastembed)
//!
//! 모델은 첫 사용 시 캐시 디렉토리로 내려받습니다.
//! 추론은 CPU 작업이므로 spawn_blocking에서 실행합니다.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{Error, Result};
use crate::knowledge::ensure_dimension;

use super::EmbeddingProvider;

/// fastembed 기반 로컬 임베딩
pub struct LocalEmbedding {
    model: Arc<TextEmbedding>,
    model_id: String,
    dimension: usize,
}

impl LocalEmbedding {
    /// 모델 이름으로 생성
    pub fn new(model_name: &str) -> Result<Self> {
        let (model_enum, dimension) = match model_name {
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                (EmbeddingModel::AllMiniLML6V2, 384)
            }
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            other => {
                return Err(Error::StartupConfig(format!(
                    "EMBEDDING_MODEL: unsupported local model '{}'",
                    other
                )))
            }
        };

        let model = TextEmbedding::try_new(
            InitOptions::new(model_enum).with_show_download_progress(false),
        )
        .map_err(|e| Error::EmbeddingProvider(format!("failed to load model {}: {}", model_name, e)))?;

        Ok(Self {
            model: Arc::new(model),
            model_id: model_name.trim_start_matches("sentence-transformers/").to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingProvider("empty embedding output".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| Error::EmbeddingProvider(format!("embedding task failed: {}", e)))?
            .map_err(|e| Error::EmbeddingProvider(e.to_string()))?;

        for vector in &vectors {
            ensure_dimension(self.dimension, vector)?;
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn name(&self) -> &str {
        "local"
    }
}
