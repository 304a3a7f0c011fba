//! OpenAI 호환 임베딩 API
//!
//! source: https://platform.openai.com/docs/api-reference/embeddings
//!
//! `EMBEDDING_BATCH_SIZE` 단위로 나눠 요청합니다. 재시도는 하지 않습니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::knowledge::ensure_dimension;

use super::EmbeddingProvider;

/// 기본 모델
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// 모델별 기본 차원
fn model_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// OpenAI 임베딩 구현체
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
    /// 차원 축소 요청 여부 (text-embedding-3-* 전용)
    request_dimensions: bool,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `base_url` - API 루트 (예: `https://api.openai.com/v1`)
    /// * `model` - None이면 `text-embedding-ada-002`
    /// * `dimension` - 차원 재지정 (모델 표에 없는 모델이면 필수)
    pub fn new(
        api_key: String,
        base_url: &str,
        model: Option<String>,
        dimension: Option<usize>,
        batch_size: usize,
    ) -> Result<Self> {
        let model = model.unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string());
        let table_dimension = model_dimension(&model);

        let dimension = dimension.or(table_dimension).ok_or_else(|| {
            Error::StartupConfig(format!(
                "EMBEDDING_DIMENSION is required for unknown embedding model '{}'",
                model
            ))
        })?;
        let request_dimensions = model.starts_with("text-embedding-3") && Some(dimension) != table_dimension;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::EmbeddingProvider(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            dimension,
            request_dimensions,
            batch_size: batch_size.max(1),
        })
    }

    /// 한 번의 API 요청
    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.request_dimensions.then_some(self.dimension),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingProvider(format!("failed to send embedding request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::EmbeddingProvider(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                return Err(Error::EmbeddingProvider(format!(
                    "API error ({}): {}",
                    status, error.error.message
                )));
            }
            return Err(Error::EmbeddingProvider(format!("API error ({}): {}", status, body)));
        }

        let mut parsed: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| Error::EmbeddingProvider(format!("failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != expected {
            return Err(Error::EmbeddingProvider(format!(
                "expected {} embeddings, got {}",
                expected,
                parsed.data.len()
            )));
        }

        // 응답 순서는 보장되지 않으므로 index로 정렬
        parsed.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        for vector in &vectors {
            ensure_dimension(self.dimension, vector)?;
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingProvider("empty embedding response".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // API가 빈 입력을 거부하므로 공백 텍스트는 영벡터
        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|t| t.trim().is_empty().then(|| vec![0.0; self.dimension]))
            .collect();

        let pending: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(i, _)| results[*i].is_none())
            .map(|(i, t)| (i, t.as_str()))
            .collect();

        let total_batches = pending.len().div_ceil(self.batch_size);
        for (batch_no, batch) in pending.chunks(self.batch_size).enumerate() {
            tracing::debug!("Embedding batch {}/{} ({} texts)", batch_no + 1, total_batches, batch.len());

            let vectors = self.request(batch.iter().map(|(_, t)| *t).collect()).await?;
            for ((i, _), vector) in batch.iter().zip(vectors) {
                results[*i] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai"
    }
}
