//! Managed Vector Index - 원격 관리형 벡터 인덱스
//!
//! 인덱스 이름 + API 키 + environment로 접속하는 REST 서비스 클라이언트입니다.
//! ref: https://docs.pinecone.io/reference (legacy controller API)
//!
//! - 컨트롤 플레인: `https://controller.{environment}.pinecone.io`
//! - 데이터 플레인: describe 결과의 `status.host`
//!
//! 청크 텍스트와 메타데이터는 벡터 메타데이터에 함께 저장합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::document::{ChunkMetadata, DocumentMetadata};
use super::vector::{ensure_dimension, rank_hits, IndexEntry, SearchHit, VectorIndex};

/// 업서트 요청당 최대 벡터 수
const UPSERT_BATCH_SIZE: usize = 100;
/// 인덱스 준비 대기 간격
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// 인덱스 준비 최대 대기 횟수
const READY_MAX_POLLS: u32 = 60;

/// 메타데이터 내 청크 텍스트 키
const TEXT_KEY: &str = "text";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
}

/// describe_index 응답
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub database: IndexDatabase,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDatabase {
    pub name: String,
    pub dimension: usize,
    #[serde(default)]
    pub metric: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(rename = "includeValues")]
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct IndexStatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: usize,
}

// ============================================================================
// Control Plane
// ============================================================================

/// 관리형 인덱스 컨트롤 플레인 클라이언트
#[derive(Debug, Clone)]
pub struct ManagedIndexClient {
    client: reqwest::Client,
    api_key: String,
    controller_url: String,
}

impl ManagedIndexClient {
    /// environment로 컨트롤러 URL 구성
    pub fn new(api_key: String, environment: &str) -> Result<Self> {
        Self::with_controller_url(api_key, format!("https://controller.{}.pinecone.io", environment))
    }

    /// 컨트롤러 URL 직접 지정
    pub fn with_controller_url(api_key: String, controller_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::VectorIndex(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            controller_url: controller_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 인덱스 이름 목록
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/databases", self.controller_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "list indexes").await?;
        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| Error::VectorIndex(format!("invalid list indexes response: {}", e)))
    }

    /// 인덱스 생성
    pub async fn create_index(&self, name: &str, dimension: usize, metric: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/databases", self.controller_url))
            .header("Api-Key", &self.api_key)
            .json(&CreateIndexRequest {
                name,
                dimension,
                metric,
            })
            .send()
            .await
            .map_err(request_error)?;

        check_status(response, "create index").await?;
        Ok(())
    }

    /// 인덱스가 없으면 생성
    ///
    /// # Returns
    /// 새로 생성했으면 true
    pub async fn create_if_absent(&self, name: &str, dimension: usize, metric: &str) -> Result<bool> {
        if self.list_indexes().await?.iter().any(|n| n == name) {
            tracing::debug!("Managed index '{}' already exists", name);
            return Ok(false);
        }

        tracing::info!("Creating new managed index {} of dimension {}", name, dimension);
        self.create_index(name, dimension, metric).await?;
        Ok(true)
    }

    /// 인덱스 정보 조회
    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let response = self
            .client
            .get(format!("{}/databases/{}", self.controller_url, name))
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "describe index").await?;
        response
            .json::<IndexDescription>()
            .await
            .map_err(|e| Error::VectorIndex(format!("invalid describe response: {}", e)))
    }

    /// 데이터 플레인 연결 (인덱스가 준비될 때까지 대기)
    pub async fn connect(&self, name: &str) -> Result<ManagedIndex> {
        let mut polls = 0;
        let description = loop {
            let description = self.describe_index(name).await?;
            if description.status.ready {
                break description;
            }
            polls += 1;
            if polls >= READY_MAX_POLLS {
                return Err(Error::VectorIndex(format!("index '{}' did not become ready", name)));
            }
            tracing::debug!("Waiting for index '{}' to become ready", name);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        };

        if let Some(metric) = description.database.metric.as_deref() {
            if metric != super::vector::METRIC_COSINE {
                return Err(Error::VectorIndex(format!(
                    "index '{}' uses metric '{}', cosine is required",
                    name, metric
                )));
            }
        }

        let host = description
            .status
            .host
            .ok_or_else(|| Error::VectorIndex(format!("index '{}' has no host", name)))?;

        Ok(ManagedIndex {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: normalize_host(&host),
            name: description.database.name,
            dimension: description.database.dimension,
        })
    }
}

// ============================================================================
// Data Plane
// ============================================================================

/// 원격 관리형 인덱스
#[derive(Debug, Clone)]
pub struct ManagedIndex {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    name: String,
    dimension: usize,
}

impl ManagedIndex {
    pub fn index_name(&self) -> &str {
        &self.name
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T, action: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        check_status(response, action).await
    }
}

#[async_trait]
impl VectorIndex for ManagedIndex {
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<usize> {
        for entry in &entries {
            ensure_dimension(self.dimension, &entry.vector)?;
        }

        let mut total = 0;
        for batch in entries.chunks(UPSERT_BATCH_SIZE) {
            let vectors = batch
                .iter()
                .map(|entry| {
                    Ok(UpsertVector {
                        id: &entry.id,
                        values: &entry.vector,
                        metadata: metadata_to_json(&entry.text, &entry.metadata)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let response = self
                .post("/vectors/upsert", &UpsertRequest { vectors }, "upsert")
                .await?;
            let parsed: UpsertResponse = response
                .json()
                .await
                .map_err(|e| Error::VectorIndex(format!("invalid upsert response: {}", e)))?;

            tracing::debug!("Upserted {} vectors into '{}'", parsed.upserted_count, self.name);
            total += parsed.upserted_count;
        }

        Ok(total)
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_dimension(self.dimension, query)?;

        let request = QueryRequest {
            vector: query,
            top_k: k,
            include_metadata: true,
            include_values: false,
        };
        let response = self.post("/query", &request, "query").await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorIndex(format!("invalid query response: {}", e)))?;

        let hits = parsed
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                let (text, metadata) = metadata_from_json(&m.id, metadata)?;
                Ok(SearchHit {
                    text,
                    metadata,
                    score: m.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rank_hits(hits, k))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .post("/describe_index_stats", &Map::new(), "describe index stats")
            .await?;
        let stats: IndexStatsResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorIndex(format!("invalid stats response: {}", e)))?;
        Ok(stats.total_vector_count)
    }

    async fn contains_document(&self, fingerprint: &str) -> Result<bool> {
        // 문서의 첫 청크 ID로 존재 여부 판단
        let id = super::document::entry_id(fingerprint, 0);
        let response = self
            .client
            .get(format!("{}/vectors/fetch", self.base_url))
            .header("Api-Key", &self.api_key)
            .query(&[("ids", id.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "fetch").await?;
        let parsed: FetchResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorIndex(format!("invalid fetch response: {}", e)))?;
        Ok(parsed.vectors.contains_key(&id))
    }

    fn name(&self) -> &str {
        "managed"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn request_error(e: reqwest::Error) -> Error {
    Error::VectorIndex(format!("request failed: {}", e))
}

/// 실패 상태 코드를 에러로 변환
async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::VectorIndex(format!("{} failed ({}): {}", action, status, body)))
}

/// 스킴 없는 호스트에 https:// 부여
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// 청크 메타데이터 → 평탄한 벡터 메타데이터 (+ text)
fn metadata_to_json(text: &str, metadata: &ChunkMetadata) -> Result<Map<String, Value>> {
    let value = serde_json::to_value(metadata)
        .map_err(|e| Error::VectorIndex(format!("failed to encode metadata: {}", e)))?;
    let mut map = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
    Ok(map)
}

/// 벡터 메타데이터 → (텍스트, 청크 메타데이터)
///
/// 서비스가 정수를 실수(1.0)로 돌려주므로 숫자는 직접 변환합니다.
fn metadata_from_json(id: &str, mut map: Map<String, Value>) -> Result<(String, ChunkMetadata)> {
    let missing = |key: &str| Error::VectorIndex(format!("match {} has no '{}' metadata", id, key));

    let text = match map.remove(TEXT_KEY) {
        Some(Value::String(text)) => text,
        _ => return Err(missing(TEXT_KEY)),
    };
    let string = |map: &Map<String, Value>, key: &str| {
        map.get(key).and_then(Value::as_str).map(str::to_string)
    };
    let number = |map: &Map<String, Value>, key: &str| {
        map.get(key)
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)))
            .map(|n| n as usize)
    };

    let metadata = ChunkMetadata {
        document: DocumentMetadata {
            source: string(&map, "source").ok_or_else(|| missing("source"))?,
            title: string(&map, "title"),
            page: number(&map, "page"),
            row: number(&map, "row"),
            fingerprint: string(&map, "fingerprint").unwrap_or_default(),
        },
        chunk_index: number(&map, "chunk_index").unwrap_or(0),
    };

    Ok((text, metadata))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::document::Document;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("cv-1.svc.pinecone.io"), "https://cv-1.svc.pinecone.io");
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_metadata_json_roundtrip_with_float_numbers() {
        let doc = Document::new("cv.pdf", "page text")
            .with_title(Some("CV".to_string()))
            .with_page(2);
        let meta = ChunkMetadata {
            document: doc.metadata.clone(),
            chunk_index: 3,
        };

        let mut map = metadata_to_json("chunk text", &meta).unwrap();
        assert_eq!(map["text"], "chunk text");

        // 서비스가 돌려주는 형태 흉내
        map.insert("page".to_string(), serde_json::json!(2.0));
        map.insert("chunk_index".to_string(), serde_json::json!(3.0));

        let (text, parsed) = metadata_from_json("id-1", map).unwrap();
        assert_eq!(text, "chunk text");
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_metadata_without_text_is_error() {
        let map = Map::new();
        assert!(matches!(
            metadata_from_json("id-1", map),
            Err(Error::VectorIndex(_))
        ));
    }

    #[test]
    fn test_controller_url() {
        let client = ManagedIndexClient::new("key".to_string(), "us-west1-gcp").unwrap();
        assert_eq!(client.controller_url, "https://controller.us-west1-gcp.pinecone.io");
    }
}
