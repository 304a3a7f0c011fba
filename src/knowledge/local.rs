//! Local Vector Index - 파일 기반 인덱스
//!
//! 모든 벡터를 메모리에 올려 코사인 유사도로 전수 검색합니다.
//! 이력서/프로필 규모(수백 청크)에서는 충분히 빠릅니다.
//!
//! 저장 형식 (JSON):
//! ```text
//! { "format": "persona-rag-index", "version": 1, "dimension": 384,
//!   "model": "hashed-384", "metric": "cosine", "created_at": "...",
//!   "entries": [ { "id", "text", "vector", "metadata" }, ... ] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::vector::{
    cosine_similarity, ensure_dimension, rank_hits, IndexEntry, SearchHit, VectorIndex,
    METRIC_COSINE,
};

/// 인덱스 파일 이름
pub const INDEX_FILE_NAME: &str = "index.json";

const FORMAT_TAG: &str = "persona-rag-index";
const FORMAT_VERSION: u32 = 1;

// ============================================================================
// File Format
// ============================================================================

/// 파일 헤더만 먼저 읽기 위한 구조 (entries 무시)
#[derive(Debug, Deserialize)]
struct IndexHeader {
    format: String,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format: String,
    version: u32,
    dimension: usize,
    model: String,
    metric: String,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

// ============================================================================
// LocalIndex
// ============================================================================

/// 로컬 파일 인덱스
#[derive(Debug)]
pub struct LocalIndex {
    path: PathBuf,
    dimension: usize,
    model: String,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
    /// id → entries 위치
    positions: HashMap<String, usize>,
}

impl LocalIndex {
    /// 빈 인덱스 생성 (아직 저장되지 않음)
    pub fn create(path: &Path, dimension: usize, model: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            dimension,
            model: model.into(),
            created_at: Utc::now(),
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// 기본 위치: `<persist_directory>/index.json`
    pub fn default_path(persist_directory: &Path) -> PathBuf {
        persist_directory.join(INDEX_FILE_NAME)
    }

    /// 인덱스 파일 로드
    ///
    /// 형식/버전/차원/모델을 검증합니다. 파일이 없으면 `IndexNotFound`.
    pub fn load(path: &Path, dimension: usize, model: &str) -> Result<Self> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::IndexNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let format_error = |reason: String| Error::IndexFormat {
            path: path.to_path_buf(),
            reason,
        };

        // 1. 헤더 확인 (본문 역직렬화 전에 호환성 판단)
        let header: IndexHeader =
            serde_json::from_slice(&raw).map_err(|e| format_error(format!("unreadable header: {}", e)))?;
        if header.format != FORMAT_TAG {
            return Err(format_error(format!("unknown format tag '{}'", header.format)));
        }
        if header.version != FORMAT_VERSION {
            return Err(format_error(format!(
                "unsupported version {} (expected {})",
                header.version, FORMAT_VERSION
            )));
        }

        // 2. 본문
        let file: IndexFile =
            serde_json::from_slice(&raw).map_err(|e| format_error(format!("corrupt body: {}", e)))?;

        if file.metric != METRIC_COSINE {
            return Err(format_error(format!("unsupported metric '{}'", file.metric)));
        }

        // 3. 임베딩 설정과 일치 여부
        if file.dimension != dimension {
            return Err(Error::DimensionMismatch {
                expected: file.dimension,
                actual: dimension,
            });
        }
        if file.model != model {
            return Err(Error::EmbeddingModelMismatch {
                indexed: file.model,
                configured: model.to_string(),
            });
        }

        for entry in &file.entries {
            if entry.vector.len() != file.dimension {
                return Err(format_error(format!(
                    "entry {} has {} dimensions, header says {}",
                    entry.id,
                    entry.vector.len(),
                    file.dimension
                )));
            }
        }

        let mut index = Self {
            path: path.to_path_buf(),
            dimension: file.dimension,
            model: file.model,
            created_at: file.created_at,
            entries: Vec::with_capacity(file.entries.len()),
            positions: HashMap::new(),
        };
        for entry in file.entries {
            index.insert(entry);
        }

        tracing::debug!("Loaded local index {:?} ({} entries)", path, index.entries.len());
        Ok(index)
    }

    /// 파일이 있으면 로드, 없으면 빈 인덱스 생성 (수집용)
    pub fn open_or_create(path: &Path, dimension: usize, model: &str) -> Result<Self> {
        match Self::load(path, dimension, model) {
            Ok(index) => Ok(index),
            Err(Error::IndexNotFound(_)) => {
                tracing::info!("Creating new local index at {:?} (dimension {})", path, dimension);
                Ok(Self::create(path, dimension, model))
            }
            Err(e) => Err(e),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: IndexEntry) {
        match self.positions.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// 인덱스를 파일로 저장 (임시 파일에 쓴 뒤 rename)
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = IndexFile {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            dimension: self.dimension,
            model: self.model.clone(),
            metric: METRIC_COSINE.to_string(),
            created_at: self.created_at,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&file).map_err(|e| Error::IndexFormat {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::info!("Saved local index {:?} ({} entries)", self.path, self.entries.len());
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<usize> {
        for entry in &entries {
            ensure_dimension(self.dimension, &entry.vector)?;
        }

        let count = entries.len();
        for entry in entries {
            self.insert(entry);
        }
        Ok(count)
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_dimension(self.dimension, query)?;

        let hits = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    async fn contains_document(&self, fingerprint: &str) -> Result<bool> {
        Ok(self
            .entries
            .iter()
            .any(|e| e.metadata.document.fingerprint == fingerprint))
    }

    async fn persist(&self) -> Result<()> {
        self.save()
    }

    fn name(&self) -> &str {
        "local"
    }
}

// ============================================================================
// Tests
// ============================================================================
