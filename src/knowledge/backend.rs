//! 인덱스 백엔드 선택
//!
//! `INDEX_BACKEND` 설정에 따라 로컬 파일 인덱스 또는 관리형 인덱스를 엽니다.

use crate::config::{IndexBackend, Settings};
use crate::embedding::{probe_dimension, EmbeddingProvider};
use crate::error::{Error, Result};

use super::local::LocalIndex;
use super::managed::ManagedIndexClient;
use super::vector::{VectorIndex, METRIC_COSINE};

/// 인덱스를 여는 목적
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// 수집: 없으면 생성
    Ingest,
    /// 질의: 없으면 에러
    Query,
}

/// 설정된 백엔드의 인덱스 열기
///
/// 인덱스 차원(과 로컬 인덱스의 모델)이 임베딩 프로바이더와 다르면 에러입니다.
pub async fn open_index(
    settings: &Settings,
    embedder: &dyn EmbeddingProvider,
    mode: IndexMode,
) -> Result<Box<dyn VectorIndex>> {
    let index: Box<dyn VectorIndex> = match settings.index.backend {
        IndexBackend::Local => {
            let path = LocalIndex::default_path(&settings.index.persist_directory);
            let index = match mode {
                IndexMode::Ingest => {
                    LocalIndex::open_or_create(&path, embedder.dimension(), embedder.model_id())?
                }
                IndexMode::Query => LocalIndex::load(&path, embedder.dimension(), embedder.model_id())?,
            };
            Box::new(index)
        }
        IndexBackend::Managed => {
            let managed = settings.index.managed.as_ref().ok_or_else(|| {
                Error::StartupConfig("managed index settings are missing".to_string())
            })?;

            let client = match managed.controller_url.as_deref() {
                Some(url) => ManagedIndexClient::with_controller_url(managed.api_key.clone(), url)?,
                None => ManagedIndexClient::new(managed.api_key.clone(), &managed.environment)?,
            };

            if mode == IndexMode::Ingest {
                let dimension = probe_dimension(embedder).await?;
                client
                    .create_if_absent(&managed.index_name, dimension, METRIC_COSINE)
                    .await?;
            }

            Box::new(client.connect(&managed.index_name).await?)
        }
    };

    if index.dimension() != embedder.dimension() {
        return Err(Error::DimensionMismatch {
            expected: index.dimension(),
            actual: embedder.dimension(),
        });
    }

    tracing::debug!("Opened {} index (dimension {})", index.name(), index.dimension());
    Ok(index)
}
