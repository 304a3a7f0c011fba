//! 수집 파이프라인
//!
//! 파일/URL 로드 → 청킹 → 임베딩 → 인덱스 업서트 → 저장
//!
//! 실패는 항목(파일, URL) 단위로 격리되어 `IngestReport.failures`에 기록됩니다.
//! `fail_fast`이면 첫 실패에서 중단합니다.

use std::path::Path;
use std::sync::Arc;

use crate::collector::FileCollector;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extractor::DocumentLoader;
use crate::scraper::WebScraper;

use super::chunker::{split_documents, Chunker};
use super::document::Document;
use super::vector::{ensure_dimension, IndexEntry, VectorIndex};

// ============================================================================
// Options / Report
// ============================================================================

/// 수집 옵션
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// 이미 수집된 문서도 다시 임베딩
    pub force: bool,
    /// 페르소나 URL 포함 여부
    pub include_urls: bool,
    /// 첫 실패에서 중단
    pub fail_fast: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            force: false,
            include_urls: true,
            fail_fast: false,
        }
    }
}

/// 항목별 실패
#[derive(Debug)]
pub struct IngestFailure {
    /// 파일 경로 또는 URL
    pub source: String,
    pub error: Error,
}

/// 수집 결과
#[derive(Debug, Default)]
pub struct IngestReport {
    /// 로드 시도한 파일 수
    pub files: usize,
    /// 로드 시도한 URL 수
    pub urls: usize,
    /// 새로 임베딩한 문서 수
    pub documents: usize,
    /// 이미 수집되어 건너뛴 문서 수
    pub skipped_documents: usize,
    /// 업서트한 청크 수
    pub chunks: usize,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// Ingestor
// ============================================================================

/// 수집기
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Box<dyn Chunker>,
    collector: FileCollector,
    loader: DocumentLoader,
    scraper: WebScraper,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunker: Box<dyn Chunker>) -> Result<Self> {
        Ok(Self {
            embedder,
            chunker,
            collector: FileCollector::with_defaults(),
            loader: DocumentLoader::new(),
            scraper: WebScraper::new()?,
        })
    }

    /// 소스 디렉토리와 URL을 인덱스에 수집
    ///
    /// 소스 디렉토리가 없거나 임베딩/인덱스 단계가 실패하면 전체 에러입니다.
    pub async fn run(
        &self,
        index: &mut dyn VectorIndex,
        source_directory: &Path,
        urls: &[String],
        options: IngestOptions,
    ) -> Result<IngestReport> {
        if index.dimension() != self.embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: index.dimension(),
                actual: self.embedder.dimension(),
            });
        }

        let mut report = IngestReport::default();
        let mut documents = Vec::new();

        // 1. 파일
        tracing::info!("Loading documents from {:?}", source_directory);
        let files = self.collector.collect_directory(source_directory)?;
        report.files = files.len();

        for file in &files {
            let source = file.path.display().to_string();
            let result = self.loader.load_file(&file.path).await;
            self.absorb(&mut report, &mut documents, source, result, options)?;
        }

        // 2. URL
        if options.include_urls && !urls.is_empty() {
            tracing::info!("Loading {} profile URLs", urls.len());
            report.urls = urls.len();

            for (url, result) in self.scraper.load_urls(urls).await {
                self.absorb(&mut report, &mut documents, url, result, options)?;
            }
        }

        // 3. 이미 수집된 문서 제외
        let mut fresh = Vec::with_capacity(documents.len());
        for doc in documents {
            if !options.force && index.contains_document(&doc.metadata.fingerprint).await? {
                tracing::debug!("Skipping already ingested {}", doc.metadata.source);
                report.skipped_documents += 1;
            } else {
                fresh.push(doc);
            }
        }
        report.documents = fresh.len();

        // 4. 청킹
        let chunks = split_documents(self.chunker.as_ref(), &fresh);
        tracing::info!(
            "Split {} documents into {} chunks ({})",
            fresh.len(),
            chunks.len(),
            self.chunker.name()
        );

        if chunks.is_empty() {
            tracing::info!("Nothing new to ingest");
            return Ok(report);
        }

        // 5. 임베딩
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingProvider(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            ensure_dimension(index.dimension(), &vector)?;
            entries.push(IndexEntry::from_chunk(chunk, vector));
        }

        // 6. 업서트 + 저장
        report.chunks = index.upsert(entries).await?;
        index.persist().await?;

        tracing::info!(
            "Ingested {} chunks from {} documents into {} index",
            report.chunks,
            report.documents,
            index.name()
        );
        Ok(report)
    }

    /// 항목 로드 결과 반영 (실패 기록 또는 fail_fast 중단)
    fn absorb(
        &self,
        report: &mut IngestReport,
        documents: &mut Vec<Document>,
        source: String,
        result: Result<Vec<Document>>,
        options: IngestOptions,
    ) -> Result<()> {
        match result {
            Ok(docs) => {
                tracing::debug!("Loaded {} documents from {}", docs.len(), source);
                documents.extend(docs);
                Ok(())
            }
            Err(error) if options.fail_fast => Err(error),
            Err(error) => {
                tracing::warn!("Skipping {}: {}", source, error);
                report.failures.push(IngestFailure { source, error });
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedEmbedding;
    use crate::knowledge::chunker::{window_chunker, ChunkConfig};
    use crate::knowledge::local::LocalIndex;
    use tempfile::TempDir;

    const DIM: usize = 64;

    fn ingestor() -> Ingestor {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedding::new(DIM));
        let chunker = window_chunker(ChunkConfig::new(200, 20).unwrap());
        Ingestor::new(embedder, chunker).unwrap()
    }

    fn source_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("resume.txt"),
            "Alice is a software engineer with 5 years of Python experience.",
        )
        .unwrap();
        std::fs::write(dir.path().join("bio.md"), "# Bio\n\nAlice enjoys hiking.").unwrap();
        std::fs::write(dir.path().join("notes.xyz"), "ignored").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_unsupported_file_does_not_stop_batch() {
        let src = source_dir();
        let out = TempDir::new().unwrap();
        let mut index = LocalIndex::create(&out.path().join("index.json"), DIM, "hashed-64");

        let report = ingestor()
            .run(&mut index, src.path(), &[], IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.files, 3);
        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].source.ends_with("notes.xyz"));
        assert!(matches!(report.failures[0].error, Error::UnsupportedFormat { .. }));
        assert_eq!(index.count().await.unwrap(), 2);
        assert!(out.path().join("index.json").exists());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts() {
        let src = source_dir();
        let out = TempDir::new().unwrap();
        let mut index = LocalIndex::create(&out.path().join("index.json"), DIM, "hashed-64");

        let options = IngestOptions {
            fail_fast: true,
            ..Default::default()
        };
        let err = ingestor()
            .run(&mut index, src.path(), &[], options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_reingest_skips_existing_unless_forced() {
        let src = source_dir();
        let out = TempDir::new().unwrap();
        let mut index = LocalIndex::create(&out.path().join("index.json"), DIM, "hashed-64");
        let ingestor = ingestor();

        ingestor
            .run(&mut index, src.path(), &[], IngestOptions::default())
            .await
            .unwrap();

        let second = ingestor
            .run(&mut index, src.path(), &[], IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(second.documents, 0);
        assert_eq!(second.skipped_documents, 2);
        assert_eq!(second.chunks, 0);

        let forced = IngestOptions {
            force: true,
            ..Default::default()
        };
        let third = ingestor.run(&mut index, src.path(), &[], forced).await.unwrap();
        assert_eq!(third.documents, 2);
        // 같은 ID로 덮어쓰므로 개수 불변
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_source_directory() {
        let out = TempDir::new().unwrap();
        let mut index = LocalIndex::create(&out.path().join("index.json"), DIM, "hashed-64");

        let result = ingestor()
            .run(&mut index, &out.path().join("missing"), &[], IngestOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_with_index() {
        let src = source_dir();
        let out = TempDir::new().unwrap();
        let mut index = LocalIndex::create(&out.path().join("index.json"), 8, "hashed-8");

        let err = ingestor()
            .run(&mut index, src.path(), &[], IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 8, actual: 64 }));
    }
}
