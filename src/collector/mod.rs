//! 파일 수집 모듈
//!
//! 소스 디렉토리의 문서 파일을 재귀적으로 수집합니다.
//! .gitignore 패턴과 숨김 파일 규칙을 존중합니다.
//! 지원하지 않는 확장자도 수집 목록에 포함되며, 로드 시점에 에러가 됩니다.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{Error, Result};

// ============================================================================
// File Types
// ============================================================================

/// 로더가 등록된 파일 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// CSV (행 단위 문서)
    Csv,
    /// Word 문서 (.docx, 레거시 .doc)
    Word,
    /// HTML
    Html,
    /// 마크다운
    Markdown,
    /// PDF (페이지 단위 문서)
    Pdf,
    /// 일반 텍스트 (UTF-8)
    Text,
}

impl FileType {
    /// 확장자로 파일 타입 결정 (대소문자 무시)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(FileType::Csv),
            "doc" | "docx" => Some(FileType::Word),
            "html" | "htm" => Some(FileType::Html),
            "md" | "markdown" => Some(FileType::Markdown),
            "pdf" => Some(FileType::Pdf),
            "txt" => Some(FileType::Text),
            _ => None,
        }
    }

    /// 파일 경로에서 타입 결정
    ///
    /// 등록되지 않은 확장자는 `UnsupportedFormat`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        Self::from_extension(extension).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: format!(".{}", extension.to_lowercase()),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Word => "word",
            FileType::Html => "html",
            FileType::Markdown => "markdown",
            FileType::Pdf => "pdf",
            FileType::Text => "text",
        }
    }
}

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 파일 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 경로
    pub path: PathBuf,
    /// 파일 크기 (바이트)
    pub size: u64,
}

impl CollectedFile {
    /// 파일에서 CollectedFile 생성 (일반 파일이 아니면 None)
    pub fn from_path(path: PathBuf) -> Result<Option<Self>> {
        let metadata = std::fs::metadata(&path)?;

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path,
            size: metadata.len(),
        }))
    }

    /// 로더 타입 (지원하지 않으면 에러)
    pub fn file_type(&self) -> Result<FileType> {
        FileType::from_path(&self.path)
    }
}

// ============================================================================
// File Collector
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// 파일 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    /// 새 수집기 생성
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 수집기 생성
    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 폴더 재귀 수집 (경로 순 정렬)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        if !path.is_dir() {
            return Err(Error::load(
                path.display().to_string(),
                "source directory not found",
            ));
        }

        let mut files = Vec::new();

        // ignore 크레이트로 .gitignore 지원
        let walker = WalkBuilder::new(path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            // 파일만 처리
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            match CollectedFile::from_path(entry.path().to_path_buf()) {
                Ok(Some(file)) => {
                    if self.should_include(&file) {
                        files.push(file);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Failed to collect file {:?}: {}", entry.path(), e);
                }
            }
        }

        // 실행마다 같은 순서로 수집
        files.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!("Collected {} files from {:?}", files.len(), path);
        Ok(files)
    }

    /// 파일이 필터 조건을 만족하는지 확인
    fn should_include(&self, file: &CollectedFile) -> bool {
        if self.config.max_file_size > 0 && file.size > self.config.max_file_size {
            tracing::warn!("Skipping large file: {:?} ({} bytes)", file.path, file.size);
            return false;
        }

        true
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// 수집 통계
#[derive(Debug, Default)]
pub struct CollectionStats {
    pub total_files: usize,
    pub supported_files: usize,
    pub unsupported_files: usize,
    pub pdf_files: usize,
    pub total_size: u64,
}

impl CollectionStats {
    /// 수집된 파일 목록에서 통계 계산
    pub fn from_files(files: &[CollectedFile]) -> Self {
        let mut stats = Self::default();

        for file in files {
            stats.total_files += 1;
            stats.total_size += file.size;

            match file.file_type() {
                Ok(file_type) => {
                    stats.supported_files += 1;
                    if file_type == FileType::Pdf {
                        stats.pdf_files += 1;
                    }
                }
                Err(_) => stats.unsupported_files += 1,
            }
        }

        stats
    }
}

// ============================================================================
// Tests
// ============================================================================
