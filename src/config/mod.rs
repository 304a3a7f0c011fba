//! 설정 모듈
//!
//! - `.env` 파일 로드 (dotenvy) - 파일이 없으면 시작 불가
//! - 환경변수 → `Settings`
//! - 페르소나 정보 (이름, 직무, 프로필 링크) → `Persona` (TOML)

mod persona;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

pub use persona::Persona;

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// 기본 청크 오버랩 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// 기본 검색 결과 개수
pub const DEFAULT_TARGET_SOURCE_CHUNKS: usize = 4;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

// ============================================================================
// .env
// ============================================================================

/// `.env` 파일을 프로세스 환경변수로 로드
///
/// 이미 설정된 환경변수는 덮어쓰지 않습니다.
pub fn load_env_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::StartupConfig(format!(
            "missing environment file {}",
            path.display()
        )));
    }

    dotenvy::from_path(path).map_err(|e| {
        Error::StartupConfig(format!("failed to read {}: {}", path.display(), e))
    })?;

    tracing::debug!("Loaded environment from {:?}", path);
    Ok(())
}

// ============================================================================
// Backend selectors
// ============================================================================

/// 임베딩 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// 호스팅 API (OpenAI 호환 /embeddings)
    OpenAi,
    /// 프로세스 내 ONNX 모델 (fastembed)
    Local,
    /// 결정적 해시 임베딩 (오프라인/테스트용)
    Hashed,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Local => "local",
            Self::Hashed => "hashed",
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "local" | "huggingface" | "hf" | "fastembed" => Ok(Self::Local),
            "hashed" => Ok(Self::Hashed),
            other => Err(Error::StartupConfig(format!(
                "EMBEDDINGS_BACKEND: unknown backend '{}' (expected openai, local or hashed)",
                other
            ))),
        }
    }
}

/// 채팅 완성 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatBackend {
    OpenAi,
    HuggingFace,
}

impl ChatBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl FromStr for ChatBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(Error::StartupConfig(format!(
                "CHAT_BACKEND: unknown backend '{}' (expected openai or huggingface)",
                other
            ))),
        }
    }
}

/// 벡터 인덱스 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    /// 로컬 파일 인덱스
    Local,
    /// 관리형 원격 인덱스
    Managed,
}

impl IndexBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Managed => "managed",
        }
    }
}

impl FromStr for IndexBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "managed" | "pinecone" => Ok(Self::Managed),
            other => Err(Error::StartupConfig(format!(
                "INDEX_BACKEND: unknown backend '{}' (expected local or managed)",
                other
            ))),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// 임베딩 설정
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    /// 모델 이름 (None이면 백엔드 기본값)
    pub model: Option<String>,
    /// 차원 재지정
    pub dimension: Option<usize>,
    /// 호스팅 API 배치 크기
    pub batch_size: usize,
}

/// 채팅 설정
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub backend: ChatBackend,
    pub model: Option<String>,
    pub temperature: f32,
}

/// 관리형 인덱스 접속 정보
#[derive(Debug, Clone)]
pub struct ManagedIndexSettings {
    pub index_name: String,
    pub api_key: String,
    pub environment: String,
    /// 컨트롤러 URL 재지정 (기본: environment에서 유도)
    pub controller_url: Option<String>,
}

/// 벡터 인덱스 설정
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub persist_directory: PathBuf,
    pub managed: Option<ManagedIndexSettings>,
}

/// 전체 실행 설정 (시작 시 한 번 로드, 이후 읽기 전용)
#[derive(Debug, Clone)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub chat: ChatSettings,
    pub index: IndexSettings,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub huggingface_api_token: Option<String>,
    pub huggingface_base_url: String,
    pub source_directory: PathBuf,
    pub persona_file: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub target_source_chunks: usize,
}

impl Settings {
    /// 프로세스 환경변수에서 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수에서 로드 (테스트용으로 환경변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // 임베딩 백엔드: EMBEDDINGS_BACKEND > OPENAI_EMBEDDINGS 플래그 > local
        let embedding_backend = match get("EMBEDDINGS_BACKEND") {
            Some(v) => v.parse()?,
            None if get("OPENAI_EMBEDDINGS").map(|v| is_truthy(&v)).unwrap_or(false) => {
                EmbeddingBackend::OpenAi
            }
            None => EmbeddingBackend::Local,
        };

        // 채팅 백엔드: CHAT_BACKEND > OPENAI_LLM 플래그 > openai
        let chat_backend = match get("CHAT_BACKEND") {
            Some(v) => v.parse()?,
            None => match get("OPENAI_LLM") {
                Some(v) if !is_truthy(&v) => ChatBackend::HuggingFace,
                _ => ChatBackend::OpenAi,
            },
        };

        let index_backend = match get("INDEX_BACKEND") {
            Some(v) => v.parse()?,
            None => IndexBackend::Local,
        };

        // API 키 검사는 create_embedder / create_completion에서
        let openai_api_key = get("OPENAI_API_KEY");
        let huggingface_api_token = get("HUGGINGFACEHUB_API_TOKEN");

        let managed = if index_backend == IndexBackend::Managed {
            let require = |key: &str| {
                get(key).ok_or_else(|| {
                    Error::StartupConfig(format!("{} is required for the managed index", key))
                })
            };
            Some(ManagedIndexSettings {
                index_name: require("INDEX_NAME")?,
                api_key: require("PINECONE_API_KEY")?,
                environment: require("PINECONE_ENVIRONMENT")?,
                controller_url: get("PINECONE_CONTROLLER_URL"),
            })
        } else {
            None
        };

        let chunk_size = parse_or("CHUNK_SIZE", get("CHUNK_SIZE"), DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = parse_or("CHUNK_OVERLAP", get("CHUNK_OVERLAP"), DEFAULT_CHUNK_OVERLAP)?;
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::StartupConfig(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                chunk_overlap, chunk_size
            )));
        }

        let target_source_chunks = parse_or(
            "TARGET_SOURCE_CHUNKS",
            get("TARGET_SOURCE_CHUNKS"),
            DEFAULT_TARGET_SOURCE_CHUNKS,
        )?;
        if target_source_chunks == 0 {
            return Err(Error::StartupConfig(
                "TARGET_SOURCE_CHUNKS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            embedding: EmbeddingSettings {
                backend: embedding_backend,
                model: get("EMBEDDING_MODEL").or_else(|| get("HF_EMBEDDING_MODEL_NAME")),
                dimension: parse_opt("EMBEDDING_DIMENSION", get("EMBEDDING_DIMENSION"))?,
                batch_size: parse_or("EMBEDDING_BATCH_SIZE", get("EMBEDDING_BATCH_SIZE"), 64)?
                    .max(1),
            },
            chat: ChatSettings {
                backend: chat_backend,
                model: get("CHAT_MODEL"),
                temperature: parse_or("MODEL_TEMPERATURE", get("MODEL_TEMPERATURE"), 0.0)?,
            },
            index: IndexSettings {
                backend: index_backend,
                persist_directory: get("PERSIST_DIRECTORY")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("persist")),
                managed,
            },
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            huggingface_api_token,
            huggingface_base_url: get("HUGGINGFACE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_BASE_URL.to_string()),
            source_directory: get("SOURCE_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("source_documents")),
            persona_file: get("PERSONA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("persona.toml")),
            chunk_size,
            chunk_overlap,
            target_source_chunks,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// "true", "1", "t" 등을 참으로 해석
fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "t" | "yes")
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    Ok(parse_opt(key, value)?.unwrap_or(default))
}

fn parse_opt<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| Error::StartupConfig(format!("{}: invalid value '{}'", key, v)))
        })
        .transpose()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(settings.chat.backend, ChatBackend::OpenAi);
        assert_eq!(settings.index.backend, IndexBackend::Local);
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(settings.target_source_chunks, 4);
        assert_eq!(settings.chat.temperature, 0.0);
        assert_eq!(settings.index.persist_directory, PathBuf::from("persist"));
    }

    #[test]
    fn test_openai_embeddings_flag() {
        let settings =
            settings_from(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_EMBEDDINGS", "True")]).unwrap();
        assert_eq!(settings.embedding.backend, EmbeddingBackend::OpenAi);
    }

    #[test]
    fn test_local_ingest_settings_without_api_keys() {
        let settings = settings_from(&[("EMBEDDINGS_BACKEND", "local")]).unwrap();
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(settings.chat.backend, ChatBackend::OpenAi);
        assert!(settings.openai_api_key.is_none());
        assert!(settings.huggingface_api_token.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = settings_from(&[("OPENAI_API_KEY", "k"), ("CHUNK_SIZE", "big")]).unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = settings_from(&[
            ("OPENAI_API_KEY", "k"),
            ("CHUNK_SIZE", "100"),
            ("CHUNK_OVERLAP", "100"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::StartupConfig(_)));
    }

    #[test]
    fn test_managed_index_requires_credentials() {
        let err = settings_from(&[("OPENAI_API_KEY", "k"), ("INDEX_BACKEND", "managed")])
            .unwrap_err();
        assert!(err.to_string().contains("INDEX_NAME"));

        let settings = settings_from(&[
            ("OPENAI_API_KEY", "k"),
            ("INDEX_BACKEND", "pinecone"),
            ("INDEX_NAME", "cv"),
            ("PINECONE_API_KEY", "pk"),
            ("PINECONE_ENVIRONMENT", "us-west1-gcp"),
        ])
        .unwrap();
        let managed = settings.index.managed.unwrap();
        assert_eq!(managed.index_name, "cv");
        assert_eq!(managed.environment, "us-west1-gcp");
    }

    #[test]
    fn test_huggingface_chat_backend() {
        let settings = settings_from(&[
            ("EMBEDDINGS_BACKEND", "hashed"),
            ("OPENAI_LLM", "false"),
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
        ])
        .unwrap();
        assert_eq!(settings.chat.backend, ChatBackend::HuggingFace);
        assert!(settings.openai_api_key.is_none());
    }

    #[test]
    fn test_unknown_backend() {
        let err = settings_from(&[("OPENAI_API_KEY", "k"), ("EMBEDDINGS_BACKEND", "magic")])
            .unwrap_err();
        assert!(err.to_string().contains("EMBEDDINGS_BACKEND"));
    }

    #[test]
    fn test_missing_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_env_file(&dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, Error::StartupConfig(_)));
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("True"));
        assert!(is_truthy("1"));
        assert!(is_truthy("t"));
        assert!(!is_truthy("False"));
        assert!(!is_truthy("0"));
    }
}
