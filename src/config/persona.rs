//! 페르소나 설정 (persona.toml)
//!
//! ```toml
//! name = "Alice Martin"
//! role = "software engineer"
//! github = "https://github.com/alice"
//! linkedin = "https://www.linkedin.com/in/alice"
//! other_urls = ["https://alice.dev/about"]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// 답변할 인물 정보
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Persona {
    /// 이름
    pub name: String,
    /// 직무
    pub role: String,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    /// 추가로 수집할 URL
    #[serde(default)]
    pub other_urls: Vec<String>,
}

impl Persona {
    /// TOML 파일에서 로드
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::StartupConfig(format!("failed to read persona file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| Error::StartupConfig(format!("{}: {}", path.display(), e)))
    }

    /// TOML 문자열 파싱
    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// 수집 대상 프로필 URL (github, linkedin, other_urls 순)
    pub fn profile_urls(&self) -> Vec<String> {
        self.github
            .iter()
            .chain(self.linkedin.iter())
            .chain(self.other_urls.iter())
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect()
    }
}
