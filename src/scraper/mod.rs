//! 웹 스크래퍼 모듈 - 프로필 URL 콘텐츠 추출
//!
//! GitHub/LinkedIn 등 페르소나 설정의 URL을 가져와 제목과 본문을 추출합니다.
//! URL 하나당 문서 하나를 만듭니다.

use std::time::Duration;

use scraper::Html;
use url::Url;

use crate::error::{Error, Result};
use crate::extractor::html::{extract_main_text, extract_title};
use crate::knowledge::Document;

/// 스크랩된 콘텐츠
#[derive(Debug, Clone)]
pub struct ScrapedContent {
    /// 페이지 제목
    pub title: Option<String>,
    /// 본문 텍스트 (HTML 태그 제거됨)
    pub content: String,
    /// 원본 URL
    pub url: String,
}

impl ScrapedContent {
    /// 문서로 변환 (본문이 비어 있으면 None)
    pub fn into_document(self) -> Option<Document> {
        if self.content.trim().is_empty() {
            return None;
        }
        Some(Document::new(self.url, self.content).with_title(self.title))
    }
}

/// 웹 스크래퍼
#[derive(Debug, Clone)]
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("persona-rag/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::StartupConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// URL에서 콘텐츠 추출
    ///
    /// 잘못된 URL, 전송 실패, 에러 상태 코드는 모두 해당 URL의 `Load` 에러입니다.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        let parsed = Url::parse(url).map_err(|e| Error::load(url, format!("invalid URL: {}", e)))?;
        tracing::info!("Scraping: {}", url);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::load(url, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::load(url, format!("HTTP {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::load(url, format!("failed to read body: {}", e)))?;

        let (title, content) = parse_page(&html);

        Ok(ScrapedContent {
            title,
            content,
            url: url.to_string(),
        })
    }

    /// URL 하나를 문서 목록으로 로드 (본문이 없으면 경고 후 빈 목록)
    pub async fn load_url(&self, url: &str) -> Result<Vec<Document>> {
        let scraped = self.scrape(url).await?;
        match scraped.into_document() {
            Some(doc) => Ok(vec![doc]),
            None => {
                tracing::warn!("No text extracted from {}", url);
                Ok(Vec::new())
            }
        }
    }

    /// 여러 URL 로드 (입력 순서 유지, URL별 결과)
    pub async fn load_urls(&self, urls: &[String]) -> Vec<(String, Result<Vec<Document>>)> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push((url.clone(), self.load_url(url).await));
        }
        results
    }
}

/// HTML → (제목, 본문)
fn parse_page(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);
    (extract_title(&document), extract_main_text(&document))
}
