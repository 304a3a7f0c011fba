//! Hugging Face Inference API 텍스트 생성
//!
//! 스트리밍을 지원하지 않으므로 전체 응답을 한 조각짜리 스트림으로 돌려줍니다.
//! 메시지는 하나의 프롬프트 문자열로 합쳐 전송합니다.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{ChatMessage, CompletionProvider, FragmentStream};

/// 기본 모델
pub const DEFAULT_HUGGINGFACE_MODEL: &str = "google/flan-t5-xxl";

/// 생성 최대 길이
const MAX_LENGTH: u32 = 512;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_length: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Generated(Vec<Generated>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct Generated {
    generated_text: String,
}

/// Hugging Face 채팅 클라이언트
#[derive(Debug, Clone)]
pub struct HuggingFaceChat {
    client: reqwest::Client,
    token: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl HuggingFaceChat {
    pub fn new(token: String, base_url: &str, model: Option<String>, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::CompletionStream(format!("failed to create HTTP client: {}", e)))?;

        let model = model.unwrap_or_else(|| DEFAULT_HUGGINGFACE_MODEL.to_string());
        let endpoint = format!("{}/models/{}", base_url.trim_end_matches('/'), model);

        Ok(Self {
            client,
            token,
            endpoint,
            model,
            temperature,
        })
    }

    /// 메시지 내용을 빈 줄로 이어 붙인 프롬프트
    fn prompt(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| m.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = Self::prompt(messages);
        let request = GenerateRequest {
            inputs: &prompt,
            parameters: GenerateParameters {
                // 이 API는 0 온도를 거부
                temperature: (self.temperature > 0.0).then_some(self.temperature),
                max_length: MAX_LENGTH,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::CompletionStream(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::CompletionStream(format!("failed to read response: {}", e)))?;

        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(GenerateResponse::Error { error }) => {
                Err(Error::CompletionStream(format!("API error ({}): {}", status, error)))
            }
            Ok(GenerateResponse::Generated(_)) if !status.is_success() => {
                Err(Error::CompletionStream(format!("API error ({})", status)))
            }
            Ok(GenerateResponse::Generated(generated)) => generated
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or_else(|| Error::CompletionStream("empty generation response".to_string())),
            Err(_) if !status.is_success() => {
                Err(Error::CompletionStream(format!("API error ({}): {}", status, body)))
            }
            Err(e) => Err(Error::CompletionStream(format!("malformed response: {}", e))),
        }
    }
}

#[async_trait]
impl CompletionProvider for HuggingFaceChat {
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
        let text = self.generate(messages).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::collect_stream;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You are Alice."),
            ChatMessage::user("What do you do?"),
        ]
    }

    #[test]
    fn test_prompt_joins_messages() {
        assert_eq!(
            HuggingFaceChat::prompt(&messages()),
            "You are Alice.\n\nWhat do you do?"
        );
    }

    #[tokio::test]
    async fn test_generation_as_single_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/google/flan-t5-xxl"))
            .and(header("authorization", "Bearer hf_token"))
            .and(body_json(serde_json::json!({
                "inputs": "You are Alice.\n\nWhat do you do?",
                "parameters": {"max_length": 512}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"generated_text": "I build software."}])),
            )
            .mount(&server)
            .await;

        let chat = HuggingFaceChat::new("hf_token".into(), &server.uri(), None, 0.0).unwrap();
        let stream = chat.complete_stream(&messages()).await.unwrap();
        let text = collect_stream(stream, |_| {}).await.unwrap();
        assert_eq!(text, "I build software.");
    }

    #[tokio::test]
    async fn test_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({"error": "Model is currently loading"})),
            )
            .mount(&server)
            .await;

        let chat = HuggingFaceChat::new("hf_token".into(), &server.uri(), None, 0.5).unwrap();
        let err = chat.complete_stream(&messages()).await.err().unwrap();
        assert!(matches!(err, Error::CompletionStream(ref m) if m.contains("currently loading")));
    }
}
