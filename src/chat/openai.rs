//! OpenAI 호환 채팅 완성 (스트리밍)
//!
//! source: https://platform.openai.com/docs/api-reference/chat/streaming
//!
//! `stream: true`로 요청하고 SSE `data:` 이벤트의 `choices[0].delta.content`를
//! 조각 단위로 내보냅니다. `[DONE]` 또는 `finish_reason`에서 정상 종료,
//! 에러 이벤트, 전송 오류, 완료 전 EOF는 `CompletionStream` 에러입니다.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::sse::SseDecoder;
use super::{ChatMessage, CompletionProvider, FragmentStream};

/// 기본 모델
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI 채팅 완성 클라이언트
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(api_key: String, base_url: &str, model: Option<String>, temperature: f32) -> Result<Self> {
        // 스트림 전체가 아닌 연결 단계에만 타임아웃
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::CompletionStream(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_CHAT_MODEL.to_string()),
            temperature,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiChat {
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::CompletionStream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::CompletionStream(format!("API error ({}): {}", status, message)));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();

        Ok(fragment_stream(bytes))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Stream Decoding
// ============================================================================

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

struct StreamState {
    bytes: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl StreamState {
    /// data 페이로드 하나 처리
    fn handle(&mut self, data: &str) -> Result<()> {
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let event: StreamEvent = serde_json::from_str(data)
            .map_err(|e| Error::CompletionStream(format!("malformed stream event: {}", e)))?;

        if let Some(error) = event.error {
            return Err(Error::CompletionStream(error.message));
        }

        if let Some(choice) = event.choices.into_iter().next() {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.pending.push_back(content);
            }
            if choice.finish_reason.is_some() {
                self.done = true;
            }
        }
        Ok(())
    }
}

/// 바이트 스트림 → 응답 조각 스트림
fn fragment_stream(bytes: ByteStream) -> FragmentStream {
    let state = StreamState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Ok(Some((fragment, state)));
            }
            if state.done {
                return Ok(None);
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.feed(&chunk) {
                        state.handle(&data)?;
                        if state.done {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    return Err(Error::CompletionStream(format!("connection error: {}", e)));
                }
                None => {
                    for data in state.decoder.finish() {
                        state.handle(&data)?;
                    }
                    if !state.done {
                        return Err(Error::CompletionStream(
                            "stream ended before completion".to_string(),
                        ));
                    }
                }
            }
        }
    }))
}

// ============================================================================
// Tests
// ============================================================================
