//! 채팅 모듈 - 페르소나 응답 생성
//!
//! - 시스템 프롬프트 (페르소나 역할극)
//! - 채팅 완성 클라이언트 (스트리밍)
//! - 대화 세션 / 검색 증강 어시스턴트
//!
//! ## 사용법
//! ```rust,ignore
//! let assistant = Assistant::new(embedder, index, completion, build_system_prompt(&persona), 4);
//! let mut session = ChatSession::new();
//! let answer = assistant.answer(&mut session, "What do you do?", |partial| print!("{partial}")).await?;
//! ```

mod assistant;
mod huggingface;
mod openai;
mod session;
pub mod sse;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::{ChatBackend, Persona, Settings};
use crate::error::{Error, Result};

pub use assistant::Assistant;
pub use huggingface::{HuggingFaceChat, DEFAULT_HUGGINGFACE_MODEL};
pub use openai::{OpenAiChat, DEFAULT_OPENAI_CHAT_MODEL};
pub use session::{ChatSession, ConversationTurn};

// ============================================================================
// Messages
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 완성 요청 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ============================================================================
// System Prompt
// ============================================================================

/// 페르소나 시스템 프롬프트 생성
pub fn build_system_prompt(persona: &Persona) -> String {
    format!(
        "\nYou are impersonating {name}. This person is a {role}.\n\
         Your task is to answer user questions about you. You will answer in the first person ('I ..'),\n\
         using the information given above each question. \n\
         If the information is missing, say \"Sorry, I do not have this information.\", then offer to ask questions regarding\n\
         your professional experience or skills.\n\
         Answer concisely and precisely, do not be vague.\n\
         End each sentence with a period.\n",
        name = persona.name,
        role = persona.role,
    )
}

// ============================================================================
// CompletionProvider Trait
// ============================================================================

/// 응답 조각 스트림 (pull 방식, drop하면 요청 취소)
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// 채팅 완성 프로바이더 트레이트
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 메시지를 보내고 응답 조각 스트림을 반환
    ///
    /// 요청 자체가 실패하면 즉시 에러, 스트리밍 중 실패는 스트림 아이템 에러입니다.
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream>;

    /// 모델 이름
    fn model(&self) -> &str;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

/// 스트림을 끝까지 읽어 전체 응답을 반환
///
/// `on_update`는 조각이 올 때마다 누적 버퍼로 호출됩니다.
/// 중간에 실패하면 누적된 부분 응답은 버려집니다.
pub async fn collect_stream<F>(mut stream: FragmentStream, mut on_update: F) -> Result<String>
where
    F: FnMut(&str),
{
    let mut buffer = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        buffer.push_str(&fragment);
        on_update(&buffer);
    }
    Ok(buffer)
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 채팅 완성 프로바이더 생성
pub fn create_completion(settings: &Settings) -> Result<Arc<dyn CompletionProvider>> {
    let chat = &settings.chat;

    let provider: Arc<dyn CompletionProvider> = match chat.backend {
        ChatBackend::OpenAi => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                Error::StartupConfig("OPENAI_API_KEY is required for the openai chat backend".to_string())
            })?;
            Arc::new(OpenAiChat::new(
                api_key,
                &settings.openai_base_url,
                chat.model.clone(),
                chat.temperature,
            )?)
        }
        ChatBackend::HuggingFace => {
            let token = settings.huggingface_api_token.clone().ok_or_else(|| {
                Error::StartupConfig(
                    "HUGGINGFACEHUB_API_TOKEN is required for the huggingface chat backend".to_string(),
                )
            })?;
            Arc::new(HuggingFaceChat::new(
                token,
                &settings.huggingface_base_url,
                chat.model.clone(),
                chat.temperature,
            )?)
        }
    };

    tracing::info!("Using {} chat model {}", provider.name(), provider.model());
    Ok(provider)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn persona() -> Persona {
        Persona::from_toml("name = \"Alice\"\nrole = \"Software Engineer\"\n").unwrap()
    }

    #[test]
    fn test_system_prompt() {
        let prompt = build_system_prompt(&persona());
        assert!(prompt.contains("You are impersonating Alice. This person is a Software Engineer."));
        assert!(prompt.contains("\"Sorry, I do not have this information.\""));
        assert!(prompt.contains("in the first person ('I ..')"));
        assert!(prompt.contains("End each sentence with a period."));
    }

    #[test]
    fn test_create_completion_requires_backend_key() {
        let openai = Settings::from_lookup(|_| None).unwrap();
        let err = create_completion(&openai).err().unwrap();
        assert!(matches!(err, Error::StartupConfig(ref m) if m.contains("OPENAI_API_KEY")));

        let huggingface =
            Settings::from_lookup(|key| (key == "CHAT_BACKEND").then(|| "huggingface".to_string()))
                .unwrap();
        let err = create_completion(&huggingface).err().unwrap();
        assert!(matches!(err, Error::StartupConfig(ref m) if m.contains("HUGGINGFACEHUB_API_TOKEN")));

        let with_key =
            Settings::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
                .unwrap();
        assert_eq!(create_completion(&with_key).unwrap().name(), "openai");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }

    #[tokio::test]
    async fn test_collect_stream_reports_growing_buffer() {
        let fragments: FragmentStream = Box::pin(stream::iter(vec![
            Ok("Alice ".to_string()),
            Ok(String::new()),
            Ok("codes.".to_string()),
        ]));
        let mut updates = Vec::new();
        let full = collect_stream(fragments, |buf| updates.push(buf.to_string()))
            .await
            .unwrap();

        assert_eq!(full, "Alice codes.");
        assert_eq!(updates, vec!["Alice ", "Alice codes."]);
    }

    #[tokio::test]
    async fn test_collect_stream_failure() {
        let fragments: FragmentStream = Box::pin(stream::iter(vec![
            Ok("Alice is a ".to_string()),
            Err(Error::CompletionStream("connection reset".to_string())),
        ]));
        let result = collect_stream(fragments, |_| {}).await;
        assert!(matches!(result, Err(Error::CompletionStream(_))));
    }
}
