//! 대화 기록
//!
//! 기록은 화면 표시용이며 모델 요청에는 포함되지 않습니다.

use serde::{Deserialize, Serialize};

use super::Role;

/// 대화 한 턴
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// 대화 세션
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ConversationTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 완료된 질문/응답 쌍 추가
    pub(crate) fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: Role::User,
            content: user.into(),
        });
        self.turns.push(ConversationTurn {
            role: Role::Assistant,
            content: assistant.into(),
        });
    }
}
