//! 검색 증강 어시스턴트
//!
//! 질문 임베딩 → 유사 청크 검색 → 쿼리 증강 → 스트리밍 완성

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::{augment_query, SearchHit, VectorIndex};

use super::session::ChatSession;
use super::{collect_stream, ChatMessage, CompletionProvider};

/// 어시스턴트
pub struct Assistant {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    completion: Arc<dyn CompletionProvider>,
    system_prompt: String,
    /// 검색할 청크 수
    k: usize,
}

impl Assistant {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        completion: Arc<dyn CompletionProvider>,
        system_prompt: String,
        k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            system_prompt,
            k,
        }
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// 질문과 가장 가까운 청크 최대 k개
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.similarity_search(&vector, self.k).await?;
        tracing::debug!("Retrieved {} chunks for query", hits.len());
        Ok(hits)
    }

    /// 시스템 프롬프트 + 증강된 질문 (이전 대화는 포함하지 않음)
    pub fn build_messages(&self, hits: &[SearchHit], query: &str) -> Vec<ChatMessage> {
        let contexts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(augment_query(&contexts, query)),
        ]
    }

    /// 질문에 답하고 성공 시 세션에 기록
    ///
    /// `on_update`는 조각이 도착할 때마다 누적 응답으로 호출됩니다.
    /// 실패하면 세션은 변경되지 않습니다.
    pub async fn answer<F>(&self, session: &mut ChatSession, query: &str, on_update: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let hits = self.retrieve(query).await?;
        let messages = self.build_messages(&hits, query);

        let stream = self.completion.complete_stream(&messages).await?;
        let response = collect_stream(stream, on_update).await?;

        session.push_exchange(query, response.clone());
        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{FragmentStream, Role};
    use crate::embedding::HashedEmbedding;
    use crate::error::Error;
    use crate::knowledge::{Chunk, ChunkMetadata, Document, IndexEntry, LocalIndex, SEARCH_RESULTS_START};
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const DIM: usize = 64;

    /// 고정 조각을 돌려주고 받은 메시지를 기록하는 프로바이더
    struct ScriptedCompletion {
        fragments: Vec<Result<String>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompletion {
        fn new(fragments: Vec<Result<String>>) -> Self {
            Self {
                fragments,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedCompletion {
        async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let items: Vec<Result<String>> = self
                .fragments
                .iter()
                .map(|f| match f {
                    Ok(s) => Ok(s.clone()),
                    Err(e) => Err(Error::CompletionStream(e.to_string())),
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const RESUME: &str = "Alice is a software engineer with 5 years of Python experience.";

    async fn alice_index(embedder: &HashedEmbedding, dir: &TempDir) -> LocalIndex {
        let mut index = LocalIndex::create(&dir.path().join("index.json"), DIM, embedder.model_id());
        let doc = Document::new("resume.txt", RESUME);
        let chunk = Chunk {
            text: RESUME.to_string(),
            metadata: ChunkMetadata {
                document: doc.metadata.clone(),
                chunk_index: 0,
            },
        };
        let vector = embedder.embed(RESUME).await.unwrap();
        index
            .upsert(vec![IndexEntry::from_chunk(chunk, vector)])
            .await
            .unwrap();
        index
    }

    async fn assistant(completion: Arc<ScriptedCompletion>, dir: &TempDir) -> Assistant {
        let embedder = HashedEmbedding::new(DIM);
        let index = alice_index(&embedder, dir).await;
        Assistant::new(
            Arc::new(embedder),
            Box::new(index),
            completion,
            "SYSTEM".to_string(),
            4,
        )
    }

    #[tokio::test]
    async fn test_answer_records_exchange() {
        let dir = TempDir::new().unwrap();
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok("I have 5 years ".to_string()),
            Ok("of Python experience.".to_string()),
        ]));
        let assistant = assistant(completion.clone(), &dir).await;
        let mut session = ChatSession::new();

        let mut updates = Vec::new();
        let answer = assistant
            .answer(&mut session, "What languages do you know?", |buf| {
                updates.push(buf.to_string())
            })
            .await
            .unwrap();

        assert_eq!(answer, "I have 5 years of Python experience.");
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1], answer);

        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.turns()[0].content, "What languages do you know?");
        assert_eq!(session.turns()[1].role, Role::Assistant);
        assert_eq!(session.turns()[1].content, answer);

        let seen = completion.seen.lock().unwrap();
        let messages = &seen[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("SYSTEM"));
        assert!(messages[1].content.starts_with(SEARCH_RESULTS_START));
        assert!(messages[1].content.contains(RESUME));
        assert!(messages[1].content.ends_with("What languages do you know?"));
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_session_unchanged() {
        let dir = TempDir::new().unwrap();
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok("Alice is a ".to_string()),
            Err(Error::CompletionStream("connection reset".to_string())),
        ]));
        let assistant = assistant(completion, &dir).await;
        let mut session = ChatSession::new();

        let result = assistant.answer(&mut session, "Who are you?", |_| {}).await;
        assert!(matches!(result, Err(Error::CompletionStream(_))));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_previous_turns_not_sent() {
        let dir = TempDir::new().unwrap();
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok("Yes.".to_string())]));
        let assistant = assistant(completion.clone(), &dir).await;
        let mut session = ChatSession::new();

        assistant.answer(&mut session, "First?", |_| {}).await.unwrap();
        assistant.answer(&mut session, "Second?", |_| {}).await.unwrap();

        assert_eq!(session.len(), 4);
        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 2);
        assert!(!seen[1][1].content.contains("First?"));
    }
}
