//! 해시 임베딩 - 외부 의존성 없는 결정적 임베딩
//!
//! 소문자 단어의 빈도를 djb2 해시로 차원에 분산한 뒤 L2 정규화합니다.
//! 의미 검색 품질은 낮지만 오프라인 실행과 테스트에 씁니다.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

use super::EmbeddingProvider;

/// 해시 임베딩 기본 차원
pub const DEFAULT_HASHED_DIMENSION: usize = 384;

/// 해시 기반 bag-of-words 임베딩
#[derive(Debug, Clone)]
pub struct HashedEmbedding {
    dimension: usize,
    model_id: String,
}

impl HashedEmbedding {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashed-{}", dimension),
        }
    }

    /// 동기 임베딩
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            *tf.entry(word).or_insert(0) += 1;
        }

        for (term, count) in &tf {
            vector[djb2(term) % self.dimension] += *count as f32;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

fn djb2(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn name(&self) -> &str {
        "hashed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::cosine_similarity;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashedEmbedding::new(128);
        let a = embedder.embed("Alice writes Python").await.unwrap();
        let b = embedder.embed("Alice writes Python").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn test_normalized() {
        let embedder = HashedEmbedding::new(64);
        let v = embedder.embed_text("rust rust tokio async");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashedEmbedding::new(16);
        assert_eq!(embedder.embed_text("  ... "), vec![0.0; 16]);
    }

    #[test]
    fn test_related_texts_score_higher() {
        let embedder = HashedEmbedding::new(384);
        let query = embedder.embed_text("python experience");
        let related = embedder.embed_text("five years of Python experience");
        let unrelated = embedder.embed_text("enjoys mountain hiking");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_embed_many_preserves_order() {
        let embedder = HashedEmbedding::new(32);
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let vectors = embedder.embed_many(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        for (text, vector) in texts.iter().zip(&vectors) {
            assert_eq!(&embedder.embed_text(text), vector);
        }
    }
}
