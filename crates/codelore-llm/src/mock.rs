//! Test-only mock LLM provider.

use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

const MOCK_DIM: usize = 16;

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    /// Embedding calls fail for any text containing this marker.
    pub fail_embed_on: Option<String>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            supports_embeddings: true,
            fail_chat: false,
            fail_embed_on: None,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    #[must_use]
    pub fn with_embed_failure(mut self, marker: impl Into<String>) -> Self {
        self.fail_embed_on = Some(marker.into());
        self
    }

    /// Deterministic text-derived vector so distinct inputs get distinct,
    /// reproducible embeddings without a model.
    #[must_use]
    pub fn hash_embedding(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; MOCK_DIM];
        for (i, b) in text.bytes().enumerate() {
            v[i % MOCK_DIM] += f32::from(b) / 255.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, _messages: &[Message]) -> Result<String, LlmError> {
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if let Some(ref marker) = self.fail_embed_on
            && text.contains(marker)
        {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(Self::hash_embedding(text))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    #[tokio::test]
    async fn scripted_responses_consumed_in_order() {
        let mock = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        let msgs = vec![Message::new(Role::User, "q")];
        assert_eq!(mock.chat(&msgs).await.unwrap(), "first");
        assert_eq!(mock.chat(&msgs).await.unwrap(), "second");
        assert_eq!(mock.chat(&msgs).await.unwrap(), "mock response");
    }

    #[tokio::test]
    async fn failing_chat_errors() {
        let mock = MockProvider::failing();
        let msgs = vec![Message::new(Role::User, "q")];
        assert!(mock.chat(&msgs).await.is_err());
    }

    #[tokio::test]
    async fn embed_deterministic_per_text() {
        let mock = MockProvider::default();
        let a = mock.embed("some text").await.unwrap();
        let b = mock.embed("some text").await.unwrap();
        let c = mock.embed("other text").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), MOCK_DIM);
    }

    #[tokio::test]
    async fn embed_failure_marker_respected() {
        let mock = MockProvider::default().with_embed_failure("poison");
        assert!(mock.embed("clean").await.is_ok());
        assert!(mock.embed("poison pill").await.is_err());
    }

    #[test]
    fn hash_embedding_is_normalized() {
        let v = MockProvider::hash_embedding("normalize me");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
