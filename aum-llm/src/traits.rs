use async_trait::async_trait;
use aum_common::Result;
use serde::{Deserialize, Serialize};

/// One prompt for the completion provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    /// Replaces the provider's default instructions when set.
    pub instructions: Option<&'a str>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
    /// Total tokens billed for the call, as reported by the provider.
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One attempt; errors are returned, never retried.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion>;

    /// Whether the provider answers with the configured credentials.
    async fn health_check(&self) -> Result<bool>;

    fn model_name(&self) -> &str;
}
