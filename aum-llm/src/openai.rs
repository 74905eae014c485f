use crate::traits::{Completion, CompletionRequest, LlmClient};
use async_trait::async_trait;
use aum_common::{AumError, Result};
use aum_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};

const DEFAULT_INSTRUCTIONS: &str =
    "You are a careful financial research assistant. Answer only from the supplied content.";

pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
pub struct ResponsesApiRequest {
    model: String,
    input: String,
    instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsesApiResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub output: Vec<ResponseMessage>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl OpenAiClient {
    /// Create a client for `endpoint` (e.g. `https://api.openai.com/v1`).
    ///
    /// The underlying HTTP client makes exactly one attempt per call.
    pub fn new(api_key: String, model: String, endpoint: &str) -> Result<Self> {
        let base = format!("{}/", endpoint.trim_end_matches('/'));
        let client = HttpClient::new(&base).map_err(http_to_aum)?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion> {
        let req = ResponsesApiRequest {
            model: self.model.clone(),
            input: request.prompt.to_string(),
            instructions: request
                .instructions
                .unwrap_or(DEFAULT_INSTRUCTIONS)
                .to_string(),
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp: ResponsesApiResponse = self
            .client
            .post_json("responses", Some(&self.api_key), &req)
            .await
            .map_err(http_to_aum)?;

        let text = resp
            .output
            .iter()
            .filter(|msg| msg.kind == "message")
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.clone())
            .unwrap_or_default();

        let tokens_used = resp.usage.as_ref().map(|u| u.total_tokens);
        tracing::debug!(
            response_id = %resp.id,
            status = %resp.status,
            tokens_used = ?tokens_used,
            "llm.openai.complete"
        );

        Ok(Completion {
            text,
            model: Some(resp.model),
            tokens_used,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let ping = CompletionRequest::new("Respond with just 'OK'").max_tokens(16);
        match self.complete(ping).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "llm.openai.health_check_failed");
                Ok(false)
            }
        }
    }
}

fn http_to_aum(e: HttpError) -> AumError {
    AumError::Extraction(format!("{e}"))
}
