//! Completion-provider and tokenizer capabilities for the AUM pipeline.
//!
//! [`traits::LlmClient`] is the seam the extraction step talks to;
//! [`openai::OpenAiClient`] is the production implementation and
//! [`tokenizer::BpeTokenizer`] measures and truncates prompts with the same
//! encoding the model uses.
//!
//! # Examples
//! ```no_run
//! use aum_config::LlmConfig;
//! use aum_llm::ensure_llm_ready;
//!
//! # fn main() -> aum_common::Result<()> {
//! let cfg = LlmConfig::default();
//! let client = ensure_llm_ready(&cfg)?;
//! assert_eq!(client.model_name(), "gpt-4o");
//! # Ok(())
//! # }
//! ```
pub mod openai;
pub mod tokenizer;
pub mod traits;

use aum_common::{AumError, Result};
use aum_config::LlmConfig;
use openai::OpenAiClient;
use std::sync::Arc;
use traits::LlmClient;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Build the configured completion provider.
///
/// A missing credential is a configuration failure and is reported before
/// any pipeline work starts.
pub fn ensure_llm_ready(config: &LlmConfig) -> Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Openai {
            model,
            auth_token,
            endpoint,
            ..
        } => {
            let key = auth_token
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty() && !k.starts_with("${"))
                .ok_or_else(|| AumError::Config("llm.auth_token is not set".to_string()))?;
            let client = OpenAiClient::new(key.to_string(), model.clone(), endpoint)?;
            Ok(Arc::new(client))
        }
    }
}
