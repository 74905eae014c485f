//! Extraction Agent: select, prompt, complete, parse, normalize, persist.
use crate::normalize::normalize_aum_value;
use crate::scrape::ScrapedPage;
use crate::select::extract_relevant_chunks;
use aum_common::{AumError, Result};
use aum_llm::tokenizer::Tokenizer;
use aum_llm::traits::{CompletionRequest, LlmClient};
use aum_store::{AumSnapshot, Company, NewAumSnapshot, Repository};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};

/// Answer the model gives when the content has no AUM figure.
pub const NOT_AVAILABLE: &str = "NAO_DISPONIVEL";
/// Operation name recorded in the usage ledger.
pub const USAGE_OPERATION: &str = "aum_extraction";
/// Unit recorded when the raw value carries no currency symbol.
pub const DEFAULT_UNIT: &str = "USD";

const EXTRACTION_PROMPT: &str = r#"
Qual é o patrimônio sob gestão (AUM) anunciado por {company_name}?

Analise o conteúdo fornecido e responda APENAS com:
- O valor numérico e unidade (ex.: R$ 2,3 bi)
- OU "NAO_DISPONIVEL" se não encontrar

Também indique a fonte exata onde encontrou a informação.

Conteúdo para análise:
{relevant_content}
"#;

static UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)US\$|R\$|€|\$").expect("static unit pattern"));

static SOURCE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(fonte|source)\s*:\s*").expect("static label pattern"));

/// What the model answered, once its shape has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    NotAvailable,
    Value { raw: String, source: String },
}

/// Fixed parameters of the completion call.
#[derive(Debug, Clone)]
pub struct ExtractionParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Ceiling for both the selected content per page and the whole prompt.
    pub token_budget: usize,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: None,
            token_budget: 1350,
        }
    }
}

pub fn build_prompt(company_name: &str, relevant_content: &str) -> String {
    EXTRACTION_PROMPT
        .replace("{company_name}", company_name)
        .replace("{relevant_content}", relevant_content)
}

/// Hard cut of `prompt` to at most `budget` tokens.
pub fn truncate_prompt(prompt: &str, tokenizer: &dyn Tokenizer, budget: usize) -> String {
    let tokens = tokenizer.encode(prompt);
    if tokens.len() <= budget {
        return prompt.to_string();
    }
    info!(tokens = tokens.len(), budget, "extract.prompt.truncated");
    tokenizer.decode(&tokens[..budget])
}

/// Currency symbol found in the raw value, or [`DEFAULT_UNIT`].
pub fn extract_unit(raw_value: &str) -> String {
    UNIT.find(raw_value)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

fn strip_source_label(line: &str) -> String {
    SOURCE_LABEL.replace(line, "").trim().to_string()
}

/// Accepts the not-available sentinel anywhere in the text, or exactly three
/// lines: value, explanation (ignored), labelled source.
pub fn parse_response(text: &str) -> Result<Parsed> {
    let text = text.trim();
    if text.to_uppercase().contains(NOT_AVAILABLE) {
        return Ok(Parsed::NotAvailable);
    }
    let lines: Vec<&str> = text.lines().collect();
    match lines.as_slice() {
        [raw, _, source] => Ok(Parsed::Value {
            raw: raw.trim().to_string(),
            source: strip_source_label(source),
        }),
        _ => Err(AumError::ContractViolation(format!(
            "expected 3 lines or {NOT_AVAILABLE}, got {} line(s)",
            lines.len()
        ))),
    }
}

/// Snapshot to persist for a parsed answer. `None` when the value cannot be
/// normalized.
pub fn snapshot_for(company: &Company, parsed: Parsed) -> Option<NewAumSnapshot> {
    match parsed {
        Parsed::NotAvailable => Some(NewAumSnapshot {
            company_id: company.id,
            aum_value: NOT_AVAILABLE.to_string(),
            aum_unit: None,
            standardized_value: None,
            source_url: None,
        }),
        Parsed::Value { raw, source } => {
            let value = normalize_aum_value(&raw)?;
            Some(NewAumSnapshot {
                company_id: company.id,
                aum_unit: Some(extract_unit(&raw)),
                aum_value: raw,
                standardized_value: Some(value as i64),
                source_url: Some(source),
            })
        }
    }
}

/// Holds the completion provider and the fixed call parameters; the
/// extraction steps are the free functions of this module.
pub struct ExtractionAgent {
    llm: Arc<dyn LlmClient + Send + Sync>,
    tokenizer: Arc<dyn Tokenizer>,
    repo: Arc<dyn Repository>,
    params: ExtractionParams,
}

impl ExtractionAgent {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        tokenizer: Arc<dyn Tokenizer>,
        repo: Arc<dyn Repository>,
        params: ExtractionParams,
    ) -> Self {
        Self {
            llm,
            tokenizer,
            repo,
            params,
        }
    }

    /// Concatenate the relevant text of every page, each block prefixed by
    /// its source URL.
    pub fn content_block(&self, pages: &[ScrapedPage]) -> String {
        let mut content = String::new();
        for page in pages {
            let relevant =
                extract_relevant_chunks(&page.content, self.tokenizer.as_ref(), self.params.token_budget);
            if relevant.is_empty() {
                info!(url = %page.url, "extract.page.skipped");
                continue;
            }
            content.push_str(&format!("SOURCE: {}\n{}\n", page.url, relevant));
        }
        content
    }

    /// Run one extraction for `company`.
    ///
    /// `Ok(None)` means the answer could not be normalized and nothing was
    /// stored. A provider failure is not retried and stores nothing. Usage
    /// is recorded as soon as the provider answers, even if the answer then
    /// violates the response contract.
    pub async fn extract(
        &self,
        company: &Company,
        pages: &[ScrapedPage],
    ) -> Result<Option<AumSnapshot>> {
        info!(company = %company.name, pages = pages.len(), "extract.start");

        let content = self.content_block(pages);
        let prompt = truncate_prompt(
            &build_prompt(&company.name, &content),
            self.tokenizer.as_ref(),
            self.params.token_budget,
        );

        let response = match self
            .llm
            .complete(
                CompletionRequest::new(&prompt)
                    .max_tokens(self.params.max_tokens)
                    .temperature(self.params.temperature),
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(company = %company.name, error = %e, "extract.completion.failed");
                return Err(e);
            }
        };

        let tokens = i64::from(response.tokens_used.unwrap_or(0));
        self.repo
            .record_usage(Some(company.id), USAGE_OPERATION, tokens)
            .await?;

        let parsed = match parse_response(&response.text) {
            Ok(p) => p,
            Err(e) => {
                error!(company = %company.name, response = %response.text, error = %e, "extract.contract_violation");
                return Err(e);
            }
        };

        let raw = match &parsed {
            Parsed::Value { raw, .. } => Some(raw.clone()),
            Parsed::NotAvailable => None,
        };
        let Some(new_snapshot) = snapshot_for(company, parsed) else {
            warn!(
                company = %company.name,
                raw_value = raw.as_deref().unwrap_or_default(),
                "extract.normalize.failed"
            );
            return Ok(None);
        };

        let snapshot = self.repo.insert_snapshot(new_snapshot).await?;
        info!(
            company = %company.name,
            aum_value = %snapshot.aum_value,
            standardized_value = ?snapshot.standardized_value,
            "extract.snapshot.saved"
        );
        Ok(Some(snapshot))
    }
}
