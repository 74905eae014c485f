//! Token counting and truncation.
use aum_common::{AumError, Result};
use tiktoken_rs::CoreBPE;

/// Subword tokenizer used to enforce prompt budgets.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn decode(&self, tokens: &[u32]) -> String;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// `o200k_base`, the byte-pair encoding of the gpt-4o model family.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    pub fn for_gpt4o() -> Result<Self> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| AumError::Config(format!("tokenizer init failed: {e}")))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        // A hard cut can split a multi-byte character; back off until the tail decodes.
        let mut end = tokens.len();
        while end > 0 {
            let slice = tokens[..end].iter().map(|&t| t as _).collect();
            if let Ok(text) = self.bpe.decode(slice) {
                return text;
            }
            end -= 1;
        }
        String::new()
    }
}
