#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use aum_common::Result;
use aum_config::PipelineConfig;
use aum_drivers::{BrowserSession, PageSession};
use aum_llm::tokenizer::Tokenizer;
use aum_llm::traits::{Completion, CompletionRequest, LlmClient};
use aum_pipeline::SearchProvider;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline settings with every pacing delay removed.
pub fn fast_settings() -> PipelineConfig {
    PipelineConfig {
        search_jitter_ms: (0, 0),
        scrape_settle_ms: (0, 0),
        unit_cooldown_ms: 0,
        scroll_pause_ms: 0,
        ..PipelineConfig::default()
    }
}

/// Tracks how many units are inside a section at once.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// One DuckDuckGo-style result anchor.
pub fn ddg_anchor(title: &str, url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    format!(
        r#"<div class="result"><a class="result__a" href="//duckduckgo.com/l/?uddg={encoded}&rut=x">{title}</a></div>"#
    )
}

/// Serves the same results page for every query unless told otherwise.
pub struct StubSearch {
    pub default_page: String,
    pub failing: HashSet<String>,
    pub delay: Duration,
    pub in_flight: InFlight,
    pub calls: AtomicUsize,
}

impl StubSearch {
    pub fn new(default_page: String) -> Self {
        Self {
            default_page,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            in_flight: InFlight::default(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.leave();
        if self.failing.contains(query) {
            return Err(anyhow!("search provider unreachable"));
        }
        Ok(self.default_page.clone())
    }
}

/// What a stub page answers for one URL.
#[derive(Clone)]
pub enum PageReply {
    Html(String),
    Fail(String),
}

#[derive(Default)]
pub struct BrowserState {
    pub replies: HashMap<String, PageReply>,
    pub delay: Duration,
    pub in_flight: InFlight,
    pub scripts: Mutex<Vec<(String, String)>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct StubBrowser {
    pub state: Arc<BrowserState>,
}

impl StubBrowser {
    pub fn new(replies: HashMap<String, PageReply>, delay: Duration) -> Self {
        Self {
            state: Arc::new(BrowserState {
                replies,
                delay,
                ..BrowserState::default()
            }),
        }
    }
}

#[async_trait]
impl BrowserSession for StubBrowser {
    async fn open_page(&self) -> anyhow::Result<Box<dyn PageSession>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            state: self.state.clone(),
            url: None,
        }))
    }
}

pub struct StubPage {
    state: Arc<BrowserState>,
    url: Option<String>,
}

#[async_trait]
impl PageSession for StubPage {
    async fn enable_network_events(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.state.in_flight.enter();
        if !self.state.delay.is_zero() {
            tokio::time::sleep(self.state.delay).await;
        }
        self.state.in_flight.leave();
        match self.state.replies.get(url) {
            Some(PageReply::Fail(msg)) => Err(anyhow!(msg.clone())),
            _ => {
                self.url = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn execute(&mut self, script: &str) -> anyhow::Result<serde_json::Value> {
        let url = self.url.clone().unwrap_or_default();
        self.state
            .scripts
            .lock()
            .unwrap()
            .push((url, script.to_string()));
        Ok(serde_json::Value::Null)
    }

    async fn content(&mut self) -> anyhow::Result<String> {
        let url = self.url.as_deref().unwrap_or_default();
        match self.state.replies.get(url) {
            Some(PageReply::Html(html)) => Ok(html.clone()),
            _ => Ok(format!("<html><body><p>{url}</p></body></html>")),
        }
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Completion provider answering a canned text.
pub struct StubLlm {
    pub reply: std::result::Result<String, String>,
    pub tokens: Option<u32>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn answering(text: &str, tokens: u32) -> Self {
        Self {
            reply: Ok(text.to_string()),
            tokens: Some(tokens),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            tokens: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(Completion {
                text: text.clone(),
                model: Some("stub".into()),
                tokens_used: self.tokens,
            }),
            Err(msg) => Err(aum_common::AumError::Extraction(msg.clone())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// One token per character.
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        tokens.iter().filter_map(|&t| char::from_u32(t)).collect()
    }
}

static INIT_PATH: std::sync::OnceLock<std::path::PathBuf> = std::sync::OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        aum_common::observability::init_logging(aum_common::observability::LogConfig::for_tests())
            .unwrap_or_default()
    });
}
