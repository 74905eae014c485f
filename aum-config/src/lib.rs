//! Loader for `aum.yaml` with environment overlays.
//!
//! Precedence, lowest first: built-in defaults, the YAML file(s), then
//! `AUM_`-prefixed environment variables (`AUM_DATABASE__URL`, `AUM_LLM__MODEL`,
//! ...). After merging, every string value has `${VAR}` placeholders expanded.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AumConfig {
    pub version: Option<String>,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub pipeline: PipelineConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://aum.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        auth_token: Option<String>,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::Openai {
            model: default_openai_model(),
            auth_token: None,
            temperature: None,
            max_tokens: default_max_tokens(),
            endpoint: default_openai_endpoint(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o".into()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
        }
    }
}

/// Tunables of the discovery / scrape / extract core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub search_concurrency: usize,
    pub scrape_concurrency: usize,
    pub token_budget: usize,
    pub search_jitter_ms: (u64, u64),
    pub scrape_settle_ms: (u64, u64),
    pub unit_cooldown_ms: u64,
    pub search_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub scroll_cycles: u32,
    pub scroll_pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_concurrency: 4,
            scrape_concurrency: 4,
            token_budget: 1350,
            search_jitter_ms: (1500, 3500),
            scrape_settle_ms: (1000, 3000),
            unit_cooldown_ms: 1000,
            search_timeout_secs: 40,
            page_timeout_secs: 45,
            scroll_cycles: 3,
            scroll_pause_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub mailbox: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 1,
            mailbox: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String,
    pub dir: Option<String>,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".into(),
            dir: None,
            stderr: true,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct AumConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for AumConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AumConfigLoader {
    /// Start with the `AUM_` env overlay and nothing else.
    ///
    /// ```
    /// use aum_config::AumConfigLoader;
    ///
    /// let config = AumConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.pipeline.token_budget, 1350);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(
            Environment::with_prefix("AUM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but silently skips a missing file,
    /// so deployments can run from environment variables alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use aum_config::{AumConfigLoader, LlmConfig};
    ///
    /// let cfg = AumConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   provider: openai
    ///   model: gpt-4o-mini
    ///   auth_token: sk-test
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let LlmConfig::Openai { model, max_tokens, .. } = &cfg.llm;
    /// assert_eq!(model, "gpt-4o-mini");
    /// assert_eq!(*max_tokens, 150);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and deserialize.
    pub fn load(self) -> Result<AumConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: AumConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Recife")), ("STATE", Some("PE"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Recife", { "loc": "Recife-PE" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${AUM_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${AUM_DOES_NOT_EXIST}"));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = AumConfigLoader::new().with_yaml_str("{}").load().unwrap();
        assert_eq!(cfg.pipeline.search_concurrency, 4);
        assert_eq!(cfg.pipeline.scrape_concurrency, 4);
        assert_eq!(cfg.pipeline.search_jitter_ms, (1500, 3500));
        assert_eq!(cfg.browser.webdriver_url, "http://localhost:9515");
        assert_eq!(cfg.worker.count, 1);
        assert!(matches!(cfg.llm, LlmConfig::Openai { auth_token: None, .. }));
    }
}
