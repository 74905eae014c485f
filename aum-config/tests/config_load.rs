use aum_config::{AumConfigLoader, LlmConfig};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "0.1"
database:
  url: "sqlite://${AUM_TEST_DB_DIR}/aum.db"
llm:
  provider: openai
  model: gpt-4o
  auth_token: "${AUM_TEST_OPENAI_KEY}"
  max_tokens: 150
pipeline:
  search_concurrency: 2
  search_jitter_ms: [0, 10]
worker:
  count: 3
"#;

#[test]
#[serial]
fn loads_file_and_expands_env() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "aum.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("AUM_TEST_DB_DIR", Some("/var/lib/aum")),
            ("AUM_TEST_OPENAI_KEY", Some("sk-from-env")),
        ],
        || {
            let config = AumConfigLoader::new().with_file(&p).load().expect("load");

            assert_eq!(config.database.url, "sqlite:///var/lib/aum/aum.db");
            assert_eq!(config.pipeline.search_concurrency, 2);
            assert_eq!(config.pipeline.scrape_concurrency, 4);
            assert_eq!(config.pipeline.search_jitter_ms, (0, 10));
            assert_eq!(config.worker.count, 3);
            let LlmConfig::Openai { auth_token, .. } = &config.llm;
            assert_eq!(auth_token.as_deref(), Some("sk-from-env"));
        },
    );
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "aum.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("AUM_WORKER__COUNT", Some("5")),
            ("AUM_TEST_DB_DIR", Some("/tmp")),
            ("AUM_TEST_OPENAI_KEY", Some("k")),
        ],
        || {
            let config = AumConfigLoader::new().with_file(&p).load().expect("load");
            assert_eq!(config.worker.count, 5);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = AumConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(config.pipeline.token_budget, 1350);
    assert_eq!(config.database.url, "sqlite://aum.db?mode=rwc");
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let res = AumConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(res.is_err());
}
