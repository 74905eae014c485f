mod common;

use aum_common::AumError;
use aum_pipeline::{ExtractionParams, Pipeline};
use aum_store::{Repository, SqliteRepository};
use common::{ddg_anchor, fast_settings, CharTokenizer, PageReply, StubBrowser, StubLlm, StubSearch};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const REPORT_URL: &str = "https://fake.url/report";

struct Harness {
    repo: Arc<SqliteRepository>,
    search: Arc<StubSearch>,
    llm: Arc<StubLlm>,
    pipeline: Pipeline,
}

async fn harness(page_html: &str, llm: StubLlm) -> Harness {
    common::init_test_tracing();
    let repo = Arc::new(SqliteRepository::in_memory().await.unwrap());
    let search = Arc::new(StubSearch::new(ddg_anchor("Flow Test Corp", REPORT_URL)));
    let browser = StubBrowser::new(
        HashMap::from([(REPORT_URL.to_string(), PageReply::Html(page_html.to_string()))]),
        Duration::ZERO,
    );
    let llm = Arc::new(llm);
    let pipeline = Pipeline::new(
        repo.clone(),
        Arc::new(browser),
        search.clone(),
        llm.clone(),
        Arc::new(CharTokenizer),
        fast_settings(),
        ExtractionParams::default(),
    );
    Harness {
        repo,
        search,
        llm,
        pipeline,
    }
}

#[tokio::test]
async fn flow_test_corp_end_to_end() {
    let h = harness(
        "<html>AUM é R$ 500 milhões</html>",
        StubLlm::answering("R$ 500 milhões\n\nFonte: https://fake.url/report", 125),
    )
    .await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    h.pipeline.process_company(company.id).await;

    let links = h.repo.links_for_company(company.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, REPORT_URL);

    let snapshots = h.repo.snapshots_for_company(company.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    let snap = &snapshots[0];
    assert_eq!(snap.aum_value, "R$ 500 milhões");
    assert_eq!(snap.aum_unit.as_deref(), Some("R$"));
    assert_eq!(snap.standardized_value, Some(500_000_000));
    assert_eq!(snap.source_url.as_deref(), Some(REPORT_URL));

    let usage = h.repo.usage_for_company(company.id).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].tokens_used, 125);
    assert_eq!(usage[0].operation_type, "aum_extraction");
}

#[tokio::test]
async fn selected_content_reaches_the_prompt() {
    let h = harness(
        "<html><body><p>O patrimônio sob gestão é de R$ 2,3 bi</p><p>Contato</p></body></html>",
        StubLlm::answering("R$ 2,3 bi\nrelatório\nFonte: https://fake.url/report", 90),
    )
    .await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    let snapshot = h.pipeline.run(company.id).await.unwrap().unwrap();
    assert_eq!(snapshot.standardized_value, Some(2_300_000_000));

    let prompts = h.llm.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("anunciado por Flow Test Corp?"));
    assert!(prompts[0].contains("SOURCE: https://fake.url/report\nO patrimônio sob gestão é de R$ 2,3 bi\n"));
    assert!(!prompts[0].contains("Contato"));
}

#[tokio::test]
async fn oversized_prompt_is_cut_to_budget() {
    let paragraphs: String = (0..400)
        .map(|i| format!("<p>AUM trimestre {i}: R$ {i},5 bi</p>"))
        .collect();
    let h = harness(
        &format!("<html><body>{paragraphs}</body></html>"),
        StubLlm::answering("NAO_DISPONIVEL", 10),
    )
    .await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    h.pipeline.process_company(company.id).await;

    let prompts = h.llm.prompts.lock().unwrap().clone();
    assert_eq!(prompts[0].chars().count(), 1350);
    assert!(prompts[0].contains("Flow Test Corp"));
}

#[tokio::test]
async fn not_available_keeps_only_the_sentinel() {
    let h = harness(
        "<html><body><p>Sem dados</p></body></html>",
        StubLlm::answering("NAO_DISPONIVEL", 40),
    )
    .await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    h.pipeline.process_company(company.id).await;

    let snapshots = h.repo.snapshots_for_company(company.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].aum_value, "NAO_DISPONIVEL");
    assert!(snapshots[0].aum_unit.is_none());
    assert!(snapshots[0].standardized_value.is_none());
    assert!(snapshots[0].source_url.is_none());
    assert_eq!(h.repo.today_usage().await.unwrap(), 40);
}

#[tokio::test]
async fn provider_failure_stores_nothing() {
    let h = harness("<p>AUM R$ 1,0 bi</p>", StubLlm::failing("upstream 500")).await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    let err = h.pipeline.run(company.id).await.unwrap_err();
    assert!(matches!(err, AumError::Extraction(_)));
    h.pipeline.process_company(company.id).await;

    assert!(h.repo.snapshots_for_company(company.id).await.unwrap().is_empty());
    assert!(h.repo.usage_for_company(company.id).await.unwrap().is_empty());
    // earlier phases keep what they committed
    assert_eq!(h.repo.scrape_logs_for_company(company.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_answer_is_a_contract_violation() {
    let h = harness("<p>AUM R$ 1,0 bi</p>", StubLlm::answering("R$ 1,0 bi", 55)).await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    let err = h.pipeline.run(company.id).await.unwrap_err();
    assert!(matches!(err, AumError::ContractViolation(_)));
    assert!(h.repo.snapshots_for_company(company.id).await.unwrap().is_empty());
    assert_eq!(h.repo.usage_for_company(company.id).await.unwrap()[0].tokens_used, 55);
}

#[tokio::test]
async fn unnormalizable_value_stores_no_snapshot() {
    let h = harness(
        "<p>AUM R$ 1,0 bi</p>",
        StubLlm::answering("muito dinheiro\n\nFonte: https://fake.url/report", 70),
    )
    .await;
    let company = h.repo.insert_company("Flow Test Corp").await.unwrap();

    let stored = h.pipeline.run(company.id).await.unwrap();
    assert!(stored.is_none());
    assert!(h.repo.snapshots_for_company(company.id).await.unwrap().is_empty());
    assert_eq!(h.repo.today_usage().await.unwrap(), 70);
}

#[tokio::test]
async fn unknown_company_does_nothing() {
    let h = harness("<p>AUM</p>", StubLlm::answering("NAO_DISPONIVEL", 1)).await;
    let missing = Uuid::new_v4();

    h.pipeline.process_company(missing).await;
    assert!(matches!(
        h.pipeline.run(missing).await,
        Err(AumError::CompanyNotFound(id)) if id == missing
    ));
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 0);
    assert!(h.llm.prompts.lock().unwrap().is_empty());
}
