use async_trait::async_trait;
use aum_common::AumError;
use aum_pipeline::intake::{register_companies, requeue_company, today_usage_report};
use aum_pipeline::{JobSink, Lookup};
use aum_store::{Repository, SqliteRepository};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct RecordingSink {
    queued: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl JobSink for RecordingSink {
    async fn enqueue(&self, company_id: Uuid) -> anyhow::Result<()> {
        self.queued.lock().unwrap().push(company_id);
        Ok(())
    }
}

#[tokio::test]
async fn only_new_names_are_queued() {
    let repo = SqliteRepository::in_memory().await.unwrap();
    let sink = RecordingSink::default();
    repo.insert_company("Existing Gestora").await.unwrap();

    let dispatched = register_companies(
        &repo,
        &sink,
        ["Acme Capital", "", "   ", "Existing Gestora", "Beta Invest", "Acme Capital"],
    )
    .await
    .unwrap();

    assert_eq!(dispatched, 2);
    let queued = sink.queued.lock().unwrap().clone();
    assert_eq!(queued.len(), 2);
    let acme = repo.find_company_by_name("Acme Capital").await.unwrap().unwrap();
    assert!(queued.contains(&acme.id));
}

#[tokio::test]
async fn requeue_by_id_or_name() {
    let repo = SqliteRepository::in_memory().await.unwrap();
    let sink = RecordingSink::default();
    let acme = repo.insert_company("Acme Capital").await.unwrap();

    let by_id = requeue_company(&repo, &sink, Lookup::Id(acme.id)).await.unwrap();
    let by_name = requeue_company(&repo, &sink, Lookup::Name("Acme Capital".into()))
        .await
        .unwrap();
    assert_eq!(by_id, acme.id);
    assert_eq!(by_name, acme.id);
    assert_eq!(sink.queued.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn requeue_of_unknown_company_fails() {
    let repo = SqliteRepository::in_memory().await.unwrap();
    let sink = RecordingSink::default();

    let missing = Uuid::new_v4();
    assert!(matches!(
        requeue_company(&repo, &sink, Lookup::Id(missing)).await,
        Err(AumError::CompanyNotFound(id)) if id == missing
    ));
    assert!(matches!(
        requeue_company(&repo, &sink, Lookup::Name("Nobody".into())).await,
        Err(AumError::UnknownCompanyName(_))
    ));
    assert!(sink.queued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn usage_report_sums_today() {
    let repo = SqliteRepository::in_memory().await.unwrap();
    let acme = repo.insert_company("Acme Capital").await.unwrap();
    repo.record_usage(Some(acme.id), "aum_extraction", 100).await.unwrap();
    repo.record_usage(Some(acme.id), "aum_extraction", 200).await.unwrap();

    let report = today_usage_report(&repo).await.unwrap();
    assert_eq!(report.total_tokens_today, 300);
    assert_eq!(report.details.len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_tokens_today"], 300);
    assert_eq!(json["details"][0]["company_name"], "Acme Capital");
}
