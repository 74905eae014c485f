//! SQLite implementation of [`Repository`].
//!
//! Ids are stored as hyphenated TEXT and timestamps as RFC 3339 TEXT, which
//! keeps range scans on `usage.timestamp` ordered lexically. Writes go through
//! a one-permit semaphore so several workers sharing a pool never race for
//! the SQLite write lock.
use crate::models::*;
use crate::Repository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS company_links (
    id            TEXT PRIMARY KEY,
    company_id    TEXT NOT NULL REFERENCES companies(id),
    platform      TEXT NOT NULL,
    url           TEXT NOT NULL UNIQUE,
    discovered_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_company_links_company ON company_links(company_id);

CREATE TABLE IF NOT EXISTS search_results (
    id          TEXT PRIMARY KEY,
    company_id  TEXT NOT NULL REFERENCES companies(id),
    query       TEXT NOT NULL,
    title       TEXT NOT NULL,
    url         TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_search_results_company ON search_results(company_id);

CREATE TABLE IF NOT EXISTS scrape_logs (
    id              TEXT PRIMARY KEY,
    company_id      TEXT NOT NULL REFERENCES companies(id),
    url             TEXT NOT NULL,
    status          TEXT NOT NULL,
    content_length  INTEGER NOT NULL DEFAULT 0,
    error_msg       TEXT,
    scraped_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scrape_logs_company ON scrape_logs(company_id);

CREATE TABLE IF NOT EXISTS aum_snapshots (
    id                  TEXT PRIMARY KEY,
    company_id          TEXT NOT NULL REFERENCES companies(id),
    aum_value           TEXT NOT NULL,
    aum_unit            TEXT,
    standardized_value  INTEGER,
    source_url          TEXT,
    extracted_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_aum_snapshots_company ON aum_snapshots(company_id);

CREATE TABLE IF NOT EXISTS usage (
    id              TEXT PRIMARY KEY,
    company_id      TEXT REFERENCES companies(id),
    operation_type  TEXT NOT NULL,
    tokens_used     INTEGER NOT NULL,
    timestamp       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_usage_timestamp ON usage(timestamp);
"#;

pub struct SqliteRepository {
    pool: SqlitePool,
    write_limit: Arc<Semaphore>,
}

impl SqliteRepository {
    /// Connect to `url` (e.g. `sqlite://aum.db?mode=rwc`) and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .with_context(|| format!("failed to open database {url}"))?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database; a single pinned connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let repo = Self {
            pool,
            write_limit: Arc::new(Semaphore::new(1)),
        };
        repo.run_migrations().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        debug!("store.migrations.applied");
        Ok(())
    }
}

fn uuid_col(r: &SqliteRow, col: &str) -> Result<Uuid> {
    let raw: String = r.try_get(col)?;
    Uuid::parse_str(&raw).with_context(|| format!("bad uuid in column {col}: {raw}"))
}

fn company_from_row(r: &SqliteRow) -> Result<Company> {
    Ok(Company {
        id: uuid_col(r, "id")?,
        name: r.try_get("name")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn link_from_row(r: &SqliteRow) -> Result<CompanyLink> {
    let platform: String = r.try_get("platform")?;
    Ok(CompanyLink {
        id: uuid_col(r, "id")?,
        company_id: uuid_col(r, "company_id")?,
        platform: platform.parse()?,
        url: r.try_get("url")?,
        discovered_at: r.try_get("discovered_at")?,
    })
}

fn search_result_from_row(r: &SqliteRow) -> Result<SearchResult> {
    Ok(SearchResult {
        id: uuid_col(r, "id")?,
        company_id: uuid_col(r, "company_id")?,
        query: r.try_get("query")?,
        title: r.try_get("title")?,
        url: r.try_get("url")?,
        created_at: r.try_get("created_at")?,
    })
}

fn scrape_log_from_row(r: &SqliteRow) -> Result<ScrapeLog> {
    let status: String = r.try_get("status")?;
    Ok(ScrapeLog {
        id: uuid_col(r, "id")?,
        company_id: uuid_col(r, "company_id")?,
        url: r.try_get("url")?,
        status: status.parse()?,
        content_length: r.try_get("content_length")?,
        error_msg: r.try_get("error_msg")?,
        scraped_at: r.try_get("scraped_at")?,
    })
}

fn snapshot_from_row(r: &SqliteRow) -> Result<AumSnapshot> {
    Ok(AumSnapshot {
        id: uuid_col(r, "id")?,
        company_id: uuid_col(r, "company_id")?,
        aum_value: r.try_get("aum_value")?,
        aum_unit: r.try_get("aum_unit")?,
        standardized_value: r.try_get("standardized_value")?,
        source_url: r.try_get("source_url")?,
        extracted_at: r.try_get("extracted_at")?,
    })
}

fn usage_from_row(r: &SqliteRow) -> Result<UsageRecord> {
    let company_id: Option<String> = r.try_get("company_id")?;
    Ok(UsageRecord {
        id: uuid_col(r, "id")?,
        company_id: company_id.as_deref().map(Uuid::parse_str).transpose()?,
        operation_type: r.try_get("operation_type")?,
        tokens_used: r.try_get("tokens_used")?,
        timestamp: r.try_get("timestamp")?,
    })
}

fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM companies WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let row =
            sqlx::query("SELECT id, name, created_at, updated_at FROM companies WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn insert_company(&self, name: &str) -> Result<Company> {
        let _permit = self.write_limit.acquire().await?;
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            r#"INSERT INTO companies (id, name, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(company.id.to_string())
        .bind(&company.name)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;
        info!(company_id = %company.id, name = %company.name, "store.insert_company");
        Ok(company)
    }

    async fn link_exists(&self, url: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM company_links WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn links_for_company(&self, company_id: Uuid) -> Result<Vec<CompanyLink>> {
        let rows = sqlx::query(
            r#"SELECT id, company_id, platform, url, discovered_at
               FROM company_links WHERE company_id = ?1 ORDER BY discovered_at, url"#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(link_from_row).collect()
    }

    async fn search_results_for_company(&self, company_id: Uuid) -> Result<Vec<SearchResult>> {
        let rows = sqlx::query(
            r#"SELECT id, company_id, query, title, url, created_at
               FROM search_results WHERE company_id = ?1 ORDER BY created_at"#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(search_result_from_row).collect()
    }

    async fn commit_discovery(
        &self,
        results: Vec<NewSearchResult>,
        links: Vec<NewCompanyLink>,
    ) -> Result<u64> {
        let _permit = self.write_limit.acquire().await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for r in &results {
            sqlx::query(
                r#"INSERT INTO search_results (id, company_id, query, title, url, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(r.company_id.to_string())
            .bind(&r.query)
            .bind(&r.title)
            .bind(&r.url)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let mut inserted = 0u64;
        for l in &links {
            let res = sqlx::query(
                r#"INSERT INTO company_links (id, company_id, platform, url, discovered_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT(url) DO NOTHING"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(l.company_id.to_string())
            .bind(l.platform.as_str())
            .bind(&l.url)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += res.rows_affected();
        }

        tx.commit().await?;
        info!(
            search_results = results.len(),
            links_offered = links.len(),
            links_inserted = inserted,
            "store.commit_discovery"
        );
        Ok(inserted)
    }

    async fn commit_scrape_logs(&self, logs: Vec<NewScrapeLog>) -> Result<()> {
        let _permit = self.write_limit.acquire().await?;
        let mut tx = self.pool.begin().await?;
        for l in &logs {
            sqlx::query(
                r#"INSERT INTO scrape_logs
                   (id, company_id, url, status, content_length, error_msg, scraped_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(l.company_id.to_string())
            .bind(&l.url)
            .bind(l.status.as_str())
            .bind(l.content_length)
            .bind(l.error_msg.as_deref())
            .bind(l.scraped_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!(rows = logs.len(), "store.commit_scrape_logs");
        Ok(())
    }

    async fn scrape_logs_for_company(&self, company_id: Uuid) -> Result<Vec<ScrapeLog>> {
        let rows = sqlx::query(
            r#"SELECT id, company_id, url, status, content_length, error_msg, scraped_at
               FROM scrape_logs WHERE company_id = ?1 ORDER BY scraped_at"#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(scrape_log_from_row).collect()
    }

    async fn insert_snapshot(&self, s: NewAumSnapshot) -> Result<AumSnapshot> {
        let _permit = self.write_limit.acquire().await?;
        let snapshot = AumSnapshot {
            id: Uuid::new_v4(),
            company_id: s.company_id,
            aum_value: s.aum_value,
            aum_unit: s.aum_unit,
            standardized_value: s.standardized_value,
            source_url: s.source_url,
            extracted_at: Utc::now(),
        };
        sqlx::query(
            r#"INSERT INTO aum_snapshots
               (id, company_id, aum_value, aum_unit, standardized_value, source_url, extracted_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.company_id.to_string())
        .bind(&snapshot.aum_value)
        .bind(snapshot.aum_unit.as_deref())
        .bind(snapshot.standardized_value)
        .bind(snapshot.source_url.as_deref())
        .bind(snapshot.extracted_at)
        .execute(&self.pool)
        .await?;
        info!(
            company_id = %snapshot.company_id,
            aum_value = %snapshot.aum_value,
            standardized_value = ?snapshot.standardized_value,
            "store.insert_snapshot"
        );
        Ok(snapshot)
    }

    async fn snapshots_for_company(&self, company_id: Uuid) -> Result<Vec<AumSnapshot>> {
        let rows = sqlx::query(
            r#"SELECT id, company_id, aum_value, aum_unit, standardized_value, source_url, extracted_at
               FROM aum_snapshots WHERE company_id = ?1 ORDER BY extracted_at"#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(snapshot_from_row).collect()
    }

    async fn record_usage(
        &self,
        company_id: Option<Uuid>,
        operation: &str,
        tokens: i64,
    ) -> Result<UsageRecord> {
        let _permit = self.write_limit.acquire().await?;
        let record = UsageRecord {
            id: Uuid::new_v4(),
            company_id,
            operation_type: operation.to_string(),
            tokens_used: tokens,
            timestamp: Utc::now(),
        };
        sqlx::query(
            r#"INSERT INTO usage (id, company_id, operation_type, tokens_used, timestamp)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(record.id.to_string())
        .bind(record.company_id.map(|id| id.to_string()))
        .bind(&record.operation_type)
        .bind(record.tokens_used)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        info!(
            company_id = ?record.company_id,
            operation = %record.operation_type,
            tokens = record.tokens_used,
            "store.record_usage"
        );
        Ok(record)
    }

    async fn usage_for_company(&self, company_id: Uuid) -> Result<Vec<UsageRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, company_id, operation_type, tokens_used, timestamp
               FROM usage WHERE company_id = ?1 ORDER BY timestamp"#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(usage_from_row).collect()
    }

    async fn today_usage(&self) -> Result<i64> {
        let (start, end) = today_bounds();
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(tokens_used), 0) FROM usage
               WHERE timestamp >= ?1 AND timestamp < ?2"#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn today_usage_details(&self) -> Result<Vec<UsageDetail>> {
        let (start, end) = today_bounds();
        let rows = sqlx::query(
            r#"SELECT c.name AS company_name, u.operation_type, u.tokens_used, u.timestamp
               FROM usage u
               LEFT JOIN companies c ON c.id = u.company_id
               WHERE u.timestamp >= ?1 AND u.timestamp < ?2
               ORDER BY u.timestamp DESC"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(UsageDetail {
                    company_name: r.try_get("company_name")?,
                    operation_type: r.try_get("operation_type")?,
                    tokens_used: r.try_get("tokens_used")?,
                    timestamp: r.try_get("timestamp")?,
                })
            })
            .collect()
    }
}
