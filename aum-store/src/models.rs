use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Platform / content bucket a discovered URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Corporate,
    Linkedin,
    Instagram,
    Twitter,
    Facebook,
    News,
    Reports,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Corporate,
        Category::Linkedin,
        Category::Instagram,
        Category::Twitter,
        Category::Facebook,
        Category::News,
        Category::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Corporate => "corporate",
            Category::Linkedin => "linkedin",
            Category::Instagram => "instagram",
            Category::Twitter => "twitter",
            Category::Facebook => "facebook",
            Category::News => "news",
            Category::Reports => "reports",
        }
    }

    /// Social platforms whose feeds load lazily while scrolling.
    pub fn is_social_feed(&self) -> bool {
        matches!(
            self,
            Category::Instagram | Category::Linkedin | Category::Twitter
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScrapeStatus {
    Pending,
    Success,
    Failed,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Pending => "PENDING",
            ScrapeStatus::Success => "SUCCESS",
            ScrapeStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ScrapeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ScrapeStatus::Pending),
            "SUCCESS" => Ok(ScrapeStatus::Success),
            "FAILED" => Ok(ScrapeStatus::Failed),
            other => Err(anyhow::anyhow!("unknown scrape status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyLink {
    pub id: Uuid,
    pub company_id: Uuid,
    pub platform: Category,
    pub url: String,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompanyLink {
    pub company_id: Uuid,
    pub platform: Category,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub company_id: Uuid,
    pub query: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSearchResult {
    pub company_id: Uuid,
    pub query: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLog {
    pub id: Uuid,
    pub company_id: Uuid,
    pub url: String,
    pub status: ScrapeStatus,
    pub content_length: i64,
    pub error_msg: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// One fetch attempt, built by the scraper and persisted in a batch.
#[derive(Debug, Clone)]
pub struct NewScrapeLog {
    pub company_id: Uuid,
    pub url: String,
    pub status: ScrapeStatus,
    pub content_length: i64,
    pub error_msg: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl NewScrapeLog {
    pub fn success(company_id: Uuid, url: &str, content: &str) -> Self {
        Self {
            company_id,
            url: url.to_string(),
            status: ScrapeStatus::Success,
            content_length: content.chars().count() as i64,
            error_msg: None,
            scraped_at: Utc::now(),
        }
    }

    /// The error text doubles as the recorded content length.
    pub fn failure(company_id: Uuid, url: &str, error: &str) -> Self {
        Self {
            company_id,
            url: url.to_string(),
            status: ScrapeStatus::Failed,
            content_length: error.chars().count() as i64,
            error_msg: Some(error.to_string()),
            scraped_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AumSnapshot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub aum_value: String,
    pub aum_unit: Option<String>,
    pub standardized_value: Option<i64>,
    pub source_url: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAumSnapshot {
    pub company_id: Uuid,
    pub aum_value: String,
    pub aum_unit: Option<String>,
    pub standardized_value: Option<i64>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub operation_type: String,
    pub tokens_used: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageDetail {
    pub company_name: Option<String>,
    pub operation_type: String,
    pub tokens_used: i64,
    pub timestamp: DateTime<Utc>,
}
