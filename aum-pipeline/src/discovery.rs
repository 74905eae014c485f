//! Discovery Engine: search, filter, categorize, dedup.
use aum_config::PipelineConfig;
use aum_drivers::{BehavioralEngine, BrowserSession};
use aum_store::{Category, Company, NewCompanyLink, NewSearchResult, Repository};
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// Category → unique URLs found during one run.
pub type DiscoveredUrls = BTreeMap<Category, BTreeSet<String>>;

const DDG_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

static REPORTS_KW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(relat[óo]rio|report|balan[çc]o|demonstrativo|investor relations)")
        .expect("static reports pattern")
});

static NEWS_KW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(notícia|news|jornal|magazine|g1|cnn|bloomberg)").expect("static news pattern")
});

static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[class="result__a"]"#).expect("static selector"));

/// Returns the rendered HTML of a results page for `query`.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

/// DuckDuckGo's no-JS results page, fetched through a browser page.
pub struct DuckDuckGoSearch {
    browser: Arc<dyn BrowserSession>,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(browser: Arc<dyn BrowserSession>, timeout: Duration) -> Self {
        Self { browser, timeout }
    }

    pub fn query_url(query: &str) -> anyhow::Result<Url> {
        Ok(Url::parse_with_params(DDG_HTML_ENDPOINT, &[("q", query)])?)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        let url = Self::query_url(query)?;
        let mut page = self.browser.open_page().await?;
        let html = async {
            page.enable_network_events().await?;
            page.navigate(url.as_str(), self.timeout).await?;
            page.content().await
        }
        .await;
        if let Err(e) = page.close().await {
            debug!(error = %e, "discovery.page.close_failed");
        }
        html
    }
}

/// One anchor from a results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// The fixed query set for one company.
pub fn build_queries(company_name: &str) -> Vec<String> {
    let quoted = format!("\"{company_name}\"");
    vec![
        quoted.clone(),
        format!("{quoted} site:linkedin.com/company"),
        format!("{quoted} site:instagram.com"),
        format!("{quoted} site:facebook.com"),
        format!("{quoted} site:twitter.com OR site:x.com"),
        format!("{quoted} patrimônio sob gestão"),
        format!("{quoted} assets under management"),
        format!("{quoted} AUM relatório"),
    ]
}

/// Result anchors wrap the destination in a `uddg` redirect parameter.
fn resolve_redirect(href: &str) -> Option<String> {
    let base = Url::parse(DDG_HTML_ENDPOINT).ok()?;
    let wrapped = base.join(href).ok()?;
    wrapped
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
}

/// The company name must show up in the title, or (without spaces) in the URL.
pub fn is_relevant(hit: &SearchHit, company_name: &str) -> bool {
    let name = company_name.to_lowercase();
    let name_no_space = name.replace(' ', "");
    hit.title.to_lowercase().contains(&name) || hit.url.to_lowercase().contains(&name_no_space)
}

/// Parse the results page and keep the hits relevant to `company_name`.
pub fn parse_results(html: &str, company_name: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_LINK)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let url = resolve_redirect(href)?;
            let title = a.text().collect::<String>().trim().to_string();
            Some(SearchHit { title, url })
        })
        .filter(|hit| is_relevant(hit, company_name))
        .collect()
}

/// First matching rule wins. `None` means the URL is dropped (Instagram
/// stories and reels).
pub fn categorize(hit: &SearchHit) -> Option<Category> {
    let url = hit.url.as_str();
    let title = hit.title.to_lowercase();

    if url.contains("linkedin.com") {
        Some(Category::Linkedin)
    } else if url.contains("instagram.com") {
        (!url.contains("stories") && !url.contains("reel")).then_some(Category::Instagram)
    } else if url.contains("twitter.com") || url.contains("x.com") {
        Some(Category::Twitter)
    } else if url.contains("facebook.com") {
        Some(Category::Facebook)
    } else if REPORTS_KW.is_match(&title) {
        Some(Category::Reports)
    } else if NEWS_KW.is_match(&title) {
        Some(Category::News)
    } else {
        Some(Category::Corporate)
    }
}

pub struct DiscoveryEngine {
    search: Arc<dyn SearchProvider>,
    repo: Arc<dyn Repository>,
    pacing: BehavioralEngine,
    settings: PipelineConfig,
}

impl DiscoveryEngine {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        repo: Arc<dyn Repository>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            search,
            repo,
            pacing: BehavioralEngine::new(),
            settings,
        }
    }

    async fn run_query(&self, limiter: &Semaphore, query: &str, company_name: &str) -> Vec<SearchHit> {
        let Ok(_permit) = limiter.acquire().await else {
            return Vec::new();
        };
        let (lo, hi) = self.settings.search_jitter_ms;
        self.pacing.random_delay(lo, hi).await;

        let hits = match self.search.search(query).await {
            Ok(html) => {
                let hits = parse_results(&html, company_name);
                info!(query, relevant = hits.len(), "discovery.query.ok");
                hits
            }
            Err(e) => {
                warn!(query, error = %e, "discovery.query.failed");
                Vec::new()
            }
        };

        tokio::time::sleep(Duration::from_millis(self.settings.unit_cooldown_ms)).await;
        hits
    }

    /// Run every query for `company`, persist the relevant hits and any new
    /// links, and return everything found in this run by category.
    ///
    /// A failing query counts as zero results. Persistence happens once,
    /// after every query has finished.
    pub async fn discover(&self, company: &Company) -> anyhow::Result<DiscoveredUrls> {
        let limiter = Semaphore::new(self.settings.search_concurrency.max(1));
        let queries = build_queries(&company.name);

        let per_query = join_all(
            queries
                .iter()
                .map(|q| self.run_query(&limiter, q, &company.name)),
        )
        .await;

        let mut results = Vec::new();
        let mut discovered = DiscoveredUrls::new();
        for (query, hits) in queries.iter().zip(per_query) {
            for hit in hits {
                if let Some(category) = categorize(&hit) {
                    discovered.entry(category).or_default().insert(hit.url.clone());
                }
                results.push(NewSearchResult {
                    company_id: company.id,
                    query: query.clone(),
                    title: hit.title,
                    url: hit.url,
                });
            }
        }

        let mut new_links = Vec::new();
        for (category, urls) in &discovered {
            for url in urls {
                if !self.repo.link_exists(url).await? {
                    new_links.push(NewCompanyLink {
                        company_id: company.id,
                        platform: *category,
                        url: url.clone(),
                    });
                }
            }
        }

        let inserted = self.repo.commit_discovery(results, new_links).await?;
        let counts: BTreeMap<&str, usize> = discovered
            .iter()
            .map(|(c, urls)| (c.as_str(), urls.len()))
            .collect();
        info!(company = %company.name, inserted, ?counts, "discovery.links.inserted");
        Ok(discovered)
    }
}
