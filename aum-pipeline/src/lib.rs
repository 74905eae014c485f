//! The AUM pipeline: discovery → scrape → extract for one company.
//!
//! Leaves first:
//! - [`normalize`]: raw monetary string → number
//! - [`select`]: relevant page fragments under a token budget
//! - [`discovery`]: search queries, relevance filter, categorizer, link dedup
//! - [`scrape`]: priority-ordered fetching with per-attempt logs
//! - [`extract`]: prompt, completion, response parsing, snapshot and usage
//! - [`orchestrator`]: [`Pipeline`], one unit of work per company
//! - [`intake`]: registering companies and reporting usage
//!
//! Every concurrent phase computes first and writes after all of its units
//! have joined, so the repository never sees concurrent writes from one run.
pub mod discovery;
pub mod extract;
pub mod intake;
pub mod normalize;
pub mod orchestrator;
pub mod scrape;
pub mod select;

pub use discovery::{DiscoveredUrls, DiscoveryEngine, DuckDuckGoSearch, SearchProvider};
pub use extract::{ExtractionAgent, ExtractionParams};
pub use intake::{JobSink, Lookup, UsageReport};
pub use orchestrator::{Pipeline, UnitOfWork};
pub use scrape::{ScrapeOrchestrator, ScrapedPage};
