//! Picks the fragments of a page that can carry an AUM figure.
use aum_llm::tokenizer::Tokenizer;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static AUM_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(aum|assets under management|patrimônio sob gestão|sob gestão|ativos sob gestão|recursos sob gestão)",
    )
    .expect("static keyword pattern")
});

static MONETARY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)((R\$|US\$) ?\d+[,.]\d+ ?\w+)").expect("static monetary pattern")
});

static TEXT_NODES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, span").expect("static selector"));

/// Trim every line and drop the blank ones.
fn sanitize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_relevant(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUM_KEYWORDS.is_match(&lower) || MONETARY_VALUE.is_match(&lower)
}

/// Extract keyword or monetary paragraphs from `html`, bounded by `budget`
/// tokens.
///
/// Selection stops at the first fragment that would overflow the budget;
/// later fragments are not considered even if they would fit.
pub fn extract_relevant_chunks(html: &str, tokenizer: &dyn Tokenizer, budget: usize) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let doc = Html::parse_document(html);
    let mut chunks = Vec::new();
    let mut total = 0usize;

    for el in doc.select(&TEXT_NODES) {
        let text: String = el.text().collect();
        if !is_relevant(&text) {
            continue;
        }
        let chunk = sanitize(&text);
        let cost = tokenizer.count(&chunk);
        if total + cost > budget {
            break;
        }
        total += cost;
        chunks.push(chunk);
    }

    chunks.join("\n")
}
