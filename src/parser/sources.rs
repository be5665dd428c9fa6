use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use url::Url;

static INLINE_LINKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap());

const GOVERNMENT_DOMAINS: &[&str] = &[".go.kr", ".gov", ".gov.uk", "korea.kr", "europa.eu"];
const ACADEMIC_DOMAINS: &[&str] = &[
    ".ac.kr",
    ".edu",
    ".ac.uk",
    "scholar.google",
    "riss.kr",
    "dbpia.co.kr",
    "jstor.org",
    "arxiv.org",
    "ssrn.com",
];
const LEGAL_DOMAINS: &[&str] = &[
    "casenote.kr",
    "lawnb.com",
    "lbox.kr",
    "bigcase.ai",
    "westlaw.com",
    "lexisnexis.com",
    "law.cornell.edu",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Government,
    Academic,
    Legal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceAnalysis {
    pub total_links: usize,
    pub valid_links: usize,
    pub government_sources: usize,
    pub academic_sources: usize,
    pub legal_sources: usize,
    /// Unique unresolvable URLs in document order.
    pub broken_links: IndexSet<String>,
    pub quality_score: f64,
}

/// Scan `[label](url)` links in `body` and score them.
pub fn analyze(body: &str) -> SourceAnalysis {
    let mut analysis = SourceAnalysis::default();

    for caps in INLINE_LINKS_RE.captures_iter(body) {
        let raw = caps[2].trim();
        analysis.total_links += 1;

        let Some(host) = resolve_host(raw) else {
            analysis.broken_links.insert(raw.to_string());
            continue;
        };
        analysis.valid_links += 1;

        match classify_host(&host) {
            Some(SourceKind::Government) => analysis.government_sources += 1,
            Some(SourceKind::Academic) => analysis.academic_sources += 1,
            Some(SourceKind::Legal) => analysis.legal_sources += 1,
            None => {}
        }
    }

    analysis.quality_score = quality_score(&analysis);
    analysis
}

/// Lowercased host of an absolute URL, `None` when it cannot be resolved.
fn resolve_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if url.scheme().is_empty() {
        return None;
    }
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// First matching category, checked government → academic → legal.
pub fn classify_host(host: &str) -> Option<SourceKind> {
    let host = host.to_lowercase();
    [
        (SourceKind::Government, GOVERNMENT_DOMAINS),
        (SourceKind::Academic, ACADEMIC_DOMAINS),
        (SourceKind::Legal, LEGAL_DOMAINS),
    ]
    .into_iter()
    .find(|(_, domains)| domains.iter().any(|d| domain_matches(&host, d)))
    .map(|(kind, _)| kind)
}

fn domain_matches(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('.') {
        Some(bare) => host == bare || host.ends_with(pattern),
        None => host.contains(pattern),
    }
}

fn quality_score(a: &SourceAnalysis) -> f64 {
    if a.total_links == 0 {
        return 0.0;
    }
    let total = a.total_links as f64;
    let broken = (a.total_links - a.valid_links) as f64;
    let weighted = 0.4 * (a.government_sources as f64 / total)
        + 0.3 * (a.academic_sources as f64 / total)
        + 0.3 * (a.legal_sources as f64 / total)
        + 0.2 * (1.0 - broken / total);
    100.0 * weighted.min(1.0)
}
