use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::frontmatter::Metadata;
use super::sources::{self, SourceAnalysis};

// e.g. "2019다12345", "2020도1234"
static CASE_CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[가-힣]+\d+").unwrap());

const DISCLAIMER_MARKERS: &[&str] = &["면책 조항", "Disclaimer"];

pub const DISCLAIMER: &str = "\n\n---\n\n\
> **⚠️ 면책 조항**\n\
>\n\
> 본 문서는 정보 제공 목적으로 작성된 연구 자료이며 법률 자문을 대체하지 않습니다. \
인용된 법령과 판례는 작성 시점 기준이므로 개별 사안에 적용하기 전에 반드시 \
최신 원문을 확인하고 전문가의 검토를 받으시기 바랍니다.\n";

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub sources: SourceAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_citations: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct EnhancedDocument {
    pub metadata: Metadata,
    pub quality: QualityReport,
    pub body: String,
}

/// Score the body's sources, fill computed metadata and append the disclaimer.
pub fn enhance(mut metadata: Metadata, body: &str) -> EnhancedDocument {
    let analysis = sources::analyze(body);

    metadata
        .entry("sources_count".to_string())
        .or_insert_with(|| analysis.total_links.to_string());
    metadata
        .entry("quality_score".to_string())
        .or_insert_with(|| format!("{:.1}%", analysis.quality_score));

    let citations = count_case_citations(body);
    let quality = QualityReport {
        sources: analysis,
        case_citations: (citations > 0).then_some(citations),
    };
    debug!(
        links = quality.sources.total_links,
        broken = quality.sources.broken_links.len(),
        citations,
        "Analyzed sources"
    );

    EnhancedDocument {
        metadata,
        quality,
        body: append_disclaimer(body),
    }
}

pub fn count_case_citations(text: &str) -> usize {
    CASE_CITATION_RE.find_iter(text).count()
}

pub fn has_disclaimer(text: &str) -> bool {
    DISCLAIMER_MARKERS.iter().any(|m| text.contains(m))
}

fn append_disclaimer(body: &str) -> String {
    if has_disclaimer(body) {
        body.to_string()
    } else {
        format!("{}{}", body.trim_end(), DISCLAIMER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_missing_metadata() {
        let doc = enhance(
            Metadata::new(),
            "See [gov](https://law.go.kr/x) and [bad](not a url)",
        );
        assert_eq!(doc.metadata["sources_count"], "2");
        assert_eq!(doc.metadata["quality_score"], "30.0%");
        assert_eq!(doc.quality.sources.government_sources, 1);
    }

    #[test]
    fn frontmatter_values_win() {
        let mut meta = Metadata::new();
        meta.insert("sources_count".into(), "12".into());
        meta.insert("quality_score".into(), "manual".into());
        let doc = enhance(meta, "[a](https://www.law.go.kr)");
        assert_eq!(doc.metadata["sources_count"], "12");
        assert_eq!(doc.metadata["quality_score"], "manual");
        assert_eq!(doc.quality.sources.total_links, 1);
    }

    #[test]
    fn zero_links_report() {
        let doc = enhance(Metadata::new(), "no sources here");
        assert_eq!(doc.metadata["sources_count"], "0");
        assert_eq!(doc.metadata["quality_score"], "0.0%");
    }

    #[test]
    fn counts_case_citations() {
        let doc = enhance(
            Metadata::new(),
            "대법원 2019다12345 판결 및 2020도1234 판결 참조",
        );
        assert_eq!(doc.quality.case_citations, Some(2));
    }

    #[test]
    fn no_citations_left_unset() {
        let doc = enhance(Metadata::new(), "Case 2019 decided in Seoul");
        assert_eq!(doc.quality.case_citations, None);
        let json = serde_json::to_value(&doc.quality).unwrap();
        assert!(json.get("case_citations").is_none());
    }

    #[test]
    fn disclaimer_appended_once() {
        let first = enhance(Metadata::new(), "# Report\n\nBody text.");
        assert!(has_disclaimer(&first.body));
        assert!(first.body.starts_with("# Report\n\nBody text."));

        let second = enhance(first.metadata.clone(), &first.body);
        assert_eq!(second.body, first.body);
        assert_eq!(second.body.matches("면책 조항").count(), 1);
    }

    #[test]
    fn existing_english_disclaimer_respected() {
        let body = "Findings.\n\nDisclaimer: not legal advice.";
        let doc = enhance(Metadata::new(), body);
        assert_eq!(doc.body, body);
    }

    #[test]
    fn marker_is_case_sensitive() {
        let doc = enhance(Metadata::new(), "disclaimer in lowercase");
        assert!(doc.body.contains("면책 조항"));
    }
}
