use std::sync::LazyLock;

use regex::Regex;

use super::markdown::slugify;

/// Literal marker authors put in the document.
pub const TOC_MARKER: &str = "[TOC]";
/// Stand-in that survives markdown conversion untouched.
pub const TOC_PLACEHOLDER: &str = "TOCPLACEHOLDER7F3A";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h([1-6])([^>]*)>(.*?)</h[1-6]>").unwrap());
static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bid="([^"]*)""#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: u8,
    pub anchor: String,
    pub text: String,
}

pub fn insert_placeholder(markdown: &str) -> String {
    markdown.replace(TOC_MARKER, TOC_PLACEHOLDER)
}

/// `h1`–`h3` headers of rendered HTML in document order.
pub fn collect_headers(html: &str) -> Vec<TocEntry> {
    HEADER_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let level: u8 = caps[1].parse().ok()?;
            if level > 3 {
                return None;
            }
            let text = TAG_RE.replace_all(&caps[3], "").trim().to_string();
            let anchor = ID_ATTR_RE
                .captures(&caps[2])
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| slugify(&text));
            Some(TocEntry { level, anchor, text })
        })
        .collect()
}

/// Nested `<ul>` markup; a deeper header opens a sublist inside the previous item.
pub fn build_toc(entries: &[TocEntry]) -> String {
    let mut out = String::from("<div class=\"toc\">\n");
    let mut stack: Vec<u8> = Vec::new();

    for entry in entries {
        match stack.last().copied() {
            None => {
                out.push_str("<ul>\n");
                stack.push(entry.level);
            }
            Some(top) if entry.level > top => {
                out.push_str("\n<ul>\n");
                stack.push(entry.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                while stack.len() > 1 && entry.level <= stack[stack.len() - 2] {
                    stack.pop();
                    out.push_str("</ul>\n</li>\n");
                }
                // A shallower sibling resets the level deeper headers nest against.
                if let Some(top) = stack.last_mut() {
                    *top = (*top).min(entry.level);
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.anchor, entry.text
        ));
    }

    if !stack.is_empty() {
        out.push_str("</li>\n");
        for _ in 1..stack.len() {
            out.push_str("</ul>\n</li>\n");
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</div>");
    out
}

/// Replace the placeholder (and its wrapping paragraph) with the generated TOC.
pub fn inject(html: &str) -> String {
    if !html.contains(TOC_PLACEHOLDER) {
        return html.to_string();
    }
    let toc = build_toc(&collect_headers(html));
    html.replace(&format!("<p>{}</p>", TOC_PLACEHOLDER), &toc)
        .replace(TOC_PLACEHOLDER, &toc)
}
