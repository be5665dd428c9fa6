use std::collections::HashSet;
use std::sync::LazyLock;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

static MERMAID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<pre><code class="language-mermaid">(.*?)</code></pre>"#).unwrap()
});

fn full_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Report dialect: tables, footnotes, strikethrough, task lists, and an `id`
/// on every heading.
pub fn to_html(markdown: &str) -> String {
    let mut events: Vec<Event> = Parser::new_ext(markdown, full_options()).collect();
    assign_heading_ids(&mut events);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Tables only, for spreadsheet extraction.
pub fn to_html_tables_only(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, Options::ENABLE_TABLES));
    out
}

/// Turn ```mermaid blocks into `<div class="mermaid">` containers.
pub fn rewrite_diagrams(html: &str) -> String {
    MERMAID_RE
        .replace_all(html, r#"<div class="mermaid">$1</div>"#)
        .into_owned()
}

pub fn has_diagrams(html: &str) -> bool {
    html.contains(r#"<div class="mermaid">"#)
}

/// Lowercase, hyphen-joined anchor text. Keeps Unicode letters so Korean
/// headings still get readable anchors.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn assign_heading_ids(events: &mut [Event]) {
    // Explicit `{#id}` anchors win over generated ones, wherever they appear.
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|ev| match ev {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    for i in 0..events.len() {
        match &events[i] {
            Event::Start(Tag::Heading { id: None, .. }) => {}
            _ => continue,
        }

        let mut base = slugify(&heading_text(&events[i + 1..]));
        if base.is_empty() {
            base = "section".to_string();
        }
        let slug = unique_slug(&mut used, base);

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for ev in events {
        match ev {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn unique_slug(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_ids() {
        let html = to_html("# Title\n\n## Second Section");
        assert!(html.contains(r#"<h1 id="title">Title</h1>"#));
        assert!(html.contains(r#"<h2 id="second-section">Second Section</h2>"#));
    }

    #[test]
    fn duplicate_heading_ids() {
        let html = to_html("## Notes\n\n## Notes\n\n## Notes");
        assert!(html.contains(r#"id="notes""#));
        assert!(html.contains(r#"id="notes-1""#));
        assert!(html.contains(r#"id="notes-2""#));
    }

    #[test]
    fn suffixed_ids_never_collide() {
        let html = to_html("## Notes\n\n## Notes-1\n\n## Notes\n\n## B {#notes}");
        let ids: Vec<&str> = html
            .split(r#"id=""#)
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(ids, ["notes-1", "notes-1-1", "notes-2", "notes"]);
    }

    #[test]
    fn explicit_heading_id_kept() {
        let html = to_html("## Summary {#custom}");
        assert!(html.contains(r#"<h2 id="custom">Summary</h2>"#));
    }

    #[test]
    fn korean_slug() {
        assert_eq!(slugify("주요 판례"), "주요-판례");
        assert_eq!(slugify("  Hello, World! "), "hello-world");
        assert_eq!(slugify("a - b"), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn extensions_enabled() {
        let html = to_html(
            "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n\nNote[^1]\n\n[^1]: footnote",
        );
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"type="checkbox""#));
        assert!(html.contains("footnote-definition"));
    }

    #[test]
    fn tables_only_skips_extensions() {
        let html = to_html_tables_only("| a |\n|---|\n| 1 |\n\n~~kept~~\n\n# Head");
        assert!(html.contains("<table>"));
        assert!(html.contains("~~kept~~"));
        assert!(html.contains("<h1>Head</h1>"));
    }

    #[test]
    fn mermaid_blocks_rewritten() {
        let md = "```mermaid\ngraph TD\n  A --> B\n```\n\ntext\n\n```mermaid\nsequenceDiagram\n```\n\n```rust\nfn main() {}\n```";
        let html = rewrite_diagrams(&to_html(md));
        assert_eq!(html.matches(r#"<div class="mermaid">"#).count(), 2);
        assert!(html.contains("graph TD\n  A --&gt; B\n</div>"));
        assert!(html.contains(r#"<code class="language-rust">"#));
        assert!(has_diagrams(&html));
    }
}
