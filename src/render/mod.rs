pub mod markdown;
pub mod template;
pub mod toc;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::parser::enhance::{EnhancedDocument, QualityReport};
use crate::parser::frontmatter::Metadata;
use crate::settings::Settings;
use template::TemplateSet;

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'a str,
    metadata: Option<&'a Metadata>,
    quality_report: &'a QualityReport,
    content: &'a str,
    custom_css: &'a str,
    generated_date: String,
    has_diagrams: bool,
}

pub struct Renderer {
    templates: TemplateSet,
    stylesheet: PathBuf,
}

impl Renderer {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            templates: TemplateSet::new(&settings.template_dir, &settings.default_template)?,
            stylesheet: settings.stylesheet.clone(),
        })
    }

    /// Read, enhance and render a markdown file into a full HTML page.
    pub fn render_file(&mut self, path: &Path, template: Option<&str>) -> Result<String> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = crate::parser::process_document(&raw);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.render(&doc, &stem, template)
    }

    pub fn render(
        &mut self,
        doc: &EnhancedDocument,
        fallback_title: &str,
        template: Option<&str>,
    ) -> Result<String> {
        let content = body_to_html(&doc.body);

        let name = self.templates.select(template);
        info!("Rendering with template '{}'", name);
        let custom_css = template::load_stylesheet(&self.stylesheet);

        let ctx = PageContext {
            title: doc
                .metadata
                .get("title")
                .map(String::as_str)
                .unwrap_or(fallback_title),
            metadata: (!doc.metadata.is_empty()).then_some(&doc.metadata),
            quality_report: &doc.quality,
            has_diagrams: markdown::has_diagrams(&content),
            content: &content,
            custom_css: &custom_css,
            generated_date: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
        };
        self.templates
            .render(&name, &ctx)
            .with_context(|| format!("Failed to render template '{}'", name))
    }
}

/// Markdown body → HTML fragment with diagrams and TOC resolved.
pub fn body_to_html(body: &str) -> String {
    let marked = toc::insert_placeholder(body);
    let html = markdown::rewrite_diagrams(&markdown::to_html(&marked));
    toc::inject(&html)
}
