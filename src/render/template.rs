use std::path::{Path, PathBuf};

use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

pub const BUILTIN_TEMPLATE: &str = "builtin";

/// Page templates: `<dir>/<name>.html` with an inline fallback.
pub struct TemplateSet {
    handlebars: Handlebars<'static>,
    dir: PathBuf,
    default_name: String,
}

impl TemplateSet {
    pub fn new(dir: impl Into<PathBuf>, default_name: impl Into<String>) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string(BUILTIN_TEMPLATE, DEFAULT_TEMPLATE)?;

        Ok(Self {
            handlebars,
            dir: dir.into(),
            default_name: default_name.into(),
        })
    }

    /// Try `requested` (or the default), then the default, then the built-in
    /// template. Returns the name that was registered.
    pub fn select(&mut self, requested: Option<&str>) -> String {
        let mut attempts = vec![requested.unwrap_or(&self.default_name).to_string()];
        if attempts[0] != self.default_name {
            attempts.push(self.default_name.clone());
        }

        for name in attempts {
            match self.load(&name) {
                Ok(()) => return name,
                Err(e) => debug!("Template '{}' unavailable: {:#}", name, e),
            }
        }
        BUILTIN_TEMPLATE.to_string()
    }

    fn load(&mut self, name: &str) -> Result<()> {
        if self.handlebars.has_template(name) {
            return Ok(());
        }
        let path = self.dir.join(format!("{}.html", name));
        let content = std::fs::read_to_string(&path)?;
        self.handlebars.register_template_string(name, content)?;
        Ok(())
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        Ok(self.handlebars.render(name, data)?)
    }
}

/// Stylesheet text, empty when the file is missing or unreadable.
pub fn load_stylesheet(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(css) => css,
        Err(e) => {
            debug!("No stylesheet at {}: {}", path.display(), e);
            String::new()
        }
    }
}

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{title}}</title>
    <style>
        @import url('https://fonts.googleapis.com/css2?family=Noto+Sans+KR:wght@400;700&display=swap');

        body {
            font-family: 'Noto Sans KR', -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 900px;
            margin: 0 auto;
            padding: 20px;
        }
        h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }
        h2 { color: #34495e; margin-top: 30px; border-bottom: 1px solid #ecf0f1; padding-bottom: 5px; }
        h3 { color: #7f8c8d; }
        table { border-collapse: collapse; width: 100%; margin: 20px 0; }
        th, td { border: 1px solid #ddd; padding: 12px; text-align: left; }
        th { background-color: #3498db; color: white; font-weight: bold; }
        tr:nth-child(even) { background-color: #f9f9f9; }
        blockquote { border-left: 4px solid #3498db; margin: 20px 0; padding-left: 20px; color: #555; font-style: italic; }
        code { background-color: #f4f4f4; padding: 2px 6px; border-radius: 3px; font-family: 'Courier New', monospace; }
        pre { background-color: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .metadata { background-color: #ecf0f1; padding: 15px; border-radius: 5px; margin-bottom: 30px; }
        .metadata p { margin: 5px 0; }
        .toc { border: 1px solid #ecf0f1; padding: 10px 20px; margin-bottom: 30px; }

        @media print {
            body { font-size: 11pt; line-height: 1.5; }
            h1, h2, h3 { page-break-after: avoid; }
            table { page-break-inside: avoid; }
            .metadata { background-color: #f5f5f5 !important; -webkit-print-color-adjust: exact; color-adjust: exact; }
        }
    </style>
    {{#if custom_css}}
    <style>{{{custom_css}}}</style>
    {{/if}}
    {{#if has_diagrams}}
    <script src="https://cdn.jsdelivr.net/npm/mermaid/dist/mermaid.min.js"></script>
    <script>mermaid.initialize({ startOnLoad: true });</script>
    {{/if}}
</head>
<body>
    {{#if metadata}}
    <div class="metadata">
        {{#if metadata.title}}<p><strong>제목:</strong> {{metadata.title}}</p>{{/if}}
        {{#if metadata.date}}<p><strong>작성일:</strong> {{metadata.date}}</p>{{/if}}
        {{#if metadata.author}}<p><strong>작성자:</strong> {{metadata.author}}</p>{{/if}}
        {{#if metadata.agents}}<p><strong>사용 에이전트:</strong> {{metadata.agents}}</p>{{/if}}
        {{#if metadata.sources_count}}<p><strong>참조 출처:</strong> {{metadata.sources_count}}개</p>{{/if}}
        {{#if metadata.quality_score}}<p><strong>출처 신뢰도:</strong> {{metadata.quality_score}}</p>{{/if}}
    </div>
    {{/if}}

    {{{content}}}

    <footer style="margin-top: 50px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 0.9em;">
        <p>생성일: {{generated_date}}</p>
    </footer>
</body>
</html>
"#;
