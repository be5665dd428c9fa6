use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use docx_rs::{
    Docx, Paragraph, Run, Style, StyleType, Table, TableCell, TableOfContents,
    TableRow as DocxRow,
};
use indicatif::{ProgressBar, ProgressStyle};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::{info, warn};

use super::{output_path, ExportError};
use crate::parser::frontmatter;

/// Turns a markdown file into a Word document.
pub trait DocumentConverter {
    fn name(&self) -> &str;
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ExportError>;
}

pub struct Pandoc {
    program: PathBuf,
}

impl Pandoc {
    /// Use `configured` when it exists, otherwise look `pandoc` up on PATH.
    pub fn locate(configured: Option<&Path>) -> Result<Self, ExportError> {
        if let Some(p) = configured.filter(|p| p.is_file()) {
            return Ok(Self { program: p.to_path_buf() });
        }
        which::which("pandoc")
            .map(|program| Self { program })
            .map_err(|_| ExportError::ConverterNotFound("pandoc".to_string()))
    }
}

impl DocumentConverter for Pandoc {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("pandoc: {}", input.display()));
        pb.enable_steady_tick(Duration::from_millis(120));

        let result = Command::new(&self.program)
            .arg(input)
            .args(["--from", "markdown", "--to", "docx", "--standalone", "--toc"])
            .arg("--output")
            .arg(output)
            .output();
        pb.finish_and_clear();

        let out = result?;
        if !out.status.success() {
            return Err(ExportError::ConverterFailed {
                program: self.program.display().to_string(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// In-process DOCX writer covering headings, paragraphs, lists, code and
/// tables. Used when pandoc is not installed.
pub struct BuiltinDocx;

impl DocumentConverter for BuiltinDocx {
    fn name(&self) -> &str {
        "built-in"
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        let raw = std::fs::read_to_string(input)?;
        let docx = build_docx(&raw);
        let file = File::create(output)?;
        docx.build()
            .pack(file)
            .map_err(|e| ExportError::Docx(e.to_string()))?;
        Ok(())
    }
}

/// Convert the original `markdown_file` (never the enhanced body) to DOCX.
/// A missing pandoc is remediated once by retrying with [`BuiltinDocx`].
pub fn export(
    markdown_file: &Path,
    output: Option<&Path>,
    pandoc: Option<&Path>,
) -> Result<PathBuf, ExportError> {
    export_located(Pandoc::locate(pandoc), markdown_file, output)
}

fn export_located<C: DocumentConverter>(
    located: Result<C, ExportError>,
    markdown_file: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, ExportError> {
    let output = output_path(markdown_file, output, "docx");

    match located {
        Ok(converter) => export_with(&converter, markdown_file, &output)?,
        Err(ExportError::ConverterNotFound(name)) => {
            warn!("{} not found, falling back to the built-in DOCX writer", name);
            export_with(&BuiltinDocx, markdown_file, &output)?
        }
        Err(e) => return Err(e),
    }
    Ok(output)
}

pub fn export_with(
    converter: &dyn DocumentConverter,
    markdown_file: &Path,
    output: &Path,
) -> Result<(), ExportError> {
    converter.convert(markdown_file, output)?;
    info!(
        "Converted {} with {} -> {}",
        markdown_file.display(),
        converter.name(),
        output.display()
    );
    Ok(())
}

enum Block {
    Para(Paragraph),
    Table(Table),
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    runs: Vec<Run>,
    style: Option<String>,
    bold: bool,
    italic: bool,
    /// Next number per open list; `None` for bullets.
    lists: Vec<Option<u64>>,
    in_code: bool,
    table: Option<Vec<Vec<String>>>,
    cell: Option<String>,
}

impl Builder {
    fn text(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push_str(text);
            return;
        }
        let mut run = Run::new().add_text(text);
        if self.bold {
            run = run.bold();
        }
        if self.italic {
            run = run.italic();
        }
        self.runs.push(run);
    }

    fn flush(&mut self) {
        if self.runs.is_empty() {
            self.style = None;
            return;
        }
        let mut para = self
            .runs
            .drain(..)
            .fold(Paragraph::new(), |p, r| p.add_run(r));
        if let Some(style) = self.style.take() {
            para = para.style(&style);
        }
        self.blocks.push(Block::Para(para));
    }

    fn start_item(&mut self) {
        self.flush();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                let m = format!("{}. ", n);
                *n += 1;
                m
            }
            _ => "• ".to_string(),
        };
        self.text(&format!("{}{}", "    ".repeat(depth), marker));
    }

    fn end_table(&mut self) {
        let Some(rows) = self.table.take() else { return };
        let rows = rows
            .into_iter()
            .map(|cells| {
                DocxRow::new(
                    cells
                        .into_iter()
                        .map(|c| {
                            TableCell::new()
                                .add_paragraph(Paragraph::new().add_run(Run::new().add_text(c)))
                        })
                        .collect(),
                )
            })
            .collect();
        self.blocks.push(Block::Table(Table::new(rows)));
    }
}

fn heading_style(level: HeadingLevel) -> String {
    format!("Heading{}", level as u8)
}

fn build_docx(raw: &str) -> Docx {
    let (metadata, body) = frontmatter::extract(raw);

    let mut b = Builder::default();
    for event in Parser::new_ext(&body, Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                b.flush();
                b.style = Some(heading_style(level));
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Paragraph) => b.flush(),
            Event::Start(Tag::Paragraph) if b.lists.is_empty() => b.flush(),
            Event::Start(Tag::List(first)) => {
                b.flush();
                b.lists.push(first);
            }
            Event::End(TagEnd::List(_)) => {
                b.flush();
                b.lists.pop();
            }
            Event::Start(Tag::Item) => b.start_item(),
            Event::End(TagEnd::Item) => b.flush(),
            Event::Start(Tag::CodeBlock(_)) => {
                b.flush();
                b.in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => b.in_code = false,
            Event::Start(Tag::Strong) => b.bold = true,
            Event::End(TagEnd::Strong) => b.bold = false,
            Event::Start(Tag::Emphasis) => b.italic = true,
            Event::End(TagEnd::Emphasis) => b.italic = false,
            Event::Start(Tag::Table(_)) => {
                b.flush();
                b.table = Some(Vec::new());
            }
            Event::End(TagEnd::Table) => b.end_table(),
            Event::Start(Tag::TableHead | Tag::TableRow) => {
                if let Some(t) = b.table.as_mut() {
                    t.push(Vec::new());
                }
            }
            Event::Start(Tag::TableCell) => b.cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                if let (Some(cell), Some(row)) =
                    (b.cell.take(), b.table.as_mut().and_then(|t| t.last_mut()))
                {
                    row.push(cell);
                }
            }
            Event::Text(t) if b.in_code => {
                for line in t.lines() {
                    b.text(line);
                    b.flush();
                }
            }
            Event::Text(t) | Event::Code(t) => b.text(&t),
            Event::SoftBreak | Event::HardBreak => b.text(" "),
            Event::TaskListMarker(done) => b.text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }
    b.flush();

    let mut docx = Docx::new()
        .add_style(Style::new("Title", StyleType::Paragraph).name("Title"))
        .add_style(Style::new("Heading1", StyleType::Paragraph).name("Heading 1"))
        .add_style(Style::new("Heading2", StyleType::Paragraph).name("Heading 2"))
        .add_style(Style::new("Heading3", StyleType::Paragraph).name("Heading 3"));

    if let Some(title) = metadata.get("title") {
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title))
                .style("Title"),
        );
    }
    docx = docx.add_table_of_contents(TableOfContents::new().heading_styles_range(1, 3));

    b.blocks.into_iter().fold(docx, |d, block| match block {
        Block::Para(p) => d.add_paragraph(p),
        Block::Table(t) => d.add_table(t),
    })
}
