mod export;
mod parser;
mod render;
mod settings;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use settings::Settings;

#[derive(Parser)]
#[command(
    name = "convert",
    about = "Convert markdown research reports to HTML preview, DOCX and XLSX"
)]
struct Cli {
    /// Markdown file to convert
    #[arg(value_parser = existing_file)]
    markdown_file: PathBuf,
    /// Render HTML and open it in the browser (default)
    #[arg(long)]
    preview: bool,
    /// Convert to a Word document
    #[arg(long)]
    docx: bool,
    /// Extract tables into an Excel workbook
    #[arg(long)]
    excel: bool,
    /// HTML template name (report, legal, presentation)
    #[arg(long)]
    template: Option<String>,
    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write the preview without launching a browser
    #[arg(long)]
    no_browser: bool,
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{}' does not exist", s))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let mut cli = Cli::parse();
    if !(cli.preview || cli.docx || cli.excel) {
        cli.preview = true;
    }
    let settings = Settings::load()?;

    // Operations run in order; the first failure aborts the rest.
    if cli.preview {
        let path = preview(&cli, &settings)?;
        println!("HTML preview written: {}", path.display());
        println!("Use the browser's print dialog (Ctrl+P / Cmd+P) to save as PDF.");
    }

    let multiple_exports = cli.docx && cli.excel;
    if cli.docx {
        let out = export_target(cli.output.as_deref(), multiple_exports, "docx");
        let path = export::docx::export(
            &cli.markdown_file,
            out.as_deref(),
            settings.pandoc.as_deref(),
        )
        .context("DOCX conversion failed")?;
        println!("Word document written: {}", path.display());
    }

    if cli.excel {
        let out = export_target(cli.output.as_deref(), multiple_exports, "xlsx");
        match export::excel::export(&cli.markdown_file, out.as_deref())
            .context("Table extraction failed")?
        {
            Some(path) => println!("Tables extracted: {}", path.display()),
            None => println!("No tables found in the document."),
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

/// Render the enhanced page to `--output` (when it names an `.html` file) or
/// a persisted temp file, then open it.
fn preview(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let mut renderer = render::Renderer::new(settings)?;
    let html = renderer.render_file(&cli.markdown_file, cli.template.as_deref())?;

    let path = match cli.output.as_deref().filter(|p| is_html(p)) {
        Some(p) => {
            std::fs::write(p, &html).with_context(|| format!("Failed to write {}", p.display()))?;
            p.to_path_buf()
        }
        None => {
            let mut file = tempfile::Builder::new()
                .prefix("preview-")
                .suffix(".html")
                .tempfile()?;
            file.write_all(html.as_bytes())?;
            let (_, path) = file.keep().context("Failed to persist preview file")?;
            path
        }
    };

    if !cli.no_browser {
        if let Err(e) = webbrowser::open(&path.to_string_lossy()) {
            warn!("Could not open a browser: {}", e);
        }
    }
    Ok(path)
}

/// `--output` for an export; an `.html` output belongs to the preview. With
/// both exports requested each gets its own extension.
fn export_target(output: Option<&Path>, multiple: bool, extension: &str) -> Option<PathBuf> {
    let output = output.filter(|p| !is_html(p))?;
    if multiple {
        Some(output.with_extension(extension))
    } else {
        Some(output.to_path_buf())
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
