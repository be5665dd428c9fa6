pub mod docx;
pub mod excel;

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("document converter '{0}' not found")]
    ConverterNotFound(String),
    #[error("{program} exited with {status}: {stderr}")]
    ConverterFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("table exceeds worksheet limits at {0}")]
    TableTooLarge(String),
    #[error("failed to write DOCX: {0}")]
    Docx(String),
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Explicit output, else the input path with `extension`.
pub fn output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(extension),
    }
}
