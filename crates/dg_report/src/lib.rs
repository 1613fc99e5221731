use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use dg_core::{DigestConfig, ReportInput, ReportRenderer, Result};

pub mod layout;
pub mod pdf;

pub use layout::{layout, Block};

pub fn default_title(query: &str) -> String {
    format!("Research Digest: {}", query)
}

/// Keep alphanumerics and `_ - . space`, drop trailing whitespace.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub fn report_filename(title: &str, generated_at: DateTime<Local>) -> String {
    format!("{} - {}.pdf", sanitize_filename(title), generated_at.format("%Y%m%d_%H%M%S"))
}

/// `dir/name`, or `dir/stem (n).pdf` for the first free `n` when the name is taken.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let stem = filename.strip_suffix(".pdf").unwrap_or(filename);
    (1..)
        .map(|n| dir.join(format!("{} ({}).pdf", stem, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Renders the digest PDF into a fixed reports directory.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    output_dir: PathBuf,
    clock: fn() -> DateTime<Local>,
}

impl PdfReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            clock: Local::now,
        }
    }

    /// Pin the generation time.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, input: ReportInput<'_>) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let generated_at = (self.clock)();
        let path = unique_path(&self.output_dir, &report_filename(input.title, generated_at));

        let blocks = layout(&input, generated_at.naive_local());
        let pages = pdf::write_pdf(&path, input.title, &blocks)?;
        info!("📄 Report written: {} ({} pages)", path.display(), pages);
        Ok(path)
    }
}

pub fn create_renderer(config: &DigestConfig) -> PdfReportRenderer {
    PdfReportRenderer::new(&config.reports_dir)
}

pub mod prelude {
    pub use super::{create_renderer, default_title, PdfReportRenderer};
    pub use dg_core::{ReportInput, ReportRenderer, Result};
}
