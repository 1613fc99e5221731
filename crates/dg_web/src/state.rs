use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use dg_core::Result;
use dg_pipeline::Pipeline;

/// Builds a fresh pipeline per request so configuration problems surface as request errors.
pub type PipelineFactory = Arc<dyn Fn() -> Result<Pipeline> + Send + Sync>;

pub struct AppState {
    pub pipeline: PipelineFactory,
    pub reports_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Relative report paths are resolved against this directory.
    pub base_dir: PathBuf,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("reports_dir", &self.reports_dir)
            .field("static_dir", &self.static_dir)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(pipeline: PipelineFactory, reports_dir: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            reports_dir: reports_dir.into(),
            static_dir: static_dir.into(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn absolute_reports_dir(&self) -> PathBuf {
        normalize(&self.base_dir.join(&self.reports_dir))
    }

    /// Map a user-supplied report path to a file inside the reports directory.
    ///
    /// Paths outside it are retried as a bare file name inside it; `None` if that still escapes.
    pub fn resolve_report(&self, requested: &str) -> Option<PathBuf> {
        let requested = requested.replace('\\', "/");
        let reports_dir = self.absolute_reports_dir();

        let direct = normalize(&self.base_dir.join(&requested));
        if direct.starts_with(&reports_dir) && direct != reports_dir {
            return Some(direct);
        }

        let name = Path::new(&requested).file_name()?;
        let fallback = normalize(&reports_dir.join(name));
        (fallback.starts_with(&reports_dir) && fallback != reports_dir).then_some(fallback)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
