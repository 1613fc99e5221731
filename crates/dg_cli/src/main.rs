use anyhow::{Context, Result};
use clap::Parser;
use dg_core::types::{DEFAULT_ARTICLES, DEFAULT_QUERY};
use dg_core::{CalendarBackend, DigestConfig, ModelKind, UploadBackend};
use dg_pipeline::{CancellationToken, Pipeline, RunState, StageStatus};
use dg_web::{create_app, AppState, PipelineFactory};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// A duration such as `90s`, `10m` or `1h30m`; a bare number is seconds and `0` disables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = 0u64;
        let mut digits = String::new();

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let n: u64 = digits
                .parse()
                .map_err(|_| format!("Expected a number before '{}'", c))?;
            total += match c {
                's' => n,
                'm' => n * 60,
                'h' => n * 3600,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            digits.clear();
        }
        if !digits.is_empty() {
            total += digits.parse::<u64>().map_err(|e| e.to_string())?;
        } else if total == 0 && s.trim().is_empty() {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Daily research digest: search, summarize, report", long_about = None)]
struct Cli {
    /// Language model backend: groq or dummy
    #[arg(long, global = true)]
    model: Option<ModelKind>,
    /// Model name passed to the chat completions endpoint
    #[arg(long, global = true)]
    model_name: Option<String>,
    /// Abort the run after this long (e.g. 10m); 0 disables
    #[arg(long, global = true)]
    timeout: Option<HumanDuration>,
    /// Directory PDF reports are written to
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API and the static front-end
    Serve {
        #[arg(long, default_value = "0.0.0.0", env = "DIGEST_HOST")]
        host: String,
        #[arg(long, default_value_t = 5000, env = "DIGEST_PORT")]
        port: u16,
        #[arg(long, default_value = "frontend")]
        static_dir: PathBuf,
    },
    /// Run one digest and print it
    Run {
        #[arg(default_value = DEFAULT_QUERY)]
        query: String,
        #[arg(short, long, default_value_t = DEFAULT_ARTICLES)]
        articles: usize,
        /// Keep the report local
        #[arg(long)]
        no_upload: bool,
        /// Skip the calendar event
        #[arg(long)]
        no_calendar: bool,
    },
}

impl Cli {
    fn config(&self) -> Result<DigestConfig> {
        let mut config = DigestConfig::from_env().context("Invalid configuration")?;
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(model_name) = &self.model_name {
            config.model_name = model_name.clone();
        }
        if let Some(HumanDuration(timeout)) = self.timeout {
            config.run_timeout = (!timeout.is_zero()).then_some(timeout);
        }
        if let Some(reports_dir) = &self.reports_dir {
            config.reports_dir = reports_dir.clone();
        }
        if let Commands::Run { no_upload, no_calendar, .. } = &self.command {
            if *no_upload {
                config.upload = UploadBackend::Disabled;
            }
            if *no_calendar {
                config.calendar = CalendarBackend::Disabled;
            }
        }
        Ok(config)
    }
}

fn render_digest(state: &RunState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📰 Research digest: {} ({} articles)", state.query(), state.articles.len());

    for (i, article) in state.articles.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, article.title);
        let _ = writeln!(
            out,
            "   {} | {} | {}",
            article.source,
            article.published_date.as_deref().unwrap_or("N/A"),
            article.url
        );
        if let Some(summary) = state.summaries.iter().find(|s| s.article_id == article.id) {
            let _ = writeln!(out, "   {} [{}]", summary.summary, summary.sentiment);
        }
        for insight in state.insights.iter().filter(|i| i.article_id == article.id) {
            for bullet in &insight.insights {
                let _ = writeln!(out, "   - {}", bullet);
            }
        }
    }

    if !state.report_path.is_empty() {
        let _ = writeln!(out, "\n📄 Report: {}", state.report_path);
    }
    if !state.drive_file_id.is_empty() {
        let _ = writeln!(out, "☁️  Uploaded: {}", state.drive_file_id);
    }
    if !state.calendar_event_id.is_empty() {
        let _ = writeln!(out, "📅 Calendar event: {}", state.calendar_event_id);
    }

    let _ = writeln!(out, "\nStages:");
    for event in state.stage_log() {
        let mark = match event.status {
            StageStatus::Succeeded => "✓",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "-",
            StageStatus::Cancelled => "⊘",
        };
        let _ = write!(out, "  {} {}", mark, event.stage);
        if let Some(detail) = &event.detail {
            let _ = write!(out, " ({})", detail);
        }
        if !event.skipped_items.is_empty() {
            let _ = write!(out, " [{} skipped]", event.skipped_items.len());
        }
        out.push('\n');
    }
    out
}

async fn serve(config: DigestConfig, host: &str, port: u16, static_dir: PathBuf) -> Result<()> {
    let reports_dir = config.reports_dir.clone();
    let factory: PipelineFactory = Arc::new(move || Pipeline::from_config(&config));
    let app = create_app(AppState::new(factory, reports_dir, static_dir));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🌐 Daily Research Digest API listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("👋 Shutting down");
        })
        .await?;
    Ok(())
}

async fn run_once(config: DigestConfig, query: &str, articles: usize) -> Result<()> {
    let pipeline = Pipeline::from_config(&config)?;
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let state = pipeline.run_with_cancel(query, articles, cancel).await?;
    print!("{}", render_digest(&state));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let config = cli.config()?;
    info!("⚙️  Using model {} ({:?})", config.model_name, config.model);

    match cli.command {
        Commands::Serve { host, port, static_dir } => serve(config, &host, port, static_dir).await,
        Commands::Run { query, articles, .. } => run_once(config, &query, articles).await,
    }
}
