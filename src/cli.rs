use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::{analyze, AnalyzeOptions};
use crate::auth::Token;
use crate::config::{AiConfig, Config, OutputFormat};
use crate::error::CIDoctorError;
use crate::model::Report;
use crate::output::{export_json, print_report, StepProgress};
use crate::providers::GitHubProvider;
use crate::summarize::Summarizer;

#[derive(Parser)]
#[command(name = "ci-doctor")]
#[command(author, version, about = "Diagnose a single CI run", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a GitHub Actions run, e.g. https://github.com/<owner>/<repo>/actions/runs/<id>
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Run URL
    run_url: String,

    /// GitHub token (actions:read, contents:read)
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Ask an OpenAI-compatible API for a short diagnosis (needs OPENAI_API_KEY)
    #[arg(long, default_value_t = false)]
    ai: bool,

    /// Save the raw log archive under the artifacts directory
    #[arg(long, default_value_t = false)]
    save_logs: bool,

    /// Revalidate repeated requests with ETags
    #[arg(long, overrides_with = "no_cache")]
    cache: bool,

    /// Disable the conditional HTTP cache
    #[arg(long, overrides_with = "cache")]
    no_cache: bool,

    /// Successful runs sampled for the duration baseline [default: 50]
    #[arg(long)]
    max_samples: Option<usize>,

    /// HTTP timeout in seconds [default: 10]
    #[arg(long)]
    timeout: Option<f64>,

    /// Output format [default: pretty]
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn use_cache(&self, configured: bool) -> bool {
        if self.cache {
            true
        } else if self.no_cache {
            false
        } else {
            configured
        }
    }
}

impl Cli {
    async fn execute_analyze(&self, args: &AnalyzeArgs) -> Result<()> {
        let config = Config::load(args.config.as_deref())?;

        let token = Token::resolve([args.token.as_deref(), config.github.token.as_deref()])
            .ok_or(CIDoctorError::MissingToken)?;

        let timeout = parse_timeout(args.timeout.unwrap_or(config.github.timeout_secs))?;
        let format = args.format.unwrap_or(config.output.format);
        let options = AnalyzeOptions {
            sample_limit: args.max_samples.unwrap_or(config.github.max_samples),
            want_logs: args.save_logs || args.ai,
            save_logs_dir: args
                .save_logs
                .then(|| config.output.artifacts_dir.clone()),
        };

        let provider = GitHubProvider::new(
            &config.github.api_base,
            &token,
            timeout,
            args.use_cache(config.github.cache),
        )?;

        info!("Diagnosing {}", args.run_url);
        let progress = StepProgress::start("Analyzing run");
        let mut report = match analyze(&provider, &args.run_url, &options).await {
            Ok(report) => {
                progress.finish("Analyzed run");
                report
            }
            Err(e) => {
                progress.fail("Analysis failed");
                return Err(e.into());
            }
        };

        if args.ai {
            report.ai_analysis = summarize_report(&config.ai, timeout, &report).await;
        }

        match format {
            OutputFormat::Pretty => print_report(&report),
            OutputFormat::Json => export_json(&report, &mut std::io::stdout().lock())
                .context("Failed to write JSON report")?,
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze(args) => self.execute_analyze(args).await,
        }
    }
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| CIDoctorError::Config(format!("invalid timeout: {secs}")).into())
}

/// Best-effort summary; every failure degrades to `None`.
async fn summarize_report(ai: &AiConfig, timeout: Duration, report: &Report) -> Option<String> {
    if report.failing_jobs.is_empty() {
        info!("No failing jobs, skipping summary");
        return None;
    }

    let env_key = std::env::var("OPENAI_API_KEY").ok();
    let Some(api_key) = Token::resolve([env_key.as_deref(), ai.api_key.as_deref()]) else {
        warn!("--ai requested but OPENAI_API_KEY is not set, skipping summary");
        return None;
    };

    let summarizer = match Summarizer::new(&ai.api_base, api_key, &ai.model, timeout) {
        Ok(summarizer) => summarizer,
        Err(e) => {
            warn!("Could not set up summarization: {e}");
            return None;
        }
    };

    let progress = StepProgress::start("Summarizing failure");
    match summarizer.summarize(report).await {
        Ok(summary) => {
            progress.finish("Summarized failure");
            Some(summary)
        }
        Err(e) => {
            progress.fail("Summary unavailable");
            warn!("Summarization failed: {e}");
            None
        }
    }
}

/// Loads `.env` from the working directory. Variables already set win.
pub fn load_dotenv() {
    load_env_file(Path::new(".env"));
}

fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring {}: {e}", path.display()),
    }
}

/// Exit status for an error that terminated the CLI.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CIDoctorError>())
        .map_or(1, CIDoctorError::exit_code)
}
