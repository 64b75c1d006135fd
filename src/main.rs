use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use datever::config::{self, PublishMode, RunConfig, RunInputs};
use datever::error::{Error, Result};
use datever::github::GitHub;
use datever::output::actions::{self, StepOutputs};
use datever::{output, runner};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const APP_VERSION: &str = env!("DATEVER_VERSION");

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| "invalid date, expected format YYYY-MM-DD".to_string())
}

/// Map the `mode` input. Blank means "not set", since Actions passes unset
/// inputs as empty strings.
fn parse_mode(raw: Option<&str>) -> Result<Option<PublishMode>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    match raw.to_ascii_lowercase().as_str() {
        "tag" => Ok(Some(PublishMode::Tag)),
        "release" => Ok(Some(PublishMode::Release)),
        _ => Err(Error::Config(format!(
            "unknown mode '{}' -- expected 'tag' or 'release'",
            raw
        ))),
    }
}

#[derive(Parser)]
#[command(
    name = "datever",
    version = APP_VERSION,
    about = "Tag the current commit with the next date-stamped version"
)]
struct Cli {
    /// Bump level: `major` bumps the major component, any other value does not
    #[arg(long, env = "INPUT_LEVEL", default_value = "minor")]
    level: String,

    /// Publish as a bare tag or as a release (tag, release)
    #[arg(long, env = "INPUT_MODE")]
    mode: Option<String>,

    /// Commit to tag
    #[arg(long, env = "GITHUB_SHA")]
    sha: Option<String>,

    /// Target repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// GitHub token (falls back to INPUT_GITHUB_TOKEN, then GITHUB_TOKEN)
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// GitHub web root used in release changelog links
    #[arg(long, env = "GITHUB_SERVER_URL")]
    server_url: Option<String>,

    /// File receiving step outputs
    #[arg(long, env = "GITHUB_OUTPUT")]
    output_file: Option<PathBuf>,

    /// Explicit config file path (overrides .github/datever.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Date used for the minor component in UTC (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Compute and report the next version without publishing it
    #[arg(long)]
    dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before CLI parsing so env-backed args (e.g. GITHUB_REPOSITORY) pick it up.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        error!(error = %e, "fatal error");
        actions::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = match cli.config.as_deref() {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };

    let inputs = RunInputs {
        level: cli.level,
        mode: parse_mode(cli.mode.as_deref())?,
        sha: cli.sha,
        repository: cli.repository,
        token: cli.token,
        api_url: cli.api_url,
        server_url: cli.server_url,
        dry_run: cli.dry_run,
    };
    let run_config = RunConfig::resolve(inputs, &file_config, |key| std::env::var(key).ok())?;

    let today = cli
        .date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let platform = GitHub::with_base_url(&run_config.api_url, run_config.token.clone())?;

    let outcome = runner::run(&platform, &run_config, today).await?;

    if run_config.dry_run {
        actions::notice(&format!("Next version (dry run): {}", outcome.version));
    } else {
        actions::notice(&format!("New version: {}", outcome.version));
    }

    match cli.output_file.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => StepOutputs::from_outcome(&outcome).write_to(&path)?,
        None => debug!("no step output file configured, skipping step outputs"),
    }

    if cli.json {
        output::json::print_outcome_json(&outcome)?;
    } else {
        output::table::print_outcome_table(&outcome);
    }

    info!(version = %outcome.version, "done");
    Ok(())
}
