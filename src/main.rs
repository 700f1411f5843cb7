use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use dispatcher::{Dispatcher, Rules};
use launcher::{CommandLauncher, ShellLauncher};
use tail::FileTail;
use utils::can_access_file;
use validator::{confirm, validate};

mod config;
mod dispatcher;
mod error;
mod launcher;
mod sink;
mod tail;
mod types;
mod utils;
mod validator;

const USAGE: &str = "\nRun commands based on RegEx matches in continuously read files\n\nUsage: logspark [configuration file]\n";

/// Environment variable holding the diagnostic log filter.
const LOG_FILTER_ENV: &str = "LOGSPARK_LOG";

/// Exactly one argument, always taken as the config path (even `--help`).
#[derive(Debug, Parser)]
#[command(
    name = "logspark",
    about = "Run commands based on RegEx matches in continuously read files",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(allow_hyphen_values = true)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(_) => {
            println!("{}", USAGE);
            return;
        }
    };

    if let Err(e) = run(&cli.config).await {
        eprintln!("{} {:#}", "Error!".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Everything checked and opened before watching starts.
struct Startup {
    tails: Vec<FileTail>,
    rules: Arc<Rules>,
}

async fn run(config_path: &Path) -> Result<()> {
    match prepare(config_path, io::stdin().lock(), io::stdout()).await? {
        Some(startup) => watch(startup, Arc::new(ShellLauncher::new())).await,
        None => Ok(()),
    }
}

/// Loads and checks the configuration, asks about empty regexes on
/// `input`/`output`, and opens every watched file. `None` means the operator
/// declined to continue.
async fn prepare<R: BufRead, W: Write>(
    config_path: &Path,
    mut input: R,
    mut output: W,
) -> Result<Option<Startup>> {
    let config = Config::load(config_path)?;

    let report = validate(&config);
    for warning in &report.warnings {
        eprintln!("{} {}", "Warning!".yellow().bold(), warning);
    }
    if !report.is_valid() {
        for problem in &report.problems {
            eprintln!("{} {}", "Error!".red().bold(), problem);
        }
        return Err(error::Error::Invalid(report.problems).into());
    }

    for &index in &report.empty_regex {
        let question = format!(
            "Regex for pattern {:?} is empty, are you sure you want to continue?",
            config.patterns[index].name
        );
        let accepted = confirm(&mut input, &mut output, &question.yellow().to_string())
            .context("failed to read confirmation")?;
        if !accepted {
            info!("Aborted by operator");
            return Ok(None);
        }
    }

    let mut tails = Vec::with_capacity(config.files.len());
    for file in &config.files {
        can_access_file(Path::new(file))?;
        let tail = FileTail::open(file)
            .await
            .with_context(|| format!("failed to open {} for tailing", file))?;
        tails.push(tail);
    }

    let rules = Arc::new(Rules::compile(&config)?);
    Ok(Some(Startup { tails, rules }))
}

/// Runs one dispatcher per watched file. Returns only on the first fatal
/// dispatcher error.
async fn watch(startup: Startup, launcher: Arc<dyn CommandLauncher>) -> Result<()> {
    let Startup { tails, rules } = startup;
    info!(
        files = tails.len(),
        patterns = rules.patterns.len(),
        "Starting dispatchers"
    );

    let mut dispatchers = JoinSet::new();
    for tail in tails {
        let dispatcher = Dispatcher::new(tail, Arc::clone(&rules), Arc::clone(&launcher));
        dispatchers.spawn(dispatcher.run());
    }

    while let Some(joined) = dispatchers.join_next().await {
        joined.context("dispatcher task panicked")??;
    }

    // No shutdown path exists; only a signal or a fatal error ends the process.
    std::future::pending::<()>().await;
    Ok(())
}
