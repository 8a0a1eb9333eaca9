use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use crossterm::tty::IsTty;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_efetch::app::{App, FetchResult, JobStatus};
use kira_efetch::config::{ConfigLoader, ConfigOverrides};
use kira_efetch::domain::{Job, Mode, invoked_mode};
use kira_efetch::efetch::EfetchClient;
use kira_efetch::error::KiraError;
use kira_efetch::ids::resolve_ids;
use kira_efetch::output::{JsonOutput, OutputMode, PlainOutput};
use kira_efetch::retry::ThreadSleeper;
use kira_efetch::search::{launch_detached, search_url};
use kira_efetch::store::Store;
use kira_efetch::tui::Tui;

#[derive(Parser)]
#[command(name = "kira-ef")]
#[command(about = "Batch download NCBI records through Entrez Direct efetch")]
#[command(version, author)]
struct Cli {
    /// Record type to fetch, or `search`
    mode: Option<String>,

    /// Accession ids, a file with one id per line, or search terms
    ids: Vec<String>,

    /// JSON config file (default: ./kira-ef.json, then the user config dir)
    #[arg(long)]
    config: Option<String>,

    /// efetch executable
    #[arg(long)]
    efetch: Option<String>,

    /// Give up on an id after this many attempts (default: never)
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Seconds to wait before the first attempt; doubled after each failure
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    initial_wait: Option<u64>,

    /// Kill efetch if a single attempt runs longer than this
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    #[arg(long)]
    non_interactive: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidId(_)
        | KiraError::IdFileRead(_)
        | KiraError::MissingConfig(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::InvalidConfig(_) => 2,
        KiraError::MissingTool(_)
        | KiraError::Subprocess(_)
        | KiraError::MalformedPubmedLine { .. }
        | KiraError::JobsFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(mode) = invoked_mode(cli.mode.as_deref(), &cli.ids) else {
        return print_usage();
    };

    let overrides = ConfigOverrides {
        efetch: cli.efetch.clone(),
        initial_wait_secs: cli.initial_wait,
        max_attempts: cli.max_attempts,
        timeout_secs: cli.timeout,
    };

    if mode == Mode::Search {
        // A broken config file should not stop a browser search.
        let config = ConfigLoader::resolve_lenient(cli.config.as_deref(), &overrides);
        let url = search_url(&config.search_url, &cli.ids);
        launch_detached(&config.browser, &url)?;
        return Ok(());
    }

    let config = ConfigLoader::resolve(cli.config.as_deref(), &overrides)?;

    let ids = resolve_ids(&cli.ids)?;
    if ids.is_empty() {
        tracing::info!("no ids to download");
        return Ok(());
    }
    let jobs = Job::batch(mode, &ids)?;

    let fetcher = EfetchClient::new(config.efetch.clone(), config.timeout);
    fetcher.ensure_installed()?;
    let app = App::new(Store::new()?, fetcher, ThreadSleeper, config.retry);

    let output_mode = if cli.json {
        OutputMode::Json
    } else if cli.non_interactive || !io::stdout().is_tty() {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let result = match output_mode {
        OutputMode::Json => {
            let result = app.fetch_all(&jobs, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
            result
        }
        OutputMode::NonInteractive => {
            let result = app.fetch_all(&jobs, &PlainOutput)?;
            print_fetch_summary(&result);
            result
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new();
            let result = tui.run(move |sink| app.fetch_all(&jobs, sink))?;
            print_fetch_summary(&result);
            result
        }
    };

    let failed = result.failed();
    if failed > 0 {
        return Err(KiraError::JobsFailed {
            failed,
            total: result.items.len(),
        }
        .into());
    }
    Ok(())
}

fn print_usage() -> miette::Result<()> {
    let modes = Mode::ALL
        .iter()
        .map(|mode| format!("  {:<9} {}", mode.as_str(), mode.description()))
        .collect::<Vec<_>>()
        .join("\n");
    Cli::command()
        .after_help(format!("Modes:\n{modes}"))
        .print_help()
        .into_diagnostic()?;
    Ok(())
}

fn print_fetch_summary(result: &FetchResult) {
    let green = "\x1b[32m";
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    let saved = result.items.len() - result.failed();
    println!("{cyan}kira-ef summary{reset}");
    println!("{green}saved: {saved}{reset}");
    if result.failed() > 0 {
        println!("{red}failed: {}{reset}", result.failed());
    }
    for item in &result.items {
        match (item.status, &item.path) {
            (JobStatus::Saved, Some(path)) => println!(
                "{green}  {} {} -> {path} ({} attempt(s)){reset}",
                item.mode, item.id, item.attempts
            ),
            _ => println!(
                "{red}  {} {} failed after {} attempt(s){reset}",
                item.mode, item.id, item.attempts
            ),
        }
    }
}
