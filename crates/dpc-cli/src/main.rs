mod output;
mod root;

use anyhow::Context;
use clap::{ArgAction, Parser};
use dpc_core::fix::{self, Options};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "disable-checkout-persist-credentials",
    about = "Set persist-credentials: false on actions/checkout steps in GitHub Actions files",
    version,
    disable_version_flag = true
)]
struct Cli {
    /// Workflow or action files (default: .github/workflows/*.yaml and *.yml under the root)
    files: Vec<PathBuf>,

    /// Report which files would change without writing them
    #[arg(long)]
    dry_run: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "DPC_LOG_LEVEL", default_value = "info")]
    log_level: tracing::Level,

    /// Discovery root (default: nearest ancestor containing .git/, else cwd)
    #[arg(long, env = "DPC_ROOT")]
    root: Option<PathBuf>,

    /// Output file reports as JSON
    #[arg(long, short = 'j')]
    json: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let files = if cli.files.is_empty() {
        let root = root::resolve_root(cli.root.as_deref());
        fix::discover(&root)
            .with_context(|| format!("discover workflows under {}", root.display()))?
    } else {
        cli.files
    };
    if files.is_empty() {
        tracing::info!("no workflow files found");
    }

    let opts = Options {
        dry_run: cli.dry_run,
    };
    let reports = fix::run(&files, &opts)?;

    if cli.json {
        output::print_json(&reports)?;
    } else {
        output::print_reports(&reports);
    }
    Ok(())
}
