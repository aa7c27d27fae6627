use std::fs::{self, File};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use gdc_dice::app::Dicer;
use gdc_dice::config::{ConfigLoader, ConfigOverrides, RunConfig};
use gdc_dice::converter::ConverterRegistry;
use gdc_dice::error::DiceError;
use gdc_dice::output::JsonOutput;
use gdc_dice::translation::TranslationTable;

#[derive(Parser)]
#[command(name = "gdc-dice")]
#[command(about = "Dice a local GDC mirror into per-annotation files, ledgers and coverage reports")]
#[command(version, author)]
struct Cli {
    /// Dice against the latest snapshot at or before this timestamp.
    timestamp: Option<String>,

    #[arg(short = 'm', long)]
    mirror_dir: Option<String>,

    #[arg(short = 'd', long)]
    dice_dir: Option<String>,

    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_delimiter = ',')]
    programs: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    projects: Vec<String>,

    #[arg(long)]
    translation_table: Option<String>,

    /// Re-run conversions even when the diced file already exists.
    #[arg(short = 'f', long)]
    force_dice: bool,

    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let file_config = ConfigLoader::resolve(cli.config.as_deref())?;
    let overrides = ConfigOverrides {
        mirror_dir: cli.mirror_dir,
        dice_dir: cli.dice_dir,
        log_dir: cli.log_dir,
        timestamp: cli.timestamp,
        programs: cli.programs,
        projects: cli.projects,
        translation_table: cli.translation_table,
        force: cli.force_dice,
        dry_run: cli.dry_run,
    };
    let config = ConfigLoader::resolve_config(file_config, overrides)?;

    init_logging(&config)?;
    tracing::info!("gdc-dice {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "command line: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    tracing::info!("timestamp: {}", config.timestamp);
    if config.dry_run {
        tracing::info!("dry run: nothing will be written");
    }

    let table = match &config.translation_table {
        Some(path) => TranslationTable::load(path)?,
        None => TranslationTable::builtin()?,
    };
    tracing::debug!("translation table has {} entries", table.len());

    let dicer = Dicer::new(config, table, ConverterRegistry::builtin());
    let summary = dicer.run();
    if cli.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }

    let failed = summary.failed_programs();
    if !failed.is_empty() {
        return Err(miette::miette!("Dicing FAILED for {}", failed.join(", ")));
    }
    tracing::info!("Dicing completed successfully");
    Ok(())
}

fn init_logging(config: &RunConfig) -> Result<(), DiceError> {
    let file_layer = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| DiceError::Filesystem(format!("{dir}: {err}")))?;
            let path = dir.join(format!("gdcDice.{}.log", config.timestamp));
            let file = File::create(path.as_std_path())
                .map_err(|err| DiceError::Filesystem(format!("{path}: {err}")))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();
    Ok(())
}
