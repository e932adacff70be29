//! Photo Month Sorter - copy photos into year_month folders
//!
//! Command line front end: parses arguments, sets up logging and runs the
//! processor once.

use anyhow::{Context, Result};
use clap::Parser;
use photo_month_sorter::{Cli, Config, FailureBucket, Processor, RunSummary};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(format!(
            "{}{} {} {}\n",
            left_pad,
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        print_key_value(key, value, Some(color));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let guard = setup_logging(&config, cli.json_log)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Month Sorter starting");
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    config.validate()?;

    let log_file = config.log_file.clone();
    let processor = Processor::new(config)?;

    let token = processor.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    match processor.run() {
        Ok(summary) => {
            print_summary(&summary, &log_file);
            info!(
                classified = summary.classified_count(),
                failed = summary.failed_count(),
                "Processing complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {}", e);
            drop(guard);
            std::process::exit(1);
        }
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let file_config = Config::load_from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        cli.merge_with_config(file_config)
    } else {
        if !cli.has_paths() {
            anyhow::bail!("Both --source and --destination are required without --config");
        }
        cli.to_config()
    };

    Ok(config)
}

/// Setup logging: the log file gets debug and above, the console info and above
fn setup_logging(config: &Config, json_log: bool) -> Result<WorkerGuard> {
    let console_level = if config.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file_filter = EnvFilter::builder()
        .with_default_directive(Level::DEBUG.into())
        .from_env_lossy();

    if let Some(parent) = config.log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("opening log file {}", config.log_file.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    if json_log {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking)
                    .with_filter(file_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_level),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking)
                    .with_filter(file_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_level),
            )
            .init();
    }

    Ok(guard)
}

fn print_summary(summary: &RunSummary, log_file: &Path) {
    use cli_output::*;

    print_separator();
    print_title("Processing Complete");
    print_separator();

    print_blank();
    print_stat("Directories scanned", &summary.directories_scanned.to_string(), CliTheme::ACCENT);
    print_stat("Files seen", &summary.files_seen.to_string(), CliTheme::ACCENT);
    print_stat("Classified", &summary.classified_count().to_string(), CliTheme::SUCCESS);
    for bucket in FailureBucket::ALL {
        let count = summary.failed(bucket).len();
        let color = if count == 0 { CliTheme::HINT } else { CliTheme::WARNING };
        print_stat(bucket.as_str(), &count.to_string(), color);
    }
    print_blank();

    for (key, paths) in summary.month_groups() {
        print_key_value(&key.to_string(), &paths.len().to_string(), None);
    }

    print_blank();
    print_stat("Copied", &summary.copy.copied.len().to_string(), CliTheme::SUCCESS);
    print_stat("Copy failures", &summary.copy.failures.len().to_string(), CliTheme::ERROR);

    if !summary.copy.failures.is_empty() {
        print_separator();
        print_error(&format!("{} files could not be copied", summary.copy.failures.len()));
        print_blank();
        for failure in &summary.copy.failures {
            print_key_value(
                &failure.source.display().to_string(),
                &failure.error,
                Some(CliTheme::ERROR),
            );
        }
    }

    if summary.cancelled {
        print_separator();
        print_warning("Run was cancelled before completion");
    }

    if summary.copy.dry_run {
        print_separator();
        print_warning("Dry run: no files were copied");
    }

    print_separator();
    print_log_path(&log_file.display().to_string());
}
