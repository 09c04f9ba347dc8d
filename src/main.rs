mod app_logic;
mod console_layer;
mod core;

use crate::app_logic::SessionHandler;
use crate::app_logic::batch::{self, BatchReport, ExtensionFilter};
use crate::core::{
    CoreExporter, CoreFileSystemScanner, CoreTextClassifier, ExportError, ExportOptions,
    ExporterOperations, SessionConfig,
};
use clap::{Parser, ValueEnum};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::format_description;

const EXIT_FAILURE: u8 = 1;
const EXIT_NOTHING_SELECTED: u8 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Select text files in a project tree and export them into one annotated context file.
///
/// Without --ext, --all or --list-types an interactive session is started.
#[derive(Debug, Parser)]
#[command(name = "codestract", version, about)]
struct Args {
    /// Project directory to walk
    #[arg(default_value = ".")]
    root: PathBuf,

    /// File names or glob patterns to leave out (repeatable, comma separated)
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Extra directory names to prune in addition to .env and .venv
    #[arg(long, value_name = "DIR", value_delimiter = ',')]
    prune: Vec<String>,

    /// Honour .gitignore and .ignore files while walking
    #[arg(long)]
    respect_gitignore: bool,

    /// Directory the export is written to [default: current directory]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Export, without interaction, every text file with one of these extensions
    #[arg(long, value_name = "EXTS", conflicts_with_all = ["all", "list_types"])]
    ext: Option<String>,

    /// Export, without interaction, every text file
    #[arg(long, conflicts_with = "list_types")]
    all: bool,

    /// Print the file extensions found in the tree, grouped by language
    #[arg(long)]
    list_types: bool,

    /// Print batch results as JSON
    #[arg(long)]
    json: bool,

    /// Terminal log level [default: warn, or info for batch runs]
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Also write a debug log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn is_batch(&self) -> bool {
        self.ext.is_some() || self.all || self.list_types
    }
}

fn log_file_path(log_dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = now
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    log_dir.join(format!("codestract_{stamp}.log"))
}

/*
 * Installs the global logger: terminal output on stderr at `level`, plus a
 * debug-level session log file when `log_dir` is given. A log file that cannot
 * be created is reported and skipped.
 */
fn setup_logging(level: log::LevelFilter, log_dir: Option<&Path>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    let mut log_file_error = None;
    if let Some(dir) = log_dir {
        let path = log_file_path(dir);
        match File::create(&path) {
            Ok(file) => loggers.push(WriteLogger::new(
                log::LevelFilter::Debug,
                Config::default(),
                file,
            )),
            Err(e) => log_file_error = Some((path, e)),
        }
    }
    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if let Some((path, e)) = log_file_error {
        log::error!("Could not create log file {path:?}: {e}");
    }
}

// Safe to call from every test; only the first call installs a logger.
#[cfg(test)]
pub(crate) fn initialize_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Info, Config::default());
}

fn build_config(args: &Args) -> Result<SessionConfig, core::ConfigError> {
    let mut config = SessionConfig::new(&args.root)?;
    config.add_exclusions(&args.exclude)?;
    config.add_pruned_dirs(&args.prune);
    config.respect_ignore_files = args.respect_gitignore;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize result: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run_list_types(config: &SessionConfig, json: bool) -> ExitCode {
    let extensions = match batch::collect_extensions(config) {
        Ok(extensions) => extensions,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let groups = batch::group_by_category(&extensions);
    if json {
        return print_json(&batch::type_listing_json(&groups));
    }
    print!("{}", batch::render_type_listing(&groups));
    ExitCode::SUCCESS
}

fn run_batch(config: &SessionConfig, filter: &ExtensionFilter, json: bool) -> ExitCode {
    let selected = match batch::collect_selection(config, &CoreTextClassifier::new(), filter) {
        Ok(selected) => selected,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    for skipped in &selected.skipped_directories {
        eprintln!("Skipped unreadable directory {:?}: {}", skipped.path, skipped.reason);
    }

    let exporter = CoreExporter::new(ExportOptions::from_config(config));
    match exporter.export(&selected.selection.snapshot()) {
        Ok(result) => {
            if json {
                print_json(&BatchReport::new(&result, &selected))
            } else {
                print!("{}", result.summary_text);
                ExitCode::SUCCESS
            }
        }
        Err(ExportError::NoFilesSelected) => {
            eprintln!("No files matched; nothing was exported.");
            ExitCode::from(EXIT_NOTHING_SELECTED)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run_interactive(config: SessionConfig) -> ExitCode {
    let exporter = CoreExporter::new(ExportOptions::from_config(&config));
    let mut handler = SessionHandler::new(
        config,
        Arc::new(CoreFileSystemScanner::new()),
        Arc::new(CoreTextClassifier::new()),
        Arc::new(exporter),
    );
    match console_layer::run_console(&mut handler) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Console session failed: {e}");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.is_batch() {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    setup_logging(
        args.log_level.map_or(default_level, Into::into),
        args.log_dir.as_deref(),
    );
    log::debug!("Arguments: {args:?}");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if args.list_types {
        return run_list_types(&config, args.json);
    }
    if args.all {
        return run_batch(&config, &ExtensionFilter::AllText, args.json);
    }
    if let Some(list) = &args.ext {
        let Some(filter) = ExtensionFilter::parse(list) else {
            eprintln!("Error: --ext needs at least one extension, e.g. --ext rs,toml");
            return ExitCode::from(EXIT_FAILURE);
        };
        return run_batch(&config, &filter, args.json);
    }
    if args.json {
        log::warn!("--json only applies to --ext, --all and --list-types; ignoring it.");
    }
    run_interactive(config)
}
