// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use versedraft::app_config::{self, Config};
use versedraft::app_controller::Controller;
use versedraft::translation::RegenerateMode;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document, or every document of a directory, as whole jobs
    Translate {
        /// Input file or directory to process
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Directory for translated files (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Translate a document verse by verse in batches
    Verses {
        /// Input document
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Retranslate every verse except pending manual edits
        #[arg(long, conflicts_with = "continue_existing")]
        full: bool,

        /// Translate only verses without a translation
        #[arg(long = "continue")]
        continue_existing: bool,
    },

    /// Replace the translation of one segment in a stored draft
    Edit {
        /// Book or project of the draft
        scope: String,
        /// Segment id, e.g. GEN.1.1
        segment: String,
        /// New translation
        text: String,
        /// Text to replace in the draft (defaults to the current translation)
        #[arg(long)]
        old: Option<String>,
    },

    /// Save the draft of a scope as its new baseline
    Save {
        scope: String,
    },

    /// Drop unsaved changes to the draft of a scope
    Discard {
        scope: String,
    },

    /// Print the draft of a scope
    Show {
        scope: String,
    },

    /// List stored drafts
    List,

    /// Rebuild the draft of a scope from its segment translations
    Regenerate {
        scope: String,
        /// Source document used when the draft is empty
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
    },

    /// Generate shell completions for versedraft
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// versedraft - scripture draft translation through a remote job service
///
/// Translates USFM-like documents while keeping every marker in place, and
/// keeps an editable draft per book.
#[derive(Parser, Debug)]
#[command(name = "versedraft")]
#[command(version)]
#[command(about = "Remote machine translation of USFM documents with editable drafts")]
#[command(long_about = "versedraft sends the text of USFM-like documents to a remote translation service, \
rebuilds the documents with their markers untouched and stores the result as an editable draft.

EXAMPLES:
    versedraft translate GEN.usfm                 # Translate a whole book as one job
    versedraft -s en -t fr translate books/       # Translate every document of a directory
    versedraft verses GEN.usfm                    # Translate a new book in batches
    versedraft verses GEN.usfm --continue         # Translate only the missing verses
    versedraft edit GEN GEN.1.1 'Au commencement' # Change one verse of the draft
    versedraft save GEN                           # Keep the current draft
    versedraft discard GEN                        # Go back to the last saved draft
    versedraft list                               # Show the stored drafts
    versedraft completions bash > versedraft.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Account name for the translation service
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Account password for the translation service
    #[arg(long, env = "VERSEDRAFT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for a log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::decoration(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "versedraft", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    if !config.credentials().is_complete() {
        warn!("No service credentials configured; set service.username and service.password or use --username/--password");
    }

    let controller = Controller::with_config(config)?;
    controller.restore_usage().await?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the running translation...");
            interrupt.cancel();
        }
    });

    run_command(&controller, cli.command, &cancel).await
}

// Load the configuration file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(model) = &cli.model {
        config.service.model = model.clone();
    }
    if let Some(source_lang) = &cli.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &cli.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(username) = &cli.username {
        config.service.username = username.clone();
    }
    if let Some(password) = &cli.password {
        config.service.password = password.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_command(controller: &Controller, command: Commands, cancel: &CancellationToken) -> Result<()> {
    match command {
        Commands::Translate { input_path, output_dir } => {
            if input_path.is_file() {
                let output_dir = output_dir.unwrap_or_else(|| default_output_dir(&input_path));
                controller.translate_file(&input_path, &output_dir, cancel).await?.log();
            } else if input_path.is_dir() {
                let report = controller.translate_folder(&input_path, cancel).await?;
                for summary in &report.completed {
                    summary.log();
                }
                if !report.failed.is_empty() {
                    return Err(anyhow!("{} of {} files failed", report.failed.len(), report.completed.len() + report.failed.len()));
                }
            } else {
                return Err(anyhow!("Input path does not exist: {:?}", input_path));
            }
        }
        Commands::Verses { input_file, full, continue_existing } => {
            let mode = if full {
                RegenerateMode::Full
            } else if continue_existing {
                RegenerateMode::ContinueExisting
            } else {
                let existing = controller.stored_translations(&input_file).await?;
                if existing > 0 {
                    return Err(anyhow!(
                        "{} already has {} translated segments; pass --full to retranslate them or --continue to keep them",
                        input_file.display(),
                        existing
                    ));
                }
                RegenerateMode::ContinueExisting
            };
            controller.translate_verses(&input_file, mode, cancel).await?.log();
        }
        Commands::Edit { scope, segment, text, old } => {
            let replaced = controller.edit_segment(&scope, &segment, &text, old.as_deref()).await?;
            info!("Updated {} ({} occurrences in the draft, not saved yet)", segment, replaced);
        }
        Commands::Save { scope } => {
            controller.save_draft(&scope).await?;
            info!("Saved draft {}", scope);
        }
        Commands::Discard { scope } => {
            controller.discard_draft(&scope).await?;
            info!("Draft {} is back to its last saved state", scope);
        }
        Commands::Show { scope } => {
            let overview = controller.show_draft(&scope).await?;
            info!(
                "{}: {}/{} segments translated{}",
                scope,
                overview.translated_segments,
                overview.total_segments,
                if overview.is_dirty() { ", unsaved changes" } else { "" }
            );
            for id in &overview.dirty_segments {
                info!("  modified: {}", id);
            }
            print!("{}", overview.draft.content);
        }
        Commands::List => {
            let drafts = controller.list_drafts().await?;
            if drafts.is_empty() {
                info!("No drafts stored yet");
            }
            for (scope, updated_at) in &drafts {
                println!("{}\t{}", scope, updated_at);
            }
            info!("{}", controller.repository().connection().stats()?);
        }
        Commands::Regenerate { scope, source } => {
            let replaced = controller.regenerate_draft(&scope, &source).await?;
            info!("Regenerated draft {} ({} substitutions, not saved yet)", scope, replaced);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn default_output_dir(input_file: &Path) -> PathBuf {
    input_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}
