// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

use vidsqueeze::app_config::{self, Config, TranslationProvider};
use vidsqueeze::app_controller::Controller;
use vidsqueeze::cancellation::CancellationToken;
use vidsqueeze::compression::JobRequest;
use vidsqueeze::file_utils::FileManager;
use vidsqueeze::language_utils::SUPPORTED_LANGUAGES;
use vidsqueeze::media::{Container, SubtitleMode};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Google,
    Echo,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::Echo => TranslationProvider::Echo,
        }
    }
}

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

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSubtitleMode {
    None,
    Soft,
    Hard,
}

impl From<CliSubtitleMode> for SubtitleMode {
    fn from(mode: CliSubtitleMode) -> Self {
        match mode {
            CliSubtitleMode::None => SubtitleMode::None,
            CliSubtitleMode::Soft => SubtitleMode::Soft,
            CliSubtitleMode::Hard => SubtitleMode::Hard,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliContainer {
    Mp4,
    Mkv,
}

impl From<CliContainer> for Container {
    fn from(container: CliContainer) -> Self {
        match container {
            CliContainer::Mp4 => Container::Mp4,
            CliContainer::Mkv => Container::Mkv,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-encode videos so each output fits a size limit
    Compress(CompressArgs),

    /// Translate an SRT subtitle file
    Translate(TranslateArgs),

    /// List the accepted translation language codes
    Languages,

    /// Generate shell completions for vidsqueeze
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct CompressArgs {
    /// Video files or directories to compress
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Maximum output size in gigabytes (1 GB = 1024^3 bytes)
    #[arg(short = 'm', long)]
    max_size_gb: f64,

    /// How to include the subtitle file
    #[arg(long, value_enum, default_value = "none")]
    subtitle_mode: CliSubtitleMode,

    /// Subtitle file for soft or hard mode
    #[arg(short = 's', long)]
    subtitle: Option<PathBuf>,

    /// Output container
    #[arg(long, value_enum, default_value = "mp4")]
    container: CliContainer,

    /// Jobs run at once (0 = all)
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Subtitle file to translate
    #[arg(value_name = "SRT_FILE")]
    input_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Requests in flight at once
    #[arg(long)]
    concurrency: Option<usize>,
}

/// vidsqueeze - fit videos under a size limit and translate their subtitles
#[derive(Parser, Debug)]
#[command(name = "vidsqueeze")]
#[command(version)]
#[command(about = "Size-targeted video compression and subtitle translation")]
#[command(long_about = "vidsqueeze re-encodes videos at the bitrate that makes them fit a size limit,
optionally muxing or burning a subtitle file, and translates SRT subtitles.

EXAMPLES:
    vidsqueeze compress movie.mkv -m 1.8                        # Fit under 1.8 GB
    vidsqueeze compress movie.mkv -m 2 --subtitle-mode hard -s movie.srt
    vidsqueeze compress /videos/ -m 0.5 --container mkv -j 2    # Whole directory, two at a time
    vidsqueeze translate movie.srt -s en -t fr                  # Writes movie_translated.srt
    vidsqueeze completions bash > vidsqueeze.bash               # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
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

    fn get_symbol_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "✗",
            Level::Warn => "!",
            Level::Info => " ",
            Level::Debug => "·",
            Level::Trace => "…",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[0m",
            Level::Debug => "\x1B[36m",
            Level::Trace => "\x1B[90m",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_symbol_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = CommandLineOptions::parse();

    // Completions and the language list need neither logging nor config
    match &options.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            return Ok(());
        }
        Commands::Languages => {
            for (name, code) in SUPPORTED_LANGUAGES {
                println!("{:<8} {}", code, name);
            }
            return Ok(());
        }
        _ => {}
    }

    let startup_level = options
        .log_level
        .clone()
        .map(|level| app_config::LogLevel::from(level).to_level_filter())
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = CustomLogger::init(startup_level) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let mut config = Config::load_or_create(&options.config_path)
        .with_context(|| format!("Failed to load configuration from {}", options.config_path))?;

    // The configured level applies unless one was given on the command line
    match options.log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match options.command {
        Commands::Compress(args) => run_compress(config, args, cancel).await,
        Commands::Translate(args) => run_translate(config, args, cancel).await,
        Commands::Languages | Commands::Completions { .. } => Ok(()),
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping running jobs");
            cancel.cancel();
        }
    });
}

async fn run_compress(mut config: Config, args: CompressArgs, cancel: CancellationToken) -> Result<()> {
    if let Some(jobs) = args.jobs {
        config.encoder.max_parallel_jobs = jobs;
    }
    config.validate().context("Invalid configuration")?;

    let sources = FileManager::expand_video_inputs(&args.inputs)?;
    if sources.is_empty() {
        return Err(anyhow!("No video files found in the given inputs"));
    }
    if args.subtitle.is_some() && sources.len() > 1 {
        return Err(anyhow!("A subtitle file can only be used with a single video"));
    }

    let target_size_bytes = args.max_size_gb * BYTES_PER_GB;
    let requests: Vec<JobRequest> = sources
        .into_iter()
        .map(|source_path| JobRequest {
            source_path,
            subtitle_mode: args.subtitle_mode.into(),
            subtitle_path: args.subtitle.clone(),
            container: args.container.into(),
            target_size_bytes,
        })
        .collect();

    info!("Compressing {} file(s) to at most {} GB", requests.len(), args.max_size_gb);

    let controller = Controller::with_config(config)?;
    let summary = controller.compress(requests, cancel).await?;

    if summary.failed > 0 {
        error!("{} job(s) failed", summary.failed);
        return Err(anyhow!("{} of {} job(s) failed", summary.failed, summary.results.len()));
    }
    if summary.cancelled > 0 {
        return Err(anyhow!("Cancelled"));
    }
    Ok(())
}

async fn run_translate(mut config: Config, args: TranslateArgs, cancel: CancellationToken) -> Result<()> {
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(source_language) = args.source_language {
        config.source_language = source_language;
    }
    if let Some(target_language) = args.target_language {
        config.target_language = target_language;
    }
    if let Some(concurrency) = args.concurrency {
        config.translation.concurrent_requests = concurrency;
    }
    config.validate().context("Invalid configuration")?;

    if !FileManager::file_exists(&args.input_path) {
        return Err(anyhow!("Input file does not exist: {}", args.input_path.display()));
    }

    let controller = Controller::with_config(config)?;
    controller.translate(args.input_path, cancel).await?;
    Ok(())
}
