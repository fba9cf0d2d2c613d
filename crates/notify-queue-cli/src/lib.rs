//! # Notify Queue CLI
//!
//! Command-line interface for notify-queue System V queues.
//!
//! This module provides CLI commands for:
//! - Sending notification records from shell scripts
//! - Receiving, draining and waiting for records
//! - Inspecting and removing the native queue
//!
//! Configuration is layered: defaults, then an optional file, then
//! `NOTIFY_QUEUE__*` environment variables, then explicit flags.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use notify_queue::{
    MessageReceiver, MessageRecord, MessageSender, QueueBackend, QueueDependencies, QueueError,
    ReceiveLimit, SendOutcome, StaticIdentity, SysVQueueBackend, SysVQueueConfig,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "NOTIFY_QUEUE";

// ============================================================================
// CLI Structure
// ============================================================================

/// Notify Queue CLI - System V notification queues
#[derive(Parser)]
#[command(name = "notify-queue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send and receive notification records over System V message queues")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NOTIFY_QUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// One-character queue identity
    #[arg(short, long, global = true)]
    pub queue_id: Option<String>,

    /// Existing path the native key is derived from
    #[arg(short, long, global = true)]
    pub key_path: Option<PathBuf>,

    /// Sender recorded on outgoing messages
    #[arg(short, long, global = true, env = "NOTIFY_QUEUE_SENDER")]
    pub sender: Option<String>,

    /// Logging level or filter directive
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message
    Send {
        /// Message body
        body: String,

        /// Category tag carried with the message
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// Receive up to a number of waiting messages without blocking
    Receive {
        /// Maximum number of messages to remove, or -1 for all of them
        #[arg(short = 'n', long, default_value = "1", allow_negative_numbers = true)]
        limit: i64,
    },

    /// Remove every waiting message without blocking
    Drain,

    /// Block until one message arrives
    Wait {
        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Show native queue statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the derived native key
    Key,

    /// Destroy the native queue and every message in it
    Remove {
        /// Confirm removal
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(QueueError::Configuration(_)) => 1,
            Self::Queue(_) | Self::CommandFailed { .. } => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Io(_) => 4,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidFormat(#[from] config::ConfigError),

    #[error("Invalid logging setup: {message}")]
    Logging { message: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// CLI configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Queue to operate on
    pub queue: SysVQueueConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Apply explicit command-line flags on top of loaded settings
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(id) = &cli.queue_id {
            self.queue.id = id.clone();
        }
        if let Some(path) = &cli.key_path {
            self.queue.key_path = path.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if cli.json_logs {
            self.logging.format = LogFormat::Json;
        }
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

/// Statistics report printed by the `stats` command
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub queue: String,
    pub key: String,
    pub resource_id: i32,
    pub messages: u64,
    pub max_bytes: u64,
    pub last_send_pid: i32,
    pub last_receive_pid: i32,
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

/// Execute an already parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Completions { shell } = cli.command {
        return execute_completions_command(shell, &mut io::stdout());
    }

    let config = load_configuration(cli.config.as_deref())?.with_overrides(&cli);
    initialize_logging(&config.logging)?;

    let backend = open_backend(&config.queue, cli.sender.as_deref())?;
    let mut out = io::stdout();

    match cli.command {
        Commands::Send { body, category } => {
            execute_send_command(&backend, &body, category.as_deref(), &mut out)
        }
        Commands::Receive { limit } => {
            execute_receive_command(&backend, receive_limit(limit)?, &mut out)
        }
        Commands::Drain => execute_receive_command(&backend, ReceiveLimit::Drain, &mut out),
        Commands::Wait { timeout } => {
            execute_wait_command(backend, timeout.map(Duration::from_secs), &mut out).await
        }
        Commands::Stats { format } => execute_stats_command(&backend, format, &mut out),
        Commands::Key => {
            writeln!(out, "{}", backend.key())?;
            Ok(())
        }
        Commands::Remove { yes } => execute_remove_command(backend, yes),
        Commands::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Initialize logging on stderr so stdout carries only command output
pub fn initialize_logging(logging: &LoggingConfig) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| ConfigError::Logging {
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(io::stderr)).try_init(),
    };

    result.map_err(|e| {
        ConfigError::Logging {
            message: e.to_string(),
        }
        .into()
    })
}

/// Load configuration from an optional file and the environment
pub fn load_configuration(config_path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    Ok(builder.build()?.try_deserialize()?)
}

/// Construct the backend described by the queue configuration
pub fn open_backend(
    config: &SysVQueueConfig,
    sender: Option<&str>,
) -> Result<SysVQueueBackend, CliError> {
    let mut deps = QueueDependencies::new();
    if let Some(sender) = sender {
        deps = deps.with_identity(Arc::new(StaticIdentity::new(sender)));
    }
    Ok(SysVQueueBackend::new(config.clone(), deps)?)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Map `--limit` onto a non-blocking receive mode: `-1` drains, `N` bounds
pub fn receive_limit(limit: i64) -> Result<ReceiveLimit, CliError> {
    ReceiveLimit::from_raw(Some(limit)).map_err(|e| CliError::InvalidArgument {
        arg: "--limit".to_string(),
        message: e.to_string(),
    })
}

/// Print records one JSON document per line
pub fn write_records<W: Write>(out: &mut W, records: &[MessageRecord]) -> Result<(), CliError> {
    for record in records {
        serde_json::to_writer(&mut *out, record).map_err(io::Error::from)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn execute_send_command<W: Write>(
    backend: &SysVQueueBackend,
    body: &str,
    category: Option<&str>,
    out: &mut W,
) -> Result<(), CliError> {
    match backend.send(body, category)? {
        SendOutcome::Sent => writeln!(out, "sent")?,
        SendOutcome::Cancelled => writeln!(out, "cancelled")?,
    }
    Ok(())
}

fn execute_receive_command<W: Write>(
    backend: &SysVQueueBackend,
    limit: ReceiveLimit,
    out: &mut W,
) -> Result<(), CliError> {
    let records = backend.receive(None, limit)?;
    info!(limit = ?limit, received = records.len(), "Receive finished");
    write_records(out, &records)
}

/// Run the blocking receive off the runtime and race it against Ctrl-C
async fn execute_wait_command<W: Write>(
    backend: SysVQueueBackend,
    timeout: Option<Duration>,
    out: &mut W,
) -> Result<(), CliError> {
    let backend = Arc::new(backend);
    let waiter = {
        let backend = Arc::clone(&backend);
        tokio::task::spawn_blocking(move || backend.receive(None, ReceiveLimit::Blocking))
    };
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        joined = waiter => {
            let records = joined.map_err(|e| CliError::CommandFailed {
                message: e.to_string(),
            })??;
            write_records(out, &records)
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!(queue = %backend.queue_id(), "Wait abandoned by operator");
            Ok(())
        }
        _ = deadline => {
            warn!(queue = %backend.queue_id(), timeout = ?timeout, "Wait timed out");
            Ok(())
        }
    }
}

fn execute_stats_command<W: Write>(
    backend: &SysVQueueBackend,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    let stats = backend.stats()?;
    let report = StatsReport {
        queue: backend.queue_name().to_string(),
        key: backend.key().to_string(),
        resource_id: backend.resource_id()?,
        messages: stats.messages,
        max_bytes: stats.max_bytes,
        last_send_pid: stats.last_send_pid,
        last_receive_pid: stats.last_receive_pid,
    };

    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &report).map_err(io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "queue:            {}", report.queue)?;
            writeln!(out, "key:              {}", report.key)?;
            writeln!(out, "resource id:      {}", report.resource_id)?;
            writeln!(out, "messages:         {}", report.messages)?;
            writeln!(out, "max bytes:        {}", report.max_bytes)?;
            writeln!(out, "last send pid:    {}", report.last_send_pid)?;
            writeln!(out, "last receive pid: {}", report.last_receive_pid)?;
        }
    }
    Ok(())
}

fn execute_remove_command(backend: SysVQueueBackend, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::InvalidArgument {
            arg: "--yes".to_string(),
            message: "removing a queue discards every message in it; pass --yes to confirm"
                .to_string(),
        });
    }
    backend.remove()?;
    Ok(())
}

fn execute_completions_command<W: Write>(
    shell: clap_complete::Shell,
    out: &mut W,
) -> Result<(), CliError> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "notify-queue", out);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
