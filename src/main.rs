//! Pushgate - Push-Notification Consent and Delivery
//!
//! Diagnostics CLI entry point with global panic handler.

use std::io::{Read, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pushgate::cli::dismiss::DismissOptions;
use pushgate::cli::reset::ResetOptions;
use pushgate::cli::start::StartOptions;
use pushgate::cli::status::StatusOptions;
use pushgate::cli::worker::WorkerOptions;
use pushgate::config::{pushgate_home, Config};
use pushgate::error::exit_codes;
use pushgate::{
    DismissCommand, EventKind, FileKeyValueStore, PermissionStatus, PromptPolicy, ResetCommand,
    StartCommand, StatusCommand, WorkerCommand,
};

// =============================================================================
// CLI Definition
// =============================================================================

/// Pushgate - Push-Notification Consent and Delivery
#[derive(Parser)]
#[command(name = "pushgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the prompt record and the current decision
    Status {
        /// Permission status to evaluate against
        #[arg(long, default_value = "default")]
        permission: PermissionStatus,

        /// Evaluate as if no user is signed in
        #[arg(long)]
        no_session: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Record an application start
    Start {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Record a prompt dismissal
    Dismiss {
        /// Never prompt again
        #[arg(long)]
        permanent: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Restore the prompt history to defaults
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Run a worker event (JSON stdin) and print the platform actions
    Worker {
        /// The worker event type
        #[arg(value_enum)]
        event: WorkerEventArg,

        /// Notification permission reported by the host
        #[arg(long, default_value = "granted")]
        permission: PermissionStatus,

        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

/// Worker event types for CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkerEventArg {
    Push,
    NotificationClick,
    NotificationClose,
}

impl From<WorkerEventArg> for EventKind {
    fn from(arg: WorkerEventArg) -> Self {
        match arg {
            WorkerEventArg::Push => EventKind::Push,
            WorkerEventArg::NotificationClick => EventKind::NotificationClick,
            WorkerEventArg::NotificationClose => EventKind::NotificationClose,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pushgate error: {}", e);
            ExitCode::from(exit_codes::FAILED as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.pushgate/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("pushgate panic: {}", info);

        if let Some(home) = pushgate_home() {
            let crash_log = home.join("crash.log");
            let _ = std::fs::create_dir_all(&home);
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr, filtered by `PUSHGATE_LOG` (default `warn`).
fn setup_logging() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("PUSHGATE_LOG")
                .from_env_lossy(),
        )
        .try_init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Status {
                permission,
                no_session,
                json,
                quiet,
            } => {
                let options = StatusOptions {
                    json,
                    quiet,
                    permission,
                    has_session: !no_session,
                };
                run_status(&config, &options).await
            }
            Commands::Start { json, quiet } => run_start(&StartOptions { json, quiet }).await,
            Commands::Dismiss {
                permanent,
                json,
                quiet,
            } => {
                run_dismiss(&DismissOptions {
                    json,
                    quiet,
                    permanent,
                })
                .await
            }
            Commands::Reset { json, quiet } => run_reset(&ResetOptions { json, quiet }).await,
            Commands::Worker {
                event,
                permission,
                quiet,
            } => run_worker(&config, event.into(), &WorkerOptions { quiet, permission }).await,
        }
    })
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::OK as u8)
    } else {
        ExitCode::from(exit_codes::FAILED as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

async fn run_status(
    config: &Config,
    options: &StatusOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = FileKeyValueStore::new()?;
    let cmd = StatusCommand::new(store, PromptPolicy::from_config(&config.prompt));

    let output = cmd.run(options).await;
    print_formatted(&cmd.format_output(&output, options));

    Ok(success_to_exit_code(output.success))
}

async fn run_start(options: &StartOptions) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = StartCommand::new(FileKeyValueStore::new()?);

    let output = cmd.run().await;
    print_formatted(&cmd.format_output(&output, options));

    Ok(success_to_exit_code(output.success))
}

async fn run_dismiss(options: &DismissOptions) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = DismissCommand::new(FileKeyValueStore::new()?);

    let output = cmd.run(options).await;
    print_formatted(&cmd.format_output(&output, options));

    Ok(success_to_exit_code(output.success))
}

async fn run_reset(options: &ResetOptions) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ResetCommand::new(Arc::new(FileKeyValueStore::new()?));

    let output = cmd.run().await;
    print_formatted(&cmd.format_output(&output, options));

    Ok(success_to_exit_code(output.success))
}

async fn run_worker(
    config: &Config,
    kind: EventKind,
    options: &WorkerOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let cmd = WorkerCommand::new(config.worker.clone());
    let output = cmd.run(kind, &input, options).await;
    print_formatted(&cmd.format_output(&output, options));

    Ok(success_to_exit_code(output.success))
}
