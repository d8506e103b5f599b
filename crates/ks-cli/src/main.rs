//! kubestream CLI
//!
//! Attach to or run commands in Kubernetes containers:
//! - `attach`: connect to the main process of a running container
//! - `exec`: start a new process in a running container

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubestream::commands::{self, Settings, StreamArgs};
use kubestream::output::print_error;

#[derive(Parser)]
#[command(name = "kubestream")]
#[command(author, version, about = "Attach to and exec in Kubernetes containers")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the client configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach to the main process of a running container
    Attach {
        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Run a command in a running container
    Exec {
        #[command(flatten)]
        stream: StreamArgs,

        /// Command and arguments, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr; stdout is reserved for container output.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = Settings::load(
        cli.config.as_deref(),
        cli.kubeconfig.as_deref(),
        cli.context.as_deref(),
    )?;

    match cli.command {
        Commands::Attach { stream } => commands::attach_command(settings, &stream).await,
        Commands::Exec { stream, command } => {
            commands::exec_command(settings, &stream, &command).await
        }
    }
}
