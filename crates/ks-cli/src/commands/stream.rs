//! Attach and exec commands

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use ks_stream::{Binder, InputSource, Multiplexer, StreamOptions, Target, WsConnector};

use super::Settings;
use crate::output::{describe_failure, exit_code, print_error, print_info};
use crate::terminal;

/// Arguments shared by `attach` and `exec`
#[derive(Debug, Clone, Args)]
pub struct StreamArgs {
    /// Pod name
    pub pod: String,

    /// Container name
    #[arg(short, long)]
    pub container: String,

    /// Namespace (defaults to the context's namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Pass stdin to the container
    #[arg(short = 'i', long)]
    pub stdin: bool,

    /// Allocate a TTY; with --stdin the local terminal runs in raw mode
    #[arg(short, long)]
    pub tty: bool,
}

/// Attach to the main process of a container
pub async fn attach_command(settings: Settings, args: &StreamArgs) -> Result<i32> {
    let namespace = settings.namespace(args.namespace.as_deref());
    let target = Target::attach(namespace, &args.pod, &args.container);
    run(settings, args, target).await
}

/// Run `command` in a container
pub async fn exec_command(settings: Settings, args: &StreamArgs, command: &[String]) -> Result<i32> {
    let namespace = settings.namespace(args.namespace.as_deref());
    let target = Target::exec(namespace, &args.pod, &args.container, command.iter().cloned());
    run(settings, args, target).await
}

async fn run(settings: Settings, args: &StreamArgs, target: Target) -> Result<i32> {
    let connector = WsConnector::with_capacity(settings.client.event_channel_capacity);
    let chunk_size = settings.client.input_chunk_size;
    let binder = Binder::new(Multiplexer::new(
        Arc::new(settings.kube),
        Arc::new(connector),
    ));

    let mut options = StreamOptions::new().stdout(io::stdout()).tty(args.tty);
    // A TTY merges stderr into stdout on the server side.
    if !args.tty {
        options = options.stderr(io::stderr());
    }

    let mut raw_mode = None;
    if args.stdin {
        let source = if args.tty {
            let (guard, source) =
                terminal::terminal_input().context("failed to set up the local terminal")?;
            raw_mode = Some(guard);
            print_info("Press Ctrl+] to detach");
            source
        } else {
            InputSource::from_reader(tokio::io::stdin(), chunk_size)
        };
        options = options.stdin(source);
    }

    let bound = binder
        .bind(&target, options)
        .await
        .with_context(|| format!("failed to connect to pod {}", args.pod))?;

    let status = tokio::select! {
        status = bound.wait() => status,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Interrupted, closing connection");
            bound.close();
            bound.wait().await
        }
    };
    drop(raw_mode);

    if let Some(message) = status.as_ref().and_then(describe_failure) {
        print_error(&message);
    }
    Ok(exit_code(status.as_ref()))
}
