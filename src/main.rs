//! portctl - run a process with a loopback control port, and stop or query
//! it from a separate invocation.
//!
//! CHANGELOG:
//! - 10/19/2026 - Detached mode
//! - 10/19/2026 - Initial CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use portctl::config::{resolve_home, AppPaths};
use portctl::control::{ControlClient, ControlServer, FilePortStore};
use portctl::host::{HostExit, ProcessHost};
use portctl::output::OutputControls;

/// Run a process with a loopback control port, or stop/query a running one.
#[derive(Parser, Debug)]
#[command(name = "portctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Application home holding conf/controlport (default: $PORTCTL_HOME or ~/.portctl)
    #[arg(long, global = true)]
    home: Option<String>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start in server mode, listening for control commands
    Start {
        /// Listen address as [host:]port (default: 127.0.0.1 on a free port)
        #[arg(short = 'j', long)]
        listen: Option<String>,

        /// Reuse the persisted port instead of selecting a new one
        #[arg(long)]
        reuse_port: bool,

        /// Detach from the terminal and run in the background
        #[arg(long)]
        detach: bool,

        /// Program to supervise (stopped along with the host)
        #[arg(last = true)]
        program: Vec<String>,
    },

    /// Stop a running instance
    Stop(ClientArgs),

    /// Check whether an instance is running (exit code 0/1/3/4)
    Status(ClientArgs),

    /// Send a raw command line and print the reply
    Send {
        /// Command line to send
        line: String,

        #[command(flatten)]
        target: ClientArgs,
    },
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Control address as [host:]port (default: the persisted port)
    #[arg(short = 'j', long)]
    listen: Option<String>,

    /// Connect/read timeout in seconds (default: wait indefinitely)
    #[arg(long)]
    timeout: Option<f64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let paths = AppPaths::new(resolve_home(cli.home.as_deref()));

    let result = match cli.command {
        Command::Start {
            listen,
            reuse_port,
            detach,
            program,
        } => cmd_start(&paths, listen.as_deref(), reuse_port, detach, &program),
        Command::Stop(target) => cmd_send(&paths, "stop", &target),
        Command::Status(target) => cmd_send(&paths, "status", &target),
        Command::Send { line, target } => cmd_send(&paths, &line, &target),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn cmd_start(
    paths: &AppPaths,
    listen: Option<&str>,
    reuse_port: bool,
    detach: bool,
    program: &[String],
) -> Result<ExitCode> {
    if detach {
        detach_process(paths)?;
    }

    let host = Arc::new(match program.split_first() {
        Some((name, args)) => ProcessHost::spawn(name, args)?,
        None => ProcessHost::idle(),
    });

    let store = Arc::new(FilePortStore::new(paths.port_file()));
    let server = ControlServer::new(host.clone(), store, listen, !reuse_port);
    // the listener thread never keeps the process alive by itself
    let _listener = server.start();

    match host.wait() {
        HostExit::Stopped(code) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(1))),
        HostExit::ChildExited(code) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(1))),
    }
}

#[cfg(unix)]
fn detach_process(paths: &AppPaths) -> Result<()> {
    use daemonize::Daemonize;

    std::fs::create_dir_all(paths.conf_dir())
        .with_context(|| format!("Failed to create {:?}", paths.conf_dir()))?;
    std::fs::create_dir_all(paths.logs_dir())
        .with_context(|| format!("Failed to create {:?}", paths.logs_dir()))?;
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.log_file())
        .with_context(|| format!("Failed to open log file {:?}", paths.log_file()))?;

    Daemonize::new()
        .pid_file(paths.pid_file())
        .working_directory(paths.home())
        .stderr(log)
        .start()
        .context("Failed to daemonize")
}

#[cfg(not(unix))]
fn detach_process(_paths: &AppPaths) -> Result<()> {
    anyhow::bail!("--detach is only supported on unix")
}

fn cmd_send(paths: &AppPaths, command: &str, target: &ClientArgs) -> Result<ExitCode> {
    let timeout = target
        .timeout
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --timeout")?;

    let store = FilePortStore::new(paths.port_file());
    let client = ControlClient::from_spec(target.listen.as_deref(), &store).with_timeout(timeout);
    let exchange = client.exchange(command);

    OutputControls { json: target.json }.print(&exchange);

    Ok(exchange.status.into())
}
