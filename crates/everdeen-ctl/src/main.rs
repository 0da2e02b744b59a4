//! Everdeen control CLI
//!
//! Launches the proxy and drives its control API from the shell.
//!
//! Usage:
//!   everdeen-ctl start --expectations mocks.yaml
//!   everdeen-ctl --control-url http://127.0.0.1:4322 requests <uuid>

mod expectations_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use everdeen::{ControlClient, Expectation, ProcessManager, ServerOptions, StderrSink};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Drive an Everdeen HTTP mock proxy
#[derive(Parser, Debug)]
#[command(name = "everdeen-ctl")]
#[command(author, version, about = "Drive an Everdeen HTTP mock proxy")]
struct Cli {
    /// Control API URL of a running proxy
    #[arg(
        long,
        global = true,
        env = "EVERDEEN_CONTROL_URL",
        default_value = "http://127.0.0.1:4322"
    )]
    control_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch the proxy and keep it running until Ctrl-C
    Start(StartArgs),
    /// Check that the control API answers
    Ping,
    /// List registered expectations
    List,
    /// Register expectations from a YAML or JSON file
    Register {
        file: PathBuf,
    },
    /// Show requests captured for an expectation
    Requests {
        uuid: Uuid,
    },
    /// Drop all expectations and captured requests
    Reset,
}

#[derive(clap::Args, Debug)]
struct StartArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "EVERDEEN_PROXY_PORT", default_value = "4321")]
    proxy_port: u16,

    #[arg(long, env = "EVERDEEN_CONTROL_PORT", default_value = "4322")]
    control_port: u16,

    /// CA certificate used to intercept TLS (requires --ca-key)
    #[arg(long, requires = "ca_key")]
    ca_cert: Option<PathBuf>,

    /// CA private key (requires --ca-cert)
    #[arg(long, requires = "ca_cert")]
    ca_key: Option<PathBuf>,

    /// Proxy binary to run instead of the bundled one
    #[arg(long, env = "EVERDEEN_BINARY")]
    binary: Option<PathBuf>,

    /// Directory holding the bundled binaries
    #[arg(long, env = "EVERDEEN_BINARIES_DIR")]
    binaries_dir: Option<PathBuf>,

    /// Expectations to register once the proxy is ready
    #[arg(short, long)]
    expectations: Option<PathBuf>,
}

impl StartArgs {
    fn into_options(self) -> ServerOptions {
        let mut options = ServerOptions::new(self.proxy_port, self.control_port)
            .with_host(self.host)
            .with_stderr(StderrSink::Inherit);
        if let (Some(cert), Some(key)) = (self.ca_cert, self.ca_key) {
            options = options.with_ca(cert, key);
        }
        if let Some(binary) = self.binary {
            options = options.with_binary(binary);
        }
        if let Some(dir) = self.binaries_dir {
            options = options.with_binaries_dir(dir);
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let client = ControlClient::new(&cli.control_url);

    match cli.command {
        Command::Start(args) => start(args).await?,
        Command::Ping => println!("{}", client.ping().await?),
        Command::List => {
            let expectations = client.list_expectations().await?;
            print_json(&expectations.iter().map(describe).collect::<Vec<_>>())?;
        }
        Command::Register { file } => {
            let expectations = expectations_file::load(&file)?;
            let registered = client.register_expectations(&expectations).await?;
            print_json(&registered.iter().map(describe).collect::<Vec<_>>())?;
        }
        Command::Requests { uuid } => {
            let requests = client
                .list_requests(uuid)
                .await
                .with_context(|| format!("Failed to fetch requests for {uuid}"))?;
            print_json(&requests)?;
        }
        Command::Reset => {
            client.reset_all().await?;
            info!("Proxy state reset");
        }
    }

    Ok(())
}

async fn start(args: StartArgs) -> Result<()> {
    let expectations = match &args.expectations {
        Some(path) => expectations_file::load(path)?,
        None => Vec::new(),
    };

    let options = args.into_options();
    let proxy_addr = options.proxy_addr();
    let mut server = ProcessManager::launch(options)
        .await
        .context("Failed to start the proxy")?;
    info!(proxy = %proxy_addr, control = %server.client().base_url(), "Proxy running");

    if !expectations.is_empty() {
        let registered = server.register_expectations(&expectations).await?;
        print_json(&registered.iter().map(describe).collect::<Vec<_>>())?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    server.stop()?;
    server.wait().await?;
    Ok(())
}

/// Wire form of an expectation plus the server-assigned fields.
fn describe(expectation: &Expectation) -> Value {
    let mut value = expectation.to_wire();
    if let Value::Object(map) = &mut value {
        if let Some(uuid) = expectation.uuid() {
            map.insert("uuid".to_string(), json!(uuid));
        }
        if let Some(matches) = expectation.matches() {
            map.insert("matches".to_string(), json!(matches));
        }
    }
    value
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
