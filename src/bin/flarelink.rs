//! Flarelink CLI binary.
//!
//! # Commands
//!
//! - `connect` - Negotiate a session and stream lifecycle signals
//! - `classify` - Classify a raw handshake response string

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flarelink::{
    classify, Client, ClientConfig, HandshakeOutcome, Priority, SignalKind, VERSION,
};

#[derive(Parser)]
#[command(name = "flarelink")]
#[command(version = VERSION)]
#[command(about = "Flarelink client connection core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate a session and print lifecycle signals until Ctrl-C
    Connect {
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Handshake password
        #[arg(long)]
        password: Option<String>,

        /// Connection arguments as key=value pairs
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// Reconnect delay in milliseconds (enables auto-reconnect)
        #[arg(long)]
        reconnect_ms: Option<u64>,

        /// TOML config file; takes precedence over --host and --port
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Classify a raw handshake response string
    Classify {
        /// Response string, or omit for a transport failure
        response: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Connect {
            host,
            port,
            password,
            args,
            reconnect_ms,
            config,
        } => connect(host, port, password, args, reconnect_ms, config).await,
        Commands::Classify { response } => {
            let outcome = classify(response.as_deref());
            match &outcome {
                HandshakeOutcome::Established {
                    assigned_id,
                    version,
                } => {
                    println!("established: {assigned_id}");
                    if let Some(version) = version {
                        println!("server version: {}", version.descriptor());
                    }
                },
                HandshakeOutcome::Redirect { host, port } => {
                    println!("redirect to {host}:{port}");
                },
                HandshakeOutcome::Failed(failure) => println!("failed: {failure}"),
            }
            Ok(())
        },
    }
}

async fn connect(
    host: String,
    port: u16,
    password: Option<String>,
    args: Vec<String>,
    reconnect_ms: Option<u64>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = match config {
        Some(path) => {
            let config = ClientConfig::from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            Client::from_config(&config)
        },
        None => Client::new(host, port),
    };

    if let Some(password) = password {
        let _ = client.set_password(password);
    }
    for pair in args {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("argument `{pair}` is not KEY=VALUE"))?;
        let _ = client.set_argument(key, value);
    }
    if let Some(delay_ms) = reconnect_ms {
        let _ = client.enable_auto_reconnect(delay_ms);
    }

    let _ = client
        .on(SignalKind::Connect, Priority::Normal, |_| {
            println!("CONNECT");
        })
        .on(SignalKind::Disconnect, Priority::Normal, |signal| {
            println!("DISCONNECT {}", signal.payload.as_deref().unwrap_or_default());
        })
        .on(SignalKind::TimedOut, Priority::Normal, |signal| {
            println!("TIMED_OUT {}", signal.payload.as_deref().unwrap_or_default());
        });

    if let Err(err) = client.establish().await {
        tracing::warn!("initial negotiation failed: {err}");
        if reconnect_ms.is_none() {
            client.teardown().await;
            return Err(err.into());
        }
    }

    tokio::signal::ctrl_c().await?;
    client.teardown().await;
    Ok(())
}
