use std::io::{self, BufRead, Write};

use clap::Parser;
use privacy_bridge::{config, BridgeConfig, Registry};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "bridge")]
#[command(about = "Privacy bridge driven by newline-delimited JSON on stdin", long_about = None)]
#[command(version)]
struct Args {
    /// Print the registered operation names and exit
    #[arg(long)]
    list: bool,

    /// Timestamp used for requests that carry none; without it such requests are rejected
    #[arg(long, env = "BRIDGE_DEFAULT_TIMESTAMP")]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Request {
    op: String,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
    Ok { ok: String },
    Err { error: String, kind: &'static str },
}

fn load_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = BridgeConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        info!("Using default configuration");
        BridgeConfig::default()
    });

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;
    config::install(config)?;
    Ok(())
}

fn handle_line(registry: &Registry, line: &str, default_timestamp: Option<i64>) -> Reply {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("malformed request line: {e}");
            return Reply::Err {
                error: format!("Malformed request line: {e}"),
                kind: "DeserializationError",
            }
        }
    };

    let Some(timestamp) = request.timestamp.or(default_timestamp) else {
        warn!(operation = %request.op, "request without timestamp");
        return Reply::Err {
            error: "Request carries no timestamp and no default is configured".to_string(),
            kind: "InvalidTimestamp",
        };
    };

    match registry.invoke(&request.op, &request.payload, timestamp) {
        Ok(ok) => Reply::Ok { ok },
        Err(e) => Reply::Err {
            error: e.to_string(),
            kind: e.kind(),
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    load_config()?;
    let registry = Registry::default();

    if args.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    info!(operations = registry.names().count(), "bridge ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut served = 0u64;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&registry, &line, args.timestamp);

        serde_json::to_writer(&mut stdout, &reply)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        served += 1;
    }

    info!(served, "stdin closed, shutting down");
    Ok(())
}
