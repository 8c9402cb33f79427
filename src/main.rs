// src/main.rs

//! Command-line front end: send a request through the multiplexer and print
//! its events, or read and write JSON documents by path.

use anyhow::{Context, Result, anyhow};
use httpmux::config::Config;
use httpmux::core::json::{JsonDocument, JsonScalar};
use httpmux::core::tasks::event_pump::EventPump;
use httpmux::core::transport::ReqwestTransport;
use httpmux::{HttpVerb, MuxEvent, RequestMultiplexer, SubmitRequest};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_PATH: &str = "httpmux.toml";

const USAGE: &str = "\
Usage:
  httpmux [--config path] get <url> [keyword]
  httpmux [--config path] post <url> <body> [keyword]
  httpmux json-get <file> <path>
  httpmux json-set <file> <path> <value>
  httpmux --version";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--version") {
        println!("httpmux version {VERSION}");
        return Ok(());
    }

    // Logging comes up before the config so that config warnings are visible;
    // the configured level is applied afterwards unless RUST_LOG is set.
    let env_level = env::var("RUST_LOG").ok();
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(
        env_level.clone().unwrap_or_else(|| "info".to_string()),
    ));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = match args.iter().position(|arg| arg == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                eprintln!("--config flag requires a value");
                std::process::exit(1);
            }
            let path = args.remove(i + 1);
            args.remove(i);
            Some(path)
        }
        None => None,
    };

    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };
    if env_level.is_none() {
        reload_handle
            .modify(|filter| *filter = EnvFilter::new(&config.log_level))
            .map_err(|e| anyhow!("failed to apply log level: {e}"))?;
    }

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let outcome = match args.as_slice() {
        ["get", url, rest @ ..] if rest.len() <= 1 => {
            let request = SubmitRequest::new(keyword_arg(rest), *url).verb(HttpVerb::Get);
            run_request(&config, request).await
        }
        ["post", url, body, rest @ ..] if rest.len() <= 1 => {
            let request = SubmitRequest::new(keyword_arg(rest), *url)
                .verb(HttpVerb::Post)
                .text_body(*body);
            run_request(&config, request).await
        }
        ["json-get", file, path] => json_get(file, path),
        ["json-set", file, path, value] => json_set(file, path, value),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn keyword_arg(rest: &[&str]) -> String {
    rest.first().copied().unwrap_or("cli").to_string()
}

/// An explicit `--config` must load; otherwise `httpmux.toml` is used if present.
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}

async fn run_request(config: &Config, request: SubmitRequest) -> Result<()> {
    let transport = Arc::new(ReqwestTransport::new(config.user_agent.as_deref())?);
    let (mux, pump) = RequestMultiplexer::new(config, transport);
    let mut events = mux.subscribe();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let keyword = request.keyword.clone();
    if !mux.submit(request) {
        return Err(anyhow!("request '{keyword}' was not accepted"));
    }

    // The pump is polled by this future, so it stays on the primary thread.
    let pump_loop = async move {
        if let Some(pump) = pump {
            EventPump::run(pump, shutdown_rx).await;
        }
    };
    let printer = async move {
        let result = loop {
            match events.recv().await {
                Ok(event) => {
                    let done = event.is_completion();
                    let printed = print_event(&event);
                    if done {
                        break printed;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    info!("Skipped {} events.", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break Err(anyhow!("event bus closed before completion"));
                }
            }
        };
        let _ = shutdown_tx.send(());
        result
    };

    let ((), result) = tokio::join!(pump_loop, printer);
    mux.shutdown();
    result
}

fn print_event(event: &MuxEvent) -> Result<()> {
    match event {
        MuxEvent::TextCompleted {
            status, headers, text, ..
        } => {
            info!("HTTP {} with {} headers.", status, headers.len());
            println!("{text}");
            Ok(())
        }
        MuxEvent::BinaryCompleted {
            status, bytes, ..
        } => {
            println!("HTTP {status}: {} bytes of binary content", bytes.len());
            Ok(())
        }
        MuxEvent::Error { keyword, status } => {
            Err(anyhow!("request '{keyword}' failed (status {status})"))
        }
        MuxEvent::TextChunk { text, .. } => {
            println!("{text}");
            Ok(())
        }
        MuxEvent::BinaryChunk { bytes, .. } => {
            println!("[{} byte chunk]", bytes.len());
            Ok(())
        }
    }
}

fn json_get(file: &str, path: &str) -> Result<()> {
    let document = JsonDocument::from_file(file).with_context(|| format!("reading '{file}'"))?;
    match document.get_value(path)? {
        Value::String(s) => println!("{s}"),
        other => println!("{other}"),
    }
    Ok(())
}

fn json_set(file: &str, path: &str, value: &str) -> Result<()> {
    let mut document =
        JsonDocument::from_file(file).with_context(|| format!("reading '{file}'"))?;
    document.set(path, JsonScalar::parse(value))?;
    fs::write(file, document.as_str()).with_context(|| format!("writing '{file}'"))?;
    Ok(())
}
