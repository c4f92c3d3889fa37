//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `pr0gramm_transport` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use pr0gramm_transport::initialization::{init_crypto_provider, init_logger_with};
use pr0gramm_transport::{run_fetch, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();
    let dump_log = config.dump_log;

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    let logs =
        init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    let report = match run_fetch(config).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("pr0gramm_transport error: {:#}", e);
            process::exit(1);
        }
    };

    for result in &report.results {
        match (&result.status, &result.error) {
            (Some(status), _) => println!(
                "{} {} in {:.0?}{}",
                status,
                result.url,
                result.elapsed,
                result
                    .bytes
                    .map(|b| format!(" ({b} bytes)"))
                    .unwrap_or_default()
            ),
            (None, Some(error)) => println!("ERR {} in {:.0?}: {}", result.url, result.elapsed, error),
            (None, None) => println!("??? {}", result.url),
        }
        if let Some(proxied) = &result.proxied {
            println!("    via {proxied}");
        }
    }

    match report.server_time {
        Some(time) => println!("Server time: {}", time.to_rfc3339()),
        None => println!("Server time: unknown"),
    }
    match report.proxy {
        Some(addr) => println!("Proxy: http://{addr}/"),
        None => println!("Proxy: none"),
    }
    println!(
        "Fetched {}/{} URL{} in {:.1}s",
        report.successful(),
        report.results.len(),
        if report.results.len() == 1 { "" } else { "s" },
        report.elapsed_seconds
    );

    if dump_log {
        println!("--- recent log ---");
        for line in logs.recent_messages() {
            println!("{line}");
        }
    }

    if report.successful() < report.results.len() {
        process::exit(1);
    }
    Ok(())
}
