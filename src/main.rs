//! CLI entry point for the fetch tool.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use fetch_core::FileInfo;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    // stdout carries the response body only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let request = args.to_request()?;

    if let Some(path) = &args.output {
        let bytes = request.download(path).await?;
        info!(path = %path.display(), bytes, "saved response body");
    } else if args.stat {
        let info = request.stat().await?;
        print_stat(&info)?;
    } else if args.json {
        let value: serde_json::Value = request.read_json().await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let body = request.read().await?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&body)?;
        stdout.flush()?;
    }

    Ok(())
}

fn print_stat(info: &FileInfo) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "name: {}", info.name())?;
    match info.size() {
        Some(size) => writeln!(out, "size: {size}")?,
        None => writeln!(out, "size: unknown")?,
    }
    if let Some(content_type) = info.content_type() {
        writeln!(out, "content-type: {content_type}")?;
    }
    if let Some(modified) = info.modified() {
        writeln!(out, "modified: {}", httpdate::fmt_http_date(modified))?;
    }
    if let Some(url) = info.url() {
        writeln!(out, "url: {url}")?;
    }
    Ok(())
}
