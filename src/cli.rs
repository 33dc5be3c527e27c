//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use fetch_core::{DomainLimiter, Request, RequestContext, TokenBucket};
use tracing::debug;

/// Send one HTTP request and print or save the response.
///
/// Query parameters and headers whose value is empty, `0` or `false` are
/// left out of the request.
#[derive(Parser, Debug)]
#[command(name = "fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Request URL (`/path` and `:port/path` resolve against localhost)
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'Q', long = "query", value_name = "KEY=VALUE", value_parser = parse_query)]
    pub query: Vec<(String, String)>,

    /// Header as key:value (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY:VALUE", value_parser = parse_header)]
    pub header: Vec<(String, String)>,

    /// Credentials as user[:password]
    #[arg(short, long, value_name = "USER[:PASSWORD]")]
    pub user: Option<String>,

    /// Request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// MIME type of the request body
    #[arg(long, default_value = "text/plain; charset=utf-8", requires = "data")]
    pub content_type: String,

    /// Decode the response as JSON and pretty-print it
    #[arg(long, conflicts_with_all = ["stat", "output"])]
    pub json: bool,

    /// Maximum requests per second (token bucket, burst 1)
    #[arg(long, value_parser = parse_rate)]
    pub rate: Option<f64>,

    /// Minimum delay between requests to the same host in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60000))]
    pub host_delay: Option<u64>,

    /// Give up after this many seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Save the body to this file instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print response metadata instead of the body
    #[arg(long, conflicts_with = "output")]
    pub stat: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Log filter implied by `-q` / `-v`, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Builds the request described by the arguments.
    pub fn to_request(&self) -> Result<Request> {
        if self.rate.is_some() && self.host_delay.is_some() {
            bail!("--rate and --host-delay cannot be combined");
        }

        let mut request = Request::new(self.method.to_ascii_uppercase(), &self.url);

        for (key, value) in &self.query {
            request = request.query(key, value);
        }
        for (key, value) in &self.header {
            request = request.header(key, value);
        }

        if let Some(user) = &self.user {
            request = match user.split_once(':') {
                Some((name, password)) => request.user_password(name, password),
                None => request.user(user.as_str()),
            };
        }

        if let Some(data) = &self.data {
            request = request.body(data.clone(), self.content_type.as_str());
        }

        if let Some(rate) = self.rate {
            debug!(rate, "token bucket limiting enabled");
            request = request.limit(Arc::new(TokenBucket::new(rate, 1)));
        } else if let Some(delay_ms) = self.host_delay {
            debug!(delay_ms, "per-host limiting enabled");
            request = request.limit(Arc::new(DomainLimiter::new(Duration::from_millis(delay_ms))));
        }

        if let Some(secs) = self.timeout {
            request = request.context(RequestContext::with_timeout(Duration::from_secs(secs)));
        }

        Ok(request)
    }
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY:VALUE, got {raw:?}"))
}

fn parse_rate(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(rate) if rate > 0.0 && rate.is_finite() => Ok(rate),
        Ok(_) => Err("rate must be a positive number".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
