use clap::{Parser, ValueEnum};
use log::LevelFilter;
use reqwest::Method;
use std::time::Duration;

use crate::error::ThrottleError;

// The three values every throttled client needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub endpoint: String,  // target requests are forwarded to
    pub period: Duration,  // rolling window length
    pub limit: usize,      // max requests admitted per window
}

impl ThrottleConfig {
    pub fn new(
        endpoint: impl Into<String>,
        period: Duration,
        limit: usize,
    ) -> Result<Self, ThrottleError> {
        let config = Self {
            endpoint: endpoint.into(),
            period,
            limit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ThrottleError> {
        if self.endpoint.trim().is_empty() {
            return Err(ThrottleError::invalid("endpoint", "must not be blank"));
        }
        if self.period.is_zero() {
            return Err(ThrottleError::invalid("period", "must be greater than zero"));
        }
        if self.limit == 0 {
            return Err(ThrottleError::invalid("limit", "must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "throttled-fetch")]
#[command(about = "Issue requests to an endpoint, at most LIMIT per PERIOD")]
pub struct Args {
    // Endpoint to send requests to
    // Example: "localhost:8080" or "https://api.example.com/v1"
    #[arg(short, long)]
    pub endpoint: String,

    // Rolling window length in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    pub period_ms: u64,

    // Max requests admitted per window
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    // Total requests to issue
    #[arg(short = 'n', long, default_value_t = 20)]
    pub requests: usize,

    // Concurrent callers sharing the throttle
    #[arg(short, long, default_value_t = 1)]
    pub concurrency: usize,

    // Resource relative to the endpoint
    #[arg(short, long, default_value = "/")]
    pub resource: String,

    // HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    // Default header sent with every request, NAME:VALUE (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    // Per-request transport timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    // Dump prometheus metrics when done
    #[arg(long)]
    pub print_metrics: bool,
}

impl Args {
    pub fn throttle_config(&self) -> Result<ThrottleConfig, ThrottleError> {
        ThrottleConfig::new(
            self.endpoint.clone(),
            Duration::from_millis(self.period_ms),
            self.limit,
        )
    }

    pub fn worker_count(&self) -> Result<usize, ThrottleError> {
        if self.concurrency == 0 {
            return Err(ThrottleError::invalid("concurrency", "must be greater than zero"));
        }
        Ok(self.concurrency)
    }

    pub fn http_method(&self) -> Result<Method, ThrottleError> {
        Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| ThrottleError::invalid("method", format!("{}: {e}", self.method)))
    }

    // "Authorization: Bearer x" -> ("Authorization", "Bearer x")
    pub fn parsed_headers(&self) -> Result<Vec<(String, String)>, ThrottleError> {
        self.headers
            .iter()
            .map(|raw| match raw.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok((name.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(ThrottleError::invalid(
                    "header",
                    format!("expected NAME:VALUE, got {raw:?}"),
                )),
            })
            .collect()
    }
}
