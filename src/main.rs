use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser; // for cli
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use throttled_rest_client::config::Args;
use throttled_rest_client::logging::init_logger;
use throttled_rest_client::metrics::render_metrics;
use throttled_rest_client::{RestRequest, RestTransport, ThrottledRestClient};

// One line of output per request
#[derive(Serialize)]
struct RequestReport {
    index: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_logger(args.log_level.into(), args.log_format).context("Failed to initialize logger")?;

    let config = args.throttle_config().context("Invalid throttle configuration")?;
    let method = args.http_method().context("Invalid HTTP method")?;
    let workers_wanted = args.worker_count().context("Invalid --concurrency")?;

    let mut transport = RestTransport::new(&config.endpoint).context("Invalid endpoint")?;
    if let Some(secs) = args.timeout_secs {
        transport = transport.with_timeout(Duration::from_secs(secs));
    }
    for (name, value) in args.parsed_headers().context("Invalid --header")? {
        transport
            .add_default_header(&name, &value)
            .with_context(|| format!("Invalid header {name}"))?;
    }

    log::info!("Forwarding to {}", transport.base_url());
    log::info!(
        "Throttle: {} requests per {:?}, {} requests over {} workers",
        config.limit,
        config.period,
        args.requests,
        workers_wanted
    );

    let client = Arc::new(
        ThrottledRestClient::with_transport(Arc::new(transport), config)
            .context("Failed to build throttled client")?,
    );
    let next = Arc::new(AtomicUsize::new(0));
    let run_start = Instant::now();

    let mut workers = JoinSet::new();
    for _ in 0..workers_wanted {
        let client = Arc::clone(&client);
        let next = Arc::clone(&next);
        let method = method.clone();
        let resource = args.resource.clone();
        let total = args.requests;

        workers.spawn(async move {
            let mut reports = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= total {
                    break;
                }
                let started_at = Utc::now();
                let start = Instant::now();
                let result = client
                    .execute(RestRequest::new(method.clone(), resource.clone()))
                    .await;
                let (status, error) = match result {
                    Ok(res) => (Some(res.status.as_u16()), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                let report = RequestReport {
                    index,
                    started_at,
                    finished_at: Utc::now(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    status,
                    error,
                };
                if let Ok(line) = serde_json::to_string(&report) {
                    println!("{}", line);
                }
                reports.push(report);
            }
            reports
        });
    }

    let mut failed = 0;
    while let Some(joined) = workers.join_next().await {
        let reports = joined.context("Worker task panicked")?;
        failed += reports.iter().filter(|r| r.error.is_some()).count();
    }

    log::info!(
        "Issued {} requests in {:.2}s ({} failed)",
        args.requests,
        run_start.elapsed().as_secs_f64(),
        failed
    );

    if args.print_metrics {
        let text = render_metrics().map_err(|e| anyhow::anyhow!("Failed to render metrics: {e}"))?;
        print!("{}", text);
    }

    Ok(())
}
