use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, TextEncoder, register_counter, register_histogram};


lazy_static! {
    pub static ref THROTTLE_REQUESTS: Counter =
        register_counter!("throttle_requests_total", "Total number of requests admitted by the throttle")
            .expect("register throttle_requests_total");
    pub static ref THROTTLE_DELAYED: Counter =
        register_counter!("throttle_delayed_requests_total", "Requests that had to wait for the window")
            .expect("register throttle_delayed_requests_total");
    pub static ref THROTTLE_DELAY: Histogram = register_histogram!(
        "throttle_delay_seconds",
        "Time spent waiting for the window before issuing a request",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("register throttle_delay_seconds");
    pub static ref TRANSPORT_ERRORS: Counter =
        register_counter!("throttle_transport_errors_total", "Requests the transport failed to complete")
            .expect("register throttle_transport_errors_total");
}

// Text exposition of everything in the default registry
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
