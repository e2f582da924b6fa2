// Fixed-count sliding window throttle: once `limit` requests are on record, a new
// one may only go out `period` after the oldest of them.

use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::clock::{Clock, TokioClock};
use crate::config::ThrottleConfig;
use crate::error::{ExecuteError, ThrottleError};
use crate::metrics::{THROTTLE_DELAY, THROTTLE_DELAYED, THROTTLE_REQUESTS, TRANSPORT_ERRORS};
use crate::models::{RestRequest, RestResponse, TypedResponse};
use crate::recency_buffer::RecencyBuffer;
use crate::transport::{RestTransport, Transport};

// Remaining wait before `period` has passed since `oldest`; None once it has
pub fn throttle_delay(oldest: Instant, now: Instant, period: Duration) -> Option<Duration> {
    let elapsed = now.saturating_duration_since(oldest);
    if elapsed < period {
        Some(period - elapsed)
    } else {
        None
    }
}

// At most `limit` requests per `period` through `transport`.
// Shareable between tasks; the history lock is never held while sleeping.
pub struct ThrottledClient<T: Transport, C: Clock = TokioClock> {
    endpoint: String,
    period: Duration,
    limit: usize,
    buffer: Mutex<RecencyBuffer<Instant>>,
    transport: Arc<T>,
    clock: C,
}

pub type ThrottledRestClient = ThrottledClient<RestTransport>;

impl<T: Transport> ThrottledClient<T, TokioClock> {
    pub fn with_transport(transport: Arc<T>, config: ThrottleConfig) -> Result<Self, ThrottleError> {
        Self::with_clock(transport, config, TokioClock)
    }
}

impl<T: Transport, C: Clock> ThrottledClient<T, C> {
    pub fn with_clock(
        transport: Arc<T>,
        config: ThrottleConfig,
        clock: C,
    ) -> Result<Self, ThrottleError> {
        config.validate()?;
        let ThrottleConfig {
            endpoint,
            period,
            limit,
        } = config;

        Ok(Self {
            endpoint,
            period,
            limit,
            buffer: Mutex::new(RecencyBuffer::new(limit)?),
            transport,
            clock,
        })
    }

    // Issues `request` through the transport, first waiting as long as the
    // window requires. Dropping the future while it waits records nothing and
    // never reaches the transport.
    pub async fn execute(&self, request: T::Request) -> Result<T::Response, ExecuteError<T::Error>> {
        self.transport.validate(&request)?;

        let waited = self.acquire_slot().await?;
        if waited.is_zero() {
            trace!("Request to {} admitted without delay", self.endpoint);
        } else {
            THROTTLE_DELAYED.inc();
            THROTTLE_DELAY.observe(waited.as_secs_f64());
        }
        THROTTLE_REQUESTS.inc();

        self.transport.issue(request).await.map_err(|e| {
            TRANSPORT_ERRORS.inc();
            warn!("Request to {} failed: {}", self.endpoint, e);
            ExecuteError::Transport(e)
        })
    }

    // Waits until the window has room, then records the issue time.
    // After a wait the window is only looked at again when the clock moved and
    // another caller has taken the slot this one slept for; otherwise the call
    // goes out. Every extra wait is paid for by someone else's record, so a
    // clock that stands still cannot keep a caller waiting forever.
    async fn acquire_slot(&self) -> Result<Duration, ThrottleError> {
        let mut waited = Duration::ZERO;
        let mut slept_on: Option<(Instant, Instant)> = None;
        loop {
            let delay = {
                let mut buffer = self.buffer.lock().await;
                let now = self.clock.now();
                let delay = match slept_on {
                    None => self.pending_delay(&buffer, now)?,
                    Some((oldest, before)) => {
                        let slot_taken = buffer.oldest().ok() != Some(&oldest);
                        if now > before && slot_taken {
                            self.pending_delay(&buffer, now)?
                        } else {
                            None
                        }
                    }
                };

                match delay {
                    // Taken after the wait: the actual issue time is what the next window sees
                    None => {
                        buffer.record(now);
                        return Ok(waited);
                    }
                    Some(delay) => {
                        slept_on = Some((*buffer.oldest()?, now));
                        delay
                    }
                }
            };

            debug!(
                "Throttling request to {}: waiting {:?} ({} per {:?})",
                self.endpoint, delay, self.limit, self.period
            );
            self.clock.sleep(delay).await;
            waited += delay;
        }
    }

    fn pending_delay(
        &self,
        buffer: &RecencyBuffer<Instant>,
        now: Instant,
    ) -> Result<Option<Duration>, ThrottleError> {
        if !buffer.is_full() {
            return Ok(None);
        }
        let oldest = *buffer.oldest()?;
        Ok(throttle_delay(oldest, now, self.period))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    // Timestamps currently held, never more than `limit`
    pub async fn recorded(&self) -> usize {
        self.buffer.lock().await.len()
    }
}

impl ThrottledClient<RestTransport, TokioClock> {
    pub fn new(endpoint: &str, period: Duration, limit: usize) -> Result<Self, ThrottleError> {
        let config = ThrottleConfig::new(endpoint, period, limit)?;
        let transport = RestTransport::new(&config.endpoint)?;
        Self::with_transport(Arc::new(transport), config)
    }

    pub fn add_default_header(&self, name: &str, value: &str) -> Result<(), ThrottleError> {
        self.transport.add_default_header(name, value)
    }

    // execute, then decode the body as JSON
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        request: RestRequest,
    ) -> Result<TypedResponse<R>, ExecuteError<reqwest::Error>> {
        let RestResponse {
            status,
            headers,
            body,
        } = self.execute(request).await?;
        let data = serde_json::from_str(&body).map_err(ExecuteError::Decode)?;
        Ok(TypedResponse {
            status,
            headers,
            data,
        })
    }
}
