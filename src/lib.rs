// Client-side request throttle: at most `limit` requests per rolling `period`,
// excess calls wait for the window instead of being rejected.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod recency_buffer;
pub mod throttle;
pub mod transport;

pub use clock::{Clock, TokioClock};
pub use config::ThrottleConfig;
pub use error::{ExecuteError, ThrottleError};
pub use models::{RestRequest, RestResponse, TypedResponse};
pub use recency_buffer::RecencyBuffer;
pub use throttle::{ThrottledClient, ThrottledRestClient, throttle_delay};
pub use transport::{RestTransport, Transport};
