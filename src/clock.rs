use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// Time source for the throttle: reads "now" and performs the wait.
// Timestamps are tokio Instants so delay arithmetic is monotonic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    // Non-blocking wait; a manual clock can advance itself here instead
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

// Reads tokio's clock, so tokio::time::pause/advance drive it in tests
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// Lets several controllers (or a test and a controller) share one clock
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        (**self).sleep(duration)
    }
}
