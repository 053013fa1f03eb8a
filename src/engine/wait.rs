//! Bounded waiting primitives.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Repeatedly run `probe` until it yields a value or `timeout` elapses.
///
/// The probe always runs at least once, and once more at the deadline, so a
/// zero timeout degenerates to a single check.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Fixed delay after an interaction whose effect cannot be observed.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
