//! Timeout controller for resolution sessions.
//!
//! A [`Deadline`] is armed when a session starts and resolves once its duration
//! has elapsed. It is owned by the session's future: dropping the future (on
//! success, on timeout, or when the session is superseded) disarms it, so no
//! timer outlives its session.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

type Timer = Pin<Box<dyn Future<Output = ()>>>;

/// An armed, single-shot deadline.
pub struct Deadline {
    duration: Duration,
    timer: Timer,
}

impl Deadline {
    /// Start counting `duration` from now.
    pub fn arm(duration: Duration) -> Self {
        Self {
            duration,
            timer: timer(duration),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Future for Deadline {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.timer.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("duration", &self.duration)
            .finish()
    }
}

#[cfg(target_arch = "wasm32")]
fn timer(duration: Duration) -> Timer {
    // setTimeout takes a u32 of milliseconds.
    let duration = duration.min(Duration::from_millis(crate::config::MAX_TIMEOUT_MS));
    Box::pin(gloo_timers::future::sleep(duration))
}

#[cfg(not(target_arch = "wasm32"))]
fn timer(duration: Duration) -> Timer {
    Box::pin(tokio::time::sleep(duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses_after_duration() {
        let start = tokio::time::Instant::now();
        Deadline::arm(Duration::from_millis(3000)).await;
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_pending_before_duration() {
        let mut deadline = Deadline::arm(Duration::from_millis(500));
        assert!((&mut deadline).now_or_never().is_none());

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!((&mut deadline).now_or_never().is_none());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!((&mut deadline).now_or_never().is_some());
        assert_eq!(deadline.duration(), Duration::from_millis(500));
    }
}
