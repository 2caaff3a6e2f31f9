//! Trailing-edge debounce over a tokio clock.

use std::time::Duration;

use tokio::time::Instant;

/// Holds the latest pushed value until `delay` has passed without a newer one.
///
/// Time is passed in explicitly so the state machine is deterministic; the
/// async [`Debouncer::settled`] helper sleeps on the tokio clock, which tests
/// can pause and advance.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending value and restarts the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Drops the timer, handing back the value that was waiting.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the pending value if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Waits for the current deadline and takes the value.
    ///
    /// Returns `None` immediately when nothing is pending.
    pub async fn settled(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.take_due(Instant::now())
    }
}
