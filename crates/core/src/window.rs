//! Measurement-window aggregation for the receive path

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::time::{Duration, Instant};

/// Count of validated datagrams in the current window.
///
/// `record` runs on the inbound delivery path and must never stall the
/// link, so it is a single atomic add: no locks, no allocation.
#[derive(Debug, Default)]
pub struct WindowAccumulator {
    count: AtomicU32,
}

impl WindowAccumulator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Atomically drain the count. Increments racing the swap land in the
    /// window being closed, never lost and never double-counted.
    fn take(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }
}

/// Single consumer of a [`WindowAccumulator`], anchored to the last time a
/// window closed.
#[derive(Debug)]
pub struct MeasurementWindow {
    acc: Arc<WindowAccumulator>,
    duration: Duration,
    last_trigger: Instant,
}

impl MeasurementWindow {
    pub fn new(acc: Arc<WindowAccumulator>, duration: Duration) -> Self {
        Self {
            acc,
            duration,
            last_trigger: Instant::now(),
        }
    }

    /// Close the window if it is due and non-empty, yielding its count.
    ///
    /// A zero-count window is left open rather than reported: a fully
    /// silent link produces no feedback at all.
    pub fn poll(&mut self) -> Option<u32> {
        if self.last_trigger.elapsed() <= self.duration {
            return None;
        }
        if self.acc.peek() == 0 {
            return None;
        }
        let count = self.acc.take();
        self.last_trigger = Instant::now();
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_window_not_due_yields_nothing() {
        let acc = WindowAccumulator::new();
        let mut window = MeasurementWindow::new(acc.clone(), Duration::from_secs(1));

        acc.record();
        advance(Duration::from_millis(500)).await;
        assert_eq!(window.poll(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_close_drains_and_resets() {
        let acc = WindowAccumulator::new();
        let mut window = MeasurementWindow::new(acc.clone(), Duration::from_secs(1));

        for _ in 0..37 {
            acc.record();
        }
        advance(Duration::from_millis(1001)).await;
        assert_eq!(window.poll(), Some(37));
        assert_eq!(acc.peek(), 0);

        // anchor was reset, the next window is not due yet
        assert_eq!(window.poll(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_windows_extend() {
        let acc = WindowAccumulator::new();
        let mut window = MeasurementWindow::new(acc.clone(), Duration::from_secs(1));

        for _ in 0..3 {
            advance(Duration::from_millis(1001)).await;
            assert_eq!(window.poll(), None);
        }

        // a single arrival after the silence still closes the window
        acc.record();
        assert_eq!(window.poll(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_after_close_counts_toward_next_window() {
        let acc = WindowAccumulator::new();
        let mut window = MeasurementWindow::new(acc.clone(), Duration::from_secs(1));

        acc.record();
        advance(Duration::from_millis(1001)).await;
        assert_eq!(window.poll(), Some(1));

        acc.record();
        assert_eq!(acc.peek(), 1);
        advance(Duration::from_millis(1001)).await;
        assert_eq!(window.poll(), Some(1));
    }
}
