//! Debounce timer — holds the latest pending value and decides when the
//! quiet period after the last request has elapsed.
//!
//! Time is passed in as milliseconds so the timer itself stays pure; the
//! layout manager drives it from a tokio task.


/// Coalesces bursts of requests into one value that becomes due
/// `window_ms` after the most recent request.
#[derive(Debug)]
pub struct DebounceTimer<T> {
    window_ms: u64,
    pending: Option<T>,
    last_request_ms: u64,
}


impl<T> DebounceTimer<T> {
    /// Create a new timer with the given quiet window in milliseconds.
    pub fn new(window_ms: u64) -> Self {
        DebounceTimer {
            window_ms,
            pending: None,
            last_request_ms: 0,
        }
    }

    /// Replace the pending value and restart the window.
    pub fn request(&mut self, value: T, now_ms: u64) {
        self.pending = Some(value);
        self.last_request_ms = now_ms;
    }

    /// Whether a value is pending and its window has elapsed.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.pending.is_some() && now_ms.saturating_sub(self.last_request_ms) >= self.window_ms
    }

    /// Milliseconds until the pending value is due, or `None` if nothing is pending.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.pending.as_ref()?;
        let elapsed = now_ms.saturating_sub(self.last_request_ms);
        Some(self.window_ms.saturating_sub(elapsed))
    }

    /// Take the pending value if it is due.
    pub fn take_due(&mut self, now_ms: u64) -> Option<T> {
        if self.is_due(now_ms) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Take the pending value regardless of the window.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Return the configured window.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_pending_is_never_due() {
        let timer: DebounceTimer<u32> = DebounceTimer::new(800);
        assert!(!timer.is_due(10_000));
        assert_eq!(timer.remaining_ms(10_000), None);
    }

    #[test]
    fn request_is_not_due_inside_window() {
        let mut timer = DebounceTimer::new(800);
        timer.request(1, 10_000);
        assert!(!timer.is_due(10_500));
        assert_eq!(timer.remaining_ms(10_500), Some(300));
        assert_eq!(timer.take_due(10_500), None);
    }

    #[test]
    fn exact_window_boundary_is_due() {
        let mut timer = DebounceTimer::new(800);
        timer.request(1, 10_000);
        assert!(timer.is_due(10_800));
        assert_eq!(timer.remaining_ms(10_800), Some(0));
    }

    #[test]
    fn burst_keeps_latest_value_and_restarts_window() {
        let mut timer = DebounceTimer::new(800);
        timer.request(1, 10_000);
        timer.request(2, 10_400);
        timer.request(3, 10_700);
        // 900ms after the first request but only 200ms after the last
        assert_eq!(timer.take_due(10_900), None);
        assert_eq!(timer.take_due(11_500), Some(3));
        assert!(!timer.has_pending());
    }

    #[test]
    fn take_ignores_window() {
        let mut timer = DebounceTimer::new(800);
        timer.request("layout", 10_000);
        assert_eq!(timer.take(), Some("layout"));
        assert_eq!(timer.take(), None);
    }

    #[test]
    fn window_accessor() {
        let timer: DebounceTimer<()> = DebounceTimer::new(250);
        assert_eq!(timer.window_ms(), 250);
    }
}
