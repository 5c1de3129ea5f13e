// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_LOADING_TIMEOUT: Duration = Duration::from_secs(8);

/// Coalesces bursts of values: every `push` restarts the quiet period and
/// replaces the buffered value, and `poll` yields only the latest value once
/// the quiet period has elapsed. Intermediate values are dropped.
///
/// Time is supplied by the caller so the same type serves a UI loop polling
/// `Instant::now()` and tests stepping a fixed origin.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    token: u64,
}

impl<T> Debouncer<T> {
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            token: 0,
        }
    }

    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.token = self.token.saturating_add(1);
        self.pending = Some((value, now + self.quiet));
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of pushes seen so far; each push supersedes earlier ones.
    pub const fn token(&self) -> u64 {
        self.token
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn burst_collapses_to_last_value_after_quiet_period() {
        let origin = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));

        for (at, value) in [(0, "a"), (50, "b"), (100, "c"), (300, "d")] {
            debouncer.push(value, origin + ms(at));
            assert_eq!(debouncer.poll(origin + ms(at)), None);
        }

        assert_eq!(debouncer.deadline(), Some(origin + ms(600)));
        assert_eq!(debouncer.poll(origin + ms(599)), None);
        assert_eq!(debouncer.poll(origin + ms(600)), Some("d"));
        assert_eq!(debouncer.poll(origin + ms(2_000)), None);
        assert_eq!(debouncer.token(), 4);
    }

    #[test]
    fn cancel_drops_the_buffered_value() {
        let origin = Instant::now();
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.push(1, origin);
        assert!(debouncer.is_pending());

        assert_eq!(debouncer.cancel(), Some(1));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(origin + ms(500)), None);
    }
}
