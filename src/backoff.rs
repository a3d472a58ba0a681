//! Adaptive back-off between lock retries.
//!
//! A thread that loses a race for a link rolls its partial acquisition back
//! and waits here before probing again. The wait starts as a handful of CPU
//! pause instructions and escalates to exponentially growing sleeps, so that
//! under sustained contention at least one contender eventually gets a long
//! enough quiet window to finish its whole operation. That de-synchronization
//! is the sole forward-progress mechanism of the locking protocol.
//!
//! The curve is deliberately simple: `SPIN_LIMIT` rounds of doubled pause
//! counts, then sleeps doubling from `SLEEP_BASE` up to `SLEEP_CAP`. Sleeps
//! are jittered into the top half of the current interval so two contenders
//! that collided do not wake in lockstep. The constants are public because
//! tests bound quiesce times with them.

use std::thread;
use std::time::Duration;

/// Rounds of pure spinning before the first sleep.
pub const SPIN_LIMIT: u32 = 6;

/// First sleep duration once spinning is exhausted.
pub const SLEEP_BASE: Duration = Duration::from_micros(1);

/// Ceiling for the sleep duration.
pub const SLEEP_CAP: Duration = Duration::from_millis(1);

/// Per-thread exponential back-off state.
///
/// One instance covers one public operation; retries within the operation
/// share it, so repeated conflicts keep escalating. A back-off step is only
/// ever taken with no BUSY field held.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    #[inline]
    pub const fn new() -> Self {
        Backoff { step: 0 }
    }

    /// Wait before the next probe, escalating the delay.
    ///
    /// The first `SPIN_LIMIT` calls execute `2^step` pause instructions.
    /// After that each call sleeps, doubling from `SLEEP_BASE` and
    /// saturating at `SLEEP_CAP`.
    pub fn snooze(&mut self) {
        if self.step < SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                std::hint::spin_loop();
            }
        } else {
            let exp = (self.step - SPIN_LIMIT).min(10);
            let mut dur = SLEEP_BASE.saturating_mul(1u32 << exp);
            if dur > SLEEP_CAP {
                dur = SLEEP_CAP;
            }
            // Jitter into [dur/2, dur] so colliding threads drift apart.
            let nanos = dur.as_nanos() as u64;
            let jittered = nanos / 2 + fastrand::u64(..=nanos / 2);
            thread::sleep(Duration::from_nanos(jittered));
        }
        self.step = self.step.saturating_add(1);
    }

    /// True once the back-off has escalated past pure spinning.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.step >= SPIN_LIMIT
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn escalates_to_sleeping() {
        let mut b = Backoff::new();
        for _ in 0..SPIN_LIMIT {
            assert!(!b.is_sleeping());
            b.snooze();
        }
        assert!(b.is_sleeping());
    }

    #[test]
    fn sleep_stays_under_cap() {
        let mut b = Backoff::new();
        // Escalate far past the cap threshold.
        for _ in 0..40 {
            b.snooze();
        }
        let start = Instant::now();
        b.snooze();
        // A capped jittered sleep plus scheduler slack stays well under
        // an order of magnitude above SLEEP_CAP.
        assert!(start.elapsed() < SLEEP_CAP * 20);
    }
}
