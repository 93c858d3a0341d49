// ── Timer primitives ──
//
// Deadline-polled timers for the gesture and output engines. The client
// run loop sleeps until the earliest pending deadline and then polls the
// owning engine, so every timer has exactly one live handle per owner and
// no spawned tasks. `arm` on an already-armed timer is an error; `cancel`
// is idempotent and invoked on every exit path.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::CoreError;

/// A single-shot timer with at most one pending deadline.
#[derive(Debug, Default)]
pub struct OneShot {
    deadline: Option<Instant>,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer to fire `after` from `now`.
    ///
    /// Fails if already armed: a timer handle must never be restarted
    /// without an explicit cancel.
    pub fn arm(&mut self, now: Instant, after: Duration) -> Result<(), CoreError> {
        if self.deadline.is_some() {
            return Err(CoreError::Internal(
                "timer already armed -- cancel before re-arming".into(),
            ));
        }
        self.deadline = Some(now + after);
        Ok(())
    }

    /// Disarm. Safe to call whether or not the timer is armed.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it is due at `now`. Returns `true` at most
    /// once per arming.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A repeating ticker with a fixed period.
///
/// Each due poll advances the next deadline by one period, so a stalled
/// poller fires once per poll rather than bursting to catch up.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Start ticking; the first fire is one period from `now`.
    pub fn start(&mut self, now: Instant) -> Result<(), CoreError> {
        if self.next.is_some() {
            return Err(CoreError::Internal(
                "ticker already running -- cancel before restarting".into(),
            ));
        }
        self.next = Some(now + self.period);
        Ok(())
    }

    /// Stop ticking. Idempotent.
    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Consume one due tick, rescheduling the next one.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if next <= now => {
                self.next = Some(next + self.period);
                true
            }
            _ => false,
        }
    }
}

/// The earliest of any number of optional deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn one_shot_arm_twice_fails() {
        let now = Instant::now();
        let mut timer = OneShot::new();

        timer.arm(now, 100 * MS).unwrap();
        assert!(timer.arm(now, 100 * MS).is_err());

        timer.cancel();
        timer.arm(now, 100 * MS).unwrap();
    }

    #[test]
    fn one_shot_cancel_is_idempotent() {
        let mut timer = OneShot::new();
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_armed());
    }

    #[test]
    fn one_shot_fires_exactly_once() {
        let now = Instant::now();
        let mut timer = OneShot::new();
        timer.arm(now, 100 * MS).unwrap();

        assert!(!timer.fire_if_due(now + 99 * MS));
        assert!(timer.fire_if_due(now + 100 * MS));
        assert!(!timer.fire_if_due(now + 200 * MS));
        assert!(!timer.is_armed());
    }

    #[test]
    fn cancelled_one_shot_never_fires() {
        let now = Instant::now();
        let mut timer = OneShot::new();
        timer.arm(now, 50 * MS).unwrap();
        timer.cancel();
        assert!(!timer.fire_if_due(now + 100 * MS));
    }

    #[test]
    fn ticker_fires_every_period() {
        let now = Instant::now();
        let mut ticker = Ticker::new(100 * MS);
        ticker.start(now).unwrap();

        assert!(!ticker.fire_if_due(now + 50 * MS));
        assert!(ticker.fire_if_due(now + 100 * MS));
        assert!(!ticker.fire_if_due(now + 150 * MS));
        assert!(ticker.fire_if_due(now + 200 * MS));
        assert_eq!(ticker.deadline(), Some(now + 300 * MS));
    }

    #[test]
    fn ticker_restart_requires_cancel() {
        let now = Instant::now();
        let mut ticker = Ticker::new(100 * MS);
        ticker.start(now).unwrap();
        assert!(ticker.start(now).is_err());
        ticker.cancel();
        ticker.start(now).unwrap();
    }

    #[test]
    fn earliest_deadline_selection() {
        let now = Instant::now();
        assert_eq!(earliest([None, None]), None);
        assert_eq!(
            earliest([Some(now + 200 * MS), None, Some(now + 100 * MS)]),
            Some(now + 100 * MS)
        );
    }
}
