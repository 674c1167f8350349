//! Restart bookkeeping and the bounded-retry decision.
//!
//! The decision is a pure function of the recorded attempts and the current
//! instant, so the cooldown and attempt-budget rules are testable without a
//! clock or a subprocess.

use std::time::{Duration, Instant};

/// Default number of consecutive failures tolerated before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default minimum time between consecutive restart attempts.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Tunables for the supervisor-level restart layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Consecutive failures allowed. The failure that reaches this count is
    /// not restarted, so with 3 the first two failures restart and the third
    /// moves the supervisor to `Failed`.
    pub max_attempts: u32,
    /// Minimum time between restart attempts.
    pub cooldown: Duration,
    /// Clear the attempt counter after this long without a restart.
    /// `None` disables the automatic reset.
    pub healthy_reset_after: Option<Duration>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cooldown: DEFAULT_COOLDOWN,
            healthy_reset_after: None,
        }
    }
}

/// Outcome of evaluating a failure signal against the restart budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Restart now.
    Restart,
    /// Still inside the cooldown window; re-evaluate later.
    Defer {
        /// Time left until the cooldown elapses.
        remaining: Duration,
    },
    /// Budget exhausted; no further automatic restarts.
    GiveUp,
}

/// Attempt counter and timestamp of the last attempt.
#[derive(Debug, Clone)]
pub struct RestartState {
    attempts: u32,
    last_attempt: Option<Instant>,
    policy: RestartPolicy,
}

impl RestartState {
    /// Fresh state with no attempts recorded.
    pub const fn new(policy: RestartPolicy) -> Self {
        Self {
            attempts: 0,
            last_attempt: None,
            policy,
        }
    }

    /// Failures counted against the budget since the last reset.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the most recent launch or restart attempt happened.
    pub const fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// The policy this state is evaluated against.
    pub const fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Whether one more failure would use up the budget.
    pub const fn budget_exhausted(&self) -> bool {
        self.attempts.saturating_add(1) >= self.policy.max_attempts
    }

    /// Evaluate a failure signal observed at `now`.
    ///
    /// The budget is checked before the cooldown: an exhausted budget gives up
    /// immediately instead of waiting out the window first.
    pub fn decide(&self, now: Instant) -> RestartDecision {
        if self.budget_exhausted() {
            return RestartDecision::GiveUp;
        }

        if let Some(last) = self.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.policy.cooldown {
                return RestartDecision::Defer {
                    remaining: self.policy.cooldown - elapsed,
                };
            }
        }

        RestartDecision::Restart
    }

    /// Record an automatic restart attempt.
    pub const fn record_attempt(&mut self, now: Instant) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }

    /// Record a launch that does not consume budget (initial or manual start).
    ///
    /// The cooldown window still starts from here.
    pub const fn record_launch(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Count the failure that gave up. The cooldown anchor is untouched.
    pub const fn record_give_up(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Zero the attempt counter. The cooldown anchor is kept.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Whether the stream has run long enough since the last attempt for the
    /// configured healthy-run reset to apply.
    pub fn healthy_run_elapsed(&self, now: Instant) -> bool {
        if self.attempts == 0 {
            return false;
        }
        match (self.policy.healthy_reset_after, self.last_attempt) {
            (Some(after), Some(last)) => now.saturating_duration_since(last) >= after,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_attempts: u32, cooldown_secs: u64) -> RestartState {
        RestartState::new(RestartPolicy {
            max_attempts,
            cooldown: Duration::from_secs(cooldown_secs),
            healthy_reset_after: None,
        })
    }

    #[test]
    fn test_first_failure_restarts_without_prior_attempt() {
        let restart = state(3, 10);
        assert_eq!(restart.decide(Instant::now()), RestartDecision::Restart);
    }

    #[test]
    fn test_cooldown_defers_then_allows() {
        let mut restart = state(3, 10);
        let t0 = Instant::now();
        restart.record_attempt(t0);

        match restart.decide(t0 + Duration::from_secs(2)) {
            RestartDecision::Defer { remaining } => assert_eq!(remaining, Duration::from_secs(8)),
            other => panic!("Expected Defer, got {other:?}"),
        }
        assert_eq!(
            restart.decide(t0 + Duration::from_secs(11)),
            RestartDecision::Restart
        );
    }

    #[test]
    fn test_third_consecutive_failure_gives_up() {
        let mut restart = state(3, 10);
        let mut now = Instant::now();
        for _ in 0..2 {
            assert_eq!(restart.decide(now), RestartDecision::Restart);
            restart.record_attempt(now);
            now += Duration::from_secs(11);
        }
        assert!(restart.budget_exhausted());
        assert_eq!(restart.decide(now), RestartDecision::GiveUp);

        restart.record_give_up();
        assert_eq!(restart.attempts(), 3);
        assert_eq!(restart.decide(now), RestartDecision::GiveUp);
    }

    #[test]
    fn test_exhausted_budget_gives_up_inside_cooldown() {
        let mut restart = state(2, 10);
        let t0 = Instant::now();
        restart.record_attempt(t0);
        assert_eq!(
            restart.decide(t0 + Duration::from_secs(1)),
            RestartDecision::GiveUp
        );
    }

    #[test]
    fn test_single_failure_budget_never_restarts() {
        let restart = state(1, 0);
        assert_eq!(restart.decide(Instant::now()), RestartDecision::GiveUp);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut restart = state(2, 0);
        let t0 = Instant::now();
        restart.record_attempt(t0);
        assert_eq!(restart.decide(t0), RestartDecision::GiveUp);

        restart.reset();
        assert_eq!(restart.attempts(), 0);
        assert_eq!(restart.decide(t0), RestartDecision::Restart);
    }

    #[test]
    fn test_zero_max_attempts_never_restarts() {
        let restart = state(0, 10);
        assert_eq!(restart.decide(Instant::now()), RestartDecision::GiveUp);
    }

    #[test]
    fn test_launch_anchors_cooldown_without_consuming_budget() {
        let mut restart = state(3, 10);
        let t0 = Instant::now();
        restart.record_launch(t0);
        assert_eq!(restart.attempts(), 0);
        assert!(matches!(
            restart.decide(t0 + Duration::from_secs(1)),
            RestartDecision::Defer { .. }
        ));
    }

    #[test]
    fn test_healthy_run_reset_is_opt_in() {
        let mut restart = state(3, 10);
        let t0 = Instant::now();
        restart.record_attempt(t0);
        assert!(!restart.healthy_run_elapsed(t0 + Duration::from_secs(3600)));

        let mut restart = RestartState::new(RestartPolicy {
            healthy_reset_after: Some(Duration::from_secs(60)),
            ..RestartPolicy::default()
        });
        restart.record_attempt(t0);
        assert!(!restart.healthy_run_elapsed(t0 + Duration::from_secs(59)));
        assert!(restart.healthy_run_elapsed(t0 + Duration::from_secs(60)));
    }
}
