//! Poll Budget Module
//!
//! Bounds the status-polling loop of a query execution.
//!
//! ## Design
//!
//! Uses a combination of:
//! - Attempt counter and wall-clock deadline from a [`PollPolicy`]
//! - Atomic flag for cooperative cancellation by the caller
//!
//! The clock is tokio's, so paused-time tests drive it deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Limits applied to one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two status polls
    pub interval: Duration,
    /// Maximum number of status polls (None = unbounded)
    pub max_attempts: Option<u32>,
    /// Maximum time spent polling (None = unbounded)
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// Poll forever on the given interval
    pub fn unbounded(interval: Duration) -> Self {
        PollPolicy {
            interval,
            max_attempts: None,
            deadline: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(2),
            max_attempts: Some(150),
            deadline: Some(Duration::from_secs(300)),
        }
    }
}

/// Why a polling loop has to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    /// The attempt count or the deadline ran out
    Exhausted { attempts: u32, elapsed: Duration },
    /// The caller cancelled through a [`CancelHandle`]
    Cancelled,
}

/// Running budget of one polling loop
#[derive(Debug)]
pub struct PollBudget {
    policy: PollPolicy,
    started: Instant,
    attempts: u32,
    cancel: CancelHandle,
}

impl PollBudget {
    pub fn new(policy: PollPolicy, cancel: CancelHandle) -> Self {
        PollBudget {
            policy,
            started: Instant::now(),
            attempts: 0,
            cancel,
        }
    }

    /// Reserve one more poll.
    ///
    /// Called before every status request; fails once the policy or the
    /// caller says the loop is over.
    pub fn begin_attempt(&mut self) -> Result<(), BudgetExceeded> {
        if self.cancel.is_cancelled() {
            return Err(BudgetExceeded::Cancelled);
        }

        let elapsed = self.started.elapsed();
        let out_of_attempts = self
            .policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max);
        let past_deadline = self.policy.deadline.is_some_and(|d| elapsed >= d);
        if out_of_attempts || past_deadline {
            return Err(BudgetExceeded::Exhausted {
                attempts: self.attempts,
                elapsed,
            });
        }

        self.attempts += 1;
        Ok(())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn interval(&self) -> Duration {
        self.policy.interval
    }
}

/// Handle for cancelling a running query from another task
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    /// Cancel the associated query
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: Option<u32>, deadline: Option<Duration>) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(2),
            max_attempts,
            deadline,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_budget_never_exhausts() {
        let mut budget = PollBudget::new(
            PollPolicy::unbounded(Duration::from_secs(2)),
            CancelHandle::new(),
        );
        for _ in 0..1_000 {
            assert!(budget.begin_attempt().is_ok());
        }
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(budget.begin_attempt().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_limit() {
        let mut budget = PollBudget::new(policy(Some(3), None), CancelHandle::new());
        assert!(budget.begin_attempt().is_ok());
        assert!(budget.begin_attempt().is_ok());
        assert!(budget.begin_attempt().is_ok());
        assert!(matches!(
            budget.begin_attempt(),
            Err(BudgetExceeded::Exhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let mut budget = PollBudget::new(
            policy(None, Some(Duration::from_secs(10))),
            CancelHandle::new(),
        );
        assert!(budget.begin_attempt().is_ok());
        tokio::time::advance(Duration::from_secs(11)).await;
        match budget.begin_attempt() {
            Err(BudgetExceeded::Exhausted { elapsed, .. }) => {
                assert!(elapsed >= Duration::from_secs(10));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wins_over_remaining_budget() {
        let cancel = CancelHandle::new();
        let mut budget = PollBudget::new(policy(Some(100), None), cancel.clone());
        assert!(budget.begin_attempt().is_ok());
        cancel.cancel();
        assert_eq!(budget.begin_attempt(), Err(BudgetExceeded::Cancelled));
        assert_eq!(budget.attempts(), 1);
    }

    #[test]
    fn test_cancel_handle_clone_shares_state() {
        let handle1 = CancelHandle::new();
        let handle2 = handle1.clone();
        assert!(!handle2.is_cancelled());
        handle1.cancel();
        assert!(handle2.is_cancelled());
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_attempts, Some(150));
    }
}
