//! Login Attempt Throttling
//!
//! Limits how often a login form may contact the credential provider,
//! independent of whether the submitted credentials are correct.
//!
//! # Rules
//!
//! Evaluated in order on every attempt:
//!
//! 1. Inside an active block → [`ThrottleError::Blocked`]
//! 2. Less than `cooldown` since the last *recorded* attempt → [`ThrottleError::Cooldown`]
//!    (the rejected attempt is not recorded)
//! 3. `max_attempts` already recorded → start a block, reset the counter,
//!    [`ThrottleError::Blocked`]
//! 4. Otherwise the attempt is recorded and allowed through
//!
//! A successful login resets the counter and clears any block.
//!
//! # Scope
//!
//! State is kept per login form context (one per [`crate::DashboardGate`]),
//! not per account, because the account is unknown until login succeeds.
//! It lives in memory only and starts fresh with every new gate.
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::throttle::{LoginThrottler, ThrottlePolicy};
//! use std::time::Instant;
//!
//! let mut throttler = LoginThrottler::new(ThrottlePolicy::default()); // 30s / 5 / 15 min
//!
//! throttler.check_and_record_attempt(Instant::now())?;
//! // ... verify credentials ...
//! throttler.record_success();
//! ```

use std::time::{Duration, Instant};

use crate::error::ThrottleError;
use crate::observability::SecurityEvent;

// ============================================================================
// Throttle Policy
// ============================================================================

/// Throttle policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Minimum spacing between two recorded attempts
    pub cooldown: Duration,

    /// Attempts recorded before the next one starts a block
    pub max_attempts: u32,

    /// Length of a block
    pub block_duration: Duration,
}

impl Default for ThrottlePolicy {
    /// - 30 second cooldown between attempts
    /// - 5 attempts before blocking
    /// - 15 minute block
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(30),
            max_attempts: 5,
            block_duration: Duration::from_secs(15 * 60),
        }
    }
}

impl ThrottlePolicy {
    pub fn builder() -> ThrottlePolicyBuilder {
        ThrottlePolicyBuilder::default()
    }

    /// Policy for high-risk deployments
    pub fn strict() -> Self {
        Self {
            cooldown: Duration::from_secs(60),
            max_attempts: 3,
            block_duration: Duration::from_secs(30 * 60),
        }
    }
}

/// Builder for ThrottlePolicy
#[derive(Debug, Clone, Default)]
pub struct ThrottlePolicyBuilder {
    policy: ThrottlePolicy,
}

impl ThrottlePolicyBuilder {
    pub fn cooldown(mut self, duration: Duration) -> Self {
        self.policy.cooldown = duration;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    pub fn block_duration(mut self, duration: Duration) -> Self {
        self.policy.block_duration = duration;
        self
    }

    pub fn build(self) -> ThrottlePolicy {
        self.policy
    }
}

// ============================================================================
// Throttle State
// ============================================================================

/// Counters for one login form context.
///
/// `Copy`, so callers can take snapshots without borrowing the throttler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    /// Attempts recorded since the last reset
    pub attempt_count: u32,
    /// When the first of the currently counted attempts happened
    pub window_started_at: Option<Instant>,
    /// When the last attempt was let through
    pub last_attempt_at: Option<Instant>,
    /// End of the current block, if any
    pub blocked_until: Option<Instant>,
}

impl ThrottleState {
    /// Whether a block is active at `now`
    pub fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    /// Remaining block time at `now`
    pub fn remaining_block(&self, now: Instant) -> Option<Duration> {
        self.blocked_until
            .filter(|&until| now < until)
            .map(|until| until - now)
    }
}

/// Whole seconds, rounded up, so a countdown never reads "0 seconds" early
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

// ============================================================================
// Login Throttler
// ============================================================================

/// Login attempt throttler for a single form context
#[derive(Debug, Clone)]
pub struct LoginThrottler {
    policy: ThrottlePolicy,
    state: ThrottleState,
}

impl Default for LoginThrottler {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}

impl LoginThrottler {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            state: ThrottleState::default(),
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Current counters
    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// Gate an attempt made at `now`, recording it when allowed
    pub fn check_and_record_attempt(&mut self, now: Instant) -> Result<(), ThrottleError> {
        if let Some(remaining) = self.state.remaining_block(now) {
            let err = ThrottleError::Blocked {
                retry_after_secs: ceil_secs(remaining),
            };
            log_attempt_rejected(&err);
            return Err(err);
        }

        if let Some(last) = self.state.last_attempt_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.policy.cooldown {
                let err = ThrottleError::Cooldown {
                    retry_after_secs: ceil_secs(self.policy.cooldown - elapsed),
                };
                log_attempt_rejected(&err);
                return Err(err);
            }
        }

        if self.state.attempt_count >= self.policy.max_attempts {
            let attempts = self.state.attempt_count;
            self.start_block(now);
            log_form_blocked(attempts, self.policy.block_duration);
            return Err(ThrottleError::Blocked {
                retry_after_secs: ceil_secs(self.policy.block_duration),
            });
        }

        if self.state.attempt_count == 0 {
            self.state.window_started_at = Some(now);
        }
        self.state.last_attempt_at = Some(now);
        self.state.attempt_count += 1;
        Ok(())
    }

    /// Start a full block immediately.
    ///
    /// Used when the credential provider itself reports that this client is
    /// sending too many requests.
    pub fn block(&mut self, now: Instant) {
        let attempts = self.state.attempt_count;
        self.start_block(now);
        log_form_blocked(attempts, self.policy.block_duration);
    }

    /// Reset counters after a successful login
    pub fn record_success(&mut self) {
        self.state.attempt_count = 0;
        self.state.window_started_at = None;
        self.state.blocked_until = None;
    }

    fn start_block(&mut self, now: Instant) {
        self.state.blocked_until = Some(now + self.policy.block_duration);
        self.state.attempt_count = 0;
        self.state.window_started_at = None;
    }
}

// ============================================================================
// Security Event Logging
// ============================================================================

fn log_attempt_rejected(err: &ThrottleError) {
    crate::security_event!(
        SecurityEvent::RateLimitExceeded,
        retry_after_secs = err.retry_after_secs(),
        reason = %err,
        "Login attempt throttled"
    );
}

fn log_form_blocked(attempt_count: u32, duration: Duration) {
    crate::security_event!(
        SecurityEvent::LoginBlocked,
        attempt_count = attempt_count,
        block_duration_secs = duration.as_secs(),
        "Login form blocked after repeated attempts"
    );
}
