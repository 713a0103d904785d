//! Test Support
//!
//! Deterministic time, failing providers and fixtures for exercising the gate
//! without a real identity provider.
//!
//! # What This Module Provides
//!
//! - [`ManualClock`]: a [`Clock`] that only moves when told to
//! - [`FaultyCredentialStore`]: a provider that fails every call
//! - [`seeded_directory`]: one account per role with a shared password
//! - Input lists for signup validation tests
//! - [`check_user_enumeration`]: compares two login failure responses
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::testing::{seeded_directory, ManualClock, SEED_PASSWORD};
//!
//! let clock = ManualClock::new();
//! let directory = seeded_directory();
//! let mut gate = DashboardGate::builder(directory.open(), Arc::new(directory.clone()))
//!     .clock(Arc::new(clock.clone()))
//!     .build();
//!
//! gate.attempt_login("company@example.com", SEED_PASSWORD).await?;
//! clock.advance(Duration::from_secs(31));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::identity::{Principal, Role};
use crate::store::{CredentialStore, MemoryDirectory, StoreFuture};

// ============================================================================
// Manual Clock
// ============================================================================

/// Clock that stands still until advanced.
///
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

// ============================================================================
// Faulty Provider
// ============================================================================

/// Credential provider whose every call fails with the same error
#[derive(Debug)]
pub struct FaultyCredentialStore {
    error: AuthError,
    calls: AtomicUsize,
}

impl FaultyCredentialStore {
    pub fn new(error: AuthError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of provider calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

impl CredentialStore for FaultyCredentialStore {
    fn verify<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move { self.fail() })
    }

    fn current_identity(&self) -> StoreFuture<'_, Result<Option<Principal>, AuthError>> {
        Box::pin(async move { self.fail() })
    }

    fn register<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move { self.fail() })
    }

    fn sign_out(&self) -> StoreFuture<'_, Result<(), AuthError>> {
        Box::pin(async move { self.fail() })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Password of every account in [`seeded_directory`]
pub const SEED_PASSWORD: &str = "correct horse battery";

/// Email of the seeded account for `role`
pub fn seed_email(role: Role) -> String {
    format!("{}@example.com", role.as_str())
}

/// Directory with one account per role, e.g. `company@example.com`
pub fn seeded_directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    for role in Role::ALL {
        let name = format!("Seed {}", role);
        // Fresh directory, emails are distinct
        let _ = directory.provision(&seed_email(role), SEED_PASSWORD, &name, role);
    }
    directory
}

// ============================================================================
// Signup Input Lists
// ============================================================================

/// Passwords shorter than the signup minimum
pub fn short_passwords() -> Vec<&'static str> {
    vec!["", "a", "123456", "qwerty", "abc123", "letmein"]
}

/// Strings that must not pass as an email address
pub fn invalid_emails() -> Vec<&'static str> {
    vec![
        "",
        "plainaddress",
        "@no-local.io",
        "no-domain@",
        "no-dot@domain",
        "two@@signs.io",
        "spaces in@local.io",
        "trailing-dot@domain.",
    ]
}

/// Role names a visitor must not be able to sign up with
pub fn forbidden_signup_roles() -> Vec<&'static str> {
    vec!["admin", "ADMIN", "superuser", "", "company-admin"]
}

// ============================================================================
// User Enumeration
// ============================================================================

/// Result of comparing the response for a known account with the response
/// for an unknown one
#[derive(Debug, Clone)]
pub struct UserEnumerationResult {
    /// Whether the responses reveal which account exists
    pub vulnerable: bool,
    pub issues: Vec<String>,
}

/// Compare login failure responses for a known and an unknown account
pub fn check_user_enumeration(
    known_user_status: u16,
    known_user_body: &str,
    unknown_user_status: u16,
    unknown_user_body: &str,
) -> UserEnumerationResult {
    let mut issues = Vec::new();

    if known_user_status != unknown_user_status {
        issues.push(format!(
            "Status {} for known account vs {} for unknown account",
            known_user_status, unknown_user_status
        ));
    }
    if known_user_body != unknown_user_body {
        issues.push("Different response bodies for known vs unknown accounts".to_string());
    }

    UserEnumerationResult {
        vulnerable: !issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CredentialStoreFactory, ProfileStore};
    use crate::validation::{validate_email, validate_signup_role, MIN_PASSWORD_LENGTH};

    #[test]
    fn test_manual_clock_advances_all_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_faulty_store_counts_calls() {
        let store = FaultyCredentialStore::new(AuthError::TooManyProviderRequests);
        assert_eq!(store.verify("a", "b").await, Err(AuthError::TooManyProviderRequests));
        assert!(store.sign_out().await.is_err());
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_seeded_directory_has_every_role() {
        let directory = seeded_directory();
        assert_eq!(directory.account_count(), Role::ALL.len());

        let store = directory.open();
        for role in Role::ALL {
            let principal = store.verify(&seed_email(role), SEED_PASSWORD).await.unwrap();
            assert_eq!(directory.get_role(&principal.id).await.unwrap(), role);
        }
    }

    #[test]
    fn test_input_lists_are_rejected() {
        assert!(short_passwords().iter().all(|p| p.len() < MIN_PASSWORD_LENGTH));
        for email in invalid_emails() {
            assert!(validate_email(email).is_err(), "{email}");
        }
        for role in forbidden_signup_roles() {
            assert!(validate_signup_role(role).is_err(), "{role}");
        }
    }

    #[test]
    fn test_check_user_enumeration() {
        let body = "{\"error\":\"invalid_credentials\"}";
        let same = check_user_enumeration(401, body, 401, body);
        assert!(!same.vulnerable);

        let leaky = check_user_enumeration(401, "wrong password", 404, "no such user");
        assert!(leaky.vulnerable);
        assert_eq!(leaky.issues.len(), 2);
    }
}
