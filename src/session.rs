//! Session Resolution
//!
//! Answers "who is signed in on this client?" for every page load.
//!
//! # Design
//!
//! The credential provider owns the real sign-in. The resolver only:
//! - asks it once per resolution (a single awaited query, no subscription)
//! - joins the answer with the profile store to learn the [`Role`]
//! - caches the joined [`Identity`] for a short TTL so consecutive page
//!   loads do not hit the provider
//!
//! Resolution never fails from the caller's point of view. Every provider or
//! profile problem yields an anonymous [`Session`], with the reason reported
//! alongside in [`Resolution::error`] for logging.
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::session::SessionResolver;
//! use std::time::{Duration, Instant};
//!
//! let mut resolver = SessionResolver::new(Duration::from_secs(300));
//! let resolution = resolver.resolve(Instant::now(), &*credentials, &*profiles).await;
//! if let Some(err) = &resolution.error {
//!     tracing::warn!(error = %err, "session degraded");
//! }
//! ```

use std::time::{Duration, Instant};

use crate::error::ResolutionError;
use crate::identity::{Identity, Role};
use crate::observability::SecurityEvent;
use crate::store::{CredentialStore, ProfileStore};

/// Default time a cached identity is trusted without asking the provider
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Session
// ============================================================================

/// One page load's view of who is signed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `None` means anonymous
    pub identity: Option<Identity>,
    pub issued_at: Instant,
    /// Path this session was last evaluated against
    pub last_route: Option<String>,
}

impl Session {
    pub fn anonymous(now: Instant) -> Self {
        Self {
            identity: None,
            issued_at: now,
            last_route: None,
        }
    }

    pub fn authenticated(identity: Identity, now: Instant) -> Self {
        Self {
            identity: Some(identity),
            issued_at: now,
            last_route: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

/// Result of one resolution: always a session, sometimes a reason it is
/// anonymous
#[derive(Debug, Clone)]
pub struct Resolution {
    pub session: Session,
    pub error: Option<ResolutionError>,
}

impl Resolution {
    fn ok(session: Session) -> Self {
        Self { session, error: None }
    }

    fn degraded(now: Instant, error: ResolutionError) -> Self {
        Self {
            session: Session::anonymous(now),
            error: Some(error),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

#[derive(Debug, Clone)]
struct CachedIdentity {
    identity: Identity,
    cached_at: Instant,
}

/// Resolves sessions against the credential and profile stores
#[derive(Debug, Clone)]
pub struct SessionResolver {
    cache_ttl: Duration,
    cached: Option<CachedIdentity>,
}

impl Default for SessionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl SessionResolver {
    /// `Duration::ZERO` disables caching
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache_ttl,
            cached: None,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Identity cached at `now`, if still fresh
    pub fn cached_identity(&self, now: Instant) -> Option<&Identity> {
        self.cached
            .as_ref()
            .filter(|entry| now.saturating_duration_since(entry.cached_at) < self.cache_ttl)
            .map(|entry| &entry.identity)
    }

    /// Resolve the current session
    pub async fn resolve(
        &mut self,
        now: Instant,
        credentials: &dyn CredentialStore,
        profiles: &dyn ProfileStore,
    ) -> Resolution {
        if let Some(identity) = self.cached_identity(now) {
            return Resolution::ok(Session::authenticated(identity.clone(), now));
        }
        self.cached = None;

        let principal = match credentials.current_identity().await {
            Ok(Some(principal)) => principal,
            Ok(None) => return Resolution::ok(Session::anonymous(now)),
            Err(err) => {
                return Resolution::degraded(now, ResolutionError::Provider(err.to_string()))
            }
        };

        match profiles.get_role(&principal.id).await {
            Ok(role) => {
                let identity = principal.with_role(role);
                self.cache(identity.clone(), now);
                Resolution::ok(Session::authenticated(identity, now))
            }
            Err(err) => {
                Resolution::degraded(now, ResolutionError::from_profile(&principal.id, err))
            }
        }
    }

    /// Trust `identity` for the next `cache_ttl`
    pub fn cache(&mut self, identity: Identity, now: Instant) {
        if self.cache_ttl.is_zero() {
            return;
        }
        crate::security_event!(
            SecurityEvent::SessionCreated,
            user_id = %identity.id,
            role = %identity.role,
            "Identity cached for session"
        );
        self.cached = Some(CachedIdentity {
            identity,
            cached_at: now,
        });
    }

    /// Drop any cached identity
    pub fn invalidate(&mut self) {
        if let Some(entry) = self.cached.take() {
            crate::security_event!(
                SecurityEvent::SessionDestroyed,
                user_id = %entry.identity.id,
                "Cached identity dropped"
            );
        }
    }
}
