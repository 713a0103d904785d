//! Dashboard Gate
//!
//! The single entry point a page consults before rendering. The gate owns the
//! per-client state (throttle counters, cached identity, the current session
//! and the last redirect it issued) and composes the pure pieces:
//!
//! ```text
//! page load  ──► SessionResolver ──► RoleRouter ──► loop guard ──► Effect
//! login form ──► LoginThrottler ──► CredentialStore::verify ──► ProfileStore
//!            ──► LoginOutcome
//! ```
//!
//! It is the only component that produces navigation effects; everything it
//! calls returns plain values.
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::{DashboardGate, Effect};
//!
//! let mut gate = DashboardGate::builder(credentials, profiles)
//!     .config(&GateConfig::from_env())
//!     .build();
//!
//! match gate.on_page_load("/dashboard/company-dashboard.html").await {
//!     Effect::ProceedRender => render(),
//!     Effect::NavigateTo(path) => redirect(path),
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::error::{AuthError, GateError, ResolutionError};
use crate::identity::{Identity, Profile};
use crate::observability::SecurityEvent;
use crate::router::{RoleRouter, RouteConfig, RouteDecision};
use crate::session::{Session, SessionResolver, DEFAULT_CACHE_TTL};
use crate::store::{CredentialStore, ProfileStore};
use crate::throttle::{LoginThrottler, ThrottlePolicy, ThrottleState};
use crate::validation::{SignupRequest, Validate};

/// What the page should do after a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Leave this page for `path`
    NavigateTo(String),
    /// Render the requested page
    ProceedRender,
}

/// Successful login or signup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    #[serde(rename = "user")]
    pub identity: Identity,
    /// Role home to send the user to
    pub redirect_to: String,
}

/// Per-client authentication gate
pub struct DashboardGate {
    credentials: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    throttler: LoginThrottler,
    resolver: SessionResolver,
    router: RoleRouter,
    session: Session,
    last_redirect: Option<String>,
}

impl std::fmt::Debug for DashboardGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardGate")
            .field("throttle", &self.throttler.state())
            .field("session", &self.session)
            .field("last_redirect", &self.last_redirect)
            .finish_non_exhaustive()
    }
}

impl DashboardGate {
    pub fn builder(
        credentials: Arc<dyn CredentialStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> DashboardGateBuilder {
        DashboardGateBuilder {
            credentials,
            profiles,
            clock: Arc::new(SystemClock),
            throttle: ThrottlePolicy::default(),
            routes: RouteConfig::default(),
            session_cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn router(&self) -> &RoleRouter {
        &self.router
    }

    /// Current throttle counters
    pub fn throttle_snapshot(&self) -> ThrottleState {
        self.throttler.state()
    }

    /// Session as of the last page load, login or sign-out
    pub fn session_snapshot(&self) -> Session {
        self.session.clone()
    }

    /// Re-resolve who is signed in without routing
    pub async fn refresh_session(&mut self) -> Session {
        let now = self.clock.now();
        let resolution = self
            .resolver
            .resolve(now, &*self.credentials, &*self.profiles)
            .await;

        if let Some(err) = &resolution.error {
            log_resolution_failed(err, self.session.last_route.as_deref());
            // A sign-in without a profile is a half-finished registration
            if matches!(err, ResolutionError::ProfileMissing { .. }) {
                self.sign_out_provider().await;
            }
        }

        let last_route = self.session.last_route.take();
        self.session = Session {
            last_route,
            ..resolution.session
        };
        self.session.clone()
    }

    /// Gate a page load of `path`
    pub async fn on_page_load(&mut self, path: &str) -> Effect {
        self.session.last_route = Some(path.to_string());
        self.refresh_session().await;
        let decision = self.router.decide(&self.session, path);

        match decision {
            RouteDecision::Allow => {
                self.last_redirect = None;
                crate::security_event!(
                    SecurityEvent::AccessGranted,
                    path = %path,
                    "Page render allowed"
                );
                Effect::ProceedRender
            }
            RouteDecision::RedirectTo(target) => self.guard_redirect(path, target),
        }
    }

    /// Collapse a redirect that would repeat itself into a render.
    ///
    /// Redirects away from a protected page are never collapsed, whether the
    /// visitor is anonymous or signed in with another role.
    fn guard_redirect(&mut self, path: &str, target: String) -> Effect {
        let requested = path.split(['?', '#']).next().unwrap_or(path);
        let repeats =
            self.last_redirect.as_deref() == Some(target.as_str()) || target == requested;
        let guards_protected = self.router.classify(path).is_protected();

        if repeats && !guards_protected {
            crate::security_event!(
                SecurityEvent::RedirectLoopSuppressed,
                path = %path,
                target = %target,
                "Redirect repeats the previous one, rendering instead"
            );
            return Effect::ProceedRender;
        }

        crate::security_event!(
            SecurityEvent::AccessDenied,
            path = %path,
            target = %target,
            authenticated = self.session.is_authenticated(),
            "Page redirected"
        );
        self.last_redirect = Some(target.clone());
        Effect::NavigateTo(target)
    }

    /// Handle a login form submission
    pub async fn attempt_login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, GateError> {
        let now = self.clock.now();
        self.throttler.check_and_record_attempt(now)?;

        let principal = match self.credentials.verify(email, password).await {
            Ok(principal) => principal,
            Err(err) => {
                if err == AuthError::TooManyProviderRequests {
                    self.throttler.block(now);
                }
                crate::security_event!(
                    SecurityEvent::AuthenticationFailure,
                    email = %email,
                    reason = %err,
                    attempts = self.throttler.state().attempt_count,
                    "Login failed"
                );
                return Err(err.into());
            }
        };

        let role = match self.profiles.get_role(&principal.id).await {
            Ok(role) => role,
            Err(err) => {
                let err = ResolutionError::from_profile(&principal.id, err);
                crate::security_event!(
                    SecurityEvent::AuthenticationFailure,
                    email = %email,
                    user_id = %principal.id,
                    reason = %err,
                    "Credentials accepted but account cannot be routed"
                );
                self.sign_out_provider().await;
                return Err(GateError::AccountUnavailable);
            }
        };

        self.throttler.record_success();
        let identity = principal.with_role(role);

        crate::security_event!(
            SecurityEvent::AuthenticationSuccess,
            user_id = %identity.id,
            role = %identity.role,
            "Login successful"
        );

        Ok(self.establish(identity))
    }

    /// Handle a signup form submission
    pub async fn attempt_signup(
        &mut self,
        request: &SignupRequest,
    ) -> Result<LoginOutcome, GateError> {
        request.validate()?;
        let role = request.requested_role()?;

        let principal = self.credentials.register(request.email.trim(), &request.password).await?;

        let profile = Profile {
            identity_id: principal.id.clone(),
            email: principal.email.clone(),
            full_name: request.full_name.trim().to_string(),
            role,
        };
        if let Err(err) = self.profiles.put_profile(&profile).await {
            tracing::error!(
                user_id = %principal.id,
                error = %err,
                "Failed to write profile for new account"
            );
            self.sign_out_provider().await;
            return Err(GateError::AccountUnavailable);
        }

        let identity = principal.with_role(role);
        crate::security_event!(
            SecurityEvent::UserRegistered,
            user_id = %identity.id,
            role = %identity.role,
            "Account registered"
        );

        Ok(self.establish(identity))
    }

    /// Sign the current user out and send them to the login page
    pub async fn sign_out(&mut self) -> Effect {
        if let Some(identity) = &self.session.identity {
            crate::security_event!(
                SecurityEvent::Logout,
                user_id = %identity.id,
                "User signed out"
            );
        }
        self.sign_out_provider().await;
        self.resolver.invalidate();
        self.session = Session::anonymous(self.clock.now());
        self.last_redirect = None;
        Effect::NavigateTo(self.router.config().login_url())
    }

    fn establish(&mut self, identity: Identity) -> LoginOutcome {
        let now = self.clock.now();
        self.resolver.cache(identity.clone(), now);
        self.session = Session::authenticated(identity.clone(), now);
        self.last_redirect = None;

        LoginOutcome {
            redirect_to: self.router.config().url_for(identity.home_path()),
            identity,
        }
    }

    /// Best-effort provider sign-out
    async fn sign_out_provider(&self) {
        if let Err(err) = self.credentials.sign_out().await {
            tracing::warn!(error = %err, "Provider sign-out failed");
        }
    }
}

fn log_resolution_failed(err: &ResolutionError, path: Option<&str>) {
    crate::security_event!(
        SecurityEvent::SessionResolutionFailed,
        path = %path.unwrap_or("-"),
        reason = %err,
        "Session resolution degraded to anonymous"
    );
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`DashboardGate`]
pub struct DashboardGateBuilder {
    credentials: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    throttle: ThrottlePolicy,
    routes: RouteConfig,
    session_cache_ttl: Duration,
}

impl DashboardGateBuilder {
    /// Take throttle, routing and cache settings from `config`
    pub fn config(mut self, config: &GateConfig) -> Self {
        self.throttle = config.throttle.clone();
        self.routes = config.routes.clone();
        self.session_cache_ttl = config.session_cache_ttl;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn throttle(mut self, policy: ThrottlePolicy) -> Self {
        self.throttle = policy;
        self
    }

    pub fn routes(mut self, routes: RouteConfig) -> Self {
        self.routes = routes;
        self
    }

    pub fn session_cache_ttl(mut self, ttl: Duration) -> Self {
        self.session_cache_ttl = ttl;
        self
    }

    pub fn build(self) -> DashboardGate {
        let now = self.clock.now();
        DashboardGate {
            credentials: self.credentials,
            profiles: self.profiles,
            clock: self.clock,
            throttler: LoginThrottler::new(self.throttle),
            resolver: SessionResolver::new(self.session_cache_ttl),
            router: RoleRouter::new(self.routes),
            session: Session::anonymous(now),
            last_redirect: None,
        }
    }
}
