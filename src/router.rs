//! Role Router
//!
//! Decides, for a resolved [`Session`] and a requested path, whether the page
//! may render or where the visitor must go instead.
//!
//! Paths are classified into a typed [`Route`] first; decisions compare a
//! [`Role`] against the route's owner rather than searching the URL for role
//! names.
//!
//! | Session | Route | Decision |
//! |---------|-------|----------|
//! | anonymous | `Dashboard` | redirect to login |
//! | signed in | `Login` / `Signup` | redirect to role home |
//! | signed in | `Dashboard` owned by another role | redirect to role home |
//! | anything else | | allow |
//!
//! The router holds no mutable state: the same inputs always produce the
//! same decision. Loop protection belongs to [`crate::gate::DashboardGate`].

use crate::identity::Role;
use crate::session::Session;

/// Default login page
pub const DEFAULT_LOGIN_PATH: &str = "/login.html";
/// Default signup page
pub const DEFAULT_SIGNUP_PATH: &str = "/signup.html";
/// Default protected prefix
pub const DEFAULT_PROTECTED_PREFIX: &str = "/dashboard/";

/// Site layout the router works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    /// Sub-path the site is hosted under ("" for the root)
    pub base_path: String,
    pub login_path: String,
    pub signup_path: String,
    /// Path prefixes that require a signed-in identity
    pub protected_prefixes: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            signup_path: DEFAULT_SIGNUP_PATH.to_string(),
            protected_prefixes: vec![DEFAULT_PROTECTED_PREFIX.to_string()],
        }
    }
}

impl RouteConfig {
    /// Absolute URL of a site-relative path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_path, path)
    }

    /// Absolute URL of the login page
    pub fn login_url(&self) -> String {
        self.url_for(&self.login_path)
    }
}

/// Typed description of a requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    /// Marketing and other unprotected pages
    Public,
    /// A protected page, optionally belonging to one role
    Dashboard { owner: Option<Role> },
}

impl Route {
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard { .. })
    }
}

/// Outcome of a routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectTo(String),
}

/// Pure routing policy over a [`RouteConfig`]
#[derive(Debug, Clone, Default)]
pub struct RoleRouter {
    config: RouteConfig,
}

impl RoleRouter {
    pub fn new(config: RouteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Classify a request path (query string and fragment ignored)
    pub fn classify(&self, path: &str) -> Route {
        let path = self.site_path(path);

        if path == self.config.login_path {
            return Route::Login;
        }
        if path == self.config.signup_path {
            return Route::Signup;
        }

        for prefix in &self.config.protected_prefixes {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                return Route::Dashboard { owner: dashboard_owner(rest) };
            }
            if path == prefix.trim_end_matches('/') {
                return Route::Dashboard { owner: None };
            }
        }

        Route::Public
    }

    /// Decide whether `session` may view `current_path`
    pub fn decide(&self, session: &Session, current_path: &str) -> RouteDecision {
        let route = self.classify(current_path);

        match (&session.identity, route) {
            (None, Route::Dashboard { .. }) => RouteDecision::RedirectTo(self.config.login_url()),
            (Some(identity), Route::Login | Route::Signup) => {
                RouteDecision::RedirectTo(self.config.url_for(identity.home_path()))
            }
            (Some(identity), Route::Dashboard { owner: Some(owner) }) if owner != identity.role => {
                RouteDecision::RedirectTo(self.config.url_for(identity.home_path()))
            }
            _ => RouteDecision::Allow,
        }
    }

    /// Strip query, fragment and base path
    fn site_path<'a>(&self, path: &'a str) -> &'a str {
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let base = self.config.base_path.as_str();
        if base.is_empty() {
            return path;
        }
        match path.strip_prefix(base) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

/// Role named by the first segment under a protected prefix.
///
/// `company.html`, `company-dashboard.html` and `company/…` all name
/// `company`; anything that is not a role name has no owner.
fn dashboard_owner(rest: &str) -> Option<Role> {
    let segment = rest.split('/').next()?;
    let segment = segment.strip_suffix(".html").unwrap_or(segment);
    let segment = segment.strip_suffix("-dashboard").unwrap_or(segment);
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, Principal};
    use std::time::Instant;

    fn anonymous() -> Session {
        Session::anonymous(Instant::now())
    }

    fn signed_in(role: Role) -> Session {
        let identity: Identity = Principal::new("uid-1", "user@example.com").with_role(role);
        Session::authenticated(identity, Instant::now())
    }

    fn redirect(path: &str) -> RouteDecision {
        RouteDecision::RedirectTo(path.to_string())
    }

    #[test]
    fn test_anonymous_dashboard_redirects_to_login() {
        let router = RoleRouter::default();
        assert_eq!(router.decide(&anonymous(), "/dashboard/company.html"), redirect("/login.html"));
    }

    #[test]
    fn test_signed_in_login_page_redirects_home() {
        let router = RoleRouter::default();
        assert_eq!(
            router.decide(&signed_in(Role::Company), "/login.html"),
            redirect("/dashboard/company-dashboard.html")
        );
        assert_eq!(
            router.decide(&signed_in(Role::Company), "/signup.html"),
            redirect("/dashboard/company-dashboard.html")
        );
    }

    #[test]
    fn test_foreign_dashboard_redirects_home() {
        let router = RoleRouter::default();
        assert_eq!(
            router.decide(&signed_in(Role::Company), "/dashboard/employee-dashboard.html"),
            redirect("/dashboard/company-dashboard.html")
        );
        assert_eq!(
            router.decide(&signed_in(Role::Company), "/dashboard/admin/clients.html"),
            redirect("/dashboard/company-dashboard.html")
        );
    }

    #[test]
    fn test_own_dashboard_allowed() {
        let router = RoleRouter::default();
        assert_eq!(
            router.decide(&signed_in(Role::Company), "/dashboard/company-dashboard.html"),
            RouteDecision::Allow
        );
        assert_eq!(
            router.decide(&signed_in(Role::Admin), "/dashboard/admin/clients.html"),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_unowned_dashboard_page_needs_any_identity() {
        let router = RoleRouter::default();
        assert_eq!(
            router.decide(&signed_in(Role::Startup), "/dashboard/settings.html"),
            RouteDecision::Allow
        );
        assert_eq!(
            router.decide(&anonymous(), "/dashboard/settings.html"),
            redirect("/login.html")
        );
        assert_eq!(router.decide(&anonymous(), "/dashboard"), redirect("/login.html"));
    }

    #[test]
    fn test_public_pages_always_allowed() {
        let router = RoleRouter::default();
        for path in ["/", "/index.html", "/pricing.html", "/login.html", "/signup.html"] {
            assert_eq!(router.decide(&anonymous(), path), RouteDecision::Allow, "{path}");
        }
        assert_eq!(
            router.decide(&signed_in(Role::Freelancer), "/pricing.html"),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_decide_is_idempotent() {
        let router = RoleRouter::default();
        let session = signed_in(Role::Company);
        let first = router.decide(&session, "/dashboard/employee-dashboard.html");
        let second = router.decide(&session, "/dashboard/employee-dashboard.html");
        assert_eq!(first, second);
    }

    #[test]
    fn test_role_name_elsewhere_in_path_is_not_ownership() {
        let router = RoleRouter::default();
        assert_eq!(router.classify("/blog/company-news.html"), Route::Public);
        assert_eq!(
            router.classify("/dashboard/reports/company.html"),
            Route::Dashboard { owner: None }
        );
    }

    #[test]
    fn test_classify_ignores_query_and_fragment() {
        let router = RoleRouter::default();
        assert_eq!(router.classify("/login.html?next=/dashboard/"), Route::Login);
        assert_eq!(
            router.classify("/dashboard/startup-dashboard.html#metrics"),
            Route::Dashboard { owner: Some(Role::Startup) }
        );
    }

    #[test]
    fn test_base_path() {
        let router = RoleRouter::new(RouteConfig {
            base_path: "/site".to_string(),
            ..RouteConfig::default()
        });

        assert_eq!(router.classify("/site/login.html"), Route::Login);
        assert_eq!(router.classify("/site"), Route::Public);
        assert_eq!(
            router.classify("/site/dashboard/company.html"),
            Route::Dashboard { owner: Some(Role::Company) }
        );
        assert_eq!(
            router.decide(&anonymous(), "/site/dashboard/company.html"),
            redirect("/site/login.html")
        );
        assert_eq!(
            router.decide(&signed_in(Role::Employee), "/site/login.html"),
            redirect("/site/dashboard/employee-dashboard.html")
        );
    }
}
