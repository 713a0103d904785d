//! Gate configuration
//!
//! Builder-pattern configuration for the throttle policy, site layout and
//! HTTP surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::parse::{normalize_base_path, parse_duration, parse_list};
use crate::router::RouteConfig;
use crate::session::DEFAULT_CACHE_TTL;
use crate::throttle::ThrottlePolicy;

/// Default client cookie name
pub const DEFAULT_CLIENT_COOKIE: &str = "gate_client";

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: SocketAddr = SocketAddr::V4(std::net::SocketAddrV4::new(
    std::net::Ipv4Addr::UNSPECIFIED,
    3000,
));

/// Gate configuration.
///
/// # Example
///
/// ```ignore
/// use specyf_gate::GateConfig;
///
/// // Load from environment variables
/// let config = GateConfig::from_env();
///
/// // Or build programmatically
/// let config = GateConfig::builder()
///     .login_cooldown(Duration::from_secs(10))
///     .max_login_attempts(3)
///     .base_path("/site")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Login throttling
    pub throttle: ThrottlePolicy,

    /// Site layout: login/signup pages and protected prefixes
    pub routes: RouteConfig,

    /// How long a resolved identity is trusted before the provider is asked
    /// again (zero disables caching)
    pub session_cache_ttl: Duration,

    /// Cookie that identifies a browser to the gate registry
    pub client_cookie: String,

    /// Client gates unused for this long are dropped
    pub client_idle_timeout: Duration,

    pub listen_addr: SocketAddr,

    /// Directory of static pages served behind the gate
    pub static_dir: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottlePolicy::default(),
            routes: RouteConfig::default(),
            session_cache_ttl: DEFAULT_CACHE_TTL,
            client_cookie: DEFAULT_CLIENT_COOKIE.to_string(),
            client_idle_timeout: Duration::from_secs(30 * 60),
            listen_addr: DEFAULT_LISTEN_ADDR,
            static_dir: PathBuf::from("./public"),
        }
    }
}

impl GateConfig {
    /// Create configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to their defaults.
    ///
    /// # Environment Variables
    ///
    /// - `GATE_LOGIN_COOLDOWN`: e.g., "30s" (default: "30s")
    /// - `GATE_MAX_LOGIN_ATTEMPTS`: attempts before a block (default: 5)
    /// - `GATE_LOGIN_BLOCK_DURATION`: e.g., "15m" (default: "15m")
    /// - `GATE_SESSION_CACHE_TTL`: e.g., "5m", "0" to disable (default: "5m")
    /// - `GATE_BASE_PATH`: sub-path the site is hosted under (default: "")
    /// - `GATE_LOGIN_PATH`: (default: "/login.html")
    /// - `GATE_SIGNUP_PATH`: (default: "/signup.html")
    /// - `GATE_PROTECTED_PREFIXES`: comma-separated (default: "/dashboard/")
    /// - `GATE_CLIENT_COOKIE`: (default: "gate_client")
    /// - `GATE_CLIENT_IDLE_TIMEOUT`: e.g., "30m" (default: "30m")
    /// - `GATE_LISTEN_ADDR`: (default: "0.0.0.0:3000")
    /// - `GATE_STATIC_DIR`: (default: "./public")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let duration = |key: &str, default: Duration| {
            lookup(key).and_then(|s| parse_duration(&s)).unwrap_or(default)
        };

        let throttle = ThrottlePolicy {
            cooldown: duration("GATE_LOGIN_COOLDOWN", defaults.throttle.cooldown),
            max_attempts: lookup("GATE_MAX_LOGIN_ATTEMPTS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.throttle.max_attempts),
            block_duration: duration("GATE_LOGIN_BLOCK_DURATION", defaults.throttle.block_duration),
        };

        let protected_prefixes = lookup("GATE_PROTECTED_PREFIXES")
            .map(|s| parse_list(&s))
            .filter(|prefixes| !prefixes.is_empty())
            .unwrap_or(defaults.routes.protected_prefixes);

        let routes = RouteConfig {
            base_path: lookup("GATE_BASE_PATH")
                .map(|s| normalize_base_path(&s))
                .unwrap_or_default(),
            login_path: lookup("GATE_LOGIN_PATH").unwrap_or(defaults.routes.login_path),
            signup_path: lookup("GATE_SIGNUP_PATH").unwrap_or(defaults.routes.signup_path),
            protected_prefixes,
        };

        Self {
            throttle,
            routes,
            session_cache_ttl: duration("GATE_SESSION_CACHE_TTL", defaults.session_cache_ttl),
            client_cookie: lookup("GATE_CLIENT_COOKIE").unwrap_or(defaults.client_cookie),
            client_idle_timeout: duration("GATE_CLIENT_IDLE_TIMEOUT", defaults.client_idle_timeout),
            listen_addr: lookup("GATE_LISTEN_ADDR")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.listen_addr),
            static_dir: lookup("GATE_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }

    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::default()
    }
}

/// Builder for GateConfig
#[derive(Default)]
pub struct GateConfigBuilder {
    config: GateConfig,
}

impl GateConfigBuilder {
    pub fn throttle(mut self, policy: ThrottlePolicy) -> Self {
        self.config.throttle = policy;
        self
    }

    pub fn login_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.throttle.cooldown = cooldown;
        self
    }

    pub fn max_login_attempts(mut self, attempts: u32) -> Self {
        self.config.throttle.max_attempts = attempts;
        self
    }

    pub fn login_block_duration(mut self, duration: Duration) -> Self {
        self.config.throttle.block_duration = duration;
        self
    }

    pub fn session_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_cache_ttl = ttl;
        self
    }

    pub fn base_path(mut self, path: &str) -> Self {
        self.config.routes.base_path = normalize_base_path(path);
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.config.routes.login_path = path.into();
        self
    }

    pub fn signup_path(mut self, path: impl Into<String>) -> Self {
        self.config.routes.signup_path = path.into();
        self
    }

    pub fn protected_prefixes(mut self, prefixes: Vec<&str>) -> Self {
        self.config.routes.protected_prefixes = prefixes.into_iter().map(String::from).collect();
        self
    }

    pub fn client_cookie(mut self, name: impl Into<String>) -> Self {
        self.config.client_cookie = name.into();
        self
    }

    pub fn client_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.client_idle_timeout = timeout;
        self
    }

    pub fn listen_addr(mut self, addr: SocketAddr) -> Self {
        self.config.listen_addr = addr;
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn build(self) -> GateConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.throttle.cooldown, Duration::from_secs(30));
        assert_eq!(config.throttle.max_attempts, 5);
        assert_eq!(config.throttle.block_duration, Duration::from_secs(900));
        assert_eq!(config.session_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.routes.login_path, "/login.html");
        assert_eq!(config.routes.protected_prefixes, vec!["/dashboard/"]);
        assert_eq!(config.client_cookie, "gate_client");
        assert_eq!(config.listen_addr.port(), 3000);
    }

    #[test]
    fn test_from_lookup() {
        let config = GateConfig::from_lookup(lookup(&[
            ("GATE_LOGIN_COOLDOWN", "10s"),
            ("GATE_MAX_LOGIN_ATTEMPTS", "3"),
            ("GATE_LOGIN_BLOCK_DURATION", "1h"),
            ("GATE_SESSION_CACHE_TTL", "0"),
            ("GATE_BASE_PATH", "site/"),
            ("GATE_PROTECTED_PREFIXES", "/dashboard/, /admin/"),
            ("GATE_LISTEN_ADDR", "127.0.0.1:8080"),
        ]));

        assert_eq!(config.throttle.cooldown, Duration::from_secs(10));
        assert_eq!(config.throttle.max_attempts, 3);
        assert_eq!(config.throttle.block_duration, Duration::from_secs(3600));
        assert_eq!(config.session_cache_ttl, Duration::ZERO);
        assert_eq!(config.routes.base_path, "/site");
        assert_eq!(config.routes.protected_prefixes, vec!["/dashboard/", "/admin/"]);
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = GateConfig::from_lookup(lookup(&[
            ("GATE_LOGIN_COOLDOWN", "soon"),
            ("GATE_MAX_LOGIN_ATTEMPTS", "many"),
            ("GATE_PROTECTED_PREFIXES", " , "),
            ("GATE_LISTEN_ADDR", "nowhere"),
        ]));

        assert_eq!(config.throttle.cooldown, Duration::from_secs(30));
        assert_eq!(config.throttle.max_attempts, 5);
        assert_eq!(config.routes.protected_prefixes, vec!["/dashboard/"]);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_builder() {
        let config = GateConfig::builder()
            .login_cooldown(Duration::from_secs(1))
            .max_login_attempts(2)
            .base_path("/app/")
            .client_cookie("sid")
            .build();

        assert_eq!(config.throttle.cooldown, Duration::from_secs(1));
        assert_eq!(config.throttle.max_attempts, 2);
        assert_eq!(config.routes.base_path, "/app");
        assert_eq!(config.client_cookie, "sid");
    }
}
