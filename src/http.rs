//! HTTP surface
//!
//! Puts a [`DashboardGate`] in front of an axum application:
//!
//! - every `GET`/`HEAD` page request passes through [`gate_middleware`],
//!   which answers `303 See Other` when the gate says to navigate away
//! - `/api/auth/*` exposes login, signup, logout and the session state
//!
//! Each browser gets its own gate, keyed by a random client cookie, so two
//! clients never share throttle counters or sessions. Requests from the same
//! client are serialized on that client's gate.
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::http::{auth_routes, GateRegistry, GatedRouter};
//! use tower_http::services::ServeDir;
//!
//! let registry = Arc::new(GateRegistry::new(
//!     Arc::new(directory.clone()),
//!     Arc::new(directory),
//!     config,
//! ));
//! let app = auth_routes()
//!     .fallback_service(ServeDir::new("public"))
//!     .with_gate(registry);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Extension, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::crypto::random_hex;
use crate::error::GateError;
use crate::gate::{DashboardGate, Effect, LoginOutcome};
use crate::identity::Identity;
use crate::store::{CredentialStoreFactory, ProfileStore};
use crate::throttle::ceil_secs;
use crate::validation::SignupRequest;

/// Bytes of entropy in a client id
const CLIENT_ID_BYTES: usize = 16;

/// Prefix of routes that are never page-gated
const API_PREFIX: &str = "/api/";

/// Shared gate for one client
pub type SharedGate = Arc<AsyncMutex<DashboardGate>>;

// ============================================================================
// Gate Registry
// ============================================================================

struct ClientEntry {
    gate: SharedGate,
    last_seen: Instant,
}

/// One [`DashboardGate`] per client id
pub struct GateRegistry {
    credentials: Arc<dyn CredentialStoreFactory>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    config: GateConfig,
    clients: Mutex<HashMap<String, ClientEntry>>,
}

impl GateRegistry {
    pub fn new(
        credentials: Arc<dyn CredentialStoreFactory>,
        profiles: Arc<dyn ProfileStore>,
        config: GateConfig,
    ) -> Self {
        Self {
            credentials,
            profiles,
            clock: Arc::new(SystemClock),
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Use `clock` for every gate this registry creates
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Gate for `client_id`, created on first use
    pub fn gate_for(&self, client_id: &str) -> SharedGate {
        let now = self.clock.now();
        let mut clients = self.clients.lock();

        if let Some(entry) = clients.get_mut(client_id) {
            entry.last_seen = now;
            return entry.gate.clone();
        }

        let gate = DashboardGate::builder(self.credentials.open(), self.profiles.clone())
            .config(&self.config)
            .clock(self.clock.clone())
            .build();
        let gate = Arc::new(AsyncMutex::new(gate));
        clients.insert(
            client_id.to_string(),
            ClientEntry {
                gate: gate.clone(),
                last_seen: now,
            },
        );
        gate
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Drop gates not used for `max_idle`; returns how many were dropped
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < max_idle);
        let evicted = before - clients.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = clients.len(), "Evicted idle client gates");
        }
        evicted
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}

// ============================================================================
// Client Identification
// ============================================================================

/// Client id attached to every request by [`gate_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

/// Value of cookie `name` in the request headers
fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Only ids this server could have minted are accepted
fn is_client_id(value: &str) -> bool {
    value.len() == CLIENT_ID_BYTES * 2
        && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn client_cookie(name: &str, id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, id)).ok()
}

// ============================================================================
// Middleware
// ============================================================================

/// Identify the client and gate page loads.
///
/// API requests only get a [`ClientId`]; `GET`/`HEAD` page requests are run
/// through [`DashboardGate::on_page_load`] first.
pub async fn gate_middleware(
    State(registry): State<Arc<GateRegistry>>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie_name = registry.config().client_cookie.as_str();
    let existing = read_cookie(req.headers(), cookie_name)
        .filter(|id| is_client_id(id))
        .map(str::to_string);
    let minted = existing.is_none();
    let client_id = existing.unwrap_or_else(|| random_hex(CLIENT_ID_BYTES));

    let is_page = matches!(*req.method(), Method::GET | Method::HEAD)
        && !req.uri().path().starts_with(API_PREFIX);

    let mut response = if is_page {
        let path = req.uri().path().to_string();
        let gate = registry.gate_for(&client_id);
        let effect = gate.lock().await.on_page_load(&path).await;
        match effect {
            Effect::NavigateTo(target) => Redirect::to(&target).into_response(),
            Effect::ProceedRender => {
                req.extensions_mut().insert(ClientId(client_id.clone()));
                next.run(req).await
            }
        }
    } else {
        req.extensions_mut().insert(ClientId(client_id.clone()));
        next.run(req).await
    };

    if minted {
        match client_cookie(cookie_name, &client_id) {
            Some(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            None => tracing::warn!(
                cookie = %cookie_name,
                "Client cookie name is not a valid header value"
            ),
        }
    }
    response
}

// ============================================================================
// Handlers
// ============================================================================

/// Login form submission
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct RedirectBody {
    redirect_to: String,
}

#[derive(Debug, Serialize)]
struct ThrottleView {
    attempt_count: u32,
    blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SessionBody {
    authenticated: bool,
    user: Option<Identity>,
    throttle: ThrottleView,
}

async fn login(
    State(registry): State<Arc<GateRegistry>>,
    Extension(ClientId(client_id)): Extension<ClientId>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, GateError> {
    let gate = registry.gate_for(&client_id);
    let mut gate = gate.lock().await;
    let outcome = gate.attempt_login(&body.email, &body.password).await?;
    Ok(Json(outcome))
}

async fn register(
    State(registry): State<Arc<GateRegistry>>,
    Extension(ClientId(client_id)): Extension<ClientId>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<LoginOutcome>, GateError> {
    let gate = registry.gate_for(&client_id);
    let mut gate = gate.lock().await;
    let outcome = gate.attempt_signup(&body).await?;
    Ok(Json(outcome))
}

async fn logout(
    State(registry): State<Arc<GateRegistry>>,
    Extension(ClientId(client_id)): Extension<ClientId>,
) -> Json<RedirectBody> {
    let gate = registry.gate_for(&client_id);
    let mut gate = gate.lock().await;
    let redirect_to = match gate.sign_out().await {
        Effect::NavigateTo(path) => path,
        Effect::ProceedRender => registry.config().routes.login_url(),
    };
    Json(RedirectBody { redirect_to })
}

async fn session(
    State(registry): State<Arc<GateRegistry>>,
    Extension(ClientId(client_id)): Extension<ClientId>,
) -> Json<SessionBody> {
    let gate = registry.gate_for(&client_id);
    let mut gate = gate.lock().await;
    let session = gate.refresh_session().await;
    let throttle = gate.throttle_snapshot();
    let remaining = throttle.remaining_block(registry.now());

    Json(SessionBody {
        authenticated: session.is_authenticated(),
        user: session.identity,
        throttle: ThrottleView {
            attempt_count: throttle.attempt_count,
            blocked: remaining.is_some(),
            retry_after: remaining.map(ceil_secs),
        },
    })
}

/// `/api/auth/*` routes; finish with [`GatedRouter::with_gate`]
pub fn auth_routes() -> Router<Arc<GateRegistry>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
}

/// Extension trait that puts the gate in front of a router
pub trait GatedRouter {
    /// Apply [`gate_middleware`] to every route and the fallback, then
    /// provide the registry as state
    fn with_gate(self, registry: Arc<GateRegistry>) -> Router;
}

impl GatedRouter for Router<Arc<GateRegistry>> {
    fn with_gate(self, registry: Arc<GateRegistry>) -> Router {
        self.layer(middleware::from_fn_with_state(registry.clone(), gate_middleware))
            .with_state(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::store::MemoryDirectory;
    use crate::testing::{
        check_user_enumeration, seed_email, seeded_directory, ManualClock, SEED_PASSWORD,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        registry: Arc<GateRegistry>,
        clock: ManualClock,
    }

    fn test_app() -> TestApp {
        let directory: MemoryDirectory = seeded_directory();
        let clock = ManualClock::new();
        let registry = Arc::new(
            GateRegistry::new(
                Arc::new(directory.clone()),
                Arc::new(directory),
                GateConfig::default(),
            )
            .with_clock(Arc::new(clock.clone())),
        );
        let app = auth_routes()
            .fallback(|| async { "page" })
            .with_gate(registry.clone());
        TestApp { app, registry, clock }
    }

    fn client_cookie_header(id: &str) -> String {
        format!("gate_client={}", id)
    }

    fn get_page(path: &str, client: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(path)
            .header(header::COOKIE, client_cookie_header(client))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(path: &str, client: &str, body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::COOKIE, client_cookie_header(client))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const CLIENT_A: &str = "0123456789abcdef0123456789abcdef";
    const CLIENT_B: &str = "fedcba9876543210fedcba9876543210";

    #[tokio::test]
    async fn test_anonymous_dashboard_redirects() {
        let t = test_app();
        let response = t
            .app
            .oneshot(get_page("/dashboard/company-dashboard.html", CLIENT_A))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login.html");
    }

    #[tokio::test]
    async fn test_public_page_renders_and_mints_cookie() {
        let t = test_app();
        let request = axum::http::Request::builder()
            .uri("/index.html")
            .body(Body::empty())
            .unwrap();
        let response = t.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("gate_client="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert_eq!(t.registry.client_count(), 1);
    }

    #[tokio::test]
    async fn test_known_cookie_is_not_reissued() {
        let t = test_app();
        let response = t.app.oneshot(get_page("/", CLIENT_A)).await.unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_login_then_dashboard() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                CLIENT_A,
                json!({ "email": seed_email(Role::Company), "password": SEED_PASSWORD }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["redirect_to"], "/dashboard/company-dashboard.html");
        assert_eq!(body["user"]["role"], "company");

        let response = t
            .app
            .clone()
            .oneshot(get_page("/dashboard/company-dashboard.html", CLIENT_A))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Another browser is still anonymous
        let response = t
            .app
            .oneshot(get_page("/dashboard/company-dashboard.html", CLIENT_B))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_foreign_dashboard_redirects_every_time() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                CLIENT_A,
                json!({ "email": seed_email(Role::Company), "password": SEED_PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..2 {
            let response = t
                .app
                .clone()
                .oneshot(get_page("/dashboard/employee-dashboard.html", CLIENT_A))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                response.headers().get(header::LOCATION).unwrap(),
                "/dashboard/company-dashboard.html"
            );
        }
    }

    #[tokio::test]
    async fn test_throttled_login_answers_429() {
        let t = test_app();
        let attempt = || {
            post_json(
                "/api/auth/login",
                CLIENT_A,
                json!({ "email": "x@y.io", "password": "nope" }),
            )
        };

        let first = t.app.clone().oneshot(attempt()).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

        t.clock.advance(Duration::from_secs(18));
        let second = t.app.clone().oneshot(attempt()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers().get(header::RETRY_AFTER).unwrap(), "12");
        let body = json_body(second).await;
        assert_eq!(body["message"], "Please wait 12 seconds before trying again.");
    }

    #[tokio::test]
    async fn test_clients_do_not_share_throttle() {
        let t = test_app();
        let attempt = |client| {
            post_json(
                "/api/auth/login",
                client,
                json!({ "email": "x@y.io", "password": "nope" }),
            )
        };

        t.app.clone().oneshot(attempt(CLIENT_A)).await.unwrap();
        let other = t.app.clone().oneshot(attempt(CLIENT_B)).await.unwrap();
        assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_failures_do_not_reveal_accounts() {
        let t = test_app();
        let known = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                CLIENT_A,
                json!({ "email": seed_email(Role::Employee), "password": "wrong password" }),
            ))
            .await
            .unwrap();
        let unknown = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                CLIENT_B,
                json!({ "email": "ghost@example.com", "password": "wrong password" }),
            ))
            .await
            .unwrap();

        let (known_status, unknown_status) = (known.status().as_u16(), unknown.status().as_u16());
        let known_body = json_body(known).await.to_string();
        let unknown_body = json_body(unknown).await.to_string();
        let result =
            check_user_enumeration(known_status, &known_body, unknown_status, &unknown_body);
        assert!(!result.vulnerable, "{:?}", result.issues);
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let t = test_app();
        let invalid = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                CLIENT_A,
                json!({
                    "email": "new@co.io",
                    "password": "short",
                    "full_name": "New Person",
                    "role": "company"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(invalid).await["field"], "password");

        let conflict = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                CLIENT_A,
                json!({
                    "email": seed_email(Role::Startup),
                    "password": "long enough",
                    "full_name": "Copy Cat",
                    "role": "startup"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let created = t
            .app
            .oneshot(post_json(
                "/api/auth/register",
                CLIENT_A,
                json!({
                    "email": "new@co.io",
                    "password": "long enough",
                    "full_name": "New Person",
                    "role": "freelancer"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        assert_eq!(json_body(created).await["redirect_to"], "/dashboard/freelancer-dashboard.html");
    }

    #[tokio::test]
    async fn test_logout_and_session_endpoint() {
        let t = test_app();
        t.app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                CLIENT_A,
                json!({ "email": seed_email(Role::Recruitment), "password": SEED_PASSWORD }),
            ))
            .await
            .unwrap();

        let response = t
            .app
            .clone()
            .oneshot(get_page("/api/auth/session", CLIENT_A))
            .await
            .unwrap();
        let session = json_body(response).await;
        assert_eq!(session["authenticated"], true);
        assert_eq!(session["user"]["role"], "recruitment");
        assert_eq!(session["throttle"]["attempt_count"], 0);

        let logout = t
            .app
            .clone()
            .oneshot(post_json("/api/auth/logout", CLIENT_A, json!({})))
            .await
            .unwrap();
        assert_eq!(json_body(logout).await["redirect_to"], "/login.html");

        let response = t.app.oneshot(get_page("/api/auth/session", CLIENT_A)).await.unwrap();
        let session = json_body(response).await;
        assert_eq!(session["authenticated"], false);
        assert_eq!(session["user"], Value::Null);
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let t = test_app();
        t.registry.gate_for(CLIENT_A);
        t.clock.advance(Duration::from_secs(60));
        t.registry.gate_for(CLIENT_B);

        assert_eq!(t.registry.evict_idle(Duration::from_secs(30)), 1);
        assert_eq!(t.registry.client_count(), 1);
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; gate_client=abc; other=1"),
        );
        assert_eq!(read_cookie(&headers, "gate_client"), Some("abc"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_is_client_id() {
        assert!(is_client_id(CLIENT_A));
        assert!(!is_client_id("abc"));
        assert!(!is_client_id("0123456789ABCDEF0123456789ABCDEF"));
    }
}
