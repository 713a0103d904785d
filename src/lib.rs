//! # specyf-gate
//!
//! Session resolution, role routing and login throttling for a site with
//! role-specific dashboards.
//!
//! Every protected page asks a [`DashboardGate`] before it renders. The gate
//! works out who is signed in, whether their role may see the page, and
//! where to send them otherwise. Login and signup go through the same gate,
//! which throttles attempts per client.
//!
//! ## Features
//!
//! - **Login Throttling**: cooldown between attempts, block after repeated failures
//! - **Session Resolution**: one provider query per page load, short-lived identity cache
//! - **Role Routing**: typed routes, role homes, no substring matching on URLs
//! - **Loop Guard**: a redirect that would repeat is collapsed into a render
//! - **HTTP Surface**: axum middleware and `/api/auth/*` endpoints, one gate per client cookie
//! - **Structured Logging**: security events via `tracing`
//!
//! ## Quick Start
//!
//! ```ignore
//! use specyf_gate::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     observability::init(ObservabilityConfig::from_env())?;
//!
//!     let directory = MemoryDirectory::new();
//!     let registry = Arc::new(GateRegistry::new(
//!         Arc::new(directory.clone()),
//!         Arc::new(directory),
//!         GateConfig::from_env(),
//!     ));
//!
//!     let app = auth_routes()
//!         .fallback_service(tower_http::services::ServeDir::new("public"))
//!         .with_gate(registry);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
mod config;
mod crypto;
pub mod error;
pub mod gate;
pub mod http;
pub mod identity;
pub mod observability;
mod parse;
pub mod prelude;
pub mod router;
pub mod session;
pub mod store;
pub mod testing;
pub mod throttle;
pub mod validation;

// Re-exports
pub use clock::{Clock, SystemClock};
pub use config::{GateConfig, GateConfigBuilder};
pub use crypto::{constant_time_eq, constant_time_str_eq};
pub use error::{AuthError, GateError, ProfileError, ResolutionError, ThrottleError};
pub use gate::{DashboardGate, DashboardGateBuilder, Effect, LoginOutcome};
pub use identity::{Identity, Principal, Profile, Role, ROLE_HOME_MAP};
pub use observability::ObservabilityConfigBuilder;
pub use parse::parse_duration;
pub use router::{RoleRouter, Route, RouteConfig, RouteDecision};
pub use session::{Resolution, Session, SessionResolver};
pub use store::{
    CredentialStore, CredentialStoreFactory, MemoryCredentialStore, MemoryDirectory, ProfileStore,
};
pub use throttle::{LoginThrottler, ThrottlePolicy, ThrottleState};
