//! Prelude - Common imports for gated applications
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::prelude::*;
//!
//! let app = auth_routes()
//!     .fallback(page_handler)
//!     .with_gate(Arc::new(GateRegistry::new(factory, profiles, GateConfig::from_env())));
//! ```
//!
//! # What's Included
//!
//! ## Core Configuration
//! - [`GateConfig`], [`GateConfigBuilder`], [`ThrottlePolicy`], [`RouteConfig`]
//!
//! ## Gate
//! - [`DashboardGate`], [`Effect`], [`LoginOutcome`], [`Session`], [`Identity`], [`Role`]
//!
//! ## Stores
//! - [`CredentialStore`], [`ProfileStore`], [`MemoryDirectory`]
//!
//! ## HTTP
//! - [`GateRegistry`], [`GatedRouter`], [`auth_routes`]
//!
//! ## Errors
//! - [`GateError`], [`ThrottleError`], [`AuthError`]
//!
//! ## Observability
//! - [`ObservabilityConfig`], [`SecurityEvent`]

// =============================================================================
// Core Configuration
// =============================================================================

pub use crate::config::{GateConfig, GateConfigBuilder};
pub use crate::router::RouteConfig;
pub use crate::throttle::ThrottlePolicy;

// =============================================================================
// Gate
// =============================================================================

pub use crate::gate::{DashboardGate, Effect, LoginOutcome};
pub use crate::identity::{Identity, Role};
pub use crate::router::RouteDecision;
pub use crate::session::Session;

// =============================================================================
// Stores
// =============================================================================

pub use crate::store::{CredentialStore, CredentialStoreFactory, MemoryDirectory, ProfileStore};

// =============================================================================
// HTTP
// =============================================================================

pub use crate::http::{auth_routes, GateRegistry, GatedRouter};

// =============================================================================
// Errors
// =============================================================================

pub use crate::error::{AuthError, GateError, ThrottleError};
pub use crate::validation::{SignupRequest, ValidationError};

// =============================================================================
// Observability
// =============================================================================

pub use crate::observability::{self, ObservabilityConfig, SecurityEvent};
pub use crate::security_event;
