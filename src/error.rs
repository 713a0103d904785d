//! Error Taxonomy
//!
//! Errors fall in two groups:
//!
//! - **User-facing**: throttle, credential and validation failures. These reach
//!   the login/signup form verbatim, with a human-readable countdown where one
//!   applies.
//! - **Operator-facing**: profile and session-resolution failures. These are
//!   logged and then collapse to "unauthenticated" (or the generic
//!   [`GateError::AccountUnavailable`]) so a visitor can never tell a missing
//!   profile apart from a bad password.
//!
//! Nothing here is fatal: every failure path ends in a defined session,
//! route decision or HTTP response.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::validation::ValidationError;

// ============================================================================
// Component Errors
// ============================================================================

/// Login attempt rejected by the throttler before the provider is contacted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ThrottleError {
    /// Too soon after the previous attempt
    #[error("please wait {retry_after_secs} seconds before trying again")]
    Cooldown {
        retry_after_secs: u64,
    },
    /// Attempt budget exhausted, or the provider asked us to back off
    #[error("too many login attempts, retry in {retry_after_secs} seconds")]
    Blocked {
        retry_after_secs: u64,
    },
}

impl ThrottleError {
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Cooldown { retry_after_secs } | Self::Blocked { retry_after_secs } => {
                *retry_after_secs
            }
        }
    }
}

/// Failure reported by the credential provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("credential provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("credential provider is rate limiting this client")]
    TooManyProviderRequests,
    #[error("email is already registered")]
    EmailAlreadyRegistered,
}

/// Failure reading or writing a profile record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile record not found")]
    NotFound,
    #[error("profile record carries unrecognized role {0:?}")]
    UnrecognizedRole(String),
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Why session resolution degraded to unauthenticated.
///
/// Logged for operators, never shown to the visitor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("identity {identity_id} has no profile record")]
    ProfileMissing {
        identity_id: String,
    },
    #[error("identity {identity_id} has unrecognized role {role:?}")]
    UnrecognizedRole {
        identity_id: String,
        role: String,
    },
    #[error("provider failure during resolution: {0}")]
    Provider(String),
}

impl ResolutionError {
    pub(crate) fn from_profile(identity_id: &str, err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound => Self::ProfileMissing {
                identity_id: identity_id.to_string(),
            },
            ProfileError::UnrecognizedRole(role) => Self::UnrecognizedRole {
                identity_id: identity_id.to_string(),
                role,
            },
            ProfileError::Unavailable(msg) => Self::Provider(msg),
        }
    }
}

// ============================================================================
// Gate Errors (login / signup surface)
// ============================================================================

/// Error returned by [`crate::DashboardGate::attempt_login`] and
/// [`crate::DashboardGate::attempt_signup`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Throttled(#[from] ThrottleError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// Credentials were fine but the account cannot be routed
    /// (missing or malformed profile, profile store down)
    #[error("account unavailable")]
    AccountUnavailable,
}

impl GateError {
    /// Message suitable for display on the login or signup form
    pub fn user_message(&self) -> String {
        match self {
            Self::Throttled(ThrottleError::Cooldown { retry_after_secs }) => {
                format!("Please wait {} seconds before trying again.", retry_after_secs)
            }
            Self::Throttled(ThrottleError::Blocked { retry_after_secs }) => {
                let minutes = retry_after_secs.div_ceil(60).max(1);
                format!("Too many login attempts. Please try again in {} minutes.", minutes)
            }
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password.".to_string(),
            Self::Auth(AuthError::TooManyProviderRequests) => {
                "Account temporarily locked due to too many login attempts. \
                 Please try again in 15 minutes."
                    .to_string()
            }
            Self::Auth(AuthError::EmailAlreadyRegistered) => {
                "Email is already registered.".to_string()
            }
            Self::Auth(AuthError::ProviderUnavailable(_)) | Self::AccountUnavailable => {
                "Login failed. Please try again later.".to_string()
            }
            Self::Invalid(err) => err.message.clone(),
        }
    }

    /// Seconds the client should wait before retrying, if applicable
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Throttled(err) => Some(err.retry_after_secs()),
            _ => None,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Throttled(ThrottleError::Cooldown { .. }) => "login_cooldown",
            Self::Throttled(ThrottleError::Blocked { .. }) => "too_many_attempts",
            Self::Auth(AuthError::InvalidCredentials) => "invalid_credentials",
            Self::Auth(AuthError::ProviderUnavailable(_)) => "provider_unavailable",
            Self::Auth(AuthError::TooManyProviderRequests) => "too_many_attempts",
            Self::Auth(AuthError::EmailAlreadyRegistered) => "email_in_use",
            Self::Invalid(_) => "validation_failed",
            Self::AccountUnavailable => "account_unavailable",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Throttled(_) | Self::Auth(AuthError::TooManyProviderRequests) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Auth(AuthError::InvalidCredentials) | Self::AccountUnavailable => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::ProviderUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::EmailAlreadyRegistered) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.code(),
            "message": self.user_message(),
        });

        if let Some(field) = match &self {
            Self::Invalid(err) => err.field.clone(),
            _ => None,
        } {
            body["field"] = json!(field);
        }

        match self.retry_after_secs() {
            Some(secs) => {
                body["retry_after"] = json!(secs);
                (status, [(header::RETRY_AFTER, secs.to_string())], Json(body)).into_response()
            }
            None => (status, Json(body)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorCode;

    #[test]
    fn test_cooldown_message_counts_seconds() {
        let err = GateError::from(ThrottleError::Cooldown { retry_after_secs: 12 });
        assert_eq!(err.user_message(), "Please wait 12 seconds before trying again.");
        assert_eq!(err.retry_after_secs(), Some(12));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_blocked_message_rounds_up_to_minutes() {
        let err = GateError::from(ThrottleError::Blocked { retry_after_secs: 900 });
        assert_eq!(
            err.user_message(),
            "Too many login attempts. Please try again in 15 minutes."
        );

        let err = GateError::from(ThrottleError::Blocked { retry_after_secs: 61 });
        assert!(err.user_message().contains("2 minutes"));
    }

    #[test]
    fn test_profile_failures_are_indistinguishable_from_provider_outage() {
        let outage = GateError::from(AuthError::ProviderUnavailable("timeout".into()));
        assert_eq!(outage.user_message(), GateError::AccountUnavailable.user_message());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GateError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GateError::from(AuthError::EmailAlreadyRegistered).status_code(),
            StatusCode::CONFLICT
        );
        let invalid = ValidationError::for_field(
            "email",
            ValidationErrorCode::InvalidEmail,
            "Invalid email format",
        );
        assert_eq!(
            GateError::from(invalid).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_into_response_sets_retry_after_header() {
        let response =
            GateError::from(ThrottleError::Blocked { retry_after_secs: 900 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "900");
    }

    #[test]
    fn test_resolution_error_from_profile() {
        assert_eq!(
            ResolutionError::from_profile("u1", ProfileError::NotFound),
            ResolutionError::ProfileMissing { identity_id: "u1".into() }
        );
        assert!(matches!(
            ResolutionError::from_profile("u1", ProfileError::UnrecognizedRole("ceo".into())),
            ResolutionError::UnrecognizedRole { .. }
        ));
    }
}
