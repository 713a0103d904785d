//! Security Event Logging
//!
//! Structured logging for everything the gate decides: sign-ins, throttling,
//! routing decisions and degraded session resolution.
//!
//! # Usage
//!
//! ```ignore
//! use specyf_gate::observability::SecurityEvent;
//!
//! specyf_gate::security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     email = %email,
//!     reason = "invalid_credentials",
//!     "Login failed"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Credentials verified and identity routed
    AuthenticationSuccess,
    /// Credentials rejected or account unusable
    AuthenticationFailure,
    /// User signed out
    Logout,
    /// Identity cached for the current session
    SessionCreated,
    /// Cached identity dropped
    SessionDestroyed,
    /// Session resolution degraded to unauthenticated
    SessionResolutionFailed,

    // Authorization events
    /// Page render allowed
    AccessGranted,
    /// Visitor redirected away from the requested page
    AccessDenied,

    // User management events
    /// New account registered through signup
    UserRegistered,

    // Throttling events
    /// Attempt rejected by cooldown or active block
    RateLimitExceeded,
    /// Login form blocked
    LoginBlocked,

    // Routing events
    /// A redirect was suppressed to avoid a loop
    RedirectLoopSuppressed,

    // System events
    /// Server started
    SystemStartup,
    /// Server stopped
    SystemShutdown,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::Logout
            | Self::SessionCreated
            | Self::SessionDestroyed
            | Self::SessionResolutionFailed => "authentication",

            Self::AccessGranted
            | Self::AccessDenied => "authorization",

            Self::UserRegistered => "user_management",

            Self::RateLimitExceeded
            | Self::LoginBlocked => "security",

            Self::RedirectLoopSuppressed => "routing",

            Self::SystemStartup
            | Self::SystemShutdown => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::LoginBlocked => Severity::Critical,

            Self::AuthenticationFailure
            | Self::SessionResolutionFailed
            | Self::RateLimitExceeded
            | Self::RedirectLoopSuppressed => Severity::High,

            Self::AuthenticationSuccess
            | Self::UserRegistered
            | Self::Logout => Severity::Medium,

            Self::SessionCreated
            | Self::SessionDestroyed
            | Self::AccessGranted
            | Self::AccessDenied
            | Self::SystemStartup
            | Self::SystemShutdown => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Logout => "logout",
            Self::SessionCreated => "session_created",
            Self::SessionDestroyed => "session_destroyed",
            Self::SessionResolutionFailed => "session_resolution_failed",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::UserRegistered => "user_registered",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::LoginBlocked => "login_blocked",
            Self::RedirectLoopSuppressed => "redirect_loop_suppressed",
            Self::SystemStartup => "system_startup",
            Self::SystemShutdown => "system_shutdown",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Every record carries `security_event`, `category` and `severity`; the
/// tracing level follows the severity (critical → error, high → warn,
/// medium → info, low → debug).
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        assert_eq!(SecurityEvent::AuthenticationSuccess.category(), "authentication");
        assert_eq!(SecurityEvent::AccessDenied.category(), "authorization");
        assert_eq!(SecurityEvent::UserRegistered.category(), "user_management");
        assert_eq!(SecurityEvent::LoginBlocked.category(), "security");
        assert_eq!(SecurityEvent::RedirectLoopSuppressed.category(), "routing");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(SecurityEvent::LoginBlocked.severity(), Severity::Critical);
        assert_eq!(SecurityEvent::SessionResolutionFailed.severity(), Severity::High);
        assert_eq!(SecurityEvent::UserRegistered.severity(), Severity::Medium);
        assert_eq!(SecurityEvent::AccessGranted.severity(), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_macro_accepts_fields() {
        // No subscriber installed; only checks the macro expands.
        crate::security_event!(
            SecurityEvent::AccessDenied,
            path = "/dashboard/company-dashboard.html",
            "Access denied"
        );
    }
}
