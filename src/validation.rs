//! Signup Input Validation
//!
//! Shape checks applied to the signup form before the credential provider is
//! asked to create an account:
//!
//! - email: one `@`, non-empty local part, dotted domain
//! - password: at least 8 characters
//! - full name: at least 2 non-blank characters
//! - role: one of the self-service roles (never `admin`)
//!
//! Login submissions are *not* validated here. A malformed login simply fails
//! verification, and still counts against the throttle.

use std::fmt;

use serde::Deserialize;

use crate::identity::Role;

/// Minimum password length accepted at signup
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Upper bound on password length (bounds hashing work)
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation (if applicable)
    pub field: Option<String>,
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: None,
            code,
            message: message.into(),
        }
    }

    pub fn for_field(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// Value is required but missing/empty
    Required,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Email format is invalid
    InvalidEmail,
    /// Value is not in allowed set
    NotAllowed,
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::TooShort => write!(f, "too_short"),
            Self::TooLong => write!(f, "too_long"),
            Self::InvalidEmail => write!(f, "invalid_email"),
            Self::NotAllowed => write!(f, "not_allowed"),
        }
    }
}

/// Types that can check their own shape
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// ============================================================================
// Field Validators
// ============================================================================

/// Validate that a string is not blank
pub fn validate_required(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::Required,
            "All fields are required",
        ));
    }
    Ok(())
}

/// Validate string length bounds (in characters, inclusive)
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooShort,
            format!("Must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("Must be at most {} characters", max),
        ));
    }
    Ok(())
}

/// Validate email shape: `local@domain.tld`, no whitespace
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let invalid = || {
        ValidationError::for_field(
            "email",
            ValidationErrorCode::InvalidEmail,
            "Invalid email format",
        )
    };

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return Err(invalid());
    }

    // Domain needs a dot with something on both sides of it
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() && !host.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Parse a requested role and check it may be self-assigned
pub fn validate_signup_role(value: &str) -> Result<Role, ValidationError> {
    let invalid = || {
        ValidationError::for_field("role", ValidationErrorCode::NotAllowed, "Invalid user type")
    };

    let role: Role = value.parse().map_err(|_| invalid())?;
    if !role.is_self_service() {
        return Err(invalid());
    }
    Ok(role)
}

// ============================================================================
// Signup Request
// ============================================================================

/// Signup form submission
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// Requested role, by name (`"company"`, `"freelancer"`, ...)
    pub role: String,
}

impl SignupRequest {
    /// Role the visitor asked for, if it is a self-service role
    pub fn requested_role(&self) -> Result<Role, ValidationError> {
        validate_signup_role(&self.role)
    }
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_required(&self.email, "email")?;
        validate_required(&self.password, "password")?;
        validate_required(&self.full_name, "full_name")?;
        validate_required(&self.role, "role")?;

        validate_email(&self.email)?;
        validate_length(&self.password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, "password")?;
        validate_length(self.full_name.trim(), 2, 100, "full_name")?;
        self.requested_role()?;
        Ok(())
    }
}
