//! Identity Model
//!
//! Account roles, verified principals, and the static role → dashboard map.
//!
//! The credential provider only vouches for *who* somebody is ([`Principal`]).
//! *What* they may see comes from the role stored in their profile record.
//! Joining the two yields an [`Identity`], the only thing the router ever
//! reasons about.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Roles
// ============================================================================

/// Account category that determines which dashboard a user may access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Individual job seeker / employee
    Employee,
    /// Established company account
    Company,
    /// Startup account
    Startup,
    /// Independent freelancer
    Freelancer,
    /// Recruitment agency
    Recruitment,
    /// Platform operator
    Admin,
}

/// Every role paired with its canonical dashboard path.
///
/// Immutable, process-wide. [`Role::home_path`] reads from here.
pub const ROLE_HOME_MAP: [(Role, &str); 6] = [
    (Role::Employee, "/dashboard/employee-dashboard.html"),
    (Role::Company, "/dashboard/company-dashboard.html"),
    (Role::Startup, "/dashboard/startup-dashboard.html"),
    (Role::Freelancer, "/dashboard/freelancer-dashboard.html"),
    (Role::Recruitment, "/dashboard/recruitment-dashboard.html"),
    (Role::Admin, "/dashboard/admin-dashboard.html"),
];

impl Role {
    /// All roles, in declaration order
    pub const ALL: [Role; 6] = [
        Role::Employee,
        Role::Company,
        Role::Startup,
        Role::Freelancer,
        Role::Recruitment,
        Role::Admin,
    ];

    /// Roles a visitor may pick on the signup form.
    ///
    /// Admin accounts are provisioned out of band.
    pub const SELF_SERVICE: [Role; 5] = [
        Role::Employee,
        Role::Company,
        Role::Startup,
        Role::Freelancer,
        Role::Recruitment,
    ];

    /// Lowercase name as stored in profile records and used in URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Company => "company",
            Self::Startup => "startup",
            Self::Freelancer => "freelancer",
            Self::Recruitment => "recruitment",
            Self::Admin => "admin",
        }
    }

    /// Canonical dashboard path for this role
    pub fn home_path(&self) -> &'static str {
        ROLE_HOME_MAP
            .iter()
            .find(|(role, _)| role == self)
            .map(|(_, path)| *path)
            .unwrap_or("/")
    }

    /// Whether the signup form may create accounts with this role
    pub fn is_self_service(&self) -> bool {
        Self::SELF_SERVICE.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or requested role name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// ============================================================================
// Principals and Identities
// ============================================================================

/// A user the credential provider has verified, without any role attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque provider-assigned identifier
    pub id: String,
    /// Email the account signed in with
    pub email: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Attach the role read from the profile record
    pub fn with_role(self, role: Role) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            role,
        }
    }
}

/// A verified user together with their role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Dashboard this identity is sent to after login
    pub fn home_path(&self) -> &'static str {
        self.role.home_path()
    }
}

/// Profile record written at registration and keyed by identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub identity_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}
