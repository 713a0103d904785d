//! Credential and Profile Stores
//!
//! The gate never talks to an identity provider or document database
//! directly. It goes through two traits:
//!
//! - [`CredentialStore`]: verifies email/password pairs, reports who is
//!   currently signed in on *this* client, registers and signs out accounts.
//! - [`ProfileStore`]: maps an identity id to its [`Role`].
//!
//! Trait methods return boxed futures so the stores can be used as trait
//! objects from any tokio task.
//!
//! # Provided implementation
//!
//! [`MemoryDirectory`] keeps accounts and profiles in memory. It is the
//! [`ProfileStore`] and, through [`CredentialStoreFactory::open`], hands out
//! one [`MemoryCredentialStore`] per client, each with its own
//! "currently signed in" slot:
//!
//! ```ignore
//! use specyf_gate::store::{CredentialStoreFactory, MemoryDirectory};
//!
//! let directory = MemoryDirectory::new();
//! let browser_a = directory.open();
//! let browser_b = directory.open(); // signing in on A does not sign in B
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::crypto::{random_hex, PasswordDigest};
use crate::error::{AuthError, ProfileError};
use crate::identity::{Principal, Profile, Role};

/// Boxed future returned by store methods
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Store Traits
// ============================================================================

/// Credential provider, scoped to one client (browser context).
pub trait CredentialStore: Send + Sync {
    /// Verify credentials and mark the account as signed in on this client
    fn verify<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>>;

    /// Who is signed in on this client, if anyone.
    ///
    /// Single-shot: resolves once per call.
    fn current_identity(&self) -> StoreFuture<'_, Result<Option<Principal>, AuthError>>;

    /// Create an account and sign it in on this client
    fn register<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>>;

    /// Sign out whoever is signed in on this client
    fn sign_out(&self) -> StoreFuture<'_, Result<(), AuthError>>;
}

/// Hands out client-scoped credential stores
pub trait CredentialStoreFactory: Send + Sync {
    fn open(&self) -> Arc<dyn CredentialStore>;
}

/// Profile records keyed by identity id
pub trait ProfileStore: Send + Sync {
    /// Role stored for `identity_id`
    fn get_role<'a>(&'a self, identity_id: &'a str) -> StoreFuture<'a, Result<Role, ProfileError>>;

    /// Create or replace a profile record
    fn put_profile<'a>(&'a self, profile: &'a Profile) -> StoreFuture<'a, Result<(), ProfileError>>;
}

// ============================================================================
// In-Memory Directory
// ============================================================================

#[derive(Debug)]
struct AccountRecord {
    id: String,
    email: String,
    password: PasswordDigest,
}

/// Profile as stored: the role is kept as raw text, like a document field,
/// and only parsed on read.
#[derive(Debug, Clone)]
struct StoredProfile {
    email: String,
    full_name: String,
    role: String,
}

#[derive(Debug, Default)]
struct DirectoryInner {
    /// Keyed by lowercased email
    accounts: RwLock<HashMap<String, AccountRecord>>,
    /// Keyed by identity id
    profiles: RwLock<HashMap<String, StoredProfile>>,
}

/// In-memory account and profile directory.
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<DirectoryInner>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account with a profile in one step (seeding, admin setup)
    pub fn provision(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Principal, AuthError> {
        let principal = self.create_account(email, password)?;
        self.inner.profiles.write().insert(
            principal.id.clone(),
            StoredProfile {
                email: principal.email.clone(),
                full_name: full_name.to_string(),
                role: role.as_str().to_string(),
            },
        );
        Ok(principal)
    }

    /// Overwrite the stored role text for an identity, bypassing validation
    pub fn set_raw_role(&self, identity_id: &str, role: &str) {
        if let Some(profile) = self.inner.profiles.write().get_mut(identity_id) {
            profile.role = role.to_string();
        }
    }

    /// Delete a profile record, leaving the account in place
    pub fn remove_profile(&self, identity_id: &str) -> bool {
        self.inner.profiles.write().remove(identity_id).is_some()
    }

    /// Stored profile for an identity, if the role is recognized
    pub fn profile(&self, identity_id: &str) -> Option<Profile> {
        let profiles = self.inner.profiles.read();
        let stored = profiles.get(identity_id)?;
        Some(Profile {
            identity_id: identity_id.to_string(),
            email: stored.email.clone(),
            full_name: stored.full_name.clone(),
            role: stored.role.parse().ok()?,
        })
    }

    pub fn account_count(&self) -> usize {
        self.inner.accounts.read().len()
    }

    fn create_account(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let key = email.trim().to_ascii_lowercase();
        let mut accounts = self.inner.accounts.write();
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let record = AccountRecord {
            id: random_hex(14),
            email: email.trim().to_string(),
            password: PasswordDigest::new(password),
        };
        let principal = Principal::new(record.id.clone(), record.email.clone());
        accounts.insert(key, record);
        Ok(principal)
    }

    fn check_credentials(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let key = email.trim().to_ascii_lowercase();
        let accounts = self.inner.accounts.read();
        match accounts.get(&key) {
            Some(record) if record.password.verify(password) => {
                Ok(Principal::new(record.id.clone(), record.email.clone()))
            }
            // Unknown email and wrong password are reported identically
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn account_exists(&self, identity_id: &str) -> bool {
        self.inner.accounts.read().values().any(|record| record.id == identity_id)
    }
}

impl CredentialStoreFactory for MemoryDirectory {
    fn open(&self) -> Arc<dyn CredentialStore> {
        Arc::new(MemoryCredentialStore::new(self.clone()))
    }
}

impl ProfileStore for MemoryDirectory {
    fn get_role<'a>(&'a self, identity_id: &'a str) -> StoreFuture<'a, Result<Role, ProfileError>> {
        Box::pin(async move {
            let profiles = self.inner.profiles.read();
            let stored = profiles.get(identity_id).ok_or(ProfileError::NotFound)?;
            stored
                .role
                .parse()
                .map_err(|_| ProfileError::UnrecognizedRole(stored.role.clone()))
        })
    }

    fn put_profile<'a>(
        &'a self,
        profile: &'a Profile,
    ) -> StoreFuture<'a, Result<(), ProfileError>> {
        Box::pin(async move {
            self.inner.profiles.write().insert(
                profile.identity_id.clone(),
                StoredProfile {
                    email: profile.email.clone(),
                    full_name: profile.full_name.clone(),
                    role: profile.role.as_str().to_string(),
                },
            );
            Ok(())
        })
    }
}

// ============================================================================
// Client-Scoped Credential Store
// ============================================================================

/// One client's view of a [`MemoryDirectory`]
#[derive(Debug)]
pub struct MemoryCredentialStore {
    directory: MemoryDirectory,
    signed_in: Mutex<Option<Principal>>,
}

impl MemoryCredentialStore {
    pub fn new(directory: MemoryDirectory) -> Self {
        Self {
            directory,
            signed_in: Mutex::new(None),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn verify<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move {
            let principal = self.directory.check_credentials(email, password)?;
            *self.signed_in.lock() = Some(principal.clone());
            Ok(principal)
        })
    }

    fn current_identity(&self) -> StoreFuture<'_, Result<Option<Principal>, AuthError>> {
        Box::pin(async move {
            let mut slot = self.signed_in.lock();
            // Accounts deleted elsewhere stop being signed in here
            if slot.as_ref().is_some_and(|p| !self.directory.account_exists(&p.id)) {
                *slot = None;
            }
            Ok(slot.clone())
        })
    }

    fn register<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> StoreFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move {
            let principal = self.directory.create_account(email, password)?;
            *self.signed_in.lock() = Some(principal.clone());
            Ok(principal)
        })
    }

    fn sign_out(&self) -> StoreFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.signed_in.lock().take();
            Ok(())
        })
    }
}
