//! Identity provider seam.
//!
//! Authentication lives outside the core; the only thing the core needs is
//! "who is the current user" for stamping `author` fields. Aggregates take an
//! [`IdentityProvider`] by constructor injection so tests and the composition
//! root can decide what identity means.

use serde::{Deserialize, Serialize};

/// The user as the core sees them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }
}

/// Source of the current user identity.
///
/// `None` means nobody is signed in; callers fall back to an anonymous
/// author rather than failing.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserProfile>;
}

/// Fixed identity — the test and single-user default.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    user: Option<UserProfile>,
}

impl StaticIdentity {
    /// A provider that always reports the given user.
    pub fn signed_in(user: UserProfile) -> Self {
        Self { user: Some(user) }
    }

    /// A provider with nobody signed in.
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserProfile> {
        self.user.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
