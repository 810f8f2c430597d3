//! User model and roles.
//!
//! Identity issuance is external; the core receives a verified user id and
//! role on every request and trusts only those.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Roles recognized by the redemption core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Claims offers and presents proof tokens.
    Student,
    /// Validates tokens, confirms bills, and voids redemptions.
    Merchant,
    /// May drive both sides.
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Merchant => "merchant",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as the core sees it: existence plus display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: UserRole,
}

#[cfg(any(test, feature = "test-helpers"))]
impl User {
    pub fn dummy(display_name: &str, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            display_name: display_name.to_string(),
            role,
        }
    }
}
