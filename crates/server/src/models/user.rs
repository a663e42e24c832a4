//! User projections.
//!
//! User administration lives outside this service; only the projections
//! joined into rating and store results are modeled here.

use serde::Serialize;

use rately_core::{Email, Role, UserId};

/// Minimal user projection attached to rating results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
}

/// Owner projection attached to admin-facing store results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerSummary {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Owner's email address.
    pub email: Email,
    /// Owner's postal address, if recorded.
    pub address: Option<String>,
    /// Role (always `STORE_OWNER` for a valid store owner).
    pub role: Role,
}
