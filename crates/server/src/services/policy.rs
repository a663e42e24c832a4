//! Access policy evaluation.
//!
//! A single pure decision function keeps role checks out of query building
//! and aggregation. Callers verify resource existence *before* asking for a
//! decision, so a caller without access still sees `NotFound` for resources
//! that do not exist, and `Forbidden` only for resources that do.

use rately_core::{Role, UserId};

use crate::error::AppError;

/// The identity making a request, as injected by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub role: Role,
}

impl Requester {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// An action subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Administrative read/list/stats surface.
    AdminOnly,
    /// Update or delete a rating owned by `owner`. Ownership is personal:
    /// admins cannot mutate other users' ratings.
    MutateRating { owner: UserId },
    /// Read ratings or statistics scoped to a store owned by `store_owner`.
    ViewStoreRatings { store_owner: UserId },
    /// Read ratings submitted by `target`.
    ViewUserRatings { target: UserId },
}

/// A denied policy decision with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PolicyDenial(pub &'static str);

impl From<PolicyDenial> for AppError {
    fn from(denial: PolicyDenial) -> Self {
        Self::Forbidden(denial.to_string())
    }
}

/// Decide whether `requester` may perform `action`.
///
/// # Errors
///
/// Returns a [`PolicyDenial`] naming the violated rule.
pub const fn authorize(requester: Requester, action: Action) -> Result<(), PolicyDenial> {
    match action {
        Action::AdminOnly => {
            if requester.role.is_admin() {
                Ok(())
            } else {
                Err(PolicyDenial("admin access required"))
            }
        }
        Action::MutateRating { owner } => {
            if requester.id.as_i32() == owner.as_i32() {
                Ok(())
            } else {
                Err(PolicyDenial("you can only modify your own ratings"))
            }
        }
        Action::ViewStoreRatings { store_owner } => {
            if requester.role.is_admin()
                || (matches!(requester.role, Role::StoreOwner)
                    && requester.id.as_i32() == store_owner.as_i32())
            {
                Ok(())
            } else {
                Err(PolicyDenial("you can only view ratings for your own store"))
            }
        }
        Action::ViewUserRatings { target } => {
            if requester.role.is_admin() || requester.id.as_i32() == target.as_i32() {
                Ok(())
            } else {
                Err(PolicyDenial("you can only view your own ratings"))
            }
        }
    }
}
