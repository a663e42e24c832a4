//! HTTP middleware and extractors.
//!
//! Identity arrives as `x-user-id` / `x-user-role` headers injected by the
//! auth gateway in front of this service; the extractors here turn them
//! into a [`crate::services::policy::Requester`].

pub mod auth;

pub use auth::{OptionalAuth, RequireAuth};
