//! Business logic services.
//!
//! # Services
//!
//! - `policy` - pure allow/deny decisions for rating and store access
//! - `ratings` - rating lifecycle and aggregate computation
//! - `stores` - store CRUD, filtered/sorted/paginated listings, dashboard
//! - `dashboard` - global statistics for the admin dashboard
//!
//! Control flow for a request: the handler extracts the requester, the
//! service checks existence before policy (so absent resources read as
//! `NotFound`, never `Forbidden`), then executes against the entity store
//! and shapes the result for the requester's role.

pub mod dashboard;
pub mod policy;
pub mod ratings;
pub mod stores;

pub use dashboard::DashboardService;
pub use ratings::RatingService;
pub use stores::StoreService;
