//! Domain models, query types, and response projections.
//!
//! Domain records (what the repository returns) are separate from the
//! role-shaped views (what handlers serialize). Shaping happens once at the
//! service layer, never inside query building.

pub mod query;
pub mod rating;
pub mod store;
pub mod user;
pub mod views;

pub use query::{PageWindow, Paged, Pagination, SortBy, SortOrder, SortSpec, StoreFilter, StoreQuery};
pub use rating::{Rating, RatingRecord, RatingStats, StoreRatingRow};
pub use store::{NewStore, Store, StorePatch, StoreRecord, StoreRef};
pub use user::{OwnerSummary, UserRef};
