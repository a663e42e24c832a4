//! Store service behavior against the in-memory entity store.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use rately_core::{Email, RatingValue, Role, StoreId, UserId};
use rately_integration_tests::MemoryStore;
use rately_server::db::EntityStore;
use rately_server::error::AppError;
use rately_server::models::{NewStore, SortBy, SortOrder, StorePatch, StoreQuery};
use rately_server::services::policy::Requester;
use rately_server::services::{RatingService, StoreService};

struct Fixture {
    store: Arc<MemoryStore>,
    stores: StoreService,
    ratings: RatingService,
    admin: Requester,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let admin_id = store.seed_user("Ada Admin", "ada@example.com", Role::Admin);
    Fixture {
        stores: StoreService::new(Arc::clone(&store) as Arc<dyn EntityStore>),
        ratings: RatingService::new(Arc::clone(&store) as Arc<dyn EntityStore>),
        store,
        admin: Requester::new(admin_id, Role::Admin),
    }
}

impl Fixture {
    /// Seed an owner plus their store and return both ids.
    fn seed_owned_store(&self, name: &str, email: &str, address: Option<&str>) -> (UserId, StoreId) {
        let owner_email = format!("owner-{email}");
        let owner_id = self
            .store
            .seed_user("Olive Owner", &owner_email, Role::StoreOwner);
        let store_id = self.store.seed_store(name, email, address, owner_id);
        (owner_id, store_id)
    }

    fn seed_rater(&self, email: &str) -> Requester {
        Requester::new(
            self.store.seed_user("Rater", email, Role::NormalUser),
            Role::NormalUser,
        )
    }
}

fn new_store(name: &str, email: &str, owner_id: UserId) -> NewStore {
    NewStore {
        name: name.to_string(),
        email: Email::parse(email).unwrap(),
        address: None,
        owner_id,
    }
}

fn value(raw: i16) -> RatingValue {
    RatingValue::new(raw).unwrap()
}

#[tokio::test]
async fn create_returns_owner_and_zeroed_aggregates() {
    let fx = fixture();
    let owner_id = fx
        .store
        .seed_user("Olive Owner", "olive@example.com", Role::StoreOwner);

    let view = fx
        .stores
        .create(fx.admin, new_store("Pizza Palace", "palace@example.com", owner_id))
        .await
        .unwrap();
    assert_eq!(view.name, "Pizza Palace");
    assert_eq!(view.owner_id, owner_id);
    assert_eq!(view.owner.email.as_str(), "olive@example.com");
    assert_eq!(view.average_rating, 0.0);
    assert_eq!(view.total_ratings, 0);
}

#[tokio::test]
async fn create_requires_admin() {
    let fx = fixture();
    let rater = fx.seed_rater("nina@example.com");
    let err = fx
        .stores
        .create(rater, new_store("Pizza Palace", "palace@example.com", rater.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn create_with_missing_owner_is_not_found() {
    let fx = fixture();
    let err = fx
        .stores
        .create(
            fx.admin,
            new_store("Pizza Palace", "palace@example.com", UserId::new(999)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn create_with_taken_email_conflicts_even_when_owner_is_missing() {
    let fx = fixture();
    fx.seed_owned_store("Pizza Palace", "palace@example.com", None);

    // The email check runs first, so the conflict wins over the bad owner.
    let err = fx
        .stores
        .create(
            fx.admin,
            new_store("Copycat", "palace@example.com", UserId::new(999)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn second_store_for_same_owner_conflicts() {
    let fx = fixture();
    let (owner_id, _) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);

    let err = fx
        .stores
        .create(fx.admin, new_store("Side Hustle", "side@example.com", owner_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn listing_paginates_with_a_ceiling_page_count() {
    let fx = fixture();
    for i in 0..25 {
        fx.seed_owned_store(&format!("Store {i:02}"), &format!("s{i}@example.com"), None);
    }

    let page1 = fx
        .stores
        .list(fx.admin, &StoreQuery::default())
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 10);
    assert_eq!(page1.pagination.total, 25);
    assert_eq!(page1.pagination.pages, 3);
    assert_eq!(page1.items[0].name, "Store 00");

    let page3 = fx
        .stores
        .list(
            fx.admin,
            &StoreQuery {
                page: 3,
                ..StoreQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page3.items.len(), 5);
    assert_eq!(page3.pagination.page, 3);

    // Past the end: empty page, same metadata.
    let page4 = fx
        .stores
        .list(
            fx.admin,
            &StoreQuery {
                page: 4,
                ..StoreQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(page4.items.is_empty());
    assert_eq!(page4.pagination.total, 25);
}

#[tokio::test]
async fn listing_rejects_out_of_range_bounds() {
    let fx = fixture();
    for bad in [
        StoreQuery {
            page: 0,
            ..StoreQuery::default()
        },
        StoreQuery {
            limit: 0,
            ..StoreQuery::default()
        },
        StoreQuery {
            limit: 101,
            ..StoreQuery::default()
        },
    ] {
        let err = fx.stores.list(fx.admin, &bad).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn search_matches_name_or_address_case_insensitively() {
    let fx = fixture();
    fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    fx.seed_owned_store("Burger Bar", "burger@example.com", Some("12 Pizza Road"));
    fx.seed_owned_store("Sushi Spot", "sushi@example.com", Some("9 Fish Lane"));

    let query = StoreQuery {
        search: Some("PIZZA".to_string()),
        ..StoreQuery::default()
    };
    let page = fx.stores.list(fx.admin, &query).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Burger Bar", "Pizza Palace"]);
    assert_eq!(page.pagination.total, 2);
}

#[tokio::test]
async fn search_wins_over_discrete_filters() {
    let fx = fixture();
    fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    fx.seed_owned_store("Burger Bar", "burger@example.com", None);

    let query = StoreQuery {
        search: Some("pizza".to_string()),
        name: Some("Burger".to_string()),
        ..StoreQuery::default()
    };
    let page = fx.stores.list(fx.admin, &query).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Pizza Palace");
}

#[tokio::test]
async fn sorting_respects_whitelisted_columns_and_direction() {
    let fx = fixture();
    fx.seed_owned_store("Bravo", "b@example.com", None);
    fx.seed_owned_store("Alpha", "a@example.com", None);
    fx.seed_owned_store("Charlie", "c@example.com", None);

    let query = StoreQuery {
        sort_by: SortBy::Name,
        sort_order: SortOrder::Desc,
        ..StoreQuery::default()
    };
    let page = fx.stores.list(fx.admin, &query).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Charlie", "Bravo", "Alpha"]);

    let query = StoreQuery {
        sort_by: SortBy::CreatedAt,
        ..StoreQuery::default()
    };
    let page = fx.stores.list(fx.admin, &query).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Bravo", "Alpha", "Charlie"]);
}

#[tokio::test]
async fn admin_listing_attaches_aggregates_per_store() {
    let fx = fixture();
    let (_, rated_id) = fx.seed_owned_store("Rated", "rated@example.com", None);
    fx.seed_owned_store("Unrated", "unrated@example.com", None);

    for (email, raw) in [("u1@example.com", 4), ("u2@example.com", 5)] {
        let rater = fx.seed_rater(email);
        fx.ratings.create(rater, rated_id, value(raw)).await.unwrap();
    }

    let page = fx
        .stores
        .list(fx.admin, &StoreQuery::default())
        .await
        .unwrap();
    let rated = page.items.iter().find(|s| s.id == rated_id).unwrap();
    assert_eq!(rated.average_rating, 4.5);
    assert_eq!(rated.total_ratings, 2);
    let unrated = page.items.iter().find(|s| s.id != rated_id).unwrap();
    assert_eq!(unrated.average_rating, 0.0);
    assert_eq!(unrated.total_ratings, 0);
}

#[tokio::test]
async fn public_listing_carries_the_viewer_rating() {
    let fx = fixture();
    let (_, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let viewer = fx.seed_rater("nina@example.com");
    let other = fx.seed_rater("omar@example.com");

    fx.ratings.create(viewer, store_id, value(2)).await.unwrap();
    fx.ratings.create(other, store_id, value(5)).await.unwrap();

    let page = fx
        .stores
        .list_public(&StoreQuery::default(), Some(viewer.id))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].user_rating, Some(2));
    assert_eq!(page.items[0].total_ratings, 2);
    assert_eq!(page.items[0].average_rating, 3.5);

    // Anonymous viewers see no personal rating.
    let page = fx
        .stores
        .list_public(&StoreQuery::default(), None)
        .await
        .unwrap();
    assert_eq!(page.items[0].user_rating, None);
}

#[tokio::test]
async fn public_listing_ignores_the_email_filter() {
    let fx = fixture();
    fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    fx.seed_owned_store("Burger Bar", "burger@example.com", None);

    let query = StoreQuery {
        email: Some("palace".to_string()),
        ..StoreQuery::default()
    };
    let public = fx.stores.list_public(&query, None).await.unwrap();
    assert_eq!(public.items.len(), 2);

    // The same query narrows the admin listing.
    let admin = fx.stores.list(fx.admin, &query).await.unwrap();
    assert_eq!(admin.items.len(), 1);
}

#[tokio::test]
async fn detail_view_includes_the_rating_list() {
    let fx = fixture();
    let (_, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let rater = fx.seed_rater("nina@example.com");
    fx.ratings.create(rater, store_id, value(4)).await.unwrap();

    let detail = fx.stores.get_by_id(fx.admin, store_id).await.unwrap();
    assert_eq!(detail.store.id, store_id);
    assert_eq!(detail.store.average_rating, 4.0);
    assert_eq!(detail.ratings.len(), 1);
    assert_eq!(detail.ratings[0].user_id, rater.id);

    let err = fx.stores.get_by_id(rater, store_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let err = fx
        .stores
        .get_by_id(fx.admin, StoreId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn update_applies_partial_patches() {
    let fx = fixture();
    let (_, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);

    let view = fx
        .stores
        .update(
            fx.admin,
            store_id,
            StorePatch {
                name: Some("Pizza Primo".to_string()),
                ..StorePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.name, "Pizza Primo");
    assert_eq!(view.email.as_str(), "palace@example.com");

    // An empty patch is a no-op read.
    let view = fx
        .stores
        .update(fx.admin, store_id, StorePatch::default())
        .await
        .unwrap();
    assert_eq!(view.name, "Pizza Primo");
}

#[tokio::test]
async fn update_rejects_an_email_already_in_use() {
    let fx = fixture();
    let (_, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    fx.seed_owned_store("Burger Bar", "burger@example.com", None);

    let err = fx
        .stores
        .update(
            fx.admin,
            store_id,
            StorePatch {
                email: Some(Email::parse("burger@example.com").unwrap()),
                ..StorePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // Re-submitting the current email is fine.
    fx.stores
        .update(
            fx.admin,
            store_id,
            StorePatch {
                email: Some(Email::parse("palace@example.com").unwrap()),
                ..StorePatch::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_removes_store_owner_and_ratings_atomically() {
    let fx = fixture();
    let (owner_id, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let rater = fx.seed_rater("nina@example.com");
    fx.ratings.create(rater, store_id, value(4)).await.unwrap();

    fx.stores.delete(fx.admin, store_id).await.unwrap();

    assert!(!fx.store.has_user(owner_id));
    let err = fx
        .stores
        .get_by_id(fx.admin, store_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    assert!(
        fx.ratings
            .for_user_and_store(rater.id, store_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn aborted_delete_leaves_everything_in_place() {
    let fx = fixture();
    let (owner_id, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let rater = fx.seed_rater("nina@example.com");
    fx.ratings.create(rater, store_id, value(4)).await.unwrap();

    fx.store.fail_next_owner_delete();
    let err = fx.stores.delete(fx.admin, store_id).await.unwrap_err();
    assert!(matches!(err, AppError::Repository(_)), "got {err:?}");

    assert!(fx.store.has_user(owner_id));
    assert!(fx.stores.get_by_id(fx.admin, store_id).await.is_ok());
    assert!(
        fx.ratings
            .for_user_and_store(rater.id, store_id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn public_page_serializes_with_camel_case_wire_names() {
    let fx = fixture();
    let (_, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let viewer = fx.seed_rater("nina@example.com");
    fx.ratings.create(viewer, store_id, value(4)).await.unwrap();

    let page = fx
        .stores
        .list_public(&StoreQuery::default(), Some(viewer.id))
        .await
        .unwrap();
    let json = serde_json::to_value(&page).unwrap();

    let item = &json["items"][0];
    assert_eq!(item["userRating"], 4);
    assert_eq!(item["averageRating"], 4.0);
    assert_eq!(item["totalRatings"], 1);
    // The public shape never carries the store email or owner.
    assert!(item.get("email").is_none());
    assert!(item.get("owner").is_none());

    assert_eq!(json["pagination"]["page"], 1);
    assert_eq!(json["pagination"]["limit"], 10);
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["pagination"]["pages"], 1);
}

#[tokio::test]
async fn dashboard_is_scoped_to_the_owning_store_owner() {
    let fx = fixture();
    let (owner_id, store_id) = fx.seed_owned_store("Pizza Palace", "palace@example.com", None);
    let owner = Requester::new(owner_id, Role::StoreOwner);
    let rater = fx.seed_rater("nina@example.com");
    fx.ratings.create(rater, store_id, value(5)).await.unwrap();

    let dashboard = fx.stores.dashboard(owner).await.unwrap();
    assert_eq!(dashboard.store.id, store_id);
    assert_eq!(dashboard.store.average_rating, 5.0);
    assert_eq!(dashboard.store.total_ratings, 1);
    assert_eq!(dashboard.ratings.len(), 1);
    assert_eq!(dashboard.ratings[0].user.id, rater.id);

    // Wrong role.
    let err = fx.stores.dashboard(rater).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    // Right role, no store.
    let storeless = Requester::new(
        fx.store
            .seed_user("Stan Storeless", "stan@example.com", Role::StoreOwner),
        Role::StoreOwner,
    );
    let err = fx.stores.dashboard(storeless).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}
