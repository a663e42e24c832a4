//! Rating service behavior against the in-memory entity store.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use rately_core::{RatingValue, Role, StoreId, UserId};
use rately_integration_tests::MemoryStore;
use rately_server::db::EntityStore;
use rately_server::error::AppError;
use rately_server::services::RatingService;
use rately_server::services::policy::Requester;

struct Fixture {
    store: Arc<MemoryStore>,
    ratings: RatingService,
    admin: Requester,
    owner: Requester,
    rater: Requester,
    store_id: StoreId,
}

/// One admin, one store owner with a store, and one normal user.
fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let admin_id = store.seed_user("Ada Admin", "ada@example.com", Role::Admin);
    let owner_id = store.seed_user("Olive Owner", "olive@example.com", Role::StoreOwner);
    let rater_id = store.seed_user("Nina Normal", "nina@example.com", Role::NormalUser);
    let store_id = store.seed_store("Pizza Palace", "palace@example.com", None, owner_id);

    let ratings = RatingService::new(Arc::clone(&store) as Arc<dyn EntityStore>);
    Fixture {
        store,
        ratings,
        admin: Requester::new(admin_id, Role::Admin),
        owner: Requester::new(owner_id, Role::StoreOwner),
        rater: Requester::new(rater_id, Role::NormalUser),
        store_id,
    }
}

fn value(raw: i16) -> RatingValue {
    RatingValue::new(raw).unwrap()
}

#[tokio::test]
async fn create_then_read_back() {
    let fx = fixture();

    let created = fx
        .ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();
    assert_eq!(created.rating, 4);
    assert_eq!(created.user_id, fx.rater.id);
    assert_eq!(created.store_id, fx.store_id);
    assert_eq!(created.store.name, "Pizza Palace");

    let found = fx
        .ratings
        .for_user_and_store(fx.rater.id, fx.store_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.rating, 4);
}

#[tokio::test]
async fn duplicate_rating_conflicts_and_leaves_original_intact() {
    let fx = fixture();

    fx.ratings
        .create(fx.rater, fx.store_id, value(5))
        .await
        .unwrap();
    let err = fx
        .ratings
        .create(fx.rater, fx.store_id, value(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let found = fx
        .ratings
        .for_user_and_store(fx.rater.id, fx.store_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.rating, 5);
}

#[tokio::test]
async fn create_for_missing_store_is_not_found() {
    let fx = fixture();
    let err = fx
        .ratings
        .create(fx.rater, StoreId::new(999), value(3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn update_own_rating_overwrites_value() {
    let fx = fixture();
    let created = fx
        .ratings
        .create(fx.rater, fx.store_id, value(2))
        .await
        .unwrap();

    let updated = fx
        .ratings
        .update(fx.rater, created.id, value(5))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.rating, 5);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn foreign_update_is_forbidden_and_changes_nothing() {
    let fx = fixture();
    let other = Requester::new(
        fx.store.seed_user("Omar Other", "omar@example.com", Role::NormalUser),
        Role::NormalUser,
    );

    let created = fx
        .ratings
        .create(fx.rater, fx.store_id, value(3))
        .await
        .unwrap();

    let err = fx
        .ratings
        .update(other, created.id, value(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    // Admins get no override either.
    let err = fx
        .ratings
        .update(fx.admin, created.id, value(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let found = fx
        .ratings
        .for_user_and_store(fx.rater.id, fx.store_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.rating, 3);
}

#[tokio::test]
async fn update_missing_rating_is_not_found() {
    let fx = fixture();
    let err = fx
        .ratings
        .update(fx.rater, rately_core::RatingId::new(404), value(4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn delete_frees_the_pair_for_a_new_rating() {
    let fx = fixture();
    let created = fx
        .ratings
        .create(fx.rater, fx.store_id, value(1))
        .await
        .unwrap();

    // Only the author may delete.
    let err = fx.ratings.delete(fx.admin, created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    fx.ratings.delete(fx.rater, created.id).await.unwrap();
    assert!(
        fx.ratings
            .for_user_and_store(fx.rater.id, fx.store_id)
            .await
            .unwrap()
            .is_none()
    );

    // The pair is free again.
    fx.ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();
}

#[tokio::test]
async fn for_user_and_store_is_read_only_and_repeatable() {
    let fx = fixture();
    assert!(
        fx.ratings
            .for_user_and_store(fx.rater.id, fx.store_id)
            .await
            .unwrap()
            .is_none()
    );

    fx.ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();

    let first = fx
        .ratings
        .for_user_and_store(fx.rater.id, fx.store_id)
        .await
        .unwrap()
        .unwrap();
    let second = fx
        .ratings
        .for_user_and_store(fx.rater.id, fx.store_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.rating, second.rating);
}

#[tokio::test]
async fn store_rating_lists_are_scoped_to_admin_and_owner() {
    let fx = fixture();
    fx.ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();

    let as_admin = fx
        .ratings
        .list_by_store(fx.store_id, fx.admin)
        .await
        .unwrap();
    assert_eq!(as_admin.len(), 1);

    let as_owner = fx
        .ratings
        .list_by_store(fx.store_id, fx.owner)
        .await
        .unwrap();
    assert_eq!(as_owner.len(), 1);

    let err = fx
        .ratings
        .list_by_store(fx.store_id, fx.rater)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    // A different store owner is still a stranger here.
    let stranger_id = fx
        .store
        .seed_user("Sam Stranger", "sam@example.com", Role::StoreOwner);
    let err = fx
        .ratings
        .list_by_store(fx.store_id, Requester::new(stranger_id, Role::StoreOwner))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn store_ratings_come_newest_first() {
    let fx = fixture();
    let second_rater = Requester::new(
        fx.store.seed_user("Ben Brisk", "ben@example.com", Role::NormalUser),
        Role::NormalUser,
    );

    fx.ratings
        .create(fx.rater, fx.store_id, value(2))
        .await
        .unwrap();
    fx.ratings
        .create(second_rater, fx.store_id, value(5))
        .await
        .unwrap();

    let listed = fx
        .ratings
        .list_by_store(fx.store_id, fx.admin)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].user_id, second_rater.id);
    assert_eq!(listed[1].user_id, fx.rater.id);
}

#[tokio::test]
async fn user_rating_lists_are_scoped_to_admin_and_self() {
    let fx = fixture();
    fx.ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();

    assert_eq!(
        fx.ratings
            .list_by_user(fx.rater.id, fx.rater)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        fx.ratings
            .list_by_user(fx.rater.id, fx.admin)
            .await
            .unwrap()
            .len(),
        1
    );

    let err = fx
        .ratings
        .list_by_user(fx.rater.id, fx.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let err = fx
        .ratings
        .list_by_user(UserId::new(999), fx.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn listing_everything_requires_admin() {
    let fx = fixture();
    fx.ratings
        .create(fx.rater, fx.store_id, value(4))
        .await
        .unwrap();

    assert_eq!(fx.ratings.list_all(fx.admin).await.unwrap().len(), 1);

    let err = fx.ratings.list_all(fx.rater).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn store_stats_reflect_current_ratings() {
    let fx = fixture();
    let raters = [
        ("u1@example.com", 4),
        ("u2@example.com", 4),
        ("u3@example.com", 5),
    ];
    for (email, raw) in raters {
        let id = fx.store.seed_user("Rater", email, Role::NormalUser);
        fx.ratings
            .create(Requester::new(id, Role::NormalUser), fx.store_id, value(raw))
            .await
            .unwrap();
    }

    let stats = fx.ratings.store_stats(fx.store_id, fx.owner).await.unwrap();
    assert_eq!(stats.store_id, fx.store_id);
    assert_eq!(stats.store_name, "Pizza Palace");
    assert_eq!(stats.average_rating, 4.3);
    assert_eq!(stats.total_ratings, 3);
    assert_eq!(stats.rating_breakdown[&4], 2);
    assert_eq!(stats.rating_breakdown[&5], 1);
    assert_eq!(stats.rating_breakdown[&1], 0);
}

#[tokio::test]
async fn stats_for_unrated_store_are_zeroed() {
    let fx = fixture();
    let stats = fx.ratings.store_stats(fx.store_id, fx.admin).await.unwrap();
    assert_eq!(stats.average_rating, 0.0);
    assert_eq!(stats.total_ratings, 0);
    assert_eq!(stats.rating_breakdown.len(), 5);

    let err = fx
        .ratings
        .store_stats(fx.store_id, fx.rater)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}
