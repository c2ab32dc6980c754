//! Repository and cart behavior against `PostgreSQL`.
//!
//! These tests require a reachable `PostgreSQL` server in `DATABASE_URL`.
//! `sqlx::test` creates a scratch database per test and applies the store
//! migrations to it.
//!
//! Run with: cargo test -p trolley-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::{Value, json};
use sqlx::PgPool;
use trolley_core::{Filter, Update};
use trolley_integration_tests::{seed_cart, seed_product};
use trolley_store::db::RepositoryError;
use trolley_store::models::{CartItem, NewUser};
use trolley_store::state::AppState;

#[sqlx::test(migrations = "../store/migrations")]
#[ignore = "Requires a running PostgreSQL server"]
async fn test_user_round_trip(pool: PgPool) {
    let state = AppState::postgres(&pool);
    let users = state.users();

    let created = users
        .create(&NewUser::new(
            json!({"email": "grace@example.com", "roles": ["admin"]})
                .as_object()
                .unwrap()
                .clone(),
        ))
        .await
        .unwrap();

    let found = users.require_one(&Filter::by_id(created.id)).await.unwrap();
    assert_eq!(found, created);

    let by_email = users
        .find_one(&Filter::new().eq("email", "grace@example.com"))
        .await
        .unwrap();
    assert_eq!(by_email.map(|user| user.id), Some(created.id));

    let updated = users
        .find_one_and_update(&Filter::by_id(created.id), &Update::new().set("email", "g@example.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.attributes["email"], json!("g@example.com"));
    assert_eq!(updated.attributes["roles"], json!(["admin"]));

    users.require_one_and_delete(&Filter::by_id(created.id)).await.unwrap();
    assert!(users.find_one(&Filter::by_id(created.id)).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../store/migrations")]
#[ignore = "Requires a running PostgreSQL server"]
async fn test_missing_record_is_not_found(pool: PgPool) {
    let state = AppState::postgres(&pool);

    let err = state
        .users()
        .require_one_and_update(
            &Filter::new().eq("email", "nobody@example.com"),
            &Update::new().set("plan", "pro"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[sqlx::test(migrations = "../store/migrations")]
#[ignore = "Requires a running PostgreSQL server"]
async fn test_cart_quantities_accumulate(pool: PgPool) {
    let state = AppState::postgres(&pool);
    let cart = seed_cart(&state).await;
    let product = seed_product(&state, "Dragon fruit", 650).await;

    let service = state.cart_item_service();
    service.add_product_to_cart(cart.id, product.id, 2).await.unwrap();
    let item = service.add_product_to_cart(cart.id, product.id, 3).await.unwrap();
    assert_eq!(item.quantity, 5);

    let items = service.cart_items(cart.id).await.unwrap();
    assert_eq!(items, vec![item]);
}

#[sqlx::test(migrations = "../store/migrations")]
#[ignore = "Requires a running PostgreSQL server"]
async fn test_concurrent_adds_keep_a_single_line(pool: PgPool) {
    let state = AppState::postgres(&pool);
    let cart = seed_cart(&state).await;
    let product = seed_product(&state, "Lychee", 275).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .cart_item_service()
                    .add_product_to_cart(cart.id, product.id, 1)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let items = state
        .cart_items()
        .find(&CartItem::filter_for(cart.id, product.id))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 8);
}

async fn matching_users(state: &AppState, filter: &Filter) -> usize {
    state.users().find(filter).await.unwrap().len()
}

#[sqlx::test(migrations = "../store/migrations")]
#[ignore = "Requires a running PostgreSQL server"]
async fn test_filters_select_the_same_users_in_both_backends(pool: PgPool) {
    let postgres = AppState::postgres(&pool);
    let memory = AppState::in_memory();
    let attributes = json!({"tags": ["a", "b"], "n": 2.0, "meta": {"plan": "pro"}})
        .as_object()
        .unwrap()
        .clone();
    for state in [&postgres, &memory] {
        state.users().create(&NewUser::new(attributes.clone())).await.unwrap();
    }

    let cases = [
        (Filter::new().eq("tags", json!(["a"])), 0),
        (Filter::new().eq("tags", json!(["a", "b"])), 1),
        (Filter::new().eq("n", 2), 1),
        (Filter::new().eq("n", 3), 0),
        (Filter::new().eq("meta", json!({})), 0),
        (Filter::new().eq("meta", json!({"plan": "pro"})), 1),
        (Filter::new().eq("missing", Value::Null), 0),
    ];
    for (filter, expected) in &cases {
        assert_eq!(matching_users(&postgres, filter).await, *expected, "postgres {filter}");
        assert_eq!(matching_users(&memory, filter).await, *expected, "memory {filter}");
    }
}
