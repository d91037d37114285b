mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{count_activity, day_before, free_activity, seed_activity, seed_card, seed_slot, test_pool};
use meetbook::database::{card_repo, ledger_repo};
use meetbook::services::{booking_service, credit_service, BookingError};

#[tokio::test]
async fn count_card_round_trip_restores_credit_and_status() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-1", "user-a", "count", 1, None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), None, now)
        .await
        .expect("booking");
    let deduction = join.deduction().expect("deduction note");
    assert_eq!(deduction.card_id, "card-1");
    assert_eq!(deduction.amount, 1);
    assert!(!deduction.refunded);

    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.remaining, 0);
    assert_eq!(card.used, 1);
    assert_eq!(card.status, "depleted");

    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("cancel");

    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.remaining, 1);
    assert_eq!(card.used, 0);
    assert_eq!(card.status, "active");

    let joins = booking_service::list_my_joins(&pool, "user-a", true)
        .await
        .expect("list");
    let deduction = joins[0].deduction().expect("deduction note");
    assert!(deduction.refunded);
    assert_eq!(deduction.refund_reason.as_deref(), Some("user cancelled"));
}

#[tokio::test]
async fn ledger_keeps_before_after_snapshots() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-1", "user-a", "count", 5, None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), None, now)
        .await
        .expect("booking");
    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("cancel");

    let entries = ledger_repo::list_entries(&pool, "card-1").await.expect("ledger");
    assert_eq!(entries.len(), 2);
    // Newest first: the refund, then the debit.
    assert_eq!(entries[0].delta, 1);
    assert_eq!(entries[0].remaining_before, 4);
    assert_eq!(entries[0].remaining_after, 5);
    assert_eq!(entries[1].delta, -1);
    assert_eq!(entries[1].remaining_before, 5);
    assert_eq!(entries[1].remaining_after, 4);
    assert_eq!(entries[1].related_id.as_deref(), Some(join.join_id.as_str()));
}

#[tokio::test]
async fn insufficient_credit_aborts_before_any_write() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 2)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-1", "user-a", "count", 1, None).await;
    let now = day_before();

    // Auto-selection finds no card with enough credit.
    let err = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound));

    // Explicitly naming the card surfaces the real reason.
    let err = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), Some("card-1"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InsufficientCredit));

    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.remaining, 1);
    assert!(ledger_repo::list_entries(&pool, "card-1").await.expect("ledger").is_empty());
    assert!(booking_service::list_my_joins(&pool, "user-a", true)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn expired_card_is_written_off_lazily() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-1", "user-a", "count", 3, Some("2030-01-01T00:00:00Z")).await;
    let now = day_before(); // past the expiry

    let err = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), Some("card-1"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::CardUnusable));

    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.status, "expired");
    assert_eq!(card.remaining, 0);
    assert_eq!(card.used, card.total);

    let entries = ledger_repo::list_entries(&pool, "card-1").await.expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "expire_write_off");
    assert_eq!(entries[0].delta, -3);
    assert_eq!(entries[0].remaining_after, 0);
}

#[tokio::test]
async fn card_kind_must_match_the_cost_mode() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-b", "user-a", "balance", 1000, None).await;
    let now = day_before();

    let err = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), Some("card-b"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::IncompatibleCardType));
}

#[tokio::test]
async fn either_mode_without_auto_select_requires_an_explicit_card() {
    let pool = test_pool().await;
    let mut activity = free_activity("gym");
    activity.cost_enabled = 1;
    activity.cost_mode = "either".to_string();
    activity.count_cost = 1;
    activity.balance_cost = 500;
    activity.allow_auto_select = 0;
    seed_activity(&pool, &activity).await;
    let mark = seed_slot(&pool, "gym", None).await;
    seed_card(&pool, "card-b", "user-a", "balance", 1000, None).await;
    let now = day_before();

    let err = booking_service::book(&pool, "user-a", "gym", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    // The balance price applies to a balance card under `either`.
    booking_service::book(&pool, "user-a", "gym", &mark, json!({}), Some("card-b"), now)
        .await
        .expect("explicit card books");
    let card = card_repo::get_card(&pool, "card-b").await.expect("get").expect("card");
    assert_eq!(card.remaining, 500);
}

#[tokio::test]
async fn someone_elses_card_reads_as_not_found() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    seed_card(&pool, "card-x", "user-b", "count", 5, None).await;
    let now = day_before();

    let err = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), Some("card-x"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound));
}

#[tokio::test]
async fn auto_select_skips_incompatible_and_empty_cards() {
    let pool = test_pool().await;
    seed_activity(&pool, &count_activity("spin", 1)).await;
    let mark = seed_slot(&pool, "spin", None).await;
    // Issue order: balance card (wrong kind), drained count card, good card.
    seed_card(&pool, "card-1", "user-a", "balance", 1000, None).await;
    seed_card(&pool, "card-2", "user-a", "count", 0, None).await;
    seed_card(&pool, "card-3", "user-a", "count", 2, None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "spin", &mark, json!({}), None, now)
        .await
        .expect("booking");
    assert_eq!(join.deduction().expect("note").card_id, "card-3");
}

#[tokio::test]
async fn recharge_reactivates_a_depleted_card() {
    let pool = test_pool().await;
    seed_card(&pool, "card-1", "user-a", "count", 1, None).await;
    let now = day_before();

    credit_service::debit(&pool, "card-1", 1, "drain", None, now)
        .await
        .expect("debit");
    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.status, "depleted");

    credit_service::recharge(&pool, "card-1", 3, "front desk top-up", now)
        .await
        .expect("recharge");
    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.remaining, 3);
    assert_eq!(card.total, 4);
    assert_eq!(card.status, "active");

    let entries = ledger_repo::list_entries(&pool, "card-1").await.expect("ledger");
    assert_eq!(entries[0].kind, "recharge");
    assert_eq!(entries[0].delta, 3);
}

#[tokio::test]
async fn adjustment_cannot_push_remaining_negative() {
    let pool = test_pool().await;
    seed_card(&pool, "card-1", "user-a", "count", 2, None).await;
    let now = day_before();

    let err = credit_service::adjust(&pool, "card-1", -3, "typo fix", now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    credit_service::adjust(&pool, "card-1", -2, "typo fix", now)
        .await
        .expect("adjust to zero");
    let card = card_repo::get_card(&pool, "card-1").await.expect("get").expect("card");
    assert_eq!(card.remaining, 0);
    assert_eq!(card.status, "depleted");
}
