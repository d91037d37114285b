mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{day_before, free_activity, seed_activity, seed_slot, t, test_pool, DAY};
use meetbook::services::booking_service::{self, CheckInOutcome};
use meetbook::services::{slot_service, BookingError};

#[tokio::test]
async fn limited_slot_admits_two_and_rejects_the_third() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", Some(2)).await;
    let now = day_before();

    booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("first booking");
    booking_service::book(&pool, "user-b", "yoga", &mark, json!({}), None, now)
        .await
        .expect("second booking");

    let err = booking_service::book(&pool, "user-c", "yoga", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotFull));
}

#[tokio::test]
async fn one_live_booking_per_user_per_slot() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("first booking");
    let err = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadyBooked));
}

#[tokio::test]
async fn cancelling_frees_the_seat_again() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", Some(1)).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("booking");
    let err = booking_service::book(&pool, "user-b", "yoga", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotFull));

    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("cancel");
    booking_service::book(&pool, "user-b", "yoga", &mark, json!({}), None, now)
        .await
        .expect("seat free again");
}

#[tokio::test]
async fn second_cancel_attempt_is_rejected() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("booking");
    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("first cancel");
    let err = booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn cancelling_someone_elses_booking_reads_as_not_found() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("booking");
    let err = booking_service::cancel_join(&pool, "user-b", &join.join_id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound));
}

#[tokio::test]
async fn cutoff_is_the_slot_start_itself() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let start = t(9, 0);

    let err = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, start)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::WindowPassed));

    booking_service::book(
        &pool,
        "user-a",
        "yoga",
        &mark,
        json!({}),
        None,
        start - Duration::milliseconds(1),
    )
    .await
    .expect("one millisecond before start is still bookable");
}

#[tokio::test]
async fn required_form_field_is_enforced() {
    let pool = test_pool().await;
    let mut activity = free_activity("yoga");
    activity.form_schema_json =
        r#"[{"name":"phone","label":"Phone number","required":true}]"#.to_string();
    seed_activity(&pool, &activity).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    let err = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    booking_service::book(
        &pool,
        "user-a",
        "yoga",
        &mark,
        json!({ "phone": "0612345678" }),
        None,
        now,
    )
    .await
    .expect("filled form books fine");
}

#[tokio::test]
async fn preview_reports_rule_refusal_and_echoes_last_form() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", Some(1)).await;
    let now = day_before();

    let preview = booking_service::preview_booking(&pool, "user-a", "yoga", &mark, now)
        .await
        .expect("preview");
    assert!(preview.eligible);
    assert_eq!(preview.last_form, None);

    booking_service::book(
        &pool,
        "user-a",
        "yoga",
        &mark,
        json!({ "note": "front row" }),
        None,
        now,
    )
    .await
    .expect("booking");

    let preview = booking_service::preview_booking(&pool, "user-b", "yoga", &mark, now)
        .await
        .expect("preview for other user");
    assert!(!preview.eligible);
    assert_eq!(preview.reason, Some("slot_full"));

    let preview = booking_service::preview_booking(&pool, "user-a", "yoga", &mark, now)
        .await
        .expect("preview echo");
    assert_eq!(preview.last_form, Some(json!({ "note": "front row" })));
}

#[tokio::test]
async fn self_checkin_only_on_the_day_and_idempotent() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;

    booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, day_before())
        .await
        .expect("booking");

    // The day before the slot: refused.
    let err = booking_service::check_in_self(&pool, "user-a", &mark, day_before())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let first = booking_service::check_in_self(&pool, "user-a", &mark, t(8, 45))
        .await
        .expect("check-in");
    assert_eq!(first, CheckInOutcome::CheckedIn);

    // Repeating it is a no-op, not an error.
    let second = booking_service::check_in_self(&pool, "user-a", &mark, t(8, 50))
        .await
        .expect("repeat check-in");
    assert_eq!(second, CheckInOutcome::AlreadyCheckedIn);
}

#[tokio::test]
async fn checked_in_booking_cannot_be_cancelled() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, day_before())
        .await
        .expect("booking");
    booking_service::check_in_self(&pool, "user-a", &mark, t(8, 45))
        .await
        .expect("check-in");

    let err = booking_service::cancel_join(&pool, "user-a", &join.join_id, t(8, 50))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn slot_counters_follow_bookings_and_cancels() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("booking");
    booking_service::book(&pool, "user-b", "yoga", &mark, json!({}), None, now)
        .await
        .expect("second booking");

    let (_, slots) = slot_service::get_day_with_slots(&pool, "yoga", DAY)
        .await
        .expect("day");
    assert_eq!(slots[0].stats.succeeded, 2);

    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("cancel");
    let (_, slots) = slot_service::get_day_with_slots(&pool, "yoga", DAY)
        .await
        .expect("day");
    assert_eq!(slots[0].stats.succeeded, 1);
    assert_eq!(slots[0].stats.user_cancelled, 1);
}

#[tokio::test]
async fn open_dates_come_from_the_authoring_cache() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    seed_slot(&pool, "yoga", None).await;

    let dates = slot_service::get_open_dates_from(&pool, "yoga", "2030-05-01")
        .await
        .expect("open dates");
    assert_eq!(dates, vec![DAY.to_string()]);

    // A from-date past the open day filters it out.
    let dates = slot_service::get_open_dates_from(&pool, "yoga", "2030-06-02")
        .await
        .expect("open dates");
    assert!(dates.is_empty());
}

#[tokio::test]
async fn past_days_cannot_be_authored() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;

    let err = slot_service::replace_day_slots(
        &pool,
        "yoga",
        "2030-05-20",
        vec![],
        day_before(), // 2030-05-30
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn cleanup_removes_cancelled_and_finished_rows() {
    let pool = test_pool().await;
    seed_activity(&pool, &free_activity("yoga")).await;
    let mark = seed_slot(&pool, "yoga", None).await;
    let now = day_before();

    let join = booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("booking");
    booking_service::cancel_join(&pool, "user-a", &join.join_id, now)
        .await
        .expect("cancel");
    booking_service::book(&pool, "user-a", "yoga", &mark, json!({}), None, now)
        .await
        .expect("rebooking");

    // Before the slot ends only the cancelled row goes.
    let removed = booking_service::cleanup_finished(&pool, "user-a", now)
        .await
        .expect("cleanup");
    assert_eq!(removed, 1);

    // After the end time the finished booking goes too.
    let removed = booking_service::cleanup_finished(&pool, "user-a", t(11, 0))
        .await
        .expect("cleanup");
    assert_eq!(removed, 1);

    let joins = booking_service::list_my_joins(&pool, "user-a", true)
        .await
        .expect("list");
    assert!(joins.is_empty());
}
