use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::database::{card_repo, ledger_repo};
use crate::models::day::fmt_ts;
use crate::models::{CardKind, CardRow, CardStatus, CostMode, CostPolicy, LedgerKind};
use crate::services::BookingError;

pub fn kind_compatible(mode: CostMode, kind: CardKind) -> bool {
    match mode {
        CostMode::Free => false,
        CostMode::Count => kind == CardKind::Count,
        CostMode::Balance => kind == CardKind::Balance,
        CostMode::Either => true,
    }
}

/// The amount charged depends on the card kind: one use for a count card,
/// the balance price for a balance card.
pub fn cost_for_kind(policy: &CostPolicy, kind: CardKind) -> i64 {
    match kind {
        CardKind::Count => policy.count_cost,
        CardKind::Balance => policy.balance_cost,
    }
}

async fn append_entry(
    conn: &mut SqliteConnection,
    card: &CardRow,
    kind: LedgerKind,
    delta: i64,
    remaining_after: i64,
    reason: &str,
    related_id: Option<&str>,
    now: DateTime<Utc>,
) -> sqlx::Result<String> {
    let entry_id = Uuid::new_v4().to_string();
    ledger_repo::insert_entry(
        conn,
        ledger_repo::NewLedgerEntry {
            entry_id: &entry_id,
            card_id: &card.card_id,
            user_id: &card.user_id,
            kind: kind.as_str(),
            delta,
            remaining_before: card.remaining,
            remaining_after,
            reason,
            related_id,
            created_at: &fmt_ts(now),
        },
    )
    .await?;
    Ok(entry_id)
}

// Flips an expired card and writes any leftover credit off, keeping the
// remaining = total - used invariant true afterwards.
async fn expire_with_write_off(
    conn: &mut SqliteConnection,
    card: &CardRow,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    if !card_repo::expire_card(conn, &card.card_id).await? {
        return Ok(());
    }
    if card.remaining > 0 {
        append_entry(
            conn,
            card,
            LedgerKind::ExpireWriteOff,
            -card.remaining,
            0,
            "card expired",
            None,
            now,
        )
        .await?;
    }
    Ok(())
}

/// Debit a card for a booking. Expiry is checked first and lazily flips the
/// card to expired; the decrement itself is a guarded single-row update, so
/// concurrent debits cannot drive `remaining` negative.
pub async fn debit(
    pool: &SqlitePool,
    card_id: &str,
    amount: i64,
    reason: &str,
    related_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    let mut tx = pool.begin().await?;
    let Some(card) = card_repo::get_card_tx(&mut *tx, card_id).await? else {
        return Err(BookingError::NotFound);
    };
    if card.is_expired(now) {
        expire_with_write_off(&mut *tx, &card, now).await?;
        tx.commit().await?;
        return Err(BookingError::CardUnusable);
    }
    if card.status() != Some(CardStatus::Active) {
        return Err(BookingError::CardUnusable);
    }
    if card.remaining < amount {
        return Err(BookingError::InsufficientCredit);
    }
    // The guard can still reject if another debit won the race.
    if !card_repo::debit_card(&mut *tx, card_id, amount).await? {
        return Err(BookingError::InsufficientCredit);
    }
    append_entry(
        &mut tx,
        &card,
        LedgerKind::Consume,
        -amount,
        card.remaining - amount,
        reason,
        related_id,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Reverse a booking debit. Idempotency lives with the caller: the join's
/// deduction note says whether this debit was already reversed, the ledger
/// itself records whatever it is told.
pub async fn refund(
    pool: &SqlitePool,
    card_id: &str,
    amount: i64,
    reason: &str,
    related_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    let mut tx = pool.begin().await?;
    let Some(card) = card_repo::get_card_tx(&mut *tx, card_id).await? else {
        return Err(BookingError::NotFound);
    };
    if !card_repo::refund_card(&mut *tx, card_id, amount).await? {
        return Err(BookingError::NotFound);
    }
    append_entry(
        &mut tx,
        &card,
        LedgerKind::Consume,
        amount,
        card.remaining + amount,
        reason,
        related_id,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn recharge(
    pool: &SqlitePool,
    card_id: &str,
    amount: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if amount <= 0 {
        return Err(BookingError::Validation(
            "recharge amount must be positive".to_string(),
        ));
    }
    let mut tx = pool.begin().await?;
    let Some(card) = card_repo::get_card_tx(&mut *tx, card_id).await? else {
        return Err(BookingError::NotFound);
    };
    if !card_repo::recharge_card(&mut *tx, card_id, amount).await? {
        return Err(BookingError::NotFound);
    }
    append_entry(
        &mut tx,
        &card,
        LedgerKind::Recharge,
        amount,
        card.remaining + amount,
        reason,
        None,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Signed admin correction. Rejected when it would push remaining below
/// zero rather than clamped, so the ledger never lies about the delta.
pub async fn adjust(
    pool: &SqlitePool,
    card_id: &str,
    delta: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if delta == 0 {
        return Err(BookingError::Validation(
            "adjustment delta must be non-zero".to_string(),
        ));
    }
    let mut tx = pool.begin().await?;
    let Some(card) = card_repo::get_card_tx(&mut *tx, card_id).await? else {
        return Err(BookingError::NotFound);
    };
    if !card_repo::adjust_card(&mut *tx, card_id, delta).await? {
        return Err(BookingError::Validation(
            "adjustment would make the card negative".to_string(),
        ));
    }
    append_entry(
        &mut tx,
        &card,
        LedgerKind::AdminAdjust,
        delta,
        card.remaining + delta,
        reason,
        None,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// First active, non-expired card of a compatible kind with enough credit.
/// Walks the user's cards in issue order and expires stale ones on the way.
pub async fn select_eligible_card(
    pool: &SqlitePool,
    user_id: &str,
    policy: &CostPolicy,
    now: DateTime<Utc>,
) -> Result<CardRow, BookingError> {
    let cards = card_repo::list_user_cards(pool, user_id).await?;
    for card in cards {
        if card.is_expired(now) && card.status() != Some(CardStatus::Expired) {
            let mut tx = pool.begin().await?;
            expire_with_write_off(&mut *tx, &card, now).await?;
            tx.commit().await?;
            continue;
        }
        if card.status() != Some(CardStatus::Active) {
            continue;
        }
        let Some(kind) = card.kind() else {
            continue;
        };
        if !kind_compatible(policy.mode, kind) {
            continue;
        }
        if card.remaining >= cost_for_kind(policy, kind) {
            return Ok(card);
        }
    }
    Err(BookingError::NotFound)
}
