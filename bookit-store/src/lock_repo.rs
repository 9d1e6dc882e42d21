use async_trait::async_trait;
use bookit_core::repository::{LockLedger, LockOutcome, LockRequest};
use bookit_core::StoreResult;
use bookit_shared::{RoomId, RoomLock, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::warn;

use crate::database::{backend, sql_state, UNIQUE_VIOLATION};

/// `room_locks` ledger.
///
/// `acquire` runs in one transaction holding row locks on the caller's `users` row and on
/// every requested `rooms` row (taken in id order), so two callers racing for the same room
/// are serialized. The unique index on `room_locks.room_id` rejects anything that slips past.
pub struct PgLockLedger {
    pool: PgPool,
}

impl PgLockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LockRow {
    user_id: i64,
    room_id: i64,
    locked_until: DateTime<Utc>,
}

impl From<LockRow> for RoomLock {
    fn from(row: LockRow) -> Self {
        RoomLock {
            user_id: UserId(row.user_id),
            room_id: RoomId(row.room_id),
            locked_until: row.locked_until,
        }
    }
}

fn raw_ids(ids: &[RoomId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

/// Requested ids missing from `found`, in request order.
fn missing_from(requested: &[RoomId], found: &[i64]) -> Vec<RoomId> {
    let found: HashSet<i64> = found.iter().copied().collect();
    requested
        .iter()
        .filter(|id| !found.contains(&id.0))
        .copied()
        .collect()
}

#[async_trait]
impl LockLedger for PgLockLedger {
    async fn acquire(&self, request: &LockRequest) -> StoreResult<LockOutcome> {
        let requested = raw_ids(&request.room_ids);
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(request.user_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let found: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM rooms WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&requested)
                .fetch_all(&mut *tx)
                .await
                .map_err(backend)?;
        let unknown = missing_from(&request.room_ids, &found);
        if !unknown.is_empty() {
            return Ok(LockOutcome::UnknownRooms { room_ids: unknown });
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_locks WHERE user_id = $1 AND locked_until > $2",
        )
        .bind(request.user_id.0)
        .bind(request.now)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let active = active.max(0) as usize;

        let Some(plan) = request.plan(active) else {
            return Ok(LockOutcome::QuotaExceeded { active });
        };

        let held: Vec<i64> = sqlx::query_scalar(
            "SELECT room_id FROM room_locks WHERE room_id = ANY($1) AND locked_until > $2",
        )
        .bind(&requested)
        .bind(request.now)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;
        if !held.is_empty() {
            let held: HashSet<i64> = held.into_iter().collect();
            let room_ids = request
                .room_ids
                .iter()
                .filter(|id| held.contains(&id.0))
                .copied()
                .collect();
            return Ok(LockOutcome::Conflict { room_ids });
        }

        sqlx::query(
            "DELETE FROM room_locks WHERE user_id = $1 OR (room_id = ANY($2) AND locked_until <= $3)",
        )
        .bind(request.user_id.0)
        .bind(&requested)
        .bind(request.now)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO room_locks (room_id, user_id, locked_until)
            SELECT room_id, $2, $3 FROM UNNEST($1::BIGINT[]) AS t(room_id)
            "#,
        )
        .bind(raw_ids(&plan.rooms))
        .bind(request.user_id.0)
        .bind(request.locked_until)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                warn!(user_id = %request.user_id, "lock insert lost a race: {}", e);
                return Ok(LockOutcome::Conflict {
                    room_ids: plan.rooms,
                });
            }
            return Err(backend(e));
        }

        tx.commit().await.map_err(backend)?;
        Ok(LockOutcome::Granted(plan))
    }

    async fn release(&self, user_id: UserId, room_ids: &[RoomId]) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM room_locks WHERE user_id = $1 AND room_id = ANY($2)")
            .bind(user_id.0)
            .bind(raw_ids(room_ids))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn live_locks(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<RoomLock>> {
        let rows = sqlx::query_as::<_, LockRow>(
            r#"
            SELECT user_id, room_id, locked_until FROM room_locks
            WHERE user_id = $1 AND locked_until > $2
            ORDER BY room_id
            "#,
        )
        .bind(user_id.0)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(RoomLock::from).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM room_locks WHERE locked_until <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_from_keeps_request_order() {
        let requested = [RoomId(7), RoomId(3), RoomId(5)];
        assert_eq!(missing_from(&requested, &[3]), vec![RoomId(7), RoomId(5)]);
        assert!(missing_from(&requested, &[3, 5, 7]).is_empty());
    }

    #[test]
    fn test_lock_row_conversion() {
        let until = Utc::now();
        let lock = RoomLock::from(LockRow {
            user_id: 1,
            room_id: 101,
            locked_until: until,
        });
        assert_eq!(lock.user_id, UserId(1));
        assert_eq!(lock.room_id, RoomId(101));
        assert_eq!(lock.locked_until, until);
    }
}
