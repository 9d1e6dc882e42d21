use async_trait::async_trait;
use bookit_core::repository::{InventoryStore, UserDirectory};
use bookit_core::{StoreError, StoreResult};
use bookit_shared::{Hotel, HotelId, Room, RoomId, RoomListing, UserId, UserIdentity};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::backend;

pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LISTING_SELECT: &str = r#"
    SELECT r.id, r.hotel_id, r.room_number, r.name, r.room_type, r.price_cents,
           h.manager_id, h.name AS hotel_name, h.location, h.discount_percent,
           h.discount_status, h.discount_start_date, h.discount_end_date
    FROM rooms r
    JOIN hotels h ON h.id = r.hotel_id
"#;

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    hotel_id: i64,
    room_number: i32,
    name: String,
    room_type: String,
    price_cents: i64,
    manager_id: i64,
    hotel_name: String,
    location: String,
    discount_percent: i32,
    discount_status: String,
    discount_start_date: Option<DateTime<Utc>>,
    discount_end_date: Option<DateTime<Utc>>,
}

impl ListingRow {
    fn into_listing(self) -> StoreResult<RoomListing> {
        Ok(RoomListing {
            room: Room {
                id: RoomId(self.id),
                hotel_id: HotelId(self.hotel_id),
                room_number: self.room_number,
                name: self.name,
                room_type: self.room_type.parse().map_err(StoreError::corrupt)?,
                price_cents: self.price_cents,
            },
            hotel: Hotel {
                id: HotelId(self.hotel_id),
                manager_id: UserId(self.manager_id),
                name: self.hotel_name,
                location: self.location,
                discount_percent: self.discount_percent,
                discount_status: self.discount_status.parse().map_err(StoreError::corrupt)?,
                discount_start_date: self.discount_start_date,
                discount_end_date: self.discount_end_date,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    role: String,
}

/// `LIKE` pattern matching values that start with `prefix`, wildcards escaped.
pub(crate) fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn find_room(&self, id: RoomId) -> StoreResult<Option<RoomListing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!("{} WHERE r.id = $1", LISTING_SELECT))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(ListingRow::into_listing).transpose()
    }

    async fn rooms_in_city(&self, city: &str) -> StoreResult<Vec<RoomListing>> {
        let sql = format!(
            "{} WHERE lower(h.location) LIKE lower($1) ESCAPE '\\' \
             ORDER BY r.hotel_id, r.room_type, r.price_cents, r.id",
            LISTING_SELECT
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(like_prefix(city))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(ListingRow::into_listing).collect()
    }
}

#[async_trait]
impl UserDirectory for PgInventoryStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserIdentity>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|r| -> StoreResult<UserIdentity> {
            Ok(UserIdentity {
                id: UserId(r.id),
                email: r.email.into(),
                role: r.role.parse().map_err(StoreError::corrupt)?,
            })
        })
        .transpose()
    }
}
