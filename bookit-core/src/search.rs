use bookit_shared::{HotelId, RoomId, RoomListing, RoomType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::dates::parse_stay;
use crate::pricing::discounted_price;
use crate::repository::{InventoryStore, ReservationStore};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub city: Option<String>,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    #[serde(default)]
    pub rooms: Vec<RoomRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomRequest {
    pub type_of_room: Option<String>,
    pub number_of_passengers: Option<u32>,
    pub number_of_rooms: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub hotel_name: String,
    pub room_number: i32,
    pub name: String,
    pub room_type: RoomType,
    pub price_cents: i64,
    pub discounted_price_cents: i64,
}

impl RoomSummary {
    fn from_listing(listing: &RoomListing, now: DateTime<Utc>) -> Self {
        Self {
            id: listing.room.id,
            hotel_id: listing.hotel.id,
            hotel_name: listing.hotel.name.clone(),
            room_number: listing.room.room_number,
            name: listing.room.name.clone(),
            room_type: listing.room.room_type,
            price_cents: listing.room.price_cents,
            discounted_price_cents: discounted_price(listing, now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeAvailability {
    pub available: bool,
    /// Free rooms of this type, regardless of how many were asked for.
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<RoomSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passengers_per_room: Option<u32>,
    pub rooms_needed: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AvailabilityReport {
    pub available_rooms: BTreeMap<String, TypeAvailability>,
    pub unavailable_types: Vec<String>,
}

struct Wanted {
    /// Report key: the canonical type name, or the raw name when it matches no type.
    label: String,
    /// `None` for a name no room can carry; such requests are reported unavailable.
    room_type: Option<RoomType>,
    passengers: u32,
    count: u32,
}

struct ValidQuery {
    city: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    wanted: Vec<Wanted>,
}

fn validate(query: &SearchQuery) -> CoreResult<ValidQuery> {
    if query.rooms.is_empty() {
        return Err(CoreError::bad_request("At least one room must be specified"));
    }
    let city = match query.city.as_deref().map(str::trim) {
        Some(city) if !city.is_empty() => city.to_string(),
        _ => return Err(CoreError::bad_request("city is required")),
    };
    let (Some(check_in), Some(check_out)) =
        (query.check_in_date.as_deref(), query.check_out_date.as_deref())
    else {
        return Err(CoreError::bad_request(
            "Both check_in_date and check_out_date are required",
        ));
    };
    let (check_in, check_out) = parse_stay(check_in, check_out)?;

    let mut wanted = Vec::with_capacity(query.rooms.len());
    for request in &query.rooms {
        let (Some(room_type), Some(passengers), Some(count)) = (
            request.type_of_room.as_deref().filter(|t| !t.is_empty()),
            request.number_of_passengers.filter(|p| *p > 0),
            request.number_of_rooms.filter(|c| *c > 0),
        ) else {
            return Err(CoreError::bad_request(
                "Each room must have room type, passengers and count",
            ));
        };
        let parsed = room_type.parse::<RoomType>().ok();
        wanted.push(Wanted {
            label: parsed.map_or_else(|| room_type.to_string(), |t| t.as_str().to_string()),
            room_type: parsed,
            passengers,
            count,
        });
    }

    Ok(ValidQuery {
        city,
        check_in,
        check_out,
        wanted,
    })
}

/// Read-only view over inventory and confirmed stays.
pub struct AvailabilitySearch {
    inventory: Arc<dyn InventoryStore>,
    reservations: Arc<dyn ReservationStore>,
}

impl AvailabilitySearch {
    pub fn new(inventory: Arc<dyn InventoryStore>, reservations: Arc<dyn ReservationStore>) -> Self {
        Self {
            inventory,
            reservations,
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> CoreResult<AvailabilityReport> {
        self.search_at(query, Utc::now()).await
    }

    pub async fn search_at(
        &self,
        query: &SearchQuery,
        now: DateTime<Utc>,
    ) -> CoreResult<AvailabilityReport> {
        let query = validate(query)?;

        let candidates = self.inventory.rooms_in_city(&query.city).await?;
        let reserved = self
            .reservations
            .reserved_room_ids(query.check_in, query.check_out)
            .await?;
        let free: Vec<&RoomListing> = candidates
            .iter()
            .filter(|l| !reserved.contains(&l.room.id))
            .collect();

        debug!(
            city = %query.city,
            candidates = candidates.len(),
            free = free.len(),
            "availability search"
        );

        let mut report = AvailabilityReport::default();
        for wanted in &query.wanted {
            let of_type: Vec<&RoomListing> = free
                .iter()
                .copied()
                .filter(|l| Some(l.room.room_type) == wanted.room_type)
                .collect();
            let key = wanted.label.clone();
            let needed = wanted.count as usize;

            let entry = if of_type.len() >= needed {
                TypeAvailability {
                    available: true,
                    count: of_type.len(),
                    rooms: Some(
                        of_type
                            .iter()
                            .take(needed)
                            .map(|l| RoomSummary::from_listing(l, now))
                            .collect(),
                    ),
                    passengers_per_room: Some(wanted.passengers),
                    rooms_needed: wanted.count,
                }
            } else {
                if !report.unavailable_types.contains(&key) {
                    report.unavailable_types.push(key.clone());
                }
                TypeAvailability {
                    available: false,
                    count: of_type.len(),
                    rooms: None,
                    passengers_per_room: None,
                    rooms_needed: wanted.count,
                }
            };
            report.available_rooms.insert(key, entry);
        }

        Ok(report)
    }
}
