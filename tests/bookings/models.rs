//! Record types for the booking scenarios.

use chrono::{DateTime, Utc};
use interval_mutex::IntervalRecord;
use serde::{Deserialize, Serialize};

/// One global collision group: no two bookings may ever overlap.
#[derive(Clone, Debug, Serialize, Deserialize, IntervalRecord)]
pub struct Booking {
    pub id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub room: String,
}

impl Booking {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, room: &str) -> Self {
        Self {
            id: None,
            start: Some(start),
            end: Some(end),
            room: room.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub can_parallel: bool,
}

impl Room {
    pub fn new(id: &str, name: &str, can_parallel: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            can_parallel,
        }
    }
}

/// Grouped by room; parallel-capable rooms and soft-deleted bookings never collide.
#[derive(Clone, Debug, Serialize, Deserialize, IntervalRecord)]
#[interval(
    collection = "room_bookings",
    collision_fields = ["room.id"],
    exclude = Self::is_exempt
)]
pub struct RoomBooking {
    pub id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub room: Room,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RoomBooking {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, room: &Room) -> Self {
        Self {
            id: None,
            start: Some(start),
            end: Some(end),
            room: room.clone(),
            deleted_at: None,
        }
    }

    pub fn is_exempt(&self) -> bool {
        self.room.can_parallel || self.deleted_at.is_some()
    }
}

/// Serialized in camelCase, so its interval lives under `startsAt`/`endsAt`.
#[derive(Clone, Debug, Serialize, Deserialize, IntervalRecord)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: Option<String>,
    #[interval(start)]
    pub starts_at: Option<DateTime<Utc>>,
    #[interval(end)]
    pub ends_at: Option<DateTime<Utc>>,
    pub nurse_name: String,
}

impl Shift {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>, nurse_name: &str) -> Self {
        Self {
            id: None,
            starts_at: Some(starts_at),
            ends_at: Some(ends_at),
            nurse_name: nurse_name.to_string(),
        }
    }
}
