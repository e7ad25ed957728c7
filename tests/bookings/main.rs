//! Booking scenarios: overlap detection, duplicate saves, interval updates,
//! bulk and mass operations, and per-room groups with exclusions.

mod models;

use chrono::{DateTime, Duration, Utc};
use interval_mutex::{
    FieldUpdates, InMemoryIntervalStore, IntervalRecord, MutexError, MutexRepository,
    ValidationError,
};
use models::{Booking, Room, RoomBooking, Shift};
use serde_json::json;

fn repo() -> MutexRepository<InMemoryIntervalStore> {
    MutexRepository::new(InMemoryIntervalStore::new())
        .register::<Booking>()
        .register::<RoomBooking>()
}

/// A repository holding one booking over `[now, now + 1 day)`.
fn with_booking() -> (MutexRepository<InMemoryIntervalStore>, Booking) {
    let repo = repo();
    let now = Utc::now();
    let mut booking = Booking::new(now, now + Duration::days(1), "Room 1");
    repo.save(&mut booking).unwrap();
    (repo, booking)
}

fn bounds(booking: &Booking) -> (DateTime<Utc>, DateTime<Utc>) {
    (booking.start.unwrap(), booking.end.unwrap())
}

// ============================================================================
// Global group
// ============================================================================

#[test]
fn default_collection_name_is_snake_case_plural() {
    assert_eq!(Booking::COLLECTION, "bookings");
    assert_eq!(RoomBooking::COLLECTION, "room_bookings");
}

#[test]
fn detect_overlapping() {
    let (repo, booking) = with_booking();
    let (start, end) = bounds(&booking);
    let minute = Duration::minutes(1);

    let windows = [
        (start, end),
        (start - minute, end + minute),
        (start - minute, end - minute),
        (start + minute, end + minute),
        (start + minute, end - minute),
    ];

    for (from, to) in windows {
        let found = repo.overlapping::<Booking>(from, to).unwrap();
        assert_eq!(found.len(), 1, "window [{from}, {to})");
    }
}

#[test]
fn touching_ranges_are_not_overlapping() {
    let (repo, booking) = with_booking();
    let (start, end) = bounds(&booking);

    assert!(repo
        .overlapping::<Booking>(end, end + Duration::hours(1))
        .unwrap()
        .is_empty());
    assert!(repo
        .overlapping::<Booking>(start - Duration::hours(1), start)
        .unwrap()
        .is_empty());

    let mut next = Booking::new(end, end + Duration::hours(1), "Room 1");
    repo.save(&mut next).unwrap();
    assert_eq!(repo.count::<Booking>().unwrap(), 2);
}

#[test]
fn duplicate_save_collides() {
    let (repo, mut booking) = with_booking();
    let original_id = booking.id.clone().unwrap();

    booking.set_id(None);
    let err = repo.save(&mut booking).unwrap_err();

    match err {
        MutexError::Collision(collision) => {
            assert_eq!(collision.conflicting, vec![original_id]);
            assert!(collision.group.is_global());
        }
        other => panic!("expected collision, got {other:?}"),
    }
    assert!(booking.id.is_none());
    assert_eq!(repo.count::<Booking>().unwrap(), 1);
}

#[test]
fn update_interval() {
    let (repo, mut booking) = with_booking();
    let (start, _) = bounds(&booking);

    booking.start = Some(Utc::now().max(start + Duration::seconds(1)));
    repo.save(&mut booking).unwrap();

    assert_ne!(booking.start, Some(start));
    assert_eq!(repo.count::<Booking>().unwrap(), 1);
    let stored = repo
        .get::<Booking>(booking.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.data.start, booking.start);
}

#[test]
fn disable_bulk_insert() {
    let (repo, booking) = with_booking();

    let mut copies = vec![booking.clone(), booking];
    for copy in copies.iter_mut() {
        copy.set_id(None);
    }

    let err = repo.bulk_create(&copies).unwrap_err();
    assert!(matches!(err, MutexError::Unsupported(_)));
    assert_eq!(repo.count::<Booking>().unwrap(), 1);
}

#[test]
fn no_time_interval() {
    let repo = repo();
    let mut booking = Booking {
        id: None,
        start: Some(Utc::now()),
        end: None,
        room: "Room 2".into(),
    };

    let err = repo.save(&mut booking).unwrap_err();
    assert!(matches!(
        err,
        MutexError::Validation(ValidationError::MissingEnd { .. })
    ));
    assert_eq!(repo.count::<Booking>().unwrap(), 0);
}

#[test]
fn inverted_interval_is_rejected() {
    let repo = repo();
    let now = Utc::now();
    let mut booking = Booking::new(now, now - Duration::hours(1), "Room 2");

    let err = repo.save(&mut booking).unwrap_err();
    assert!(matches!(
        err,
        MutexError::Validation(ValidationError::EmptyInterval { .. })
    ));
}

#[test]
fn disable_update_interval() {
    let (repo, booking) = with_booking();

    let mut rename = FieldUpdates::new();
    rename.insert("room".into(), json!("Room 3"));
    let count = repo.mass_update::<Booking>(&|_| true, &rename).unwrap();
    assert_eq!(count, 1);

    let mut reschedule = FieldUpdates::new();
    reschedule.insert("start".into(), json!(Utc::now()));
    let err = repo
        .mass_update::<Booking>(&|_| true, &reschedule)
        .unwrap_err();
    assert!(matches!(err, MutexError::Unsupported(_)));

    let stored = repo
        .get::<Booking>(booking.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.data.start, booking.start);
    assert_eq!(stored.data.room, "Room 3");
}

#[test]
fn mass_update_of_end_is_refused() {
    let (repo, booking) = with_booking();

    let mut extend = FieldUpdates::new();
    extend.insert("end".into(), json!(booking.end.unwrap() + Duration::days(7)));
    let err = repo.mass_update::<Booking>(&|_| true, &extend).unwrap_err();
    assert!(matches!(err, MutexError::Unsupported(_)));

    let stored = repo
        .get::<Booking>(booking.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(bounds(&stored.data), bounds(&booking));
    assert_eq!(stored.version, 1);
}

#[test]
fn renamed_interval_fields_cannot_be_mass_updated() {
    assert_eq!(Shift::START_FIELD, "startsAt");
    assert_eq!(Shift::END_FIELD, "endsAt");

    let repo = repo();
    let now = Utc::now();
    let mut morning = Shift::new(now, now + Duration::hours(2), "ada");
    let mut evening = Shift::new(now + Duration::hours(5), now + Duration::hours(6), "grace");
    repo.save(&mut morning).unwrap();
    repo.save(&mut evening).unwrap();

    for field in ["startsAt", "endsAt"] {
        let mut changes = FieldUpdates::new();
        changes.insert(field.into(), json!(now + Duration::hours(1)));
        let err = repo
            .mass_update::<Shift>(&|s| s.nurse_name == "grace", &changes)
            .unwrap_err();
        assert!(matches!(err, MutexError::Unsupported(_)));
    }

    let stored = repo
        .get::<Shift>(evening.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.data.starts_at, evening.starts_at);
    assert_eq!(stored.data.ends_at, evening.ends_at);
    assert_eq!(repo.overlapping::<Shift>(now, now + Duration::hours(2)).unwrap().len(), 1);

    let mut rename = FieldUpdates::new();
    rename.insert("nurseName".into(), json!("hopper"));
    assert_eq!(
        repo.mass_update::<Shift>(&|s| s.nurse_name == "grace", &rename)
            .unwrap(),
        1
    );
}

// ============================================================================
// Per-room groups with exclusions
// ============================================================================

struct Rooms {
    repo: MutexRepository<InMemoryIntervalStore>,
    office: RoomBooking,
    living_room: RoomBooking,
}

fn with_rooms() -> Rooms {
    let repo = repo();
    let now = Utc::now();
    let office = Room::new("room-1", "Room1", false);
    let living = Room::new("room-2", "Living room", true);

    let mut office_booking = RoomBooking::new(now, now + Duration::days(1), &office);
    repo.save(&mut office_booking).unwrap();
    let mut living_booking = RoomBooking::new(now, now + Duration::days(1), &living);
    repo.save(&mut living_booking).unwrap();

    Rooms {
        repo,
        office: office_booking,
        living_room: living_booking,
    }
}

#[test]
fn regular_room_cannot_be_rebooked() {
    let Rooms {
        repo, mut office, ..
    } = with_rooms();

    office.set_id(None);
    let err = repo.save(&mut office).unwrap_err();
    assert!(matches!(err, MutexError::Collision(_)));
}

#[test]
fn parallel_room_can_be_rebooked() {
    let Rooms {
        repo,
        mut living_room,
        ..
    } = with_rooms();

    living_room.set_id(None);
    repo.save(&mut living_room).unwrap();
    assert_eq!(repo.count::<RoomBooking>().unwrap(), 3);
}

#[test]
fn rooms_are_separate_groups() {
    let Rooms { repo, office, .. } = with_rooms();

    let other = Room::new("room-3", "Room3", false);
    let mut booking = RoomBooking::new(office.start.unwrap(), office.end.unwrap(), &other);
    repo.save(&mut booking).unwrap();
}

#[test]
fn soft_deleted_booking_frees_the_room() {
    let Rooms {
        repo, mut office, ..
    } = with_rooms();

    office.deleted_at = Some(Utc::now());
    repo.save(&mut office).unwrap();

    office.set_id(None);
    office.deleted_at = None;
    repo.save(&mut office).unwrap();
    assert_eq!(
        repo.find::<RoomBooking>(&|b| b.room.id == "room-1")
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn restoring_a_deleted_booking_is_revalidated() {
    let Rooms {
        repo, mut office, ..
    } = with_rooms();

    office.deleted_at = Some(Utc::now());
    repo.save(&mut office).unwrap();

    let mut replacement = office.clone();
    replacement.set_id(None);
    replacement.deleted_at = None;
    repo.save(&mut replacement).unwrap();

    office.deleted_at = None;
    let err = repo.save(&mut office).unwrap_err();
    assert!(matches!(err, MutexError::Collision(_)));
}

#[test]
fn moving_into_an_occupied_room_collides() {
    let Rooms { repo, office, .. } = with_rooms();

    let other = Room::new("room-3", "Room3", false);
    let mut booking = RoomBooking::new(office.start.unwrap(), office.end.unwrap(), &other);
    repo.save(&mut booking).unwrap();

    booking.room = office.room.clone();
    let err = repo.update(&booking).unwrap_err();
    assert!(matches!(err, MutexError::Collision(_)));
}
