mod interval_record;

use proc_macro::TokenStream;

/// Derive macro for `IntervalRecord`.
///
/// Requires the struct to also derive `Serialize`, `Deserialize` and `Clone`.
/// The identity field must be `Option<String>`; start and end fields must be
/// `Option<DateTime<Utc>>`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, IntervalRecord)]
/// #[interval(
///     collection = "room_bookings",
///     collision_fields = ["room.id"],
///     exclude = Self::is_exempt
/// )]
/// pub struct RoomBooking {
///     pub id: Option<String>,
///     #[interval(start)]
///     pub starts_at: Option<DateTime<Utc>>,
///     #[interval(end)]
///     pub ends_at: Option<DateTime<Utc>>,
///     pub room: Room,
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
///
/// Struct attributes:
/// - `collection = "..."`: defaults to the snake-cased struct name plus `s`
/// - `collision_fields = [...]`: serialized field names, dotted for nested
///   fields; omitted means one global collision group
/// - `exclude = path`: `fn(&Self) -> bool` exempting records from collisions
///
/// Field attributes `#[interval(id)]`, `#[interval(start)]` and
/// `#[interval(end)]` override the default field names `id`, `start`, `end`.
/// Serialized names follow the field's `#[serde(rename)]` and the struct's
/// `#[serde(rename_all)]`.
#[proc_macro_derive(IntervalRecord, attributes(interval))]
pub fn derive_interval_record(input: TokenStream) -> TokenStream {
    interval_record::derive_interval_record(input)
}
