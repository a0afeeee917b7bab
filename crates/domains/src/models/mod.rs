//! # Domain Models
//!
//! These structs represent the core entities of Courtside.
//! Ids are UUID v4; money is always integer minor units (cents).

pub mod booking;
pub mod court;
pub mod enums;
pub mod page;
pub mod review;
pub mod unavailability;
pub mod user;
pub mod venue;

pub use booking::*;
pub use court::*;
pub use enums::*;
pub use page::*;
pub use review::*;
pub use unavailability::*;
pub use user::*;
pub use venue::*;

use chrono::NaiveTime;

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}
