//! Canonical value sets shared by every layer.
//!
//! Each enum serializes as its snake_case wire name, and the same name is
//! what the SQL adapters store in TEXT columns.

use chrono::{Duration, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportType {
    Badminton,
    Tennis,
    Football,
    Basketball,
    Cricket,
    TableTennis,
    Volleyball,
    Squash,
}

wire_enum!(SportType {
    Badminton => "badminton",
    Tennis => "tennis",
    Football => "football",
    Basketball => "basketball",
    Cricket => "cricket",
    TableTennis => "table_tennis",
    Volleyball => "volleyball",
    Squash => "squash",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    Indoor,
    Outdoor,
    Both,
}

wire_enum!(VenueType {
    Indoor => "indoor",
    Outdoor => "outdoor",
    Both => "both",
});

/// Moderation status of a venue. Visibility additionally depends on the
/// venue's active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueStatus {
    Pending,
    Approved,
    Rejected,
}

wire_enum!(VenueStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl VenueStatus {
    /// Moderation only ever moves a venue out of `Pending`.
    pub fn can_transition_to(self, next: VenueStatus) -> bool {
        matches!(
            (self, next),
            (VenueStatus::Pending, VenueStatus::Approved) | (VenueStatus::Pending, VenueStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    Cancelled,
}

wire_enum!(BookingStatus {
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BookingStatus::Confirmed)
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Bookings that count towards revenue.
    pub fn is_billable(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

wire_enum!(DayOfWeek {
    Monday => "monday",
    Tuesday => "tuesday",
    Wednesday => "wednesday",
    Thursday => "thursday",
    Friday => "friday",
    Saturday => "saturday",
    Sunday => "sunday",
});

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Length of one bookable slot. Serialized as a number of minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SlotDuration {
    OneHour,
    NinetyMinutes,
    TwoHours,
}

impl SlotDuration {
    pub fn minutes(self) -> u32 {
        match self {
            SlotDuration::OneHour => 60,
            SlotDuration::NinetyMinutes => 90,
            SlotDuration::TwoHours => 120,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::minutes(i64::from(self.minutes()))
    }
}

impl TryFrom<u32> for SlotDuration {
    type Error = DomainError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            60 => Ok(SlotDuration::OneHour),
            90 => Ok(SlotDuration::NinetyMinutes),
            120 => Ok(SlotDuration::TwoHours),
            other => Err(DomainError::Validation(format!(
                "unsupported slot duration of {other} minutes"
            ))),
        }
    }
}

impl From<SlotDuration> for u32 {
    fn from(d: SlotDuration) -> Self {
        d.minutes()
    }
}

impl fmt::Display for SlotDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailabilityReason {
    Maintenance,
    PrivateEvent,
    Holiday,
    Other,
}

wire_enum!(UnavailabilityReason {
    Maintenance => "maintenance",
    PrivateEvent => "private_event",
    Holiday => "holiday",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    FacilityOwner,
    Admin,
}

wire_enum!(UserRole {
    User => "user",
    FacilityOwner => "facility_owner",
    Admin => "admin",
});

impl UserRole {
    /// Landing page a client should route a freshly signed-in user to.
    pub fn home_path(self) -> &'static str {
        match self {
            UserRole::User => "/venues",
            UserRole::FacilityOwner => "/owner/dashboard",
            UserRole::Admin => "/admin/dashboard",
        }
    }

    /// Roles a user may pick for themselves at sign-up.
    pub fn is_self_assignable(self) -> bool {
        match self {
            UserRole::User | UserRole::FacilityOwner => true,
            UserRole::Admin => false,
        }
    }
}
