use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Declare a numeric identifier newtype with `Display` and `FromStr`
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a library member
    MemberId
);
numeric_id!(
    /// Identifier of a lendable item
    ItemId
);
numeric_id!(
    /// Identifier of a loan record
    TransactionId
);
numeric_id!(
    /// Identifier of a fine
    FineId
);
numeric_id!(
    /// Identifier of a scheduled event
    EventId
);

/// Identifier of a bookable room, e.g. `R101`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Build a room identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The record sets kept by the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EntityKind {
    /// Library members
    Members,
    /// Lendable items
    Items,
    /// Loan records
    Transactions,
    /// Fines and fees
    Fines,
    /// Room bookings
    Events,
    /// Bookable rooms
    Rooms,
}

impl EntityKind {
    /// Every kind, in load order
    pub const ALL: [Self; 6] =
        [Self::Members, Self::Items, Self::Transactions, Self::Fines, Self::Events, Self::Rooms];

    /// File name used by directory-backed stores
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Members => "members.csv",
            Self::Items => "items.csv",
            Self::Transactions => "transactions.csv",
            Self::Fines => "fines.csv",
            Self::Events => "events.csv",
            Self::Rooms => "rooms.csv",
        }
    }

    /// Canonical column order for this kind
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Members => &[
                "member_id",
                "name",
                "address",
                "email",
                "phone",
                "membership_type",
                "join_date",
                "expiry_date",
                "status",
            ],
            Self::Items => &[
                "item_id",
                "title",
                "type",
                "author",
                "isbn",
                "publication_year",
                "value",
                "status",
                "location",
            ],
            Self::Transactions => &[
                "transaction_id",
                "member_id",
                "member_name",
                "item_id",
                "title",
                "checkout_date",
                "due_date",
                "return_date",
                "staff_initials",
            ],
            Self::Fines => &[
                "fine_id",
                "member_id",
                "violation_type",
                "amount",
                "assessment_date",
                "paid_date",
                "item_id",
                "status",
                "description",
            ],
            Self::Events => &[
                "event_id",
                "event_name",
                "event_date",
                "start_time",
                "end_time",
                "room_id",
                "organizer",
                "expected_attendance",
                "description",
                "approval_signature",
                "status",
            ],
            Self::Rooms => {
                &["room_id", "room_name", "capacity", "floor", "features", "availability"]
            }
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Members => "members",
            Self::Items => "items",
            Self::Transactions => "transactions",
            Self::Fines => "fines",
            Self::Events => "events",
            Self::Rooms => "rooms",
        };
        f.write_str(name)
    }
}

/// Error for a status or type string outside its fixed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct UnknownVariant {
    /// Which vocabulary was being parsed
    pub what: &'static str,
    /// The rejected text
    pub value: String,
}

/// Membership category of a member
///
/// Enrollment accepts only the five offered categories (see the `FromStr`
/// impl). Stored records may carry any other name, which is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum MembershipType {
    /// Regular adult membership
    Standard,
    /// Extended borrowing privileges
    Premium,
    /// Student membership
    Student,
    /// Adult category from the application form
    Adult,
    /// Child category from the application form
    Child,
    /// A category outside the offered set, kept verbatim
    Other(String),
}

impl MembershipType {
    /// Every category offered at enrollment, in display order
    pub const OFFERED: [Self; 5] =
        [Self::Standard, Self::Premium, Self::Student, Self::Adult, Self::Child];

    /// Name as stored in records
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Standard => "Standard",
            Self::Premium => "Premium",
            Self::Student => "Student",
            Self::Adult => "Adult",
            Self::Child => "Child",
            Self::Other(name) => name,
        }
    }

    /// Comma-separated names of the offered categories
    #[must_use]
    pub fn offered_names() -> String {
        Self::OFFERED.iter().map(Self::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MembershipType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Standard" => Self::Standard,
            "Premium" => Self::Premium,
            "Student" => Self::Student,
            "Adult" => Self::Adult,
            "Child" => Self::Child,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MembershipType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<MembershipType> for String {
    fn from(membership_type: MembershipType) -> Self {
        match membership_type {
            MembershipType::Other(name) => name,
            offered => offered.as_str().to_string(),
        }
    }
}

/// Parses one of the offered categories; names are case-sensitive
impl FromStr for MembershipType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from(s) {
            Self::Other(_) => {
                Err(UnknownVariant { what: "membership type", value: s.to_string() })
            }
            offered => Ok(offered),
        }
    }
}

/// Whether a membership is in force
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MemberStatus {
    /// Membership is current
    #[default]
    Active,
    /// Membership lapsed
    Expired,
}

impl MemberStatus {
    /// Name as stored in records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(UnknownVariant { what: "member status", value: s.to_string() }),
        }
    }
}

/// Kind of lendable item; the set is open-ended
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ItemType {
    /// Printed book
    Book,
    /// Video disc
    Dvd,
    /// Lendable hardware
    Device,
    /// Any other catalogued type, kept verbatim
    Other(String),
}

impl ItemType {
    /// Name as stored in records
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Book => "Book",
            Self::Dvd => "DVD",
            Self::Device => "Device",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ItemType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Book" => Self::Book,
            "DVD" => Self::Dvd,
            "Device" => Self::Device,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Circulation state of an item
///
/// `Available ⇄ CheckedOut → Lost`; lost is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ItemStatus {
    /// On the shelf
    #[default]
    Available,
    /// Lent to a member
    CheckedOut,
    /// Declared lost after a very late return
    Lost,
}

impl ItemStatus {
    /// Name as stored in records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::CheckedOut => "checked_out",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "checked_out" => Ok(Self::CheckedOut),
            "lost" => Ok(Self::Lost),
            _ => Err(UnknownVariant { what: "item status", value: s.to_string() }),
        }
    }
}

/// Whether a loan is still open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LoanState {
    /// Not yet returned
    #[default]
    Active,
    /// Returned on the given date
    Returned(NaiveDate),
}

impl LoanState {
    /// Whether the loan is still open
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return date, if returned
    #[must_use]
    pub const fn return_date(self) -> Option<NaiveDate> {
        match self {
            Self::Active => None,
            Self::Returned(date) => Some(date),
        }
    }
}

/// Reason a fine was assessed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ViolationType {
    /// Item returned after its due date
    Overdue,
    /// Room booking canceled inside the late window
    LateEventCancellation,
    /// Any other recorded violation, kept verbatim
    Other(String),
}

impl ViolationType {
    /// Name as stored in records
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Overdue => "Overdue",
            Self::LateEventCancellation => "Late Event Cancellation",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ViolationType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Overdue" => Self::Overdue,
            "Late Event Cancellation" => Self::LateEventCancellation,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Payment state of a fine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FineStatus {
    /// Awaiting payment
    Outstanding,
    /// Settled
    Paid,
    /// Any other recorded status (e.g. `unpaid`), kept verbatim
    Other(String),
}

impl FineStatus {
    /// Name as stored in records
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Outstanding => "outstanding",
            Self::Paid => "paid",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for FineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FineStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "outstanding" => Self::Outstanding,
            "paid" => Self::Paid,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

/// Booking state of an event
///
/// `Pending | Confirmed → Canceled`; canceled is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventStatus {
    /// Booked, awaiting approval
    #[default]
    Pending,
    /// Approved
    Confirmed,
    /// Called off
    Canceled,
}

impl EventStatus {
    /// Name as stored in records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(UnknownVariant { what: "event status", value: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_type_is_exact() {
        assert_eq!("Premium".parse::<MembershipType>(), Ok(MembershipType::Premium));
        assert!("premium".parse::<MembershipType>().is_err());
        assert!("InvalidType".parse::<MembershipType>().is_err());
    }

    #[test]
    fn test_stored_membership_type_is_open() {
        let senior = MembershipType::from("Senior");
        assert_eq!(senior, MembershipType::Other("Senior".to_string()));
        assert_eq!(senior.to_string(), "Senior");
        assert_eq!(MembershipType::from(" Child "), MembershipType::Child);
        assert_eq!(String::from(senior), "Senior");
        assert_eq!(MembershipType::offered_names(), "Standard, Premium, Student, Adult, Child");
    }

    #[test]
    fn test_open_vocabularies_keep_text() {
        assert_eq!(ItemType::from("DVD"), ItemType::Dvd);
        assert_eq!(ItemType::from("Magazine").as_str(), "Magazine");
        assert_eq!(FineStatus::from("unpaid").as_str(), "unpaid");
        assert_eq!(FineStatus::from("PAID"), FineStatus::Paid);
        assert_eq!(
            ViolationType::from("Late Event Cancellation"),
            ViolationType::LateEventCancellation
        );
    }

    #[test]
    fn test_status_round_trip_text() {
        for status in [ItemStatus::Available, ItemStatus::CheckedOut, ItemStatus::Lost] {
            assert_eq!(status.as_str().parse::<ItemStatus>(), Ok(status));
        }
        assert_eq!("cancelled".parse::<EventStatus>(), Ok(EventStatus::Canceled));
    }

    #[test]
    fn test_columns_start_with_id() {
        for kind in EntityKind::ALL {
            let first = kind.columns().first().copied().unwrap_or_default();
            assert!(first.ends_with("_id"), "{kind} starts with {first}");
        }
    }
}
