use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    calendar::{format_date, format_time},
    error::{LibraryError, LibraryResult},
    model::{
        EntityKind, EventId, EventStatus, FineId, FineStatus, ItemId, ItemStatus, ItemType,
        LoanState, MemberId, MemberStatus, MembershipType, RoomId, TransactionId, ViolationType,
    },
    money::Money,
    table::{Entity, FieldError, FieldReader, Sequenced},
};

/// A library member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    /// Unique, assigned at enrollment
    pub member_id: MemberId,
    /// Full name
    pub name: String,
    /// Postal address
    pub address: String,
    /// Contact e-mail; unique ignoring case
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Membership category
    pub membership_type: MembershipType,
    /// Enrollment date
    pub join_date: NaiveDate,
    /// Date the membership lapses
    pub expiry_date: NaiveDate,
    /// Whether the membership is in force
    pub status: MemberStatus,
}

impl Member {
    /// Whether the member may borrow
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Members;
    const NAME: &'static str = "Member";
    const ID_COLUMN: &'static str = "member_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            member_id: record.parse("member_id")?,
            name: record.text("name"),
            address: record.text("address"),
            email: record.text("email"),
            phone: record.text("phone"),
            membership_type: MembershipType::from(record.raw("membership_type")),
            join_date: record.date("join_date")?,
            expiry_date: record.date("expiry_date")?,
            status: record.parse("status")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.member_id.to_string(),
            self.name.clone(),
            self.address.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.membership_type.to_string(),
            format_date(self.join_date),
            format_date(self.expiry_date),
            self.status.to_string(),
        ]
    }
}

impl Sequenced for Member {
    const FIRST_ID: u32 = 101;

    fn sequence(&self) -> u32 {
        self.member_id.0
    }
}

/// A lendable item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    /// Catalogue identifier
    pub item_id: ItemId,
    /// Title
    pub title: String,
    /// Kind of item; sets the loan period
    pub item_type: ItemType,
    /// Author or creator
    pub author: String,
    /// ISBN or `N/A`
    pub isbn: String,
    /// Year of publication, as catalogued
    pub publication_year: String,
    /// Replacement value, as catalogued
    pub value: String,
    /// Circulation state
    pub status: ItemStatus,
    /// Shelf location
    pub location: String,
}

impl Item {
    /// Lend the item: `available → checked_out`
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidTransition` unless the item is available.
    pub fn check_out(&mut self) -> LibraryResult<()> {
        match self.status {
            ItemStatus::Available => {
                self.status = ItemStatus::CheckedOut;
                Ok(())
            }
            from => Err(self.refuse(from, "checked out")),
        }
    }

    /// Take the item back: `checked_out → available`, or `→ lost` when `lost`
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidTransition` unless the item is checked out.
    pub fn check_in(&mut self, lost: bool) -> LibraryResult<ItemStatus> {
        match self.status {
            ItemStatus::CheckedOut => {
                self.status = if lost {
                    ItemStatus::Lost
                } else {
                    ItemStatus::Available
                };
                Ok(self.status)
            }
            from => Err(self.refuse(from, "returned")),
        }
    }

    /// Build the refusal for a transition out of `from`
    fn refuse(&self, from: ItemStatus, action: &'static str) -> LibraryError {
        LibraryError::InvalidTransition {
            subject: format!("Item {}", self.item_id),
            from: from.to_string(),
            action,
        }
    }
}

impl Entity for Item {
    const KIND: EntityKind = EntityKind::Items;
    const NAME: &'static str = "Item";
    const ID_COLUMN: &'static str = "item_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            item_id: record.parse("item_id")?,
            title: record.text("title"),
            item_type: ItemType::from(record.raw("type")),
            author: record.text("author"),
            isbn: record.text("isbn"),
            publication_year: record.text("publication_year"),
            value: record.text("value"),
            status: record.parse("status")?,
            location: record.text("location"),
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.item_id.to_string(),
            self.title.clone(),
            self.item_type.to_string(),
            self.author.clone(),
            self.isbn.clone(),
            self.publication_year.clone(),
            self.value.clone(),
            self.status.to_string(),
            self.location.clone(),
        ]
    }
}

/// A loan of one item to one member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    /// Unique, assigned at checkout
    pub transaction_id: TransactionId,
    /// Borrower
    pub member_id: MemberId,
    /// Borrower's name at checkout
    pub member_name: String,
    /// Item lent
    pub item_id: ItemId,
    /// Item title at checkout
    pub title: String,
    /// Date lent
    pub checkout_date: NaiveDate,
    /// Date due back
    pub due_date: NaiveDate,
    /// Open, or returned on a date
    pub state: LoanState,
    /// Staff member who processed the checkout
    pub staff_initials: String,
}

impl Transaction {
    /// Whether the loan is still open
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

impl Entity for Transaction {
    const KIND: EntityKind = EntityKind::Transactions;
    const NAME: &'static str = "Transaction";
    const ID_COLUMN: &'static str = "transaction_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            transaction_id: record.parse("transaction_id")?,
            member_id: record.parse("member_id")?,
            member_name: record.text("member_name"),
            item_id: record.parse("item_id")?,
            title: record.text("title"),
            checkout_date: record.date("checkout_date")?,
            due_date: record.date("due_date")?,
            state: record.date_opt("return_date")?.map_or(LoanState::Active, LoanState::Returned),
            staff_initials: record.text("staff_initials"),
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.transaction_id.to_string(),
            self.member_id.to_string(),
            self.member_name.clone(),
            self.item_id.to_string(),
            self.title.clone(),
            format_date(self.checkout_date),
            format_date(self.due_date),
            self.state.return_date().map(format_date).unwrap_or_default(),
            self.staff_initials.clone(),
        ]
    }
}

impl Sequenced for Transaction {
    const FIRST_ID: u32 = 1001;

    fn sequence(&self) -> u32 {
        self.transaction_id.0
    }
}

/// A fine or fee owed to the library
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Fine {
    /// Unique, assigned at assessment
    pub fine_id: FineId,
    /// Member owing; `None` while an event fee awaits organizer linkage
    pub member_id: Option<MemberId>,
    /// Reason for the fine
    pub violation_type: ViolationType,
    /// Amount owed
    pub amount: Money,
    /// Date assessed
    pub assessment_date: NaiveDate,
    /// Date paid, if any
    pub paid_date: Option<NaiveDate>,
    /// Item concerned, if any
    pub item_id: Option<ItemId>,
    /// Payment state
    pub status: FineStatus,
    /// Free-text explanation
    pub description: String,
}

impl Fine {
    /// Unpaid: status is not `paid`, or no payment date is recorded
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.status != FineStatus::Paid || self.paid_date.is_none()
    }
}

impl Entity for Fine {
    const KIND: EntityKind = EntityKind::Fines;
    const NAME: &'static str = "Fine";
    const ID_COLUMN: &'static str = "fine_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            fine_id: record.parse("fine_id")?,
            member_id: record.parse_opt("member_id")?,
            violation_type: ViolationType::from(record.raw("violation_type")),
            amount: record.parse("amount")?,
            assessment_date: record.date("assessment_date")?,
            paid_date: record.date_opt("paid_date")?,
            item_id: record.parse_opt("item_id")?,
            status: FineStatus::from(record.raw("status")),
            description: record.text("description"),
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.fine_id.to_string(),
            self.member_id.map(|id| id.to_string()).unwrap_or_default(),
            self.violation_type.to_string(),
            self.amount.to_string(),
            format_date(self.assessment_date),
            self.paid_date.map(format_date).unwrap_or_default(),
            self.item_id.map(|id| id.to_string()).unwrap_or_default(),
            self.status.to_string(),
            self.description.clone(),
        ]
    }
}

impl Sequenced for Fine {
    const FIRST_ID: u32 = 2001;

    fn sequence(&self) -> u32 {
        self.fine_id.0
    }
}

/// A room booking
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    /// Unique, assigned at scheduling
    pub event_id: EventId,
    /// Title
    pub event_name: String,
    /// Day of the event
    pub event_date: NaiveDate,
    /// Start time
    pub start_time: NaiveTime,
    /// End time
    pub end_time: NaiveTime,
    /// Room booked
    pub room_id: RoomId,
    /// Person or department running it
    pub organizer: String,
    /// Expected head count
    pub expected_attendance: u32,
    /// Free-text description
    pub description: String,
    /// Approver's signature, blank until approved
    pub approval_signature: String,
    /// Booking state
    pub status: EventStatus,
}

impl Event {
    /// Call the event off: `pending | confirmed → canceled`
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidTransition` if already canceled.
    pub fn cancel(&mut self) -> LibraryResult<()> {
        match self.status {
            EventStatus::Pending | EventStatus::Confirmed => {
                self.status = EventStatus::Canceled;
                Ok(())
            }
            EventStatus::Canceled => Err(LibraryError::InvalidTransition {
                subject: format!("Event {}", self.event_id),
                from: self.status.to_string(),
                action: "canceled",
            }),
        }
    }
}

impl Entity for Event {
    const KIND: EntityKind = EntityKind::Events;
    const NAME: &'static str = "Event";
    const ID_COLUMN: &'static str = "event_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            event_id: record.parse("event_id")?,
            event_name: record.text("event_name"),
            event_date: record.date("event_date")?,
            start_time: record.time("start_time")?,
            end_time: record.time("end_time")?,
            room_id: RoomId::new(record.raw("room_id").trim()),
            organizer: record.text("organizer"),
            expected_attendance: record.parse("expected_attendance")?,
            description: record.text("description"),
            approval_signature: record.text("approval_signature"),
            status: record.parse("status")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.event_id.to_string(),
            self.event_name.clone(),
            format_date(self.event_date),
            format_time(self.start_time),
            format_time(self.end_time),
            self.room_id.to_string(),
            self.organizer.clone(),
            self.expected_attendance.to_string(),
            self.description.clone(),
            self.approval_signature.clone(),
            self.status.to_string(),
        ]
    }
}

impl Sequenced for Event {
    const FIRST_ID: u32 = 301;

    fn sequence(&self) -> u32 {
        self.event_id.0
    }
}

/// A bookable room
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    /// Room identifier
    pub room_id: RoomId,
    /// Display name
    pub room_name: String,
    /// Maximum occupancy
    pub capacity: u32,
    /// Floor, as catalogued
    pub floor: String,
    /// Semicolon-separated equipment list
    pub features: String,
    /// Availability note, as catalogued
    pub availability: String,
}

impl Entity for Room {
    const KIND: EntityKind = EntityKind::Rooms;
    const NAME: &'static str = "Room";
    const ID_COLUMN: &'static str = "room_id";

    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            room_id: RoomId::new(record.raw("room_id").trim()),
            room_name: record.text("room_name"),
            capacity: record.parse("capacity")?,
            floor: record.text("floor"),
            features: record.text("features"),
            availability: record.text("availability"),
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.room_id.to_string(),
            self.room_name.clone(),
            self.capacity.to_string(),
            self.floor.clone(),
            self.features.clone(),
            self.availability.clone(),
        ]
    }
}
