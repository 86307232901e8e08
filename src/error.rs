use std::{fmt, path::PathBuf};

use chrono::{NaiveTime, Weekday};
use thiserror::Error;

use crate::{
    calendar::{format_time, weekday_name},
    model::{EntityKind, EventId, MemberId, MemberStatus, MembershipType, RoomId},
    money::Money,
};

/// Result alias for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors returned by library operations
///
/// Every failure is reported through this type; its `Display` output is the
/// human-readable message shown to staff.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A required input is missing, blank or malformed
    #[error("{0}")]
    Validation(String),
    /// A referenced record does not exist
    #[error("{kind} with ID {id} not found")]
    NotFound {
        /// Kind of record, e.g. `Member`
        kind: &'static str,
        /// The identifier that was looked up
        id: String,
    },
    /// One or more business rules refused the request
    #[error("{}", join_violations(.0))]
    Policy(Vec<Violation>),
    /// A stored value could not be interpreted while serving a valid request
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    /// The record's lifecycle does not allow the requested change
    #[error("{subject} cannot be {action} (status: {from})")]
    InvalidTransition {
        /// The record, e.g. `Event 301`
        subject: String,
        /// Current status
        from: String,
        /// Past participle of the refused action
        action: &'static str,
    },
    /// Loading or saving record sets failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// Policy configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LibraryError {
    /// Shorthand for a [`LibraryError::NotFound`]
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    /// Shorthand for a single-reason [`LibraryError::Policy`]
    #[must_use]
    pub fn policy(violation: Violation) -> Self {
        Self::Policy(vec![violation])
    }

    /// The policy violations carried by this error, if any
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Policy(violations) => violations,
            _ => &[],
        }
    }
}

/// Join violation reasons into one message
fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Errors raised by record stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file for an entity kind does not exist
    #[error("{kind} file not found: {}", .path.display())]
    Missing {
        /// Entity kind whose file is missing
        kind: EntityKind,
        /// Expected location
        path: PathBuf,
    },
    /// Reading or writing a backing file failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The file is not well-formed CSV
    #[error("Malformed CSV at line {line}: {reason}")]
    Csv {
        /// One-based line where the problem starts
        line: usize,
        /// What went wrong
        reason: String,
    },
    /// An in-memory store has no record set for the kind
    #[error("No {0} record set loaded")]
    Absent(EntityKind),
}

/// A single business-rule failure
///
/// The `Display` form is the reason reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The member already holds as many items as the membership allows
    ItemLimit {
        /// Current active loans
        active: usize,
        /// Allowed loans for the membership
        limit: usize,
        /// Membership used for the lookup
        membership_type: MembershipType,
    },
    /// Unpaid fines are above the checkout threshold
    FineThreshold {
        /// Total outstanding
        outstanding: Money,
        /// Configured threshold
        threshold: Money,
    },
    /// The member's status does not allow borrowing
    MemberInactive {
        /// Member concerned
        member_id: MemberId,
        /// Current status
        status: MemberStatus,
    },
    /// The requested end time is not after the start time
    EndNotAfterStart {
        /// Requested start
        start: NaiveTime,
        /// Requested end
        end: NaiveTime,
    },
    /// The requested slot overlaps an existing booking
    Conflict {
        /// Event already holding the room
        event_id: EventId,
        /// Its start time
        start: NaiveTime,
        /// Its end time
        end: NaiveTime,
    },
    /// More attendees are expected than the room holds
    Capacity {
        /// Room requested
        room_id: RoomId,
        /// Expected attendance
        attendance: u32,
        /// Room capacity
        capacity: u32,
    },
    /// The event is booked too close to its date
    AdvanceNotice {
        /// Days between booking and event
        days: i64,
        /// Minimum required
        minimum: i64,
    },
    /// The slot falls outside the library's opening hours for that day
    OutsideHours {
        /// Day of the event
        weekday: Weekday,
        /// Opening time that day
        open: NaiveTime,
        /// Closing time that day
        close: NaiveTime,
        /// Requested start
        start: NaiveTime,
        /// Requested end
        end: NaiveTime,
    },
    /// The event names a room that does not exist
    UnknownRoom(RoomId),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemLimit { active, limit, membership_type } => write!(
                f,
                "Item limit exceeded ({active}/{limit}) for membership_type='{membership_type}'"
            ),
            Self::FineThreshold { outstanding, threshold } => {
                write!(f, "Outstanding fines ${outstanding} exceed threshold ${threshold}")
            }
            Self::MemberInactive { member_id, status } => {
                write!(f, "Member {member_id} is not active (status: {status})")
            }
            Self::EndNotAfterStart { start, end } => write!(
                f,
                "End time {} must be after start time {}",
                format_time(*end),
                format_time(*start)
            ),
            Self::Conflict { event_id, start, end } => write!(
                f,
                "Scheduling conflict with event {event_id} ({}-{})",
                format_time(*start),
                format_time(*end)
            ),
            Self::Capacity { room_id, attendance, capacity } => write!(
                f,
                "Expected attendance {attendance} exceeds room {room_id} capacity of {capacity}"
            ),
            Self::AdvanceNotice { days, minimum } => write!(
                f,
                "Insufficient advance notice: event is {days} days away, minimum is {minimum} days"
            ),
            Self::OutsideHours { weekday, open, close, start, end } => write!(
                f,
                "Event time {}-{} is outside operating hours for {} ({}-{})",
                format_time(*start),
                format_time(*end),
                weekday_name(*weekday),
                format_time(*open),
                format_time(*close)
            ),
            Self::UnknownRoom(room_id) => write!(f, "Room {room_id} not found"),
        }
    }
}
