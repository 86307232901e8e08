//! Business-rule checks.
//!
//! Every function here is pure: it reads the rows it is given and reports
//! whether the rule holds, never touching the store. Single-rule checks return
//! the one [`Violation`] they found; the composite checks collect every
//! failing rule in evaluation order.
//!
//! The loan and fine scans also read rows that failed to parse. Such a row
//! still counts as long as the columns the rule needs are readable.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::{
    calendar::days_between,
    entities::{Event, Fine, Member, Room, Transaction},
    error::Violation,
    model::{FineStatus, MemberId, RoomId},
    money::Money,
    policy::{PolicyConfig, WeeklyHours},
    table::{FieldReader, Table},
};

/// The booking a caller wants to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedEvent {
    /// Day of the event
    pub event_date: NaiveDate,
    /// Start time
    pub start_time: NaiveTime,
    /// End time
    pub end_time: NaiveTime,
    /// Room requested
    pub room_id: RoomId,
    /// Expected head count
    pub expected_attendance: u32,
}

/// Number of loans `member_id` holds that have not been returned
///
/// An unparsed loan row counts when its `member_id` reads as this member and
/// its `return_date` is empty; one whose `member_id` is unreadable is skipped.
#[must_use]
pub fn count_active_loans(transactions: &Table<Transaction>, member_id: MemberId) -> usize {
    let parsed = transactions
        .rows()
        .iter()
        .filter(|t| t.member_id == member_id && t.is_active())
        .count();
    let unparsed = transactions
        .malformed()
        .iter()
        .map(|bad| FieldReader::new(&bad.record))
        .filter(|row| {
            row.parse::<MemberId>("member_id").is_ok_and(|id| id == member_id)
                && row.raw("return_date").trim().is_empty()
        })
        .count();
    parsed.saturating_add(unparsed)
}

/// Total of `member_id`'s outstanding fines
///
/// An unparsed fine row counts when its `member_id` and `amount` are readable;
/// it is outstanding unless its status is `paid` and a payment date is present.
#[must_use]
pub fn sum_outstanding_fines(fines: &Table<Fine>, member_id: MemberId) -> Money {
    let parsed = fines
        .rows()
        .iter()
        .filter(|f| f.member_id == Some(member_id) && f.is_outstanding())
        .map(|f| f.amount);
    let unparsed = fines
        .malformed()
        .iter()
        .map(|bad| FieldReader::new(&bad.record))
        .filter(|row| {
            row.parse::<MemberId>("member_id").is_ok_and(|id| id == member_id)
                && (FineStatus::from(row.raw("status")) != FineStatus::Paid
                    || row.raw("paid_date").trim().is_empty())
        })
        .filter_map(|row| row.parse::<Money>("amount").ok());
    parsed.chain(unparsed).sum()
}

/// Refuse a checkout once the member holds their membership's limit
///
/// # Errors
///
/// Returns `Violation::ItemLimit` when `active_loans` has reached the limit.
pub fn validate_item_limit(
    member: &Member,
    active_loans: usize,
    policy: &PolicyConfig,
) -> Result<(), Violation> {
    let limit = policy.item_limit(&member.membership_type);
    if active_loans < limit {
        Ok(())
    } else {
        Err(Violation::ItemLimit {
            active: active_loans,
            limit,
            membership_type: member.membership_type.clone(),
        })
    }
}

/// Refuse a checkout while outstanding fines exceed the threshold
///
/// A total equal to the threshold passes.
///
/// # Errors
///
/// Returns `Violation::FineThreshold` when `outstanding > threshold`.
pub fn validate_fine_threshold(outstanding: Money, threshold: Money) -> Result<(), Violation> {
    if outstanding > threshold {
        Err(Violation::FineThreshold { outstanding, threshold })
    } else {
        Ok(())
    }
}

/// Run every checkout rule for `member`
///
/// # Errors
///
/// Returns all failing rules: item limit first, then fine threshold.
pub fn validate_checkout(
    member: &Member,
    transactions: &Table<Transaction>,
    fines: &Table<Fine>,
    policy: &PolicyConfig,
) -> Result<(), Vec<Violation>> {
    let active = count_active_loans(transactions, member.member_id);
    let outstanding = sum_outstanding_fines(fines, member.member_id);
    collect([
        validate_item_limit(member, active, policy),
        validate_fine_threshold(outstanding, policy.fine_threshold),
    ])
}

/// Find an existing booking that overlaps the proposed one
///
/// Bookings overlap when they share a date and room and their half-open time
/// ranges intersect, so back-to-back events are fine. Every stored booking
/// counts, whatever its status. The first overlap found is reported.
///
/// # Errors
///
/// Returns `Violation::EndNotAfterStart` before scanning if the proposed
/// times are inverted, otherwise `Violation::Conflict` for the first overlap.
pub fn detect_event_conflicts(
    proposed: &ProposedEvent,
    existing: &[Event],
) -> Result<(), Violation> {
    if proposed.end_time <= proposed.start_time {
        return Err(Violation::EndNotAfterStart {
            start: proposed.start_time,
            end: proposed.end_time,
        });
    }
    let clash = existing.iter().find(|event| {
        event.event_date == proposed.event_date
            && event.room_id == proposed.room_id
            && proposed.start_time < event.end_time
            && proposed.end_time > event.start_time
    });
    match clash {
        Some(event) => Err(Violation::Conflict {
            event_id: event.event_id,
            start: event.start_time,
            end: event.end_time,
        }),
        None => Ok(()),
    }
}

/// Refuse a booking whose attendance exceeds the room's capacity
///
/// # Errors
///
/// Returns `Violation::Capacity` when `expected_attendance > capacity`.
pub fn validate_room_capacity(proposed: &ProposedEvent, room: &Room) -> Result<(), Violation> {
    if proposed.expected_attendance > room.capacity {
        Err(Violation::Capacity {
            room_id: room.room_id.clone(),
            attendance: proposed.expected_attendance,
            capacity: room.capacity,
        })
    } else {
        Ok(())
    }
}

/// Refuse a booking made fewer than `minimum_days` calendar days ahead
///
/// # Errors
///
/// Returns `Violation::AdvanceNotice` when the event is too close.
pub fn validate_advance_notice(
    event_date: NaiveDate,
    booking_date: NaiveDate,
    minimum_days: i64,
) -> Result<(), Violation> {
    let days = days_between(booking_date, event_date);
    if days < minimum_days {
        Err(Violation::AdvanceNotice { days, minimum: minimum_days })
    } else {
        Ok(())
    }
}

/// Refuse a booking that starts before opening or ends after closing
///
/// # Errors
///
/// Returns `Violation::OutsideHours` naming the weekday's window.
pub fn validate_operating_hours(
    event_date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    hours: &WeeklyHours,
) -> Result<(), Violation> {
    let weekday = event_date.weekday();
    let window = hours.on(weekday);
    if window.contains(start, end) {
        Ok(())
    } else {
        Err(Violation::OutsideHours {
            weekday,
            open: window.open,
            close: window.close,
            start,
            end,
        })
    }
}

/// Run every booking rule for `proposed`
///
/// An unknown room fails on its own. Otherwise conflict, capacity, advance
/// notice and operating hours are all evaluated and every failure returned.
///
/// # Errors
///
/// Returns the failing rules in evaluation order.
pub fn validate_event(
    proposed: &ProposedEvent,
    existing: &[Event],
    rooms: &[Room],
    booking_date: NaiveDate,
    policy: &PolicyConfig,
) -> Result<(), Vec<Violation>> {
    let Some(room) = rooms.iter().find(|room| room.room_id == proposed.room_id) else {
        return Err(vec![Violation::UnknownRoom(proposed.room_id.clone())]);
    };
    collect([
        detect_event_conflicts(proposed, existing),
        validate_room_capacity(proposed, room),
        validate_advance_notice(proposed.event_date, booking_date, policy.advance_notice_days),
        validate_operating_hours(
            proposed.event_date,
            proposed.start_time,
            proposed.end_time,
            &policy.operating_hours,
        ),
    ])
}

/// Gather the failures from a fixed list of checks
fn collect<const N: usize>(checks: [Result<(), Violation>; N]) -> Result<(), Vec<Violation>> {
    let violations: Vec<Violation> = checks.into_iter().filter_map(Result::err).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
