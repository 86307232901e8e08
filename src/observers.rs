use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    model::{EventId, FineId, ItemId, MemberId, MembershipType, RoomId, TransactionId},
    money::Money,
};

/// A committed library operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "activity", rename_all = "snake_case")]
pub enum Activity {
    /// A member joined
    Enrolled {
        /// New member
        member_id: MemberId,
        /// Membership taken out
        membership_type: MembershipType,
        /// When it lapses
        expiry_date: NaiveDate,
    },
    /// A membership was extended
    Renewed {
        /// Member renewed
        member_id: MemberId,
        /// Expiry before renewal
        previous_expiry: NaiveDate,
        /// Expiry after renewal
        new_expiry: NaiveDate,
    },
    /// An item was lent
    CheckedOut {
        /// New loan
        transaction_id: TransactionId,
        /// Borrower
        member_id: MemberId,
        /// Item lent
        item_id: ItemId,
        /// Date due back
        due_date: NaiveDate,
    },
    /// An item came back
    Returned {
        /// Loan closed
        transaction_id: TransactionId,
        /// Borrower
        member_id: MemberId,
        /// Item returned
        item_id: ItemId,
        /// Days past the due date, zero if on time
        days_late: i64,
        /// Overdue fine assessed, if any
        fine: Option<(FineId, Money)>,
        /// Whether the item was declared lost
        lost: bool,
    },
    /// A room was booked
    Scheduled {
        /// New event
        event_id: EventId,
        /// Room booked
        room_id: RoomId,
        /// Day of the event
        event_date: NaiveDate,
    },
    /// A booking was called off
    Canceled {
        /// Event canceled
        event_id: EventId,
        /// Late-cancellation fee assessed, if any
        fee: Option<(FineId, Money)>,
    },
}

/// Trait for activity observation
pub trait ActivityObserver {
    /// Called after an operation has been saved
    fn on_activity(&self, activity: &Activity);
}

/// Logs every committed operation
#[derive(Debug)]
pub struct ActivityLogger;

impl ActivityObserver for ActivityLogger {
    fn on_activity(&self, activity: &Activity) {
        match activity {
            Activity::Enrolled { member_id, membership_type, expiry_date } => {
                tracing::info!(%member_id, %membership_type, %expiry_date, "member enrolled");
            }
            Activity::Renewed { member_id, previous_expiry, new_expiry } => {
                tracing::info!(%member_id, %previous_expiry, %new_expiry, "membership renewed");
            }
            Activity::CheckedOut { transaction_id, member_id, item_id, due_date } => {
                tracing::info!(
                    %transaction_id, %member_id, %item_id, %due_date,
                    "item checked out"
                );
            }
            Activity::Returned { transaction_id, item_id, days_late, lost, .. } => {
                tracing::info!(%transaction_id, %item_id, days_late, lost, "item returned");
            }
            Activity::Scheduled { event_id, room_id, event_date } => {
                tracing::info!(%event_id, %room_id, %event_date, "event scheduled");
            }
            Activity::Canceled { event_id, fee } => {
                tracing::info!(%event_id, late = fee.is_some(), "event canceled");
            }
        }
    }
}

/// Sends notifications when money becomes owed or an item is lost
#[derive(Debug)]
pub struct NotificationService;

impl ActivityObserver for NotificationService {
    fn on_activity(&self, activity: &Activity) {
        match activity {
            Activity::Returned { member_id, item_id, fine, lost, .. } => {
                if let Some((fine_id, amount)) = fine {
                    tracing::info!(
                        target: "notification",
                        %member_id, %fine_id, %amount,
                        "overdue fine assessed"
                    );
                }
                if *lost {
                    tracing::info!(
                        target: "notification",
                        %member_id, %item_id,
                        "item declared lost"
                    );
                }
            }
            Activity::Canceled { event_id, fee: Some((fine_id, amount)) } => {
                tracing::info!(
                    target: "notification",
                    %event_id, %fine_id, %amount,
                    "late cancellation fee assessed"
                );
            }
            _ => {}
        }
    }
}
