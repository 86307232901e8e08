use std::fmt;

use chrono::NaiveDate;

use crate::{
    calendar::{
        add_days, add_months, at, days_between, parse_date, parse_date_or_date_time, parse_time,
    },
    clock::{Clock, SystemClock},
    entities::{Event, Fine, Item, Member, Room, Transaction},
    error::{LibraryError, LibraryResult, Violation},
    model::{
        EntityKind, EventId, EventStatus, FineId, FineStatus, ItemId, LoanState, MemberId,
        MemberStatus, MembershipType, RoomId, TransactionId, ViolationType,
    },
    money::Money,
    observers::{Activity, ActivityLogger, ActivityObserver, NotificationService},
    persistence::RecordStore,
    policy::PolicyConfig,
    record::RecordSet,
    table::{Entity, Table},
    validation::{
        ProposedEvent, detect_event_conflicts, validate_advance_notice, validate_checkout,
        validate_operating_hours, validate_room_capacity,
    },
};

/// Months added to a membership on enrollment or renewal
const MEMBERSHIP_TERM_MONTHS: u32 = 12;

/// Outcome of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    /// Human-readable confirmation
    pub message: String,
    /// Identifier or amount the operation produced
    pub value: T,
}

impl<T> Receipt<T> {
    /// Pair a message with its value
    fn new(message: impl Into<String>, value: T) -> Self {
        Self { message: message.into(), value }
    }
}

/// Application form for a new member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMember {
    /// Full name
    pub name: String,
    /// Postal address
    pub address: String,
    /// Contact e-mail
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// One of the membership type names
    pub membership_type: String,
    /// `YYYY-MM-DD`; today when absent
    pub join_date: Option<String>,
}

/// A request to lend an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Borrower
    pub member_id: MemberId,
    /// Item to lend
    pub item_id: ItemId,
    /// `YYYY-MM-DD`; today when absent
    pub checkout_date: Option<String>,
    /// Staff member processing the loan
    pub staff_initials: String,
}

/// A request to take an item back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnRequest {
    /// Item returned
    pub item_id: ItemId,
    /// `YYYY-MM-DD`; today when absent
    pub return_date: Option<String>,
}

/// A request to book a room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRequest {
    /// Title
    pub event_name: String,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    /// Room to book
    pub room_id: String,
    /// Person or department running it
    pub organizer: String,
    /// Expected head count; must be positive
    pub expected_attendance: i64,
    /// Free-text description
    pub description: Option<String>,
    /// `YYYY-MM-DD` the booking is made; today when absent
    pub booking_date: Option<String>,
}

/// The library's circulation desk
///
/// Every operation loads the record sets it needs from the store, checks the
/// request against current state and the policy, and only then writes every
/// affected set back in a single save. Observers hear about an operation once
/// that save has succeeded.
pub struct LibrarySystem<S> {
    /// Where record sets live
    store: S,
    /// Business rules in force
    policy: PolicyConfig,
    /// Source of "today" and "now"
    clock: Box<dyn Clock>,
    /// Registered activity observers
    observers: Vec<Box<dyn ActivityObserver>>,
    /// Recently committed operations, oldest first
    history: Vec<Activity>,
    /// Maximum number of history entries to keep
    max_history_size: usize,
}

// Manual implementation of Debug for LibrarySystem
impl<S: fmt::Debug> fmt::Debug for LibrarySystem<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibrarySystem")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("today", &self.clock.today())
            .field("observers_count", &self.observers.len())
            .field("history", &self.history)
            .field("max_history_size", &self.max_history_size)
            .finish()
    }
}

impl<S: RecordStore> LibrarySystem<S> {
    /// Open the desk over `store` with the standard observers and the wall clock
    #[must_use]
    pub fn new(store: S, policy: PolicyConfig) -> Self {
        let mut system = Self {
            store,
            policy,
            clock: Box::new(SystemClock),
            observers: Vec::new(),
            history: Vec::new(),
            max_history_size: 100,
        };
        system.register_observer(Box::new(ActivityLogger));
        system.register_observer(Box::new(NotificationService));
        system
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Register an observer to be notified of committed operations
    pub fn register_observer(&mut self, observer: Box<dyn ActivityObserver>) {
        self.observers.push(observer);
    }

    /// The backing store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the backing store
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Rules in force
    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Recently committed operations, oldest first
    #[must_use]
    pub fn history(&self) -> &[Activity] {
        &self.history
    }

    /// Enroll a new member
    ///
    /// The membership runs for twelve calendar months from the join date.
    ///
    /// # Errors
    ///
    /// - `Validation` if a field is blank, the membership type is unknown,
    ///   the join date is malformed or the e-mail is already registered
    /// - `Store` if the member records cannot be loaded or saved
    pub fn enroll_member(&mut self, application: &NewMember) -> LibraryResult<Receipt<MemberId>> {
        let name = required("Name", &application.name)?;
        let address = required("Address", &application.address)?;
        let email = required("Email", &application.email)?;
        let phone = required("Phone", &application.phone)?;
        let membership_type = required("Membership type", &application.membership_type)?;
        let membership_type: MembershipType = membership_type.parse().map_err(|_| {
            LibraryError::Validation(format!(
                "Invalid membership type. Must be one of: {}",
                MembershipType::offered_names()
            ))
        })?;
        let join_date = self.date_or_today(application.join_date.as_deref(), "join_date")?;

        let mut members = self.load::<Member>()?;
        let wanted = email.to_lowercase();
        if members.raw_column("email").any(|existing| existing.trim().to_lowercase() == wanted) {
            return Err(LibraryError::Validation(format!("Email already registered: {email}")));
        }

        let member_id = MemberId(members.next_id());
        let expiry_date = add_months(join_date, MEMBERSHIP_TERM_MONTHS);
        members.push(Member {
            member_id,
            name: name.to_string(),
            address: address.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            membership_type: membership_type.clone(),
            join_date,
            expiry_date,
            status: MemberStatus::Active,
        });

        self.commit(
            vec![(EntityKind::Members, members.to_record_set())],
            Activity::Enrolled { member_id, membership_type, expiry_date },
        )?;
        Ok(Receipt::new(format!("Member added successfully with ID: {member_id}"), member_id))
    }

    /// Extend a membership by twelve months
    ///
    /// A current membership is extended from its expiry date; a lapsed one
    /// from today. Either way the member becomes active.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no such member
    /// - `DataIntegrity` if the stored member record cannot be read
    /// - `Store` if the member records cannot be loaded or saved
    pub fn renew_membership(&mut self, member_id: MemberId) -> LibraryResult<Receipt<NaiveDate>> {
        let today = self.clock.today();
        let mut members = self.load::<Member>()?;
        let member = members.require_mut(&member_id.to_string(), |m| m.member_id == member_id)?;

        let previous_expiry = member.expiry_date;
        let base = if previous_expiry >= today {
            previous_expiry
        } else {
            today
        };
        member.expiry_date = add_months(base, MEMBERSHIP_TERM_MONTHS);
        member.status = MemberStatus::Active;
        let new_expiry = member.expiry_date;

        self.commit(
            vec![(EntityKind::Members, members.to_record_set())],
            Activity::Renewed { member_id, previous_expiry, new_expiry },
        )?;
        Ok(Receipt::new(
            format!(
                "Membership renewed successfully for member ID: {member_id}. New expiry date: {new_expiry}"
            ),
            new_expiry,
        ))
    }

    /// Lend an item to a member
    ///
    /// The loan is due after the checkout period for the item's type.
    ///
    /// # Errors
    ///
    /// In the order checked:
    /// - `NotFound` / `DataIntegrity` for the member
    /// - `Policy` if the member is not active, or with every failing checkout
    ///   rule (item limit, fine threshold)
    /// - `NotFound` / `DataIntegrity` for the item
    /// - `InvalidTransition` if the item is not available
    /// - `Validation` if the checkout date is malformed
    /// - `Store` if records cannot be loaded or saved
    pub fn checkout_item(
        &mut self,
        request: &CheckoutRequest,
    ) -> LibraryResult<Receipt<TransactionId>> {
        let CheckoutRequest { member_id, item_id, ref checkout_date, ref staff_initials } =
            *request;
        let members = self.load::<Member>()?;
        let mut items = self.load::<Item>()?;
        let mut transactions = self.load::<Transaction>()?;
        let fines = self.load::<Fine>()?;

        let member = members.require(&member_id.to_string(), |m| m.member_id == member_id)?;
        if !member.is_active() {
            return Err(LibraryError::policy(Violation::MemberInactive {
                member_id,
                status: member.status,
            }));
        }
        validate_checkout(member, &transactions, &fines, &self.policy)
            .map_err(LibraryError::Policy)?;

        let item = items.require_mut(&item_id.to_string(), |i| i.item_id == item_id)?;
        item.check_out()?;
        let checkout_date = self.date_or_today(checkout_date.as_deref(), "checkout_date")?;
        let due_date = add_days(checkout_date, self.policy.checkout_period(&item.item_type));

        let transaction_id = TransactionId(transactions.next_id());
        transactions.push(Transaction {
            transaction_id,
            member_id,
            member_name: member.name.clone(),
            item_id,
            title: item.title.clone(),
            checkout_date,
            due_date,
            state: LoanState::Active,
            staff_initials: staff_initials.trim().to_string(),
        });

        self.commit(
            vec![
                (EntityKind::Items, items.to_record_set()),
                (EntityKind::Transactions, transactions.to_record_set()),
            ],
            Activity::CheckedOut { transaction_id, member_id, item_id, due_date },
        )?;
        Ok(Receipt::new(
            format!(
                "Item {item_id} checked out successfully to member {member_id}. Due date: {due_date}"
            ),
            transaction_id,
        ))
    }

    /// Take an item back, closing its loan and assessing any overdue fine
    ///
    /// The fine is the daily rate per day late, capped; an item more than the
    /// lost threshold late is declared lost instead of reshelved.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `DataIntegrity` for the item
    /// - `NotFound` if the item has no active loan
    /// - `DataIntegrity` if the active loan record cannot be read, or the
    ///   item is not recorded as checked out
    /// - `Validation` if the return date is malformed
    /// - `Store` if records cannot be loaded or saved
    pub fn return_item(&mut self, request: &ReturnRequest) -> LibraryResult<Receipt<Money>> {
        let ReturnRequest { item_id, ref return_date } = *request;
        let mut items = self.load::<Item>()?;
        let mut transactions = self.load::<Transaction>()?;
        let mut fines = self.load::<Fine>()?;

        let item = items.require_mut(&item_id.to_string(), |i| i.item_id == item_id)?;
        let loan = active_loan_mut(&mut transactions, item_id)?;
        let return_date = self.date_or_today(return_date.as_deref(), "return_date")?;

        let days_late = days_between(loan.due_date, return_date).max(0);
        let amount = self.policy.overdue_fine(days_late);
        let lost = self.policy.is_lost(days_late);
        item.check_in(lost).map_err(|e| LibraryError::DataIntegrity(e.to_string()))?;
        loan.state = LoanState::Returned(return_date);
        let (transaction_id, member_id) = (loan.transaction_id, loan.member_id);

        let mut sets = vec![
            (EntityKind::Items, items.to_record_set()),
            (EntityKind::Transactions, transactions.to_record_set()),
        ];
        let fine = if amount.is_positive() {
            let fine_id = FineId(fines.next_id());
            fines.push(Fine {
                fine_id,
                member_id: Some(member_id),
                violation_type: ViolationType::Overdue,
                amount,
                assessment_date: return_date,
                paid_date: None,
                item_id: Some(item_id),
                status: FineStatus::Outstanding,
                description: format!("Item {item_id} returned {days_late} days late"),
            });
            sets.push((EntityKind::Fines, fines.to_record_set()));
            Some((fine_id, amount))
        } else {
            None
        };

        self.commit(
            sets,
            Activity::Returned { transaction_id, member_id, item_id, days_late, fine, lost },
        )?;

        let mut message = if amount.is_positive() {
            format!("Item {item_id} returned {days_late} days late; fine assessed: ${amount}")
        } else {
            format!("Item {item_id} returned successfully; no fine assessed")
        };
        if lost {
            message.push_str("; item marked as lost");
        }
        Ok(Receipt::new(message, amount))
    }

    /// Book a room
    ///
    /// Checks run in a fixed order and the first failure is reported alone:
    /// conflict, capacity, advance notice, operating hours.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or organizer, non-positive attendance,
    ///   or a malformed date or time
    /// - `NotFound` / `DataIntegrity` for the room
    /// - `Policy` with the first failing booking rule
    /// - `Store` if records cannot be loaded or saved
    pub fn schedule_event(&mut self, request: &EventRequest) -> LibraryResult<Receipt<EventId>> {
        let event_name = required("Event name", &request.event_name)?;
        let organizer = required("Organizer", &request.organizer)?;
        if request.expected_attendance <= 0 {
            return Err(LibraryError::Validation(
                "Expected attendance must be a positive number".to_string(),
            ));
        }
        let expected_attendance = u32::try_from(request.expected_attendance).map_err(|_| {
            LibraryError::Validation(format!(
                "Expected attendance {} is too large",
                request.expected_attendance
            ))
        })?;
        let event_date = parse_date(request.event_date.trim())
            .ok_or_else(|| format_error("event_date", "YYYY-MM-DD"))?;
        let start_time = parse_time(request.start_time.trim())
            .ok_or_else(|| format_error("start_time", "HH:MM"))?;
        let end_time =
            parse_time(request.end_time.trim()).ok_or_else(|| format_error("end_time", "HH:MM"))?;
        let booking_date = self.date_or_today(request.booking_date.as_deref(), "booking_date")?;

        let rooms = self.load::<Room>()?;
        let mut events = self.load::<Event>()?;
        let room_id = RoomId::new(request.room_id.trim());
        let room = rooms.require(&room_id.0, |r| r.room_id == room_id)?;

        let proposed =
            ProposedEvent { event_date, start_time, end_time, room_id, expected_attendance };
        detect_event_conflicts(&proposed, events.rows()).map_err(LibraryError::policy)?;
        validate_room_capacity(&proposed, room).map_err(LibraryError::policy)?;
        validate_advance_notice(event_date, booking_date, self.policy.advance_notice_days)
            .map_err(LibraryError::policy)?;
        validate_operating_hours(event_date, start_time, end_time, &self.policy.operating_hours)
            .map_err(LibraryError::policy)?;

        let event_id = EventId(events.next_id());
        let room_id = proposed.room_id;
        events.push(Event {
            event_id,
            event_name: event_name.to_string(),
            event_date,
            start_time,
            end_time,
            room_id: room_id.clone(),
            organizer: organizer.to_string(),
            expected_attendance,
            description: request.description.as_deref().unwrap_or_default().trim().to_string(),
            approval_signature: String::new(),
            status: EventStatus::Pending,
        });

        self.commit(
            vec![(EntityKind::Events, events.to_record_set())],
            Activity::Scheduled { event_id, room_id, event_date },
        )?;
        Ok(Receipt::new(format!("Event scheduled successfully with ID: {event_id}"), event_id))
    }

    /// Cancel a booking, charging the late fee inside the cancellation window
    ///
    /// `cancellation` is `YYYY-MM-DD HH:MM` or a bare date. A bare date of
    /// today means now; any other bare date means its midnight. Absent means
    /// now. Returns the fee charged, if any.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `DataIntegrity` for the event
    /// - `InvalidTransition` if it is already canceled
    /// - `Validation` if the cancellation moment is malformed
    /// - `Store` if records cannot be loaded or saved
    pub fn cancel_event(
        &mut self,
        event_id: EventId,
        cancellation: Option<&str>,
    ) -> LibraryResult<Receipt<Option<Money>>> {
        let mut events = self.load::<Event>()?;
        let mut fines = self.load::<Fine>()?;
        let event = events.require_mut(&event_id.to_string(), |e| e.event_id == event_id)?;
        event.cancel()?;
        let starts_at = at(event.event_date, event.start_time);
        let description = format!(
            "Late cancellation of event {event_id} ({}) organized by {}",
            event.event_name, event.organizer
        );

        let now = self.clock.now();
        let cancelled_at = match cancellation.map(str::trim).filter(|s| !s.is_empty()) {
            None => now,
            Some(text) => match parse_date_or_date_time(text) {
                Some((date, Some(time))) => at(date, time),
                Some((date, None)) if date == now.date() => now,
                Some((date, None)) => at(date, chrono::NaiveTime::default()),
                None => {
                    return Err(format_error("cancellation_date", "YYYY-MM-DD or YYYY-MM-DD HH:MM"));
                }
            },
        };
        let minutes_until = starts_at.signed_duration_since(cancelled_at).num_minutes();
        let late = minutes_until < self.policy.late_cancellation_window_hours.saturating_mul(60);

        let mut sets = vec![(EntityKind::Events, events.to_record_set())];
        let fee = if late {
            let fine_id = FineId(fines.next_id());
            let amount = self.policy.late_cancellation_fee;
            fines.push(Fine {
                fine_id,
                member_id: None,
                violation_type: ViolationType::LateEventCancellation,
                amount,
                assessment_date: cancelled_at.date(),
                paid_date: None,
                item_id: None,
                status: FineStatus::Outstanding,
                description,
            });
            sets.push((EntityKind::Fines, fines.to_record_set()));
            Some((fine_id, amount))
        } else {
            None
        };

        self.commit(sets, Activity::Canceled { event_id, fee })?;
        let amount = fee.map(|(_, amount)| amount);
        let message = match amount {
            Some(amount) => {
                format!("Event {event_id} canceled; late cancellation fee of ${amount} assessed")
            }
            None => format!("Event {event_id} canceled; no late cancellation fee"),
        };
        Ok(Receipt::new(message, amount))
    }

    /// Load and parse one record set
    fn load<T: Entity>(&self) -> LibraryResult<Table<T>> {
        Ok(Table::from_record_set(self.store.load(T::KIND)?))
    }

    /// A supplied `YYYY-MM-DD` date, or today when absent or blank
    fn date_or_today(&self, text: Option<&str>, field: &str) -> LibraryResult<NaiveDate> {
        match text.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(self.clock.today()),
            Some(text) => parse_date(text).ok_or_else(|| format_error(field, "YYYY-MM-DD")),
        }
    }

    /// Save the affected sets as one unit, then record and announce the activity
    fn commit(
        &mut self,
        sets: Vec<(EntityKind, RecordSet)>,
        activity: Activity,
    ) -> LibraryResult<()> {
        self.store.save_all(sets)?;

        self.history.push(activity.clone());
        if self.history.len() > self.max_history_size {
            self.history.remove(0);
        }
        for observer in &self.observers {
            observer.on_activity(&activity);
        }
        Ok(())
    }
}

/// The open loan for `item_id`
///
/// A malformed loan row that names the item and has no return date means the
/// active loan cannot be read.
fn active_loan_mut(
    transactions: &mut Table<Transaction>,
    item_id: ItemId,
) -> LibraryResult<&mut Transaction> {
    let wanted = item_id.to_string();
    let unreadable = transactions.malformed().iter().find(|bad| {
        bad.record.value("item_id").trim() == wanted
            && bad.record.value("return_date").trim().is_empty()
    });
    if let Some(bad) = unreadable {
        return Err(LibraryError::DataIntegrity(format!(
            "active loan for item {item_id} has {}",
            bad.error
        )));
    }
    transactions
        .find_mut(|t| t.item_id == item_id && t.is_active())
        .ok_or_else(|| LibraryError::NotFound { kind: "Active loan for item", id: wanted })
}

/// A trimmed, non-blank field value
fn required<'v>(label: &str, value: &'v str) -> LibraryResult<&'v str> {
    let value = value.trim();
    if value.is_empty() {
        Err(LibraryError::Validation(format!("{label} is required")))
    } else {
        Ok(value)
    }
}

/// The error for a field that does not match its format
fn format_error(field: &str, format: &str) -> LibraryError {
    LibraryError::Validation(format!("Invalid {field} format. Use {format}"))
}
