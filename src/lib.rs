//! Circulation, membership and room-booking rules for a small library.
//!
//! This crate provides the transactional core of a library desk: enrolling
//! and renewing members, lending and taking back items with overdue fines,
//! and booking rooms with conflict checks and late-cancellation fees.
//!
//! Records live in flat CSV record sets behind the [`RecordStore`] trait.
//! The business rules are pure functions in [`validation`], driven by an
//! explicit [`PolicyConfig`]; [`LibrarySystem`] composes them into the
//! operations that change stored state.

pub mod calendar;
pub mod clock;
pub mod entities;
pub mod error;
pub mod model;
pub mod money;
pub mod observers;
pub mod persistence;
pub mod policy;
pub mod record;
pub mod system;
pub mod table;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entities::{Event, Fine, Item, Member, Room, Transaction};
pub use error::{LibraryError, LibraryResult, StoreError, Violation};
pub use money::Money;
pub use observers::{Activity, ActivityLogger, ActivityObserver, NotificationService};
pub use persistence::{CsvDirStore, MemoryStore, RecordStore};
pub use policy::PolicyConfig;
pub use system::{
    CheckoutRequest, EventRequest, LibrarySystem, NewMember, Receipt, ReturnRequest,
};
