//! End-to-end runs of the circulation desk over a CSV data directory.

use std::{error::Error, fs};

use chrono::NaiveDate;
use library_circulation::{
    CheckoutRequest, CsvDirStore, EventRequest, FixedClock, LibraryError, LibrarySystem,
    MemoryStore, Money, NewMember, PolicyConfig, RecordStore, ReturnRequest, StoreError,
    model::{EntityKind, EventId, ItemId, MemberId},
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

const MEMBERS: &str = "\
member_id,name,address,email,phone,membership_type,join_date,expiry_date,status,notes
101,John Smith,\"123 Main St, Apt 4\",john.smith@email.com,555-0101,Standard,2023-01-15,2024-01-15,active,\"e-mail only, no calls\"
102,Emily Johnson,456 Oak Ave,emily.j@email.com,555-0102,Premium,2023-03-20,2025-02-06,active,
";

const ITEMS: &str = "\
item_id,title,type,author,isbn,publication_year,value,status,location
201,The Great Gatsby,Book,F. Scott Fitzgerald,978-0743273565,1925,15.99,available,A-shelf-12
204,The Matrix,DVD,Wachowski Brothers,N/A,1999,12.99,available,DVD-rack-03
";

const ROOMS: &str = "\
room_id,room_name,capacity,floor,features,availability
R101,Community Room A,50,1,Projector;Whiteboard;Chairs,available
";

fn init_tracing() {
    drop(tracing_subscriber::fmt().with_test_writer().try_init());
}

fn clock() -> FixedClock {
    FixedClock::on(NaiveDate::from_ymd_opt(2024, 11, 6).unwrap_or_default())
}

/// A data directory with members, items and rooms filled in
fn data_dir() -> Result<(TempDir, CsvDirStore), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let store = CsvDirStore::new(dir.path());
    fs::write(store.path_for(EntityKind::Members), MEMBERS)?;
    fs::write(store.path_for(EntityKind::Items), ITEMS)?;
    fs::write(store.path_for(EntityKind::Rooms), ROOMS)?;
    store.init_missing()?;
    Ok((dir, store))
}

#[test]
fn test_missing_file_is_reported() -> TestResult {
    let dir = TempDir::new()?;
    let mut system = LibrarySystem::new(CsvDirStore::new(dir.path()), PolicyConfig::default());
    let result = system.renew_membership(MemberId(101));
    assert!(matches!(
        result,
        Err(LibraryError::Store(StoreError::Missing { kind: EntityKind::Members, .. }))
    ));
    Ok(())
}

#[test]
fn test_init_missing_writes_headers_only() -> TestResult {
    let (_dir, store) = data_dir()?;
    let fines = fs::read_to_string(store.path_for(EntityKind::Fines))?;
    assert_eq!(
        fines,
        "fine_id,member_id,violation_type,amount,assessment_date,paid_date,item_id,status,description\n"
    );
    // existing files are left alone
    assert_eq!(fs::read_to_string(store.path_for(EntityKind::Members))?, MEMBERS);
    Ok(())
}

#[test]
fn test_desk_day_on_disk() -> TestResult {
    init_tracing();
    let (_dir, store) = data_dir()?;
    let mut system = LibrarySystem::new(store, PolicyConfig::default()).with_clock(clock());

    let enrolled = system.enroll_member(&NewMember {
        name: "Jane Doe".to_string(),
        address: "12 Elm St".to_string(),
        email: "jane.doe@email.com".to_string(),
        phone: "555-0199".to_string(),
        membership_type: "Student".to_string(),
        join_date: Some("2024-11-05".to_string()),
    })?;
    assert_eq!(enrolled.value, MemberId(103));

    let loan = system.checkout_item(&CheckoutRequest {
        member_id: MemberId(103),
        item_id: ItemId(204),
        checkout_date: Some("2024-11-07".to_string()),
        staff_initials: "JD".to_string(),
    })?;
    assert!(loan.message.contains("2024-11-14"));

    let returned = system.return_item(&ReturnRequest {
        item_id: ItemId(204),
        return_date: Some("2024-11-24".to_string()),
    })?;
    assert_eq!(returned.value, Money::from_cents(250));

    let booked = system.schedule_event(&EventRequest {
        event_name: "Chess Club, \"open\" night".to_string(),
        event_date: "2024-11-20".to_string(),
        start_time: "18:00".to_string(),
        end_time: "20:00".to_string(),
        room_id: "R101".to_string(),
        organizer: "Jane Doe".to_string(),
        expected_attendance: 12,
        description: None,
        booking_date: None,
    })?;
    assert_eq!(booked.value, EventId(301));
    let canceled = system.cancel_event(EventId(301), Some("2024-11-20 08:00"))?;
    assert_eq!(canceled.value, Some(Money::from_dollars(25)));

    let store = system.into_store();
    let fines = fs::read_to_string(store.path_for(EntityKind::Fines))?;
    assert!(fines.contains("2001,103,Overdue,2.50,2024-11-24,,204,outstanding,"));
    assert!(fines.contains("2002,,Late Event Cancellation,25.00,2024-11-20,,,outstanding,"));

    let events = fs::read_to_string(store.path_for(EntityKind::Events))?;
    assert!(events.contains("\"Chess Club, \"\"open\"\" night\""));
    assert!(events.trim_end().ends_with("canceled"));

    // the unknown column and quoting of untouched rows survive every save
    let members = fs::read_to_string(store.path_for(EntityKind::Members))?;
    assert!(members.starts_with(MEMBERS));
    assert!(members.ends_with("2024-11-05,2025-11-05,active,\n"));

    let dir_entries = fs::read_dir(store.root())?.count();
    assert_eq!(dir_entries, EntityKind::ALL.len(), "no temporary files left behind");
    Ok(())
}

#[test]
fn test_load_save_is_identity_on_disk() -> TestResult {
    let (_dir, mut store) = data_dir()?;
    let sets = EntityKind::ALL
        .into_iter()
        .map(|kind| store.load(kind).map(|set| (kind, set)))
        .collect::<Result<Vec<_>, _>>()?;
    store.save_all(sets)?;
    assert_eq!(fs::read_to_string(store.path_for(EntityKind::Members))?, MEMBERS);
    assert_eq!(fs::read_to_string(store.path_for(EntityKind::Items))?, ITEMS);
    Ok(())
}

#[test]
fn test_batch_against_disk() -> TestResult {
    let (_dir, mut store) = data_dir()?;
    let working = MemoryStore::snapshot(&store)?;
    let mut system = LibrarySystem::new(working, PolicyConfig::default()).with_clock(clock());
    for item in [201, 204] {
        system.checkout_item(&CheckoutRequest {
            member_id: MemberId(102),
            item_id: ItemId(item),
            checkout_date: None,
            staff_initials: "AS".to_string(),
        })?;
    }
    // nothing reaches disk until the batch is flushed
    let before = fs::read_to_string(store.path_for(EntityKind::Transactions))?;
    assert_eq!(before.lines().count(), 1);

    system.store().flush_into(&mut store)?;
    let after = fs::read_to_string(store.path_for(EntityKind::Transactions))?;
    assert_eq!(after.lines().count(), 3);
    Ok(())
}

#[test]
fn test_policy_from_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("policy.json");
    fs::write(&path, r#"{ "late_cancellation_fee": 40.0, "advance_notice_days": 7 }"#)?;
    let policy = PolicyConfig::from_json_file(&path)?;
    assert_eq!(policy.late_cancellation_fee, Money::from_dollars(40));
    assert_eq!(policy.advance_notice_days, 7);
    assert_eq!(policy.fine_threshold, Money::from_dollars(10));
    Ok(())
}
