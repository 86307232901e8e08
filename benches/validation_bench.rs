use std::{fmt::Write as _, hint::black_box, time::Duration};

use chrono::{NaiveDate, NaiveTime};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use library_circulation::{
    Event, Fine, Member, PolicyConfig, Room, Transaction,
    model::{EntityKind, RoomId},
    record::RecordSet,
    table::{Entity, Table},
    validation::{ProposedEvent, validate_checkout, validate_event},
};

/// Members in the generated data set
const MEMBERS: u32 = 200;
/// Loans and fines per member
const PER_MEMBER: u32 = 5;

/// Short runs; the data sets are small
fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(1))
        .warm_up_time(Duration::from_secs(1))
}

/// Parse generated CSV into a table
fn table<T: Entity>(kind: EntityKind, rows: &str) -> Table<T> {
    let mut text = kind.columns().join(",");
    text.push('\n');
    text.push_str(rows);
    Table::from_record_set(RecordSet::from_csv(&text).unwrap_or_default())
}

/// Active members with consecutive IDs
#[allow(clippy::arithmetic_side_effects)]
fn members() -> Table<Member> {
    let mut rows = String::new();
    for id in 101..101 + MEMBERS {
        let _ = writeln!(
            rows,
            "{id},Member {id},1 Main St,m{id}@email.com,555-0000,Standard,2024-01-01,2025-01-01,active"
        );
    }
    table(EntityKind::Members, &rows)
}

/// Half the loans still open, two thirds of the fines unpaid
#[allow(clippy::arithmetic_side_effects)]
fn loans_and_fines() -> (Table<Transaction>, Table<Fine>) {
    let mut loans = String::new();
    let mut fines = String::new();
    let mut seq = 0;
    for member in 101..101 + MEMBERS {
        for n in 0..PER_MEMBER {
            seq += 1;
            let returned = if n % 2 == 0 { "2024-02-01" } else { "" };
            let _ = writeln!(
                loans,
                "{},{member},Member,{},Title,2024-01-10,2024-01-31,{returned},AS",
                1000 + seq,
                200 + seq
            );
            let status = if n % 3 == 0 { "paid" } else { "outstanding" };
            let _ = writeln!(
                fines,
                "{},{member},Overdue,1.25,2024-02-01,,{},{status},",
                2000 + seq,
                200 + seq
            );
        }
    }
    (table(EntityKind::Transactions, &loans), table(EntityKind::Fines, &fines))
}

/// A month of hourly sessions alternating between two rooms
#[allow(clippy::arithmetic_side_effects)]
fn events() -> Table<Event> {
    let mut rows = String::new();
    for day in 1..=28 {
        for (slot, hour) in (0_u32..).zip([9, 11, 13, 15, 17]) {
            let _ = writeln!(
                rows,
                "{},Session,2024-12-{day:02},{hour:02}:00,{:02}:00,R10{},Staff,10,,,confirmed",
                300 + day * 10 + slot,
                hour + 1,
                slot % 2 + 1
            );
        }
    }
    table(EntityKind::Events, &rows)
}

/// Two rooms of different sizes
const ROOMS: &str = "\
R101,Community Room A,50,1,Projector,available
R102,Meeting Room B,20,1,TV,available
";

/// Checkout and booking rules over generated tables
fn validation_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Validation");
    let policy = PolicyConfig::default();

    let members = members();
    let (loans, fines) = loans_and_fines();
    group.bench_function("validate_checkout", |b| {
        b.iter(|| {
            for member in members.rows() {
                drop(black_box(validate_checkout(member, &loans, &fines, &policy)));
            }
        });
    });

    let events = events();
    let rooms: Table<Room> = table(EntityKind::Rooms, ROOMS);
    let proposed = ProposedEvent {
        event_date: NaiveDate::from_ymd_opt(2024, 12, 14).unwrap_or_default(),
        start_time: NaiveTime::from_hms_opt(12, 30, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
        room_id: RoomId::new("R102"),
        expected_attendance: 15,
    };
    let booked_on = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap_or_default();
    group.bench_function("validate_event", |b| {
        b.iter(|| {
            validate_event(black_box(&proposed), events.rows(), rooms.rows(), booked_on, &policy)
        });
    });

    // Parsing cost of building a table from loaded records
    group.bench_function("load_transactions", |b| {
        let (loans, _) = loans_and_fines();
        let set = loans.to_record_set();
        b.iter_batched(
            || set.clone(),
            Table::<Transaction>::from_record_set,
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = validation_bench
}
criterion_main!(benches);
