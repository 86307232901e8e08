//! Typed views over record sets.
//!
//! Rows are parsed once when a [`Table`] is built. A row that fails to parse
//! is kept verbatim as a [`MalformedRow`]: scans over `rows()` never see it,
//! saving writes it back untouched in its original position, and lookups by
//! ID can still report it as a data-integrity problem.
//!
//! Saving re-renders only rows that were added or handed out mutably; every
//! other row is written back exactly as it was loaded.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};

use crate::{
    calendar::{parse_date, parse_time},
    error::{LibraryError, LibraryResult},
    model::EntityKind,
    record::{Record, RecordSet},
};

/// A stored field that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {column} '{value}'")]
pub struct FieldError {
    /// Column that failed
    pub column: &'static str,
    /// Its stored text
    pub value: String,
}

/// A record type that lives in a record set
pub trait Entity: Sized {
    /// Which record set holds this entity
    const KIND: EntityKind;

    /// Name used in messages, e.g. `Member`
    const NAME: &'static str;

    /// Column holding the identifier
    const ID_COLUMN: &'static str;

    /// Parse one stored record
    ///
    /// # Errors
    ///
    /// Returns the first field that cannot be interpreted.
    fn from_record(record: &FieldReader<'_>) -> Result<Self, FieldError>;

    /// Field values in `Self::KIND.columns()` order
    fn to_values(&self) -> Vec<String>;
}

/// An entity whose identifiers are assigned by the library
pub trait Sequenced: Entity {
    /// ID given to the first record of an empty set
    const FIRST_ID: u32;

    /// This record's numeric ID
    fn sequence(&self) -> u32;
}

/// Typed accessors over a stored record
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'r> {
    /// Record being read
    record: &'r Record,
}

impl<'r> FieldReader<'r> {
    /// Wrap a record
    #[must_use]
    pub fn new(record: &'r Record) -> Self {
        Self { record }
    }

    /// Raw text of a column, empty if absent
    #[must_use]
    pub fn raw(&self, column: &str) -> &'r str {
        self.record.value(column)
    }

    /// Owned text of a column
    #[must_use]
    pub fn text(&self, column: &str) -> String {
        self.raw(column).to_string()
    }

    /// Parse a required column with `FromStr`
    ///
    /// # Errors
    ///
    /// Returns a `FieldError` naming the column if parsing fails.
    pub fn parse<T: FromStr>(&self, column: &'static str) -> Result<T, FieldError> {
        let raw = self.raw(column);
        raw.trim().parse().map_err(|_| self.error(column))
    }

    /// Parse an optional column; empty text means `None`
    ///
    /// # Errors
    ///
    /// Returns a `FieldError` if the column is non-empty and does not parse.
    pub fn parse_opt<T: FromStr>(&self, column: &'static str) -> Result<Option<T>, FieldError> {
        if self.raw(column).trim().is_empty() {
            Ok(None)
        } else {
            self.parse(column).map(Some)
        }
    }

    /// Parse a required `YYYY-MM-DD` column
    ///
    /// # Errors
    ///
    /// Returns a `FieldError` if the column is not a valid date.
    pub fn date(&self, column: &'static str) -> Result<NaiveDate, FieldError> {
        parse_date(self.raw(column).trim()).ok_or_else(|| self.error(column))
    }

    /// Parse an optional `YYYY-MM-DD` column
    ///
    /// # Errors
    ///
    /// Returns a `FieldError` if the column is non-empty and not a valid date.
    pub fn date_opt(&self, column: &'static str) -> Result<Option<NaiveDate>, FieldError> {
        if self.raw(column).trim().is_empty() {
            Ok(None)
        } else {
            self.date(column).map(Some)
        }
    }

    /// Parse a required `HH:MM` column
    ///
    /// # Errors
    ///
    /// Returns a `FieldError` if the column is not a valid time.
    pub fn time(&self, column: &'static str) -> Result<NaiveTime, FieldError> {
        parse_time(self.raw(column).trim()).ok_or_else(|| self.error(column))
    }

    /// Build the error for a column
    fn error(&self, column: &'static str) -> FieldError {
        FieldError { column, value: self.text(column) }
    }
}

/// A stored row that failed to parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    /// The row as loaded
    pub record: Record,
    /// Why it was rejected
    pub error: FieldError,
}

/// Where each row sits in the original ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Index into `rows`
    Parsed(usize),
    /// Index into `malformed`
    Malformed(usize),
}

/// A loaded record set with every well-formed row parsed into `T`
#[derive(Debug, Clone)]
pub struct Table<T> {
    /// Header as loaded, extended with any missing canonical columns
    columns: Vec<String>,
    /// Parsed rows
    rows: Vec<T>,
    /// Loaded record behind each parsed row; empty for rows added since
    sources: Vec<Record>,
    /// Whether each parsed row was added or may have been changed
    dirty: Vec<bool>,
    /// Rows that failed to parse
    malformed: Vec<MalformedRow>,
    /// Original interleaving of parsed and malformed rows
    layout: Vec<Slot>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::from_record_set(RecordSet::default())
    }
}

impl<T: Entity> Table<T> {
    /// Parse a record set
    ///
    /// Malformed rows are logged and carried, never dropped.
    #[must_use]
    pub fn from_record_set(set: RecordSet) -> Self {
        let mut columns = set.columns;
        for canonical in T::KIND.columns() {
            if !columns.iter().any(|c| c == canonical) {
                columns.push((*canonical).to_string());
            }
        }

        let mut table = Self {
            columns,
            rows: Vec::new(),
            sources: Vec::new(),
            dirty: Vec::new(),
            malformed: Vec::new(),
            layout: Vec::with_capacity(set.records.len()),
        };
        for record in set.records {
            match T::from_record(&FieldReader::new(&record)) {
                Ok(row) => {
                    table.layout.push(Slot::Parsed(table.rows.len()));
                    table.rows.push(row);
                    table.sources.push(record);
                    table.dirty.push(false);
                }
                Err(error) => {
                    let kind = T::KIND;
                    tracing::warn!(
                        %kind,
                        id = record.value(T::ID_COLUMN),
                        %error,
                        "carrying malformed row"
                    );
                    table.layout.push(Slot::Malformed(table.malformed.len()));
                    table.malformed.push(MalformedRow { record, error });
                }
            }
        }
        table
    }

    /// Render back into a record set, preserving row order and extra columns
    ///
    /// Untouched rows keep their loaded text; changed and added rows are
    /// rendered in canonical form over their loaded record.
    #[must_use]
    pub fn to_record_set(&self) -> RecordSet {
        let mut set = RecordSet::new(&self.columns);
        for slot in &self.layout {
            let record = match *slot {
                Slot::Parsed(idx) => {
                    let (Some(row), Some(source)) = (self.rows.get(idx), self.sources.get(idx))
                    else {
                        continue;
                    };
                    let mut record = source.clone();
                    if self.dirty.get(idx).copied().unwrap_or(true) {
                        for (column, value) in T::KIND.columns().iter().zip(row.to_values()) {
                            record.set(column, value);
                        }
                    }
                    record
                }
                Slot::Malformed(idx) => match self.malformed.get(idx) {
                    Some(bad) => bad.record.clone(),
                    None => continue,
                },
            };
            set.records.push(record);
        }
        set
    }

    /// Well-formed rows in stored order
    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Rows that failed to parse
    #[must_use]
    pub fn malformed(&self) -> &[MalformedRow] {
        &self.malformed
    }

    /// First well-formed row matching `pred`
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.rows.iter().find(|row| pred(row))
    }

    /// Mutable access to the first well-formed row matching `pred`
    ///
    /// The row is re-rendered on the next save.
    pub fn find_mut(&mut self, pred: impl Fn(&T) -> bool) -> Option<&mut T> {
        let idx = self.rows.iter().position(|row| pred(row))?;
        self.touch(idx)
    }

    /// The row matching `pred`, looked up by `id`
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::DataIntegrity` if the only row stored under `id`
    /// is malformed, and `LibraryError::NotFound` if there is none.
    pub fn require(&self, id: &str, pred: impl Fn(&T) -> bool) -> LibraryResult<&T> {
        self.rows.iter().find(|row| pred(row)).ok_or_else(|| self.missing(id))
    }

    /// Mutable form of [`Table::require`]
    ///
    /// # Errors
    ///
    /// As for [`Table::require`].
    pub fn require_mut(&mut self, id: &str, pred: impl Fn(&T) -> bool) -> LibraryResult<&mut T> {
        let Some(idx) = self.rows.iter().position(|row| pred(row)) else {
            return Err(self.missing(id));
        };
        self.touch(idx).ok_or_else(|| LibraryError::not_found(T::NAME, id))
    }

    /// Mark a parsed row dirty and hand it out
    fn touch(&mut self, idx: usize) -> Option<&mut T> {
        if let Some(flag) = self.dirty.get_mut(idx) {
            *flag = true;
        }
        self.rows.get_mut(idx)
    }

    /// Why no usable row exists for `id`
    fn missing(&self, id: &str) -> LibraryError {
        match self.malformed_with_id(id) {
            Some(bad) => LibraryError::DataIntegrity(format!("{} {id} has {}", T::NAME, bad.error)),
            None => LibraryError::not_found(T::NAME, id),
        }
    }

    /// Malformed row whose ID column holds `id`
    #[must_use]
    pub fn malformed_with_id(&self, id: &str) -> Option<&MalformedRow> {
        self.malformed.iter().find(|bad| bad.record.value(T::ID_COLUMN).trim() == id)
    }

    /// Append a new row at the end
    pub fn push(&mut self, row: T) {
        self.layout.push(Slot::Parsed(self.rows.len()));
        self.rows.push(row);
        self.sources.push(Record::new());
        self.dirty.push(true);
    }

    /// Raw text of `column` across every row, malformed ones included
    pub fn raw_column(&self, column: &str) -> impl Iterator<Item = String> {
        let index = T::KIND.columns().iter().position(|c| *c == column);
        let parsed = self.rows.iter().zip(&self.sources).map(move |(row, source)| match index {
            Some(i) => row.to_values().into_iter().nth(i).unwrap_or_default(),
            None => source.value(column).to_string(),
        });
        let malformed = self.malformed.iter().map(move |bad| bad.record.value(column).to_string());
        parsed.chain(malformed)
    }
}

impl<T: Entity> FromIterator<T> for Table<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::default();
        for row in iter {
            table.push(row);
        }
        table
    }
}

impl<T: Sequenced> Table<T> {
    /// Next identifier: one past the highest stored ID, or `T::FIRST_ID`
    ///
    /// Malformed rows with a numeric ID still count, so IDs are never reused.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        let parsed = self.rows.iter().map(T::sequence);
        let malformed = self
            .malformed
            .iter()
            .filter_map(|bad| bad.record.value(T::ID_COLUMN).trim().parse().ok());
        parsed.chain(malformed).max().map_or(T::FIRST_ID, |max: u32| max.saturating_add(1))
    }
}
