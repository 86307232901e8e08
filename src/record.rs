//! Flat records and their CSV text form.
//!
//! A [`RecordSet`] is the unit every store loads and saves: a header row that
//! fixes the column order followed by rows of string fields. Saving always
//! rewrites the whole set.

use crate::error::StoreError;

/// Field separator
const DELIMITER: char = ',';
/// Quote character; doubled inside a quoted field
const QUOTE: char = '"';

/// One row: column name to string value, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Column/value pairs in insertion order
    fields: Vec<(String, String)>,
}

impl Record {
    /// An empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a column, if the record has it
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, value)| value.as_str())
    }

    /// Value of a column, or the empty string when absent
    #[must_use]
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    /// Set a column, replacing an existing value or appending a new column
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    /// Iterate column/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.set(&column.into(), value);
        }
        record
    }
}

/// An ordered collection of records sharing one header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    /// Header, in output order
    pub columns: Vec<String>,
    /// Rows, in output order
    pub records: Vec<Record>,
}

impl RecordSet {
    /// An empty set with the given header
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            records: Vec::new(),
        }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse CSV text whose first row is the header
    ///
    /// Blank lines are skipped. Rows shorter than the header are padded with
    /// empty values.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Csv` if a quoted field is never closed, text
    /// follows a closing quote, or a row has more fields than the header.
    pub fn from_csv(text: &str) -> Result<Self, StoreError> {
        let mut rows = parse_rows(text)?.into_iter();
        let Some(columns) = rows.next().map(|(_, header)| header) else {
            return Ok(Self::default());
        };

        let mut records = Vec::with_capacity(rows.len());
        for (line, row) in rows {
            if row.len() > columns.len() {
                return Err(StoreError::Csv {
                    line,
                    reason: format!("row has {} fields, header has {}", row.len(), columns.len()),
                });
            }
            let mut values = row.into_iter();
            let record =
                columns.iter().map(|column| (column.clone(), values.next().unwrap_or_default()));
            records.push(record.collect());
        }
        Ok(Self { columns, records })
    }

    /// Render as CSV text: header, then one line per record
    ///
    /// Columns a record lacks are written empty; columns not in the header
    /// are not written.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_row(&mut out, self.columns.iter().map(String::as_str));
        for record in &self.records {
            push_row(&mut out, self.columns.iter().map(|column| record.value(column)));
        }
        out
    }
}

/// Append one CSV line
fn push_row<S: AsRef<str>>(out: &mut String, values: impl Iterator<Item = S>) {
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&quote_field(value.as_ref()));
    }
    out.push('\n');
}

/// Quote a field if it contains the delimiter, a quote, or a line break
#[must_use]
pub fn quote_field(value: &str) -> String {
    let needs_quoting = value.contains([DELIMITER, QUOTE, '\n', '\r']);
    if needs_quoting {
        let escaped = value.replace(QUOTE, "\"\"");
        format!("{QUOTE}{escaped}{QUOTE}")
    } else {
        value.to_string()
    }
}

/// Split CSV text into rows of fields, tagging each row with its start line
///
/// Quoted fields may span lines.
#[allow(clippy::arithmetic_side_effects)]
fn parse_rows(text: &str) -> Result<Vec<(usize, Vec<String>)>, StoreError> {
    let mut rows = Vec::new();
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();
    let mut line = 1_usize;

    while chars.peek().is_some() {
        let row_line = line;
        let mut row = Vec::new();
        loop {
            let mut field = String::new();
            if chars.peek() == Some(&QUOTE) {
                chars.next(); // opening quote
                loop {
                    match chars.next() {
                        Some(QUOTE) if chars.peek() == Some(&QUOTE) => {
                            chars.next();
                            field.push(QUOTE);
                        }
                        Some(QUOTE) => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            field.push(c);
                        }
                        None => {
                            return Err(StoreError::Csv {
                                line: row_line,
                                reason: "unclosed quoted field".to_string(),
                            });
                        }
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == DELIMITER || c == '\n' || c == '\r' {
                        break;
                    }
                    field.push(c);
                    chars.next();
                }
            }
            row.push(field);

            match chars.next() {
                Some(DELIMITER) => {}
                Some('\r') => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    break;
                }
                Some('\n') => {
                    line += 1;
                    break;
                }
                None => break,
                Some(other) => {
                    return Err(StoreError::Csv {
                        line,
                        reason: format!("unexpected '{other}' after quoted field"),
                    });
                }
            }
        }

        let blank = matches!(row.as_slice(), [only] if only.is_empty());
        if !blank {
            rows.push((row_line, row));
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let set = RecordSet::from_csv("room_id,capacity\nR101,50\nR102,20\n").unwrap_or_default();
        assert_eq!(set.columns, vec!["room_id", "capacity"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.records.first().map(|r| r.value("capacity")), Some("50"));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let text = "id,features\n1,\"Projector,Whiteboard\"\n2,\"say \"\"hi\"\"\"\n";
        let set = RecordSet::from_csv(text).unwrap_or_default();
        let values: Vec<&str> = set.records.iter().map(|r| r.value("features")).collect();
        assert_eq!(values, vec!["Projector,Whiteboard", "say \"hi\""]);
    }

    #[test]
    fn test_quoted_field_spans_lines() {
        let text = "id,description\r\n1,\"line one\nline two\"\r\n2,plain\r\n";
        let set = RecordSet::from_csv(text).unwrap_or_default();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records.first().map(|r| r.value("description")), Some("line one\nline two"));
    }

    #[test]
    fn test_blank_lines_and_short_rows() {
        let set = RecordSet::from_csv("a,b,c\n\n1\n").unwrap_or_default();
        assert_eq!(set.len(), 1);
        let record = set.records.first().cloned().unwrap_or_default();
        assert_eq!(record.value("a"), "1");
        assert_eq!(record.get("c"), Some(""));
    }

    #[test]
    fn test_malformed_csv() {
        assert!(matches!(
            RecordSet::from_csv("a,b\n\"open,1\n"),
            Err(StoreError::Csv { line: 2, .. })
        ));
        assert!(matches!(RecordSet::from_csv("a\n1,2\n"), Err(StoreError::Csv { line: 2, .. })));
        assert!(RecordSet::from_csv("a,b\n\"x\"y,1\n").is_err());
    }

    #[test]
    fn test_load_save_is_identity() {
        let text = concat!(
            "member_id,name,address\n",
            "101,John Smith,\"123 Main St, Apt 4\"\n",
            "102,,\"He said \"\"hi\"\"\"\n",
        );
        let set = RecordSet::from_csv(text).unwrap_or_default();
        assert_eq!(set.to_csv(), text);
        assert_eq!(RecordSet::from_csv(&set.to_csv()).unwrap_or_default(), set);
    }

    #[test]
    fn test_empty_text() {
        let set = RecordSet::from_csv("").unwrap_or_default();
        assert!(set.columns.is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_record_set_replaces_in_place() {
        let mut record: Record = [("a", "1"), ("b", "2")].into_iter().collect();
        record.set("a", "9");
        record.set("c", "3");
        let pairs: Vec<(&str, &str)> = record.iter().collect();
        assert_eq!(pairs, vec![("a", "9"), ("b", "2"), ("c", "3")]);
    }
}
