//! Rendering of decoded records for tables, CSV files and plots.
//!
//! Records of different message kinds carry different columns. A table over
//! a mixed batch uses the union of all columns and leaves a cell empty where a
//! record does not have that column.

use core::fmt::{self, Display, Write};

use heapless::Vec;

use crate::{
    message::{MessageKind, Value},
    record::{Cell, DecodedRecord},
    CAN_ID_COLUMN, TIMESTAMP_COLUMN,
};

/// Every field column plus `CAN_ID` and `Timestamp`
pub const MAX_COLUMNS: usize = 19;

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Integer(value) => write!(f, "{value}"),
            // whole numbers keep a trailing ".0" so float columns read as floats
            Value::Float(value) if value.is_finite() && value == (value as i64) as f64 => {
                write!(f, "{value:.1}")
            }
            Value::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Ordered union of the columns seen across a batch of records, in order of
/// first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColumnSet {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    columns: Vec<&'static str, MAX_COLUMNS>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns of every message kind, in identifier order
    pub fn all() -> Self {
        let mut set = Self::new();

        for kind in MessageKind::ALL {
            set.insert_kind(kind);
        }

        set
    }

    pub fn from_records<'r, T: 'r>(
        records: impl IntoIterator<Item = &'r DecodedRecord<T>>,
    ) -> Self {
        let mut set = Self::new();

        for record in records {
            set.observe(record);
        }

        set
    }

    /// Adds the columns of `record` that have not been seen yet
    pub fn observe<T>(&mut self, record: &DecodedRecord<T>) {
        self.insert_kind(record.kind());
    }

    fn insert_kind(&mut self, kind: MessageKind) {
        let names = kind
            .fields()
            .iter()
            .map(|field| field.name)
            .chain([CAN_ID_COLUMN, TIMESTAMP_COLUMN]);

        for name in names {
            if !self.columns.contains(&name) {
                // there are only MAX_COLUMNS distinct names
                let _ = self.columns.push(name);
            }
        }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|name| *name == column)
    }

    pub fn write_header(&self, out: &mut impl Write) -> fmt::Result {
        for (index, column) in self.columns.iter().enumerate() {
            if index > 0 {
                out.write_char(',')?;
            }
            write_text(out, column)?;
        }

        out.write_char('\n')
    }

    /// Writes one CSV line for `record`. The timestamp is written with its
    /// `Display` impl and is not quoted.
    pub fn write_row<T: Display>(
        &self,
        record: &DecodedRecord<T>,
        out: &mut impl Write,
    ) -> fmt::Result {
        for (index, column) in self.columns.iter().enumerate() {
            if index > 0 {
                out.write_char(',')?;
            }

            match record.cell(column) {
                Some(Cell::Value(value)) => write!(out, "{value}")?,
                Some(Cell::CanId(hex)) => out.write_str(&hex)?,
                Some(Cell::Timestamp(timestamp)) => write!(out, "{timestamp}")?,
                None => {}
            }
        }

        out.write_char('\n')
    }
}

/// Writes a header line followed by one line per record
pub fn write_csv<'r, T: Display + 'r>(
    records: impl IntoIterator<Item = &'r DecodedRecord<T>> + Clone,
    out: &mut impl Write,
) -> fmt::Result {
    let columns = ColumnSet::from_records(records.clone());

    columns.write_header(out)?;

    for record in records {
        columns.write_row(record, out)?;
    }

    Ok(())
}

fn write_text(out: &mut impl Write, text: &str) -> fmt::Result {
    if !text.contains([',', '"', '\n', '\r']) {
        return out.write_str(text);
    }

    out.write_char('"')?;
    for part in text.split_inclusive('"') {
        out.write_str(part)?;
        if part.ends_with('"') {
            out.write_char('"')?;
        }
    }
    out.write_char('"')
}

/// Projects one column out of a batch as (timestamp, value) pairs, e.g. for
/// plotting ERPM over time. Records without the column are omitted.
pub fn series<'r, T: 'r>(
    records: impl IntoIterator<Item = &'r DecodedRecord<T>>,
    column: &'r str,
) -> impl Iterator<Item = (&'r T, Value)> {
    records
        .into_iter()
        .filter_map(move |record| Some((&record.timestamp, record.get_field(column)?)))
}
