//! Adapter for rows that arrive as text cells under a header, such as a CSV
//! export of a CAN log.

use crate::{frame::RawRow, PAYLOAD_LENGTH};

pub const CAN_ID_HEADER: &str = "can_id";
pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const BYTE_HEADERS: [&str; PAYLOAD_LENGTH] = [
    "byte1", "byte2", "byte3", "byte4", "byte5", "byte6", "byte7", "byte8",
];

/// The input as a whole does not have the expected shape. Reported once per
/// batch, before any row is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShapeError {
    #[error("Input has no ({0:?}) column")]
    MissingColumn(&'static str),
}

/// Positions of the required columns within a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Columns {
    can_id: usize,
    bytes: [usize; PAYLOAD_LENGTH],
    timestamp: usize,
}

impl Columns {
    /// Finds the `can_id`, `byte1..byte8` and `timestamp` columns in a header.
    /// Names are matched exactly after trimming whitespace; other columns are
    /// ignored.
    pub fn locate<'h>(
        header: impl IntoIterator<Item = &'h str> + Clone,
    ) -> Result<Self, ShapeError> {
        let find = |name: &'static str| {
            header
                .clone()
                .into_iter()
                .position(|column| column.trim() == name)
                .ok_or(ShapeError::MissingColumn(name))
        };

        let can_id = find(CAN_ID_HEADER)?;

        let mut bytes = [0; PAYLOAD_LENGTH];
        for (slot, name) in bytes.iter_mut().zip(BYTE_HEADERS) {
            *slot = find(name)?;
        }

        let timestamp = find(TIMESTAMP_HEADER)?;

        Ok(Self {
            can_id,
            bytes,
            timestamp,
        })
    }

    /// One [`IntoRow`](crate::IntoRow) per record, including records without a usable
    /// `can_id`, so that the decoder sees every record at its input index.
    pub fn rows<'a, R>(
        self,
        records: impl IntoIterator<Item = R>,
    ) -> impl Iterator<Item = Option<RawRow<&'a str>>>
    where
        R: AsRef<[&'a str]>,
    {
        records
            .into_iter()
            .map(move |record| self.row(record.as_ref()))
    }

    /// Picks a row out of a text record.
    ///
    /// Returns `None` if the `can_id` cell is absent or not a number, since
    /// such a row can never match a decoder. Byte cells that are empty or not
    /// integers are treated as missing and the timestamp cell is passed
    /// through verbatim (empty if absent).
    pub fn row<'a>(&self, record: &[&'a str]) -> Option<RawRow<&'a str>> {
        let can_id = parse_can_id(record.get(self.can_id).copied()?)?;

        let cells = self
            .bytes
            .map(|index| record.get(index).copied().and_then(parse_byte_cell));

        let timestamp = record.get(self.timestamp).copied().unwrap_or("");

        Some(RawRow {
            can_id,
            cells,
            timestamp,
        })
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal identifier
pub fn parse_can_id(cell: &str) -> Option<u32> {
    let cell = cell.trim();

    match cell
        .strip_prefix("0x")
        .or_else(|| cell.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => cell.parse().ok(),
    }
}

fn parse_byte_cell(cell: &str) -> Option<i64> {
    cell.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecodeStats, DecoderTable, MalformedPayload, RowError};

    const HEADER: [&str; 10] = [
        "timestamp", "can_id", "byte1", "byte2", "byte3", "byte4", "byte5", "byte6", "byte7",
        "byte8",
    ];

    #[test]
    fn locates_columns_in_any_order() {
        let columns = Columns::locate(HEADER).unwrap();

        assert_eq!(
            columns,
            Columns {
                can_id: 1,
                bytes: [2, 3, 4, 5, 6, 7, 8, 9],
                timestamp: 0,
            }
        );

        let columns = Columns::locate(
            [
                " can_id", "dlc", "byte1", "byte2", "byte3", "byte4", "byte5", "byte6", "byte7",
                "byte8", "timestamp ",
            ],
        )
        .unwrap();

        assert_eq!(columns.can_id, 0);
        assert_eq!(columns.bytes[0], 2);
        assert_eq!(columns.timestamp, 10);
    }

    #[test]
    fn missing_columns_fail_the_batch() {
        assert_eq!(
            Columns::locate(["timestamp", "byte1"]),
            Err(ShapeError::MissingColumn("can_id"))
        );

        assert_eq!(
            Columns::locate([
                "can_id", "byte1", "byte2", "byte3", "byte4", "byte5", "byte6", "byte7",
                "timestamp"
            ]),
            Err(ShapeError::MissingColumn("byte8"))
        );

        assert_eq!(
            Columns::locate([
                "can_id", "byte1", "byte2", "byte3", "byte4", "byte5", "byte6", "byte7", "byte8"
            ]),
            Err(ShapeError::MissingColumn("timestamp"))
        );
    }

    #[test]
    fn parses_identifiers() {
        assert_eq!(parse_can_id("2305"), Some(0x901));
        assert_eq!(parse_can_id(" 0x1B01 "), Some(0x1B01));
        assert_eq!(parse_can_id("0X1c01"), Some(0x1C01));
        assert_eq!(parse_can_id(""), None);
        assert_eq!(parse_can_id("abc"), None);
        assert_eq!(parse_can_id("-1"), None);
    }

    #[test]
    fn builds_rows_from_text() {
        let columns = Columns::locate(HEADER).unwrap();

        assert_eq!(
            columns.row(&["0.010", "2305", "0", "0", "3", "232", "0", "100", "0", "10"]),
            Some(RawRow::new(0x901, [0, 0, 3, 232, 0, 100, 0, 10], "0.010"))
        );

        assert_eq!(
            columns.row(&["0.020", "", "0", "0", "0", "0", "0", "0", "0", "0"]),
            None
        );

        let row = columns
            .row(&["0.030", "4097", "1", "", "x", "300", "0"])
            .unwrap();

        assert_eq!(
            row.cells,
            [Some(1), None, None, Some(300), Some(0), None, None, None]
        );
    }

    #[test]
    fn decodes_a_text_batch() {
        let columns = Columns::locate(HEADER).unwrap();

        let records: [&[&str]; 4] = [
            &["0.1", "2305", "0", "0", "3", "232", "0", "100", "0", "10"],
            &["0.2", "291", "1", "2", "3", "4", "5", "6", "7", "8"],
            &["0.3", "4097", "1", "144", "255", "156", "0", "50"],
            &["0.4", "4097", "1", "144", "255", "156", "0", "50", "0", "100"],
        ];

        let table = DecoderTable::vesc();
        let mut decoder = table.decode(columns.rows(records));

        let first = decoder.next().unwrap().unwrap();
        assert_eq!(first.timestamp, "0.1");
        assert_eq!(first.can_id_hex().as_str(), "0x901");

        assert_eq!(
            decoder.next(),
            Some(Err(RowError {
                row: 2,
                can_id: 0x1001,
                error: MalformedPayload::MissingByte(7),
            }))
        );

        let last = decoder.next().unwrap().unwrap();
        assert_eq!(last.timestamp, "0.4");

        assert!(decoder.next().is_none());
        assert_eq!(decoder.stats().skipped, 1);
    }

    #[test]
    fn unreadable_ids_keep_row_numbers() {
        let columns = Columns::locate(HEADER).unwrap();

        let records: [&[&str]; 4] = [
            &["0.1", "", "0", "0", "0", "0", "0", "0", "0", "0"],
            &["0.2", "0x1g", "0", "0", "0", "0", "0", "0", "0", "0"],
            &["0.3", "2305", "0", "0", "0"],
            &["0.4", "2305", "0", "0", "0", "0", "0", "0", "0", "0"],
        ];

        let table = DecoderTable::vesc();
        let mut decoder = table.decode(columns.rows(records));

        assert_eq!(
            decoder.next(),
            Some(Err(RowError {
                row: 2,
                can_id: 0x901,
                error: MalformedPayload::MissingByte(4),
            }))
        );

        let last = decoder.next().unwrap().unwrap();
        assert_eq!(last.timestamp, "0.4");

        assert_eq!(
            decoder.finish(),
            DecodeStats {
                rows: 4,
                decoded: 1,
                skipped: 2,
                malformed: 1,
            }
        );
    }

    #[test]
    fn timestamp_cells_pass_through_verbatim() {
        let columns = Columns::locate(HEADER).unwrap();

        let record = [
            " 2024-05-01 12:00:00 ",
            "2305",
            "0",
            "0",
            "0",
            "0",
            "0",
            "0",
            "0",
            "0",
        ];
        let row = columns.row(&record).unwrap();

        assert_eq!(row.timestamp, " 2024-05-01 12:00:00 ");

        let row = columns.row(&["", "2305"]).unwrap();
        assert_eq!(row.timestamp, "");
    }
}
