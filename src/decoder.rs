use heapless::Vec;

use crate::{
    frame::{MalformedPayload, RawRow},
    message::{MessageKind, StatusMessage, UnrecognizedIdentifier},
    record::DecodedRecord,
};

/// The set of identifiers that get decoded. Built once up front and only
/// read afterwards, so a single table can back any number of decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderTable {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    kinds: Vec<MessageKind, { MessageKind::COUNT }>,
}

impl Default for DecoderTable {
    fn default() -> Self {
        Self::vesc()
    }
}

impl DecoderTable {
    /// A table which recognizes nothing
    pub fn empty() -> Self {
        Self { kinds: Vec::new() }
    }

    /// A table with every VESC status message enabled
    pub fn vesc() -> Self {
        MessageKind::ALL
            .into_iter()
            .fold(Self::empty(), |table, kind| table.with(kind))
    }

    /// Consumes self and returns a table which also recognizes `kind`
    pub fn with(mut self, kind: MessageKind) -> Self {
        if !self.kinds.contains(&kind) {
            // capacity equals the number of kinds
            let _ = self.kinds.push(kind);
        }

        self
    }

    pub fn kinds(&self) -> &[MessageKind] {
        &self.kinds
    }

    pub fn lookup(&self, can_id: u32) -> Result<MessageKind, UnrecognizedIdentifier> {
        MessageKind::try_from(can_id)
            .ok()
            .filter(|kind| self.kinds.contains(kind))
            .ok_or(UnrecognizedIdentifier(can_id))
    }

    pub fn recognizes(&self, can_id: u32) -> bool {
        self.lookup(can_id).is_ok()
    }

    /// Decodes a single row. `None` means the identifier is not in this table.
    pub fn decode_row<T>(
        &self,
        row: RawRow<T>,
    ) -> Option<Result<DecodedRecord<T>, MalformedPayload>> {
        let kind = self.lookup(row.can_id).ok()?;

        Some(row.payload().and_then(|payload| {
            Ok(DecodedRecord {
                can_id: row.can_id,
                timestamp: row.timestamp,
                message: StatusMessage::decode(kind, &payload)?,
            })
        }))
    }

    /// Decodes rows lazily, in order. See [`FrameDecoder`].
    pub fn decode<I>(&self, rows: I) -> FrameDecoder<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: IntoRow,
    {
        FrameDecoder::new(self, rows.into_iter())
    }
}

/// Anything the [`FrameDecoder`] can take as one input row.
///
/// `None` stands for a row without a usable identifier. It still counts as a
/// row, so the indices in [`RowError`] keep matching the input, and it is
/// tallied as skipped.
pub trait IntoRow {
    type Timestamp;

    fn into_row(self) -> Option<RawRow<Self::Timestamp>>;
}

impl<T> IntoRow for RawRow<T> {
    type Timestamp = T;

    fn into_row(self) -> Option<RawRow<T>> {
        Some(self)
    }
}

impl<T> IntoRow for Option<RawRow<T>> {
    type Timestamp = T;

    fn into_row(self) -> Option<RawRow<T>> {
        self
    }
}

/// A row of a recognized identifier that could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("Row ({row:?}) with CAN ID ({can_id:#x}) has a malformed payload")]
pub struct RowError {
    /// 0-based index of the row in the input
    pub row: usize,
    pub can_id: u32,
    #[source]
    pub error: MalformedPayload,
}

/// Running totals of a decode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeStats {
    /// Rows pulled from the input
    pub rows: usize,
    pub decoded: usize,
    /// Rows whose identifier has no decoder or could not be read
    pub skipped: usize,
    pub malformed: usize,
}

/// Iterator adapter that turns input rows into decoded records.
///
/// Rows with an identifier the table does not recognize yield nothing and are
/// only counted in [`DecodeStats::skipped`]. Malformed rows yield a
/// [`RowError`] and iteration can carry on past them, so the caller chooses
/// between skipping (`filter_map(Result::ok)`) and aborting (`collect` into a
/// `Result` or `?` on each item).
#[derive(Debug, Clone)]
pub struct FrameDecoder<'t, I> {
    table: &'t DecoderTable,
    rows: I,
    stats: DecodeStats,
}

impl<'t, I> FrameDecoder<'t, I> {
    pub fn new(table: &'t DecoderTable, rows: I) -> Self {
        Self {
            table,
            rows,
            stats: DecodeStats::default(),
        }
    }

    /// Totals for the rows consumed so far
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Drains the remaining rows, dropping their results, and returns the
    /// final totals.
    pub fn finish(mut self) -> DecodeStats
    where
        I: Iterator,
        I::Item: IntoRow,
    {
        for _ in self.by_ref() {}
        self.stats
    }
}

impl<I> Iterator for FrameDecoder<'_, I>
where
    I: Iterator,
    I::Item: IntoRow,
{
    type Item = Result<DecodedRecord<<I::Item as IntoRow>::Timestamp>, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let input = self.rows.next()?;
            let index = self.stats.rows;

            self.stats.rows += 1;

            let Some(row) = input.into_row() else {
                trace!("skipping row {} without a usable id", index);
                self.stats.skipped += 1;
                continue;
            };

            let can_id = row.can_id;

            match self.table.decode_row(row) {
                None => {
                    trace!("skipping row {} with unrecognized id {}", index, can_id);
                    self.stats.skipped += 1;
                }
                Some(Ok(record)) => {
                    self.stats.decoded += 1;
                    return Some(Ok(record));
                }
                Some(Err(error)) => {
                    warn!("row {} with id {} is malformed: {}", index, can_id, error);
                    self.stats.malformed += 1;
                    return Some(Err(RowError {
                        row: index,
                        can_id,
                        error,
                    }));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.rows.size_hint().1)
    }
}
