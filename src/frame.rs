use embedded_can::{Frame, Id};

use crate::PAYLOAD_LENGTH;

/// Reasons a row of a recognized message cannot be turned into an 8 byte
/// payload. Positions are 1-based, matching the `byte1..byte8` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MalformedPayload {
    #[error("Payload byte ({0:?}) is missing")]
    MissingByte(u8),
    #[error("Payload byte ({0:?}) holds ({1:?}) which is outside of 0..=255")]
    ByteOutOfRange(u8, i64),
    #[error("Tried to read ({needed:?}) bytes but only ({available:?}) were available")]
    Truncated { needed: usize, available: usize },
}

/// One input row: an identifier, eight byte cells and a timestamp which is
/// carried through to the decoded record untouched.
///
/// Cells are kept as loose integers so that a row which is missing a byte or
/// holds a value that does not fit in a byte can still be represented, and is
/// only rejected if its identifier is actually decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawRow<T> {
    pub can_id: u32,
    pub cells: [Option<i64>; PAYLOAD_LENGTH],
    pub timestamp: T,
}

impl<T> RawRow<T> {
    /// Creates a row with all eight bytes present
    pub fn new(can_id: u32, payload: [u8; PAYLOAD_LENGTH], timestamp: T) -> Self {
        Self {
            can_id,
            cells: payload.map(|byte| Some(byte as i64)),
            timestamp,
        }
    }

    /// Creates a row from however many bytes are available. Missing trailing
    /// bytes are left empty and anything past the eighth byte is dropped.
    pub fn from_partial(can_id: u32, data: &[u8], timestamp: T) -> Self {
        let mut cells = [None; PAYLOAD_LENGTH];

        for (cell, byte) in cells.iter_mut().zip(data) {
            *cell = Some(*byte as i64);
        }

        Self {
            can_id,
            cells,
            timestamp,
        }
    }

    /// Creates a row from a frame received through any `embedded-can`
    /// driver. Remote frames carry no data so every byte is missing.
    pub fn from_can_frame(frame: &impl Frame, timestamp: T) -> Self {
        let can_id = match frame.id() {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        };

        if frame.is_remote_frame() {
            return Self::from_partial(can_id, &[], timestamp);
        }

        Self::from_partial(can_id, frame.data(), timestamp)
    }

    /// Validates the eight byte cells
    pub fn payload(&self) -> Result<[u8; PAYLOAD_LENGTH], MalformedPayload> {
        let mut payload = [0u8; PAYLOAD_LENGTH];

        for (index, (cell, byte)) in self.cells.iter().zip(payload.iter_mut()).enumerate() {
            let position = index as u8 + 1;
            let value = cell.ok_or(MalformedPayload::MissingByte(position))?;

            *byte = u8::try_from(value)
                .map_err(|_| MalformedPayload::ByteOutOfRange(position, value))?;
        }

        Ok(payload)
    }
}

/// A row whose payload has been validated
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame<T> {
    pub can_id: u32,
    pub payload: [u8; PAYLOAD_LENGTH],
    pub timestamp: T,
}

impl<T> TryFrom<RawRow<T>> for RawFrame<T> {
    type Error = MalformedPayload;

    fn try_from(row: RawRow<T>) -> Result<Self, Self::Error> {
        Ok(Self {
            can_id: row.can_id,
            payload: row.payload()?,
            timestamp: row.timestamp,
        })
    }
}

impl<T> From<RawFrame<T>> for RawRow<T> {
    fn from(frame: RawFrame<T>) -> Self {
        Self::new(frame.can_id, frame.payload, frame.timestamp)
    }
}
