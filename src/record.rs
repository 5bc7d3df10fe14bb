use heapless::String;

use crate::{
    codec::can_id_to_hex,
    message::{MessageKind, StatusMessage, Value},
    CAN_ID_COLUMN, TIMESTAMP_COLUMN,
};

/// A decoded status message together with the identifier and timestamp of
/// the row it came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedRecord<T> {
    pub can_id: u32,
    pub timestamp: T,
    pub message: StatusMessage,
}

/// One cell of a flattened record
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a, T> {
    Value(Value),
    CanId(String<10>),
    Timestamp(&'a T),
}

impl<T> DecodedRecord<T> {
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    /// The identifier as shown in the `CAN_ID` column, e.g. `0x901`
    pub fn can_id_hex(&self) -> String<10> {
        can_id_to_hex(self.can_id)
    }

    /// Named message fields, without the metadata columns
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Value)> {
        self.message.fields()
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.message.get(name)
    }

    /// Column names of this record: message fields first, then `CAN_ID` and
    /// `Timestamp`.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> {
        self.kind()
            .fields()
            .iter()
            .map(|field| field.name)
            .chain([CAN_ID_COLUMN, TIMESTAMP_COLUMN])
    }

    /// Looks up any column, including the metadata ones. Columns belonging to
    /// other message kinds are absent rather than empty.
    pub fn cell(&self, column: &str) -> Option<Cell<'_, T>> {
        match column {
            CAN_ID_COLUMN => Some(Cell::CanId(self.can_id_hex())),
            TIMESTAMP_COLUMN => Some(Cell::Timestamp(&self.timestamp)),
            _ => self.get_field(column).map(Cell::Value),
        }
    }
}
