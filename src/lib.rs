#![no_std]

#[macro_use]
mod fmt;

mod codec;
mod decoder;
mod frame;
mod message;
mod record;
pub mod sink;
pub mod table;

// Status 1 from controller 1, ERPM 1000, 10 A, 1 % duty
// 0x901 00 00 03 E8 00 64 00 0A

/// Every status message payload is a full classic CAN frame
pub const PAYLOAD_LENGTH: usize = 8;

/// Most fields carried by a single status message
pub const MAX_FIELDS: usize = 4;

pub const CAN_ID_COLUMN: &str = "CAN_ID";
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

pub use codec::*;
pub use decoder::*;
pub use frame::*;
pub use message::*;
pub use record::*;
