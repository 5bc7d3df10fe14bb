use heapless::String;

use crate::MalformedPayload;

/// Width in bytes of an integer field inside a status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FieldWidth {
    Two = 2,
    Four = 4,
}

impl FieldWidth {
    pub const fn num_bytes(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signedness {
    Signed,
    Unsigned,
}

/* Decoding */

/// Reads a big-endian integer of the given width from the start of `bytes`,
/// interpreting it as two's complement when `signedness` is
/// [`Signedness::Signed`].
///
/// Trailing bytes past the width are ignored. Fewer bytes than the width is
/// an error; the value is never zero-padded.
pub fn read_be(
    bytes: &[u8],
    width: FieldWidth,
    signedness: Signedness,
) -> Result<i64, MalformedPayload> {
    let needed = width.num_bytes();

    let raw = bytes.get(..needed).ok_or(MalformedPayload::Truncated {
        needed,
        available: bytes.len(),
    })?;

    Ok(match (width, signedness) {
        (FieldWidth::Two, Signedness::Signed) => i16::from_be_bytes([raw[0], raw[1]]) as i64,
        (FieldWidth::Two, Signedness::Unsigned) => u16::from_be_bytes([raw[0], raw[1]]) as i64,
        (FieldWidth::Four, Signedness::Signed) => {
            i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64
        }
        (FieldWidth::Four, Signedness::Unsigned) => {
            u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64
        }
    })
}

/* Encoding */

pub fn to_hex_digit(value: u32) -> char {
    const HEX_LUT: &[u8] = "0123456789abcdef".as_bytes();

    HEX_LUT[(value & 0xF) as usize] as char
}

/// Renders an identifier as lowercase hex with a `0x` prefix and no leading
/// zeros, e.g. `0x901` or `0x1b01`.
pub fn can_id_to_hex(id: u32) -> String<10> {
    let mut result = String::new();

    // "0x" plus at most 8 digits always fits
    let _ = result.push_str("0x");

    let digits = ((u32::BITS - id.leading_zeros()).div_ceil(4)).max(1);

    for shift in (0..digits).rev() {
        let _ = result.push(to_hex_digit(id >> (shift * 4)));
    }

    result
}
