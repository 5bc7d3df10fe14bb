use heapless::Vec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    codec::{read_be, FieldWidth, Signedness},
    MalformedPayload, MAX_FIELDS, PAYLOAD_LENGTH,
};

/// Returned when an identifier has no decoder. This is not a failure of the
/// frame itself, it only means the message type is not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("No decoder is known for CAN ID ({0:#x})")]
pub struct UnrecognizedIdentifier(pub u32);

/// The status messages broadcast by a VESC motor controller (controller ID
/// 1). The integer value of each variant is the CAN identifier it arrives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = UnrecognizedIdentifier, constructor = UnrecognizedIdentifier))]
#[repr(u32)]
pub enum MessageKind {
    /// ERPM, motor current and duty cycle
    Status1 = 0x901,
    /// Consumed and regenerated charge
    Status2 = 0xE01,
    /// Consumed and regenerated energy
    Status3 = 0xF01,
    /// Temperatures, input current and PID position
    Status4 = 0x1001,
    /// Tachometer and input voltage
    Status5 = 0x1B01,
    /// ADC inputs and PPM
    Status6 = 0x1C01,
}

/// How a raw integer is turned into a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scale {
    /// The raw integer is the value
    Unit,
    Divide(f64),
    Multiply(f64),
}

impl Scale {
    pub fn apply(self, raw: i64) -> Value {
        match self {
            Scale::Unit => Value::Integer(raw),
            Scale::Divide(divisor) => Value::Float(raw as f64 / divisor),
            Scale::Multiply(factor) => Value::Float(raw as f64 * factor),
        }
    }
}

/// A decoded physical value. Fields without a unit transform stay integral.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    Integer(i64),
    Float(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Integer(value) => value as f64,
            Value::Float(value) => value,
        }
    }

    /// Integer values as-is; floats truncated toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Value::Integer(value) => value,
            Value::Float(value) => value as i64,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Location and conversion of a single field in an 8 byte payload.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldSpec {
    pub name: &'static str,
    pub start: usize,
    pub width: FieldWidth,
    pub signedness: Signedness,
    pub scale: Scale,
}

impl FieldSpec {
    const fn new(
        name: &'static str,
        start: usize,
        width: FieldWidth,
        signedness: Signedness,
        scale: Scale,
    ) -> Self {
        Self {
            name,
            start,
            width,
            signedness,
            scale,
        }
    }

    /// Exclusive end offset of the field
    pub const fn end(&self) -> usize {
        self.start + self.width.num_bytes()
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Value, MalformedPayload> {
        let bytes = payload.get(self.start..).unwrap_or(&[]);

        Ok(self
            .scale
            .apply(read_be(bytes, self.width, self.signedness)?))
    }
}

mod layout {
    use super::{FieldSpec, Scale};
    use crate::codec::{FieldWidth::*, Signedness::*};

    pub const STATUS_1: [FieldSpec; 3] = [
        FieldSpec::new("ERPM", 0, Four, Signed, Scale::Unit),
        FieldSpec::new("Current (A)", 4, Two, Signed, Scale::Divide(10.0)),
        FieldSpec::new("DutyCycle (%)", 6, Two, Signed, Scale::Divide(10.0)),
    ];

    pub const STATUS_2: [FieldSpec; 2] = [
        FieldSpec::new("Amp Hours (Ah)", 0, Four, Signed, Scale::Divide(1000.0)),
        FieldSpec::new("Amp Hours Charged (Ah)", 4, Four, Signed, Scale::Divide(1000.0)),
    ];

    pub const STATUS_3: [FieldSpec; 2] = [
        FieldSpec::new("Watt Hours (Wh)", 0, Four, Signed, Scale::Divide(1000.0)),
        FieldSpec::new("Watt Hours Charged (Wh)", 4, Four, Signed, Scale::Divide(1000.0)),
    ];

    pub const STATUS_4: [FieldSpec; 4] = [
        FieldSpec::new("Temp FET (°C)", 0, Two, Signed, Scale::Divide(10.0)),
        FieldSpec::new("Temp Motor (°C)", 2, Two, Signed, Scale::Divide(10.0)),
        FieldSpec::new("Current In (A)", 4, Two, Signed, Scale::Divide(10.0)),
        FieldSpec::new("PID Position (°)", 6, Two, Signed, Scale::Multiply(0.02)),
    ];

    pub const STATUS_5: [FieldSpec; 2] = [
        FieldSpec::new("Tachometer (EREV)", 0, Four, Unsigned, Scale::Unit),
        FieldSpec::new("Voltage In (V)", 4, Two, Unsigned, Scale::Divide(10.0)),
    ];

    pub const STATUS_6: [FieldSpec; 4] = [
        FieldSpec::new("ADC1 (V)", 0, Two, Unsigned, Scale::Divide(1000.0)),
        FieldSpec::new("ADC2 (V)", 2, Two, Unsigned, Scale::Divide(1000.0)),
        FieldSpec::new("ADC3 (V)", 4, Two, Unsigned, Scale::Divide(1000.0)),
        FieldSpec::new("PPM (%)", 6, Two, Unsigned, Scale::Divide(10.0)),
    ];
}

impl MessageKind {
    pub const COUNT: usize = 6;

    pub const ALL: [MessageKind; Self::COUNT] = [
        Self::Status1,
        Self::Status2,
        Self::Status3,
        Self::Status4,
        Self::Status5,
        Self::Status6,
    ];

    /// The CAN identifier this kind is broadcast on
    pub fn can_id(self) -> u32 {
        self.into()
    }

    /// Ordered field layout of this message's payload
    pub const fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Status1 => &layout::STATUS_1,
            Self::Status2 => &layout::STATUS_2,
            Self::Status3 => &layout::STATUS_3,
            Self::Status4 => &layout::STATUS_4,
            Self::Status5 => &layout::STATUS_5,
            Self::Status6 => &layout::STATUS_6,
        }
    }

    /// Runs every field spec of this kind over the payload, in layout order.
    pub fn extract(
        self,
        payload: &[u8; PAYLOAD_LENGTH],
    ) -> Result<Vec<Value, MAX_FIELDS>, MalformedPayload> {
        let mut values = Vec::new();

        for field in self.fields() {
            // layouts never exceed MAX_FIELDS
            let _ = values.push(field.decode(payload)?);
        }

        Ok(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status1 {
    pub erpm: i32,
    /// Motor current in A
    pub current: f64,
    /// Duty cycle in %
    pub duty_cycle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status2 {
    pub amp_hours: f64,
    pub amp_hours_charged: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status3 {
    pub watt_hours: f64,
    pub watt_hours_charged: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status4 {
    /// MOSFET temperature in °C
    pub temp_fet: f64,
    /// Motor temperature in °C
    pub temp_motor: f64,
    /// Input current in A
    pub current_in: f64,
    /// PID position in degrees
    pub pid_position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status5 {
    /// Electrical revolutions
    pub tachometer: u32,
    /// Input voltage in V
    pub voltage_in: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status6 {
    pub adc1: f64,
    pub adc2: f64,
    pub adc3: f64,
    /// PPM input in %
    pub ppm: f64,
}

/// A decoded status message. Each variant only carries the fields its
/// identifier transmits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusMessage {
    Status1(Status1),
    Status2(Status2),
    Status3(Status3),
    Status4(Status4),
    Status5(Status5),
    Status6(Status6),
}

impl StatusMessage {
    pub fn decode(
        kind: MessageKind,
        payload: &[u8; PAYLOAD_LENGTH],
    ) -> Result<Self, MalformedPayload> {
        let float = |field: &FieldSpec| field.decode(payload).map(Value::as_f64);
        let integer = |field: &FieldSpec| field.decode(payload).map(Value::as_i64);

        Ok(match kind {
            MessageKind::Status1 => {
                let [erpm, current, duty_cycle] = &layout::STATUS_1;

                Self::Status1(Status1 {
                    erpm: integer(erpm)? as i32,
                    current: float(current)?,
                    duty_cycle: float(duty_cycle)?,
                })
            }
            MessageKind::Status2 => {
                let [amp_hours, amp_hours_charged] = &layout::STATUS_2;

                Self::Status2(Status2 {
                    amp_hours: float(amp_hours)?,
                    amp_hours_charged: float(amp_hours_charged)?,
                })
            }
            MessageKind::Status3 => {
                let [watt_hours, watt_hours_charged] = &layout::STATUS_3;

                Self::Status3(Status3 {
                    watt_hours: float(watt_hours)?,
                    watt_hours_charged: float(watt_hours_charged)?,
                })
            }
            MessageKind::Status4 => {
                let [temp_fet, temp_motor, current_in, pid_position] = &layout::STATUS_4;

                Self::Status4(Status4 {
                    temp_fet: float(temp_fet)?,
                    temp_motor: float(temp_motor)?,
                    current_in: float(current_in)?,
                    pid_position: float(pid_position)?,
                })
            }
            MessageKind::Status5 => {
                let [tachometer, voltage_in] = &layout::STATUS_5;

                Self::Status5(Status5 {
                    tachometer: integer(tachometer)? as u32,
                    voltage_in: float(voltage_in)?,
                })
            }
            MessageKind::Status6 => {
                let [adc1, adc2, adc3, ppm] = &layout::STATUS_6;

                Self::Status6(Status6 {
                    adc1: float(adc1)?,
                    adc2: float(adc2)?,
                    adc3: float(adc3)?,
                    ppm: float(ppm)?,
                })
            }
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Status1(_) => MessageKind::Status1,
            Self::Status2(_) => MessageKind::Status2,
            Self::Status3(_) => MessageKind::Status3,
            Self::Status4(_) => MessageKind::Status4,
            Self::Status5(_) => MessageKind::Status5,
            Self::Status6(_) => MessageKind::Status6,
        }
    }

    /// Field values in the same order as [`MessageKind::fields`]
    pub fn values(&self) -> Vec<Value, MAX_FIELDS> {
        match *self {
            Self::Status1(m) => Vec::from_iter([
                Value::Integer(m.erpm as i64),
                Value::Float(m.current),
                Value::Float(m.duty_cycle),
            ]),
            Self::Status2(m) => Vec::from_iter([
                Value::Float(m.amp_hours),
                Value::Float(m.amp_hours_charged),
            ]),
            Self::Status3(m) => Vec::from_iter([
                Value::Float(m.watt_hours),
                Value::Float(m.watt_hours_charged),
            ]),
            Self::Status4(m) => Vec::from_iter([
                Value::Float(m.temp_fet),
                Value::Float(m.temp_motor),
                Value::Float(m.current_in),
                Value::Float(m.pid_position),
            ]),
            Self::Status5(m) => Vec::from_iter([
                Value::Integer(m.tachometer as i64),
                Value::Float(m.voltage_in),
            ]),
            Self::Status6(m) => Vec::from_iter([
                Value::Float(m.adc1),
                Value::Float(m.adc2),
                Value::Float(m.adc3),
                Value::Float(m.ppm),
            ]),
        }
    }

    /// Named field values of this message, in layout order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Value)> {
        self.kind()
            .fields()
            .iter()
            .map(|field| field.name)
            .zip(self.values())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_map_to_kinds() {
        assert_eq!(MessageKind::try_from(0x901), Ok(MessageKind::Status1));
        assert_eq!(MessageKind::try_from(0xE01), Ok(MessageKind::Status2));
        assert_eq!(MessageKind::try_from(0xF01), Ok(MessageKind::Status3));
        assert_eq!(MessageKind::try_from(0x1001), Ok(MessageKind::Status4));
        assert_eq!(MessageKind::try_from(0x1B01), Ok(MessageKind::Status5));
        assert_eq!(MessageKind::try_from(0x1C01), Ok(MessageKind::Status6));

        assert_eq!(
            MessageKind::try_from(0x902),
            Err(UnrecognizedIdentifier(0x902))
        );
        assert_eq!(MessageKind::try_from(0), Err(UnrecognizedIdentifier(0)));

        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::try_from(kind.can_id()), Ok(kind));
        }
    }

    #[test]
    fn layouts_cover_the_payload() {
        for kind in MessageKind::ALL {
            let fields = kind.fields();

            assert!(fields.len() <= MAX_FIELDS);
            assert!(fields.iter().all(|field| field.end() <= PAYLOAD_LENGTH));

            // fields are contiguous and non-overlapping
            for pair in fields.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start);
            }
        }

        assert_eq!(MessageKind::Status5.fields().last().map(|f| f.end()), Some(6));
    }

    #[test]
    fn zero_payload_decodes_to_zero() {
        let expected_names: [&[&str]; MessageKind::COUNT] = [
            &["ERPM", "Current (A)", "DutyCycle (%)"],
            &["Amp Hours (Ah)", "Amp Hours Charged (Ah)"],
            &["Watt Hours (Wh)", "Watt Hours Charged (Wh)"],
            &[
                "Temp FET (°C)",
                "Temp Motor (°C)",
                "Current In (A)",
                "PID Position (°)",
            ],
            &["Tachometer (EREV)", "Voltage In (V)"],
            &["ADC1 (V)", "ADC2 (V)", "ADC3 (V)", "PPM (%)"],
        ];

        for (kind, names) in MessageKind::ALL.into_iter().zip(expected_names) {
            let message = StatusMessage::decode(kind, &[0; 8]).unwrap();

            assert_eq!(message.kind(), kind);
            assert_eq!(
                message.fields().map(|(name, _)| name).collect::<Vec<_, MAX_FIELDS>>(),
                names
            );
            assert!(message.fields().all(|(_, value)| value.as_f64() == 0.0));
        }
    }

    #[test]
    fn typed_fields_match_the_generic_extraction() {
        let payload = [0x12, 0x34, 0x86, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];

        for kind in MessageKind::ALL {
            let message = StatusMessage::decode(kind, &payload).unwrap();

            assert_eq!(message.values(), kind.extract(&payload).unwrap());
        }
    }

    #[test]
    fn status1_scenario() {
        let message = StatusMessage::decode(
            MessageKind::Status1,
            &[0x00, 0x00, 0x03, 0xE8, 0x00, 0x64, 0x00, 0x0A],
        )
        .unwrap();

        assert_eq!(
            message,
            StatusMessage::Status1(Status1 {
                erpm: 1000,
                current: 10.0,
                duty_cycle: 1.0,
            })
        );

        assert_eq!(message.get("ERPM"), Some(Value::Integer(1000)));
        assert_eq!(message.get("Current (A)"), Some(Value::Float(10.0)));
        assert_eq!(message.get("DutyCycle (%)"), Some(Value::Float(1.0)));
        assert_eq!(message.get("Voltage In (V)"), None);
    }

    #[test]
    fn status4_scenario() {
        let message = StatusMessage::decode(
            MessageKind::Status4,
            &[0x01, 0x90, 0xFF, 0x9C, 0x00, 0x32, 0x00, 0x64],
        )
        .unwrap();

        assert_eq!(
            message,
            StatusMessage::Status4(Status4 {
                temp_fet: 40.0,
                temp_motor: -10.0,
                current_in: 5.0,
                pid_position: 2.0,
            })
        );
    }

    #[test]
    fn signed_fields_keep_their_sign() {
        let message = StatusMessage::decode(MessageKind::Status2, &[0xFF; 8]).unwrap();

        assert_eq!(
            message,
            StatusMessage::Status2(Status2 {
                amp_hours: -0.001,
                amp_hours_charged: -0.001,
            })
        );

        let message = StatusMessage::decode(
            MessageKind::Status1,
            &[0xFF, 0xFF, 0xFC, 0x18, 0xFF, 0xFF, 0xFF, 0xF6],
        )
        .unwrap();

        assert_eq!(
            message,
            StatusMessage::Status1(Status1 {
                erpm: -1000,
                current: -0.1,
                duty_cycle: -1.0,
            })
        );
    }

    #[test]
    fn unsigned_fields_are_never_negative() {
        let patterns = [[0xFF; 8], [0x80; 8], [0x80, 0, 0, 0, 0x80, 0, 0x80, 0]];

        for payload in patterns {
            for kind in [MessageKind::Status5, MessageKind::Status6] {
                let message = StatusMessage::decode(kind, &payload).unwrap();
                assert!(message.fields().all(|(_, value)| value.as_f64() >= 0.0));
            }
        }

        assert_eq!(
            StatusMessage::decode(MessageKind::Status5, &[0xFF; 8]),
            Ok(StatusMessage::Status5(Status5 {
                tachometer: u32::MAX,
                voltage_in: 6553.5,
            }))
        );

        assert_eq!(
            StatusMessage::decode(MessageKind::Status6, &[0xFF; 8]),
            Ok(StatusMessage::Status6(Status6 {
                adc1: 65.535,
                adc2: 65.535,
                adc3: 65.535,
                ppm: 6553.5,
            }))
        );
    }

    #[test]
    fn field_spec_reports_truncation() {
        let field = MessageKind::Status3.fields()[1];

        assert_eq!(
            field.decode(&[0; 6]),
            Err(MalformedPayload::Truncated {
                needed: 4,
                available: 2
            })
        );

        assert_eq!(
            field.decode(&[]),
            Err(MalformedPayload::Truncated {
                needed: 4,
                available: 0
            })
        );
    }
}
