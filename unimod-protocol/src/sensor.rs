//! Sensor types and reading decoders

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of sensor types that can be registered (excludes [`SensorType::None`])
pub const SENSOR_KINDS: usize = 5;

/// Whole-part value a module reports when it has no reading
pub const NO_DATA_WHOLE: i8 = -128;

/// Luminosity value a module reports when it has no reading
pub const NO_LUMINOSITY: u32 = 0xFFFF_FFFF;

/// Sensor type as reported in a sensor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorType {
    None,
    /// Two significant bytes
    Temperature,
    /// Humidity (bytes 0..2) plus temperature (bytes 2..4)
    Humidity,
    /// Four bytes, lux
    Luminosity,
    /// Two significant bytes, percent
    SoilMoisture,
    /// Two significant bytes
    Ph,
}

// Wire format values
const SENSOR_NONE: u8 = 0;
const SENSOR_TEMPERATURE: u8 = 1;
const SENSOR_HUMIDITY: u8 = 2;
const SENSOR_LUMINOSITY: u8 = 3;
const SENSOR_SOIL_MOISTURE: u8 = 4;
const SENSOR_PH: u8 = 5;

impl SensorType {
    /// Every type that can own a registered index, in persisted order
    pub const REGISTRABLE: [SensorType; SENSOR_KINDS] = [
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::Luminosity,
        SensorType::SoilMoisture,
        SensorType::Ph,
    ];

    /// Parse from the wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SENSOR_NONE => Some(SensorType::None),
            SENSOR_TEMPERATURE => Some(SensorType::Temperature),
            SENSOR_HUMIDITY => Some(SensorType::Humidity),
            SENSOR_LUMINOSITY => Some(SensorType::Luminosity),
            SENSOR_SOIL_MOISTURE => Some(SensorType::SoilMoisture),
            SENSOR_PH => Some(SensorType::Ph),
            _ => None,
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            SensorType::None => SENSOR_NONE,
            SensorType::Temperature => SENSOR_TEMPERATURE,
            SensorType::Humidity => SENSOR_HUMIDITY,
            SensorType::Luminosity => SENSOR_LUMINOSITY,
            SensorType::SoilMoisture => SENSOR_SOIL_MOISTURE,
            SensorType::Ph => SENSOR_PH,
        }
    }

    /// Position in per-type tables, `None` for [`SensorType::None`]
    pub fn table_index(self) -> Option<usize> {
        match self {
            SensorType::None => None,
            SensorType::Temperature => Some(0),
            SensorType::Humidity => Some(1),
            SensorType::Luminosity => Some(2),
            SensorType::SoilMoisture => Some(3),
            SensorType::Ph => Some(4),
        }
    }

    /// Number of controller states one sensor of this type feeds
    pub fn state_count(self) -> u8 {
        match self {
            SensorType::None => 0,
            SensorType::Humidity => 2,
            _ => 1,
        }
    }
}

/// A decoded sensor value in fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Degrees Celsius × 100
    Temperature { c_x100: i16 },
    /// Relative humidity × 100
    Humidity { rh_x100: i16 },
    /// Lux
    Luminosity { lux: u32 },
    /// Soil moisture percent × 100
    SoilMoisture { pct_x100: i16 },
    /// pH × 100
    Ph { ph_x100: i16 },
}

impl Reading {
    /// Two-byte `[whole, hundredths]` form used by the Nextion view
    ///
    /// Luminosity is sent as a saturated little-endian `u16`. The sign rides
    /// on the whole byte, so values strictly between -1 and 0 come out
    /// positive (-0.50 is sent as `[0, 50]`).
    pub fn to_short_bytes(&self) -> [u8; 2] {
        match *self {
            Reading::Temperature { c_x100 }
            | Reading::Humidity { rh_x100: c_x100 }
            | Reading::SoilMoisture { pct_x100: c_x100 }
            | Reading::Ph { ph_x100: c_x100 } => encode_fixed(c_x100),
            Reading::Luminosity { lux } => (lux.min(u16::MAX as u32) as u16).to_le_bytes(),
        }
    }
}

/// Decode `[whole: i8, hundredths: u8]`
fn decode_fixed(bytes: [u8; 2]) -> Option<i16> {
    let whole = bytes[0] as i8;
    if whole == NO_DATA_WHOLE {
        return None;
    }
    let fraction = bytes[1].min(99) as i16;
    let whole = whole as i16 * 100;
    Some(if whole < 0 { whole - fraction } else { whole + fraction })
}

/// Encode `[whole: i8, hundredths: u8]`
///
/// A whole part of zero carries no sign, so -0.99..=-0.01 encode the same as
/// their positive counterparts.
fn encode_fixed(value_x100: i16) -> [u8; 2] {
    let whole = (value_x100 / 100).clamp(-127, 127) as i8;
    let fraction = (value_x100 % 100).unsigned_abs() as u8;
    [whole as u8, fraction]
}

/// Decode a sensor slot's four data bytes
///
/// Returns the primary reading and, for humidity sensors, the secondary
/// (temperature) reading. `None` means the module reported "no data".
pub fn decode_readings(sensor: SensorType, data: &[u8; 4]) -> (Option<Reading>, Option<Reading>) {
    let first = [data[0], data[1]];
    match sensor {
        SensorType::None => (None, None),
        SensorType::Temperature => (
            decode_fixed(first).map(|c_x100| Reading::Temperature { c_x100 }),
            None,
        ),
        SensorType::Humidity => (
            decode_fixed(first).map(|rh_x100| Reading::Humidity { rh_x100 }),
            decode_fixed([data[2], data[3]]).map(|c_x100| Reading::Temperature { c_x100 }),
        ),
        SensorType::Luminosity => {
            let lux = u32::from_le_bytes(*data);
            let reading = (lux != NO_LUMINOSITY).then_some(Reading::Luminosity { lux });
            (reading, None)
        }
        SensorType::SoilMoisture => (
            decode_fixed(first).map(|pct_x100| Reading::SoilMoisture { pct_x100 }),
            None,
        ),
        SensorType::Ph => (
            decode_fixed(first).map(|ph_x100| Reading::Ph { ph_x100 }),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_type_roundtrip() {
        for byte in 0..=5u8 {
            let sensor = SensorType::from_byte(byte).unwrap();
            assert_eq!(sensor.to_byte(), byte);
        }
        assert!(SensorType::from_byte(6).is_none());
        assert!(SensorType::from_byte(0xFF).is_none());
    }

    #[test]
    fn test_table_index_covers_registrable() {
        for (i, sensor) in SensorType::REGISTRABLE.iter().enumerate() {
            assert_eq!(sensor.table_index(), Some(i));
        }
        assert_eq!(SensorType::None.table_index(), None);
    }

    #[test]
    fn test_state_count() {
        assert_eq!(SensorType::Humidity.state_count(), 2);
        assert_eq!(SensorType::Temperature.state_count(), 1);
        assert_eq!(SensorType::None.state_count(), 0);
    }

    #[test]
    fn test_decode_temperature() {
        let (primary, secondary) = decode_readings(SensorType::Temperature, &[23, 50, 0xFF, 0xFF]);
        assert_eq!(primary, Some(Reading::Temperature { c_x100: 2350 }));
        assert_eq!(secondary, None);
    }

    #[test]
    fn test_short_bytes_drop_sign_above_minus_one() {
        let below_zero = Reading::Temperature { c_x100: -50 };
        assert_eq!(below_zero.to_short_bytes(), [0, 50]);
        assert_eq!(decode_fixed(below_zero.to_short_bytes()), Some(50));

        // From -1 down the sign survives
        let colder = Reading::Temperature { c_x100: -125 };
        assert_eq!(colder.to_short_bytes(), [(-1i8) as u8, 25]);
        assert_eq!(decode_fixed(colder.to_short_bytes()), Some(-125));
    }

    #[test]
    fn test_decode_negative_temperature() {
        let (primary, _) = decode_readings(SensorType::Temperature, &[(-5i8) as u8, 25, 0, 0]);
        assert_eq!(primary, Some(Reading::Temperature { c_x100: -525 }));
    }

    #[test]
    fn test_decode_no_data() {
        let (primary, _) = decode_readings(SensorType::Temperature, &[0x80, 0, 0, 0]);
        assert_eq!(primary, None);

        let (primary, _) = decode_readings(SensorType::Luminosity, &[0xFF; 4]);
        assert_eq!(primary, None);
    }

    #[test]
    fn test_decode_humidity_pair() {
        let (primary, secondary) = decode_readings(SensorType::Humidity, &[61, 5, 19, 75]);
        assert_eq!(primary, Some(Reading::Humidity { rh_x100: 6105 }));
        assert_eq!(secondary, Some(Reading::Temperature { c_x100: 1975 }));
    }

    #[test]
    fn test_decode_luminosity() {
        let (primary, _) = decode_readings(SensorType::Luminosity, &1500u32.to_le_bytes());
        assert_eq!(primary, Some(Reading::Luminosity { lux: 1500 }));
    }

    #[test]
    fn test_short_bytes() {
        assert_eq!(Reading::Temperature { c_x100: 2350 }.to_short_bytes(), [23, 50]);
        assert_eq!(
            Reading::Temperature { c_x100: -525 }.to_short_bytes(),
            [(-5i8) as u8, 25]
        );
        assert_eq!(
            Reading::Luminosity { lux: 100_000 }.to_short_bytes(),
            [0xFF, 0xFF]
        );
    }
}
