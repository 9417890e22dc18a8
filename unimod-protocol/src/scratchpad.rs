//! Raw scratchpad record and its head
//!
//! Byte layout (30 bytes):
//! - 0: `packet_type` (1 = sensors, 2 = Nextion, 3 = execution)
//! - 1: `packet_subtype`
//! - 2: `config` (bit 0: radio transmitter enabled, bit 1: calibration supported)
//! - 3: `controller_id` the module is bound to
//! - 4: `rf_id` of the module
//! - 5..29: `data`, interpreted according to `packet_type`
//! - 29: CRC8 over bytes 0..29

use crate::crc::crc8;

/// Total scratchpad size in bytes
pub const SCRATCHPAD_SIZE: usize = HEAD_SIZE + DATA_SIZE + 1;

/// Size of the common head
pub const HEAD_SIZE: usize = 5;

/// Size of the type-specific data region
pub const DATA_SIZE: usize = 24;

/// Marks an empty sensor slot, an unassigned index or an empty persisted record
pub const NO_SENSOR_REGISTERED: u8 = 0xFF;

/// Filler for unused bytes
pub const UNUSED: u8 = 0xFF;

/// Command bytes understood by module firmware on the 1-Wire style bus
pub mod command {
    /// Address every device on the line (single module per line)
    pub const SKIP_ROM: u8 = 0xCC;
    /// Start a measurement
    pub const START_MEASURE: u8 = 0x44;
    /// Read the scratchpad
    pub const READ_SCRATCHPAD: u8 = 0xBE;
    /// Write head + data to the module
    pub const WRITE_SCRATCHPAD: u8 = 0x4E;
    /// Commit the scratchpad to the module's EEPROM
    pub const SAVE_EEPROM: u8 = 0x25;
}

/// Config bit: radio transmitter enabled
pub const CONFIG_RF_ENABLED: u8 = 0x01;
/// Config bit: module supports calibration factors
pub const CONFIG_CALIBRATION: u8 = 0x02;

/// Errors from decoding a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Input shorter than the fixed packet size
    BufferTooSmall,
    /// Trailing CRC8 does not match the contents
    CrcMismatch,
    /// Header or tail markers are wrong
    InvalidMarkers,
}

/// Packet type carried in the scratchpad head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    /// Module with up to three sensors
    Sensors,
    /// Remote Nextion display gateway
    Nextion,
    /// Relay / actuator board
    Execution,
    /// Anything else
    Unknown(u8),
}

const PACKET_SENSORS: u8 = 1;
const PACKET_NEXTION: u8 = 2;
const PACKET_EXECUTION: u8 = 3;

impl PacketType {
    /// Parse from the wire byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            PACKET_SENSORS => PacketType::Sensors,
            PACKET_NEXTION => PacketType::Nextion,
            PACKET_EXECUTION => PacketType::Execution,
            other => PacketType::Unknown(other),
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            PacketType::Sensors => PACKET_SENSORS,
            PacketType::Nextion => PACKET_NEXTION,
            PacketType::Execution => PACKET_EXECUTION,
            PacketType::Unknown(other) => other,
        }
    }
}

/// Common head of every scratchpad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScratchpadHead {
    pub packet_type: u8,
    pub packet_subtype: u8,
    pub config: u8,
    pub controller_id: u8,
    pub rf_id: u8,
}

impl Default for ScratchpadHead {
    fn default() -> Self {
        Self {
            packet_type: UNUSED,
            packet_subtype: UNUSED,
            config: UNUSED,
            controller_id: UNUSED,
            rf_id: UNUSED,
        }
    }
}

impl ScratchpadHead {
    /// Decoded packet type
    pub fn kind(&self) -> PacketType {
        PacketType::from_byte(self.packet_type)
    }

    /// Same `(packet_type, packet_subtype)` as `other`
    ///
    /// A difference means a different module now sits on the line.
    pub fn is_same_type(&self, other: &ScratchpadHead) -> bool {
        self.packet_type == other.packet_type && self.packet_subtype == other.packet_subtype
    }

    /// Radio transmitter enabled on the module
    pub fn rf_enabled(&self) -> bool {
        self.config & CONFIG_RF_ENABLED != 0
    }

    /// Module supports calibration factors
    pub fn calibration_supported(&self) -> bool {
        self.config & CONFIG_CALIBRATION != 0
    }

    fn encode(&self) -> [u8; HEAD_SIZE] {
        [
            self.packet_type,
            self.packet_subtype,
            self.config,
            self.controller_id,
            self.rf_id,
        ]
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            packet_type: bytes[0],
            packet_subtype: bytes[1],
            config: bytes[2],
            controller_id: bytes[3],
            rf_id: bytes[4],
        }
    }
}

/// The fixed 30-byte record exchanged with a module
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawScratchpad {
    pub head: ScratchpadHead,
    pub data: [u8; DATA_SIZE],
    pub crc8: u8,
}

impl Default for RawScratchpad {
    fn default() -> Self {
        Self {
            head: ScratchpadHead::default(),
            data: [UNUSED; DATA_SIZE],
            crc8: UNUSED,
        }
    }
}

impl RawScratchpad {
    /// Create a blank scratchpad of the given type with a valid CRC
    pub fn new(packet_type: PacketType) -> Self {
        let mut scratchpad = Self::default();
        scratchpad.head.packet_type = packet_type.to_byte();
        scratchpad.head.packet_subtype = 0;
        scratchpad.update_crc();
        scratchpad
    }

    /// Decoded packet type
    pub fn kind(&self) -> PacketType {
        self.head.kind()
    }

    /// Parse without checking the CRC
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < SCRATCHPAD_SIZE {
            return Err(PacketError::BufferTooSmall);
        }

        let mut data = [0u8; DATA_SIZE];
        data.copy_from_slice(&bytes[HEAD_SIZE..HEAD_SIZE + DATA_SIZE]);

        Ok(Self {
            head: ScratchpadHead::decode(&bytes[..HEAD_SIZE]),
            data,
            crc8: bytes[SCRATCHPAD_SIZE - 1],
        })
    }

    /// Parse and require a matching CRC
    pub fn decode_checked(bytes: &[u8]) -> Result<Self, PacketError> {
        let scratchpad = Self::from_bytes(bytes)?;
        if !scratchpad.verify_crc() {
            return Err(PacketError::CrcMismatch);
        }
        Ok(scratchpad)
    }

    /// Head and data, the part the CRC covers and the part a write sends
    pub fn payload(&self) -> [u8; HEAD_SIZE + DATA_SIZE] {
        let mut out = [0u8; HEAD_SIZE + DATA_SIZE];
        out[..HEAD_SIZE].copy_from_slice(&self.head.encode());
        out[HEAD_SIZE..].copy_from_slice(&self.data);
        out
    }

    /// Full wire image including the stored CRC byte
    pub fn to_bytes(&self) -> [u8; SCRATCHPAD_SIZE] {
        let mut out = [0u8; SCRATCHPAD_SIZE];
        out[..HEAD_SIZE + DATA_SIZE].copy_from_slice(&self.payload());
        out[SCRATCHPAD_SIZE - 1] = self.crc8;
        out
    }

    /// CRC8 over head + data
    pub fn calculate_crc(&self) -> u8 {
        crc8(&self.payload())
    }

    /// Recompute and store the CRC
    pub fn update_crc(&mut self) {
        self.crc8 = self.calculate_crc();
    }

    /// Stored CRC matches the contents
    pub fn verify_crc(&self) -> bool {
        self.crc8 == self.calculate_crc()
    }
}
