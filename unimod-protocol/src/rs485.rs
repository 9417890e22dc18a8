//! RS-485 packet encoding and decoding
//!
//! Packet format (21 bytes):
//! - HEADER1, HEADER2 (2 bytes): 0xAB 0xBA
//! - DIRECTION (1 byte): 1 = from master, 2 = from slave
//! - TYPE (1 byte): 1 = controller state for execution modules, 2 = sensor data
//! - DATA (14 bytes): controller state, or for sensor packets
//!   `[sensor type, sensor index, reading[4], unused...]`
//! - TAIL1, TAIL2 (2 bytes): 0xDE 0xAD
//! - CRC8 (1 byte): over the preceding 20 bytes

use crate::controller::{ControllerState, CONTROLLER_STATE_SIZE};
use crate::crc::crc8;
use crate::scratchpad::{PacketError, UNUSED};
use crate::sensor::SensorType;

/// Total packet size
pub const RS485_PACKET_SIZE: usize = 4 + CONTROLLER_STATE_SIZE + 3;

pub const HEADER1: u8 = 0xAB;
pub const HEADER2: u8 = 0xBA;
pub const TAIL1: u8 = 0xDE;
pub const TAIL2: u8 = 0xAD;

const DATA_OFFSET: usize = 4;

/// Who sent the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rs485Direction {
    FromMaster,
    FromSlave,
}

impl Rs485Direction {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Rs485Direction::FromMaster),
            2 => Some(Rs485Direction::FromSlave),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Rs485Direction::FromMaster => 1,
            Rs485Direction::FromSlave => 2,
        }
    }
}

/// What the data block carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rs485PacketType {
    Execution,
    Sensor,
}

impl Rs485PacketType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Rs485PacketType::Execution),
            2 => Some(Rs485PacketType::Sensor),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Rs485PacketType::Execution => 1,
            Rs485PacketType::Sensor => 2,
        }
    }
}

/// A decoded RS-485 packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rs485Packet {
    pub direction: Rs485Direction,
    pub packet_type: Rs485PacketType,
    pub data: [u8; CONTROLLER_STATE_SIZE],
}

impl Rs485Packet {
    /// Controller state broadcast for execution modules
    pub fn controller_state(state: &ControllerState) -> Self {
        Self {
            direction: Rs485Direction::FromMaster,
            packet_type: Rs485PacketType::Execution,
            data: state.to_bytes(),
        }
    }

    /// Ask the module owning `(sensor, index)` for its reading
    pub fn sensor_request(sensor: SensorType, index: u8) -> Self {
        let mut data = [UNUSED; CONTROLLER_STATE_SIZE];
        data[0] = sensor.to_byte();
        data[1] = index;
        Self {
            direction: Rs485Direction::FromMaster,
            packet_type: Rs485PacketType::Sensor,
            data,
        }
    }

    /// A module's answer to [`Rs485Packet::sensor_request`]
    pub fn sensor_reply(sensor: SensorType, index: u8, reading: [u8; 4]) -> Self {
        let mut packet = Self::sensor_request(sensor, index);
        packet.direction = Rs485Direction::FromSlave;
        packet.data[2..6].copy_from_slice(&reading);
        packet
    }

    /// `(sensor type byte, index, reading)` if this is a slave's sensor reply
    pub fn reply_reading(&self) -> Option<(u8, u8, [u8; 4])> {
        if self.direction != Rs485Direction::FromSlave
            || self.packet_type != Rs485PacketType::Sensor
        {
            return None;
        }
        let mut reading = [0u8; 4];
        reading.copy_from_slice(&self.data[2..6]);
        Some((self.data[0], self.data[1], reading))
    }

    /// Encode into the 21-byte wire form
    pub fn encode(&self) -> [u8; RS485_PACKET_SIZE] {
        let mut buffer = [0u8; RS485_PACKET_SIZE];
        buffer[0] = HEADER1;
        buffer[1] = HEADER2;
        buffer[2] = self.direction.to_byte();
        buffer[3] = self.packet_type.to_byte();
        buffer[DATA_OFFSET..DATA_OFFSET + CONTROLLER_STATE_SIZE].copy_from_slice(&self.data);
        buffer[RS485_PACKET_SIZE - 3] = TAIL1;
        buffer[RS485_PACKET_SIZE - 2] = TAIL2;
        buffer[RS485_PACKET_SIZE - 1] = crc8(&buffer[..RS485_PACKET_SIZE - 1]);
        buffer
    }

    /// Decode and validate markers and CRC
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < RS485_PACKET_SIZE {
            return Err(PacketError::BufferTooSmall);
        }
        let bytes = &bytes[..RS485_PACKET_SIZE];

        if bytes[0] != HEADER1
            || bytes[1] != HEADER2
            || bytes[RS485_PACKET_SIZE - 3] != TAIL1
            || bytes[RS485_PACKET_SIZE - 2] != TAIL2
        {
            return Err(PacketError::InvalidMarkers);
        }

        if crc8(&bytes[..RS485_PACKET_SIZE - 1]) != bytes[RS485_PACKET_SIZE - 1] {
            return Err(PacketError::CrcMismatch);
        }

        let direction = Rs485Direction::from_byte(bytes[2]).ok_or(PacketError::InvalidMarkers)?;
        let packet_type =
            Rs485PacketType::from_byte(bytes[3]).ok_or(PacketError::InvalidMarkers)?;

        let mut data = [0u8; CONTROLLER_STATE_SIZE];
        data.copy_from_slice(&bytes[DATA_OFFSET..DATA_OFFSET + CONTROLLER_STATE_SIZE]);

        Ok(Self {
            direction,
            packet_type,
            data,
        })
    }
}
