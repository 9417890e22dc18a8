//! nRF24 controller state broadcast
//!
//! Packet format (30 bytes):
//! - 0: controller id
//! - 1..15: controller state
//! - 15..29: reserved, 0xFF
//! - 29: CRC8 over bytes 0..29
//!
//! Modules answer with their own 30-byte scratchpad.

use crate::controller::{ControllerState, CONTROLLER_STATE_SIZE};
use crate::crc::crc8;
use crate::scratchpad::{PacketError, UNUSED};

/// Total packet size, fits one nRF24 payload
pub const NRF_PACKET_SIZE: usize = 30;

const STATE_OFFSET: usize = 1;

/// Controller state as broadcast over the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NrfStatePacket {
    pub controller_id: u8,
    pub state: ControllerState,
}

impl NrfStatePacket {
    pub fn new(controller_id: u8, state: ControllerState) -> Self {
        Self {
            controller_id,
            state,
        }
    }

    pub fn encode(&self) -> [u8; NRF_PACKET_SIZE] {
        let mut buffer = [UNUSED; NRF_PACKET_SIZE];
        buffer[0] = self.controller_id;
        buffer[STATE_OFFSET..STATE_OFFSET + CONTROLLER_STATE_SIZE]
            .copy_from_slice(&self.state.to_bytes());
        buffer[NRF_PACKET_SIZE - 1] = crc8(&buffer[..NRF_PACKET_SIZE - 1]);
        buffer
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < NRF_PACKET_SIZE {
            return Err(PacketError::BufferTooSmall);
        }
        if crc8(&bytes[..NRF_PACKET_SIZE - 1]) != bytes[NRF_PACKET_SIZE - 1] {
            return Err(PacketError::CrcMismatch);
        }

        let mut state = [0u8; CONTROLLER_STATE_SIZE];
        state.copy_from_slice(&bytes[STATE_OFFSET..STATE_OFFSET + CONTROLLER_STATE_SIZE]);

        Ok(Self {
            controller_id: bytes[0],
            state: ControllerState::from_bytes(state),
        })
    }
}
