//! Universal module scratchpad protocol
//!
//! This crate defines the binary contract between the greenhouse controller
//! and its pluggable "universal" modules (sensor boards, the Nextion display
//! gateway, the relay board). The same 30-byte scratchpad travels over the
//! 1-Wire style bus and the nRF24 radio; the RS-485 bus wraps controller state
//! and sensor requests in its own 21-byte packet.
//!
//! # Scratchpad layout
//!
//! ```text
//! ┌──────┬─────────┬────────┬───────────────┬───────┬────────────┬──────┐
//! │ TYPE │ SUBTYPE │ CONFIG │ CONTROLLER_ID │ RF_ID │ DATA       │ CRC8 │
//! │ 1B   │ 1B      │ 1B     │ 1B            │ 1B    │ 24B        │ 1B   │
//! └──────┴─────────┴────────┴───────────────┴───────┴────────────┴──────┘
//! ```
//!
//! `TYPE` selects how `DATA` is interpreted (see [`views`]). Unused bytes are
//! filled with `0xFF`.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod controller;
pub mod crc;
pub mod nrf;
pub mod rs485;
pub mod scratchpad;
pub mod sensor;
pub mod views;

pub use controller::{ControllerState, WindowChannel, CONTROLLER_STATE_SIZE};
pub use crc::crc8;
pub use nrf::{NrfStatePacket, NRF_PACKET_SIZE};
pub use rs485::{Rs485Direction, Rs485Packet, Rs485PacketType, RS485_PACKET_SIZE};
pub use scratchpad::{
    command, PacketError, PacketType, RawScratchpad, ScratchpadHead, DATA_SIZE, HEAD_SIZE,
    NO_SENSOR_REGISTERED, SCRATCHPAD_SIZE,
};
pub use sensor::{decode_readings, Reading, SensorType, SENSOR_KINDS};
pub use views::{
    DisplayRequest, ExecutionSlot, ExecutionView, NextionEntry, NextionView, QueryInterval,
    SensorSlot, SensorsView, SlotType,
};
