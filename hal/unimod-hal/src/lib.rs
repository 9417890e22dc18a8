//! Unimod Hardware Abstraction Layer
//!
//! Primitive operations the module stack needs from the board. Chip-specific
//! drivers implement these; the core never touches bit timing, UART
//! registers or radio configuration directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  unimod-core (lines, gates, registry)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  unimod-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!       ┌─────────────┼─────────────┐
//!       ▼             ▼             ▼
//!   1-Wire pin    UART + DE pin   nRF24 / EEPROM
//! ```
//!
//! # Traits
//!
//! - [`onewire::OneWireBus`] - Reset/presence and byte transfer
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication with timeouts
//! - [`rs485::Rs485Port`] - Half-duplex RS-485 line
//! - [`radio::RadioLink`] - Broadcast radio
//! - [`store::ByteStore`] - Persistent byte range (EEPROM)

#![no_std]
#![deny(unsafe_code)]

pub mod onewire;
pub mod radio;
pub mod rs485;
pub mod store;
pub mod uart;
pub mod unused;

// Re-export key traits at crate root for convenience
pub use onewire::OneWireBus;
pub use radio::RadioLink;
pub use rs485::{BusDirection, HalfDuplex, HalfDuplexError, Rs485Port};
pub use store::{ByteStore, RamStore, StoreError};
pub use uart::{UartRx, UartTx};
pub use unused::Unused;
