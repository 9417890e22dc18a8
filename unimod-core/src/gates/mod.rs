//! Shared-medium gateways
//!
//! [`Rs485Gate`] pulls readings by polling each registered sensor in turn.
//! [`NrfGate`] listens for readings radio modules push on their own
//! schedule. Both broadcast the controller state for execution modules.

pub mod nrf;
pub mod rs485;

pub use nrf::{NrfGate, NrfItem, MAX_PACKETS_PER_TICK};
pub use rs485::{PollItem, Rs485Gate, RS485_OFFLINE_AFTER_MISSED_CYCLES};
