//! Board-agnostic core logic for universal greenhouse modules
//!
//! This crate contains everything between the raw transports and the
//! controller's own state that does not depend on a particular board:
//!
//! - Scratchpad codec over a 1-Wire style bus
//! - Packet-type clients (sensors, Nextion display, execution)
//! - Registration dispatcher with persisted identities
//! - Registration and permanent wired lines
//! - RS-485 and nRF24 gateways
//! - The [`scheduler::ModuleHub`] tying them together
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod clients;
pub mod codec;
pub mod config;
pub mod gates;
pub mod lines;
pub mod registry;
pub mod scheduler;
pub mod traits;
