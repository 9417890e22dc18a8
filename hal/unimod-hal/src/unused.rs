//! Placeholder for collaborators a board does not have
//!
//! `Unused` has no values, so a hub typed with it for, say, the radio can
//! never hold one, and the compiler drops the corresponding code paths.

use core::convert::Infallible;

use crate::onewire::OneWireBus;
use crate::radio::RadioLink;
use crate::rs485::{BusDirection, Rs485Port};

/// Uninhabited transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unused {}

impl OneWireBus for Unused {
    fn reset(&mut self) -> bool {
        match *self {}
    }

    fn write_byte(&mut self, _byte: u8) {
        match *self {}
    }

    fn read_bytes(&mut self, _buf: &mut [u8]) {
        match *self {}
    }
}

impl Rs485Port for Unused {
    type Error = Infallible;

    fn set_direction(&mut self, _direction: BusDirection) -> Result<(), Infallible> {
        match *self {}
    }

    fn send(&mut self, _data: &[u8]) -> Result<(), Infallible> {
        match *self {}
    }

    fn wait_transmit_complete(&mut self, _timeout_ms: u32) -> bool {
        match *self {}
    }

    fn recv(&mut self, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize, Infallible> {
        match *self {}
    }
}

impl RadioLink for Unused {
    type Error = Infallible;

    fn init(&mut self, _channel: u8) -> Result<(), Infallible> {
        match *self {}
    }

    fn set_channel(&mut self, _channel: u8) -> Result<(), Infallible> {
        match *self {}
    }

    fn broadcast(&mut self, _payload: &[u8]) -> Result<(), Infallible> {
        match *self {}
    }

    fn poll(&mut self, _buf: &mut [u8]) -> Option<usize> {
        match *self {}
    }
}
